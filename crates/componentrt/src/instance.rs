//! An instantiated module: concrete guest memory/exports, a per-
//! instance resource table, and the host imports resolved at bind
//! time (spec.md §3 "Instance").

use crate::error::{Error, ErrorKind, Phase};
use crate::guest::{GuestExports, ImportLinker};
use crate::module::Module;
use componentrt_abi::{lift_flat, lower_flat, CoreValue, GuestMemory};
use componentrt_host::{dispatch_import, DispatchOutcome, HostRegistry, Namespace};
use componentrt_resource_table::ResourceTable;
use componentrt_sched::CallContext;
use componentrt_types::{ResourceId, Val};

struct RegistryLinker<'a> {
    registry: &'a HostRegistry,
    ctx: &'a CallContext,
}

impl ImportLinker for RegistryLinker<'_> {
    fn call_import(
        &mut self,
        namespace: &str,
        name: &str,
        memory: &mut dyn GuestMemory,
        args: &mut dyn Iterator<Item = CoreValue>,
    ) -> Result<Vec<CoreValue>, Error> {
        let ns = Namespace::parse(namespace)?;
        // `dispatch_import` takes `&mut impl Iterator`, not `&mut dyn
        // Iterator`; bridge the two.
        let mut args = std::iter::from_fn(|| args.next());
        match dispatch_import(self.registry, memory, &ns, name, self.ctx, &mut args)? {
            DispatchOutcome::Values(values) => Ok(values),
            DispatchOutcome::Pending(_) => Err(Error::new(
                ErrorKind::Registration,
                Phase::Scheduler,
                format!(
                    "import `{namespace}#{name}` is async-capable; synchronous `Instance::call` \
                     cannot drive it, use a `componentrt_sched::CallSession` instead"
                ),
            )),
        }
    }
}

/// A module bound to concrete memory, an exported-function body, and a
/// private resource table (spec.md §3 "Instance"). Exclusive to the
/// calling thread (spec.md §5); closing releases every resource handle
/// the instance created.
pub struct Instance<'rt> {
    module: &'rt Module<'rt>,
    guest: Box<dyn GuestExports>,
    resources: ResourceTable<ResourceId>,
}

impl<'rt> Instance<'rt> {
    pub fn new(module: &'rt Module<'rt>, guest: Box<dyn GuestExports>) -> Self {
        Instance {
            module,
            guest,
            resources: ResourceTable::new(),
        }
    }

    pub fn module(&self) -> &Module<'rt> {
        self.module
    }

    pub fn resources(&self) -> &ResourceTable<ResourceId> {
        &self.resources
    }

    pub fn resources_mut(&mut self) -> &mut ResourceTable<ResourceId> {
        &mut self.resources
    }

    /// Calls an exported function synchronously: lowers `args` into
    /// guest memory and flat core values via the canonical ABI engine,
    /// runs the export body (which may itself call back into resolved
    /// host imports through the module's registry), and lifts the raw
    /// result back (spec.md §2 "Control flow for a guest call").
    ///
    /// Export bodies that suspend at an async import are out of scope
    /// for this method — drive those through `componentrt_sched`
    /// directly (spec.md §4.4's protocol has no synchronous fallback).
    #[tracing::instrument(skip(self, args, ctx))]
    pub fn call(&mut self, name: &str, args: &[Val], ctx: &CallContext) -> Result<Option<Val>, Error> {
        ctx.check()?;
        let sig = self.module.export(name)?;
        if sig.params.len() != args.len() {
            return Err(Error::new(
                ErrorKind::InvalidInput,
                Phase::Runtime,
                format!(
                    "`{name}` expects {} argument(s), got {}",
                    sig.params.len(),
                    args.len()
                ),
            )
            .with_function(name.to_string()));
        }
        let result_ty = sig.result.clone();
        let param_types = sig.params.clone();

        let mut flat = Vec::new();
        {
            let memory = self.guest.memory();
            for (ty, val) in param_types.iter().zip(args) {
                lower_flat(memory, ty, val, &mut flat)
                    .map_err(|e| Error::new(e.kind, e.phase, e.detail).with_function(name.to_string()))?;
            }
        }

        let mut linker = RegistryLinker {
            registry: self.module.runtime().host_registry(),
            ctx,
        };
        let raw = self.guest.call_export(name, &flat, &mut linker)?;

        match result_ty {
            Some(ty) => {
                let mut iter = raw.into_iter();
                let val = lift_flat(self.guest.memory(), &ty, &mut iter)
                    .map_err(|e| Error::new(e.kind, e.phase, e.detail).with_function(name.to_string()))?;
                Ok(Some(val))
            }
            None => Ok(None),
        }
    }
}
