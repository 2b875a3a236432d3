//! Per-call dispatch: given core wasm arguments for a guest import
//! call, lift them via the canonical ABI engine, invoke the resolved
//! native handler, and lower its result back (spec.md §4.3 "Per-call
//! dispatch").

use crate::namespace::Namespace;
use crate::registry::{HandlerOutcome, HostRegistry};
use componentrt_abi::{flat_count, lift_flat, lower_flat, CoreValue, GuestMemory};
use componentrt_sched::{CallContext, PendingOp};
use componentrt_types::{Error, ErrorKind, Phase};

/// What dispatching one import call produced.
pub enum DispatchOutcome {
    /// The handler ran synchronously; these are the lowered core
    /// wasm return values.
    Values(Vec<CoreValue>),
    /// The handler is async-capable and yielded a pending op. Its
    /// eventual `u64` result *is* the import's return value — it does
    /// not pass back through the canonical ABI engine (spec.md §4.4).
    Pending(Box<dyn PendingOp>),
}

/// Resolves `name` in `requested`'s namespace, lifts `args` per the
/// registered parameter types, invokes the handler, and lowers its
/// result.
#[tracing::instrument(skip(registry, mem, ctx, args))]
pub fn dispatch_import(
    registry: &HostRegistry,
    mem: &mut dyn GuestMemory,
    requested: &Namespace,
    name: &str,
    ctx: &CallContext,
    args: &mut impl Iterator<Item = CoreValue>,
) -> Result<DispatchOutcome, Error> {
    ctx.check()?;
    let entry = registry.resolve(requested, name)?;

    let mut values = Vec::with_capacity(entry.params.len());
    for (i, ty) in entry.params.iter().enumerate() {
        let v = lift_flat(mem, ty, args).map_err(|e| {
            Error::new(e.kind, e.phase, e.detail)
                .with_function(name.to_string())
                .with_path(format!("arg[{i}]"))
        })?;
        values.push(v);
    }

    match (entry.handler)(ctx, &values)? {
        HandlerOutcome::Value(val) => {
            if !entry.is_async {
                let result_ty = entry.result.as_ref().ok_or_else(|| {
                    Error::new(
                        ErrorKind::TypeMismatch,
                        Phase::Host,
                        format!("handler for `{name}` returned a value but is registered with no result type"),
                    )
                })?;
                let mut out = Vec::with_capacity(flat_count(result_ty));
                lower_flat(mem, result_ty, &val, &mut out)
                    .map_err(|e| Error::new(e.kind, e.phase, e.detail).with_function(name.to_string()))?;
                Ok(DispatchOutcome::Values(out))
            } else {
                Err(Error::new(
                    ErrorKind::Registration,
                    Phase::Host,
                    format!("async-capable handler `{name}` returned a value instead of a pending op"),
                ))
            }
        }
        HandlerOutcome::Pending(op) => {
            if entry.is_async {
                Ok(DispatchOutcome::Pending(op))
            } else {
                Err(Error::new(
                    ErrorKind::Registration,
                    Phase::Host,
                    format!("sync handler `{name}` returned a pending op"),
                ))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::HostFnEntry;
    use componentrt_abi::testing::VecGuestMemory;
    use componentrt_types::{Type, Val};
    use std::collections::HashMap;

    fn ns() -> Namespace {
        Namespace::parse("my:pkg/api@1.0.0").unwrap()
    }

    #[test]
    fn dispatches_a_synchronous_handler() {
        let registry = HostRegistry::new();
        registry.register_explicit(
            &ns(),
            HashMap::from([(
                "add".to_string(),
                HostFnEntry::sync(vec![Type::U32, Type::U32], Some(Type::U32), |_ctx, args| {
                    let (Val::U32(a), Val::U32(b)) = (&args[0], &args[1]) else {
                        panic!("unexpected arg shapes");
                    };
                    Ok(Val::U32(a + b))
                }),
            )]),
        );
        let mut mem = VecGuestMemory::new(0);
        let mut args = vec![CoreValue::I32(7), CoreValue::I32(8)].into_iter();
        let ctx = CallContext::new();
        match dispatch_import(&registry, &mut mem, &ns(), "add", &ctx, &mut args).unwrap() {
            DispatchOutcome::Values(values) => assert_eq!(values, vec![CoreValue::I32(15)]),
            DispatchOutcome::Pending(_) => panic!("expected a synchronous result"),
        }
    }

    #[test]
    fn unresolved_import_fails_with_not_found() {
        let registry = HostRegistry::new();
        let mut mem = VecGuestMemory::new(0);
        let mut args = std::iter::empty();
        let err = dispatch_import(&registry, &mut mem, &ns(), "missing", &CallContext::new(), &mut args)
            .unwrap_err();
        assert_eq!(err.kind, ErrorKind::NotFound);
    }

    #[test]
    fn async_handler_yields_a_pending_op() {
        let registry = HostRegistry::new();
        registry.register_explicit(
            &ns(),
            HashMap::from([(
                "read".to_string(),
                HostFnEntry::async_capable(vec![], Some(Type::U32), |_ctx, _args| {
                    Ok(HandlerOutcome::Pending(Box::new(componentrt_sched::FnPendingOp::new(
                        1,
                        |_ctx| Ok(42),
                    ))))
                }),
            )]),
        );
        let mut mem = VecGuestMemory::new(0);
        let mut args = std::iter::empty();
        match dispatch_import(&registry, &mut mem, &ns(), "read", &CallContext::new(), &mut args).unwrap() {
            DispatchOutcome::Pending(mut op) => {
                assert_eq!(op.execute(&CallContext::new()).unwrap(), 42);
            }
            DispatchOutcome::Values(_) => panic!("expected a pending op"),
        }
    }
}
