//! A hand-scripted [`GuestExports`] implementation: each export is a
//! native closure operating directly on [`Val`]s. Lift/lower against a
//! private linear memory, and against any import the closure calls, is
//! handled by this type — standing in for the glue code a real
//! compiled guest would have (the wasm execution engine itself is out
//! of scope, spec.md §1). Mirrors
//! `componentrt_abi::testing::VecGuestMemory` and
//! `componentrt_sched::testing::ScriptedGuest`: a reference
//! implementation of an external-collaborator trait, used by this
//! crate's own tests.

use crate::error::{Error, ErrorKind, Phase};
use crate::guest::{GuestExports, ImportLinker};
use componentrt_abi::testing::VecGuestMemory;
use componentrt_abi::{lift_flat, lower_flat, CoreValue, GuestMemory};
use componentrt_types::{Type, Val};
use std::collections::HashMap;

/// What an export's closure calls to reach a declared import by its
/// local call name; mirrors [`ImportLinker`] but at the `Val` level,
/// since a hand-scripted export reasons about values, not raw core
/// slots.
pub type ImportProxy<'a> = dyn FnMut(&str, &[Val]) -> Result<Option<Val>, Error> + 'a;

pub struct NativeFn {
    params: Vec<Type>,
    result: Option<Type>,
    handler: Box<dyn FnMut(&[Val], &mut ImportProxy<'_>) -> Result<Val, Error> + Send>,
}

impl NativeFn {
    pub fn new(
        params: Vec<Type>,
        result: Option<Type>,
        handler: impl FnMut(&[Val], &mut ImportProxy<'_>) -> Result<Val, Error> + Send + 'static,
    ) -> Self {
        NativeFn {
            params,
            result,
            handler: Box::new(handler),
        }
    }
}

struct ImportSignature {
    namespace: String,
    name: String,
    params: Vec<Type>,
    result: Option<Type>,
}

/// A scripted guest: a bag of named [`NativeFn`] exports plus the
/// imports those exports are allowed to call, all sharing one private
/// [`VecGuestMemory`].
pub struct NativeExports {
    memory: VecGuestMemory,
    functions: HashMap<String, NativeFn>,
    imports: HashMap<String, ImportSignature>,
}

impl Default for NativeExports {
    fn default() -> Self {
        Self::new()
    }
}

impl NativeExports {
    pub fn new() -> Self {
        NativeExports {
            memory: VecGuestMemory::new(1 << 16),
            functions: HashMap::new(),
            imports: HashMap::new(),
        }
    }

    pub fn define(&mut self, name: impl Into<String>, func: NativeFn) {
        self.functions.insert(name.into(), func);
    }

    /// Declares an import under a local `call_name` an export closure
    /// uses to reach `namespace#name` through the instance's resolved
    /// host registry.
    pub fn declare_import(
        &mut self,
        call_name: impl Into<String>,
        namespace: impl Into<String>,
        name: impl Into<String>,
        params: Vec<Type>,
        result: Option<Type>,
    ) {
        self.imports.insert(
            call_name.into(),
            ImportSignature {
                namespace: namespace.into(),
                name: name.into(),
                params,
                result,
            },
        );
    }
}

impl GuestExports for NativeExports {
    fn memory(&mut self) -> &mut dyn GuestMemory {
        &mut self.memory
    }

    fn call_export(
        &mut self,
        export: &str,
        args: &[CoreValue],
        linker: &mut dyn ImportLinker,
    ) -> Result<Vec<CoreValue>, Error> {
        let NativeExports {
            memory,
            functions,
            imports,
        } = self;
        let f = functions.get_mut(export).ok_or_else(|| {
            Error::new(
                ErrorKind::NotFound,
                Phase::Runtime,
                format!("no such export `{export}`"),
            )
        })?;

        let mut iter = args.iter().copied();
        let mut vals = Vec::with_capacity(f.params.len());
        for ty in &f.params {
            vals.push(lift_flat(memory, ty, &mut iter)?);
        }

        let mut proxy = |call_name: &str, call_args: &[Val]| -> Result<Option<Val>, Error> {
            let sig = imports.get(call_name).ok_or_else(|| {
                Error::new(
                    ErrorKind::NotFound,
                    Phase::Runtime,
                    format!("undeclared import `{call_name}`"),
                )
            })?;
            let mut flat = Vec::new();
            for (ty, v) in sig.params.iter().zip(call_args) {
                lower_flat(&mut *memory, ty, v, &mut flat)?;
            }
            let mut core_iter = flat.into_iter();
            let raw = linker.call_import(&sig.namespace, &sig.name, &mut *memory, &mut core_iter)?;
            match &sig.result {
                Some(ty) => {
                    let mut raw_iter = raw.into_iter();
                    Ok(Some(lift_flat(memory, ty, &mut raw_iter)?))
                }
                None => Ok(None),
            }
        };

        let result_val = (f.handler)(&vals, &mut proxy)?;

        let mut out = Vec::new();
        if let Some(ty) = &f.result {
            lower_flat(&mut *memory, ty, &result_val, &mut out)?;
        }
        Ok(out)
    }
}
