//! Loaded, immutable module metadata: exported function signatures and,
//! for components, the imports that must resolve against the host
//! registry before the module can be instantiated (spec.md §3 "Module",
//! §4.5 "Runtime facade").

use crate::error::{Error, ErrorKind, Phase};
use crate::grammar;
use crate::runtime::Runtime;
use componentrt_host::Namespace;
use componentrt_types::Type;
use std::collections::HashMap;

/// The canonical-ABI signature of one exported function.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ExportSignature {
    pub params: Vec<Type>,
    pub result: Option<Type>,
}

/// One import a component declares it needs, resolved against the
/// host registry at load time (spec.md §4.5 "unresolved imports cause
/// load failure").
#[derive(Clone, Debug)]
pub struct ImportRequirement {
    pub namespace: Namespace,
    pub name: String,
    pub params: Vec<Type>,
    pub result: Option<Type>,
    pub is_async: bool,
}

/// Which of the two binary shapes spec.md §6 recognizes a guest
/// binary's header as.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BinaryKind {
    CoreModule,
    Component,
}

const WASM_MAGIC: [u8; 4] = *b"\0asm";

/// Detects core-module vs. component by magic + layer field
/// (spec.md §6). Real decoding of either binary's body is delegated to
/// the wasm execution engine, which is out of scope here; this is only
/// enough to route a load request to the right path.
pub fn detect_binary_kind(bytes: &[u8]) -> Result<BinaryKind, Error> {
    if bytes.len() < 8 || bytes[0..4] != WASM_MAGIC {
        return Err(Error::new(
            ErrorKind::LoadFailed,
            Phase::Load,
            "input is missing the `\\0asm` magic",
        ));
    }
    let layer = u16::from_le_bytes([bytes[6], bytes[7]]);
    Ok(if layer == 0 {
        BinaryKind::CoreModule
    } else {
        BinaryKind::Component
    })
}

/// An opaque compiled artifact plus its exported function index
/// (spec.md §3 "Module"). Immutable once created; holds a non-owning
/// reference to the [`Runtime`] that created it, per spec.md §9's
/// cyclic-reference redesign note — `Runtime` outlives every `Module`
/// it produced, enforced by this lifetime.
pub struct Module<'rt> {
    runtime: &'rt Runtime,
    name: String,
    exports: HashMap<String, ExportSignature>,
    imports: Vec<ImportRequirement>,
}

impl<'rt> Module<'rt> {
    pub(crate) fn from_core_module(
        runtime: &'rt Runtime,
        name: impl Into<String>,
        type_description: &str,
    ) -> Result<Self, Error> {
        let decls = grammar::parse(type_description)?;
        let mut exports = HashMap::with_capacity(decls.len());
        for decl in decls {
            let params = decl.params.into_iter().map(|(_, ty)| ty).collect();
            if exports
                .insert(
                    decl.name.clone(),
                    ExportSignature {
                        params,
                        result: decl.result,
                    },
                )
                .is_some()
            {
                return Err(Error::new(
                    ErrorKind::LoadFailed,
                    Phase::Load,
                    format!("duplicate export `{}` in type description", decl.name),
                ));
            }
        }
        Ok(Module {
            runtime,
            name: name.into(),
            exports,
            imports: Vec::new(),
        })
    }

    /// Loads a component given its (already-decoded, by the out-of-
    /// scope engine) export signatures and required imports, which are
    /// resolved against the runtime's host registry now — an
    /// unresolved import fails the load (spec.md §4.5).
    pub(crate) fn from_component(
        runtime: &'rt Runtime,
        name: impl Into<String>,
        exports: HashMap<String, ExportSignature>,
        imports: Vec<ImportRequirement>,
    ) -> Result<Self, Error> {
        for import in &imports {
            runtime
                .host_registry()
                .resolve(&import.namespace, &import.name)
                .map_err(|e| {
                    Error::new(
                        ErrorKind::LoadFailed,
                        Phase::Load,
                        format!(
                            "import `{}#{}` did not resolve against the host registry: {}",
                            import.namespace, import.name, e.detail
                        ),
                    )
                })?;
        }
        Ok(Module {
            runtime,
            name: name.into(),
            exports,
            imports,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn runtime(&self) -> &'rt Runtime {
        self.runtime
    }

    pub fn export(&self, name: &str) -> Result<&ExportSignature, Error> {
        self.exports.get(name).ok_or_else(|| {
            Error::new(
                ErrorKind::NotFound,
                Phase::Runtime,
                format!("module `{}` has no export named `{name}`", self.name),
            )
        })
    }

    pub fn exports(&self) -> impl Iterator<Item = (&str, &ExportSignature)> {
        self.exports.iter().map(|(name, sig)| (name.as_str(), sig))
    }

    pub fn imports(&self) -> &[ImportRequirement] {
        &self.imports
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn detects_core_module_by_layer_zero() {
        let bytes = [0x00, b'a', b's', b'm', 0x01, 0x00, 0x00, 0x00];
        assert_eq!(detect_binary_kind(&bytes).unwrap(), BinaryKind::CoreModule);
    }

    #[test]
    fn detects_component_by_nonzero_layer() {
        let bytes = [0x00, b'a', b's', b'm', 0x0d, 0x00, 0x01, 0x00];
        assert_eq!(detect_binary_kind(&bytes).unwrap(), BinaryKind::Component);
    }

    #[test]
    fn rejects_missing_magic() {
        let bytes = [0u8; 8];
        assert!(detect_binary_kind(&bytes).is_err());
    }
}
