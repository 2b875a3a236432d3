//! The root object: owns the host registry and tunables, and is the
//! only way to produce a [`Module`] (spec.md §3 "Runtime: created once;
//! owns engine; closed last").

use crate::config::Config;
use crate::error::Error;
use crate::module::{ExportSignature, ImportRequirement, Module};
use componentrt_host::{HostRegistry, Namespace, ReflectedMethod};
use std::collections::HashMap;

/// Owns everything that must outlive any [`Module`]/instance it
/// produces: the host registry (write-once-before-load, spec.md §5)
/// and runtime-wide tunables. The underlying wasm execution engine is
/// out of scope (spec.md §1) and has no representation here; an
/// embedder's own engine handle lives alongside a `Runtime`, not
/// inside it.
pub struct Runtime {
    config: Config,
    registry: HostRegistry,
}

impl Runtime {
    pub fn new(config: Config) -> Self {
        Runtime {
            config,
            registry: HostRegistry::new(),
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn host_registry(&self) -> &HostRegistry {
        &self.registry
    }

    /// Registers a reflection-based host object's methods under
    /// `namespace` (spec.md §4.3 "Registration": must happen before
    /// any load that references it).
    pub fn register_reflected(&self, namespace: &Namespace, methods: Vec<ReflectedMethod>) {
        self.registry.register_reflected(namespace, methods);
    }

    /// Registers an explicit WIT-name → handler map under `namespace`
    /// (spec.md §4.3 "Explicit").
    pub fn register_explicit(
        &self,
        namespace: &Namespace,
        entries: HashMap<String, componentrt_host::HostFnEntry>,
    ) {
        self.registry.register_explicit(namespace, entries);
    }

    /// Loads a core wasm module given its externally supplied textual
    /// type description (spec.md §4.5 "Core module load"). The actual
    /// wasm bytes are not inspected here — decoding and validation are
    /// the out-of-scope engine's job; this only builds the typed
    /// export index an [`crate::Instance`] dispatches against.
    pub fn load_core_module(
        &self,
        name: impl Into<String>,
        type_description: &str,
    ) -> Result<Module<'_>, Error> {
        Module::from_core_module(self, name, type_description)
    }

    /// Loads a component given its magic-detected binary kind is
    /// already known to be a component, and its export/import metadata
    /// supplied by the caller (real component-binary decoding is out
    /// of scope, spec.md §1). Unresolved imports fail the load.
    pub fn load_component(
        &self,
        name: impl Into<String>,
        exports: HashMap<String, ExportSignature>,
        imports: Vec<ImportRequirement>,
    ) -> Result<Module<'_>, Error> {
        Module::from_component(self, name, exports, imports)
    }
}
