//! The host registry: `namespace → name → HostFn` (spec.md §3 "Host
//! registry", §4.3 "Registration"). Write-once before load, read-only
//! after (spec.md §5 "Shared resources").

use crate::naming::{is_reserved_reflection_name, to_kebab};
use crate::namespace::{Namespace, Version};
use componentrt_sched::{CallContext, PendingOp};
use componentrt_types::{Error, ErrorKind, Phase, Type, Val};
use std::collections::HashMap;
use std::sync::{Arc, RwLock};

/// What a handler invocation produced: an immediate value, or a
/// pending op for the scheduler to run while the guest is unwound
/// (spec.md §4.3 "Async-capable handlers").
pub enum HandlerOutcome {
    Value(Val),
    Pending(Box<dyn PendingOp>),
}

pub type HandlerFn = dyn Fn(&CallContext, &[Val]) -> Result<HandlerOutcome, Error> + Send + Sync;

/// One registered guest-importable function: its canonical-ABI
/// signature, whether it may suspend, and the native callable.
pub struct HostFnEntry {
    pub params: Vec<Type>,
    pub result: Option<Type>,
    pub is_async: bool,
    pub handler: Arc<HandlerFn>,
}

impl HostFnEntry {
    pub fn sync(
        params: Vec<Type>,
        result: Option<Type>,
        handler: impl Fn(&CallContext, &[Val]) -> Result<Val, Error> + Send + Sync + 'static,
    ) -> Self {
        HostFnEntry {
            params,
            result,
            is_async: false,
            handler: Arc::new(move |ctx, args| handler(ctx, args).map(HandlerOutcome::Value)),
        }
    }

    pub fn async_capable(
        params: Vec<Type>,
        result: Option<Type>,
        handler: impl Fn(&CallContext, &[Val]) -> Result<HandlerOutcome, Error> + Send + Sync + 'static,
    ) -> Self {
        HostFnEntry {
            params,
            result,
            is_async: true,
            handler: Arc::new(handler),
        }
    }
}

/// One method a reflection-registered host object exposes, keyed by
/// its *native* (PascalCase) name; [`HostRegistry::register_reflected`]
/// converts the name and skips reserved ones.
pub struct ReflectedMethod {
    pub native_name: &'static str,
    pub entry: HostFnEntry,
}

struct VersionedEntry {
    version: Version,
    entry: Arc<HostFnEntry>,
}

#[derive(Default)]
pub struct HostRegistry {
    // keyed by (unversioned "pkg:ns/iface", wit function name)
    entries: RwLock<HashMap<(String, String), Vec<VersionedEntry>>>,
}

impl HostRegistry {
    pub fn new() -> Self {
        HostRegistry::default()
    }

    fn insert_one(&self, unversioned: String, name: String, version: Version, entry: HostFnEntry) {
        let mut map = self.entries.write().expect("host registry lock poisoned");
        let bucket = map.entry((unversioned, name)).or_default();
        if let Some(existing) = bucket.iter_mut().find(|e| e.version == version) {
            tracing::debug!("overwriting existing host registration at the same version (last-write-wins)");
            existing.entry = Arc::new(entry);
        } else {
            bucket.push(VersionedEntry { version, entry: Arc::new(entry) });
        }
    }

    /// Registers every non-reserved method as `namespace`'s kebab-case
    /// counterpart (spec.md §4.3 "Reflection").
    pub fn register_reflected(&self, namespace: &Namespace, methods: Vec<ReflectedMethod>) {
        for method in methods {
            if is_reserved_reflection_name(method.native_name) {
                continue;
            }
            let kebab = to_kebab(method.native_name);
            tracing::debug!(native = method.native_name, wit = %kebab, "registering reflected host method");
            self.insert_one(namespace.unversioned(), kebab, namespace.version, method.entry);
        }
    }

    /// Registers an explicit map from exact WIT names (including
    /// `[constructor]`/`[method]T.f`/`[static]T.f`/`[resource-drop]T`
    /// forms) to handlers (spec.md §4.3 "Explicit").
    pub fn register_explicit(&self, namespace: &Namespace, entries: HashMap<String, HostFnEntry>) {
        for (wit_name, entry) in entries {
            tracing::debug!(wit = %wit_name, "registering explicit host function");
            self.insert_one(namespace.unversioned(), wit_name, namespace.version, entry);
        }
    }

    /// Resolves a guest import against the registry (spec.md §4.3
    /// "Version reconciliation at bind time"): among registrations
    /// whose version satisfies `requested.version`, the highest patch
    /// wins.
    pub fn resolve(&self, requested: &Namespace, name: &str) -> Result<Arc<HostFnEntry>, Error> {
        let map = self.entries.read().expect("host registry lock poisoned");
        let bucket = map
            .get(&(requested.unversioned(), name.to_string()))
            .ok_or_else(|| {
                Error::new(
                    ErrorKind::NotFound,
                    Phase::Host,
                    format!("no host registration for `{requested}#{name}`"),
                )
            })?;
        bucket
            .iter()
            .filter(|e| e.version.satisfies(requested.version))
            .max_by_key(|e| e.version)
            .map(|e| Arc::clone(&e.entry))
            .ok_or_else(|| {
                Error::new(
                    ErrorKind::NotFound,
                    Phase::Host,
                    format!(
                        "host registration(s) for `{}#{}` exist but none satisfy requested version {}",
                        requested.unversioned(),
                        name,
                        requested.version
                    ),
                )
            })
    }

    /// The number of distinct `(namespace, name)` registrations,
    /// across all versions. Mostly useful for diagnostics and tests.
    pub fn len(&self) -> usize {
        self.entries.read().expect("host registry lock poisoned").len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ns(v: &str) -> Namespace {
        Namespace::parse(&format!("my:pkg/api@{v}")).unwrap()
    }

    #[test]
    fn reflection_converts_and_skips_reserved_names() {
        let registry = HostRegistry::new();
        let methods = vec![
            ReflectedMethod {
                native_name: "GetHTTPURL",
                entry: HostFnEntry::sync(vec![], Some(Type::String), |_ctx, _args| {
                    Ok(Val::String("ok".into()))
                }),
            },
            ReflectedMethod {
                native_name: "new",
                entry: HostFnEntry::sync(vec![], None, |_ctx, _args| Ok(Val::none())),
            },
        ];
        registry.register_reflected(&ns("1.0.0"), methods);
        assert!(registry.resolve(&ns("1.0.0"), "get-http-url").is_ok());
        assert!(registry.resolve(&ns("1.0.0"), "new").is_err());
    }

    #[test]
    fn version_resolution_picks_highest_satisfying_patch() {
        let registry = HostRegistry::new();
        registry.register_explicit(
            &ns("1.0.0"),
            HashMap::from([(
                "f".to_string(),
                HostFnEntry::sync(vec![], None, |_c, _a| Ok(Val::U32(1))),
            )]),
        );
        registry.register_explicit(
            &ns("1.0.2"),
            HashMap::from([(
                "f".to_string(),
                HostFnEntry::sync(vec![], None, |_c, _a| Ok(Val::U32(2))),
            )]),
        );
        let resolved = registry.resolve(&ns("1.0.5"), "f").unwrap();
        let out = (resolved.handler)(&CallContext::new(), &[]).unwrap();
        match out {
            HandlerOutcome::Value(Val::U32(2)) => {}
            _ => panic!("expected the 1.0.2 registration to win"),
        }
    }

    #[test]
    fn newer_host_minor_does_not_satisfy_import() {
        let registry = HostRegistry::new();
        registry.register_explicit(
            &ns("1.2.0"),
            HashMap::from([(
                "f".to_string(),
                HostFnEntry::sync(vec![], None, |_c, _a| Ok(Val::U32(1))),
            )]),
        );
        assert!(registry.resolve(&ns("1.1.0"), "f").is_err());
    }

    #[test]
    fn same_version_reregistration_is_last_write_wins() {
        let registry = HostRegistry::new();
        registry.register_explicit(
            &ns("1.0.0"),
            HashMap::from([(
                "f".to_string(),
                HostFnEntry::sync(vec![], None, |_c, _a| Ok(Val::U32(1))),
            )]),
        );
        registry.register_explicit(
            &ns("1.0.0"),
            HashMap::from([(
                "f".to_string(),
                HostFnEntry::sync(vec![], None, |_c, _a| Ok(Val::U32(2))),
            )]),
        );
        let resolved = registry.resolve(&ns("1.0.0"), "f").unwrap();
        let out = (resolved.handler)(&CallContext::new(), &[]).unwrap();
        match out {
            HandlerOutcome::Value(Val::U32(2)) => {}
            _ => panic!("expected the second registration to win"),
        }
    }
}
