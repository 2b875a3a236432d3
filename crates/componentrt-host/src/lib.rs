//! The host dispatch layer: registers native handler functions as
//! guest-importable functions (by reflection or explicit map),
//! reconciles namespace/version references at bind time, and routes
//! per-call dispatch through the canonical ABI engine (spec.md §4.3).

mod dispatch;
mod naming;
mod namespace;
mod registry;

pub use dispatch::{dispatch_import, DispatchOutcome};
pub use naming::{is_reserved_reflection_name, to_kebab, SpecialForm};
pub use namespace::{Namespace, Version};
pub use registry::{HandlerOutcome, HostFnEntry, HostRegistry, ReflectedMethod};
