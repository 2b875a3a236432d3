//! Language-neutral description of Component Model (Preview 2) types and
//! the dynamic native value domain that sits at the host/guest boundary.
//!
//! This crate holds pure data: no I/O, no memory access, no ABI math. The
//! canonical-ABI engine (`componentrt-abi`) consumes [`Type`] to compute
//! layout and to drive lift/lower; the host dispatch layer
//! (`componentrt-host`) consumes it to typecheck registrations; the
//! resource table (`componentrt-resource-table`) mints the [`Handle`]
//! values that show up inside [`Val::Resource`].

mod error;
mod handle;
mod ty;
mod value;

pub use error::{Error, ErrorKind, Phase, Result};
pub use handle::Handle;
pub use ty::{Case, Field, NamedType, ResourceId, Type};
pub use value::{semantically_eq, Val};
