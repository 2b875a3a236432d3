//! `componentrt`'s public error type is the same closed enumeration
//! every internal crate already builds against (spec.md §7); the
//! facade only re-exports it so embedders depend on one path.

pub use componentrt_types::{Error, ErrorKind, Phase, Result};
