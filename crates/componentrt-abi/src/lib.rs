//! The canonical ABI engine: layout computation, memory-based
//! lift/lower, the flat (register) representation used for direct
//! call arguments, and a typed fast path for callers who know their
//! shapes at compile time.
//!
//! This crate never touches a real wasm engine. It is generic over
//! [`GuestMemory`], an abstraction of "one guest instance's linear
//! memory plus its `cabi_realloc` export" — the external collaborator
//! that the wasm execution engine itself would provide.

pub mod codec;
pub mod flat;
pub mod layout;
pub mod memory;
pub mod testing;
pub mod typed;

pub use codec::{lift, lower};
pub use flat::{fits_flat, flat_count, lift_flat, lower_flat, CoreValue, MAX_FLAT};
pub use layout::{align_of, list_element_stride, size_align, size_of};
pub use memory::GuestMemory;
pub use typed::{FromVal, IntoVal};
