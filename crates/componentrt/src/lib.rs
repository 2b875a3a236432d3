//! Embeddable WebAssembly Component Model (Preview 2) runtime host.
//!
//! This crate is the facade over four independently useful crates:
//! the canonical-ABI engine (`componentrt_abi`), the host dispatch
//! layer (`componentrt_host`), the resource table
//! (`componentrt_resource_table`), and the asyncify scheduler
//! (`componentrt_sched`) — all parameterised by the shared type model
//! in `componentrt_types`. [`Runtime`]/[`Module`]/[`Instance`] wire
//! them together the way `wasmtime::{Engine, Module, Instance}` does
//! for the underlying engine this crate does not itself provide
//! (spec.md §1 "OUT OF SCOPE").

mod config;
mod error;
mod grammar;
mod guest;
mod instance;
mod module;
mod runtime;

pub mod testing;

pub use config::Config;
pub use error::{Error, ErrorKind, Phase, Result};
pub use grammar::{parse as parse_type_description, FunctionDecl};
pub use guest::{GuestExports, ImportLinker};
pub use instance::Instance;
pub use module::{detect_binary_kind, BinaryKind, ExportSignature, ImportRequirement, Module};
pub use runtime::Runtime;

pub use componentrt_abi as abi;
pub use componentrt_host as host;
pub use componentrt_resource_table as resource_table;
pub use componentrt_sched as sched;
pub use componentrt_types as types;
