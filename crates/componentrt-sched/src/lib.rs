//! Asyncify-based cooperative suspend/resume scheduling: the per-call
//! context, the pending-operation contract, and the call-session state
//! machine that drives a guest invocation through its yield/rewind
//! cycles (spec.md §4.4).
//!
//! Never touches a real wasm engine — [`AsyncifyEntryPoints`] is the
//! abstraction boundary, the same role `componentrt_abi::GuestMemory`
//! plays for the canonical ABI engine.

mod context;
mod guest;
mod pending;
mod session;
pub mod testing;

pub use context::{CallContext, CancellationToken};
pub use guest::{AsyncifyEntryPoints, AsyncifyState, GuestStepResult};
pub use pending::{FnPendingOp, PendingOp};
pub use session::{CallSession, SessionState, StepOutcome};
