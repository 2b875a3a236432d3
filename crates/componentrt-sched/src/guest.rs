//! The boundary between this crate and "wherever the asyncify-
//! transformed guest actually runs" (spec.md §1 OUT OF SCOPE: the wasm
//! execution engine). Mirrors `componentrt_abi::GuestMemory`'s role —
//! a trait the scheduler drives without knowing how the engine
//! actually executes wasm.

use crate::context::CallContext;
use crate::pending::PendingOp;
use componentrt_abi::CoreValue;
use componentrt_types::Error;

/// The state `get_state` reports, mirroring the asyncify transform's
/// own state machine (spec.md §4.4 "Preconditions").
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AsyncifyState {
    Normal,
    Unwinding,
    Rewinding,
}

/// What one guest `resume` produced.
pub enum GuestStepResult {
    /// The guest ran to completion (or past the point it was resumed
    /// from) without hitting another async import.
    Completed(Vec<CoreValue>),
    /// An async import fired; the returned op must run while the
    /// guest stays unwound.
    Suspended(Box<dyn PendingOp>),
}

/// The asyncify entry points a transformed guest module must export
/// (spec.md §4.4 "Preconditions"), plus a `resume` hook standing in
/// for "invoke or continue the guest call" — the actual invocation
/// mechanics belong to the wasm execution engine, out of scope here.
pub trait AsyncifyEntryPoints: Send {
    fn start_unwind(&mut self, ctx: &CallContext) -> Result<(), Error>;
    fn stop_unwind(&mut self, ctx: &CallContext) -> Result<(), Error>;
    fn start_rewind(&mut self, ctx: &CallContext, resume_value: u64) -> Result<(), Error>;
    fn stop_rewind(&mut self, ctx: &CallContext) -> Result<(), Error>;
    fn get_state(&self) -> AsyncifyState;

    /// Runs the guest from a fresh call (`resume_value` absent) or
    /// continues it past an asyncify rewind (`resume_value` present,
    /// already delivered via [`AsyncifyEntryPoints::start_rewind`]).
    fn resume(&mut self, ctx: &CallContext) -> Result<GuestStepResult, Error>;
}
