//! A pending operation: the unit of work a host import hands back to
//! the scheduler instead of a direct result, to be run while the guest
//! is unwound (spec.md §4.4 "Pending operation").

use crate::context::CallContext;
use componentrt_types::Error;

/// An opaque command scheduled by an async host import. `execute` runs
/// outside the wasm frame — the guest is unwound for the duration —
/// and its `u64` result is what the asyncify rewind delivers back as
/// the import call's return value.
///
/// Implementations are expected to honour `ctx`'s cancellation signal
/// and deadline themselves (spec.md §4.4 "Cancellation": "the
/// scheduler does not forcibly interrupt them").
pub trait PendingOp: Send {
    /// Identifies which asyncify shadow slot this op's result belongs
    /// to; opaque to the scheduler beyond equality/ordering.
    fn command_id(&self) -> u64;

    fn execute(&mut self, ctx: &CallContext) -> Result<u64, Error>;
}

/// A [`PendingOp`] built directly from a closure, for host handlers
/// that don't need their own named type.
pub struct FnPendingOp<F> {
    command_id: u64,
    f: Option<F>,
}

impl<F> FnPendingOp<F>
where
    F: FnOnce(&CallContext) -> Result<u64, Error> + Send,
{
    pub fn new(command_id: u64, f: F) -> Self {
        FnPendingOp { command_id, f: Some(f) }
    }
}

impl<F> PendingOp for FnPendingOp<F>
where
    F: FnOnce(&CallContext) -> Result<u64, Error> + Send,
{
    fn command_id(&self) -> u64 {
        self.command_id
    }

    fn execute(&mut self, ctx: &CallContext) -> Result<u64, Error> {
        let f = self
            .f
            .take()
            .expect("FnPendingOp::execute called more than once");
        f(ctx)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fn_pending_op_runs_its_closure() {
        let mut op = FnPendingOp::new(1, |_ctx| Ok(42));
        assert_eq!(op.execute(&CallContext::new()).unwrap(), 42);
    }
}
