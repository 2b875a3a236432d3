//! The per-call state machine driving a guest invocation through its
//! yield/rewind cycles to a terminal state (spec.md §4.4 "Protocol",
//! "State machine (call session)").

use crate::context::CallContext;
use crate::guest::{AsyncifyEntryPoints, GuestStepResult};
use crate::pending::PendingOp;
use componentrt_abi::CoreValue;
use componentrt_types::{Error, ErrorKind, Phase};

/// `Fresh → Running → (Yielded ↔ Running)* → (Done | Failed | Cancelled)`.
/// Transitions happen only inside [`CallSession::step`]; callers never
/// observe a partial transition.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SessionState {
    Fresh,
    Running,
    Yielded,
    Done,
    Failed,
    Cancelled,
}

impl SessionState {
    pub fn is_terminal(self) -> bool {
        matches!(self, SessionState::Done | SessionState::Failed | SessionState::Cancelled)
    }
}

/// What one `step` produced.
pub enum StepOutcome<'a> {
    /// The call finished; these are the raw core-value results.
    Done(&'a [CoreValue]),
    /// An async import fired; the caller must run the op (or hand it
    /// to its own executor) and call `step` again with its result.
    Yield(&'a mut dyn PendingOp),
}

/// Drives one guest call through asyncify unwind/rewind cycles.
/// Generic over the engine-provided [`AsyncifyEntryPoints`]; this
/// struct owns only the protocol, never the guest's actual execution.
pub struct CallSession<G: AsyncifyEntryPoints> {
    guest: G,
    ctx: CallContext,
    state: SessionState,
    pending: Option<Box<dyn PendingOp>>,
    results: Vec<CoreValue>,
    cycles: usize,
}

impl<G: AsyncifyEntryPoints> CallSession<G> {
    pub fn new(guest: G, ctx: CallContext) -> Self {
        CallSession {
            guest,
            ctx,
            state: SessionState::Fresh,
            pending: None,
            results: Vec::new(),
            cycles: 0,
        }
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    /// The number of suspend/resume cycles observed so far — one per
    /// async import that fired and was driven back to completion.
    pub fn cycles(&self) -> usize {
        self.cycles
    }

    pub fn context(&self) -> &CallContext {
        &self.ctx
    }

    /// Advances the session by one step. `yield_result` must be `None`
    /// on the first call (state `Fresh`) and `Some` on every call made
    /// while the session is `Yielded` — it carries the pending op's
    /// `u64` result back into the guest's shadow stack.
    #[tracing::instrument(skip(self), fields(state = ?self.state))]
    pub fn step(&mut self, yield_result: Option<u64>) -> Result<StepOutcome<'_>, Error> {
        if self.state.is_terminal() {
            return Err(Error::new(
                ErrorKind::NotInitialized,
                Phase::Scheduler,
                "step called on a terminated call session",
            ));
        }
        if let Err(err) = self.ctx.check() {
            self.state = if err.kind == ErrorKind::Cancelled {
                SessionState::Cancelled
            } else {
                SessionState::Failed
            };
            return Err(err);
        }

        let outcome = match self.state {
            SessionState::Fresh => {
                self.state = SessionState::Running;
                self.guest.resume(&self.ctx)
            }
            SessionState::Yielded => {
                let value = yield_result.ok_or_else(|| {
                    Error::new(
                        ErrorKind::InvalidInput,
                        Phase::Scheduler,
                        "resuming a yielded session requires a yield_result",
                    )
                })?;
                self.guest.start_rewind(&self.ctx, value)?;
                self.state = SessionState::Running;
                let result = self.guest.resume(&self.ctx);
                self.guest.stop_rewind(&self.ctx)?;
                result
            }
            _ => unreachable!("non-terminal states are Fresh, Running, Yielded; Running never re-enters step directly"),
        };

        match outcome {
            Ok(GuestStepResult::Completed(raw)) => {
                self.results = raw;
                self.state = SessionState::Done;
                Ok(StepOutcome::Done(&self.results))
            }
            Ok(GuestStepResult::Suspended(op)) => {
                self.guest.start_unwind(&self.ctx)?;
                self.cycles += 1;
                self.pending = Some(op);
                self.state = SessionState::Yielded;
                Ok(StepOutcome::Yield(self.pending.as_deref_mut().expect("just set")))
            }
            Err(err) => {
                self.state = SessionState::Failed;
                Err(err)
            }
        }
    }

    /// Drives the session to completion, running each pending op with
    /// `executor` as it's yielded. Convenience wrapper around
    /// `step`/`Yield` for callers that don't need to interleave other
    /// work between cycles.
    pub fn run_async(
        &mut self,
        mut executor: impl FnMut(&mut dyn PendingOp, &CallContext) -> Result<u64, Error>,
    ) -> Result<Vec<CoreValue>, Error> {
        let mut next_input = None;
        loop {
            let ctx = self.ctx.clone();
            match self.step(next_input)? {
                StepOutcome::Done(raw) => return Ok(raw.to_vec()),
                StepOutcome::Yield(op) => {
                    next_input = Some(executor(op, &ctx)?);
                }
            }
        }
    }
}
