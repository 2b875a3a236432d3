//! A scripted [`AsyncifyEntryPoints`] implementation for exercising
//! [`crate::CallSession`] without a real asyncify-transformed guest
//! (mirrors `componentrt_abi::testing::VecGuestMemory`'s role).

use crate::context::CallContext;
use crate::guest::{AsyncifyEntryPoints, AsyncifyState, GuestStepResult};
use crate::pending::FnPendingOp;
use componentrt_abi::CoreValue;
use componentrt_types::Error;

/// One step of a scripted guest run: either it completes with these
/// results, or it suspends and `op_result` is what the scripted
/// pending op will report.
pub enum ScriptStep {
    Completes(Vec<CoreValue>),
    Suspends { command_id: u64, op_result: u64 },
}

/// A guest whose behavior is a fixed sequence of [`ScriptStep`]s,
/// advancing one entry per `resume` call. Records every asyncify
/// transition it's told about, so tests can assert on the exact
/// protocol sequence (spec.md §8: "exactly 5 suspend/resume cycles
/// observed").
pub struct ScriptedGuest {
    steps: std::vec::IntoIter<ScriptStep>,
    state: AsyncifyState,
    pub transitions: Vec<&'static str>,
}

impl ScriptedGuest {
    pub fn new(steps: Vec<ScriptStep>) -> Self {
        ScriptedGuest {
            steps: steps.into_iter(),
            state: AsyncifyState::Normal,
            transitions: Vec::new(),
        }
    }
}

impl AsyncifyEntryPoints for ScriptedGuest {
    fn start_unwind(&mut self, _ctx: &CallContext) -> Result<(), Error> {
        self.state = AsyncifyState::Unwinding;
        self.transitions.push("start_unwind");
        Ok(())
    }

    fn stop_unwind(&mut self, _ctx: &CallContext) -> Result<(), Error> {
        self.state = AsyncifyState::Normal;
        self.transitions.push("stop_unwind");
        Ok(())
    }

    fn start_rewind(&mut self, _ctx: &CallContext, _resume_value: u64) -> Result<(), Error> {
        self.state = AsyncifyState::Rewinding;
        self.transitions.push("start_rewind");
        Ok(())
    }

    fn stop_rewind(&mut self, _ctx: &CallContext) -> Result<(), Error> {
        self.state = AsyncifyState::Normal;
        self.transitions.push("stop_rewind");
        Ok(())
    }

    fn get_state(&self) -> AsyncifyState {
        self.state
    }

    fn resume(&mut self, _ctx: &CallContext) -> Result<GuestStepResult, Error> {
        match self.steps.next() {
            Some(ScriptStep::Completes(values)) => Ok(GuestStepResult::Completed(values)),
            Some(ScriptStep::Suspends { command_id, op_result }) => {
                Ok(GuestStepResult::Suspended(Box::new(FnPendingOp::new(command_id, move |_ctx| {
                    Ok(op_result)
                }))))
            }
            None => Ok(GuestStepResult::Completed(Vec::new())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transitions_recorded_in_call_order() {
        let mut guest = ScriptedGuest::new(vec![]);
        let ctx = CallContext::new();
        guest.start_unwind(&ctx).unwrap();
        guest.start_rewind(&ctx, 1).unwrap();
        guest.stop_rewind(&ctx).unwrap();
        assert_eq!(guest.transitions, vec!["start_unwind", "start_rewind", "stop_rewind"]);
        assert_eq!(guest.get_state(), AsyncifyState::Normal);
    }
}
