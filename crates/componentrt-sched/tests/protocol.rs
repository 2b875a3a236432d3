use componentrt_abi::CoreValue;
use componentrt_sched::testing::{ScriptStep, ScriptedGuest};
use componentrt_sched::{CallContext, CallSession, SessionState, StepOutcome};
use componentrt_types::ErrorKind;
use std::time::Duration;

#[test]
fn synchronous_call_completes_on_first_step() {
    let guest = ScriptedGuest::new(vec![ScriptStep::Completes(vec![CoreValue::I32(7)])]);
    let mut session = CallSession::new(guest, CallContext::new());
    match session.step(None).unwrap() {
        StepOutcome::Done(raw) => assert_eq!(raw, &[CoreValue::I32(7)]),
        StepOutcome::Yield(_) => panic!("expected immediate completion"),
    }
    assert_eq!(session.state(), SessionState::Done);
    assert_eq!(session.cycles(), 0);
}

#[test]
fn single_suspend_resume_cycle_delivers_result_back() {
    let guest = ScriptedGuest::new(vec![
        ScriptStep::Suspends { command_id: 1, op_result: 99 },
        ScriptStep::Completes(vec![CoreValue::I32(99)]),
    ]);
    let mut session = CallSession::new(guest, CallContext::new());
    let yielded = match session.step(None).unwrap() {
        StepOutcome::Yield(op) => op.command_id(),
        StepOutcome::Done(_) => panic!("expected a yield"),
    };
    assert_eq!(yielded, 1);
    assert_eq!(session.state(), SessionState::Yielded);

    match session.step(Some(99)).unwrap() {
        StepOutcome::Done(raw) => assert_eq!(raw, &[CoreValue::I32(99)]),
        StepOutcome::Yield(_) => panic!("expected completion after rewind"),
    }
    assert_eq!(session.cycles(), 1);
}

#[test]
fn five_line_stream_completes_with_five_cycles() {
    let mut steps: Vec<ScriptStep> = (0..5)
        .map(|i| ScriptStep::Suspends { command_id: i, op_result: i + 1 })
        .collect();
    steps.push(ScriptStep::Completes(vec![CoreValue::I32(5)]));
    let guest = ScriptedGuest::new(steps);
    let mut session = CallSession::new(guest, CallContext::new());

    let raw = session
        .run_async(|op, ctx| op.execute(ctx))
        .expect("async run should complete");
    assert_eq!(raw, vec![CoreValue::I32(5)]);
    assert_eq!(session.cycles(), 5);
}

#[test]
fn ten_thousand_cycles_complete_with_correct_count() {
    let mut steps: Vec<ScriptStep> = (0..10_000)
        .map(|i| ScriptStep::Suspends { command_id: i, op_result: 1 })
        .collect();
    steps.push(ScriptStep::Completes(vec![CoreValue::I32(10_000)]));
    let guest = ScriptedGuest::new(steps);
    let mut session = CallSession::new(guest, CallContext::new());

    let mut executed = 0u64;
    let raw = session
        .run_async(|op, ctx| {
            executed += 1;
            op.execute(ctx)
        })
        .unwrap();
    assert_eq!(raw, vec![CoreValue::I32(10_000)]);
    assert_eq!(session.cycles(), 10_000);
    assert_eq!(executed, 10_000);
}

#[test]
fn cancellation_before_a_step_yields_cancelled_terminal_state() {
    let guest = ScriptedGuest::new(vec![ScriptStep::Completes(vec![])]);
    let ctx = CallContext::new();
    ctx.cancel();
    let mut session = CallSession::new(guest, ctx);
    let err = session.step(None).unwrap_err();
    assert_eq!(err.kind, ErrorKind::Cancelled);
    assert_eq!(session.state(), SessionState::Cancelled);
}

#[test]
fn deadline_exceeded_marks_session_failed_not_cancelled() {
    let guest = ScriptedGuest::new(vec![ScriptStep::Completes(vec![])]);
    let ctx = CallContext::new().with_timeout(Duration::from_millis(0));
    std::thread::sleep(Duration::from_millis(5));
    let mut session = CallSession::new(guest, ctx);
    let err = session.step(None).unwrap_err();
    assert_eq!(err.kind, ErrorKind::DeadlineExceeded);
    assert_eq!(session.state(), SessionState::Failed);
}

#[test]
fn stepping_a_terminal_session_fails() {
    let guest = ScriptedGuest::new(vec![ScriptStep::Completes(vec![])]);
    let mut session = CallSession::new(guest, CallContext::new());
    session.step(None).unwrap();
    assert!(session.step(None).is_err());
}
