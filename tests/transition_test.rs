//! Tests for the pure verification state machine.

use gts_prl::error::Error;
use gts_prl::model::{CallState, ChecklistState};
use gts_prl::workflow::transition::{Effect, RetryPolicy, Trigger, WorkerSnapshot, next};

fn at(state: ChecklistState, call_attempts: u32) -> WorkerSnapshot {
    WorkerSnapshot {
        state,
        call_attempts,
    }
}

fn reported(call_state: CallState, checklist_completed: bool) -> Trigger {
    Trigger::CallReported {
        session_was_open: true,
        call_state,
        checklist_completed,
    }
}

#[test]
fn initiate_from_every_idle_state_opens_session() {
    let policy = RetryPolicy::default();
    for state in [
        ChecklistState::Pending,
        ChecklistState::Completed,
        ChecklistState::Unreachable,
    ] {
        let step = next(at(state, 1), Trigger::CallInitiated, &policy).unwrap();
        assert_eq!(step.from, state);
        assert_eq!(step.to, ChecklistState::InProgress);
        assert_eq!(
            step.effects,
            vec![
                Effect::OpenSession,
                Effect::IncrementAttempts,
                Effect::StampLastCall
            ]
        );
    }
}

#[test]
fn initiate_while_in_progress_conflicts() {
    let err = next(
        at(ChecklistState::InProgress, 1),
        Trigger::CallInitiated,
        &RetryPolicy::default(),
    )
    .unwrap_err();
    assert!(matches!(err, Error::Conflict(_)));
}

#[test]
fn completed_with_checklist_records_it() {
    let step = next(
        at(ChecklistState::InProgress, 1),
        reported(CallState::Completed, true),
        &RetryPolicy::default(),
    )
    .unwrap();
    assert_eq!(step.to, ChecklistState::Completed);
    assert!(step.has(Effect::StampCompleted));
    assert!(step.has(Effect::RecordCallChecklist));
}

#[test]
fn completed_without_checklist_goes_back_to_pending() {
    let step = next(
        at(ChecklistState::InProgress, 1),
        reported(CallState::Completed, false),
        &RetryPolicy::default(),
    )
    .unwrap();
    assert_eq!(step.to, ChecklistState::Pending);
    assert!(step.effects.is_empty());
}

#[test]
fn failures_respect_attempt_ceiling() {
    let policy = RetryPolicy::default();
    for outcome in [CallState::Failed, CallState::NoAnswer] {
        let below = next(at(ChecklistState::InProgress, 2), reported(outcome, false), &policy)
            .unwrap();
        assert_eq!(below.to, ChecklistState::Pending);

        let at_ceiling =
            next(at(ChecklistState::InProgress, 3), reported(outcome, false), &policy).unwrap();
        assert_eq!(at_ceiling.to, ChecklistState::Unreachable);

        let past = next(at(ChecklistState::InProgress, 7), reported(outcome, false), &policy)
            .unwrap();
        assert_eq!(past.to, ChecklistState::Unreachable);
    }
}

#[test]
fn custom_ceiling_is_honoured() {
    let policy = RetryPolicy {
        max_call_attempts: 1,
    };
    let step = next(
        at(ChecklistState::InProgress, 1),
        reported(CallState::NoAnswer, false),
        &policy,
    )
    .unwrap();
    assert_eq!(step.to, ChecklistState::Unreachable);
}

#[test]
fn interim_report_keeps_state() {
    let step = next(
        at(ChecklistState::InProgress, 1),
        reported(CallState::InProgress, false),
        &RetryPolicy::default(),
    )
    .unwrap();
    assert!(!step.changes_state());
    assert!(step.effects.is_empty());
}

#[test]
fn report_on_closed_session_is_ignored() {
    let step = next(
        at(ChecklistState::InProgress, 2),
        Trigger::CallReported {
            session_was_open: false,
            call_state: CallState::Completed,
            checklist_completed: true,
        },
        &RetryPolicy::default(),
    )
    .unwrap();
    assert_eq!(step.to, ChecklistState::InProgress);
    assert!(step.effects.is_empty());
}

#[test]
fn checklist_completes_from_any_state() {
    for state in ChecklistState::ALL {
        let step = next(at(state, 0), Trigger::ChecklistRecorded, &RetryPolicy::default())
            .unwrap();
        assert_eq!(step.to, ChecklistState::Completed);
        assert!(step.has(Effect::StampCompleted));
        assert!(step.has(Effect::CloseOpenSession));
    }
}
