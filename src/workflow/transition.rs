//! The verification state machine as a pure function.
//!
//! `next(snapshot, trigger, policy)` decides the worker's new checklist state
//! and the side effects the store must apply in the same atomic unit. Stores
//! call it from inside their transaction so the decision always sees the
//! committed worker row.

use crate::error::{Error, Result};
use crate::model::{CallState, ChecklistState};

/// Default attempt ceiling before a worker is marked unreachable.
pub const DEFAULT_MAX_CALL_ATTEMPTS: u32 = 3;

/// Retry policy for verification calls.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_call_attempts: u32,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_call_attempts: DEFAULT_MAX_CALL_ATTEMPTS,
        }
    }
}

/// The worker fields the transition depends on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WorkerSnapshot {
    pub state: ChecklistState,
    pub call_attempts: u32,
}

/// What happened to the worker.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Trigger {
    /// A verification call is being started.
    CallInitiated,
    /// The voice platform reported on a call session.
    CallReported {
        /// The session was EN_CURSO before this report.
        session_was_open: bool,
        /// Session state after merging the report.
        call_state: CallState,
        /// Checklist flag after merging the report.
        checklist_completed: bool,
    },
    /// A checklist was submitted directly.
    ChecklistRecorded,
}

/// Side effects a store applies alongside the state change.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Effect {
    /// Insert a new EN_CURSO call session.
    OpenSession,
    IncrementAttempts,
    StampLastCall,
    StampCompleted,
    /// Close the worker's open session (if any) as COMPLETADA with the
    /// checklist captured.
    CloseOpenSession,
    /// Persist a checklist row linked to the reported call.
    RecordCallChecklist,
}

/// Result of a transition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Step {
    pub from: ChecklistState,
    pub to: ChecklistState,
    pub effects: Vec<Effect>,
}

impl Step {
    fn stay(state: ChecklistState) -> Self {
        Self {
            from: state,
            to: state,
            effects: Vec::new(),
        }
    }

    pub fn has(&self, effect: Effect) -> bool {
        self.effects.contains(&effect)
    }

    pub fn changes_state(&self) -> bool {
        self.from != self.to
    }
}

/// Compute the next state and effects for a worker.
///
/// Fails with [`Error::Conflict`] when a call is initiated for a worker that
/// already has one in progress; every other trigger is always accepted.
pub fn next(current: WorkerSnapshot, trigger: Trigger, policy: &RetryPolicy) -> Result<Step> {
    use ChecklistState::*;

    let from = current.state;
    let step = match trigger {
        Trigger::CallInitiated => {
            if from == InProgress {
                return Err(Error::Conflict(
                    "worker already has a verification call in progress".to_string(),
                ));
            }
            Step {
                from,
                to: InProgress,
                effects: vec![
                    Effect::OpenSession,
                    Effect::IncrementAttempts,
                    Effect::StampLastCall,
                ],
            }
        }

        // Late or duplicate callback for a session that already closed.
        // The worker may be on a newer call by now; leave it alone.
        Trigger::CallReported {
            session_was_open: false,
            ..
        } => Step::stay(from),

        Trigger::CallReported {
            call_state,
            checklist_completed,
            ..
        } => match call_state {
            CallState::Completed if checklist_completed => Step {
                from,
                to: Completed,
                effects: vec![Effect::StampCompleted, Effect::RecordCallChecklist],
            },
            // Contacted but no checklist captured: eligible for another call.
            CallState::Completed => Step {
                from,
                to: Pending,
                effects: Vec::new(),
            },
            CallState::Failed | CallState::NoAnswer => {
                let to = if current.call_attempts >= policy.max_call_attempts {
                    Unreachable
                } else {
                    Pending
                };
                Step {
                    from,
                    to,
                    effects: Vec::new(),
                }
            }
            CallState::InProgress => Step::stay(from),
        },

        Trigger::ChecklistRecorded => Step {
            from,
            to: Completed,
            effects: vec![Effect::StampCompleted, Effect::CloseOpenSession],
        },
    };
    Ok(step)
}
