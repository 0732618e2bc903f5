//! Storage seam for the PRL subsystem.
//!
//! Registry reads and writes are plain row operations. The three workflow
//! units (`start_call`, `report_call`, `record_checklist`) each run as one
//! atomic unit: the store loads the worker, asks
//! [`transition::next`](crate::workflow::transition::next) for the step, and
//! applies the step's effects before committing. Nothing is applied when any
//! part fails.

pub mod memory;

pub use memory::MemoryStore;

use std::future::Future;

use chrono::{DateTime, NaiveDate, Utc};

use crate::config::WorkflowSettings;
use crate::error::Result;
use crate::model::*;
use crate::workflow::request::CallUpdateRequest;
use crate::workflow::transition::{Effect, RetryPolicy, Step, WorkerSnapshot};

/// A call session was opened.
#[derive(Debug, Clone)]
pub struct CallStarted {
    pub call: CallSession,
    pub worker: Worker,
    pub step: Step,
}

/// A callback was merged into a call session.
#[derive(Debug, Clone)]
pub struct CallReported {
    pub call: CallSession,
    pub worker: Worker,
    /// False for a late callback on a session that had already closed.
    pub session_was_open: bool,
    /// Checklist persisted because the call completed with the checklist.
    pub checklist: Option<Checklist>,
    pub step: Step,
}

/// A checklist was persisted by direct submission.
#[derive(Debug, Clone)]
pub struct ChecklistRecorded {
    pub checklist: Checklist,
    pub worker: Worker,
    /// The open session that the submission closed, if there was one.
    pub closed_call: Option<CallSession>,
    pub step: Step,
}

pub trait PrlStore: Send + Sync {
    // --- shifts ---

    fn create_shift(&self, new: NewShift) -> impl Future<Output = Result<Shift>> + Send;

    fn get_shift(&self, id: ShiftId) -> impl Future<Output = Result<Shift>> + Send;

    /// ACTIVO shifts for `date`, newest first.
    fn active_shifts(&self, date: NaiveDate) -> impl Future<Output = Result<Vec<Shift>>> + Send;

    /// ACTIVO → CERRADO. Closing a closed shift is a conflict.
    fn close_shift(&self, id: ShiftId) -> impl Future<Output = Result<Shift>> + Send;

    /// Counts over the shift's workers as of the latest committed writes.
    fn shift_stats(&self, id: ShiftId) -> impl Future<Output = Result<ShiftStats>> + Send;

    // --- workers ---

    fn create_worker(&self, new: NewWorker) -> impl Future<Output = Result<Worker>> + Send;

    fn get_worker(&self, id: WorkerId) -> impl Future<Output = Result<Worker>> + Send;

    /// Ordered by priority (CRITICA first), then full name.
    fn list_workers(
        &self,
        filter: &WorkerFilter,
    ) -> impl Future<Output = Result<Vec<Worker>>> + Send;

    // --- calls and checklists ---

    fn get_call(&self, id: CallId) -> impl Future<Output = Result<CallSession>> + Send;

    /// Newest first, at most `filter.limit` rows.
    fn list_calls(
        &self,
        filter: &CallFilter,
    ) -> impl Future<Output = Result<Vec<CallSession>>> + Send;

    /// Newest first.
    fn list_checklists(
        &self,
        worker_id: WorkerId,
    ) -> impl Future<Output = Result<Vec<Checklist>>> + Send;

    // --- workflow units ---

    /// Open a call session for the worker.
    fn start_call(
        &self,
        worker_id: WorkerId,
        policy: &RetryPolicy,
        now: DateTime<Utc>,
    ) -> impl Future<Output = Result<CallStarted>> + Send;

    /// Merge a callback into a call session and move the worker accordingly.
    fn report_call(
        &self,
        call_id: CallId,
        update: &CallUpdateRequest,
        settings: &WorkflowSettings,
        now: DateTime<Utc>,
    ) -> impl Future<Output = Result<CallReported>> + Send;

    /// Persist a submitted checklist and complete the worker.
    fn record_checklist(
        &self,
        new: NewChecklist,
        policy: &RetryPolicy,
        now: DateTime<Utc>,
    ) -> impl Future<Output = Result<ChecklistRecorded>> + Send;
}

/// Sort order shared by every worker listing.
pub(crate) fn worker_order(a: &Worker, b: &Worker) -> std::cmp::Ordering {
    a.priority
        .cmp(&b.priority)
        .then_with(|| a.full_name.cmp(&b.full_name))
}

pub(crate) fn snapshot(worker: &Worker) -> WorkerSnapshot {
    WorkerSnapshot {
        state: worker.checklist_state,
        call_attempts: worker.call_attempts,
    }
}

/// Apply the worker-side part of a step.
pub(crate) fn apply_step(worker: &mut Worker, step: &Step, now: DateTime<Utc>) {
    worker.checklist_state = step.to;
    if step.has(Effect::IncrementAttempts) {
        worker.call_attempts += 1;
    }
    if step.has(Effect::StampLastCall) {
        worker.last_call_at = Some(now);
    }
    if step.has(Effect::StampCompleted) {
        worker.checklist_completed_at = Some(now);
    }
    if step.changes_state() || !step.effects.is_empty() {
        worker.updated_at = now;
    }
}

/// Close a session because its checklist arrived through another channel.
pub(crate) fn close_with_checklist(call: &mut CallSession, now: DateTime<Utc>) {
    call.state = CallState::Completed;
    call.checklist_completed = true;
    call.ended_at = Some(now);
    call.updated_at = now;
}

pub(crate) fn new_call_session(worker: &Worker, now: DateTime<Utc>) -> CallSession {
    CallSession {
        id: CallId::new(),
        worker_id: worker.id,
        phone: worker.phone.clone(),
        state: CallState::InProgress,
        // Optimistic: marked as contacted before any outcome is known.
        contact_made: true,
        checklist_completed: false,
        scheduled_for: Some(now),
        started_at: Some(now),
        ended_at: None,
        duration_secs: None,
        failure_reason: None,
        run_id: None,
        recording_url: None,
        created_at: now,
        updated_at: now,
    }
}
