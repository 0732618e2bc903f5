//! In-memory store for tests and embedding.
//!
//! All tables sit behind one `tokio::sync::Mutex`, so every workflow unit is a
//! single critical section: it either commits all of its writes or none.

use std::collections::HashMap;

use chrono::{DateTime, NaiveDate, Utc};
use tokio::sync::Mutex;

use super::{
    CallReported, CallStarted, ChecklistRecorded, PrlStore, apply_step, close_with_checklist,
    new_call_session, snapshot, worker_order,
};
use crate::config::WorkflowSettings;
use crate::error::{Error, Result};
use crate::model::*;
use crate::workflow::request::CallUpdateRequest;
use crate::workflow::transition::{self, Effect, RetryPolicy, Trigger};

#[derive(Default)]
struct Tables {
    shifts: HashMap<ShiftId, Shift>,
    workers: HashMap<WorkerId, Worker>,
    /// Insertion order; listings reverse it for newest first.
    calls: Vec<CallSession>,
    checklists: Vec<Checklist>,
}

impl Tables {
    fn worker(&self, id: WorkerId) -> Result<&Worker> {
        self.workers
            .get(&id)
            .ok_or_else(|| Error::NotFound(format!("worker {id}")))
    }
}

#[derive(Default)]
pub struct MemoryStore {
    tables: Mutex<Tables>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl PrlStore for MemoryStore {
    async fn create_shift(&self, new: NewShift) -> Result<Shift> {
        let shift = Shift {
            id: ShiftId::new(),
            plant: new.plant,
            label: new.label,
            starts_at: new.starts_at,
            ends_at: new.ends_at,
            supervisor: new.supervisor,
            date: new.date,
            state: ShiftState::Active,
            created_at: Utc::now(),
        };
        let mut tables = self.tables.lock().await;
        tables.shifts.insert(shift.id, shift.clone());
        Ok(shift)
    }

    async fn get_shift(&self, id: ShiftId) -> Result<Shift> {
        let tables = self.tables.lock().await;
        tables
            .shifts
            .get(&id)
            .cloned()
            .ok_or_else(|| Error::NotFound(format!("shift {id}")))
    }

    async fn active_shifts(&self, date: NaiveDate) -> Result<Vec<Shift>> {
        let tables = self.tables.lock().await;
        let mut shifts: Vec<Shift> = tables
            .shifts
            .values()
            .filter(|s| s.state == ShiftState::Active && s.date == date)
            .cloned()
            .collect();
        shifts.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(shifts)
    }

    async fn close_shift(&self, id: ShiftId) -> Result<Shift> {
        let mut tables = self.tables.lock().await;
        let shift = tables
            .shifts
            .get_mut(&id)
            .ok_or_else(|| Error::NotFound(format!("shift {id}")))?;
        if shift.state == ShiftState::Closed {
            return Err(Error::Conflict(format!("shift {id} is already closed")));
        }
        shift.state = ShiftState::Closed;
        Ok(shift.clone())
    }

    async fn shift_stats(&self, id: ShiftId) -> Result<ShiftStats> {
        let tables = self.tables.lock().await;
        Ok(ShiftStats::from_workers(
            tables.workers.values().filter(|w| w.shift_id == id),
        ))
    }

    async fn create_worker(&self, new: NewWorker) -> Result<Worker> {
        let mut tables = self.tables.lock().await;
        if !tables.shifts.contains_key(&new.shift_id) {
            return Err(Error::NotFound(format!("shift {}", new.shift_id)));
        }
        let now = Utc::now();
        let worker = Worker {
            id: WorkerId::new(),
            shift_id: new.shift_id,
            full_name: new.full_name,
            employee_id: new.employee_id,
            company: new.company,
            task_type: new.task_type,
            task_description: new.task_description,
            work_location: new.work_location,
            priority: new.priority,
            checklist_state: ChecklistState::Pending,
            call_attempts: 0,
            last_call_at: None,
            checklist_completed_at: None,
            identified_risks: new.identified_risks,
            phone: new.phone,
            created_at: now,
            updated_at: now,
        };
        tables.workers.insert(worker.id, worker.clone());
        Ok(worker)
    }

    async fn get_worker(&self, id: WorkerId) -> Result<Worker> {
        let tables = self.tables.lock().await;
        tables.worker(id).cloned()
    }

    async fn list_workers(&self, filter: &WorkerFilter) -> Result<Vec<Worker>> {
        let tables = self.tables.lock().await;
        let mut workers: Vec<Worker> = tables
            .workers
            .values()
            .filter(|w| filter.matches(w))
            .cloned()
            .collect();
        workers.sort_by(worker_order);
        Ok(workers)
    }

    async fn get_call(&self, id: CallId) -> Result<CallSession> {
        let tables = self.tables.lock().await;
        tables
            .calls
            .iter()
            .find(|c| c.id == id)
            .cloned()
            .ok_or_else(|| Error::NotFound(format!("call {id}")))
    }

    async fn list_calls(&self, filter: &CallFilter) -> Result<Vec<CallSession>> {
        let tables = self.tables.lock().await;
        let limit = usize::try_from(filter.limit).unwrap_or(0);
        Ok(tables
            .calls
            .iter()
            .rev()
            .filter(|c| filter.matches(c))
            .take(limit)
            .cloned()
            .collect())
    }

    async fn list_checklists(&self, worker_id: WorkerId) -> Result<Vec<Checklist>> {
        let tables = self.tables.lock().await;
        Ok(tables
            .checklists
            .iter()
            .rev()
            .filter(|c| c.worker_id == worker_id)
            .cloned()
            .collect())
    }

    async fn start_call(
        &self,
        worker_id: WorkerId,
        policy: &RetryPolicy,
        now: DateTime<Utc>,
    ) -> Result<CallStarted> {
        let mut tables = self.tables.lock().await;
        let mut worker = tables.worker(worker_id)?.clone();
        let step = transition::next(snapshot(&worker), Trigger::CallInitiated, policy)?;

        let call = new_call_session(&worker, now);
        apply_step(&mut worker, &step, now);

        tables.calls.push(call.clone());
        tables.workers.insert(worker.id, worker.clone());
        Ok(CallStarted { call, worker, step })
    }

    async fn report_call(
        &self,
        call_id: CallId,
        update: &CallUpdateRequest,
        settings: &WorkflowSettings,
        now: DateTime<Utc>,
    ) -> Result<CallReported> {
        let mut tables = self.tables.lock().await;
        let idx = tables
            .calls
            .iter()
            .position(|c| c.id == call_id)
            .ok_or_else(|| Error::NotFound(format!("call {call_id}")))?;

        let mut call = tables.calls[idx].clone();
        let session_was_open = update.merge_into(&mut call, now);
        let mut worker = tables.worker(call.worker_id)?.clone();

        let step = transition::next(
            snapshot(&worker),
            Trigger::CallReported {
                session_was_open,
                call_state: call.state,
                checklist_completed: call.checklist_completed,
            },
            &settings.policy(),
        )?;

        let checklist = step
            .has(Effect::RecordCallChecklist)
            .then(|| update.call_checklist(&call, settings).into_checklist(now));
        apply_step(&mut worker, &step, now);

        tables.calls[idx] = call.clone();
        tables.workers.insert(worker.id, worker.clone());
        if let Some(ref checklist) = checklist {
            tables.checklists.push(checklist.clone());
        }
        Ok(CallReported {
            call,
            worker,
            session_was_open,
            checklist,
            step,
        })
    }

    async fn record_checklist(
        &self,
        mut new: NewChecklist,
        policy: &RetryPolicy,
        now: DateTime<Utc>,
    ) -> Result<ChecklistRecorded> {
        let mut tables = self.tables.lock().await;
        let mut worker = tables.worker(new.worker_id)?.clone();
        let step = transition::next(snapshot(&worker), Trigger::ChecklistRecorded, policy)?;

        let open_idx = if step.has(Effect::CloseOpenSession) {
            tables
                .calls
                .iter()
                .position(|c| c.worker_id == worker.id && c.is_open())
        } else {
            None
        };
        let closed_call = open_idx.map(|idx| {
            let mut call = tables.calls[idx].clone();
            close_with_checklist(&mut call, now);
            call
        });
        if new.call_id.is_none() {
            new.call_id = closed_call.as_ref().map(|c| c.id);
        }

        let checklist = new.into_checklist(now);
        apply_step(&mut worker, &step, now);

        if let (Some(idx), Some(call)) = (open_idx, closed_call.as_ref()) {
            tables.calls[idx] = call.clone();
        }
        tables.checklists.push(checklist.clone());
        tables.workers.insert(worker.id, worker.clone());
        Ok(ChecklistRecorded {
            checklist,
            worker,
            closed_call,
            step,
        })
    }
}
