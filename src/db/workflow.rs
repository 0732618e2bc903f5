//! Workflow units as single transactions.
//!
//! Lock order is always worker row first, then call rows, so a callback and a
//! direct checklist submission for the same worker cannot deadlock.

use chrono::{DateTime, Utc};

use super::call::{call_owner, insert_call, lock_call, lock_open_call, write_call};
use super::checklist::insert_checklist;
use super::worker::{lock_worker, write_worker_state};
use crate::config::WorkflowSettings;
use crate::error::Result;
use crate::model::{CallId, NewChecklist, WorkerId};
use crate::store::{
    CallReported, CallStarted, ChecklistRecorded, apply_step, close_with_checklist,
    new_call_session, snapshot,
};
use crate::workflow::request::CallUpdateRequest;
use crate::workflow::transition::{self, Effect, RetryPolicy, Trigger};

impl super::Db {
    /// Open a call session. A second caller for the same worker blocks on the
    /// row lock, then sees EN_CURSO and gets a conflict.
    pub async fn start_call(
        &self,
        worker_id: WorkerId,
        policy: &RetryPolicy,
        now: DateTime<Utc>,
    ) -> Result<CallStarted> {
        let mut tx = self.pool.begin().await?;

        let mut worker = lock_worker(&mut tx, worker_id).await?;
        let step = transition::next(snapshot(&worker), Trigger::CallInitiated, policy)?;

        let call = new_call_session(&worker, now);
        apply_step(&mut worker, &step, now);
        insert_call(&mut tx, &call).await?;
        write_worker_state(&mut tx, &worker).await?;

        tx.commit().await?;
        Ok(CallStarted { call, worker, step })
    }

    /// Merge a callback into its session and move the worker.
    pub async fn report_call(
        &self,
        call_id: CallId,
        update: &CallUpdateRequest,
        settings: &WorkflowSettings,
        now: DateTime<Utc>,
    ) -> Result<CallReported> {
        let mut tx = self.pool.begin().await?;

        let owner = call_owner(&mut tx, call_id).await?;
        let mut worker = lock_worker(&mut tx, owner).await?;
        let mut call = lock_call(&mut tx, call_id).await?;

        let session_was_open = update.merge_into(&mut call, now);
        let step = transition::next(
            snapshot(&worker),
            Trigger::CallReported {
                session_was_open,
                call_state: call.state,
                checklist_completed: call.checklist_completed,
            },
            &settings.policy(),
        )?;

        write_call(&mut tx, &call).await?;
        let checklist = if step.has(Effect::RecordCallChecklist) {
            let checklist = update.call_checklist(&call, settings).into_checklist(now);
            insert_checklist(&mut tx, &checklist).await?;
            Some(checklist)
        } else {
            None
        };
        apply_step(&mut worker, &step, now);
        write_worker_state(&mut tx, &worker).await?;

        tx.commit().await?;
        Ok(CallReported {
            call,
            worker,
            session_was_open,
            checklist,
            step,
        })
    }

    /// Persist a submitted checklist, closing any open session.
    pub async fn record_checklist(
        &self,
        mut new: NewChecklist,
        policy: &RetryPolicy,
        now: DateTime<Utc>,
    ) -> Result<ChecklistRecorded> {
        let mut tx = self.pool.begin().await?;

        let mut worker = lock_worker(&mut tx, new.worker_id).await?;
        let step = transition::next(snapshot(&worker), Trigger::ChecklistRecorded, policy)?;

        let closed_call = if step.has(Effect::CloseOpenSession) {
            match lock_open_call(&mut tx, worker.id).await? {
                Some(mut call) => {
                    close_with_checklist(&mut call, now);
                    write_call(&mut tx, &call).await?;
                    Some(call)
                }
                None => None,
            }
        } else {
            None
        };
        if new.call_id.is_none() {
            new.call_id = closed_call.as_ref().map(|c| c.id);
        }

        let checklist = new.into_checklist(now);
        insert_checklist(&mut tx, &checklist).await?;
        apply_step(&mut worker, &step, now);
        write_worker_state(&mut tx, &worker).await?;

        tx.commit().await?;
        Ok(ChecklistRecorded {
            checklist,
            worker,
            closed_call,
            step,
        })
    }
}
