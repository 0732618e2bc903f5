//! Postgres-backed store: connection pool, migrations, and health check.
//!
//! Row operations live in the submodules as inherent methods on [`Db`];
//! the [`PrlStore`] impl below routes the trait onto them.

pub mod call;
pub mod checklist;
pub mod shift;
pub mod worker;
pub mod workflow;

use chrono::{DateTime, NaiveDate, Utc};
use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;

use crate::config::WorkflowSettings;
use crate::error::{Error, Result};
use crate::model::*;
use crate::store::{CallReported, CallStarted, ChecklistRecorded, PrlStore};
use crate::workflow::request::CallUpdateRequest;
use crate::workflow::transition::RetryPolicy;

/// Database handle. Owns the connection pool.
pub struct Db {
    pool: PgPool,
}

impl Db {
    /// Connect to Postgres and create a connection pool.
    pub async fn connect(url: &str) -> Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(10)
            .connect(url)
            .await?;
        Ok(Self { pool })
    }

    /// Run all pending migrations.
    pub async fn migrate(&self) -> Result<()> {
        sqlx::migrate!("./migrations").run(&self.pool).await?;
        Ok(())
    }

    /// Simple health check: run a SELECT 1.
    pub async fn health_check(&self) -> Result<()> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }
}

/// Map a constraint violation to a domain error; anything else is storage.
fn constraint_error(err: sqlx::Error, what: impl FnOnce() -> String) -> Error {
    match err {
        sqlx::Error::Database(ref db) if db.is_unique_violation() => Error::Conflict(what()),
        sqlx::Error::Database(ref db) if db.is_foreign_key_violation() => Error::NotFound(what()),
        other => Error::Storage(other),
    }
}

impl PrlStore for Db {
    async fn create_shift(&self, new: NewShift) -> Result<Shift> {
        Db::create_shift(self, new).await
    }

    async fn get_shift(&self, id: ShiftId) -> Result<Shift> {
        Db::get_shift(self, id).await
    }

    async fn active_shifts(&self, date: NaiveDate) -> Result<Vec<Shift>> {
        Db::active_shifts(self, date).await
    }

    async fn close_shift(&self, id: ShiftId) -> Result<Shift> {
        Db::close_shift(self, id).await
    }

    async fn shift_stats(&self, id: ShiftId) -> Result<ShiftStats> {
        Db::shift_stats(self, id).await
    }

    async fn create_worker(&self, new: NewWorker) -> Result<Worker> {
        Db::create_worker(self, new).await
    }

    async fn get_worker(&self, id: WorkerId) -> Result<Worker> {
        Db::get_worker(self, id).await
    }

    async fn list_workers(&self, filter: &WorkerFilter) -> Result<Vec<Worker>> {
        Db::list_workers(self, filter).await
    }

    async fn get_call(&self, id: CallId) -> Result<CallSession> {
        Db::get_call(self, id).await
    }

    async fn list_calls(&self, filter: &CallFilter) -> Result<Vec<CallSession>> {
        Db::list_calls(self, filter).await
    }

    async fn list_checklists(&self, worker_id: WorkerId) -> Result<Vec<Checklist>> {
        Db::list_checklists(self, worker_id).await
    }

    async fn start_call(
        &self,
        worker_id: WorkerId,
        policy: &RetryPolicy,
        now: DateTime<Utc>,
    ) -> Result<CallStarted> {
        Db::start_call(self, worker_id, policy, now).await
    }

    async fn report_call(
        &self,
        call_id: CallId,
        update: &CallUpdateRequest,
        settings: &WorkflowSettings,
        now: DateTime<Utc>,
    ) -> Result<CallReported> {
        Db::report_call(self, call_id, update, settings, now).await
    }

    async fn record_checklist(
        &self,
        new: NewChecklist,
        policy: &RetryPolicy,
        now: DateTime<Utc>,
    ) -> Result<ChecklistRecorded> {
        Db::record_checklist(self, new, policy, now).await
    }
}
