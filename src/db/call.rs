//! Call session rows.

use chrono::{DateTime, Utc};
use sqlx::PgConnection;
use uuid::Uuid;

use super::constraint_error;
use crate::error::{Error, Result};
use crate::model::{CallFilter, CallId, CallSession, WorkerId};

const CALL_COLUMNS: &str = "id, worker_id, telefono_destino, estado, contacto_exitoso, checklist_completado, programada_para, iniciada_at, finalizada_at, duracion_segundos, motivo_fallo, run_id, recording_url, created_at, updated_at";

impl super::Db {
    pub async fn get_call(&self, id: CallId) -> Result<CallSession> {
        let row: Option<CallRow> = sqlx::query_as(&format!(
            "SELECT {CALL_COLUMNS} FROM prl_safety_calls WHERE id = $1"
        ))
        .bind(id.0)
        .fetch_optional(&self.pool)
        .await?;
        row.ok_or_else(|| Error::NotFound(format!("call {id}")))?
            .try_into_call()
    }

    /// Call history, newest first.
    pub async fn list_calls(&self, filter: &CallFilter) -> Result<Vec<CallSession>> {
        let rows: Vec<CallRow> = sqlx::query_as(&format!(
            "SELECT {CALL_COLUMNS} FROM prl_safety_calls
             WHERE ($1::uuid IS NULL OR worker_id = $1)
             AND ($2::text IS NULL OR estado = $2)
             ORDER BY created_at DESC
             LIMIT $3"
        ))
        .bind(filter.worker_id.map(|id| id.0))
        .bind(filter.state.map(|s| s.as_str()))
        .bind(filter.limit.max(0))
        .fetch_all(&self.pool)
        .await?;
        rows.into_iter().map(CallRow::try_into_call).collect()
    }
}

pub(super) async fn insert_call(conn: &mut PgConnection, call: &CallSession) -> Result<()> {
    sqlx::query(
        "INSERT INTO prl_safety_calls (id, worker_id, telefono_destino, estado, contacto_exitoso, checklist_completado, programada_para, iniciada_at, created_at, updated_at)
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $9)",
    )
    .bind(call.id.0)
    .bind(call.worker_id.0)
    .bind(&call.phone)
    .bind(call.state.as_str())
    .bind(call.contact_made)
    .bind(call.checklist_completed)
    .bind(call.scheduled_for)
    .bind(call.started_at)
    .bind(call.created_at)
    .execute(&mut *conn)
    .await
    // The one-open-session index fires when a concurrent caller won the race.
    .map_err(|e| {
        constraint_error(e, || {
            format!("worker {} already has a verification call in progress", call.worker_id)
        })
    })?;
    Ok(())
}

/// The worker a call belongs to, without locking anything.
pub(super) async fn call_owner(conn: &mut PgConnection, id: CallId) -> Result<WorkerId> {
    let row: Option<(Uuid,)> =
        sqlx::query_as("SELECT worker_id FROM prl_safety_calls WHERE id = $1")
            .bind(id.0)
            .fetch_optional(&mut *conn)
            .await?;
    row.map(|(worker_id,)| WorkerId(worker_id))
        .ok_or_else(|| Error::NotFound(format!("call {id}")))
}

pub(super) async fn lock_call(conn: &mut PgConnection, id: CallId) -> Result<CallSession> {
    let row: Option<CallRow> = sqlx::query_as(&format!(
        "SELECT {CALL_COLUMNS} FROM prl_safety_calls WHERE id = $1 FOR UPDATE"
    ))
    .bind(id.0)
    .fetch_optional(&mut *conn)
    .await?;
    row.ok_or_else(|| Error::NotFound(format!("call {id}")))?
        .try_into_call()
}

/// The worker's open session, locked, if there is one.
pub(super) async fn lock_open_call(
    conn: &mut PgConnection,
    worker_id: WorkerId,
) -> Result<Option<CallSession>> {
    let row: Option<CallRow> = sqlx::query_as(&format!(
        "SELECT {CALL_COLUMNS} FROM prl_safety_calls
         WHERE worker_id = $1 AND estado = 'EN_CURSO'
         FOR UPDATE"
    ))
    .bind(worker_id.0)
    .fetch_optional(&mut *conn)
    .await?;
    row.map(CallRow::try_into_call).transpose()
}

/// Write back every mutable field of a session.
pub(super) async fn write_call(conn: &mut PgConnection, call: &CallSession) -> Result<()> {
    sqlx::query(
        "UPDATE prl_safety_calls
         SET estado = $1, contacto_exitoso = $2, checklist_completado = $3, finalizada_at = $4,
             duracion_segundos = $5, motivo_fallo = $6, run_id = $7, recording_url = $8,
             updated_at = $9
         WHERE id = $10",
    )
    .bind(call.state.as_str())
    .bind(call.contact_made)
    .bind(call.checklist_completed)
    .bind(call.ended_at)
    .bind(call.duration_secs)
    .bind(&call.failure_reason)
    .bind(&call.run_id)
    .bind(&call.recording_url)
    .bind(call.updated_at)
    .bind(call.id.0)
    .execute(&mut *conn)
    .await
    .map_err(|e| {
        constraint_error(e, || {
            format!("worker {} already has a verification call in progress", call.worker_id)
        })
    })?;
    Ok(())
}

/// Internal row type for sqlx::FromRow.
#[derive(sqlx::FromRow)]
struct CallRow {
    id: Uuid,
    worker_id: Uuid,
    telefono_destino: String,
    estado: String,
    contacto_exitoso: bool,
    checklist_completado: bool,
    programada_para: Option<DateTime<Utc>>,
    iniciada_at: Option<DateTime<Utc>>,
    finalizada_at: Option<DateTime<Utc>>,
    duracion_segundos: Option<i32>,
    motivo_fallo: Option<String>,
    run_id: Option<String>,
    recording_url: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl CallRow {
    fn try_into_call(self) -> Result<CallSession> {
        Ok(CallSession {
            id: CallId(self.id),
            worker_id: WorkerId(self.worker_id),
            phone: self.telefono_destino,
            state: self.estado.parse()?,
            contact_made: self.contacto_exitoso,
            checklist_completed: self.checklist_completado,
            scheduled_for: self.programada_para,
            started_at: self.iniciada_at,
            ended_at: self.finalizada_at,
            duration_secs: self.duracion_segundos,
            failure_reason: self.motivo_fallo,
            run_id: self.run_id,
            recording_url: self.recording_url,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}
