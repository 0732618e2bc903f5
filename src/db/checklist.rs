//! Checklist rows. Append-only.

use chrono::{DateTime, Utc};
use sqlx::PgConnection;
use uuid::Uuid;

use crate::error::Result;
use crate::model::{CallId, Checklist, ChecklistId, WorkerId};

impl super::Db {
    /// Checklists for a worker, newest first.
    pub async fn list_checklists(&self, worker_id: WorkerId) -> Result<Vec<Checklist>> {
        let rows: Vec<ChecklistRow> = sqlx::query_as(
            "SELECT id, worker_id, call_id, completado_at, duracion_segundos, respuestas, estado, observaciones, incidencias_detectadas, metodo, verificado_por, created_at
             FROM prl_safety_checklists
             WHERE worker_id = $1
             ORDER BY created_at DESC",
        )
        .bind(worker_id.0)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.into_iter().map(Checklist::from).collect())
    }
}

pub(super) async fn insert_checklist(conn: &mut PgConnection, checklist: &Checklist) -> Result<()> {
    sqlx::query(
        "INSERT INTO prl_safety_checklists (id, worker_id, call_id, completado_at, duracion_segundos, respuestas, estado, observaciones, incidencias_detectadas, metodo, verificado_por, created_at)
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)",
    )
    .bind(checklist.id.0)
    .bind(checklist.worker_id.0)
    .bind(checklist.call_id.map(|id| id.0))
    .bind(checklist.completed_at)
    .bind(checklist.duration_secs)
    .bind(&checklist.answers)
    .bind(&checklist.outcome)
    .bind(&checklist.observations)
    .bind(checklist.incidents_detected)
    .bind(&checklist.method)
    .bind(&checklist.verified_by)
    .bind(checklist.created_at)
    .execute(&mut *conn)
    .await?;
    Ok(())
}

/// Internal row type for sqlx::FromRow.
#[derive(sqlx::FromRow)]
struct ChecklistRow {
    id: Uuid,
    worker_id: Uuid,
    call_id: Option<Uuid>,
    completado_at: DateTime<Utc>,
    duracion_segundos: Option<i32>,
    respuestas: serde_json::Value,
    estado: Option<String>,
    observaciones: Option<String>,
    incidencias_detectadas: bool,
    metodo: String,
    verificado_por: String,
    created_at: DateTime<Utc>,
}

impl From<ChecklistRow> for Checklist {
    fn from(row: ChecklistRow) -> Self {
        Self {
            id: ChecklistId(row.id),
            worker_id: WorkerId(row.worker_id),
            call_id: row.call_id.map(CallId),
            completed_at: row.completado_at,
            duration_secs: row.duracion_segundos,
            answers: row.respuestas,
            outcome: row.estado,
            observations: row.observaciones,
            incidents_detected: row.incidencias_detectadas,
            method: row.metodo,
            verified_by: row.verificado_por,
            created_at: row.created_at,
        }
    }
}
