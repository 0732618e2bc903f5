//! Worker rows.

use chrono::{DateTime, Utc};
use sqlx::PgConnection;
use uuid::Uuid;

use super::constraint_error;
use crate::error::{Error, Result};
use crate::model::{NewWorker, ShiftId, Worker, WorkerFilter, WorkerId};

pub(super) const WORKER_COLUMNS: &str = "id, shift_id, nombre_completo, employee_id, empresa, tipo_trabajo, descripcion_tarea, ubicacion_trabajo, prioridad, checklist_estado, llamadas_intentadas, ultima_llamada_at, checklist_completado_at, riesgos_identificados, telefono, created_at, updated_at";

impl super::Db {
    /// Register a worker on an existing shift, in state PENDIENTE.
    pub async fn create_worker(&self, new: NewWorker) -> Result<Worker> {
        let shift_id = new.shift_id;
        let row: WorkerRow = sqlx::query_as(&format!(
            "INSERT INTO prl_workers (id, shift_id, nombre_completo, employee_id, empresa, tipo_trabajo, descripcion_tarea, ubicacion_trabajo, prioridad, checklist_estado, llamadas_intentadas, riesgos_identificados, telefono, created_at, updated_at)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, 'PENDIENTE', 0, $10, $11, now(), now())
             RETURNING {WORKER_COLUMNS}"
        ))
        .bind(Uuid::new_v4())
        .bind(new.shift_id.0)
        .bind(&new.full_name)
        .bind(&new.employee_id)
        .bind(&new.company)
        .bind(&new.task_type)
        .bind(&new.task_description)
        .bind(&new.work_location)
        .bind(new.priority.as_str())
        .bind(&new.identified_risks)
        .bind(&new.phone)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| constraint_error(e, || format!("shift {shift_id}")))?;
        row.try_into_worker()
    }

    pub async fn get_worker(&self, id: WorkerId) -> Result<Worker> {
        let row: Option<WorkerRow> = sqlx::query_as(&format!(
            "SELECT {WORKER_COLUMNS} FROM prl_workers WHERE id = $1"
        ))
        .bind(id.0)
        .fetch_optional(&self.pool)
        .await?;
        row.ok_or_else(|| Error::NotFound(format!("worker {id}")))?
            .try_into_worker()
    }

    /// Workers matching the filter, most urgent first, then by name.
    pub async fn list_workers(&self, filter: &WorkerFilter) -> Result<Vec<Worker>> {
        let rows: Vec<WorkerRow> = sqlx::query_as(&format!(
            "SELECT {WORKER_COLUMNS} FROM prl_workers
             WHERE ($1::uuid IS NULL OR shift_id = $1)
             AND ($2::text IS NULL OR checklist_estado = $2)
             ORDER BY
                CASE prioridad
                    WHEN 'CRITICA' THEN 1
                    WHEN 'ALTA' THEN 2
                    WHEN 'NORMAL' THEN 3
                    ELSE 4
                END,
                nombre_completo ASC"
        ))
        .bind(filter.shift_id.map(|id| id.0))
        .bind(filter.checklist_state.map(|s| s.as_str()))
        .fetch_all(&self.pool)
        .await?;
        rows.into_iter().map(WorkerRow::try_into_worker).collect()
    }
}

/// Lock the worker row for the rest of the transaction.
pub(super) async fn lock_worker(conn: &mut PgConnection, id: WorkerId) -> Result<Worker> {
    let row: Option<WorkerRow> = sqlx::query_as(&format!(
        "SELECT {WORKER_COLUMNS} FROM prl_workers WHERE id = $1 FOR UPDATE"
    ))
    .bind(id.0)
    .fetch_optional(&mut *conn)
    .await?;
    row.ok_or_else(|| Error::NotFound(format!("worker {id}")))?
        .try_into_worker()
}

/// Write back the workflow-owned fields of a worker.
pub(super) async fn write_worker_state(conn: &mut PgConnection, worker: &Worker) -> Result<()> {
    sqlx::query(
        "UPDATE prl_workers
         SET checklist_estado = $1, llamadas_intentadas = $2, ultima_llamada_at = $3,
             checklist_completado_at = $4, updated_at = $5
         WHERE id = $6",
    )
    .bind(worker.checklist_state.as_str())
    .bind(i32::try_from(worker.call_attempts).unwrap_or(i32::MAX))
    .bind(worker.last_call_at)
    .bind(worker.checklist_completed_at)
    .bind(worker.updated_at)
    .bind(worker.id.0)
    .execute(&mut *conn)
    .await?;
    Ok(())
}

/// Internal row type for sqlx::FromRow.
#[derive(sqlx::FromRow)]
struct WorkerRow {
    id: Uuid,
    shift_id: Uuid,
    nombre_completo: String,
    employee_id: String,
    empresa: String,
    tipo_trabajo: String,
    descripcion_tarea: String,
    ubicacion_trabajo: String,
    prioridad: String,
    checklist_estado: String,
    llamadas_intentadas: i32,
    ultima_llamada_at: Option<DateTime<Utc>>,
    checklist_completado_at: Option<DateTime<Utc>>,
    riesgos_identificados: Vec<String>,
    telefono: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl WorkerRow {
    fn try_into_worker(self) -> Result<Worker> {
        Ok(Worker {
            id: WorkerId(self.id),
            shift_id: ShiftId(self.shift_id),
            full_name: self.nombre_completo,
            employee_id: self.employee_id,
            company: self.empresa,
            task_type: self.tipo_trabajo,
            task_description: self.descripcion_tarea,
            work_location: self.ubicacion_trabajo,
            priority: self.prioridad.parse()?,
            checklist_state: self.checklist_estado.parse()?,
            call_attempts: self.llamadas_intentadas.max(0) as u32,
            last_call_at: self.ultima_llamada_at,
            checklist_completed_at: self.checklist_completado_at,
            identified_risks: self.riesgos_identificados,
            phone: self.telefono,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}
