//! Shift rows and per-shift stats.

use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use uuid::Uuid;

use crate::error::{Error, Result};
use crate::model::{NewShift, Shift, ShiftId, ShiftStats};

const SHIFT_COLUMNS: &str =
    "id, planta, nombre, hora_inicio, hora_fin, supervisor, fecha, estado, created_at";

impl super::Db {
    /// Register a shift in state ACTIVO.
    pub async fn create_shift(&self, new: NewShift) -> Result<Shift> {
        let row: ShiftRow = sqlx::query_as(&format!(
            "INSERT INTO prl_shifts (id, planta, nombre, hora_inicio, hora_fin, supervisor, fecha, estado, created_at)
             VALUES ($1, $2, $3, $4, $5, $6, $7, 'ACTIVO', now())
             RETURNING {SHIFT_COLUMNS}"
        ))
        .bind(Uuid::new_v4())
        .bind(&new.plant)
        .bind(&new.label)
        .bind(new.starts_at)
        .bind(new.ends_at)
        .bind(&new.supervisor)
        .bind(new.date)
        .fetch_one(&self.pool)
        .await?;
        row.try_into_shift()
    }

    pub async fn get_shift(&self, id: ShiftId) -> Result<Shift> {
        let row: Option<ShiftRow> =
            sqlx::query_as(&format!("SELECT {SHIFT_COLUMNS} FROM prl_shifts WHERE id = $1"))
                .bind(id.0)
                .fetch_optional(&self.pool)
                .await?;
        row.ok_or_else(|| Error::NotFound(format!("shift {id}")))?
            .try_into_shift()
    }

    /// ACTIVO shifts for a date, newest first.
    pub async fn active_shifts(&self, date: NaiveDate) -> Result<Vec<Shift>> {
        let rows: Vec<ShiftRow> = sqlx::query_as(&format!(
            "SELECT {SHIFT_COLUMNS} FROM prl_shifts
             WHERE estado = 'ACTIVO' AND fecha = $1
             ORDER BY created_at DESC"
        ))
        .bind(date)
        .fetch_all(&self.pool)
        .await?;
        rows.into_iter().map(ShiftRow::try_into_shift).collect()
    }

    /// ACTIVO → CERRADO.
    pub async fn close_shift(&self, id: ShiftId) -> Result<Shift> {
        let row: Option<ShiftRow> = sqlx::query_as(&format!(
            "UPDATE prl_shifts SET estado = 'CERRADO'
             WHERE id = $1 AND estado = 'ACTIVO'
             RETURNING {SHIFT_COLUMNS}"
        ))
        .bind(id.0)
        .fetch_optional(&self.pool)
        .await?;

        match row {
            Some(row) => row.try_into_shift(),
            None => {
                // Either missing or already closed; tell them apart.
                self.get_shift(id).await?;
                Err(Error::Conflict(format!("shift {id} is already closed")))
            }
        }
    }

    /// Aggregate counts over the shift's workers.
    pub async fn shift_stats(&self, id: ShiftId) -> Result<ShiftStats> {
        let (total, completed, pending, in_progress, unreachable, critical, alerts): (
            i64,
            i64,
            i64,
            i64,
            i64,
            i64,
            i64,
        ) = sqlx::query_as(
            "SELECT
                COUNT(*),
                COUNT(*) FILTER (WHERE checklist_estado = 'COMPLETADO'),
                COUNT(*) FILTER (WHERE checklist_estado = 'PENDIENTE'),
                COUNT(*) FILTER (WHERE checklist_estado = 'EN_CURSO'),
                COUNT(*) FILTER (WHERE checklist_estado = 'NO_CONTACTADO'),
                COUNT(*) FILTER (WHERE prioridad = 'CRITICA'),
                COUNT(*) FILTER (WHERE checklist_estado = 'PENDIENTE' AND prioridad IN ('ALTA', 'CRITICA'))
             FROM prl_workers
             WHERE shift_id = $1",
        )
        .bind(id.0)
        .fetch_one(&self.pool)
        .await?;

        Ok(ShiftStats {
            total,
            completed,
            pending,
            in_progress,
            unreachable,
            critical,
            alerts,
        })
    }
}

/// Internal row type for sqlx::FromRow.
#[derive(sqlx::FromRow)]
struct ShiftRow {
    id: Uuid,
    planta: String,
    nombre: String,
    hora_inicio: NaiveTime,
    hora_fin: NaiveTime,
    supervisor: String,
    fecha: NaiveDate,
    estado: String,
    created_at: DateTime<Utc>,
}

impl ShiftRow {
    fn try_into_shift(self) -> Result<Shift> {
        Ok(Shift {
            id: ShiftId(self.id),
            plant: self.planta,
            label: self.nombre,
            starts_at: self.hora_inicio,
            ends_at: self.hora_fin,
            supervisor: self.supervisor,
            date: self.fecha,
            state: self.estado.parse()?,
            created_at: self.created_at,
        })
    }
}
