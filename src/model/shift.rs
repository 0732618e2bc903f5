//! Shifts: a scheduled work period at a plant.

use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use serde::{Deserialize, Serialize};

use super::ShiftId;

/// A shift groups the workers of one plant for one date.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Shift {
    pub id: ShiftId,
    #[serde(rename = "planta")]
    pub plant: String,
    /// Human label, e.g. "Turno de mañana".
    #[serde(rename = "nombre")]
    pub label: String,
    #[serde(rename = "hora_inicio")]
    pub starts_at: NaiveTime,
    #[serde(rename = "hora_fin")]
    pub ends_at: NaiveTime,
    pub supervisor: String,
    #[serde(rename = "fecha")]
    pub date: NaiveDate,
    #[serde(rename = "estado")]
    pub state: ShiftState,
    pub created_at: DateTime<Utc>,
}

/// Lifecycle of a shift.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ShiftState {
    #[serde(rename = "ACTIVO")]
    Active,
    #[serde(rename = "CERRADO")]
    Closed,
}

impl ShiftState {
    const LABELS: [(&'static str, ShiftState); 2] =
        [("ACTIVO", ShiftState::Active), ("CERRADO", ShiftState::Closed)];

    pub fn as_str(self) -> &'static str {
        match self {
            ShiftState::Active => "ACTIVO",
            ShiftState::Closed => "CERRADO",
        }
    }
}

impl std::fmt::Display for ShiftState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for ShiftState {
    type Err = crate::error::Error;

    fn from_str(s: &str) -> crate::error::Result<Self> {
        super::parse_label("shift state", s, &Self::LABELS)
    }
}

/// Parameters for registering a shift.
#[derive(Debug, Clone, Deserialize)]
pub struct NewShift {
    #[serde(rename = "planta")]
    pub plant: String,
    #[serde(rename = "nombre")]
    pub label: String,
    #[serde(rename = "hora_inicio")]
    pub starts_at: NaiveTime,
    #[serde(rename = "hora_fin")]
    pub ends_at: NaiveTime,
    pub supervisor: String,
    #[serde(rename = "fecha")]
    pub date: NaiveDate,
}

impl NewShift {
    pub fn new(
        plant: impl Into<String>,
        label: impl Into<String>,
        supervisor: impl Into<String>,
        date: NaiveDate,
        starts_at: NaiveTime,
        ends_at: NaiveTime,
    ) -> Self {
        Self {
            plant: plant.into(),
            label: label.into(),
            starts_at,
            ends_at,
            supervisor: supervisor.into(),
            date,
        }
    }
}
