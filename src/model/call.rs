//! Call sessions: one verification-call attempt against a worker.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{CallId, WorkerId};

/// A single verification call and its outcome.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CallSession {
    pub id: CallId,
    pub worker_id: WorkerId,
    #[serde(rename = "telefono_destino")]
    pub phone: String,
    #[serde(rename = "estado")]
    pub state: CallState,
    /// Set optimistically to `true` when the call starts; the callback may
    /// overwrite it.
    #[serde(rename = "contacto_exitoso")]
    pub contact_made: bool,
    #[serde(rename = "checklist_completado")]
    pub checklist_completed: bool,
    #[serde(rename = "programada_para")]
    pub scheduled_for: Option<DateTime<Utc>>,
    #[serde(rename = "iniciada_at")]
    pub started_at: Option<DateTime<Utc>>,
    #[serde(rename = "finalizada_at")]
    pub ended_at: Option<DateTime<Utc>>,
    #[serde(rename = "duracion_segundos")]
    pub duration_secs: Option<i32>,
    #[serde(rename = "motivo_fallo")]
    pub failure_reason: Option<String>,
    /// Execution id on the external voice platform.
    pub run_id: Option<String>,
    pub recording_url: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl CallSession {
    pub fn is_open(&self) -> bool {
        !self.state.is_terminal()
    }
}

/// Lifecycle state of a call session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CallState {
    #[serde(rename = "EN_CURSO")]
    InProgress,
    #[serde(rename = "COMPLETADA")]
    Completed,
    #[serde(rename = "FALLIDA")]
    Failed,
    #[serde(rename = "NO_RESPONDE")]
    NoAnswer,
}

impl CallState {
    const LABELS: [(&'static str, CallState); 4] = [
        ("EN_CURSO", CallState::InProgress),
        ("COMPLETADA", CallState::Completed),
        ("FALLIDA", CallState::Failed),
        ("NO_RESPONDE", CallState::NoAnswer),
    ];

    pub fn is_terminal(self) -> bool {
        !matches!(self, CallState::InProgress)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            CallState::InProgress => "EN_CURSO",
            CallState::Completed => "COMPLETADA",
            CallState::Failed => "FALLIDA",
            CallState::NoAnswer => "NO_RESPONDE",
        }
    }
}

impl std::fmt::Display for CallState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for CallState {
    type Err = crate::error::Error;

    fn from_str(s: &str) -> crate::error::Result<Self> {
        super::parse_label("call state", s, &Self::LABELS)
    }
}

/// Filters for call history listings.
#[derive(Debug, Clone)]
pub struct CallFilter {
    pub worker_id: Option<WorkerId>,
    pub state: Option<CallState>,
    pub limit: i64,
}

impl CallFilter {
    pub const DEFAULT_LIMIT: i64 = 50;

    pub(crate) fn matches(&self, call: &CallSession) -> bool {
        self.worker_id.is_none_or(|id| call.worker_id == id)
            && self.state.is_none_or(|state| call.state == state)
    }
}

impl Default for CallFilter {
    fn default() -> Self {
        Self {
            worker_id: None,
            state: None,
            limit: Self::DEFAULT_LIMIT,
        }
    }
}
