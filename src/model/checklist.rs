//! Safety checklists recorded for a worker.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{CallId, ChecklistId, WorkerId};

pub const DEFAULT_METHOD: &str = "LLAMADA_TELEFONICA";
pub const DEFAULT_VERIFIER: &str = "Sistema Automatizado PRL";

/// A completed safety checklist. Rows are append-only.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Checklist {
    pub id: ChecklistId,
    pub worker_id: WorkerId,
    /// The call that captured this checklist, if it came from a call outcome.
    pub call_id: Option<CallId>,
    #[serde(rename = "completado_at")]
    pub completed_at: DateTime<Utc>,
    #[serde(rename = "duracion_segundos")]
    pub duration_secs: Option<i32>,
    /// The worker's answers, stored exactly as submitted.
    #[serde(rename = "respuestas")]
    pub answers: serde_json::Value,
    #[serde(rename = "estado")]
    pub outcome: Option<String>,
    #[serde(rename = "observaciones")]
    pub observations: Option<String>,
    #[serde(rename = "incidencias_detectadas")]
    pub incidents_detected: bool,
    #[serde(rename = "metodo")]
    pub method: String,
    #[serde(rename = "verificado_por")]
    pub verified_by: String,
    pub created_at: DateTime<Utc>,
}

/// Parameters for persisting a checklist.
#[derive(Debug, Clone)]
pub struct NewChecklist {
    pub worker_id: WorkerId,
    pub call_id: Option<CallId>,
    pub duration_secs: Option<i32>,
    pub answers: serde_json::Value,
    pub outcome: Option<String>,
    pub observations: Option<String>,
    pub incidents_detected: bool,
    pub method: String,
    pub verified_by: String,
}

impl NewChecklist {
    pub fn new(worker_id: WorkerId, answers: serde_json::Value) -> Self {
        Self {
            worker_id,
            call_id: None,
            duration_secs: None,
            answers,
            outcome: None,
            observations: None,
            incidents_detected: false,
            method: DEFAULT_METHOD.to_string(),
            verified_by: DEFAULT_VERIFIER.to_string(),
        }
    }

    pub(crate) fn into_checklist(self, now: DateTime<Utc>) -> Checklist {
        Checklist {
            id: ChecklistId::new(),
            worker_id: self.worker_id,
            call_id: self.call_id,
            completed_at: now,
            duration_secs: self.duration_secs,
            answers: self.answers,
            outcome: self.outcome,
            observations: self.observations,
            incidents_detected: self.incidents_detected,
            method: self.method,
            verified_by: self.verified_by,
            created_at: now,
        }
    }
}
