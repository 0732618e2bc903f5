//! Inbound request shapes, as delivered by the HTTP layer and the voice
//! platform's webhook. Field names follow the wire format.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::config::WorkflowSettings;
use crate::error::{Error, Result};
use crate::model::{CallSession, CallState, NewChecklist, WorkerId};

/// `POST /calls/initiate`
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct InitiateCallRequest {
    pub worker_id: Option<WorkerId>,
}

impl InitiateCallRequest {
    pub fn for_worker(worker_id: WorkerId) -> Self {
        Self {
            worker_id: Some(worker_id),
        }
    }

    pub(crate) fn validate(&self) -> Result<WorkerId> {
        self.worker_id
            .ok_or_else(|| Error::InvalidInput("worker_id is required".to_string()))
    }
}

/// `POST /calls/:id/update`: the voice platform's callback.
///
/// Every field is optional; absent fields keep their stored value.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CallUpdateRequest {
    pub estado: Option<CallState>,
    pub contacto_exitoso: Option<bool>,
    pub checklist_completado: Option<bool>,
    pub duracion_segundos: Option<i32>,
    pub motivo_fallo: Option<String>,
    pub run_id: Option<String>,
    pub recording_url: Option<String>,
    /// Answers captured during the call, stored with the resulting checklist.
    pub respuestas: Option<serde_json::Value>,
}

impl CallUpdateRequest {
    pub fn with_state(state: CallState) -> Self {
        Self {
            estado: Some(state),
            ..Self::default()
        }
    }

    pub fn checklist_completed(mut self, done: bool) -> Self {
        self.checklist_completado = Some(done);
        self
    }

    /// Merge present fields into `call`. Returns whether the session was open
    /// before the merge.
    ///
    /// `ended_at` is stamped only when an open session moves into a terminal
    /// state, so a late callback never rewrites the original end time. A
    /// closed session is never moved back to EN_CURSO.
    pub(crate) fn merge_into(&self, call: &mut CallSession, now: DateTime<Utc>) -> bool {
        let was_open = call.is_open();

        match self.estado {
            Some(state) if was_open || state.is_terminal() => call.state = state,
            _ => {}
        }
        if let Some(contact) = self.contacto_exitoso {
            call.contact_made = contact;
        }
        if let Some(done) = self.checklist_completado {
            call.checklist_completed = done;
        }
        if let Some(secs) = self.duracion_segundos {
            call.duration_secs = Some(secs);
        }
        if let Some(ref reason) = self.motivo_fallo {
            call.failure_reason = Some(reason.clone());
        }
        if let Some(ref run_id) = self.run_id {
            call.run_id = Some(run_id.clone());
        }
        if let Some(ref url) = self.recording_url {
            call.recording_url = Some(url.clone());
        }
        if was_open && call.state.is_terminal() {
            call.ended_at = Some(now);
        }
        call.updated_at = now;

        was_open
    }

    /// Checklist row written when this report completes the call with the
    /// checklist captured.
    pub(crate) fn call_checklist(
        &self,
        call: &CallSession,
        settings: &WorkflowSettings,
    ) -> NewChecklist {
        let answers = self
            .respuestas
            .clone()
            .unwrap_or_else(|| serde_json::json!({}));
        NewChecklist {
            worker_id: call.worker_id,
            call_id: Some(call.id),
            duration_secs: call.duration_secs,
            answers,
            outcome: Some(call.state.to_string()),
            observations: None,
            incidents_detected: false,
            method: settings.default_method.clone(),
            verified_by: settings.default_verifier.clone(),
        }
    }
}

/// `POST /checklists`: direct checklist submission.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RecordChecklistRequest {
    pub worker_id: Option<WorkerId>,
    pub respuestas: Option<serde_json::Value>,
    pub estado: Option<String>,
    pub observaciones: Option<String>,
    pub incidencias_detectadas: Option<bool>,
    pub metodo: Option<String>,
    pub verificado_por: Option<String>,
    pub duracion_segundos: Option<i32>,
}

impl RecordChecklistRequest {
    pub fn new(worker_id: WorkerId, answers: serde_json::Value) -> Self {
        Self {
            worker_id: Some(worker_id),
            respuestas: Some(answers),
            ..Self::default()
        }
    }

    /// Check required fields and fill defaults from `settings`.
    pub(crate) fn validate(self, settings: &WorkflowSettings) -> Result<NewChecklist> {
        let mut missing = Vec::new();
        if self.worker_id.is_none() {
            missing.push("worker_id");
        }
        // An explicit JSON null counts as missing.
        let answers = self.respuestas.filter(|v| !v.is_null());
        if answers.is_none() {
            missing.push("respuestas");
        }
        let (Some(worker_id), Some(answers)) = (self.worker_id, answers) else {
            return Err(Error::InvalidInput(format!(
                "missing required fields: {}",
                missing.join(", ")
            )));
        };

        Ok(NewChecklist {
            worker_id,
            call_id: None,
            duration_secs: self.duracion_segundos,
            answers,
            outcome: self.estado,
            observations: self.observaciones,
            incidents_detected: self.incidencias_detectadas.unwrap_or(false),
            method: self
                .metodo
                .unwrap_or_else(|| settings.default_method.clone()),
            verified_by: self
                .verificado_por
                .unwrap_or_else(|| settings.default_verifier.clone()),
        })
    }
}
