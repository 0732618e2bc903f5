//! Workers and their checklist status.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{CallSession, Checklist, ShiftId, WorkerId};

/// A worker assigned to a shift and due a safety check-in.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Worker {
    pub id: WorkerId,
    pub shift_id: ShiftId,
    #[serde(rename = "nombre_completo")]
    pub full_name: String,
    pub employee_id: String,
    #[serde(rename = "empresa")]
    pub company: String,
    #[serde(rename = "tipo_trabajo")]
    pub task_type: String,
    #[serde(rename = "descripcion_tarea")]
    pub task_description: String,
    #[serde(rename = "ubicacion_trabajo")]
    pub work_location: String,
    #[serde(rename = "prioridad")]
    pub priority: Priority,
    #[serde(rename = "checklist_estado")]
    pub checklist_state: ChecklistState,
    /// Verification calls started for this worker. Never decreases.
    #[serde(rename = "llamadas_intentadas")]
    pub call_attempts: u32,
    #[serde(rename = "ultima_llamada_at")]
    pub last_call_at: Option<DateTime<Utc>>,
    #[serde(rename = "checklist_completado_at")]
    pub checklist_completed_at: Option<DateTime<Utc>>,
    #[serde(rename = "riesgos_identificados")]
    pub identified_risks: Vec<String>,
    #[serde(rename = "telefono")]
    pub phone: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

// ---------------------------------------------------------------------------
// Priority
// ---------------------------------------------------------------------------

/// Task priority. Ordering puts the most urgent first: `Critica < Alta < ...`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Priority {
    #[serde(rename = "CRITICA")]
    Critica,
    #[serde(rename = "ALTA")]
    Alta,
    #[serde(rename = "NORMAL")]
    Normal,
    #[serde(rename = "BAJA")]
    Baja,
}

impl Priority {
    const LABELS: [(&'static str, Priority); 4] = [
        ("CRITICA", Priority::Critica),
        ("ALTA", Priority::Alta),
        ("NORMAL", Priority::Normal),
        ("BAJA", Priority::Baja),
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Priority::Critica => "CRITICA",
            Priority::Alta => "ALTA",
            Priority::Normal => "NORMAL",
            Priority::Baja => "BAJA",
        }
    }

    /// ALTA and CRITICA workers raise an alert while still pending.
    pub fn is_high(self) -> bool {
        matches!(self, Priority::Alta | Priority::Critica)
    }
}

impl std::fmt::Display for Priority {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Priority {
    type Err = crate::error::Error;

    fn from_str(s: &str) -> crate::error::Result<Self> {
        super::parse_label("priority", s, &Self::LABELS)
    }
}

// ---------------------------------------------------------------------------
// Checklist state
// ---------------------------------------------------------------------------

/// Checklist status of a worker, driven by the verification workflow.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ChecklistState {
    /// Waiting for a verification call.
    #[serde(rename = "PENDIENTE")]
    Pending,
    /// A call session is open.
    #[serde(rename = "EN_CURSO")]
    InProgress,
    /// Checklist recorded.
    #[serde(rename = "COMPLETADO")]
    Completed,
    /// Attempt ceiling reached without contact. Accepts a manual re-trigger.
    #[serde(rename = "NO_CONTACTADO")]
    Unreachable,
}

impl ChecklistState {
    pub const ALL: [ChecklistState; 4] = [
        ChecklistState::Pending,
        ChecklistState::InProgress,
        ChecklistState::Completed,
        ChecklistState::Unreachable,
    ];

    const LABELS: [(&'static str, ChecklistState); 4] = [
        ("PENDIENTE", ChecklistState::Pending),
        ("EN_CURSO", ChecklistState::InProgress),
        ("COMPLETADO", ChecklistState::Completed),
        ("NO_CONTACTADO", ChecklistState::Unreachable),
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            ChecklistState::Pending => "PENDIENTE",
            ChecklistState::InProgress => "EN_CURSO",
            ChecklistState::Completed => "COMPLETADO",
            ChecklistState::Unreachable => "NO_CONTACTADO",
        }
    }
}

impl std::fmt::Display for ChecklistState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for ChecklistState {
    type Err = crate::error::Error;

    fn from_str(s: &str) -> crate::error::Result<Self> {
        super::parse_label("checklist state", s, &Self::LABELS)
    }
}

// ---------------------------------------------------------------------------
// Registration and queries
// ---------------------------------------------------------------------------

/// Parameters for registering a worker on a shift.
#[derive(Debug, Clone, Deserialize)]
pub struct NewWorker {
    pub shift_id: ShiftId,
    #[serde(rename = "nombre_completo")]
    pub full_name: String,
    pub employee_id: String,
    #[serde(rename = "empresa", default)]
    pub company: String,
    #[serde(rename = "tipo_trabajo")]
    pub task_type: String,
    #[serde(rename = "descripcion_tarea", default)]
    pub task_description: String,
    #[serde(rename = "ubicacion_trabajo", default)]
    pub work_location: String,
    #[serde(rename = "prioridad")]
    pub priority: Priority,
    #[serde(rename = "riesgos_identificados", default)]
    pub identified_risks: Vec<String>,
    #[serde(rename = "telefono")]
    pub phone: String,
}

impl NewWorker {
    pub fn new(
        shift_id: ShiftId,
        full_name: impl Into<String>,
        employee_id: impl Into<String>,
        phone: impl Into<String>,
    ) -> Self {
        Self {
            shift_id,
            full_name: full_name.into(),
            employee_id: employee_id.into(),
            company: String::new(),
            task_type: String::new(),
            task_description: String::new(),
            work_location: String::new(),
            priority: Priority::Normal,
            identified_risks: Vec::new(),
            phone: phone.into(),
        }
    }

    pub fn company(mut self, company: impl Into<String>) -> Self {
        self.company = company.into();
        self
    }

    pub fn task(mut self, task_type: impl Into<String>, description: impl Into<String>) -> Self {
        self.task_type = task_type.into();
        self.task_description = description.into();
        self
    }

    pub fn location(mut self, location: impl Into<String>) -> Self {
        self.work_location = location.into();
        self
    }

    pub fn priority(mut self, priority: Priority) -> Self {
        self.priority = priority;
        self
    }

    pub fn risk(mut self, risk: impl Into<String>) -> Self {
        self.identified_risks.push(risk.into());
        self
    }
}

/// Filters for worker listings.
#[derive(Debug, Clone, Default)]
pub struct WorkerFilter {
    pub shift_id: Option<ShiftId>,
    pub checklist_state: Option<ChecklistState>,
}

impl WorkerFilter {
    pub(crate) fn matches(&self, worker: &Worker) -> bool {
        self.shift_id.is_none_or(|id| worker.shift_id == id)
            && self
                .checklist_state
                .is_none_or(|state| worker.checklist_state == state)
    }
}

/// A worker together with its call and checklist history, newest first.
#[derive(Debug, Clone, Serialize)]
pub struct WorkerDetail {
    pub worker: Worker,
    pub calls: Vec<CallSession>,
    pub checklists: Vec<Checklist>,
}
