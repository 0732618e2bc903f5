//! Per-shift aggregate stats, recomputed on every read.

use serde::{Deserialize, Serialize};

use super::{ChecklistState, Priority, Worker};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShiftStats {
    #[serde(rename = "total_trabajadores")]
    pub total: i64,
    #[serde(rename = "completados")]
    pub completed: i64,
    #[serde(rename = "pendientes")]
    pub pending: i64,
    #[serde(rename = "en_curso")]
    pub in_progress: i64,
    #[serde(rename = "no_contactados")]
    pub unreachable: i64,
    #[serde(rename = "trabajos_criticos")]
    pub critical: i64,
    /// Pending workers with ALTA or CRITICA priority.
    #[serde(rename = "alertas")]
    pub alerts: i64,
}

impl ShiftStats {
    pub fn from_workers<'a>(workers: impl IntoIterator<Item = &'a Worker>) -> Self {
        workers.into_iter().fold(Self::default(), |mut stats, w| {
            stats.total += 1;
            match w.checklist_state {
                ChecklistState::Completed => stats.completed += 1,
                ChecklistState::Pending => stats.pending += 1,
                ChecklistState::InProgress => stats.in_progress += 1,
                ChecklistState::Unreachable => stats.unreachable += 1,
            }
            if w.priority == Priority::Critica {
                stats.critical += 1;
            }
            if w.checklist_state == ChecklistState::Pending && w.priority.is_high() {
                stats.alerts += 1;
            }
            stats
        })
    }
}
