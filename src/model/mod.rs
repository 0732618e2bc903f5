//! Core data model for the PRL check-in subsystem.
//!
//! Shifts group workers for a plant and date. Each worker carries a checklist
//! status driven by verification calls (call sessions) and checklist records.

pub mod call;
pub mod checklist;
pub mod shift;
pub mod stats;
pub mod worker;

pub use call::{CallFilter, CallSession, CallState};
pub use checklist::{Checklist, NewChecklist};
pub use shift::{NewShift, Shift, ShiftState};
pub use stats::ShiftStats;
pub use worker::{ChecklistState, NewWorker, Priority, Worker, WorkerDetail, WorkerFilter};

use serde::{Deserialize, Serialize};
use uuid::Uuid;

// ---------------------------------------------------------------------------
// Identifiers
// ---------------------------------------------------------------------------

macro_rules! id_newtype {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(pub Uuid);

        impl $name {
            pub fn new() -> Self {
                Self(Uuid::new_v4())
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::new()
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl std::str::FromStr for $name {
            type Err = crate::error::Error;

            fn from_str(s: &str) -> crate::error::Result<Self> {
                Uuid::parse_str(s).map(Self).map_err(|e| {
                    crate::error::Error::InvalidInput(format!(
                        "bad {} '{s}': {e}",
                        stringify!($name)
                    ))
                })
            }
        }
    };
}

id_newtype!(
    /// Shift identifier.
    ShiftId
);
id_newtype!(
    /// Worker identifier.
    WorkerId
);
id_newtype!(
    /// Call session identifier.
    CallId
);
id_newtype!(
    /// Checklist identifier.
    ChecklistId
);

/// Parse a wire label into one of the model enums.
///
/// The labels are the uppercase Spanish strings the dashboard and the
/// database use (`"EN_CURSO"`, `"CRITICA"`, ...).
pub(crate) fn parse_label<T: Copy>(
    kind: &str,
    value: &str,
    table: &[(&str, T)],
) -> crate::error::Result<T> {
    table
        .iter()
        .find(|(label, _)| *label == value)
        .map(|(_, v)| *v)
        .ok_or_else(|| crate::error::Error::InvalidInput(format!("unknown {kind}: {value}")))
}
