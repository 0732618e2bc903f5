//! Metric instrument factories.
//!
//! Instruments come from the globally registered `MeterProvider`; without one
//! they are no-ops.

use opentelemetry::metrics::{Counter, Histogram, Meter};

fn meter() -> Meter {
    opentelemetry::global::meter("gts-prl")
}

/// Counter: verification calls opened.
pub fn calls_initiated() -> Counter<u64> {
    meter()
        .u64_counter("prl.calls.initiated")
        .with_description("Verification calls opened")
        .build()
}

/// Counter: callbacks merged into call sessions.
/// Labels: `estado` (call state after the merge), `late` ("true" | "false").
pub fn call_reports() -> Counter<u64> {
    meter()
        .u64_counter("prl.calls.reports")
        .with_description("Call outcome callbacks processed")
        .build()
}

/// Counter: checklists persisted.
/// Labels: `source` ("call" | "direct").
pub fn checklists_recorded() -> Counter<u64> {
    meter()
        .u64_counter("prl.checklists.recorded")
        .with_description("Safety checklists recorded")
        .build()
}

/// Counter: worker checklist state transitions.
/// Labels: `from`, `to`.
pub fn worker_state_transitions() -> Counter<u64> {
    meter()
        .u64_counter("prl.worker.state_transitions")
        .with_description("Worker checklist state transitions")
        .build()
}

/// Counter: workflow operations rejected with a conflict.
/// Labels: `operation`.
pub fn conflicts() -> Counter<u64> {
    meter()
        .u64_counter("prl.workflow.conflicts")
        .with_description("Workflow operations rejected as conflicting")
        .build()
}

/// Histogram: workflow operation duration in milliseconds.
/// Labels: `operation`.
pub fn operation_duration_ms() -> Histogram<f64> {
    meter()
        .f64_histogram("prl.operation.duration_ms")
        .with_description("Workflow operation duration in milliseconds")
        .with_unit("ms")
        .build()
}
