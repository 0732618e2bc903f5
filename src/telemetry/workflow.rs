//! Span helpers for workflow operations.

use tracing::Span;

/// Start a span for one workflow operation.
///
/// `prl.worker.id` and `prl.worker.state` are declared empty: the call id is
/// all a callback carries, so the worker is only known once the store has
/// resolved it.
pub fn start_workflow_span(operation: &'static str, subject: &str) -> Span {
    tracing::info_span!(
        "prl.workflow",
        "prl.operation" = operation,
        "prl.subject" = subject,
        "prl.worker.id" = tracing::field::Empty,
        "prl.worker.state" = tracing::field::Empty,
    )
}

/// Record the worker a span ended up operating on.
pub fn record_worker(span: &Span, worker_id: &str) {
    span.record("prl.worker.id", worker_id);
}

/// Record a worker state transition on the span.
pub fn record_state_transition(span: &Span, from: &str, to: &str) {
    span.record("prl.worker.state", to);
    span.in_scope(|| {
        tracing::info!(from = from, to = to, "state_transition");
    });
}
