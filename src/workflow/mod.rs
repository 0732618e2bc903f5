//! Verification workflow: the public API for driving worker check-ins.
//!
//! Validates inbound requests, runs each trigger as one atomic store unit,
//! then records telemetry and publishes the matching real-time event. Events
//! go out only after the store has committed.

pub mod request;
pub mod transition;

use std::future::Future;
use std::time::Instant;

use chrono::Utc;
use opentelemetry::KeyValue;
use tracing::{Instrument, Span, info, warn};

use crate::config::WorkflowSettings;
use crate::error::{Error, Result};
use crate::event::{EventKind, Publisher};
use crate::model::*;
use crate::store::{CallReported, ChecklistRecorded, PrlStore};
use crate::telemetry::metrics;
use crate::telemetry::workflow::{record_state_transition, record_worker, start_workflow_span};

use request::{CallUpdateRequest, InitiateCallRequest, RecordChecklistRequest};
use transition::Step;

/// Result of starting a verification call.
#[derive(Debug, Clone)]
pub struct CallInitiation {
    pub call: CallSession,
    pub worker: Worker,
    /// Where the voice platform should post its callback.
    pub webhook_url: String,
}

pub struct Workflow<S, P> {
    store: S,
    publisher: P,
    settings: WorkflowSettings,
}

impl<S: PrlStore, P: Publisher> Workflow<S, P> {
    pub fn new(store: S, publisher: P) -> Self {
        Self::with_settings(store, publisher, WorkflowSettings::default())
    }

    pub fn with_settings(store: S, publisher: P, settings: WorkflowSettings) -> Self {
        Self {
            store,
            publisher,
            settings,
        }
    }

    /// The underlying store, for registry reads and registration.
    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn publisher(&self) -> &P {
        &self.publisher
    }

    pub fn settings(&self) -> &WorkflowSettings {
        &self.settings
    }

    // -----------------------------------------------------------------------
    // Triggers
    // -----------------------------------------------------------------------

    /// Open a verification call for a worker.
    ///
    /// The new session is marked `contacto_exitoso = true` before any outcome
    /// is known; the callback overwrites it.
    pub async fn initiate_call(&self, request: InitiateCallRequest) -> Result<CallInitiation> {
        let worker_id = request.validate()?;
        let span = start_workflow_span("initiate_call", &worker_id.to_string());
        record_worker(&span, &worker_id.to_string());

        let work = async {
            let started = self
                .store
                .start_call(worker_id, &self.settings.policy(), Utc::now())
                .await
                .inspect_err(|e| note_conflict("initiate_call", e))?;

            observe_step(&span, &started.step);
            metrics::calls_initiated().add(1, &[]);
            info!(
                call_id = %started.call.id,
                attempts = started.worker.call_attempts,
                "verification call initiated"
            );

            self.publisher.publish(EventKind::CallInitiated {
                call: started.call.clone(),
                worker: started.worker.clone(),
            });
            Ok(CallInitiation {
                call: started.call,
                worker: started.worker,
                webhook_url: self.settings.webhook_url.clone(),
            })
        };
        timed("initiate_call", work.instrument(span.clone())).await
    }

    /// Apply a callback from the voice platform to a call session.
    pub async fn report_call_outcome(
        &self,
        call_id: CallId,
        update: CallUpdateRequest,
    ) -> Result<CallReported> {
        let span = start_workflow_span("report_call_outcome", &call_id.to_string());

        let work = async {
            let reported = self
                .store
                .report_call(call_id, &update, &self.settings, Utc::now())
                .await?;

            record_worker(&span, &reported.worker.id.to_string());
            observe_step(&span, &reported.step);
            let late = !reported.session_was_open;
            metrics::call_reports().add(
                1,
                &[
                    KeyValue::new("estado", reported.call.state.as_str()),
                    KeyValue::new("late", late.to_string()),
                ],
            );
            if let Some(ref checklist) = reported.checklist {
                metrics::checklists_recorded().add(1, &[KeyValue::new("source", "call")]);
                info!(checklist_id = %checklist.id, "checklist captured by call");
            }
            info!(
                estado = %reported.call.state,
                worker_state = %reported.worker.checklist_state,
                "call outcome applied"
            );

            self.publisher.publish(EventKind::CallUpdated {
                call: reported.call.clone(),
                worker: reported.worker.clone(),
            });
            Ok(reported)
        };
        timed("report_call_outcome", work.instrument(span.clone())).await
    }

    /// Record a checklist submitted outside a call outcome.
    ///
    /// Always completes the worker, whatever its prior state.
    pub async fn record_checklist(
        &self,
        request: RecordChecklistRequest,
    ) -> Result<ChecklistRecorded> {
        let new = request.validate(&self.settings)?;
        let span = start_workflow_span("record_checklist", &new.worker_id.to_string());
        record_worker(&span, &new.worker_id.to_string());

        let work = async {
            let recorded = self
                .store
                .record_checklist(new, &self.settings.policy(), Utc::now())
                .await?;

            observe_step(&span, &recorded.step);
            metrics::checklists_recorded().add(1, &[KeyValue::new("source", "direct")]);
            if let Some(ref call) = recorded.closed_call {
                warn!(call_id = %call.id, "open call closed by direct checklist submission");
            }
            info!(checklist_id = %recorded.checklist.id, "checklist recorded");

            self.publisher.publish(EventKind::ChecklistCompleted {
                checklist: recorded.checklist.clone(),
                worker: recorded.worker.clone(),
            });
            Ok(recorded)
        };
        timed("record_checklist", work.instrument(span.clone())).await
    }

    // -----------------------------------------------------------------------
    // Reads
    // -----------------------------------------------------------------------

    /// Aggregate stats for a shift, recomputed now.
    pub async fn shift_stats(&self, shift_id: ShiftId) -> Result<ShiftStats> {
        self.store.shift_stats(shift_id).await
    }

    /// A worker with its full call and checklist history.
    pub async fn worker_detail(&self, worker_id: WorkerId) -> Result<WorkerDetail> {
        let worker = self.store.get_worker(worker_id).await?;
        let calls = self
            .store
            .list_calls(&CallFilter {
                worker_id: Some(worker_id),
                state: None,
                limit: i64::MAX,
            })
            .await?;
        let checklists = self.store.list_checklists(worker_id).await?;
        Ok(WorkerDetail {
            worker,
            calls,
            checklists,
        })
    }
}

fn observe_step(span: &Span, step: &Step) {
    if step.changes_state() {
        record_state_transition(span, step.from.as_str(), step.to.as_str());
        metrics::worker_state_transitions().add(
            1,
            &[
                KeyValue::new("from", step.from.as_str()),
                KeyValue::new("to", step.to.as_str()),
            ],
        );
    }
}

fn note_conflict(operation: &'static str, err: &Error) {
    if let Error::Conflict(reason) = err {
        warn!(operation, %reason, "workflow conflict");
        metrics::conflicts().add(1, &[KeyValue::new("operation", operation)]);
    }
}

async fn timed<T>(operation: &'static str, work: impl Future<Output = Result<T>>) -> Result<T> {
    let start = Instant::now();
    let result = work.await;
    metrics::operation_duration_ms().record(
        start.elapsed().as_secs_f64() * 1000.0,
        &[
            KeyValue::new("operation", operation),
            KeyValue::new("ok", result.is_ok()),
        ],
    );
    result
}
