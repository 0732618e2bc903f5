//! Integration tests for the verification workflow over the in-memory store.

use chrono::{NaiveDate, NaiveTime};
use gts_prl::config::settings::DEFAULT_WEBHOOK_URL;
use gts_prl::error::Error;
use gts_prl::event::{BroadcastPublisher, EventKind};
use gts_prl::model::*;
use gts_prl::store::{MemoryStore, PrlStore};
use gts_prl::workflow::Workflow;
use gts_prl::workflow::request::{
    CallUpdateRequest, InitiateCallRequest, RecordChecklistRequest,
};
use serde_json::json;

type TestWorkflow = Workflow<MemoryStore, BroadcastPublisher>;

fn test_workflow() -> TestWorkflow {
    Workflow::new(MemoryStore::new(), BroadcastPublisher::default())
}

fn time(h: u32) -> NaiveTime {
    NaiveTime::from_hms_opt(h, 0, 0).unwrap()
}

async fn seed_shift(wf: &TestWorkflow) -> Shift {
    wf.store()
        .create_shift(NewShift::new(
            "Planta Norte",
            "Mañana",
            "Ana Ruiz",
            NaiveDate::from_ymd_opt(2026, 3, 2).unwrap(),
            time(6),
            time(14),
        ))
        .await
        .unwrap()
}

async fn seed_worker(wf: &TestWorkflow, shift: &Shift, name: &str, priority: Priority) -> Worker {
    wf.store()
        .create_worker(
            NewWorker::new(shift.id, name, format!("EMP-{name}"), "+34600000000")
                .company("Montajes SL")
                .task("ALTURA", "Revisión de cubierta")
                .location("Nave 3")
                .priority(priority)
                .risk("caída a distinto nivel"),
        )
        .await
        .unwrap()
}

async fn open_calls(wf: &TestWorkflow, worker_id: WorkerId) -> Vec<CallSession> {
    wf.store()
        .list_calls(&CallFilter {
            worker_id: Some(worker_id),
            state: Some(CallState::InProgress),
            ..CallFilter::default()
        })
        .await
        .unwrap()
}

async fn fail_call(wf: &TestWorkflow, worker_id: WorkerId, state: CallState) -> Worker {
    let started = wf
        .initiate_call(InitiateCallRequest::for_worker(worker_id))
        .await
        .unwrap();
    wf.report_call_outcome(started.call.id, CallUpdateRequest::with_state(state))
        .await
        .unwrap()
        .worker
}

// ---------------------------------------------------------------------------
// Initiation
// ---------------------------------------------------------------------------

#[tokio::test]
async fn initiate_opens_session_and_moves_worker_in_progress() {
    let wf = test_workflow();
    let shift = seed_shift(&wf).await;
    let worker = seed_worker(&wf, &shift, "Luis Gómez", Priority::Alta).await;

    let started = wf
        .initiate_call(InitiateCallRequest::for_worker(worker.id))
        .await
        .unwrap();

    assert_eq!(started.call.state, CallState::InProgress);
    assert_eq!(started.call.worker_id, worker.id);
    assert_eq!(started.call.phone, worker.phone);
    assert!(started.call.started_at.is_some());
    assert!(started.call.ended_at.is_none());
    assert_eq!(started.worker.checklist_state, ChecklistState::InProgress);
    assert_eq!(started.worker.call_attempts, 1);
    assert!(started.worker.last_call_at.is_some());
    assert_eq!(started.webhook_url, DEFAULT_WEBHOOK_URL);
}

#[tokio::test]
async fn new_session_is_marked_contacted_before_any_outcome() {
    let wf = test_workflow();
    let shift = seed_shift(&wf).await;
    let worker = seed_worker(&wf, &shift, "Luis Gómez", Priority::Normal).await;

    let started = wf
        .initiate_call(InitiateCallRequest::for_worker(worker.id))
        .await
        .unwrap();
    assert!(started.call.contact_made);

    // The callback overwrites it.
    let reported = wf
        .report_call_outcome(
            started.call.id,
            CallUpdateRequest {
                estado: Some(CallState::NoAnswer),
                contacto_exitoso: Some(false),
                ..CallUpdateRequest::default()
            },
        )
        .await
        .unwrap();
    assert!(!reported.call.contact_made);
}

#[tokio::test]
async fn initiate_without_worker_id_is_invalid_input() {
    let wf = test_workflow();
    let err = wf
        .initiate_call(InitiateCallRequest::default())
        .await
        .unwrap_err();
    assert!(matches!(err, Error::InvalidInput(_)));
}

#[tokio::test]
async fn initiate_for_unknown_worker_is_not_found() {
    let wf = test_workflow();
    let err = wf
        .initiate_call(InitiateCallRequest::for_worker(WorkerId::new()))
        .await
        .unwrap_err();
    assert!(matches!(err, Error::NotFound(_)));
}

#[tokio::test]
async fn second_initiate_while_in_progress_conflicts() {
    let wf = test_workflow();
    let shift = seed_shift(&wf).await;
    let worker = seed_worker(&wf, &shift, "Luis Gómez", Priority::Normal).await;

    wf.initiate_call(InitiateCallRequest::for_worker(worker.id))
        .await
        .unwrap();
    let err = wf
        .initiate_call(InitiateCallRequest::for_worker(worker.id))
        .await
        .unwrap_err();
    assert!(matches!(err, Error::Conflict(_)));

    let worker = wf.store().get_worker(worker.id).await.unwrap();
    assert_eq!(worker.call_attempts, 1);
    assert_eq!(open_calls(&wf, worker.id).await.len(), 1);
}

#[tokio::test]
async fn concurrent_initiates_open_exactly_one_session() {
    let wf = test_workflow();
    let shift = seed_shift(&wf).await;
    let worker = seed_worker(&wf, &shift, "Luis Gómez", Priority::Normal).await;

    let (a, b) = tokio::join!(
        wf.initiate_call(InitiateCallRequest::for_worker(worker.id)),
        wf.initiate_call(InitiateCallRequest::for_worker(worker.id)),
    );

    let results = [a, b];
    let ok = results.iter().filter(|r| r.is_ok()).count();
    let conflicts = results
        .iter()
        .filter(|r| matches!(r, Err(Error::Conflict(_))))
        .count();
    assert_eq!((ok, conflicts), (1, 1));

    let worker = wf.store().get_worker(worker.id).await.unwrap();
    assert_eq!(worker.call_attempts, 1);
    assert_eq!(open_calls(&wf, worker.id).await.len(), 1);
}

// ---------------------------------------------------------------------------
// Call outcomes
// ---------------------------------------------------------------------------

#[tokio::test]
async fn completed_call_with_checklist_completes_worker() {
    let wf = test_workflow();
    let shift = seed_shift(&wf).await;
    let worker = seed_worker(&wf, &shift, "Luis Gómez", Priority::Critica).await;

    let started = wf
        .initiate_call(InitiateCallRequest::for_worker(worker.id))
        .await
        .unwrap();
    let answers = json!({"epis": true, "permiso_trabajo": "PT-114"});
    let reported = wf
        .report_call_outcome(
            started.call.id,
            CallUpdateRequest {
                estado: Some(CallState::Completed),
                checklist_completado: Some(true),
                duracion_segundos: Some(95),
                run_id: Some("run-42".to_string()),
                respuestas: Some(answers.clone()),
                ..CallUpdateRequest::default()
            },
        )
        .await
        .unwrap();

    assert!(reported.session_was_open);
    assert_eq!(reported.call.state, CallState::Completed);
    assert!(reported.call.ended_at.is_some());
    assert_eq!(reported.call.duration_secs, Some(95));
    assert_eq!(reported.call.run_id.as_deref(), Some("run-42"));
    assert_eq!(reported.worker.checklist_state, ChecklistState::Completed);
    assert!(reported.worker.checklist_completed_at.is_some());

    let row = reported.checklist.expect("checklist written by the call");
    assert_eq!(row.call_id, Some(started.call.id));
    assert_eq!(row.answers, answers);
    assert_eq!(row.outcome.as_deref(), Some("COMPLETADA"));
    assert_eq!(row.method, checklist::DEFAULT_METHOD);
    assert_eq!(row.verified_by, checklist::DEFAULT_VERIFIER);

    let stored = wf.store().list_checklists(worker.id).await.unwrap();
    assert_eq!(stored.len(), 1);
    assert!(open_calls(&wf, worker.id).await.is_empty());
}

#[tokio::test]
async fn completed_call_without_checklist_returns_worker_to_pending() {
    let wf = test_workflow();
    let shift = seed_shift(&wf).await;
    let worker = seed_worker(&wf, &shift, "Luis Gómez", Priority::Normal).await;

    let started = wf
        .initiate_call(InitiateCallRequest::for_worker(worker.id))
        .await
        .unwrap();
    let reported = wf
        .report_call_outcome(
            started.call.id,
            CallUpdateRequest::with_state(CallState::Completed).checklist_completed(false),
        )
        .await
        .unwrap();

    assert_eq!(reported.worker.checklist_state, ChecklistState::Pending);
    assert!(reported.checklist.is_none());
    assert!(reported.worker.checklist_completed_at.is_none());
}

#[tokio::test]
async fn failed_call_below_ceiling_returns_worker_to_pending() {
    let wf = test_workflow();
    let shift = seed_shift(&wf).await;
    let worker = seed_worker(&wf, &shift, "Luis Gómez", Priority::Normal).await;

    let after_first = fail_call(&wf, worker.id, CallState::NoAnswer).await;
    assert_eq!(after_first.checklist_state, ChecklistState::Pending);

    let after_second = fail_call(&wf, worker.id, CallState::Failed).await;
    assert_eq!(after_second.call_attempts, 2);
    assert_eq!(after_second.checklist_state, ChecklistState::Pending);
}

#[tokio::test]
async fn third_unanswered_call_marks_worker_unreachable() {
    let wf = test_workflow();
    let shift = seed_shift(&wf).await;
    let worker = seed_worker(&wf, &shift, "Luis Gómez", Priority::Normal).await;

    let mut attempts = Vec::new();
    let mut last = None;
    for _ in 0..3 {
        let w = fail_call(&wf, worker.id, CallState::NoAnswer).await;
        attempts.push(w.call_attempts);
        last = Some(w);
    }
    assert_eq!(attempts, vec![1, 2, 3]);
    assert_eq!(last.unwrap().checklist_state, ChecklistState::Unreachable);

    // Unreachable workers may still be called again.
    let started = wf
        .initiate_call(InitiateCallRequest::for_worker(worker.id))
        .await
        .unwrap();
    assert_eq!(started.worker.call_attempts, 4);
    assert_eq!(started.worker.checklist_state, ChecklistState::InProgress);
}

#[tokio::test]
async fn interim_in_progress_report_leaves_worker_alone() {
    let wf = test_workflow();
    let shift = seed_shift(&wf).await;
    let worker = seed_worker(&wf, &shift, "Luis Gómez", Priority::Normal).await;

    let started = wf
        .initiate_call(InitiateCallRequest::for_worker(worker.id))
        .await
        .unwrap();
    let reported = wf
        .report_call_outcome(
            started.call.id,
            CallUpdateRequest {
                run_id: Some("run-7".to_string()),
                ..CallUpdateRequest::default()
            },
        )
        .await
        .unwrap();

    assert_eq!(reported.call.state, CallState::InProgress);
    assert_eq!(reported.call.run_id.as_deref(), Some("run-7"));
    assert!(reported.call.ended_at.is_none());
    assert_eq!(reported.worker.checklist_state, ChecklistState::InProgress);
}

#[tokio::test]
async fn report_for_unknown_call_is_not_found_and_mutates_nothing() {
    let wf = test_workflow();
    let shift = seed_shift(&wf).await;
    let worker = seed_worker(&wf, &shift, "Luis Gómez", Priority::Normal).await;
    wf.initiate_call(InitiateCallRequest::for_worker(worker.id))
        .await
        .unwrap();
    let before = wf.store().get_worker(worker.id).await.unwrap();

    let err = wf
        .report_call_outcome(
            CallId::new(),
            CallUpdateRequest::with_state(CallState::Completed).checklist_completed(true),
        )
        .await
        .unwrap_err();
    assert!(matches!(err, Error::NotFound(_)));

    let after = wf.store().get_worker(worker.id).await.unwrap();
    assert_eq!(after.checklist_state, before.checklist_state);
    assert_eq!(after.updated_at, before.updated_at);
    assert!(wf.store().list_checklists(worker.id).await.unwrap().is_empty());
}

#[tokio::test]
async fn late_callback_merges_fields_without_moving_worker() {
    let wf = test_workflow();
    let shift = seed_shift(&wf).await;
    let worker = seed_worker(&wf, &shift, "Luis Gómez", Priority::Normal).await;

    let first = wf
        .initiate_call(InitiateCallRequest::for_worker(worker.id))
        .await
        .unwrap();
    let closed = wf
        .report_call_outcome(first.call.id, CallUpdateRequest::with_state(CallState::Failed))
        .await
        .unwrap();
    let ended_at = closed.call.ended_at;

    // Worker is on a newer call when the stale report for the first arrives.
    wf.initiate_call(InitiateCallRequest::for_worker(worker.id))
        .await
        .unwrap();
    let late = wf
        .report_call_outcome(
            first.call.id,
            CallUpdateRequest {
                recording_url: Some("https://rec.example.com/1".to_string()),
                ..CallUpdateRequest::with_state(CallState::Completed).checklist_completed(true)
            },
        )
        .await
        .unwrap();

    assert!(!late.session_was_open);
    assert!(late.checklist.is_none());
    assert_eq!(late.call.ended_at, ended_at);
    assert_eq!(
        late.call.recording_url.as_deref(),
        Some("https://rec.example.com/1")
    );
    assert_eq!(late.worker.checklist_state, ChecklistState::InProgress);
    assert_eq!(open_calls(&wf, worker.id).await.len(), 1);
}

#[tokio::test]
async fn late_in_progress_report_never_reopens_a_closed_session() {
    let wf = test_workflow();
    let shift = seed_shift(&wf).await;
    let worker = seed_worker(&wf, &shift, "Luis Gómez", Priority::Normal).await;

    let first = wf
        .initiate_call(InitiateCallRequest::for_worker(worker.id))
        .await
        .unwrap();
    wf.report_call_outcome(first.call.id, CallUpdateRequest::with_state(CallState::NoAnswer))
        .await
        .unwrap();

    let late = wf
        .report_call_outcome(
            first.call.id,
            CallUpdateRequest {
                run_id: Some("run-late".to_string()),
                ..CallUpdateRequest::with_state(CallState::InProgress)
            },
        )
        .await
        .unwrap();
    assert!(!late.session_was_open);
    assert_eq!(late.call.state, CallState::NoAnswer);
    assert_eq!(late.call.run_id.as_deref(), Some("run-late"));
    assert_eq!(late.worker.checklist_state, ChecklistState::Pending);
    assert!(open_calls(&wf, worker.id).await.is_empty());

    let second = wf
        .initiate_call(InitiateCallRequest::for_worker(worker.id))
        .await
        .unwrap();
    let open = open_calls(&wf, worker.id).await;
    assert_eq!(open.len(), 1);
    assert_eq!(open[0].id, second.call.id);
}

// ---------------------------------------------------------------------------
// Direct checklist submission
// ---------------------------------------------------------------------------

#[tokio::test]
async fn checklist_from_any_state_completes_worker() {
    let wf = test_workflow();
    let shift = seed_shift(&wf).await;
    let worker = seed_worker(&wf, &shift, "Luis Gómez", Priority::Normal).await;
    for _ in 0..3 {
        fail_call(&wf, worker.id, CallState::Failed).await;
    }
    assert_eq!(
        wf.store().get_worker(worker.id).await.unwrap().checklist_state,
        ChecklistState::Unreachable
    );

    let answers = json!({"epis": true, "zona_señalizada": false, "notas": ["arnés"]});
    let recorded = wf
        .record_checklist(RecordChecklistRequest {
            observaciones: Some("Supervisado en persona".to_string()),
            incidencias_detectadas: Some(true),
            metodo: Some("PRESENCIAL".to_string()),
            ..RecordChecklistRequest::new(worker.id, answers.clone())
        })
        .await
        .unwrap();

    assert_eq!(recorded.worker.checklist_state, ChecklistState::Completed);
    assert!(recorded.worker.checklist_completed_at.is_some());
    assert!(recorded.closed_call.is_none());
    assert_eq!(recorded.checklist.answers, answers);
    assert!(recorded.checklist.incidents_detected);
    assert_eq!(recorded.checklist.method, "PRESENCIAL");
    assert_eq!(recorded.checklist.verified_by, checklist::DEFAULT_VERIFIER);
    assert!(recorded.checklist.call_id.is_none());

    let detail = wf.worker_detail(worker.id).await.unwrap();
    assert_eq!(detail.checklists.len(), 1);
    assert_eq!(detail.checklists[0].answers, answers);
    assert_eq!(detail.calls.len(), 3);
}

#[tokio::test]
async fn checklist_closes_open_session() {
    let wf = test_workflow();
    let shift = seed_shift(&wf).await;
    let worker = seed_worker(&wf, &shift, "Luis Gómez", Priority::Normal).await;
    let started = wf
        .initiate_call(InitiateCallRequest::for_worker(worker.id))
        .await
        .unwrap();

    let recorded = wf
        .record_checklist(RecordChecklistRequest::new(worker.id, json!({"epis": true})))
        .await
        .unwrap();

    let closed = recorded.closed_call.expect("open call closed");
    assert_eq!(closed.id, started.call.id);
    assert_eq!(closed.state, CallState::Completed);
    assert!(closed.checklist_completed);
    assert!(closed.ended_at.is_some());
    assert_eq!(recorded.checklist.call_id, Some(started.call.id));
    assert_eq!(recorded.worker.checklist_state, ChecklistState::Completed);
    assert!(open_calls(&wf, worker.id).await.is_empty());
}

#[tokio::test]
async fn checklist_missing_fields_is_invalid_input() {
    let wf = test_workflow();
    let shift = seed_shift(&wf).await;
    let worker = seed_worker(&wf, &shift, "Luis Gómez", Priority::Normal).await;

    let err = wf
        .record_checklist(RecordChecklistRequest::default())
        .await
        .unwrap_err();
    match err {
        Error::InvalidInput(msg) => {
            assert!(msg.contains("worker_id"));
            assert!(msg.contains("respuestas"));
        }
        other => panic!("expected InvalidInput, got {other:?}"),
    }

    let err = wf
        .record_checklist(RecordChecklistRequest::new(worker.id, serde_json::Value::Null))
        .await
        .unwrap_err();
    assert!(matches!(err, Error::InvalidInput(_)));

    let unchanged = wf.store().get_worker(worker.id).await.unwrap();
    assert_eq!(unchanged.checklist_state, ChecklistState::Pending);
}

#[tokio::test]
async fn checklist_for_unknown_worker_is_not_found() {
    let wf = test_workflow();
    let err = wf
        .record_checklist(RecordChecklistRequest::new(WorkerId::new(), json!({})))
        .await
        .unwrap_err();
    assert!(matches!(err, Error::NotFound(_)));
}

// ---------------------------------------------------------------------------
// Invariants across a shift
// ---------------------------------------------------------------------------

#[tokio::test]
async fn in_progress_iff_exactly_one_open_session() {
    let wf = test_workflow();
    let shift = seed_shift(&wf).await;
    let a = seed_worker(&wf, &shift, "Ana", Priority::Normal).await;
    let b = seed_worker(&wf, &shift, "Bruno", Priority::Alta).await;
    let c = seed_worker(&wf, &shift, "Carla", Priority::Baja).await;

    let call_a = wf
        .initiate_call(InitiateCallRequest::for_worker(a.id))
        .await
        .unwrap();
    wf.initiate_call(InitiateCallRequest::for_worker(b.id))
        .await
        .unwrap();
    fail_call(&wf, c.id, CallState::NoAnswer).await;
    wf.report_call_outcome(
        call_a.call.id,
        CallUpdateRequest::with_state(CallState::Completed).checklist_completed(true),
    )
    .await
    .unwrap();

    for worker in wf.store().list_workers(&WorkerFilter::default()).await.unwrap() {
        let open = open_calls(&wf, worker.id).await.len();
        let in_progress = worker.checklist_state == ChecklistState::InProgress;
        assert_eq!(open == 1, in_progress, "worker {}", worker.full_name);
        assert!(open <= 1);
    }

    let completed = wf
        .store()
        .list_workers(&WorkerFilter {
            checklist_state: Some(ChecklistState::Completed),
            ..WorkerFilter::default()
        })
        .await
        .unwrap();
    for worker in completed {
        assert!(!wf.store().list_checklists(worker.id).await.unwrap().is_empty());
    }
}

// ---------------------------------------------------------------------------
// Events
// ---------------------------------------------------------------------------

#[tokio::test]
async fn events_follow_each_committed_mutation() {
    let wf = test_workflow();
    let mut rx = wf.publisher().subscribe();
    let shift = seed_shift(&wf).await;
    let worker = seed_worker(&wf, &shift, "Luis Gómez", Priority::Normal).await;

    let started = wf
        .initiate_call(InitiateCallRequest::for_worker(worker.id))
        .await
        .unwrap();
    wf.report_call_outcome(started.call.id, CallUpdateRequest::with_state(CallState::NoAnswer))
        .await
        .unwrap();
    wf.record_checklist(RecordChecklistRequest::new(worker.id, json!({"ok": true})))
        .await
        .unwrap();

    let first = rx.recv().await.unwrap();
    let second = rx.recv().await.unwrap();
    let third = rx.recv().await.unwrap();

    assert_eq!(
        [first.seq, second.seq, third.seq],
        [1, 2, 3],
        "sequence numbers are gapless"
    );
    assert_eq!(first.kind.name(), "prl:call:initiated");
    assert_eq!(second.kind.name(), "prl:call:updated");
    assert_eq!(third.kind.name(), "prl:checklist:completed");

    match second.kind {
        EventKind::CallUpdated { call, worker } => {
            assert_eq!(call.state, CallState::NoAnswer);
            assert_eq!(worker.checklist_state, ChecklistState::Pending);
        }
        other => panic!("unexpected event {other:?}"),
    }
}

#[tokio::test]
async fn failed_operations_publish_nothing() {
    let wf = test_workflow();
    let mut rx = wf.publisher().subscribe();

    let _ = wf
        .initiate_call(InitiateCallRequest::for_worker(WorkerId::new()))
        .await;
    let _ = wf
        .report_call_outcome(CallId::new(), CallUpdateRequest::default())
        .await;
    let _ = wf.record_checklist(RecordChecklistRequest::default()).await;

    assert!(rx.try_recv().is_err());
}

#[tokio::test]
async fn event_serializes_with_type_tag() {
    let wf = test_workflow();
    let mut rx = wf.publisher().subscribe();
    let shift = seed_shift(&wf).await;
    let worker = seed_worker(&wf, &shift, "Luis Gómez", Priority::Normal).await;
    wf.initiate_call(InitiateCallRequest::for_worker(worker.id))
        .await
        .unwrap();

    let event = rx.recv().await.unwrap();
    let value = serde_json::to_value(&event).unwrap();
    assert_eq!(value["kind"]["type"], "call_initiated");
    assert_eq!(value["kind"]["call"]["estado"], "EN_CURSO");
    assert_eq!(value["kind"]["worker"]["checklist_estado"], "EN_CURSO");
}
