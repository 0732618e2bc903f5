//! prl CLI: operator interface to the PRL check-in workflow.

use std::path::PathBuf;

use chrono::{NaiveDate, NaiveTime, Utc};
use clap::{Parser, Subcommand};
use gts_prl::config::{Config, WorkflowSettings};
use gts_prl::db::Db;
use gts_prl::event::BroadcastPublisher;
use gts_prl::model::*;
use gts_prl::telemetry::{TelemetryConfig, init_telemetry};
use gts_prl::workflow::Workflow;
use gts_prl::workflow::request::{
    CallUpdateRequest, InitiateCallRequest, RecordChecklistRequest,
};
use secrecy::ExposeSecret;
use serde::Serialize;

type PrlWorkflow = Workflow<Db, BroadcastPublisher>;

#[derive(Parser)]
#[command(name = "prl", about = "Worker safety check-in workflow")]
struct Cli {
    /// Workflow settings file (TOML)
    #[arg(long, global = true)]
    settings: Option<PathBuf>,
    /// Print the real-time events the command emitted
    #[arg(long, global = true)]
    events: bool,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Shift operations
    Shift {
        #[command(subcommand)]
        action: ShiftAction,
    },
    /// Worker registry
    Worker {
        #[command(subcommand)]
        action: WorkerAction,
    },
    /// Verification calls
    Call {
        #[command(subcommand)]
        action: CallAction,
    },
    /// Safety checklists
    Checklist {
        #[command(subcommand)]
        action: ChecklistAction,
    },
}

#[derive(Subcommand)]
enum ShiftAction {
    /// Register a shift
    Create {
        #[arg(long)]
        plant: String,
        #[arg(long)]
        label: String,
        #[arg(long)]
        supervisor: String,
        /// Date (YYYY-MM-DD), defaults to today
        #[arg(long)]
        date: Option<NaiveDate>,
        /// Start time (HH:MM:SS)
        #[arg(long)]
        start: NaiveTime,
        /// End time (HH:MM:SS)
        #[arg(long)]
        end: NaiveTime,
    },
    /// Show a shift
    Show { id: ShiftId },
    /// List active shifts for a date
    Active {
        /// Date (YYYY-MM-DD), defaults to today
        #[arg(long)]
        date: Option<NaiveDate>,
    },
    /// Close a shift
    Close { id: ShiftId },
    /// Checklist stats for a shift
    Stats { id: ShiftId },
}

#[derive(Subcommand)]
enum WorkerAction {
    /// Register a worker on a shift
    Register {
        #[arg(long)]
        shift: ShiftId,
        #[arg(long)]
        name: String,
        #[arg(long)]
        employee_id: String,
        #[arg(long)]
        phone: String,
        #[arg(long, default_value = "")]
        company: String,
        #[arg(long, default_value = "")]
        task_type: String,
        #[arg(long, default_value = "")]
        description: String,
        #[arg(long, default_value = "")]
        location: String,
        /// BAJA | NORMAL | ALTA | CRITICA
        #[arg(long, default_value = "NORMAL")]
        priority: Priority,
        /// Identified risk (repeatable)
        #[arg(long = "risk")]
        risks: Vec<String>,
    },
    /// List workers
    List {
        #[arg(long)]
        shift: Option<ShiftId>,
        /// PENDIENTE | EN_CURSO | COMPLETADO | NO_CONTACTADO
        #[arg(long)]
        state: Option<ChecklistState>,
    },
    /// Show a worker with call and checklist history
    Show { id: WorkerId },
}

#[derive(Subcommand)]
enum CallAction {
    /// Start a verification call
    Initiate { worker: WorkerId },
    /// Apply a call outcome, as the voice platform's webhook would
    Update {
        id: CallId,
        /// EN_CURSO | COMPLETADA | FALLIDA | NO_RESPONDE
        #[arg(long)]
        estado: Option<CallState>,
        #[arg(long)]
        contacto_exitoso: Option<bool>,
        #[arg(long)]
        checklist_completado: Option<bool>,
        #[arg(long)]
        duracion_segundos: Option<i32>,
        #[arg(long)]
        motivo_fallo: Option<String>,
        #[arg(long)]
        run_id: Option<String>,
        #[arg(long)]
        recording_url: Option<String>,
        /// Checklist answers captured during the call (JSON)
        #[arg(long)]
        respuestas: Option<String>,
    },
    /// Call history
    List {
        #[arg(long)]
        worker: Option<WorkerId>,
        #[arg(long)]
        state: Option<CallState>,
        #[arg(long, default_value_t = CallFilter::DEFAULT_LIMIT)]
        limit: i64,
    },
}

#[derive(Subcommand)]
enum ChecklistAction {
    /// Record a checklist submitted outside a call
    Record {
        worker: WorkerId,
        /// Answers (JSON)
        #[arg(long)]
        respuestas: String,
        #[arg(long)]
        estado: Option<String>,
        #[arg(long)]
        observaciones: Option<String>,
        #[arg(long)]
        incidencias: bool,
        #[arg(long)]
        metodo: Option<String>,
        #[arg(long)]
        verificado_por: Option<String>,
        #[arg(long)]
        duracion_segundos: Option<i32>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    let config = Config::from_env()?;
    let _guard = init_telemetry(TelemetryConfig {
        endpoint: config.otel_endpoint.clone(),
        service_name: "prl".to_string(),
        default_level: config.log_level.clone(),
    })?;

    let mut settings = match cli.settings {
        Some(ref path) => WorkflowSettings::load(path)?,
        None => WorkflowSettings::default(),
    };
    if let Some(url) = config.webhook_url.clone() {
        settings.webhook_url = url;
    }

    let db = Db::connect(config.database_url.expose_secret()).await?;
    db.migrate().await?;

    let workflow = Workflow::with_settings(db, BroadcastPublisher::default(), settings);
    let mut events = workflow.publisher().subscribe();

    match cli.command {
        Command::Shift { action } => cmd_shift(&workflow, action).await?,
        Command::Worker { action } => cmd_worker(&workflow, action).await?,
        Command::Call { action } => cmd_call(&workflow, action).await?,
        Command::Checklist { action } => cmd_checklist(&workflow, action).await?,
    }

    if cli.events {
        while let Ok(event) = events.try_recv() {
            println!("{} {}", event.kind.name(), serde_json::to_string(&event)?);
        }
    }
    Ok(())
}

fn print_json(value: &impl Serialize) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn parse_json(raw: &str) -> anyhow::Result<serde_json::Value> {
    serde_json::from_str(raw).map_err(|e| anyhow::anyhow!("invalid JSON for respuestas: {e}"))
}

async fn cmd_shift(workflow: &PrlWorkflow, action: ShiftAction) -> anyhow::Result<()> {
    let store = workflow.store();
    match action {
        ShiftAction::Create {
            plant,
            label,
            supervisor,
            date,
            start,
            end,
        } => {
            let date = date.unwrap_or_else(|| Utc::now().date_naive());
            let shift = store
                .create_shift(NewShift::new(plant, label, supervisor, date, start, end))
                .await?;
            println!("Created shift {} ({} {})", shift.id, shift.plant, shift.date);
        }
        ShiftAction::Show { id } => print_json(&store.get_shift(id).await?)?,
        ShiftAction::Active { date } => {
            let date = date.unwrap_or_else(|| Utc::now().date_naive());
            let shifts = store.active_shifts(date).await?;
            if shifts.is_empty() {
                println!("No active shifts for {date}.");
                return Ok(());
            }
            println!(
                "{:<36}  {:<20}  {:<16}  {:<11}  SUPERVISOR",
                "ID", "PLANT", "SHIFT", "HOURS"
            );
            println!("{}", "-".repeat(100));
            for s in &shifts {
                println!(
                    "{:<36}  {:<20}  {:<16}  {}-{}  {}",
                    s.id,
                    s.plant,
                    s.label,
                    s.starts_at.format("%H:%M"),
                    s.ends_at.format("%H:%M"),
                    s.supervisor
                );
            }
        }
        ShiftAction::Close { id } => {
            let shift = store.close_shift(id).await?;
            println!("Shift {} is now {}", shift.id, shift.state);
        }
        ShiftAction::Stats { id } => print_json(&workflow.shift_stats(id).await?)?,
    }
    Ok(())
}

async fn cmd_worker(workflow: &PrlWorkflow, action: WorkerAction) -> anyhow::Result<()> {
    let store = workflow.store();
    match action {
        WorkerAction::Register {
            shift,
            name,
            employee_id,
            phone,
            company,
            task_type,
            description,
            location,
            priority,
            risks,
        } => {
            let mut new = NewWorker::new(shift, name, employee_id, phone)
                .company(company)
                .task(task_type, description)
                .location(location)
                .priority(priority);
            new.identified_risks = risks;
            let worker = store.create_worker(new).await?;
            println!(
                "Registered worker {} ({}, {})",
                worker.id, worker.full_name, worker.priority
            );
        }
        WorkerAction::List { shift, state } => {
            let workers = store
                .list_workers(&WorkerFilter {
                    shift_id: shift,
                    checklist_state: state,
                })
                .await?;
            if workers.is_empty() {
                println!("No workers found.");
                return Ok(());
            }
            println!(
                "{:<36}  {:<28}  {:<8}  {:<13}  CALLS",
                "ID", "NAME", "PRIORITY", "CHECKLIST"
            );
            println!("{}", "-".repeat(100));
            for w in &workers {
                println!(
                    "{:<36}  {:<28}  {:<8}  {:<13}  {}",
                    w.id, w.full_name, w.priority, w.checklist_state, w.call_attempts
                );
            }
            println!("\n{} worker(s)", workers.len());
        }
        WorkerAction::Show { id } => print_json(&workflow.worker_detail(id).await?)?,
    }
    Ok(())
}

async fn cmd_call(workflow: &PrlWorkflow, action: CallAction) -> anyhow::Result<()> {
    match action {
        CallAction::Initiate { worker } => {
            let started = workflow
                .initiate_call(InitiateCallRequest::for_worker(worker))
                .await?;
            println!(
                "Call {} started (attempt {})",
                started.call.id, started.worker.call_attempts
            );
            println!("Webhook: {}", started.webhook_url);
        }
        CallAction::Update {
            id,
            estado,
            contacto_exitoso,
            checklist_completado,
            duracion_segundos,
            motivo_fallo,
            run_id,
            recording_url,
            respuestas,
        } => {
            let update = CallUpdateRequest {
                estado,
                contacto_exitoso,
                checklist_completado,
                duracion_segundos,
                motivo_fallo,
                run_id,
                recording_url,
                respuestas: respuestas.as_deref().map(parse_json).transpose()?,
            };
            let reported = workflow.report_call_outcome(id, update).await?;
            println!(
                "Call {} is {}; worker {} is {}",
                reported.call.id,
                reported.call.state,
                reported.worker.id,
                reported.worker.checklist_state
            );
        }
        CallAction::List {
            worker,
            state,
            limit,
        } => {
            let calls = workflow
                .store()
                .list_calls(&CallFilter {
                    worker_id: worker,
                    state,
                    limit,
                })
                .await?;
            if calls.is_empty() {
                println!("No calls found.");
                return Ok(());
            }
            println!(
                "{:<36}  {:<36}  {:<11}  {:<7}  STARTED",
                "ID", "WORKER", "STATE", "CONTACT"
            );
            println!("{}", "-".repeat(110));
            for c in &calls {
                let started = c
                    .started_at
                    .map(|t| t.format("%Y-%m-%d %H:%M").to_string())
                    .unwrap_or_else(|| "-".to_string());
                println!(
                    "{:<36}  {:<36}  {:<11}  {:<7}  {}",
                    c.id, c.worker_id, c.state, c.contact_made, started
                );
            }
            println!("\n{} call(s)", calls.len());
        }
    }
    Ok(())
}

async fn cmd_checklist(workflow: &PrlWorkflow, action: ChecklistAction) -> anyhow::Result<()> {
    match action {
        ChecklistAction::Record {
            worker,
            respuestas,
            estado,
            observaciones,
            incidencias,
            metodo,
            verificado_por,
            duracion_segundos,
        } => {
            let request = RecordChecklistRequest {
                worker_id: Some(worker),
                respuestas: Some(parse_json(&respuestas)?),
                estado,
                observaciones,
                incidencias_detectadas: Some(incidencias),
                metodo,
                verificado_por,
                duracion_segundos,
            };
            let recorded = workflow.record_checklist(request).await?;
            println!(
                "Checklist {} recorded; worker {} is {}",
                recorded.checklist.id, recorded.worker.id, recorded.worker.checklist_state
            );
        }
    }
    Ok(())
}
