//! # gts-prl
//!
//! Worker safety check-in (PRL) core for the GTS service desk.
//!
//! Workers on a shift receive verification calls from an external voice
//! platform. Call callbacks and direct checklist submissions drive each
//! worker's checklist status through an explicit state machine
//! ([`workflow::transition`]), persisted atomically by a [`store::PrlStore`]
//! (Postgres via [`db::Db`], or [`store::MemoryStore`]) and announced to
//! live dashboards through an [`event::Publisher`].

pub mod config;
pub mod db;
pub mod error;
pub mod event;
pub mod model;
pub mod store;
pub mod telemetry;
pub mod workflow;
