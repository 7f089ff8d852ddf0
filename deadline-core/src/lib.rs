//! Core of deadline-reminder.
//!
//! This crate provides everything except the transport to a concrete calendar service:
//! - `Deadline` and recurrence expansion
//! - projection of deadlines onto remote events and back
//! - the reconciliation engine and the sync driver around it
//! - the line-oriented deadline files

pub mod constants;
pub mod deadline;
pub mod error;
pub mod event;
pub mod projection;
pub mod reconcile;
pub mod recurrence;
pub mod remote;
pub mod storage;
pub mod sync;

pub use deadline::Deadline;
pub use error::{DeadlineError, DeadlineResult};
pub use event::{EventPage, EventTime, RemoteEvent, Transparency};
pub use reconcile::{RecordingSink, SideEffectSink, SyncPlan, reconcile};
pub use remote::{CalendarRef, RemoteStore};
pub use sync::{SyncDriver, SyncOptions, SyncState};
