//! Incident domain model
//!
//! Records as persisted by the incident store, report drafts, and the status
//! lifecycle applied when triaging.

pub mod draft;
pub mod lifecycle;
pub mod models;

pub use draft::{generate_ticket_number, IncidentDraft};
pub use lifecycle::IncidentPatch;
pub use models::{decode_incidents, Incident, Priority, Status};
