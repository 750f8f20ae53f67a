//! Testing utilities and fixtures
//!
//! This module provides builders for incident records and a recording mailer
//! shared by unit tests, integration tests and benchmarks.

pub mod fixtures;

pub use fixtures::{IncidentBuilder, RecordingMailer};
