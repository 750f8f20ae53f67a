//! Error handling utilities
//!
//! This module provides centralized error handling for the application.

use tracing::error;

/// Exit code for problems with the user's input
pub const EXIT_USAGE: i32 = 2;
/// Exit code for everything else
pub const EXIT_FAILURE: i32 = 1;

/// Exit code for `error`, based on the crate error it wraps if any
pub fn exit_code(error: &anyhow::Error) -> i32 {
    match error.downcast_ref::<crate::error::Error>() {
        Some(e) if e.is_client_error() => EXIT_USAGE,
        Some(crate::error::Error::Config(_) | crate::error::Error::Serialization(_)) => EXIT_USAGE,
        _ => EXIT_FAILURE,
    }
}

/// Handle fatal errors and exit with appropriate status code
///
/// In verbose mode the full context chain is printed as well.
pub fn handle_fatal_error(error: anyhow::Error, verbose: u8) -> ! {
    error!("Fatal error: {}", error);

    eprintln!("Error: {error:#}");
    if verbose >= 1 {
        eprintln!("\nError chain:");
        for (i, cause) in error.chain().enumerate() {
            eprintln!("  {}: {}", i, cause);
        }
    }

    std::process::exit(exit_code(&error))
}
