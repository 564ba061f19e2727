//! CLI error type and exit codes

use miette::Diagnostic;
use thiserror::Error;

/// Exit code for configuration problems.
pub const EXIT_CONFIG: u8 = 2;
/// Exit code for every other failure.
pub const EXIT_FAILURE: u8 = 1;

/// Errors surfaced by the brewbump binary
#[derive(Error, Debug, Diagnostic)]
pub enum CliError {
    #[error(transparent)]
    #[diagnostic(transparent)]
    Bump(#[from] brewbump_core::Error),

    #[error("Tracing initialization failed: {message}")]
    #[diagnostic(
        code(brewbump::cli::tracing_error),
        help("Check the --log-level flag and the RUST_LOG environment variable")
    )]
    TracingError { message: String },
}

impl CliError {
    pub fn tracing(message: impl Into<String>) -> Self {
        Self::TracingError {
            message: message.into(),
        }
    }

    /// Whether this is a refusal to downgrade, which ends the run successfully.
    #[must_use]
    pub fn is_skip(&self) -> bool {
        matches!(self, Self::Bump(e) if e.is_upgrade())
    }

    #[must_use]
    pub fn exit_code(&self) -> u8 {
        match self {
            Self::Bump(brewbump_core::Error::Config { .. }) => EXIT_CONFIG,
            Self::Bump(e) if e.is_upgrade() => 0,
            _ => EXIT_FAILURE,
        }
    }
}
