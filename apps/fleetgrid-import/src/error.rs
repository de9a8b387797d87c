//! CLI error types and exit codes.

use thiserror::Error;

use fleetgrid_api::ApiError;

/// Exit codes:
/// - 0: success
/// - 1: I/O or internal error
/// - 2: authentication failure
/// - 3: network error
/// - 4: validation error (bad input file, nothing to import)
/// - 5: server error
pub type CliResult<T> = Result<T, CliError>;

#[derive(Debug, Error)]
pub enum CliError {
    #[error("could not read input file '{path}': {message}")]
    InputFile { path: String, message: String },

    #[error("invalid input: {0}")]
    Validation(String),

    #[error("authentication failed: {0}")]
    Authentication(String),

    #[error("network error: {0}")]
    Network(String),

    #[error("server error: {0}")]
    Server(String),

    #[error("I/O error: {0}")]
    Io(String),
}

impl CliError {
    /// Get the exit code for this error.
    pub fn exit_code(&self) -> i32 {
        match self {
            CliError::Authentication(_) => 2,
            CliError::Network(_) => 3,
            CliError::InputFile { .. } | CliError::Validation(_) => 4,
            CliError::Server(_) => 5,
            CliError::Io(_) => 1,
        }
    }

    /// Print the error to stderr with a UTC timestamp.
    pub fn print(&self) {
        let now = chrono::Utc::now().format("%Y-%m-%d %H:%M:%S UTC");
        eprintln!("[{now}] error: {self}");
    }
}

impl From<ApiError> for CliError {
    fn from(e: ApiError) -> Self {
        match e {
            ApiError::Authentication(message) => CliError::Authentication(message),
            ApiError::Network { .. } | ApiError::Timeout => CliError::Network(e.to_string()),
            ApiError::Server { .. } | ApiError::InvalidResponse(_) | ApiError::Serialization(_) => {
                CliError::Server(e.to_string())
            }
        }
    }
}

impl From<std::io::Error> for CliError {
    fn from(e: std::io::Error) -> Self {
        CliError::Io(e.to_string())
    }
}
