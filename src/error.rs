//! Error types for taskdesk
//!
//! Exit codes:
//! - 0: Success
//! - 2: User error (bad args, unknown ids, bad credentials)
//! - 3: Blocked by access policy (not signed in, wrong role)
//! - 4: Operation failed (I/O, lock timeout, backend error)

use std::path::PathBuf;
use thiserror::Error;

use crate::access::Route;

/// Exit codes for the taskdesk CLI
pub mod exit_codes {
    pub const SUCCESS: i32 = 0;
    pub const USER_ERROR: i32 = 2;
    pub const POLICY_BLOCKED: i32 = 3;
    pub const OPERATION_FAILED: i32 = 4;
}

/// Main error type for taskdesk operations
#[derive(Error, Debug)]
pub enum Error {
    // User errors (exit code 2)
    #[error("Not initialized: {0}")]
    NotInitialized(PathBuf),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("User not found: {0}")]
    UserNotFound(String),

    #[error("Task not found: {0}")]
    TaskNotFound(String),

    #[error("Document not found: {collection}/{id}")]
    DocumentNotFound { collection: String, id: String },

    #[error("Invalid email or password")]
    InvalidCredentials,

    #[error("Email already in use: {0}")]
    EmailInUse(String),

    // Policy blocks (exit code 3)
    #[error("Not signed in")]
    NotSignedIn,

    #[error("Access denied: this command needs the {required} role (your view is {route})")]
    Redirected { required: String, route: Route },

    // Operation failures (exit code 4)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML parse error: {0}")]
    TomlParse(#[from] toml::de::Error),

    #[error("TOML serialize error: {0}")]
    TomlSerialize(#[from] toml::ser::Error),

    #[error("Backend timed out after {timeout_ms}ms waiting for {path}")]
    Timeout { path: PathBuf, timeout_ms: u64 },

    #[error("Credential hashing failed: {0}")]
    Hashing(String),

    #[error("Operation failed: {0}")]
    OperationFailed(String),
}

impl Error {
    /// Get the exit code for this error
    pub fn exit_code(&self) -> i32 {
        match self {
            // User errors
            Error::NotInitialized(_)
            | Error::InvalidConfig(_)
            | Error::InvalidArgument(_)
            | Error::UserNotFound(_)
            | Error::TaskNotFound(_)
            | Error::DocumentNotFound { .. }
            | Error::InvalidCredentials
            | Error::EmailInUse(_) => exit_codes::USER_ERROR,

            // Policy blocks
            Error::NotSignedIn | Error::Redirected { .. } => exit_codes::POLICY_BLOCKED,

            // Operation failures
            Error::Io(_)
            | Error::Json(_)
            | Error::TomlParse(_)
            | Error::TomlSerialize(_)
            | Error::Timeout { .. }
            | Error::Hashing(_)
            | Error::OperationFailed(_) => exit_codes::OPERATION_FAILED,
        }
    }

    /// Structured details for JSON error output
    pub fn details(&self) -> Option<serde_json::Value> {
        match self {
            Error::Redirected { required, route } => Some(serde_json::json!({
                "required_role": required,
                "redirect_to": route.path(),
            })),
            Error::NotSignedIn => Some(serde_json::json!({
                "redirect_to": Route::SignIn.path(),
            })),
            Error::Timeout { path, timeout_ms } => Some(serde_json::json!({
                "path": path,
                "timeout_ms": timeout_ms,
            })),
            _ => None,
        }
    }
}

/// Result type alias for taskdesk operations
pub type Result<T> = std::result::Result<T, Error>;
