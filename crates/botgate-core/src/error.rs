use thiserror::Error;

/// Failure surfaced by the platform transport when talking to the Bot API.
///
/// Platform-level "not ok" responses are NOT errors; they come back as the
/// status description of the call. Only transport/protocol breakage lands here.
#[derive(Debug, Error)]
pub enum PlatformError {
    #[error("transport failure: {0}")]
    Transport(String),

    #[error("malformed platform response: {0}")]
    Decode(#[from] serde_json::Error),
}

#[derive(Debug, Error)]
pub enum ManagerError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Invalid action: {token}")]
    InvalidAction { token: String },

    #[error("Access denied: {0}")]
    AccessDenied(String),

    #[error("Invalid webhook: no webhook URL configured")]
    InvalidWebhook,

    #[error("Platform error: {0}")]
    Platform(#[from] PlatformError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl ManagerError {
    /// Short error code string for callers that map failures onto a wire
    /// status (HTTP, exit code).
    pub fn code(&self) -> &'static str {
        match self {
            ManagerError::Config(_) => "CONFIG_ERROR",
            ManagerError::InvalidAction { .. } => "INVALID_ACTION",
            ManagerError::AccessDenied(_) => "ACCESS_DENIED",
            ManagerError::InvalidWebhook => "INVALID_WEBHOOK",
            ManagerError::Platform(_) => "PLATFORM_ERROR",
            ManagerError::Io(_) => "IO_ERROR",
        }
    }
}

pub type Result<T> = std::result::Result<T, ManagerError>;
