use thiserror::Error;

/// Generic text shown to users when the backend cannot be reached.
pub const NETWORK_ERROR_MESSAGE: &str = "Network error. Please check your connection and try again.";

/// Client-level error type.
/// Lower layers return `Result<T, ClientError>`; the session store converts
/// these into notifications and a success flag.
#[derive(Debug, Error)]
pub enum ClientError {
    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Unauthorized")]
    Unauthorized,

    #[error("Transport error: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("Server error (status {status}): {detail}")]
    Server { status: u16, detail: String },

    #[error("Unexpected response body: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("Token storage error: {0}")]
    Storage(#[from] std::io::Error),

    #[error("Job search unavailable: {0}")]
    SearchUnavailable(String),

    #[error("Task failed: {0}")]
    TaskFailed(String),

    #[error("Task timed out after {attempts} status checks")]
    TaskTimeout { attempts: u32 },

    #[error("Task was cancelled")]
    TaskCancelled,
}

impl ClientError {
    /// Message suitable for a user-facing notification.
    /// Server-provided details pass through verbatim; transport failures are generic.
    pub fn user_message(&self) -> String {
        match self {
            ClientError::Validation(msg) => msg.clone(),
            ClientError::Unauthorized => "Your session has expired. Please sign in again.".to_string(),
            ClientError::Transport(_) => NETWORK_ERROR_MESSAGE.to_string(),
            ClientError::Server { detail, .. } => detail.clone(),
            ClientError::Decode(_) => "The server returned an unexpected response.".to_string(),
            ClientError::Storage(_) => "Could not access the saved session.".to_string(),
            ClientError::SearchUnavailable(msg) => msg.clone(),
            ClientError::TaskFailed(msg) => msg.clone(),
            ClientError::TaskTimeout { .. } => {
                "The job application agent is taking too long. Please try again later.".to_string()
            }
            ClientError::TaskCancelled => "The job application was cancelled.".to_string(),
        }
    }

    /// True for failures where the backend never produced a verdict.
    pub fn is_transport(&self) -> bool {
        matches!(self, ClientError::Transport(_))
    }
}
