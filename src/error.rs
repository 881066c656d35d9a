use serde::Serialize;

/// Outcome of a failed capture cycle. Stored as the workflow's `Failed` state
/// and always rendered to the user.
#[derive(Debug, Clone, PartialEq, Serialize, thiserror::Error)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum WorkflowError {
    #[error("Permission denied: {message}")]
    PermissionDenied { message: String },
    #[error("Capture failed: {message}")]
    CaptureFailed { message: String },
    #[error("Network unavailable: {message}")]
    NetworkUnavailable { message: String },
    #[error("Server error {code}: {message}")]
    ServerError { code: u16, message: String },
    #[error("Malformed response: {message}")]
    MalformedResponse { message: String },
}

/// Falls back to `default` when the caller had nothing useful to say.
fn non_empty(message: impl Into<String>, default: &str) -> String {
    let message = message.into();
    if message.trim().is_empty() {
        default.to_string()
    } else {
        message
    }
}

impl WorkflowError {
    pub fn permission_denied(message: impl Into<String>) -> Self {
        Self::PermissionDenied {
            message: non_empty(message, "Camera or microphone access was denied"),
        }
    }

    pub fn capture_failed(message: impl Into<String>) -> Self {
        Self::CaptureFailed {
            message: non_empty(message, "Failed to take picture"),
        }
    }

    pub fn network_unavailable(message: impl Into<String>) -> Self {
        Self::NetworkUnavailable {
            message: non_empty(message, "Could not reach the analysis service"),
        }
    }

    pub fn server_error(code: u16, message: impl Into<String>) -> Self {
        let default = format!("Server returned HTTP {}", code);
        Self::ServerError {
            code,
            message: non_empty(message, &default),
        }
    }

    pub fn malformed_response(message: impl Into<String>) -> Self {
        Self::MalformedResponse {
            message: non_empty(message, "The analysis service sent an unexpected response"),
        }
    }

    /// Human-readable detail, never empty.
    pub fn message(&self) -> &str {
        match self {
            Self::PermissionDenied { message }
            | Self::CaptureFailed { message }
            | Self::NetworkUnavailable { message }
            | Self::ServerError { message, .. }
            | Self::MalformedResponse { message } => message,
        }
    }

    /// Short machine-friendly tag, used for logging and the rendered view.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::PermissionDenied { .. } => "permissionDenied",
            Self::CaptureFailed { .. } => "captureFailed",
            Self::NetworkUnavailable { .. } => "networkUnavailable",
            Self::ServerError { .. } => "serverError",
            Self::MalformedResponse { .. } => "malformedResponse",
        }
    }

    /// Whether retrying without outside intervention can plausibly succeed.
    /// The UI offers retry regardless.
    pub fn is_retryable(&self) -> bool {
        !matches!(
            self,
            Self::PermissionDenied { .. } | Self::MalformedResponse { .. }
        )
    }

    /// Extra hint shown next to the message, if any.
    pub fn guidance(&self) -> Option<&'static str> {
        match self {
            Self::PermissionDenied { .. } => {
                Some("Enable camera and microphone access for Aural Eyes in your device settings.")
            }
            Self::NetworkUnavailable { .. } => Some("Check your connection and try again."),
            Self::MalformedResponse { .. } => {
                Some("The analysis service may be misconfigured. Please report this problem.")
            }
            _ => None,
        }
    }
}

/// A user intent that is not valid in the current state. Returned to the
/// caller; the workflow state is left untouched.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum IntentError {
    #[error("Rejected: {0}")]
    Rejected(String),
    #[error("Workflow was abandoned")]
    Abandoned,
}
