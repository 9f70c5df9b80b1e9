use thiserror::Error;

/// Error taxonomy shared by every crate in the workspace.
///
/// Errors from the two external clients are terminal for the current user
/// action: callers surface them and leave previously persisted state
/// untouched.
#[derive(Debug, Error)]
pub enum DeskError {
    /// A required enquiry field is missing. Blocks the action entirely.
    #[error("validation error: {0}")]
    Validation(String),

    /// The relational store is unreachable or rejected the write.
    #[error("persistence failed: {source}")]
    Persistence {
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// The model catalog endpoint returned a non-success status.
    #[error("model catalog request failed with status {status}")]
    Discovery { status: u16 },

    /// The catalog held no priority model, no usable flash model, and no
    /// default identifier.
    #[error("no usable generation model available")]
    NoModelAvailable,

    #[error("quota exhausted for model {model}")]
    QuotaExceeded { model: String },

    #[error("model {model} not found")]
    ModelNotFound { model: String },

    /// Any other non-success status from the completion endpoint.
    #[error("provider error {status}: {body}")]
    Provider { status: u16, body: String },

    /// Transport-level failure before a status was received.
    #[error("connection failed: {0}")]
    Connection(String),

    /// The response body did not match the expected candidate shape.
    #[error("provider response did not match the expected shape")]
    MalformedResponse,

    /// Encoding or template failure during PDF assembly.
    #[error("rendering failed: {0}")]
    Rendering(String),
}

impl DeskError {
    pub fn persistence(source: impl std::error::Error + Send + Sync + 'static) -> Self {
        Self::Persistence {
            source: Box::new(source),
        }
    }
}
