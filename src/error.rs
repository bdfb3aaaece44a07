use crate::model::{ObjectId, Variant};

/// Errors surfaced by the animation core. Nothing here is retried internally;
/// callers decide how to present a failure.
#[derive(Debug, thiserror::Error)]
pub enum CelError {
    /// Input rejected before any state was touched (bad name, out-of-range
    /// dimension, fps or step).
    #[error("validation failed: {0}")]
    Validation(String),

    /// A mutation referenced an identifier that no longer exists.
    #[error("no {variant} object with id {row}", variant = .id.variant, row = .id.row)]
    NotFound { id: ObjectId },

    /// The underlying project store failed; the enclosing transaction has
    /// already rolled back.
    #[error("project store error: {0}")]
    Storage(#[from] rusqlite::Error),

    /// Codec/container pairing rejected before the export pipeline started.
    #[error("container {container} does not support codec {codec}")]
    ExportConfig { codec: String, container: String },
}

impl CelError {
    pub fn validation(message: impl Into<String>) -> Self {
        CelError::Validation(message.into())
    }

    pub fn not_found(variant: Variant, row: i64) -> Self {
        CelError::NotFound {
            id: ObjectId { variant, row },
        }
    }
}

pub type CelResult<T> = Result<T, CelError>;
