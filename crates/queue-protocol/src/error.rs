//! Error types for queue protocol operations.

use thiserror::Error;

/// Caller-facing error type for all queue operations
#[derive(Debug, Error)]
pub enum QueueError {
    #[error("Resource not found: {resource}")]
    ResourceNotFound { resource: String },

    #[error("Resource already exists: {resource}")]
    ResourceExists { resource: String },

    #[error("Precondition failed during {operation} on {resource}: {message}")]
    PreconditionFailed {
        operation: String,
        resource: String,
        message: String,
    },

    #[error("Pop receipt required for {operation}")]
    MissingReceipt { operation: String },

    #[error("Transport failure ({status} {code}): {message}")]
    Transport {
        status: u16,
        code: String,
        message: String,
    },

    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    #[error("Encoding error: {0}")]
    Encoding(#[from] EncodingError),
}

impl QueueError {
    /// Map a failed transport call to the domain taxonomy.
    ///
    /// 404/409/412 become typed errors carrying the operation and resource
    /// they occurred on; everything else surfaces as [`QueueError::Transport`].
    pub fn from_transport(
        operation: &str,
        resource: &str,
        error: crate::transport::TransportError,
    ) -> Self {
        match error.status {
            404 => Self::ResourceNotFound {
                resource: resource.to_string(),
            },
            409 => Self::ResourceExists {
                resource: resource.to_string(),
            },
            412 => Self::PreconditionFailed {
                operation: operation.to_string(),
                resource: resource.to_string(),
                message: error.message,
            },
            _ => Self::Transport {
                status: error.status,
                code: error.code,
                message: error.message,
            },
        }
    }

    /// Check if error is transient and a caller-side retry could help
    pub fn is_transient(&self) -> bool {
        match self {
            Self::ResourceNotFound { .. } => false,
            Self::ResourceExists { .. } => false,
            Self::PreconditionFailed { .. } => false,
            Self::MissingReceipt { .. } => false,
            Self::Transport { status, .. } => *status >= 500 || *status == 408 || *status == 429,
            Self::Validation(_) => false,
            Self::Encoding(_) => false,
        }
    }
}

/// Client-detectable precondition violations, raised before any transport call
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ValidationError {
    #[error("Required field missing: {field}")]
    Required { field: String },

    #[error("Invalid format for {field}: {message}")]
    InvalidFormat { field: String, message: String },

    #[error("Value out of range for {field}: {message}")]
    OutOfRange { field: String, message: String },

    #[error("Too many access policies provided: {provided} exceeds the maximum of {max}")]
    TooManyAccessPolicies { provided: usize, max: usize },
}

/// Payload cannot be represented under the configured message codec
#[derive(Debug, Error, PartialEq, Eq)]
pub enum EncodingError {
    #[error("Message body is not valid UTF-8 text")]
    NotText,

    #[error("Message body is not valid base64: {message}")]
    InvalidBase64 { message: String },
}

#[cfg(test)]
#[path = "error_tests.rs"]
mod tests;
