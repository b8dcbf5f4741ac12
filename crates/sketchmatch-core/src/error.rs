use thiserror::Error;

/// Local input errors, raised before any remote call is made.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ValidationError {
    #[error("minimum similarity must be within 0..=100, got {0}")]
    MinSimilarityOutOfRange(f32),
    #[error("max results must be within 1..=50, got {0}")]
    MaxResultsOutOfRange(u32),
    #[error("select at least one facial feature")]
    EmptySelection,
    #[error("select an image first")]
    NoImageCaptured,
    #[error("no probe available to search")]
    NoProbe,
    #[error("unknown feature category: {0}")]
    UnknownCategory(String),
    #[error("unknown {category} variant: {variant}")]
    UnknownVariant { category: String, variant: String },
}

/// Misconfigured call arguments. Fatal to the call, never retried.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ConfigError {
    #[error("unknown sketch method: {0} (expected adaptive, pencil or edge)")]
    UnknownSketchMethod(String),
}

/// Failure building, sending or decoding a call to the remote face service.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ServiceError {
    #[error("network error: {0}")]
    Network(String),
    #[error("service returned {status}: {message}")]
    Status { status: u16, message: String },
    #[error("malformed response: {0}")]
    Decode(String),
    #[error("request could not be encoded: {0}")]
    Encode(String),
}

impl ServiceError {
    /// Message to show the user: the server's own error text when it sent one,
    /// otherwise `fallback`.
    pub fn user_message(&self, fallback: &str) -> String {
        match self {
            ServiceError::Status { message, .. } if !message.trim().is_empty() => message.clone(),
            _ => fallback.to_string(),
        }
    }
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum SessionError {
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Service(#[from] ServiceError),
    #[error("pipeline task exited")]
    ChannelClosed,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_user_message_prefers_server_text() {
        let err = ServiceError::Status {
            status: 400,
            message: "No face detected in image".into(),
        };
        assert_eq!(err.user_message("Failed to search faces"), "No face detected in image");
    }

    #[test]
    fn test_user_message_falls_back() {
        let err = ServiceError::Network("connection refused".into());
        assert_eq!(err.user_message("Failed to search faces"), "Failed to search faces");

        let blank = ServiceError::Status { status: 500, message: "  ".into() };
        assert_eq!(blank.user_message("Failed to compose face"), "Failed to compose face");
    }
}
