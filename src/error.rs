use thiserror::Error;

/// Errors produced by the hints engine and its host environment
#[derive(Debug, Error)]
pub enum HintsError {
    /// Options failed validation
    #[error("Invalid options: {0}")]
    InvalidOptions(String),

    /// A node id does not refer to a node of this document
    #[error("Node not found: {0}")]
    NodeNotFound(String),

    /// A frame id does not refer to a frame of this tab
    #[error("Frame not found: {0}")]
    FrameNotFound(u32),

    /// A tab id does not refer to an open tab
    #[error("Tab not found: {0}")]
    TabNotFound(u32),

    /// A page fixture could not be turned into a document
    #[error("Failed to parse fixture: {0}")]
    FixtureParseFailed(String),

    /// Activating a hinted element failed
    #[error("Activation of element {index} failed: {reason}")]
    ActivationFailed { index: usize, reason: String },

    /// Reading options or fixtures from disk failed
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// (De)serializing JSON failed
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Result alias used throughout the crate
pub type Result<T> = std::result::Result<T, HintsError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = HintsError::ActivationFailed {
            index: 3,
            reason: "detached".to_string(),
        };
        assert_eq!(err.to_string(), "Activation of element 3 failed: detached");

        let err = HintsError::FrameNotFound(7);
        assert_eq!(err.to_string(), "Frame not found: 7");
    }

    #[test]
    fn test_json_error_conversion() {
        let parse: std::result::Result<serde_json::Value, _> = serde_json::from_str("{");
        let err: HintsError = parse.unwrap_err().into();
        assert!(matches!(err, HintsError::Json(_)));
    }
}
