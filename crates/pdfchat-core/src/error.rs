use thiserror::Error;

/// Top-level error type for the chat widget.
///
/// Subsystem crates define their own error types where they need more detail
/// and implement `From<SubsystemError> for PdfChatError` so that `?` works
/// across crate boundaries.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum PdfChatError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Speech error: {0}")]
    Speech(String),

    #[error("Invalid state transition: {from} -> {to}")]
    State { from: String, to: String },

    #[error("Dispatch error: {0}")]
    Dispatch(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl From<toml::de::Error> for PdfChatError {
    fn from(err: toml::de::Error) -> Self {
        PdfChatError::Config(err.to_string())
    }
}

impl From<toml::ser::Error> for PdfChatError {
    fn from(err: toml::ser::Error) -> Self {
        PdfChatError::Config(err.to_string())
    }
}

impl From<serde_json::Error> for PdfChatError {
    fn from(err: serde_json::Error) -> Self {
        PdfChatError::Serialization(err.to_string())
    }
}

/// A specialized `Result` type for widget operations.
pub type Result<T> = std::result::Result<T, PdfChatError>;
