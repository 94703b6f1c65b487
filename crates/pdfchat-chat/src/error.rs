//! Error types for query dispatch.

use pdfchat_core::error::PdfChatError;

/// Failures of one round trip to the query service.
///
/// None of these reach the caller of `submit_query`; each is logged and
/// replaced by the synthetic assistant message.
#[derive(Debug, thiserror::Error)]
pub enum DispatchError {
    #[error("transport error: {0}")]
    Transport(String),
    #[error("HTTP error! status: {0}")]
    Status(u16),
    #[error("malformed response body: {0}")]
    MalformedBody(String),
    #[error("response body has no textual `response` field")]
    MissingResponse,
}

impl From<reqwest::Error> for DispatchError {
    fn from(err: reqwest::Error) -> Self {
        DispatchError::Transport(err.to_string())
    }
}

impl From<DispatchError> for PdfChatError {
    fn from(err: DispatchError) -> Self {
        PdfChatError::Dispatch(err.to_string())
    }
}
