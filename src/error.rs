use std::time::Duration;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum TransportError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("backend returned {status}: {body}")]
    Status { status: u16, body: String },

    #[error("request timed out after {0:?}")]
    Timeout(Duration),
}

#[derive(Error, Debug)]
pub enum ChatError {
    #[error("invalid message: {0}")]
    Validation(String),

    #[error("unexpected response shape: {0}")]
    MalformedResponse(String),

    #[error(transparent)]
    Transport(#[from] TransportError),

    #[error("configuration error: {0}")]
    Configuration(String),
}

impl ChatError {
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    pub fn malformed(message: impl Into<String>) -> Self {
        Self::MalformedResponse(message.into())
    }

    pub fn config(message: impl Into<String>) -> Self {
        Self::Configuration(message.into())
    }

    /// Only transport failures are worth resubmitting unchanged.
    pub fn is_retryable(&self) -> bool {
        matches!(self, ChatError::Transport(_))
    }
}

impl From<reqwest::Error> for ChatError {
    fn from(err: reqwest::Error) -> Self {
        ChatError::Transport(TransportError::Http(err))
    }
}

pub type Result<T> = std::result::Result<T, ChatError>;
