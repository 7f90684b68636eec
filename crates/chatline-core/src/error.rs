use thiserror::Error;

/// Shown for any failure that isn't a structured server error.
pub const FALLBACK_ERROR_TEXT: &str = "Oops, something went wrong! Check your connection.";

#[derive(Debug, Error)]
pub enum ChatError {
    /// Draft was empty or whitespace; nothing was sent.
    #[error("message is empty")]
    EmptyInput,

    /// Backend answered with a non-200 status and an `error` field.
    #[error("server returned {status}: {message}")]
    Server { status: u16, message: String },

    /// Connection failure, timeout, or a response that didn't match the contract.
    #[error("transport error: {0}")]
    Transport(String),
}

impl ChatError {
    /// Text shown to the user for this failure.
    ///
    /// Returns `None` for `EmptyInput`, which is refused silently.
    pub fn display_text(&self) -> Option<String> {
        match self {
            ChatError::EmptyInput => None,
            ChatError::Server { message, .. } => Some(format!("Error: {}", message)),
            ChatError::Transport(_) => Some(FALLBACK_ERROR_TEXT.to_string()),
        }
    }
}

impl From<reqwest::Error> for ChatError {
    fn from(err: reqwest::Error) -> Self {
        ChatError::Transport(err.to_string())
    }
}
