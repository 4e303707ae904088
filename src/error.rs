use thiserror::Error;

/// Every failure the client can surface to the user.
///
/// None of these are fatal: the UI turns each one into a notice and keeps
/// running.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ClientError {
    /// Rejected locally before any network call (bad file type or size).
    #[error("{0}")]
    Validation(String),

    /// Network failure or a backend that could not be reached.
    #[error("{0}")]
    Transport(String),

    /// The backend answered with an explicit error payload.
    #[error("{0}")]
    Application(String),

    /// Error event delivered on the push channel.
    #[error("{0}")]
    Stream(String),

    /// Send attempted while the status monitor reports the backend down.
    #[error("{0}")]
    Disconnected(String),

    /// A user action the client refuses outright, such as deleting the
    /// default session.
    #[error("{0}")]
    Refused(String),
}

impl ClientError {
    pub fn transport(err: impl std::fmt::Display) -> Self {
        Self::Transport(err.to_string())
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Self::Validation(_) => "validation",
            Self::Transport(_) => "transport",
            Self::Application(_) => "application",
            Self::Stream(_) => "stream",
            Self::Disconnected(_) => "disconnected",
            Self::Refused(_) => "refused",
        }
    }
}

impl From<reqwest::Error> for ClientError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            Self::Transport(format!("Request timed out: {err}"))
        } else if err.is_connect() {
            Self::Transport(format!("Connection failed: {err}"))
        } else if err.is_decode() {
            Self::Application(format!("Unexpected response from server: {err}"))
        } else {
            Self::Transport(format!("Network error: {err}"))
        }
    }
}

pub type ClientResult<T> = Result<T, ClientError>;
