use thiserror::Error;

#[derive(Error, Debug)]
pub enum ClientError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("OpenAI API error ({status}): {message}")]
    Api { status: u16, message: String },

    #[error("Failed to decode response: {0}")]
    Decode(String),

    #[error("Invalid client configuration: {0}")]
    InvalidConfig(String),

    #[error("Not found: {0}")]
    NotFound(String),
}

impl ClientError {
    /// Whether retrying the same request may succeed
    ///
    /// Connection failures, timeouts, rate limiting and 5xx responses are
    /// transient. Everything else reflects the request itself.
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Http(e) => e.is_timeout() || e.is_connect() || e.is_request(),
            Self::Api { status, .. } => *status == 429 || (500..600).contains(status),
            Self::Decode(_) | Self::InvalidConfig(_) | Self::NotFound(_) => false,
        }
    }
}

pub type Result<T> = std::result::Result<T, ClientError>;
