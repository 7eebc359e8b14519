use roadlore_context::{LookupError, NarrationError};

#[derive(Debug, thiserror::Error)]
pub enum GeminiError {
    #[error("API key is not configured")]
    MissingApiKey,
    #[error("API key rejected (HTTP {0})")]
    Unauthorized(u16),
    #[error("request failed: {0}")]
    Request(#[from] reqwest::Error),
    #[error("API error {status}: {message}")]
    Api { status: u16, message: String },
    #[error("response contained no {0}")]
    Empty(&'static str),
    #[error("invalid audio payload: {0}")]
    InvalidAudio(String),
}

impl GeminiError {
    pub fn is_credentials(&self) -> bool {
        matches!(self, GeminiError::MissingApiKey | GeminiError::Unauthorized(_))
    }
}

impl From<GeminiError> for LookupError {
    fn from(e: GeminiError) -> Self {
        if e.is_credentials() {
            LookupError::CredentialsMissing
        } else {
            LookupError::Provider(e.to_string())
        }
    }
}

impl From<GeminiError> for NarrationError {
    fn from(e: GeminiError) -> Self {
        match e {
            e if e.is_credentials() => NarrationError::CredentialsMissing,
            GeminiError::Empty(_) => NarrationError::NoAudio,
            other => NarrationError::Failed(other.to_string()),
        }
    }
}

pub type Result<T> = std::result::Result<T, GeminiError>;
