use thiserror::Error;
use tonic::Status;

/// Fatal startup errors. None of these can occur once the server is bound.
#[derive(Error, Debug)]
pub enum ConfigurationError {
    #[error("Missing required environment variable `{0}`")]
    MissingVariable(&'static str),
    #[error("Invalid credentials: {0}")]
    InvalidCredentials(String),
    #[error("Invalid configuration: {0}")]
    Invalid(String),
    #[error("Failed to load configuration: {0}")]
    Load(#[from] config::ConfigError),
    #[error("Failed to build HTTP client: {0}")]
    HttpClient(#[from] reqwest::Error),
    #[error("Failed to determine the current directory: {0}")]
    CurrentDir(#[from] std::io::Error),
}

/// Failure of the outbound call to the vision backend.
#[derive(Error, Debug)]
pub enum RemoteServiceError {
    #[error("Backend returned {status}: [{code}] {message}")]
    Backend {
        status: u16,
        code: String,
        message: String,
    },
    #[error("Backend request failed: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("Backend response could not be parsed: {0}")]
    Malformed(#[from] serde_json::Error),
}

/// Per-call errors. These are reported to the caller and never stop the server.
#[derive(Error, Debug)]
pub enum DetectionError {
    #[error("Invalid base64 payload: {0}")]
    Decode(#[from] base64::DecodeError),
    #[error("Invalid image payload: {0}")]
    InvalidPayload(String),
    #[error("Remote service error: {0}")]
    RemoteService(#[from] RemoteServiceError),
}

impl From<DetectionError> for Status {
    fn from(err: DetectionError) -> Self {
        match err {
            DetectionError::Decode(_) | DetectionError::InvalidPayload(_) => {
                Status::invalid_argument(err.to_string())
            }
            DetectionError::RemoteService(_) => Status::unknown(err.to_string()),
        }
    }
}
