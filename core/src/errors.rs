use thiserror::Error;

/// Failures talking to the Gemini `generateContent` endpoint.
#[derive(Error, Debug)]
pub enum GeminiError {
    #[error("Configuration Error: {0}")]
    ConfigError(String),

    #[error("Request Error: {0}")]
    RequestError(String),

    /// The response decoded but did not carry a usable answer.
    #[error("Response Error: {0}")]
    ResponseError(String),

    /// The model refused to answer (safety or recitation block).
    #[error("Response blocked: {0}")]
    Blocked(String),

    #[error("Parsing Error: {0}")]
    ParsingError(String),

    #[error("HTTP Error: {status_code} - {message}")]
    HttpError { status_code: u16, message: String },

    #[error(transparent)]
    SerdeError(#[from] serde_json::Error),
}

/// Result type for Gemini operations
pub type GeminiResult<T> = Result<T, GeminiError>;
