use crate::expr::{EvaluationError, ParseError};

#[derive(Debug, thiserror::Error)]
pub enum AuctionError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Unexpected HTTP status {status}: {message}")]
    Status { status: u16, message: String },

    #[error("Nexon API error {name}: {message}")]
    Api { name: String, message: String },

    #[error("API quota exhausted")]
    QuotaExhausted,

    #[error("Request cancelled")]
    Cancelled,

    #[error("Decode error: {0}")]
    Decode(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error(transparent)]
    Parse(#[from] ParseError),

    #[error(transparent)]
    Evaluation(#[from] EvaluationError),
}

pub type Result<T> = std::result::Result<T, AuctionError>;
