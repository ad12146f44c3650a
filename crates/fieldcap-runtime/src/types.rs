use fieldcap_composite::CompositeError;
use fieldcap_forms::FormError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum RuntimeError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Task join error: {0}")]
    TaskJoin(#[from] tokio::task::JoinError),
    #[error(transparent)]
    Form(#[from] FormError),
    #[error(transparent)]
    Composite(#[from] CompositeError),
    #[error("Unknown form: {0}")]
    UnknownForm(String),
    #[error("Login required")]
    LoginRequired,
    #[error("Server rejected the request: {0}")]
    Rejected(String),
}

pub type Result<T> = std::result::Result<T, RuntimeError>;
