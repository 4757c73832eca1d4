use wacrm_core::CoreError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ExtractError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("core error: {0}")]
    Core(#[from] CoreError),
    #[error("invalid selector {selector:?}: {message}")]
    Selector { selector: String, message: String },
    #[error("invalid url: {0}")]
    Url(#[from] url::ParseError),
    #[error("event dispatch failed: {0}")]
    Dispatch(String),
    #[error("notification failed: {0}")]
    Notify(String),
}

pub type Result<T> = std::result::Result<T, ExtractError>;
