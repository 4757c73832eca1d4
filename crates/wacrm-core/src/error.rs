use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum CoreError {
    #[error("invalid number plan: {0}")]
    InvalidNumberPlan(String),
    #[error("identifier has {len} digits, need at least {min}")]
    IdentifierTooShort { len: usize, min: usize },
    #[error("not a valid local mobile number: {0}")]
    InvalidMobileNumber(String),
    #[error("invalid suffix length: {0}")]
    InvalidSuffixLength(usize),
}
