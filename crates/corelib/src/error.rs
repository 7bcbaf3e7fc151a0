//! Controller-level errors (renderer-agnostic).

use thiserror::Error;

#[derive(Debug, Error, PartialEq)]
pub enum ViewerError {
    #[error("invalid viewer configuration: {0}")]
    InvalidConfig(String),
}

pub type ViewerResult<T> = Result<T, ViewerError>;
