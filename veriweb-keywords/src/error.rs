use thiserror::Error;
use veriweb_common::ConfigError;
use veriweb_drivers::DriverError;
use veriweb_finder::{FindError, SearchFailure};
use veriweb_http::LinkError;

/// Failure of one keyword call, as reported to the test runner.
#[derive(Debug, Error)]
pub enum KeywordError {
    #[error(transparent)]
    Search(#[from] SearchFailure),

    #[error(transparent)]
    Find(#[from] FindError),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Driver(#[from] DriverError),

    #[error(transparent)]
    Links(#[from] LinkError),

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),
}

impl KeywordError {
    /// The search failure behind this error, if it came from the finder.
    pub fn search(&self) -> Option<&SearchFailure> {
        match self {
            KeywordError::Search(failure) => Some(failure),
            _ => None,
        }
    }
}

pub type KeywordResult<T> = Result<T, KeywordError>;
