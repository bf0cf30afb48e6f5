use crate::request::LocatorKind;
use std::fmt;
use std::time::Duration;
use thiserror::Error;
use veriweb_drivers::DriverError;

/// Why one resolution attempt (or a whole poll) did not produce an element.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum FindError {
    #[error("Invalid locator: {0}")]
    InvalidLocator(String),

    #[error("No element matches {target:?}")]
    NoMatch { target: String },

    #[error("{count} elements match {target:?}; use an anchor to pick one")]
    AmbiguousMatch { target: String, count: usize },

    #[error("Anchor index {index} is out of range; {count} candidates found")]
    AnchorOutOfRange { index: usize, count: usize },

    #[error("Stale context: {0}")]
    StaleContext(String),

    #[error("{0}")]
    Unsatisfied(String),

    #[error(transparent)]
    Driver(DriverError),

    #[error("Search cancelled")]
    Cancelled,

    #[error("Timed out: {last}")]
    LocatorTimeout { last: Box<FindError> },
}

impl FindError {
    /// Whether the poller should try again on the next tick.
    pub fn is_retryable(&self) -> bool {
        match self {
            FindError::NoMatch { .. }
            | FindError::AmbiguousMatch { .. }
            | FindError::StaleContext(_)
            | FindError::Unsatisfied(_) => true,
            FindError::Driver(err) => err.is_retryable(),
            FindError::InvalidLocator(_)
            | FindError::AnchorOutOfRange { .. }
            | FindError::Cancelled
            | FindError::LocatorTimeout { .. } => false,
        }
    }

    /// The last per-tick error for timeouts, the error itself otherwise.
    pub fn root(&self) -> &FindError {
        match self {
            FindError::LocatorTimeout { last } => last.root(),
            other => other,
        }
    }
}

impl From<DriverError> for FindError {
    fn from(err: DriverError) -> Self {
        match err {
            DriverError::StaleContext(msg) => FindError::StaleContext(msg),
            other => FindError::Driver(other),
        }
    }
}

/// What a failed search was looking for and how long it tried.
#[derive(Debug, Clone, PartialEq)]
pub struct SearchDiagnostics {
    pub target: String,
    pub kind: LocatorKind,
    pub shadow_dom: bool,
    pub partial_match: bool,
    pub elapsed: Duration,
    pub attempts: u32,
}

fn on_off(flag: bool) -> &'static str {
    if flag {
        "on"
    } else {
        "off"
    }
}

/// Error returned by [`crate::Finder`]: the cause plus search diagnostics.
#[derive(Debug, Clone, PartialEq)]
pub struct SearchFailure {
    pub error: FindError,
    pub diagnostics: SearchDiagnostics,
}

impl fmt::Display for SearchFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let d = &self.diagnostics;
        write!(
            f,
            "{} [target {:?}, kind {}, shadow DOM {}, partial match {}, elapsed {:.1?}, attempts {}]",
            self.error,
            d.target,
            d.kind,
            on_off(d.shadow_dom),
            on_off(d.partial_match),
            d.elapsed,
            d.attempts
        )
    }
}

impl std::error::Error for SearchFailure {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        Some(&self.error)
    }
}

impl SearchFailure {
    pub fn is_timeout(&self) -> bool {
        matches!(self.error, FindError::LocatorTimeout { .. })
    }
}
