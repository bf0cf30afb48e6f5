use crate::error::FindError;
use crate::matcher::normalize;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;
use veriweb_common::SearchConfig;

/// What part of an element a locator is compared against.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LocatorKind {
    /// The element's own visible text.
    Text,
    /// `id`, `title`, `tooltip`, `aria-label`, then visible text.
    Attribute,
    /// Input-like elements by placeholder, id, name, label and similar.
    Input,
}

impl fmt::Display for LocatorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            LocatorKind::Text => "text",
            LocatorKind::Attribute => "attribute",
            LocatorKind::Input => "input",
        })
    }
}

/// Disambiguates between several candidates.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Anchor {
    /// 1-based position in traversal order.
    Index(usize),
    /// Pick the candidate closest to an element matching this text.
    Text(String),
}

impl Anchor {
    /// `"2"` is an index, any other non-blank string is a text anchor.
    pub fn parse(raw: &str) -> Option<Anchor> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return None;
        }
        Some(match trimmed.parse::<usize>() {
            Ok(index) => Anchor::Index(index),
            Err(_) => Anchor::Text(trimmed.to_string()),
        })
    }
}

impl fmt::Display for Anchor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Anchor::Index(i) => write!(f, "#{i}"),
            Anchor::Text(t) => write!(f, "near {t:?}"),
        }
    }
}

/// One locator search, immutable once built.
#[derive(Debug, Clone, PartialEq)]
pub struct SearchRequest {
    pub target: String,
    pub kind: LocatorKind,
    pub partial_match: bool,
    pub anchor: Option<Anchor>,
    pub visibility_required: bool,
    pub timeout: Duration,
    pub strict: bool,
}

impl SearchRequest {
    fn with_kind(target: &str, kind: LocatorKind, config: &SearchConfig) -> Self {
        Self {
            target: target.to_string(),
            kind,
            partial_match: config.partial_match,
            anchor: None,
            visibility_required: config.visibility,
            timeout: config.default_timeout,
            strict: false,
        }
    }

    pub fn text(target: &str, config: &SearchConfig) -> Self {
        Self::with_kind(target, LocatorKind::Text, config)
    }

    pub fn attribute(target: &str, config: &SearchConfig) -> Self {
        Self::with_kind(target, LocatorKind::Attribute, config)
    }

    pub fn input(target: &str, config: &SearchConfig) -> Self {
        Self::with_kind(target, LocatorKind::Input, config)
    }

    pub fn anchor(mut self, anchor: Option<Anchor>) -> Self {
        self.anchor = anchor;
        self
    }

    pub fn partial(mut self, partial: bool) -> Self {
        self.partial_match = partial;
        self
    }

    pub fn visibility(mut self, required: bool) -> Self {
        self.visibility_required = required;
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn strict(mut self, strict: bool) -> Self {
        self.strict = strict;
        self
    }

    /// Reject requests that can never match, before any polling.
    pub fn validate(&self) -> Result<(), FindError> {
        if normalize(&self.target).is_empty() {
            return Err(FindError::InvalidLocator("locator text is empty".to_string()));
        }
        match &self.anchor {
            Some(Anchor::Index(0)) => Err(FindError::InvalidLocator(
                "anchor index starts at 1".to_string(),
            )),
            Some(Anchor::Text(text)) if normalize(text).is_empty() => Err(
                FindError::InvalidLocator("anchor text is empty".to_string()),
            ),
            _ => Ok(()),
        }
    }
}
