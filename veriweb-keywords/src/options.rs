use std::time::Duration;
use veriweb_common::SearchConfig;
use veriweb_finder::{Anchor, SearchRequest};

/// Per-call overrides shared by the search keywords.
///
/// Unset fields fall back to the session's [`SearchConfig`].
///
/// ```
/// use std::time::Duration;
/// use veriweb_keywords::KeywordOptions;
///
/// let opts = KeywordOptions::default()
///     .anchor("Bob")
///     .timeout(Duration::from_secs(2))
///     .partial_match(false);
/// assert_eq!(opts.anchor.as_deref(), Some("Bob"));
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct KeywordOptions {
    /// `"2"` picks the second match; other text picks the match nearest to it.
    pub anchor: Option<String>,
    pub timeout: Option<Duration>,
    pub partial_match: Option<bool>,
    pub visibility: Option<bool>,
    /// Fail when several elements match and no anchor is given.
    pub strict: bool,
    /// `TypeText`: clear the field first (default true).
    pub clear: Option<bool>,
    /// `TypeText`: read the value back and retry until it matches.
    pub check: bool,
}

impl KeywordOptions {
    pub fn anchor(mut self, anchor: &str) -> Self {
        self.anchor = Some(anchor.to_string());
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn partial_match(mut self, partial: bool) -> Self {
        self.partial_match = Some(partial);
        self
    }

    pub fn visibility(mut self, required: bool) -> Self {
        self.visibility = Some(required);
        self
    }

    pub fn strict(mut self, strict: bool) -> Self {
        self.strict = strict;
        self
    }

    pub fn clear(mut self, clear: bool) -> Self {
        self.clear = Some(clear);
        self
    }

    pub fn check(mut self, check: bool) -> Self {
        self.check = check;
        self
    }

    /// Layer these overrides onto a request built from the session config.
    pub(crate) fn apply(&self, req: SearchRequest, config: &SearchConfig) -> SearchRequest {
        req.anchor(self.anchor.as_deref().and_then(Anchor::parse))
            .partial(self.partial_match.unwrap_or(config.partial_match))
            .visibility(self.visibility.unwrap_or(config.visibility))
            .timeout(self.timeout.unwrap_or(config.default_timeout))
            .strict(self.strict)
    }
}
