use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Opaque reference to an element in the live document.
///
/// Handles are only valid until the document navigates or the element is
/// detached; after that every call using them fails with
/// [`DriverError::StaleContext`].
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ElementHandle(pub String);

impl fmt::Display for ElementHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A searchable scope inside the current frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ContextHandle {
    /// The light DOM of the current frame's document.
    Document,
    /// The open shadow root attached to the given host.
    Shadow(ElementHandle),
}

/// One element as reported by [`Browser::query_elements`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawElement {
    pub handle: ElementHandle,
    /// Lower-case tag name.
    pub tag: String,
    /// Text of the element's own text nodes, not its descendants'.
    pub text: String,
    pub attributes: BTreeMap<String, String>,
    /// Child-index path from the context root to this element.
    pub path: Vec<u32>,
    pub has_shadow_root: bool,
}

/// Errors reported by a browser implementation.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum DriverError {
    /// The document, frame or element went away since it was queried.
    #[error("Stale context: {0}")]
    StaleContext(String),

    /// There is no live browser session to talk to.
    #[error("Browser session closed: {0}")]
    SessionClosed(String),

    /// The driver rejected or failed a command.
    #[error("Driver command failed: {0}")]
    Command(String),

    /// The implementation cannot perform this operation.
    #[error("Unsupported operation: {0}")]
    Unsupported(String),

    /// Browser alias or launch options were invalid.
    #[error("Invalid browser options: {0}")]
    InvalidOptions(String),
}

impl DriverError {
    /// Whether re-running the same query later may succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(self, DriverError::StaleContext(_) | DriverError::Command(_))
    }
}

/// The browser capability the finder is written against.
///
/// All calls for one session are issued sequentially; implementations do
/// not need to support concurrent commands.
#[async_trait]
pub trait Browser: Send + Sync {
    /// Short label used in logs (browser alias or implementation name).
    fn name(&self) -> &str;

    /// Every element of `ctx` in document order, without descending into
    /// shadow roots or frames.
    async fn query_elements(&self, ctx: &ContextHandle) -> Result<Vec<RawElement>, DriverError>;

    /// Rendered text of the element and its descendants.
    async fn element_text(&self, el: &ElementHandle) -> Result<String, DriverError>;

    /// DOM property such as `value`, `checked`, `disabled` or `readOnly`.
    async fn element_property(
        &self,
        el: &ElementHandle,
        name: &str,
    ) -> Result<Option<String>, DriverError>;

    /// Rendered with a non-zero box, not `display:none`/`visibility:hidden`,
    /// and not covered by another element at its centre.
    async fn element_visible(&self, el: &ElementHandle) -> Result<bool, DriverError>;

    async fn shadow_root(&self, el: &ElementHandle) -> Result<Option<ContextHandle>, DriverError>;

    async fn click(&self, el: &ElementHandle) -> Result<(), DriverError>;

    async fn clear(&self, el: &ElementHandle) -> Result<(), DriverError>;

    async fn type_text(&self, el: &ElementHandle, text: &str) -> Result<(), DriverError>;

    /// Enter the given iframe of the current frame, or return to the top
    /// document when `frame` is `None`.
    async fn switch_frame(&self, frame: Option<&ElementHandle>) -> Result<(), DriverError>;

    async fn navigate(&self, url: &str) -> Result<(), DriverError>;

    async fn current_url(&self) -> Result<String, DriverError>;

    async fn title(&self) -> Result<String, DriverError>;

    /// PNG bytes of the current viewport.
    async fn screenshot(&self) -> Result<Vec<u8>, DriverError>;

    /// Draw an outline around the element.
    async fn highlight(&self, el: &ElementHandle, color: &str) -> Result<(), DriverError>;

    /// End the session. Further calls fail with [`DriverError::SessionClosed`].
    async fn close(&self) -> Result<(), DriverError>;
}
