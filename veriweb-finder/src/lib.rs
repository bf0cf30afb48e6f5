//! Text and attribute driven element resolution.
//!
//! A search runs the same pipeline on every poll tick:
//!
//! 1. [`dom`] flattens the current document (light DOM, then shadow roots,
//!    then iframes) into [`dom::DomNode`]s
//! 2. [`matcher`] keeps the nodes whose text or attributes satisfy the locator
//! 3. [`visibility`] drops what the browser does not render
//! 4. [`anchor`] picks one candidate by index or by proximity to anchor text
//! 5. [`dispatch`] acts on it
//!
//! [`poller`] repeats the pipeline until it succeeds, fails fatally or the
//! deadline passes. [`Finder`] ties the stages to a browser and a
//! [`veriweb_common::SearchConfig`].
//!
//! ```no_run
//! # async fn demo(browser: &dyn veriweb_drivers::Browser) -> Result<(), veriweb_finder::SearchFailure> {
//! use veriweb_common::SearchConfig;
//! use veriweb_finder::{Action, Anchor, Finder, SearchRequest};
//!
//! let config = SearchConfig::default();
//! let finder = Finder::new(browser, &config);
//! let req = SearchRequest::text("Edit", &config).anchor(Anchor::parse("Bob"));
//! finder.perform(&req, &Action::Click).await?;
//! # Ok(()) }
//! ```
pub mod anchor;
pub mod dispatch;
pub mod dom;
pub mod error;
pub mod finder;
pub mod matcher;
pub mod poller;
pub mod request;
pub mod visibility;

pub use dispatch::{Action, ActionResult, InputStatus};
pub use error::{FindError, SearchDiagnostics, SearchFailure};
pub use finder::{Finder, ResolvedElement};
pub use matcher::{normalize, Candidate, CandidateSet, MatchedOn};
pub use request::{Anchor, LocatorKind, SearchRequest};
