//! Keyword surface for test runners.
//!
//! A [`Session`] owns the browsers a test opened and the search configuration
//! its keywords run with. Keywords are `async`; synchronous runners drive them
//! through `veriweb-runtime`.
//!
//! ```no_run
//! # async fn demo() -> Result<(), veriweb_keywords::KeywordError> {
//! use veriweb_config::VeriwebSettings;
//! use veriweb_keywords::{KeywordOptions, Session};
//!
//! let settings = VeriwebSettings::default();
//! let mut session = Session::from_settings(settings);
//! session.open_browser("https://example.com", Some("chrome"), "").await?;
//! session.set_config("ShadowDOM", "on")?;
//! session.click_text("Edit", &KeywordOptions::default().anchor("Bob")).await?;
//! session.close_all_browsers().await?;
//! # Ok(()) }
//! ```
pub mod error;
mod keywords;
pub mod launcher;
mod links;
pub mod options;
pub mod session;

pub use error::{KeywordError, KeywordResult};
pub use launcher::{BrowserLauncher, WebDriverLauncher};
pub use options::KeywordOptions;
pub use session::Session;
