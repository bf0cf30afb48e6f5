//! Driver layer for browser automation.
//!
//! The element finder never talks to a browser directly; it goes through the
//! [`Browser`] capability defined here.
//!
//! - [`Browser`]: the collaborator trait (query DOM, read layout, dispatch input)
//! - [`veriweb_browser::driver::WebDriverBrowser`]: fantoccini WebDriver client
//! - [`veriweb_browser::options`]: browser aliases, arguments and capabilities
//! - [`memory::MemoryBrowser`]: deterministic in-process document for tests and dry runs
//! - [`cache::BrowserCache`]: the open browsers of one session and which one is current
pub mod browser;
pub mod cache;
pub mod memory;
pub mod veriweb_browser;

pub use browser::{Browser, ContextHandle, DriverError, ElementHandle, RawElement};
pub use cache::{BrowserCache, BrowserIndex};
