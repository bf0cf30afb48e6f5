//! WebDriver-backed browser built on `fantoccini`.
pub mod driver;
pub mod options;
pub mod scripts;
