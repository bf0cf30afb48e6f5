use crate::browser::DriverError;
use serde_json::{json, Map, Value};
use std::fmt;
use std::str::FromStr;
use webdriver::capabilities::Capabilities;

/// Forces headless mode for every browser opened by the process.
pub const HEADLESS_ENV: &str = "VERIWEB_HEADLESS";
/// Comma separated arguments appended to the keyword's own options.
pub const CHROME_ARGS_ENV: &str = "CHROME_ARGS";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
/// Browsers a session can open.
pub enum BrowserKind {
    Chrome,
    Firefox,
    Edge,
    Safari,
    InternetExplorer,
}

impl BrowserKind {
    pub fn browser_name(&self) -> &'static str {
        match self {
            BrowserKind::Chrome => "chrome",
            BrowserKind::Firefox => "firefox",
            BrowserKind::Edge => "MicrosoftEdge",
            BrowserKind::Safari => "safari",
            BrowserKind::InternetExplorer => "internet explorer",
        }
    }

    fn options_key(&self) -> Option<&'static str> {
        match self {
            BrowserKind::Chrome => Some("goog:chromeOptions"),
            BrowserKind::Firefox => Some("moz:firefoxOptions"),
            BrowserKind::Edge => Some("ms:edgeOptions"),
            BrowserKind::Safari | BrowserKind::InternetExplorer => None,
        }
    }
}

impl fmt::Display for BrowserKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.browser_name())
    }
}

impl FromStr for BrowserKind {
    type Err = DriverError;

    fn from_str(alias: &str) -> Result<Self, Self::Err> {
        match alias.trim().to_ascii_lowercase().as_str() {
            "chrome" | "gc" => Ok(BrowserKind::Chrome),
            "firefox" | "ff" => Ok(BrowserKind::Firefox),
            "edge" => Ok(BrowserKind::Edge),
            "safari" | "sf" => Ok(BrowserKind::Safari),
            "ie" | "internet explorer" => Ok(BrowserKind::InternetExplorer),
            other => Err(DriverError::InvalidOptions(format!(
                "invalid browser name {other}"
            ))),
        }
    }
}

/// Launch options for one browser session.
#[derive(Debug, Clone, PartialEq)]
pub struct BrowserOptions {
    pub kind: BrowserKind,
    pub args: Vec<String>,
    pub headless: bool,
    /// Browser preferences (`prefs` for Chrome/Edge/Firefox).
    pub prefs: Map<String, Value>,
}

impl BrowserOptions {
    pub fn new(kind: BrowserKind) -> Self {
        Self {
            kind,
            args: Vec::new(),
            headless: false,
            prefs: Map::new(),
        }
    }

    /// Split a comma separated option string (`"--kiosk, --disable-gpu"`).
    pub fn with_option_string(mut self, options: &str) -> Self {
        self.args.extend(split_options(options));
        self
    }

    /// Parse `"opt1":"True", "opt2":"False"` into browser preferences.
    pub fn with_prefs_string(mut self, prefs: &str) -> Result<Self, DriverError> {
        let trimmed = prefs.trim();
        if trimmed.is_empty() {
            return Ok(self);
        }
        let parsed: Map<String, Value> = serde_json::from_str(&format!("{{{trimmed}}}"))
            .map_err(|e| DriverError::InvalidOptions(format!("prefs {trimmed:?}: {e}")))?;
        self.prefs.extend(parsed);
        Ok(self)
    }

    pub fn headless(mut self, headless: bool) -> Self {
        self.headless = headless;
        self
    }

    /// Apply `VERIWEB_HEADLESS` and `CHROME_ARGS` from the environment.
    pub fn with_env_overrides(mut self) -> Self {
        if std::env::var_os(HEADLESS_ENV).is_some() {
            self.headless = true;
        }
        if let Ok(extra) = std::env::var(CHROME_ARGS_ENV) {
            self.args.extend(split_options(&extra));
        }
        self
    }

    /// Command line arguments including the headless switches.
    pub fn arguments(&self) -> Vec<String> {
        let mut args = self.args.clone();
        if self.headless {
            let switches: &[&str] = match self.kind {
                BrowserKind::Firefox => &["-headless"],
                BrowserKind::Chrome | BrowserKind::Edge => &["--headless", "--disable-gpu"],
                BrowserKind::Safari | BrowserKind::InternetExplorer => &[],
            };
            for switch in switches {
                if !args.iter().any(|a| a == switch) {
                    args.push(switch.to_string());
                }
            }
        }
        args
    }

    /// W3C capabilities for the new session request.
    pub fn capabilities(&self) -> Capabilities {
        let mut caps = Capabilities::new();
        caps.insert("browserName".to_string(), json!(self.kind.browser_name()));

        if let Some(key) = self.kind.options_key() {
            let mut vendor = Map::new();
            vendor.insert("args".to_string(), json!(self.arguments()));
            if !self.prefs.is_empty() {
                vendor.insert("prefs".to_string(), Value::Object(self.prefs.clone()));
            }
            caps.insert(key.to_string(), Value::Object(vendor));
        }
        caps
    }
}

fn split_options(raw: &str) -> impl Iterator<Item = String> + '_ {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}
