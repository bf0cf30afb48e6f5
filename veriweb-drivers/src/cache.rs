use crate::browser::{Browser, DriverError};
use std::str::FromStr;
use std::sync::Arc;
use tracing::debug;

/// Which cached browser to make current.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BrowserIndex {
    /// 1-based position in opening order.
    Position(usize),
    /// The most recently opened browser.
    Newest,
}

impl FromStr for BrowserIndex {
    type Err = DriverError;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        let trimmed = raw.trim();
        if trimmed.eq_ignore_ascii_case("new") {
            return Ok(BrowserIndex::Newest);
        }
        trimmed
            .parse::<usize>()
            .ok()
            .filter(|n| *n > 0)
            .map(BrowserIndex::Position)
            .ok_or_else(|| DriverError::InvalidOptions(format!("invalid browser index {raw:?}")))
    }
}

/// Browsers opened by one session, in opening order, with a current pointer.
#[derive(Default)]
pub struct BrowserCache {
    browsers: Vec<Arc<dyn Browser>>,
    current: Option<usize>,
}

impl BrowserCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a browser and make it current. Returns its 1-based position.
    pub fn add(&mut self, browser: Arc<dyn Browser>) -> usize {
        self.browsers.push(browser);
        let idx = self.browsers.len() - 1;
        self.current = Some(idx);
        debug!(target: "driver.cache", position = idx + 1, "driver.cache.add");
        idx + 1
    }

    pub fn len(&self) -> usize {
        self.browsers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.browsers.is_empty()
    }

    pub fn current(&self) -> Result<Arc<dyn Browser>, DriverError> {
        self.current
            .and_then(|idx| self.browsers.get(idx))
            .cloned()
            .ok_or_else(|| DriverError::SessionClosed("no browser open".to_string()))
    }

    pub fn switch(&mut self, index: BrowserIndex) -> Result<Arc<dyn Browser>, DriverError> {
        let idx = match index {
            BrowserIndex::Newest => self.browsers.len().checked_sub(1),
            BrowserIndex::Position(n) => Some(n - 1).filter(|i| *i < self.browsers.len()),
        }
        .ok_or_else(|| {
            DriverError::InvalidOptions(format!(
                "no browser at {index:?}; {} open",
                self.browsers.len()
            ))
        })?;
        self.current = Some(idx);
        Ok(self.browsers[idx].clone())
    }

    /// Remove the current browser; the newest remaining one becomes current.
    pub fn remove_current(&mut self) -> Option<Arc<dyn Browser>> {
        let idx = self.current?;
        let removed = self.browsers.remove(idx);
        self.current = self.browsers.len().checked_sub(1);
        Some(removed)
    }

    /// Empty the cache, returning every browser in opening order.
    pub fn drain(&mut self) -> Vec<Arc<dyn Browser>> {
        self.current = None;
        std::mem::take(&mut self.browsers)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::MemoryBrowser;

    fn browser(name: &str) -> Arc<dyn Browser> {
        Arc::new(MemoryBrowser::named(name, Vec::new()))
    }

    #[test]
    fn parses_indices() {
        assert_eq!("NEW".parse::<BrowserIndex>().unwrap(), BrowserIndex::Newest);
        assert_eq!("2".parse::<BrowserIndex>().unwrap(), BrowserIndex::Position(2));
        assert!("0".parse::<BrowserIndex>().is_err());
        assert!("first".parse::<BrowserIndex>().is_err());
    }

    #[test]
    fn newest_browser_is_current() {
        let mut cache = BrowserCache::new();
        assert!(cache.current().is_err());
        cache.add(browser("chrome"));
        cache.add(browser("firefox"));
        assert_eq!(cache.current().unwrap().name(), "firefox");
        assert_eq!(cache.switch(BrowserIndex::Position(1)).unwrap().name(), "chrome");
        assert_eq!(cache.switch(BrowserIndex::Newest).unwrap().name(), "firefox");
        assert!(cache.switch(BrowserIndex::Position(3)).is_err());
    }

    #[test]
    fn removing_current_falls_back_to_newest() {
        let mut cache = BrowserCache::new();
        cache.add(browser("a"));
        cache.add(browser("b"));
        cache.add(browser("c"));
        cache.switch(BrowserIndex::Position(1)).unwrap();
        assert_eq!(cache.remove_current().unwrap().name(), "a");
        assert_eq!(cache.current().unwrap().name(), "c");
        assert_eq!(cache.drain().len(), 2);
        assert!(cache.is_empty());
        assert!(cache.remove_current().is_none());
    }
}
