use crate::error::KeywordResult;
use crate::launcher::{BrowserLauncher, WebDriverLauncher};
use chrono::Local;
use std::path::PathBuf;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};
use veriweb_common::{ConfigOption, SearchConfig};
use veriweb_config::VeriwebSettings;
use veriweb_drivers::veriweb_browser::options::{BrowserKind, BrowserOptions};
use veriweb_drivers::{Browser, BrowserCache, BrowserIndex, DriverError};
use veriweb_finder::Finder;

/// One test's view of the browser: its open browsers, its search
/// configuration and the token that aborts a running keyword.
///
/// Sessions share nothing; two runners may each own one.
pub struct Session {
    launcher: Arc<dyn BrowserLauncher>,
    pub(crate) browsers: BrowserCache,
    pub(crate) config: SearchConfig,
    /// Values `reset_config` restores.
    baseline: SearchConfig,
    pub(crate) settings: VeriwebSettings,
    pub(crate) cancel: CancellationToken,
}

impl Session {
    pub fn new(settings: VeriwebSettings, launcher: Arc<dyn BrowserLauncher>) -> Self {
        Self {
            launcher,
            browsers: BrowserCache::new(),
            config: settings.search.clone(),
            baseline: settings.search.clone(),
            settings,
            cancel: CancellationToken::new(),
        }
    }

    /// Session that launches browsers through the configured WebDriver endpoint.
    pub fn from_settings(settings: VeriwebSettings) -> Self {
        let launcher = Arc::new(WebDriverLauncher::new(settings.webdriver.url.clone()));
        Self::new(settings, launcher)
    }

    /// Abort keywords when `token` is cancelled. Replaces the previous token.
    pub fn set_cancel(&mut self, token: CancellationToken) {
        self.cancel = token;
    }

    pub fn config(&self) -> &SearchConfig {
        &self.config
    }

    pub fn browser_count(&self) -> usize {
        self.browsers.len()
    }

    // ---- configuration ----

    /// Set a named search option; returns the previous value.
    pub fn set_config(&mut self, name: &str, value: &str) -> KeywordResult<String> {
        let previous = self.config.set(name, value)?;
        info!(target: "keyword", option = name, value, previous = %previous, "keyword.config.set");
        Ok(previous)
    }

    /// Restore one option, or all of them, to the session's starting values.
    /// Returns the replaced value when a single option is named.
    pub fn reset_config(&mut self, name: Option<&str>) -> KeywordResult<Option<String>> {
        match name {
            Some(name) => {
                let option: ConfigOption = name.parse()?;
                let previous = self.restore(option)?;
                info!(target: "keyword", option = %option, "keyword.config.reset");
                Ok(Some(previous))
            }
            None => {
                for option in ConfigOption::ALL {
                    self.restore(option)?;
                }
                info!(target: "keyword", "keyword.config.reset_all");
                Ok(None)
            }
        }
    }

    fn restore(&mut self, option: ConfigOption) -> KeywordResult<String> {
        let value = self.baseline.get(option);
        Ok(self.config.set(option.name(), &value)?)
    }

    // ---- browser lifecycle ----

    /// Open a browser and navigate to `url` (skipped when empty).
    ///
    /// `alias` defaults to the configured browser; `options` is a comma
    /// separated list of extra browser arguments. Returns the new browser's
    /// 1-based position.
    pub async fn open_browser(
        &mut self,
        url: &str,
        alias: Option<&str>,
        options: &str,
    ) -> KeywordResult<usize> {
        if !self.browsers.is_empty() {
            warn!(
                target: "keyword",
                open = self.browsers.len(),
                "keyword.browser.already_open"
            );
        }
        let alias = alias.unwrap_or(&self.settings.webdriver.browser);
        let kind: BrowserKind = alias.parse()?;
        let mut launch = BrowserOptions::new(kind).headless(self.settings.webdriver.headless);
        launch.args.extend(self.settings.webdriver.args.iter().cloned());
        let launch = launch.with_option_string(options).with_env_overrides();

        let browser = self.launcher.launch(&launch).await?;
        let position = self.browsers.add(browser.clone());
        info!(
            target: "keyword",
            browser = %kind,
            position,
            headless = launch.headless,
            "keyword.browser.open"
        );
        if !url.trim().is_empty() {
            browser.navigate(url.trim()).await?;
        }
        Ok(position)
    }

    /// Make another open browser current: a 1-based position or `"NEW"`.
    pub async fn switch_browser(&mut self, index: &str) -> KeywordResult<()> {
        let index: BrowserIndex = index.parse()?;
        let browser = self.browsers.switch(index)?;
        info!(target: "keyword", browser = browser.name(), ?index, "keyword.browser.switch");
        Ok(())
    }

    /// Close the current browser; the newest remaining one becomes current.
    pub async fn close_browser(&mut self) -> KeywordResult<()> {
        let browser = self
            .browsers
            .remove_current()
            .ok_or_else(|| DriverError::SessionClosed("no browser open".to_string()))?;
        info!(target: "keyword", browser = browser.name(), "keyword.browser.close");
        browser.close().await?;
        Ok(())
    }

    /// Close every browser. Failures are logged, not raised.
    pub async fn close_all_browsers(&mut self) -> KeywordResult<()> {
        for browser in self.browsers.drain() {
            if let Err(err) = browser.close().await {
                warn!(
                    target: "keyword",
                    browser = browser.name(),
                    error = %err,
                    "keyword.browser.close_failed"
                );
            }
        }
        info!(target: "keyword", "keyword.browser.close_all");
        Ok(())
    }

    /// The current browser, for callers that need to drive it directly.
    pub fn return_browser(&self) -> KeywordResult<Arc<dyn Browser>> {
        Ok(self.browsers.current()?)
    }

    pub async fn go_to(&self, url: &str) -> KeywordResult<()> {
        let browser = self.browsers.current()?;
        debug!(target: "keyword", url, "keyword.go_to");
        browser.navigate(url).await?;
        Ok(())
    }

    // ---- shared plumbing ----

    pub(crate) fn finder<'b>(&'b self, browser: &'b dyn Browser) -> Finder<'b> {
        Finder::new(browser, &self.config).with_cancel(self.cancel.clone())
    }

    /// Log a failed keyword and save a screenshot for it.
    pub(crate) async fn finish<T>(
        &self,
        keyword: &'static str,
        browser: &dyn Browser,
        result: KeywordResult<T>,
    ) -> KeywordResult<T> {
        match &result {
            Ok(_) => debug!(target: "keyword", keyword, "keyword.passed"),
            Err(err) => {
                warn!(target: "keyword", keyword, error = %err, "keyword.failed");
                self.capture_failure(browser, keyword).await;
            }
        }
        result
    }

    /// Best-effort screenshot into the configured directory.
    pub(crate) async fn capture_failure(&self, browser: &dyn Browser, keyword: &str) -> Option<PathBuf> {
        let dir = self.settings.screenshots.as_ref()?;
        let name = format!("{keyword}_{}.png", Local::now().format("%Y%m%d_%H%M%S%.3f"));
        let path = dir.join(name);
        let saved = async {
            let png = browser.screenshot().await.map_err(|e| e.to_string())?;
            tokio::fs::create_dir_all(dir).await.map_err(|e| e.to_string())?;
            tokio::fs::write(&path, png).await.map_err(|e| e.to_string())
        }
        .await;
        match saved {
            Ok(()) => {
                info!(target: "keyword", path = %path.display(), "keyword.screenshot.saved");
                Some(path)
            }
            Err(error) => {
                warn!(target: "keyword", error = %error, "keyword.screenshot.failed");
                None
            }
        }
    }
}
