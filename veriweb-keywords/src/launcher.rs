use async_trait::async_trait;
use std::sync::Arc;
use veriweb_drivers::veriweb_browser::driver::WebDriverBrowser;
use veriweb_drivers::veriweb_browser::options::BrowserOptions;
use veriweb_drivers::{Browser, DriverError};

/// Starts browser sessions for `open_browser`.
#[async_trait]
pub trait BrowserLauncher: Send + Sync {
    async fn launch(&self, options: &BrowserOptions) -> Result<Arc<dyn Browser>, DriverError>;
}

/// Launches real browsers through a WebDriver endpoint.
pub struct WebDriverLauncher {
    url: String,
}

impl WebDriverLauncher {
    pub fn new(url: impl Into<String>) -> Self {
        Self { url: url.into() }
    }
}

#[async_trait]
impl BrowserLauncher for WebDriverLauncher {
    async fn launch(&self, options: &BrowserOptions) -> Result<Arc<dyn Browser>, DriverError> {
        let browser = WebDriverBrowser::connect(&self.url, options).await?;
        Ok(Arc::new(browser))
    }
}
