#![allow(dead_code)]

use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex, OnceLock};
use std::time::Duration;

use veriweb_common::observability::{LogConfig, LogFormat};
use veriweb_common::SearchConfig;
use veriweb_config::VeriwebSettings;
use veriweb_drivers::memory::MemoryBrowser;
use veriweb_drivers::veriweb_browser::options::BrowserOptions;
use veriweb_drivers::{Browser, DriverError};
use veriweb_keywords::{BrowserLauncher, Session};

static INIT_PATH: OnceLock<std::path::PathBuf> = OnceLock::new();

pub fn init_test_tracing() {
    let _ = INIT_PATH.get_or_init(|| {
        let config = LogConfig {
            app_name: "veriweb-keyword-tests".to_string(),
            log_dir: Some(std::env::temp_dir().join("veriweb-keyword-tests")),
            emit_stderr: true,
            format: if std::env::var("VERIWEB_LOG_FORMAT")
                .map(|raw| raw.trim().eq_ignore_ascii_case("json"))
                .unwrap_or(false)
            {
                LogFormat::Json
            } else {
                LogFormat::Text
            },
            default_filter: "debug".to_string(),
        };

        veriweb_common::observability::init_logging(config).unwrap_or_default()
    });
}

/// Hands out prepared memory browsers in order and records launch options.
#[derive(Default)]
pub struct MemoryLauncher {
    queue: Mutex<VecDeque<Arc<MemoryBrowser>>>,
    pub launched: Mutex<Vec<BrowserOptions>>,
}

impl MemoryLauncher {
    pub fn new(browsers: impl IntoIterator<Item = Arc<MemoryBrowser>>) -> Arc<Self> {
        Arc::new(Self {
            queue: Mutex::new(browsers.into_iter().collect()),
            launched: Mutex::new(Vec::new()),
        })
    }
}

#[async_trait]
impl BrowserLauncher for MemoryLauncher {
    async fn launch(&self, options: &BrowserOptions) -> Result<Arc<dyn Browser>, DriverError> {
        self.launched.lock().unwrap().push(options.clone());
        let browser = self
            .queue
            .lock()
            .unwrap()
            .pop_front()
            .ok_or_else(|| DriverError::Command("no browser prepared".to_string()))?;
        Ok(browser as Arc<dyn Browser>)
    }
}

pub fn settings() -> VeriwebSettings {
    VeriwebSettings {
        search: SearchConfig {
            default_timeout: Duration::from_millis(500),
            poll_interval: Duration::from_millis(100),
            ..SearchConfig::default()
        },
        ..VeriwebSettings::default()
    }
}

/// A session with `browser` already open and current.
pub async fn session_with(browser: Arc<MemoryBrowser>, settings: VeriwebSettings) -> Session {
    init_test_tracing();
    let mut session = Session::new(settings, MemoryLauncher::new([browser]));
    session.open_browser("", None, "").await.unwrap();
    session
}
