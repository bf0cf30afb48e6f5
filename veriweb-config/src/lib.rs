//! Loader for session settings with YAML + environment overlays.
//!
//! Sources are merged in the order they are added; `VERIWEB__`-prefixed
//! environment variables always apply last (`VERIWEB__SEARCH__SHADOW_DOM=true`).
//! String values may reference other environment variables as `${VAR}`.
use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;
use serde_json::Value;
use std::path::{Path, PathBuf};
use veriweb_common::SearchConfig;
use veriweb_common::observability::{LogConfig, LogFormat};

const MAXIMUM_ENV_EXPANSION_DEPTH: usize = 8;

/// Everything a keyword session needs before its first browser opens.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct VeriwebSettings {
    pub search: SearchConfig,
    pub webdriver: WebDriverSettings,
    pub logging: LoggingSettings,
    /// Directory for failure screenshots. `None` disables them.
    pub screenshots: Option<PathBuf>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct WebDriverSettings {
    /// WebDriver endpoint (chromedriver, geckodriver, a grid hub).
    pub url: String,
    /// Browser alias used when a keyword does not name one.
    pub browser: String,
    pub headless: bool,
    /// Extra command line arguments for the browser process.
    pub args: Vec<String>,
}

impl Default for WebDriverSettings {
    fn default() -> Self {
        Self {
            url: "http://localhost:9515".to_string(),
            browser: "chrome".to_string(),
            headless: false,
            args: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LoggingSettings {
    pub dir: Option<PathBuf>,
    pub format: LogFormat,
    pub filter: String,
    pub stderr: bool,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            dir: None,
            format: LogFormat::Text,
            filter: "info".to_string(),
            stderr: false,
        }
    }
}

impl LoggingSettings {
    /// Translate into the observability initialiser's input.
    pub fn to_log_config(&self, app_name: &str) -> LogConfig {
        LogConfig {
            app_name: app_name.to_string(),
            log_dir: self.dir.clone(),
            emit_stderr: self.stderr,
            format: self.format,
            default_filter: self.filter.clone(),
        }
    }
}

fn expand_env_in_value(v: &mut Value) {
    match v {
        Value::String(s) => {
            if s.contains('$') {
                let mut cur = std::mem::take(s);
                for _ in 0..MAXIMUM_ENV_EXPANSION_DEPTH {
                    let expanded = match shellexpand::env(&cur) {
                        Ok(cow) => cow.into_owned(),
                        Err(_) => cur.clone(),
                    };
                    if expanded == cur {
                        break;
                    }
                    cur = expanded;
                }
                *s = cur;
            }
        }
        Value::Array(arr) => arr.iter_mut().for_each(expand_env_in_value),
        Value::Object(obj) => obj.values_mut().for_each(expand_env_in_value),
        _ => {}
    }
}

/// Builder over the `config` crate: files, inline YAML, then `VERIWEB__` env.
pub struct VeriwebConfigLoader {
    builder: config::ConfigBuilder<config::builder::DefaultState>,
}

impl Default for VeriwebConfigLoader {
    fn default() -> Self {
        Self::new()
    }
}

impl VeriwebConfigLoader {
    /// An empty loader; [`load`](Self::load) then yields the defaults plus env overrides.
    ///
    /// ```
    /// use veriweb_config::VeriwebConfigLoader;
    ///
    /// let settings = VeriwebConfigLoader::new()
    ///     .with_yaml_str("search:\n  shadow_dom: true\n  default_timeout: 3s")
    ///     .load()
    ///     .expect("valid settings");
    ///
    /// assert!(settings.search.shadow_dom);
    /// assert_eq!(settings.search.default_timeout.as_secs(), 3);
    /// assert_eq!(settings.webdriver.url, "http://localhost:9515");
    /// ```
    pub fn new() -> Self {
        Self {
            builder: Config::builder(),
        }
    }

    /// Attach a required YAML/TOML/JSON file; the format is inferred from the suffix.
    pub fn with_file<P: AsRef<Path>>(mut self, path: P) -> Self {
        self.builder = self
            .builder
            .add_source(File::from(path.as_ref()).required(true));
        self
    }

    /// Attach a file that may be missing (e.g. `veriweb.yaml` in the working dir).
    pub fn with_optional_file<P: AsRef<Path>>(mut self, path: P) -> Self {
        self.builder = self
            .builder
            .add_source(File::from(path.as_ref()).required(false));
        self
    }

    /// Merge an inline YAML snippet.
    pub fn with_yaml_str(mut self, yaml: &str) -> Self {
        self.builder = self
            .builder
            .add_source(File::from_str(yaml, config::FileFormat::Yaml));
        self
    }

    /// Merge all sources, expand `${VAR}` placeholders and deserialize.
    ///
    /// ```
    /// use veriweb_config::VeriwebConfigLoader;
    ///
    /// unsafe { std::env::set_var("VERIWEB_DOC_DRIVER", "http://grid:4444"); }
    ///
    /// let settings = VeriwebConfigLoader::new()
    ///     .with_yaml_str(r#"
    /// webdriver:
    ///   url: "${VERIWEB_DOC_DRIVER}"
    ///   browser: firefox
    ///   headless: true
    /// "#)
    ///     .load()
    ///     .expect("valid settings");
    ///
    /// assert_eq!(settings.webdriver.url, "http://grid:4444");
    /// assert_eq!(settings.webdriver.browser, "firefox");
    /// assert!(settings.webdriver.headless);
    ///
    /// unsafe { std::env::remove_var("VERIWEB_DOC_DRIVER"); }
    /// ```
    pub fn load(self) -> Result<VeriwebSettings, ConfigError> {
        let cfg = self
            .builder
            .add_source(
                Environment::with_prefix("VERIWEB")
                    .prefix_separator("__")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        let mut v: Value = cfg.try_deserialize()?;
        if v.is_null() {
            v = Value::Object(Default::default());
        }
        expand_env_in_value(&mut v);

        serde_json::from_value(v).map_err(|e| ConfigError::Message(e.to_string()))
    }
}
