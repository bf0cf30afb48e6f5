use crate::browser::{Browser, ContextHandle, DriverError, ElementHandle, RawElement};
use crate::veriweb_browser::options::BrowserOptions;
use crate::veriweb_browser::scripts::{self, ELEMENT_KEY};
use async_trait::async_trait;
use fantoccini::elements::{Element, ElementRef};
use fantoccini::error::CmdError;
use fantoccini::{Client, ClientBuilder};
use serde::Deserialize;
use serde_json::{json, Value};
use std::collections::BTreeMap;
use tracing::{debug, info};

/// [`Browser`] backed by a `fantoccini` WebDriver client.
pub struct WebDriverBrowser {
    client: Client,
    label: String,
}

impl WebDriverBrowser {
    /// Open a new session on the WebDriver service at `webdriver_url`.
    pub async fn connect(webdriver_url: &str, options: &BrowserOptions) -> Result<Self, DriverError> {
        let caps = options.capabilities();
        debug!(
            target: "driver.session",
            url = %webdriver_url,
            browser = %options.kind,
            args = ?options.arguments(),
            "driver.session.connect"
        );
        let client = ClientBuilder::native()
            .capabilities(caps)
            .connect(webdriver_url)
            .await
            .map_err(|e| DriverError::SessionClosed(format!("could not start {}: {e}", options.kind)))?;
        info!(target: "driver.session", browser = %options.kind, "driver.session.open");

        Ok(Self {
            client,
            label: options.kind.to_string(),
        })
    }

    /// Wrap an already connected client.
    pub fn from_client(client: Client, label: impl Into<String>) -> Self {
        Self {
            client,
            label: label.into(),
        }
    }

    /// The underlying client, for callers that need raw WebDriver access.
    pub fn client(&self) -> &Client {
        &self.client
    }

    fn element(&self, el: &ElementHandle) -> Element {
        Element::from_element_id(self.client.clone(), ElementRef::from(el.0.clone()))
    }

    async fn execute(&self, script: &str, args: Vec<Value>) -> Result<Value, DriverError> {
        self.client.execute(script, args).await.map_err(map_cmd_error)
    }
}

fn element_arg(el: &ElementHandle) -> Value {
    json!({ ELEMENT_KEY: el.0 })
}

/// Classify WebDriver failures by their W3C error code.
fn map_cmd_error(err: CmdError) -> DriverError {
    let message = err.to_string();
    let lower = message.to_ascii_lowercase();
    if [
        "stale element reference",
        "no such frame",
        "detached shadow root",
        "no such shadow root",
        "no such element",
    ]
    .iter()
    .any(|code| lower.contains(code))
    {
        DriverError::StaleContext(message)
    } else if ["invalid session id", "no such window", "session deleted"]
        .iter()
        .any(|code| lower.contains(code))
    {
        DriverError::SessionClosed(message)
    } else {
        DriverError::Command(message)
    }
}

#[derive(Deserialize)]
struct ScriptElement {
    element: Value,
    tag: String,
    text: String,
    #[serde(default)]
    attributes: BTreeMap<String, String>,
    #[serde(default)]
    path: Vec<u32>,
    #[serde(default)]
    shadow: bool,
}

fn parse_elements(value: Value) -> Result<Vec<RawElement>, DriverError> {
    if value.is_null() {
        return Err(DriverError::StaleContext(
            "shadow host no longer has a shadow root".to_string(),
        ));
    }
    let items: Vec<ScriptElement> = serde_json::from_value(value)
        .map_err(|e| DriverError::Command(format!("unexpected element listing: {e}")))?;
    items
        .into_iter()
        .map(|item| {
            let id = item
                .element
                .get(ELEMENT_KEY)
                .and_then(Value::as_str)
                .ok_or_else(|| DriverError::Command("element reference missing".to_string()))?;
            Ok(RawElement {
                handle: ElementHandle(id.to_string()),
                tag: item.tag,
                text: item.text,
                attributes: item.attributes,
                path: item.path,
                has_shadow_root: item.shadow,
            })
        })
        .collect()
}

#[async_trait]
impl Browser for WebDriverBrowser {
    fn name(&self) -> &str {
        &self.label
    }

    async fn query_elements(&self, ctx: &ContextHandle) -> Result<Vec<RawElement>, DriverError> {
        let host = match ctx {
            ContextHandle::Document => Value::Null,
            ContextHandle::Shadow(host) => element_arg(host),
        };
        let value = self.execute(scripts::QUERY_ELEMENTS, vec![host]).await?;
        parse_elements(value)
    }

    async fn element_text(&self, el: &ElementHandle) -> Result<String, DriverError> {
        self.element(el).text().await.map_err(map_cmd_error)
    }

    async fn element_property(
        &self,
        el: &ElementHandle,
        name: &str,
    ) -> Result<Option<String>, DriverError> {
        let value = self
            .execute(scripts::PROPERTY, vec![element_arg(el), json!(name)])
            .await?;
        Ok(value.as_str().map(str::to_string))
    }

    async fn element_visible(&self, el: &ElementHandle) -> Result<bool, DriverError> {
        let value = self.execute(scripts::IS_VISIBLE, vec![element_arg(el)]).await?;
        value
            .as_bool()
            .ok_or_else(|| DriverError::StaleContext(format!("element {el} is detached")))
    }

    async fn shadow_root(&self, el: &ElementHandle) -> Result<Option<ContextHandle>, DriverError> {
        let value = self
            .execute(scripts::HAS_SHADOW_ROOT, vec![element_arg(el)])
            .await?;
        Ok(value
            .as_bool()
            .unwrap_or(false)
            .then(|| ContextHandle::Shadow(el.clone())))
    }

    async fn click(&self, el: &ElementHandle) -> Result<(), DriverError> {
        self.element(el).click().await.map_err(map_cmd_error)
    }

    async fn clear(&self, el: &ElementHandle) -> Result<(), DriverError> {
        self.element(el).clear().await.map_err(map_cmd_error)
    }

    async fn type_text(&self, el: &ElementHandle, text: &str) -> Result<(), DriverError> {
        self.element(el).send_keys(text).await.map_err(map_cmd_error)
    }

    async fn switch_frame(&self, frame: Option<&ElementHandle>) -> Result<(), DriverError> {
        debug!(target: "driver.frame", frame = ?frame, "driver.frame.switch");
        match frame {
            None => self
                .client
                .issue_cmd(webdriver::command::WebDriverCommand::<
                    webdriver::command::VoidWebDriverExtensionCommand,
                >::SwitchToFrame(
                    webdriver::command::SwitchToFrameParameters {
                        id: webdriver::common::FrameId::Top,
                    },
                ))
                .await
                .map(|_| ())
                .map_err(map_cmd_error),
            Some(el) => self.element(el).enter_frame().await.map_err(map_cmd_error),
        }
    }

    async fn navigate(&self, url: &str) -> Result<(), DriverError> {
        self.client.goto(url).await.map_err(map_cmd_error)
    }

    async fn current_url(&self) -> Result<String, DriverError> {
        self.client
            .current_url()
            .await
            .map(|url| url.to_string())
            .map_err(map_cmd_error)
    }

    async fn title(&self) -> Result<String, DriverError> {
        self.client.title().await.map_err(map_cmd_error)
    }

    async fn screenshot(&self) -> Result<Vec<u8>, DriverError> {
        self.client.screenshot().await.map_err(map_cmd_error)
    }

    async fn highlight(&self, el: &ElementHandle, color: &str) -> Result<(), DriverError> {
        self.execute(scripts::HIGHLIGHT, vec![element_arg(el), json!(color)])
            .await
            .map(|_| ())
    }

    async fn close(&self) -> Result<(), DriverError> {
        self.client.clone().close().await.map_err(map_cmd_error)
    }
}
