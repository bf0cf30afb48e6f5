//! Search keywords. Each one maps its arguments onto a [`SearchRequest`],
//! hands it to the finder together with an [`Action`], and reports failures
//! with a screenshot when one is configured.
use crate::error::{KeywordError, KeywordResult};
use crate::options::KeywordOptions;
use crate::session::Session;
use tracing::info;
use veriweb_finder::{Action, ActionResult, InputStatus, SearchRequest};

impl Session {
    fn text_request(&self, text: &str, opts: &KeywordOptions) -> SearchRequest {
        opts.apply(SearchRequest::text(text, &self.config), &self.config)
    }

    fn attribute_request(&self, locator: &str, opts: &KeywordOptions) -> SearchRequest {
        opts.apply(SearchRequest::attribute(locator, &self.config), &self.config)
    }

    fn input_request(&self, locator: &str, opts: &KeywordOptions) -> SearchRequest {
        opts.apply(SearchRequest::input(locator, &self.config), &self.config)
    }

    async fn act(
        &self,
        keyword: &'static str,
        req: SearchRequest,
        action: Action,
    ) -> KeywordResult<ActionResult> {
        let browser = self.browsers.current()?;
        info!(target: "keyword", keyword, locator = %req.target, kind = %req.kind, "keyword.start");
        let result = self
            .finder(browser.as_ref())
            .perform(&req, &action)
            .await
            .map_err(KeywordError::from);
        self.finish(keyword, browser.as_ref(), result).await
    }

    /// Pass when `text` is on the page.
    pub async fn verify_text(&self, text: &str, opts: &KeywordOptions) -> KeywordResult<()> {
        let req = self.text_request(text, opts);
        self.act("verify_text", req, Action::VerifyExists).await?;
        Ok(())
    }

    /// Pass once `text` is no longer on the page.
    pub async fn verify_no_text(&self, text: &str, opts: &KeywordOptions) -> KeywordResult<()> {
        let browser = self.browsers.current()?;
        let req = self.text_request(text, opts);
        let result = self
            .finder(browser.as_ref())
            .expect_absent(&req)
            .await
            .map_err(KeywordError::from);
        self.finish("verify_no_text", browser.as_ref(), result).await
    }

    /// Pass once exactly `expected` elements show `text`. Anchors are ignored.
    pub async fn verify_text_count(
        &self,
        text: &str,
        expected: usize,
        opts: &KeywordOptions,
    ) -> KeywordResult<()> {
        let browser = self.browsers.current()?;
        let req = self.text_request(text, opts);
        let result = self
            .finder(browser.as_ref())
            .expect_count(&req, expected)
            .await
            .map(|_| ())
            .map_err(KeywordError::from);
        self.finish("verify_text_count", browser.as_ref(), result).await
    }

    /// Number of elements showing `text`; 0 if none appear before the timeout.
    pub async fn get_text_count(&self, text: &str, opts: &KeywordOptions) -> KeywordResult<usize> {
        let browser = self.browsers.current()?;
        let req = self.text_request(text, opts);
        let result = self
            .finder(browser.as_ref())
            .count(&req)
            .await
            .map_err(KeywordError::from);
        if let Ok(count) = &result {
            info!(target: "keyword", locator = text, count = *count, "keyword.count");
        }
        self.finish("get_text_count", browser.as_ref(), result).await
    }

    /// Pass when an element carries `locator` as id, title, tooltip,
    /// aria-label or text.
    pub async fn verify_item(&self, locator: &str, opts: &KeywordOptions) -> KeywordResult<()> {
        let req = self.attribute_request(locator, opts);
        self.act("verify_item", req, Action::VerifyExists).await?;
        Ok(())
    }

    pub async fn click_item(&self, locator: &str, opts: &KeywordOptions) -> KeywordResult<()> {
        let req = self.attribute_request(locator, opts);
        self.act("click_item", req, Action::Click).await?;
        Ok(())
    }

    pub async fn click_text(&self, text: &str, opts: &KeywordOptions) -> KeywordResult<()> {
        let req = self.text_request(text, opts);
        self.act("click_text", req, Action::Click).await?;
        Ok(())
    }

    /// Type into the input identified by `locator` (placeholder, label, id,
    /// name, aria-label, title or tooltip).
    pub async fn type_text(
        &self,
        locator: &str,
        text: &str,
        opts: &KeywordOptions,
    ) -> KeywordResult<()> {
        let req = self.input_request(locator, opts);
        let action = Action::TypeText {
            text: text.to_string(),
            clear: opts.clear.unwrap_or(true),
            check: opts.check,
        };
        self.act("type_text", req, action).await?;
        Ok(())
    }

    pub async fn verify_input_element(
        &self,
        locator: &str,
        opts: &KeywordOptions,
    ) -> KeywordResult<()> {
        let req = self.input_request(locator, opts);
        self.act("verify_input_element", req, Action::VerifyExists).await?;
        Ok(())
    }

    /// `status` is one of enabled, disabled, read only, checked, unchecked.
    pub async fn verify_input_status(
        &self,
        locator: &str,
        status: &str,
        opts: &KeywordOptions,
    ) -> KeywordResult<()> {
        let status: InputStatus = status
            .parse()
            .map_err(|_| KeywordError::InvalidArgument(format!("unknown input status {status:?}")))?;
        let req = self.input_request(locator, opts);
        self.act("verify_input_status", req, Action::VerifyStatus(status)).await?;
        Ok(())
    }

    pub async fn verify_input_value(
        &self,
        locator: &str,
        expected: &str,
        opts: &KeywordOptions,
    ) -> KeywordResult<()> {
        let req = self.input_request(locator, opts);
        self.act("verify_input_value", req, Action::VerifyValue(expected.to_string()))
            .await?;
        Ok(())
    }

    /// Check several `(locator, value)` pairs in order; stops at the first
    /// mismatch.
    pub async fn verify_input_values(
        &self,
        expected: &[(&str, &str)],
        opts: &KeywordOptions,
    ) -> KeywordResult<()> {
        for (locator, value) in expected {
            self.verify_input_value(locator, value, opts).await?;
        }
        Ok(())
    }

    pub async fn get_input_value(&self, locator: &str, opts: &KeywordOptions) -> KeywordResult<String> {
        let req = self.input_request(locator, opts);
        match self.act("get_input_value", req, Action::ReadValue).await? {
            ActionResult::Value(value) => Ok(value),
            ActionResult::Done => Ok(String::new()),
        }
    }

    /// Pass when every text is on the page.
    pub async fn verify_all(&self, texts: &[&str], opts: &KeywordOptions) -> KeywordResult<()> {
        for text in texts {
            self.verify_text(text, opts).await?;
        }
        Ok(())
    }

    /// Pass when any of the texts is on the page; returns the first one, in
    /// argument order, that is present. All texts are tried on every tick.
    pub async fn verify_any(&self, texts: &[&str], opts: &KeywordOptions) -> KeywordResult<String> {
        let browser = self.browsers.current()?;
        let reqs: Vec<SearchRequest> = texts.iter().map(|t| self.text_request(t, opts)).collect();
        let result = self
            .finder(browser.as_ref())
            .first_present(&reqs)
            .await
            .map(|idx| texts[idx].to_string())
            .map_err(KeywordError::from);
        self.finish("verify_any", browser.as_ref(), result).await
    }
}
