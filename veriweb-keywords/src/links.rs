use crate::error::{KeywordError, KeywordResult};
use crate::session::Session;
use tracing::info;
use url::Url;
use veriweb_finder::dom;
use veriweb_http::{collect_links, summarize, LinkChecker, LinkReport};

impl Session {
    /// Probe every `a[href]` on `url` (or on the current page when `url` is
    /// `"current"`) and fail listing the broken ones.
    ///
    /// With `log_all` every probed link is logged at info level. With
    /// `header_only` no `GET` fallback is attempted after a 404/405 `HEAD`.
    pub async fn verify_links(
        &self,
        url: &str,
        log_all: bool,
        header_only: bool,
    ) -> KeywordResult<Vec<LinkReport>> {
        let browser = self.browsers.current()?;
        let result = async {
            if !url.trim().eq_ignore_ascii_case("current") {
                browser.navigate(url.trim()).await?;
            }
            browser.switch_frame(None).await?;
            let page = browser.current_url().await?;
            let base = Url::parse(&page)
                .map_err(|e| KeywordError::InvalidArgument(format!("page url {page:?}: {e}")))?;

            let nodes = dom::collect(browser.as_ref(), self.config.shadow_dom, &Vec::new()).await?;
            let hrefs = nodes
                .iter()
                .filter(|n| n.tag == "a")
                .filter_map(|n| n.attribute("href"));
            let links = collect_links(&base, hrefs);
            info!(target: "keyword", page = %base, links = links.len(), "keyword.links.collected");

            let reports = LinkChecker::new()?
                .header_only(header_only)
                .check_all(&links, log_all)
                .await;
            summarize(&reports)?;
            Ok::<_, KeywordError>(reports)
        }
        .await;
        self.finish("verify_links", browser.as_ref(), result).await
    }
}
