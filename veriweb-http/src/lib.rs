//! Link checker behind `VerifyLinks`.
//!
//! - Collects absolute `http`/`https` URLs from raw `href` values, deduplicated
//! - Probes each with `HEAD`, falling back to `GET` on 404/405 unless
//!   header-only mode is on
//! - Retries connection failures with exponential backoff
//! - Status 400..=599 or an unreachable host is broken; 999 (returned by
//!   sites that block bots) is accepted
//!
//! Example (no_run):
//! ```rust
//! # async fn demo() -> Result<(), veriweb_http::LinkError> {
//! use url::Url;
//! use veriweb_http::{collect_links, LinkChecker};
//!
//! let page = Url::parse("https://example.com/").unwrap();
//! let links = collect_links(&page, ["/about", "mailto:x@example.com"]);
//! let checker = LinkChecker::new()?;
//! let reports = checker.check_all(&links, false).await;
//! veriweb_http::summarize(&reports)?;
//! # Ok(()) }
//! ```
//!
//! Observability: one `links.check` event per link (info when `log_all`,
//! debug otherwise), `links.retrying` on backoff and `links.broken` warnings.

use reqwest::{Client, Method, StatusCode};
use std::collections::HashSet;
use std::fmt;
use std::time::Duration;
use thiserror::Error;
use tokio::time::sleep;
use url::Url;

/// Status some sites answer to automated clients; treated as reachable.
pub const BOT_BLOCKED_STATUS: u16 = 999;

// ==============================
// Errors & reports
// ==============================

#[derive(Debug, Error)]
pub enum LinkError {
    #[error("client build failed: {0}")]
    Build(String),
    #[error("{} broken link(s): {}", .0.len(), render_broken(.0))]
    Broken(Vec<LinkReport>),
}

fn render_broken(reports: &[LinkReport]) -> String {
    reports
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

/// Outcome of probing one URL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LinkStatus {
    Ok(u16),
    Acceptable(u16),
    Broken { status: Option<u16>, reason: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LinkReport {
    pub url: Url,
    /// Method of the request whose answer decided the status.
    pub method: Method,
    pub status: LinkStatus,
}

impl LinkReport {
    pub fn is_broken(&self) -> bool {
        matches!(self.status, LinkStatus::Broken { .. })
    }
}

impl fmt::Display for LinkReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.status {
            LinkStatus::Ok(code) => write!(f, "{} {} -> {code}", self.method, self.url),
            LinkStatus::Acceptable(code) => {
                write!(f, "{} {} -> {code} (accepted)", self.method, self.url)
            }
            LinkStatus::Broken {
                status: Some(code),
                reason,
            } => write!(f, "{} {} -> {code} {reason}", self.method, self.url),
            LinkStatus::Broken {
                status: None,
                reason,
            } => write!(f, "{} {} -> unreachable: {reason}", self.method, self.url),
        }
    }
}

fn classify(status: StatusCode) -> LinkStatus {
    let code = status.as_u16();
    if code == BOT_BLOCKED_STATUS {
        LinkStatus::Acceptable(code)
    } else if (400..=599).contains(&code) {
        LinkStatus::Broken {
            status: Some(code),
            reason: status.canonical_reason().unwrap_or("error").to_string(),
        }
    } else {
        LinkStatus::Ok(code)
    }
}

// ==============================
// Link collection
// ==============================

/// Resolve `hrefs` against `base`, keeping unique http(s) URLs in order.
/// Fragments are dropped.
pub fn collect_links<'a>(base: &Url, hrefs: impl IntoIterator<Item = &'a str>) -> Vec<Url> {
    let mut seen = HashSet::new();
    hrefs
        .into_iter()
        .filter_map(|href| {
            let href = href.trim();
            if href.is_empty() || href.starts_with('#') {
                return None;
            }
            let mut url = base.join(href).ok()?;
            url.set_fragment(None);
            matches!(url.scheme(), "http" | "https").then_some(url)
        })
        .filter(|url| seen.insert(url.clone()))
        .collect()
}

/// `Err` listing every broken link, `Ok` otherwise.
pub fn summarize(reports: &[LinkReport]) -> Result<(), LinkError> {
    let broken: Vec<LinkReport> = reports.iter().filter(|r| r.is_broken()).cloned().collect();
    if broken.is_empty() {
        Ok(())
    } else {
        Err(LinkError::Broken(broken))
    }
}

// ==============================
// Checker
// ==============================

#[derive(Clone)]
pub struct LinkChecker {
    inner: Client,
    pub timeout: Duration,
    pub max_retries: usize,
    /// Never fall back to `GET`.
    pub header_only: bool,
}

impl LinkChecker {
    /// ```no_run
    /// use std::time::Duration;
    /// use veriweb_http::{LinkChecker, LinkError};
    ///
    /// let checker = LinkChecker::new()?;
    /// assert_eq!(checker.timeout, Duration::from_secs(15));
    /// assert_eq!(checker.max_retries, 2);
    /// assert!(!checker.header_only);
    /// # Ok::<(), LinkError>(())
    /// ```
    pub fn new() -> Result<Self, LinkError> {
        let inner = Client::builder()
            .connect_timeout(Duration::from_secs(5))
            .build()
            .map_err(|e| LinkError::Build(e.to_string()))?;
        Ok(Self {
            inner,
            timeout: Duration::from_secs(15),
            max_retries: 2,
            header_only: false,
        })
    }

    pub fn with_timeout(mut self, dur: Duration) -> Self {
        self.timeout = dur;
        self
    }

    pub fn with_retries(mut self, n: usize) -> Self {
        self.max_retries = n;
        self
    }

    pub fn header_only(mut self, header_only: bool) -> Self {
        self.header_only = header_only;
        self
    }

    /// Probe every URL in order. With `log_all` every result is logged at
    /// info level; otherwise only broken links are.
    pub async fn check_all(&self, urls: &[Url], log_all: bool) -> Vec<LinkReport> {
        if urls.is_empty() {
            tracing::warn!(target: "links", "links.none_found");
        }
        let mut reports = Vec::with_capacity(urls.len());
        for url in urls {
            let report = self.check(url).await;
            match &report.status {
                LinkStatus::Broken { .. } => {
                    tracing::warn!(target: "links", report = %report, "links.broken");
                }
                LinkStatus::Acceptable(_) => {
                    tracing::info!(target: "links", report = %report, "links.check");
                }
                LinkStatus::Ok(_) if log_all => {
                    tracing::info!(target: "links", report = %report, "links.check");
                }
                LinkStatus::Ok(_) => {
                    tracing::debug!(target: "links", report = %report, "links.check");
                }
            }
            reports.push(report);
        }
        reports
    }

    pub async fn check(&self, url: &Url) -> LinkReport {
        let head = self.send(Method::HEAD, url).await;
        let fallback = !self.header_only
            && matches!(
                head,
                Ok(StatusCode::NOT_FOUND) | Ok(StatusCode::METHOD_NOT_ALLOWED)
            );
        let (method, outcome) = if fallback {
            (Method::GET, self.send(Method::GET, url).await)
        } else {
            (Method::HEAD, head)
        };
        let status = match outcome {
            Ok(status) => classify(status),
            Err(reason) => LinkStatus::Broken {
                status: None,
                reason,
            },
        };
        LinkReport {
            url: url.clone(),
            method,
            status,
        }
    }

    /// Status of one request, retrying transport failures.
    async fn send(&self, method: Method, url: &Url) -> Result<StatusCode, String> {
        let mut attempt = 0usize;
        loop {
            let t0 = std::time::Instant::now();
            let sent = self
                .inner
                .request(method.clone(), url.clone())
                .timeout(self.timeout)
                .send()
                .await;
            match sent {
                Ok(resp) => {
                    tracing::trace!(
                        target: "links",
                        method = %method,
                        url = %url,
                        status = %resp.status(),
                        duration_ms = t0.elapsed().as_millis() as u64,
                        "links.response"
                    );
                    return Ok(resp.status());
                }
                Err(err) if attempt < self.max_retries => {
                    attempt += 1;
                    let delay = Duration::from_millis(200u64.saturating_mul(1 << (attempt - 1)));
                    tracing::warn!(
                        target: "links",
                        method = %method,
                        url = %url,
                        attempt,
                        max_retries = self.max_retries,
                        backoff_ms = delay.as_millis() as u64,
                        message = %err,
                        "links.retrying"
                    );
                    sleep(delay).await;
                }
                Err(err) => return Err(err.to_string()),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn checker() -> LinkChecker {
        LinkChecker::new()
            .unwrap()
            .with_retries(0)
            .with_timeout(Duration::from_secs(2))
    }

    async fn serve(server: &MockServer, verb: &str, route: &str, status: u16) {
        Mock::given(method(verb))
            .and(path(route))
            .respond_with(ResponseTemplate::new(status))
            .mount(server)
            .await;
    }

    #[test]
    fn collects_unique_http_links() {
        let base = Url::parse("https://example.com/docs/").unwrap();
        let links = collect_links(
            &base,
            [
                "intro",
                "/about#team",
                "/about",
                "mailto:someone@example.com",
                "javascript:void(0)",
                "#top",
                "http://other.test/x",
            ],
        );
        let rendered: Vec<_> = links.iter().map(Url::as_str).collect();
        assert_eq!(
            rendered,
            vec![
                "https://example.com/docs/intro",
                "https://example.com/about",
                "http://other.test/x",
            ]
        );
    }

    #[test]
    fn classifies_status_codes() {
        assert_eq!(classify(StatusCode::OK), LinkStatus::Ok(200));
        assert_eq!(classify(StatusCode::MOVED_PERMANENTLY), LinkStatus::Ok(301));
        assert!(matches!(
            classify(StatusCode::SERVICE_UNAVAILABLE),
            LinkStatus::Broken { status: Some(503), .. }
        ));
        let blocked = StatusCode::from_u16(999).unwrap();
        assert_eq!(classify(blocked), LinkStatus::Acceptable(999));
    }

    #[tokio::test]
    async fn head_success_needs_no_get() {
        let server = MockServer::start().await;
        serve(&server, "HEAD", "/ok", 200).await;
        let url = Url::parse(&format!("{}/ok", server.uri())).unwrap();
        let report = checker().check(&url).await;
        assert_eq!(report.status, LinkStatus::Ok(200));
        assert_eq!(report.method, Method::HEAD);
    }

    #[tokio::test]
    async fn get_fallback_after_head_not_allowed() {
        let server = MockServer::start().await;
        serve(&server, "HEAD", "/page", 405).await;
        serve(&server, "GET", "/page", 200).await;
        let url = Url::parse(&format!("{}/page", server.uri())).unwrap();

        let report = checker().check(&url).await;
        assert_eq!(report.status, LinkStatus::Ok(200));
        assert_eq!(report.method, Method::GET);

        let header_only = checker().header_only(true).check(&url).await;
        assert!(header_only.is_broken());
        assert_eq!(header_only.method, Method::HEAD);
    }

    #[tokio::test]
    async fn summarize_lists_broken_links() {
        let server = MockServer::start().await;
        serve(&server, "HEAD", "/fine", 200).await;
        serve(&server, "HEAD", "/gone", 410).await;
        serve(&server, "GET", "/gone", 410).await;
        let urls = vec![
            Url::parse(&format!("{}/fine", server.uri())).unwrap(),
            Url::parse(&format!("{}/gone", server.uri())).unwrap(),
        ];
        let reports = checker().check_all(&urls, true).await;
        let err = summarize(&reports).unwrap_err();
        let LinkError::Broken(broken) = &err else {
            panic!("expected broken links, got {err}");
        };
        assert_eq!(broken.len(), 1);
        assert!(err.to_string().contains("/gone"));
        assert!(err.to_string().contains("410"));
    }

    #[tokio::test]
    async fn unreachable_hosts_are_broken() {
        let url = Url::parse("http://127.0.0.1:9/").unwrap();
        let report = checker().with_timeout(Duration::from_millis(500)).check(&url).await;
        assert!(matches!(report.status, LinkStatus::Broken { status: None, .. }));
    }
}
