use crate::anchor;
use crate::dispatch::{self, Action, ActionResult};
use crate::dom::{self, DomNode, FrameWalker};
use crate::error::{FindError, SearchDiagnostics, SearchFailure};
use crate::matcher::{match_nodes, Candidate, CandidateSet};
use crate::poller::{PollReport, Poller};
use crate::request::{Anchor, LocatorKind, SearchRequest};
use crate::visibility;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};
use veriweb_common::SearchConfig;
use veriweb_drivers::Browser;

/// Element that resolved a search.
pub type ResolvedElement = Candidate;

/// Runs searches against one browser with one session's configuration.
///
/// Every public operation polls until it succeeds or the request's timeout
/// elapses; each tick re-reads the document from scratch.
pub struct Finder<'a> {
    browser: &'a dyn Browser,
    config: &'a SearchConfig,
    cancel: CancellationToken,
}

impl<'a> Finder<'a> {
    pub fn new(browser: &'a dyn Browser, config: &'a SearchConfig) -> Self {
        Self {
            browser,
            config,
            cancel: CancellationToken::new(),
        }
    }

    /// Abort polling when `token` is cancelled.
    pub fn with_cancel(mut self, token: CancellationToken) -> Self {
        self.cancel = token;
        self
    }

    /// Find the single intended element.
    pub async fn resolve(&self, req: &SearchRequest) -> Result<ResolvedElement, SearchFailure> {
        let polled = self
            .poller(req)
            .run(move |_| async move { self.locate(req).await })
            .await;
        self.finish(req, polled)
    }

    /// Resolve and act on the element, re-resolving on every retry.
    pub async fn perform(
        &self,
        req: &SearchRequest,
        action: &Action,
    ) -> Result<ActionResult, SearchFailure> {
        let color = self.config.highlight_color.as_str();
        let polled = self
            .poller(req)
            .run(move |_| async move {
                let element = self.locate(req).await?;
                dispatch::apply(self.browser, &element.node, action, color).await
            })
            .await;
        self.finish(req, polled)
    }

    /// Number of matching elements, polling until at least one appears.
    /// Returns 0 once the timeout elapses with nothing matched; any other
    /// last error is reported.
    pub async fn count(&self, req: &SearchRequest) -> Result<usize, SearchFailure> {
        let polled = self
            .poller(req)
            .run(move |_| async move {
                match self.count_once(req).await? {
                    0 => Err(FindError::NoMatch {
                        target: req.target.clone(),
                    }),
                    n => Ok(n),
                }
            })
            .await;
        match self.finish(req, polled) {
            Err(failure)
                if failure.is_timeout()
                    && matches!(failure.error.root(), FindError::NoMatch { .. }) =>
            {
                Ok(0)
            }
            other => other,
        }
    }

    /// Poll until exactly `expected` elements match.
    pub async fn expect_count(
        &self,
        req: &SearchRequest,
        expected: usize,
    ) -> Result<usize, SearchFailure> {
        let polled = self
            .poller(req)
            .run(move |_| async move {
                let found = self.count_once(req).await?;
                if found == expected {
                    Ok(found)
                } else {
                    Err(FindError::Unsatisfied(format!(
                        "found {found} elements matching {:?}, expected {expected}",
                        req.target
                    )))
                }
            })
            .await;
        self.finish(req, polled)
    }

    /// Poll until nothing matches.
    pub async fn expect_absent(&self, req: &SearchRequest) -> Result<(), SearchFailure> {
        let polled = self
            .poller(req)
            .run(move |_| async move {
                match self.count_once(req).await? {
                    0 => Ok(()),
                    n => Err(FindError::Unsatisfied(format!(
                        "{:?} is still present ({n} matches)",
                        req.target
                    ))),
                }
            })
            .await;
        self.finish(req, polled)
    }

    /// Index of the first request that resolves. All requests are tried on
    /// every tick; the first one's timeout bounds the poll.
    pub async fn first_present(&self, reqs: &[SearchRequest]) -> Result<usize, SearchFailure> {
        let Some(lead) = reqs.first() else {
            return Err(SearchFailure {
                error: FindError::InvalidLocator("no locators given".to_string()),
                diagnostics: SearchDiagnostics {
                    target: String::new(),
                    kind: LocatorKind::Text,
                    shadow_dom: self.config.shadow_dom,
                    partial_match: self.config.partial_match,
                    elapsed: Default::default(),
                    attempts: 0,
                },
            });
        };
        let polled = self
            .poller(lead)
            .run(move |_| async move {
                let mut last = None;
                for (idx, req) in reqs.iter().enumerate() {
                    match self.locate(req).await {
                        Ok(_) => return Ok(idx),
                        Err(err) if err.is_retryable() => last = Some(err),
                        Err(err) => return Err(err),
                    }
                }
                Err(last.unwrap_or(FindError::NoMatch {
                    target: lead.target.clone(),
                }))
            })
            .await;
        self.finish(lead, polled)
    }

    fn poller(&self, req: &SearchRequest) -> Poller {
        Poller::new(req.timeout, self.config.poll_interval, self.cancel.clone())
    }

    fn finish<T>(
        &self,
        req: &SearchRequest,
        (result, report): (Result<T, FindError>, PollReport),
    ) -> Result<T, SearchFailure> {
        match result {
            Ok(value) => {
                debug!(
                    target: "finder.search",
                    locator = %req.target,
                    kind = %req.kind,
                    attempts = report.attempts,
                    elapsed_ms = report.elapsed.as_millis() as u64,
                    "finder.search.resolved"
                );
                Ok(value)
            }
            Err(error) => {
                let failure = SearchFailure {
                    error,
                    diagnostics: SearchDiagnostics {
                        target: req.target.clone(),
                        kind: req.kind,
                        shadow_dom: self.config.shadow_dom,
                        partial_match: req.partial_match,
                        elapsed: report.elapsed,
                        attempts: report.attempts,
                    },
                };
                warn!(target: "finder.search", error = %failure, "finder.search.failed");
                Err(failure)
            }
        }
    }

    /// One tick: scan frames until one has candidates, then anchor.
    ///
    /// On success the browser stays switched into the matching frame.
    async fn locate(&self, req: &SearchRequest) -> Result<ResolvedElement, FindError> {
        req.validate()?;
        let mut walker = FrameWalker::new(self.config.shadow_dom, self.config.search_frames);
        while let Some(scan) = walker.next(self.browser).await? {
            let found = self.candidates(&scan.nodes, req, &req.target, req.kind).await?;
            if found.is_empty() {
                continue;
            }
            let anchors = match &req.anchor {
                Some(Anchor::Text(text)) => self.anchor_elements(&scan.nodes, req, text).await?,
                _ => Vec::new(),
            };
            return anchor::resolve(found, req.anchor.as_ref(), &anchors, req.strict, &req.target);
        }
        dom::enter_frame(self.browser, &[]).await?;
        Err(FindError::NoMatch {
            target: req.target.clone(),
        })
    }

    /// Matching elements summed over every scanned frame; anchors are ignored.
    async fn count_once(&self, req: &SearchRequest) -> Result<usize, FindError> {
        req.validate()?;
        let mut walker = FrameWalker::new(self.config.shadow_dom, self.config.search_frames);
        let mut total = 0;
        while let Some(scan) = walker.next(self.browser).await? {
            total += self
                .candidates(&scan.nodes, req, &req.target, req.kind)
                .await?
                .len();
        }
        dom::enter_frame(self.browser, &[]).await?;
        Ok(total)
    }

    async fn candidates(
        &self,
        nodes: &[DomNode],
        req: &SearchRequest,
        target: &str,
        kind: LocatorKind,
    ) -> Result<CandidateSet, FindError> {
        let matched = match_nodes(
            nodes,
            target,
            kind,
            req.partial_match,
            self.config.case_insensitive,
        )?;
        if matched.is_empty() {
            return Ok(matched);
        }
        visibility::filter(self.browser, matched, req.visibility_required).await
    }

    /// Elements matching the anchor text: by text first, then by attribute.
    async fn anchor_elements(
        &self,
        nodes: &[DomNode],
        req: &SearchRequest,
        text: &str,
    ) -> Result<CandidateSet, FindError> {
        let by_text = self.candidates(nodes, req, text, LocatorKind::Text).await?;
        if !by_text.is_empty() {
            return Ok(by_text);
        }
        self.candidates(nodes, req, text, LocatorKind::Attribute).await
    }
}
