//! Flattens the live document into [`DomNode`]s in traversal order.
//!
//! Light DOM comes first, then each shadow root depth-first in host order.
//! Frames are scanned one browsing context at a time by [`FrameWalker`].
use crate::error::FindError;
use crate::matcher::normalize;
use std::collections::BTreeMap;
use tracing::trace;
use veriweb_drivers::{Browser, ContextHandle, ElementHandle, RawElement};

/// Path step inserted between a shadow host's path and its shadow content.
pub const SHADOW_STEP: u32 = u32::MAX;

/// Handles of the iframes to enter, outermost first. Empty for the top document.
pub type FramePath = Vec<ElementHandle>;

/// One element snapshot, valid for a single poll tick.
#[derive(Debug, Clone, PartialEq)]
pub struct DomNode {
    pub handle: ElementHandle,
    pub tag: String,
    /// Own text, normalized.
    pub text: String,
    pub attributes: BTreeMap<String, String>,
    /// Child-index path from the frame's document root.
    pub path: Vec<u32>,
    pub in_shadow: bool,
    pub frame: FramePath,
}

impl DomNode {
    fn from_raw(raw: RawElement, base: &[u32], in_shadow: bool, frame: &FramePath) -> Self {
        let mut path = base.to_vec();
        path.extend(raw.path);
        Self {
            handle: raw.handle,
            tag: raw.tag,
            text: normalize(&raw.text),
            attributes: raw.attributes,
            path,
            in_shadow,
            frame: frame.clone(),
        }
    }

    pub fn attribute(&self, name: &str) -> Option<&str> {
        self.attributes.get(name).map(String::as_str)
    }

    pub fn is_frame(&self) -> bool {
        matches!(self.tag.as_str(), "iframe" | "frame")
    }
}

/// Collect every element of the current browsing context.
///
/// With `include_shadow` the open shadow roots are walked too; otherwise
/// shadow content is invisible to the search.
pub async fn collect(
    browser: &dyn Browser,
    include_shadow: bool,
    frame: &FramePath,
) -> Result<Vec<DomNode>, FindError> {
    let mut out = Vec::new();
    // (context, base path, inside shadow); popped from the end
    let mut pending = vec![(ContextHandle::Document, Vec::new(), false)];

    while let Some((ctx, base, in_shadow)) = pending.pop() {
        let raw = browser.query_elements(&ctx).await?;
        let mut hosts = Vec::new();
        for element in raw {
            let is_host = element.has_shadow_root;
            let node = DomNode::from_raw(element, &base, in_shadow, frame);
            if include_shadow && is_host {
                hosts.push((node.handle.clone(), node.path.clone()));
            }
            out.push(node);
        }

        let mut nested = Vec::with_capacity(hosts.len());
        for (host, mut host_path) in hosts {
            let Some(shadow) = browser.shadow_root(&host).await? else {
                continue;
            };
            host_path.push(SHADOW_STEP);
            nested.push((shadow, host_path, true));
        }
        // first host's shadow root is visited next
        pending.extend(nested.into_iter().rev());
    }

    trace!(target: "finder.dom", count = out.len(), frames = frame.len(), "finder.dom.collect");
    Ok(out)
}

/// Switch the browser into `frame`, starting from the top document.
pub async fn enter_frame(browser: &dyn Browser, frame: &[ElementHandle]) -> Result<(), FindError> {
    browser.switch_frame(None).await?;
    for handle in frame {
        browser.switch_frame(Some(handle)).await?;
    }
    Ok(())
}

/// The nodes of one browsing context.
#[derive(Debug, Clone, PartialEq)]
pub struct FrameScan {
    pub frame: FramePath,
    pub nodes: Vec<DomNode>,
}

/// Scans the top document, then (optionally) each iframe in traversal order,
/// recursively.
///
/// After [`FrameWalker::next`] returns a scan the browser is switched into
/// that scan's frame, so its elements can be inspected and acted on.
pub struct FrameWalker {
    pending: Vec<FramePath>,
    include_shadow: bool,
    search_frames: bool,
}

impl FrameWalker {
    pub fn new(include_shadow: bool, search_frames: bool) -> Self {
        Self {
            pending: vec![Vec::new()],
            include_shadow,
            search_frames,
        }
    }

    pub async fn next(&mut self, browser: &dyn Browser) -> Result<Option<FrameScan>, FindError> {
        let Some(frame) = self.pending.pop() else {
            return Ok(None);
        };
        enter_frame(browser, &frame).await?;
        let nodes = collect(browser, self.include_shadow, &frame).await?;
        if self.search_frames {
            let children: Vec<FramePath> = nodes
                .iter()
                .filter(|n| n.is_frame())
                .map(|n| {
                    let mut path = frame.clone();
                    path.push(n.handle.clone());
                    path
                })
                .collect();
            self.pending.extend(children.into_iter().rev());
        }
        Ok(Some(FrameScan { frame, nodes }))
    }
}
