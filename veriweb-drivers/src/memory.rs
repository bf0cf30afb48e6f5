//! In-process document that implements [`Browser`] without a real browser.
//!
//! The document is described with [`MemoryNode`] builders and supports light
//! DOM, open shadow roots, iframes, visibility, form values and navigation.
//! Handles carry the document generation they were issued for, so replacing
//! the document or navigating makes older handles stale the same way a live
//! page does.
//!
//! ```
//! use veriweb_drivers::memory::{MemoryBrowser, MemoryNode};
//! use veriweb_drivers::Browser;
//!
//! let browser = MemoryBrowser::new(vec![
//!     MemoryNode::new("div").child(MemoryNode::new("button").id("save").text("Save")),
//! ]);
//! assert_eq!(browser.name(), "memory");
//! ```
use crate::browser::{Browser, ContextHandle, DriverError, ElementHandle, RawElement};
use async_trait::async_trait;
use std::collections::{BTreeMap, HashMap};
use tokio::sync::Mutex;

/// Builder for one element of a [`MemoryBrowser`] document.
#[derive(Debug, Clone, Default)]
pub struct MemoryNode {
    tag: String,
    text: String,
    attributes: BTreeMap<String, String>,
    children: Vec<MemoryNode>,
    shadow: Option<Vec<MemoryNode>>,
    frame: Option<Vec<MemoryNode>>,
    hidden: bool,
}

impl MemoryNode {
    pub fn new(tag: &str) -> Self {
        Self {
            tag: tag.to_ascii_lowercase(),
            ..Self::default()
        }
    }

    /// Own text of the element (its direct text nodes).
    pub fn text(mut self, text: &str) -> Self {
        self.text = text.to_string();
        self
    }

    pub fn attr(mut self, name: &str, value: &str) -> Self {
        self.attributes.insert(name.to_string(), value.to_string());
        self
    }

    pub fn id(self, id: &str) -> Self {
        self.attr("id", id)
    }

    pub fn child(mut self, child: MemoryNode) -> Self {
        self.children.push(child);
        self
    }

    pub fn children(mut self, children: impl IntoIterator<Item = MemoryNode>) -> Self {
        self.children.extend(children);
        self
    }

    /// Attach an open shadow root holding `children`.
    pub fn shadow(mut self, children: impl IntoIterator<Item = MemoryNode>) -> Self {
        self.shadow = Some(children.into_iter().collect());
        self
    }

    /// Make this element an iframe whose document holds `children`.
    pub fn frame(mut self, children: impl IntoIterator<Item = MemoryNode>) -> Self {
        self.tag = "iframe".to_string();
        self.frame = Some(children.into_iter().collect());
        self
    }

    /// Render with `display:none`; descendants are hidden too.
    pub fn hidden(mut self) -> Self {
        self.hidden = true;
        self
    }
}

/// Side effects recorded by a [`MemoryBrowser`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MemoryEvent {
    Click { handle: ElementHandle, id: Option<String>, text: String },
    Clear { handle: ElementHandle },
    Type { handle: ElementHandle, text: String },
    Highlight { handle: ElementHandle, color: String },
    Navigate { url: String },
    SwitchFrame { frame: Option<ElementHandle> },
    Close,
}

#[derive(Debug)]
struct Slot {
    parent: Option<usize>,
    tag: String,
    text: String,
    attributes: BTreeMap<String, String>,
    children: Vec<usize>,
    shadow: Option<Vec<usize>>,
    frame: Option<Vec<usize>>,
    visible: bool,
    value: String,
    detached: bool,
}

#[derive(Debug, Default)]
struct State {
    generation: u64,
    slots: Vec<Slot>,
    roots: Vec<usize>,
    frame_stack: Vec<usize>,
    url: String,
    pages: HashMap<String, Vec<MemoryNode>>,
    events: Vec<MemoryEvent>,
    stale_queries: usize,
    closed: bool,
}

impl State {
    fn load(&mut self, nodes: Vec<MemoryNode>) {
        self.generation += 1;
        self.slots.clear();
        self.frame_stack.clear();
        self.roots = nodes
            .into_iter()
            .map(|node| self.insert(node, None))
            .collect();
    }

    fn insert(&mut self, node: MemoryNode, parent: Option<usize>) -> usize {
        let idx = self.slots.len();
        let value = if matches!(node.tag.as_str(), "input" | "textarea" | "select") {
            node.attributes.get("value").cloned().unwrap_or_default()
        } else {
            String::new()
        };
        self.slots.push(Slot {
            parent,
            tag: node.tag,
            text: node.text,
            attributes: node.attributes,
            children: Vec::new(),
            shadow: None,
            frame: None,
            visible: !node.hidden,
            value,
            detached: false,
        });
        let children = node
            .children
            .into_iter()
            .map(|c| self.insert(c, Some(idx)))
            .collect();
        self.slots[idx].children = children;
        if let Some(shadow) = node.shadow {
            let shadow = shadow.into_iter().map(|c| self.insert(c, Some(idx))).collect();
            self.slots[idx].shadow = Some(shadow);
        }
        if let Some(frame) = node.frame {
            let frame = frame.into_iter().map(|c| self.insert(c, Some(idx))).collect();
            self.slots[idx].frame = Some(frame);
        }
        idx
    }

    fn ensure_open(&self) -> Result<(), DriverError> {
        if self.closed {
            return Err(DriverError::SessionClosed("memory browser closed".to_string()));
        }
        Ok(())
    }

    fn handle(&self, idx: usize) -> ElementHandle {
        ElementHandle(format!("g{}:{}", self.generation, idx))
    }

    fn resolve(&self, handle: &ElementHandle) -> Result<usize, DriverError> {
        self.ensure_open()?;
        let stale = || DriverError::StaleContext(format!("element {handle} is no longer attached"));
        let (generation, idx) = handle
            .0
            .strip_prefix('g')
            .and_then(|rest| rest.split_once(':'))
            .and_then(|(g, i)| Some((g.parse::<u64>().ok()?, i.parse::<usize>().ok()?)))
            .ok_or_else(stale)?;
        if generation != self.generation {
            return Err(stale());
        }
        match self.slots.get(idx) {
            Some(slot) if !slot.detached => Ok(idx),
            _ => Err(stale()),
        }
    }

    fn document_roots(&self) -> Vec<usize> {
        match self.frame_stack.last() {
            None => self.roots.clone(),
            Some(frame) => self.slots[*frame].frame.clone().unwrap_or_default(),
        }
    }

    fn flatten(&self, nodes: &[usize], path: &[u32], out: &mut Vec<RawElement>) {
        for (i, idx) in nodes.iter().enumerate() {
            let slot = &self.slots[*idx];
            let mut child_path = path.to_vec();
            child_path.push(i as u32);
            out.push(RawElement {
                handle: self.handle(*idx),
                tag: slot.tag.clone(),
                text: slot.text.clone(),
                attributes: slot.attributes.clone(),
                path: child_path.clone(),
                has_shadow_root: slot.shadow.is_some(),
            });
            self.flatten(&slot.children, &child_path, out);
        }
    }

    fn rendered_text(&self, idx: usize, out: &mut Vec<String>) {
        let slot = &self.slots[idx];
        if !slot.text.trim().is_empty() {
            out.push(slot.text.trim().to_string());
        }
        for child in &slot.children {
            self.rendered_text(*child, out);
        }
    }

    fn is_visible(&self, idx: usize) -> bool {
        let mut cursor = Some(idx);
        while let Some(i) = cursor {
            let slot = &self.slots[i];
            if !slot.visible || slot.detached {
                return false;
            }
            cursor = slot.parent;
        }
        true
    }

    fn find_by_id(&self, id: &str) -> Option<usize> {
        self.slots
            .iter()
            .position(|s| !s.detached && s.attributes.get("id").map(String::as_str) == Some(id))
    }

    fn detach(&mut self, idx: usize) {
        self.slots[idx].detached = true;
        let slot = &self.slots[idx];
        let mut nested: Vec<usize> = slot.children.clone();
        nested.extend(slot.shadow.clone().unwrap_or_default());
        nested.extend(slot.frame.clone().unwrap_or_default());
        for child in nested {
            self.detach(child);
        }
    }

    fn editable(&self, idx: usize) -> Result<(), DriverError> {
        let slot = &self.slots[idx];
        if slot.attributes.contains_key("disabled") || slot.attributes.contains_key("readonly") {
            return Err(DriverError::Command("element not interactable".to_string()));
        }
        Ok(())
    }
}

/// Deterministic [`Browser`] over an in-memory document.
pub struct MemoryBrowser {
    label: String,
    state: Mutex<State>,
}

impl MemoryBrowser {
    pub fn new(document: Vec<MemoryNode>) -> Self {
        Self::named("memory", document)
    }

    pub fn named(label: &str, document: Vec<MemoryNode>) -> Self {
        let mut state = State {
            url: "about:blank".to_string(),
            ..State::default()
        };
        state.load(document);
        Self {
            label: label.to_string(),
            state: Mutex::new(state),
        }
    }

    /// Make `url` serve `document` on [`Browser::navigate`].
    pub fn with_page(mut self, url: &str, document: Vec<MemoryNode>) -> Self {
        self.state.get_mut().pages.insert(url.to_string(), document);
        self
    }

    /// Replace the whole document, as a client-side re-render would.
    pub async fn set_document(&self, document: Vec<MemoryNode>) {
        self.state.lock().await.load(document);
    }

    /// Append `node` to the element with `parent_id`, or to the top level.
    pub async fn insert(&self, parent_id: Option<&str>, node: MemoryNode) -> Result<(), DriverError> {
        let mut state = self.state.lock().await;
        let parent = match parent_id {
            None => None,
            Some(id) => Some(
                state
                    .find_by_id(id)
                    .ok_or_else(|| DriverError::Command(format!("no element with id {id}")))?,
            ),
        };
        let idx = state.insert(node, parent);
        match parent {
            None => state.roots.push(idx),
            Some(p) => state.slots[p].children.push(idx),
        }
        Ok(())
    }

    /// Detach the element with `id` and its subtree.
    pub async fn remove(&self, id: &str) -> bool {
        let mut state = self.state.lock().await;
        let Some(idx) = state.find_by_id(id) else {
            return false;
        };
        state.detach(idx);
        for slot in state.slots.iter_mut() {
            slot.children.retain(|c| *c != idx);
            if let Some(shadow) = slot.shadow.as_mut() {
                shadow.retain(|c| *c != idx);
            }
        }
        state.roots.retain(|c| *c != idx);
        true
    }

    pub async fn set_visible(&self, id: &str, visible: bool) -> bool {
        let mut state = self.state.lock().await;
        match state.find_by_id(id) {
            Some(idx) => {
                state.slots[idx].visible = visible;
                true
            }
            None => false,
        }
    }

    /// Current form value of the element with `id`.
    pub async fn value_of(&self, id: &str) -> Option<String> {
        let state = self.state.lock().await;
        state.find_by_id(id).map(|idx| state.slots[idx].value.clone())
    }

    /// Make the next `count` element queries fail as if the page navigated.
    pub async fn inject_stale_queries(&self, count: usize) {
        self.state.lock().await.stale_queries = count;
    }

    pub async fn events(&self) -> Vec<MemoryEvent> {
        self.state.lock().await.events.clone()
    }

    pub async fn clicks(&self) -> Vec<MemoryEvent> {
        self.events()
            .await
            .into_iter()
            .filter(|e| matches!(e, MemoryEvent::Click { .. }))
            .collect()
    }
}

#[async_trait]
impl Browser for MemoryBrowser {
    fn name(&self) -> &str {
        &self.label
    }

    async fn query_elements(&self, ctx: &ContextHandle) -> Result<Vec<RawElement>, DriverError> {
        let mut state = self.state.lock().await;
        state.ensure_open()?;
        if state.stale_queries > 0 {
            state.stale_queries -= 1;
            return Err(DriverError::StaleContext("document was replaced".to_string()));
        }
        let roots = match ctx {
            ContextHandle::Document => state.document_roots(),
            ContextHandle::Shadow(host) => {
                let idx = state.resolve(host)?;
                state.slots[idx].shadow.clone().ok_or_else(|| {
                    DriverError::StaleContext(format!("{host} no longer hosts a shadow root"))
                })?
            }
        };
        let mut out = Vec::new();
        state.flatten(&roots, &[], &mut out);
        Ok(out)
    }

    async fn element_text(&self, el: &ElementHandle) -> Result<String, DriverError> {
        let state = self.state.lock().await;
        let idx = state.resolve(el)?;
        let mut parts = Vec::new();
        state.rendered_text(idx, &mut parts);
        Ok(parts.join(" "))
    }

    async fn element_property(
        &self,
        el: &ElementHandle,
        name: &str,
    ) -> Result<Option<String>, DriverError> {
        let state = self.state.lock().await;
        let slot = &state.slots[state.resolve(el)?];
        let flag = |attr: &str| Some(slot.attributes.contains_key(attr).to_string());
        Ok(match name {
            "value" => Some(slot.value.clone()),
            "checked" => flag("checked"),
            "disabled" => flag("disabled"),
            "readOnly" => flag("readonly"),
            "tagName" => Some(slot.tag.to_ascii_uppercase()),
            other => slot.attributes.get(other).cloned(),
        })
    }

    async fn element_visible(&self, el: &ElementHandle) -> Result<bool, DriverError> {
        let state = self.state.lock().await;
        let idx = state.resolve(el)?;
        Ok(state.is_visible(idx))
    }

    async fn shadow_root(&self, el: &ElementHandle) -> Result<Option<ContextHandle>, DriverError> {
        let state = self.state.lock().await;
        let idx = state.resolve(el)?;
        Ok(state.slots[idx]
            .shadow
            .as_ref()
            .map(|_| ContextHandle::Shadow(el.clone())))
    }

    async fn click(&self, el: &ElementHandle) -> Result<(), DriverError> {
        let mut state = self.state.lock().await;
        let idx = state.resolve(el)?;
        let mut text = Vec::new();
        state.rendered_text(idx, &mut text);
        let event = MemoryEvent::Click {
            handle: el.clone(),
            id: state.slots[idx].attributes.get("id").cloned(),
            text: text.join(" "),
        };
        state.events.push(event);
        Ok(())
    }

    async fn clear(&self, el: &ElementHandle) -> Result<(), DriverError> {
        let mut state = self.state.lock().await;
        let idx = state.resolve(el)?;
        state.editable(idx)?;
        state.slots[idx].value.clear();
        state.events.push(MemoryEvent::Clear { handle: el.clone() });
        Ok(())
    }

    async fn type_text(&self, el: &ElementHandle, text: &str) -> Result<(), DriverError> {
        let mut state = self.state.lock().await;
        let idx = state.resolve(el)?;
        state.editable(idx)?;
        state.slots[idx].value.push_str(text);
        state.events.push(MemoryEvent::Type {
            handle: el.clone(),
            text: text.to_string(),
        });
        Ok(())
    }

    async fn switch_frame(&self, frame: Option<&ElementHandle>) -> Result<(), DriverError> {
        let mut state = self.state.lock().await;
        state.ensure_open()?;
        match frame {
            None => state.frame_stack.clear(),
            Some(handle) => {
                let idx = state.resolve(handle)?;
                if state.slots[idx].frame.is_none() {
                    return Err(DriverError::Command(format!("{handle} is not a frame")));
                }
                state.frame_stack.push(idx);
            }
        }
        state.events.push(MemoryEvent::SwitchFrame {
            frame: frame.cloned(),
        });
        Ok(())
    }

    async fn navigate(&self, url: &str) -> Result<(), DriverError> {
        let mut state = self.state.lock().await;
        state.ensure_open()?;
        let document = state.pages.get(url).cloned().unwrap_or_default();
        state.load(document);
        state.url = url.to_string();
        state.events.push(MemoryEvent::Navigate {
            url: url.to_string(),
        });
        Ok(())
    }

    async fn current_url(&self) -> Result<String, DriverError> {
        let state = self.state.lock().await;
        state.ensure_open()?;
        Ok(state.url.clone())
    }

    async fn title(&self) -> Result<String, DriverError> {
        let state = self.state.lock().await;
        state.ensure_open()?;
        Ok(state
            .slots
            .iter()
            .find(|s| s.tag == "title" && !s.detached)
            .map(|s| s.text.clone())
            .unwrap_or_default())
    }

    async fn screenshot(&self) -> Result<Vec<u8>, DriverError> {
        let state = self.state.lock().await;
        state.ensure_open()?;
        Ok(b"\x89PNG\r\n\x1a\n".to_vec())
    }

    async fn highlight(&self, el: &ElementHandle, color: &str) -> Result<(), DriverError> {
        let mut state = self.state.lock().await;
        state.resolve(el)?;
        state.events.push(MemoryEvent::Highlight {
            handle: el.clone(),
            color: color.to_string(),
        });
        Ok(())
    }

    async fn close(&self) -> Result<(), DriverError> {
        let mut state = self.state.lock().await;
        state.ensure_open()?;
        state.closed = true;
        state.events.push(MemoryEvent::Close);
        Ok(())
    }
}
