use crate::dom::DomNode;
use crate::error::FindError;
use crate::request::LocatorKind;

/// Attributes tried, in order, for [`LocatorKind::Attribute`] before visible text.
pub const ATTRIBUTE_PRIORITY: [&str; 4] = ["id", "title", "tooltip", "aria-label"];

/// Attributes tried, in order, for [`LocatorKind::Input`].
pub const INPUT_PRIORITY: [&str; 6] = ["placeholder", "id", "name", "aria-label", "title", "tooltip"];

/// Which property of the element satisfied the locator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MatchedOn {
    Text,
    Attribute(&'static str),
    /// A `<label>` with this text points at the input.
    Label,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Candidate {
    pub node: DomNode,
    pub matched_on: MatchedOn,
}

/// Matches in traversal order.
pub type CandidateSet = Vec<Candidate>;

/// Trim and collapse whitespace runs (including no-break spaces) to one space.
pub fn normalize(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

struct Needle {
    text: String,
    partial: bool,
    case_insensitive: bool,
}

impl Needle {
    fn matches(&self, value: &str) -> bool {
        let value = normalize(value);
        if value.is_empty() {
            return false;
        }
        let value = if self.case_insensitive {
            value.to_lowercase()
        } else {
            value
        };
        if self.partial {
            value.contains(&self.text)
        } else {
            value == self.text
        }
    }
}

fn is_input_like(node: &DomNode) -> bool {
    match node.tag.as_str() {
        "input" => !matches!(
            node.attribute("type").map(str::to_ascii_lowercase).as_deref(),
            Some("hidden" | "submit" | "button")
        ),
        "textarea" | "select" => true,
        _ => node
            .attribute("contenteditable")
            .is_some_and(|v| !v.eq_ignore_ascii_case("false")),
    }
}

/// Every node satisfying `target` for `kind`, in traversal order.
pub fn match_nodes(
    nodes: &[DomNode],
    target: &str,
    kind: LocatorKind,
    partial: bool,
    case_insensitive: bool,
) -> Result<CandidateSet, FindError> {
    let text = normalize(target);
    if text.is_empty() {
        return Err(FindError::InvalidLocator("locator text is empty".to_string()));
    }
    let needle = Needle {
        text: if case_insensitive { text.to_lowercase() } else { text },
        partial,
        case_insensitive,
    };

    let mut out: CandidateSet = Vec::new();
    for node in nodes {
        let matched_on = match kind {
            LocatorKind::Text => needle.matches(&node.text).then_some(MatchedOn::Text),
            LocatorKind::Attribute => match_attributes(node, &ATTRIBUTE_PRIORITY, &needle)
                .or_else(|| needle.matches(&node.text).then_some(MatchedOn::Text)),
            LocatorKind::Input => {
                if is_input_like(node) {
                    match_attributes(node, &INPUT_PRIORITY, &needle)
                } else if node.tag == "label" && needle.matches(&node.text) {
                    if let Some(input) = labelled_input(nodes, node) {
                        push_unique(&mut out, input, MatchedOn::Label);
                    }
                    None
                } else {
                    None
                }
            }
        };
        if let Some(matched_on) = matched_on {
            push_unique(&mut out, node, matched_on);
        }
    }
    Ok(out)
}

fn match_attributes(node: &DomNode, names: &[&'static str], needle: &Needle) -> Option<MatchedOn> {
    names
        .iter()
        .find(|name| node.attribute(name).is_some_and(|v| needle.matches(v)))
        .map(|name| MatchedOn::Attribute(*name))
}

/// `<label for=id>` target, or the first input nested inside the label.
fn labelled_input<'a>(nodes: &'a [DomNode], label: &DomNode) -> Option<&'a DomNode> {
    match label.attribute("for") {
        Some(id) => nodes
            .iter()
            .find(|n| n.attribute("id") == Some(id) && is_input_like(n)),
        None => nodes.iter().find(|n| {
            n.path.len() > label.path.len() && n.path.starts_with(&label.path) && is_input_like(n)
        }),
    }
}

fn push_unique(out: &mut CandidateSet, node: &DomNode, matched_on: MatchedOn) {
    if !out.iter().any(|c| c.node.handle == node.handle) {
        out.push(Candidate {
            node: node.clone(),
            matched_on,
        });
    }
}
