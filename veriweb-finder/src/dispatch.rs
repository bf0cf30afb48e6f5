use crate::dom::DomNode;
use crate::error::FindError;
use crate::matcher::normalize;
use std::fmt;
use std::str::FromStr;
use tracing::{debug, trace};
use veriweb_drivers::Browser;

/// Expected state of an input element.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputStatus {
    Enabled,
    Disabled,
    ReadOnly,
    Checked,
    Unchecked,
}

impl FromStr for InputStatus {
    type Err = FindError;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        let key: String = raw
            .chars()
            .filter(|c| !matches!(c, ' ' | '_' | '-'))
            .collect::<String>()
            .to_ascii_lowercase();
        match key.as_str() {
            "enabled" => Ok(InputStatus::Enabled),
            "disabled" => Ok(InputStatus::Disabled),
            "readonly" => Ok(InputStatus::ReadOnly),
            "checked" | "selected" => Ok(InputStatus::Checked),
            "unchecked" | "unselected" => Ok(InputStatus::Unchecked),
            _ => Err(FindError::InvalidLocator(format!("unknown input status {raw:?}"))),
        }
    }
}

impl fmt::Display for InputStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            InputStatus::Enabled => "enabled",
            InputStatus::Disabled => "disabled",
            InputStatus::ReadOnly => "read-only",
            InputStatus::Checked => "checked",
            InputStatus::Unchecked => "unchecked",
        })
    }
}

/// What to do with the resolved element.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    VerifyExists,
    Click,
    TypeText {
        text: String,
        clear: bool,
        /// Read the value back and require it to match.
        check: bool,
    },
    ReadValue,
    /// Require the form value to equal this text (whitespace-normalized).
    VerifyValue(String),
    VerifyStatus(InputStatus),
}

impl Action {
    fn name(&self) -> &'static str {
        match self {
            Action::VerifyExists => "verify",
            Action::Click => "click",
            Action::TypeText { .. } => "type",
            Action::ReadValue => "read",
            Action::VerifyValue(_) => "value",
            Action::VerifyStatus(_) => "status",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ActionResult {
    Done,
    Value(String),
}

/// Perform `action` once on `element`. Highlighting is best effort and
/// skipped when `highlight_color` is empty.
pub async fn apply(
    browser: &dyn Browser,
    element: &DomNode,
    action: &Action,
    highlight_color: &str,
) -> Result<ActionResult, FindError> {
    let handle = &element.handle;
    if !highlight_color.is_empty() {
        if let Err(err) = browser.highlight(handle, highlight_color).await {
            trace!(target: "finder.dispatch", error = %err, "finder.dispatch.highlight_failed");
        }
    }
    debug!(
        target: "finder.dispatch",
        action = action.name(),
        element = %handle,
        tag = %element.tag,
        "finder.dispatch.apply"
    );

    match action {
        Action::VerifyExists => Ok(ActionResult::Done),
        Action::Click => {
            browser.click(handle).await?;
            Ok(ActionResult::Done)
        }
        Action::TypeText { text, clear, check } => {
            if *clear {
                browser.clear(handle).await?;
            }
            browser.type_text(handle, text).await?;
            if *check {
                let value = read_value(browser, element).await?;
                let ok = if *clear { value == *text } else { value.ends_with(text.as_str()) };
                if !ok {
                    return Err(FindError::Unsatisfied(format!(
                        "typed {text:?} but field contains {value:?}"
                    )));
                }
            }
            Ok(ActionResult::Done)
        }
        Action::ReadValue => Ok(ActionResult::Value(read_value(browser, element).await?)),
        Action::VerifyValue(expected) => {
            let actual = read_value(browser, element).await?;
            if normalize(&actual) == normalize(expected) {
                Ok(ActionResult::Value(actual))
            } else {
                Err(FindError::Unsatisfied(format!(
                    "input value is {actual:?}, expected {expected:?}"
                )))
            }
        }
        Action::VerifyStatus(expected) => {
            let flag = |value: Option<String>| value.is_some_and(|v| v == "true");
            let actual = match expected {
                InputStatus::Enabled => !flag(browser.element_property(handle, "disabled").await?),
                InputStatus::Disabled => flag(browser.element_property(handle, "disabled").await?),
                InputStatus::ReadOnly => flag(browser.element_property(handle, "readOnly").await?),
                InputStatus::Checked => flag(browser.element_property(handle, "checked").await?),
                InputStatus::Unchecked => !flag(browser.element_property(handle, "checked").await?),
            };
            if actual {
                Ok(ActionResult::Done)
            } else {
                Err(FindError::Unsatisfied(format!("input is not {expected}")))
            }
        }
    }
}

/// Form value, falling back to rendered text for contenteditable elements.
async fn read_value(browser: &dyn Browser, element: &DomNode) -> Result<String, FindError> {
    let value = match element.tag.as_str() {
        "input" | "textarea" | "select" => browser.element_property(&element.handle, "value").await?,
        _ => None,
    };
    match value {
        Some(value) => Ok(value),
        None => Ok(browser.element_text(&element.handle).await?),
    }
}
