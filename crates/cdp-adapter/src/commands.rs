use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{AdapterError, AdapterErrorKind};

/// Way of identifying an on-page element.
///
/// Text form (used by the selector catalog):
/// - `css:<selector>`
/// - `aria:<role>=<accessible name>` (name may be empty)
/// - `text:<substring>` and `text=:<exact text>`
///
/// A string without a known prefix is treated as CSS.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum AnchorDescriptor {
    Css(String),
    Aria { role: String, name: String },
    Text { content: String, exact: bool },
}

impl AnchorDescriptor {
    pub fn css(selector: impl Into<String>) -> Self {
        AnchorDescriptor::Css(selector.into())
    }

    pub fn aria(role: impl Into<String>, name: impl Into<String>) -> Self {
        AnchorDescriptor::Aria {
            role: role.into(),
            name: name.into(),
        }
    }

    pub fn text(content: impl Into<String>) -> Self {
        AnchorDescriptor::Text {
            content: content.into(),
            exact: false,
        }
    }

    pub fn exact_text(content: impl Into<String>) -> Self {
        AnchorDescriptor::Text {
            content: content.into(),
            exact: true,
        }
    }
}

impl fmt::Display for AnchorDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AnchorDescriptor::Css(selector) => write!(f, "css:{selector}"),
            AnchorDescriptor::Aria { role, name } => write!(f, "aria:{role}={name}"),
            AnchorDescriptor::Text {
                content,
                exact: false,
            } => write!(f, "text:{content}"),
            AnchorDescriptor::Text {
                content,
                exact: true,
            } => write!(f, "text=:{content}"),
        }
    }
}

impl FromStr for AnchorDescriptor {
    type Err = AdapterError;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        let raw = raw.trim();
        if raw.is_empty() {
            return Err(AdapterError::new(AdapterErrorKind::Internal).with_hint("empty anchor"));
        }
        if let Some(rest) = raw.strip_prefix("css:") {
            return Ok(AnchorDescriptor::css(rest.trim()));
        }
        if let Some(rest) = raw.strip_prefix("aria:") {
            let (role, name) = rest.split_once('=').unwrap_or((rest, ""));
            if role.trim().is_empty() {
                return Err(AdapterError::new(AdapterErrorKind::Internal)
                    .with_hint(format!("aria anchor without role: {raw}")));
            }
            return Ok(AnchorDescriptor::aria(role.trim(), name.trim()));
        }
        if let Some(rest) = raw.strip_prefix("text=:") {
            return Ok(AnchorDescriptor::exact_text(rest.trim()));
        }
        if let Some(rest) = raw.strip_prefix("text:") {
            return Ok(AnchorDescriptor::text(rest.trim()));
        }
        Ok(AnchorDescriptor::css(raw))
    }
}

impl Serialize for AnchorDescriptor {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for AnchorDescriptor {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}

/// Handle to an element resolved on the current page.
///
/// `selector` is a stable CSS selector the page can re-query; handles go stale
/// after navigation.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ElementRef {
    pub selector: String,
    pub label: String,
}

impl ElementRef {
    pub fn new(selector: impl Into<String>, label: impl Into<String>) -> Self {
        Self {
            selector: selector.into(),
            label: label.into(),
        }
    }
}

/// Snapshot of the element attributes the form layer reads back.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ElementState {
    pub tag: String,
    pub input_type: Option<String>,
    pub id: Option<String>,
    pub name: Option<String>,
    pub value: String,
    pub checked: bool,
    pub text: String,
}

impl ElementState {
    /// Whether the element looks like a password input by any of its attributes.
    pub fn is_password_like(&self) -> bool {
        let mentions = |attr: &Option<String>| {
            attr.as_deref()
                .map(|v| v.to_ascii_lowercase().contains("password"))
                .unwrap_or(false)
        };
        self.input_type.as_deref() == Some("password") || mentions(&self.id) || mentions(&self.name)
    }
}

/// How to empty an input before typing.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum ClearMethod {
    /// Select-all then delete through real key events.
    Keyboard,
    /// Assign an empty value and dispatch input/change events.
    Script,
}

/// State written straight into the DOM when clicks do not stick.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum ForcedState {
    Checked(bool),
    Value(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_prefixed_anchor_forms() {
        assert_eq!(
            "aria:button=Next".parse::<AnchorDescriptor>().unwrap(),
            AnchorDescriptor::aria("button", "Next")
        );
        assert_eq!(
            "aria:dialog".parse::<AnchorDescriptor>().unwrap(),
            AnchorDescriptor::aria("dialog", "")
        );
        assert_eq!(
            "text=:Skip for now".parse::<AnchorDescriptor>().unwrap(),
            AnchorDescriptor::exact_text("Skip for now")
        );
        assert_eq!(
            "text:verify".parse::<AnchorDescriptor>().unwrap(),
            AnchorDescriptor::text("verify")
        );
        assert_eq!(
            "input[name=email]".parse::<AnchorDescriptor>().unwrap(),
            AnchorDescriptor::css("input[name=email]")
        );
        assert!("aria:=Next".parse::<AnchorDescriptor>().is_err());
    }

    #[test]
    fn display_matches_text_form() {
        let anchor = AnchorDescriptor::exact_text("Next");
        assert_eq!(anchor.to_string(), "text=:Next");
        assert_eq!(anchor.to_string().parse::<AnchorDescriptor>().unwrap(), anchor);
    }

    #[test]
    fn password_detection_uses_any_attribute() {
        let by_name = ElementState {
            tag: "input".into(),
            name: Some("user_Password".into()),
            ..Default::default()
        };
        assert!(by_name.is_password_like());
        let plain = ElementState {
            tag: "input".into(),
            input_type: Some("text".into()),
            ..Default::default()
        };
        assert!(!plain.is_password_like());
    }
}
