//! Step model
//!
//! A step is one instruction of a script: either an action to perform
//! (open a browser, type text, store a parameter, wait) or a block marker
//! (`If`/`Else`/`EndIf`, `While`/`EndWhile`). Steps are serialized with a
//! `kind` discriminator next to the common `name` and `options` fields:
//!
//! ```json
//! { "kind": "PutParam", "name": "bump", "key": "count", "value": "1+${count}", "isExpression": true }
//! ```

use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use std::fmt;

/* ===================== Step ===================== */

/// One authored instruction
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Step {
    /// Human readable label shown in results and logs
    pub name: String,

    /// Opaque backend options (launch options, navigation options, ...)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub options: Option<JsonValue>,

    #[serde(flatten)]
    pub kind: StepKind,
}

/// Step payload, tagged by `kind`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all_fields = "camelCase")]
pub enum StepKind {
    OpenBrowser,
    CloseBrowser,
    OpenPage {
        url: String,
    },
    InputText {
        selector: String,
        text: String,
        #[serde(default)]
        append: bool,
    },
    PutParam {
        key: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        selector: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        value: Option<String>,
        #[serde(default)]
        read_from_text: bool,
        #[serde(default)]
        is_expression: bool,
    },
    Wait {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        selector_or_duration_ms: Option<WaitTarget>,
    },
    If {
        expression: String,
    },
    Else,
    EndIf,
    While {
        expression: String,
    },
    EndWhile,
}

/// What a `Wait` step waits for
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum WaitTarget {
    /// Fixed delay in milliseconds
    Duration(u64),
    /// CSS selector, or XPath when it starts with `//`
    Selector(String),
}

/// Field-less step discriminator, used as the action lookup key
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum StepType {
    OpenBrowser,
    CloseBrowser,
    OpenPage,
    InputText,
    PutParam,
    Wait,
    If,
    Else,
    EndIf,
    While,
    EndWhile,
}

impl StepType {
    pub fn as_str(&self) -> &'static str {
        match self {
            StepType::OpenBrowser => "OpenBrowser",
            StepType::CloseBrowser => "CloseBrowser",
            StepType::OpenPage => "OpenPage",
            StepType::InputText => "InputText",
            StepType::PutParam => "PutParam",
            StepType::Wait => "Wait",
            StepType::If => "If",
            StepType::Else => "Else",
            StepType::EndIf => "EndIf",
            StepType::While => "While",
            StepType::EndWhile => "EndWhile",
        }
    }

    /// Markers that only delimit blocks and are never dispatched
    pub fn is_block_marker(&self) -> bool {
        matches!(self, StepType::Else | StepType::EndIf | StepType::EndWhile)
    }
}

impl fmt::Display for StepType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/* ===================== Constructors ===================== */

impl Step {
    pub fn new(name: impl Into<String>, kind: StepKind) -> Self {
        Self {
            name: name.into(),
            options: None,
            kind,
        }
    }

    /// Attach backend options
    pub fn with_options(mut self, options: JsonValue) -> Self {
        self.options = Some(options);
        self
    }

    pub fn open_browser(name: impl Into<String>) -> Self {
        Self::new(name, StepKind::OpenBrowser)
    }

    pub fn close_browser(name: impl Into<String>) -> Self {
        Self::new(name, StepKind::CloseBrowser)
    }

    pub fn open_page(name: impl Into<String>, url: impl Into<String>) -> Self {
        Self::new(name, StepKind::OpenPage { url: url.into() })
    }

    pub fn input_text(
        name: impl Into<String>,
        selector: impl Into<String>,
        text: impl Into<String>,
        append: bool,
    ) -> Self {
        Self::new(
            name,
            StepKind::InputText {
                selector: selector.into(),
                text: text.into(),
                append,
            },
        )
    }

    /// Store a literal value under `key`
    pub fn put_param(name: impl Into<String>, key: impl Into<String>, value: impl Into<String>) -> Self {
        Self::new(
            name,
            StepKind::PutParam {
                key: key.into(),
                selector: None,
                value: Some(value.into()),
                read_from_text: false,
                is_expression: false,
            },
        )
    }

    /// Store the evaluated result of `expression` under `key`
    pub fn put_expression(
        name: impl Into<String>,
        key: impl Into<String>,
        expression: impl Into<String>,
    ) -> Self {
        Self::new(
            name,
            StepKind::PutParam {
                key: key.into(),
                selector: None,
                value: Some(expression.into()),
                read_from_text: false,
                is_expression: true,
            },
        )
    }

    /// Store the value (or visible text) of a page element under `key`
    pub fn extract_param(
        name: impl Into<String>,
        key: impl Into<String>,
        selector: impl Into<String>,
        read_from_text: bool,
    ) -> Self {
        Self::new(
            name,
            StepKind::PutParam {
                key: key.into(),
                selector: Some(selector.into()),
                value: None,
                read_from_text,
                is_expression: false,
            },
        )
    }

    pub fn wait_ms(name: impl Into<String>, millis: u64) -> Self {
        Self::new(
            name,
            StepKind::Wait {
                selector_or_duration_ms: Some(WaitTarget::Duration(millis)),
            },
        )
    }

    pub fn wait_for(name: impl Into<String>, selector: impl Into<String>) -> Self {
        Self::new(
            name,
            StepKind::Wait {
                selector_or_duration_ms: Some(WaitTarget::Selector(selector.into())),
            },
        )
    }

    pub fn if_(name: impl Into<String>, expression: impl Into<String>) -> Self {
        Self::new(
            name,
            StepKind::If {
                expression: expression.into(),
            },
        )
    }

    pub fn else_(name: impl Into<String>) -> Self {
        Self::new(name, StepKind::Else)
    }

    pub fn end_if(name: impl Into<String>) -> Self {
        Self::new(name, StepKind::EndIf)
    }

    pub fn while_(name: impl Into<String>, expression: impl Into<String>) -> Self {
        Self::new(
            name,
            StepKind::While {
                expression: expression.into(),
            },
        )
    }

    pub fn end_while(name: impl Into<String>) -> Self {
        Self::new(name, StepKind::EndWhile)
    }
}

/* ===================== Accessors ===================== */

impl Step {
    pub fn step_type(&self) -> StepType {
        match &self.kind {
            StepKind::OpenBrowser => StepType::OpenBrowser,
            StepKind::CloseBrowser => StepType::CloseBrowser,
            StepKind::OpenPage { .. } => StepType::OpenPage,
            StepKind::InputText { .. } => StepType::InputText,
            StepKind::PutParam { .. } => StepType::PutParam,
            StepKind::Wait { .. } => StepType::Wait,
            StepKind::If { .. } => StepType::If,
            StepKind::Else => StepType::Else,
            StepKind::EndIf => StepType::EndIf,
            StepKind::While { .. } => StepType::While,
            StepKind::EndWhile => StepType::EndWhile,
        }
    }

    /// Guard expression of an `If` or `While` step
    pub fn expression(&self) -> Option<&str> {
        match &self.kind {
            StepKind::If { expression } | StepKind::While { expression } => Some(expression),
            _ => None,
        }
    }

    /// Build a copy with every string field of the payload rewritten by `f`.
    ///
    /// Covers `name` and every text field of the kind; `options` is left to
    /// the caller since it is free-form JSON.
    pub fn try_map_text<E, F>(&self, mut f: F) -> Result<Step, E>
    where
        F: FnMut(&str) -> Result<String, E>,
    {
        let kind = match &self.kind {
            StepKind::OpenPage { url } => StepKind::OpenPage { url: f(url)? },
            StepKind::InputText {
                selector,
                text,
                append,
            } => StepKind::InputText {
                selector: f(selector)?,
                text: f(text)?,
                append: *append,
            },
            StepKind::PutParam {
                key,
                selector,
                value,
                read_from_text,
                is_expression,
            } => StepKind::PutParam {
                key: f(key)?,
                selector: selector.as_deref().map(&mut f).transpose()?,
                value: value.as_deref().map(&mut f).transpose()?,
                read_from_text: *read_from_text,
                is_expression: *is_expression,
            },
            StepKind::Wait {
                selector_or_duration_ms: Some(WaitTarget::Selector(selector)),
            } => StepKind::Wait {
                selector_or_duration_ms: Some(WaitTarget::Selector(f(selector)?)),
            },
            StepKind::If { expression } => StepKind::If {
                expression: f(expression)?,
            },
            StepKind::While { expression } => StepKind::While {
                expression: f(expression)?,
            },
            other => other.clone(),
        };

        Ok(Step {
            name: f(&self.name)?,
            options: self.options.clone(),
            kind,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_deserialize_put_param_with_camel_case_fields() {
        let step: Step = serde_json::from_value(json!({
            "kind": "PutParam",
            "name": "bump",
            "key": "count",
            "value": "1+${count}",
            "isExpression": true
        }))
        .unwrap();

        assert_eq!(step.step_type(), StepType::PutParam);
        assert_eq!(step, Step::put_expression("bump", "count", "1+${count}"));
    }

    #[test]
    fn test_wait_target_accepts_number_or_string() {
        let by_time: Step =
            serde_json::from_value(json!({"kind": "Wait", "name": "w", "selectorOrDurationMs": 250}))
                .unwrap();
        let by_selector: Step =
            serde_json::from_value(json!({"kind": "Wait", "name": "w", "selectorOrDurationMs": "#ok"}))
                .unwrap();

        assert_eq!(by_time, Step::wait_ms("w", 250));
        assert_eq!(by_selector, Step::wait_for("w", "#ok"));
    }

    #[test]
    fn test_markers_carry_options() {
        let step: Step =
            serde_json::from_value(json!({"kind": "EndIf", "name": "end", "options": {"a": 1}}))
                .unwrap();

        assert_eq!(step.step_type(), StepType::EndIf);
        assert!(step.step_type().is_block_marker());
        assert_eq!(step.options, Some(json!({"a": 1})));
    }

    #[test]
    fn test_try_map_text_leaves_source_untouched() {
        let step = Step::input_text("type ${who}", "#name", "${who}", true);
        let mapped: Result<Step, ()> = step.try_map_text(|s| Ok(s.replace("${who}", "ada")));
        let mapped = mapped.unwrap();

        assert_eq!(mapped, Step::input_text("type ada", "#name", "ada", true));
        assert_eq!(step, Step::input_text("type ${who}", "#name", "${who}", true));
    }
}
