//! Template expansion
//!
//! Rewrites `${name}` placeholders in step text using the run's parameter
//! store. `$${name}` is the escape for a literal `${name}`.
//!
//! Expansion always works on a copy: the authored step is never touched, so
//! running the same script twice starts from the same text both times.

use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use tracing::warn;

use crate::error::TemplateError;
use crate::params::ParameterStore;
use crate::script::Step;

/// What to do when a placeholder names a parameter that is not set
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MissingParamPolicy {
    /// Substitute an empty string and log a warning
    #[default]
    Lenient,
    /// Fail the step
    Strict,
}

pub struct TemplateExpander<'a> {
    params: &'a ParameterStore,
    policy: MissingParamPolicy,
}

impl<'a> TemplateExpander<'a> {
    pub fn new(params: &'a ParameterStore, policy: MissingParamPolicy) -> Self {
        Self { params, policy }
    }

    /// Expand every string field of `step`, including nested `options` values
    pub fn expand_step(&self, step: &Step) -> Result<Step, TemplateError> {
        let mut expanded = step.try_map_text(|text| self.expand_str(text))?;
        if let Some(options) = &step.options {
            expanded.options = Some(self.expand_json(options)?);
        }
        Ok(expanded)
    }

    /// Expand every string inside a JSON value, recursing through objects and arrays
    pub fn expand_json(&self, value: &JsonValue) -> Result<JsonValue, TemplateError> {
        Ok(match value {
            JsonValue::String(s) => JsonValue::String(self.expand_str(s)?),
            JsonValue::Array(items) => JsonValue::Array(
                items
                    .iter()
                    .map(|item| self.expand_json(item))
                    .collect::<Result<_, _>>()?,
            ),
            JsonValue::Object(map) => {
                let mut out = serde_json::Map::with_capacity(map.len());
                for (key, item) in map {
                    out.insert(key.clone(), self.expand_json(item)?);
                }
                JsonValue::Object(out)
            }
            other => other.clone(),
        })
    }

    /// Expand placeholders in one string
    pub fn expand_str(&self, input: &str) -> Result<String, TemplateError> {
        let mut out = String::with_capacity(input.len());
        let mut rest = input;

        while let Some(pos) = rest.find('$') {
            out.push_str(&rest[..pos]);
            let tail = &rest[pos..];

            // `$${name}` -> literal `${name}`
            if let Some(len) = tail.strip_prefix('$').and_then(placeholder_len) {
                out.push_str(&tail[1..1 + len]);
                rest = &tail[1 + len..];
                continue;
            }

            match placeholder_len(tail) {
                Some(len) => {
                    let name = &tail[2..len - 1];
                    out.push_str(&self.lookup(name)?);
                    rest = &tail[len..];
                }
                None => {
                    out.push('$');
                    rest = &tail[1..];
                }
            }
        }

        out.push_str(rest);
        Ok(out)
    }

    fn lookup(&self, name: &str) -> Result<String, TemplateError> {
        if let Some(value) = self.params.display(name) {
            return Ok(value);
        }
        match self.policy {
            MissingParamPolicy::Strict => Err(TemplateError::MissingParameter(name.to_string())),
            MissingParamPolicy::Lenient => {
                warn!(parameter = %name, "TemplateResolutionWarning: parameter is not set, substituting empty string");
                Ok(String::new())
            }
        }
    }
}

/// Length of a `${identifier}` placeholder at the start of `s`, if there is one.
///
/// Identifiers are ASCII word characters (`[A-Za-z0-9_]+`).
fn placeholder_len(s: &str) -> Option<usize> {
    let body = s.strip_prefix("${")?;
    let ident_len = body
        .bytes()
        .take_while(|b| b.is_ascii_alphanumeric() || *b == b'_')
        .count();
    if ident_len == 0 || body.as_bytes().get(ident_len) != Some(&b'}') {
        return None;
    }
    Some(2 + ident_len + 1)
}
