//! Action results

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

use crate::expr::Val;
use crate::script::Step;

/// Outcome record of one dispatched step
///
/// `step` is the expanded copy that actually ran, so a result shows the
/// parameter values in effect at that moment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActionResult {
    pub success: bool,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    pub step: Step,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<JsonValue>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ActionResult {
    /// Successful result ending now
    pub fn success(start_time: DateTime<Utc>, step: Step, data: Option<JsonValue>) -> Self {
        Self {
            success: true,
            start_time,
            end_time: Utc::now(),
            step,
            data,
            error: None,
        }
    }

    /// Failed result ending now
    pub fn failure(start_time: DateTime<Utc>, step: Step, message: impl Into<String>) -> Self {
        Self {
            success: false,
            start_time,
            end_time: Utc::now(),
            step,
            data: None,
            error: Some(message.into()),
        }
    }

    pub fn duration(&self) -> chrono::Duration {
        self.end_time - self.start_time
    }

    /// Guard outcome carried in `data`: booleans as-is, anything else by truthiness
    pub fn condition(&self) -> bool {
        match &self.data {
            None | Some(JsonValue::Null) => false,
            Some(JsonValue::Bool(b)) => *b,
            Some(JsonValue::Number(n)) => Val::Num(n.as_f64().unwrap_or(0.0)).is_truthy(),
            Some(JsonValue::String(s)) => !s.is_empty(),
            Some(JsonValue::Array(_)) | Some(JsonValue::Object(_)) => true,
        }
    }
}
