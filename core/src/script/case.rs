//! Script cases: a named, ordered list of steps

use serde::{Deserialize, Serialize};

use super::step::Step;

/// A reusable script. Running it never mutates it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScriptCase {
    pub name: String,
    #[serde(default)]
    pub steps: Vec<Step>,
}

impl ScriptCase {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            steps: Vec::new(),
        }
    }

    /// Append a step (builder style)
    pub fn step(mut self, step: Step) -> Self {
        self.steps.push(step);
        self
    }

    pub fn with_steps(mut self, steps: impl IntoIterator<Item = Step>) -> Self {
        self.steps.extend(steps);
        self
    }

    /// Parse a case from its JSON form
    pub fn from_json(source: &str) -> serde_json::Result<Self> {
        serde_json::from_str(source)
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }
}
