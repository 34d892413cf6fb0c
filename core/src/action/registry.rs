//! Action registry: step type -> candidate actions

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use super::Action;
use crate::script::{Step, StepType};

#[derive(Default, Clone)]
pub struct ActionRegistry {
    actions: HashMap<StepType, Vec<Arc<dyn Action>>>,
}

impl ActionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an action. Actions registered earlier take precedence.
    pub fn register(&mut self, action: impl Action + 'static) {
        self.register_arc(Arc::new(action));
    }

    pub fn register_arc(&mut self, action: Arc<dyn Action>) {
        self.actions
            .entry(action.step_type())
            .or_default()
            .push(action);
    }

    /// Builder form of [`register`](Self::register)
    pub fn with(mut self, action: impl Action + 'static) -> Self {
        self.register(action);
        self
    }

    /// First registered action of the step's type that supports it
    pub fn resolve(&self, step: &Step) -> Option<Arc<dyn Action>> {
        self.actions
            .get(&step.step_type())?
            .iter()
            .find(|action| action.supports(step))
            .cloned()
    }

    pub fn handles(&self, step_type: StepType) -> bool {
        self.actions.contains_key(&step_type)
    }

    pub fn len(&self) -> usize {
        self.actions.values().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl fmt::Debug for ActionRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut types: Vec<_> = self.actions.keys().map(StepType::as_str).collect();
        types.sort_unstable();
        f.debug_struct("ActionRegistry")
            .field("step_types", &types)
            .field("actions", &self.len())
            .finish()
    }
}
