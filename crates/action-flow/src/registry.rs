//! Step name -> handler lookup table, built once per run.

use std::collections::HashMap;
use std::sync::Arc;

use formpilot_core_types::StepPlan;

use crate::handler::StepHandler;
use crate::steps::default_handler;

#[derive(Clone, Default)]
pub struct HandlerRegistry {
    handlers: HashMap<String, Arc<dyn StepHandler>>,
}

impl HandlerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// A handler for every step of `plan`: the wizard's own handler where one
    /// exists, simple-advance otherwise.
    pub fn for_plan(plan: &StepPlan) -> Self {
        let mut registry = Self::new();
        for step in plan.iter() {
            registry.register(default_handler(step.name.as_str()));
        }
        registry
    }

    /// Register under the handler's own name, replacing any previous one.
    pub fn register(&mut self, handler: Arc<dyn StepHandler>) -> &mut Self {
        self.handlers.insert(handler.name().to_string(), handler);
        self
    }

    pub fn get(&self, name: &str) -> Option<Arc<dyn StepHandler>> {
        self.handlers.get(name).cloned()
    }

    pub fn len(&self) -> usize {
        self.handlers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use action_locator::SelectorCatalog;

    #[test]
    fn default_plan_gets_a_handler_per_step() {
        let catalog = SelectorCatalog::embedded().unwrap();
        let registry = HandlerRegistry::for_plan(catalog.plan());
        assert_eq!(registry.len(), catalog.plan().len());
        for step in catalog.plan().iter() {
            let handler = registry.get(step.name.as_str()).unwrap();
            assert_eq!(handler.name(), step.name.as_str());
        }
        assert!(registry.get("nope").is_none());
    }
}
