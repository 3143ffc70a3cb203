use action_primitives::{ActionError, Outcome};
use async_trait::async_trait;
use formpilot_core_types::RunOptions;

use crate::handler::{StepEnv, StepHandler};
use crate::templates::simple_advance;

/// Screens with nothing to enter ("welcome").
pub struct SimpleAdvanceHandler {
    name: String,
}

impl SimpleAdvanceHandler {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }
}

#[async_trait]
impl StepHandler for SimpleAdvanceHandler {
    fn name(&self) -> &str {
        &self.name
    }

    async fn execute(
        &self,
        env: &StepEnv<'_>,
        _options: &RunOptions,
    ) -> Result<Outcome, ActionError> {
        simple_advance(env).await
    }
}
