//! Step domain model

use crate::core::pipeline::PipelineError;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// A single step in a pipeline
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Step {
    /// Step name, unique by convention
    #[serde(default)]
    pub name: String,

    /// Container image (informational, steps are not isolated)
    #[serde(default)]
    pub image: String,

    /// Commands run in order, stopping at the first failure
    #[serde(default)]
    pub commands: Vec<String>,

    /// Step specific environment variables
    #[serde(default)]
    pub env: HashMap<String, String>,

    /// Execution condition tag
    #[serde(default)]
    pub when: String,

    /// Timeout in seconds (0 = inherit the run timeout)
    #[serde(default)]
    pub timeout: u64,

    /// Hook commands run when every command succeeded
    #[serde(default)]
    pub on_success: Vec<String>,

    /// Hook commands run after the first failing command
    #[serde(default)]
    pub on_failure: Vec<String>,
}

impl Step {
    /// Create a step with a name and commands, everything else defaulted
    pub fn new<I, S>(name: impl Into<String>, commands: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            name: name.into(),
            commands: commands.into_iter().map(Into::into).collect(),
            ..Default::default()
        }
    }

    /// Whether the step is eligible to run.
    ///
    /// All recognised tags currently evaluate to true; only an unknown tag
    /// filters the step out.
    pub fn should_run(&self) -> bool {
        matches!(
            self.when.as_str(),
            "" | "always" | "on_success" | "on_failure"
        )
    }

    /// Validate the step configuration
    pub fn validate(&self) -> Result<(), PipelineError> {
        if self.name.is_empty() {
            return Err(PipelineError::StepNameRequired);
        }
        if self.commands.is_empty() {
            return Err(PipelineError::StepCommandsRequired);
        }
        Ok(())
    }
}
