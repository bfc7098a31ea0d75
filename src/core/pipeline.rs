//! Pipeline domain model and YAML loading

use crate::core::step::Step;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Errors raised while loading or validating a pipeline
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("step name is required")]
    StepNameRequired,

    #[error("step commands are required")]
    StepCommandsRequired,

    #[error("pipeline name is required")]
    PipelineNameRequired,

    #[error("pipeline must have at least one step")]
    NoSteps,

    #[error("step {index} ({name}): {source}")]
    InvalidStep {
        index: usize,
        name: String,
        #[source]
        source: Box<PipelineError>,
    },

    #[error("failed to read pipeline file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse pipeline file: {0}")]
    Parse(#[from] serde_yaml::Error),

    #[error("invalid pipeline: {0}")]
    Invalid(#[source] Box<PipelineError>),
}

/// A pipeline definition
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Pipeline {
    /// Pipeline name
    #[serde(default)]
    pub name: String,

    /// Pipeline version
    #[serde(default)]
    pub version: String,

    /// Steps in declaration order
    #[serde(default)]
    pub steps: Vec<Step>,

    /// Global environment variables available to all steps
    #[serde(default)]
    pub env: HashMap<String, String>,

    /// Workspace directory (empty = use the runner workspace)
    #[serde(default)]
    pub workspace: String,

    /// Requested number of concurrently running steps
    #[serde(default)]
    pub concurrency: usize,
}

impl Pipeline {
    /// Load and validate a pipeline from a YAML file
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, PipelineError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|source| PipelineError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_yaml(&content)
    }

    /// Parse and validate a pipeline from a YAML string
    pub fn from_yaml(yaml: &str) -> Result<Self, PipelineError> {
        let pipeline: Pipeline = serde_yaml::from_str(yaml)?;
        pipeline
            .validate()
            .map_err(|e| PipelineError::Invalid(Box::new(e)))?;
        Ok(pipeline)
    }

    /// Validate the pipeline and each of its steps
    pub fn validate(&self) -> Result<(), PipelineError> {
        if self.name.is_empty() {
            return Err(PipelineError::PipelineNameRequired);
        }

        if self.steps.is_empty() {
            return Err(PipelineError::NoSteps);
        }

        for (index, step) in self.steps.iter().enumerate() {
            step.validate().map_err(|e| PipelineError::InvalidStep {
                index,
                name: step.name.clone(),
                source: Box::new(e),
            })?;
        }

        Ok(())
    }

    /// Get a step by name
    pub fn step(&self, name: &str) -> Option<&Step> {
        self.steps.iter().find(|s| s.name == name)
    }

    /// Resolve a variable, preferring the step's own environment
    pub fn env_value<'a>(&'a self, step: Option<&'a Step>, key: &str) -> Option<&'a str> {
        step.and_then(|s| s.env.get(key))
            .or_else(|| self.env.get(key))
            .map(String::as_str)
    }

    /// Position of a step in declaration order
    pub fn position(&self, name: &str) -> Option<usize> {
        self.steps.iter().position(|s| s.name == name)
    }
}
