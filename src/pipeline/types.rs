//! Pipeline types

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::llm::MenuItem;

/// The four named pipeline steps, in execution order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StepId {
    Upload,
    Ocr,
    Parse,
    Search,
}

impl StepId {
    pub const ALL: [StepId; 4] = [StepId::Upload, StepId::Ocr, StepId::Parse, StepId::Search];

    pub fn as_str(&self) -> &'static str {
        match self {
            StepId::Upload => "upload",
            StepId::Ocr => "ocr",
            StepId::Parse => "parse",
            StepId::Search => "search",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            StepId::Upload => "Uploading image",
            StepId::Ocr => "Extracting text",
            StepId::Parse => "Parsing menu",
            StepId::Search => "Searching dish images",
        }
    }
}

impl fmt::Display for StepId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Step status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StepStatus {
    Pending,
    Processing,
    Completed,
    Error,
}

impl StepStatus {
    /// Statuses only move forward
    pub fn can_transition_to(self, next: StepStatus) -> bool {
        matches!(
            (self, next),
            (StepStatus::Pending, StepStatus::Processing)
                | (StepStatus::Processing, StepStatus::Completed)
                | (StepStatus::Processing, StepStatus::Error)
        )
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, StepStatus::Completed | StepStatus::Error)
    }
}

/// Status of one step in one pipeline run
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProcessStep {
    pub id: StepId,
    pub label: String,
    pub status: StepStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub started_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub finished_at: Option<DateTime<Utc>>,
}

impl ProcessStep {
    pub fn new(id: StepId) -> Self {
        Self {
            id,
            label: id.label().to_string(),
            status: StepStatus::Pending,
            started_at: None,
            finished_at: None,
        }
    }
}

/// Status vector of a single run
#[derive(Debug, Clone)]
pub struct PipelineProgress {
    steps: Vec<ProcessStep>,
}

impl PipelineProgress {
    pub fn new() -> Self {
        Self {
            steps: StepId::ALL.iter().map(|id| ProcessStep::new(*id)).collect(),
        }
    }

    pub fn status(&self, id: StepId) -> StepStatus {
        self.step(id).map(|s| s.status).unwrap_or(StepStatus::Pending)
    }

    pub fn steps(&self) -> &[ProcessStep] {
        &self.steps
    }

    pub fn into_steps(self) -> Vec<ProcessStep> {
        self.steps
    }

    pub fn start(&mut self, id: StepId) -> bool {
        self.transition(id, StepStatus::Processing)
    }

    pub fn complete(&mut self, id: StepId) -> bool {
        self.transition(id, StepStatus::Completed)
    }

    pub fn fail(&mut self, id: StepId) -> bool {
        self.transition(id, StepStatus::Error)
    }

    /// Apply a transition; backward or skipping moves are ignored
    fn transition(&mut self, id: StepId, next: StepStatus) -> bool {
        let Some(step) = self.steps.iter_mut().find(|s| s.id == id) else {
            return false;
        };

        if !step.status.can_transition_to(next) {
            tracing::warn!(step = %id, from = ?step.status, to = ?next, "Ignoring invalid step transition");
            return false;
        }

        let now = Utc::now();
        if next == StepStatus::Processing {
            step.started_at = Some(now);
        }
        if next.is_terminal() {
            step.finished_at = Some(now);
        }
        step.status = next;

        tracing::debug!(step = %id, status = ?next, "Pipeline step updated");
        true
    }

    fn step(&self, id: StepId) -> Option<&ProcessStep> {
        self.steps.iter().find(|s| s.id == id)
    }
}

impl Default for PipelineProgress {
    fn default() -> Self {
        Self::new()
    }
}

/// Photo handed to the pipeline
#[derive(Debug, Clone)]
pub struct MenuUpload {
    pub data: Vec<u8>,
    pub content_type: String,
    pub file_name: String,
}

/// Successful pipeline outcome
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EnrichedMenu {
    /// Public URL of the uploaded photo
    pub source_image_url: String,
    /// Raw text transcribed from the photo
    pub text: String,
    /// Dishes with their images attached
    #[serde(rename = "menu")]
    pub items: Vec<MenuItem>,
    pub steps: Vec<ProcessStep>,
}

/// A fatal step failure. Outputs of steps that had already completed are kept.
#[derive(Debug, Clone, Serialize, thiserror::Error)]
#[serde(rename_all = "camelCase")]
#[error("Step '{step}' failed: {message}")]
pub struct PipelineError {
    pub step: StepId,
    pub message: String,
    pub steps: Vec<ProcessStep>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source_image_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
}
