//! Input and result types for batch rendering.

use serde::{Deserialize, Serialize};
use wikiflow_core::Syntax;

/// One document to render in a batch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchInput {
    /// Caller-chosen identifier, echoed in the result.
    pub id: String,
    /// Source text.
    pub text: String,
    /// Source syntax. Falls back to the configured default syntax.
    #[serde(default)]
    pub syntax: Option<Syntax>,
}

impl BatchInput {
    /// Creates an input written in the default syntax.
    pub fn new(id: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            text: text.into(),
            syntax: None,
        }
    }

    /// Sets the source syntax.
    pub fn with_syntax(mut self, syntax: Syntax) -> Self {
        self.syntax = Some(syntax);
        self
    }
}

/// Options for [`Converter::render_batch`](crate::Converter::render_batch).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct BatchOptions {
    /// Size of a dedicated thread pool. `None` uses the global rayon pool.
    pub max_threads: Option<usize>,
    /// Keep going after a failed render. When false, inputs are rendered
    /// one after the other and the batch stops at the first failure.
    pub continue_on_error: bool,
}

impl Default for BatchOptions {
    fn default() -> Self {
        Self {
            max_threads: None,
            continue_on_error: true,
        }
    }
}

/// Outcome of one input.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchResult {
    /// Identifier of the input.
    pub id: String,
    /// Rendered output, on success.
    pub output: Option<String>,
    /// Error message, on failure.
    pub error: Option<String>,
}

impl BatchResult {
    /// Whether the render succeeded.
    pub fn is_ok(&self) -> bool {
        self.error.is_none()
    }
}

/// Aggregate numbers for a batch.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchStats {
    /// Number of inputs submitted.
    pub total: u32,
    /// Renders that produced output.
    pub succeeded: u32,
    /// Renders that failed.
    pub failed: u32,
    /// Wall-clock time of the whole batch.
    pub processing_time_ms: f64,
}

/// Results in input order, plus statistics.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchProcessingResult {
    /// One entry per processed input.
    pub results: Vec<BatchResult>,
    /// Aggregate statistics.
    pub stats: BatchStats,
}
