use std::path::Path;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use flowscope_types::{FlowscopeError, Result};

use crate::layout::LayoutTable;
use crate::step::Step;

/// A declared bidirectional retry relationship between two steps. These are
/// configuration, never derived from inputs/outputs, and render distinctly
/// from data-flow edges.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValidationLoop {
    pub from: String,
    pub to: String,
    pub label: String,
}

/// The complete explorer input: step roster, phase table, system inputs,
/// validation loops, and the diagram layout. Read-only after load.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineDoc {
    pub title: String,
    pub summary: String,
    /// Ordered phase key -> display label table. Steps reference keys; the
    /// declaration order here is cosmetic, roman numerals follow step order.
    pub phases: IndexMap<String, String>,
    pub steps: Vec<Step>,
    /// Variable names supplied from outside the pipeline (null producer).
    #[serde(default)]
    pub system_inputs: Vec<String>,
    #[serde(default)]
    pub validation_loops: Vec<ValidationLoop>,
    pub layout: LayoutTable,
}

impl PipelineDoc {
    pub fn from_json(json: &str) -> Result<Self> {
        let doc: PipelineDoc = serde_json::from_str(json)?;
        tracing::debug!(
            steps = doc.steps.len(),
            loops = doc.validation_loops.len(),
            "loaded pipeline document '{}'",
            doc.title
        );
        Ok(doc)
    }

    pub fn load(path: &Path) -> Result<Self> {
        let json = std::fs::read_to_string(path).map_err(|e| FlowscopeError::DocumentRead {
            path: path.display().to_string(),
            message: e.to_string(),
        })?;
        Self::from_json(&json)
    }

    /// Look up a step by id. Rendering paths treat a miss as "skip", not an
    /// error.
    pub fn step(&self, id: &str) -> Option<&Step> {
        self.steps.iter().find(|s| s.id == id)
    }

    /// Position of a step in the original list order.
    pub fn step_index(&self, id: &str) -> Option<usize> {
        self.steps.iter().position(|s| s.id == id)
    }

    /// Display label for a phase key, falling back to the key itself when the
    /// document forgot to declare it.
    pub fn phase_label<'a>(&'a self, key: &'a str) -> &'a str {
        self.phases.get(key).map(String::as_str).unwrap_or(key)
    }

    pub fn is_system_input(&self, name: &str) -> bool {
        self.system_inputs.iter().any(|v| v == name)
    }
}
