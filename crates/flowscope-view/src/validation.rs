//! Advisory lint rules over a pipeline document.
//!
//! The renderer never consults these: a missing layout entry or unresolvable
//! input degrades silently at render time. The lint pass exists so document
//! authors can see those conditions on demand. Call [`lint`] for
//! advisory diagnostics or [`lint_or_raise`] to fail on the first
//! `Error`-severity issue.

use std::collections::{HashMap, HashSet};

use flowscope_model::PipelineDoc;
use flowscope_types::{FlowscopeError, Result};

use crate::graph::{derive_sources, resolve_producer};

// ---------------------------------------------------------------------------
// Diagnostic types
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct Diagnostic {
    pub rule: String,
    pub severity: Severity,
    pub message: String,
    pub step_id: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    Error,
    Warning,
    Info,
}

// ---------------------------------------------------------------------------
// LintRule trait
// ---------------------------------------------------------------------------

pub trait LintRule {
    fn name(&self) -> &str;
    fn apply(&self, doc: &PipelineDoc) -> Vec<Diagnostic>;
}

// ---------------------------------------------------------------------------
// Rules
// ---------------------------------------------------------------------------

struct DuplicateStepIdRule;
impl LintRule for DuplicateStepIdRule {
    fn name(&self) -> &str {
        "duplicate_step_id"
    }
    fn apply(&self, doc: &PipelineDoc) -> Vec<Diagnostic> {
        let mut seen = HashSet::new();
        let mut out = Vec::new();
        for step in &doc.steps {
            if !seen.insert(step.id.as_str()) {
                out.push(Diagnostic {
                    rule: self.name().into(),
                    severity: Severity::Error,
                    message: format!("step id '{}' is declared more than once", step.id),
                    step_id: Some(step.id.clone()),
                });
            }
        }
        out
    }
}

struct DuplicateOutputRule;
impl LintRule for DuplicateOutputRule {
    fn name(&self) -> &str {
        "duplicate_output"
    }
    fn apply(&self, doc: &PipelineDoc) -> Vec<Diagnostic> {
        let mut producers: HashMap<&str, &str> = HashMap::new();
        let mut out = Vec::new();
        for step in &doc.steps {
            for var in &step.outputs {
                if let Some(prev) = producers.insert(var, &step.id) {
                    out.push(Diagnostic {
                        rule: self.name().into(),
                        severity: Severity::Warning,
                        message: format!(
                            "variable '{}' is produced by both '{}' and '{}'; the later step wins",
                            var, prev, step.id
                        ),
                        step_id: Some(step.id.clone()),
                    });
                }
            }
        }
        out
    }
}

struct UnknownLoopStepRule;
impl LintRule for UnknownLoopStepRule {
    fn name(&self) -> &str {
        "unknown_loop_step"
    }
    fn apply(&self, doc: &PipelineDoc) -> Vec<Diagnostic> {
        let mut out = Vec::new();
        for vloop in &doc.validation_loops {
            for end in [&vloop.from, &vloop.to] {
                if doc.step(end).is_none() {
                    out.push(Diagnostic {
                        rule: self.name().into(),
                        severity: Severity::Warning,
                        message: format!(
                            "validation loop {}<->{} references unknown step '{}'",
                            vloop.from, vloop.to, end
                        ),
                        step_id: None,
                    });
                }
            }
        }
        out
    }
}

struct MissingLayoutRule;
impl LintRule for MissingLayoutRule {
    fn name(&self) -> &str {
        "missing_layout"
    }
    fn apply(&self, doc: &PipelineDoc) -> Vec<Diagnostic> {
        doc.steps
            .iter()
            .filter(|s| doc.layout.position(&s.id).is_none())
            .map(|s| Diagnostic {
                rule: self.name().into(),
                severity: Severity::Info,
                message: format!(
                    "step '{}' has no layout entry and will not appear in the diagram",
                    s.id
                ),
                step_id: Some(s.id.clone()),
            })
            .collect()
    }
}

struct ScoringSumRule;
impl LintRule for ScoringSumRule {
    fn name(&self) -> &str {
        "scoring_sum"
    }
    fn apply(&self, doc: &PipelineDoc) -> Vec<Diagnostic> {
        let mut out = Vec::new();
        for step in &doc.steps {
            if let Some(scoring) = &step.scoring {
                let sum: f64 = scoring.values().sum();
                if (sum - 100.0).abs() > 1e-9 {
                    out.push(Diagnostic {
                        rule: self.name().into(),
                        severity: Severity::Warning,
                        message: format!(
                            "scoring weights on '{}' sum to {} (expected 100)",
                            step.id, sum
                        ),
                        step_id: Some(step.id.clone()),
                    });
                }
            }
        }
        out
    }
}

struct UnresolvedInputRule;
impl LintRule for UnresolvedInputRule {
    fn name(&self) -> &str {
        "unresolved_input"
    }
    fn apply(&self, doc: &PipelineDoc) -> Vec<Diagnostic> {
        let sources = derive_sources(&doc.steps, &doc.system_inputs);
        let mut out = Vec::new();
        for step in &doc.steps {
            let unresolved: Vec<&str> = step
                .inputs
                .iter()
                .filter(|v| {
                    resolve_producer(&sources, v).is_none() && !doc.is_system_input(v)
                })
                .map(String::as_str)
                .collect();
            if !unresolved.is_empty() {
                out.push(Diagnostic {
                    rule: self.name().into(),
                    severity: Severity::Info,
                    message: format!(
                        "inputs of '{}' with no producer (literals?): {}",
                        step.id,
                        unresolved.join(", ")
                    ),
                    step_id: Some(step.id.clone()),
                });
            }
        }
        out
    }
}

struct UndeclaredPhaseRule;
impl LintRule for UndeclaredPhaseRule {
    fn name(&self) -> &str {
        "undeclared_phase"
    }
    fn apply(&self, doc: &PipelineDoc) -> Vec<Diagnostic> {
        let mut reported = HashSet::new();
        let mut out = Vec::new();
        for step in &doc.steps {
            if !doc.phases.contains_key(&step.phase) && reported.insert(step.phase.as_str()) {
                out.push(Diagnostic {
                    rule: self.name().into(),
                    severity: Severity::Warning,
                    message: format!(
                        "phase key '{}' is not declared in the phase table",
                        step.phase
                    ),
                    step_id: Some(step.id.clone()),
                });
            }
        }
        out
    }
}

// ---------------------------------------------------------------------------
// Entry points
// ---------------------------------------------------------------------------

fn all_rules() -> Vec<Box<dyn LintRule>> {
    vec![
        Box::new(DuplicateStepIdRule),
        Box::new(DuplicateOutputRule),
        Box::new(UnknownLoopStepRule),
        Box::new(MissingLayoutRule),
        Box::new(ScoringSumRule),
        Box::new(UnresolvedInputRule),
        Box::new(UndeclaredPhaseRule),
    ]
}

/// Run every rule and collect advisory diagnostics.
pub fn lint(doc: &PipelineDoc) -> Vec<Diagnostic> {
    all_rules().iter().flat_map(|r| r.apply(doc)).collect()
}

/// Run the lint pass and fail on the first `Error`-severity diagnostic.
pub fn lint_or_raise(doc: &PipelineDoc) -> Result<Vec<Diagnostic>> {
    let diagnostics = lint(doc);
    if let Some(err) = diagnostics.iter().find(|d| d.severity == Severity::Error) {
        return Err(FlowscopeError::LintError {
            rule: err.rule.clone(),
            message: err.message.clone(),
        });
    }
    Ok(diagnostics)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn doc(json: &str) -> PipelineDoc {
        PipelineDoc::from_json(json).unwrap()
    }

    fn rules_hit(diags: &[Diagnostic], rule: &str) -> usize {
        diags.iter().filter(|d| d.rule == rule).count()
    }

    #[test]
    fn clean_document_lints_clean() {
        let d = doc(
            r#"{
                "title": "T", "summary": "S",
                "phases": { "p": "P" },
                "steps": [
                    { "id": "a", "num": 1, "name": "A", "meta": "m",
                      "phase": "p", "type": "tool", "outputs": ["X"] },
                    { "id": "b", "num": 2, "name": "B", "meta": "m",
                      "phase": "p", "type": "llm", "inputs": ["X"] }
                ],
                "layout": { "positions": {
                    "a": { "x": 0, "y": 0 }, "b": { "x": 0, "y": 200 }
                } }
            }"#,
        );
        assert!(lint(&d).is_empty());
        assert!(lint_or_raise(&d).is_ok());
    }

    #[test]
    fn duplicate_step_id_is_an_error() {
        let d = doc(
            r#"{
                "title": "T", "summary": "S", "phases": { "p": "P" },
                "steps": [
                    { "id": "a", "num": 1, "name": "A", "meta": "m", "phase": "p", "type": "tool" },
                    { "id": "a", "num": 2, "name": "A2", "meta": "m", "phase": "p", "type": "tool" }
                ],
                "layout": { "positions": { "a": { "x": 0, "y": 0 } } }
            }"#,
        );
        let diags = lint(&d);
        assert_eq!(rules_hit(&diags, "duplicate_step_id"), 1);
        let err = lint_or_raise(&d).unwrap_err();
        assert!(matches!(err, FlowscopeError::LintError { .. }));
    }

    #[test]
    fn duplicate_output_warns_but_does_not_raise() {
        let d = doc(
            r#"{
                "title": "T", "summary": "S", "phases": { "p": "P" },
                "steps": [
                    { "id": "a", "num": 1, "name": "A", "meta": "m",
                      "phase": "p", "type": "tool", "outputs": ["X"] },
                    { "id": "b", "num": 2, "name": "B", "meta": "m",
                      "phase": "p", "type": "tool", "outputs": ["X"] }
                ],
                "layout": { "positions": {
                    "a": { "x": 0, "y": 0 }, "b": { "x": 0, "y": 200 }
                } }
            }"#,
        );
        let diags = lint_or_raise(&d).unwrap();
        assert_eq!(rules_hit(&diags, "duplicate_output"), 1);
        assert_eq!(diags[0].severity, Severity::Warning);
    }

    #[test]
    fn dangling_loop_and_missing_layout_and_phase() {
        let d = doc(
            r#"{
                "title": "T", "summary": "S", "phases": { "p": "P" },
                "steps": [
                    { "id": "a", "num": 1, "name": "A", "meta": "m",
                      "phase": "mystery", "type": "tool",
                      "inputs": ["UNKNOWN_VAR"] }
                ],
                "validation_loops": [
                    { "from": "a", "to": "ghost", "label": "l" }
                ],
                "layout": { "positions": {} }
            }"#,
        );
        let diags = lint(&d);
        assert_eq!(rules_hit(&diags, "unknown_loop_step"), 1);
        assert_eq!(rules_hit(&diags, "missing_layout"), 1);
        assert_eq!(rules_hit(&diags, "undeclared_phase"), 1);
        assert_eq!(rules_hit(&diags, "unresolved_input"), 1);
        // All advisory: nothing raises.
        assert!(lint_or_raise(&d).is_ok());
    }

    #[test]
    fn scoring_sum_must_be_100() {
        let d = doc(
            r#"{
                "title": "T", "summary": "S", "phases": { "p": "P" },
                "steps": [
                    { "id": "a", "num": 1, "name": "A", "meta": "m",
                      "phase": "p", "type": "logic",
                      "scoring": { "x": 50, "y": 45 } }
                ],
                "layout": { "positions": { "a": { "x": 0, "y": 0 } } }
            }"#,
        );
        let diags = lint(&d);
        assert_eq!(rules_hit(&diags, "scoring_sum"), 1);
        assert!(diags
            .iter()
            .any(|d| d.message.contains("sum to 95")));
    }
}
