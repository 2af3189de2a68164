use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// Capability tags a step may carry. The first tag in a step's `type` list is
/// its primary type, used for badge coloring and default detail labels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StepType {
    Tool,
    Validate,
    Logic,
    Db,
    Llm,
    Template,
}

impl StepType {
    pub fn as_str(&self) -> &'static str {
        match self {
            StepType::Tool => "tool",
            StepType::Validate => "validate",
            StepType::Logic => "logic",
            StepType::Db => "db",
            StepType::Llm => "llm",
            StepType::Template => "template",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunKind {
    Always,
    Stop,
    Skip,
    Branch,
}

impl RunKind {
    /// Display label for the conditional-run summary.
    pub fn label(&self) -> &'static str {
        match self {
            RunKind::Always => "Always runs",
            RunKind::Stop => "Hard stop",
            RunKind::Skip => "Conditional skip",
            RunKind::Branch => "Branches",
        }
    }
}

/// When and whether a step runs. The optional `rule` is human-readable text
/// and may contain `<b>` emphasis markup (see [`crate::markup`]).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConditionalRun {
    pub kind: RunKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rule: Option<String>,
}

/// Severity of an edge-case record. An unrecognized or absent severity
/// resolves to [`EdgeSeverity::Degrade`] rather than failing the load.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EdgeSeverity {
    Fatal,
    Degrade,
    Retry,
    Skip,
}

impl EdgeSeverity {
    pub fn as_str(&self) -> &'static str {
        match self {
            EdgeSeverity::Fatal => "fatal",
            EdgeSeverity::Degrade => "degrade",
            EdgeSeverity::Retry => "retry",
            EdgeSeverity::Skip => "skip",
        }
    }

    fn parse(raw: &str) -> Option<Self> {
        match raw {
            "fatal" => Some(EdgeSeverity::Fatal),
            "degrade" => Some(EdgeSeverity::Degrade),
            "retry" => Some(EdgeSeverity::Retry),
            "skip" => Some(EdgeSeverity::Skip),
            _ => None,
        }
    }
}

/// A failure/fallback behavior attached to a step.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EdgeCase {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub severity: Option<String>,
    pub label: String,
    pub action: String,
}

impl EdgeCase {
    /// Resolved severity with the `degrade` fallback applied.
    pub fn resolved_severity(&self) -> EdgeSeverity {
        self.severity
            .as_deref()
            .and_then(EdgeSeverity::parse)
            .unwrap_or(EdgeSeverity::Degrade)
    }
}

/// One pipeline step. List order is semantically meaningful: it determines
/// phase grouping boundaries, parallel-group partitioning, and the producer
/// ordering used when grouping another step's inputs.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Step {
    pub id: String,
    pub num: u32,
    pub name: String,
    pub meta: String,
    pub phase: String,
    #[serde(rename = "type", with = "crate::type_list")]
    pub types: Vec<StepType>,
    #[serde(default)]
    pub parallel: bool,
    #[serde(default)]
    pub inputs: Vec<String>,
    #[serde(default)]
    pub outputs: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output_schema: Option<IndexMap<String, String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub conditional_run: Option<ConditionalRun>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tools: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prompt: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scoring: Option<IndexMap<String, f64>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub checks: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub quality_rules: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub edge_cases: Option<Vec<EdgeCase>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub module: Option<String>,
    #[serde(rename = "fn", default, skip_serializing_if = "Option::is_none")]
    pub fn_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeout: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub service: Option<String>,
}

impl Step {
    /// First declared type tag. The `type_list` deserializer guarantees the
    /// list is non-empty.
    pub fn primary_type(&self) -> StepType {
        self.types[0]
    }

    pub fn has_type(&self, t: StepType) -> bool {
        self.types.contains(&t)
    }

    /// A hybrid step carries more than one type tag (e.g. a validation step
    /// that is also a language-model step).
    pub fn is_hybrid(&self) -> bool {
        self.types.len() > 1
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn minimal_step(json: &str) -> Step {
        serde_json::from_str(json).unwrap()
    }

    #[test]
    fn deserialize_single_type_tag() {
        let s = minimal_step(
            r#"{ "id": "s1", "num": 1, "name": "N", "meta": "M",
                 "phase": "p", "type": "llm" }"#,
        );
        assert_eq!(s.types, vec![StepType::Llm]);
        assert_eq!(s.primary_type(), StepType::Llm);
        assert!(!s.is_hybrid());
    }

    #[test]
    fn deserialize_hybrid_type_list_preserves_order() {
        let s = minimal_step(
            r#"{ "id": "s1", "num": 1, "name": "N", "meta": "M",
                 "phase": "p", "type": ["validate", "llm"] }"#,
        );
        assert_eq!(s.types, vec![StepType::Validate, StepType::Llm]);
        assert_eq!(s.primary_type(), StepType::Validate);
        assert!(s.has_type(StepType::Llm));
        assert!(s.is_hybrid());
    }

    #[test]
    fn empty_type_list_is_rejected() {
        let result = serde_json::from_str::<Step>(
            r#"{ "id": "s1", "num": 1, "name": "N", "meta": "M",
                 "phase": "p", "type": [] }"#,
        );
        assert!(result.is_err());
    }

    #[test]
    fn optional_fields_default_to_absent() {
        let s = minimal_step(
            r#"{ "id": "s1", "num": 1, "name": "N", "meta": "M",
                 "phase": "p", "type": "tool" }"#,
        );
        assert!(!s.parallel);
        assert!(s.inputs.is_empty());
        assert!(s.outputs.is_empty());
        assert!(s.tools.is_empty());
        assert!(s.conditional_run.is_none());
        assert!(s.scoring.is_none());
    }

    #[test]
    fn conditional_run_kind_labels() {
        assert_eq!(RunKind::Always.label(), "Always runs");
        assert_eq!(RunKind::Stop.label(), "Hard stop");
        assert_eq!(RunKind::Skip.label(), "Conditional skip");
        assert_eq!(RunKind::Branch.label(), "Branches");
    }

    #[test]
    fn edge_case_severity_known_values() {
        for (raw, expect) in [
            ("fatal", EdgeSeverity::Fatal),
            ("degrade", EdgeSeverity::Degrade),
            ("retry", EdgeSeverity::Retry),
            ("skip", EdgeSeverity::Skip),
        ] {
            let ec = EdgeCase {
                severity: Some(raw.into()),
                label: "l".into(),
                action: "a".into(),
            };
            assert_eq!(ec.resolved_severity(), expect);
        }
    }

    #[test]
    fn edge_case_severity_falls_back_to_degrade() {
        let absent = EdgeCase {
            severity: None,
            label: "l".into(),
            action: "a".into(),
        };
        assert_eq!(absent.resolved_severity(), EdgeSeverity::Degrade);

        let malformed = EdgeCase {
            severity: Some("catastrophic".into()),
            label: "l".into(),
            action: "a".into(),
        };
        assert_eq!(malformed.resolved_severity(), EdgeSeverity::Degrade);
    }

    #[test]
    fn scoring_preserves_declaration_order() {
        let s = minimal_step(
            r#"{ "id": "s1", "num": 1, "name": "N", "meta": "M",
                 "phase": "p", "type": "logic",
                 "scoring": { "relevance": 40, "recency": 35, "fit": 25 } }"#,
        );
        let keys: Vec<_> = s.scoring.unwrap().keys().cloned().collect();
        assert_eq!(keys, vec!["relevance", "recency", "fit"]);
    }

    #[test]
    fn fn_field_round_trips_under_reserved_name() {
        let s = minimal_step(
            r#"{ "id": "s1", "num": 1, "name": "N", "meta": "M",
                 "phase": "p", "type": "db", "fn": "persist_run" }"#,
        );
        assert_eq!(s.fn_name.as_deref(), Some("persist_run"));
        let json = serde_json::to_value(&s).unwrap();
        assert_eq!(json["fn"], "persist_run");
    }

    #[test]
    fn single_type_serializes_back_to_bare_string() {
        let s = minimal_step(
            r#"{ "id": "s1", "num": 1, "name": "N", "meta": "M",
                 "phase": "p", "type": "template" }"#,
        );
        let json = serde_json::to_value(&s).unwrap();
        assert_eq!(json["type"], "template");
    }

    #[test]
    fn hybrid_types_serialize_as_list() {
        let s = minimal_step(
            r#"{ "id": "s1", "num": 1, "name": "N", "meta": "M",
                 "phase": "p", "type": ["validate", "llm"] }"#,
        );
        let json = serde_json::to_value(&s).unwrap();
        assert_eq!(json["type"], serde_json::json!(["validate", "llm"]));
    }
}
