//! The detail panel: one step's full attributes as an ordered list of typed
//! sections, shared by the floating diagram panel and the step-list view.
//!
//! Section order is fixed. Absent data means the section is omitted, with
//! one exception: a step with no inputs still gets an empty Data In section,
//! which renders as the "None (entry point)" placeholder.

use std::collections::HashMap;

use indexmap::IndexMap;

use flowscope_model::{EdgeSeverity, PipelineDoc, Step, StepType};

use crate::graph::{resolve_producer, DerivedGraph, EdgeKey, LoopKey};

#[derive(Debug, Clone, PartialEq)]
pub struct StepRef {
    pub id: String,
    pub num: u32,
    pub name: String,
}

impl StepRef {
    fn of(step: &Step) -> Self {
        Self {
            id: step.id.clone(),
            num: step.num,
            name: step.name.clone(),
        }
    }
}

/// Input chips grouped under one resolved producer. `source` is `None` for
/// the system/unresolved group; `edge_key` is present when hovering the group
/// should highlight a diagram edge.
#[derive(Debug, Clone, PartialEq)]
pub struct InputGroup {
    pub source: Option<StepRef>,
    pub label: String,
    pub edge_key: Option<EdgeKey>,
    pub variables: Vec<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct OutputLine {
    pub name: String,
    pub schema: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct LoopRef {
    pub key: LoopKey,
    pub other: StepRef,
    pub label: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct EdgeRef {
    pub key: EdgeKey,
    pub target: StepRef,
    pub variables: Vec<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct EdgeCaseLine {
    pub severity: EdgeSeverity,
    pub label: String,
    pub action: String,
}

#[derive(Debug, Clone, PartialEq)]
pub enum DetailSection {
    Header {
        num: u32,
        name: String,
        meta: String,
    },
    ConditionalRun {
        label: &'static str,
        /// Raw rule text; emphasis markup is converted at the output
        /// boundary, not here.
        rule: Option<String>,
    },
    Implementation {
        module: Option<String>,
        fn_name: Option<String>,
        timeout: Option<String>,
        service: Option<String>,
    },
    ToolCalls(Vec<String>),
    /// Empty groups render as the "None (entry point)" placeholder.
    DataIn(Vec<InputGroup>),
    DataOut(Vec<OutputLine>),
    FeedsInto {
        loops: Vec<LoopRef>,
        edges: Vec<EdgeRef>,
    },
    DetailBlock {
        label: &'static str,
        body: String,
    },
    PromptBlock {
        label: &'static str,
        body: String,
    },
    Scoring(Vec<(String, f64)>),
    Checks(Vec<String>),
    QualityRules(Vec<String>),
    EdgeCases(Vec<EdgeCaseLine>),
}

/// Display label for a resolved input source.
pub fn source_label(doc: &PipelineDoc, source: Option<&str>) -> String {
    match source {
        None => "System (entry point)".to_string(),
        Some(id) => match doc.step(id) {
            Some(s) => format!("Step {}: {}", s.num, s.name),
            None => id.to_string(),
        },
    }
}

/// Group a step's inputs by resolved producer, ordered with the system group
/// first and producers by their position in the original step order.
pub fn input_groups(doc: &PipelineDoc, graph: &DerivedGraph, step: &Step) -> Vec<InputGroup> {
    let mut grouped: IndexMap<Option<String>, Vec<String>> = IndexMap::new();
    for var in &step.inputs {
        grouped
            .entry(resolve_producer(&graph.sources, var))
            .or_default()
            .push(var.clone());
    }

    let mut entries: Vec<(Option<String>, Vec<String>)> = grouped.into_iter().collect();
    entries.sort_by_key(|(src, _)| match src {
        None => 0,
        Some(id) => doc.step_index(id).map(|i| i + 1).unwrap_or(usize::MAX),
    });

    entries
        .into_iter()
        .map(|(src, variables)| InputGroup {
            label: source_label(doc, src.as_deref()),
            edge_key: src
                .as_deref()
                .map(|s| EdgeKey::new(s.to_string(), step.id.clone())),
            source: src.as_deref().and_then(|s| doc.step(s)).map(StepRef::of),
            variables,
        })
        .collect()
}

fn hybrid_detail_label(primary: StepType) -> &'static str {
    match primary {
        StepType::Tool => "Tool Logic",
        StepType::Validate => "Validation Logic",
        StepType::Logic => "Logic",
        StepType::Db => "DB Operations",
        _ => "Detail",
    }
}

fn plain_detail_label(primary: StepType) -> &'static str {
    match primary {
        StepType::Template => "Template",
        StepType::Validate => "Validation",
        StepType::Llm => "Detail",
        StepType::Db => "DB Operations",
        _ => "Logic",
    }
}

/// Validation loops touching a step, loops whose far end is missing from the
/// document skipped.
pub fn loops_for(doc: &PipelineDoc, step_id: &str) -> Vec<LoopRef> {
    doc.validation_loops
        .iter()
        .filter(|l| l.from == step_id || l.to == step_id)
        .filter_map(|l| {
            let other_id = if l.from == step_id { &l.to } else { &l.from };
            let other = doc.step(other_id)?;
            Some(LoopRef {
                key: LoopKey::new(l.from.clone(), l.to.clone()),
                other: StepRef::of(other),
                label: l.label.clone(),
            })
        })
        .collect()
}

/// Build the full ordered section list for one step, or `None` when the id
/// has no backing step (callers close the panel).
pub fn detail_sections(
    doc: &PipelineDoc,
    graph: &DerivedGraph,
    edited_prompts: &HashMap<String, String>,
    step_id: &str,
) -> Option<Vec<DetailSection>> {
    let step = doc.step(step_id)?;
    let mut sections = Vec::new();

    sections.push(DetailSection::Header {
        num: step.num,
        name: step.name.clone(),
        meta: step.meta.clone(),
    });

    if let Some(cr) = &step.conditional_run {
        sections.push(DetailSection::ConditionalRun {
            label: cr.kind.label(),
            rule: cr.rule.clone(),
        });
    }

    if step.module.is_some() || step.fn_name.is_some() || step.timeout.is_some() || step.service.is_some()
    {
        sections.push(DetailSection::Implementation {
            module: step.module.clone(),
            fn_name: step.fn_name.clone(),
            timeout: step.timeout.clone(),
            service: step.service.clone(),
        });
    }

    if !step.tools.is_empty() {
        sections.push(DetailSection::ToolCalls(step.tools.clone()));
    }

    sections.push(DetailSection::DataIn(input_groups(doc, graph, step)));

    if !step.outputs.is_empty() {
        sections.push(DetailSection::DataOut(
            step.outputs
                .iter()
                .map(|name| OutputLine {
                    name: name.clone(),
                    schema: step
                        .output_schema
                        .as_ref()
                        .and_then(|m| m.get(name))
                        .cloned(),
                })
                .collect(),
        ));
    }

    let loops = loops_for(doc, &step.id);
    let edges: Vec<EdgeRef> = graph
        .outbound(&step.id)
        .into_iter()
        .filter_map(|e| {
            let target = doc.step(&e.target)?;
            Some(EdgeRef {
                key: EdgeKey::new(e.source.clone(), e.target.clone()),
                target: StepRef::of(target),
                variables: e.variables.clone(),
            })
        })
        .collect();
    if !loops.is_empty() || !edges.is_empty() {
        sections.push(DetailSection::FeedsInto { loops, edges });
    }

    let primary = step.primary_type();
    let effective_prompt = edited_prompts
        .get(&step.id)
        .cloned()
        .or_else(|| step.prompt.clone());

    if step.is_hybrid() {
        if let Some(detail) = &step.detail {
            sections.push(DetailSection::DetailBlock {
                label: hybrid_detail_label(primary),
                body: detail.clone(),
            });
        }
    }
    if let Some(prompt) = &effective_prompt {
        let label = if step.has_type(StepType::Llm) {
            "LLM Prompt"
        } else {
            "Prompt"
        };
        sections.push(DetailSection::PromptBlock {
            label,
            body: prompt.clone(),
        });
    }
    if !step.is_hybrid() {
        if let Some(detail) = &step.detail {
            sections.push(DetailSection::DetailBlock {
                label: plain_detail_label(primary),
                body: detail.clone(),
            });
        }
    }

    if let Some(scoring) = &step.scoring {
        sections.push(DetailSection::Scoring(
            scoring.iter().map(|(k, v)| (k.clone(), *v)).collect(),
        ));
    }
    if let Some(checks) = &step.checks {
        if !checks.is_empty() {
            sections.push(DetailSection::Checks(checks.clone()));
        }
    }
    if let Some(rules) = &step.quality_rules {
        if !rules.is_empty() {
            sections.push(DetailSection::QualityRules(rules.clone()));
        }
    }
    if let Some(cases) = &step.edge_cases {
        if !cases.is_empty() {
            sections.push(DetailSection::EdgeCases(
                cases
                    .iter()
                    .map(|c| EdgeCaseLine {
                        severity: c.resolved_severity(),
                        label: c.label.clone(),
                        action: c.action.clone(),
                    })
                    .collect(),
            ));
        }
    }

    Some(sections)
}
