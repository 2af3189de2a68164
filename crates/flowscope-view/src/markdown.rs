//! Markdown export: one step or the whole pipeline as a structured text
//! document, reusing the derived edge data and the detail panel's grouping.

use std::collections::HashMap;
use std::fmt::Write as _;

use indexmap::IndexMap;

use flowscope_model::{bold_to_markdown, PipelineDoc, Step};

use crate::detail::{input_groups, loops_for};
use crate::graph::DerivedGraph;

fn weight_display(v: f64) -> String {
    if v.fract() == 0.0 {
        format!("{}", v as i64)
    } else {
        format!("{v}")
    }
}

fn execution_display(step: &Step, groups: &HashMap<String, char>) -> String {
    if step.parallel {
        match groups.get(&step.id) {
            Some(letter) => format!("parallel (Group {letter})"),
            None => "parallel".to_string(),
        }
    } else {
        "sequential".to_string()
    }
}

/// Render one step's section in the fixed export order. Sections with no
/// underlying data are omitted.
pub fn export_step(
    doc: &PipelineDoc,
    graph: &DerivedGraph,
    groups: &HashMap<String, char>,
    edited_prompts: &HashMap<String, String>,
    step: &Step,
) -> String {
    let mut md = String::new();

    let _ = writeln!(md, "## Step {}: {}\n", step.num, step.name);
    let _ = writeln!(md, "> {}\n", step.meta);

    // Metadata
    let types = step
        .types
        .iter()
        .map(|t| t.as_str())
        .collect::<Vec<_>>()
        .join(" + ");
    md.push_str("### Metadata\n\n");
    let _ = writeln!(md, "- **Step ID:** {}", step.id);
    let _ = writeln!(md, "- **Type:** {}", types);
    let _ = writeln!(md, "- **Execution:** {}", execution_display(step, groups));
    if let Some(module) = &step.module {
        let _ = writeln!(md, "- **Module:** {}", module);
    }
    if let Some(fn_name) = &step.fn_name {
        let _ = writeln!(md, "- **Function:** {}", fn_name);
    }
    if let Some(timeout) = &step.timeout {
        let _ = writeln!(md, "- **Timeout:** {}", timeout);
    }
    if let Some(service) = &step.service {
        let _ = writeln!(md, "- **Service:** {}", service);
    }

    // Conditional Run
    if let Some(cr) = &step.conditional_run {
        md.push_str("\n### Conditional Run\n\n");
        match &cr.rule {
            Some(rule) => {
                let _ = writeln!(md, "**{}** — {}", cr.kind.label(), bold_to_markdown(rule));
            }
            None => {
                let _ = writeln!(md, "**{}**", cr.kind.label());
            }
        }
    }

    // Tool Calls
    if !step.tools.is_empty() {
        md.push_str("\n### Tool Calls\n\n");
        for tool in &step.tools {
            let _ = writeln!(md, "- `{}`", tool);
        }
    }

    // Data In (grouped by source)
    if !step.inputs.is_empty() {
        md.push_str("\n### Data In\n");
        for group in input_groups(doc, graph, step) {
            let _ = writeln!(md, "\n**From {}:**", group.label);
            for var in &group.variables {
                let _ = writeln!(md, "- `{}`", var);
            }
        }
    }

    // Data Out
    if !step.outputs.is_empty() {
        md.push_str("\n### Data Out\n\n");
        for name in &step.outputs {
            let schema = step.output_schema.as_ref().and_then(|m| m.get(name));
            match schema {
                Some(schema) => {
                    let _ = writeln!(md, "- `{}`: {}", name, schema);
                }
                None => {
                    let _ = writeln!(md, "- `{}`", name);
                }
            }
        }
    }

    // Feeds Into: validation loops before data edges.
    let loops = loops_for(doc, &step.id);
    let outbound = graph.outbound(&step.id);
    let targets: Vec<_> = outbound
        .iter()
        .filter_map(|e| doc.step(&e.target).map(|t| (t, &e.variables)))
        .collect();
    if !loops.is_empty() || !targets.is_empty() {
        md.push_str("\n### Feeds Into\n\n");
        for l in &loops {
            let _ = writeln!(
                md,
                "**⇄ Validation loop** with Step {}: {}",
                l.other.num, l.other.name
            );
            let _ = writeln!(md, "{}\n", bold_to_markdown(&l.label));
        }
        for (target, variables) in &targets {
            let _ = writeln!(
                md,
                "**→ Step {}: {}:** {}",
                target.num,
                target.name,
                variables.join(", ")
            );
        }
    }

    // Detail / Prompt blocks, label depending on the type tags.
    let detail_label = |hybrid: bool| {
        use flowscope_model::StepType::*;
        match (hybrid, step.primary_type()) {
            (true, Tool) => "Tool Logic",
            (true, Validate) => "Validation Logic",
            (true, Logic) => "Logic",
            (true, Db) => "DB Operations",
            (true, _) => "Detail",
            (false, Template) => "Template",
            (false, Validate) => "Validation",
            (false, Llm) => "Detail",
            (false, Db) => "DB Operations",
            (false, _) => "Logic",
        }
    };
    if step.is_hybrid() {
        if let Some(detail) = &step.detail {
            let _ = write!(md, "\n### {}\n\n```\n{}\n```\n", detail_label(true), detail);
        }
    }
    if let Some(prompt) = edited_prompts.get(&step.id).or(step.prompt.as_ref()) {
        let label = if step.has_type(flowscope_model::StepType::Llm) {
            "LLM Prompt"
        } else {
            "Prompt"
        };
        let _ = write!(md, "\n### {}\n\n```\n{}\n```\n", label, prompt);
    }
    if !step.is_hybrid() {
        if let Some(detail) = &step.detail {
            let _ = write!(md, "\n### {}\n\n```\n{}\n```\n", detail_label(false), detail);
        }
    }

    // Scoring
    if let Some(scoring) = &step.scoring {
        md.push_str("\n### Scoring Weights\n\n");
        for (k, v) in scoring {
            let _ = writeln!(md, "- **{}:** {}%", k.replace('_', " "), weight_display(*v));
        }
    }

    // Validation checks
    if let Some(checks) = &step.checks {
        md.push_str("\n### Validation Checks\n\n");
        for (i, check) in checks.iter().enumerate() {
            let _ = writeln!(md, "{}. {}", i + 1, check);
        }
    }

    // Quality rules
    if let Some(rules) = &step.quality_rules {
        if !rules.is_empty() {
            md.push_str("\n### Quality Rules\n\n");
            for rule in rules {
                let _ = writeln!(md, "- {}", rule);
            }
        }
    }

    // Edge cases
    if let Some(cases) = &step.edge_cases {
        if !cases.is_empty() {
            md.push_str("\n### Errors & Fallbacks\n\n");
            for case in cases {
                let _ = writeln!(
                    md,
                    "- **{}** — {}: {}",
                    case.resolved_severity().as_str().to_uppercase(),
                    case.label,
                    case.action
                );
            }
        }
    }

    md
}

/// Render the whole pipeline: title, summary, generation date, a
/// phase-grouped table of contents, then every step in original order with
/// phase headers inserted whenever the phase changes.
pub fn export_document(
    doc: &PipelineDoc,
    graph: &DerivedGraph,
    romans: &IndexMap<String, String>,
    groups: &HashMap<String, char>,
    edited_prompts: &HashMap<String, String>,
    date: chrono::NaiveDate,
) -> String {
    let mut md = String::new();
    let roman = |phase: &str| romans.get(phase).map(String::as_str).unwrap_or("?");

    let _ = writeln!(md, "# {}\n", doc.title);
    let _ = writeln!(md, "> {}", doc.summary);
    let _ = writeln!(md, "> Generated: {}\n", date.format("%B %-d, %Y"));

    md.push_str("## Table of Contents\n\n");
    let mut toc_phase = "";
    for step in &doc.steps {
        if step.phase != toc_phase {
            if !toc_phase.is_empty() {
                md.push('\n');
            }
            let _ = writeln!(
                md,
                "**Phase {}: {}**",
                roman(&step.phase),
                doc.phase_label(&step.phase)
            );
            toc_phase = &step.phase;
        }
        let _ = writeln!(md, "- Step {}: {} ({})", step.num, step.name, step.id);
    }
    md.push('\n');

    let mut last_phase = "";
    for (i, step) in doc.steps.iter().enumerate() {
        if step.phase != last_phase {
            if !last_phase.is_empty() {
                md.push_str("\n---\n\n");
            }
            let _ = writeln!(
                md,
                "# Phase {}: {}\n",
                roman(&step.phase),
                doc.phase_label(&step.phase)
            );
            last_phase = &step.phase;
        } else if i > 0 {
            md.push_str("\n---\n\n");
        }
        md.push_str(&export_step(doc, graph, groups, edited_prompts, step));
    }

    md
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::phases::{parallel_groups, phase_romans};

    fn doc() -> PipelineDoc {
        PipelineDoc::from_json(
            r#"{
                "title": "Brief Pipeline — Full Workflow",
                "summary": "4-step demo: gather, shape, check, publish",
                "phases": { "collect": "Collect", "produce": "Produce" },
                "steps": [
                    { "id": "a", "num": 1, "name": "Gather", "meta": "pull raw rows",
                      "phase": "collect", "type": "tool", "parallel": true,
                      "outputs": ["RAW"], "tools": ["fetch_rows"],
                      "module": "collect.py", "fn": "gather", "timeout": "20s" },
                    { "id": "a2", "num": 2, "name": "Gather Alt", "meta": "pull alt rows",
                      "phase": "collect", "type": "tool", "parallel": true,
                      "outputs": ["RAW_ALT"] },
                    { "id": "b", "num": 3, "name": "Shape", "meta": "merge and rank",
                      "phase": "produce", "type": "logic",
                      "inputs": ["RAW", "RAW_ALT", "NOW"], "outputs": ["REPORT"],
                      "output_schema": { "REPORT": "markdown string" },
                      "scoring": { "field_match": 60, "recency_score": 40 },
                      "conditional_run": { "kind": "stop", "rule": "abort when <b>RAW</b> empty" } },
                    { "id": "c", "num": 4, "name": "Check", "meta": "validate the report",
                      "phase": "produce", "type": ["validate", "llm"],
                      "inputs": ["REPORT"],
                      "prompt": "original prompt",
                      "detail": "length and link checks",
                      "edge_cases": [
                          { "severity": "retry", "label": "timeout", "action": "retry once" },
                          { "label": "odd result", "action": "keep going" }
                      ] }
                ],
                "system_inputs": ["NOW"],
                "validation_loops": [
                    { "from": "c", "to": "b", "label": "rebuild <b>REPORT</b> once" }
                ],
                "layout": { "positions": {} }
            }"#,
        )
        .unwrap()
    }

    fn export_all(doc: &PipelineDoc) -> String {
        let graph = DerivedGraph::derive(doc);
        let romans = phase_romans(&doc.steps);
        let groups = parallel_groups(&doc.steps);
        export_document(
            doc,
            &graph,
            &romans,
            &groups,
            &HashMap::new(),
            chrono::NaiveDate::from_ymd_opt(2026, 3, 9).unwrap(),
        )
    }

    #[test]
    fn document_header_and_date() {
        let md = export_all(&doc());
        assert!(md.starts_with("# Brief Pipeline — Full Workflow\n"));
        assert!(md.contains("> 4-step demo: gather, shape, check, publish\n"));
        assert!(md.contains("> Generated: March 9, 2026\n"));
    }

    #[test]
    fn toc_lists_every_step_exactly_once_in_order() {
        let d = doc();
        let md = export_all(&d);
        let toc: Vec<&str> = md
            .lines()
            .filter(|l| l.starts_with("- Step "))
            .collect();
        assert_eq!(toc.len(), d.steps.len());
        assert_eq!(toc[0], "- Step 1: Gather (a)");
        assert_eq!(toc[3], "- Step 4: Check (c)");
        assert!(md.contains("**Phase I: Collect**"));
        assert!(md.contains("**Phase II: Produce**"));
    }

    #[test]
    fn phase_headers_separate_sections() {
        let md = export_all(&doc());
        assert!(md.contains("# Phase I: Collect\n"));
        assert!(md.contains("# Phase II: Produce\n"));
        // Each step headline appears exactly once.
        for headline in [
            "## Step 1: Gather",
            "## Step 2: Gather Alt",
            "## Step 3: Shape",
            "## Step 4: Check",
        ] {
            assert_eq!(md.matches(headline).count(), 1);
        }
    }

    #[test]
    fn metadata_carries_execution_and_implementation() {
        let md = export_all(&doc());
        assert!(md.contains("- **Execution:** parallel (Group A)"));
        assert!(md.contains("- **Execution:** sequential"));
        assert!(md.contains("- **Module:** collect.py"));
        assert!(md.contains("- **Function:** gather"));
        assert!(md.contains("- **Timeout:** 20s"));
        assert!(md.contains("- **Type:** validate + llm"));
    }

    #[test]
    fn bold_markup_converts_never_passes_raw() {
        let md = export_all(&doc());
        assert!(md.contains("**Hard stop** — abort when **RAW** empty"));
        assert!(md.contains("rebuild **REPORT** once"));
        assert!(!md.contains("<b>"));
        assert!(!md.contains("</b>"));
    }

    #[test]
    fn data_in_groups_by_source_with_system_first() {
        let md = export_all(&doc());
        let shape_section = md.split("## Step 3: Shape").nth(1).unwrap();
        let sys = shape_section.find("**From System (entry point):**").unwrap();
        let from_a = shape_section.find("**From Step 1: Gather:**").unwrap();
        let from_a2 = shape_section.find("**From Step 2: Gather Alt:**").unwrap();
        assert!(sys < from_a && from_a < from_a2);
        assert!(shape_section.contains("- `NOW`"));
    }

    #[test]
    fn feeds_into_puts_loop_before_edges() {
        let md = export_all(&doc());
        let shape_section = md.split("## Step 3: Shape").nth(1).unwrap();
        let loop_pos = shape_section
            .find("**⇄ Validation loop** with Step 4: Check")
            .unwrap();
        let edge_pos = shape_section.find("**→ Step 4: Check:** REPORT").unwrap();
        assert!(loop_pos < edge_pos);
    }

    #[test]
    fn data_out_schema_annotation() {
        let md = export_all(&doc());
        assert!(md.contains("- `REPORT`: markdown string"));
    }

    #[test]
    fn hybrid_blocks_and_scoring_render() {
        let md = export_all(&doc());
        assert!(md.contains("### Validation Logic\n\n```\nlength and link checks\n```"));
        assert!(md.contains("### LLM Prompt\n\n```\noriginal prompt\n```"));
        assert!(md.contains("### Scoring Weights\n\n- **field match:** 60%\n- **recency score:** 40%"));
    }

    #[test]
    fn edge_cases_uppercase_severity_with_fallback() {
        let md = export_all(&doc());
        assert!(md.contains("- **RETRY** — timeout: retry once"));
        assert!(md.contains("- **DEGRADE** — odd result: keep going"));
    }

    #[test]
    fn edited_prompt_overlay_reaches_the_export() {
        let d = doc();
        let graph = DerivedGraph::derive(&d);
        let groups = parallel_groups(&d.steps);
        let mut edited = HashMap::new();
        edited.insert("c".to_string(), "tuned prompt".to_string());
        let md = export_step(&d, &graph, &groups, &edited, d.step("c").unwrap());
        assert!(md.contains("```\ntuned prompt\n```"));
        assert!(!md.contains("original prompt"));
    }

    #[test]
    fn export_is_deterministic() {
        let d = doc();
        assert_eq!(export_all(&d), export_all(&d));
    }
}
