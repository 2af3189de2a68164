//! The interaction router: one explicit context struct holding the loaded
//! document, the derived tables, and the single mutable UI-state object.
//!
//! Handlers are synchronous and non-blocking; every render reads a fully
//! consistent snapshot because nothing else mutates the state. Rendering the
//! same state twice produces the same scene.

use std::collections::HashMap;

use indexmap::IndexMap;

use flowscope_model::PipelineDoc;

use crate::detail::{detail_sections, DetailSection};
use crate::graph::{DerivedGraph, EdgeKey, LoopKey};
use crate::layout::canvas_bounds;
use crate::phases::{parallel_groups, phase_romans};
use crate::scene::{self, Emphasis, Scene, Tooltip};

/// Delta applied by the discrete +/- zoom controls.
pub const ZOOM_STEP: f64 = 0.1;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ViewMode {
    Diagram,
    List,
}

/// Phase-focus filter: `All` shows everything, `Only` dims non-matching
/// phases.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PhaseFilter {
    All,
    Only(String),
}

impl PhaseFilter {
    pub fn matches(&self, phase: &str) -> bool {
        match self {
            PhaseFilter::All => true,
            PhaseFilter::Only(p) => p == phase,
        }
    }
}

/// A hover-locked edge: either a derived data edge or a declared validation
/// loop. The two variants never compare equal, so loop highlights can never
/// be mistaken for data-edge highlights on the same step pair.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HighlightKey {
    Data(EdgeKey),
    Loop(LoopKey),
}

/// The single source of mutable truth for the session.
#[derive(Debug, Clone)]
pub struct UiState {
    pub view: ViewMode,
    pub selected: Option<String>,
    pub highlighted: Option<HighlightKey>,
    pub focus_phase: PhaseFilter,
    pub zoom: f64,
    /// Session-scoped prompt edits, keyed by step id. Never persisted and
    /// never written back into the step records.
    pub edited_prompts: HashMap<String, String>,
}

impl Default for UiState {
    fn default() -> Self {
        Self {
            view: ViewMode::Diagram,
            selected: None,
            highlighted: None,
            focus_phase: PhaseFilter::All,
            zoom: 1.0,
            edited_prompts: HashMap::new(),
        }
    }
}

/// Stroke and width for one edge, as rendered. Returned by the hover
/// handlers so an incremental frontend can restyle a single path without a
/// full re-render.
#[derive(Debug, Clone, PartialEq)]
pub struct EdgeStyle {
    pub stroke: &'static str,
    pub width: f64,
}

/// Explorer context: document + derived tables + UI state, passed by
/// reference to every render and handler. Derived tables are built once and
/// never change; only [`UiState`] mutates.
#[derive(Debug, Clone)]
pub struct Explorer {
    doc: PipelineDoc,
    graph: DerivedGraph,
    romans: IndexMap<String, String>,
    groups: HashMap<String, char>,
    pub ui: UiState,
}

impl Explorer {
    pub fn new(doc: PipelineDoc) -> Self {
        let graph = DerivedGraph::derive(&doc);
        let romans = phase_romans(&doc.steps);
        let groups = parallel_groups(&doc.steps);
        Self {
            doc,
            graph,
            romans,
            groups,
            ui: UiState::default(),
        }
    }

    pub fn doc(&self) -> &PipelineDoc {
        &self.doc
    }

    pub fn graph(&self) -> &DerivedGraph {
        &self.graph
    }

    pub fn romans(&self) -> &IndexMap<String, String> {
        &self.romans
    }

    pub fn parallel_group(&self, step_id: &str) -> Option<char> {
        self.groups.get(step_id).copied()
    }

    // --- Rendering (pure reads) ---

    pub fn scene(&self) -> Scene {
        scene::render(&self.doc, &self.graph, &self.romans, &self.ui)
    }

    /// Detail sections for the currently selected step, if any.
    pub fn detail(&self) -> Option<Vec<DetailSection>> {
        let id = self.ui.selected.as_deref()?;
        detail_sections(&self.doc, &self.graph, &self.ui.edited_prompts, id)
    }

    pub fn tooltip(&self, key: &HighlightKey) -> Option<Tooltip> {
        scene::edge_tooltip(&self.doc, &self.graph, key)
    }

    // --- Selection ---

    /// Select a node, opening its detail panel on the next render. Selecting
    /// an id with no backing step clears the selection instead.
    pub fn select_node(&mut self, id: &str) {
        self.ui.selected = if self.doc.step(id).is_some() {
            Some(id.to_string())
        } else {
            None
        };
    }

    /// Clicking a data edge routes to selecting its target step. Loop edges
    /// do not navigate on click.
    pub fn select_edge(&mut self, key: &EdgeKey) {
        if let Some(edge) = self.graph.edge(key) {
            let target = edge.target.clone();
            self.select_node(&target);
        }
    }

    /// Navigate to a step from either view; both route to the same
    /// selection handler.
    pub fn navigate_to(&mut self, id: &str) {
        self.select_node(id);
    }

    pub fn close_detail(&mut self) {
        self.ui.selected = None;
    }

    // --- Hover highlighting ---

    /// Emphasis tier for an edge, ignoring any hover lock: `Active` when the
    /// edge touches the current selection, else `Dim`.
    fn resting_emphasis(&self, key: &HighlightKey) -> Emphasis {
        let selected = self.ui.selected.as_deref();
        let touches = match key {
            HighlightKey::Data(k) => {
                selected == Some(k.source.as_str()) || selected == Some(k.target.as_str())
            }
            HighlightKey::Loop(k) => selected.map(|s| k.touches(s)).unwrap_or(false),
        };
        if touches {
            Emphasis::Active
        } else {
            Emphasis::Dim
        }
    }

    fn style_for(key: &HighlightKey, emphasis: Emphasis) -> EdgeStyle {
        let stroke = match key {
            HighlightKey::Data(_) => emphasis.data_stroke(),
            HighlightKey::Loop(_) => emphasis.loop_stroke(),
        };
        EdgeStyle {
            stroke,
            width: emphasis.width(),
        }
    }

    /// Lock an edge as highlighted and return its highlighted style.
    pub fn hover_edge(&mut self, key: HighlightKey) -> EdgeStyle {
        let style = Self::style_for(&key, Emphasis::Highlighted);
        self.ui.highlighted = Some(key);
        style
    }

    /// Clear the hover lock. The restored style is recomputed from the
    /// current selection rather than reverted to a cached default, so an
    /// edge touching the selected step drops back to `Active`, not `Dim`.
    pub fn unhover_edge(&mut self) -> Option<(HighlightKey, EdgeStyle)> {
        let key = self.ui.highlighted.take()?;
        let style = Self::style_for(&key, self.resting_emphasis(&key));
        Some((key, style))
    }

    // --- Phase focus / view mode ---

    pub fn set_focus_phase(&mut self, filter: PhaseFilter) {
        self.ui.focus_phase = filter;
    }

    pub fn set_view(&mut self, view: ViewMode) {
        self.ui.view = view;
    }

    // --- Zoom ---

    pub fn zoom_by(&mut self, delta: f64) -> f64 {
        self.ui.zoom = scene::step_zoom(self.ui.zoom, delta);
        self.ui.zoom
    }

    pub fn zoom_in(&mut self) -> f64 {
        self.zoom_by(ZOOM_STEP)
    }

    pub fn zoom_out(&mut self) -> f64 {
        self.zoom_by(-ZOOM_STEP)
    }

    /// Fit the full canvas into the given viewport.
    pub fn zoom_fit(&mut self, view_w: f64, view_h: f64) -> f64 {
        let bounds = canvas_bounds(&self.doc.layout);
        self.ui.zoom = scene::fit_zoom(&bounds, view_w, view_h);
        self.ui.zoom
    }

    // --- Prompt overlay ---

    /// Record a session-local prompt edit for a step. The step record itself
    /// is never mutated.
    pub fn edit_prompt(&mut self, step_id: &str, text: impl Into<String>) {
        if self.doc.step(step_id).is_some() {
            self.ui.edited_prompts.insert(step_id.to_string(), text.into());
        }
    }

    pub fn clear_prompt_edit(&mut self, step_id: &str) {
        self.ui.edited_prompts.remove(step_id);
    }

    /// The prompt text as it should display/export right now.
    pub fn effective_prompt(&self, step_id: &str) -> Option<&str> {
        if let Some(edited) = self.ui.edited_prompts.get(step_id) {
            return Some(edited.as_str());
        }
        self.doc.step(step_id)?.prompt.as_deref()
    }

    // --- Export ---

    /// Export the whole pipeline as a markdown document.
    pub fn export_markdown(&self, date: chrono::NaiveDate) -> String {
        crate::markdown::export_document(
            &self.doc,
            &self.graph,
            &self.romans,
            &self.groups,
            &self.ui.edited_prompts,
            date,
        )
    }

    /// Export a single step, or `None` if the id is unknown.
    pub fn export_step_markdown(&self, step_id: &str) -> Option<String> {
        let step = self.doc.step(step_id)?;
        Some(crate::markdown::export_step(
            &self.doc,
            &self.graph,
            &self.groups,
            &self.ui.edited_prompts,
            step,
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scene::{DATA_EDGE_BRIGHT, DATA_EDGE_DIM, LOOP_EDGE_ACTIVE, LOOP_EDGE_BRIGHT};

    fn explorer() -> Explorer {
        let doc = PipelineDoc::from_json(
            r#"{
                "title": "T",
                "summary": "S",
                "phases": { "one": "One", "two": "Two" },
                "steps": [
                    { "id": "a", "num": 1, "name": "A", "meta": "m",
                      "phase": "one", "type": "tool", "outputs": ["X"] },
                    { "id": "b", "num": 2, "name": "B", "meta": "m",
                      "phase": "two", "type": "llm", "inputs": ["X"],
                      "prompt": "original prompt" }
                ],
                "validation_loops": [
                    { "from": "b", "to": "a", "label": "retry once" }
                ],
                "layout": { "positions": {
                    "a": { "x": 0, "y": 0 },
                    "b": { "x": 0, "y": 300 }
                } }
            }"#,
        )
        .unwrap();
        Explorer::new(doc)
    }

    #[test]
    fn select_node_then_close_clears_selection() {
        let mut ex = explorer();
        ex.select_node("a");
        assert_eq!(ex.ui.selected.as_deref(), Some("a"));
        assert!(ex.detail().is_some());
        ex.close_detail();
        assert!(ex.ui.selected.is_none());
        assert!(ex.detail().is_none());
    }

    #[test]
    fn selecting_unknown_step_clears_selection() {
        let mut ex = explorer();
        ex.select_node("a");
        ex.select_node("ghost");
        assert!(ex.ui.selected.is_none());
    }

    #[test]
    fn select_edge_routes_to_target_step() {
        let mut ex = explorer();
        ex.select_edge(&EdgeKey::new("a", "b"));
        assert_eq!(ex.ui.selected.as_deref(), Some("b"));
    }

    #[test]
    fn select_missing_edge_is_a_no_op() {
        let mut ex = explorer();
        ex.select_node("a");
        ex.select_edge(&EdgeKey::new("b", "a"));
        assert_eq!(ex.ui.selected.as_deref(), Some("a"));
    }

    #[test]
    fn hover_locks_highlight_and_returns_bright_style() {
        let mut ex = explorer();
        let style = ex.hover_edge(HighlightKey::Data(EdgeKey::new("a", "b")));
        assert_eq!(style.stroke, DATA_EDGE_BRIGHT);
        assert_eq!(style.width, 3.0);
        assert!(ex.ui.highlighted.is_some());
    }

    #[test]
    fn unhover_restores_active_tier_when_edge_touches_selection() {
        let mut ex = explorer();
        ex.select_node("b");
        ex.hover_edge(HighlightKey::Data(EdgeKey::new("a", "b")));
        let (key, style) = ex.unhover_edge().unwrap();
        assert_eq!(key, HighlightKey::Data(EdgeKey::new("a", "b")));
        assert_eq!(style.stroke, DATA_EDGE_BRIGHT);
        assert_eq!(style.width, 2.5);
        assert!(ex.ui.highlighted.is_none());
    }

    #[test]
    fn unhover_restores_dim_tier_without_selection() {
        let mut ex = explorer();
        ex.hover_edge(HighlightKey::Data(EdgeKey::new("a", "b")));
        let (_, style) = ex.unhover_edge().unwrap();
        assert_eq!(style.stroke, DATA_EDGE_DIM);
        assert_eq!(style.width, 1.5);
    }

    #[test]
    fn loop_hover_uses_the_loop_hue() {
        let mut ex = explorer();
        let style = ex.hover_edge(HighlightKey::Loop(LoopKey::new("b", "a")));
        assert_eq!(style.stroke, LOOP_EDGE_BRIGHT);

        ex.select_node("a");
        ex.hover_edge(HighlightKey::Loop(LoopKey::new("b", "a")));
        let (_, style) = ex.unhover_edge().unwrap();
        assert_eq!(style.stroke, LOOP_EDGE_ACTIVE);
    }

    #[test]
    fn data_and_loop_highlights_on_same_pair_stay_distinct() {
        let data = HighlightKey::Data(EdgeKey::new("b", "a"));
        let looped = HighlightKey::Loop(LoopKey::new("b", "a"));
        assert_ne!(data, looped);
    }

    #[test]
    fn zoom_steps_clamp_and_round() {
        let mut ex = explorer();
        ex.ui.zoom = 1.95;
        assert_eq!(ex.zoom_in(), 2.0);
        assert_eq!(ex.zoom_in(), 2.0);

        ex.ui.zoom = 0.25;
        assert_eq!(ex.zoom_out(), 0.2);
        assert_eq!(ex.zoom_out(), 0.2);
    }

    #[test]
    fn prompt_overlay_shadows_without_mutating_the_step() {
        let mut ex = explorer();
        assert_eq!(ex.effective_prompt("b"), Some("original prompt"));

        ex.edit_prompt("b", "tuned prompt");
        assert_eq!(ex.effective_prompt("b"), Some("tuned prompt"));
        assert_eq!(ex.doc().step("b").unwrap().prompt.as_deref(), Some("original prompt"));

        ex.clear_prompt_edit("b");
        assert_eq!(ex.effective_prompt("b"), Some("original prompt"));
    }

    #[test]
    fn prompt_edit_for_unknown_step_is_dropped() {
        let mut ex = explorer();
        ex.edit_prompt("ghost", "text");
        assert!(ex.ui.edited_prompts.is_empty());
    }

    #[test]
    fn phase_filter_matching() {
        assert!(PhaseFilter::All.matches("anything"));
        assert!(PhaseFilter::Only("one".into()).matches("one"));
        assert!(!PhaseFilter::Only("one".into()).matches("two"));
    }
}
