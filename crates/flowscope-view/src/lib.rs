//! Derived graph, diagram scene, detail panel, interaction state, and
//! exporters for the Flowscope pipeline explorer.
//!
//! The derived tables (source map, edge set, phase romans, parallel groups)
//! are pure functions of the document, built once by [`Explorer::new`] and
//! immutable afterwards. Rendering reads those tables plus the UI state and
//! never fails: missing layout entries, dangling loop references, and
//! unresolvable inputs all degrade to omission.

pub mod detail;
pub mod graph;
pub mod layout;
pub mod markdown;
pub mod phases;
pub mod scene;
pub mod state;
pub mod svg;
pub mod validation;

pub use detail::{detail_sections, DetailSection, EdgeCaseLine, EdgeRef, InputGroup, LoopRef, OutputLine, StepRef};
pub use graph::{derive_edges, derive_sources, resolve_producer, DataEdge, DerivedGraph, EdgeKey, LoopKey, SourceMap};
pub use layout::{canvas_bounds, resolve_overlay, CanvasBounds, OverlayBox, Rect, NODE_H, NODE_W};
pub use markdown::{export_document, export_step};
pub use phases::{parallel_groups, phase_romans};
pub use scene::{edge_tooltip, fit_zoom, render, round_zoom, step_zoom, Cubic, EdgePath, Emphasis, LoopPath, NodeBox, PhaseBox, Point, Scene, Tooltip};
pub use state::{EdgeStyle, Explorer, HighlightKey, PhaseFilter, UiState, ViewMode};
pub use svg::write_scene;
pub use validation::{lint, lint_or_raise, Diagnostic, LintRule, Severity};
