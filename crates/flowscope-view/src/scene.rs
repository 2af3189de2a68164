//! The diagram renderer: a pure function of the document, the derived graph,
//! and the UI state, producing a scene description a frontend can draw.
//!
//! Geometry follows the hand-tuned layout table. Data edges are cubic curves
//! from the source's bottom-center to a landing point spread across the
//! target's top edge; validation loops are dashed bidirectional curves bulged
//! to the right of the node column so they stay distinct from data edges even
//! on the same step pair. A step missing from the layout table is silently
//! not drawn; it may still appear in non-diagram views.

use indexmap::IndexMap;
use serde::Serialize;
use std::collections::HashMap;

use flowscope_model::{strip_bold, PipelineDoc, StepType};

use crate::graph::{DerivedGraph, EdgeKey, LoopKey};
use crate::layout::{canvas_bounds, resolve_overlay, CanvasBounds, OverlayBox, Rect, NODE_H, NODE_W};
use crate::state::{HighlightKey, UiState};

// --- Theme ---

pub const DATA_EDGE_BRIGHT: &str = "#58a6ff";
pub const DATA_EDGE_DIM: &str = "rgba(48,54,61,0.45)";
pub const LOOP_EDGE_BRIGHT: &str = "#ff69b4";
pub const LOOP_EDGE_ACTIVE: &str = "rgba(255,105,180,0.8)";
pub const LOOP_EDGE_DIM: &str = "rgba(255,105,180,0.35)";

/// Stroke width of the invisible hit region drawn over every edge.
pub const HIT_STROKE_W: f64 = 14.0;

const META_CHAR_LIMIT: usize = 50;
const PHASE_LABEL_H: f64 = 16.0;
const PHASE_MIN_W: f64 = 260.0;
const PHASE_PAD_X: f64 = 28.0;
const PHASE_PAD_Y: f64 = 20.0;
const ARROW_LEN: f64 = 8.0;
const LOOP_BULGE: f64 = 60.0;

pub const ZOOM_MIN: f64 = 0.2;
pub const ZOOM_MAX: f64 = 2.0;
pub const ZOOM_FIT_CAP: f64 = 1.5;

/// Per-edge emphasis: a hover-locked edge renders brightest, an edge touching
/// the selected node renders at medium emphasis, everything else at the dim
/// baseline. The same tiers apply to validation loops with their own hue.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Emphasis {
    Highlighted,
    Active,
    Dim,
}

impl Emphasis {
    pub fn width(self) -> f64 {
        match self {
            Emphasis::Highlighted => 3.0,
            Emphasis::Active => 2.5,
            Emphasis::Dim => 1.5,
        }
    }

    pub fn data_stroke(self) -> &'static str {
        match self {
            Emphasis::Highlighted | Emphasis::Active => DATA_EDGE_BRIGHT,
            Emphasis::Dim => DATA_EDGE_DIM,
        }
    }

    pub fn loop_stroke(self) -> &'static str {
        match self {
            Emphasis::Highlighted => LOOP_EDGE_BRIGHT,
            Emphasis::Active => LOOP_EDGE_ACTIVE,
            Emphasis::Dim => LOOP_EDGE_DIM,
        }
    }
}

// --- Scene description ---

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

fn pt(x: f64, y: f64) -> Point {
    Point { x, y }
}

/// One cubic bezier segment.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Cubic {
    pub from: Point,
    pub c1: Point,
    pub c2: Point,
    pub to: Point,
}

impl Cubic {
    /// SVG path data form.
    pub fn to_path(&self) -> String {
        format!(
            "M {} {} C {} {}, {} {}, {} {}",
            self.from.x, self.from.y, self.c1.x, self.c1.y, self.c2.x, self.c2.y, self.to.x,
            self.to.y
        )
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct PhaseBox {
    pub phase: String,
    pub label: String,
    pub rect: Rect,
    pub dimmed: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct NodeBox {
    pub id: String,
    pub num: u32,
    pub name: String,
    /// Description text, truncated to the node's character limit.
    pub meta: String,
    pub badges: Vec<StepType>,
    pub primary: StepType,
    pub x: f64,
    pub y: f64,
    pub w: f64,
    pub selected: bool,
    pub dimmed: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct EdgePath {
    pub key: EdgeKey,
    pub curve: Cubic,
    pub arrow: [Point; 3],
    pub emphasis: Emphasis,
    pub stroke: &'static str,
    pub width: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct LoopPath {
    pub key: LoopKey,
    pub curve: Cubic,
    pub arrow_to: [Point; 3],
    pub arrow_from: [Point; 3],
    pub emphasis: Emphasis,
    pub stroke: &'static str,
    pub width: f64,
}

/// The full rendered scene. Rendering the same state twice yields the same
/// scene.
#[derive(Debug, Clone, Serialize)]
pub struct Scene {
    pub bounds: CanvasBounds,
    pub zoom: f64,
    pub phases: Vec<PhaseBox>,
    pub overlays: Vec<OverlayBox>,
    pub nodes: Vec<NodeBox>,
    pub edges: Vec<EdgePath>,
    pub loops: Vec<LoopPath>,
}

// --- Zoom math ---

/// Zoom values snap to the nearest 5% increment.
pub fn round_zoom(z: f64) -> f64 {
    (z * 20.0).round() / 20.0
}

/// Largest scale, capped, at which the full canvas fits the viewport on both
/// axes.
pub fn fit_zoom(bounds: &CanvasBounds, view_w: f64, view_h: f64) -> f64 {
    let z = (view_w / (bounds.max_x + 40.0))
        .min(view_h / (bounds.max_y + 40.0))
        .min(ZOOM_FIT_CAP);
    round_zoom(z)
}

/// Adjust zoom by a delta, clamped to the fixed range.
pub fn step_zoom(current: f64, delta: f64) -> f64 {
    round_zoom((current + delta).clamp(ZOOM_MIN, ZOOM_MAX))
}

// --- Rendering ---

fn truncate_meta(meta: &str) -> String {
    if meta.chars().count() > META_CHAR_LIMIT {
        let head: String = meta.chars().take(META_CHAR_LIMIT - 3).collect();
        format!("{head}...")
    } else {
        meta.to_string()
    }
}

/// Landing x-coordinate for inbound edge `index` of `count` on a node at
/// `node_x`. Landing points spread across the node width, inset from the
/// sides by an amount that shrinks as the fan-in grows, up to a cap.
fn spread_x(node_x: f64, index: usize, count: usize) -> f64 {
    if count <= 1 {
        return node_x + NODE_W / 2.0;
    }
    let pad = NODE_W / 2.0 - ((count - 1).min(6) as f64) * 5.0;
    let usable = NODE_W - pad * 2.0;
    node_x + pad + (index as f64 / (count - 1) as f64) * usable
}

pub fn render(
    doc: &PipelineDoc,
    graph: &DerivedGraph,
    romans: &IndexMap<String, String>,
    ui: &UiState,
) -> Scene {
    let layout = &doc.layout;
    let bounds = canvas_bounds(layout);

    // Phase background boxes, painted behind nodes and overlays.
    let mut phase_nodes: IndexMap<&str, Vec<flowscope_model::Position>> = IndexMap::new();
    for step in &doc.steps {
        let Some(pos) = layout.position(&step.id) else {
            continue;
        };
        phase_nodes.entry(step.phase.as_str()).or_default().push(pos);
    }

    let mut phases = Vec::new();
    for (phase, positions) in &phase_nodes {
        let (pad_x, pad_y) = match layout.phase_pad(phase) {
            Some(pad) => (pad.x, pad.y),
            None => (PHASE_PAD_X, PHASE_PAD_Y),
        };
        let mut min_x = f64::INFINITY;
        let mut min_y = f64::INFINITY;
        let mut max_x: f64 = 0.0;
        let mut max_y: f64 = 0.0;
        for p in positions {
            min_x = min_x.min(p.x);
            min_y = min_y.min(p.y);
            max_x = max_x.max(p.x + NODE_W);
            max_y = max_y.max(p.y + NODE_H);
        }
        let content_w = max_x - min_x + pad_x * 2.0;
        let center_x = (min_x + max_x) / 2.0;
        let w = content_w.max(PHASE_MIN_W);
        let roman = romans.get(*phase).map(String::as_str).unwrap_or("");
        phases.push(PhaseBox {
            phase: (*phase).to_string(),
            label: format!("{} — {}", roman, doc.phase_label(phase)),
            rect: Rect {
                x: center_x - w / 2.0,
                y: min_y - pad_y - PHASE_LABEL_H,
                w,
                h: max_y - min_y + pad_y * 2.0 + PHASE_LABEL_H * 2.0,
            },
            dimmed: !ui.focus_phase.matches(phase),
        });
    }

    // Nodes.
    let mut nodes = Vec::new();
    for step in &doc.steps {
        let Some(pos) = layout.position(&step.id) else {
            continue;
        };
        nodes.push(NodeBox {
            id: step.id.clone(),
            num: step.num,
            name: step.name.clone(),
            meta: truncate_meta(&step.meta),
            badges: step.types.clone(),
            primary: step.primary_type(),
            x: pos.x,
            y: pos.y,
            w: NODE_W,
            selected: ui.selected.as_deref() == Some(step.id.as_str()),
            dimmed: !ui.focus_phase.matches(&step.phase),
        });
    }

    // Group overlays (manually verified data; unplaced anchors skip).
    let overlays = layout
        .overlays
        .iter()
        .filter_map(|def| resolve_overlay(layout, def))
        .collect();

    // Data edges. Fan-in counts include edges whose endpoints are unplaced;
    // landing slots are consumed by drawn edges only.
    let inbound = graph.inbound_counts();
    let mut landing_idx: HashMap<&str, usize> = HashMap::new();
    let mut edges = Vec::new();
    for (key, edge) in &graph.edges {
        let (Some(from), Some(to)) = (layout.position(&edge.source), layout.position(&edge.target))
        else {
            continue;
        };

        let emphasis = if ui.highlighted == Some(HighlightKey::Data(key.clone())) {
            Emphasis::Highlighted
        } else if ui.selected.as_deref() == Some(edge.source.as_str())
            || ui.selected.as_deref() == Some(edge.target.as_str())
        {
            Emphasis::Active
        } else {
            Emphasis::Dim
        };

        let from_cx = from.x + NODE_W / 2.0;
        let from_bottom = from.y + NODE_H;

        let count = inbound.get(edge.target.as_str()).copied().unwrap_or(0);
        let idx = landing_idx.entry(edge.target.as_str()).or_insert(0);
        let to_cx = spread_x(to.x, *idx, count);
        *idx += 1;
        let to_top = to.y;

        // Control offset scales with vertical distance, with a floor, so
        // curves stay proportional however far apart phases sit.
        let dy = to_top - from_bottom;
        let cp = (dy.abs() * 0.35).max(40.0);
        let path_end_y = to_top - ARROW_LEN;

        edges.push(EdgePath {
            key: key.clone(),
            curve: Cubic {
                from: pt(from_cx, from_bottom),
                c1: pt(from_cx, from_bottom + cp),
                c2: pt(to_cx, to_top - cp),
                to: pt(to_cx, path_end_y),
            },
            arrow: [
                pt(to_cx - 4.0, path_end_y),
                pt(to_cx + 4.0, path_end_y),
                pt(to_cx, to_top),
            ],
            emphasis,
            stroke: emphasis.data_stroke(),
            width: emphasis.width(),
        });
    }

    // Validation loops: dashed, bidirectional, offset to the right of the
    // nodes they connect.
    let mut loops = Vec::new();
    for vloop in &doc.validation_loops {
        let (Some(from), Some(to)) = (layout.position(&vloop.from), layout.position(&vloop.to))
        else {
            continue;
        };
        let key = LoopKey::new(vloop.from.clone(), vloop.to.clone());

        let emphasis = if ui.highlighted == Some(HighlightKey::Loop(key.clone())) {
            Emphasis::Highlighted
        } else if ui
            .selected
            .as_deref()
            .map(|s| key.touches(s))
            .unwrap_or(false)
        {
            Emphasis::Active
        } else {
            Emphasis::Dim
        };

        let from_x = from.x + NODE_W + 8.0;
        let from_y = from.y + 42.0;
        let to_x = to.x + NODE_W + 8.0;
        let to_y = to.y + 42.0;
        let cp_x = from_x.max(to_x) + LOOP_BULGE;

        loops.push(LoopPath {
            key,
            curve: Cubic {
                from: pt(from_x, from_y),
                c1: pt(cp_x, from_y),
                c2: pt(cp_x, to_y),
                to: pt(to_x, to_y),
            },
            arrow_to: [
                pt(to_x, to_y),
                pt(to_x + 7.0, to_y - 4.0),
                pt(to_x + 7.0, to_y + 4.0),
            ],
            arrow_from: [
                pt(from_x, from_y),
                pt(from_x + 7.0, from_y - 4.0),
                pt(from_x + 7.0, from_y + 4.0),
            ],
            emphasis,
            stroke: emphasis.loop_stroke(),
            width: emphasis.width(),
        });
    }

    Scene {
        bounds,
        zoom: ui.zoom,
        phases,
        overlays,
        nodes,
        edges,
        loops,
    }
}

// --- Edge tooltips ---

/// Hover tooltip content for a data edge or validation loop. Steps missing
/// from the document skip the tooltip rather than erroring.
#[derive(Debug, Clone, PartialEq)]
pub struct Tooltip {
    pub title: String,
    pub subtitle: String,
    pub variables: Vec<String>,
    pub rule: Option<String>,
}

pub fn edge_tooltip(
    doc: &PipelineDoc,
    graph: &DerivedGraph,
    key: &HighlightKey,
) -> Option<Tooltip> {
    match key {
        HighlightKey::Data(k) => {
            let edge = graph.edge(k)?;
            let source = doc.step(&edge.source)?;
            let target = doc.step(&edge.target)?;
            Some(Tooltip {
                title: format!("Step {} → Step {}", source.num, target.num),
                subtitle: format!("{} → {}", source.name, target.name),
                variables: edge.variables.clone(),
                rule: None,
            })
        }
        HighlightKey::Loop(k) => {
            let vloop = doc
                .validation_loops
                .iter()
                .find(|l| l.from == k.from && l.to == k.to)?;
            let from = doc.step(&vloop.from)?;
            let to = doc.step(&vloop.to)?;
            Some(Tooltip {
                title: "⇄ Validation Loop".to_string(),
                subtitle: format!("Step {} ⇄ Step {}", from.num, to.num),
                variables: Vec::new(),
                rule: Some(strip_bold(&vloop.label)),
            })
        }
    }
}
