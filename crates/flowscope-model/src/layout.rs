//! The diagram layout table: hand-tuned node coordinates and named group
//! overlays.
//!
//! Coordinates are configuration, not computation: the overlays encode
//! manually-verified visual groupings and must be re-specified whenever the
//! pipeline's step roster changes. Overlay edges are anchored to specific
//! steps: `left`/`top` offsets measure from the anchor node's top-left
//! corner, `right` from its right edge (x + node width), `bottom` from its
//! top edge downward.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// Top-left canvas position of a node.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Position {
    pub x: f64,
    pub y: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OverlayKind {
    Parallel,
    Sequential,
}

/// One overlay edge: a step id plus a pixel offset.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Anchor {
    pub step: String,
    pub offset: f64,
}

impl Anchor {
    pub fn new(step: impl Into<String>, offset: f64) -> Self {
        Self {
            step: step.into(),
            offset,
        }
    }
}

/// A named rectangular overlay region (parallel-execution box or sequential
/// sub-chain box).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OverlayDef {
    pub kind: OverlayKind,
    pub label: String,
    pub left: Anchor,
    pub top: Anchor,
    pub right: Anchor,
    pub bottom: Anchor,
}

/// Extra background padding for a designated "dense" phase.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PhasePad {
    pub x: f64,
    pub y: f64,
}

/// The full layout table supplied by the document.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LayoutTable {
    pub positions: IndexMap<String, Position>,
    #[serde(default)]
    pub overlays: Vec<OverlayDef>,
    /// Phase keys whose background box needs more breathing room than the
    /// default padding.
    #[serde(default)]
    pub phase_pads: IndexMap<String, PhasePad>,
}

impl LayoutTable {
    pub fn position(&self, step_id: &str) -> Option<Position> {
        self.positions.get(step_id).copied()
    }

    pub fn phase_pad(&self, phase: &str) -> Option<PhasePad> {
        self.phase_pads.get(phase).copied()
    }
}
