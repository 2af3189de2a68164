//! Canvas geometry over the document's layout table: bounds, overlay
//! resolution, shared node dimensions.

use serde::Serialize;

use flowscope_model::{LayoutTable, OverlayDef, OverlayKind};

/// Fixed node box width shared by every node.
pub const NODE_W: f64 = 160.0;
/// Fixed node box height, used only by rendering math.
pub const NODE_H: f64 = 85.0;

const BOUNDS_MARGIN_X: f64 = 60.0;
const BOUNDS_MARGIN_Y: f64 = 120.0;
const CANVAS_PAD: f64 = 80.0;

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Rect {
    pub x: f64,
    pub y: f64,
    pub w: f64,
    pub h: f64,
}

/// Content extent of the laid-out scene plus the fixed canvas padding.
/// Recomputed whenever the layout table changes.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct CanvasBounds {
    pub max_x: f64,
    pub max_y: f64,
    pub width: f64,
    pub height: f64,
}

pub fn canvas_bounds(layout: &LayoutTable) -> CanvasBounds {
    let mut max_x: f64 = 0.0;
    let mut max_y: f64 = 0.0;
    for pos in layout.positions.values() {
        max_x = max_x.max(pos.x + NODE_W + BOUNDS_MARGIN_X);
        max_y = max_y.max(pos.y + BOUNDS_MARGIN_Y);
    }
    CanvasBounds {
        max_x,
        max_y,
        width: max_x + CANVAS_PAD,
        height: max_y + CANVAS_PAD,
    }
}

/// A resolved overlay rectangle ready to draw.
#[derive(Debug, Clone, Serialize)]
pub struct OverlayBox {
    pub kind: OverlayKind,
    pub label: String,
    pub rect: Rect,
}

/// Resolve one overlay definition against node positions. `left`/`top`
/// offsets measure from the anchor node's top-left, `right` from its right
/// edge, `bottom` from its top edge downward. Any anchor naming an unplaced
/// step skips the overlay entirely.
pub fn resolve_overlay(layout: &LayoutTable, def: &OverlayDef) -> Option<OverlayBox> {
    let left = layout.position(&def.left.step)?.x + def.left.offset;
    let top = layout.position(&def.top.step)?.y + def.top.offset;
    let right = layout.position(&def.right.step)?.x + NODE_W + def.right.offset;
    let bottom = layout.position(&def.bottom.step)?.y + def.bottom.offset;
    Some(OverlayBox {
        kind: def.kind,
        label: def.label.clone(),
        rect: Rect {
            x: left,
            y: top,
            w: right - left,
            h: bottom - top,
        },
    })
}
