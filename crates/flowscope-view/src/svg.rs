//! Scene-to-SVG serialization: a standalone snapshot of the rendered
//! diagram. This is the serialization boundary, so edge keys appear here in
//! their string form as element ids.

use std::fmt::Write as _;

use flowscope_model::{OverlayKind, StepType};

use crate::scene::{Scene, HIT_STROKE_W};

const BG: &str = "#0d1117";
const NODE_FILL: &str = "#161b22";
const TEXT_BRIGHT: &str = "#c9d1d9";
const TEXT_DIM: &str = "#8b949e";
const PHASE_FILL: &str = "rgba(110,118,129,0.08)";
const PHASE_STROKE: &str = "rgba(110,118,129,0.35)";
const PARALLEL_STROKE: &str = "rgba(63,185,80,0.55)";
const SEQUENTIAL_STROKE: &str = "rgba(240,136,62,0.55)";

fn type_stroke(t: StepType) -> &'static str {
    match t {
        StepType::Tool => "#3fb950",
        StepType::Validate => "#f0883e",
        StepType::Logic => "#a371f7",
        StepType::Db => "#79c0ff",
        StepType::Llm => "#ff7b72",
        StepType::Template => "#d29922",
    }
}

fn esc(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}

fn points_attr(points: &[crate::scene::Point; 3]) -> String {
    points
        .iter()
        .map(|p| format!("{},{}", p.x, p.y))
        .collect::<Vec<_>>()
        .join(" ")
}

/// Serialize a rendered scene to a standalone SVG document.
pub fn write_scene(scene: &Scene) -> String {
    let mut svg = String::new();
    let w = scene.bounds.width * scene.zoom;
    let h = scene.bounds.height * scene.zoom;

    let _ = writeln!(
        svg,
        r#"<svg xmlns="http://www.w3.org/2000/svg" width="{w}" height="{h}" viewBox="0 0 {} {}" font-family="system-ui, sans-serif">"#,
        scene.bounds.width, scene.bounds.height
    );
    let _ = writeln!(
        svg,
        r#"<rect width="{}" height="{}" fill="{BG}"/>"#,
        scene.bounds.width, scene.bounds.height
    );

    // Phase backgrounds paint first so everything else sits on top.
    for phase in &scene.phases {
        let opacity = if phase.dimmed { 0.25 } else { 1.0 };
        let r = phase.rect;
        let _ = writeln!(
            svg,
            r#"<g opacity="{opacity}"><rect x="{}" y="{}" width="{}" height="{}" rx="10" fill="{PHASE_FILL}" stroke="{PHASE_STROKE}"/><text x="{}" y="{}" font-size="11" fill="{TEXT_DIM}">{}</text></g>"#,
            r.x,
            r.y,
            r.w,
            r.h,
            r.x + 10.0,
            r.y + 13.0,
            esc(&phase.label)
        );
    }

    // Group overlays.
    for overlay in &scene.overlays {
        let stroke = match overlay.kind {
            OverlayKind::Parallel => PARALLEL_STROKE,
            OverlayKind::Sequential => SEQUENTIAL_STROKE,
        };
        let r = overlay.rect;
        let _ = writeln!(
            svg,
            r#"<rect x="{}" y="{}" width="{}" height="{}" rx="8" fill="none" stroke="{stroke}" stroke-dasharray="6,4"/>"#,
            r.x, r.y, r.w, r.h
        );
        let _ = writeln!(
            svg,
            r#"<text x="{}" y="{}" font-size="9" fill="{stroke}">{}</text>"#,
            r.x + 8.0,
            r.y - 4.0,
            esc(&overlay.label)
        );
    }

    // Data edges: visible curve + arrowhead + invisible hit region.
    for edge in &scene.edges {
        let path = edge.curve.to_path();
        let _ = writeln!(
            svg,
            r#"<path id="epath-{}-{}" d="{path}" fill="none" stroke="{}" stroke-width="{}"/>"#,
            edge.key.source, edge.key.target, edge.stroke, edge.width
        );
        let _ = writeln!(
            svg,
            r#"<polygon id="earrow-{}-{}" points="{}" fill="{}"/>"#,
            edge.key.source,
            edge.key.target,
            points_attr(&edge.arrow),
            edge.stroke
        );
        let _ = writeln!(
            svg,
            r#"<path d="{path}" fill="none" stroke="transparent" stroke-width="{HIT_STROKE_W}" data-edge="{}"/>"#,
            esc(&edge.key.to_string())
        );
    }

    // Validation loops: dashed with arrowheads at both ends.
    for vloop in &scene.loops {
        let path = vloop.curve.to_path();
        let _ = writeln!(
            svg,
            r#"<path id="epath-vloop-{}-{}" d="{path}" fill="none" stroke="{}" stroke-width="{}" stroke-dasharray="4,4"/>"#,
            vloop.key.from, vloop.key.to, vloop.stroke, vloop.width
        );
        let _ = writeln!(
            svg,
            r#"<polygon points="{}" fill="{}"/>"#,
            points_attr(&vloop.arrow_to),
            vloop.stroke
        );
        let _ = writeln!(
            svg,
            r#"<polygon points="{}" fill="{}"/>"#,
            points_attr(&vloop.arrow_from),
            vloop.stroke
        );
        let _ = writeln!(
            svg,
            r#"<path d="{path}" fill="none" stroke="transparent" stroke-width="{HIT_STROKE_W}" data-edge="{}"/>"#,
            esc(&vloop.key.to_string())
        );
    }

    // Nodes on top.
    for node in &scene.nodes {
        let opacity = if node.dimmed { 0.25 } else { 1.0 };
        let stroke = type_stroke(node.primary);
        let stroke_w = if node.selected { 2.5 } else { 1.0 };
        let badges = node
            .badges
            .iter()
            .map(|t| t.as_str())
            .collect::<Vec<_>>()
            .join(" ");
        let _ = writeln!(
            svg,
            r#"<g id="dnode-{}" opacity="{opacity}"><rect x="{}" y="{}" width="{}" height="85" rx="6" fill="{NODE_FILL}" stroke="{stroke}" stroke-width="{stroke_w}"/><text x="{}" y="{}" font-size="9" fill="{stroke}">{} {}</text><text x="{}" y="{}" font-size="11" fill="{TEXT_BRIGHT}">{}</text><text x="{}" y="{}" font-size="9" fill="{TEXT_DIM}">{}</text></g>"#,
            esc(&node.id),
            node.x,
            node.y,
            node.w,
            node.x + 8.0,
            node.y + 16.0,
            esc(&badges),
            node.num,
            node.x + 8.0,
            node.y + 38.0,
            esc(&node.name),
            node.x + 8.0,
            node.y + 56.0,
            esc(&node.meta)
        );
    }

    svg.push_str("</svg>\n");
    svg
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::DerivedGraph;
    use crate::phases::phase_romans;
    use crate::scene::render;
    use crate::state::UiState;
    use flowscope_model::PipelineDoc;

    fn scene() -> Scene {
        let doc = PipelineDoc::from_json(
            r#"{
                "title": "T", "summary": "S",
                "phases": { "p": "Phase & Co" },
                "steps": [
                    { "id": "a", "num": 1, "name": "A <start>", "meta": "m",
                      "phase": "p", "type": "tool", "outputs": ["X"] },
                    { "id": "b", "num": 2, "name": "B", "meta": "m",
                      "phase": "p", "type": "llm", "inputs": ["X"] }
                ],
                "validation_loops": [
                    { "from": "b", "to": "a", "label": "again" }
                ],
                "layout": {
                    "positions": {
                        "a": { "x": 0, "y": 0 },
                        "b": { "x": 0, "y": 300 }
                    },
                    "overlays": [{
                        "kind": "sequential", "label": "SEQUENTIAL",
                        "left":   { "step": "a", "offset": -20 },
                        "top":    { "step": "a", "offset": -24 },
                        "right":  { "step": "a", "offset": 20 },
                        "bottom": { "step": "b", "offset": 112 }
                    }]
                }
            }"#,
        )
        .unwrap();
        let graph = DerivedGraph::derive(&doc);
        let romans = phase_romans(&doc.steps);
        render(&doc, &graph, &romans, &UiState::default())
    }

    #[test]
    fn svg_contains_nodes_edges_and_loop() {
        let svg = write_scene(&scene());
        assert!(svg.starts_with("<svg "));
        assert!(svg.ends_with("</svg>\n"));
        assert!(svg.contains(r#"id="dnode-a""#));
        assert!(svg.contains(r#"id="epath-a-b""#));
        assert!(svg.contains(r#"id="earrow-a-b""#));
        assert!(svg.contains(r#"id="epath-vloop-b-a""#));
        assert!(svg.contains(r#"stroke-dasharray="4,4""#));
    }

    #[test]
    fn hit_regions_carry_string_edge_keys() {
        let svg = write_scene(&scene());
        assert!(svg.contains(r#"data-edge="a-&gt;b""#));
        assert!(svg.contains(r#"data-edge="b&lt;-&gt;a""#));
        assert!(svg.contains(&format!(r#"stroke-width="{}""#, HIT_STROKE_W)));
    }

    #[test]
    fn text_is_xml_escaped() {
        let svg = write_scene(&scene());
        assert!(svg.contains("A &lt;start&gt;"));
        assert!(svg.contains("Phase &amp; Co"));
        assert!(!svg.contains("A <start>"));
    }

    #[test]
    fn zoom_scales_outer_dimensions_only() {
        let mut sc = scene();
        sc.zoom = 0.5;
        let svg = write_scene(&sc);
        let expected_w = sc.bounds.width * 0.5;
        assert!(svg.contains(&format!(r#"width="{expected_w}""#)));
        assert!(svg.contains(&format!(
            r#"viewBox="0 0 {} {}""#,
            sc.bounds.width, sc.bounds.height
        )));
    }
}
