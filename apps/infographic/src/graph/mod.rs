//! Entity graph rendering.
//!
//! Nodes are `0..node_occurrences.len()`, edges are every `(n, nbr)` pair of the
//! adjacency list. Nodes sit on a circle; marker area follows the node's
//! occurrence count the way scatter markers do (diameter = `sqrt(size)`
//! points at 100 dpi).

use std::collections::{BTreeMap, HashMap};

use image::{Rgb, RgbImage};
use petgraph::graph::{DiGraph, NodeIndex};
use thiserror::Error;
use tiny_skia::{Color, FillRule, Paint, PathBuilder, Pixmap, Stroke, Transform};

use crate::layout::font_metrics::{TextMeasure, Typesetter};

pub type AdjacencyList = BTreeMap<usize, Vec<usize>>;

pub const CANVAS_WIDTH: u32 = 640;
pub const CANVAS_HEIGHT: u32 = 480;
const DPI: f32 = 100.0;
const MARGIN: f32 = 60.0;
const LABEL_FONT_SIZE: u32 = 12;
const ARROW_LENGTH: f32 = 10.0;
const ARROW_HALF_WIDTH: f32 = 4.0;
const EDGE_WIDTH: f32 = 1.5;
const MIN_MARKER_RADIUS: f32 = 0.5;

const BACKGROUND: Rgb<u8> = Rgb([255, 255, 255]);
const NODE_COLOR: Rgb<u8> = Rgb([31, 119, 180]);
const EDGE_COLOR: Rgb<u8> = Rgb([0, 0, 0]);
const LABEL_COLOR: Rgb<u8> = Rgb([0, 0, 0]);

#[derive(Debug, Error)]
pub enum GraphError {
    #[error("edge {from} -> {to} names a node outside 0..{nodes}")]
    UnknownNode { from: usize, to: usize, nodes: usize },

    #[error("node {node} has size {size}; sizes must be finite and non-negative")]
    InvalidSize { node: usize, size: f64 },

    #[error("could not allocate a {width}x{height} drawing surface")]
    Surface { width: u32, height: u32 },
}

/// Builds the directed graph. Node weights are the node ids.
pub fn build_graph(
    adj_list: &AdjacencyList,
    node_count: usize,
) -> Result<DiGraph<usize, ()>, GraphError> {
    let mut graph = DiGraph::with_capacity(node_count, adj_list.values().map(Vec::len).sum());
    for id in 0..node_count {
        graph.add_node(id);
    }
    for (&from, neighbors) in adj_list {
        for &to in neighbors {
            if from >= node_count || to >= node_count {
                return Err(GraphError::UnknownNode {
                    from,
                    to,
                    nodes: node_count,
                });
            }
            graph.add_edge(NodeIndex::new(from), NodeIndex::new(to), ());
        }
    }
    Ok(graph)
}

/// Renders the entity graph onto a white 640x480 canvas.
///
/// Nodes without an entry in `entity_labels` are labelled with their index.
pub fn render_graph(
    adj_list: &AdjacencyList,
    node_occurrences: &[f64],
    entity_labels: &HashMap<usize, String>,
    typesetter: &Typesetter,
) -> Result<RgbImage, GraphError> {
    if let Some((node, &size)) = node_occurrences
        .iter()
        .enumerate()
        .find(|(_, s)| !s.is_finite() || **s < 0.0)
    {
        return Err(GraphError::InvalidSize { node, size });
    }
    let graph = build_graph(adj_list, node_occurrences.len())?;
    let positions = circular_positions(graph.node_count(), CANVAS_WIDTH, CANVAS_HEIGHT);
    let radii: Vec<f32> = node_occurrences.iter().map(|&s| node_radius(s)).collect();

    let mut pixmap = Pixmap::new(CANVAS_WIDTH, CANVAS_HEIGHT).ok_or(GraphError::Surface {
        width: CANVAS_WIDTH,
        height: CANVAS_HEIGHT,
    })?;
    let [r, g, b] = BACKGROUND.0;
    pixmap.fill(Color::from_rgba8(r, g, b, 255));

    let edge_paint = solid_paint(EDGE_COLOR);
    let edge_stroke = Stroke {
        width: EDGE_WIDTH,
        ..Stroke::default()
    };
    for edge in graph.raw_edges() {
        let (from, to) = (edge.source().index(), edge.target().index());
        if from == to {
            continue;
        }
        let (start, end) = (positions[from], positions[to]);
        let (dx, dy) = (end.0 - start.0, end.1 - start.1);
        let length = (dx * dx + dy * dy).sqrt();
        if length <= f32::EPSILON {
            continue;
        }
        let (ux, uy) = (dx / length, dy / length);
        let tail = (start.0 + ux * radii[from], start.1 + uy * radii[from]);
        let tip = (end.0 - ux * radii[to], end.1 - uy * radii[to]);

        let mut line = PathBuilder::new();
        line.move_to(tail.0, tail.1);
        line.line_to(tip.0, tip.1);
        if let Some(path) = line.finish() {
            pixmap.stroke_path(&path, &edge_paint, &edge_stroke, Transform::identity(), None);
        }
        if let Some(path) = arrowhead(tip, (ux, uy)) {
            pixmap.fill_path(&path, &edge_paint, FillRule::Winding, Transform::identity(), None);
        }
    }

    let node_paint = solid_paint(NODE_COLOR);
    for node in graph.node_indices() {
        let id = graph[node];
        let (x, y) = positions[id];
        if let Some(path) = PathBuilder::from_circle(x, y, radii[id].max(MIN_MARKER_RADIUS)) {
            pixmap.fill_path(&path, &node_paint, FillRule::Winding, Transform::identity(), None);
        }
    }

    let mut canvas = to_rgb_image(&pixmap);
    for node in graph.node_indices() {
        let id = graph[node];
        let label = entity_labels
            .get(&id)
            .cloned()
            .unwrap_or_else(|| id.to_string());
        let extent = typesetter.measure(&label, LABEL_FONT_SIZE);
        let (x, y) = positions[id];
        typesetter.draw(
            &mut canvas,
            (x - extent.width / 2.0).round() as i64,
            (y - extent.height / 2.0).round() as i64,
            &label,
            LABEL_FONT_SIZE,
            LABEL_COLOR,
        );
    }

    Ok(canvas)
}

/// Node centers evenly spaced on a circle; a lone node sits in the middle.
pub(crate) fn circular_positions(count: usize, width: u32, height: u32) -> Vec<(f32, f32)> {
    let (cx, cy) = (width as f32 / 2.0, height as f32 / 2.0);
    if count == 1 {
        return vec![(cx, cy)];
    }
    let radius = (cx.min(cy) - MARGIN).max(0.0);
    (0..count)
        .map(|i| {
            let angle = std::f32::consts::TAU * i as f32 / count as f32;
            (cx + radius * angle.cos(), cy + radius * angle.sin())
        })
        .collect()
}

/// Marker radius in pixels for a node of the given size (points squared).
///
/// Capped at the canvas diagonal: any larger marker centered on the canvas
/// already covers all of it.
pub(crate) fn node_radius(size: f64) -> f32 {
    let diameter_pt = size.max(0.0).sqrt() as f32;
    (diameter_pt * DPI / 72.0 / 2.0).min(max_marker_radius())
}

fn max_marker_radius() -> f32 {
    (CANVAS_WIDTH as f32).hypot(CANVAS_HEIGHT as f32)
}

fn solid_paint(color: Rgb<u8>) -> Paint<'static> {
    let [r, g, b] = color.0;
    let mut paint = Paint::default();
    paint.set_color_rgba8(r, g, b, 255);
    paint.anti_alias = true;
    paint
}

/// Filled triangle pointing along `dir` with its tip at `tip`.
fn arrowhead(tip: (f32, f32), dir: (f32, f32)) -> Option<tiny_skia::Path> {
    let base = (tip.0 - dir.0 * ARROW_LENGTH, tip.1 - dir.1 * ARROW_LENGTH);
    let normal = (-dir.1 * ARROW_HALF_WIDTH, dir.0 * ARROW_HALF_WIDTH);
    let mut pb = PathBuilder::new();
    pb.move_to(tip.0, tip.1);
    pb.line_to(base.0 + normal.0, base.1 + normal.1);
    pb.line_to(base.0 - normal.0, base.1 - normal.1);
    pb.close();
    pb.finish()
}

/// Every pixel is opaque, so demultiplying is exact.
fn to_rgb_image(pixmap: &Pixmap) -> RgbImage {
    let mut canvas = RgbImage::new(pixmap.width(), pixmap.height());
    for (dst, src) in canvas.pixels_mut().zip(pixmap.pixels()) {
        let color = src.demultiply();
        *dst = Rgb([color.red(), color.green(), color.blue()]);
    }
    canvas
}

#[cfg(test)]
mod tests {
    use super::*;

    fn typesetter() -> Typesetter {
        Typesetter::dejavu_sans().expect("bundled font must parse")
    }

    fn adjacency(edges: &[(usize, &[usize])]) -> AdjacencyList {
        edges.iter().map(|(n, nbrs)| (*n, nbrs.to_vec())).collect()
    }

    #[test]
    fn test_build_graph_counts_nodes_and_edges() {
        let adj = adjacency(&[(0, &[1, 2]), (2, &[0])]);
        let graph = build_graph(&adj, 4).unwrap();
        assert_eq!(graph.node_count(), 4);
        assert_eq!(graph.edge_count(), 3);
        assert!(graph.contains_edge(NodeIndex::new(2), NodeIndex::new(0)));
        assert!(!graph.contains_edge(NodeIndex::new(1), NodeIndex::new(0)));
    }

    #[test]
    fn test_build_graph_rejects_unknown_node() {
        let adj = adjacency(&[(0, &[5])]);
        let err = build_graph(&adj, 2).unwrap_err();
        assert!(matches!(
            err,
            GraphError::UnknownNode {
                from: 0,
                to: 5,
                nodes: 2
            }
        ));
    }

    #[test]
    fn test_node_radius_follows_sqrt_of_size() {
        assert_eq!(node_radius(0.0), 0.0);
        assert_eq!(node_radius(f64::INFINITY), max_marker_radius());
        assert_eq!(node_radius(-4.0), 0.0);
        let small = node_radius(100.0);
        let large = node_radius(400.0);
        assert!((large / small - 2.0).abs() < 1e-4);
    }

    #[test]
    fn test_circular_positions_single_node_is_centered() {
        assert_eq!(circular_positions(1, 640, 480), vec![(320.0, 240.0)]);
        assert!(circular_positions(0, 640, 480).is_empty());
    }

    #[test]
    fn test_render_empty_graph_is_blank_canvas() {
        let image = render_graph(&AdjacencyList::new(), &[], &HashMap::new(), &typesetter())
            .unwrap();
        assert_eq!(image.dimensions(), (CANVAS_WIDTH, CANVAS_HEIGHT));
        assert!(image.pixels().all(|p| *p == BACKGROUND));
    }

    #[test]
    fn test_render_draws_nodes_and_edges() {
        let adj = adjacency(&[(0, &[1])]);
        let labels = HashMap::from([(0, "Biden".to_string()), (1, "Trump".to_string())]);
        let image = render_graph(&adj, &[1000.0, 1000.0], &labels, &typesetter()).unwrap();

        let positions = circular_positions(2, CANVAS_WIDTH, CANVAS_HEIGHT);
        let radius = node_radius(1000.0);
        for (x, y) in positions {
            // Above the label but inside the marker.
            let probe = image.get_pixel(x as u32, (y - radius + 4.0) as u32);
            assert_eq!(*probe, NODE_COLOR);
        }
        // The two nodes sit left and right of center; the edge crosses it.
        let center = image.get_pixel(CANVAS_WIDTH / 2, CANVAS_HEIGHT / 2);
        assert!(center.0[0] < 128, "expected edge ink at center, got {center:?}");
        // Nothing is drawn far from the edge line and the markers.
        assert_eq!(*image.get_pixel(CANVAS_WIDTH / 2, 20), BACKGROUND);
    }

    #[test]
    fn test_render_huge_size_covers_canvas_without_hanging() {
        let image =
            render_graph(&AdjacencyList::new(), &[1e300], &HashMap::new(), &typesetter()).unwrap();
        assert_eq!(node_radius(1e300), max_marker_radius());
        assert_eq!(*image.get_pixel(0, 0), NODE_COLOR);
        assert_eq!(*image.get_pixel(CANVAS_WIDTH - 1, CANVAS_HEIGHT - 1), NODE_COLOR);
    }

    #[test]
    fn test_render_huge_sizes_with_edges() {
        let adj = adjacency(&[(0, &[1]), (1, &[0])]);
        let image = render_graph(&adj, &[1e10, 1e300], &HashMap::new(), &typesetter()).unwrap();
        assert_eq!(image.dimensions(), (CANVAS_WIDTH, CANVAS_HEIGHT));
    }

    #[test]
    fn test_render_rejects_negative_or_non_finite_size() {
        for size in [-1.0, f64::NAN, f64::INFINITY] {
            let sizes = [10.0, size];
            let err = render_graph(&AdjacencyList::new(), &sizes, &HashMap::new(), &typesetter())
                .unwrap_err();
            assert!(matches!(err, GraphError::InvalidSize { node: 1, .. }));
        }
    }
}
