// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Skeletal topology extraction
//!
//! Walkable space is sealed off from the exterior, cleaned up and thinned to
//! one-pixel medial lines. The skeleton pixels become an arena graph
//! ([`PixelGraph`]) with explicit degree bookkeeping; pruning and path
//! tracing are pure functions over it, and [`simplify`] reduces the result
//! to a critical-node graph ready for the navigation builder.

use image::{GrayImage, Luma};
use rustc_hash::{FxHashMap, FxHashSet};
use serde::{Deserialize, Serialize};
use slotmap::{new_key_type, SlotMap};
use tracing::debug;

use crate::config::SkeletonConfig;
use crate::image_ops::{
    dilate_rect, erode_rect, flood_fill_mask, morphological_close, threshold, BACKGROUND, FOREGROUND,
};
use crate::types::Point2D;

new_key_type! {
    /// Key for one skeleton pixel in a [`PixelGraph`]
    pub struct PixelKey;
}

/// One skeleton pixel and its weighted neighbours
#[derive(Debug, Clone)]
pub struct PixelNode {
    pub x: u32,
    pub y: u32,
    pub neighbors: Vec<(PixelKey, f64)>,
}

impl PixelNode {
    pub fn degree(&self) -> usize {
        self.neighbors.len()
    }
}

/// 8-connected pixel adjacency graph over a skeleton
#[derive(Debug, Clone, Default)]
pub struct PixelGraph {
    nodes: SlotMap<PixelKey, PixelNode>,
}

impl PixelGraph {
    /// Build the graph from a one-pixel-wide mask (foreground = 255)
    ///
    /// Diagonal links are only made where no orthogonal path joins the two
    /// pixels, so staircase runs do not form spurious triangles.
    pub fn from_mask(mask: &GrayImage) -> Self {
        let (width, height) = mask.dimensions();
        let on = |x: i64, y: i64| {
            x >= 0 && y >= 0 && x < width as i64 && y < height as i64 && mask.get_pixel(x as u32, y as u32).0[0] > 128
        };

        let mut nodes: SlotMap<PixelKey, PixelNode> = SlotMap::with_key();
        let mut index: FxHashMap<(u32, u32), PixelKey> = FxHashMap::default();
        for (x, y, p) in mask.enumerate_pixels() {
            if p.0[0] > 128 {
                let key = nodes.insert(PixelNode {
                    x,
                    y,
                    neighbors: Vec::new(),
                });
                index.insert((x, y), key);
            }
        }

        let keys: Vec<PixelKey> = nodes.keys().collect();
        for key in keys {
            let (x, y) = (nodes[key].x as i64, nodes[key].y as i64);
            let mut neighbors = Vec::with_capacity(8);
            for (dx, dy) in [(-1, -1), (0, -1), (1, -1), (-1, 0), (1, 0), (-1, 1), (0, 1), (1, 1)] {
                let (nx, ny) = (x + dx, y + dy);
                if !on(nx, ny) {
                    continue;
                }
                let diagonal = dx != 0 && dy != 0;
                if diagonal && (on(x + dx, y) || on(x, y + dy)) {
                    continue;
                }
                if let Some(&other) = index.get(&(nx as u32, ny as u32)) {
                    let weight = if diagonal { std::f64::consts::SQRT_2 } else { 1.0 };
                    neighbors.push((other, weight));
                }
            }
            nodes[key].neighbors = neighbors;
        }

        Self { nodes }
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn get(&self, key: PixelKey) -> Option<&PixelNode> {
        self.nodes.get(key)
    }

    pub fn degree(&self, key: PixelKey) -> usize {
        self.nodes.get(key).map_or(0, PixelNode::degree)
    }

    pub fn iter(&self) -> impl Iterator<Item = (PixelKey, &PixelNode)> {
        self.nodes.iter()
    }

    fn position(&self, key: PixelKey) -> (u32, u32) {
        self.nodes.get(key).map_or((0, 0), |n| (n.x, n.y))
    }

    fn remove(&mut self, key: PixelKey) {
        let Some(node) = self.nodes.remove(key) else {
            return;
        };
        for (other, _) in node.neighbors {
            if let Some(n) = self.nodes.get_mut(other) {
                n.neighbors.retain(|(k, _)| *k != key);
            }
        }
    }

    /// Critical nodes (degree != 2, isolated pixels excluded) in scan order
    pub fn critical_nodes(&self) -> Vec<PixelKey> {
        let mut critical: Vec<PixelKey> = self
            .nodes
            .iter()
            .filter(|(_, n)| n.degree() != 2 && n.degree() > 0)
            .map(|(k, _)| k)
            .collect();
        critical.sort_by_key(|&k| {
            let (x, y) = self.position(k);
            (y, x)
        });
        critical
    }
}

/// Strip leaf nodes `rounds` times, returning a new graph
pub fn prune_leaves(graph: &PixelGraph, rounds: usize) -> PixelGraph {
    let mut pruned = graph.clone();
    for _ in 0..rounds {
        let leaves: Vec<PixelKey> = pruned
            .nodes
            .iter()
            .filter(|(_, n)| n.degree() == 1)
            .map(|(k, _)| k)
            .collect();
        if leaves.is_empty() {
            break;
        }
        for key in leaves {
            pruned.remove(key);
        }
    }
    pruned
}

/// A chain of pixels between two critical nodes
#[derive(Debug, Clone, PartialEq)]
pub struct PixelPath {
    pub start: PixelKey,
    pub end: PixelKey,
    pub pixels: Vec<(u32, u32)>,
}

/// Walk every degree-2 chain leaving a critical node
///
/// Paths are deduplicated by their sorted endpoint pair. A closed loop with
/// no critical node on it is traced once from its first pixel in scan order
/// and comes back as a path whose `start` equals its `end`.
pub fn trace_paths(graph: &PixelGraph) -> Vec<PixelPath> {
    let critical = graph.critical_nodes();
    let critical_set: FxHashSet<PixelKey> = critical.iter().copied().collect();
    let mut seen: FxHashSet<((u32, u32), (u32, u32))> = FxHashSet::default();
    let mut visited: FxHashSet<PixelKey> = critical_set.clone();
    let mut paths = Vec::new();

    for &start in &critical {
        let Some(node) = graph.get(start) else {
            continue;
        };
        for &(first, _) in &node.neighbors {
            let mut pixels = vec![graph.position(start), graph.position(first)];
            let mut prev = start;
            let mut current = first;
            let mut steps = 0;
            visited.insert(first);

            while !critical_set.contains(&current) && current != start && steps <= graph.len() {
                let Some(next) = next_along(graph, current, prev) else {
                    break;
                };
                pixels.push(graph.position(next));
                visited.insert(next);
                prev = current;
                current = next;
                steps += 1;
            }

            let a = graph.position(start);
            let b = graph.position(current);
            let key = if (a.1, a.0) <= (b.1, b.0) { (a, b) } else { (b, a) };
            if seen.insert(key) {
                paths.push(PixelPath {
                    start,
                    end: current,
                    pixels,
                });
            }
        }
    }

    let mut loose: Vec<PixelKey> = graph
        .iter()
        .filter(|(k, n)| n.degree() == 2 && !visited.contains(k))
        .map(|(k, _)| k)
        .collect();
    loose.sort_by_key(|&k| {
        let (x, y) = graph.position(k);
        (y, x)
    });

    let mut loops = 0;
    for start in loose {
        if !visited.insert(start) {
            continue;
        }
        let Some(&(first, _)) = graph.get(start).and_then(|n| n.neighbors.first()) else {
            continue;
        };
        let mut pixels = vec![graph.position(start), graph.position(first)];
        let mut prev = start;
        let mut current = first;
        let mut steps = 0;
        visited.insert(first);

        while current != start && steps <= graph.len() {
            let Some(next) = next_along(graph, current, prev) else {
                break;
            };
            pixels.push(graph.position(next));
            visited.insert(next);
            prev = current;
            current = next;
            steps += 1;
        }

        if current == start {
            loops += 1;
            paths.push(PixelPath {
                start,
                end: start,
                pixels,
            });
        }
    }
    if loops > 0 {
        debug!(loops, "traced closed skeleton loops without junctions");
    }

    paths
}

fn next_along(graph: &PixelGraph, current: PixelKey, prev: PixelKey) -> Option<PixelKey> {
    graph
        .get(current)
        .and_then(|n| n.neighbors.iter().map(|(k, _)| *k).find(|&k| k != prev))
}

/// Kind of a simplified skeleton node
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum SkeletonNodeKind {
    /// Junction, endpoint or dead end
    Junction,
    PathPoint,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SkeletonNode {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: SkeletonNodeKind,
    pub position: Point2D,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SkeletonEdge {
    pub id: String,
    pub from: String,
    pub to: String,
    pub distance: f64,
}

/// Critical-node graph produced by the skeletal extractor
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct SkeletonGraph {
    pub nodes: Vec<SkeletonNode>,
    pub edges: Vec<SkeletonEdge>,
}

impl SkeletonGraph {
    pub fn junction_count(&self) -> usize {
        self.nodes
            .iter()
            .filter(|n| n.kind == SkeletonNodeKind::Junction)
            .count()
    }
}

/// Reduce a pixel graph to critical nodes joined by sampled chains
pub fn simplify(graph: &PixelGraph, stride: usize) -> SkeletonGraph {
    let stride = stride.max(1);
    let critical = graph.critical_nodes();
    let critical_ids: FxHashMap<PixelKey, String> = critical
        .iter()
        .enumerate()
        .map(|(i, &k)| (k, format!("node_{}", i)))
        .collect();

    let mut out = SkeletonGraph::default();
    let mut node_ids: FxHashSet<String> = FxHashSet::default();
    let mut edge_pairs: FxHashSet<(String, String)> = FxHashSet::default();

    for &key in &critical {
        if let Some(id) = critical_ids.get(&key) {
            let (x, y) = graph.position(key);
            node_ids.insert(id.clone());
            out.nodes.push(SkeletonNode {
                id: id.clone(),
                kind: SkeletonNodeKind::Junction,
                position: Point2D::new(x as f64, y as f64),
            });
        }
    }

    for path in trace_paths(graph) {
        let last = path.pixels.len() - 1;
        let mut samples: Vec<usize> = (0..=last).step_by(stride).collect();
        if samples.last() != Some(&last) {
            samples.push(last);
        }

        let chain: Vec<(String, Point2D)> = samples
            .iter()
            .map(|&i| {
                let (x, y) = path.pixels[i];
                let position = Point2D::new(x as f64, y as f64);
                let id = if i == 0 {
                    critical_ids.get(&path.start).cloned()
                } else if i == last {
                    critical_ids.get(&path.end).cloned()
                } else {
                    None
                };
                (id.unwrap_or_else(|| format!("node_p_{}_{}", x, y)), position)
            })
            .collect();

        for (id, position) in &chain {
            if node_ids.insert(id.clone()) {
                out.nodes.push(SkeletonNode {
                    id: id.clone(),
                    kind: SkeletonNodeKind::PathPoint,
                    position: *position,
                });
            }
        }

        for pair in chain.windows(2) {
            let (a, pa) = &pair[0];
            let (b, pb) = &pair[1];
            if a == b {
                continue;
            }
            let key = if a < b { (a.clone(), b.clone()) } else { (b.clone(), a.clone()) };
            if edge_pairs.insert(key) {
                out.edges.push(SkeletonEdge {
                    id: format!("edge_{}_{}", a, b),
                    from: a.clone(),
                    to: b.clone(),
                    distance: pa.distance_to(pb),
                });
            }
        }
    }

    out
}

/// Walkable mask with the exterior removed, cleaned and ready to thin
pub fn walkable_mask(gray: &GrayImage, config: &SkeletonConfig) -> GrayImage {
    let (width, height) = gray.dimensions();
    let walkable = threshold(gray, config.walkable_threshold.saturating_add(1));
    if width == 0 || height == 0 {
        return walkable;
    }

    let mut sealed = walkable.clone();
    for _ in 0..config.seal_iterations {
        sealed = erode_rect(&sealed, config.seal_kernel, config.seal_kernel);
    }

    let corners = [(0, 0), (width - 1, 0), (0, height - 1), (width - 1, height - 1)];
    let exterior = flood_fill_mask(&sealed, &corners, FOREGROUND);
    let mut grown = GrayImage::from_fn(width, height, |x, y| {
        if exterior[(y * width + x) as usize] {
            Luma([FOREGROUND])
        } else {
            Luma([BACKGROUND])
        }
    });
    for _ in 0..config.seal_iterations {
        grown = dilate_rect(&grown, config.seal_kernel, config.seal_kernel);
    }

    let border = config.border;
    let mut interior = walkable;
    for (x, y, p) in interior.enumerate_pixels_mut() {
        let in_frame = x < border || y < border || x + border >= width || y + border >= height;
        if in_frame || grown.get_pixel(x, y).0[0] == FOREGROUND {
            p.0[0] = BACKGROUND;
        }
    }

    let mut cleaned = morphological_close(&interior, config.close_kernel, config.close_kernel);
    for _ in 0..config.dilate_iterations {
        cleaned = dilate_rect(&cleaned, config.dilate_kernel, config.dilate_kernel);
    }
    cleaned
}

/// Zhang-Suen thinning of a binary mask (foreground = 255)
pub fn zhang_suen_thin(mask: &GrayImage) -> GrayImage {
    let (width, height) = mask.dimensions();
    let (w, h) = (width as usize, height as usize);
    let mut grid: Vec<u8> = mask.pixels().map(|p| u8::from(p.0[0] > 128)).collect();
    if w < 3 || h < 3 {
        return mask.clone();
    }

    loop {
        let mut changed = false;
        for step in 0..2 {
            let mut remove = Vec::new();
            for y in 1..h - 1 {
                for x in 1..w - 1 {
                    if grid[y * w + x] == 0 {
                        continue;
                    }
                    // P2..P9, clockwise from north
                    let n = [
                        grid[(y - 1) * w + x],
                        grid[(y - 1) * w + x + 1],
                        grid[y * w + x + 1],
                        grid[(y + 1) * w + x + 1],
                        grid[(y + 1) * w + x],
                        grid[(y + 1) * w + x - 1],
                        grid[y * w + x - 1],
                        grid[(y - 1) * w + x - 1],
                    ];
                    let b: u8 = n.iter().sum();
                    if !(2..=6).contains(&b) {
                        continue;
                    }
                    let a = (0..8).filter(|&i| n[i] == 0 && n[(i + 1) % 8] == 1).count();
                    if a != 1 {
                        continue;
                    }
                    let (p2, p4, p6, p8) = (n[0], n[2], n[4], n[6]);
                    let clear = if step == 0 {
                        p2 * p4 * p6 == 0 && p4 * p6 * p8 == 0
                    } else {
                        p2 * p4 * p8 == 0 && p2 * p6 * p8 == 0
                    };
                    if clear {
                        remove.push(y * w + x);
                    }
                }
            }
            changed |= !remove.is_empty();
            for i in remove {
                grid[i] = 0;
            }
        }
        if !changed {
            break;
        }
    }

    GrayImage::from_fn(width, height, |x, y| {
        Luma([if grid[y as usize * w + x as usize] == 1 { FOREGROUND } else { BACKGROUND }])
    })
}

/// Full extraction: mask, thin, graph, prune, simplify
pub fn extract_skeleton(gray: &GrayImage, config: &SkeletonConfig) -> SkeletonGraph {
    let mask = walkable_mask(gray, config);
    let skeleton = zhang_suen_thin(&mask);
    let graph = PixelGraph::from_mask(&skeleton);
    let pruned = prune_leaves(&graph, config.prune_rounds);
    let simplified = simplify(&pruned, config.sample_stride);

    debug!(
        skeleton_pixels = graph.len(),
        after_prune = pruned.len(),
        nodes = simplified.nodes.len(),
        edges = simplified.edges.len(),
        "skeleton extraction complete"
    );
    simplified
}

#[cfg(test)]
mod tests {
    use super::*;

    fn mask_from(points: &[(u32, u32)], width: u32, height: u32) -> GrayImage {
        let mut img = GrayImage::new(width, height);
        for &(x, y) in points {
            img.put_pixel(x, y, Luma([255]));
        }
        img
    }

    fn l_path() -> GrayImage {
        let mut pts: Vec<(u32, u32)> = (10..=60).map(|x| (x, 10)).collect();
        pts.extend((11..=60).map(|y| (60, y)));
        mask_from(&pts, 80, 80)
    }

    #[test]
    fn staircase_pixels_do_not_form_triangles() {
        let g = PixelGraph::from_mask(&mask_from(&[(5, 5), (6, 5), (6, 6), (7, 6)], 12, 12));
        assert!(g.iter().all(|(_, n)| n.degree() <= 2));
        assert_eq!(g.critical_nodes().len(), 2);
    }

    #[test]
    fn pruning_removes_short_spur_and_is_pure() {
        let mut pts: Vec<(u32, u32)> = (10..110).map(|x| (x, 50)).collect();
        pts.extend((45..50).map(|y| (60, y)));
        let graph = PixelGraph::from_mask(&mask_from(&pts, 120, 100));
        assert!(graph.iter().any(|(_, n)| n.degree() == 3));

        let pruned = prune_leaves(&graph, 10);
        assert!(pruned.iter().all(|(_, n)| n.degree() <= 2));
        assert_eq!(pruned.len(), 100 - 20);
        // Input untouched
        assert_eq!(graph.len(), 105);
    }

    #[test]
    fn l_path_simplifies_to_sampled_chain() {
        let graph = PixelGraph::from_mask(&l_path());
        let paths = trace_paths(&graph);
        assert_eq!(paths.len(), 1);
        assert_eq!(paths[0].pixels.len(), 101);

        let out = simplify(&graph, 10);
        assert_eq!(out.junction_count(), 2);
        assert_eq!(out.nodes.len(), 11);
        assert_eq!(out.edges.len(), 10);
        assert!(out.nodes.iter().any(|n| n.id == "node_0"));
        assert!(out.nodes.iter().any(|n| n.id == "node_p_20_10"));
        assert!(out.edges.iter().all(|e| e.distance > 0.0));
    }

    #[test]
    fn closed_ring_is_traced_as_a_loop() {
        let mut pts: Vec<(u32, u32)> = Vec::new();
        for i in 10..30 {
            pts.extend([(i, 10), (30, i), (40 - i, 30), (10, 40 - i)]);
        }
        let graph = PixelGraph::from_mask(&mask_from(&pts, 50, 50));
        assert_eq!(graph.len(), 80);
        assert!(graph.critical_nodes().is_empty());

        let paths = trace_paths(&graph);
        assert_eq!(paths.len(), 1);
        assert_eq!(paths[0].start, paths[0].end);
        assert_eq!(paths[0].pixels.len(), 81);
        assert_eq!(paths[0].pixels.first(), paths[0].pixels.last());

        let out = simplify(&graph, 10);
        assert_eq!(out.junction_count(), 0);
        assert_eq!(out.nodes.len(), 8);
        assert_eq!(out.edges.len(), 8);
    }

    #[test]
    fn loop_hanging_off_a_junction_is_not_traced_twice() {
        let mut pts: Vec<(u32, u32)> = Vec::new();
        for i in 10..30 {
            pts.extend([(i, 10), (30, i), (40 - i, 30), (10, 40 - i)]);
        }
        pts.extend((31..45).map(|x| (x, 20)));
        let graph = PixelGraph::from_mask(&mask_from(&pts, 60, 50));
        assert_eq!(graph.critical_nodes().len(), 2);

        let paths = trace_paths(&graph);
        assert_eq!(paths.len(), 2);
        assert_eq!(paths.iter().filter(|p| p.start == p.end).count(), 1);
    }

    #[test]
    fn thinning_reduces_bar_to_line() {
        let mut img = GrayImage::new(60, 30);
        for y in 10..17 {
            for x in 5..55 {
                img.put_pixel(x, y, Luma([255]));
            }
        }
        let thin = zhang_suen_thin(&img);
        for x in 15..45 {
            let count = (0..30).filter(|&y| thin.get_pixel(x, y).0[0] == 255).count();
            assert_eq!(count, 1, "column {} should be one pixel thick", x);
        }
    }

    #[test]
    fn cross_shaped_corridors_give_a_junction() {
        // Dark plan with a plus-shaped walkable corridor
        let mut gray = GrayImage::from_pixel(200, 200, Luma([0]));
        for y in 90..110 {
            for x in 20..180 {
                gray.put_pixel(x, y, Luma([255]));
            }
        }
        for y in 20..180 {
            for x in 90..110 {
                gray.put_pixel(x, y, Luma([255]));
            }
        }

        let out = extract_skeleton(&gray, &SkeletonConfig::default());
        assert!(out.junction_count() >= 3);
        assert!(!out.edges.is_empty());

        let ids: FxHashSet<&str> = out.nodes.iter().map(|n| n.id.as_str()).collect();
        assert_eq!(ids.len(), out.nodes.len());
        for edge in &out.edges {
            assert!(ids.contains(edge.from.as_str()) && ids.contains(edge.to.as_str()));
            assert!(edge.distance.is_finite());
        }
    }

    #[test]
    fn exterior_space_is_not_walkable() {
        // White page with a closed dark box: only the inside stays walkable
        let mut gray = GrayImage::from_pixel(120, 120, Luma([255]));
        for i in 20..100 {
            for t in 0..4 {
                gray.put_pixel(i, 20 + t, Luma([0]));
                gray.put_pixel(i, 96 + t, Luma([0]));
                gray.put_pixel(20 + t, i, Luma([0]));
                gray.put_pixel(96 + t, i, Luma([0]));
            }
        }
        let config = SkeletonConfig {
            close_kernel: 1,
            dilate_iterations: 0,
            ..Default::default()
        };
        let mask = walkable_mask(&gray, &config);
        assert_eq!(mask.get_pixel(5, 5).0[0], BACKGROUND);
        assert_eq!(mask.get_pixel(60, 60).0[0], FOREGROUND);
    }
}
