// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Fuse detections (or a skeleton) into one navigation graph
//!
//! Assembly order:
//! 1. door nodes at their hinges
//! 2. room nodes, each linked to its nearest door inside the expanded bbox
//! 3. hallway waypoints linked along their polyline
//! 4. stair nodes
//! 5. door, waypoint and stair nodes closer than the connect distance linked
//!    pairwise
//!
//! No edge is ever added through a wall while wall rejection is on: a wall
//! blocks a link when it crosses it, touches its interior with an endpoint
//! (corners and junctions) or runs along it.

use rustc_hash::FxHashSet;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};
use wayplan_vision::{
    line_of_sight_blocked, FloorPlanDetections, Point2D, SkeletonGraph, SkeletonNodeKind, Wall,
};

use crate::graph::{EdgeType, GraphEdge, GraphNode, NavigationGraph, NodeType};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GraphBuilderConfig {
    /// Margin added around a room's bbox when looking for its door
    pub room_door_margin: f64,
    /// Maximum length of an automatic door/waypoint/stair link
    pub connect_distance: f64,
    /// Refuse edges whose segment crosses a wall
    pub reject_wall_crossings: bool,
}

impl Default for GraphBuilderConfig {
    fn default() -> Self {
        Self {
            room_door_margin: 50.0,
            connect_distance: 300.0,
            reject_wall_crossings: true,
        }
    }
}

/// Graph under construction plus the bookkeeping the rules need
struct Assembly<'a> {
    graph: NavigationGraph,
    walls: &'a [Wall],
    reject_wall_crossings: bool,
    pairs: FxHashSet<(usize, usize)>,
}

impl<'a> Assembly<'a> {
    fn new(walls: &'a [Wall], reject_wall_crossings: bool) -> Self {
        Self {
            graph: NavigationGraph::new(),
            walls,
            reject_wall_crossings,
            pairs: FxHashSet::default(),
        }
    }

    /// Add a node unless its position is unusable or its id is taken
    fn add_node(&mut self, node: GraphNode) -> bool {
        if !node.position.is_finite() {
            warn!(id = %node.id, "skipping node with non-finite position");
            return false;
        }
        let id = node.id.clone();
        match self.graph.add_node(node) {
            Ok(()) => true,
            Err(err) => {
                warn!(id = %id, error = %err, "skipping node");
                false
            }
        }
    }

    fn crosses_wall(&self, a: &Point2D, b: &Point2D) -> bool {
        self.reject_wall_crossings
            && self
                .walls
                .iter()
                .any(|w| line_of_sight_blocked(a, b, &w.start, &w.end))
    }

    fn can_link(&self, a: usize, b: usize) -> bool {
        let nodes = self.graph.nodes();
        a != b
            && !self.pairs.contains(&(a.min(b), a.max(b)))
            && !self.crosses_wall(&nodes[a].position, &nodes[b].position)
    }

    /// Link two nodes by index. Returns false when the rules forbid the edge.
    fn link(&mut self, a: usize, b: usize) -> bool {
        if !self.can_link(a, b) {
            return false;
        }
        let (from, to) = {
            let nodes = self.graph.nodes();
            (nodes[a].id.clone(), nodes[b].id.clone())
        };
        let id = format!("edge_{}_{}", from, to);
        if self.graph.connect(id, &from, &to).is_err() {
            return false;
        }
        self.pairs.insert((a.min(b), a.max(b)));
        true
    }

    fn index_of(&self, id: &str) -> Option<usize> {
        self.graph.node_index(id)
    }
}

/// Builds navigation graphs from detection documents or skeletons
#[derive(Debug, Clone, Default)]
pub struct GraphBuilder {
    config: GraphBuilderConfig,
}

impl GraphBuilder {
    pub fn new(config: GraphBuilderConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &GraphBuilderConfig {
        &self.config
    }

    /// Assemble the navigation graph of a detection document
    pub fn build(&self, detections: &FloorPlanDetections) -> NavigationGraph {
        let mut asm = Assembly::new(&detections.walls, self.config.reject_wall_crossings);
        let mut connectable: Vec<usize> = Vec::new();

        for door in &detections.doors {
            let node = GraphNode::new(door.id.clone(), NodeType::Door, door.hinge).with_name(door.id.clone());
            if asm.add_node(node) {
                connectable.extend(asm.index_of(&door.id));
            }
        }
        let doors = connectable.clone();

        let mut room_links = 0;
        for room in &detections.rooms {
            let node = GraphNode::new(room.id.clone(), NodeType::Room, room.center)
                .with_name(room.name.clone())
                .with_bbox(room.bbox);
            if !asm.add_node(node) {
                continue;
            }
            let Some(room_idx) = asm.index_of(&room.id) else { continue };
            let zone = room.bbox.expanded(self.config.room_door_margin);

            let nearest = doors
                .iter()
                .copied()
                .filter(|&d| zone.contains(&asm.graph.nodes()[d].position))
                .filter(|&d| asm.can_link(room_idx, d))
                .min_by(|&a, &b| {
                    let nodes = asm.graph.nodes();
                    let da = nodes[a].position.distance_to(&room.center);
                    let db = nodes[b].position.distance_to(&room.center);
                    da.total_cmp(&db)
                });
            if let Some(door_idx) = nearest {
                if asm.link(room_idx, door_idx) {
                    room_links += 1;
                }
            } else {
                debug!(room = %room.id, "room has no reachable door");
            }
        }

        for hallway in &detections.hallways {
            let mut previous: Option<usize> = None;
            for (i, p) in hallway.polyline.iter().enumerate() {
                let id = format!("{}_wp_{}", hallway.id, i);
                let node = GraphNode::new(id.clone(), NodeType::Hallway, *p).with_name("Hallway");
                if !asm.add_node(node) {
                    continue;
                }
                let Some(idx) = asm.index_of(&id) else { continue };
                if let Some(prev) = previous {
                    if !asm.link(prev, idx) {
                        debug!(hallway = %hallway.id, waypoint = i, "hallway link blocked");
                    }
                }
                connectable.push(idx);
                previous = Some(idx);
            }
        }

        for stair in &detections.stairs {
            let node = GraphNode::new(stair.id.clone(), NodeType::Stair, stair.bbox.center())
                .with_name("Staircase")
                .with_bbox(stair.bbox);
            if asm.add_node(node) {
                connectable.extend(asm.index_of(&stair.id));
            }
        }

        let mut auto_links = 0;
        for (n, &a) in connectable.iter().enumerate() {
            for &b in &connectable[n + 1..] {
                let distance = {
                    let nodes = asm.graph.nodes();
                    nodes[a].position.distance_to(&nodes[b].position)
                };
                if distance < self.config.connect_distance && asm.link(a, b) {
                    auto_links += 1;
                }
            }
        }

        let graph = asm.graph;
        debug!(
            nodes = graph.node_count(),
            edges = graph.edge_count(),
            room_links,
            auto_links,
            "navigation graph assembled"
        );
        graph
    }

    /// Rebuild from a user-edited detection document
    pub fn rebuild(&self, detections: &FloorPlanDetections) -> NavigationGraph {
        self.build(detections)
    }

    /// Convert a skeleton graph directly
    ///
    /// Skeleton paths lie inside walkable space, so no wall test is applied.
    pub fn build_from_skeleton(&self, skeleton: &SkeletonGraph) -> NavigationGraph {
        let mut asm = Assembly::new(&[], false);
        for node in &skeleton.nodes {
            let node_type = match node.kind {
                SkeletonNodeKind::Junction => NodeType::Junction,
                SkeletonNodeKind::PathPoint => NodeType::PathPoint,
            };
            asm.add_node(GraphNode::new(node.id.clone(), node_type, node.position));
        }

        let mut graph = asm.graph;
        for edge in &skeleton.edges {
            if !edge.distance.is_finite() {
                warn!(id = %edge.id, "skipping skeleton edge with non-finite distance");
                continue;
            }
            let edge = GraphEdge {
                id: edge.id.clone(),
                from: edge.from.clone(),
                to: edge.to.clone(),
                distance: edge.distance,
                bidirectional: true,
                edge_type: EdgeType::Corridor,
            };
            if let Err(err) = graph.add_edge(edge) {
                warn!(error = %err, "skipping skeleton edge");
            }
        }
        graph.remove_duplicate_edges();
        debug!(
            nodes = graph.node_count(),
            edges = graph.edge_count(),
            "skeleton graph converted"
        );
        graph
    }
}
