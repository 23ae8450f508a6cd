// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Navigation graph model
//!
//! Nodes and edges are kept in insertion order (search ranking breaks ties
//! by node order) with an id→index map for lookups.

use rustc_hash::{FxHashMap, FxHashSet};
use serde::{Deserialize, Serialize};
use wayplan_vision::{BoundingBox, Point2D};

use crate::error::{Error, Result};

/// Kind of a navigation node
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum NodeType {
    Room,
    Door,
    Hallway,
    Stair,
    Junction,
    PathPoint,
}

impl NodeType {
    /// Whether the node is a walkway waypoint rather than a destination
    pub fn is_walkway(&self) -> bool {
        matches!(self, NodeType::Hallway | NodeType::Junction | NodeType::PathPoint)
    }
}

fn default_true() -> bool {
    true
}

fn default_distance() -> f64 {
    1.0
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct GraphNode {
    pub id: String,
    #[serde(rename = "type")]
    pub node_type: NodeType,
    pub position: Point2D,
    /// Eligible for name lookup
    #[serde(default = "default_true")]
    pub searchable: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bbox: Option<BoundingBox>,
}

impl GraphNode {
    pub fn new(id: impl Into<String>, node_type: NodeType, position: Point2D) -> Self {
        Self {
            id: id.into(),
            node_type,
            position,
            searchable: matches!(node_type, NodeType::Room | NodeType::Stair),
            name: None,
            bbox: None,
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn with_bbox(mut self, bbox: BoundingBox) -> Self {
        self.bbox = Some(bbox);
        self
    }

    /// Name for display, falling back to the id
    pub fn display_name(&self) -> &str {
        self.name.as_deref().unwrap_or(&self.id)
    }
}

/// What an edge connects
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum EdgeType {
    DoorConnection,
    RoomToRoom,
    Corridor,
    #[default]
    Connection,
}

impl EdgeType {
    pub fn between(a: NodeType, b: NodeType) -> Self {
        if a == NodeType::Door || b == NodeType::Door {
            EdgeType::DoorConnection
        } else if a == NodeType::Room && b == NodeType::Room {
            EdgeType::RoomToRoom
        } else if a.is_walkway() || b.is_walkway() {
            EdgeType::Corridor
        } else {
            EdgeType::Connection
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct GraphEdge {
    pub id: String,
    pub from: String,
    pub to: String,
    #[serde(default = "default_distance")]
    pub distance: f64,
    #[serde(default = "default_true")]
    pub bidirectional: bool,
    #[serde(rename = "type", default)]
    pub edge_type: EdgeType,
}

impl GraphEdge {
    /// Unordered endpoint pair, used for duplicate detection
    pub fn pair_key(&self) -> (String, String) {
        pair_key(&self.from, &self.to)
    }
}

fn pair_key(a: &str, b: &str) -> (String, String) {
    if a <= b {
        (a.to_string(), b.to_string())
    } else {
        (b.to_string(), a.to_string())
    }
}

/// Summary counts written alongside the graph
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "camelCase")]
pub struct GraphMetadata {
    pub node_count: usize,
    pub edge_count: usize,
    pub room_count: usize,
    pub door_count: usize,
    pub searchable_nodes: usize,
}

#[derive(Serialize)]
struct GraphDocumentRef<'a> {
    nodes: &'a [GraphNode],
    edges: &'a [GraphEdge],
    metadata: GraphMetadata,
}

#[derive(Deserialize)]
struct GraphDocument {
    #[serde(default)]
    nodes: Vec<GraphNode>,
    #[serde(default)]
    edges: Vec<GraphEdge>,
}

/// A routable graph of rooms, doors, walkway points and stairs
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NavigationGraph {
    nodes: Vec<GraphNode>,
    edges: Vec<GraphEdge>,
    index: FxHashMap<String, usize>,
}

impl NavigationGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Assemble a graph from loose parts
    ///
    /// Node ids must be unique. Edges are kept as given, including ones that
    /// reference unknown nodes; the pathfinder ignores those.
    pub fn from_parts(nodes: Vec<GraphNode>, edges: Vec<GraphEdge>) -> Result<Self> {
        let mut graph = Self::new();
        for node in nodes {
            graph.add_node(node)?;
        }
        graph.edges = edges;
        Ok(graph)
    }

    pub fn add_node(&mut self, node: GraphNode) -> Result<()> {
        if self.index.contains_key(&node.id) {
            return Err(Error::DuplicateNode(node.id));
        }
        self.index.insert(node.id.clone(), self.nodes.len());
        self.nodes.push(node);
        Ok(())
    }

    pub fn add_edge(&mut self, edge: GraphEdge) -> Result<()> {
        for id in [&edge.from, &edge.to] {
            if !self.index.contains_key(id) {
                return Err(Error::UnknownNode(id.clone()));
            }
        }
        self.edges.push(edge);
        Ok(())
    }

    /// Add a bidirectional edge weighted by the Euclidean distance of its ends
    pub fn connect(&mut self, id: impl Into<String>, from: &str, to: &str) -> Result<()> {
        let a = self.node(from).ok_or_else(|| Error::UnknownNode(from.to_string()))?;
        let b = self.node(to).ok_or_else(|| Error::UnknownNode(to.to_string()))?;
        let edge = GraphEdge {
            id: id.into(),
            from: from.to_string(),
            to: to.to_string(),
            distance: a.position.distance_to(&b.position),
            bidirectional: true,
            edge_type: EdgeType::between(a.node_type, b.node_type),
        };
        self.edges.push(edge);
        Ok(())
    }

    pub fn node(&self, id: &str) -> Option<&GraphNode> {
        self.index.get(id).map(|&i| &self.nodes[i])
    }

    pub fn node_index(&self, id: &str) -> Option<usize> {
        self.index.get(id).copied()
    }

    pub fn contains(&self, id: &str) -> bool {
        self.index.contains_key(id)
    }

    pub fn nodes(&self) -> &[GraphNode] {
        &self.nodes
    }

    pub fn edges(&self) -> &[GraphEdge] {
        &self.edges
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }

    pub fn has_edge_between(&self, a: &str, b: &str) -> bool {
        let key = pair_key(a, b);
        self.edges.iter().any(|e| e.pair_key() == key)
    }

    /// Keep the first edge per unordered endpoint pair. Returns the number removed.
    pub fn remove_duplicate_edges(&mut self) -> usize {
        let before = self.edges.len();
        let mut seen: FxHashSet<(String, String)> = FxHashSet::default();
        self.edges.retain(|e| seen.insert(e.pair_key()));
        before - self.edges.len()
    }

    pub fn metadata(&self) -> GraphMetadata {
        let count = |t: NodeType| self.nodes.iter().filter(|n| n.node_type == t).count();
        GraphMetadata {
            node_count: self.nodes.len(),
            edge_count: self.edges.len(),
            room_count: count(NodeType::Room),
            door_count: count(NodeType::Door),
            searchable_nodes: self.nodes.iter().filter(|n| n.searchable).count(),
        }
    }

    pub fn from_json(json: &str) -> Result<Self> {
        let doc: GraphDocument = serde_json::from_str(json)?;
        Self::from_parts(doc.nodes, doc.edges)
    }

    pub fn to_json_pretty(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

impl Serialize for NavigationGraph {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        GraphDocumentRef {
            nodes: &self.nodes,
            edges: &self.edges,
            metadata: self.metadata(),
        }
        .serialize(serializer)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn small_graph() -> NavigationGraph {
        let mut g = NavigationGraph::new();
        g.add_node(GraphNode::new("room_1", NodeType::Room, Point2D::new(0.0, 0.0)).with_name("Lab"))
            .unwrap();
        g.add_node(GraphNode::new("door_1", NodeType::Door, Point2D::new(30.0, 40.0))).unwrap();
        g.add_node(GraphNode::new("hall_wp_0", NodeType::Hallway, Point2D::new(30.0, 100.0)))
            .unwrap();
        g
    }

    #[test]
    fn duplicate_and_dangling_ids_are_rejected() {
        let mut g = small_graph();
        assert!(matches!(
            g.add_node(GraphNode::new("door_1", NodeType::Door, Point2D::new(1.0, 1.0))),
            Err(Error::DuplicateNode(_))
        ));
        assert!(matches!(g.connect("e", "room_1", "nowhere"), Err(Error::UnknownNode(_))));
    }

    #[test]
    fn connect_uses_euclidean_distance_and_types() {
        let mut g = small_graph();
        g.connect("e1", "room_1", "door_1").unwrap();
        g.connect("e2", "door_1", "hall_wp_0").unwrap();
        assert_relative_eq!(g.edges()[0].distance, 50.0);
        assert_eq!(g.edges()[0].edge_type, EdgeType::DoorConnection);
        assert_eq!(EdgeType::between(NodeType::Room, NodeType::Room), EdgeType::RoomToRoom);
        assert_eq!(EdgeType::between(NodeType::Stair, NodeType::PathPoint), EdgeType::Corridor);
        assert_eq!(EdgeType::between(NodeType::Stair, NodeType::Room), EdgeType::Connection);
    }

    #[test]
    fn duplicate_edges_keep_the_first() {
        let mut g = small_graph();
        g.connect("a", "room_1", "door_1").unwrap();
        g.connect("b", "door_1", "room_1").unwrap();
        g.connect("c", "door_1", "hall_wp_0").unwrap();
        assert_eq!(g.remove_duplicate_edges(), 1);
        let ids: Vec<&str> = g.edges().iter().map(|e| e.id.as_str()).collect();
        assert_eq!(ids, vec!["a", "c"]);
    }

    #[test]
    fn json_uses_type_key_and_camel_case_metadata() {
        let mut g = small_graph();
        g.connect("e1", "room_1", "door_1").unwrap();
        let json = g.to_json_pretty().unwrap();
        assert!(json.contains("\"type\": \"room\""));
        assert!(json.contains("\"searchableNodes\": 1"));
        assert!(json.contains("\"type\": \"door_connection\""));

        let back = NavigationGraph::from_json(&json).unwrap();
        assert_eq!(back, g);
    }

    #[test]
    fn loose_json_gets_defaults() {
        let json = r#"{
            "nodes": [
                {"id": "a", "type": "room", "position": {"x": 0, "y": 0}},
                {"id": "b", "type": "path_point", "position": {"x": 3, "y": 4}, "searchable": false}
            ],
            "edges": [{"id": "e", "from": "a", "to": "b"}]
        }"#;
        let g = NavigationGraph::from_json(json).unwrap();
        assert!(g.node("a").unwrap().searchable);
        assert_eq!(g.node("a").unwrap().display_name(), "a");
        assert_relative_eq!(g.edges()[0].distance, 1.0);
        assert!(g.edges()[0].bidirectional);
        assert_eq!(g.metadata().searchable_nodes, 1);
    }
}
