// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Start and destination points offered to a route picker
//!
//! Entrances, staircases, lifts and corridor waypoints are start points.
//! Rooms are destinations; offices and facilities are the rooms whose names
//! say so. A node can land in more than one list (a room named "Lift Lobby"
//! is both a lift and a room).

use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};
use tracing::debug;
use wayplan_vision::Point2D;

use crate::graph::{GraphNode, NavigationGraph, NodeType};

/// Role a node plays in the point picker
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum PointKind {
    Entrance,
    Staircase,
    Lift,
    Corridor,
    Room,
    Office,
    Facility,
}

impl PointKind {
    pub fn is_start(&self) -> bool {
        matches!(
            self,
            PointKind::Entrance | PointKind::Staircase | PointKind::Lift | PointKind::Corridor
        )
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum FacilityKind {
    Washroom,
    Lab,
    Cafe,
    Library,
    Gym,
}

const FACILITY_WORDS: &[(&str, FacilityKind)] = &[
    ("washroom", FacilityKind::Washroom),
    ("restroom", FacilityKind::Washroom),
    ("lab", FacilityKind::Lab),
    ("laboratory", FacilityKind::Lab),
    ("cafe", FacilityKind::Cafe),
    ("cafeteria", FacilityKind::Cafe),
    ("library", FacilityKind::Library),
    ("gym", FacilityKind::Gym),
    ("gymnasium", FacilityKind::Gym),
];

const ENTRANCE_WORDS: &[&str] = &["entrance", "exit", "entry"];
const LIFT_WORDS: &[&str] = &["lift", "elevator"];

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct NavigationPoint {
    pub node_id: String,
    pub label: String,
    pub kind: PointKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub facility: Option<FacilityKind>,
    pub position: Point2D,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub floor: Option<u32>,
    /// Number of edges touching the node
    pub connections: usize,
}

/// Every selectable point of a graph, grouped by kind
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct NavigationPoints {
    pub entrances: Vec<NavigationPoint>,
    pub staircases: Vec<NavigationPoint>,
    pub lifts: Vec<NavigationPoint>,
    pub corridors: Vec<NavigationPoint>,
    pub rooms: Vec<NavigationPoint>,
    pub offices: Vec<NavigationPoint>,
    pub facilities: Vec<NavigationPoint>,
    /// Points that no edge reaches
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub warnings: Vec<String>,
}

impl NavigationPoints {
    pub fn start_points(&self) -> impl Iterator<Item = &NavigationPoint> {
        self.entrances
            .iter()
            .chain(&self.staircases)
            .chain(&self.lifts)
            .chain(&self.corridors)
    }

    pub fn end_points(&self) -> impl Iterator<Item = &NavigationPoint> {
        self.rooms.iter().chain(&self.offices).chain(&self.facilities)
    }

    pub fn start_count(&self) -> usize {
        self.entrances.len() + self.staircases.len() + self.lifts.len() + self.corridors.len()
    }

    pub fn end_count(&self) -> usize {
        self.rooms.len() + self.offices.len() + self.facilities.len()
    }

    /// First point whose node id equals `query`, else whose label matches it
    /// case-insensitively. Start points are searched before end points.
    pub fn find(&self, query: &str) -> Option<&NavigationPoint> {
        let query = query.trim();
        if query.is_empty() {
            return None;
        }
        let all = || self.start_points().chain(self.end_points());
        all()
            .find(|p| p.node_id == query)
            .or_else(|| all().find(|p| p.label.eq_ignore_ascii_case(query)))
    }

    fn push(&mut self, point: NavigationPoint) {
        let list = match point.kind {
            PointKind::Entrance => &mut self.entrances,
            PointKind::Staircase => &mut self.staircases,
            PointKind::Lift => &mut self.lifts,
            PointKind::Corridor => &mut self.corridors,
            PointKind::Room => &mut self.rooms,
            PointKind::Office => &mut self.offices,
            PointKind::Facility => &mut self.facilities,
        };
        list.push(point);
    }
}

fn words(text: &str) -> Vec<String> {
    text.split(|c: char| !c.is_ascii_alphanumeric())
        .filter(|w| !w.is_empty())
        .map(str::to_ascii_lowercase)
        .collect()
}

fn has_any(words: &[String], wanted: &[&str]) -> bool {
    words.iter().any(|w| wanted.contains(&w.as_str()))
}

/// Facility type named by a room label, if any
pub fn facility_kind(label: &str) -> Option<FacilityKind> {
    let words = words(label);
    FACILITY_WORDS
        .iter()
        .find(|(word, _)| words.iter().any(|w| w == word))
        .map(|(_, kind)| *kind)
}

/// Floor number embedded in a label or id (`floor_2`, `Level-3`, `F1`)
///
/// The leftmost `floor`, `level` or `f` that is followed by digits wins,
/// with at most one `_` or `-` in between.
pub fn floor_level(text: &str) -> Option<u32> {
    let lower = text.to_ascii_lowercase();
    let bytes = lower.as_bytes();
    for start in 0..bytes.len() {
        for prefix in ["floor", "level", "f"] {
            if !bytes[start..].starts_with(prefix.as_bytes()) {
                continue;
            }
            let mut i = start + prefix.len();
            if matches!(bytes.get(i), Some(b'_') | Some(b'-')) {
                i += 1;
            }
            let digits = bytes[i..].iter().take_while(|b| b.is_ascii_digit()).count();
            if digits > 0 {
                if let Ok(level) = lower[i..i + digits].parse() {
                    return Some(level);
                }
            }
        }
    }
    None
}

fn point(node: &GraphNode, kind: PointKind, connections: usize) -> NavigationPoint {
    let label = node.display_name().to_string();
    NavigationPoint {
        node_id: node.id.clone(),
        facility: if kind == PointKind::Facility { facility_kind(&label) } else { None },
        floor: floor_level(&label).or_else(|| floor_level(&node.id)),
        label,
        kind,
        position: node.position,
        connections,
    }
}

/// Group a graph's nodes into start and destination points
///
/// Points with no edge at all are kept but reported in `warnings`, since a
/// route to or from them can never be found.
pub fn select_navigation_points(graph: &NavigationGraph) -> NavigationPoints {
    let mut degree: FxHashMap<&str, usize> = FxHashMap::default();
    for edge in graph.edges() {
        *degree.entry(edge.from.as_str()).or_default() += 1;
        *degree.entry(edge.to.as_str()).or_default() += 1;
    }

    let mut points = NavigationPoints::default();
    for node in graph.nodes() {
        let connections = degree.get(node.id.as_str()).copied().unwrap_or(0);
        let mut kinds = Vec::new();
        let named = words(node.display_name());
        let id_words = words(&node.id);

        if has_any(&named, ENTRANCE_WORDS) || has_any(&id_words, ENTRANCE_WORDS) {
            kinds.push(PointKind::Entrance);
        }
        if has_any(&named, LIFT_WORDS) || has_any(&id_words, LIFT_WORDS) {
            kinds.push(PointKind::Lift);
        }
        match node.node_type {
            NodeType::Stair => kinds.push(PointKind::Staircase),
            NodeType::Hallway => kinds.push(PointKind::Corridor),
            NodeType::Room => {
                kinds.push(PointKind::Room);
                if named.iter().any(|w| w == "office") {
                    kinds.push(PointKind::Office);
                }
                if facility_kind(node.display_name()).is_some() {
                    kinds.push(PointKind::Facility);
                }
            }
            NodeType::Door | NodeType::Junction | NodeType::PathPoint => {}
        }

        if !kinds.is_empty() && connections == 0 {
            points
                .warnings
                .push(format!("{} ({}) has no connections", node.display_name(), node.id));
        }
        for kind in kinds {
            points.push(point(node, kind, connections));
        }
    }

    debug!(
        start = points.start_count(),
        end = points.end_count(),
        isolated = points.warnings.len(),
        "navigation points selected"
    );
    points
}

#[cfg(test)]
mod tests {
    use super::*;

    fn campus() -> NavigationGraph {
        let mut g = NavigationGraph::new();
        let nodes = [
            ("door_main", NodeType::Door, "Main Entrance"),
            ("stair_1", NodeType::Stair, "Staircase"),
            ("hallway_1_0", NodeType::Hallway, "Hallway"),
            ("room_1", NodeType::Room, "Office 2.14"),
            ("room_2", NodeType::Room, "Chemistry Lab"),
            ("room_3", NodeType::Room, "Lift Lobby"),
            ("room_4", NodeType::Room, "Storage"),
            ("junction_1", NodeType::Junction, "Junction"),
        ];
        for (i, (id, kind, name)) in nodes.iter().enumerate() {
            g.add_node(GraphNode::new(*id, *kind, Point2D::new(i as f64 * 20.0, 0.0)).with_name(*name))
                .unwrap();
        }
        for (i, pair) in nodes[..6].windows(2).enumerate() {
            g.connect(format!("e{}", i), pair[0].0, pair[1].0).unwrap();
        }
        g
    }

    fn ids(points: &[NavigationPoint]) -> Vec<&str> {
        points.iter().map(|p| p.node_id.as_str()).collect()
    }

    #[test]
    fn nodes_are_grouped_by_role() {
        let points = select_navigation_points(&campus());
        assert_eq!(ids(&points.entrances), vec!["door_main"]);
        assert_eq!(ids(&points.staircases), vec!["stair_1"]);
        assert_eq!(ids(&points.lifts), vec!["room_3"]);
        assert_eq!(ids(&points.corridors), vec!["hallway_1_0"]);
        assert_eq!(ids(&points.rooms), vec!["room_1", "room_2", "room_3", "room_4"]);
        assert_eq!(ids(&points.offices), vec!["room_1"]);
        assert_eq!(ids(&points.facilities), vec!["room_2"]);
        assert_eq!(points.facilities[0].facility, Some(FacilityKind::Lab));
        assert_eq!(points.start_count(), 4);
        assert_eq!(points.end_count(), 6);
    }

    #[test]
    fn isolated_points_are_reported() {
        let points = select_navigation_points(&campus());
        assert_eq!(points.warnings, vec!["Storage (room_4) has no connections"]);
        assert_eq!(points.rooms[3].connections, 0);
        assert_eq!(points.rooms[1].connections, 2);
    }

    #[test]
    fn find_matches_id_then_label() {
        let points = select_navigation_points(&campus());
        assert_eq!(points.find("room_2").map(|p| p.kind), Some(PointKind::Room));
        assert_eq!(points.find("chemistry lab").map(|p| p.node_id.as_str()), Some("room_2"));
        assert_eq!(points.find("lift lobby").map(|p| p.kind), Some(PointKind::Lift));
        assert!(points.find("Gym").is_none());
        assert!(points.find("  ").is_none());
    }

    #[test]
    fn facility_words_match_whole_words() {
        assert_eq!(facility_kind("Men's Restroom"), Some(FacilityKind::Washroom));
        assert_eq!(facility_kind("CAFETERIA"), Some(FacilityKind::Cafe));
        assert_eq!(facility_kind("Label Printing"), None);
        assert_eq!(facility_kind("Gymnasium B"), Some(FacilityKind::Gym));
    }

    #[test]
    fn floor_levels_are_parsed() {
        assert_eq!(floor_level("floor_2"), Some(2));
        assert_eq!(floor_level("Level-3 Lobby"), Some(3));
        assert_eq!(floor_level("room_f12"), Some(12));
        assert_eq!(floor_level("Floor plan"), None);
        assert_eq!(floor_level("Office 214"), None);
    }
}
