// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Counts over a scan, its graph and a route, for reports and status lines

use std::fmt::Write as _;

use serde::{Deserialize, Serialize};
use wayplan_vision::FloorPlanDetections;

use crate::graph::{GraphMetadata, NavigationGraph};
use crate::pathfinder::PathResult;
use crate::points::select_navigation_points;

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ScanCounts {
    pub walls: usize,
    pub rooms: usize,
    pub doors: usize,
    pub hallways: usize,
    /// Straight pieces across all hallway polylines
    pub path_segments: usize,
    pub stairs: usize,
}

impl ScanCounts {
    pub fn of(detections: &FloorPlanDetections) -> Self {
        Self {
            walls: detections.walls.len(),
            rooms: detections.rooms.len(),
            doors: detections.doors.len(),
            hallways: detections.hallways.len(),
            path_segments: detections
                .hallways
                .iter()
                .map(|h| h.polyline.len().saturating_sub(1))
                .sum(),
            stairs: detections.stairs.len(),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct StartPointCounts {
    pub entrances: usize,
    pub staircases: usize,
    pub lifts: usize,
    pub corridors: usize,
    pub total: usize,
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct EndPointCounts {
    pub rooms: usize,
    pub offices: usize,
    pub facilities: usize,
    pub total: usize,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct PathSummary {
    pub found: bool,
    pub node_count: usize,
    pub length: f64,
    pub step_count: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl PathSummary {
    pub fn of(result: &PathResult) -> Self {
        let step_count = match &result.directions {
            Some(steps) => steps.len(),
            None => result.path.len().saturating_sub(1),
        };
        Self {
            found: result.found,
            node_count: result.node_count,
            length: result.total_distance,
            step_count: if result.found { step_count } else { 0 },
            start: result.path.first().cloned(),
            end: result.path.last().cloned(),
            error: result.reason.clone(),
        }
    }
}

/// Snapshot of a navigation graph, optionally with its scan and one route
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct NavigationSummary {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scan: Option<ScanCounts>,
    pub graph: GraphMetadata,
    pub start_points: StartPointCounts,
    pub end_points: EndPointCounts,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<PathSummary>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub warnings: Vec<String>,
}

impl NavigationGraph {
    /// Graph and point counts; attach a scan or route with the `with_` methods
    pub fn summary(&self) -> NavigationSummary {
        let points = select_navigation_points(self);
        NavigationSummary {
            scan: None,
            graph: self.metadata(),
            start_points: StartPointCounts {
                entrances: points.entrances.len(),
                staircases: points.staircases.len(),
                lifts: points.lifts.len(),
                corridors: points.corridors.len(),
                total: points.start_count(),
            },
            end_points: EndPointCounts {
                rooms: points.rooms.len(),
                offices: points.offices.len(),
                facilities: points.facilities.len(),
                total: points.end_count(),
            },
            path: None,
            warnings: points.warnings,
        }
    }
}

impl NavigationSummary {
    pub fn with_detections(mut self, detections: &FloorPlanDetections) -> Self {
        self.scan = Some(ScanCounts::of(detections));
        self
    }

    pub fn with_path(mut self, result: &PathResult) -> Self {
        self.path = Some(PathSummary::of(result));
        self
    }

    /// One status line, e.g. `4 rooms | 6 path segments | 9 start points | 5 end points`
    ///
    /// Room and segment counts come from the scan when one is attached,
    /// otherwise from the graph's room nodes and edges.
    pub fn compact(&self) -> String {
        let mut parts = match &self.scan {
            Some(scan) => vec![
                format!("{} rooms", scan.rooms),
                format!("{} path segments", scan.path_segments),
            ],
            None => vec![
                format!("{} rooms", self.graph.room_count),
                format!("{} edges", self.graph.edge_count),
            ],
        };
        parts.push(format!("{} start points", self.start_points.total));
        parts.push(format!("{} end points", self.end_points.total));
        if let Some(path) = &self.path {
            parts.push(if path.found {
                format!("Path: {} nodes, {:.1} units", path.node_count, path.length)
            } else {
                "Path: not found".to_string()
            });
        }
        parts.join(" | ")
    }

    /// Multi-line report
    pub fn to_text(&self) -> String {
        let mut out = String::from("Navigation summary\n");
        if let Some(scan) = &self.scan {
            let _ = writeln!(
                out,
                "  Scan: {} walls, {} rooms, {} doors, {} hallways ({} path segments), {} stairs",
                scan.walls, scan.rooms, scan.doors, scan.hallways, scan.path_segments, scan.stairs
            );
        }
        let _ = writeln!(
            out,
            "  Graph: {} nodes, {} edges, {} searchable",
            self.graph.node_count, self.graph.edge_count, self.graph.searchable_nodes
        );
        let s = &self.start_points;
        let _ = writeln!(
            out,
            "  Start points: {} ({} entrances, {} staircases, {} lifts, {} corridor points)",
            s.total, s.entrances, s.staircases, s.lifts, s.corridors
        );
        let e = &self.end_points;
        let _ = writeln!(
            out,
            "  End points: {} ({} rooms, {} offices, {} facilities)",
            e.total, e.rooms, e.offices, e.facilities
        );
        if let Some(path) = &self.path {
            if path.found {
                let _ = writeln!(
                    out,
                    "  Path: {} -> {}, {} nodes, {:.1} units, {} steps",
                    path.start.as_deref().unwrap_or("?"),
                    path.end.as_deref().unwrap_or("?"),
                    path.node_count,
                    path.length,
                    path.step_count
                );
            } else {
                let _ = writeln!(out, "  Path: not found ({})", path.error.as_deref().unwrap_or("unknown reason"));
            }
        }
        for warning in &self.warnings {
            let _ = writeln!(out, "  Warning: {}", warning);
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::{GraphNode, NodeType};
    use crate::pathfinder::{find_path, Algorithm};
    use wayplan_vision::{Hallway, Orientation, Point2D};

    fn wing() -> NavigationGraph {
        let mut g = NavigationGraph::new();
        let nodes = [
            ("room_1", NodeType::Room, "Office", 0.0),
            ("door_1", NodeType::Door, "door_1", 30.0),
            ("hallway_1_0", NodeType::Hallway, "Hallway", 60.0),
            ("stair_1", NodeType::Stair, "Staircase", 90.0),
            ("room_2", NodeType::Room, "Library", 120.0),
        ];
        for (id, kind, name, x) in nodes {
            g.add_node(GraphNode::new(id, kind, Point2D::new(x, 0.0)).with_name(name)).unwrap();
        }
        for (i, pair) in nodes.windows(2).enumerate() {
            g.connect(format!("e{}", i), pair[0].0, pair[1].0).unwrap();
        }
        g
    }

    #[test]
    fn graph_only_summary() {
        let summary = wing().summary();
        assert_eq!(summary.graph.node_count, 5);
        assert_eq!(summary.graph.edge_count, 4);
        assert_eq!(summary.start_points.staircases, 1);
        assert_eq!(summary.start_points.corridors, 1);
        assert_eq!(summary.start_points.total, 2);
        assert_eq!(summary.end_points.offices, 1);
        assert_eq!(summary.end_points.facilities, 1);
        assert_eq!(summary.end_points.total, 4);
        assert!(summary.warnings.is_empty());
        assert_eq!(summary.compact(), "2 rooms | 4 edges | 2 start points | 4 end points");
    }

    #[test]
    fn scan_and_route_are_reported() {
        let g = wing();
        let mut det = FloorPlanDetections::new(200, 100);
        det.hallways.push(Hallway {
            id: "hallway_h_1".into(),
            polyline: vec![Point2D::new(0.0, 50.0), Point2D::new(100.0, 50.0), Point2D::new(150.0, 50.0)],
            orientation: Orientation::Horizontal,
        });
        let route = find_path(&g, "room_1", "room_2", Algorithm::AStar).with_directions();
        let summary = g.summary().with_detections(&det).with_path(&route);

        assert_eq!(summary.scan.map(|s| s.path_segments), Some(2));
        let path = summary.path.clone().unwrap();
        assert_eq!(path.node_count, 5);
        assert_eq!(path.step_count, 5);
        assert_eq!(path.start.as_deref(), Some("room_1"));
        assert_eq!(
            summary.compact(),
            "0 rooms | 2 path segments | 2 start points | 4 end points | Path: 5 nodes, 120.0 units"
        );
        let text = summary.to_text();
        assert!(text.contains("Path: room_1 -> room_2, 5 nodes, 120.0 units, 5 steps"));
        assert!(text.contains("1 hallways (2 path segments)"));
    }

    #[test]
    fn failed_route_and_isolated_rooms() {
        let mut g = wing();
        g.add_node(GraphNode::new("room_9", NodeType::Room, Point2D::new(500.0, 0.0)).with_name("Gym"))
            .unwrap();
        let route = find_path(&g, "room_1", "room_9", Algorithm::Dijkstra);
        let summary = g.summary().with_path(&route);
        assert!(summary.compact().ends_with("Path: not found"));
        assert_eq!(summary.warnings.len(), 1);
        let text = summary.to_text();
        assert!(text.contains("Path: not found (no path exists from room_1 to room_9)"));
        assert!(text.contains("Warning: Gym (room_9) has no connections"));
        let json = serde_json::to_value(&summary).unwrap();
        assert_eq!(json["endPoints"]["facilities"], 2);
        assert_eq!(json["path"]["found"], false);
    }
}
