// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Turn-by-turn phrasing of a path result

use wayplan_vision::Point2D;

use crate::graph::NodeType;
use crate::pathfinder::PathResult;

/// Dominant screen-space direction of a move
pub fn screen_direction(from: &Point2D, to: &Point2D) -> &'static str {
    let dx = to.x - from.x;
    let dy = to.y - from.y;
    if dx.abs() > dy.abs() {
        if dx > 0.0 {
            "right"
        } else {
            "left"
        }
    } else if dy > 0.0 {
        "down"
    } else {
        "up"
    }
}

/// Human-readable steps for a path result
pub fn get_directions(result: &PathResult) -> Vec<String> {
    if !result.found {
        return vec!["No path found.".to_string()];
    }
    let nodes = &result.path_nodes;
    if nodes.len() < 2 {
        return vec!["You are already at your destination.".to_string()];
    }

    let mut steps = Vec::with_capacity(nodes.len());
    steps.push(format!("Starting from: {}", nodes[0].display_name()));

    let last = nodes.len() - 1;
    for (i, pair) in nodes.windows(2).enumerate() {
        let (prev, node) = (&pair[0], &pair[1]);
        let direction = screen_direction(&prev.position, &node.position);
        let step = match node.node_type {
            NodeType::Door => "Go through the door".to_string(),
            NodeType::Stair => format!("Take the stairs at {}", node.display_name()),
            NodeType::Hallway => format!("Continue {} along the hallway", direction),
            NodeType::Room if i + 1 == last => format!("Arrive at: {}", node.display_name()),
            NodeType::Room => format!("Pass by {}", node.display_name()),
            NodeType::Junction | NodeType::PathPoint => format!("Continue {}", direction),
        };
        steps.push(step);
    }
    steps
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::GraphNode;

    fn node(id: &str, t: NodeType, x: f64, y: f64) -> GraphNode {
        GraphNode::new(id, t, Point2D::new(x, y))
    }

    fn found(nodes: Vec<GraphNode>) -> PathResult {
        PathResult {
            found: true,
            path: nodes.iter().map(|n| n.id.clone()).collect(),
            node_count: nodes.len(),
            path_nodes: nodes,
            ..Default::default()
        }
    }

    #[test]
    fn directions_follow_node_types() {
        let result = found(vec![
            node("room_1", NodeType::Room, 0.0, 0.0).with_name("Lab"),
            node("door_1", NodeType::Door, 0.0, 50.0),
            node("hall_wp_0", NodeType::Hallway, 100.0, 60.0),
            node("room_2", NodeType::Room, 100.0, 0.0).with_name("Kitchen"),
            node("node_3", NodeType::PathPoint, 60.0, 0.0),
            node("stair_1", NodeType::Stair, 60.0, 30.0).with_name("Staircase"),
            node("room_3", NodeType::Room, 60.0, 90.0).with_name("Office"),
        ]);
        assert_eq!(
            get_directions(&result),
            vec![
                "Starting from: Lab",
                "Go through the door",
                "Continue right along the hallway",
                "Pass by Kitchen",
                "Continue left",
                "Take the stairs at Staircase",
                "Arrive at: Office",
            ]
        );
    }

    #[test]
    fn degenerate_results() {
        assert_eq!(get_directions(&PathResult::failure("x")), vec!["No path found."]);
        let single = found(vec![node("room_1", NodeType::Room, 0.0, 0.0)]);
        assert_eq!(get_directions(&single), vec!["You are already at your destination."]);
    }

    #[test]
    fn vertical_moves_win_ties() {
        let a = Point2D::new(0.0, 0.0);
        assert_eq!(screen_direction(&a, &Point2D::new(5.0, 5.0)), "down");
        assert_eq!(screen_direction(&a, &Point2D::new(5.0, -6.0)), "up");
        assert_eq!(screen_direction(&a, &Point2D::new(-9.0, 1.0)), "left");
    }
}
