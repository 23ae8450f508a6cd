// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Case-insensitive name lookup over searchable nodes

use crate::graph::{GraphNode, NavigationGraph};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
enum MatchRank {
    Exact,
    Prefix,
    Substring,
}

fn rank(node: &GraphNode, query: &str) -> Option<MatchRank> {
    let id = node.id.to_lowercase();
    let name = node.name.as_deref().unwrap_or_default().to_lowercase();
    if name == query || id == query {
        Some(MatchRank::Exact)
    } else if name.starts_with(query) || id.starts_with(query) {
        Some(MatchRank::Prefix)
    } else if name.contains(query) || id.contains(query) {
        Some(MatchRank::Substring)
    } else {
        None
    }
}

/// Searchable nodes matching `query` on id or name
///
/// Exact matches rank above prefix matches, which rank above substring
/// matches. Equal ranks keep graph order. A blank query matches nothing.
pub fn search_by_name<'g>(graph: &'g NavigationGraph, query: &str) -> Vec<&'g GraphNode> {
    let query = query.trim().to_lowercase();
    if query.is_empty() {
        return Vec::new();
    }
    let mut matches: Vec<(MatchRank, &GraphNode)> = graph
        .nodes()
        .iter()
        .filter(|n| n.searchable)
        .filter_map(|n| rank(n, &query).map(|r| (r, n)))
        .collect();
    // stable: ties keep node order
    matches.sort_by_key(|(r, _)| *r);
    matches.into_iter().map(|(_, n)| n).collect()
}

pub fn search_limited<'g>(graph: &'g NavigationGraph, query: &str, limit: usize) -> Vec<&'g GraphNode> {
    let mut matches = search_by_name(graph, query);
    matches.truncate(limit);
    matches
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::NodeType;
    use wayplan_vision::Point2D;

    fn directory() -> NavigationGraph {
        let mut g = NavigationGraph::new();
        let rooms = [
            ("room_1", "Chemistry Lab"),
            ("room_2", "Lab"),
            ("room_3", "Lab B"),
            ("room_4", "Office"),
        ];
        for (i, (id, name)) in rooms.iter().enumerate() {
            g.add_node(GraphNode::new(*id, NodeType::Room, Point2D::new(i as f64 * 10.0, 0.0)).with_name(*name))
                .unwrap();
        }
        g.add_node(GraphNode::new("door_lab", NodeType::Door, Point2D::new(5.0, 5.0)).with_name("Lab door"))
            .unwrap();
        g
    }

    fn ids(nodes: Vec<&GraphNode>) -> Vec<&str> {
        nodes.into_iter().map(|n| n.id.as_str()).collect()
    }

    #[test]
    fn ranks_exact_then_prefix_then_substring() {
        let g = directory();
        assert_eq!(ids(search_by_name(&g, "lab")), vec!["room_2", "room_3", "room_1"]);
    }

    #[test]
    fn ids_match_and_case_is_ignored() {
        let g = directory();
        assert_eq!(ids(search_by_name(&g, "ROOM_4")), vec!["room_4"]);
        assert_eq!(ids(search_by_name(&g, "  office ")), vec!["room_4"]);
    }

    #[test]
    fn structural_nodes_are_not_searchable() {
        let g = directory();
        assert!(search_by_name(&g, "lab door").is_empty());
        assert!(search_by_name(&g, "").is_empty());
    }

    #[test]
    fn limited_search_truncates() {
        let g = directory();
        assert_eq!(ids(search_limited(&g, "room", 2)), vec!["room_1", "room_2"]);
    }
}
