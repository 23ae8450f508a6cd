// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Shortest paths over a navigation graph
//!
//! Dijkstra and A* share one best-first search; A* adds the Euclidean
//! distance to the goal as heuristic. Both keep a visited set and break
//! priority ties in insertion order.

use std::cmp::Ordering;
use std::collections::BinaryHeap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::directions::get_directions;
use crate::error::Error;
use crate::graph::{GraphNode, NavigationGraph};
use crate::search::search_by_name;

/// Number of suggestions attached to name-based results
const SUGGESTION_LIMIT: usize = 5;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Algorithm {
    #[default]
    AStar,
    Dijkstra,
}

impl Algorithm {
    /// Parse a user string; anything unrecognised selects A*
    pub fn parse(s: &str) -> Self {
        match s.trim().to_lowercase().as_str() {
            "dijkstra" => Algorithm::Dijkstra,
            _ => Algorithm::AStar,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Algorithm::AStar => "A*",
            Algorithm::Dijkstra => "Dijkstra",
        }
    }
}

impl FromStr for Algorithm {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Algorithm::parse(s))
    }
}

impl fmt::Display for Algorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Names of the best matches on each side of a name-based query
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct SearchResults {
    pub start: Vec<String>,
    pub end: Vec<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct PathResult {
    pub found: bool,
    pub path: Vec<String>,
    pub path_nodes: Vec<GraphNode>,
    pub total_distance: f64,
    pub node_count: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub algorithm: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub nodes_explored: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub directions: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub search_results: Option<SearchResults>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start_node: Option<GraphNode>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end_node: Option<GraphNode>,
}

/// Outcome of [`Pathfinder::validate_path`]
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct PathValidation {
    pub valid: bool,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub errors: Vec<String>,
}

impl PathResult {
    pub fn failure(reason: impl Into<String>) -> Self {
        Self {
            reason: Some(reason.into()),
            ..Default::default()
        }
    }

    /// Attach turn-by-turn directions
    pub fn with_directions(mut self) -> Self {
        self.directions = Some(get_directions(&self));
        self
    }
}

/// Queue entry ordered for a min-heap on `priority`, FIFO on ties
#[derive(Debug, Clone, Copy)]
struct SearchState {
    priority: f64,
    cost: f64,
    seq: u64,
    node: usize,
}

impl PartialEq for SearchState {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for SearchState {}

impl PartialOrd for SearchState {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for SearchState {
    fn cmp(&self, other: &Self) -> Ordering {
        // Reverse ordering for min-heap
        other
            .priority
            .total_cmp(&self.priority)
            .then_with(|| other.seq.cmp(&self.seq))
    }
}

struct SearchOutcome {
    /// Total cost and node indices of the path, if the goal was reached
    route: Option<(f64, Vec<usize>)>,
    explored: usize,
}

/// Adjacency view of a graph, built once and reused across queries
pub struct Pathfinder<'g> {
    graph: &'g NavigationGraph,
    adjacency: Vec<Vec<(usize, f64)>>,
}

impl<'g> Pathfinder<'g> {
    /// Index the graph's edges
    ///
    /// Edges are added in both directions unless marked one-way. Edges that
    /// reference unknown nodes or carry a negative or non-finite distance
    /// are ignored.
    pub fn new(graph: &'g NavigationGraph) -> Self {
        let mut adjacency = vec![Vec::new(); graph.node_count()];
        let mut ignored = 0;
        for edge in graph.edges() {
            let (Some(from), Some(to)) = (graph.node_index(&edge.from), graph.node_index(&edge.to)) else {
                ignored += 1;
                continue;
            };
            if !edge.distance.is_finite() || edge.distance < 0.0 {
                ignored += 1;
                continue;
            }
            adjacency[from].push((to, edge.distance));
            if edge.bidirectional {
                adjacency[to].push((from, edge.distance));
            }
        }
        if ignored > 0 {
            debug!(ignored, "edges left out of adjacency");
        }
        Self { graph, adjacency }
    }

    pub fn graph(&self) -> &'g NavigationGraph {
        self.graph
    }

    /// Shortest path between two node ids
    pub fn shortest_path(&self, start_id: &str, end_id: &str, algorithm: Algorithm) -> PathResult {
        let Some(start) = self.graph.node_index(start_id) else {
            return PathResult::failure(Error::UnknownNode(start_id.to_string()).to_string());
        };
        let Some(end) = self.graph.node_index(end_id) else {
            return PathResult::failure(Error::UnknownNode(end_id.to_string()).to_string());
        };

        let nodes = self.graph.nodes();
        let goal = nodes[end].position;
        let outcome = match algorithm {
            Algorithm::Dijkstra => self.search(start, end, |_| 0.0),
            Algorithm::AStar => self.search(start, end, |n| nodes[n].position.distance_to(&goal)),
        };

        debug!(
            algorithm = algorithm.label(),
            from = start_id,
            to = end_id,
            found = outcome.route.is_some(),
            explored = outcome.explored,
            "path search finished"
        );

        let mut result = match outcome.route {
            Some((cost, path)) => PathResult {
                found: true,
                path: path.iter().map(|&i| nodes[i].id.clone()).collect(),
                path_nodes: path.iter().map(|&i| nodes[i].clone()).collect(),
                total_distance: cost,
                node_count: path.len(),
                ..Default::default()
            },
            None => PathResult::failure(
                Error::NoPathExists {
                    from: start_id.to_string(),
                    to: end_id.to_string(),
                }
                .to_string(),
            ),
        };
        result.algorithm = Some(algorithm.label().to_string());
        result.nodes_explored = Some(outcome.explored);
        result
    }

    pub fn dijkstra(&self, start_id: &str, end_id: &str) -> PathResult {
        self.shortest_path(start_id, end_id, Algorithm::Dijkstra)
    }

    pub fn astar(&self, start_id: &str, end_id: &str) -> PathResult {
        self.shortest_path(start_id, end_id, Algorithm::AStar)
    }

    /// Resolve both endpoints by name, then route between the best matches
    ///
    /// When a side resolves to nothing no search runs; the result carries
    /// the other side's suggestions instead.
    pub fn find_path_by_name(&self, start_query: &str, end_query: &str, algorithm: Algorithm) -> PathResult {
        let start_matches = search_by_name(self.graph, start_query);
        let end_matches = search_by_name(self.graph, end_query);
        let names = |m: &[&GraphNode]| -> Vec<String> {
            m.iter()
                .take(SUGGESTION_LIMIT)
                .map(|n| n.display_name().to_string())
                .collect()
        };
        let suggestions = SearchResults {
            start: names(&start_matches),
            end: names(&end_matches),
        };

        let (Some(start), Some(end)) = (start_matches.first(), end_matches.first()) else {
            let query = if start_matches.is_empty() { start_query } else { end_query };
            let mut result = PathResult::failure(
                Error::UnresolvedEndpoint {
                    query: query.to_string(),
                }
                .to_string(),
            );
            result.search_results = Some(suggestions);
            return result;
        };

        let mut result = self.shortest_path(&start.id, &end.id, algorithm);
        result.start_node = Some((*start).clone());
        result.end_node = Some((*end).clone());
        result.search_results = Some(suggestions);
        result
    }

    /// Check a result against the graph it claims to route through
    ///
    /// A failed result has nothing to check and is valid. A found one must
    /// name known nodes, step only along edges in their allowed direction,
    /// and report the distance of the cheapest edge at each step.
    pub fn validate_path(&self, result: &PathResult) -> PathValidation {
        let mut errors = Vec::new();
        if !result.found {
            return PathValidation { valid: true, errors };
        }
        if result.path.is_empty() {
            errors.push("path is empty".to_string());
            return PathValidation { valid: false, errors };
        }
        if result.node_count != result.path.len() {
            errors.push(format!(
                "node count {} does not match path length {}",
                result.node_count,
                result.path.len()
            ));
        }

        let indices: Vec<Option<usize>> = result.path.iter().map(|id| self.graph.node_index(id)).collect();
        for (id, index) in result.path.iter().zip(&indices) {
            if index.is_none() {
                errors.push(format!("node {} is not in the graph", id));
            }
        }

        let mut distance = 0.0;
        for (pair, ids) in indices.windows(2).zip(result.path.windows(2)) {
            let (Some(a), Some(b)) = (pair[0], pair[1]) else {
                continue;
            };
            let step = self.adjacency[a]
                .iter()
                .filter(|(next, _)| *next == b)
                .map(|(_, w)| *w)
                .fold(f64::INFINITY, f64::min);
            if step.is_finite() {
                distance += step;
            } else {
                errors.push(format!("no edge from {} to {}", ids[0], ids[1]));
            }
        }

        if errors.is_empty() && (distance - result.total_distance).abs() > 1e-6 * distance.max(1.0) {
            errors.push(format!(
                "total distance {} does not match edge sum {}",
                result.total_distance, distance
            ));
        }

        if !errors.is_empty() {
            debug!(errors = errors.len(), "path failed validation");
        }
        PathValidation {
            valid: errors.is_empty(),
            errors,
        }
    }

    fn search(&self, start: usize, goal: usize, heuristic: impl Fn(usize) -> f64) -> SearchOutcome {
        let n = self.adjacency.len();
        let mut cost = vec![f64::INFINITY; n];
        let mut prev: Vec<Option<usize>> = vec![None; n];
        let mut visited = vec![false; n];
        let mut explored = 0;
        let mut seq = 0u64;
        let mut heap = BinaryHeap::new();

        cost[start] = 0.0;
        heap.push(SearchState {
            priority: heuristic(start),
            cost: 0.0,
            seq,
            node: start,
        });

        while let Some(SearchState { cost: g, node, .. }) = heap.pop() {
            if visited[node] {
                continue;
            }
            visited[node] = true;
            explored += 1;

            if node == goal {
                let mut path = vec![goal];
                let mut current = goal;
                while let Some(p) = prev[current] {
                    path.push(p);
                    current = p;
                }
                path.reverse();
                return SearchOutcome {
                    route: Some((g, path)),
                    explored,
                };
            }

            for &(next, weight) in &self.adjacency[node] {
                if visited[next] {
                    continue;
                }
                let tentative = g + weight;
                if tentative < cost[next] {
                    cost[next] = tentative;
                    prev[next] = Some(node);
                    seq += 1;
                    heap.push(SearchState {
                        priority: tentative + heuristic(next),
                        cost: tentative,
                        seq,
                        node: next,
                    });
                }
            }
        }
        SearchOutcome { route: None, explored }
    }
}

/// One-shot shortest path by node id
pub fn find_path(graph: &NavigationGraph, start_id: &str, end_id: &str, algorithm: Algorithm) -> PathResult {
    Pathfinder::new(graph).shortest_path(start_id, end_id, algorithm)
}

/// One-shot name-resolved shortest path
pub fn find_path_by_name(
    graph: &NavigationGraph,
    start_query: &str,
    end_query: &str,
    algorithm: Algorithm,
) -> PathResult {
    Pathfinder::new(graph).find_path_by_name(start_query, end_query, algorithm)
}
