// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! # Wayplan Navigation
//!
//! Routable graphs built from floor plan detections, and shortest-path
//! queries over them.
//!
//! [`GraphBuilder`] fuses rooms, doors, hallway polylines and stairs (or a
//! walkable skeleton) into a [`NavigationGraph`], never linking two nodes
//! through a wall. [`Pathfinder`] answers Dijkstra and A* queries by node id
//! or by fuzzy name, and [`get_directions`] phrases the result.
//! [`select_navigation_points`] groups nodes into start points and
//! destinations, and [`NavigationGraph::summary`] counts it all up.
//!
//! ```rust,ignore
//! use wayplan_navigation::{Algorithm, GraphBuilder, Pathfinder};
//!
//! let graph = GraphBuilder::default().build(&detections);
//! let result = Pathfinder::new(&graph)
//!     .find_path_by_name("101", "Lab B", Algorithm::AStar)
//!     .with_directions();
//! ```

pub mod builder;
pub mod directions;
pub mod error;
pub mod graph;
pub mod pathfinder;
pub mod points;
pub mod search;
pub mod summary;

pub use builder::{GraphBuilder, GraphBuilderConfig};
pub use directions::get_directions;
pub use error::{Error, Result};
pub use graph::{EdgeType, GraphEdge, GraphMetadata, GraphNode, NavigationGraph, NodeType};
pub use pathfinder::{
    find_path, find_path_by_name, Algorithm, PathResult, PathValidation, Pathfinder, SearchResults,
};
pub use points::{
    facility_kind, floor_level, select_navigation_points, FacilityKind, NavigationPoint, NavigationPoints, PointKind,
};
pub use search::{search_by_name, search_limited};
pub use summary::{EndPointCounts, NavigationSummary, PathSummary, ScanCounts, StartPointCounts};
