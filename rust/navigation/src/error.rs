// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Error types for graph construction and routing.

/// Result type alias for navigation operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while assembling or querying a navigation graph.
///
/// Routing failures (`NoPathExists`, `UnresolvedEndpoint`) are never returned
/// from pathfinding calls; they are rendered into a failed `PathResult`.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// A node with this id is already in the graph.
    #[error("duplicate node id: {0}")]
    DuplicateNode(String),

    /// An edge or query referenced a node that is not in the graph.
    #[error("node not found: {0}")]
    UnknownNode(String),

    #[error("no path exists from {from} to {to}")]
    NoPathExists { from: String, to: String },

    #[error("no location matches '{query}'")]
    UnresolvedEndpoint { query: String },

    #[error("serialization error: {0}")]
    Json(#[from] serde_json::Error),
}
