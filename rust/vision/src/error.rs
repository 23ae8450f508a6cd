// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Error types for the vision pipeline.
//!
//! A detector that finds nothing is not an error: it returns an empty list
//! and downstream stages degrade gracefully.

/// Result type alias for vision operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while processing a floor plan image.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The input could not be read or decoded, or has no pixels.
    #[error("invalid image: {0}")]
    InvalidImage(String),

    /// An external collaborator (OCR engine, ML detector) failed.
    #[error("{service} unavailable: {message}")]
    ExternalService { service: String, message: String },

    /// An ML detector payload did not match any known prediction schema.
    #[error("malformed prediction payload: {0}")]
    MalformedPredictions(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Json(#[from] serde_json::Error),
}

impl Error {
    pub fn external(service: impl Into<String>, message: impl std::fmt::Display) -> Self {
        Error::ExternalService {
            service: service.into(),
            message: message.to_string(),
        }
    }
}
