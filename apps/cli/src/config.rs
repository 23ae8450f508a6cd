// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! CLI configuration loaded from environment variables.

use std::path::{Path, PathBuf};

use anyhow::Context;
use wayplan_navigation::{Algorithm, GraphBuilderConfig};
use wayplan_vision::PipelineConfig;

/// CLI configuration.
#[derive(Debug, Clone)]
pub struct Config {
    /// Pipeline JSON file; defaults apply when unset.
    pub pipeline_path: Option<PathBuf>,
    /// Directory that relative `--output` paths are resolved against.
    pub output_dir: PathBuf,
    /// Default routing algorithm.
    pub algorithm: Algorithm,
    /// Maximum length of automatic graph links.
    pub connect_distance: f64,
    /// Margin around a room's bbox when looking for its door.
    pub room_door_margin: f64,
    /// Override for the skeleton's leaf-pruning rounds.
    pub skeleton_prune_rounds: Option<usize>,
    /// Emit JSON log lines instead of the pretty format.
    pub json_logs: bool,
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> Self {
        let builder = GraphBuilderConfig::default();
        Self {
            pipeline_path: std::env::var("WAYPLAN_CONFIG").ok().map(PathBuf::from),
            output_dir: std::env::var("WAYPLAN_OUTPUT_DIR")
                .unwrap_or_else(|_| ".".into())
                .into(),
            algorithm: std::env::var("WAYPLAN_ALGORITHM")
                .map(|s| Algorithm::parse(&s))
                .unwrap_or_default(),
            connect_distance: std::env::var("WAYPLAN_CONNECT_DISTANCE")
                .unwrap_or_else(|_| builder.connect_distance.to_string())
                .parse()
                .unwrap_or(builder.connect_distance),
            room_door_margin: std::env::var("WAYPLAN_ROOM_DOOR_MARGIN")
                .unwrap_or_else(|_| builder.room_door_margin.to_string())
                .parse()
                .unwrap_or(builder.room_door_margin),
            skeleton_prune_rounds: std::env::var("WAYPLAN_SKELETON_PRUNE_ROUNDS")
                .ok()
                .and_then(|s| s.parse().ok()),
            json_logs: std::env::var("WAYPLAN_LOG_FORMAT")
                .map(|s| s.eq_ignore_ascii_case("json"))
                .unwrap_or(false),
        }
    }

    /// Pipeline settings from the configured file, with env overrides applied
    pub fn pipeline(&self) -> anyhow::Result<PipelineConfig> {
        let mut pipeline = match &self.pipeline_path {
            Some(path) => PipelineConfig::from_file(path)
                .with_context(|| format!("loading pipeline config {}", path.display()))?,
            None => PipelineConfig::default(),
        };
        if let Some(rounds) = self.skeleton_prune_rounds {
            pipeline.skeleton.prune_rounds = rounds;
        }
        Ok(pipeline)
    }

    pub fn builder(&self) -> GraphBuilderConfig {
        GraphBuilderConfig {
            connect_distance: self.connect_distance,
            room_door_margin: self.room_door_margin,
            ..Default::default()
        }
    }

    /// Resolve an output path against the output directory
    pub fn output_path(&self, path: &Path) -> PathBuf {
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.output_dir.join(path)
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::from_env()
    }
}
