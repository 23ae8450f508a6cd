// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Tunable parameters for every pipeline stage
//!
//! All structs deserialize with `#[serde(default)]`, so a partial JSON file
//! only overrides the keys it names. `None` on an `Option` threshold means
//! "derive from the image size".

use serde::{Deserialize, Serialize};

/// Top-level configuration for one pipeline invocation
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    pub preprocess: PreprocessConfig,
    pub walls: WallConfig,
    pub rooms: RoomConfig,
    pub doors: DoorConfig,
    pub hallways: HallwayConfig,
    pub stairs: StairConfig,
    pub skeleton: SkeletonConfig,
    pub ocr: OcrConfig,
    pub ml: MlThresholds,
}

impl PipelineConfig {
    pub fn from_json(json: &str) -> crate::Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Read a (possibly partial) JSON config file
    pub fn from_file(path: impl AsRef<std::path::Path>) -> crate::Result<Self> {
        let json = std::fs::read_to_string(path)?;
        Self::from_json(&json)
    }
}

/// Image normalisation toggles. A disabled step passes its input through.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PreprocessConfig {
    /// Replace saturated (colored) annotation pixels with white
    pub strip_annotations: bool,
    /// HSV saturation above which a pixel counts as annotation (0-255)
    pub saturation_threshold: u8,
    /// Estimate and correct rotational skew
    pub deskew: bool,
    /// Minimum Hough votes for a skew line
    pub skew_vote_threshold: u32,
    /// Skew below this magnitude (degrees) is left alone
    pub min_skew_degrees: f64,
    /// Contrast-limited adaptive histogram equalisation
    pub equalize: bool,
    pub clahe_clip_limit: f64,
    /// Tiles per image side
    pub clahe_tiles: u32,
    /// Median denoise
    pub denoise: bool,
    pub median_radius: u32,
    /// Otsu binarisation (ink = 255). Disabled falls back to a fixed 128 cut.
    pub binarize: bool,
    /// 2x2 dilation of the binary mask to close hairline breaks
    pub thicken: bool,
    pub edges: bool,
    pub canny_low: f32,
    pub canny_high: f32,
}

impl Default for PreprocessConfig {
    fn default() -> Self {
        Self {
            strip_annotations: true,
            saturation_threshold: 50,
            deskew: true,
            skew_vote_threshold: 200,
            min_skew_degrees: 1.0,
            equalize: true,
            clahe_clip_limit: 2.0,
            clahe_tiles: 8,
            denoise: true,
            median_radius: 1,
            binarize: true,
            thicken: true,
            edges: true,
            canny_low: 50.0,
            canny_high: 150.0,
        }
    }
}

/// Hough wall extraction. Unset thresholds scale with `min(h, w)`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct WallConfig {
    pub min_length: Option<f64>,
    pub max_gap: Option<f64>,
    pub hough_threshold: Option<u32>,
    /// Angle (degrees) to an axis under which a wall counts as aligned
    pub axis_tolerance: f64,
    pub axis_confidence: f64,
    pub off_axis_confidence: f64,
    /// Max direction difference (degrees) for merging
    pub merge_angle: f64,
    pub merge_distance: Option<f64>,
    pub duplicate_distance: Option<f64>,
}

impl Default for WallConfig {
    fn default() -> Self {
        Self {
            min_length: None,
            max_gap: None,
            hough_threshold: None,
            axis_tolerance: 15.0,
            axis_confidence: 0.7,
            off_axis_confidence: 0.5,
            merge_angle: 15.0,
            merge_distance: None,
            duplicate_distance: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RoomConfig {
    /// Square kernel sizes of the multi-scale close/open sweep
    pub kernel_sizes: Vec<u32>,
    /// Minimum region area; unset = `max(500, image_area / 2000)`
    pub min_area: Option<f64>,
    pub max_area_ratio: f64,
    pub min_side: f64,
    pub max_aspect: f64,
    /// Distance from the image border that counts as touching it
    pub edge_margin: f64,
    /// Candidate overlap (of the smaller box) that marks a duplicate
    pub duplicate_overlap: f64,
    /// Overlap (of the smaller room) removed in the final pass
    pub final_overlap: f64,
    /// Walls whose center lies within this multiple of the bbox size count as nearby
    pub wall_proximity_factor: f64,
    /// Nearby wall count needed for the proximity bonus
    pub wall_bonus_count: usize,
}

impl Default for RoomConfig {
    fn default() -> Self {
        Self {
            kernel_sizes: vec![3, 5, 7],
            min_area: None,
            max_area_ratio: 0.5,
            min_side: 10.0,
            max_aspect: 8.0,
            edge_margin: 5.0,
            duplicate_overlap: 0.6,
            final_overlap: 0.4,
            wall_proximity_factor: 1.5,
            wall_bonus_count: 3,
        }
    }
}

/// Which anchor drives door detection
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum DoorStrategy {
    /// Arcs found near clustered wall endpoints
    #[default]
    EndpointAnchored,
    /// Gaps between collinear walls, paired with nearby arcs
    GapAnchored,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DoorConfig {
    pub strategy: DoorStrategy,
    /// Gray level under which a pixel is ink for arc extraction
    pub ink_threshold: u8,
    pub endpoint_cluster_distance: f64,
    pub search_radius: f64,
    pub min_radius: f64,
    pub min_arc_length: f64,
    pub max_arc_length: f64,
    /// Arc pixel-count range
    pub min_arc_area: f64,
    pub max_arc_area: f64,
    pub min_circularity: f64,
    pub max_circularity: f64,
    pub max_arc_aspect: f64,
    /// Unset = 0.03 endpoint-anchored, 0.05 gap-anchored
    pub min_curvature: Option<f64>,
    pub gap_wall_min_length: f64,
    pub min_gap_width: f64,
    pub max_gap_width: f64,
    /// Max perpendicular offset between walls sharing a gap
    pub gap_alignment: f64,
    /// Unmatched gaps wider than this become open doorways
    pub open_doorway_min_width: f64,
    pub dedup_distance: f64,
}

impl Default for DoorConfig {
    fn default() -> Self {
        Self {
            strategy: DoorStrategy::default(),
            ink_threshold: 200,
            endpoint_cluster_distance: 20.0,
            search_radius: 80.0,
            min_radius: 15.0,
            min_arc_length: 30.0,
            max_arc_length: 400.0,
            min_arc_area: 100.0,
            max_arc_area: 5000.0,
            min_circularity: 0.1,
            max_circularity: 0.7,
            max_arc_aspect: 4.0,
            min_curvature: None,
            gap_wall_min_length: 50.0,
            min_gap_width: 15.0,
            max_gap_width: 80.0,
            gap_alignment: 20.0,
            open_doorway_min_width: 25.0,
            dedup_distance: 35.0,
        }
    }
}

impl DoorConfig {
    pub fn curvature_threshold(&self) -> f64 {
        self.min_curvature.unwrap_or(match self.strategy {
            DoorStrategy::EndpointAnchored => 0.03,
            DoorStrategy::GapAnchored => 0.05,
        })
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HallwayConfig {
    /// Unset = `min(300, max(h, w) / 3)`
    pub min_length: Option<f64>,
    pub hough_threshold: u32,
    pub max_gap: f64,
    pub axis_tolerance: f64,
    pub merge_distance: f64,
    pub simplify_epsilon: f64,
}

impl Default for HallwayConfig {
    fn default() -> Self {
        Self {
            min_length: None,
            hough_threshold: 100,
            max_gap: 30.0,
            axis_tolerance: 15.0,
            merge_distance: 50.0,
            simplify_epsilon: 10.0,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StairConfig {
    pub min_step_length: f64,
    pub max_step_length: f64,
    pub hough_threshold: u32,
    pub max_gap: f64,
    pub axis_tolerance: f64,
    pub min_spacing: f64,
    pub max_spacing: f64,
    pub min_steps: usize,
}

impl Default for StairConfig {
    fn default() -> Self {
        Self {
            min_step_length: 20.0,
            max_step_length: 100.0,
            hough_threshold: 30,
            max_gap: 5.0,
            axis_tolerance: 20.0,
            min_spacing: 8.0,
            max_spacing: 30.0,
            min_steps: 3,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SkeletonConfig {
    /// Gray level above which a pixel is walkable
    pub walkable_threshold: u8,
    /// Square erosion kernel used to seal exterior openings
    pub seal_kernel: u32,
    pub seal_iterations: u32,
    pub close_kernel: u32,
    pub dilate_kernel: u32,
    pub dilate_iterations: u32,
    /// Non-walkable frame drawn around the image
    pub border: u32,
    /// Rounds of leaf stripping
    pub prune_rounds: usize,
    /// Keep every n-th pixel of a chain
    pub sample_stride: usize,
}

impl Default for SkeletonConfig {
    fn default() -> Self {
        Self {
            walkable_threshold: 230,
            seal_kernel: 13,
            seal_iterations: 2,
            close_kernel: 7,
            dilate_kernel: 3,
            dilate_iterations: 2,
            border: 2,
            prune_rounds: 15,
            sample_stride: 10,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OcrConfig {
    /// Minimum engine confidence, percent
    pub min_confidence: f64,
}

impl Default for OcrConfig {
    fn default() -> Self {
        Self {
            min_confidence: 60.0,
        }
    }
}

/// Thresholds applied to external ML detector output, in percent
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(default)]
pub struct MlThresholds {
    pub confidence_pct: f64,
    pub overlap_pct: f64,
}

impl Default for MlThresholds {
    fn default() -> Self {
        Self {
            confidence_pct: 40.0,
            overlap_pct: 30.0,
        }
    }
}
