// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Floor plan structure detection for indoor navigation
//!
//! This crate turns a raster floor plan into structured entities:
//! 1. Preprocessing (annotation removal, deskew, CLAHE, denoise, binarise, edges)
//! 2. Walls from probabilistic Hough segments, merged and deduplicated
//! 3. Rooms as enclosed free-space regions
//! 4. Doors from swing arcs anchored on wall endpoints or wall gaps
//! 5. Hallways and stairs from long and periodic parallel lines
//! 6. A walkable skeleton graph as an alternative to entity detection
//!
//! OCR engines and ML detectors are external collaborators behind the
//! [`TextRecognizer`] and [`ObjectDetector`] traits.
//!
//! # Usage
//!
//! ```rust,ignore
//! use wayplan_vision::{detect_floor_plan, PipelineConfig};
//!
//! let image = image::open("plan.png")?;
//! let detections = detect_floor_plan(&image, &PipelineConfig::default(), None)?;
//! println!("{} rooms, {} doors", detections.rooms.len(), detections.doors.len());
//! ```

pub mod config;
pub mod door_detector;
pub mod error;
pub mod geometry;
pub mod hallway_detector;
pub mod image_ops;
pub mod line_ops;
pub mod ml_adapter;
pub mod ocr;
pub mod pipeline;
pub mod preprocess;
pub mod room_detector;
pub mod skeleton;
pub mod stair_detector;
pub mod types;
pub mod wall_detector;

pub use config::{
    DoorConfig, DoorStrategy, HallwayConfig, MlThresholds, OcrConfig, PipelineConfig, PreprocessConfig,
    RoomConfig, SkeletonConfig, StairConfig, WallConfig,
};
pub use door_detector::detect_doors;
pub use error::{Error, Result};
pub use geometry::{line_of_sight_blocked, segments_intersect};
pub use hallway_detector::detect_hallways;
pub use ml_adapter::{detect_with_model, detections_from_predictions, parse_predictions, ObjectDetector, RawPrediction};
pub use ocr::{associate_texts, TextRecognizer};
pub use pipeline::{detect_floor_plan, detect_floor_plan_from_rgba, detect_preprocessed, extract_skeleton_from_image};
pub use preprocess::{preprocess, transform_point, PreprocessedImage};
pub use room_detector::detect_rooms;
pub use skeleton::{extract_skeleton, SkeletonEdge, SkeletonGraph, SkeletonNode, SkeletonNodeKind};
pub use stair_detector::detect_stairs;
pub use types::{
    BoundingBox, DetectedLine, Door, FloorPlanDetections, Hallway, ImageSize, Orientation, Point2D, Room,
    RoomKind, Stair, SwingDirection, TextRecord, Wall,
};
pub use wall_detector::detect_walls;
