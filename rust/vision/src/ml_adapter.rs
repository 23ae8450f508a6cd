// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Adapter for external ML object detectors
//!
//! Hosted detection models answer with a handful of JSON layouts. They are
//! normalised here into [`RawPrediction`]s (center-based boxes) and then into
//! the same [`FloorPlanDetections`] document the classical detectors produce.

use image::DynamicImage;
use serde::Deserialize;
use tracing::{debug, warn};

use crate::config::MlThresholds;
use crate::error::{Error, Result};
use crate::types::{
    BoundingBox, Door, FloorPlanDetections, Orientation, Point2D, Room, RoomKind, SwingDirection, Wall,
};

/// A hosted or local model that returns raw JSON predictions
pub trait ObjectDetector {
    fn predict(&self, image: &DynamicImage) -> Result<serde_json::Value>;
}

fn default_confidence() -> f64 {
    0.8
}

/// One detection with a center-based box
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct RawPrediction {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
    #[serde(default = "default_confidence")]
    pub confidence: f64,
    #[serde(rename = "class", alias = "label", default)]
    pub class: String,
}

#[derive(Debug, Deserialize)]
struct PredictionBatch {
    #[serde(default)]
    predictions: Vec<RawPrediction>,
}

/// Every payload layout seen from detection services
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum PredictionPayload {
    Predictions { predictions: Vec<RawPrediction> },
    Detections { detections: Vec<RawPrediction> },
    OutputList { output: Vec<PredictionBatch> },
    OutputObject { output: PredictionBatch },
    Bare(Vec<RawPrediction>),
}

impl PredictionPayload {
    fn into_predictions(self) -> Vec<RawPrediction> {
        match self {
            PredictionPayload::Predictions { predictions } => predictions,
            PredictionPayload::Detections { detections } => detections,
            PredictionPayload::OutputList { output } => {
                output.into_iter().flat_map(|b| b.predictions).collect()
            }
            PredictionPayload::OutputObject { output } => output.predictions,
            PredictionPayload::Bare(list) => list,
        }
    }
}

/// Normalise a detector payload into a flat prediction list
pub fn parse_predictions(value: serde_json::Value) -> Result<Vec<RawPrediction>> {
    serde_json::from_value::<PredictionPayload>(value)
        .map(PredictionPayload::into_predictions)
        .map_err(|e| Error::MalformedPredictions(e.to_string()))
}

/// Detection category decided by keyword match on the class label
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PredictionClass {
    Wall,
    Door,
    Room,
}

impl PredictionClass {
    pub fn from_label(label: &str) -> Self {
        let label = label.to_lowercase();
        if label.contains("wall") {
            PredictionClass::Wall
        } else if label.contains("door") {
            PredictionClass::Door
        } else {
            // "room", "space" and anything unrecognised
            PredictionClass::Room
        }
    }
}

/// Convert predictions into a detection document
///
/// Predictions under the confidence threshold are dropped and rooms go
/// through IoU non-maximum suppression.
pub fn detections_from_predictions(
    predictions: &[RawPrediction],
    thresholds: MlThresholds,
    width: u32,
    height: u32,
) -> FloorPlanDetections {
    let min_confidence = thresholds.confidence_pct / 100.0;
    let mut out = FloorPlanDetections::new(width, height);
    let mut rooms: Vec<(BoundingBox, f64)> = Vec::new();

    for p in predictions {
        let values = [p.x, p.y, p.width, p.height, p.confidence];
        if p.confidence < min_confidence || values.iter().any(|v| !v.is_finite()) {
            continue;
        }
        if p.width <= 0.0 || p.height <= 0.0 {
            continue;
        }
        let bbox = BoundingBox::from_center(p.x, p.y, p.width, p.height);

        match PredictionClass::from_label(&p.class) {
            PredictionClass::Wall => {
                let (start, end) = if p.width >= p.height {
                    (Point2D::new(bbox.x, p.y), Point2D::new(bbox.right(), p.y))
                } else {
                    (Point2D::new(p.x, bbox.y), Point2D::new(p.x, bbox.bottom()))
                };
                let id = format!("wall_{}", out.walls.len() + 1);
                out.walls.push(Wall::from_points(id, start, end, p.confidence));
            }
            PredictionClass::Door => {
                out.doors.push(Door {
                    id: format!("door_{}", out.doors.len() + 1),
                    hinge: bbox.center(),
                    swing_end: None,
                    radius: p.width.max(p.height) / 2.0,
                    swing_angle: 90.0,
                    swing_direction: SwingDirection::Unknown,
                    orientation: Some(if p.width >= p.height {
                        Orientation::Horizontal
                    } else {
                        Orientation::Vertical
                    }),
                    confidence: p.confidence,
                    has_arc: false,
                });
            }
            PredictionClass::Room => rooms.push((bbox, p.confidence)),
        }
    }

    let kept = non_max_suppression(rooms, thresholds.overlap_pct / 100.0);
    out.rooms = kept
        .into_iter()
        .enumerate()
        .map(|(i, (bbox, confidence))| Room {
            id: format!("room_{}", i + 1),
            center: bbox.center(),
            area: bbox.area(),
            bbox,
            name: RoomKind::External.label().to_string(),
            kind: RoomKind::External,
            confidence,
        })
        .collect();

    out
}

/// Keep the most confident box among any group overlapping above `iou_threshold`
pub fn non_max_suppression(mut boxes: Vec<(BoundingBox, f64)>, iou_threshold: f64) -> Vec<(BoundingBox, f64)> {
    boxes.sort_by(|a, b| b.1.total_cmp(&a.1));
    let mut kept: Vec<(BoundingBox, f64)> = Vec::with_capacity(boxes.len());
    for candidate in boxes {
        if kept.iter().all(|k| k.0.iou(&candidate.0) <= iou_threshold) {
            kept.push(candidate);
        }
    }
    kept
}

/// Ask an external detector for a detection document
///
/// Collaborator errors and unreadable payloads are surfaced, never partially applied.
pub fn detect_with_model(
    detector: &dyn ObjectDetector,
    image: &DynamicImage,
    thresholds: MlThresholds,
) -> Result<FloorPlanDetections> {
    let payload = detector.predict(image).map_err(|e| match e {
        Error::ExternalService { .. } => e,
        other => Error::external("ml-detector", other),
    })?;
    let predictions = match parse_predictions(payload) {
        Ok(predictions) => predictions,
        Err(e) => {
            warn!(error = %e, "detector returned an unrecognised payload");
            return Err(e);
        }
    };

    let detections = detections_from_predictions(&predictions, thresholds, image.width(), image.height());
    debug!(
        predictions = predictions.len(),
        walls = detections.walls.len(),
        doors = detections.doors.len(),
        rooms = detections.rooms.len(),
        "model detections normalised"
    );
    Ok(detections)
}
