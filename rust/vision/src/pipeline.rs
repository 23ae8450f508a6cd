// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Detection orchestrator: preprocess once, run every detector, map the
//! results back to source coordinates.

use image::{DynamicImage, RgbaImage};
use rustc_hash::FxHashMap;
use tracing::info;

use crate::config::PipelineConfig;
use crate::door_detector::detect_doors;
use crate::error::{Error, Result};
use crate::hallway_detector::detect_hallways;
use crate::ocr::{associate_texts, recognize_texts, TextRecognizer};
use crate::preprocess::{preprocess, PreprocessedImage};
use crate::room_detector::detect_rooms;
use crate::skeleton::{extract_skeleton, SkeletonGraph};
use crate::stair_detector::detect_stairs;
use crate::types::{BoundingBox, FloorPlanDetections, Point2D, Wall};
use crate::wall_detector::detect_walls;

/// Detect every floor plan entity in a decoded image
///
/// `recognizer` is optional; without one rooms keep their size-tier names.
/// A recognizer failure is logged and treated as no text.
pub fn detect_floor_plan(
    image: &DynamicImage,
    config: &PipelineConfig,
    recognizer: Option<&dyn TextRecognizer>,
) -> Result<FloorPlanDetections> {
    let pre = preprocess(image, &config.preprocess)?;
    let detections = detect_preprocessed(&pre, config, recognizer);

    info!(
        width = detections.image_size.width,
        height = detections.image_size.height,
        skew = pre.skew_angle,
        walls = detections.walls.len(),
        rooms = detections.rooms.len(),
        doors = detections.doors.len(),
        hallways = detections.hallways.len(),
        stairs = detections.stairs.len(),
        texts = detections.texts.len(),
        "floor plan detection complete"
    );
    Ok(detections)
}

/// Same as [`detect_floor_plan`] for a raw RGBA buffer
pub fn detect_floor_plan_from_rgba(
    rgba_data: &[u8],
    width: u32,
    height: u32,
    config: &PipelineConfig,
    recognizer: Option<&dyn TextRecognizer>,
) -> Result<FloorPlanDetections> {
    let image = rgba_image(rgba_data, width, height)?;
    detect_floor_plan(&image, config, recognizer)
}

fn rgba_image(rgba_data: &[u8], width: u32, height: u32) -> Result<DynamicImage> {
    let expected = width as usize * height as usize * 4;
    if rgba_data.len() != expected {
        return Err(Error::InvalidImage(format!(
            "expected {} RGBA bytes for {}x{}, got {}",
            expected,
            width,
            height,
            rgba_data.len()
        )));
    }
    RgbaImage::from_raw(width, height, rgba_data.to_vec())
        .map(DynamicImage::ImageRgba8)
        .ok_or_else(|| Error::InvalidImage("RGBA buffer does not match dimensions".into()))
}

/// Run the detectors on an already preprocessed image
pub fn detect_preprocessed(
    pre: &PreprocessedImage,
    config: &PipelineConfig,
    recognizer: Option<&dyn TextRecognizer>,
) -> FloorPlanDetections {
    let mut detections = FloorPlanDetections::new(pre.width(), pre.height());

    detections.walls = detect_walls(&pre.edges, &config.walls);
    detections.rooms = detect_rooms(&pre.binary, &detections.walls, &config.rooms);
    detections.doors = detect_doors(&pre.gray, &detections.walls, &config.doors);
    detections.hallways = detect_hallways(&pre.edges, &config.hallways);
    detections.stairs = detect_stairs(&pre.edges, &config.stairs);

    if let Some(recognizer) = recognizer {
        detections.texts = recognize_texts(recognizer, &pre.gray, &config.ocr);
        associate_texts(&mut detections.rooms, &detections.texts);
    }

    if pre.skew_angle != 0.0 {
        map_detections_to_source(&mut detections, pre);
    }
    detections
}

/// Extract the walkable skeleton graph of a decoded image
pub fn extract_skeleton_from_image(image: &DynamicImage, config: &PipelineConfig) -> Result<SkeletonGraph> {
    let pre = preprocess(image, &config.preprocess)?;
    let mut graph = extract_skeleton(&pre.gray, &config.skeleton);
    if pre.skew_angle != 0.0 {
        map_skeleton_to_source(&mut graph, &pre);
    }

    info!(
        nodes = graph.nodes.len(),
        edges = graph.edges.len(),
        junctions = graph.junction_count(),
        "skeleton extraction complete"
    );
    Ok(graph)
}

/// Move a box so its center follows the mapped center; size is kept
fn map_box(bbox: &BoundingBox, pre: &PreprocessedImage) -> BoundingBox {
    let c = pre.to_source(bbox.center());
    BoundingBox::from_center(c.x, c.y, bbox.width, bbox.height)
}

fn map_detections_to_source(detections: &mut FloorPlanDetections, pre: &PreprocessedImage) {
    let map = |p: Point2D| pre.to_source(p);

    for wall in &mut detections.walls {
        *wall = Wall::from_points(wall.id.clone(), map(wall.start), map(wall.end), wall.confidence);
    }
    for room in &mut detections.rooms {
        room.bbox = map_box(&room.bbox, pre);
        room.center = room.bbox.center();
    }
    for door in &mut detections.doors {
        door.hinge = map(door.hinge);
        door.swing_end = door.swing_end.map(map);
    }
    for hallway in &mut detections.hallways {
        for p in &mut hallway.polyline {
            *p = map(*p);
        }
    }
    for stair in &mut detections.stairs {
        stair.bbox = map_box(&stair.bbox, pre);
        stair.center = stair.bbox.center();
    }
    for text in &mut detections.texts {
        let bbox = map_box(&text.bbox(), pre);
        text.left = bbox.x;
        text.top = bbox.y;
    }
}

fn map_skeleton_to_source(graph: &mut SkeletonGraph, pre: &PreprocessedImage) {
    let mut positions: FxHashMap<String, Point2D> = FxHashMap::default();
    for node in &mut graph.nodes {
        node.position = pre.to_source(node.position);
        positions.insert(node.id.clone(), node.position);
    }
    for edge in &mut graph.edges {
        if let (Some(a), Some(b)) = (positions.get(&edge.from), positions.get(&edge.to)) {
            edge.distance = a.distance_to(b);
        }
    }
}
