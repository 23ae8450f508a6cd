// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Room detection via enclosed free-space regions

use image::{GrayImage, ImageBuffer, Luma};
use imageproc::region_labelling::{connected_components, Connectivity};
use rustc_hash::FxHashMap;
use tracing::debug;

use crate::config::RoomConfig;
use crate::geometry::{convex_hull, polygon_area};
use crate::image_ops::{fill_holes, invert, morphological_close, morphological_open, FOREGROUND};
use crate::types::{BoundingBox, Point2D, Room, RoomKind, Wall};

type Labels = ImageBuffer<Luma<u32>, Vec<u32>>;

/// One labelled free-space region before filtering
#[derive(Debug, Clone)]
struct Region {
    label: u32,
    min_x: u32,
    min_y: u32,
    max_x: u32,
    max_y: u32,
    pixels: usize,
    boundary: Vec<Point2D>,
}

impl Region {
    fn new(label: u32, x: u32, y: u32) -> Self {
        Self {
            label,
            min_x: x,
            min_y: y,
            max_x: x,
            max_y: y,
            pixels: 0,
            boundary: Vec::new(),
        }
    }

    fn bbox(&self) -> BoundingBox {
        BoundingBox::new(
            self.min_x as f64,
            self.min_y as f64,
            (self.max_x - self.min_x + 1) as f64,
            (self.max_y - self.min_y + 1) as f64,
        )
    }
}

/// A region that passed the geometric filters
#[derive(Debug, Clone)]
struct Candidate {
    bbox: BoundingBox,
    area: f64,
    solidity: f64,
    aspect: f64,
}

/// Detect rooms in an ink mask (ink = 255)
///
/// `walls` only feed the confidence score; an empty list is fine.
pub fn detect_rooms(binary: &GrayImage, walls: &[Wall], config: &RoomConfig) -> Vec<Room> {
    let (width, height) = binary.dimensions();
    if width == 0 || height == 0 {
        return Vec::new();
    }
    let image_area = (width as f64) * (height as f64);
    let min_area = config.min_area.unwrap_or_else(|| (image_area / 2000.0).max(500.0));
    let max_area = config.max_area_ratio * image_area;

    let mut candidates: Vec<Candidate> = Vec::new();
    for &kernel in &config.kernel_sizes {
        let sealed = if kernel > 1 {
            morphological_close(binary, kernel, kernel)
        } else {
            binary.clone()
        };
        let free = morphological_open(&invert(&sealed), 2, 2);

        let labels = connected_components(&free, Connectivity::Four, Luma([0u8]));
        for region in collect_regions(&labels) {
            let Some(candidate) = evaluate_region(&labels, &region, min_area, max_area, config) else {
                continue;
            };
            let duplicate = candidates.iter().any(|c| {
                let smaller = c.bbox.area().min(candidate.bbox.area());
                smaller > 0.0 && c.bbox.intersection_area(&candidate.bbox) / smaller > config.duplicate_overlap
            });
            if !duplicate {
                candidates.push(candidate);
            }
        }
    }

    candidates.sort_by(|a, b| b.area.total_cmp(&a.area));
    let mut kept: Vec<Candidate> = Vec::with_capacity(candidates.len());
    for candidate in candidates {
        let own = candidate.bbox.area();
        let swallowed = kept
            .iter()
            .any(|k| own > 0.0 && k.bbox.intersection_area(&candidate.bbox) / own > config.final_overlap);
        if !swallowed {
            kept.push(candidate);
        }
    }

    debug!(rooms = kept.len(), "room detection complete");

    kept.into_iter()
        .enumerate()
        .map(|(i, c)| {
            let kind = classify_room(c.area, image_area, c.aspect);
            let confidence = room_confidence(&c, walls, config);
            Room {
                id: format!("room_{}", i + 1),
                center: c.bbox.center(),
                bbox: c.bbox,
                area: c.area,
                name: kind.label().to_string(),
                kind,
                confidence,
            }
        })
        .collect()
}

/// Collect per-label extents, pixel counts and boundary pixels
fn collect_regions(labels: &Labels) -> Vec<Region> {
    let (width, height) = labels.dimensions();

    let mut regions: FxHashMap<u32, Region> = FxHashMap::default();
    for (x, y, pixel) in labels.enumerate_pixels() {
        let label = pixel.0[0];
        if label == 0 {
            continue;
        }
        let region = regions.entry(label).or_insert_with(|| Region::new(label, x, y));
        region.min_x = region.min_x.min(x);
        region.min_y = region.min_y.min(y);
        region.max_x = region.max_x.max(x);
        region.max_y = region.max_y.max(y);
        region.pixels += 1;

        let on_border = x == 0 || y == 0 || x + 1 == width || y + 1 == height;
        let differs = |nx: u32, ny: u32| labels.get_pixel(nx, ny).0[0] != label;
        if on_border || differs(x - 1, y) || differs(x + 1, y) || differs(x, y - 1) || differs(x, y + 1) {
            region.boundary.push(Point2D::new(x as f64, y as f64));
        }
    }

    let mut regions: Vec<(u32, Region)> = regions.into_iter().collect();
    regions.sort_by_key(|(label, _)| *label);
    regions.into_iter().map(|(_, r)| r).collect()
}

fn evaluate_region(
    labels: &Labels,
    region: &Region,
    min_area: f64,
    max_area: f64,
    config: &RoomConfig,
) -> Option<Candidate> {
    let bbox = region.bbox();
    if bbox.width < config.min_side || bbox.height < config.min_side {
        return None;
    }
    let aspect = bbox.width.max(bbox.height) / (bbox.width.min(bbox.height) + 1.0);
    if aspect > config.max_aspect {
        return None;
    }
    if touched_edges(&bbox, labels.width(), labels.height(), config.edge_margin) >= 2 {
        return None;
    }
    // Cheap reject before hole filling
    if bbox.area() < min_area || (region.pixels as f64) > max_area {
        return None;
    }

    let area = filled_area(labels, region) as f64;
    if area < min_area || area > max_area {
        return None;
    }

    let hull_area = polygon_area(&convex_hull(&region.boundary));
    let solidity = if hull_area > 0.0 { (area / hull_area).min(1.0) } else { 0.0 };

    Some(Candidate {
        bbox,
        area,
        solidity,
        aspect,
    })
}

/// Pixel count of the region with its interior holes filled
fn filled_area(labels: &Labels, region: &Region) -> usize {
    let w = region.max_x - region.min_x + 3;
    let h = region.max_y - region.min_y + 3;
    let mut crop = GrayImage::new(w, h);
    for y in region.min_y..=region.max_y {
        for x in region.min_x..=region.max_x {
            if labels.get_pixel(x, y).0[0] == region.label {
                crop.put_pixel(x - region.min_x + 1, y - region.min_y + 1, Luma([FOREGROUND]));
            }
        }
    }
    fill_holes(&crop).pixels().filter(|p| p.0[0] == FOREGROUND).count()
}

/// Number of image edges the box lies within `margin` of
fn touched_edges(bbox: &BoundingBox, width: u32, height: u32, margin: f64) -> usize {
    [
        bbox.x <= margin,
        bbox.y <= margin,
        bbox.right() >= width as f64 - margin,
        bbox.bottom() >= height as f64 - margin,
    ]
    .into_iter()
    .filter(|&t| t)
    .count()
}

fn room_confidence(candidate: &Candidate, walls: &[Wall], config: &RoomConfig) -> f64 {
    let mut confidence = 0.5 + 0.2 * candidate.solidity;
    if candidate.aspect < 3.0 {
        confidence += 0.1;
    }

    let center = candidate.bbox.center();
    let reach = config.wall_proximity_factor * candidate.bbox.width.max(candidate.bbox.height);
    let nearby = walls
        .iter()
        .filter(|w| w.center().distance_to(&center) <= reach)
        .count();
    if nearby >= config.wall_bonus_count {
        confidence += 0.15;
    }

    confidence.min(0.95)
}

/// Size tier from the share of the image the room covers
pub fn classify_room(area: f64, image_area: f64, aspect: f64) -> RoomKind {
    if aspect > 4.0 {
        return RoomKind::Corridor;
    }
    let ratio = if image_area > 0.0 { area / image_area } else { 0.0 };
    if ratio < 0.005 {
        RoomKind::SmallRoom
    } else if ratio < 0.02 {
        RoomKind::MediumRoom
    } else if ratio < 0.05 {
        RoomKind::LargeRoom
    } else {
        RoomKind::Hall
    }
}
