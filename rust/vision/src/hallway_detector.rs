// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Hallway detection from long axis-aligned lines

use image::GrayImage;
use tracing::debug;

use crate::config::HallwayConfig;
use crate::geometry::douglas_peucker;
use crate::image_ops::dilate_rect;
use crate::line_ops::{axis_of, detect_lines, HoughParams};
use crate::types::{DetectedLine, Hallway, Orientation, Point2D};

/// Minimum corridor line length for an image, unless configured
pub fn adaptive_min_length(width: u32, height: u32, config: &HallwayConfig) -> f64 {
    config
        .min_length
        .unwrap_or_else(|| (width.max(height) as f64 / 3.0).min(300.0))
}

/// Detect hallways on an edge map
pub fn detect_hallways(edges: &GrayImage, config: &HallwayConfig) -> Vec<Hallway> {
    let (width, height) = edges.dimensions();
    let params = HoughParams {
        threshold: config.hough_threshold,
        min_line_length: adaptive_min_length(width, height, config),
        max_line_gap: config.max_gap,
    };
    let lines = detect_lines(&dilate_rect(edges, 3, 3), &params);

    let mut horizontal = Vec::new();
    let mut vertical = Vec::new();
    for line in lines {
        match axis_of(&line, config.axis_tolerance) {
            Some(Orientation::Horizontal) => horizontal.push(line),
            Some(Orientation::Vertical) => vertical.push(line),
            None => {}
        }
    }

    let mut hallways = Vec::new();
    for (n, group) in group_lines(&horizontal, Orientation::Horizontal, config.merge_distance)
        .into_iter()
        .enumerate()
    {
        hallways.push(Hallway {
            id: format!("hallway_h_{}", n + 1),
            polyline: corridor_polyline(&group, Orientation::Horizontal, config.simplify_epsilon),
            orientation: Orientation::Horizontal,
        });
    }
    for (n, group) in group_lines(&vertical, Orientation::Vertical, config.merge_distance)
        .into_iter()
        .enumerate()
    {
        hallways.push(Hallway {
            id: format!("hallway_v_{}", n + 1),
            polyline: corridor_polyline(&group, Orientation::Vertical, config.simplify_epsilon),
            orientation: Orientation::Vertical,
        });
    }

    debug!(
        horizontal = horizontal.len(),
        vertical = vertical.len(),
        hallways = hallways.len(),
        "hallway detection complete"
    );
    hallways
}

fn cross_position(line: &DetectedLine, orientation: Orientation) -> f64 {
    let mid = line.midpoint();
    match orientation {
        Orientation::Horizontal => mid.y,
        Orientation::Vertical => mid.x,
    }
}

/// Group lines whose cross-axis center lies within `distance` of the group seed
fn group_lines(lines: &[DetectedLine], orientation: Orientation, distance: f64) -> Vec<Vec<DetectedLine>> {
    let mut used = vec![false; lines.len()];
    let mut groups = Vec::new();

    for (i, seed) in lines.iter().enumerate() {
        if used[i] {
            continue;
        }
        used[i] = true;
        let seed_pos = cross_position(seed, orientation);
        let mut group = vec![seed.clone()];
        for (j, other) in lines.iter().enumerate().skip(i + 1) {
            if !used[j] && (cross_position(other, orientation) - seed_pos).abs() < distance {
                used[j] = true;
                group.push(other.clone());
            }
        }
        groups.push(group);
    }

    groups
}

/// Centerline through a corridor group, simplified
fn corridor_polyline(group: &[DetectedLine], orientation: Orientation, epsilon: f64) -> Vec<Point2D> {
    let cross = group.iter().map(|l| cross_position(l, orientation)).sum::<f64>() / group.len() as f64;

    let mut along: Vec<f64> = group
        .iter()
        .flat_map(|l| [l.start, l.end])
        .map(|p| match orientation {
            Orientation::Horizontal => p.x,
            Orientation::Vertical => p.y,
        })
        .collect();
    along.sort_by(f64::total_cmp);
    along.dedup_by(|a, b| (*a - *b).abs() < 1e-9);

    let points: Vec<Point2D> = along
        .into_iter()
        .map(|t| match orientation {
            Orientation::Horizontal => Point2D::new(t, cross),
            Orientation::Vertical => Point2D::new(cross, t),
        })
        .collect();

    douglas_peucker(&points, epsilon)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use image::Luma;

    fn line(x1: f64, y1: f64, x2: f64, y2: f64) -> DetectedLine {
        DetectedLine::new(Point2D::new(x1, y1), Point2D::new(x2, y2))
    }

    #[test]
    fn min_length_adapts_to_small_images() {
        let config = HallwayConfig::default();
        assert_relative_eq!(adaptive_min_length(600, 400, &config), 200.0);
        assert_relative_eq!(adaptive_min_length(3000, 2000, &config), 300.0);
    }

    #[test]
    fn parallel_walls_make_one_corridor() {
        let mut edges = GrayImage::new(600, 300);
        for x in 50..550 {
            edges.put_pixel(x, 120, Luma([255]));
            edges.put_pixel(x, 160, Luma([255]));
        }
        let hallways = detect_hallways(&edges, &HallwayConfig::default());
        assert_eq!(hallways.len(), 1);
        let h = &hallways[0];
        assert_eq!(h.id, "hallway_h_1");
        assert_eq!(h.orientation, Orientation::Horizontal);
        assert_eq!(h.polyline.len(), 2);
        assert!(h.polyline[0].x < h.polyline[1].x);
        assert!(h.polyline[0].y > 120.0 && h.polyline[0].y < 160.0);
    }

    #[test]
    fn grouping_respects_seed_distance() {
        let lines = vec![
            line(0.0, 100.0, 400.0, 100.0),
            line(0.0, 140.0, 400.0, 140.0),
            line(0.0, 300.0, 400.0, 300.0),
        ];
        let groups = group_lines(&lines, Orientation::Horizontal, 50.0);
        assert_eq!(groups.len(), 2);
        assert_eq!(groups[0].len(), 2);
    }

    #[test]
    fn vertical_centerline_runs_along_y() {
        let group = vec![line(100.0, 0.0, 100.0, 200.0), line(140.0, 50.0, 140.0, 400.0)];
        let poly = corridor_polyline(&group, Orientation::Vertical, 10.0);
        assert_eq!(poly.len(), 2);
        assert_relative_eq!(poly[0].x, 120.0);
        assert_relative_eq!(poly[0].y, 0.0);
        assert_relative_eq!(poly[1].y, 400.0);
    }

    #[test]
    fn short_lines_are_not_hallways() {
        let mut edges = GrayImage::new(600, 300);
        for x in 50..150 {
            edges.put_pixel(x, 100, Luma([255]));
        }
        assert!(detect_hallways(&edges, &HallwayConfig::default()).is_empty());
    }
}
