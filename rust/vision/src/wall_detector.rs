// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Wall detection: Hough segments with size-adaptive parameters, then
//! merging of collinear fragments and removal of near duplicates.

use image::GrayImage;
use tracing::debug;

use crate::config::WallConfig;
use crate::geometry::{fit_line, perpendicular_distance};
use crate::line_ops::{angle_difference_degrees, detect_lines, min_endpoint_distance, HoughParams};
use crate::types::{DetectedLine, Point2D, Wall};

/// Hough and merge thresholds resolved for one image size
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WallParams {
    pub hough: HoughParams,
    pub merge_distance: f64,
    pub duplicate_distance: f64,
}

impl WallParams {
    /// Scale every unset threshold with the smaller image side
    pub fn for_image(width: u32, height: u32, config: &WallConfig) -> Self {
        let min_dim = width.min(height) as f64;
        Self {
            hough: HoughParams {
                threshold: config
                    .hough_threshold
                    .unwrap_or_else(|| (min_dim / 40.0).max(30.0) as u32),
                min_line_length: config.min_length.unwrap_or_else(|| (min_dim / 50.0).max(20.0)),
                max_line_gap: config.max_gap.unwrap_or_else(|| (min_dim / 100.0).max(5.0)),
            },
            merge_distance: config.merge_distance.unwrap_or_else(|| (min_dim / 100.0).max(10.0)),
            duplicate_distance: config
                .duplicate_distance
                .unwrap_or_else(|| (min_dim / 80.0).max(10.0)),
        }
    }

    /// Looser parameters for a second pass when the first finds nothing
    fn relaxed(&self) -> HoughParams {
        HoughParams {
            threshold: (self.hough.threshold / 2).max(15),
            min_line_length: self.hough.min_line_length / 2.0,
            max_line_gap: self.hough.max_line_gap * 2.0,
        }
    }
}

/// Detect walls on an edge map (or binary ink mask)
///
/// An image with no line evidence yields an empty list.
pub fn detect_walls(edges: &GrayImage, config: &WallConfig) -> Vec<Wall> {
    let (width, height) = edges.dimensions();
    let params = WallParams::for_image(width, height, config);

    let mut raw = detect_lines(edges, &params.hough);
    if raw.is_empty() {
        debug!("no wall lines found, retrying with relaxed parameters");
        raw = detect_lines(edges, &params.relaxed());
    }

    let max_dim = width.max(height).max(1) as f64;
    let scored: Vec<DetectedLine> = raw
        .into_iter()
        .filter(|line| line.length() >= 0.7 * params.hough.min_line_length)
        .map(|mut line| {
            line.confidence = score_line(&line, max_dim, config);
            line
        })
        .collect();

    let merged = merge_nearby_walls(&scored, params.merge_distance, config.merge_angle);
    let unique = filter_duplicate_walls(merged, params.duplicate_distance);

    debug!(
        lines = scored.len(),
        walls = unique.len(),
        "wall detection complete"
    );

    unique
        .into_iter()
        .enumerate()
        .map(|(i, line)| {
            Wall::with_axis_tolerance(
                format!("wall_{}", i + 1),
                line.start,
                line.end,
                line.confidence,
                config.axis_tolerance,
            )
        })
        .collect()
}

/// Confidence grows with length; axis-aligned segments start higher
fn score_line(line: &DetectedLine, max_dim: f64, config: &WallConfig) -> f64 {
    let axis = line.axis_angle_degrees();
    let aligned = axis < config.axis_tolerance || axis > 90.0 - config.axis_tolerance;
    let base = if aligned {
        config.axis_confidence
    } else {
        config.off_axis_confidence
    };
    (base + line.length() / (2.0 * max_dim)).min(0.95)
}

/// Merge near-parallel, near-collinear segments whose endpoints come close
pub fn merge_nearby_walls(lines: &[DetectedLine], distance: f64, max_angle: f64) -> Vec<DetectedLine> {
    let reach = 3.0 * distance;
    let mut used = vec![false; lines.len()];
    let mut merged = Vec::new();

    for (i, seed) in lines.iter().enumerate() {
        if used[i] {
            continue;
        }
        used[i] = true;
        let mut group = vec![seed];

        for (j, other) in lines.iter().enumerate().skip(i + 1) {
            if used[j] {
                continue;
            }
            if angle_difference_degrees(seed, other) > max_angle {
                continue;
            }
            if min_endpoint_distance(seed, other) >= reach {
                continue;
            }
            if perpendicular_distance(&other.midpoint(), &seed.start, &seed.end) > reach {
                continue;
            }
            used[j] = true;
            group.push(other);
        }

        merged.push(merge_wall_group(&group));
    }

    merged
}

/// Refit one line through every endpoint and keep the extreme projections
fn merge_wall_group(group: &[&DetectedLine]) -> DetectedLine {
    if group.len() == 1 {
        return group[0].clone();
    }

    let endpoints: Vec<Point2D> = group.iter().flat_map(|l| [l.start, l.end]).collect();
    let avg_confidence = group.iter().map(|l| l.confidence).sum::<f64>() / group.len() as f64;

    let Some(fit) = fit_line(&endpoints) else {
        return group[0].clone();
    };

    let (min_t, max_t) = endpoints
        .iter()
        .map(|p| fit.project(p))
        .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), t| (lo.min(t), hi.max(t)));

    DetectedLine {
        start: fit.point_at(min_t),
        end: fit.point_at(max_t),
        confidence: (avg_confidence + 0.05).min(0.95),
    }
}

/// Drop walls whose center sits within `min_distance` of a longer wall's center
pub fn filter_duplicate_walls(mut lines: Vec<DetectedLine>, min_distance: f64) -> Vec<DetectedLine> {
    lines.sort_by(|a, b| b.length().total_cmp(&a.length()));

    let mut kept: Vec<DetectedLine> = Vec::with_capacity(lines.len());
    for line in lines {
        let center = line.midpoint();
        if kept.iter().all(|k| k.midpoint().distance_to(&center) >= min_distance) {
            kept.push(line);
        }
    }
    kept
}

/// Greedily cluster points closer than `distance` and return cluster centroids
pub fn cluster_endpoints(points: &[Point2D], distance: f64) -> Vec<Point2D> {
    let mut used = vec![false; points.len()];
    let mut centroids = Vec::new();

    for (i, p) in points.iter().enumerate() {
        if used[i] {
            continue;
        }
        used[i] = true;
        let mut members = vec![*p];
        for (j, q) in points.iter().enumerate().skip(i + 1) {
            if !used[j] && p.distance_to(q) < distance {
                used[j] = true;
                members.push(*q);
            }
        }
        let n = members.len() as f64;
        centroids.push(Point2D::new(
            members.iter().map(|m| m.x).sum::<f64>() / n,
            members.iter().map(|m| m.y).sum::<f64>() / n,
        ));
    }

    centroids
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use image::Luma;

    fn line(x1: f64, y1: f64, x2: f64, y2: f64) -> DetectedLine {
        DetectedLine::new(Point2D::new(x1, y1), Point2D::new(x2, y2))
    }

    fn edge_map_with_walls() -> GrayImage {
        let mut img = GrayImage::new(300, 300);
        for x in 30..270 {
            img.put_pixel(x, 40, Luma([255]));
            img.put_pixel(x, 260, Luma([255]));
        }
        for y in 40..260 {
            img.put_pixel(30, y, Luma([255]));
            img.put_pixel(270, y, Luma([255]));
        }
        img
    }

    #[test]
    fn adaptive_parameters_follow_image_size() {
        let small = WallParams::for_image(400, 300, &WallConfig::default());
        assert_eq!(small.hough.threshold, 30);
        assert_relative_eq!(small.hough.min_line_length, 20.0);
        assert_relative_eq!(small.hough.max_line_gap, 5.0);

        let large = WallParams::for_image(4000, 3000, &WallConfig::default());
        assert_eq!(large.hough.threshold, 75);
        assert_relative_eq!(large.hough.min_line_length, 60.0);
        assert_relative_eq!(large.hough.max_line_gap, 30.0);
        assert_relative_eq!(large.merge_distance, 30.0);
    }

    #[test]
    fn finds_axis_aligned_walls() {
        let walls = detect_walls(&edge_map_with_walls(), &WallConfig::default());
        assert!(walls.len() >= 4);
        assert!(walls.iter().any(|w| w.is_horizontal && w.length > 200.0));
        assert!(walls.iter().any(|w| w.is_vertical && w.length > 200.0));
        for w in &walls {
            assert!(w.confidence >= 0.5 && w.confidence <= 0.95);
        }
    }

    #[test]
    fn blank_edge_map_gives_no_walls() {
        let edges = GrayImage::new(200, 200);
        assert!(detect_walls(&edges, &WallConfig::default()).is_empty());
    }

    #[test]
    fn merges_collinear_fragments() {
        let lines = vec![line(0.0, 100.0, 80.0, 100.0), line(90.0, 101.0, 200.0, 101.0)];
        let merged = merge_nearby_walls(&lines, 10.0, 15.0);
        assert_eq!(merged.len(), 1);
        assert_relative_eq!(merged[0].length(), 200.0, epsilon = 0.5);
    }

    #[test]
    fn keeps_door_gap_between_fragments() {
        let lines = vec![line(0.0, 100.0, 80.0, 100.0), line(140.0, 100.0, 220.0, 100.0)];
        assert_eq!(merge_nearby_walls(&lines, 10.0, 15.0).len(), 2);
    }

    #[test]
    fn duplicate_filter_keeps_longer() {
        let lines = vec![line(0.0, 50.0, 60.0, 50.0), line(-20.0, 52.0, 80.0, 52.0)];
        let kept = filter_duplicate_walls(lines, 10.0);
        assert_eq!(kept.len(), 1);
        assert_relative_eq!(kept[0].length(), 100.0, epsilon = 0.1);
    }

    #[test]
    fn endpoint_clusters_collapse_to_centroid() {
        let pts = vec![
            Point2D::new(0.0, 0.0),
            Point2D::new(4.0, 0.0),
            Point2D::new(100.0, 100.0),
        ];
        let clusters = cluster_endpoints(&pts, 15.0);
        assert_eq!(clusters.len(), 2);
        assert_relative_eq!(clusters[0].x, 2.0);
    }
}
