// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Line segment detection and segment-level helpers

use crate::types::{DetectedLine, Orientation, Point2D};
use image::GrayImage;
use std::f64::consts::PI;

/// Upper bound on accumulator peaks examined per image
const MAX_PEAKS: usize = 500;

/// Perpendicular band (pixels) around a Hough line that counts as on-line
const LINE_BAND: f64 = 2.0;

/// Parameters of the probabilistic Hough segment extractor
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HoughParams {
    /// Minimum accumulator votes for a candidate line
    pub threshold: u32,
    pub min_line_length: f64,
    /// Largest hole bridged inside one segment
    pub max_line_gap: f64,
}

/// Detect line segments using a probabilistic Hough transform
///
/// Votes every edge pixel into a (theta, rho) accumulator at 1 degree / 1 pixel
/// resolution, walks peaks strongest-first, and splits the pixels near each
/// peak line into segments wherever consecutive pixels are further apart
/// than `max_line_gap`. Pixels claimed by an accepted segment do not vote for
/// later peaks.
pub fn detect_lines(edges: &GrayImage, params: &HoughParams) -> Vec<DetectedLine> {
    let width = edges.width() as i32;
    let height = edges.height() as i32;
    if width == 0 || height == 0 {
        return Vec::new();
    }

    let num_thetas = 180usize;
    let (cos_table, sin_table): (Vec<f64>, Vec<f64>) = (0..num_thetas)
        .map(|i| {
            let theta = i as f64 * PI / num_thetas as f64;
            (theta.cos(), theta.sin())
        })
        .unzip();

    let max_rho = ((width * width + height * height) as f64).sqrt();
    let num_rhos = (2.0 * max_rho) as usize + 1;

    let edge_points: Vec<(i32, i32)> = edges
        .enumerate_pixels()
        .filter(|(_, _, p)| p.0[0] > 128)
        .map(|(x, y, _)| (x as i32, y as i32))
        .collect();
    if edge_points.len() < 2 {
        return Vec::new();
    }

    let mut accumulator = vec![0u32; num_thetas * num_rhos];
    for &(x, y) in &edge_points {
        for t in 0..num_thetas {
            let rho = x as f64 * cos_table[t] + y as f64 * sin_table[t];
            let rho_idx = (rho + max_rho) as usize;
            if rho_idx < num_rhos {
                accumulator[t * num_rhos + rho_idx] += 1;
            }
        }
    }

    let mut peaks: Vec<(usize, usize, u32)> = accumulator
        .iter()
        .enumerate()
        .filter(|(_, &votes)| votes >= params.threshold.max(1))
        .map(|(i, &votes)| (i / num_rhos, i % num_rhos, votes))
        .collect();
    peaks.sort_by(|a, b| b.2.cmp(&a.2));

    let mut lines = Vec::new();
    let mut used = vec![false; edge_points.len()];

    for &(t, rho_idx, _) in peaks.iter().take(MAX_PEAKS) {
        let rho = rho_idx as f64 - max_rho;
        let (cos_t, sin_t) = (cos_table[t], sin_table[t]);

        let mut on_line: Vec<(i32, i32, usize)> = edge_points
            .iter()
            .enumerate()
            .filter(|(i, &(x, y))| {
                !used[*i] && (x as f64 * cos_t + y as f64 * sin_t - rho).abs() < LINE_BAND
            })
            .map(|(i, &(x, y))| (x, y, i))
            .collect();
        if on_line.len() < 2 {
            continue;
        }

        // Order along the line direction (-sin, cos)
        let along = |p: &(i32, i32, usize)| p.0 as f64 * -sin_t + p.1 as f64 * cos_t;
        on_line.sort_by(|a, b| along(a).total_cmp(&along(b)));

        let mut run_start = 0;
        for i in 1..=on_line.len() {
            let breaks = i == on_line.len() || {
                let dx = (on_line[i].0 - on_line[i - 1].0) as f64;
                let dy = (on_line[i].1 - on_line[i - 1].1) as f64;
                (dx * dx + dy * dy).sqrt() > params.max_line_gap
            };
            if !breaks {
                continue;
            }

            let run = &on_line[run_start..i];
            if run.len() >= 2 {
                let first = run[0];
                let last = run[run.len() - 1];
                let line = DetectedLine::new(
                    Point2D::new(first.0 as f64, first.1 as f64),
                    Point2D::new(last.0 as f64, last.1 as f64),
                );
                if line.length() >= params.min_line_length {
                    for p in run {
                        used[p.2] = true;
                    }
                    lines.push(line);
                }
            }
            run_start = i;
        }
    }

    lines
}

/// Undirected angle between two segments in degrees, `[0, 90]`
pub fn angle_difference_degrees(a: &DetectedLine, b: &DetectedLine) -> f64 {
    let mut diff = (a.angle() - b.angle()).abs() % PI;
    if diff > PI / 2.0 {
        diff = PI - diff;
    }
    diff.to_degrees()
}

/// Classify a segment as horizontal or vertical within `tolerance` degrees
pub fn axis_of(line: &DetectedLine, tolerance: f64) -> Option<Orientation> {
    let direction = line.direction_degrees();
    if direction < tolerance || direction > 180.0 - tolerance {
        Some(Orientation::Horizontal)
    } else if (direction - 90.0).abs() < tolerance {
        Some(Orientation::Vertical)
    } else {
        None
    }
}

/// Smallest distance between any endpoint of `a` and any endpoint of `b`
pub fn min_endpoint_distance(a: &DetectedLine, b: &DetectedLine) -> f64 {
    [
        a.start.distance_to(&b.start),
        a.start.distance_to(&b.end),
        a.end.distance_to(&b.start),
        a.end.distance_to(&b.end),
    ]
    .into_iter()
    .fold(f64::INFINITY, f64::min)
}
