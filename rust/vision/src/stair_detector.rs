// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Staircase detection: runs of short, evenly spaced parallel lines

use image::GrayImage;
use tracing::debug;

use crate::config::StairConfig;
use crate::line_ops::{axis_of, detect_lines, HoughParams};
use crate::types::{BoundingBox, DetectedLine, Orientation, Point2D, Stair};

/// Detect staircases on an edge map
pub fn detect_stairs(edges: &GrayImage, config: &StairConfig) -> Vec<Stair> {
    let params = HoughParams {
        threshold: config.hough_threshold,
        min_line_length: config.min_step_length,
        max_line_gap: config.max_gap,
    };
    let steps: Vec<DetectedLine> = detect_lines(edges, &params)
        .into_iter()
        .filter(|l| l.length() <= config.max_step_length)
        .collect();

    let mut stairs = Vec::new();
    for orientation in [Orientation::Horizontal, Orientation::Vertical] {
        let lines: Vec<DetectedLine> = steps
            .iter()
            .filter(|l| axis_of(l, config.axis_tolerance) == Some(orientation))
            .cloned()
            .collect();
        stairs.extend(group_steps(lines, orientation, config));
    }

    for (i, stair) in stairs.iter_mut().enumerate() {
        stair.id = format!("stair_{}", i + 1);
    }

    debug!(steps = steps.len(), stairs = stairs.len(), "stair detection complete");
    stairs
}

/// (cross-axis position, along-axis start, along-axis end)
fn step_span(line: &DetectedLine, orientation: Orientation) -> (f64, f64, f64) {
    let mid = line.midpoint();
    match orientation {
        Orientation::Horizontal => (mid.y, line.start.x.min(line.end.x), line.start.x.max(line.end.x)),
        Orientation::Vertical => (mid.x, line.start.y.min(line.end.y), line.start.y.max(line.end.y)),
    }
}

/// Greedy grouping of sorted steps with spacing measured from the last accepted step
fn group_steps(mut lines: Vec<DetectedLine>, orientation: Orientation, config: &StairConfig) -> Vec<Stair> {
    lines.sort_by(|a, b| {
        step_span(a, orientation)
            .0
            .total_cmp(&step_span(b, orientation).0)
    });

    let mut used = vec![false; lines.len()];
    let mut stairs = Vec::new();

    for i in 0..lines.len() {
        if used[i] {
            continue;
        }
        let seed = step_span(&lines[i], orientation);
        let mut members = vec![i];
        // Near-duplicate edges of an accepted step
        let mut absorbed = Vec::new();
        let mut last = seed.0;

        for (j, line) in lines.iter().enumerate().skip(i + 1) {
            if used[j] {
                continue;
            }
            let span = step_span(line, orientation);
            let spacing = span.0 - last;
            if spacing > config.max_spacing {
                break;
            }
            let overlaps = span.1 < seed.2 && span.2 > seed.1;
            if !overlaps {
                continue;
            }
            if spacing >= config.min_spacing {
                members.push(j);
                last = span.0;
            } else {
                absorbed.push(j);
            }
        }

        if members.len() < config.min_steps {
            continue;
        }
        for &m in members.iter().chain(&absorbed) {
            used[m] = true;
        }

        let points: Vec<Point2D> = members
            .iter()
            .flat_map(|&m| [lines[m].start, lines[m].end])
            .collect();
        let Some(bbox) = BoundingBox::from_points(&points) else {
            continue;
        };
        stairs.push(Stair {
            id: String::new(),
            center: bbox.center(),
            bbox,
            step_count: members.len(),
            orientation,
        });
    }

    stairs
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use image::Luma;

    fn step(y: f64) -> DetectedLine {
        DetectedLine::new(Point2D::new(100.0, y), Point2D::new(160.0, y))
    }

    #[test]
    fn evenly_spaced_steps_form_a_stair() {
        let lines: Vec<DetectedLine> = (0..5).map(|i| step(50.0 + 15.0 * i as f64)).collect();
        let stairs = group_steps(lines, Orientation::Horizontal, &StairConfig::default());
        assert_eq!(stairs.len(), 1);
        assert_eq!(stairs[0].step_count, 5);
        assert_relative_eq!(stairs[0].bbox.height, 60.0);
        assert_relative_eq!(stairs[0].center.x, 130.0);
    }

    #[test]
    fn two_lines_are_not_enough() {
        let lines = vec![step(50.0), step(65.0)];
        assert!(group_steps(lines, Orientation::Horizontal, &StairConfig::default()).is_empty());
    }

    #[test]
    fn close_duplicates_are_skipped_not_counted() {
        // Edge pairs 2px apart, steps 16px apart
        let lines: Vec<DetectedLine> = (0..4)
            .flat_map(|i| {
                let y = 40.0 + 16.0 * i as f64;
                [step(y), step(y + 2.0)]
            })
            .collect();
        let stairs = group_steps(lines, Orientation::Horizontal, &StairConfig::default());
        assert_eq!(stairs.len(), 1);
        assert_eq!(stairs[0].step_count, 4);
    }

    #[test]
    fn detects_stairs_on_edge_map() {
        let mut edges = GrayImage::new(200, 200);
        for i in 0..6 {
            let y = 40 + 18 * i;
            for x in 60..120 {
                edges.put_pixel(x, y, Luma([255]));
            }
        }
        let stairs = detect_stairs(&edges, &StairConfig::default());
        assert_eq!(stairs.len(), 1);
        assert_eq!(stairs[0].id, "stair_1");
        assert_eq!(stairs[0].step_count, 6);
        assert_eq!(stairs[0].orientation, Orientation::Horizontal);
    }
}
