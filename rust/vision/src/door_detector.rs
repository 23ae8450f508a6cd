// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Door detection
//!
//! Doors are found by pairing door-swing arcs (small curved ink blobs) with
//! wall geometry. Two anchoring strategies share the arc extractor:
//!
//! - [`DoorStrategy::EndpointAnchored`] looks for arcs near clustered wall
//!   endpoints; the arc tip nearer the endpoint becomes the hinge.
//! - [`DoorStrategy::GapAnchored`] measures gaps between collinear walls and
//!   pairs each gap with the nearest arc. Wide gaps with no arc are still
//!   reported as open doorways.

use image::{GrayImage, Luma};
use imageproc::region_labelling::{connected_components, Connectivity};
use rustc_hash::FxHashMap;
use tracing::debug;

use crate::config::{DoorConfig, DoorStrategy};
use crate::geometry::{convex_hull, fit_line, polygon_area, polygon_perimeter};
use crate::types::{Door, Orientation, Point2D, SwingDirection, Wall};
use crate::wall_detector::cluster_endpoints;

/// A curved ink component that looks like a door swing
#[derive(Debug, Clone, PartialEq)]
pub struct ArcCandidate {
    pub tips: (Point2D, Point2D),
    pub centroid: Point2D,
    pub arc_length: f64,
    /// Max deviation from the fitted chord over arc length
    pub curvature: f64,
    pub circularity: f64,
}

impl ArcCandidate {
    fn nearest_tip_distance(&self, p: &Point2D) -> f64 {
        self.tips.0.distance_to(p).min(self.tips.1.distance_to(p))
    }

    /// Tips ordered (near, far) relative to `p`
    fn tips_from(&self, p: &Point2D) -> (Point2D, Point2D) {
        if self.tips.0.distance_to(p) <= self.tips.1.distance_to(p) {
            self.tips
        } else {
            (self.tips.1, self.tips.0)
        }
    }

    fn swing_direction(&self) -> SwingDirection {
        let (sx, sy) = [self.tips.0, self.tips.1]
            .iter()
            .map(|t| (t.y - self.centroid.y).atan2(t.x - self.centroid.x))
            .fold((0.0, 0.0), |(sx, sy), a| (sx + a.cos(), sy + a.sin()));
        SwingDirection::from_angle_degrees(sy.atan2(sx).to_degrees())
    }

    fn confidence(&self) -> f64 {
        (0.7 + 2.0 * self.curvature).min(0.95)
    }
}

/// A gap between two collinear wall segments
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WallGap {
    pub center: Point2D,
    pub width: f64,
    pub orientation: Orientation,
}

/// Detect doors with the configured strategy
pub fn detect_doors(gray: &GrayImage, walls: &[Wall], config: &DoorConfig) -> Vec<Door> {
    let arcs = extract_arcs(gray, config);
    let doors = match config.strategy {
        DoorStrategy::EndpointAnchored => doors_from_endpoints(&arcs, walls, config),
        DoorStrategy::GapAnchored => doors_from_gaps(&arcs, &find_wall_gaps(walls, config), config),
    };

    let doors: Vec<Door> = doors
        .into_iter()
        .filter(|d| d.radius >= config.min_radius && d.hinge.is_finite())
        .collect();
    let doors = deduplicate_doors(doors, config.dedup_distance);

    debug!(
        strategy = ?config.strategy,
        arcs = arcs.len(),
        doors = doors.len(),
        "door detection complete"
    );
    doors
}

/// Pull curved ink components out of a grayscale image
pub fn extract_arcs(gray: &GrayImage, config: &DoorConfig) -> Vec<ArcCandidate> {
    let mut ink = GrayImage::new(gray.width(), gray.height());
    for (x, y, p) in gray.enumerate_pixels() {
        if p.0[0] < config.ink_threshold {
            ink.put_pixel(x, y, Luma([255]));
        }
    }

    let labels = connected_components(&ink, Connectivity::Eight, Luma([0u8]));
    let mut components: FxHashMap<u32, Vec<Point2D>> = FxHashMap::default();
    for (x, y, p) in labels.enumerate_pixels() {
        let label = p.0[0];
        if label != 0 {
            components
                .entry(label)
                .or_default()
                .push(Point2D::new(x as f64, y as f64));
        }
    }

    let mut components: Vec<(u32, Vec<Point2D>)> = components.into_iter().collect();
    components.sort_by_key(|(label, _)| *label);

    let min_curvature = config.curvature_threshold();
    components
        .into_iter()
        .filter_map(|(_, pixels)| evaluate_arc(&pixels, config, min_curvature))
        .collect()
}

fn evaluate_arc(pixels: &[Point2D], config: &DoorConfig, min_curvature: f64) -> Option<ArcCandidate> {
    let count = pixels.len() as f64;
    if count < config.min_arc_area || count > config.max_arc_area {
        return None;
    }

    let (min_x, max_x, min_y, max_y) = pixels.iter().fold(
        (f64::INFINITY, f64::NEG_INFINITY, f64::INFINITY, f64::NEG_INFINITY),
        |(a, b, c, d), p| (a.min(p.x), b.max(p.x), c.min(p.y), d.max(p.y)),
    );
    let (w, h) = (max_x - min_x + 1.0, max_y - min_y + 1.0);
    if w.max(h) / w.min(h) > config.max_arc_aspect {
        return None;
    }

    let hull = convex_hull(pixels);
    let perimeter = polygon_perimeter(&hull);
    if perimeter <= 0.0 {
        return None;
    }
    let arc_length = perimeter / 2.0;
    if arc_length < config.min_arc_length || arc_length > config.max_arc_length {
        return None;
    }

    let circularity = 4.0 * std::f64::consts::PI * polygon_area(&hull) / (perimeter * perimeter);
    if circularity < config.min_circularity || circularity > config.max_circularity {
        return None;
    }

    let fit = fit_line(pixels)?;
    let max_deviation = pixels.iter().map(|p| fit.distance(p)).fold(0.0, f64::max);
    let curvature = max_deviation / (arc_length + 1.0);
    if curvature < min_curvature {
        return None;
    }

    let (lo, hi) = pixels.iter().fold((pixels[0], pixels[0]), |(lo, hi), p| {
        let t = fit.project(p);
        (
            if t < fit.project(&lo) { *p } else { lo },
            if t > fit.project(&hi) { *p } else { hi },
        )
    });

    Some(ArcCandidate {
        tips: (lo, hi),
        centroid: fit.centroid,
        arc_length,
        curvature,
        circularity,
    })
}

/// Endpoint-anchored pairing
///
/// Every (anchor, arc) pair within the search radius is a candidate; pairs
/// are accepted closest-first so each anchor and each arc is used once.
fn doors_from_endpoints(arcs: &[ArcCandidate], walls: &[Wall], config: &DoorConfig) -> Vec<Door> {
    let endpoints: Vec<Point2D> = walls.iter().flat_map(|w| [w.start, w.end]).collect();
    let anchors = cluster_endpoints(&endpoints, config.endpoint_cluster_distance);

    let mut pairs: Vec<(f64, usize, usize)> = Vec::new();
    for (a, anchor) in anchors.iter().enumerate() {
        for (i, arc) in arcs.iter().enumerate() {
            let d = arc.nearest_tip_distance(anchor);
            if d <= config.search_radius {
                pairs.push((d, a, i));
            }
        }
    }
    pairs.sort_by(|x, y| x.0.total_cmp(&y.0));

    let mut anchor_used = vec![false; anchors.len()];
    let mut arc_used = vec![false; arcs.len()];
    let mut doors = Vec::new();

    for (_, a, i) in pairs {
        if anchor_used[a] || arc_used[i] {
            continue;
        }
        anchor_used[a] = true;
        arc_used[i] = true;

        let arc = &arcs[i];
        let (hinge, swing_end) = arc.tips_from(&anchors[a]);
        doors.push(arc_door(arc, hinge, swing_end, hinge.distance_to(&swing_end), None));
    }

    doors
}

/// Gap-anchored pairing: every gap takes its nearest arc, wide gaps survive without one
fn doors_from_gaps(arcs: &[ArcCandidate], gaps: &[WallGap], config: &DoorConfig) -> Vec<Door> {
    let mut used = vec![false; arcs.len()];
    let mut doors = Vec::new();

    for gap in gaps {
        let reach = (2.0 * gap.width).max(100.0);
        let best = arcs
            .iter()
            .enumerate()
            .filter(|(i, arc)| !used[*i] && arc.nearest_tip_distance(&gap.center) <= reach)
            .min_by(|(_, a), (_, b)| {
                a.nearest_tip_distance(&gap.center)
                    .total_cmp(&b.nearest_tip_distance(&gap.center))
            });

        match best {
            Some((index, arc)) => {
                used[index] = true;
                let (_, far) = arc.tips_from(&gap.center);
                doors.push(arc_door(arc, gap.center, far, gap.width, Some(gap.orientation)));
            }
            None if gap.width > config.open_doorway_min_width => {
                doors.push(Door {
                    id: String::new(),
                    hinge: gap.center,
                    swing_end: None,
                    radius: gap.width,
                    swing_angle: 0.0,
                    swing_direction: SwingDirection::Unknown,
                    orientation: Some(gap.orientation),
                    confidence: 0.5,
                    has_arc: false,
                });
            }
            None => {}
        }
    }

    doors
}

fn arc_door(
    arc: &ArcCandidate,
    hinge: Point2D,
    swing_end: Point2D,
    radius: f64,
    orientation: Option<Orientation>,
) -> Door {
    Door {
        id: String::new(),
        hinge,
        swing_end: Some(swing_end),
        radius,
        swing_angle: (swing_end.y - hinge.y).atan2(swing_end.x - hinge.x).to_degrees(),
        swing_direction: arc.swing_direction(),
        orientation,
        confidence: arc.confidence(),
        has_arc: true,
    }
}

/// Gaps between collinear long walls, per axis
pub fn find_wall_gaps(walls: &[Wall], config: &DoorConfig) -> Vec<WallGap> {
    let long: Vec<&Wall> = walls
        .iter()
        .filter(|w| w.length >= config.gap_wall_min_length)
        .collect();

    // (cross-axis position, along-axis start, along-axis end)
    let mut horizontal: Vec<(f64, f64, f64)> = Vec::new();
    let mut vertical: Vec<(f64, f64, f64)> = Vec::new();
    for wall in long {
        let axis = wall.as_line().axis_angle_degrees();
        let c = wall.center();
        if axis < 30.0 {
            horizontal.push((c.y, wall.start.x.min(wall.end.x), wall.start.x.max(wall.end.x)));
        } else if axis > 60.0 {
            vertical.push((c.x, wall.start.y.min(wall.end.y), wall.start.y.max(wall.end.y)));
        }
    }

    let mut gaps = axis_gaps(horizontal, config, Orientation::Horizontal);
    gaps.extend(axis_gaps(vertical, config, Orientation::Vertical));
    gaps
}

fn axis_gaps(mut spans: Vec<(f64, f64, f64)>, config: &DoorConfig, orientation: Orientation) -> Vec<WallGap> {
    spans.sort_by(|a, b| a.0.total_cmp(&b.0));
    let mut used = vec![false; spans.len()];
    let mut gaps = Vec::new();

    for i in 0..spans.len() {
        if used[i] {
            continue;
        }
        let seed = spans[i].0;
        let mut group: Vec<(f64, f64, f64)> = Vec::new();
        for j in i..spans.len() {
            if !used[j] && (spans[j].0 - seed).abs() <= config.gap_alignment {
                used[j] = true;
                group.push(spans[j]);
            }
        }
        if group.len() < 2 {
            continue;
        }

        let cross = group.iter().map(|s| s.0).sum::<f64>() / group.len() as f64;
        group.sort_by(|a, b| a.1.total_cmp(&b.1));

        let mut reach = group[0].2;
        for span in &group[1..] {
            let width = span.1 - reach;
            if width >= config.min_gap_width && width <= config.max_gap_width {
                let along = (reach + span.1) / 2.0;
                let center = match orientation {
                    Orientation::Horizontal => Point2D::new(along, cross),
                    Orientation::Vertical => Point2D::new(cross, along),
                };
                gaps.push(WallGap {
                    center,
                    width,
                    orientation,
                });
            }
            reach = reach.max(span.2);
        }
    }

    gaps
}

/// Collapse doors whose hinges lie within `distance`, keeping the larger
/// radius and then the higher confidence; assigns `door_{n}` ids.
pub fn deduplicate_doors(mut doors: Vec<Door>, distance: f64) -> Vec<Door> {
    doors.sort_by(|a, b| {
        b.radius
            .total_cmp(&a.radius)
            .then(b.confidence.total_cmp(&a.confidence))
    });

    let mut kept: Vec<Door> = Vec::with_capacity(doors.len());
    for door in doors {
        if kept.iter().all(|k| k.hinge.distance_to(&door.hinge) > distance) {
            kept.push(door);
        }
    }

    for (i, door) in kept.iter_mut().enumerate() {
        door.id = format!("door_{}", i + 1);
    }
    kept
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    /// White canvas with a quarter-circle arc centered at (60, 60), radius 40,
    /// running from (100, 60) to (60, 100)
    fn arc_image() -> GrayImage {
        let mut img = GrayImage::from_pixel(200, 200, Luma([255]));
        for y in 60..110 {
            for x in 60..110 {
                let d = ((x as f64 - 60.0).powi(2) + (y as f64 - 60.0).powi(2)).sqrt();
                if (39.0..=41.0).contains(&d) {
                    img.put_pixel(x, y, Luma([0]));
                }
            }
        }
        img
    }

    fn wall(x1: f64, y1: f64, x2: f64, y2: f64) -> Wall {
        Wall::from_points("w", Point2D::new(x1, y1), Point2D::new(x2, y2), 0.9)
    }

    fn door_at(x: f64, y: f64, radius: f64, confidence: f64) -> Door {
        Door {
            id: String::new(),
            hinge: Point2D::new(x, y),
            swing_end: None,
            radius,
            swing_angle: 0.0,
            swing_direction: SwingDirection::Unknown,
            orientation: None,
            confidence,
            has_arc: false,
        }
    }

    #[test]
    fn extracts_quarter_arc() {
        let arcs = extract_arcs(&arc_image(), &DoorConfig::default());
        assert_eq!(arcs.len(), 1);
        let arc = &arcs[0];
        assert!(arc.curvature > 0.05);
        let near_a = arc.nearest_tip_distance(&Point2D::new(100.0, 60.0));
        let near_b = arc.nearest_tip_distance(&Point2D::new(60.0, 100.0));
        assert!(near_a < 5.0 && near_b < 5.0);
    }

    #[test]
    fn straight_stroke_is_not_an_arc() {
        let mut img = GrayImage::from_pixel(200, 200, Luma([255]));
        for x in 50..130 {
            for y in 100..103 {
                img.put_pixel(x, y, Luma([0]));
            }
        }
        assert!(extract_arcs(&img, &DoorConfig::default()).is_empty());
    }

    #[test]
    fn endpoint_anchor_picks_near_tip_as_hinge() {
        let walls = vec![wall(20.0, 58.0, 98.0, 58.0)];
        let doors = detect_doors(&arc_image(), &walls, &DoorConfig::default());
        assert_eq!(doors.len(), 1);
        let door = &doors[0];
        assert!(door.hinge.distance_to(&Point2D::new(100.0, 60.0)) < 5.0);
        assert!(door.has_arc);
        assert!(door.radius > 45.0 && door.radius < 65.0);
        assert_eq!(door.id, "door_1");
    }

    #[test]
    fn gap_anchor_pairs_gap_with_arc() {
        let walls = vec![wall(10.0, 60.0, 60.0, 60.0), wall(110.0, 60.0, 200.0, 60.0)];
        let config = DoorConfig {
            strategy: DoorStrategy::GapAnchored,
            ..Default::default()
        };
        let doors = detect_doors(&arc_image(), &walls, &config);
        assert_eq!(doors.len(), 1);
        assert!(doors[0].has_arc);
        assert_relative_eq!(doors[0].hinge.x, 85.0);
        assert_relative_eq!(doors[0].radius, 50.0);
        assert_eq!(doors[0].orientation, Some(Orientation::Horizontal));
    }

    #[test]
    fn wide_gap_without_arc_is_open_doorway() {
        let walls = vec![wall(0.0, 100.0, 100.0, 100.0), wall(150.0, 100.0, 300.0, 100.0)];
        let config = DoorConfig {
            strategy: DoorStrategy::GapAnchored,
            ..Default::default()
        };
        let blank = GrayImage::from_pixel(320, 200, Luma([255]));
        let doors = detect_doors(&blank, &walls, &config);
        assert_eq!(doors.len(), 1);
        assert_eq!(doors[0].swing_direction, SwingDirection::Unknown);
        assert!(!doors[0].has_arc);
        assert_relative_eq!(doors[0].confidence, 0.5);
        assert_relative_eq!(doors[0].hinge.x, 125.0);
    }

    #[test]
    fn narrow_gap_without_arc_is_ignored() {
        let walls = vec![wall(0.0, 100.0, 100.0, 100.0), wall(120.0, 100.0, 300.0, 100.0)];
        let gaps = find_wall_gaps(&walls, &DoorConfig::default());
        assert_eq!(gaps.len(), 1);
        assert_relative_eq!(gaps[0].width, 20.0);

        let config = DoorConfig {
            strategy: DoorStrategy::GapAnchored,
            ..Default::default()
        };
        let blank = GrayImage::from_pixel(320, 200, Luma([255]));
        assert!(detect_doors(&blank, &walls, &config).is_empty());
    }

    #[test]
    fn close_doors_collapse_to_larger_radius() {
        let doors = vec![door_at(100.0, 100.0, 30.0, 0.9), door_at(110.0, 100.0, 40.0, 0.6)];
        let kept = deduplicate_doors(doors, 35.0);
        assert_eq!(kept.len(), 1);
        assert_relative_eq!(kept[0].radius, 40.0);
        assert_relative_eq!(kept[0].hinge.x, 110.0);
    }

    #[test]
    fn no_walls_no_doors() {
        for strategy in [DoorStrategy::EndpointAnchored, DoorStrategy::GapAnchored] {
            let config = DoorConfig {
                strategy,
                ..Default::default()
            };
            assert!(detect_doors(&arc_image(), &[], &config).is_empty());
        }
    }
}
