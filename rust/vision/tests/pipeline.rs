// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use image::{DynamicImage, GrayImage, Luma};
use imageproc::geometric_transformations::{rotate_about_center, Interpolation};
use wayplan_vision::{
    detect_floor_plan, extract_skeleton_from_image, preprocess, transform_point, FloorPlanDetections,
    PipelineConfig, Point2D, SkeletonNodeKind, TextRecognizer, TextRecord,
};

fn ink(img: &mut GrayImage, x0: u32, y0: u32, x1: u32, y1: u32) {
    for y in y0..y1 {
        for x in x0..x1 {
            img.put_pixel(x, y, Luma([0]));
        }
    }
}

/// Two rooms side by side inside a closed outline
fn two_room_plan() -> DynamicImage {
    let mut img = GrayImage::from_pixel(400, 300, Luma([255]));
    ink(&mut img, 20, 20, 380, 26);
    ink(&mut img, 20, 274, 380, 280);
    ink(&mut img, 20, 20, 26, 280);
    ink(&mut img, 374, 20, 380, 280);
    ink(&mut img, 197, 20, 203, 280);
    DynamicImage::ImageLuma8(img)
}

struct RoomLabels;

impl TextRecognizer for RoomLabels {
    fn recognize(&self, _image: &GrayImage) -> wayplan_vision::Result<Vec<TextRecord>> {
        Ok(vec![
            TextRecord { text: "Lobby".into(), left: 80.0, top: 140.0, width: 40.0, height: 12.0, confidence: 91.0 },
            TextRecord { text: "Office".into(), left: 270.0, top: 140.0, width: 40.0, height: 12.0, confidence: 88.0 },
            TextRecord { text: "?".into(), left: 270.0, top: 200.0, width: 8.0, height: 8.0, confidence: 12.0 },
        ])
    }
}

#[test]
fn two_room_plan_is_detected() {
    let det = detect_floor_plan(&two_room_plan(), &PipelineConfig::default(), None).unwrap();

    assert_eq!(det.image_size.width, 400);
    assert!(det.walls.iter().any(|w| w.is_horizontal));
    assert!(det.walls.iter().any(|w| w.is_vertical));
    assert!(det.walls.iter().all(|w| w.confidence > 0.0 && w.confidence <= 0.95));
    assert!(!det.rooms.is_empty());
    for room in &det.rooms {
        assert!(room.bbox.x >= 0.0 && room.bbox.right() <= 400.0);
        assert!(room.bbox.y >= 0.0 && room.bbox.bottom() <= 300.0);
    }
    assert!(det.texts.is_empty());
}

#[test]
fn text_labels_rename_rooms() {
    let det = detect_floor_plan(&two_room_plan(), &PipelineConfig::default(), Some(&RoomLabels)).unwrap();
    assert_eq!(det.texts.len(), 2);
    let names: Vec<&str> = det.rooms.iter().map(|r| r.name.as_str()).collect();
    assert!(names.contains(&"Lobby") || names.contains(&"Office"));
}

#[test]
fn detection_document_round_trips_as_camel_case_json() {
    let det = detect_floor_plan(&two_room_plan(), &PipelineConfig::default(), None).unwrap();
    let json = serde_json::to_string(&det).unwrap();
    assert!(json.contains("\"imageSize\""));
    assert!(json.contains("\"isHorizontal\""));

    let back: FloorPlanDetections = serde_json::from_str(&json).unwrap();
    assert_eq!(back.walls.len(), det.walls.len());
    assert_eq!(back.rooms.len(), det.rooms.len());
}

#[test]
fn skeleton_stays_inside_the_outline() {
    let graph = extract_skeleton_from_image(&two_room_plan(), &PipelineConfig::default()).unwrap();
    assert!(!graph.nodes.is_empty());
    for node in &graph.nodes {
        assert!(node.position.x > 20.0 && node.position.x < 380.0);
        assert!(node.position.y > 20.0 && node.position.y < 280.0);
    }
    let ids: std::collections::HashSet<&str> = graph.nodes.iter().map(|n| n.id.as_str()).collect();
    for edge in &graph.edges {
        assert!(ids.contains(edge.from.as_str()) && ids.contains(edge.to.as_str()));
        assert!(edge.distance > 0.0);
    }
    let junctions = graph
        .nodes
        .iter()
        .filter(|n| n.kind == SkeletonNodeKind::Junction)
        .count();
    assert_eq!(junctions, graph.junction_count());
}

const SKEW: f64 = 4.0;

/// Two rooms in an 800x600 outline; returns the image and wall centerlines
fn large_plan() -> (GrayImage, Vec<(Point2D, Point2D)>) {
    let mut img = GrayImage::from_pixel(800, 600, Luma([255]));
    ink(&mut img, 40, 40, 760, 48);
    ink(&mut img, 40, 552, 760, 560);
    ink(&mut img, 40, 40, 48, 560);
    ink(&mut img, 752, 40, 760, 560);
    ink(&mut img, 396, 40, 404, 560);
    let p = Point2D::new;
    let centerlines = vec![
        (p(40.0, 44.0), p(760.0, 44.0)),
        (p(40.0, 556.0), p(760.0, 556.0)),
        (p(44.0, 40.0), p(44.0, 560.0)),
        (p(756.0, 40.0), p(756.0, 560.0)),
        (p(400.0, 40.0), p(400.0, 560.0)),
    ];
    (img, centerlines)
}

fn distance_to_segment(p: &Point2D, a: &Point2D, b: &Point2D) -> f64 {
    let (dx, dy) = (b.x - a.x, b.y - a.y);
    let t = (((p.x - a.x) * dx + (p.y - a.y) * dy) / (dx * dx + dy * dy)).clamp(0.0, 1.0);
    p.distance_to(&Point2D::new(a.x + t * dx, a.y + t * dy))
}

#[test]
fn skewed_plan_is_reported_in_source_coordinates() {
    let (straight, centerlines) = large_plan();
    let rotated = rotate_about_center(&straight, SKEW.to_radians() as f32, Interpolation::Bilinear, Luma([255]));
    let image = DynamicImage::ImageLuma8(rotated);
    let config = PipelineConfig::default();

    let pre = preprocess(&image, &config.preprocess).unwrap();
    assert!((pre.skew_angle - SKEW).abs() < 1.0, "estimated skew {}", pre.skew_angle);

    let det = detect_floor_plan(&image, &config, None).unwrap();
    let to_source = |p: Point2D| transform_point(p, SKEW, 800, 600);
    let truth: Vec<(Point2D, Point2D)> = centerlines.iter().map(|(a, b)| (to_source(*a), to_source(*b))).collect();

    assert!(!det.walls.is_empty());
    for wall in &det.walls {
        let mid = wall.center();
        let nearest = truth
            .iter()
            .map(|(a, b)| distance_to_segment(&mid, a, b))
            .fold(f64::INFINITY, f64::min);
        assert!(nearest < 10.0, "{} at ({:.1}, {:.1}) is {:.1}px off", wall.id, mid.x, mid.y, nearest);
    }

    // Long walls keep the tilt of the source image
    let long: Vec<_> = det.walls.iter().filter(|w| w.start.distance_to(&w.end) > 300.0).collect();
    assert!(!long.is_empty());
    for wall in long {
        let angle = (wall.end.y - wall.start.y).atan2(wall.end.x - wall.start.x).to_degrees();
        let tilt = angle.rem_euclid(90.0);
        assert!((tilt - SKEW).abs() < 1.5, "{} tilted {:.2}", wall.id, tilt);
    }

    let room_centers = [to_source(Point2D::new(222.0, 300.0)), to_source(Point2D::new(578.0, 300.0))];
    assert!(!det.rooms.is_empty());
    for room in &det.rooms {
        let nearest = room_centers
            .iter()
            .map(|c| c.distance_to(&room.center))
            .fold(f64::INFINITY, f64::min);
        assert!(nearest < 30.0, "{} centered {:.1}px from either room", room.id, nearest);
    }
}
