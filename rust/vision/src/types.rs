// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Detection records produced by the vision pipeline
//!
//! Every record is plain data: created once per pipeline run, serialised
//! with camelCase keys, and handed to the navigation graph builder.

use serde::{Deserialize, Serialize};

/// A 2D pixel coordinate (origin top-left)
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Default)]
pub struct Point2D {
    pub x: f64,
    pub y: f64,
}

impl Point2D {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    pub fn distance_to(&self, other: &Point2D) -> f64 {
        let dx = other.x - self.x;
        let dy = other.y - self.y;
        (dx * dx + dy * dy).sqrt()
    }

    pub fn midpoint(&self, other: &Point2D) -> Point2D {
        Point2D::new((self.x + other.x) / 2.0, (self.y + other.y) / 2.0)
    }

    pub fn is_finite(&self) -> bool {
        self.x.is_finite() && self.y.is_finite()
    }

    /// Clamp into `[0, width-1] x [0, height-1]`
    pub fn clamped(&self, width: u32, height: u32) -> Point2D {
        Point2D::new(
            self.x.clamp(0.0, width.saturating_sub(1) as f64),
            self.y.clamp(0.0, height.saturating_sub(1) as f64),
        )
    }
}

/// Axis-aligned bounding box in pixels
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Default)]
pub struct BoundingBox {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl BoundingBox {
    pub fn new(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// Box from a center point and size (the format ML detectors emit)
    pub fn from_center(cx: f64, cy: f64, width: f64, height: f64) -> Self {
        Self::new(cx - width / 2.0, cy - height / 2.0, width, height)
    }

    /// Tight box around a set of points. `None` for an empty set.
    pub fn from_points(points: &[Point2D]) -> Option<Self> {
        let first = points.first()?;
        let (mut min_x, mut min_y, mut max_x, mut max_y) = (first.x, first.y, first.x, first.y);
        for p in &points[1..] {
            min_x = min_x.min(p.x);
            min_y = min_y.min(p.y);
            max_x = max_x.max(p.x);
            max_y = max_y.max(p.y);
        }
        Some(Self::new(min_x, min_y, max_x - min_x, max_y - min_y))
    }

    pub fn right(&self) -> f64 {
        self.x + self.width
    }

    pub fn bottom(&self) -> f64 {
        self.y + self.height
    }

    pub fn center(&self) -> Point2D {
        Point2D::new(self.x + self.width / 2.0, self.y + self.height / 2.0)
    }

    pub fn area(&self) -> f64 {
        self.width * self.height
    }

    /// Inclusive containment test
    pub fn contains(&self, p: &Point2D) -> bool {
        p.x >= self.x && p.x <= self.right() && p.y >= self.y && p.y <= self.bottom()
    }

    pub fn expanded(&self, margin: f64) -> BoundingBox {
        BoundingBox::new(
            self.x - margin,
            self.y - margin,
            self.width + 2.0 * margin,
            self.height + 2.0 * margin,
        )
    }

    pub fn intersection_area(&self, other: &BoundingBox) -> f64 {
        let left = self.x.max(other.x);
        let top = self.y.max(other.y);
        let right = self.right().min(other.right());
        let bottom = self.bottom().min(other.bottom());
        if right <= left || bottom <= top {
            return 0.0;
        }
        (right - left) * (bottom - top)
    }

    /// Intersection over union, 0 when the union is degenerate
    pub fn iou(&self, other: &BoundingBox) -> f64 {
        let inter = self.intersection_area(other);
        let union = self.area() + other.area() - inter;
        if union > 0.0 {
            inter / union
        } else {
            0.0
        }
    }
}

/// Primary axis of a linear feature
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum Orientation {
    Horizontal,
    Vertical,
}

/// Raw line segment from the Hough stage
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DetectedLine {
    pub start: Point2D,
    pub end: Point2D,
    /// Detection confidence (0.0 - 1.0)
    pub confidence: f64,
}

impl DetectedLine {
    pub fn new(start: Point2D, end: Point2D) -> Self {
        Self {
            start,
            end,
            confidence: 1.0,
        }
    }

    pub fn length(&self) -> f64 {
        self.start.distance_to(&self.end)
    }

    /// Signed direction angle in radians
    pub fn angle(&self) -> f64 {
        (self.end.y - self.start.y).atan2(self.end.x - self.start.x)
    }

    /// Angle to the horizontal axis in degrees, folded into `[0, 90]`
    pub fn axis_angle_degrees(&self) -> f64 {
        (self.end.y - self.start.y)
            .abs()
            .atan2((self.end.x - self.start.x).abs())
            .to_degrees()
    }

    /// Unsigned direction angle in degrees, `[0, 180]`
    pub fn direction_degrees(&self) -> f64 {
        self.angle().to_degrees().abs()
    }

    pub fn midpoint(&self) -> Point2D {
        self.start.midpoint(&self.end)
    }
}

/// A straight wall segment
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Wall {
    pub id: String,
    pub start: Point2D,
    pub end: Point2D,
    pub length: f64,
    pub confidence: f64,
    pub is_horizontal: bool,
    pub is_vertical: bool,
}

impl Wall {
    /// Build a wall from two endpoints, deriving length and axis flags
    pub fn from_points(id: impl Into<String>, start: Point2D, end: Point2D, confidence: f64) -> Self {
        Self::with_axis_tolerance(id, start, end, confidence, 15.0)
    }

    /// Like [`Wall::from_points`] with a custom axis tolerance in degrees
    pub fn with_axis_tolerance(
        id: impl Into<String>,
        start: Point2D,
        end: Point2D,
        confidence: f64,
        tolerance: f64,
    ) -> Self {
        let line = DetectedLine::new(start, end);
        let axis = line.axis_angle_degrees();
        Self {
            id: id.into(),
            start,
            end,
            length: line.length(),
            confidence,
            is_horizontal: axis < tolerance,
            is_vertical: axis > 90.0 - tolerance,
        }
    }

    pub fn as_line(&self) -> DetectedLine {
        DetectedLine {
            start: self.start,
            end: self.end,
            confidence: self.confidence,
        }
    }

    pub fn center(&self) -> Point2D {
        self.start.midpoint(&self.end)
    }
}

/// Size tier assigned to a room before OCR naming
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum RoomKind {
    Corridor,
    SmallRoom,
    MediumRoom,
    LargeRoom,
    Hall,
    /// Supplied by an external detector, no size heuristic applied
    External,
}

impl RoomKind {
    pub fn label(&self) -> &'static str {
        match self {
            RoomKind::Corridor => "Corridor",
            RoomKind::SmallRoom => "Small Room",
            RoomKind::MediumRoom => "Medium Room",
            RoomKind::LargeRoom => "Large Room",
            RoomKind::Hall => "Hall",
            RoomKind::External => "Room",
        }
    }
}

/// An enclosed region classified as a room
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Room {
    pub id: String,
    pub bbox: BoundingBox,
    pub center: Point2D,
    /// Region area in square pixels
    pub area: f64,
    pub name: String,
    pub kind: RoomKind,
    pub confidence: f64,
}

/// Screen-space direction a door leaf swings toward
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum SwingDirection {
    Left,
    Right,
    Up,
    Down,
    #[default]
    Unknown,
}

impl SwingDirection {
    /// Classify a mean tip angle in degrees (`atan2` range)
    pub fn from_angle_degrees(angle: f64) -> Self {
        if (-45.0..45.0).contains(&angle) {
            SwingDirection::Right
        } else if (45.0..135.0).contains(&angle) {
            SwingDirection::Down
        } else if !(-135.0..135.0).contains(&angle) {
            SwingDirection::Left
        } else {
            SwingDirection::Up
        }
    }
}

/// A door sitting in a wall gap
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Door {
    pub id: String,
    /// Pivot point, used as the graph node position
    pub hinge: Point2D,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub swing_end: Option<Point2D>,
    /// Leaf radius, or gap width for open doorways
    pub radius: f64,
    /// Swing angle in degrees `[0, 360)`
    pub swing_angle: f64,
    #[serde(default)]
    pub swing_direction: SwingDirection,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub orientation: Option<Orientation>,
    pub confidence: f64,
    /// Whether a curved swing arc backs this door
    #[serde(default)]
    pub has_arc: bool,
}

/// Corridor centerline
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Hallway {
    pub id: String,
    pub polyline: Vec<Point2D>,
    pub orientation: Orientation,
}

/// A staircase found as a run of evenly spaced step lines
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Stair {
    pub id: String,
    pub bbox: BoundingBox,
    pub center: Point2D,
    pub step_count: usize,
    pub orientation: Orientation,
}

/// A recognised text fragment from the OCR collaborator
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TextRecord {
    pub text: String,
    pub left: f64,
    pub top: f64,
    pub width: f64,
    pub height: f64,
    /// Engine confidence in percent (0 - 100)
    pub confidence: f64,
}

impl TextRecord {
    pub fn bbox(&self) -> BoundingBox {
        BoundingBox::new(self.left, self.top, self.width, self.height)
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
pub struct ImageSize {
    pub width: u32,
    pub height: u32,
}

/// Complete detection document for one image
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(rename_all = "camelCase", default)]
pub struct FloorPlanDetections {
    pub walls: Vec<Wall>,
    pub rooms: Vec<Room>,
    pub doors: Vec<Door>,
    pub hallways: Vec<Hallway>,
    pub stairs: Vec<Stair>,
    pub texts: Vec<TextRecord>,
    pub image_size: ImageSize,
}

impl FloorPlanDetections {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            image_size: ImageSize { width, height },
            ..Default::default()
        }
    }

    pub fn is_empty(&self) -> bool {
        self.walls.is_empty()
            && self.rooms.is_empty()
            && self.doors.is_empty()
            && self.hallways.is_empty()
            && self.stairs.is_empty()
    }
}
