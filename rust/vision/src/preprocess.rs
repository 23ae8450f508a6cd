// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Image preprocessor: raw raster in, analysis-ready bundle out
//!
//! Steps run in a fixed order (annotation strip, grayscale, deskew, CLAHE,
//! median denoise, binarise, edges). Each step can be switched off in
//! [`PreprocessConfig`]; a disabled step passes its input through so the
//! bundle always has the same shape.

use image::{DynamicImage, GrayImage, Luma};
use imageproc::geometric_transformations::{rotate_about_center, Interpolation};
use imageproc::hough::{detect_lines, LineDetectionOptions};
use tracing::debug;

use crate::config::PreprocessConfig;
use crate::error::{Error, Result};
use crate::image_ops::{
    canny_edges, clahe, dilate_rect, median_denoise, otsu_threshold_inv, strip_colored_annotations,
    threshold_inv,
};
use crate::types::Point2D;

/// Output of [`preprocess`]. All images share the source dimensions.
#[derive(Debug, Clone)]
pub struct PreprocessedImage {
    /// Deskewed, contrast-enhanced, denoised grayscale
    pub gray: GrayImage,
    /// Ink mask (ink = 255)
    pub binary: GrayImage,
    pub edges: GrayImage,
    /// Skew that was corrected, in degrees (0 when none was applied)
    pub skew_angle: f64,
}

impl PreprocessedImage {
    pub fn width(&self) -> u32 {
        self.gray.width()
    }

    pub fn height(&self) -> u32 {
        self.gray.height()
    }

    /// Map a point found on the deskewed images back to source coordinates
    pub fn to_source(&self, p: Point2D) -> Point2D {
        transform_point(p, self.skew_angle, self.width(), self.height())
    }
}

/// Run the preprocessing chain on a decoded image
pub fn preprocess(image: &DynamicImage, config: &PreprocessConfig) -> Result<PreprocessedImage> {
    let (width, height) = (image.width(), image.height());
    if width == 0 || height == 0 {
        return Err(Error::InvalidImage(format!("image has no pixels ({}x{})", width, height)));
    }

    let gray = if config.strip_annotations {
        let rgb = strip_colored_annotations(&image.to_rgb8(), config.saturation_threshold);
        DynamicImage::ImageRgb8(rgb).to_luma8()
    } else {
        image.to_luma8()
    };

    preprocess_gray(gray, config)
}

/// Run the preprocessing chain from grayscale onward
pub fn preprocess_gray(gray: GrayImage, config: &PreprocessConfig) -> Result<PreprocessedImage> {
    if gray.width() == 0 || gray.height() == 0 {
        return Err(Error::InvalidImage("image has no pixels".into()));
    }

    let mut skew_angle = 0.0;
    let mut gray = gray;
    if config.deskew {
        let estimate = estimate_skew(&gray, config.canny_low, config.canny_high, config.skew_vote_threshold);
        if estimate.abs() > config.min_skew_degrees {
            gray = deskew(&gray, estimate);
            skew_angle = estimate;
        }
    }

    if config.equalize {
        gray = clahe(&gray, config.clahe_clip_limit, config.clahe_tiles);
    }
    if config.denoise {
        gray = median_denoise(&gray, config.median_radius);
    }

    let mut binary = if config.binarize {
        otsu_threshold_inv(&gray)
    } else {
        threshold_inv(&gray, 128)
    };
    if config.thicken {
        binary = dilate_rect(&binary, 2, 2);
    }

    let edges = if config.edges {
        canny_edges(&gray, config.canny_low, config.canny_high)
    } else {
        GrayImage::new(gray.width(), gray.height())
    };

    debug!(
        width = gray.width(),
        height = gray.height(),
        skew_angle,
        "preprocessed image"
    );

    Ok(PreprocessedImage {
        gray,
        binary,
        edges,
        skew_angle,
    })
}

/// Estimate content rotation (degrees, clockwise on screen) from dominant lines
///
/// Runs a full Hough line vote on the edge map and keeps lines whose normal
/// is within 10 degrees of an axis; the median deviation is the skew.
pub fn estimate_skew(gray: &GrayImage, canny_low: f32, canny_high: f32, vote_threshold: u32) -> f64 {
    let edges = canny_edges(gray, canny_low, canny_high);
    let options = LineDetectionOptions {
        vote_threshold,
        suppression_radius: 8,
    };

    let mut votes: Vec<f64> = detect_lines(&edges, options)
        .into_iter()
        .filter_map(|line| {
            let theta = line.angle_in_degrees as f64;
            if theta < 10.0 {
                Some(theta)
            } else if theta > 170.0 {
                Some(theta - 180.0)
            } else if theta > 80.0 && theta < 100.0 {
                Some(theta - 90.0)
            } else {
                None
            }
        })
        .collect();

    if votes.is_empty() {
        return 0.0;
    }
    votes.sort_by(f64::total_cmp);
    let mid = votes.len() / 2;
    if votes.len() % 2 == 0 {
        (votes[mid - 1] + votes[mid]) / 2.0
    } else {
        votes[mid]
    }
}

/// Rotate the image to undo `skew` degrees of clockwise rotation
pub fn deskew(gray: &GrayImage, skew: f64) -> GrayImage {
    rotate_about_center(
        gray,
        (-skew).to_radians() as f32,
        Interpolation::Bilinear,
        Luma([255]),
    )
}

/// Map a point on a deskewed image back into original coordinates
///
/// Inverse of [`deskew`]: rotates `p` by `skew` degrees about the image center.
pub fn transform_point(p: Point2D, skew: f64, width: u32, height: u32) -> Point2D {
    if skew == 0.0 {
        return p;
    }
    let cx = width as f64 / 2.0;
    let cy = height as f64 / 2.0;
    let (sin, cos) = skew.to_radians().sin_cos();
    let dx = p.x - cx;
    let dy = p.y - cy;
    Point2D::new(cx + dx * cos - dy * sin, cy + dx * sin + dy * cos).clamped(width, height)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use image::{Rgb, RgbImage};

    fn plan_image() -> DynamicImage {
        let mut img = RgbImage::from_pixel(120, 120, Rgb([255, 255, 255]));
        for i in 20..100 {
            for t in 0..3 {
                img.put_pixel(i, 20 + t, Rgb([0, 0, 0]));
                img.put_pixel(i, 97 + t, Rgb([0, 0, 0]));
                img.put_pixel(20 + t, i, Rgb([0, 0, 0]));
                img.put_pixel(97 + t, i, Rgb([0, 0, 0]));
            }
        }
        // Red dimension note inside the room
        for x in 40..80 {
            img.put_pixel(x, 60, Rgb([230, 20, 20]));
        }
        DynamicImage::ImageRgb8(img)
    }

    #[test]
    fn bundle_has_uniform_shape() {
        let out = preprocess(&plan_image(), &PreprocessConfig::default()).unwrap();
        assert_eq!(out.gray.dimensions(), (120, 120));
        assert_eq!(out.binary.dimensions(), (120, 120));
        assert_eq!(out.edges.dimensions(), (120, 120));
        assert_eq!(out.skew_angle, 0.0);
    }

    #[test]
    fn ink_is_foreground_and_annotations_are_gone() {
        let out = preprocess(&plan_image(), &PreprocessConfig::default()).unwrap();
        assert_eq!(out.binary.get_pixel(60, 21).0[0], 255);
        assert_eq!(out.binary.get_pixel(60, 60).0[0], 0);
    }

    #[test]
    fn disabling_every_step_keeps_the_bundle_shape() {
        let config = PreprocessConfig {
            strip_annotations: false,
            deskew: false,
            equalize: false,
            denoise: false,
            binarize: false,
            thicken: false,
            edges: false,
            ..Default::default()
        };
        let out = preprocess(&plan_image(), &config).unwrap();
        assert_eq!(out.binary.dimensions(), (120, 120));
        assert_eq!(out.edges.dimensions(), (120, 120));
        // Fixed cut still separates ink
        assert_eq!(out.binary.get_pixel(60, 21).0[0], 255);
    }

    #[test]
    fn empty_image_is_invalid() {
        let img = DynamicImage::new_luma8(0, 0);
        assert!(matches!(
            preprocess(&img, &PreprocessConfig::default()),
            Err(Error::InvalidImage(_))
        ));
    }

    #[test]
    fn transform_point_inverts_rotation() {
        let p = Point2D::new(80.0, 50.0);
        let back = transform_point(p, 5.0, 200, 100);
        let forward = transform_point(back, -5.0, 200, 100);
        assert_abs_diff_eq!(forward.x, p.x, epsilon = 1e-9);
        assert_abs_diff_eq!(forward.y, p.y, epsilon = 1e-9);
        assert_eq!(transform_point(p, 0.0, 200, 100), p);
    }
}
