// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Pixel-level operations shared by the preprocessor and detectors
//!
//! Binary images follow one convention throughout: foreground = 255,
//! background = 0.

use image::{GrayImage, Luma, RgbImage};
use imageproc::distance_transform::Norm;

pub const FOREGROUND: u8 = 255;
pub const BACKGROUND: u8 = 0;

/// Apply Canny edge detection
pub fn canny_edges(image: &GrayImage, low_threshold: f32, high_threshold: f32) -> GrayImage {
    imageproc::edges::canny(image, low_threshold, high_threshold)
}

/// Median filter, an edge-preserving denoise
pub fn median_denoise(image: &GrayImage, radius: u32) -> GrayImage {
    if radius == 0 {
        return image.clone();
    }
    imageproc::filter::median_filter(image, radius, radius)
}

/// Morphological dilation with a `kw x kh` rectangle anchored at its center
pub fn dilate_rect(image: &GrayImage, kw: u32, kh: u32) -> GrayImage {
    if let Some(radius) = square_radius(kw, kh) {
        return imageproc::morphology::dilate(image, Norm::LInf, radius);
    }
    rank_filter_rect(image, kw, kh, true)
}

/// Morphological erosion with a `kw x kh` rectangle anchored at its center
pub fn erode_rect(image: &GrayImage, kw: u32, kh: u32) -> GrayImage {
    if let Some(radius) = square_radius(kw, kh) {
        return imageproc::morphology::erode(image, Norm::LInf, radius);
    }
    rank_filter_rect(image, kw, kh, false)
}

/// Morphological closing (dilate then erode) - fills small gaps
pub fn morphological_close(image: &GrayImage, kw: u32, kh: u32) -> GrayImage {
    erode_rect(&dilate_rect(image, kw, kh), kw, kh)
}

/// Morphological opening (erode then dilate) - removes small noise
pub fn morphological_open(image: &GrayImage, kw: u32, kh: u32) -> GrayImage {
    dilate_rect(&erode_rect(image, kw, kh), kw, kh)
}

/// Odd square kernels map onto imageproc's L-infinity morphology
fn square_radius(kw: u32, kh: u32) -> Option<u8> {
    if kw == kh && kw % 2 == 1 && kw / 2 <= u8::MAX as u32 {
        Some((kw / 2) as u8)
    } else {
        None
    }
}

/// Separable min/max filter over a rectangle. Out-of-bounds samples are ignored.
fn rank_filter_rect(image: &GrayImage, kw: u32, kh: u32, take_max: bool) -> GrayImage {
    let pick = |a: u8, b: u8| if take_max { a.max(b) } else { a.min(b) };
    let width = image.width() as i64;
    let height = image.height() as i64;
    let (kw, kh) = (kw.max(1) as i64, kh.max(1) as i64);

    let mut horizontal = GrayImage::new(image.width(), image.height());
    for y in 0..height {
        for x in 0..width {
            let x0 = x - kw / 2;
            let mut acc = image.get_pixel(x as u32, y as u32).0[0];
            for sx in x0.max(0)..(x0 + kw).min(width) {
                acc = pick(acc, image.get_pixel(sx as u32, y as u32).0[0]);
            }
            horizontal.put_pixel(x as u32, y as u32, Luma([acc]));
        }
    }

    let mut result = GrayImage::new(image.width(), image.height());
    for y in 0..height {
        let y0 = y - kh / 2;
        for x in 0..width {
            let mut acc = horizontal.get_pixel(x as u32, y as u32).0[0];
            for sy in y0.max(0)..(y0 + kh).min(height) {
                acc = pick(acc, horizontal.get_pixel(x as u32, sy as u32).0[0]);
            }
            result.put_pixel(x as u32, y as u32, Luma([acc]));
        }
    }
    result
}

/// Invert a binary image
pub fn invert(image: &GrayImage) -> GrayImage {
    let mut result = image.clone();
    for pixel in result.pixels_mut() {
        pixel.0[0] = 255 - pixel.0[0];
    }
    result
}

/// Paint strongly saturated pixels white so only neutral ink remains
///
/// Saturation is HSV `S` on a 0-255 scale: `255 * (max - min) / max`.
pub fn strip_colored_annotations(image: &RgbImage, saturation_threshold: u8) -> RgbImage {
    let mut result = image.clone();
    for pixel in result.pixels_mut() {
        let [r, g, b] = pixel.0;
        let max = r.max(g).max(b);
        let min = r.min(g).min(b);
        if max == 0 {
            continue;
        }
        let saturation = 255 * (max - min) as u32 / max as u32;
        if saturation > saturation_threshold as u32 {
            pixel.0 = [255, 255, 255];
        }
    }
    result
}

/// Simple threshold - pixels at or above the threshold become white
pub fn threshold(image: &GrayImage, threshold_value: u8) -> GrayImage {
    let mut result = GrayImage::new(image.width(), image.height());

    for (x, y, pixel) in image.enumerate_pixels() {
        let value = if pixel.0[0] >= threshold_value { FOREGROUND } else { BACKGROUND };
        result.put_pixel(x, y, Luma([value]));
    }

    result
}

/// Inverse threshold - pixels at or below the threshold (ink) become white
pub fn threshold_inv(image: &GrayImage, threshold_value: u8) -> GrayImage {
    let mut result = GrayImage::new(image.width(), image.height());

    for (x, y, pixel) in image.enumerate_pixels() {
        let value = if pixel.0[0] <= threshold_value { FOREGROUND } else { BACKGROUND };
        result.put_pixel(x, y, Luma([value]));
    }

    result
}

/// Otsu binarisation with ink (dark) as foreground
pub fn otsu_threshold_inv(image: &GrayImage) -> GrayImage {
    threshold_inv(image, otsu_level(image))
}

/// Calculate Otsu's optimal threshold level
pub fn otsu_level(image: &GrayImage) -> u8 {
    let mut histogram = [0u32; 256];
    for pixel in image.pixels() {
        histogram[pixel.0[0] as usize] += 1;
    }

    let total_pixels = (image.width() * image.height()) as f64;
    if total_pixels == 0.0 {
        return 128;
    }

    let mut sum_total = 0.0;
    for (i, &count) in histogram.iter().enumerate() {
        sum_total += i as f64 * count as f64;
    }

    let mut sum_background = 0.0;
    let mut weight_background = 0.0;
    let mut max_variance = 0.0;
    let mut best_threshold = 0u8;

    for (t, &count) in histogram.iter().enumerate() {
        weight_background += count as f64;
        if weight_background == 0.0 {
            continue;
        }

        let weight_foreground = total_pixels - weight_background;
        if weight_foreground == 0.0 {
            break;
        }

        sum_background += t as f64 * count as f64;

        let mean_background = sum_background / weight_background;
        let mean_foreground = (sum_total - sum_background) / weight_foreground;

        let variance =
            weight_background * weight_foreground * (mean_background - mean_foreground).powi(2);

        if variance > max_variance {
            max_variance = variance;
            best_threshold = t as u8;
        }
    }

    best_threshold
}

/// Contrast-limited adaptive histogram equalisation
///
/// The image is split into `tiles x tiles` regions; each gets a clipped
/// histogram mapping, and pixels blend the four nearest mappings bilinearly.
pub fn clahe(image: &GrayImage, clip_limit: f64, tiles: u32) -> GrayImage {
    let (width, height) = image.dimensions();
    if width == 0 || height == 0 {
        return image.clone();
    }
    let tiles_x = tiles.clamp(1, width);
    let tiles_y = tiles.clamp(1, height);
    let tile_w = width.div_ceil(tiles_x);
    let tile_h = height.div_ceil(tiles_y);

    let mut luts = vec![[0u8; 256]; (tiles_x * tiles_y) as usize];
    for ty in 0..tiles_y {
        for tx in 0..tiles_x {
            let x0 = tx * tile_w;
            let y0 = ty * tile_h;
            let x1 = (x0 + tile_w).min(width);
            let y1 = (y0 + tile_h).min(height);
            luts[(ty * tiles_x + tx) as usize] = clipped_tile_lut(image, x0, y0, x1, y1, clip_limit);
        }
    }

    let mut result = GrayImage::new(width, height);
    for (x, y, pixel) in image.enumerate_pixels() {
        let value = pixel.0[0] as usize;
        let fx = ((x as f64 + 0.5) / tile_w as f64 - 0.5).max(0.0);
        let fy = ((y as f64 + 0.5) / tile_h as f64 - 0.5).max(0.0);
        let tx0 = (fx.floor() as u32).min(tiles_x - 1);
        let ty0 = (fy.floor() as u32).min(tiles_y - 1);
        let tx1 = (tx0 + 1).min(tiles_x - 1);
        let ty1 = (ty0 + 1).min(tiles_y - 1);
        let wx = (fx - tx0 as f64).clamp(0.0, 1.0);
        let wy = (fy - ty0 as f64).clamp(0.0, 1.0);

        let at = |tx: u32, ty: u32| luts[(ty * tiles_x + tx) as usize][value] as f64;
        let top = at(tx0, ty0) * (1.0 - wx) + at(tx1, ty0) * wx;
        let bottom = at(tx0, ty1) * (1.0 - wx) + at(tx1, ty1) * wx;
        let mapped = top * (1.0 - wy) + bottom * wy;
        result.put_pixel(x, y, Luma([mapped.round().clamp(0.0, 255.0) as u8]));
    }
    result
}

fn clipped_tile_lut(image: &GrayImage, x0: u32, y0: u32, x1: u32, y1: u32, clip_limit: f64) -> [u8; 256] {
    let mut histogram = [0u32; 256];
    for y in y0..y1 {
        for x in x0..x1 {
            histogram[image.get_pixel(x, y).0[0] as usize] += 1;
        }
    }
    let pixels = ((x1 - x0) * (y1 - y0)).max(1);

    // Clip and redistribute the excess uniformly
    let limit = ((clip_limit * pixels as f64 / 256.0) as u32).max(1);
    let mut excess = 0u32;
    for count in histogram.iter_mut() {
        if *count > limit {
            excess += *count - limit;
            *count = limit;
        }
    }
    let bonus = excess / 256;
    let remainder = (excess % 256) as usize;
    for (i, count) in histogram.iter_mut().enumerate() {
        *count += bonus + u32::from(i < remainder);
    }

    let mut lut = [0u8; 256];
    let mut cdf = 0u64;
    for (i, &count) in histogram.iter().enumerate() {
        cdf += count as u64;
        lut[i] = ((cdf as f64 * 255.0 / pixels as f64).round()).min(255.0) as u8;
    }
    lut
}

/// Flood-fill (4-connected) from `seeds` across pixels with value `target`
///
/// Returns a row-major visited mask.
pub fn flood_fill_mask(image: &GrayImage, seeds: &[(u32, u32)], target: u8) -> Vec<bool> {
    let width = image.width();
    let height = image.height();
    let mut visited = vec![false; (width * height) as usize];
    let mut stack: Vec<(u32, u32)> = seeds
        .iter()
        .copied()
        .filter(|&(x, y)| x < width && y < height)
        .collect();

    while let Some((x, y)) = stack.pop() {
        let idx = (y * width + x) as usize;
        if visited[idx] || image.get_pixel(x, y).0[0] != target {
            continue;
        }
        visited[idx] = true;

        if x > 0 {
            stack.push((x - 1, y));
        }
        if x + 1 < width {
            stack.push((x + 1, y));
        }
        if y > 0 {
            stack.push((x, y - 1));
        }
        if y + 1 < height {
            stack.push((x, y + 1));
        }
    }

    visited
}

/// Fill background holes fully enclosed by foreground
pub fn fill_holes(binary: &GrayImage) -> GrayImage {
    let (width, height) = binary.dimensions();
    if width == 0 || height == 0 {
        return binary.clone();
    }
    let mut seeds = Vec::with_capacity(2 * (width + height) as usize);
    for x in 0..width {
        seeds.push((x, 0));
        seeds.push((x, height - 1));
    }
    for y in 0..height {
        seeds.push((0, y));
        seeds.push((width - 1, y));
    }
    let outside = flood_fill_mask(binary, &seeds, BACKGROUND);

    let mut result = binary.clone();
    for (i, pixel) in result.pixels_mut().enumerate() {
        if pixel.0[0] == BACKGROUND && !outside[i] {
            pixel.0[0] = FOREGROUND;
        }
    }
    result
}
