// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! OCR association
//!
//! Text recognition itself is an external engine behind [`TextRecognizer`].
//! This module filters its records and attaches them to rooms.

use image::GrayImage;
use tracing::{debug, warn};

use crate::config::OcrConfig;
use crate::error::Result;
use crate::types::{Room, TextRecord};

/// An OCR engine returning positioned text records
pub trait TextRecognizer {
    fn recognize(&self, image: &GrayImage) -> Result<Vec<TextRecord>>;
}

/// Run the recognizer, treating a failure as "no text"
pub fn recognize_texts(
    recognizer: &dyn TextRecognizer,
    image: &GrayImage,
    config: &OcrConfig,
) -> Vec<TextRecord> {
    match recognizer.recognize(image) {
        Ok(records) => filter_texts(records, config.min_confidence, image.width(), image.height()),
        Err(err) => {
            warn!(error = %err, "text recognition failed, continuing without labels");
            Vec::new()
        }
    }
}

/// Drop low-confidence and blank records and clamp boxes to the image
pub fn filter_texts(records: Vec<TextRecord>, min_confidence: f64, width: u32, height: u32) -> Vec<TextRecord> {
    let (w, h) = (width as f64, height as f64);
    records
        .into_iter()
        .filter(|r| r.confidence >= min_confidence && !r.text.trim().is_empty())
        .filter(|r| [r.left, r.top, r.width, r.height].iter().all(|v| v.is_finite()))
        .map(|mut r| {
            r.text = r.text.trim().to_string();
            let left = r.left.clamp(0.0, w);
            let top = r.top.clamp(0.0, h);
            r.width = (r.left + r.width).clamp(0.0, w) - left;
            r.height = (r.top + r.height).clamp(0.0, h) - top;
            r.left = left;
            r.top = top;
            r
        })
        .collect()
}

/// Rename rooms after the text that falls inside them
///
/// Each record goes to the first room (in the given order) whose box holds
/// the record's center. Rooms without text keep their size-tier name.
pub fn associate_texts(rooms: &mut [Room], texts: &[TextRecord]) {
    let mut attached: Vec<Vec<&TextRecord>> = vec![Vec::new(); rooms.len()];
    for text in texts {
        let center = text.bbox().center();
        if let Some(i) = rooms.iter().position(|room| room.bbox.contains(&center)) {
            attached[i].push(text);
        }
    }

    let mut named = 0;
    for (room, mut labels) in rooms.iter_mut().zip(attached) {
        if labels.is_empty() {
            continue;
        }
        labels.sort_by(|a, b| a.top.total_cmp(&b.top).then(a.left.total_cmp(&b.left)));
        room.name = labels
            .iter()
            .map(|t| t.text.as_str())
            .collect::<Vec<_>>()
            .join(" ");
        named += 1;
    }
    debug!(texts = texts.len(), named, "text association complete");
}
