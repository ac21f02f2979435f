//! RAW image reader implementation using the rawloader library.
//!
//! This module decodes any RAW format rawloader understands (ARW, CR2, NEF,
//! DNG, ...) into a [`RawFrame`]: the full sensor grid with its crop margins,
//! plus the sensor layout and provenance needed for the plane headers.

use std::io::Cursor;

use rawloader::{CFA, RawImageData as RawloaderImageData};
use tracing::debug;

use crate::image_pipeline::common::error::{ConversionError, Result};
use crate::image_pipeline::raw::exif_metadata::apply_exif;
use crate::image_pipeline::raw::reader::RawImageReader;
use crate::image_pipeline::raw::types::{CaptureMetadata, RawFrame};

/// Layout descriptor reported for a 2x2 mosaic of one red, two green and one blue filter.
pub const BAYER_RGB_LAYOUT: &str = "RGBG";

// rawloader color indices
const RED: usize = 0;
const GREEN: usize = 1;
const BLUE: usize = 2;

/// RAW image reader that uses the rawloader library for decoding.
pub struct RawLoaderReader;

impl RawImageReader for RawLoaderReader {
    fn read_raw(&self, data: &[u8]) -> Result<RawFrame> {
        debug!("Decoding RAW image, {} bytes", data.len());

        let decoded = rawloader::decode(&mut Cursor::new(data))
            .map_err(|e| ConversionError::DecodeError(e.to_string()))?;

        let cfa = decoded.cropped_cfa();
        let sample_count = match &decoded.data {
            RawloaderImageData::Integer(values) => values.len(),
            RawloaderImageData::Float(values) => values.len(),
        };
        let area = usable_area(
            decoded.width,
            decoded.height,
            decoded.crops,
            decoded.cpp,
            sample_count,
        )?;

        debug!(
            "Decoded image: {}x{} raw, {}x{} usable at ({}, {})",
            decoded.width, decoded.height, area.width, area.height, area.left, area.top
        );

        // Float data is normalized 0.0-1.0, scale it to the u16 range
        let samples: Vec<u32> = match decoded.data {
            RawloaderImageData::Integer(values) => values.into_iter().map(u32::from).collect(),
            RawloaderImageData::Float(values) => values
                .into_iter()
                .map(|v| (v.clamp(0.0, 1.0) * f32::from(u16::MAX)) as u32)
                .collect(),
        };

        let mut metadata = CaptureMetadata {
            make: decoded.clean_make.clone(),
            model: decoded.clean_model.clone(),
            colors: filter_count(&cfa),
            filter_layout: filter_layout(&cfa),
            cfa_pattern: cfa.name.clone(),
            orientation: 1,
            ..Default::default()
        };
        apply_exif(data, &mut metadata);

        Ok(RawFrame {
            raw_width: decoded.width,
            raw_height: decoded.height,
            top_margin: area.top,
            left_margin: area.left,
            width: area.width,
            height: area.height,
            data: samples,
            metadata,
        })
    }
}

/// Usable mosaic inside the sensor grid.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct UsableArea {
    top: usize,
    left: usize,
    width: usize,
    height: usize,
}

/// Checks the decoded buffer and places the usable area. `crops` is
/// rawloader's `[top, right, bottom, left]`.
fn usable_area(
    raw_width: usize,
    raw_height: usize,
    crops: [usize; 4],
    cpp: usize,
    sample_count: usize,
) -> Result<UsableArea> {
    if cpp != 1 {
        return Err(ConversionError::UnpackError(format!(
            "{} components per pixel, expected a single-channel mosaic",
            cpp
        )));
    }
    if sample_count != raw_width * raw_height {
        return Err(ConversionError::UnpackError(format!(
            "{} samples for a {}x{} sensor",
            sample_count, raw_width, raw_height
        )));
    }

    let [top, right, bottom, left] = crops;
    Ok(UsableArea {
        top,
        left,
        width: raw_width.saturating_sub(left + right),
        height: raw_height.saturating_sub(top + bottom),
    })
}

fn cell_colors(cfa: &CFA) -> Option<[usize; 4]> {
    if cfa.width != 2 || cfa.height != 2 {
        return None;
    }
    Some([
        cfa.color_at(0, 0),
        cfa.color_at(0, 1),
        cfa.color_at(1, 0),
        cfa.color_at(1, 1),
    ])
}

/// Describes the mosaic the way the arrangement resolver expects it:
/// `RGBG` for an RGB Bayer cell, the CFA name for anything else.
fn filter_layout(cfa: &CFA) -> String {
    match cell_colors(cfa) {
        Some(mut colors) => {
            colors.sort_unstable();
            if colors == [RED, GREEN, GREEN, BLUE] {
                BAYER_RGB_LAYOUT.to_string()
            } else {
                cfa.name.clone()
            }
        }
        None => cfa.name.clone(),
    }
}

fn filter_count(cfa: &CFA) -> usize {
    if cfa.width == 0 || cfa.height == 0 {
        // monochrome sensor
        return 1;
    }
    let mut seen = [false; 4];
    for row in 0..cfa.height {
        for col in 0..cfa.width {
            if let Some(slot) = seen.get_mut(cfa.color_at(row, col)) {
                *slot = true;
            }
        }
    }
    seen.iter().filter(|&&s| s).count()
}
