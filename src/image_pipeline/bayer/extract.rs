//! Plane extraction: one downsampled intensity plane per filter, straight
//! from the mosaic without interpolation.

use tracing::{debug, instrument};

use crate::image_pipeline::bayer::pattern::FilterOffsetSet;
use crate::image_pipeline::common::error::{ConversionError, Result};
use crate::image_pipeline::raw::types::RawFrame;

/// Single-filter image extracted from a capture.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputPlane {
    /// Filter index
    pub filter: usize,
    pub width: usize,
    pub height: usize,
    pub binning: usize,
    /// Row-major intensities
    pub data: Vec<u16>,
}

/// Output size for a binning factor: one pixel per `binning` x `binning`
/// block of mosaic cells, partial blocks at the edges dropped. A binning of
/// 0 describes no block at all and yields an empty plane.
pub fn plane_dimensions(frame: &RawFrame, binning: usize) -> (usize, usize) {
    let step = 2 * binning;
    (
        frame.width.checked_div(step).unwrap_or(0),
        frame.height.checked_div(step).unwrap_or(0),
    )
}

fn check_geometry(frame: &RawFrame, binning: usize, width: usize, height: usize) -> Result<()> {
    let invalid = |reason: String| ConversionError::InvalidDimensions {
        width: frame.width,
        height: frame.height,
        reason,
    };

    if width == 0 || height == 0 {
        return Err(invalid(format!(
            "binning {} leaves an empty {}x{} plane",
            binning, width, height
        )));
    }
    if frame.data.len() != frame.raw_width * frame.raw_height {
        return Err(invalid(format!(
            "{} samples for a {}x{} sensor",
            frame.data.len(),
            frame.raw_width,
            frame.raw_height
        )));
    }
    let step = 2 * binning;
    if frame.left_margin + width * step > frame.raw_width
        || frame.top_margin + height * step > frame.raw_height
    {
        return Err(invalid(format!(
            "usable area at ({}, {}) exceeds the {}x{} sensor",
            frame.left_margin, frame.top_margin, frame.raw_width, frame.raw_height
        )));
    }
    Ok(())
}

/// Averages the photosites of one filter over every `binning` x `binning`
/// block of cells.
///
/// Each output pixel is the truncating mean of `binning² * offsets.len()`
/// samples, saturated at `u16::MAX`.
#[instrument(skip(frame, offsets), fields(offsets = offsets.len()))]
pub fn extract_plane(
    frame: &RawFrame,
    filter: usize,
    offsets: FilterOffsetSet,
    binning: usize,
) -> Result<OutputPlane> {
    if binning == 0 {
        return Err(ConversionError::Configuration(
            "binning factor must be at least 1".to_string(),
        ));
    }
    if offsets.is_empty() {
        return Err(ConversionError::Configuration(format!(
            "filter {} has no photosites",
            filter
        )));
    }

    let (width, height) = plane_dimensions(frame, binning);
    check_geometry(frame, binning, width, height)?;

    let mut data: Vec<u16> = Vec::new();
    data.try_reserve_exact(width * height)
        .map_err(|_| ConversionError::AllocationFailure {
            bytes: width * height * std::mem::size_of::<u16>(),
        })?;

    let step = 2 * binning;
    let count = (binning * binning * offsets.len()) as u64;

    for row in 0..height {
        let top = row * step + frame.top_margin;
        for col in 0..width {
            let left = col * step + frame.left_margin;
            let mut sum: u64 = 0;
            for bv in 0..binning {
                for bh in 0..binning {
                    for offset in offsets.offsets() {
                        sum += u64::from(
                            frame.sample(top + offset.dy + 2 * bv, left + offset.dx + 2 * bh),
                        );
                    }
                }
            }
            data.push(u16::try_from(sum / count).unwrap_or(u16::MAX));
        }
    }

    debug!("Extracted {}x{} plane from {} samples each", width, height, count);

    Ok(OutputPlane {
        filter,
        width,
        height,
        binning,
        data,
    })
}
