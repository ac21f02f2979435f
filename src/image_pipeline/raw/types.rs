//! RAW capture types

use chrono::{DateTime, Utc};

/// Provenance and sensor layout reported by the decoder for one capture.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CaptureMetadata {
    pub make: String,
    pub model: String,
    /// Number of distinct color filters on the sensor (3 for an RGB Bayer sensor)
    pub colors: usize,
    /// Filter-layout descriptor, "RGBG" for a standard 2x2 Bayer sensor
    pub filter_layout: String,
    /// CFA pattern name relative to the usable area, e.g. "RGGB"
    pub cfa_pattern: String,
    /// EXIF orientation, 1 when unrotated
    pub orientation: u32,
    /// Exposure time in seconds
    pub exposure_time: Option<f64>,
    pub iso_speed: Option<f64>,
    pub timestamp: Option<DateTime<Utc>>,
    pub artist: Option<String>,
    /// Camera temperature in degrees Celsius
    pub camera_temperature: Option<f64>,
}

impl CaptureMetadata {
    /// Make and model joined the way the INSTRUME keyword expects.
    pub fn instrument(&self) -> String {
        format!("{} {}", self.make, self.model).trim().to_string()
    }
}

/// Decoded sensor readout plus the geometry of its usable mosaic area.
///
/// `data` is row-major with `raw_width` samples per row. The usable area
/// starts at (`left_margin`, `top_margin`) and spans `width` x `height`
/// sensor pixels, i.e. `width / 2` x `height / 2` mosaic cells.
#[derive(Debug, Clone)]
pub struct RawFrame {
    pub raw_width: usize,
    pub raw_height: usize,
    pub top_margin: usize,
    pub left_margin: usize,
    pub width: usize,
    pub height: usize,
    pub data: Vec<u32>,
    pub metadata: CaptureMetadata,
}

impl RawFrame {
    /// Frame without margins where the whole grid is usable.
    pub fn from_samples(width: usize, height: usize, data: Vec<u32>) -> Self {
        Self {
            raw_width: width,
            raw_height: height,
            top_margin: 0,
            left_margin: 0,
            width,
            height,
            data,
            metadata: CaptureMetadata {
                colors: 3,
                filter_layout: "RGBG".to_string(),
                cfa_pattern: "RGGB".to_string(),
                orientation: 1,
                ..Default::default()
            },
        }
    }

    #[inline]
    pub fn sample(&self, row: usize, col: usize) -> u32 {
        self.data[row * self.raw_width + col]
    }
}
