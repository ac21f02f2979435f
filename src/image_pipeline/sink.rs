//! Plane output module
//!
//! This module provides the image sinks planes are written through
//! (FITS and TIFF) and the configuration of an extraction run.

mod fits_sink;
mod tiff_sink;
pub mod types;
mod writer;

pub use fits_sink::{FitsHandle, FitsSink};
pub use tiff_sink::{TiffHandle, TiffSink};
pub use types::{ExtractionConfig, ExtractionConfigBuilder, OutputFormat, TiffCompression};
pub use writer::ImageSink;
