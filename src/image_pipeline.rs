//! Image processing pipeline module
//!
//! This module splits Bayer RAW captures into per-filter planes, with
//! separate modules for RAW reading, plane extraction, output sinks and
//! conversion orchestration.

pub mod bayer;
pub mod common;
pub mod conversions;
pub mod raw;
pub mod sink;

pub use common::{ArrangementError, ConversionError, EXIT_FATAL, Result};

pub use raw::{CaptureMetadata, RawFrame, RawImageReader, RawLoaderReader};

pub use bayer::{
    BayerArrangement, FilterOffsetSet, HeaderCard, HeaderValue, MissingFieldPolicy, OutputPlane,
    SubPixelOffset, extract_plane, plane_dimensions, resolve_offsets,
};

pub use sink::{
    ExtractionConfig, ExtractionConfigBuilder, FitsSink, ImageSink, OutputFormat,
    TiffCompression, TiffSink,
};

pub use conversions::{BatchReport, CaptureOutcome, RawToPlanesPipeline};
