//! RAW image reading module
//!
//! This module provides format-agnostic RAW capture reading capabilities.

mod exif_metadata;
mod rawloader_reader;
mod reader;
pub mod types;

pub use rawloader_reader::{BAYER_RGB_LAYOUT, RawLoaderReader};
pub use reader::RawImageReader;
pub use types::{CaptureMetadata, RawFrame};
