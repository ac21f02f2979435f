//! Pipeline conversions module
//!
//! This module contains orchestration logic for turning RAW captures into planes.

mod raw_to_planes;


pub use raw_to_planes::{BatchReport, CaptureOutcome, RawToPlanesPipeline};
