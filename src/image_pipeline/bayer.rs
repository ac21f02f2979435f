//! Bayer plane extraction
//!
//! Resolves which photosites of the 2x2 mosaic cell belong to each filter,
//! averages them (optionally over larger binning blocks) into one plane per
//! filter, and derives the header cards that describe each plane.

mod extract;
mod header;
mod pattern;


pub use extract::{OutputPlane, extract_plane, plane_dimensions};
pub use header::{HeaderCard, HeaderValue, MissingFieldPolicy, plane_header, provenance_header};
pub use pattern::{BayerArrangement, FILTER_NAMES, FilterOffsetSet, SubPixelOffset, resolve_offsets};
