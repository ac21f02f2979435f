use std::path::Path;

use crate::image_pipeline::bayer::HeaderCard;
use crate::image_pipeline::common::error::Result;

/// Destination for extracted planes, one target per plane.
///
/// A handle is created, receives its pixels and header cards, and is closed.
/// Dropping a handle without closing it releases the target as well.
pub trait ImageSink {
    type Handle;

    /// File extension for targets of this sink, without the dot.
    fn extension(&self) -> &'static str;

    fn create_image(&self, path: &Path, width: usize, height: usize) -> Result<Self::Handle>;

    fn write_image(&self, handle: &mut Self::Handle, pixels: &[u16]) -> Result<()>;

    fn write_metadata_field(&self, handle: &mut Self::Handle, card: &HeaderCard) -> Result<()>;

    fn close(&self, handle: Self::Handle) -> Result<()>;
}
