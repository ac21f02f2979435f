use crate::image_pipeline::common::error::Result;
use crate::image_pipeline::raw::types::RawFrame;

/// Decodes the bytes of one capture into a frame. Dropping the frame
/// releases its buffers before the next capture is read.
pub trait RawImageReader {
    fn read_raw(&self, data: &[u8]) -> Result<RawFrame>;
}
