use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use tiff::encoder::{TiffEncoder, colortype::Gray16};
use tiff::tags::Tag;
use tracing::debug;

use crate::image_pipeline::bayer::{HeaderCard, HeaderValue};
use crate::image_pipeline::common::error::{ConversionError, Result};
use crate::image_pipeline::sink::types::TiffCompression;
use crate::image_pipeline::sink::writer::ImageSink;

/// Gray16 TIFF output. TIFF has no free-form keywords, so the header cards
/// are rendered into `ImageDescription`, and the ones with a TIFF
/// counterpart are also written to that tag.
pub struct TiffSink {
    pub compression: TiffCompression,
    /// Predictor value for compression (typically 2 for horizontal differencing)
    pub predictor: Option<u16>,
}

impl Default for TiffSink {
    fn default() -> Self {
        Self {
            compression: TiffCompression::None,
            predictor: None,
        }
    }
}

pub struct TiffHandle {
    path: PathBuf,
    output: BufWriter<File>,
    width: usize,
    height: usize,
    pixels: Option<Vec<u16>>,
    cards: Vec<HeaderCard>,
}

fn sink_error(path: &Path, err: impl std::fmt::Display) -> ConversionError {
    ConversionError::sink(1, format!("{}: {}", path.display(), err))
}

fn card_text(cards: &[HeaderCard], key: &str) -> Option<String> {
    cards.iter().find(|c| c.key == key).and_then(|c| match &c.value {
        HeaderValue::Str(s) if !s.is_empty() => Some(s.clone()),
        _ => None,
    })
}

impl TiffSink {
    fn encoder_compression(&self) -> tiff::encoder::Compression {
        use tiff::encoder::Compression;
        use tiff::encoder::compression::DeflateLevel;

        match self.compression {
            TiffCompression::None => Compression::Uncompressed,
            TiffCompression::Lzw => Compression::Lzw,
            TiffCompression::DeflateFast => Compression::Deflate(DeflateLevel::Fast),
            TiffCompression::DeflateBalanced => Compression::Deflate(DeflateLevel::Balanced),
            TiffCompression::DeflateBest => Compression::Deflate(DeflateLevel::Best),
        }
    }

    fn encode(&self, handle: &mut TiffHandle, pixels: &[u16]) -> tiff::TiffResult<()> {
        let mut encoder =
            TiffEncoder::new(&mut handle.output)?.with_compression(self.encoder_compression());
        if let Some(predictor_val) = self.predictor {
            let predictor = match predictor_val {
                2 => tiff::tags::Predictor::Horizontal,
                _ => tiff::tags::Predictor::None,
            };
            encoder = encoder.with_predictor(predictor);
        }

        let mut image = encoder.new_image::<Gray16>(handle.width as u32, handle.height as u32)?;

        let description = handle
            .cards
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join("\n");
        let software = concat!(env!("CARGO_PKG_NAME"), " ", env!("CARGO_PKG_VERSION"));

        let tags = image.encoder();
        if !description.is_empty() {
            tags.write_tag(Tag::ImageDescription, description.as_str())?;
        }
        tags.write_tag(Tag::Software, software)?;
        if let Some(instrument) = card_text(&handle.cards, "INSTRUME") {
            tags.write_tag(Tag::Model, instrument.as_str())?;
        }
        if let Some(observer) = card_text(&handle.cards, "OBSERVER") {
            tags.write_tag(Tag::Artist, observer.as_str())?;
        }
        if let Some(date) = card_text(&handle.cards, "DATE") {
            // TIFF wants "YYYY:MM:DD HH:MM:SS"
            let date = date.replacen('-', ":", 2).replacen('T', " ", 1);
            tags.write_tag(Tag::DateTime, date.as_str())?;
        }

        image.write_data(pixels)
    }
}

impl ImageSink for TiffSink {
    type Handle = TiffHandle;

    fn extension(&self) -> &'static str {
        "tiff"
    }

    fn create_image(&self, path: &Path, width: usize, height: usize) -> Result<TiffHandle> {
        debug!("Creating TIFF image {}x{} at {}", width, height, path.display());
        let file = File::create(path).map_err(|e| sink_error(path, e))?;
        Ok(TiffHandle {
            path: path.to_path_buf(),
            output: BufWriter::new(file),
            width,
            height,
            pixels: None,
            cards: Vec::new(),
        })
    }

    fn write_image(&self, handle: &mut TiffHandle, pixels: &[u16]) -> Result<()> {
        if pixels.len() != handle.width * handle.height {
            return Err(sink_error(
                &handle.path,
                format!(
                    "{} pixels for a {}x{} image",
                    pixels.len(),
                    handle.width,
                    handle.height
                ),
            ));
        }
        handle.pixels = Some(pixels.to_vec());
        Ok(())
    }

    fn write_metadata_field(&self, handle: &mut TiffHandle, card: &HeaderCard) -> Result<()> {
        handle.cards.push(card.clone());
        Ok(())
    }

    fn close(&self, mut handle: TiffHandle) -> Result<()> {
        let pixels = handle
            .pixels
            .take()
            .ok_or_else(|| sink_error(&handle.path, "closed before pixels were written"))?;

        debug!("Encoding TIFF image: {}x{}", handle.width, handle.height);
        self.encode(&mut handle, &pixels)
            .map_err(|e| sink_error(&handle.path, e))?;
        handle.output.flush().map_err(|e| sink_error(&handle.path, e))?;

        debug!("TIFF encoding complete");
        Ok(())
    }
}
