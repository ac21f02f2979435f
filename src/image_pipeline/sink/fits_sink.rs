//! FITS output through cfitsio.
//!
//! Each plane becomes the primary HDU of its own file: an unsigned 16-bit
//! image (BZERO = 32768 convention) followed by the plane's header cards.
//! Existing files at the target path are overwritten.

use std::ffi::{CString, c_int};
use std::path::{Path, PathBuf};

use fitsio::FitsFile;
use fitsio::errors::Error as FitsioError;
use fitsio::hdu::FitsHdu;
use fitsio::images::{ImageDescription, ImageType};
use tracing::debug;

use crate::image_pipeline::bayer::{HeaderCard, HeaderValue};
use crate::image_pipeline::common::error::{ConversionError, Result};
use crate::image_pipeline::sink::writer::ImageSink;

pub struct FitsSink;

pub struct FitsHandle {
    file: FitsFile,
    hdu: FitsHdu,
    path: PathBuf,
    pixel_count: usize,
}

fn sink_error(path: &Path, err: FitsioError) -> ConversionError {
    let code = match &err {
        FitsioError::Fits(e) => e.status,
        _ => 1,
    };
    ConversionError::sink(code, format!("{}: {}", path.display(), err))
}

/// Writes a real-valued card with a fixed number of decimals, the way
/// `fits_write_key_fixdbl` renders it (`21.00` rather than `21.`).
fn write_fixed_key(
    file: &mut FitsFile,
    key: &str,
    value: f64,
    decimals: usize,
    comment: &str,
) -> std::result::Result<(), i32> {
    let key = CString::new(key).map_err(|_| 1)?;
    let comment = CString::new(comment).map_err(|_| 1)?;
    let decimals = c_int::try_from(decimals).map_err(|_| 1)?;
    let mut status: c_int = 0;
    // SAFETY: the fitsfile pointer is owned by `file` and stays open for the
    // duration of the call; both strings outlive it.
    unsafe {
        fitsio::sys::ffpkyg(
            file.as_raw(),
            key.as_ptr(),
            value,
            decimals,
            comment.as_ptr(),
            &mut status,
        );
    }
    if status == 0 { Ok(()) } else { Err(status) }
}

impl ImageSink for FitsSink {
    type Handle = FitsHandle;

    fn extension(&self) -> &'static str {
        "fits"
    }

    fn create_image(&self, path: &Path, width: usize, height: usize) -> Result<FitsHandle> {
        debug!("Creating FITS image {}x{} at {}", width, height, path.display());

        // FITS axis order is NAXIS2 (rows), NAXIS1 (columns)
        let description = ImageDescription {
            data_type: ImageType::UnsignedShort,
            dimensions: &[height, width],
        };

        let mut file = FitsFile::create(path)
            .with_custom_primary(&description)
            .overwrite()
            .open()
            .map_err(|e| sink_error(path, e))?;
        let hdu = file.primary_hdu().map_err(|e| sink_error(path, e))?;

        Ok(FitsHandle {
            file,
            hdu,
            path: path.to_path_buf(),
            pixel_count: width * height,
        })
    }

    fn write_image(&self, handle: &mut FitsHandle, pixels: &[u16]) -> Result<()> {
        if pixels.len() != handle.pixel_count {
            return Err(ConversionError::sink(
                1,
                format!(
                    "{}: {} pixels for a {}-pixel image",
                    handle.path.display(),
                    pixels.len(),
                    handle.pixel_count
                ),
            ));
        }
        handle
            .hdu
            .write_image(&mut handle.file, pixels)
            .map_err(|e| sink_error(&handle.path, e))
    }

    fn write_metadata_field(&self, handle: &mut FitsHandle, card: &HeaderCard) -> Result<()> {
        let FitsHandle { file, hdu, path, .. } = handle;
        let written = match &card.value {
            HeaderValue::Str(s) => hdu.write_key(file, card.key, (s.as_str(), card.comment)),
            HeaderValue::Int(v) => hdu.write_key(file, card.key, (*v, card.comment)),
            HeaderValue::Fixed { value, decimals } => {
                return write_fixed_key(file, card.key, *value, *decimals, card.comment).map_err(
                    |status| {
                        ConversionError::sink(
                            status,
                            format!("{}: cannot write {}", path.display(), card.key),
                        )
                    },
                );
            }
        };
        written.map_err(|e| sink_error(path, e))
    }

    fn close(&self, handle: FitsHandle) -> Result<()> {
        debug!("Closing {}", handle.path.display());
        // cfitsio flushes and closes the file when the handle is dropped
        drop(handle);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plane_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("frame-G.fits");
        let sink = FitsSink;

        let pixels: Vec<u16> = vec![0, 1, 32_768, 65_535, 12, 40_000];
        let mut handle = sink.create_image(&path, 3, 2).unwrap();
        sink.write_image(&mut handle, &pixels).unwrap();
        sink.write_metadata_field(
            &mut handle,
            &HeaderCard::new("FILTER", HeaderValue::Str("G".into()), "filter"),
        )
        .unwrap();
        sink.write_metadata_field(
            &mut handle,
            &HeaderCard::new("XBINNING", HeaderValue::Int(2), "binning factor x"),
        )
        .unwrap();
        sink.write_metadata_field(
            &mut handle,
            &HeaderCard::new("CAM-TEMP", HeaderValue::fixed2(21.257), "camera temperature [C]"),
        )
        .unwrap();
        sink.close(handle).unwrap();

        let mut file = FitsFile::open(&path).unwrap();
        let hdu = file.primary_hdu().unwrap();
        let read: Vec<u16> = hdu.read_image(&mut file).unwrap();
        assert_eq!(read, pixels);
        let filter: String = hdu.read_key(&mut file, "FILTER").unwrap();
        assert_eq!(filter, "G");
        let binning: i64 = hdu.read_key(&mut file, "XBINNING").unwrap();
        assert_eq!(binning, 2);
        let temp: f64 = hdu.read_key(&mut file, "CAM-TEMP").unwrap();
        assert!((temp - 21.26).abs() < 1e-9);
    }

    fn header_card(path: &Path, key: &str) -> String {
        let bytes = std::fs::read(path).unwrap();
        let header = String::from_utf8_lossy(&bytes[..2880]).into_owned();
        let start = header.find(&format!("{:<8}=", key)).unwrap();
        header[start..start + 80].trim_end().to_string()
    }

    #[test]
    fn test_temperature_keeps_two_decimals() {
        let dir = tempfile::tempdir().unwrap();
        let sink = FitsSink;
        for (value, expected) in [(21.0, "21.00"), (23.456, "23.46"), (-5.5, "-5.50")] {
            let path = dir.path().join(format!("t{}.fits", expected));
            let mut handle = sink.create_image(&path, 1, 1).unwrap();
            sink.write_image(&mut handle, &[0]).unwrap();
            sink.write_metadata_field(
                &mut handle,
                &HeaderCard::new("CAM-TEMP", HeaderValue::fixed2(value), "camera temperature [C]"),
            )
            .unwrap();
            sink.close(handle).unwrap();

            let card = header_card(&path, "CAM-TEMP");
            let value_field = card[10..].split('/').next().unwrap().trim();
            assert_eq!(value_field, expected, "{}", card);
            assert!(card.ends_with("/ camera temperature [C]"), "{}", card);
        }
    }

    #[test]
    fn test_existing_file_is_overwritten() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("frame-R.fits");
        std::fs::write(&path, b"stale").unwrap();

        let sink = FitsSink;
        let mut handle = sink.create_image(&path, 2, 1).unwrap();
        sink.write_image(&mut handle, &[5, 6]).unwrap();
        sink.close(handle).unwrap();

        let mut file = FitsFile::open(&path).unwrap();
        let hdu = file.primary_hdu().unwrap();
        let read: Vec<u16> = hdu.read_image(&mut file).unwrap();
        assert_eq!(read, vec![5, 6]);
    }

    #[test]
    fn test_pixel_count_mismatch_is_sink_error() {
        let dir = tempfile::tempdir().unwrap();
        let sink = FitsSink;
        let mut handle = sink.create_image(&dir.path().join("x.fits"), 2, 2).unwrap();
        let result = sink.write_image(&mut handle, &[1, 2, 3]);
        assert!(matches!(result, Err(ConversionError::Sink { .. })));
    }

    #[test]
    fn test_missing_directory_is_sink_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("missing").join("x.fits");
        let result = FitsSink.create_image(&path, 2, 2);
        assert!(matches!(result, Err(ConversionError::Sink { code, .. }) if code != 0));
    }
}
