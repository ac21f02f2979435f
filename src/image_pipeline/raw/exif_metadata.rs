//! Provenance fields read from the EXIF block embedded in TIFF-based RAW files.
//!
//! The decoder only reports geometry and camera names, so exposure, ISO,
//! capture time, artist and temperature come from a second pass over the
//! same bytes. A capture without usable EXIF simply leaves these fields empty.

use std::io::Cursor;

use chrono::{DateTime, FixedOffset, Local, NaiveDate, TimeZone, Utc};
use exif::{Context, Exif, In, Tag, Value};
use tracing::debug;

use crate::image_pipeline::raw::types::CaptureMetadata;

/// EXIF 2.31 ambient temperature tag. Sensor temperatures kept in vendor
/// maker notes are not read.
const TEMPERATURE: Tag = Tag(Context::Exif, 0x9400);

pub fn apply_exif(data: &[u8], metadata: &mut CaptureMetadata) {
    let exif = match exif::Reader::new().read_from_container(&mut Cursor::new(data)) {
        Ok(exif) => exif,
        Err(e) => {
            debug!("No EXIF provenance available: {}", e);
            return;
        }
    };

    metadata.exposure_time = field(&exif, Tag::ExposureTime).and_then(real_value);
    metadata.iso_speed = field(&exif, Tag::PhotographicSensitivity)
        .and_then(|v| v.get_uint(0))
        .map(f64::from);
    metadata.artist = field(&exif, Tag::Artist).and_then(ascii_value);
    metadata.camera_temperature = field(&exif, TEMPERATURE).and_then(real_value);
    if let Some(orientation) = field(&exif, Tag::Orientation).and_then(|v| v.get_uint(0)) {
        metadata.orientation = orientation;
    }
    metadata.timestamp = capture_time(&exif);

    debug!(
        exposure = ?metadata.exposure_time,
        iso = ?metadata.iso_speed,
        timestamp = ?metadata.timestamp,
        "EXIF provenance read"
    );
}

fn field(exif: &Exif, tag: Tag) -> Option<&Value> {
    exif.get_field(tag, In::PRIMARY).map(|f| &f.value)
}

fn capture_time(exif: &Exif) -> Option<DateTime<Utc>> {
    let raw = field(exif, Tag::DateTimeOriginal)
        .or_else(|| field(exif, Tag::DateTime))
        .and_then(ascii_bytes)?;
    let mut stamp = exif::DateTime::from_ascii(raw).ok()?;
    if let Some(offset) = field(exif, Tag::OffsetTimeOriginal).and_then(ascii_bytes) {
        // A malformed offset leaves the stamp in local time.
        let _ = stamp.parse_offset(offset);
    }
    to_utc(&stamp)
}

/// Converts an EXIF wall-clock stamp to UTC. Without a recorded offset the
/// stamp is taken to be in the local zone of the machine doing the conversion.
pub(crate) fn to_utc(stamp: &exif::DateTime) -> Option<DateTime<Utc>> {
    let naive = NaiveDate::from_ymd_opt(
        i32::from(stamp.year),
        u32::from(stamp.month),
        u32::from(stamp.day),
    )?
    .and_hms_opt(
        u32::from(stamp.hour),
        u32::from(stamp.minute),
        u32::from(stamp.second),
    )?;

    match stamp.offset {
        Some(minutes) => FixedOffset::east_opt(i32::from(minutes) * 60)?
            .from_local_datetime(&naive)
            .single()
            .map(|t| t.with_timezone(&Utc)),
        None => Local
            .from_local_datetime(&naive)
            .earliest()
            .map(|t| t.with_timezone(&Utc)),
    }
}

fn ascii_bytes(value: &Value) -> Option<&[u8]> {
    match value {
        Value::Ascii(parts) => parts.first().map(Vec::as_slice),
        _ => None,
    }
}

pub(crate) fn ascii_value(value: &Value) -> Option<String> {
    let text = String::from_utf8_lossy(ascii_bytes(value)?);
    let text = text.trim_end_matches('\0').trim();
    if text.is_empty() {
        None
    } else {
        Some(text.to_string())
    }
}

pub(crate) fn real_value(value: &Value) -> Option<f64> {
    match value {
        Value::Rational(v) => v.first().filter(|r| r.denom != 0).map(|r| r.to_f64()),
        Value::SRational(v) => v.first().filter(|r| r.denom != 0).map(|r| r.to_f64()),
        Value::Float(v) => v.first().map(|&f| f64::from(f)),
        Value::Double(v) => v.first().copied(),
        other => other.get_uint(0).map(f64::from),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use exif::{Rational, SRational};

    #[test]
    fn test_artist_strips_padding() {
        let value = Value::Ascii(vec![b"Jane Observer  \0\0".to_vec()]);
        assert_eq!(ascii_value(&value), Some("Jane Observer".to_string()));
    }

    #[test]
    fn test_blank_artist_is_missing() {
        let value = Value::Ascii(vec![b"    \0".to_vec()]);
        assert_eq!(ascii_value(&value), None);
    }

    #[test]
    fn test_exposure_rational() {
        let value = Value::Rational(vec![Rational { num: 1, denom: 250 }]);
        assert_eq!(real_value(&value), Some(0.004));
        let long = Value::Rational(vec![Rational { num: 300, denom: 1 }]);
        assert_eq!(real_value(&long), Some(300.0));
    }

    #[test]
    fn test_zero_denominator_is_missing() {
        let value = Value::Rational(vec![Rational { num: 1, denom: 0 }]);
        assert_eq!(real_value(&value), None);
    }

    #[test]
    fn test_negative_temperature() {
        let value = Value::SRational(vec![SRational { num: -125, denom: 10 }]);
        assert_eq!(real_value(&value), Some(-12.5));
    }

    #[test]
    fn test_timestamp_with_offset_converts_to_utc() {
        let mut stamp = exif::DateTime::from_ascii(b"2024:03:15 21:04:05").unwrap();
        stamp.parse_offset(b"+02:00").unwrap();
        let utc = to_utc(&stamp).unwrap();
        assert_eq!(
            utc.format("%Y-%m-%dT%H:%M:%S").to_string(),
            "2024-03-15T19:04:05"
        );
    }

    #[test]
    fn test_timestamp_crossing_midnight() {
        let mut stamp = exif::DateTime::from_ascii(b"2023:12:31 23:30:00").unwrap();
        stamp.parse_offset(b"-05:00").unwrap();
        let utc = to_utc(&stamp).unwrap();
        assert_eq!(
            utc.format("%Y-%m-%dT%H:%M:%S").to_string(),
            "2024-01-01T04:30:00"
        );
    }

    #[test]
    fn test_garbage_container_leaves_metadata_untouched() {
        let mut metadata = CaptureMetadata {
            orientation: 1,
            ..Default::default()
        };
        apply_exif(b"definitely not a tiff", &mut metadata);
        assert_eq!(metadata.exposure_time, None);
        assert_eq!(metadata.timestamp, None);
        assert_eq!(metadata.orientation, 1);
    }
}
