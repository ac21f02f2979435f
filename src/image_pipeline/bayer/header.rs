//! Header cards attached to every extracted plane.

use std::fmt;

use chrono::{DateTime, Utc};

use crate::image_pipeline::raw::types::CaptureMetadata;

const ISO_8601: &str = "%Y-%m-%dT%H:%M:%S";

/// What to do with a provenance field the capture does not carry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MissingFieldPolicy {
    /// Leave the keyword out of the header
    #[default]
    Omit,
    /// Write an empty string, zero, or the epoch for dates
    WriteDefault,
}

#[derive(Debug, Clone, PartialEq)]
pub enum HeaderValue {
    Str(String),
    Int(i64),
    /// Fixed-point real written with `decimals` digits after the point
    Fixed { value: f64, decimals: usize },
}

impl HeaderValue {
    pub fn fixed2(value: f64) -> Self {
        HeaderValue::Fixed { value, decimals: 2 }
    }

    /// Value as it should be stored, rounded to its declared precision.
    pub fn as_real(&self) -> Option<f64> {
        match self {
            HeaderValue::Fixed { value, decimals } => {
                let scale = 10f64.powi(*decimals as i32);
                Some((value * scale).round() / scale)
            }
            HeaderValue::Int(v) => Some(*v as f64),
            HeaderValue::Str(_) => None,
        }
    }
}

impl fmt::Display for HeaderValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HeaderValue::Str(s) => write!(f, "'{}'", s),
            HeaderValue::Int(v) => write!(f, "{}", v),
            HeaderValue::Fixed { value, decimals } => write!(f, "{:.*}", *decimals, value),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct HeaderCard {
    pub key: &'static str,
    pub value: HeaderValue,
    pub comment: &'static str,
}

impl HeaderCard {
    pub fn new(key: &'static str, value: HeaderValue, comment: &'static str) -> Self {
        Self {
            key,
            value,
            comment,
        }
    }
}

impl fmt::Display for HeaderCard {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:<8}= {} / {}", self.key, self.value, self.comment)
    }
}

/// Cards naming the filter and the binning of a plane.
pub fn plane_header(filter_name: &str, binning: usize) -> Vec<HeaderCard> {
    let binning = binning as i64;
    vec![
        HeaderCard::new("FILTER", HeaderValue::Str(filter_name.to_string()), "filter"),
        HeaderCard::new("XBINNING", HeaderValue::Int(binning), "binning factor x"),
        HeaderCard::new("YBINNING", HeaderValue::Int(binning), "binning factor y"),
    ]
}

/// Provenance cards copied from the capture, followed by the processing date.
pub fn provenance_header(
    metadata: &CaptureMetadata,
    policy: MissingFieldPolicy,
    processed_at: DateTime<Utc>,
) -> Vec<HeaderCard> {
    let mut cards = Vec::with_capacity(7);
    let mut push = |key, value: Option<HeaderValue>, fallback: HeaderValue, comment| {
        match (value, policy) {
            (Some(value), _) => cards.push(HeaderCard::new(key, value, comment)),
            (None, MissingFieldPolicy::WriteDefault) => {
                cards.push(HeaderCard::new(key, fallback, comment))
            }
            (None, MissingFieldPolicy::Omit) => {}
        }
    };

    let instrument = metadata.instrument();
    push(
        "INSTRUME",
        (!instrument.is_empty()).then_some(HeaderValue::Str(instrument)),
        HeaderValue::Str(String::new()),
        "instrument used for acquisition",
    );
    push(
        "EXPTIME",
        metadata.exposure_time.map(|t| HeaderValue::Int(t.round() as i64)),
        HeaderValue::Int(0),
        "exposure time [s]",
    );
    push(
        "ISOSPEED",
        metadata.iso_speed.map(|iso| HeaderValue::Int(iso.round() as i64)),
        HeaderValue::Int(0),
        "ISO speed",
    );
    push(
        "DATE-OBS",
        metadata
            .timestamp
            .map(|t| HeaderValue::Str(t.format(ISO_8601).to_string())),
        HeaderValue::Str(DateTime::<Utc>::UNIX_EPOCH.format(ISO_8601).to_string()),
        "UTC start of observation",
    );
    push(
        "OBSERVER",
        metadata.artist.clone().map(HeaderValue::Str),
        HeaderValue::Str(String::new()),
        "who took the image",
    );
    push(
        "CAM-TEMP",
        metadata.camera_temperature.map(HeaderValue::fixed2),
        HeaderValue::fixed2(0.0),
        "camera temperature [C]",
    );

    cards.push(HeaderCard::new(
        "DATE",
        HeaderValue::Str(processed_at.format(ISO_8601).to_string()),
        "file creation date (YYYY-MM-DDThh:mm:ss UTC)",
    ));
    cards
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn processed() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 1, 2, 3, 4, 5).unwrap()
    }

    fn full_metadata() -> CaptureMetadata {
        CaptureMetadata {
            make: "Canon".to_string(),
            model: "EOS 6D".to_string(),
            colors: 3,
            filter_layout: "RGBG".to_string(),
            cfa_pattern: "RGGB".to_string(),
            orientation: 1,
            exposure_time: Some(29.6),
            iso_speed: Some(1600.0),
            timestamp: Some(Utc.with_ymd_and_hms(2024, 8, 12, 22, 15, 0).unwrap()),
            artist: Some("J. Doe".to_string()),
            camera_temperature: Some(23.456),
        }
    }

    fn find<'a>(cards: &'a [HeaderCard], key: &str) -> Option<&'a HeaderValue> {
        cards.iter().find(|c| c.key == key).map(|c| &c.value)
    }

    #[test]
    fn test_plane_header_cards() {
        let cards = plane_header("G", 2);
        assert_eq!(cards.len(), 3);
        assert_eq!(find(&cards, "FILTER"), Some(&HeaderValue::Str("G".into())));
        assert_eq!(find(&cards, "XBINNING"), Some(&HeaderValue::Int(2)));
        assert_eq!(find(&cards, "YBINNING"), Some(&HeaderValue::Int(2)));
    }

    #[test]
    fn test_full_provenance() {
        let cards = provenance_header(&full_metadata(), MissingFieldPolicy::Omit, processed());
        let keys: Vec<_> = cards.iter().map(|c| c.key).collect();
        assert_eq!(
            keys,
            ["INSTRUME", "EXPTIME", "ISOSPEED", "DATE-OBS", "OBSERVER", "CAM-TEMP", "DATE"]
        );
        assert_eq!(
            find(&cards, "INSTRUME"),
            Some(&HeaderValue::Str("Canon EOS 6D".into()))
        );
        assert_eq!(find(&cards, "EXPTIME"), Some(&HeaderValue::Int(30)));
        assert_eq!(find(&cards, "ISOSPEED"), Some(&HeaderValue::Int(1600)));
        assert_eq!(
            find(&cards, "DATE-OBS"),
            Some(&HeaderValue::Str("2024-08-12T22:15:00".into()))
        );
        assert_eq!(
            find(&cards, "DATE"),
            Some(&HeaderValue::Str("2025-01-02T03:04:05".into()))
        );
        assert_eq!(find(&cards, "CAM-TEMP").and_then(|v| v.as_real()), Some(23.46));
    }

    #[test]
    fn test_missing_fields_omitted() {
        let metadata = CaptureMetadata {
            make: "Sony".to_string(),
            model: "ILCE-7M3".to_string(),
            ..Default::default()
        };
        let cards = provenance_header(&metadata, MissingFieldPolicy::Omit, processed());
        let keys: Vec<_> = cards.iter().map(|c| c.key).collect();
        assert_eq!(keys, ["INSTRUME", "DATE"]);
    }

    #[test]
    fn test_missing_fields_written_as_defaults() {
        let cards = provenance_header(
            &CaptureMetadata::default(),
            MissingFieldPolicy::WriteDefault,
            processed(),
        );
        assert_eq!(cards.len(), 7);
        assert_eq!(find(&cards, "INSTRUME"), Some(&HeaderValue::Str(String::new())));
        assert_eq!(find(&cards, "EXPTIME"), Some(&HeaderValue::Int(0)));
        assert_eq!(
            find(&cards, "DATE-OBS"),
            Some(&HeaderValue::Str("1970-01-01T00:00:00".into()))
        );
        assert_eq!(find(&cards, "CAM-TEMP").and_then(|v| v.as_real()), Some(0.0));
    }

    #[test]
    fn test_short_exposure_rounds_to_zero() {
        let metadata = CaptureMetadata {
            exposure_time: Some(1.0 / 250.0),
            ..full_metadata()
        };
        let cards = provenance_header(&metadata, MissingFieldPolicy::Omit, processed());
        assert_eq!(find(&cards, "EXPTIME"), Some(&HeaderValue::Int(0)));
    }

    #[test]
    fn test_card_rendering() {
        let card = HeaderCard::new("CAM-TEMP", HeaderValue::fixed2(-3.14159), "camera temperature [C]");
        assert_eq!(card.to_string(), "CAM-TEMP= -3.14 / camera temperature [C]");
        let card = HeaderCard::new("FILTER", HeaderValue::Str("R".into()), "filter");
        assert_eq!(card.to_string(), "FILTER  = 'R' / filter");
    }
}
