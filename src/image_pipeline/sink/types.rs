//! Extraction configuration types

use std::fmt;
use std::str::FromStr;

use crate::image_pipeline::bayer::{BayerArrangement, MissingFieldPolicy};
use crate::image_pipeline::common::error::{ConversionError, Result};

/// TIFF compression methods
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TiffCompression {
    /// No compression (fastest, largest file)
    None,
    /// LZW compression (slow, good compression)
    Lzw,
    /// Deflate compression - fast level (good speed/size balance)
    DeflateFast,
    /// Deflate compression - best compression (slower)
    DeflateBest,
    /// Deflate compression - balanced
    DeflateBalanced,
}

impl FromStr for TiffCompression {
    type Err = ConversionError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "none" => Ok(TiffCompression::None),
            "lzw" => Ok(TiffCompression::Lzw),
            "deflate-fast" => Ok(TiffCompression::DeflateFast),
            "deflate" | "deflate-balanced" => Ok(TiffCompression::DeflateBalanced),
            "deflate-best" => Ok(TiffCompression::DeflateBest),
            other => Err(ConversionError::Configuration(format!(
                "unknown TIFF compression {:?}",
                other
            ))),
        }
    }
}

/// Container written for each plane.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OutputFormat {
    #[default]
    Fits,
    Tiff,
}

impl FromStr for OutputFormat {
    type Err = ConversionError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "fits" | "fit" => Ok(OutputFormat::Fits),
            "tiff" | "tif" => Ok(OutputFormat::Tiff),
            other => Err(ConversionError::Configuration(format!(
                "unknown output format {:?}",
                other
            ))),
        }
    }
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OutputFormat::Fits => f.write_str("fits"),
            OutputFormat::Tiff => f.write_str("tiff"),
        }
    }
}

/// Configuration for splitting a capture into planes
#[derive(Debug, Clone)]
pub struct ExtractionConfig {
    /// Mosaic layout, or `FromDescriptor` to derive it from the capture
    pub arrangement: BayerArrangement,
    /// Mosaic cells averaged along each axis per output pixel
    pub binning: usize,
    pub output_format: OutputFormat,
    /// Compression method for TIFF output
    pub compression: TiffCompression,
    /// Predictor for TIFF compression (typically 2 for horizontal differencing)
    pub predictor: Option<u16>,
    /// Handling of provenance fields the capture lacks
    pub missing_fields: MissingFieldPolicy,
    /// Diagnostic detail requested by the caller, 0 = normal
    pub verbosity: u8,
}

impl Default for ExtractionConfig {
    fn default() -> Self {
        Self {
            arrangement: BayerArrangement::FromDescriptor,
            binning: 1,
            output_format: OutputFormat::Fits,
            compression: TiffCompression::None,
            predictor: None,
            missing_fields: MissingFieldPolicy::Omit,
            verbosity: 0,
        }
    }
}

impl ExtractionConfig {
    pub fn builder() -> ExtractionConfigBuilder {
        ExtractionConfigBuilder::default()
    }

    pub fn validate(&self) -> Result<()> {
        if self.binning == 0 {
            return Err(ConversionError::Configuration(
                "binning factor must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}

/// Builder for ExtractionConfig
#[derive(Default)]
pub struct ExtractionConfigBuilder {
    arrangement: Option<BayerArrangement>,
    binning: Option<usize>,
    output_format: Option<OutputFormat>,
    compression: Option<TiffCompression>,
    predictor: Option<u16>,
    missing_fields: Option<MissingFieldPolicy>,
    verbosity: Option<u8>,
}

impl ExtractionConfigBuilder {
    pub fn arrangement(mut self, arrangement: BayerArrangement) -> Self {
        self.arrangement = Some(arrangement);
        self
    }

    pub fn binning(mut self, binning: usize) -> Self {
        self.binning = Some(binning);
        self
    }

    pub fn output_format(mut self, format: OutputFormat) -> Self {
        self.output_format = Some(format);
        self
    }

    pub fn compression(mut self, compression: TiffCompression) -> Self {
        self.compression = Some(compression);
        self
    }

    pub fn missing_fields(mut self, policy: MissingFieldPolicy) -> Self {
        self.missing_fields = Some(policy);
        self
    }

    pub fn predictor(mut self, predictor: Option<u16>) -> Self {
        self.predictor = predictor;
        self
    }

    pub fn verbosity(mut self, verbosity: u8) -> Self {
        self.verbosity = Some(verbosity);
        self
    }

    pub fn build(self) -> ExtractionConfig {
        let default = ExtractionConfig::default();
        ExtractionConfig {
            arrangement: self.arrangement.unwrap_or(default.arrangement),
            binning: self.binning.unwrap_or(default.binning),
            output_format: self.output_format.unwrap_or(default.output_format),
            compression: self.compression.unwrap_or(default.compression),
            predictor: self.predictor.or(default.predictor),
            missing_fields: self.missing_fields.unwrap_or(default.missing_fields),
            verbosity: self.verbosity.unwrap_or(default.verbosity),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_defaults() {
        let config = ExtractionConfig::default();
        assert_eq!(config.arrangement, BayerArrangement::FromDescriptor);
        assert_eq!(config.binning, 1);
        assert_eq!(config.output_format, OutputFormat::Fits);
        assert_eq!(config.missing_fields, MissingFieldPolicy::Omit);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_config_builder() {
        let config = ExtractionConfig::builder()
            .arrangement(BayerArrangement::Gbrg)
            .binning(4)
            .output_format(OutputFormat::Tiff)
            .compression(TiffCompression::Lzw)
            .missing_fields(MissingFieldPolicy::WriteDefault)
            .predictor(Some(2))
            .verbosity(2)
            .build();

        assert_eq!(config.arrangement, BayerArrangement::Gbrg);
        assert_eq!(config.binning, 4);
        assert_eq!(config.output_format, OutputFormat::Tiff);
        assert_eq!(config.compression, TiffCompression::Lzw);
        assert_eq!(config.missing_fields, MissingFieldPolicy::WriteDefault);
        assert_eq!(config.predictor, Some(2));
        assert_eq!(config.verbosity, 2);
    }

    #[test]
    fn test_zero_binning_invalid() {
        let config = ExtractionConfig::builder().binning(0).build();
        assert!(matches!(
            config.validate(),
            Err(ConversionError::Configuration(_))
        ));
    }

    #[test]
    fn test_format_and_compression_names() {
        assert_eq!("FITS".parse::<OutputFormat>().unwrap(), OutputFormat::Fits);
        assert_eq!("tif".parse::<OutputFormat>().unwrap(), OutputFormat::Tiff);
        assert!("png".parse::<OutputFormat>().is_err());
        assert_eq!(
            "deflate".parse::<TiffCompression>().unwrap(),
            TiffCompression::DeflateBalanced
        );
        assert!("zip".parse::<TiffCompression>().is_err());
    }
}
