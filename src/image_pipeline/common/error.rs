use thiserror::Error;

/// Status reported to the shell for usage errors and captures that could not be decoded.
pub const EXIT_FATAL: i32 = -1;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ArrangementError {
    #[error("Unknown Bayer arrangement: {0:?}")]
    UnknownArrangement(String),

    #[error("Unsupported filter layout: {0:?}")]
    UnsupportedLayout(String),

    #[error("Filter index {filter} out of range for a {count}-filter arrangement")]
    FilterOutOfRange { filter: usize, count: usize },
}

#[derive(Error, Debug)]
pub enum ConversionError {
    #[error("Invalid configuration: {0}")]
    Configuration(String),

    #[error("Failed to read input file: {0}")]
    InputReadError(String),

    #[error("Failed to decode RAW image: {0}")]
    DecodeError(String),

    #[error("Failed to unpack RAW pixels: {0}")]
    UnpackError(String),

    #[error("Failed to resolve Bayer arrangement: {0}")]
    Arrangement(#[from] ArrangementError),

    #[error("Invalid image dimensions: width={width}, height={height} ({reason})")]
    InvalidDimensions {
        width: usize,
        height: usize,
        reason: String,
    },

    #[error("Could not allocate {bytes} bytes for the output plane")]
    AllocationFailure { bytes: usize },

    #[error("Image sink error {code}: {message}")]
    Sink { code: i32, message: String },
}

impl ConversionError {
    pub fn sink(code: i32, message: impl Into<String>) -> Self {
        ConversionError::Sink {
            code: if code == 0 { 1 } else { code },
            message: message.into(),
        }
    }

    /// Process status for a run that stopped on this error.
    pub fn exit_code(&self) -> i32 {
        match self {
            ConversionError::Configuration(_)
            | ConversionError::InputReadError(_)
            | ConversionError::DecodeError(_)
            | ConversionError::UnpackError(_) => EXIT_FATAL,
            ConversionError::Sink { code, .. } => *code,
            _ => 1,
        }
    }
}

pub type Result<T> = std::result::Result<T, ConversionError>;
