//! Bayer arrangements and the sub-pixel offsets each filter occupies in a 2x2 cell.

use std::fmt;
use std::str::FromStr;

use crate::image_pipeline::common::error::ArrangementError;
use crate::image_pipeline::raw::BAYER_RGB_LAYOUT;

/// Output filter names in filter-index order.
pub const FILTER_NAMES: [&str; 3] = ["R", "G", "B"];

/// Position of a photosite inside a 2x2 mosaic cell, `dx` along a row, `dy` down a column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubPixelOffset {
    pub dx: usize,
    pub dy: usize,
}

const fn at(dx: usize, dy: usize) -> SubPixelOffset {
    SubPixelOffset { dx, dy }
}

/// The photosites of one filter within a cell. Two offsets mean the filter
/// sits on a diagonal and its samples are averaged.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FilterOffsetSet(&'static [SubPixelOffset]);

impl FilterOffsetSet {
    pub fn offsets(&self) -> &'static [SubPixelOffset] {
        self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

type Partition = [FilterOffsetSet; 3];

const RGGB: Partition = [
    FilterOffsetSet(&[at(0, 0)]),
    FilterOffsetSet(&[at(1, 0), at(0, 1)]),
    FilterOffsetSet(&[at(1, 1)]),
];

const BGGR: Partition = [
    FilterOffsetSet(&[at(1, 1)]),
    FilterOffsetSet(&[at(1, 0), at(0, 1)]),
    FilterOffsetSet(&[at(0, 0)]),
];

const GRBG: Partition = [
    FilterOffsetSet(&[at(1, 0)]),
    FilterOffsetSet(&[at(0, 0), at(1, 1)]),
    FilterOffsetSet(&[at(0, 1)]),
];

const GBRG: Partition = [
    FilterOffsetSet(&[at(0, 1)]),
    FilterOffsetSet(&[at(0, 0), at(1, 1)]),
    FilterOffsetSet(&[at(1, 0)]),
];

/// A named 2x2 mosaic layout, or `FromDescriptor` to take the layout from
/// the capture's filter-layout descriptor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BayerArrangement {
    Rggb,
    Bggr,
    Grbg,
    Gbrg,
    #[default]
    FromDescriptor,
}

impl BayerArrangement {
    pub const CANONICAL: [BayerArrangement; 4] = [
        BayerArrangement::Rggb,
        BayerArrangement::Bggr,
        BayerArrangement::Grbg,
        BayerArrangement::Gbrg,
    ];

    /// Parses a pattern name such as `"GRBG"`.
    ///
    /// The name must be exactly four characters drawn from R, G and B with
    /// each of them present, and must be one of the canonical layouts.
    pub fn from_name(name: &str) -> Result<Self, ArrangementError> {
        let unknown = || ArrangementError::UnknownArrangement(name.to_string());
        let upper = name.to_ascii_uppercase();

        if upper.len() != 4 || !upper.chars().all(|c| matches!(c, 'R' | 'G' | 'B')) {
            return Err(unknown());
        }
        if !['R', 'G', 'B'].iter().all(|&c| upper.contains(c)) {
            return Err(unknown());
        }

        match upper.as_str() {
            "RGGB" => Ok(BayerArrangement::Rggb),
            "BGGR" => Ok(BayerArrangement::Bggr),
            "GRBG" => Ok(BayerArrangement::Grbg),
            "GBRG" => Ok(BayerArrangement::Gbrg),
            _ => Err(unknown()),
        }
    }

    /// Maps a filter-layout descriptor onto a canonical layout. Only the
    /// RGB Bayer descriptor is understood and it always means RGGB.
    pub fn from_descriptor(descriptor: &str) -> Result<Self, ArrangementError> {
        if descriptor == BAYER_RGB_LAYOUT {
            Ok(BayerArrangement::Rggb)
        } else {
            Err(ArrangementError::UnsupportedLayout(descriptor.to_string()))
        }
    }

    /// Concrete layout for this arrangement given the capture's descriptor.
    pub fn canonical(self, descriptor: &str) -> Result<Self, ArrangementError> {
        match self {
            BayerArrangement::FromDescriptor => Self::from_descriptor(descriptor),
            named => Ok(named),
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            BayerArrangement::Rggb => "RGGB",
            BayerArrangement::Bggr => "BGGR",
            BayerArrangement::Grbg => "GRBG",
            BayerArrangement::Gbrg => "GBRG",
            BayerArrangement::FromDescriptor => "auto",
        }
    }

    fn partition(self) -> Option<&'static Partition> {
        match self {
            BayerArrangement::Rggb => Some(&RGGB),
            BayerArrangement::Bggr => Some(&BGGR),
            BayerArrangement::Grbg => Some(&GRBG),
            BayerArrangement::Gbrg => Some(&GBRG),
            BayerArrangement::FromDescriptor => None,
        }
    }

    /// Number of filters the arrangement defines.
    pub fn filter_count(&self) -> usize {
        FILTER_NAMES.len()
    }
}

impl fmt::Display for BayerArrangement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for BayerArrangement {
    type Err = ArrangementError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.eq_ignore_ascii_case("auto") {
            return Ok(BayerArrangement::FromDescriptor);
        }
        Self::from_name(s)
    }
}

/// Offsets of `filter` within the cell for `arrangement`.
///
/// `descriptor` is the capture's filter-layout descriptor; it is only
/// consulted when the arrangement is [`BayerArrangement::FromDescriptor`].
pub fn resolve_offsets(
    arrangement: BayerArrangement,
    descriptor: &str,
    filter: usize,
) -> Result<FilterOffsetSet, ArrangementError> {
    let partition = arrangement
        .canonical(descriptor)?
        .partition()
        .ok_or_else(|| ArrangementError::UnknownArrangement(arrangement.name().to_string()))?;

    partition
        .get(filter)
        .copied()
        .ok_or(ArrangementError::FilterOutOfRange {
            filter,
            count: partition.len(),
        })
}
