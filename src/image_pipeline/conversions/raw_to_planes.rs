use std::path::{Path, PathBuf};

use chrono::Utc;
use tracing::{debug, error, info, instrument, warn};

use crate::image_pipeline::{
    bayer::{
        BayerArrangement, FILTER_NAMES, FilterOffsetSet, OutputPlane, extract_plane,
        plane_dimensions, plane_header, provenance_header, resolve_offsets,
    },
    common::error::{ArrangementError, ConversionError, Result},
    raw::{RawFrame, RawImageReader, RawLoaderReader},
    sink::{ExtractionConfig, FitsSink, ImageSink, TiffSink},
};

/// Result of one capture in a multi-file run.
#[derive(Debug)]
pub struct CaptureOutcome {
    pub input: PathBuf,
    /// Planes written, in filter order
    pub result: Result<Vec<PathBuf>>,
}

#[derive(Debug, Default)]
pub struct BatchReport {
    pub outcomes: Vec<CaptureOutcome>,
}

impl BatchReport {
    pub fn succeeded(&self) -> usize {
        self.outcomes.iter().filter(|o| o.result.is_ok()).count()
    }

    pub fn failures(&self) -> impl Iterator<Item = (&Path, &ConversionError)> {
        self.outcomes
            .iter()
            .filter_map(|o| o.result.as_ref().err().map(|e| (o.input.as_path(), e)))
    }

    /// Status of the first failed capture, 0 when every capture succeeded.
    pub fn exit_code(&self) -> i32 {
        self.failures().next().map_or(0, |(_, e)| e.exit_code())
    }
}

pub struct RawToPlanesPipeline<R: RawImageReader, S: ImageSink> {
    reader: R,
    sink: S,
    config: ExtractionConfig,
}

impl RawToPlanesPipeline<RawLoaderReader, FitsSink> {
    pub fn new(config: ExtractionConfig) -> Self {
        Self {
            reader: RawLoaderReader,
            sink: FitsSink,
            config,
        }
    }
}

impl RawToPlanesPipeline<RawLoaderReader, TiffSink> {
    pub fn tiff(config: ExtractionConfig) -> Self {
        Self {
            reader: RawLoaderReader,
            sink: TiffSink {
                compression: config.compression,
                predictor: config.predictor,
            },
            config,
        }
    }
}

impl<R: RawImageReader, S: ImageSink> RawToPlanesPipeline<R, S> {
    pub fn with_custom(reader: R, sink: S, config: ExtractionConfig) -> Self {
        Self {
            reader,
            sink,
            config,
        }
    }

    fn validate_dimensions(&self, frame: &RawFrame) -> Result<()> {
        if frame.width == 0 || frame.height == 0 {
            return Err(ConversionError::InvalidDimensions {
                width: frame.width,
                height: frame.height,
                reason: "capture has no usable area".to_string(),
            });
        }

        let step = 2 * self.config.binning;
        if frame.width % step != 0 || frame.height % step != 0 {
            let (width, height) = plane_dimensions(frame, self.config.binning);
            warn!(
                "Usable area {}x{} is not a multiple of {}, trailing cells dropped ({}x{} planes)",
                frame.width, frame.height, step, width, height
            );
        }

        Ok(())
    }

    fn log_capture_summary(&self, frame: &RawFrame) {
        let m = &frame.metadata;
        let summary = format!(
            "make={:?} model={:?} colors={} raw={}x{} usable={}x{} top={} left={} \
             orientation={} iso={:?} shutter={:?} artist={:?} timestamp={:?} \
             cfa={} layout={} cameratemp={:?}",
            m.make,
            m.model,
            m.colors,
            frame.raw_width,
            frame.raw_height,
            frame.width,
            frame.height,
            frame.top_margin,
            frame.left_margin,
            m.orientation,
            m.iso_speed,
            m.exposure_time,
            m.artist,
            m.timestamp,
            m.cfa_pattern,
            m.filter_layout,
            m.camera_temperature,
        );
        if self.config.verbosity > 0 {
            info!("Capture: {}", summary);
        } else {
            debug!("Capture: {}", summary);
        }
    }

    /// Offsets for every filter, resolved before any output is created.
    pub fn resolve_filters(&self, frame: &RawFrame) -> Result<Vec<FilterOffsetSet>> {
        let arrangement = self.config.arrangement;
        let layout = &frame.metadata.filter_layout;

        if frame.metadata.colors != arrangement.filter_count() {
            return Err(ArrangementError::UnsupportedLayout(format!(
                "{} ({} filters)",
                layout, frame.metadata.colors
            ))
            .into());
        }

        if arrangement == BayerArrangement::FromDescriptor {
            let reported = BayerArrangement::from_name(&frame.metadata.cfa_pattern).ok();
            let resolved = arrangement.canonical(layout)?;
            if let Some(reported) = reported.filter(|&r| r != resolved) {
                warn!(
                    "Sensor reports a {} mosaic but {} is assumed, name the arrangement to override",
                    reported, resolved
                );
            }
        }

        (0..arrangement.filter_count())
            .map(|filter| resolve_offsets(arrangement, layout, filter).map_err(Into::into))
            .collect()
    }

    /// `<destination>/<basename>-<filter>.<ext>`
    pub fn output_path(&self, destination: &Path, basename: &str, filter: usize) -> PathBuf {
        let name = FILTER_NAMES.get(filter).copied().unwrap_or("X");
        destination.join(format!("{}-{}.{}", basename, name, self.sink.extension()))
    }

    fn write_plane(&self, handle: &mut S::Handle, plane: &OutputPlane, frame: &RawFrame) -> Result<()> {
        for card in plane_header(FILTER_NAMES[plane.filter], plane.binning) {
            self.sink.write_metadata_field(handle, &card)?;
        }
        self.sink.write_image(handle, &plane.data)?;
        for card in provenance_header(&frame.metadata, self.config.missing_fields, Utc::now()) {
            self.sink.write_metadata_field(handle, &card)?;
        }
        Ok(())
    }

    fn emit_plane(
        &self,
        frame: &RawFrame,
        filter: usize,
        offsets: FilterOffsetSet,
        path: &Path,
    ) -> Result<()> {
        let _span = tracing::info_span!("extract_plane", filter = FILTER_NAMES[filter]).entered();

        let plane = extract_plane(frame, filter, offsets, self.config.binning)?;
        let mut handle = self.sink.create_image(path, plane.width, plane.height)?;
        match self.write_plane(&mut handle, &plane, frame) {
            Ok(()) => self.sink.close(handle),
            Err(e) => {
                // releases the target without finishing it
                drop(handle);
                Err(e)
            }
        }
    }

    /// Writes one plane per filter for an already decoded capture, in filter order.
    pub fn extract(&self, frame: &RawFrame, destination: &Path, basename: &str) -> Result<Vec<PathBuf>> {
        self.config.validate()?;

        {
            let _span = tracing::info_span!("validate_dimensions",
                width = frame.width,
                height = frame.height
            ).entered();
            self.validate_dimensions(frame)?;
        }

        let filters = {
            let _span = tracing::info_span!("resolve_arrangement").entered();
            self.resolve_filters(frame)?
        };

        let mut written = Vec::with_capacity(filters.len());
        for (filter, offsets) in filters.into_iter().enumerate() {
            let path = self.output_path(destination, basename, filter);
            self.emit_plane(frame, filter, offsets, &path)?;
            info!(output = %path.display(), "Plane written");
            written.push(path);
        }
        Ok(written)
    }

    #[instrument(skip(self, input_data, destination), fields(input_size = input_data.len()))]
    pub fn convert(&self, input_data: &[u8], destination: &Path, basename: &str) -> Result<Vec<PathBuf>> {
        info!("Starting RAW to plane extraction");

        let frame = {
            let _span = tracing::info_span!("decode_raw").entered();
            self.reader.read_raw(input_data)?
        };
        self.log_capture_summary(&frame);

        let written = self.extract(&frame, destination, basename)?;

        info!(
            planes = written.len(),
            binning = self.config.binning,
            "Extraction complete"
        );
        Ok(written)
    }

    #[instrument(skip(self, input_path, destination))]
    pub fn convert_file<P: AsRef<Path>, Q: AsRef<Path>>(
        &self,
        input_path: P,
        destination: Q,
    ) -> Result<Vec<PathBuf>> {
        let input_path = input_path.as_ref();
        let destination = destination.as_ref();

        info!(
            input = %input_path.display(),
            destination = %destination.display(),
            "Converting file"
        );

        let basename = input_path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .ok_or_else(|| {
                ConversionError::InputReadError(format!("{}: no file name", input_path.display()))
            })?;

        let input_data = {
            let _span = tracing::info_span!("read_input_file").entered();
            std::fs::read(input_path).map_err(|e| {
                ConversionError::InputReadError(format!("{}: {}", input_path.display(), e))
            })?
        };

        self.convert(&input_data, destination, &basename)
    }

    /// Converts each capture independently; a failed capture is reported and
    /// the run moves on to the next one.
    pub fn convert_files<P: AsRef<Path>>(&self, inputs: &[P], destination: &Path) -> BatchReport {
        let mut report = BatchReport::default();
        for input in inputs {
            let input = input.as_ref();
            let result = self.convert_file(input, destination);
            if let Err(e) = &result {
                error!("{}: {}", input.display(), e);
            }
            report.outcomes.push(CaptureOutcome {
                input: input.to_path_buf(),
                result,
            });
        }
        report
    }

    pub fn config(&self) -> &ExtractionConfig {
        &self.config
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::image_pipeline::sink::TiffCompression;

    #[test]
    fn test_tiff_pipeline_takes_encoder_settings_from_config() {
        let config = ExtractionConfig::builder()
            .compression(TiffCompression::Lzw)
            .predictor(Some(2))
            .build();
        let pipeline = RawToPlanesPipeline::tiff(config);
        assert_eq!(pipeline.sink.compression, TiffCompression::Lzw);
        assert_eq!(pipeline.sink.predictor, Some(2));
        assert_eq!(pipeline.config().predictor, Some(2));
    }
}
