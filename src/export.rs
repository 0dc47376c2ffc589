//! Producing the PDF file of a report.
//!
//! The page is laid out, drawn to a bitmap at an upscaled resolution, encoded as JPEG and
//! embedded over the whole of a single A4 page. One export runs at a time per exporter,
//! a request arriving while another is in flight is skipped.

use std::{
    io::Cursor,
    path::PathBuf,
    sync::atomic::{AtomicBool, Ordering},
};

use image::{codecs::jpeg::JpegEncoder, DynamicImage};

use crate::{
    configuration::Configuration,
    error::ContextError,
    layout::{self, PAGE_HEIGHT, PAGE_WIDTH},
    pdf,
    raster::PageRasterizer,
    report::ReportData,
};

/// Shown to the user when an export fails.
pub const EXPORT_FAILURE_NOTICE: &str = "Gagal menjana PDF. Sila cuba lagi.";

const FILE_NAME_PREFIX: &str = "SSEMJ_OPR_";
const FALLBACK_FILE_STEM: &str = "Laporan";

/// A flag marking an operation as in flight, raised through `try_acquire` and lowered when
/// the returned guard is dropped, whichever way the operation ends.
#[derive(Debug, Default)]
pub struct BusyFlag(AtomicBool);

/// Keeps a `BusyFlag` raised while alive.
#[derive(Debug)]
pub struct BusyGuard<'a>(&'a BusyFlag);

impl BusyFlag {
    pub fn new() -> Self {
        BusyFlag(AtomicBool::new(false))
    }

    /// Raises the flag, or returns `None` when it is already raised.
    pub fn try_acquire(&self) -> Option<BusyGuard<'_>> {
        self.0
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| BusyGuard(self))
    }

    pub fn is_raised(&self) -> bool {
        self.0.load(Ordering::Acquire)
    }
}

impl Drop for BusyGuard<'_> {
    fn drop(&mut self) {
        self.0 .0.store(false, Ordering::Release);
    }
}

/// How an export request ended.
#[derive(Debug, Clone, PartialEq)]
pub enum ExportOutcome {
    /// The PDF was written to the given path.
    Saved(PathBuf),
    /// Another export was still running, nothing was done.
    Skipped,
    Failed(ContextError),
}

impl ExportOutcome {
    /// The message to show to the user, if any.
    pub fn notice(&self) -> Option<&'static str> {
        match self {
            ExportOutcome::Failed(_) => Some(EXPORT_FAILURE_NOTICE),
            _ => None,
        }
    }
}

/// The name of the exported file: the title with every run of whitespace replaced by an
/// underscore, behind a fixed prefix. Path separators are replaced too.
pub fn export_file_name(title: &str) -> String {
    let mut stem = String::with_capacity(title.len());
    let mut in_whitespace = false;
    for character in title.chars() {
        if character.is_whitespace() {
            if !in_whitespace {
                stem.push('_');
            }
            in_whitespace = true;
            continue;
        }
        in_whitespace = false;
        match character {
            '/' | '\\' => stem.push('_'),
            _ => stem.push(character),
        }
    }
    if stem.is_empty() {
        stem.push_str(FALLBACK_FILE_STEM);
    }

    format!("{}{}.pdf", FILE_NAME_PREFIX, stem)
}

/// Turns reports into PDF files with the given rasterizer.
pub struct Exporter<R: PageRasterizer> {
    rasterizer: R,
    configuration: Configuration,
    busy: BusyFlag,
}

impl<R: PageRasterizer> Exporter<R> {
    pub fn new(rasterizer: R, configuration: Configuration) -> Self {
        Exporter {
            rasterizer,
            configuration,
            busy: BusyFlag::new(),
        }
    }

    pub fn is_busy(&self) -> bool {
        self.busy.is_raised()
    }

    pub fn configuration(&self) -> &Configuration {
        &self.configuration
    }

    /// Exports the report into the configured output directory. The record is read once,
    /// edits made while the export runs do not affect it.
    pub fn export(&self, record: &ReportData) -> ExportOutcome {
        let Some(_guard) = self.busy.try_acquire() else {
            log::info!("An export is already running, ignoring the request");
            return ExportOutcome::Skipped;
        };

        match self.write_pdf(record) {
            Ok(path) => {
                log::info!("Saved the report to {:?}", path);
                ExportOutcome::Saved(path)
            }
            Err(error) => {
                log::error!("Failed to export the report: {}", error);
                ExportOutcome::Failed(error)
            }
        }
    }

    /// Produces the bytes of the PDF document for the report.
    pub fn render_pdf(&self, record: &ReportData) -> Result<Vec<u8>, ContextError> {
        // Gives pictures and fonts the time to be in place before drawing
        let settle_delay = self.configuration.settle_delay();
        if !settle_delay.is_zero() {
            std::thread::sleep(settle_delay);
        }

        let page = layout::render(record);
        let raster = self
            .rasterizer
            .rasterize(&page, self.configuration.raster_scale)?;
        let raster = DynamicImage::ImageRgba8(raster).to_rgb8();
        let (pixel_width, pixel_height) = raster.dimensions();
        log::debug!("Rasterized the page to {}x{} pixels", pixel_width, pixel_height);

        let mut jpeg_data = Vec::new();
        JpegEncoder::new_with_quality(&mut Cursor::new(&mut jpeg_data), self.configuration.jpeg_quality)
            .encode_image(&raster)
            .map_err(|error| ContextError::with_error("Failed to encode the page as JPEG", &error))?;

        pdf::single_image_pdf(
            jpeg_data,
            [pixel_width, pixel_height],
            [PAGE_WIDTH, PAGE_HEIGHT],
            pdf::document_identifier(&record.title),
            record.title.clone(),
        )
    }

    fn write_pdf(&self, record: &ReportData) -> Result<PathBuf, ContextError> {
        let pdf_bytes = self.render_pdf(record)?;

        let output_directory = &self.configuration.output_directory;
        std::fs::create_dir_all(output_directory).map_err(|error| {
            ContextError::with_error(
                format!("Unable to create the output directory {:?}", output_directory),
                &error,
            )
        })?;
        let path = output_directory.join(export_file_name(&record.title));
        std::fs::write(&path, pdf_bytes).map_err(|error| {
            ContextError::with_error(format!("Unable to write the PDF file {:?}", path), &error)
        })?;

        Ok(path)
    }
}

#[cfg(test)]
mod tests {
    use std::{
        sync::atomic::AtomicUsize,
        time::Duration,
    };

    use image::RgbaImage;

    use super::*;
    use crate::{layout::Page, report::FieldUpdate};

    struct BlankRasterizer {
        calls: AtomicUsize,
    }

    impl PageRasterizer for BlankRasterizer {
        fn rasterize(&self, _page: &Page, scale: f32) -> Result<RgbaImage, ContextError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(RgbaImage::new((21.0 * scale) as u32, (29.7 * scale) as u32))
        }
    }

    struct FailingRasterizer;

    impl PageRasterizer for FailingRasterizer {
        fn rasterize(&self, _page: &Page, _scale: f32) -> Result<RgbaImage, ContextError> {
            Err(ContextError::with_context("No surface"))
        }
    }

    fn configuration_in(name: &str, settle_delay_millis: u64) -> Configuration {
        Configuration {
            output_directory: std::env::temp_dir()
                .join(format!("laporan-export-{}-{}", name, std::process::id())),
            settle_delay_millis,
            ..Configuration::default()
        }
    }

    #[test]
    fn file_names_collapse_whitespace_runs() {
        assert_eq!(
            export_file_name("Hari  Sukan\tTahunan"),
            "SSEMJ_OPR_Hari_Sukan_Tahunan.pdf"
        );
        assert_eq!(export_file_name(""), "SSEMJ_OPR_Laporan.pdf");
        assert_eq!(export_file_name(" "), "SSEMJ_OPR__.pdf");
        assert_eq!(export_file_name("Kelab 1/2"), "SSEMJ_OPR_Kelab_1_2.pdf");
    }

    #[test]
    fn the_busy_flag_is_lowered_when_the_guard_drops() {
        let flag = BusyFlag::new();
        let guard = flag.try_acquire();
        assert!(guard.is_some());
        assert!(flag.is_raised());
        assert!(flag.try_acquire().is_none());

        drop(guard);
        assert!(!flag.is_raised());
        assert!(flag.try_acquire().is_some());
    }

    #[test]
    fn exports_are_written_under_the_title() {
        let exporter = Exporter::new(
            BlankRasterizer {
                calls: AtomicUsize::new(0),
            },
            configuration_in("saved", 0),
        );
        let record = ReportData::default()
            .apply(FieldUpdate::Title("Hari Sukan".into()))
            .unwrap();

        let outcome = exporter.export(&record);

        let path = match outcome {
            ExportOutcome::Saved(path) => path,
            other => panic!("unexpected outcome {:?}", other),
        };
        assert!(path.ends_with("SSEMJ_OPR_Hari_Sukan.pdf"));
        let document = lopdf::Document::load(&path).unwrap();
        assert_eq!(document.get_pages().len(), 1);
        assert_eq!(exporter.rasterizer.calls.load(Ordering::SeqCst), 1);
        assert!(!exporter.is_busy());
    }

    #[test]
    fn failures_carry_the_notice_and_release_the_flag() {
        let exporter = Exporter::new(FailingRasterizer, configuration_in("failed", 0));

        let outcome = exporter.export(&ReportData::default());

        assert!(matches!(outcome, ExportOutcome::Failed(_)));
        assert_eq!(outcome.notice(), Some(EXPORT_FAILURE_NOTICE));
        assert!(!exporter.is_busy());
    }

    #[test]
    fn a_second_request_during_an_export_is_skipped() {
        let exporter = Exporter::new(
            BlankRasterizer {
                calls: AtomicUsize::new(0),
            },
            configuration_in("reentrant", 400),
        );
        let record = ReportData::default();

        std::thread::scope(|scope| {
            let first = scope.spawn(|| exporter.export(&record));
            while !exporter.is_busy() {
                std::thread::sleep(Duration::from_millis(1));
            }

            assert_eq!(exporter.export(&record), ExportOutcome::Skipped);
            assert!(matches!(first.join().unwrap(), ExportOutcome::Saved(_)));
        });
        assert_eq!(exporter.rasterizer.calls.load(Ordering::SeqCst), 1);
    }
}
