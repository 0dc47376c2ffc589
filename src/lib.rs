//! Laporan builds the one-page activity report ("One Page Report") of a school program.
//!
//! A report is a plain record (`ReportData`) edited through a `ReportForm`. The record is laid out
//! onto a fixed A4 page whose text sizes shrink with the amount of text, drawn to a bitmap and
//! embedded as a single JPEG image in a one-page PDF document. A free-hand signature surface and
//! an optional text-generation assistant complete the form.

#![cfg_attr(not(test), deny(clippy::unwrap_used, clippy::expect_used))]

/// This module contains the `ContextError` type which is the error type used throughout this library.
///
/// Every fallible function returns a `ContextError` which explains what was being done, and when the
/// failure came from another library (decoding an image, writing the PDF, calling the text-generation
/// service), that library's error message.
pub mod error;

/// The text-fitting rule: a font size which stays at its base value for short texts and decays
/// smoothly, down to a floor, as the text grows past a threshold.
pub mod fitting;

/// Images travelling inside the record as base64 data URLs (photos and the signature).
pub mod payload;

/// The color themes, one per program category.
pub mod theme;

/// The report record, its enumerations and the edits it accepts.
///
/// # Introduction
///
/// `ReportData` is immutable from the outside: every edit goes through `ReportData::apply` with a
/// `FieldUpdate` and produces a new record. This is what keeps the provider's role and sub-category
/// consistent, and the photo list within its four slots.
pub mod report;

/// The signature surface, which turns pointer events into strokes and reports the drawing as a PNG
/// data URL when a stroke ends.
pub mod signature;

/// The page layout, a display list of fills, texts and pictures positioned in millimeters.
///
/// # Introduction
///
/// The page is split into six bands (header, title, statistics, body, footer and signature) whose
/// geometry is fixed. Only the font sizes depend on the content, which is how the report is kept
/// on exactly one page.
pub mod layout;

/// Drawing the display list to a bitmap, with `imageproc` for shapes and `rusttype` for text.
pub mod raster;

/// The low-level PDF writer, built on `lopdf`.
///
/// # Introduction
///
/// The main component of this module is the struct `PdfDocument`, with its convenience functions
/// `add_page_with_layer`, `add_image_to_layer_in_page`, `write_all` and `save_to_bytes`. The identifier
/// of the document is passed in by the caller, so that the output only depends on its inputs and
/// on the time of writing.
pub mod pdf;

/// The export pipeline, from the record to the PDF file on disk.
pub mod export;

/// Drafting the objective and impact paragraphs with a text-generation service.
pub mod assist;

/// The form: the current record, the edits applied to it and the drafting actions.
pub mod form;

/// The configuration file read by the command line interface.
pub mod configuration;
