//! Adaptive font sizing for the fixed-height bands of the printed report.

use unicode_normalization::UnicodeNormalization as _;

/// The exponent applied to the shrink ratio, below one so that short overflows
/// shrink gently and long overflows shrink harder, but never linearly.
const SHRINK_EXPONENT: f32 = 0.7;

/// The sizing parameters of one print region, expressed in points.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FitParameters {
    /// The size used while the text fits comfortably.
    pub base_size: f32,
    /// The number of characters beyond which the text starts shrinking.
    pub length_threshold: usize,
    /// The floor below which the size never goes.
    pub min_size: f32,
}

impl FitParameters {
    pub const fn new(base_size: f32, length_threshold: usize, min_size: f32) -> Self {
        FitParameters {
            base_size,
            length_threshold,
            min_size,
        }
    }

    /// Fits the given text with these parameters, see `compute_font_size`.
    pub fn fit(&self, text: &str) -> f32 {
        compute_font_size(text, self.base_size, self.length_threshold, self.min_size)
    }
}

/// The program title in the title band.
pub const TITLE: FitParameters = FitParameters::new(13.0, 40, 9.0);
/// The value of each of the five cells of the statistics row.
pub const STAT_CHIP: FitParameters = FitParameters::new(7.5, 12, 5.5);
/// The objective and impact paragraphs of the body.
pub const BODY_PARAGRAPH: FitParameters = FitParameters::new(10.0, 200, 7.5);
/// The participation banner of the footer row.
pub const PARTICIPATION: FitParameters = FitParameters::new(10.0, 25, 7.0);
/// The organizer banner of the footer row.
pub const ORGANIZER: FitParameters = FitParameters::new(10.0, 25, 7.0);

/// Computes the display size of `text` so that the longer it gets, the smaller it is drawn,
/// without ever going below `min_size`.
///
/// The length is the number of characters (not bytes) of the trimmed text. Text up to
/// `length_threshold` characters keeps `base_size`; past it the size decays as
/// `base_size * (length_threshold / length)^0.7`, clamped to `min_size`.
///
/// # Arguments
///
/// * `text` - The text to be drawn.
/// * `base_size` - The size for text that fits without shrinking.
/// * `length_threshold` - The length at which shrinking starts.
/// * `min_size` - The floor of the result.
pub fn compute_font_size(text: &str, base_size: f32, length_threshold: usize, min_size: f32) -> f32 {
    if text.is_empty() {
        return base_size;
    }

    let length = text.trim().nfc().count();
    if length <= length_threshold {
        return base_size;
    }

    let scale = length_threshold as f32 / length as f32;
    let shrunk_size = base_size * scale.powf(SHRINK_EXPONENT);

    shrunk_size.max(min_size)
}
