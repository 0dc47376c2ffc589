//! Turns the laid out page into a bitmap.

use std::path::Path;

use image::{imageops, imageops::FilterType, Rgba, RgbaImage};
use imageproc::{
    drawing::{draw_filled_rect_mut, draw_hollow_circle_mut, draw_hollow_rect_mut},
    rect::Rect,
};
use rusttype::{point, Font, Scale};
use unicode_normalization::UnicodeNormalization as _;

use crate::{
    configuration::Configuration,
    error::ContextError,
    layout::{Align, Area, Element, Fit, Page, Paint, TextBlock, Weight},
    theme::{self, Color},
};

/// Pixels per millimetre at the CSS reference resolution of 96 DPI.
const PIXELS_PER_MILLIMETER: f32 = 96.0 / 25.4;
/// Pixels per point at 96 DPI.
const PIXELS_PER_POINT: f32 = 96.0 / 72.0;

/// Anything able to turn a page into a bitmap at the given upscaling factor.
pub trait PageRasterizer {
    fn rasterize(&self, page: &Page, scale: f32) -> Result<RgbaImage, ContextError>;
}

/// DejaVu Sans, used when no font is configured.
const BUNDLED_REGULAR_FONT: &[u8] = include_bytes!("../fonts/DejaVuSans.ttf");
const BUNDLED_BOLD_FONT: &[u8] = include_bytes!("../fonts/DejaVuSans-Bold.ttf");

/// Draws the page with `imageproc` primitives and `rusttype` glyphs.
pub struct Rasterizer {
    regular_font: Option<Font<'static>>,
    bold_font: Option<Font<'static>>,
}

impl Rasterizer {
    /// A rasterizer without any font, it refuses pages which hold text.
    pub fn without_fonts() -> Self {
        Rasterizer {
            regular_font: None,
            bold_font: None,
        }
    }

    /// Loads the TTF fonts used for regular and bold text, bold falls back to regular.
    pub fn from_font_files(
        regular_font_path: &Path,
        bold_font_path: Option<&Path>,
    ) -> Result<Self, ContextError> {
        let regular_font = load_font(regular_font_path)?;
        let bold_font = bold_font_path.map(load_font).transpose()?;

        Ok(Rasterizer {
            regular_font: Some(regular_font),
            bold_font,
        })
    }

    /// Uses the fonts shipped with the crate.
    pub fn with_bundled_fonts() -> Result<Self, ContextError> {
        let regular_font = Font::try_from_bytes(BUNDLED_REGULAR_FONT)
            .ok_or(ContextError::with_context("Unable to parse the bundled regular font"))?;
        let bold_font = Font::try_from_bytes(BUNDLED_BOLD_FONT)
            .ok_or(ContextError::with_context("Unable to parse the bundled bold font"))?;

        Ok(Rasterizer {
            regular_font: Some(regular_font),
            bold_font: Some(bold_font),
        })
    }

    pub fn from_configuration(configuration: &Configuration) -> Result<Self, ContextError> {
        match &configuration.font_path {
            Some(font_path) => {
                Rasterizer::from_font_files(font_path, configuration.bold_font_path.as_deref())
            }
            None => {
                log::debug!("No font configured, using the bundled DejaVu Sans");
                Rasterizer::with_bundled_fonts()
            }
        }
    }

    fn font(&self, weight: Weight) -> Option<&Font<'static>> {
        match weight {
            Weight::Bold => self.bold_font.as_ref().or(self.regular_font.as_ref()),
            Weight::Regular => self.regular_font.as_ref(),
        }
    }
}

fn load_font(font_path: &Path) -> Result<Font<'static>, ContextError> {
    let font_data = std::fs::read(font_path).map_err(|error| {
        ContextError::with_error(format!("Unable to read the font {:?}", font_path), &error)
    })?;
    Font::try_from_vec(font_data).ok_or(ContextError::with_context(format!(
        "Unable to parse the font {:?}",
        font_path
    )))
}

impl PageRasterizer for Rasterizer {
    fn rasterize(&self, page: &Page, scale: f32) -> Result<RgbaImage, ContextError> {
        if !(scale.is_finite() && scale > 0.0) {
            return Err(ContextError::with_context(format!(
                "Invalid raster scale {}",
                scale
            )));
        }
        if let Some(block) = page
            .texts()
            .find(|block| !block.text.trim().is_empty() && self.font(block.weight).is_none())
        {
            return Err(ContextError::with_context(format!(
                "No font available to draw the {:?} text",
                block.slot
            )));
        }
        let mut canvas = Canvas::new(page, PIXELS_PER_MILLIMETER * scale)?;

        for element in &page.elements {
            match element {
                Element::Fill { area, paint } => canvas.fill(area, paint),
                Element::Outline { area, color, width } => canvas.outline(area, *color, *width),
                Element::Text(block) => {
                    if let Some(font) = self.font(block.weight) {
                        canvas.text(block, font, scale);
                    }
                }
                Element::Picture { area, payload, fit } => match payload.decode() {
                    Ok(picture) => canvas.picture(area, &picture, *fit),
                    Err(error) => log::warn!("Skipping an unreadable picture: {}", error),
                },
                Element::PhotoPlaceholder { area } => canvas.placeholder(area),
            }
        }

        Ok(canvas.image)
    }
}

/// A pixel rectangle, already clipped to the image.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct PixelRect {
    x: u32,
    y: u32,
    width: u32,
    height: u32,
}

struct Canvas {
    image: RgbaImage,
    pixels_per_millimeter: f32,
}

impl Canvas {
    fn new(page: &Page, pixels_per_millimeter: f32) -> Result<Self, ContextError> {
        let width = (page.width * pixels_per_millimeter).round() as u32;
        let height = (page.height * pixels_per_millimeter).round() as u32;
        if width == 0 || height == 0 {
            return Err(ContextError::with_context(format!(
                "The page rasterizes to an empty bitmap of {}x{}",
                width, height
            )));
        }

        Ok(Canvas {
            image: RgbaImage::from_pixel(width, height, rgba(theme::WHITE)),
            pixels_per_millimeter,
        })
    }

    fn to_pixels(&self, area: &Area) -> Option<PixelRect> {
        let left = (area.x * self.pixels_per_millimeter).round().max(0.0) as u32;
        let top = (area.y * self.pixels_per_millimeter).round().max(0.0) as u32;
        let right = ((area.right() * self.pixels_per_millimeter).round().max(0.0) as u32)
            .min(self.image.width());
        let bottom = ((area.bottom() * self.pixels_per_millimeter).round().max(0.0) as u32)
            .min(self.image.height());

        if right <= left || bottom <= top {
            return None;
        }
        Some(PixelRect {
            x: left,
            y: top,
            width: right - left,
            height: bottom - top,
        })
    }

    fn fill(&mut self, area: &Area, paint: &Paint) {
        let Some(rect) = self.to_pixels(area) else {
            return;
        };
        match paint {
            Paint::Solid(color) => draw_filled_rect_mut(
                &mut self.image,
                Rect::at(rect.x as i32, rect.y as i32).of_size(rect.width, rect.height),
                rgba(*color),
            ),
            Paint::Gradient(stops) => {
                for column in 0..rect.width {
                    let progress = if rect.width > 1 {
                        column as f32 / (rect.width - 1) as f32
                    } else {
                        0.0
                    };
                    let color = rgba(gradient_color(stops, progress));
                    for row in 0..rect.height {
                        self.image.put_pixel(rect.x + column, rect.y + row, color);
                    }
                }
            }
        }
    }

    fn outline(&mut self, area: &Area, color: Color, width: f32) {
        let Some(rect) = self.to_pixels(area) else {
            return;
        };
        let thickness = ((width * self.pixels_per_millimeter).round() as u32).max(1);
        for inset in 0..thickness.min(rect.width / 2).min(rect.height / 2) {
            draw_hollow_rect_mut(
                &mut self.image,
                Rect::at((rect.x + inset) as i32, (rect.y + inset) as i32)
                    .of_size(rect.width - 2 * inset, rect.height - 2 * inset),
                rgba(color),
            );
        }
    }

    fn picture(&mut self, area: &Area, picture: &image::DynamicImage, fit: Fit) {
        let Some(rect) = self.to_pixels(area) else {
            return;
        };
        match fit {
            Fit::Cover => {
                let fitted = picture
                    .resize_to_fill(rect.width, rect.height, FilterType::Triangle)
                    .to_rgba8();
                imageops::overlay(&mut self.image, &fitted, rect.x as i64, rect.y as i64);
            }
            Fit::ContainLeft => {
                let fitted = picture
                    .resize(rect.width, rect.height, FilterType::Triangle)
                    .to_rgba8();
                let top = rect.y + rect.height.saturating_sub(fitted.height());
                imageops::overlay(&mut self.image, &fitted, rect.x as i64, top as i64);
            }
        }
    }

    /// A small picture frame in the middle of an empty photo slot.
    fn placeholder(&mut self, area: &Area) {
        let Some(rect) = self.to_pixels(area) else {
            return;
        };
        let glyph_size = ((5.0 * self.pixels_per_millimeter) as u32)
            .min(rect.width)
            .min(rect.height);
        if glyph_size < 4 {
            return;
        }
        let left = rect.x + (rect.width - glyph_size) / 2;
        let top = rect.y + (rect.height - glyph_size) / 2;
        let color = rgba(theme::GRAY_300);

        draw_hollow_rect_mut(
            &mut self.image,
            Rect::at(left as i32, top as i32).of_size(glyph_size, glyph_size),
            color,
        );
        draw_hollow_circle_mut(
            &mut self.image,
            (
                (left + glyph_size / 3) as i32,
                (top + glyph_size / 3) as i32,
            ),
            (glyph_size / 10).max(1) as i32,
            color,
        );
    }

    fn text(&mut self, block: &TextBlock, font: &Font<'static>, scale: f32) {
        let Some(rect) = self.to_pixels(&block.area) else {
            return;
        };
        let font_scale = Scale::uniform(block.size * PIXELS_PER_POINT * scale);
        let vertical_metrics = font.v_metrics(font_scale);
        let line_height = font_scale.y * block.line_height;
        let lines = wrap_lines(font, font_scale, &block.text, rect.width as f32);

        let total_height = line_height * lines.len() as f32;
        let top = if block.vertically_centered {
            rect.y as f32 + ((rect.height as f32 - total_height) / 2.0).max(0.0)
        } else {
            rect.y as f32
        };
        let glyph_height = vertical_metrics.ascent - vertical_metrics.descent;

        for (index, line) in lines.iter().enumerate() {
            let baseline = top
                + index as f32 * line_height
                + (line_height - glyph_height) / 2.0
                + vertical_metrics.ascent;
            if baseline - vertical_metrics.ascent > (rect.y + rect.height) as f32 {
                break;
            }

            let width = line_width(font, font_scale, line);
            let start = match block.align {
                Align::Left => rect.x as f32,
                Align::Center => rect.x as f32 + (rect.width as f32 - width) / 2.0,
                Align::Right => rect.x as f32 + rect.width as f32 - width,
            };

            for glyph in font.layout(line, font_scale, point(start, baseline)) {
                let Some(bounding_box) = glyph.pixel_bounding_box() else {
                    continue;
                };
                glyph.draw(|x, y, coverage| {
                    let pixel_x = bounding_box.min.x + x as i32;
                    let pixel_y = bounding_box.min.y + y as i32;
                    // Clip to the text area
                    if pixel_x < rect.x as i32
                        || pixel_y < rect.y as i32
                        || pixel_x >= (rect.x + rect.width) as i32
                        || pixel_y >= (rect.y + rect.height) as i32
                    {
                        return;
                    }
                    let pixel = self.image.get_pixel_mut(pixel_x as u32, pixel_y as u32);
                    blend(pixel, block.color, coverage);
                });
            }
        }
    }
}

/// Breaks the text into lines no wider than `maximum_width`, explicit line breaks are kept.
/// A single word wider than the line is left on its own line and clipped when drawn.
fn wrap_lines(font: &Font<'static>, scale: Scale, text: &str, maximum_width: f32) -> Vec<String> {
    let text: String = text.nfc().collect();
    let mut lines = Vec::new();

    for paragraph in text.lines() {
        let mut current_line = String::new();
        for word in paragraph.split_whitespace() {
            let candidate = if current_line.is_empty() {
                word.to_string()
            } else {
                format!("{} {}", current_line, word)
            };
            if current_line.is_empty() || line_width(font, scale, &candidate) <= maximum_width {
                current_line = candidate;
            } else {
                lines.push(std::mem::take(&mut current_line));
                current_line = word.to_string();
            }
        }
        lines.push(current_line);
    }

    lines
}

fn line_width(font: &Font<'static>, scale: Scale, text: &str) -> f32 {
    font.layout(text, scale, point(0.0, 0.0))
        .last()
        .map(|glyph| glyph.position().x + glyph.unpositioned().h_metrics().advance_width)
        .unwrap_or(0.0)
}

fn gradient_color(stops: &[Color; 3], progress: f32) -> Color {
    let (from, to, local) = if progress <= 0.5 {
        (stops[0], stops[1], progress * 2.0)
    } else {
        (stops[1], stops[2], (progress - 0.5) * 2.0)
    };
    let mut color = [0; 3];
    for channel in 0..3 {
        color[channel] =
            (from[channel] as f32 + (to[channel] as f32 - from[channel] as f32) * local).round() as u8;
    }
    color
}

/// Mixes `color` into the pixel with the glyph coverage as opacity.
fn blend(pixel: &mut Rgba<u8>, color: Color, coverage: f32) {
    let coverage = coverage.clamp(0.0, 1.0);
    for channel in 0..3 {
        pixel.0[channel] = (color[channel] as f32 * coverage
            + pixel.0[channel] as f32 * (1.0 - coverage))
            .round() as u8;
    }
    pixel.0[3] = 255;
}

fn rgba(color: Color) -> Rgba<u8> {
    Rgba([color[0], color[1], color[2], 255])
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        layout::{self, Slot},
        payload::ImagePayload,
        report::ReportData,
    };

    fn blank_page(elements: Vec<Element>) -> Page {
        Page {
            width: 20.0,
            height: 10.0,
            elements,
        }
    }

    fn bundled() -> Rasterizer {
        Rasterizer::with_bundled_fonts().unwrap()
    }

    fn text_page(text: &str, align: Align, vertically_centered: bool) -> (Page, TextBlock) {
        let block = TextBlock {
            slot: Slot::Objective,
            area: Area::new(4.0, 3.0, 30.0, 12.0),
            text: text.into(),
            size: 10.0,
            color: theme::BLACK,
            align,
            weight: Weight::Regular,
            line_height: 1.2,
            vertically_centered,
        };
        let page = Page {
            width: 40.0,
            height: 20.0,
            elements: vec![Element::Text(block.clone())],
        };
        (page, block)
    }

    /// The pixel rectangle of an area, computed like the canvas does.
    fn pixel_rect(area: &Area, scale: f32) -> PixelRect {
        let pixels_per_millimeter = PIXELS_PER_MILLIMETER * scale;
        let left = (area.x * pixels_per_millimeter).round() as u32;
        let top = (area.y * pixels_per_millimeter).round() as u32;
        PixelRect {
            x: left,
            y: top,
            width: (area.right() * pixels_per_millimeter).round() as u32 - left,
            height: (area.bottom() * pixels_per_millimeter).round() as u32 - top,
        }
    }

    /// The smallest rectangle holding every non-white pixel, as (left, top, right, bottom).
    fn ink_bounds(bitmap: &RgbaImage) -> Option<(u32, u32, u32, u32)> {
        bitmap
            .enumerate_pixels()
            .filter(|(_, _, pixel)| **pixel != Rgba([255, 255, 255, 255]))
            .fold(None, |bounds, (x, y, _)| match bounds {
                None => Some((x, y, x, y)),
                Some((left, top, right, bottom)) => {
                    Some((left.min(x), top.min(y), right.max(x), bottom.max(y)))
                }
            })
    }

    #[test]
    fn bitmap_size_follows_the_scale() {
        let page = layout::render(&ReportData::default());
        let rasterizer = bundled();

        let single = rasterizer.rasterize(&page, 1.0).unwrap();
        let double = rasterizer.rasterize(&page, 2.0).unwrap();

        assert_eq!(single.dimensions(), (794, 1123));
        assert_eq!(double.dimensions(), (1587, 2245));
    }

    #[test]
    fn invalid_scales_are_refused() {
        let page = blank_page(Vec::new());
        assert!(Rasterizer::without_fonts().rasterize(&page, 0.0).is_err());
        assert!(Rasterizer::without_fonts().rasterize(&page, f32::NAN).is_err());
    }

    #[test]
    fn solid_and_gradient_fills() {
        let page = blank_page(vec![
            Element::Fill {
                area: Area::new(0.0, 0.0, 10.0, 10.0),
                paint: Paint::Solid([10, 20, 30]),
            },
            Element::Fill {
                area: Area::new(10.0, 0.0, 10.0, 10.0),
                paint: Paint::Gradient([[0, 0, 0], [100, 100, 100], [200, 200, 200]]),
            },
        ]);
        let bitmap = Rasterizer::without_fonts().rasterize(&page, 1.0).unwrap();
        let (width, _) = bitmap.dimensions();

        assert_eq!(bitmap.get_pixel(5, 5), &Rgba([10, 20, 30, 255]));
        assert_eq!(bitmap.get_pixel(width - 1, 5), &Rgba([200, 200, 200, 255]));
    }

    #[test]
    fn gradient_passes_through_its_middle_stop() {
        let stops = [[0, 0, 0], [100, 50, 0], [200, 200, 200]];
        assert_eq!(gradient_color(&stops, 0.0), [0, 0, 0]);
        assert_eq!(gradient_color(&stops, 0.5), [100, 50, 0]);
        assert_eq!(gradient_color(&stops, 1.0), [200, 200, 200]);
    }

    #[test]
    fn cover_pictures_fill_their_area() {
        let mut red = RgbaImage::new(30, 10);
        for pixel in red.pixels_mut() {
            *pixel = Rgba([255, 0, 0, 255]);
        }
        let page = blank_page(vec![Element::Picture {
            area: Area::new(5.0, 2.0, 6.0, 6.0),
            payload: ImagePayload::from_png(&red).unwrap(),
            fit: Fit::Cover,
        }]);
        let bitmap = Rasterizer::without_fonts().rasterize(&page, 1.0).unwrap();

        let center = (8.0 * PIXELS_PER_MILLIMETER) as u32;
        let middle = (5.0 * PIXELS_PER_MILLIMETER) as u32;
        assert_eq!(bitmap.get_pixel(center, middle), &Rgba([255, 0, 0, 255]));
        assert_eq!(bitmap.get_pixel(1, 1), &Rgba([255, 255, 255, 255]));
    }

    #[test]
    fn unreadable_pictures_are_skipped() {
        let page = blank_page(vec![Element::Picture {
            area: Area::new(0.0, 0.0, 20.0, 10.0),
            payload: ImagePayload::from_data_url("data:image/png;base64,AAAA"),
            fit: Fit::Cover,
        }]);
        let bitmap = Rasterizer::without_fonts().rasterize(&page, 1.0).unwrap();

        assert!(bitmap.pixels().all(|pixel| pixel == &Rgba([255, 255, 255, 255])));
    }

    #[test]
    fn missing_font_files_are_reported() {
        let result = Rasterizer::from_font_files(Path::new("fonts/does-not-exist.ttf"), None);
        assert!(result.is_err());
    }

    #[test]
    fn text_pages_are_refused_without_fonts() {
        let (page, _) = text_page("Hari Sukan", Align::Left, false);
        assert!(Rasterizer::without_fonts().rasterize(&page, 1.0).is_err());

        let (blank, _) = text_page("  ", Align::Left, false);
        assert!(Rasterizer::without_fonts().rasterize(&blank, 1.0).is_ok());
    }

    #[test]
    fn the_default_configuration_draws_text() {
        let rasterizer = Rasterizer::from_configuration(&Configuration::default()).unwrap();
        let (page, block) = text_page("Hari Sukan", Align::Left, false);

        let bitmap = rasterizer.rasterize(&page, 1.0).unwrap();

        let (left, top, right, bottom) = ink_bounds(&bitmap).unwrap();
        let rect = pixel_rect(&block.area, 1.0);
        assert!(left >= rect.x && top >= rect.y);
        assert!(right < rect.x + rect.width && bottom < rect.y + rect.height);
    }

    #[test]
    fn lines_wrap_at_the_available_width() {
        let rasterizer = bundled();
        let font = rasterizer.regular_font.as_ref().unwrap();
        let scale = Scale::uniform(20.0);
        let maximum_width = line_width(font, scale, "satu dua") + 0.5;

        let lines = wrap_lines(font, scale, "satu dua tiga empat lima enam", maximum_width);

        assert!(lines.len() >= 3, "{:?}", lines);
        assert!(lines
            .iter()
            .all(|line| line_width(font, scale, line) <= maximum_width));
        assert_eq!(lines.join(" "), "satu dua tiga empat lima enam");
    }

    #[test]
    fn explicit_breaks_and_long_words_are_kept() {
        let rasterizer = bundled();
        let font = rasterizer.regular_font.as_ref().unwrap();
        let scale = Scale::uniform(20.0);

        assert_eq!(wrap_lines(font, scale, "atas\nbawah", 1000.0), vec!["atas", "bawah"]);
        assert_eq!(
            wrap_lines(font, scale, "pendidikan kokurikulum", 1.0),
            vec!["pendidikan", "kokurikulum"]
        );
    }

    #[test]
    fn glyphs_never_escape_their_area() {
        let long_text = "Memupuk semangat kerjasama dan disiplin dalam kalangan murid ".repeat(8);
        let (page, block) = text_page(&long_text, Align::Left, false);

        let bitmap = bundled().rasterize(&page, 2.0).unwrap();

        let (left, top, right, bottom) = ink_bounds(&bitmap).unwrap();
        let rect = pixel_rect(&block.area, 2.0);
        assert!(left >= rect.x && top >= rect.y);
        assert!(right < rect.x + rect.width, "{} escapes {:?}", right, rect);
        assert!(bottom < rect.y + rect.height, "{} escapes {:?}", bottom, rect);
    }

    #[test]
    fn alignment_places_lines_inside_the_box() {
        let rect = pixel_rect(&Area::new(4.0, 3.0, 30.0, 12.0), 2.0);
        let quarter = rect.width / 4;
        let ink = |align| {
            let (page, _) = text_page("Ab", align, false);
            ink_bounds(&bundled().rasterize(&page, 2.0).unwrap()).unwrap()
        };

        let (left, _, right, _) = ink(Align::Left);
        assert!(left >= rect.x && left < rect.x + quarter);
        assert!(right < rect.x + rect.width / 2);

        let (left, _, right, _) = ink(Align::Right);
        assert!(right < rect.x + rect.width && right >= rect.x + rect.width - quarter);
        assert!(left > rect.x + rect.width / 2);

        let (left, _, right, _) = ink(Align::Center);
        let ink_center = (left + right) / 2;
        let box_center = rect.x + rect.width / 2;
        assert!(ink_center.abs_diff(box_center) < rect.width / 8);
    }

    #[test]
    fn centered_blocks_sit_in_the_middle() {
        let rect = pixel_rect(&Area::new(4.0, 3.0, 30.0, 12.0), 2.0);
        let ink = |vertically_centered| {
            let (page, _) = text_page("Ab", Align::Left, vertically_centered);
            ink_bounds(&bundled().rasterize(&page, 2.0).unwrap()).unwrap()
        };

        let (_, top_aligned, _, _) = ink(false);
        let (_, top, _, bottom) = ink(true);

        assert!(top > top_aligned);
        let ink_middle = (top + bottom) / 2;
        let box_middle = rect.y + rect.height / 2;
        assert!(ink_middle.abs_diff(box_middle) < rect.height / 4);
    }

    #[test]
    fn blending_follows_coverage() {
        let mut pixel = Rgba([255, 255, 255, 255]);
        blend(&mut pixel, theme::BLACK, 0.5);
        assert_eq!(pixel, Rgba([128, 128, 128, 255]));

        blend(&mut pixel, [10, 20, 30], 1.0);
        assert_eq!(pixel, Rgba([10, 20, 30, 255]));
    }
}
