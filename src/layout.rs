//! The fixed single-page layout of the report.
//!
//! The page is a stack of fixed-height bands, every variable-length text is given a size by the
//! fitting engine so that no band overflows. The result is a display list in millimetres which
//! the rasterizer turns into pixels, so every layout decision can be checked without fonts.

use crate::{
    fitting::{self, FitParameters},
    payload::ImagePayload,
    report::{ReportData, MAX_IMAGES},
    theme::{self, faded, Color, Theme},
};

/// A4 width in millimetres.
pub const PAGE_WIDTH: f32 = 210.0;
/// A4 height in millimetres.
pub const PAGE_HEIGHT: f32 = 297.0;

const PADDING_X: f32 = 12.0;
const PADDING_Y: f32 = 10.0;
const BAND_GAP: f32 = 4.0;
const ACCENT_HEIGHT: f32 = 3.0;
const HEADER_HEIGHT: f32 = 35.0;
const TITLE_HEIGHT: f32 = 25.0;
const STATS_HEIGHT: f32 = 15.0;
const FOOTER_HEIGHT: f32 = 18.0;
const SIGNATURE_HEIGHT: f32 = 35.0;
const CATEGORY_WIDTH: f32 = 60.0;

const SCHOOL_NAME: &str = "SEKOLAH SENI MALAYSIA JOHOR";
const SCHOOL_SHORT_NAME: &str = "SSEMJ";

/// A rectangle on the page, in millimetres from the top left corner.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Area {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

impl Area {
    pub const fn new(x: f32, y: f32, width: f32, height: f32) -> Self {
        Area {
            x,
            y,
            width,
            height,
        }
    }

    pub fn bottom(&self) -> f32 {
        self.y + self.height
    }

    pub fn right(&self) -> f32 {
        self.x + self.width
    }

    /// Shrinks the area by the given margins on each side.
    pub fn inset(&self, horizontal: f32, vertical: f32) -> Area {
        Area::new(
            self.x + horizontal,
            self.y + vertical,
            (self.width - 2.0 * horizontal).max(0.0),
            (self.height - 2.0 * vertical).max(0.0),
        )
    }

    pub fn contains(&self, other: &Area) -> bool {
        const TOLERANCE: f32 = 1e-3;
        other.x >= self.x - TOLERANCE
            && other.y >= self.y - TOLERANCE
            && other.right() <= self.right() + TOLERANCE
            && other.bottom() <= self.bottom() + TOLERANCE
    }

    pub fn overlaps(&self, other: &Area) -> bool {
        const TOLERANCE: f32 = 1e-3;
        self.x < other.right() - TOLERANCE
            && other.x < self.right() - TOLERANCE
            && self.y < other.bottom() - TOLERANCE
            && other.y < self.bottom() - TOLERANCE
    }
}

/// How an area is filled.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Paint {
    Solid(Color),
    /// A horizontal gradient through three stops.
    Gradient([Color; 3]),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Align {
    Left,
    Center,
    Right,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Weight {
    Regular,
    Bold,
}

/// How a picture is fitted into its area.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Fit {
    /// Fill the whole area, cropping what sticks out.
    Cover,
    /// Fit inside the area keeping the aspect ratio, anchored bottom left.
    ContainLeft,
}

/// What a piece of text on the page stands for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Slot {
    Heading,
    Year,
    Title,
    Category,
    Date,
    Time,
    Level,
    Location,
    Achievement,
    Objective,
    Impact,
    Participation,
    Organizer,
    ProviderName,
    ProviderRole,
    /// Fixed captions and decorations.
    Caption,
}

/// A run of text, wrapped on word boundaries inside its area and clipped to it.
#[derive(Debug, Clone, PartialEq)]
pub struct TextBlock {
    pub slot: Slot,
    pub area: Area,
    pub text: String,
    /// Size in points.
    pub size: f32,
    pub color: Color,
    pub align: Align,
    pub weight: Weight,
    /// Line height as a multiple of the size.
    pub line_height: f32,
    pub vertically_centered: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Element {
    Fill {
        area: Area,
        paint: Paint,
    },
    Outline {
        area: Area,
        color: Color,
        /// Width in millimetres.
        width: f32,
    },
    Text(TextBlock),
    Picture {
        area: Area,
        payload: ImagePayload,
        fit: Fit,
    },
    /// An empty photo slot.
    PhotoPlaceholder {
        area: Area,
    },
}

/// The named bands of the page, top to bottom.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Bands {
    pub header: Area,
    pub title: Area,
    pub stats: Area,
    pub body: Area,
    pub footer: Area,
    pub signature: Area,
}

impl Bands {
    /// The fixed band geometry, the body takes whatever the fixed bands leave.
    pub fn a4() -> Self {
        let content_width = PAGE_WIDTH - 2.0 * PADDING_X;
        let header = Area::new(PADDING_X, PADDING_Y + 2.0, content_width, HEADER_HEIGHT);
        let title = Area::new(PADDING_X, header.bottom() + BAND_GAP, content_width, TITLE_HEIGHT);
        let stats = Area::new(PADDING_X, title.bottom() + BAND_GAP, content_width, STATS_HEIGHT);

        let signature_top = PAGE_HEIGHT - PADDING_Y - 1.0 - SIGNATURE_HEIGHT;
        let signature = Area::new(PADDING_X, signature_top, content_width, SIGNATURE_HEIGHT);
        // The divider line sits between the footer and the signature
        let footer_top = signature_top - 3.0 - BAND_GAP - FOOTER_HEIGHT;
        let footer = Area::new(PADDING_X, footer_top, content_width, FOOTER_HEIGHT);

        let body_top = stats.bottom() + BAND_GAP;
        let body = Area::new(PADDING_X, body_top, content_width, footer_top - BAND_GAP - body_top);

        Bands {
            header,
            title,
            stats,
            body,
            footer,
            signature,
        }
    }

    pub fn all(&self) -> [Area; 6] {
        [
            self.header,
            self.title,
            self.stats,
            self.body,
            self.footer,
            self.signature,
        ]
    }
}

/// The laid out page, ready to be rasterized.
#[derive(Debug, Clone, PartialEq)]
pub struct Page {
    pub width: f32,
    pub height: f32,
    pub elements: Vec<Element>,
}

impl Page {
    /// The first text block standing for the given slot.
    pub fn text(&self, slot: Slot) -> Option<&TextBlock> {
        self.texts().find(|block| block.slot == slot)
    }

    pub fn texts(&self) -> impl Iterator<Item = &TextBlock> {
        self.elements.iter().filter_map(|element| match element {
            Element::Text(block) => Some(block),
            _ => None,
        })
    }
}

/// Collects elements while the bands are laid out.
struct PageBuilder {
    elements: Vec<Element>,
}

impl PageBuilder {
    fn fill(&mut self, area: Area, paint: Paint) {
        self.elements.push(Element::Fill { area, paint });
    }

    fn outline(&mut self, area: Area, color: Color, width: f32) {
        self.elements.push(Element::Outline { area, color, width });
    }

    #[allow(clippy::too_many_arguments)]
    fn text(
        &mut self,
        slot: Slot,
        area: Area,
        text: impl Into<String>,
        size: f32,
        color: Color,
        align: Align,
        weight: Weight,
    ) {
        self.elements.push(Element::Text(TextBlock {
            slot,
            area,
            text: text.into(),
            size,
            color,
            align,
            weight,
            line_height: 1.2,
            vertically_centered: true,
        }));
    }

    /// A text sized by the fitting engine, the fallback is shown (and fitted) when `text` is empty.
    #[allow(clippy::too_many_arguments)]
    fn fitted_text(
        &mut self,
        slot: Slot,
        area: Area,
        text: &str,
        fallback: &str,
        parameters: FitParameters,
        color: Color,
        align: Align,
    ) {
        let shown = if text.is_empty() { fallback } else { text };
        self.text(
            slot,
            area,
            shown,
            parameters.fit(shown),
            color,
            align,
            Weight::Bold,
        );
    }

    fn paragraph(&mut self, slot: Slot, area: Area, text: &str, fallback: &str) {
        let shown = if text.is_empty() { fallback } else { text };
        self.elements.push(Element::Text(TextBlock {
            slot,
            area,
            text: shown.to_string(),
            size: fitting::BODY_PARAGRAPH.fit(text),
            color: theme::GRAY_800,
            align: Align::Left,
            weight: Weight::Regular,
            line_height: 1.4,
            vertically_centered: false,
        }));
    }
}

/// Lays out the report with the theme of its category.
pub fn render(record: &ReportData) -> Page {
    let theme = Theme::for_category(record.category);
    let bands = Bands::a4();
    let mut builder = PageBuilder {
        elements: Vec::new(),
    };

    builder.fill(
        Area::new(0.0, 0.0, PAGE_WIDTH, PAGE_HEIGHT),
        Paint::Solid(theme::WHITE),
    );
    builder.fill(
        Area::new(0.0, 0.0, PAGE_WIDTH, ACCENT_HEIGHT),
        Paint::Gradient(theme.gradient),
    );

    lay_out_header(&mut builder, bands.header, record, theme);
    lay_out_title(&mut builder, bands.title, record, theme);
    lay_out_stats(&mut builder, bands.stats, record, theme);
    lay_out_body(&mut builder, bands.body, record, theme);
    lay_out_footer(&mut builder, bands.footer, record, theme);

    let divider = Area::new(PADDING_X, bands.footer.bottom() + BAND_GAP, bands.footer.width, 0.35);
    builder.fill(divider, Paint::Solid(faded(theme.gradient[1], 0.2)));

    lay_out_signature(&mut builder, bands.signature, record, theme);

    Page {
        width: PAGE_WIDTH,
        height: PAGE_HEIGHT,
        elements: builder.elements,
    }
}

fn lay_out_header(builder: &mut PageBuilder, band: Area, record: &ReportData, theme: &Theme) {
    let heading = Area::new(band.x, band.y + 8.0, 130.0, 9.0);
    builder.text(
        Slot::Heading,
        heading,
        SCHOOL_NAME,
        19.0,
        theme::GRAY_800,
        Align::Left,
        Weight::Bold,
    );
    builder.text(
        Slot::Caption,
        Area::new(band.x, heading.bottom() + 1.0, 130.0, 7.0),
        "ONE PAGE REPORT",
        16.0,
        theme.text,
        Align::Left,
        Weight::Bold,
    );
    builder.fill(
        Area::new(band.x, heading.bottom() + 9.0, 25.0, 1.0),
        Paint::Gradient(theme.gradient),
    );

    let badge = Area::new(band.right() - 32.0, band.y + 6.0, 32.0, 22.0);
    builder.fill(badge, Paint::Gradient(theme.gradient));
    builder.text(
        Slot::Caption,
        Area::new(badge.x, badge.y + 2.0, badge.width, 5.0),
        "TAHUN",
        8.0,
        theme::WHITE,
        Align::Center,
        Weight::Bold,
    );
    let year = if record.year.trim().is_empty() {
        "2026"
    } else {
        record.year.as_str()
    };
    builder.text(
        Slot::Year,
        Area::new(badge.x, badge.y + 8.0, badge.width, 12.0),
        year,
        22.0,
        theme::WHITE,
        Align::Center,
        Weight::Bold,
    );
}

fn lay_out_title(builder: &mut PageBuilder, band: Area, record: &ReportData, theme: &Theme) {
    let title_box = Area::new(band.x, band.y, band.width - CATEGORY_WIDTH - 3.0, band.height);
    builder.outline(title_box, faded(theme.border, 0.4), 0.5);
    builder.text(
        Slot::Caption,
        Area::new(title_box.x + 4.0, title_box.y + 1.5, 80.0, 3.5),
        "TAJUK PROGRAM / AKTIVITI",
        7.0,
        theme::GRAY_400,
        Align::Left,
        Weight::Bold,
    );
    builder.fitted_text(
        Slot::Title,
        title_box.inset(4.0, 5.0),
        &record.title.to_uppercase(),
        "NAMA PROGRAM",
        fitting::TITLE,
        theme::GRAY_900,
        Align::Left,
    );

    let category_box = Area::new(band.right() - CATEGORY_WIDTH, band.y, CATEGORY_WIDTH, band.height);
    builder.fill(category_box, Paint::Gradient(theme.gradient));
    builder.text(
        Slot::Caption,
        Area::new(category_box.x, category_box.y + 4.0, CATEGORY_WIDTH, 4.0),
        "BIDANG",
        7.0,
        theme::WHITE,
        Align::Center,
        Weight::Bold,
    );
    builder.text(
        Slot::Category,
        Area::new(category_box.x, category_box.y + 9.0, CATEGORY_WIDTH, 12.0),
        record.category.label(),
        13.0,
        theme::WHITE,
        Align::Center,
        Weight::Bold,
    );
}

/// The five values of the statistics row, in order.
pub fn stat_values(record: &ReportData) -> [(Slot, &'static str, String); 5] {
    let location = if record.location.is_empty() {
        "-".to_string()
    } else {
        record.location.clone()
    };
    [
        (Slot::Date, "TARIKH", record.dates.display()),
        (Slot::Time, "MASA", record.time.display()),
        (Slot::Level, "PERINGKAT", record.level.label().to_uppercase()),
        (Slot::Location, "TEMPAT", location.to_uppercase()),
        (
            Slot::Achievement,
            "PENCAPAIAN",
            record.achievement.printed_value().to_uppercase(),
        ),
    ]
}

fn lay_out_stats(builder: &mut PageBuilder, band: Area, record: &ReportData, theme: &Theme) {
    const GAP: f32 = 2.0;
    let cell_width = (band.width - 4.0 * GAP) / 5.0;

    for (index, (slot, label, value)) in stat_values(record).into_iter().enumerate() {
        let cell = Area::new(
            band.x + index as f32 * (cell_width + GAP),
            band.y,
            cell_width,
            band.height,
        );
        builder.fill(cell, Paint::Solid(theme::GRAY_50));
        builder.outline(cell, faded(theme.border, 0.2), 0.35);
        builder.text(
            Slot::Caption,
            Area::new(cell.x + 1.5, cell.y + 1.5, cell.width - 3.0, 3.0),
            label,
            6.0,
            theme.text,
            Align::Left,
            Weight::Bold,
        );
        builder.fitted_text(
            slot,
            Area::new(cell.x + 1.5, cell.y + 5.0, cell.width - 3.0, cell.height - 6.5),
            &value,
            "-",
            fitting::STAT_CHIP,
            theme::GRAY_800,
            Align::Left,
        );
    }
}

/// The areas of the photo slots, top to bottom.
pub fn photo_slots(body: Area) -> [Area; MAX_IMAGES] {
    const GAP: f32 = 2.0;
    let (_, photos) = body_columns(body);
    let slot_height = (photos.height - GAP * (MAX_IMAGES as f32 - 1.0)) / MAX_IMAGES as f32;

    std::array::from_fn(|index| {
        Area::new(
            photos.x,
            photos.y + index as f32 * (slot_height + GAP),
            photos.width,
            slot_height,
        )
    })
}

/// Splits the body into the text column (eight twelfths) and the photo column (four twelfths).
fn body_columns(body: Area) -> (Area, Area) {
    const GAP: f32 = 4.0;
    let column = (body.width - 11.0 * GAP) / 12.0;
    let text_width = 8.0 * column + 7.0 * GAP;
    let text_column = Area::new(body.x, body.y, text_width, body.height);
    let photo_column = Area::new(
        body.x + text_width + GAP,
        body.y,
        body.width - text_width - GAP,
        body.height,
    );
    (text_column, photo_column)
}

fn lay_out_body(builder: &mut PageBuilder, band: Area, record: &ReportData, theme: &Theme) {
    let (text_column, _) = body_columns(band);
    let box_height = (text_column.height - BAND_GAP) / 2.0;
    let sections = [
        (
            Slot::Objective,
            "OBJEKTIF PROGRAM",
            record.objective.as_str(),
            "Tiada objektif dinyatakan.",
        ),
        (
            Slot::Impact,
            "IMPAK & RUMUSAN",
            record.impact.as_str(),
            "Tiada impak atau rumusan dinyatakan.",
        ),
    ];

    for (index, (slot, heading, text, fallback)) in sections.into_iter().enumerate() {
        let section = Area::new(
            text_column.x,
            text_column.y + index as f32 * (box_height + BAND_GAP),
            text_column.width,
            box_height,
        );
        builder.outline(section, faded(theme.border, 0.3), 0.5);
        builder.fill(
            Area::new(section.x + 6.0, section.y + 6.0, 1.0, 4.0),
            Paint::Gradient(theme.gradient),
        );
        builder.text(
            Slot::Caption,
            Area::new(section.x + 9.0, section.y + 6.0, section.width - 15.0, 4.5),
            heading,
            10.0,
            theme.text,
            Align::Left,
            Weight::Bold,
        );
        let paragraph = Area::new(
            section.x + 6.0,
            section.y + 12.5,
            section.width - 12.0,
            section.height - 18.5,
        );
        builder.paragraph(slot, paragraph, text, fallback);
    }

    for (index, area) in photo_slots(band).into_iter().enumerate() {
        builder.fill(area, Paint::Solid(theme::GRAY_100));
        match record.images().get(index) {
            Some(payload) => builder.elements.push(Element::Picture {
                area,
                payload: payload.clone(),
                fit: Fit::Cover,
            }),
            None => builder.elements.push(Element::PhotoPlaceholder { area }),
        }
        builder.outline(area, theme::GRAY_200, 0.35);
    }
}

fn lay_out_footer(builder: &mut PageBuilder, band: Area, record: &ReportData, theme: &Theme) {
    let half_width = (band.width - BAND_GAP) / 2.0;
    let participation = Area::new(band.x, band.y, half_width, band.height);
    let organizer = Area::new(band.x + half_width + BAND_GAP, band.y, half_width, band.height);

    builder.fill(participation, Paint::Gradient(theme.gradient));
    builder.text(
        Slot::Caption,
        Area::new(participation.x + 5.0, participation.y + 2.0, half_width - 10.0, 3.5),
        "PENGLIBATAN UTAMA",
        6.5,
        theme::WHITE,
        Align::Left,
        Weight::Bold,
    );
    builder.fitted_text(
        Slot::Participation,
        Area::new(participation.x + 5.0, participation.y + 6.0, half_width - 10.0, band.height - 8.0),
        &record.participation.to_uppercase(),
        "-",
        fitting::PARTICIPATION,
        theme::WHITE,
        Align::Left,
    );

    builder.outline(organizer, faded(theme.border, 0.4), 0.5);
    builder.text(
        Slot::Caption,
        Area::new(organizer.x + 5.0, organizer.y + 2.0, half_width - 10.0, 3.5),
        "ANJURAN / UNIT",
        6.5,
        theme.text,
        Align::Right,
        Weight::Bold,
    );
    builder.fitted_text(
        Slot::Organizer,
        Area::new(organizer.x + 5.0, organizer.y + 6.0, half_width - 10.0, band.height - 8.0),
        &record.organizer.to_uppercase(),
        "-",
        fitting::ORGANIZER,
        theme.text,
        Align::Right,
    );
}

/// The printed provider line, e.g. `GURU — BAHASA MELAYU SSEMJ`.
pub fn provider_line(record: &ReportData) -> String {
    let role = record.provider.role().label().to_uppercase();
    format!(
        "{} — {} {}",
        role,
        record.provider.sub_category().to_uppercase(),
        SCHOOL_SHORT_NAME
    )
}

fn lay_out_signature(builder: &mut PageBuilder, band: Area, record: &ReportData, theme: &Theme) {
    builder.text(
        Slot::Caption,
        Area::new(band.x, band.y, 80.0, 4.0),
        "DISEDIAKAN OLEH;",
        8.0,
        theme::GRAY_400,
        Align::Left,
        Weight::Bold,
    );

    let signature_line = Area::new(band.x, band.y + 5.0, 52.0, 14.0);
    if !record.signature.is_empty() {
        // The signature spills slightly above its line, like ink over a printed rule
        let ink = Area::new(
            signature_line.x,
            signature_line.y - 3.5,
            signature_line.width,
            signature_line.height + 3.5,
        );
        builder.elements.push(Element::Picture {
            area: ink,
            payload: record.signature.clone(),
            fit: Fit::ContainLeft,
        });
    }
    builder.fill(
        Area::new(signature_line.x, signature_line.bottom() - 0.35, signature_line.width, 0.35),
        Paint::Solid(theme::GRAY_800),
    );

    let name = if record.provider.name.is_empty() {
        "NAMA PENYEDIA".to_string()
    } else {
        record.provider.name.to_uppercase()
    };
    builder.text(
        Slot::ProviderName,
        Area::new(band.x, signature_line.bottom() + 2.0, band.width * 0.65, 6.0),
        name,
        13.0,
        theme::GRAY_900,
        Align::Left,
        Weight::Bold,
    );
    builder.text(
        Slot::ProviderRole,
        Area::new(band.x, signature_line.bottom() + 8.5, band.width * 0.65, 4.5),
        provider_line(record),
        8.5,
        theme.text,
        Align::Left,
        Weight::Bold,
    );

    let system_badge = Area::new(band.right() - 48.0, band.bottom() - 17.0, 48.0, 9.0);
    builder.fill(system_badge, Paint::Gradient(theme.gradient));
    builder.text(
        Slot::Caption,
        system_badge,
        "SSEMJ OPR SYSTEM",
        9.0,
        theme::WHITE,
        Align::Center,
        Weight::Bold,
    );
    builder.text(
        Slot::Caption,
        Area::new(band.right() - 60.0, band.bottom() - 6.0, 60.0, 4.0),
        "COPYRIGHT@DZURRI@2026",
        6.5,
        theme::GRAY_400,
        Align::Right,
        Weight::Bold,
    );
}

#[cfg(test)]
mod tests {
    use similar_asserts::assert_eq;
    use time::macros::date;

    use super::*;
    use crate::report::{Achievement, Category, FieldUpdate, Placement, ProgramTime, Role};

    fn sized(page: &Page, slot: Slot) -> (String, f32) {
        let block = page.text(slot).unwrap();
        (block.text.clone(), block.size)
    }

    #[test]
    fn bands_stack_inside_the_page_without_overlapping() {
        let bands = Bands::a4().all();
        let page = Area::new(0.0, 0.0, PAGE_WIDTH, PAGE_HEIGHT);

        for (index, band) in bands.iter().enumerate() {
            assert!(page.contains(band), "{band:?}");
            assert!(band.height > 0.0);
            for other in &bands[index + 1..] {
                assert!(!band.overlaps(other), "{band:?} overlaps {other:?}");
                assert!(band.bottom() <= other.y);
            }
        }
    }

    #[test]
    fn every_element_stays_on_the_page() {
        let page = render(&ReportData::default());
        let sheet = Area::new(0.0, 0.0, PAGE_WIDTH, PAGE_HEIGHT);

        for element in &page.elements {
            let area = match element {
                Element::Fill { area, .. }
                | Element::Outline { area, .. }
                | Element::Picture { area, .. }
                | Element::PhotoPlaceholder { area } => area,
                Element::Text(block) => &block.area,
            };
            assert!(sheet.contains(area), "{element:?}");
        }
    }

    #[test]
    fn placeholders_fill_empty_fields() {
        let page = render(&ReportData::default());

        assert_eq!(sized(&page, Slot::Title), ("NAMA PROGRAM".to_string(), 13.0));
        assert_eq!(page.text(Slot::Date).unwrap().text, "-");
        assert_eq!(page.text(Slot::Location).unwrap().text, "-");
        assert_eq!(page.text(Slot::Participation).unwrap().text, "-");
        assert_eq!(page.text(Slot::ProviderName).unwrap().text, "NAMA PENYEDIA");
        assert_eq!(
            page.text(Slot::Objective).unwrap().text,
            "Tiada objektif dinyatakan."
        );
        assert_eq!(page.text(Slot::Objective).unwrap().size, 10.0);
    }

    #[test]
    fn long_texts_shrink_per_band() {
        let record = ReportData::default()
            .apply(FieldUpdate::Title("Program Kecemerlangan ".repeat(3)))
            .unwrap()
            .apply(FieldUpdate::Objective("Memupuk minat murid. ".repeat(20)))
            .unwrap()
            .apply(FieldUpdate::Participation("Seluruh warga sekolah".into()))
            .unwrap()
            .apply(FieldUpdate::Organizer("Unit Kokurikulum dan Kelab Seni".into()))
            .unwrap();
        let page = render(&record);

        let title = page.text(Slot::Title).unwrap();
        assert_eq!(title.size, fitting::TITLE.fit(&record.title.to_uppercase()));
        assert!(title.size < 13.0);
        assert!(page.text(Slot::Objective).unwrap().size < 10.0);
        assert_eq!(page.text(Slot::Participation).unwrap().size, 10.0);
        assert!(page.text(Slot::Organizer).unwrap().size < 10.0);
    }

    #[test]
    fn statistics_row_values() {
        let record = ReportData::default()
            .apply(FieldUpdate::StartDate(Some(date!(2026 - 03 - 05))))
            .unwrap()
            .apply(FieldUpdate::EndDate(Some(date!(2026 - 03 - 09))))
            .unwrap()
            .apply(FieldUpdate::Time(ProgramTime::AllDay))
            .unwrap()
            .apply(FieldUpdate::Location("Dewan Besar".into()))
            .unwrap()
            .apply(FieldUpdate::Achievement(Achievement::Ranked {
                placement: Placement::Johan,
            }))
            .unwrap();
        let page = render(&record);

        // The end date is still in the record, but the range is off
        assert_eq!(page.text(Slot::Date).unwrap().text, "05/03/2026");
        assert_eq!(page.text(Slot::Time).unwrap().text, "SEPANJANG HARI");
        assert_eq!(page.text(Slot::Level).unwrap().text, "SEKOLAH");
        assert_eq!(page.text(Slot::Location).unwrap().text, "DEWAN BESAR");
        assert_eq!(page.text(Slot::Achievement).unwrap().text, "JOHAN");

        let range = record.apply(FieldUpdate::DateRange(true)).unwrap();
        let date = page_text(&render(&range), Slot::Date);
        assert_eq!(date.text, "05/03/2026 – 09/03/2026");
        assert_eq!(date.size, fitting::STAT_CHIP.fit("05/03/2026 – 09/03/2026"));
    }

    fn page_text(page: &Page, slot: Slot) -> TextBlock {
        page.text(slot).unwrap().clone()
    }

    #[test]
    fn special_award_prints_its_detail() {
        let record = ReportData::default()
            .apply(FieldUpdate::Achievement(Achievement::SpecialAward {
                detail: "Koreografi Terbaik".into(),
            }))
            .unwrap();

        assert_eq!(
            render(&record).text(Slot::Achievement).unwrap().text,
            "KOREOGRAFI TERBAIK"
        );
    }

    #[test]
    fn photo_slots_never_change_the_layout() {
        let png = {
            let mut bytes = Vec::new();
            image::RgbaImage::new(2, 2)
                .write_to(&mut std::io::Cursor::new(&mut bytes), image::ImageFormat::Png)
                .unwrap();
            bytes
        };
        let (with_two, _) = ReportData::default().with_images_added(&vec![png; 2]);

        let count = |page: &Page| {
            let pictures = page
                .elements
                .iter()
                .filter(|element| matches!(element, Element::Picture { fit: Fit::Cover, .. }))
                .count();
            let placeholders = page
                .elements
                .iter()
                .filter(|element| matches!(element, Element::PhotoPlaceholder { .. }))
                .count();
            (pictures, placeholders)
        };

        assert_eq!(count(&render(&ReportData::default())), (0, 4));
        assert_eq!(count(&render(&with_two)), (2, 2));
    }

    #[test]
    fn provider_line_joins_role_and_sub_category() {
        let record = ReportData::default()
            .apply(FieldUpdate::Role(Role::Guru))
            .unwrap()
            .apply(FieldUpdate::SubCategory("Bahasa Melayu".into()))
            .unwrap();
        assert_eq!(provider_line(&record), "GURU — BAHASA MELAYU SSEMJ");

        let record = record.apply(FieldUpdate::Role(Role::Pengetua)).unwrap();
        assert_eq!(provider_line(&record), "PENGETUA — PENTADBIRAN SSEMJ");

        // Every role carries a sub-category, so the line always names one
        for role in Role::ALL {
            let record = ReportData::default().apply(FieldUpdate::Role(role)).unwrap();
            let expected_sub_category = role.sub_categories()[0].to_uppercase();
            assert!(provider_line(&record).contains(&format!(" — {} ", expected_sub_category)));
        }
    }

    #[test]
    fn category_theme_colors_reach_the_page() {
        for category in Category::ALL {
            let theme = Theme::for_category(category);
            let page = render(&ReportData::default().apply(FieldUpdate::Category(category)).unwrap());

            assert!(page.texts().any(|block| block.color == theme.text));
            assert!(page.elements.iter().any(|element| matches!(
                element,
                Element::Outline { color, .. } if *color == faded(theme.border, 0.4)
            )));
        }
    }

    #[test]
    fn blank_year_falls_back() {
        let record = ReportData::default()
            .apply(FieldUpdate::Year(" ".into()))
            .unwrap();
        assert_eq!(render(&record).text(Slot::Year).unwrap().text, "2026");
    }
}
