use std::path::Path;

use serde::{Deserialize, Deserializer, Serialize};
use time::{macros::format_description, Date, OffsetDateTime};

use crate::{error::ContextError, payload::ImagePayload};

/// The objective and impact paragraphs are capped at this many characters.
pub const MAX_CHAR_COUNT: usize = 500;
/// The number of photo slots of the report.
pub const MAX_IMAGES: usize = 4;

time::serde::format_description!(iso_date, Date, "[year]-[month]-[day]");

/// The reporting domain of the program, it selects the theme of the page.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Category {
    Pentadbiran,
    Hem,
    #[default]
    Kurikulum,
    Kokurikulum,
    Kesenian,
}

impl Category {
    pub const ALL: [Category; 5] = [
        Category::Pentadbiran,
        Category::Hem,
        Category::Kurikulum,
        Category::Kokurikulum,
        Category::Kesenian,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            Category::Pentadbiran => "PENTADBIRAN",
            Category::Hem => "HEM",
            Category::Kurikulum => "KURIKULUM",
            Category::Kokurikulum => "KOKURIKULUM",
            Category::Kesenian => "KESENIAN",
        }
    }
}

/// The level at which the program took place.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Level {
    #[default]
    Sekolah,
    Daerah,
    Negeri,
    Kebangsaan,
    Antarabangsa,
}

impl Level {
    pub fn label(&self) -> &'static str {
        match self {
            Level::Sekolah => "Sekolah",
            Level::Daerah => "Daerah",
            Level::Negeri => "Negeri",
            Level::Kebangsaan => "Kebangsaan",
            Level::Antarabangsa => "Antarabangsa",
        }
    }
}

/// A ranked result of a competition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Placement {
    Johan,
    #[serde(rename = "Naib Johan")]
    NaibJohan,
    Ketiga,
    Keempat,
    Kelima,
}

impl Placement {
    pub fn label(&self) -> &'static str {
        match self {
            Placement::Johan => "Johan",
            Placement::NaibJohan => "Naib Johan",
            Placement::Ketiga => "Ketiga",
            Placement::Keempat => "Keempat",
            Placement::Kelima => "Kelima",
        }
    }
}

/// What the program achieved. Only the special award and the catch-all variant carry a
/// free-text detail, which is what gets printed in place of their label.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum Achievement {
    Ranked {
        placement: Placement,
    },
    SpecialAward {
        detail: String,
    },
    Other {
        detail: String,
    },
    #[default]
    NotApplicable,
}

impl Achievement {
    pub fn label(&self) -> &'static str {
        match self {
            Achievement::Ranked { placement } => placement.label(),
            Achievement::SpecialAward { .. } => "Anugerah Khas",
            Achievement::Other { .. } => "Lain-lain",
            Achievement::NotApplicable => "Tidak Berkenaan",
        }
    }

    /// The text shown in the statistics row.
    pub fn printed_value(&self) -> &str {
        match self {
            Achievement::SpecialAward { detail } | Achievement::Other { detail } => detail,
            other => other.label(),
        }
    }
}

/// The position of the staff member preparing the report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Role {
    Pengetua,
    #[serde(rename = "Penolong Kanan")]
    PenolongKanan,
    #[serde(rename = "GKMP")]
    Gkmp,
    #[default]
    Guru,
    Jurulatih,
}

impl Role {
    pub const ALL: [Role; 5] = [
        Role::Pengetua,
        Role::PenolongKanan,
        Role::Gkmp,
        Role::Guru,
        Role::Jurulatih,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            Role::Pengetua => "Pengetua",
            Role::PenolongKanan => "Penolong Kanan",
            Role::Gkmp => "GKMP",
            Role::Guru => "Guru",
            Role::Jurulatih => "Jurulatih",
        }
    }

    /// The sub-categories a provider with this role may pick from, never empty.
    pub fn sub_categories(&self) -> &'static [&'static str] {
        match self {
            Role::Pengetua | Role::PenolongKanan => &["Pentadbiran"],
            Role::Gkmp => &["Sains Kemasyarakatan", "Sains dan Matematik", "Bahasa"],
            Role::Guru => &[
                "Sains",
                "Matematik",
                "Bahasa Inggeris",
                "Bahasa Melayu",
                "Pendidikan Jasmani",
                "Pendidikan Islam",
                "Pendidikan Moral",
            ],
            Role::Jurulatih => &["Seni Muzik", "Seni Visual", "Seni Teater", "Seni Tari"],
        }
    }

    fn first_sub_category(&self) -> &'static str {
        self.sub_categories().first().copied().unwrap_or_default()
    }
}

/// The person preparing the report. The sub-category is always one of the role's options.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", try_from = "UncheckedProvider")]
pub struct Provider {
    pub name: String,
    role: Role,
    sub_category: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct UncheckedProvider {
    #[serde(default)]
    name: String,
    #[serde(default)]
    role: Role,
    sub_category: Option<String>,
}

impl TryFrom<UncheckedProvider> for Provider {
    type Error = ContextError;

    fn try_from(unchecked: UncheckedProvider) -> Result<Self, Self::Error> {
        let mut provider = Provider::new(unchecked.name, unchecked.role);
        if let Some(sub_category) = unchecked.sub_category {
            provider.set_sub_category(&sub_category)?;
        }
        Ok(provider)
    }
}

impl Default for Provider {
    fn default() -> Self {
        Provider::new(String::new(), Role::default())
    }
}

impl Provider {
    /// Creates a provider with the first sub-category of its role.
    pub fn new(name: String, role: Role) -> Self {
        Provider {
            name,
            role,
            sub_category: role.first_sub_category().to_string(),
        }
    }

    pub fn role(&self) -> Role {
        self.role
    }

    pub fn sub_category(&self) -> &str {
        &self.sub_category
    }

    /// Changes the role, which resets the sub-category to the first option of the new role.
    pub fn set_role(&mut self, role: Role) {
        self.role = role;
        self.sub_category = role.first_sub_category().to_string();
    }

    pub fn set_sub_category(&mut self, sub_category: &str) -> Result<(), ContextError> {
        if !self.role.sub_categories().contains(&sub_category) {
            return Err(ContextError::with_context(format!(
                "The sub-category {:?} is not available for the role {:?}",
                sub_category,
                self.role.label()
            )));
        }
        self.sub_category = sub_category.to_string();
        Ok(())
    }
}

/// The day, or days, of the program. The end date only counts while `is_range` is set.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProgramDates {
    #[serde(default)]
    pub is_range: bool,
    #[serde(default, with = "iso_date::option")]
    pub start: Option<Date>,
    #[serde(default, with = "iso_date::option")]
    pub end: Option<Date>,
}

impl ProgramDates {
    /// The end date as far as the report is concerned, unset whenever the range flag is off.
    pub fn effective_end(&self) -> Option<Date> {
        if self.is_range {
            self.end
        } else {
            None
        }
    }

    /// Formats the dates for the statistics row, e.g. `05/03/2026 – 07/03/2026`.
    pub fn display(&self) -> String {
        if self.is_range {
            format!(
                "{} – {}",
                format_date(self.start),
                format_date(self.effective_end())
            )
        } else {
            format_date(self.start)
        }
    }
}

/// Formats a date as `DD/MM/YYYY`, unset dates are shown as a dash.
pub fn format_date(date: Option<Date>) -> String {
    match date {
        Some(date) => date
            .format(format_description!("[day]/[month]/[year]"))
            .unwrap_or_else(|_| "-".into()),
        None => "-".into(),
    }
}

/// Parses the `YYYY-MM-DD` value of a date input, an empty input means no date.
pub fn parse_iso_date(input: &str) -> Result<Option<Date>, ContextError> {
    let input = input.trim();
    if input.is_empty() {
        return Ok(None);
    }

    Date::parse(input, format_description!("[year]-[month]-[day]"))
        .map(Some)
        .map_err(|error| ContextError::with_error(format!("Invalid date {:?}", input), &error))
}

/// The time of the program.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum ProgramTime {
    Range { start: String, end: String },
    AllDay,
    WholeProgram,
}

impl Default for ProgramTime {
    fn default() -> Self {
        ProgramTime::Range {
            start: String::new(),
            end: String::new(),
        }
    }
}

impl ProgramTime {
    pub fn display(&self) -> String {
        match self {
            ProgramTime::Range { start, end } => format!("{} - {}", start, end),
            ProgramTime::AllDay => "SEPANJANG HARI".into(),
            ProgramTime::WholeProgram => "SEPANJANG PROGRAM".into(),
        }
    }
}

/// Everything the user enters for one report.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportData {
    #[serde(default)]
    pub category: Category,
    #[serde(default)]
    pub level: Level,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub location: String,
    #[serde(default)]
    pub organizer: String,
    #[serde(default)]
    pub dates: ProgramDates,
    #[serde(default)]
    pub time: ProgramTime,
    #[serde(default, deserialize_with = "deserialize_capped_text")]
    pub objective: String,
    #[serde(default, deserialize_with = "deserialize_capped_text")]
    pub impact: String,
    #[serde(default)]
    pub participation: String,
    #[serde(default)]
    pub achievement: Achievement,
    #[serde(default)]
    pub provider: Provider,
    #[serde(default)]
    pub signature: ImagePayload,
    #[serde(default, deserialize_with = "deserialize_images")]
    images: Vec<ImagePayload>,
    #[serde(default = "current_year")]
    pub year: String,
}

fn current_year() -> String {
    OffsetDateTime::now_utc().year().to_string()
}

fn deserialize_capped_text<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
    let text = String::deserialize(deserializer)?;
    Ok(truncate_chars(&text, MAX_CHAR_COUNT))
}

fn deserialize_images<'de, D: Deserializer<'de>>(
    deserializer: D,
) -> Result<Vec<ImagePayload>, D::Error> {
    let images = Vec::<ImagePayload>::deserialize(deserializer)?;
    if images.len() > MAX_IMAGES {
        return Err(serde::de::Error::custom(format!(
            "a report holds at most {} images, found {}",
            MAX_IMAGES,
            images.len()
        )));
    }
    Ok(images)
}

/// Keeps at most `limit` characters of `text`.
pub fn truncate_chars(text: &str, limit: usize) -> String {
    text.chars().take(limit).collect()
}

impl Default for ReportData {
    fn default() -> Self {
        ReportData {
            category: Category::default(),
            level: Level::default(),
            title: String::new(),
            location: String::new(),
            organizer: String::new(),
            dates: ProgramDates::default(),
            time: ProgramTime::default(),
            objective: String::new(),
            impact: String::new(),
            participation: String::new(),
            achievement: Achievement::default(),
            provider: Provider::default(),
            signature: ImagePayload::empty(),
            images: Vec::new(),
            year: current_year(),
        }
    }
}

/// A single edit of the record, as produced by one input event of the form.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldUpdate {
    Category(Category),
    Level(Level),
    Title(String),
    Location(String),
    Organizer(String),
    DateRange(bool),
    StartDate(Option<Date>),
    EndDate(Option<Date>),
    Time(ProgramTime),
    Objective(String),
    Impact(String),
    Participation(String),
    Achievement(Achievement),
    ProviderName(String),
    Role(Role),
    SubCategory(String),
    Signature(ImagePayload),
    Year(String),
}

/// How many of the offered files were stored by an image intake.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct IntakeSummary {
    pub accepted: usize,
    /// Files beyond the remaining capacity.
    pub dropped: usize,
    /// Files within the capacity that could not be recognized as images.
    pub rejected: usize,
}

impl ReportData {
    pub fn images(&self) -> &[ImagePayload] {
        &self.images
    }

    /// Returns a new record with the update applied, the current one is left untouched.
    pub fn apply(&self, update: FieldUpdate) -> Result<ReportData, ContextError> {
        let mut next = self.clone();
        match update {
            FieldUpdate::Category(category) => next.category = category,
            FieldUpdate::Level(level) => next.level = level,
            FieldUpdate::Title(title) => next.title = title,
            FieldUpdate::Location(location) => next.location = location,
            FieldUpdate::Organizer(organizer) => next.organizer = organizer,
            FieldUpdate::DateRange(is_range) => next.dates.is_range = is_range,
            FieldUpdate::StartDate(start) => next.dates.start = start,
            FieldUpdate::EndDate(end) => next.dates.end = end,
            FieldUpdate::Time(time) => next.time = time,
            FieldUpdate::Objective(objective) => {
                next.objective = truncate_chars(&objective, MAX_CHAR_COUNT)
            }
            FieldUpdate::Impact(impact) => next.impact = truncate_chars(&impact, MAX_CHAR_COUNT),
            FieldUpdate::Participation(participation) => next.participation = participation,
            FieldUpdate::Achievement(achievement) => next.achievement = achievement,
            FieldUpdate::ProviderName(name) => next.provider.name = name,
            FieldUpdate::Role(role) => next.provider.set_role(role),
            FieldUpdate::SubCategory(sub_category) => {
                next.provider.set_sub_category(&sub_category)?
            }
            FieldUpdate::Signature(signature) => next.signature = signature,
            FieldUpdate::Year(year) => next.year = year,
        }

        Ok(next)
    }

    /// Returns a new record with the given image files appended, as far as the free slots allow.
    /// Files past the remaining capacity are dropped without being looked at.
    pub fn with_images_added(&self, files: &[Vec<u8>]) -> (ReportData, IntakeSummary) {
        let mut next = self.clone();
        let remaining_capacity = MAX_IMAGES.saturating_sub(next.images.len());
        let mut summary = IntakeSummary {
            dropped: files.len().saturating_sub(remaining_capacity),
            ..IntakeSummary::default()
        };

        for file in files.iter().take(remaining_capacity) {
            match ImagePayload::from_file_bytes(file) {
                Ok(payload) => {
                    next.images.push(payload);
                    summary.accepted += 1;
                }
                Err(error) => {
                    log::warn!("Skipping an uploaded file: {}", error);
                    summary.rejected += 1;
                }
            }
        }
        if summary.dropped > 0 {
            log::warn!(
                "Dropped {} image(s), the report holds at most {}",
                summary.dropped,
                MAX_IMAGES
            );
        }

        (next, summary)
    }

    /// Returns a new record without the image at `index`, an out of range index changes nothing.
    pub fn without_image(&self, index: usize) -> ReportData {
        let mut next = self.clone();
        if index < next.images.len() {
            next.images.remove(index);
        }
        next
    }
}

impl ReportData {
    /// Reads a record saved as JSON.
    pub fn from_path(report_file_path: &Path) -> Result<Self, ContextError> {
        let report_file_contents = std::fs::read_to_string(report_file_path).map_err(|error| {
            ContextError::with_error(
                format!("Failed to read the report file {:?}", report_file_path),
                &error,
            )
        })?;
        serde_json::from_str(&report_file_contents).map_err(|error| {
            ContextError::with_error(
                format!("Failed to parse the report file {:?}", report_file_path),
                &error,
            )
        })
    }
}
