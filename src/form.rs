//! The form behind the report: the current record, the edits applied to it and the
//! drafting actions with their busy flags.
//!
//! The record is kept as an immutable snapshot which is replaced on every edit, so that
//! a reader (the exporter, a drafting request) keeps a consistent view while edits go on.

use std::sync::{Arc, PoisonError, RwLock};

use crate::{
    assist::{Assistant, Draft, TextGenerator},
    error::ContextError,
    export::BusyFlag,
    report::{truncate_chars, FieldUpdate, IntakeSummary, ReportData, MAX_CHAR_COUNT},
};

/// Shown when drafting is requested before a title is entered.
pub const TITLE_REQUIRED_NOTICE: &str = "Sila isi Tajuk Program dahulu!";

/// How a drafting request ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AssistOutcome {
    /// The text now stored in the drafted field.
    Drafted(String),
    /// Nothing was requested, the notice tells the user why.
    Blocked(&'static str),
    /// The same draft is already being generated.
    Busy,
}

#[derive(Debug, Default)]
pub struct ReportForm {
    record: RwLock<Arc<ReportData>>,
    drafting_objective: BusyFlag,
    drafting_impact: BusyFlag,
}

impl ReportForm {
    pub fn new(record: ReportData) -> Self {
        ReportForm {
            record: RwLock::new(Arc::new(record)),
            drafting_objective: BusyFlag::new(),
            drafting_impact: BusyFlag::new(),
        }
    }

    /// The current record.
    pub fn snapshot(&self) -> Arc<ReportData> {
        self.record
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Applies an edit, the record is left as it was when the edit is refused.
    pub fn update(&self, update: FieldUpdate) -> Result<Arc<ReportData>, ContextError> {
        self.replace(|record| record.apply(update))
    }

    /// Stores as many of the uploaded files as the free photo slots allow.
    pub fn add_images(&self, files: &[Vec<u8>]) -> IntakeSummary {
        let mut summary = IntakeSummary::default();
        self.replace_with(|record| {
            let (next, intake) = record.with_images_added(files);
            summary = intake;
            next
        });
        summary
    }

    pub fn remove_image(&self, index: usize) -> Arc<ReportData> {
        self.replace_with(|record| record.without_image(index))
    }

    /// Starts over with an empty record.
    pub fn reset(&self) -> Arc<ReportData> {
        log::info!("The report was reset");
        self.replace_with(|_| ReportData::default())
    }

    pub fn is_drafting(&self, draft: Draft) -> bool {
        self.busy_flag(draft).is_raised()
    }

    pub fn generate_objective<G: TextGenerator>(&self, assistant: &Assistant<G>) -> AssistOutcome {
        self.generate(Draft::Objectives, assistant)
    }

    pub fn generate_impact<G: TextGenerator>(&self, assistant: &Assistant<G>) -> AssistOutcome {
        self.generate(Draft::Impact, assistant)
    }

    /// Drafts a paragraph from the current title and writes it into the latest record, so
    /// that edits made while the draft was generated are kept.
    fn generate<G: TextGenerator>(&self, draft: Draft, assistant: &Assistant<G>) -> AssistOutcome {
        let title = self.snapshot().title.clone();
        if title.is_empty() {
            return AssistOutcome::Blocked(TITLE_REQUIRED_NOTICE);
        }
        let Some(_guard) = self.busy_flag(draft).try_acquire() else {
            return AssistOutcome::Busy;
        };

        let text = truncate_chars(&assistant.draft(draft, &title), MAX_CHAR_COUNT);
        let update = match draft {
            Draft::Objectives => FieldUpdate::Objective(text.clone()),
            Draft::Impact => FieldUpdate::Impact(text.clone()),
        };
        if let Err(error) = self.update(update) {
            log::error!("Unable to store the draft: {}", error);
        }
        AssistOutcome::Drafted(text)
    }

    fn busy_flag(&self, draft: Draft) -> &BusyFlag {
        match draft {
            Draft::Objectives => &self.drafting_objective,
            Draft::Impact => &self.drafting_impact,
        }
    }

    fn replace<F>(&self, change: F) -> Result<Arc<ReportData>, ContextError>
    where
        F: FnOnce(&ReportData) -> Result<ReportData, ContextError>,
    {
        let mut record = self.record.write().unwrap_or_else(PoisonError::into_inner);
        let next = Arc::new(change(&record)?);
        *record = next.clone();
        Ok(next)
    }

    fn replace_with<F>(&self, change: F) -> Arc<ReportData>
    where
        F: FnOnce(&ReportData) -> ReportData,
    {
        let mut record = self.record.write().unwrap_or_else(PoisonError::into_inner);
        let next = Arc::new(change(&record));
        *record = next.clone();
        next
    }
}
