//! Drafting the objective and impact paragraphs with a text-generation service.
//!
//! The assistant never fails: a missing title, a service error or an empty answer all
//! turn into a fixed message which is then written in place of the draft.

use serde::Deserialize;

use crate::{configuration::AssistantConfiguration, error::ContextError};

/// Returned when there is no title to draft from.
pub const MISSING_TITLE_MESSAGE: &str = "Sila isi tajuk program terlebih dahulu.";
/// Returned when the service could not be reached or answered with an error.
pub const SERVICE_ERROR_MESSAGE: &str = "Ralat semasa menjana idea AI.";
/// Returned when the service answered without any text.
pub const EMPTY_ANSWER_MESSAGE: &str = "Gagal menjana idea.";

/// Anything able to answer a prompt with text.
pub trait TextGenerator {
    fn generate(&self, prompt: &str) -> Result<String, ContextError>;
}

/// Which paragraph of the report is drafted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Draft {
    Objectives,
    Impact,
}

impl Draft {
    /// The prompt asking for three short numbered points in Malay about the program.
    pub fn prompt(&self, title: &str) -> String {
        let (request, item) = match self {
            Draft::Objectives => (
                "Berikan 3 objektif program yang sangat ringkas, profesional dan padat dalam Bahasa Melayu untuk",
                "Objektif",
            ),
            Draft::Impact => (
                "Berikan 3 rumusan dan impak positif yang sangat ringkas bagi",
                "Impak",
            ),
        };

        format!(
            "Bertindak sebagai guru SSEMJ. {request}: \"{title}\".\n\
             PENTING:\n\
             1. Hadkan kandungan di bawah 500 aksara.\n\
             2. Jangan berikan sebarang ayat pengenalan atau penutup.\n\
             3. Terus berikan hasil dalam bentuk senarai bernombor:\n\
             1) [{item} 1]\n\
             2) [{item} 2]\n\
             3) [{item} 3]"
        )
    }
}

/// Drafts paragraphs through a `TextGenerator`.
pub struct Assistant<G: TextGenerator> {
    generator: G,
}

impl<G: TextGenerator> Assistant<G> {
    pub fn new(generator: G) -> Self {
        Assistant { generator }
    }

    pub fn objectives(&self, title: &str) -> String {
        self.draft(Draft::Objectives, title)
    }

    pub fn impact(&self, title: &str) -> String {
        self.draft(Draft::Impact, title)
    }

    pub fn draft(&self, draft: Draft, title: &str) -> String {
        if title.is_empty() {
            return MISSING_TITLE_MESSAGE.into();
        }

        match self.generator.generate(&draft.prompt(title)) {
            Ok(text) if text.trim().is_empty() => {
                log::warn!("The text generator gave an empty answer");
                EMPTY_ANSWER_MESSAGE.into()
            }
            Ok(text) => text.trim().to_string(),
            Err(error) => {
                log::error!("Text generation failed: {}", error);
                SERVICE_ERROR_MESSAGE.into()
            }
        }
    }
}

/// Client of the Gemini `generateContent` endpoint.
pub struct GeminiClient {
    endpoint: String,
    model: String,
    api_key: Option<String>,
}

#[derive(Debug, Deserialize)]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: Option<Content>,
}

#[derive(Debug, Deserialize)]
struct Content {
    #[serde(default)]
    parts: Vec<Part>,
}

#[derive(Debug, Deserialize)]
struct Part {
    text: Option<String>,
}

impl GenerateContentResponse {
    /// The text of the first candidate, its parts joined.
    fn text(&self) -> String {
        self.candidates
            .first()
            .and_then(|candidate| candidate.content.as_ref())
            .map(|content| {
                content
                    .parts
                    .iter()
                    .filter_map(|part| part.text.as_deref())
                    .collect()
            })
            .unwrap_or_default()
    }
}

impl GeminiClient {
    pub fn new(endpoint: String, model: String, api_key: Option<String>) -> Self {
        GeminiClient {
            endpoint,
            model,
            api_key,
        }
    }

    /// Reads the API key from the configured environment variable.
    pub fn from_configuration(configuration: &AssistantConfiguration) -> Self {
        let api_key = std::env::var(&configuration.api_key_variable).ok();
        if api_key.is_none() {
            log::warn!(
                "The environment variable {} is not set, text generation will fail",
                configuration.api_key_variable
            );
        }

        GeminiClient::new(
            configuration.endpoint.clone(),
            configuration.model.clone(),
            api_key,
        )
    }

    fn url(&self) -> String {
        format!(
            "{}/{}:generateContent",
            self.endpoint.trim_end_matches('/'),
            self.model
        )
    }
}

impl TextGenerator for GeminiClient {
    fn generate(&self, prompt: &str) -> Result<String, ContextError> {
        let api_key = self
            .api_key
            .as_deref()
            .ok_or(ContextError::with_context("No API key available"))?;
        log::debug!("Requesting a draft from {}", self.url());

        let response: GenerateContentResponse = ureq::post(&self.url())
            .set("x-goog-api-key", api_key)
            .send_json(serde_json::json!({
                "contents": [{ "parts": [{ "text": prompt }] }]
            }))
            .map_err(|error| {
                ContextError::with_error("The text generation request failed", &error)
            })?
            .into_json()
            .map_err(|error| {
                ContextError::with_error("Unable to read the text generation response", &error)
            })?;

        Ok(response.text())
    }
}
