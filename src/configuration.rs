use std::{path::PathBuf, time::Duration};

use serde::{Deserialize, Serialize};

use crate::error::ContextError;

/// Where and how the report is produced. Every key is optional in the JSON file.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct Configuration {
    /// The TTF font used for the text of the report.
    pub font_path: Option<PathBuf>,
    /// The TTF font used for bold text, the regular font is used when missing.
    pub bold_font_path: Option<PathBuf>,
    /// The directory the exported PDF files are written to.
    pub output_directory: PathBuf,
    /// How long to wait before rasterizing, so that pictures and fonts are in place.
    pub settle_delay_millis: u64,
    /// The upscaling factor of the raster embedded in the PDF.
    pub raster_scale: f32,
    /// JPEG quality of the embedded raster, from 1 to 100.
    pub jpeg_quality: u8,
    pub assistant: AssistantConfiguration,
}

impl Default for Configuration {
    fn default() -> Self {
        Configuration {
            font_path: None,
            bold_font_path: None,
            output_directory: PathBuf::from("."),
            settle_delay_millis: 800,
            raster_scale: 2.0,
            jpeg_quality: 95,
            assistant: AssistantConfiguration::default(),
        }
    }
}

/// The text-generation service used to draft the objective and impact paragraphs.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase", default)]
pub struct AssistantConfiguration {
    pub endpoint: String,
    pub model: String,
    /// The environment variable holding the API key.
    pub api_key_variable: String,
}

impl Default for AssistantConfiguration {
    fn default() -> Self {
        AssistantConfiguration {
            endpoint: "https://generativelanguage.googleapis.com/v1beta/models".into(),
            model: "gemini-3-flash-preview".into(),
            api_key_variable: "API_KEY".into(),
        }
    }
}

impl Configuration {
    pub fn from_path(configuration_file_path: &PathBuf) -> Result<Self, ContextError> {
        let configuration_file_contents = std::fs::read_to_string(configuration_file_path)
            .map_err(|error| {
                ContextError::with_error(
                    format!(
                        "Failed to read the configuration file {:?}",
                        configuration_file_path
                    ),
                    &error,
                )
            })?;
        let configuration: Configuration = serde_json::from_str(&configuration_file_contents)
            .map_err(|error| {
                ContextError::with_error(
                    format!(
                        "Failed to parse the configuration file {:?}",
                        configuration_file_path
                    ),
                    &error,
                )
            })?;

        if !(configuration.raster_scale.is_finite() && configuration.raster_scale > 0.0) {
            return Err(ContextError::with_context(format!(
                "The raster scale must be positive, found {}",
                configuration.raster_scale
            )));
        }
        if !(1..=100).contains(&configuration.jpeg_quality) {
            return Err(ContextError::with_context(format!(
                "The JPEG quality must be between 1 and 100, found {}",
                configuration.jpeg_quality
            )));
        }

        Ok(configuration)
    }

    pub fn settle_delay(&self) -> Duration {
        Duration::from_millis(self.settle_delay_millis)
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write as _;

    use super::*;

    fn write_configuration(name: &str, contents: &str) -> PathBuf {
        let path = std::env::temp_dir().join(format!("laporan-{}-{}.json", name, std::process::id()));
        let mut file = std::fs::File::create(&path).unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        path
    }

    #[test]
    fn missing_keys_fall_back_to_defaults() {
        let path = write_configuration(
            "partial",
            r#"{ "fontPath": "fonts/Inter-Regular.ttf", "settleDelayMillis": 0 }"#,
        );
        let configuration = Configuration::from_path(&path).unwrap();

        assert_eq!(
            configuration.font_path,
            Some(PathBuf::from("fonts/Inter-Regular.ttf"))
        );
        assert_eq!(configuration.settle_delay(), Duration::ZERO);
        assert_eq!(configuration.raster_scale, 2.0);
        assert_eq!(configuration.jpeg_quality, 95);
        assert_eq!(configuration.assistant, AssistantConfiguration::default());
    }

    #[test]
    fn out_of_range_values_are_refused() {
        let path = write_configuration("scale", r#"{ "rasterScale": 0 }"#);
        assert!(Configuration::from_path(&path).is_err());

        let path = write_configuration("quality", r#"{ "jpegQuality": 0 }"#);
        assert!(Configuration::from_path(&path).is_err());
    }

    #[test]
    fn unreadable_files_carry_their_path() {
        let error = Configuration::from_path(&PathBuf::from("does/not/exist.json")).unwrap_err();
        assert!(error.context.contains("does/not/exist.json"));
    }
}
