use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};
use laporan::{
    assist::{Assistant, Draft, GeminiClient},
    configuration::Configuration,
    error::ContextError,
    export::{ExportOutcome, Exporter},
    fitting::compute_font_size,
    form::{AssistOutcome, ReportForm},
    payload::ImagePayload,
    raster::Rasterizer,
    report::{FieldUpdate, ReportData},
};

#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct CliArguments {
    /// Log debugging information, `RUST_LOG` takes precedence when set.
    #[arg(short = 'v', long = "verbose", global = true)]
    verbose: bool,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Render a saved report to a PDF file.
    Export {
        #[arg(short = 'r', long = "report", value_name = "json_file")]
        report_path: PathBuf,
        #[arg(short = 'c', long = "config", value_name = "json_file")]
        configuration_path: Option<PathBuf>,
        /// Overrides the output directory of the configuration.
        #[arg(short = 'o', long = "output", value_name = "directory")]
        output_directory: Option<PathBuf>,
        /// Photos added to the report, as far as its free slots allow.
        #[arg(short = 'i', long = "image", value_name = "image_file")]
        image_paths: Vec<PathBuf>,
        /// A PNG signature replacing the one stored in the report.
        #[arg(short = 's', long = "signature", value_name = "png_file")]
        signature_path: Option<PathBuf>,
    },
    /// Draft the objectives or the impact of a program.
    Assist {
        #[arg(value_enum)]
        draft: DraftArgument,
        #[arg(short = 't', long = "title")]
        title: String,
        #[arg(short = 'c', long = "config", value_name = "json_file")]
        configuration_path: Option<PathBuf>,
    },
    /// Print the fitted font size of a text.
    Fit {
        #[arg(long = "text")]
        text: String,
        #[arg(long = "base")]
        base_size: f32,
        #[arg(long = "threshold")]
        length_threshold: usize,
        #[arg(long = "min")]
        min_size: f32,
    },
}

#[derive(ValueEnum, Clone, Copy, Debug)]
enum DraftArgument {
    Objectives,
    Impact,
}

impl From<DraftArgument> for Draft {
    fn from(value: DraftArgument) -> Self {
        match value {
            DraftArgument::Objectives => Draft::Objectives,
            DraftArgument::Impact => Draft::Impact,
        }
    }
}

fn main() {
    if let Err(error) = fallible_main() {
        log::error!("{}", error);
        std::process::exit(1);
    }
}

fn fallible_main() -> Result<(), ContextError> {
    let arguments = CliArguments::parse();
    let mut logger = env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"));
    if arguments.verbose && std::env::var_os("RUST_LOG").is_none() {
        logger.filter_level(log::LevelFilter::Debug);
    }
    logger.init();
    log::debug!("{:?}", arguments);

    match arguments.command {
        Command::Export {
            report_path,
            configuration_path,
            output_directory,
            image_paths,
            signature_path,
        } => {
            let mut configuration = load_configuration(configuration_path.as_ref())?;
            if let Some(output_directory) = output_directory {
                configuration.output_directory = output_directory;
            }

            let form = ReportForm::new(ReportData::from_path(&report_path)?);
            if !image_paths.is_empty() {
                let files = image_paths
                    .iter()
                    .map(read_file)
                    .collect::<Result<Vec<_>, _>>()?;
                let summary = form.add_images(&files);
                log::info!(
                    "Added {} photo(s), dropped {}, rejected {}",
                    summary.accepted,
                    summary.dropped,
                    summary.rejected
                );
            }
            if let Some(signature_path) = signature_path {
                let signature = ImagePayload::from_file_bytes(&read_file(&signature_path)?)?;
                form.update(FieldUpdate::Signature(signature))?;
            }

            let rasterizer = Rasterizer::from_configuration(&configuration)?;
            let exporter = Exporter::new(rasterizer, configuration);
            let outcome = exporter.export(&form.snapshot());
            match &outcome {
                ExportOutcome::Saved(path) => println!("{}", path.display()),
                ExportOutcome::Skipped => log::warn!("The export was skipped"),
                ExportOutcome::Failed(error) => {
                    return Err(ContextError::with_error(
                        outcome.notice().unwrap_or("Failed to export the report"),
                        error,
                    ))
                }
            }
        }
        Command::Assist {
            draft,
            title,
            configuration_path,
        } => {
            let configuration = load_configuration(configuration_path.as_ref())?;
            let assistant = Assistant::new(GeminiClient::from_configuration(&configuration.assistant));
            let form = ReportForm::default();
            form.update(FieldUpdate::Title(title))?;

            let outcome = match Draft::from(draft) {
                Draft::Objectives => form.generate_objective(&assistant),
                Draft::Impact => form.generate_impact(&assistant),
            };
            match outcome {
                AssistOutcome::Drafted(text) => println!("{}", text),
                AssistOutcome::Blocked(notice) => return Err(ContextError::with_context(notice)),
                AssistOutcome::Busy => log::warn!("A draft is already being generated"),
            }
        }
        Command::Fit {
            text,
            base_size,
            length_threshold,
            min_size,
        } => println!(
            "{}",
            compute_font_size(&text, base_size, length_threshold, min_size)
        ),
    }

    Ok(())
}

fn load_configuration(configuration_path: Option<&PathBuf>) -> Result<Configuration, ContextError> {
    match configuration_path {
        Some(configuration_path) => Configuration::from_path(configuration_path),
        None => Ok(Configuration::default()),
    }
}

fn read_file(path: &PathBuf) -> Result<Vec<u8>, ContextError> {
    std::fs::read(path)
        .map_err(|error| ContextError::with_error(format!("Failed to read the file {:?}", path), &error))
}
