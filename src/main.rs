// Module-specific lints configuration
#![allow(clippy::uninlined_format_args)]

use anyhow::{Result, Context};
use log::{warn, LevelFilter, Log, Metadata, Record, Level, SetLoggerError};
use std::io::Write;
use std::path::{Path, PathBuf};
use clap::{Parser, ValueEnum, CommandFactory, Subcommand};
use clap_complete::{generate, Shell};

use crate::app_config::Config;
use app_controller::Controller;

mod app_config;
mod app_controller;
mod errors;
mod file_utils;
mod formats;
mod language_utils;
mod media;
mod ocr;
mod subtitle_processor;

/// CLI Wrapper for LogLevel to implement ValueEnum
#[derive(Debug, Clone, ValueEnum)]
enum CliLogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl From<CliLogLevel> for app_config::LogLevel {
    fn from(cli_level: CliLogLevel) -> Self {
        match cli_level {
            CliLogLevel::Error => app_config::LogLevel::Error,
            CliLogLevel::Warn => app_config::LogLevel::Warn,
            CliLogLevel::Info => app_config::LogLevel::Info,
            CliLogLevel::Debug => app_config::LogLevel::Debug,
            CliLogLevel::Trace => app_config::LogLevel::Trace,
        }
    }
}

fn to_level_filter(level: &app_config::LogLevel) -> LevelFilter {
    match level {
        app_config::LogLevel::Error => LevelFilter::Error,
        app_config::LogLevel::Warn => LevelFilter::Warn,
        app_config::LogLevel::Info => LevelFilter::Info,
        app_config::LogLevel::Debug => LevelFilter::Debug,
        app_config::LogLevel::Trace => LevelFilter::Trace,
    }
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Show container and subtitle track information
    Info {
        /// Media file to inspect
        #[arg(value_name = "INPUT_PATH")]
        input_path: PathBuf,
    },

    /// Extract a subtitle track from a container
    Extract {
        /// Media file to extract from
        #[arg(value_name = "INPUT_PATH")]
        input_path: PathBuf,

        /// Track id to extract (as shown by `info`)
        #[arg(short, long)]
        track: Option<u64>,

        /// Preferred track language (e.g., 'en', 'fre', 'deu')
        #[arg(short, long, conflicts_with = "track")]
        language: Option<String>,

        /// Output file path
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Force overwrite of existing output files
        #[arg(short, long)]
        force_overwrite: bool,
    },

    /// Recognize a PGS subtitle file and write SRT
    Ocr {
        /// PGS (.sup) file to recognize
        #[arg(value_name = "INPUT_PATH")]
        input_path: PathBuf,

        /// Output file path
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Force overwrite of existing output files
        #[arg(short, long)]
        force_overwrite: bool,
    },

    /// Convert a subtitle file or container track to SRT
    Convert {
        /// Subtitle file, container, or directory to process
        #[arg(value_name = "INPUT_PATH")]
        input_path: PathBuf,

        /// Preferred track language for container inputs
        #[arg(short, long)]
        language: Option<String>,

        /// Output file path
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Force overwrite of existing output files
        #[arg(short, long)]
        force_overwrite: bool,
    },

    /// Remove cached probe dumps and OCR scratch files
    Clean,

    /// Generate shell completions for submux
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },
}

/// submux - subtitle demux, OCR and conversion toolkit
///
/// Extracts subtitle tracks from media containers, recognizes image-based
/// subtitles with OCR, and converts between subtitle formats.
#[derive(Parser, Debug)]
#[command(name = "submux")]
#[command(version = "0.1.0")]
#[command(about = "Subtitle demux, OCR and conversion toolkit")]
#[command(long_about = "submux extracts subtitle tracks from Matroska containers and converts them to SRT.

EXAMPLES:
    submux info movie.mkv                      # List tracks in a container
    submux extract -l en movie.mkv             # Extract the English subtitle track
    submux extract -t 3 -o subs.sup movie.mkv  # Extract track 3 to a file
    submux ocr subs.sup                        # OCR a PGS file into SRT
    submux convert movie.mkv                   # Extract and convert the best track
    submux convert subs.ass                    # Convert SSA/ASS to SRT
    submux completions bash > submux.bash      # Generate bash completions

CONFIGURATION:
    Configuration is stored in conf.json by default. You can specify a different
    config file with --config. If the config file doesn't exist, a default one
    will be created automatically.

EXTERNAL TOOLS:
    mkvmerge   - container probing (MKVToolNix)
    mkvextract - track extraction (MKVToolNix)
    tesseract  - OCR for image-based subtitles")]
struct CommandLineOptions {
    #[command(subcommand)]
    command: Commands,

    /// Configuration file path
    #[arg(short, long, default_value = "conf.json", global = true)]
    config_path: String,

    /// Set logging level
    #[arg(long, value_enum, global = true)]
    log_level: Option<CliLogLevel>,
}

// @struct: Custom logger implementation
struct CustomLogger {
    level: LevelFilter,
}

impl CustomLogger {
    // @creates: New logger with specified level
    fn new(level: LevelFilter) -> Self {
        CustomLogger { level }
    }

    // @initializes: Global logger
    fn init(level: LevelFilter) -> Result<(), SetLoggerError> {
        let logger = Box::new(CustomLogger::new(level));
        log::set_boxed_logger(logger)?;
        log::set_max_level(level);
        Ok(())
    }

    // @returns: Marker for log level
    fn get_marker_for_level(level: Level) -> &'static str {
        match level {
            Level::Error => "❌ ",
            Level::Warn => "🚧 ",
            Level::Info => " ",
            Level::Debug => "🔍 ",
            Level::Trace => "📋 ",
        }
    }

    fn color_code(level: Level) -> &'static str {
        match level {
            Level::Error => "\x1B[1;31m",
            Level::Warn => "\x1B[1;33m",
            Level::Info => "\x1B[1;32m",
            Level::Debug => "\x1B[1;36m",
            Level::Trace => "\x1B[1;35m",
        }
    }
}

impl Log for CustomLogger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.level() <= self.level
    }

    fn log(&self, record: &Record) {
        if self.enabled(record.metadata()) {
            let now = chrono::Local::now().format("%H:%M:%S.%3f");
            let marker = Self::get_marker_for_level(record.level());
            let color = Self::color_code(record.level());

            let mut stderr = std::io::stderr();
            let _ = writeln!(stderr, "{}{} {} {}\x1B[0m", color, now, marker, record.args());
        }
    }

    fn flush(&self) {
        let _ = std::io::stderr().flush();
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize the logger once with info level by default
    // We'll update the level after loading the config if needed
    CustomLogger::init(LevelFilter::Info)?;

    let cli = CommandLineOptions::parse();

    // Completions need no configuration
    if let Commands::Completions { shell } = &cli.command {
        let mut cmd = CommandLineOptions::command();
        generate(*shell, &mut cmd, "submux", &mut std::io::stdout());
        return Ok(());
    }

    // If log level is set via command line, apply it immediately
    if let Some(cmd_log_level) = &cli.log_level {
        let config_log_level: app_config::LogLevel = cmd_log_level.clone().into();
        log::set_max_level(to_level_filter(&config_log_level));
    }

    // Load or create configuration
    let config = load_or_create_config(&cli.config_path, cli.log_level.as_ref())?;

    // If log level was not set via command line, update it from config now
    if cli.log_level.is_none() {
        log::set_max_level(to_level_filter(&config.log_level));
    }

    let controller = Controller::with_config(config)?;

    match cli.command {
        Commands::Info { input_path } => {
            controller.run_info(&input_path).await?;
        }
        Commands::Extract {
            input_path,
            track,
            language,
            output,
            force_overwrite,
        } => {
            controller
                .run_extract(
                    &input_path,
                    track,
                    language.as_deref(),
                    output,
                    force_overwrite,
                )
                .await?;
        }
        Commands::Ocr {
            input_path,
            output,
            force_overwrite,
        } => {
            controller.run_ocr(&input_path, output, force_overwrite).await?;
        }
        Commands::Convert {
            input_path,
            language,
            output,
            force_overwrite,
        } => {
            controller
                .run_convert(&input_path, language.as_deref(), output, force_overwrite)
                .await?;
        }
        Commands::Clean => {
            controller.run_clean()?;
        }
        Commands::Completions { .. } => unreachable!("handled above"),
    }

    Ok(())
}

/// Load the configuration file, creating a default one when it is missing
fn load_or_create_config(
    config_path: &str,
    cli_log_level: Option<&CliLogLevel>,
) -> Result<Config> {
    let config = if Path::new(config_path).exists() {
        let mut config = Config::from_file(config_path)
            .context(format!("Failed to load config file: {}", config_path))?;

        if let Some(log_level) = cli_log_level {
            config.log_level = log_level.clone().into();
        }
        config
    } else {
        warn!(
            "Config file not found at '{}', creating default config.",
            config_path
        );

        let mut config = Config::default();
        if let Some(log_level) = cli_log_level {
            config.log_level = log_level.clone().into();
        }

        config
            .save_to_file(config_path)
            .context(format!("Failed to write default config to file: {}", config_path))?;

        config
    };

    config.validate().context("Configuration validation failed")?;
    Ok(config)
}
