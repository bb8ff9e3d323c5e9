use anyhow::{Result, Context, anyhow};
use log::{warn, info, debug};
use std::path::{Path, PathBuf};
use indicatif::{ProgressBar, ProgressStyle};

use crate::app_config::Config;
use crate::file_utils::{FileManager, FileType};
use crate::formats::{self, SubtitleFormat};
use crate::formats::pgs::PgsStream;
use crate::formats::srt;
use crate::media::{self, TrackExtractor, TrackInfo};
use crate::ocr::{self, TesseractOcr};
use crate::subtitle_processor::SubtitleCollection;

// @module: Application controller for subtitle extraction and conversion

/// Main application controller
pub struct Controller {
    // @field: App configuration
    config: Config,
}

impl Controller {
    /// Create a new controller for test purposes with default configuration
    pub fn new_for_test() -> Result<Self> {
        Self::with_config(Config::default())
    }

    // @method: Create a new controller with the given configuration
    pub fn with_config(config: Config) -> Result<Self> {
        config.validate().context("Configuration validation failed")?;
        Ok(Self { config })
    }

    /// Probe a container and print a track summary
    pub async fn run_info(&self, input: &Path) -> Result<()> {
        let media = media::probe(&self.config.tools, input).await?;

        // Keep the raw probe output next to the dump files for inspection
        let dump_dir = self.config.dump_dir()?;
        let info_path = dump_dir.join(format!("{}.info.json", media.id()));
        let json = serde_json::to_string_pretty(&media.raw)?;
        FileManager::write_to_file(&info_path, &json)?;
        debug!("Probe output saved to {:?}", info_path);

        println!("\nContainer: {} ({})", media.container_type, input.display());
        println!(
            "{:<5} {:<10} {:<28} {:<8} {:<8} {}",
            "ID", "Type", "Codec", "Lang", "Flags", "Name"
        );
        println!("{}", "-".repeat(80));
        for track in &media.tracks {
            let mut flags = String::new();
            if track.default {
                flags.push('D');
            }
            if track.forced {
                flags.push('F');
            }
            if track.enabled {
                flags.push('E');
            }
            println!(
                "{:<5} {:<10} {:<28} {:<8} {:<8} {}",
                track.id,
                track.track_type.to_string(),
                track.codec,
                track.language.as_deref().unwrap_or("und"),
                flags,
                track.track_name.as_deref().unwrap_or("")
            );
        }

        let subs = media.subtitle_tracks();
        if subs.is_empty() {
            warn!("No subtitle tracks found in file: {:?}", input);
        } else {
            info!("{} subtitle track(s) found", subs.len());
        }

        Ok(())
    }

    /// Extract a subtitle track from a container.
    ///
    /// The track is chosen by explicit id when given, otherwise by
    /// preferred language. Returns the path of the extracted file.
    pub async fn run_extract(
        &self,
        input: &Path,
        track_id: Option<u64>,
        language: Option<&str>,
        output: Option<PathBuf>,
        force_overwrite: bool,
    ) -> Result<PathBuf> {
        let media = media::probe(&self.config.tools, input).await?;
        let track = self.pick_track(&media, track_id, language)?;

        let format = track
            .subtitle_format()
            .ok_or_else(|| anyhow!("Unsupported subtitle codec: {}", track.codec_id))?;

        let lang_code = track.language.as_deref().unwrap_or("und");
        let output_path = match output {
            Some(path) => path,
            None => FileManager::generate_output_path(
                input,
                input.parent().unwrap_or(Path::new(".")),
                lang_code,
                format.extension(),
            ),
        };

        if output_path.exists() && !force_overwrite {
            warn!(
                "Output file already exists: {:?}. Use -f to force overwrite.",
                output_path
            );
            return Ok(output_path);
        }

        info!(
            "Extracting track {} ({}, {}) from {:?}",
            track.id, format, lang_code, input
        );
        let progress = extract_progress_bar();
        let extractor = TrackExtractor::new(&self.config.tools);
        extractor
            .extract(input, track.id, &output_path, Some(&progress))
            .await?;
        progress.finish_and_clear();

        info!("Success: {:?}", output_path);
        Ok(output_path)
    }

    /// OCR a PGS subtitle file into SRT
    pub async fn run_ocr(
        &self,
        input: &Path,
        output: Option<PathBuf>,
        force_overwrite: bool,
    ) -> Result<PathBuf> {
        let language = self
            .config
            .ocr
            .languages
            .first()
            .cloned()
            .unwrap_or_else(|| "eng".to_string());

        let output_path = match output {
            Some(path) => path,
            None => FileManager::generate_output_path(
                input,
                input.parent().unwrap_or(Path::new(".")),
                &language,
                "srt",
            ),
        };
        if output_path.exists() && !force_overwrite {
            warn!(
                "Output file already exists: {:?}. Use -f to force overwrite.",
                output_path
            );
            return Ok(output_path);
        }

        let collection = self.ocr_pgs_file(input, &language).await?;
        srt::write_file(&collection, &output_path)?;

        info!("Success: {:?}", output_path);
        Ok(output_path)
    }

    /// Convert a subtitle file or container track to SRT.
    ///
    /// Directories are processed recursively, converting every Matroska
    /// file found.
    pub async fn run_convert(
        &self,
        input: &Path,
        language: Option<&str>,
        output: Option<PathBuf>,
        force_overwrite: bool,
    ) -> Result<()> {
        if input.is_dir() {
            if output.is_some() {
                return Err(anyhow!(
                    "An explicit output path cannot be combined with a directory input"
                ));
            }
            let mut files = Vec::new();
            for ext in ["mkv", "mka", "mks", "webm"] {
                files.extend(FileManager::find_files(input, ext)?);
            }
            files.sort();
            info!("Converting {} container file(s) in {:?}", files.len(), input);

            let mut converted = 0usize;
            for file in &files {
                if let Err(e) = self
                    .convert_single(file, language, None, force_overwrite)
                    .await
                {
                    warn!("Skipping {:?}: {}", file, e);
                } else {
                    converted += 1;
                }
            }
            info!("Finished processing {} of {} files", converted, files.len());
            return Ok(());
        }

        self.convert_single(input, language, output, force_overwrite).await
    }

    /// Convert one subtitle file or container to SRT
    async fn convert_single(
        &self,
        input: &Path,
        language: Option<&str>,
        output: Option<PathBuf>,
        force_overwrite: bool,
    ) -> Result<()> {
        if !input.exists() {
            return Err(anyhow!("Input path does not exist: {:?}", input));
        }

        let file_type = FileManager::detect_file_type(input)?;
        let collection = match file_type {
            FileType::Matroska => self.convert_container(input, language).await?,
            FileType::SrtSubtitle | FileType::SsaSubtitle => {
                formats::read_collection(input, language.unwrap_or("und"))?
            }
            FileType::PgsSubtitle => {
                let lang = language
                    .map(|l| l.to_string())
                    .or_else(|| self.config.ocr.languages.first().cloned())
                    .unwrap_or_else(|| "eng".to_string());
                self.ocr_pgs_file(input, &lang).await?
            }
            FileType::Unknown => {
                return Err(anyhow!("Unsupported input file: {:?}", input));
            }
        };

        let output_path = match output {
            Some(path) => path,
            None => FileManager::generate_output_path(
                input,
                input.parent().unwrap_or(Path::new(".")),
                &collection.language,
                "srt",
            ),
        };
        if output_path.exists() && !force_overwrite {
            warn!(
                "Output file already exists: {:?}. Use -f to force overwrite.",
                output_path
            );
            return Ok(());
        }

        srt::write_file(&collection, &output_path)?;
        info!(
            "Wrote {} cues to {:?}",
            collection.entries.len(),
            output_path
        );
        Ok(())
    }

    /// Remove cached dump files
    pub fn run_clean(&self) -> Result<()> {
        let removed = self.config.clean_dump_dir()?;
        info!("Removed {} cached item(s) from the dump directory", removed);
        Ok(())
    }

    // =========================================================================
    // Internal pipeline steps
    // =========================================================================

    /// Pick a subtitle track by id or language preference
    fn pick_track<'a>(
        &self,
        media: &'a media::MediaInfo,
        track_id: Option<u64>,
        language: Option<&str>,
    ) -> Result<&'a TrackInfo> {
        if let Some(id) = track_id {
            let track = media
                .track(id)
                .ok_or_else(|| anyhow!("Track {} not found in container", id))?;
            return Ok(track);
        }

        let subs = media.subtitle_tracks();
        if subs.is_empty() {
            return Err(anyhow!("No subtitle tracks found in the container"));
        }

        debug!("Found {} subtitle track(s):", subs.len());
        for track in &subs {
            debug!(
                "  Track {}: {} ({})",
                track.id,
                track.language.as_deref().unwrap_or("unknown"),
                track.codec
            );
        }

        media::select_subtitle_track(&subs, language).ok_or_else(|| {
            anyhow!(
                "No subtitle track found for language: {}",
                language.unwrap_or("any")
            )
        })
    }

    /// Extract a track from a container into a scratch directory and parse
    /// it into a collection, running OCR when the track is image-based.
    async fn convert_container(
        &self,
        input: &Path,
        language: Option<&str>,
    ) -> Result<SubtitleCollection> {
        let media = media::probe(&self.config.tools, input).await?;
        let track = self.pick_track(&media, None, language)?;
        let format = track
            .subtitle_format()
            .ok_or_else(|| anyhow!("Unsupported subtitle codec: {}", track.codec_id))?;
        let lang_code = track.language.as_deref().unwrap_or("und").to_string();

        // Extracted tracks are cached in the dump dir, keyed by media
        // identity and track id
        let dump_dir = self.config.dump_dir()?;
        let track_file = dump_dir.join(format!(
            "{}.{}.{}",
            media.id(),
            track.id,
            format.extension()
        ));

        if track_file.is_file() {
            debug!("Using cached track file {:?}", track_file);
        } else {
            let progress = extract_progress_bar();
            let extractor = TrackExtractor::new(&self.config.tools);
            extractor
                .extract(input, track.id, &track_file, Some(&progress))
                .await?;
            progress.finish_and_clear();
        }

        let mut collection = match format {
            SubtitleFormat::Srt => srt::read_file(&track_file, &lang_code)?,
            SubtitleFormat::Ssa => formats::ssa::read_file(&track_file, &lang_code)?,
            SubtitleFormat::Pgs => self.ocr_pgs_file(&track_file, &lang_code).await?,
        };

        // The cache file is an implementation detail; point the collection
        // at the container it came from
        collection.source_file = input.to_path_buf();
        Ok(collection)
    }

    /// Parse a PGS file and recognize its frames with tesseract
    async fn ocr_pgs_file(&self, input: &Path, language: &str) -> Result<SubtitleCollection> {
        let stream = PgsStream::read_file(input)?;
        if stream.is_empty() {
            return Err(anyhow!("No display sets found in PGS file: {:?}", input));
        }
        let frames = stream.into_frames();
        info!("Recognizing {} subtitle frame(s), please wait…", frames.len());

        // Scratch PNGs live in a temp dir that cleans itself up
        let scratch = tempfile::tempdir().context("Failed to create OCR scratch directory")?;
        let engine =
            TesseractOcr::new(&self.config.tools, &self.config.ocr, scratch.path().to_path_buf());
        engine.check_availability().await?;

        let ocr_languages = match language_for_ocr(language, &self.config.ocr.languages) {
            Some(langs) => langs,
            None => self.config.ocr.languages.clone(),
        };

        let (mut collection, stats) = ocr::recognize_frames(
            &engine,
            &frames,
            &ocr_languages,
            input,
            language,
            true,
        )
        .await?;
        collection.drop_empty();

        info!(
            "OCR finished: {} recognized, {} silent, {} unterminated",
            stats.recognized, stats.silent, stats.unterminated
        );
        if collection.entries.is_empty() {
            return Err(anyhow!("OCR produced no usable cues for {:?}", input));
        }
        Ok(collection)
    }
}

/// Progress bar for track extraction (percent based)
fn extract_progress_bar() -> ProgressBar {
    let pb = ProgressBar::new(100);
    let style = ProgressStyle::default_bar()
        .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}% {msg}")
        .unwrap_or_else(|_| ProgressStyle::default_bar());
    pb.set_style(style.progress_chars("█▓▒░"));
    pb.set_message("Extracting");
    pb
}

/// Put the track language first in the OCR language list, followed by the
/// configured languages with duplicates removed.
fn language_for_ocr(track_language: &str, configured: &[String]) -> Option<Vec<String>> {
    let normalized = crate::language_utils::normalize_to_part2t(track_language).ok()?;
    let mut langs = vec![normalized.clone()];
    for lang in configured {
        if crate::language_utils::normalize_to_part2t(lang).ok().as_deref() != Some(normalized.as_str()) {
            langs.push(lang.clone());
        }
    }
    Some(langs)
}
