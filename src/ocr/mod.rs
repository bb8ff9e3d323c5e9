/*!
 * Optical character recognition for image-based subtitles.
 *
 * The `OcrEngine` trait is the seam between the subtitle pipeline and the
 * external recognizer; `TesseractOcr` is the production implementation.
 * `MockOcr` exists for tests that need deterministic recognition.
 */

use std::path::Path;
use async_trait::async_trait;
use image::RgbaImage;
use indicatif::{ProgressBar, ProgressStyle};
use log::warn;

use crate::errors::OcrError;
use crate::formats::pgs::PgsFrame;
use crate::subtitle_processor::{SubtitleCollection, SubtitleEntry};

pub mod tesseract;

pub use tesseract::TesseractOcr;

/// Common interface for OCR engines
#[async_trait]
pub trait OcrEngine: Send + Sync {
    /// Recognize text in a subtitle bitmap.
    ///
    /// Returns the recognized lines, cleaned up and with empty lines
    /// removed. An empty result is not an error at this level; the caller
    /// decides what to do with silent frames.
    async fn recognize(
        &self,
        index: usize,
        image: &RgbaImage,
        languages: &[String],
    ) -> Result<Vec<String>, OcrError>;
}

/// Result counters from an OCR pass over a frame collection
#[derive(Debug, Default, Clone, Copy)]
pub struct OcrStats {
    /// Frames that produced a cue
    pub recognized: usize,
    /// Frames whose recognition yielded no text
    pub silent: usize,
    /// Frames skipped because the stream never closed them
    pub unterminated: usize,
}

/// Run OCR over PGS frames and build a subtitle collection.
///
/// Each frame is rendered, recognized and turned into a cue. Frames with
/// no end timestamp and frames that recognize to nothing are dropped with
/// a warning.
pub async fn recognize_frames<E: OcrEngine + ?Sized>(
    engine: &E,
    frames: &[PgsFrame],
    languages: &[String],
    source_file: &Path,
    language: &str,
    show_progress: bool,
) -> Result<(SubtitleCollection, OcrStats), OcrError> {
    let mut collection =
        SubtitleCollection::new(source_file.to_path_buf(), language.to_string());
    let mut stats = OcrStats::default();

    let progress = if show_progress {
        let pb = ProgressBar::new(frames.len() as u64);
        let style = ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} frames ({percent}%) {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_bar());
        pb.set_style(style.progress_chars("█▓▒░"));
        pb.set_message("Recognizing");
        Some(pb)
    } else {
        None
    };

    for frame in frames {
        if let Some(pb) = &progress {
            pb.inc(1);
        }

        let Some(end_ms) = frame.end_ms else {
            warn!("Frame {} has no end timestamp, skipping", frame.index);
            stats.unterminated += 1;
            continue;
        };

        let image = frame.render();
        let lines = engine.recognize(frame.index, &image, languages).await?;

        let text = lines.join("\n");
        match SubtitleEntry::new_validated(frame.index + 1, frame.start_ms, end_ms, text) {
            Ok(entry) => {
                collection.entries.push(entry);
                stats.recognized += 1;
            }
            Err(e) => {
                warn!("Dropping frame {}: {}", frame.index, e);
                stats.silent += 1;
            }
        }
    }

    if let Some(pb) = progress {
        pb.finish_and_clear();
    }

    collection.sort_and_renumber();
    Ok((collection, stats))
}

/// Deterministic OCR engine for tests
#[derive(Debug, Default)]
pub struct MockOcr {
    /// Lines returned for every frame; an empty vec simulates a silent frame
    pub lines: Vec<String>,
}

impl MockOcr {
    /// Engine that recognizes every frame as the given lines
    pub fn recognizing(lines: &[&str]) -> Self {
        Self {
            lines: lines.iter().map(|l| l.to_string()).collect(),
        }
    }

    /// Engine that recognizes nothing
    pub fn silent() -> Self {
        Self { lines: Vec::new() }
    }
}

#[async_trait]
impl OcrEngine for MockOcr {
    async fn recognize(
        &self,
        _index: usize,
        _image: &RgbaImage,
        _languages: &[String],
    ) -> Result<Vec<String>, OcrError> {
        Ok(self.lines.clone())
    }
}
