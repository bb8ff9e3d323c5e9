/*!
 * Subtitle format layer.
 *
 * This module contains the readers and writers for the supported subtitle
 * representations:
 * - `srt`: SubRip text cues (read/write)
 * - `ssa`: SubStation Alpha events (read, converted to text with italics markup)
 * - `pgs`: Presentation Graphics Stream bitmaps (read; text requires OCR)
 */

use std::path::Path;
use anyhow::{Result, anyhow};

use crate::file_utils::{FileManager, FileType};
use crate::subtitle_processor::SubtitleCollection;

pub mod srt;
pub mod ssa;
pub mod pgs;

/// Subtitle formats understood by the toolkit
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubtitleFormat {
    /// SubRip text
    Srt,
    /// SubStation Alpha / Advanced SubStation Alpha
    Ssa,
    /// Presentation Graphics Stream (image-based)
    Pgs,
}

impl SubtitleFormat {
    /// Detect the subtitle format of a file
    pub fn detect<P: AsRef<Path>>(path: P) -> Result<Self> {
        match FileManager::detect_file_type(&path)? {
            FileType::SrtSubtitle => Ok(Self::Srt),
            FileType::SsaSubtitle => Ok(Self::Ssa),
            FileType::PgsSubtitle => Ok(Self::Pgs),
            other => Err(anyhow!(
                "Not a subtitle file: {:?} (detected {:?})",
                path.as_ref(),
                other
            )),
        }
    }

    /// Map a Matroska codec id to a subtitle format
    pub fn from_codec_id(codec_id: &str) -> Option<Self> {
        match codec_id {
            "S_TEXT/UTF8" | "S_TEXT/SRT" => Some(Self::Srt),
            "S_TEXT/SSA" | "S_TEXT/ASS" => Some(Self::Ssa),
            "S_HDMV/PGS" => Some(Self::Pgs),
            _ => None,
        }
    }

    /// Canonical file extension for the format
    pub fn extension(&self) -> &'static str {
        match self {
            Self::Srt => "srt",
            Self::Ssa => "ssa",
            Self::Pgs => "sup",
        }
    }

    /// True for formats whose cues carry text directly
    pub fn is_text_based(&self) -> bool {
        !matches!(self, Self::Pgs)
    }
}

impl std::fmt::Display for SubtitleFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Srt => write!(f, "SRT"),
            Self::Ssa => write!(f, "SSA/ASS"),
            Self::Pgs => write!(f, "PGS"),
        }
    }
}

/// Read a text-based subtitle file into a collection.
///
/// PGS input is rejected here; image subtitles only gain text through the
/// OCR pipeline.
pub fn read_collection<P: AsRef<Path>>(path: P, language: &str) -> Result<SubtitleCollection> {
    let path = path.as_ref();
    match SubtitleFormat::detect(path)? {
        SubtitleFormat::Srt => srt::read_file(path, language),
        SubtitleFormat::Ssa => ssa::read_file(path, language),
        SubtitleFormat::Pgs => Err(anyhow!(
            "{:?} is image-based (PGS) and requires OCR to obtain text",
            path
        )),
    }
}
