use anyhow::{Result, Context};
use std::fs;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;
use once_cell::sync::Lazy;
use regex::Regex;

// @module: File and directory utilities

// @const: SRT cue header pattern (sequence number followed by a timestamp line)
static SRT_SNIFF_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\d+\s*\r?\n\d{2}:\d{2}:\d{2},\d{3}\s+-->\s+\d{2}:\d{2}:\d{2},\d{3}").unwrap()
});

/// EBML magic number that opens every Matroska container
const EBML_MAGIC: [u8; 4] = [0x1A, 0x45, 0xDF, 0xA3];

// @struct: File operations utility
pub struct FileManager;

impl FileManager {
    // @checks: File existence
    pub fn file_exists<P: AsRef<Path>>(path: P) -> bool {
        path.as_ref().exists() && path.as_ref().is_file()
    }

    // @checks: Directory existence
    pub fn dir_exists<P: AsRef<Path>>(path: P) -> bool {
        path.as_ref().exists() && path.as_ref().is_dir()
    }

    // @creates: Directory and parents if needed
    pub fn ensure_dir<P: AsRef<Path>>(path: P) -> Result<()> {
        let path = path.as_ref();
        if !path.exists() {
            fs::create_dir_all(path)?;
        }
        Ok(())
    }

    // @generates: Output path for a converted subtitle
    // @params: input_file, output_dir, language, extension
    pub fn generate_output_path<P1: AsRef<Path>, P2: AsRef<Path>>(
        input_file: P1,
        output_dir: P2,
        language: &str,
        extension: &str,
    ) -> PathBuf {
        let input_file = input_file.as_ref();
        let output_dir = output_dir.as_ref();

        let stem = input_file.file_stem().unwrap_or_default();

        let mut output_filename = stem.to_string_lossy().to_string();
        output_filename.push('.');
        output_filename.push_str(language);
        output_filename.push('.');
        output_filename.push_str(extension);

        output_dir.join(output_filename)
    }

    /// Find files with a specific extension in a directory
    pub fn find_files<P: AsRef<Path>>(dir: P, extension: &str) -> Result<Vec<PathBuf>> {
        let mut result = Vec::new();
        let normalized_ext = extension.trim_start_matches('.');

        for entry in WalkDir::new(dir.as_ref()).follow_links(true) {
            let entry = entry.context("Failed to read directory entry")?;
            let path = entry.path();

            if path.is_file() {
                if let Some(ext) = path.extension() {
                    if ext.to_string_lossy().eq_ignore_ascii_case(normalized_ext) {
                        result.push(path.to_path_buf());
                    }
                }
            }
        }

        Ok(result)
    }

    /// Read a file to a string
    pub fn read_to_string<P: AsRef<Path>>(path: P) -> Result<String> {
        fs::read_to_string(&path)
            .with_context(|| format!("Failed to read file: {:?}", path.as_ref()))
    }

    /// Write a string to a file
    pub fn write_to_file<P: AsRef<Path>>(path: P, content: &str) -> Result<()> {
        // Ensure the parent directory exists
        if let Some(parent) = path.as_ref().parent() {
            Self::ensure_dir(parent)?;
        }

        fs::write(&path, content)
            .with_context(|| format!("Failed to write to file: {:?}", path.as_ref()))?;

        Ok(())
    }

    /// Detect the type of an input file from its extension, falling back to
    /// content sniffing (magic bytes for binary formats, structure for text).
    pub fn detect_file_type<P: AsRef<Path>>(path: P) -> Result<FileType> {
        let path = path.as_ref();

        if !path.exists() {
            return Err(anyhow::anyhow!("File does not exist: {:?}", path));
        }

        if let Some(ext) = path.extension() {
            let ext_str = ext.to_string_lossy().to_lowercase();
            match ext_str.as_str() {
                "srt" => return Ok(FileType::SrtSubtitle),
                "ssa" | "ass" => return Ok(FileType::SsaSubtitle),
                "sup" | "pgs" => return Ok(FileType::PgsSubtitle),
                "mkv" | "mka" | "mks" | "webm" => return Ok(FileType::Matroska),
                _ => {}
            }
        }

        Self::sniff_content(path)
    }

    /// Classify a file by its leading bytes
    fn sniff_content(path: &Path) -> Result<FileType> {
        let data = fs::read(path)
            .with_context(|| format!("Failed to read file for sniffing: {:?}", path))?;

        if data.len() >= 4 && data[0..4] == EBML_MAGIC {
            return Ok(FileType::Matroska);
        }
        if data.len() >= 2 && &data[0..2] == b"PG" {
            return Ok(FileType::PgsSubtitle);
        }

        if let Ok(text) = std::str::from_utf8(&data) {
            // SSA files open with a [Script Info] section
            if text.lines().any(|l| l.trim() == "[Script Info]") {
                return Ok(FileType::SsaSubtitle);
            }
            if text.contains("-->") && SRT_SNIFF_REGEX.is_match(text) {
                return Ok(FileType::SrtSubtitle);
            }
        }

        Ok(FileType::Unknown)
    }
}

/// Enum representing different input file types
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileType {
    /// SubRip text subtitle file
    SrtSubtitle,
    /// SubStation Alpha subtitle file
    SsaSubtitle,
    /// Presentation Graphics Stream subtitle file
    PgsSubtitle,
    /// Matroska container
    Matroska,
    /// Unknown file type
    Unknown,
}

impl FileType {
    /// True for the subtitle file types
    pub fn is_subtitle(&self) -> bool {
        matches!(
            self,
            FileType::SrtSubtitle | FileType::SsaSubtitle | FileType::PgsSubtitle
        )
    }
}
