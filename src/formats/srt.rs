use std::fmt::Write as _;
use std::path::Path;
use anyhow::{Result, Context};
use log::warn;
use once_cell::sync::Lazy;
use regex::Regex;

use crate::errors::SubtitleError;
use crate::file_utils::FileManager;
use crate::subtitle_processor::{SubtitleCollection, SubtitleEntry};

// @module: SRT reading and writing

// @const: SRT timestamp regex
static TIMESTAMP_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(\d{2}):(\d{2}):(\d{2}),(\d{3}) --> (\d{2}):(\d{2}):(\d{2}),(\d{3})").unwrap()
});

/// Read an SRT file into a subtitle collection
pub fn read_file<P: AsRef<Path>>(path: P, language: &str) -> Result<SubtitleCollection> {
    let path = path.as_ref();
    let content = FileManager::read_to_string(path)?;
    let entries = parse_str(&content)
        .with_context(|| format!("Failed to parse SRT file: {:?}", path))?;

    let mut collection = SubtitleCollection {
        source_file: path.to_path_buf(),
        entries,
        language: language.to_string(),
    };
    collection.sort_and_renumber();
    Ok(collection)
}

/// Write a subtitle collection as an SRT file
pub fn write_file<P: AsRef<Path>>(collection: &SubtitleCollection, path: P) -> Result<()> {
    let content = render(&collection.entries);
    FileManager::write_to_file(path, &content)
}

/// Parse SRT format content into subtitle cues.
///
/// The parser is lenient: malformed blocks are skipped with a warning, and
/// only a fully empty result is an error.
pub fn parse_str(content: &str) -> Result<Vec<SubtitleEntry>, SubtitleError> {
    let mut entries = Vec::new();

    // State for the block being accumulated
    let mut current_seq_num: Option<usize> = None;
    let mut current_start_time_ms: Option<u64> = None;
    let mut current_end_time_ms: Option<u64> = None;
    let mut current_text = String::new();
    let mut line_count = 0;

    let mut finish_block = |seq_num: usize, start_ms: u64, end_ms: u64, text: &str| {
        match SubtitleEntry::new_validated(seq_num, start_ms, end_ms, text.to_string()) {
            Ok(entry) => entries.push(entry),
            Err(e) => warn!("Skipping invalid subtitle cue {}: {}", seq_num, e),
        }
    };

    for line in content.lines() {
        line_count += 1;
        let trimmed = line.trim().trim_start_matches('\u{feff}');

        // A blank line terminates the current block
        if trimmed.is_empty() {
            if let (Some(seq_num), Some(start_ms), Some(end_ms)) =
                (current_seq_num, current_start_time_ms, current_end_time_ms)
            {
                if !current_text.is_empty() {
                    finish_block(seq_num, start_ms, end_ms, &current_text);
                }
                current_seq_num = None;
                current_start_time_ms = None;
                current_end_time_ms = None;
                current_text.clear();
            }
            continue;
        }

        // Sequence number opens a new block
        if current_seq_num.is_none() && current_text.is_empty() {
            if let Ok(num) = trimmed.parse::<usize>() {
                current_seq_num = Some(num);
                continue;
            }
        }

        // Timestamp line follows the sequence number
        if current_seq_num.is_some()
            && current_start_time_ms.is_none()
            && current_end_time_ms.is_none()
        {
            if let Some(caps) = TIMESTAMP_REGEX.captures(trimmed) {
                match (capture_to_ms(&caps, 1), capture_to_ms(&caps, 5)) {
                    (Some(start_ms), Some(end_ms)) => {
                        current_start_time_ms = Some(start_ms);
                        current_end_time_ms = Some(end_ms);
                        continue;
                    }
                    _ => {
                        warn!("Invalid timestamp at line {}: {}", line_count, trimmed);
                    }
                }
            }
        }

        // With header complete, everything else is cue text
        if current_seq_num.is_some() && current_start_time_ms.is_some() {
            if !current_text.is_empty() {
                current_text.push('\n');
            }
            current_text.push_str(trimmed);
        } else {
            warn!(
                "Unexpected text at line {} before sequence number or timestamp: {}",
                line_count, trimmed
            );
        }
    }

    // Final block without a trailing blank line
    if let (Some(seq_num), Some(start_ms), Some(end_ms)) =
        (current_seq_num, current_start_time_ms, current_end_time_ms)
    {
        if !current_text.is_empty() {
            finish_block(seq_num, start_ms, end_ms, &current_text);
        }
    }

    if entries.is_empty() {
        return Err(SubtitleError::NoCues);
    }

    Ok(entries)
}

/// Render cues as SRT text.
///
/// Cues are written with fresh sequential numbers. A cue is skipped when its
/// text is empty or its start does not advance past the previous written cue.
pub fn render(entries: &[SubtitleEntry]) -> String {
    let mut out = String::new();
    let mut prev_start: Option<u64> = None;
    let mut index = 0usize;

    for entry in entries {
        let in_order = prev_start.is_none_or(|prev| entry.start_time_ms > prev);
        if in_order && !entry.text.trim().is_empty() {
            index += 1;
            let _ = write!(
                out,
                "{}\n{} --> {}\n{}\n\n",
                index,
                entry.format_start_time(),
                entry.format_end_time(),
                entry.text
            );
            prev_start = Some(entry.start_time_ms);
        } else if !in_order {
            warn!("Out of order cue at t={}", entry.format_start_time());
        } else {
            warn!("Skipping cue with no text at t={}", entry.format_start_time());
        }
    }

    out
}

fn capture_to_ms(caps: &regex::Captures, start_idx: usize) -> Option<u64> {
    let field = |i: usize| -> Option<u64> { caps.get(i)?.as_str().parse().ok() };
    let hours = field(start_idx)?;
    let minutes = field(start_idx + 1)?;
    let seconds = field(start_idx + 2)?;
    let millis = field(start_idx + 3)?;

    if minutes >= 60 || seconds >= 60 {
        return None;
    }
    Some((hours * 3600 + minutes * 60 + seconds) * 1000 + millis)
}
