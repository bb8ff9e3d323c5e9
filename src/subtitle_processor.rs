use std::collections::HashMap;
use std::fmt;
use std::path::PathBuf;
use anyhow::{Result, anyhow};
use log::{warn, debug};

use crate::errors::SubtitleError;

// @module: Subtitle cue model and collection operations

/// Offsets tried when merging text into cues whose start timestamps do not
/// match exactly
const MERGE_TOLERANCE_OFFSETS_MS: [i64; 4] = [-2, -1, 1, 2];

// @struct: Single subtitle cue
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubtitleEntry {
    // @field: Sequence number
    pub seq_num: usize,

    // @field: Start time in ms
    pub start_time_ms: u64,

    // @field: End time in ms
    pub end_time_ms: u64,

    // @field: Cue text, lines joined with '\n'
    pub text: String,
}

impl SubtitleEntry {
    /// Creates a new subtitle entry without validation - used by readers and tests
    pub fn new(seq_num: usize, start_time_ms: u64, end_time_ms: u64, text: String) -> Self {
        SubtitleEntry {
            seq_num,
            start_time_ms,
            end_time_ms,
            text,
        }
    }

    // @creates: Validated subtitle entry
    // @validates: Time range and non-empty text
    pub fn new_validated(
        seq_num: usize,
        start_time_ms: u64,
        end_time_ms: u64,
        text: String,
    ) -> Result<Self, SubtitleError> {
        if end_time_ms <= start_time_ms {
            return Err(SubtitleError::InvalidTimeRange {
                start_ms: start_time_ms,
                end_ms: end_time_ms,
            });
        }

        let trimmed_text = text.trim();
        if trimmed_text.is_empty() {
            return Err(SubtitleError::EmptyText(seq_num));
        }

        Ok(SubtitleEntry {
            seq_num,
            start_time_ms,
            end_time_ms,
            text: trimmed_text.to_string(),
        })
    }

    /// Parse an SRT timestamp (HH:MM:SS,mmm) to milliseconds
    pub fn parse_timestamp(timestamp: &str) -> Result<u64> {
        let parts: Vec<&str> = timestamp.split(&[':', ',', '.'][..]).collect();

        if parts.len() != 4 {
            return Err(anyhow!("Invalid timestamp format: {}", timestamp));
        }

        let hours: u64 = parts[0].trim().parse()?;
        let minutes: u64 = parts[1].parse()?;
        let seconds: u64 = parts[2].parse()?;
        let millis: u64 = parts[3].parse()?;

        if minutes >= 60 || seconds >= 60 || millis >= 1000 {
            return Err(anyhow!("Invalid time components in timestamp: {}", timestamp));
        }

        Ok(hours * 3_600_000 + minutes * 60_000 + seconds * 1_000 + millis)
    }

    /// Convert start time to formatted SRT timestamp
    pub fn format_start_time(&self) -> String {
        Self::format_timestamp(self.start_time_ms)
    }

    /// Convert end time to formatted SRT timestamp
    pub fn format_end_time(&self) -> String {
        Self::format_timestamp(self.end_time_ms)
    }

    /// Format a timestamp in milliseconds to SRT format (HH:MM:SS,mmm)
    pub fn format_timestamp(ms: u64) -> String {
        let hours = ms / 3_600_000;
        let minutes = (ms % 3_600_000) / 60_000;
        let seconds = (ms % 60_000) / 1_000;
        let millis = ms % 1_000;

        format!("{:02}:{:02}:{:02},{:03}", hours, minutes, seconds, millis)
    }

    /// Cue display duration in milliseconds
    pub fn duration_ms(&self) -> u64 {
        self.end_time_ms.saturating_sub(self.start_time_ms)
    }

    /// Replace the cue text, trimming lines and dropping empty ones
    pub fn set_lines(&mut self, lines: &[String]) {
        let cleaned: Vec<&str> = lines
            .iter()
            .map(|l| l.trim())
            .filter(|l| !l.is_empty())
            .collect();
        self.text = cleaned.join("\n");
    }
}

impl fmt::Display for SubtitleEntry {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        writeln!(f, "{}", self.seq_num)?;
        writeln!(f, "{} --> {}", self.format_start_time(), self.format_end_time())?;
        writeln!(f, "{}", self.text)?;
        writeln!(f)
    }
}

/// Collection of subtitle cues with metadata
#[derive(Debug)]
pub struct SubtitleCollection {
    /// Source filename
    pub source_file: PathBuf,

    /// List of subtitle cues
    pub entries: Vec<SubtitleEntry>,

    /// Track language (ISO 639, normalized when possible)
    pub language: String,
}

impl SubtitleCollection {
    /// Create a new empty subtitle collection
    pub fn new(source_file: PathBuf, language: String) -> Self {
        SubtitleCollection {
            source_file,
            entries: Vec::new(),
            language,
        }
    }

    /// Sort cues by start time and renumber them sequentially from 1.
    ///
    /// Returns the number of overlapping cue pairs found after sorting.
    pub fn sort_and_renumber(&mut self) -> usize {
        self.entries.sort_by_key(|entry| entry.start_time_ms);

        let mut overlap_count = 0;
        for i in 0..self.entries.len().saturating_sub(1) {
            if self.entries[i].end_time_ms > self.entries[i + 1].start_time_ms {
                overlap_count += 1;
            }
        }
        if overlap_count > 0 {
            warn!("Found {} overlapping subtitle cues", overlap_count);
        }

        for (i, entry) in self.entries.iter_mut().enumerate() {
            entry.seq_num = i + 1;
        }

        overlap_count
    }

    /// Copy text from another collection into this one by matching cue start
    /// timestamps.
    ///
    /// Cues whose start matches exactly take the source text directly. For
    /// source cues with no exact match, nearby targets at small fixed offsets
    /// are tried before the cue is counted as unmatched. Returns the number
    /// of source cues whose text found no home.
    pub fn merge_text(&mut self, other: &SubtitleCollection) -> usize {
        let mut by_start: HashMap<u64, usize> = HashMap::with_capacity(self.entries.len());
        for (idx, entry) in self.entries.iter().enumerate() {
            by_start.insert(entry.start_time_ms, idx);
        }

        let mut missing: Vec<&SubtitleEntry> = Vec::new();
        for source in &other.entries {
            if source.text.trim().is_empty() {
                continue;
            }
            if let Some(&idx) = by_start.get(&source.start_time_ms) {
                self.entries[idx].text = source.text.clone();
            } else {
                missing.push(source);
            }
        }

        let mut unmatched = 0;
        if !missing.is_empty() {
            debug!(
                "Found {} cues with non-matching timestamps",
                missing.len()
            );
            for source in missing {
                let mut placed = false;
                for offset in MERGE_TOLERANCE_OFFSETS_MS {
                    let shifted = source.start_time_ms as i64 + offset;
                    if shifted < 0 {
                        continue;
                    }
                    if let Some(&idx) = by_start.get(&(shifted as u64)) {
                        self.entries[idx].text = source.text.clone();
                        placed = true;
                        break;
                    }
                }
                if !placed {
                    unmatched += 1;
                }
            }
        }

        if unmatched > 0 {
            warn!("{} cues could not be matched by timestamp", unmatched);
        }
        unmatched
    }

    /// Total duration covered by the cues, in milliseconds
    pub fn total_duration_ms(&self) -> u64 {
        match (self.entries.first(), self.entries.last()) {
            (Some(first), Some(last)) => last.end_time_ms.saturating_sub(first.start_time_ms),
            _ => 0,
        }
    }

    /// Drop cues that carry no text, renumbering the remainder.
    ///
    /// Returns the number of removed cues.
    pub fn drop_empty(&mut self) -> usize {
        let before = self.entries.len();
        self.entries.retain(|e| !e.text.trim().is_empty());
        let removed = before - self.entries.len();
        if removed > 0 {
            debug!("Dropped {} empty cues", removed);
            for (i, entry) in self.entries.iter_mut().enumerate() {
                entry.seq_num = i + 1;
            }
        }
        removed
    }
}

impl fmt::Display for SubtitleCollection {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        writeln!(f, "Subtitle Collection")?;
        writeln!(f, "Source: {:?}", self.source_file)?;
        writeln!(f, "Language: {}", self.language)?;
        writeln!(f, "Entries: {}", self.entries.len())?;
        Ok(())
    }
}
