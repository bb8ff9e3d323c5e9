use std::path::Path;
use anyhow::{Result, Context};
use log::{warn, error};
use once_cell::sync::Lazy;
use regex::Regex;

use crate::errors::SubtitleError;
use crate::file_utils::FileManager;
use crate::subtitle_processor::{SubtitleCollection, SubtitleEntry};

// @module: SSA/ASS event parsing

// @const: Style override block, e.g. {\i1} or {\pos(10,10)\b1}
static OVERRIDE_REGEX: Lazy<Regex> = Lazy::new(|| Regex::new(r"\{[^}]*\}").unwrap());

/// Field positions within a Dialogue line, taken from the Format line
#[derive(Debug, Clone, Copy)]
struct EventFormat {
    length: usize,
    start: usize,
    end: usize,
    text: usize,
}

/// Read an SSA/ASS file into a subtitle collection.
///
/// Events are converted to plain text with `<i>…</i>` italics markup; all
/// other style information is dropped.
pub fn read_file<P: AsRef<Path>>(path: P, language: &str) -> Result<SubtitleCollection> {
    let path = path.as_ref();
    let content = FileManager::read_to_string(path)?;
    let entries = parse_str(&content)
        .with_context(|| format!("Failed to parse SSA file: {:?}", path))?;

    let mut collection = SubtitleCollection {
        source_file: path.to_path_buf(),
        entries,
        language: language.to_string(),
    };
    collection.sort_and_renumber();
    Ok(collection)
}

/// Parse SSA/ASS content into subtitle cues
pub fn parse_str(content: &str) -> Result<Vec<SubtitleEntry>, SubtitleError> {
    let mut entries = Vec::new();
    let mut format: Option<EventFormat> = None;
    let mut in_events = false;

    for (line_no, raw_line) in content.lines().enumerate() {
        let line = raw_line.trim().trim_start_matches('\u{feff}');

        if line.starts_with('[') {
            in_events = line == "[Events]";
            continue;
        }
        if !in_events {
            continue;
        }

        if let Some(rest) = line.strip_prefix("Format:") {
            match parse_format(rest) {
                Some(fmt) => format = Some(fmt),
                None => error!("Invalid events format string on line {}", line_no + 1),
            }
        } else if let Some(rest) = line.strip_prefix("Dialogue:") {
            let Some(fmt) = format else {
                error!("Dialogue before format, skipping line {}", line_no + 1);
                continue;
            };
            match parse_dialogue(rest, fmt) {
                Some(entry) => entries.push(entry),
                None => error!("Dialogue entry is malformed on line {}", line_no + 1),
            }
        }
    }

    if entries.is_empty() {
        return Err(SubtitleError::NoCues);
    }

    for (i, entry) in entries.iter_mut().enumerate() {
        entry.seq_num = i + 1;
    }

    Ok(entries)
}

/// Parse the Format line into field positions
fn parse_format(line: &str) -> Option<EventFormat> {
    let parts: Vec<&str> = line.split(',').map(|f| f.trim()).collect();
    Some(EventFormat {
        length: parts.len(),
        start: parts.iter().position(|f| *f == "Start")?,
        end: parts.iter().position(|f| *f == "End")?,
        text: parts.iter().position(|f| *f == "Text")?,
    })
}

/// Parse one Dialogue line using the active format
fn parse_dialogue(line: &str, fmt: EventFormat) -> Option<SubtitleEntry> {
    // The Text field is last and may itself contain commas
    let bits: Vec<&str> = line.splitn(fmt.length, ',').collect();
    if bits.len() != fmt.length {
        return None;
    }

    let start_ms = decode_timestamp(bits[fmt.start].trim())?;
    let end_ms = decode_timestamp(bits[fmt.end].trim())?;
    let text = convert_text(bits[fmt.text]);

    match SubtitleEntry::new_validated(0, start_ms, end_ms, text) {
        Ok(entry) => Some(entry),
        Err(e) => {
            warn!("Skipping invalid dialogue event: {}", e);
            None
        }
    }
}

/// Decode an SSA timestamp (H:MM:SS.cc, centiseconds) to milliseconds
pub fn decode_timestamp(value: &str) -> Option<u64> {
    let normalized = value.replace(',', ".");
    let mut parts = normalized.rsplit(':');

    let seconds_part = parts.next()?;
    let (secs, centis) = match seconds_part.split_once('.') {
        Some((s, c)) => {
            // Pad/truncate the fraction to centiseconds
            let cs: u64 = match c.len() {
                0 => 0,
                1 => c.parse::<u64>().ok()? * 10,
                _ => c[..2].parse().ok()?,
            };
            (s.parse::<u64>().ok()?, cs)
        }
        None => (seconds_part.parse().ok()?, 0),
    };
    if secs >= 60 {
        return None;
    }

    let minutes: u64 = match parts.next() {
        Some(m) => m.parse().ok()?,
        None => 0,
    };
    if minutes >= 60 {
        return None;
    }

    let hours: u64 = match parts.next() {
        Some(h) => h.parse().ok()?,
        None => 0,
    };

    Some((hours * 3600 + minutes * 60 + secs) * 1000 + centis * 10)
}

/// Convert SSA event text to plain text with italics markup.
///
/// `{\i1}`/`{\i0}` become `<i>`/`</i>`, any other override block is
/// dropped, `\N`/`\n` break lines and `\h` is a hard space. An italic
/// span left open runs to the end of the cue.
pub fn convert_text(text: &str) -> String {
    let mut result = String::with_capacity(text.len());
    let mut italic_open = false;
    let mut last = 0;

    for tag in OVERRIDE_REGEX.find_iter(text) {
        result.push_str(&text[last..tag.start()]);
        last = tag.end();

        let body = &text[tag.start()..tag.end()];
        if body.contains("\\i1") {
            if !italic_open {
                result.push_str("<i>");
                italic_open = true;
            }
        } else if body.contains("\\i0") && italic_open {
            result.push_str("</i>");
            italic_open = false;
        }
        // All other overrides (positioning, colors, fonts) are dropped
    }
    result.push_str(&text[last..]);

    if italic_open {
        result.push_str("</i>");
    }

    let flattened = result.replace("\\N", "\n").replace("\\n", "\n").replace("\\h", " ");

    let lines: Vec<&str> = flattened
        .lines()
        .map(|l| l.trim())
        .filter(|l| !l.is_empty())
        .collect();
    lines.join("\n")
}
