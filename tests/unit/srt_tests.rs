/*!
 * Tests for SRT reading and writing
 */

use anyhow::Result;
use submux::formats::srt;
use submux::subtitle_processor::SubtitleEntry;
use crate::common;

/// Test parsing a well-formed SRT document
#[test]
fn test_parse_str_withValidContent_shouldReturnEntries() {
    let content = "1\n00:00:01,000 --> 00:00:04,000\nFirst subtitle.\n\n\
                   2\n00:00:05,500 --> 00:00:09,000\nSecond line one\nSecond line two\n";

    let entries = srt::parse_str(content).unwrap();

    assert_eq!(entries.len(), 2);
    assert_eq!(entries[0].start_time_ms, 1000);
    assert_eq!(entries[0].end_time_ms, 4000);
    assert_eq!(entries[0].text, "First subtitle.");
    assert_eq!(entries[1].start_time_ms, 5500);
    assert_eq!(entries[1].text, "Second line one\nSecond line two");
}

/// Test that malformed blocks are skipped, not fatal
#[test]
fn test_parse_str_withMalformedBlock_shouldSkipAndContinue() {
    let content = "1\n00:00:01,000 --> 00:00:04,000\nGood entry.\n\n\
                   2\n00:00:06,000 --> 00:00:05,000\nEnd before start.\n\n\
                   3\n00:00:10,000 --> 00:00:12,000\nAnother good entry.\n";

    let entries = srt::parse_str(content).unwrap();

    assert_eq!(entries.len(), 2);
    assert_eq!(entries[0].text, "Good entry.");
    assert_eq!(entries[1].text, "Another good entry.");
}

/// Test parsing content with a UTF-8 BOM
#[test]
fn test_parse_str_withByteOrderMark_shouldParse() {
    let content = "\u{feff}1\n00:00:01,000 --> 00:00:02,000\nWith BOM.\n";
    let entries = srt::parse_str(content).unwrap();
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].text, "With BOM.");
}

/// Test that fully empty content is an error
#[test]
fn test_parse_str_withNoEntries_shouldFail() {
    assert!(srt::parse_str("").is_err());
    assert!(srt::parse_str("not a subtitle at all\n").is_err());
}

/// Test italics markup survives a parse
#[test]
fn test_parse_str_withItalicsMarkup_shouldPreserveTags() {
    let content = "1\n00:00:01,000 --> 00:00:02,000\n<i>Emphasis</i> kept.\n";
    let entries = srt::parse_str(content).unwrap();
    assert_eq!(entries[0].text, "<i>Emphasis</i> kept.");
}

/// Test rendering renumbers and terminates blocks
#[test]
fn test_render_withValidEntries_shouldNumberSequentially() {
    let entries = vec![
        SubtitleEntry::new(10, 1000, 2000, "One".to_string()),
        SubtitleEntry::new(20, 3000, 4000, "Two".to_string()),
    ];

    let output = srt::render(&entries);

    assert!(output.starts_with("1\n00:00:01,000 --> 00:00:02,000\nOne\n\n"));
    assert!(output.contains("2\n00:00:03,000 --> 00:00:04,000\nTwo\n\n"));
    assert!(output.ends_with("\n"));
}

/// Test writer skips empty and out-of-order cues
#[test]
fn test_render_withBadEntries_shouldSkipThem() {
    let entries = vec![
        SubtitleEntry::new(1, 5000, 6000, "Starts late".to_string()),
        // Out of order relative to the previous cue
        SubtitleEntry::new(2, 1000, 2000, "Too early".to_string()),
        // No text
        SubtitleEntry::new(3, 7000, 8000, "  ".to_string()),
        SubtitleEntry::new(4, 9000, 9500, "Final".to_string()),
    ];

    let output = srt::render(&entries);

    assert!(output.contains("Starts late"));
    assert!(!output.contains("Too early"));
    assert!(output.contains("Final"));
    // Written cues get fresh sequential numbers
    assert!(output.contains("2\n00:00:09,000 --> 00:00:09,500\nFinal"));
}

/// Test file round-trip through the reader and writer
#[test]
fn test_read_write_roundtrip_withSampleFile_shouldPreserveCues() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let dir = temp_dir.path().to_path_buf();
    let input = common::create_test_subtitle(&dir, "sample.srt")?;

    let collection = srt::read_file(&input, "en")?;
    assert_eq!(collection.entries.len(), 3);
    assert_eq!(collection.language, "en");

    let output = dir.join("out.srt");
    srt::write_file(&collection, &output)?;

    let reread = srt::read_file(&output, "en")?;
    assert_eq!(reread.entries.len(), 3);
    assert_eq!(reread.entries[0].text, "This is a test subtitle.");
    assert_eq!(reread.entries[2].end_time_ms, 14_000);

    Ok(())
}
