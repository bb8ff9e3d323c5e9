/*!
 * Tests for SSA/ASS event parsing
 */

use anyhow::Result;
use submux::formats::ssa;
use crate::common;

/// Test parsing a standard events section
#[test]
fn test_parse_str_withValidEvents_shouldReturnEntries() {
    let content = "[Events]\n\
                   Format: Layer, Start, End, Style, Name, MarginL, MarginR, MarginV, Effect, Text\n\
                   Dialogue: 0,0:00:01.00,0:00:04.50,Default,,0,0,0,,Hello there.\n\
                   Dialogue: 0,0:00:05.25,0:00:08.00,Default,,0,0,0,,Second event.\n";

    let entries = ssa::parse_str(content).unwrap();

    assert_eq!(entries.len(), 2);
    assert_eq!(entries[0].start_time_ms, 1000);
    assert_eq!(entries[0].end_time_ms, 4500);
    assert_eq!(entries[0].text, "Hello there.");
    assert_eq!(entries[1].start_time_ms, 5250);
    assert_eq!(entries[1].seq_num, 2);
}

/// Test that the Format line drives field positions
#[test]
fn test_parse_str_withReorderedFormat_shouldMapFields() {
    let content = "[Events]\n\
                   Format: Start, End, Text\n\
                   Dialogue: 0:00:02.00,0:00:03.00,Short format works.\n";

    let entries = ssa::parse_str(content).unwrap();

    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].start_time_ms, 2000);
    assert_eq!(entries[0].end_time_ms, 3000);
    assert_eq!(entries[0].text, "Short format works.");
}

/// Test that commas in the text field are preserved
#[test]
fn test_parse_str_withCommasInText_shouldKeepText() {
    let content = "[Events]\n\
                   Format: Layer, Start, End, Style, Name, MarginL, MarginR, MarginV, Effect, Text\n\
                   Dialogue: 0,0:00:01.00,0:00:02.00,Default,,0,0,0,,One, two, three.\n";

    let entries = ssa::parse_str(content).unwrap();
    assert_eq!(entries[0].text, "One, two, three.");
}

/// Test dialogue lines before any format line are dropped
#[test]
fn test_parse_str_withDialogueBeforeFormat_shouldSkip() {
    let content = "[Events]\n\
                   Dialogue: 0,0:00:01.00,0:00:02.00,Default,,0,0,0,,Orphan.\n\
                   Format: Layer, Start, End, Style, Name, MarginL, MarginR, MarginV, Effect, Text\n\
                   Dialogue: 0,0:00:03.00,0:00:04.00,Default,,0,0,0,,Counted.\n";

    let entries = ssa::parse_str(content).unwrap();

    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].text, "Counted.");
}

/// Test lines outside the [Events] section are ignored
#[test]
fn test_parse_str_withOtherSections_shouldIgnoreThem() {
    let content = "[Script Info]\n\
                   Title: Irrelevant\n\
                   [V4+ Styles]\n\
                   Format: Name, Fontname\n\
                   Style: Default,Arial\n\
                   [Events]\n\
                   Format: Start, End, Text\n\
                   Dialogue: 0:00:01.00,0:00:02.00,Only this counts.\n";

    let entries = ssa::parse_str(content).unwrap();
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].text, "Only this counts.");
}

/// Test italics override conversion
#[test]
fn test_convert_text_withItalicOverrides_shouldEmitMarkup() {
    assert_eq!(
        ssa::convert_text(r"{\i1}All italic{\i0}"),
        "<i>All italic</i>"
    );
    assert_eq!(
        ssa::convert_text(r"Plain and {\i1}slanted{\i0} mixed"),
        "Plain and <i>slanted</i> mixed"
    );
    // An unclosed span runs to the end of the cue
    assert_eq!(ssa::convert_text(r"{\i1}Never closed"), "<i>Never closed</i>");
}

/// Test non-italic overrides are stripped
#[test]
fn test_convert_text_withStyleOverrides_shouldStripThem() {
    assert_eq!(
        ssa::convert_text(r"{\pos(10,20)\b1}Positioned text"),
        "Positioned text"
    );
    assert_eq!(ssa::convert_text(r"{\fad(200,200)}Fade in"), "Fade in");
}

/// Test line break and hard space escapes
#[test]
fn test_convert_text_withEscapes_shouldBreakLines() {
    assert_eq!(ssa::convert_text(r"First\NSecond"), "First\nSecond");
    assert_eq!(ssa::convert_text(r"First\nSecond"), "First\nSecond");
    assert_eq!(ssa::convert_text(r"Hard\hspace"), "Hard space");
}

/// Test SSA timestamp decoding
#[test]
fn test_decode_timestamp_withValidValues_shouldReturnMs() {
    assert_eq!(ssa::decode_timestamp("0:00:01.00"), Some(1000));
    assert_eq!(ssa::decode_timestamp("1:02:03.45"), Some(3_723_450));
    assert_eq!(ssa::decode_timestamp("0:00:00.5"), Some(500));
    // Comma as decimal separator is tolerated
    assert_eq!(ssa::decode_timestamp("0:00:02,50"), Some(2500));
    // Bare seconds
    assert_eq!(ssa::decode_timestamp("42"), Some(42_000));
}

/// Test SSA timestamp decoding failures
#[test]
fn test_decode_timestamp_withInvalidValues_shouldReturnNone() {
    assert_eq!(ssa::decode_timestamp("0:61:00.00"), None);
    assert_eq!(ssa::decode_timestamp("0:00:61.00"), None);
    assert_eq!(ssa::decode_timestamp("abc"), None);
}

/// Test reading a full SSA file from disk
#[test]
fn test_read_file_withSampleScript_shouldConvertEvents() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let dir = temp_dir.path().to_path_buf();
    let input = common::create_test_ssa(&dir, "sample.ass")?;

    let collection = ssa::read_file(&input, "en")?;

    assert_eq!(collection.entries.len(), 3);
    assert_eq!(collection.entries[0].text, "This is a test subtitle.");
    assert_eq!(collection.entries[1].text, "<i>Italic line</i> and normal.");
    assert_eq!(collection.entries[2].text, "First line\nSecond line");
    assert_eq!(collection.entries[2].start_time_ms, 10_000);

    Ok(())
}
