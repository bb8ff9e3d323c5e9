/*!
 * End-to-end conversion tests that run without the external binaries
 */

use anyhow::Result;
use std::path::Path;
use submux::app_config::Config;
use submux::app_controller::Controller;
use submux::formats::{srt, SubtitleFormat};
use submux::formats::pgs::PgsStream;
use submux::ocr::{self, MockOcr};
use crate::common::{self, simple_pgs_stream};

/// Test converting an SRT file through the controller
#[tokio::test]
async fn test_convert_withSrtInput_shouldWriteSrtOutput() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let dir = temp_dir.path().to_path_buf();
    let input = common::create_test_subtitle(&dir, "sample.srt")?;

    let controller = Controller::new_for_test()?;
    controller.run_convert(&input, Some("en"), None, false).await?;

    let output = dir.join("sample.en.srt");
    assert!(output.is_file());

    let collection = srt::read_file(&output, "en")?;
    assert_eq!(collection.entries.len(), 3);
    assert_eq!(collection.entries[0].text, "This is a test subtitle.");

    Ok(())
}

/// Test converting an SSA file yields SRT with converted markup
#[tokio::test]
async fn test_convert_withSsaInput_shouldConvertMarkup() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let dir = temp_dir.path().to_path_buf();
    let input = common::create_test_ssa(&dir, "sample.ass")?;
    let output = dir.join("converted.srt");

    let controller = Controller::new_for_test()?;
    controller
        .run_convert(&input, Some("en"), Some(output.clone()), false)
        .await?;

    let content = std::fs::read_to_string(&output)?;
    assert!(content.contains("<i>Italic line</i> and normal."));
    assert!(content.contains("First line\nSecond line"));
    assert!(content.contains("00:00:01,000 --> 00:00:04,000"));

    Ok(())
}

/// Test existing outputs are not clobbered without the force flag
#[tokio::test]
async fn test_convert_withExistingOutput_shouldRespectOverwriteGuard() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let dir = temp_dir.path().to_path_buf();
    let input = common::create_test_subtitle(&dir, "sample.srt")?;
    let output = dir.join("out.srt");
    std::fs::write(&output, "sentinel")?;

    let controller = Controller::new_for_test()?;

    // Without force the sentinel survives
    controller
        .run_convert(&input, Some("en"), Some(output.clone()), false)
        .await?;
    assert_eq!(std::fs::read_to_string(&output)?, "sentinel");

    // With force it is replaced
    controller
        .run_convert(&input, Some("en"), Some(output.clone()), true)
        .await?;
    assert!(std::fs::read_to_string(&output)?.contains("This is a test subtitle."));

    Ok(())
}

/// Test unknown inputs are rejected
#[tokio::test]
async fn test_convert_withUnknownInput_shouldFail() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let dir = temp_dir.path().to_path_buf();
    let input = common::create_test_file(&dir, "notes.txt", "not a subtitle")?;

    let controller = Controller::new_for_test()?;
    let result = controller.run_convert(&input, None, None, false).await;
    assert!(result.is_err());

    Ok(())
}

/// Test the PGS-to-SRT pipeline with a mock OCR engine
#[tokio::test]
async fn test_pgs_pipeline_withMockOcr_shouldProduceSrt() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let dir = temp_dir.path().to_path_buf();

    // Two frames worth of synthetic PGS data
    let mut data = simple_pgs_stream(1000, 2500);
    data.extend(simple_pgs_stream(4000, 6000));
    let input = common::create_binary_test_file(&dir, "subs.sup", &data)?;

    assert_eq!(SubtitleFormat::detect(&input)?, SubtitleFormat::Pgs);

    let frames = PgsStream::read_file(&input)?.into_frames();
    let engine = MockOcr::recognizing(&["Recognized line"]);
    let (collection, stats) = ocr::recognize_frames(
        &engine,
        &frames,
        &["eng".to_string()],
        &input,
        "en",
        false,
    )
    .await?;

    assert_eq!(stats.recognized, 2);

    let output = dir.join("subs.srt");
    srt::write_file(&collection, &output)?;

    let reread = srt::read_file(&output, "en")?;
    assert_eq!(reread.entries.len(), 2);
    assert_eq!(reread.entries[0].text, "Recognized line");
    assert_eq!(reread.entries[0].start_time_ms, 1000);
    assert_eq!(reread.entries[1].end_time_ms, 6000);

    Ok(())
}

/// Test merging OCR text into cue timings from another track
#[tokio::test]
async fn test_merge_workflow_withOcrText_shouldFillTimedCues() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let dir = temp_dir.path().to_path_buf();

    // Timed cues from a text track
    let input = common::create_test_subtitle(&dir, "timed.srt")?;
    let mut timed = srt::read_file(&input, "en")?;

    // Recognized text from an image track with matching start times
    let frames = PgsStream::parse(&simple_pgs_stream(1000, 4000)).into_frames();
    let engine = MockOcr::recognizing(&["Better text from OCR"]);
    let (recognized, _) = ocr::recognize_frames(
        &engine,
        &frames,
        &["eng".to_string()],
        Path::new("subs.sup"),
        "en",
        false,
    )
    .await?;

    let unmatched = timed.merge_text(&recognized);
    assert_eq!(unmatched, 0);
    assert_eq!(timed.entries[0].text, "Better text from OCR");
    // Cues without a recognized counterpart keep their text
    assert_eq!(timed.entries[1].text, "It contains multiple entries.");

    Ok(())
}

/// Test controller construction rejects invalid configuration
#[test]
fn test_controller_withInvalidConfig_shouldFail() {
    let mut config = Config::default();
    config.ocr.languages.clear();
    assert!(Controller::with_config(config).is_err());
}
