/*!
 * Tests for the error type hierarchy
 */

use std::path::PathBuf;
use submux::errors::{AppError, MediaError, OcrError, SubtitleError};

/// Test error messages are descriptive
#[test]
fn test_error_display_withTypicalErrors_shouldDescribeProblem() {
    let err = MediaError::ToolTimeout {
        tool: "mkvmerge".to_string(),
        seconds: 60,
    };
    assert_eq!(err.to_string(), "mkvmerge timed out after 60 seconds");

    let err = MediaError::UnsupportedCodec("S_VOBSUB".to_string());
    assert_eq!(err.to_string(), "Unsupported subtitle codec: S_VOBSUB");

    let err = SubtitleError::InvalidTimeRange {
        start_ms: 2000,
        end_ms: 1000,
    };
    assert_eq!(err.to_string(), "Invalid time range: end 1000 <= start 2000");

    let err = OcrError::EmptyResult(7);
    assert_eq!(err.to_string(), "OCR produced no text for frame 7");
}

/// Test wrapping into the application error
#[test]
fn test_app_error_withSourceErrors_shouldWrapThem() {
    let media: AppError = MediaError::FileNotFound(PathBuf::from("/x.mkv")).into();
    assert!(matches!(media, AppError::Media(_)));
    assert!(media.to_string().contains("/x.mkv"));

    let subtitle: AppError = SubtitleError::NoCues.into();
    assert!(matches!(subtitle, AppError::Subtitle(_)));

    let ocr: AppError = OcrError::Engine("boom".to_string()).into();
    assert!(matches!(ocr, AppError::Ocr(_)));

    let io: AppError = std::io::Error::new(std::io::ErrorKind::NotFound, "gone").into();
    assert!(matches!(io, AppError::File(_)));

    let unknown: AppError = anyhow::anyhow!("odd failure").into();
    assert!(matches!(unknown, AppError::Unknown(_)));
}
