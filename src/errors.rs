/*!
 * Error types for the submux application.
 *
 * This module contains custom error types for different parts of the application,
 * using the thiserror crate for ergonomic error definitions.
 */

// Allow dead code - error types are for library consumers
#![allow(dead_code)]

use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur when probing or extracting media containers
#[derive(Error, Debug)]
pub enum MediaError {
    /// Error when an external tool could not be started
    #[error("Failed to run {tool}: {message}")]
    ToolInvocation {
        /// Name of the external binary
        tool: String,
        /// Underlying error description
        message: String,
    },

    /// Error when an external tool exited with a failure status
    #[error("{tool} failed: {message}")]
    ToolFailed {
        /// Name of the external binary
        tool: String,
        /// Filtered stderr/stdout of the failed invocation
        message: String,
    },

    /// Error when an external tool did not finish in time
    #[error("{tool} timed out after {seconds} seconds")]
    ToolTimeout {
        /// Name of the external binary
        tool: String,
        /// Timeout that was exceeded
        seconds: u64,
    },

    /// Error when container info could not be parsed
    #[error("Failed to parse container info: {0}")]
    InvalidContainerInfo(String),

    /// Error when a requested track id does not exist
    #[error("Track {0} not found in container")]
    TrackNotFound(u64),

    /// Error when no subtitle track matches the requested language
    #[error("No subtitle track matching language '{0}'")]
    NoMatchingTrack(String),

    /// Error when a track's codec has no reader
    #[error("Unsupported subtitle codec: {0}")]
    UnsupportedCodec(String),

    /// Error when the input file is missing
    #[error("Media file does not exist: {0:?}")]
    FileNotFound(PathBuf),
}

/// Errors that can occur during subtitle parsing and writing
#[derive(Error, Debug)]
pub enum SubtitleError {
    /// Error when a cue's end does not come after its start
    #[error("Invalid time range: end {end_ms} <= start {start_ms}")]
    InvalidTimeRange {
        /// Cue start in milliseconds
        start_ms: u64,
        /// Cue end in milliseconds
        end_ms: u64,
    },

    /// Error when a cue has no text after trimming
    #[error("Empty text for cue {0}")]
    EmptyText(usize),

    /// Error when a timestamp string cannot be decoded
    #[error("Invalid timestamp: {0}")]
    InvalidTimestamp(String),

    /// Error when a whole file yields no usable cues
    #[error("No valid subtitle cues found")]
    NoCues,

    /// Error when a file is not in any supported subtitle format
    #[error("Unsupported subtitle format: {0}")]
    UnsupportedFormat(String),
}

/// Errors that can occur during optical character recognition
#[derive(Error, Debug)]
pub enum OcrError {
    /// Error when the OCR engine could not be invoked
    #[error("Failed to run OCR engine: {0}")]
    Engine(String),

    /// Error when a subtitle bitmap could not be encoded for the engine
    #[error("Failed to encode subtitle image: {0}")]
    Image(String),

    /// Error when recognition yields no text for a frame
    #[error("OCR produced no text for frame {0}")]
    EmptyResult(usize),
}

/// Main application error type that wraps all other errors
#[derive(Error, Debug)]
pub enum AppError {
    /// Error from a file operation
    #[error("File error: {0}")]
    File(String),

    /// Error from container handling
    #[error("Media error: {0}")]
    Media(#[from] MediaError),

    /// Error from subtitle processing
    #[error("Subtitle error: {0}")]
    Subtitle(#[from] SubtitleError),

    /// Error from OCR
    #[error("OCR error: {0}")]
    Ocr(#[from] OcrError),

    /// Any other error
    #[error("Unknown error: {0}")]
    Unknown(String),
}

// Utility functions for error conversion
impl From<anyhow::Error> for AppError {
    fn from(error: anyhow::Error) -> Self {
        Self::Unknown(error.to_string())
    }
}

impl From<std::io::Error> for AppError {
    fn from(error: std::io::Error) -> Self {
        Self::File(error.to_string())
    }
}
