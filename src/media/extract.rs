use std::path::Path;
use std::process::Stdio;
use indicatif::ProgressBar;
use log::{debug, warn};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::process::Command;

use crate::app_config::ToolsConfig;
use crate::errors::MediaError;

// @module: Track extraction via mkvextract

/// Subtitle track extractor wrapping mkvextract
pub struct TrackExtractor<'a> {
    tools: &'a ToolsConfig,
}

impl<'a> TrackExtractor<'a> {
    pub fn new(tools: &'a ToolsConfig) -> Self {
        Self { tools }
    }

    /// Extract one track from a container into `output`.
    ///
    /// Runs `mkvextract --gui-mode tracks <file> <id>:<output>` and feeds
    /// the `#GUI#progress` lines it emits into the progress bar.
    pub async fn extract(
        &self,
        file: &Path,
        track_id: u64,
        output: &Path,
        progress: Option<&ProgressBar>,
    ) -> Result<(), MediaError> {
        if !file.is_file() {
            return Err(MediaError::FileNotFound(file.to_path_buf()));
        }

        let mut child = Command::new(&self.tools.mkvextract)
            .arg("--gui-mode")
            .arg("tracks")
            .arg(file)
            .arg(format!("{}:{}", track_id, output.display()))
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| MediaError::ToolInvocation {
                tool: self.tools.mkvextract.clone(),
                message: e.to_string(),
            })?;

        let stdout = child.stdout.take().expect("stdout was piped");
        let mut lines = BufReader::new(stdout).lines();
        let mut gui_errors: Vec<String> = Vec::new();

        let drain = async {
            while let Ok(Some(line)) = lines.next_line().await {
                if let Some(percent) = parse_progress_line(&line) {
                    if let Some(pb) = progress {
                        pb.set_position(percent.min(100));
                    }
                } else if let Some(message) = line.strip_prefix("#GUI#error ") {
                    gui_errors.push(message.to_string());
                } else if !line.starts_with("#GUI#") && !line.trim().is_empty() {
                    debug!("mkvextract: {}", line);
                }
            }
            child.wait_with_output().await
        };

        let timeout = std::time::Duration::from_secs(self.tools.extract_timeout_secs);
        let output_result = tokio::select! {
            result = drain => {
                result.map_err(|e| MediaError::ToolInvocation {
                    tool: self.tools.mkvextract.clone(),
                    message: e.to_string(),
                })?
            },
            _ = tokio::time::sleep(timeout) => {
                return Err(MediaError::ToolTimeout {
                    tool: self.tools.mkvextract.clone(),
                    seconds: self.tools.extract_timeout_secs,
                });
            }
        };

        if !output_result.status.success() || !gui_errors.is_empty() {
            let stderr = String::from_utf8_lossy(&output_result.stderr);
            let mut message = gui_errors.join("; ");
            if message.is_empty() {
                message = filter_tool_stderr(&stderr);
            }
            warn!("Track extraction failed: {}", message);
            return Err(MediaError::ToolFailed {
                tool: self.tools.mkvextract.clone(),
                message,
            });
        }

        if let Some(pb) = progress {
            pb.set_position(100);
        }
        debug!("Extracted track {} to {:?}", track_id, output);
        Ok(())
    }
}

/// Parse a `#GUI#progress N%` line into the percentage value
pub fn parse_progress_line(line: &str) -> Option<u64> {
    line.strip_prefix("#GUI#progress ")?
        .trim()
        .trim_end_matches('%')
        .parse()
        .ok()
}

/// Reduce tool stderr to its meaningful lines, stripping the version
/// banner and per-track chatter.
pub fn filter_tool_stderr(stderr: &str) -> String {
    let noise_prefixes = ["mkvextract v", "Extracting track", "Progress:", "The file"];

    let meaningful: Vec<&str> = stderr
        .lines()
        .map(|line| line.trim())
        .filter(|line| {
            !line.is_empty() && !noise_prefixes.iter().any(|p| line.starts_with(p))
        })
        .collect();

    if meaningful.is_empty() {
        "unknown extraction error (stderr was empty after filtering)".to_string()
    } else {
        meaningful.join("\n")
    }
}
