use std::path::PathBuf;
use async_trait::async_trait;
use image::RgbaImage;
use log::{debug, error};
use tokio::process::Command;
use uuid::Uuid;

use crate::app_config::{OcrConfig, ToolsConfig};
use crate::errors::OcrError;
use crate::language_utils;
use crate::ocr::OcrEngine;

// @module: Tesseract OCR wrapper

/// OCR engine shelling out to the tesseract binary.
///
/// Each frame is written as a PNG into the scratch directory under a
/// random name, recognized with `tesseract <png> - -l <langs>`, and the
/// file is removed again.
pub struct TesseractOcr {
    binary: String,
    timeout_secs: u64,
    scratch_dir: PathBuf,
}

impl TesseractOcr {
    pub fn new(tools: &ToolsConfig, ocr: &OcrConfig, scratch_dir: PathBuf) -> Self {
        Self {
            binary: tools.tesseract.clone(),
            timeout_secs: ocr.timeout_secs,
            scratch_dir,
        }
    }

    /// Check that the tesseract binary can be invoked
    pub async fn check_availability(&self) -> Result<(), OcrError> {
        let output = Command::new(&self.binary)
            .arg("--version")
            .output()
            .await
            .map_err(|e| OcrError::Engine(format!("{} not found: {}", self.binary, e)))?;

        if output.status.success() {
            Ok(())
        } else {
            Err(OcrError::Engine(format!(
                "{} version check failed",
                self.binary
            )))
        }
    }

    async fn run_tesseract(&self, file: &PathBuf, lang_arg: &str) -> Result<String, OcrError> {
        let ocr_future = Command::new(&self.binary)
            .arg(file)
            .arg("-")
            .arg("-l")
            .arg(lang_arg)
            .output();

        let timeout = std::time::Duration::from_secs(self.timeout_secs);
        let output = tokio::select! {
            result = ocr_future => {
                result.map_err(|e| OcrError::Engine(format!(
                    "Failed to execute {}: {}", self.binary, e
                )))?
            },
            _ = tokio::time::sleep(timeout) => {
                return Err(OcrError::Engine(format!(
                    "{} timed out after {} seconds", self.binary, self.timeout_secs
                )));
            }
        };

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            error!("tesseract failed: {}", stderr.trim());
            return Err(OcrError::Engine(stderr.trim().to_string()));
        }

        Ok(String::from_utf8_lossy(&output.stdout).to_string())
    }
}

#[async_trait]
impl OcrEngine for TesseractOcr {
    async fn recognize(
        &self,
        index: usize,
        image: &RgbaImage,
        languages: &[String],
    ) -> Result<Vec<String>, OcrError> {
        let lang_arg = language_utils::tesseract_language_arg(languages)
            .map_err(|e| OcrError::Engine(e.to_string()))?;

        let tmp_file = self.scratch_dir.join(format!("{}.png", Uuid::new_v4()));
        image
            .save(&tmp_file)
            .map_err(|e| OcrError::Image(e.to_string()))?;

        let result = self.run_tesseract(&tmp_file, &lang_arg).await;

        if let Err(e) = tokio::fs::remove_file(&tmp_file).await {
            debug!("Could not remove scratch image {:?}: {}", tmp_file, e);
        }

        let text = result?;
        debug!("Frame {} recognized, {} bytes of text", index, text.len());
        Ok(postprocess(&text))
    }
}

/// Clean up raw tesseract output.
///
/// Lines are trimmed and empty lines dropped. Vertical bars are replaced
/// with capital I, the most common misrecognition in subtitle typefaces.
pub fn postprocess(text: &str) -> Vec<String> {
    text.replace('|', "I")
        .lines()
        .map(|l| l.trim())
        .filter(|l| !l.is_empty())
        .map(|l| l.to_string())
        .collect()
}
