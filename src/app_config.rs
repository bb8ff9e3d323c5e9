use anyhow::{Result, anyhow};
use serde::{Deserialize, Serialize};
use std::default::Default;
use std::path::{Path, PathBuf};

/// Application configuration module
/// This module handles the application configuration including loading,
/// validating and saving configuration settings.
/// Represents the application configuration
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Config {
    /// External tool settings
    #[serde(default)]
    pub tools: ToolsConfig,

    /// OCR settings
    #[serde(default)]
    pub ocr: OcrConfig,

    /// Override for the dump directory used for extracted tracks and
    /// OCR scratch images; defaults to the user cache directory
    #[serde(default)]
    pub dump_dir: Option<PathBuf>,

    /// Log level
    #[serde(default)]
    pub log_level: LogLevel,
}

/// Paths to the external binaries the tool shells out to
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct ToolsConfig {
    /// mkvmerge binary, used for container probing
    #[serde(default = "default_mkvmerge")]
    pub mkvmerge: String,

    /// mkvextract binary, used for track extraction
    #[serde(default = "default_mkvextract")]
    pub mkvextract: String,

    /// tesseract binary, used for OCR of image subtitles
    #[serde(default = "default_tesseract")]
    pub tesseract: String,

    /// Timeout in seconds for probe invocations
    #[serde(default = "default_probe_timeout_secs")]
    pub probe_timeout_secs: u64,

    /// Timeout in seconds for extract invocations
    #[serde(default = "default_extract_timeout_secs")]
    pub extract_timeout_secs: u64,
}

impl Default for ToolsConfig {
    fn default() -> Self {
        Self {
            mkvmerge: default_mkvmerge(),
            mkvextract: default_mkvextract(),
            tesseract: default_tesseract(),
            probe_timeout_secs: default_probe_timeout_secs(),
            extract_timeout_secs: default_extract_timeout_secs(),
        }
    }
}

/// OCR configuration
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct OcrConfig {
    /// Recognition languages, ISO 639 codes; passed to tesseract joined with '+'
    #[serde(default = "default_ocr_languages")]
    pub languages: Vec<String>,

    /// Timeout in seconds per OCR invocation
    #[serde(default = "default_ocr_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for OcrConfig {
    fn default() -> Self {
        Self {
            languages: default_ocr_languages(),
            timeout_secs: default_ocr_timeout_secs(),
        }
    }
}

/// Log verbosity level
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Error,
    Warn,
    #[default]
    Info,
    Debug,
    Trace,
}

fn default_mkvmerge() -> String {
    "mkvmerge".to_string()
}

fn default_mkvextract() -> String {
    "mkvextract".to_string()
}

fn default_tesseract() -> String {
    "tesseract".to_string()
}

fn default_probe_timeout_secs() -> u64 {
    60
}

fn default_extract_timeout_secs() -> u64 {
    600
}

fn default_ocr_timeout_secs() -> u64 {
    120
}

fn default_ocr_languages() -> Vec<String> {
    vec!["eng".to_string()]
}

impl Config {
    /// Load configuration from a JSON file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .map_err(|e| anyhow!("Failed to open config file {:?}: {}", path, e))?;
        let config: Config = serde_json::from_str(&content)
            .map_err(|e| anyhow!("Failed to parse config file {:?}: {}", path, e))?;
        Ok(config)
    }

    /// Save configuration to a JSON file
    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path.as_ref(), json)
            .map_err(|e| anyhow!("Failed to write config file {:?}: {}", path.as_ref(), e))?;
        Ok(())
    }

    /// Validate the configuration for consistency and required values
    pub fn validate(&self) -> Result<()> {
        if self.tools.mkvmerge.trim().is_empty()
            || self.tools.mkvextract.trim().is_empty()
            || self.tools.tesseract.trim().is_empty()
        {
            return Err(anyhow!("Tool binary paths must not be empty"));
        }

        if self.ocr.languages.is_empty() {
            return Err(anyhow!("At least one OCR language is required"));
        }
        for code in &self.ocr.languages {
            let _name = crate::language_utils::get_language_name(code)?;
        }

        Ok(())
    }

    /// Resolve the dump directory, creating it if needed.
    ///
    /// Falls back through the user cache dir to a local `.submux` directory
    /// when the platform offers no cache location.
    pub fn dump_dir(&self) -> Result<PathBuf> {
        let base = match &self.dump_dir {
            Some(dir) => dir.clone(),
            None => dirs::cache_dir()
                .or_else(dirs::data_local_dir)
                .map(|d| d.join("submux"))
                .unwrap_or_else(|| PathBuf::from(".submux"))
                .join("dump"),
        };
        std::fs::create_dir_all(&base)
            .map_err(|e| anyhow!("Failed to create dump directory {:?}: {}", base, e))?;
        Ok(base)
    }

    /// Remove everything below the dump directory
    pub fn clean_dump_dir(&self) -> Result<u64> {
        let dir = self.dump_dir()?;
        let mut removed = 0u64;
        for entry in std::fs::read_dir(&dir)? {
            let entry = entry?;
            let path = entry.path();
            if path.is_dir() {
                std::fs::remove_dir_all(&path)?;
            } else {
                std::fs::remove_file(&path)?;
            }
            removed += 1;
        }
        Ok(removed)
    }
}

/// Default implementation for Config
impl Default for Config {
    fn default() -> Self {
        Config {
            tools: ToolsConfig::default(),
            ocr: OcrConfig::default(),
            dump_dir: None,
            log_level: LogLevel::default(),
        }
    }
}
