use std::path::{Path, PathBuf};
use log::{error, debug};
use serde_json::Value;
use sha2::{Digest, Sha256};
use tokio::process::Command;

use crate::app_config::ToolsConfig;
use crate::errors::MediaError;
use crate::formats::SubtitleFormat;
use crate::language_utils;

// @module: Container probing via mkvmerge

/// Track type as reported by mkvmerge
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrackType {
    Video,
    Audio,
    Subtitles,
    Other,
}

impl TrackType {
    fn from_str(value: &str) -> Self {
        match value {
            "video" => Self::Video,
            "audio" => Self::Audio,
            "subtitles" => Self::Subtitles,
            _ => Self::Other,
        }
    }
}

impl std::fmt::Display for TrackType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Video => write!(f, "video"),
            Self::Audio => write!(f, "audio"),
            Self::Subtitles => write!(f, "subtitles"),
            Self::Other => write!(f, "other"),
        }
    }
}

/// Information about a single track in a container
#[derive(Debug, Clone)]
pub struct TrackInfo {
    /// Track id as used by mkvextract
    pub id: u64,
    /// Track type
    pub track_type: TrackType,
    /// Human-readable codec name
    pub codec: String,
    /// Matroska codec id, e.g. "S_HDMV/PGS"
    pub codec_id: String,
    /// Track language (usually ISO 639-2/B) if tagged
    pub language: Option<String>,
    /// Track name if tagged
    pub track_name: Option<String>,
    /// Default track flag
    pub default: bool,
    /// Forced track flag
    pub forced: bool,
    /// Enabled track flag
    pub enabled: bool,
}

impl TrackInfo {
    /// Subtitle format of the track, when it is a supported subtitle codec
    pub fn subtitle_format(&self) -> Option<SubtitleFormat> {
        if self.track_type != TrackType::Subtitles {
            return None;
        }
        SubtitleFormat::from_codec_id(&self.codec_id)
    }
}

/// Parsed container information from `mkvmerge -J`
#[derive(Debug)]
pub struct MediaInfo {
    /// The probed file
    pub file: PathBuf,
    /// Container type name, e.g. "Matroska"
    pub container_type: String,
    /// Whether mkvmerge recognized the container
    pub supported: bool,
    /// All tracks in the container
    pub tracks: Vec<TrackInfo>,
    /// Raw probe output, kept for the info dump
    pub raw: Value,
}

impl MediaInfo {
    /// Parse the JSON produced by `mkvmerge -J`
    pub fn from_json(file: &Path, json: &str) -> Result<Self, MediaError> {
        let value: Value = serde_json::from_str(json)
            .map_err(|e| MediaError::InvalidContainerInfo(e.to_string()))?;

        let container = value.get("container");
        let container_type = container
            .and_then(|c| c.get("type"))
            .and_then(|t| t.as_str())
            .unwrap_or("unknown")
            .to_string();
        let supported = container
            .and_then(|c| c.get("supported"))
            .and_then(|s| s.as_bool())
            .unwrap_or(false);

        let mut tracks = Vec::new();
        if let Some(entries) = value.get("tracks").and_then(|t| t.as_array()) {
            for entry in entries {
                let Some(id) = entry.get("id").and_then(|v| v.as_u64()) else {
                    continue;
                };
                let props = entry.get("properties");
                let prop_str = |key: &str| -> Option<String> {
                    props
                        .and_then(|p| p.get(key))
                        .and_then(|v| v.as_str())
                        .map(|s| s.to_string())
                };
                let prop_bool = |key: &str| -> bool {
                    props
                        .and_then(|p| p.get(key))
                        .and_then(|v| v.as_bool())
                        .unwrap_or(false)
                };

                tracks.push(TrackInfo {
                    id,
                    track_type: TrackType::from_str(
                        entry.get("type").and_then(|v| v.as_str()).unwrap_or(""),
                    ),
                    codec: entry
                        .get("codec")
                        .and_then(|v| v.as_str())
                        .unwrap_or("Unknown")
                        .to_string(),
                    codec_id: prop_str("codec_id").unwrap_or_else(|| "NONE".to_string()),
                    language: prop_str("language").filter(|l| l != "und"),
                    track_name: prop_str("track_name"),
                    default: prop_bool("default_track"),
                    forced: prop_bool("forced_track"),
                    enabled: prop_bool("enabled_track"),
                });
            }
        }

        Ok(Self {
            file: file.to_path_buf(),
            container_type,
            supported,
            tracks,
            raw: value,
        })
    }

    /// All subtitle tracks in the container
    pub fn subtitle_tracks(&self) -> Vec<&TrackInfo> {
        self.tracks
            .iter()
            .filter(|t| t.track_type == TrackType::Subtitles)
            .collect()
    }

    /// Look up a track by id
    pub fn track(&self, id: u64) -> Option<&TrackInfo> {
        self.tracks.iter().find(|t| t.id == id)
    }

    /// Stable identity for dump files belonging to this media file
    pub fn id(&self) -> String {
        media_id(&self.file)
    }
}

/// Probe a media container with mkvmerge
pub async fn probe(tools: &ToolsConfig, path: &Path) -> Result<MediaInfo, MediaError> {
    if !path.is_file() {
        return Err(MediaError::FileNotFound(path.to_path_buf()));
    }

    debug!("Probing container: {:?}", path);
    let probe_future = Command::new(&tools.mkvmerge)
        .arg("-J")
        .arg(path)
        .output();

    let timeout = std::time::Duration::from_secs(tools.probe_timeout_secs);
    let output = tokio::select! {
        result = probe_future => {
            result.map_err(|e| MediaError::ToolInvocation {
                tool: tools.mkvmerge.clone(),
                message: e.to_string(),
            })?
        },
        _ = tokio::time::sleep(timeout) => {
            return Err(MediaError::ToolTimeout {
                tool: tools.mkvmerge.clone(),
                seconds: tools.probe_timeout_secs,
            });
        }
    };

    // mkvmerge reports problems inside the JSON (errors/warnings arrays)
    // and still exits non-zero for unreadable files
    let stdout = String::from_utf8_lossy(&output.stdout);
    if !output.status.success() && stdout.trim().is_empty() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        error!("mkvmerge probe failed: {}", stderr);
        return Err(MediaError::ToolFailed {
            tool: tools.mkvmerge.clone(),
            message: stderr.trim().to_string(),
        });
    }

    MediaInfo::from_json(path, &stdout)
}

/// Stable identity for a media path, used to key dump files
pub fn media_id(path: &Path) -> String {
    let canonical = path
        .canonicalize()
        .unwrap_or_else(|_| path.to_path_buf());
    let mut hasher = Sha256::new();
    hasher.update(canonical.to_string_lossy().as_bytes());
    format!("{:x}", hasher.finalize())
}

/// Select a subtitle track by preferred language.
///
/// Preference order: exact language match, language name mentioned in the
/// track name, an English track, the default-flagged track, the first
/// subtitle track.
pub fn select_subtitle_track<'a>(
    tracks: &[&'a TrackInfo],
    preferred_language: Option<&str>,
) -> Option<&'a TrackInfo> {
    if tracks.is_empty() {
        return None;
    }

    if let Some(preferred) = preferred_language {
        for &track in tracks {
            if let Some(track_lang) = &track.language {
                if language_utils::language_codes_match(track_lang, preferred) {
                    return Some(track);
                }
            }

            // Also check the track name for a language mention
            if let Some(name) = &track.track_name {
                let name_lower = name.to_lowercase();
                if let Ok(pref_name) = language_utils::get_language_name(preferred) {
                    if name_lower.contains(&pref_name.to_lowercase()) {
                        return Some(track);
                    }
                }
                if name_lower.contains(&preferred.to_lowercase()) {
                    return Some(track);
                }
            }
        }

        // Fall back to English when the preferred language is absent
        if !language_utils::language_codes_match(preferred, "en") {
            for &track in tracks {
                if let Some(lang) = &track.language {
                    if language_utils::language_codes_match(lang, "en") {
                        return Some(track);
                    }
                }
                if let Some(name) = &track.track_name {
                    if name.to_lowercase().contains("english") {
                        return Some(track);
                    }
                }
            }
        }
    }

    if let Some(&track) = tracks.iter().find(|t| t.default) {
        return Some(track);
    }

    tracks.first().copied()
}
