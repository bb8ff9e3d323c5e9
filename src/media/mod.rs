/*!
 * Media container handling.
 *
 * This module wraps the external MKVToolNix binaries:
 * - `probe`: container and track inspection via `mkvmerge -J`
 * - `extract`: subtitle track extraction via `mkvextract --gui-mode`
 */

pub mod probe;
pub mod extract;

pub use probe::{probe, MediaInfo, TrackInfo, TrackType, media_id, select_subtitle_track};
pub use extract::TrackExtractor;
