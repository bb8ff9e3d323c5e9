/*!
 * Common test utilities for the submux test suite
 */

use std::path::PathBuf;
use std::fs;
use anyhow::Result;
use tempfile::TempDir;

/// Creates a temporary directory for test files
pub fn create_temp_dir() -> Result<TempDir> {
    Ok(TempDir::new()?)
}

/// Creates a test file with the given content in the specified directory
pub fn create_test_file(dir: &PathBuf, filename: &str, content: &str) -> Result<PathBuf> {
    let file_path = dir.join(filename);
    fs::write(&file_path, content)?;
    Ok(file_path)
}

/// Creates a test file with binary content in the specified directory
pub fn create_binary_test_file(dir: &PathBuf, filename: &str, content: &[u8]) -> Result<PathBuf> {
    let file_path = dir.join(filename);
    fs::write(&file_path, content)?;
    Ok(file_path)
}

/// Creates a sample SRT subtitle file for testing
pub fn create_test_subtitle(dir: &PathBuf, filename: &str) -> Result<PathBuf> {
    let content = r#"1
00:00:01,000 --> 00:00:04,000
This is a test subtitle.

2
00:00:05,000 --> 00:00:09,000
It contains multiple entries.

3
00:00:10,000 --> 00:00:14,000
For testing purposes.
"#;
    create_test_file(dir, filename, content)
}

/// Creates a sample SSA subtitle file for testing
pub fn create_test_ssa(dir: &PathBuf, filename: &str) -> Result<PathBuf> {
    let content = r#"[Script Info]
Title: Test script
ScriptType: v4.00+

[V4+ Styles]
Format: Name, Fontname, Fontsize
Style: Default,Arial,20

[Events]
Format: Layer, Start, End, Style, Name, MarginL, MarginR, MarginV, Effect, Text
Dialogue: 0,0:00:01.00,0:00:04.00,Default,,0,0,0,,This is a test subtitle.
Dialogue: 0,0:00:05.00,0:00:09.00,Default,,0,0,0,,{\i1}Italic line{\i0} and normal.
Dialogue: 0,0:00:10.00,0:00:14.00,Default,,0,0,0,,First line\NSecond line
"#;
    create_test_file(dir, filename, content)
}

// ============================================================================
// Synthetic PGS stream builders
// ============================================================================

/// PGS composition states
pub const STATE_NORMAL: u8 = 0x00;
pub const STATE_EPOCH_START: u8 = 0x80;

/// Wrap a payload in a PGS segment with the standard 13-byte header
pub fn pgs_segment(pts_ms: u64, seg_type: u8, payload: &[u8]) -> Vec<u8> {
    let pts = (pts_ms * 90) as u32;
    let mut out = Vec::with_capacity(13 + payload.len());
    out.extend_from_slice(b"PG");
    out.extend_from_slice(&pts.to_be_bytes());
    out.extend_from_slice(&0u32.to_be_bytes()); // decoding timestamp, unused
    out.push(seg_type);
    out.extend_from_slice(&(payload.len() as u16).to_be_bytes());
    out.extend_from_slice(payload);
    out
}

/// Build a presentation composition payload.
///
/// `objects` entries are (object_id, window_id, x, y).
pub fn pcs_payload(
    width: u16,
    height: u16,
    comp_num: u16,
    state: u8,
    palette_id: u8,
    objects: &[(u16, u8, u16, u16)],
) -> Vec<u8> {
    let mut out = Vec::new();
    out.extend_from_slice(&width.to_be_bytes());
    out.extend_from_slice(&height.to_be_bytes());
    out.push(0x10); // frame rate, always 0x10
    out.extend_from_slice(&comp_num.to_be_bytes());
    out.push(state);
    out.push(0x00); // no palette-only update
    out.push(palette_id);
    out.push(objects.len() as u8);
    for (object_id, window_id, x, y) in objects {
        out.extend_from_slice(&object_id.to_be_bytes());
        out.push(*window_id);
        out.push(0x00); // no cropping
        out.extend_from_slice(&x.to_be_bytes());
        out.extend_from_slice(&y.to_be_bytes());
    }
    out
}

/// Build a window definition payload from (id, x, y, w, h) entries
pub fn wds_payload(windows: &[(u8, u16, u16, u16, u16)]) -> Vec<u8> {
    let mut out = vec![windows.len() as u8];
    for (id, x, y, w, h) in windows {
        out.push(*id);
        out.extend_from_slice(&x.to_be_bytes());
        out.extend_from_slice(&y.to_be_bytes());
        out.extend_from_slice(&w.to_be_bytes());
        out.extend_from_slice(&h.to_be_bytes());
    }
    out
}

/// Build a palette definition payload from (index, y, cr, cb, alpha) entries
pub fn pds_payload(id: u8, entries: &[(u8, u8, u8, u8, u8)]) -> Vec<u8> {
    let mut out = vec![id, 0x00];
    for (index, y, cr, cb, alpha) in entries {
        out.push(*index);
        out.push(*y);
        out.push(*cr);
        out.push(*cb);
        out.push(*alpha);
    }
    out
}

/// Build a single-fragment object definition payload
pub fn ods_payload(id: u16, width: u16, height: u16, rle: &[u8]) -> Vec<u8> {
    let mut out = Vec::new();
    out.extend_from_slice(&id.to_be_bytes());
    out.push(0x00); // version
    out.push(0xC0); // first and last fragment
    let declared = (rle.len() + 4) as u32;
    out.extend_from_slice(&declared.to_be_bytes()[1..4]); // 24-bit length
    out.extend_from_slice(&width.to_be_bytes());
    out.extend_from_slice(&height.to_be_bytes());
    out.extend_from_slice(rle);
    out
}

/// RLE encoding of a solid rectangle of one palette color.
///
/// Width must stay below 0x40 so a short colored run covers a row.
pub fn solid_rle(width: u8, height: u16, color_index: u8) -> Vec<u8> {
    assert!(width < 0x40, "short colored runs encode at most 63 pixels");
    let mut out = Vec::new();
    for _ in 0..height {
        out.extend_from_slice(&[0x00, 0x80 | width, color_index]);
        out.extend_from_slice(&[0x00, 0x00]); // end of line
    }
    out
}

/// A minimal well-formed PGS stream with one subtitle frame.
///
/// The frame shows a 16x4 solid white object from `start_ms` to `end_ms`
/// on a 320x240 screen.
pub fn simple_pgs_stream(start_ms: u64, end_ms: u64) -> Vec<u8> {
    let mut data = Vec::new();

    // Epoch start display set
    data.extend(pgs_segment(
        start_ms,
        0x16,
        &pcs_payload(320, 240, 1, STATE_EPOCH_START, 0, &[(1, 0, 100, 200)]),
    ));
    data.extend(pgs_segment(start_ms, 0x17, &wds_payload(&[(0, 100, 200, 16, 4)])));
    // Palette entry 1: white, opaque (Y=235, Cr=128, Cb=128)
    data.extend(pgs_segment(start_ms, 0x14, &pds_payload(0, &[(1, 235, 128, 128, 255)])));
    data.extend(pgs_segment(start_ms, 0x15, &ods_payload(1, 16, 4, &solid_rle(16, 4, 1))));
    data.extend(pgs_segment(start_ms, 0x80, &[]));

    // Clear frame ends the cue
    data.extend(pgs_segment(
        end_ms,
        0x16,
        &pcs_payload(320, 240, 2, STATE_NORMAL, 0, &[]),
    ));
    data.extend(pgs_segment(end_ms, 0x17, &wds_payload(&[])));
    data.extend(pgs_segment(end_ms, 0x80, &[]));

    data
}
