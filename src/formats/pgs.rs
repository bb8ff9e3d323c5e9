/*!
 * Presentation Graphics Stream (PGS) parsing and rendering.
 *
 * PGS is the image-based subtitle format used on Blu-ray discs and carried
 * in Matroska as `S_HDMV/PGS`. A stream is a sequence of segments, each
 * with a 13-byte header (magic "PG", 90 kHz presentation timestamp, type,
 * payload size). Segments group into display sets: one presentation
 * composition (PCS) plus the windows, palettes and objects it references,
 * terminated by an END segment.
 *
 * Reference layout:
 * https://blog.thescorpius.com/index.php/2017/07/15/presentation-graphic-stream-sup-files-bluray-subtitle-format/
 */

use std::collections::HashMap;
use std::path::Path;
use anyhow::{Result, Context};
use bytes::Buf;
use image::{Rgba, RgbaImage};
use log::{warn, debug};

// Segment type bytes
const SEG_PDS: u8 = 0x14;
const SEG_ODS: u8 = 0x15;
const SEG_PCS: u8 = 0x16;
const SEG_WDS: u8 = 0x17;
const SEG_END: u8 = 0x80;

// Object definition sequence flags
const SEQ_LAST: u8 = 0x40;
const SEQ_FIRST: u8 = 0x80;

/// Background fill for rendered frames, dark neutral gray
const IMAGE_FILL: Rgba<u8> = Rgba([0x24, 0x24, 0x24, 0xff]);

/// Margin kept around the composed objects when cropping
const CROP_MARGIN: u32 = 20;

/// Composition state of a presentation composition segment
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompositionState {
    /// Incremental update of the current composition
    Normal,
    /// Refresh point for decoders joining mid-stream
    AcquisitionPoint,
    /// Start of a new composition (new subtitle frame)
    EpochStart,
}

impl CompositionState {
    fn from_byte(value: u8) -> Option<Self> {
        match value {
            0x00 => Some(Self::Normal),
            0x40 => Some(Self::AcquisitionPoint),
            0x80 => Some(Self::EpochStart),
            _ => None,
        }
    }
}

/// One entry in the composition object list of a PCS
#[derive(Debug, Clone, Copy)]
pub struct CompositionObject {
    /// Object definition this entry draws
    pub object_id: u16,
    /// Window the object is placed in
    pub window_id: u8,
    /// Horizontal position on screen
    pub x: u16,
    /// Vertical position on screen
    pub y: u16,
}

/// Presentation Composition Segment
///
/// Composes a sub picture: screen size, composition number and state, and
/// the list of objects to draw.
#[derive(Debug, Clone)]
pub struct PresentationComposition {
    pub width: u16,
    pub height: u16,
    pub composition_number: u16,
    pub state: CompositionState,
    pub palette_update: bool,
    pub palette_id: u8,
    pub objects: Vec<CompositionObject>,
}

impl PresentationComposition {
    /// Parse a PCS payload. Length is 11 + n*8 (plus 8 for cropped entries).
    fn parse(data: &[u8]) -> Option<Self> {
        if data.len() < 11 || data.len() % 8 != 3 {
            return None;
        }

        let mut buf = data;
        let width = buf.get_u16();
        let height = buf.get_u16();
        let _frame_rate = buf.get_u8();
        let composition_number = buf.get_u16();
        let state = CompositionState::from_byte(buf.get_u8())?;
        let palette_update = buf.get_u8() == 0x80;
        let palette_id = buf.get_u8();
        let declared_count = buf.get_u8() as usize;

        // Composition entries also carry cropping information, which is
        // skipped; the crop flag widens the record from 8 to 16 bytes.
        let mut objects = Vec::with_capacity(declared_count);
        while buf.remaining() >= 8 {
            let object_id = buf.get_u16();
            let window_id = buf.get_u8();
            let crop_flag = buf.get_u8();
            let x = buf.get_u16();
            let y = buf.get_u16();
            if crop_flag == 0x40 {
                if buf.remaining() < 8 {
                    break;
                }
                buf.advance(8);
            }
            objects.push(CompositionObject {
                object_id,
                window_id,
                x,
                y,
            });
        }

        if objects.len() != declared_count {
            debug!(
                "Composition {} declares {} objects, parsed {}",
                composition_number,
                declared_count,
                objects.len()
            );
        }

        Some(Self {
            width,
            height,
            composition_number,
            state,
            palette_update,
            palette_id,
            objects,
        })
    }
}

/// One window rectangle from a Window Definition Segment
#[derive(Debug, Clone, Copy)]
pub struct WindowRect {
    pub x: u16,
    pub y: u16,
    pub width: u16,
    pub height: u16,
}

/// Parse a WDS payload into (id, rect) pairs. Length is 1 + n*9.
fn parse_windows(data: &[u8]) -> Option<Vec<(u8, WindowRect)>> {
    if data.is_empty() || data.len() % 9 != 1 {
        return None;
    }

    let mut buf = &data[1..];
    let mut windows = Vec::with_capacity(data[0] as usize);
    while buf.remaining() >= 9 {
        let id = buf.get_u8();
        windows.push((
            id,
            WindowRect {
                x: buf.get_u16(),
                y: buf.get_u16(),
                width: buf.get_u16(),
                height: buf.get_u16(),
            },
        ));
    }
    Some(windows)
}

/// Palette Definition Segment
///
/// Defines up to 256 YCrCbA palette entries for color conversion.
#[derive(Debug, Clone)]
pub struct PaletteDefinition {
    pub id: u8,
    pub version: u8,
    entries: Vec<u8>,
}

impl PaletteDefinition {
    /// Parse a PDS payload. Length is 2 + n*5.
    fn parse(data: &[u8]) -> Option<Self> {
        if data.len() < 7 || data.len() % 5 != 2 {
            return None;
        }
        Some(Self {
            id: data[0],
            version: data[1],
            entries: data[2..].to_vec(),
        })
    }

    /// Generate a 256-color RGBA palette from the entries.
    ///
    /// YCrCb conversion uses the BT.709 matrix with Y range 16-235 and
    /// Cb/Cr range 16-240. Fully transparent entries and undefined indices
    /// keep the background fill.
    pub fn palette(&self) -> [[u8; 4]; 256] {
        let fill = IMAGE_FILL.0;
        let mut palette = [fill; 256];

        for chunk in self.entries.chunks_exact(5) {
            let alpha = chunk[4];
            if alpha == 0 {
                continue;
            }
            let y = chunk[1] as f32 - 16.0;
            let cr = chunk[2] as f32 - 128.0;
            let cb = chunk[3] as f32 - 128.0;
            let r = (1.164 * y + 1.793 * cr).round().clamp(0.0, 255.0) as u8;
            let g = (1.164 * y - 0.213 * cb - 0.533 * cr).round().clamp(0.0, 255.0) as u8;
            let b = (1.164 * y + 2.112 * cb).round().clamp(0.0, 255.0) as u8;
            palette[chunk[0] as usize] = [r, g, b, alpha];
        }

        palette
    }
}

/// Object Definition Segment
///
/// Carries the run-length-encoded bitmap of one graphics object, possibly
/// split across several consecutive fragments.
#[derive(Debug, Clone)]
pub struct ObjectDefinition {
    pub id: u16,
    pub version: u8,
    pub sequence: u8,
    /// Size of the full image; only present on first fragments
    pub size: Option<(u16, u16)>,
    /// Declared RLE data length, minus the 4-byte size prefix; only
    /// present on first fragments
    pub declared_len: Option<usize>,
    rle: Vec<u8>,
}

impl ObjectDefinition {
    /// Parse an ODS payload. The first fragment has an 11-byte header
    /// (id, version, sequence, 24-bit data length, width, height); pure
    /// continuation fragments repeat only the first four bytes.
    fn parse(data: &[u8]) -> Option<Self> {
        if data.len() < 11 {
            return None;
        }

        let mut buf = data;
        let id = buf.get_u16();
        let version = buf.get_u8();
        let sequence = buf.get_u8();

        if sequence & SEQ_FIRST == SEQ_FIRST {
            let declared = ((buf.get_u8() as usize) << 16 | buf.get_u16() as usize)
                .saturating_sub(4);
            let width = buf.get_u16();
            let height = buf.get_u16();
            Some(Self {
                id,
                version,
                sequence,
                size: Some((width, height)),
                declared_len: Some(declared),
                rle: data[11..].to_vec(),
            })
        } else {
            Some(Self {
                id,
                version,
                sequence,
                size: None,
                declared_len: None,
                rle: data[4..].to_vec(),
            })
        }
    }

    /// True when this fragment closes its sequence
    pub fn is_last(&self) -> bool {
        self.sequence & SEQ_LAST == SEQ_LAST
    }
}

/// One display set: a presentation composition and the segments that
/// belong to it, collected up to the END segment.
#[derive(Debug)]
pub struct DisplaySet {
    /// Presentation timestamp, 90 kHz clock
    pub pts: u32,
    pub pcs: PresentationComposition,
    windows: HashMap<u8, WindowRect>,
    palettes: HashMap<u8, PaletteDefinition>,
    objects: HashMap<u16, Vec<ObjectDefinition>>,
}

impl DisplaySet {
    fn new(pts: u32, pcs: PresentationComposition) -> Self {
        Self {
            pts,
            pcs,
            windows: HashMap::new(),
            palettes: HashMap::new(),
            objects: HashMap::new(),
        }
    }

    /// Presentation timestamp in milliseconds
    pub fn timestamp_ms(&self) -> u64 {
        self.pts as u64 / 90
    }

    /// A normal-state composition with no objects blanks the screen
    pub fn is_clear_frame(&self) -> bool {
        self.pcs.state == CompositionState::Normal && self.pcs.objects.is_empty()
    }

    /// Window rectangle by id, when the set defined one
    pub fn window(&self, id: u8) -> Option<&WindowRect> {
        self.windows.get(&id)
    }

    fn add_wds(&mut self, data: &[u8], pos: usize) {
        match parse_windows(data) {
            Some(windows) => {
                for (id, rect) in windows {
                    self.windows.insert(id, rect);
                }
            }
            None => warn!("Skipping invalid window segment at pos {}", pos),
        }
    }

    fn add_pds(&mut self, data: &[u8], pos: usize) {
        match PaletteDefinition::parse(data) {
            Some(pds) => {
                self.palettes.insert(pds.id, pds);
            }
            None => warn!("Skipping invalid palette segment at pos {}", pos),
        }
    }

    fn add_ods(&mut self, data: &[u8], pos: usize) {
        match ObjectDefinition::parse(data) {
            Some(ods) => self.objects.entry(ods.id).or_default().push(ods),
            None => warn!("Skipping invalid object segment at pos {}", pos),
        }
    }

    /// Render the display set into an RGBA image.
    ///
    /// Object bitmaps are RLE-decoded, drawn at their composition
    /// positions on a screen-size canvas, and the result is cropped to
    /// the union of the drawn rectangles plus a margin. With `crop`
    /// disabled the full screen canvas is returned.
    pub fn render(&self, crop: bool) -> RgbaImage {
        let comp = self.pcs.composition_number;
        let screen_w = self.pcs.width.max(1) as u32;
        let screen_h = self.pcs.height.max(1) as u32;

        let mut canvas = RgbaImage::from_pixel(screen_w, screen_h, IMAGE_FILL);

        // Union of drawn object rectangles, for cropping
        let mut drawn: Option<(u32, u32, u32, u32)> = None;

        if let Some(pds) = self.palettes.get(&self.pcs.palette_id) {
            let palette = pds.palette();
            for comp_object in &self.pcs.objects {
                let Some(fragments) = self.objects.get(&comp_object.object_id) else {
                    warn!(
                        "Unknown object {} in composition {}",
                        comp_object.object_id, comp
                    );
                    continue;
                };

                let mut data: Vec<u8> = Vec::new();
                let mut size = None;
                let mut declared = 0usize;
                for ods in fragments {
                    data.extend_from_slice(&ods.rle);
                    if let (Some(s), Some(len)) = (ods.size, ods.declared_len) {
                        size = Some(s);
                        declared = len;
                    }
                }

                if declared != data.len() {
                    warn!("Inconsistent image data length in composition {}", comp);
                    declared = data.len(); // Render what is available
                }
                let Some((obj_w, obj_h)) = size else {
                    warn!("Size not defined for composition {}", comp);
                    continue;
                };

                let pixels = decode_rle(&data, declared, &palette);
                blit(
                    &mut canvas,
                    &pixels,
                    obj_w as u32,
                    obj_h as u32,
                    comp_object.x as u32,
                    comp_object.y as u32,
                );

                let rect = (
                    comp_object.x as u32,
                    comp_object.y as u32,
                    obj_w as u32,
                    obj_h as u32,
                );
                drawn = Some(match drawn {
                    None => rect,
                    Some(prev) => union_rect(prev, rect),
                });
            }
        } else {
            warn!(
                "Palette {} not defined in composition {}",
                self.pcs.palette_id, comp
            );
        }

        if !crop {
            return canvas;
        }

        let (x, y, w, h) = match drawn {
            Some(rect) => rect,
            None => (0, 0, screen_w, screen_h),
        };
        let crop_x = x.saturating_sub(CROP_MARGIN);
        let crop_y = y.saturating_sub(CROP_MARGIN);
        let crop_w = (w + 2 * CROP_MARGIN).min(screen_w - crop_x);
        let crop_h = (h + 2 * CROP_MARGIN).min(screen_h - crop_y);

        image::imageops::crop_imm(&canvas, crop_x, crop_y, crop_w, crop_h).to_image()
    }
}

/// Decode PGS run-length-encoded pixel data into RGBA bytes.
///
/// Encoding: a non-zero byte is one pixel of that palette entry. A zero
/// byte escapes a run: `00 00` ends a line, `00 0L` runs L transparent
/// pixels (L <= 0x3f), `00 4L LL` a long transparent run, `00 8L CC` a
/// short colored run, `00 C L LL CC` a long colored run.
fn decode_rle(data: &[u8], length: usize, palette: &[[u8; 4]; 256]) -> Vec<u8> {
    let mut raw: Vec<u8> = Vec::with_capacity(length * 4);

    // Zero sentinel keeps the decoder in bounds on truncated runs
    let mut padded = Vec::with_capacity(data.len() + 3);
    padded.extend_from_slice(data);
    padded.extend_from_slice(&[0, 0, 0]);
    let data = &padded;

    let mut p = 0usize;
    let end = length.min(data.len().saturating_sub(3));
    while p < end {
        let b1 = data[p];
        if b1 > 0 {
            raw.extend_from_slice(&palette[b1 as usize]);
            p += 1;
            continue;
        }
        let b2 = data[p + 1];
        if b2 == 0 {
            // End of line marker
            p += 2;
        } else if b2 <= 0x3f {
            push_run(&mut raw, palette[0], b2 as usize);
            p += 2;
        } else if b2 <= 0x7f {
            push_run(&mut raw, palette[0], ((b2 & 0x3f) as usize) << 8 | data[p + 2] as usize);
            p += 3;
        } else if b2 <= 0xbf {
            push_run(&mut raw, palette[data[p + 2] as usize], (b2 & 0x3f) as usize);
            p += 3;
        } else {
            push_run(
                &mut raw,
                palette[data[p + 3] as usize],
                ((b2 & 0x3f) as usize) << 8 | data[p + 2] as usize,
            );
            p += 4;
        }
    }

    raw
}

fn push_run(raw: &mut Vec<u8>, color: [u8; 4], count: usize) {
    for _ in 0..count {
        raw.extend_from_slice(&color);
    }
}

/// Copy decoded pixels onto the canvas at the given position, clipping at
/// the canvas edges and tolerating short pixel buffers.
fn blit(canvas: &mut RgbaImage, pixels: &[u8], w: u32, h: u32, at_x: u32, at_y: u32) {
    let expected = (w as usize) * (h as usize) * 4;
    if pixels.len() < expected {
        debug!(
            "Object pixel buffer short by {} bytes",
            expected - pixels.len()
        );
    }

    for row in 0..h {
        for col in 0..w {
            let offset = ((row * w + col) * 4) as usize;
            if offset + 4 > pixels.len() {
                return;
            }
            let (cx, cy) = (at_x + col, at_y + row);
            if cx < canvas.width() && cy < canvas.height() {
                canvas.put_pixel(
                    cx,
                    cy,
                    Rgba([
                        pixels[offset],
                        pixels[offset + 1],
                        pixels[offset + 2],
                        pixels[offset + 3],
                    ]),
                );
            }
        }
    }
}

fn union_rect(a: (u32, u32, u32, u32), b: (u32, u32, u32, u32)) -> (u32, u32, u32, u32) {
    let x = a.0.min(b.0);
    let y = a.1.min(b.1);
    let right = (a.0 + a.2).max(b.0 + b.2);
    let bottom = (a.1 + a.3).max(b.1 + b.3);
    (x, y, right - x, bottom - y)
}

/// One subtitle frame assembled from display sets: an epoch-start
/// composition and the clear frame that ends it.
#[derive(Debug)]
pub struct PgsFrame {
    /// Frame position in the stream
    pub index: usize,
    /// Display start in milliseconds
    pub start_ms: u64,
    /// Display end in milliseconds; None when the stream ended before a
    /// clear frame arrived
    pub end_ms: Option<u64>,
    display_set: DisplaySet,
}

impl PgsFrame {
    /// Render the frame's bitmap, cropped to its content
    pub fn render(&self) -> RgbaImage {
        self.display_set.render(true)
    }

    /// Composition number of the underlying display set
    pub fn composition_number(&self) -> u16 {
        self.display_set.pcs.composition_number
    }
}

/// A parsed PGS stream
#[derive(Debug)]
pub struct PgsStream {
    /// All valid display sets in stream order
    pub display_sets: Vec<DisplaySet>,
}

impl PgsStream {
    /// Read and parse a PGS stream from a file
    pub fn read_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let data = std::fs::read(path.as_ref())
            .with_context(|| format!("Failed to read PGS file: {:?}", path.as_ref()))?;
        Ok(Self::parse(&data))
    }

    /// Parse raw PGS bytes into display sets.
    ///
    /// The parser is lenient: a bad magic resynchronizes one byte at a
    /// time, truncated segments end the stream with a warning, and
    /// segments outside a display set are dropped.
    pub fn parse(data: &[u8]) -> Self {
        let mut display_sets: Vec<DisplaySet> = Vec::new();
        let mut pending: Option<DisplaySet> = None;

        let mut pos = 0usize;
        while pos < data.len() {
            if data.len() - pos < 13 {
                warn!(
                    "Truncated segment header of length {} at position {}",
                    data.len() - pos,
                    pos
                );
                break;
            }

            let header = &data[pos..pos + 13];
            if &header[0..2] != b"PG" {
                warn!("Skipping invalid segment at position {}", pos);
                pos += 1;
                continue;
            }

            let pts = u32::from_be_bytes([header[2], header[3], header[4], header[5]]);
            // Bytes 6..10 are the decoding timestamp, unused for subtitles
            let seg_type = header[10];
            let size = u16::from_be_bytes([header[11], header[12]]) as usize;

            if data.len() - pos - 13 < size {
                warn!("Truncated segment payload at position {}", pos);
                break;
            }
            let payload = &data[pos + 13..pos + 13 + size];

            match seg_type {
                SEG_PCS => match PresentationComposition::parse(payload) {
                    Some(pcs) => {
                        if pending.is_some() {
                            warn!("Display set at position {} opened before previous END", pos);
                        }
                        pending = Some(DisplaySet::new(pts, pcs));
                    }
                    None => warn!("Skipping invalid presentation segment at pos {}", pos),
                },
                SEG_WDS => match pending.as_mut() {
                    Some(ds) => ds.add_wds(payload, pos),
                    None => warn!("Window segment outside display set at pos {}", pos),
                },
                SEG_PDS => match pending.as_mut() {
                    Some(ds) => ds.add_pds(payload, pos),
                    None => warn!("Palette segment outside display set at pos {}", pos),
                },
                SEG_ODS => match pending.as_mut() {
                    Some(ds) => ds.add_ods(payload, pos),
                    None => warn!("Object segment outside display set at pos {}", pos),
                },
                SEG_END => match pending.take() {
                    Some(ds) => display_sets.push(ds),
                    None => warn!("END segment without display set at pos {}", pos),
                },
                other => {
                    warn!("Invalid or unexpected segment type {:02x} at {}", other, pos)
                }
            }

            pos += 13 + size;
        }

        if pending.is_some() {
            warn!("Data past last END segment, PGS data may be truncated");
        }

        Self { display_sets }
    }

    /// Number of parsed display sets
    pub fn len(&self) -> usize {
        self.display_sets.len()
    }

    /// True when the stream contains no display sets
    pub fn is_empty(&self) -> bool {
        self.display_sets.is_empty()
    }

    /// Assemble subtitle frames from the display sets.
    ///
    /// An epoch start opens a frame; the next clear frame supplies its end
    /// timestamp. Acquisition points exist for decoders joining at skip
    /// points and are dropped, as are normal-case updates that only
    /// re-crop the on-screen text.
    pub fn into_frames(self) -> Vec<PgsFrame> {
        let mut frames: Vec<PgsFrame> = Vec::new();
        let mut open: Option<usize> = None;

        for ds in self.display_sets {
            match ds.pcs.state {
                CompositionState::EpochStart => {
                    if let Some(idx) = open.take() {
                        debug!(
                            "Frame {} left open at new epoch, composition {}",
                            idx, ds.pcs.composition_number
                        );
                    }
                    open = Some(frames.len());
                    frames.push(PgsFrame {
                        index: frames.len(),
                        start_ms: ds.timestamp_ms(),
                        end_ms: None,
                        display_set: ds,
                    });
                }
                CompositionState::Normal if ds.is_clear_frame() => {
                    if let Some(idx) = open.take() {
                        frames[idx].end_ms = Some(ds.timestamp_ms());
                    }
                }
                CompositionState::AcquisitionPoint => {
                    debug!(
                        "Skipped acquisition point display set {}",
                        ds.pcs.composition_number
                    );
                }
                CompositionState::Normal => {
                    debug!(
                        "Skipped normal case display set {}",
                        ds.pcs.composition_number
                    );
                }
            }
        }

        if let Some(idx) = open {
            warn!("Frame {} has no closing clear frame", idx);
        }

        frames
    }
}
