//! The GIF89a framing state machine: owns the encode lifecycle, converts each RGBA frame to
//! an indexed palette frame via [`crate::quant::NeuQuant`], LZW-encodes it via
//! [`crate::lzw::LzwEncoder`], and emits the GIF89a structural bytes around it.
//!
//! Lifecycle is `Fresh -> Started -> Finished`: `start()` runs implicitly on the first
//! `add_frame()` call, and no method but a failing `finish()`/`add_frame()` call is valid
//! once `finish()` has run.

use log::{debug, trace};

use crate::buffer::ByteBuffer;
use crate::error::{EncodeError, Result};
use crate::lzw::LzwEncoder;
use crate::quant::NeuQuant;
use crate::sink::ByteSink;

const COLOR_DEPTH: u8 = 8;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    Fresh,
    Started,
    Finished,
}

pub struct Encoder {
    width: u16,
    height: u16,

    transparent: Option<u32>, // 24-bit 0xRRGGBB
    transparent_index: u8,
    repeat: i32,    // -1..=65535
    delay: u16,     // hundredths of a second
    disposal_override: i32, // -1, or 0..=7
    sample: i32,    // 1..=30

    first_frame: bool,
    state: State,
    buf: ByteBuffer,
}

impl Encoder {
    pub fn new(width: u16, height: u16) -> Self {
        Self {
            width,
            height,
            transparent: None,
            transparent_index: 0,
            repeat: -1,
            delay: 10,
            disposal_override: -1,
            sample: 10,
            first_frame: true,
            state: State::Fresh,
            buf: ByteBuffer::new(),
        }
    }

    pub fn set_delay(&mut self, ms: u32) {
        self.delay = round_div(ms, 10).min(u16::MAX as u32) as u16;
    }

    pub fn set_framerate(&mut self, fps: u32) {
        if fps == 0 {
            return;
        }
        self.delay = round_div(100, fps).min(u16::MAX as u32) as u16;
    }

    pub fn set_dispose(&mut self, code: i32) {
        self.disposal_override = if (0..=7).contains(&code) { code } else { -1 };
    }

    pub fn set_repeat(&mut self, n: i32) {
        self.repeat = n.clamp(-1, 65535);
    }

    pub fn set_transparent(&mut self, color: Option<u32>) {
        self.transparent = color.map(|c| c & 0x00FF_FFFF);
    }

    /// Maps to the quantizer's sample factor; values below 1 clamp to 1.
    pub fn set_quality(&mut self, q: i32) {
        self.sample = q.max(1).min(30);
    }

    pub fn start(&mut self, sink: &mut dyn ByteSink) -> Result<()> {
        if self.state == State::Finished {
            return Err(EncodeError::AlreadyFinished);
        }
        if self.state == State::Started {
            return Ok(());
        }
        self.buf.write_bytes(b"GIF89a", 0, 6);
        self.flush(sink)?;
        self.state = State::Started;
        debug!("gif encoder started ({}x{})", self.width, self.height);
        Ok(())
    }

    pub fn add_frame(&mut self, rgba: &[u8], sink: &mut dyn ByteSink) -> Result<()> {
        match self.state {
            State::Finished => return Err(EncodeError::AlreadyFinished),
            State::Fresh => self.start(sink)?,
            State::Started => {}
        }

        let expected = 4 * self.width as usize * self.height as usize;
        if rgba.len() != expected {
            return Err(EncodeError::FrameSizeMismatch {
                width: self.width,
                height: self.height,
                expected,
                actual: rgba.len(),
            });
        }

        let pixel_count = self.width as usize * self.height as usize;
        let mut rgb = Vec::with_capacity(pixel_count * 3);
        for px in rgba.chunks_exact(4) {
            rgb.extend_from_slice(&px[..3]);
        }

        trace!("training quantizer on {} pixels", pixel_count);
        let nq = NeuQuant::new(&rgb, self.sample);
        let palette = nq.color_map();

        let mut indexed = vec![0u8; pixel_count];
        let mut used_entry = [false; 256];
        for (i, px) in rgb.chunks_exact(3).enumerate() {
            let idx = nq.lookup_rgb(px[0], px[1], px[2]);
            indexed[i] = idx;
            used_entry[idx as usize] = true;
        }

        let transparent_set = if let Some(color) = self.transparent {
            let (tr, tg, tb) = (
                ((color >> 16) & 0xff) as i32,
                ((color >> 8) & 0xff) as i32,
                (color & 0xff) as i32,
            );
            self.transparent_index =
                find_closest(&palette, &used_entry, tr, tg, tb);

            for (i, px) in rgba.chunks_exact(4).enumerate() {
                if px[3] == 0 {
                    indexed[i] = self.transparent_index;
                }
            }
            true
        } else {
            false
        };

        if self.first_frame {
            self.write_logical_screen_descriptor();
            self.write_color_table(&palette);
            if self.repeat >= 0 {
                self.write_netscape_loop();
            }
        }

        self.write_graphic_control_extension(transparent_set);
        self.write_image_descriptor(self.first_frame);
        if !self.first_frame {
            self.write_color_table(&palette);
        }

        let lzw = LzwEncoder::new(COLOR_DEPTH);
        lzw.encode(&indexed, &mut self.buf);

        self.first_frame = false;
        trace!("frame encoded, {} bytes buffered", self.buf.len());
        self.flush(sink)
    }

    pub fn finish(&mut self, sink: &mut dyn ByteSink) -> Result<()> {
        if self.state == State::Finished {
            return Err(EncodeError::AlreadyFinished);
        }
        self.buf.write_byte(0x3B);
        self.flush(sink)?;
        self.state = State::Finished;
        debug!("gif encoder finished");
        Ok(())
    }

    fn flush(&mut self, sink: &mut dyn ByteSink) -> Result<()> {
        sink.write(self.buf.view())?;
        self.buf.reset();
        Ok(())
    }

    fn write_logical_screen_descriptor(&mut self) {
        self.buf.write_bytes(&self.width.to_le_bytes(), 0, 2);
        self.buf.write_bytes(&self.height.to_le_bytes(), 0, 2);
        self.buf.write_byte(0xF7); // GCT=1, color res=7, sort=0, size=7 (256 entries)
        self.buf.write_byte(0); // background color index
        self.buf.write_byte(0); // pixel aspect ratio
    }

    fn write_color_table(&mut self, palette: &[u8; 768]) {
        self.buf.write_bytes(palette, 0, 768);
    }

    fn write_netscape_loop(&mut self) {
        self.buf.write_byte(0x21);
        self.buf.write_byte(0xFF);
        self.buf.write_byte(0x0B);
        self.buf.write_bytes(b"NETSCAPE2.0", 0, 11);
        self.buf.write_byte(0x03);
        self.buf.write_byte(0x01);
        self.buf.write_bytes(&(self.repeat as u16).to_le_bytes(), 0, 2);
        self.buf.write_byte(0x00);
    }

    fn write_graphic_control_extension(&mut self, transparent_set: bool) {
        let disposal = if self.disposal_override >= 0 {
            self.disposal_override as u8
        } else if transparent_set {
            2
        } else {
            0
        };
        let packed = (disposal << 2) | if transparent_set { 1 } else { 0 };

        self.buf.write_byte(0x21);
        self.buf.write_byte(0xF9);
        self.buf.write_byte(0x04);
        self.buf.write_byte(packed);
        self.buf.write_bytes(&self.delay.to_le_bytes(), 0, 2);
        self.buf
            .write_byte(if transparent_set { self.transparent_index } else { 0 });
        self.buf.write_byte(0x00);
    }

    fn write_image_descriptor(&mut self, is_first_frame: bool) {
        self.buf.write_byte(0x2C);
        self.buf.write_bytes(&0u16.to_le_bytes(), 0, 2); // left
        self.buf.write_bytes(&0u16.to_le_bytes(), 0, 2); // top
        self.buf.write_bytes(&self.width.to_le_bytes(), 0, 2);
        self.buf.write_bytes(&self.height.to_le_bytes(), 0, 2);
        self.buf.write_byte(if is_first_frame { 0x00 } else { 0x87 });
    }
}

fn round_div(a: u32, b: u32) -> u32 {
    (a + b / 2) / b
}

/// Nearest palette entry (squared Euclidean distance) to `(r, g, b)`, restricted to entries
/// that actually appear in the current frame's `used_entry` mask.
fn find_closest(palette: &[u8; 768], used_entry: &[bool; 256], r: i32, g: i32, b: i32) -> u8 {
    let mut best = 0usize;
    let mut best_dist = i32::MAX;
    for i in 0..256usize {
        if !used_entry[i] {
            continue;
        }
        let dr = palette[3 * i] as i32 - r;
        let dg = palette[3 * i + 1] as i32 - g;
        let db = palette[3 * i + 2] as i32 - b;
        let dist = dr * dr + dg * dg + db * db;
        if dist < best_dist {
            best_dist = dist;
            best = i;
        }
    }
    best as u8
}
