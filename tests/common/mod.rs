//! Synthetic GIF streams for the integration tests.
#![allow(dead_code)]

use std::cell::RefCell;
use std::collections::HashMap;
use std::io::{Read, Seek, SeekFrom};
use std::rc::Rc;

struct BitWriter {
    bytes: Vec<u8>,
    acc: u32,
    nbits: u32,
}

impl BitWriter {
    fn new() -> Self {
        BitWriter {
            bytes: Vec::new(),
            acc: 0,
            nbits: 0,
        }
    }

    fn push(&mut self, code: u16, width: u32) {
        self.acc |= (code as u32) << self.nbits;
        self.nbits += width;
        while self.nbits >= 8 {
            self.bytes.push((self.acc & 0xFF) as u8);
            self.acc >>= 8;
            self.nbits -= 8;
        }
    }

    fn finish(mut self) -> Vec<u8> {
        if self.nbits > 0 {
            self.bytes.push((self.acc & 0xFF) as u8);
        }
        self.bytes
    }
}

/// LZW-compresses palette indices, keeping the code-width schedule in step
/// with the decoder's table growth.
pub fn lzw_encode(data: &[u8], min_code_size: u8) -> Vec<u8> {
    let clear: u16 = 1 << min_code_size;
    let eof: u16 = clear + 1;
    let mut code_size = min_code_size as u32 + 1;
    let mut writer = BitWriter::new();

    let mut table: HashMap<Vec<u8>, u16> = HashMap::new();
    for i in 0..clear {
        table.insert(vec![i as u8], i);
    }
    let mut next_code = clear + 2;

    writer.push(clear, code_size);
    if data.is_empty() {
        writer.push(eof, code_size);
        return writer.finish();
    }

    let mut current = vec![data[0]];
    for &byte in &data[1..] {
        let mut candidate = current.clone();
        candidate.push(byte);
        if table.contains_key(&candidate) {
            current = candidate;
        } else {
            writer.push(table[&current], code_size);
            if next_code < 4096 {
                table.insert(candidate, next_code);
                next_code += 1;
                if next_code > (1 << code_size) as u16 && code_size < 12 {
                    code_size += 1;
                }
            } else {
                writer.push(clear, code_size);
                table.retain(|key, _| key.len() == 1);
                next_code = clear + 2;
                code_size = min_code_size as u32 + 1;
            }
            current = vec![byte];
        }
    }
    writer.push(table[&current], code_size);
    writer.push(eof, code_size);
    writer.finish()
}

fn write_sub_blocks(out: &mut Vec<u8>, data: &[u8]) {
    for chunk in data.chunks(255) {
        out.push(chunk.len() as u8);
        out.extend_from_slice(chunk);
    }
    out.push(0);
}

fn table_size_flag(table: &[u8]) -> u8 {
    let entries = table.len() / 3;
    assert!(entries.is_power_of_two() && (2..=256).contains(&entries));
    (entries.trailing_zeros() - 1) as u8
}

/// Reorders display-order rows into the four-pass interlace stream order.
fn interlace_rows(pixels: &[u8], width: usize, height: usize) -> Vec<u8> {
    let mut out = Vec::with_capacity(pixels.len());
    for (offset, step) in [(0usize, 8usize), (4, 8), (2, 4), (1, 2)] {
        let mut y = offset;
        while y < height {
            out.extend_from_slice(&pixels[y * width..(y + 1) * width]);
            y += step;
        }
    }
    out
}

/// One frame of a synthetic GIF, in display order.
pub struct FrameSpec {
    pub left: u16,
    pub top: u16,
    pub width: u16,
    pub height: u16,
    pub pixels: Vec<u8>,
    pub delay: u16,
    pub disposal: u8,
    pub transparent: Option<u8>,
    pub interlaced: bool,
    pub local_table: Option<Vec<u8>>,
    pub min_code_size: u8,
}

impl Default for FrameSpec {
    fn default() -> Self {
        FrameSpec {
            left: 0,
            top: 0,
            width: 0,
            height: 0,
            pixels: Vec::new(),
            delay: 0,
            disposal: 0,
            transparent: None,
            interlaced: false,
            local_table: None,
            min_code_size: 8,
        }
    }
}

/// Builds complete GIF89a byte streams.
pub struct GifBuilder {
    width: u16,
    height: u16,
    global_table: Option<Vec<u8>>,
    looping: bool,
    frames: Vec<FrameSpec>,
}

impl GifBuilder {
    pub fn new(width: u16, height: u16) -> Self {
        GifBuilder {
            width,
            height,
            global_table: None,
            looping: false,
            frames: Vec::new(),
        }
    }

    pub fn global_table(mut self, table: Vec<u8>) -> Self {
        self.global_table = Some(table);
        self
    }

    pub fn looping(mut self) -> Self {
        self.looping = true;
        self
    }

    pub fn frame(mut self, frame: FrameSpec) -> Self {
        self.frames.push(frame);
        self
    }

    pub fn build(&self) -> Vec<u8> {
        let mut out = b"GIF89a".to_vec();
        out.extend_from_slice(&self.width.to_le_bytes());
        out.extend_from_slice(&self.height.to_le_bytes());
        match &self.global_table {
            Some(table) => out.push(0x80 | 0x70 | table_size_flag(table)),
            None => out.push(0x00),
        }
        out.push(0); // background color index
        out.push(0); // pixel aspect ratio
        if let Some(table) = &self.global_table {
            out.extend_from_slice(table);
        }

        if self.looping {
            out.extend_from_slice(&[0x21, 0xFF, 11]);
            out.extend_from_slice(b"NETSCAPE2.0");
            out.extend_from_slice(&[3, 1, 0, 0, 0]);
        }

        for frame in &self.frames {
            if frame.delay > 0 || frame.disposal > 0 || frame.transparent.is_some() {
                let packed =
                    (frame.disposal << 2) | if frame.transparent.is_some() { 1 } else { 0 };
                out.extend_from_slice(&[0x21, 0xF9, 4, packed]);
                out.extend_from_slice(&frame.delay.to_le_bytes());
                out.push(frame.transparent.unwrap_or(0));
                out.push(0);
            }

            out.push(0x2C);
            out.extend_from_slice(&frame.left.to_le_bytes());
            out.extend_from_slice(&frame.top.to_le_bytes());
            out.extend_from_slice(&frame.width.to_le_bytes());
            out.extend_from_slice(&frame.height.to_le_bytes());
            let mut packed = 0u8;
            if let Some(table) = &frame.local_table {
                packed |= 0x80 | table_size_flag(table);
            }
            if frame.interlaced {
                packed |= 0x40;
            }
            out.push(packed);
            if let Some(table) = &frame.local_table {
                out.extend_from_slice(table);
            }

            let pixels = if frame.interlaced {
                interlace_rows(&frame.pixels, frame.width as usize, frame.height as usize)
            } else {
                frame.pixels.clone()
            };
            out.push(frame.min_code_size);
            write_sub_blocks(&mut out, &lzw_encode(&pixels, frame.min_code_size));
        }

        out.push(0x3B);
        out
    }
}

/// A grayscale-ish 256-entry table where entry `i` is `(i, i, i)`.
pub fn identity_table() -> Vec<u8> {
    let mut table = Vec::with_capacity(768);
    for i in 0..=255u8 {
        table.extend_from_slice(&[i, i, i]);
    }
    table
}

/// `Read + Seek` wrapper that records every absolute seek target, so tests
/// can assert which stream regions the decoder revisits.
pub struct SpyReader<R> {
    inner: R,
    pub seeks: Rc<RefCell<Vec<u64>>>,
}

impl<R> SpyReader<R> {
    pub fn new(inner: R) -> (Self, Rc<RefCell<Vec<u64>>>) {
        let seeks = Rc::new(RefCell::new(Vec::new()));
        (
            SpyReader {
                inner,
                seeks: Rc::clone(&seeks),
            },
            seeks,
        )
    }
}

impl<R: Read> Read for SpyReader<R> {
    fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
        self.inner.read(buf)
    }
}

impl<R: Seek> Seek for SpyReader<R> {
    fn seek(&mut self, pos: SeekFrom) -> std::io::Result<u64> {
        if let SeekFrom::Start(target) = pos {
            self.seeks.borrow_mut().push(target);
        }
        self.inner.seek(pos)
    }
}
