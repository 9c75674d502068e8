//! Indexed raster output.

use crate::palette::Palette;

/// A decoded frame as palette indices plus its palette. Rows are packed at
/// the palette's bit depth (1, 2, 4, or 8 bits per pixel, most significant
/// bits first within a byte), each row starting on a byte boundary.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexedImage {
    width: u32,
    height: u32,
    palette: Palette,
    transparent_index: Option<u8>,
    row_stride: usize,
    data: Vec<u8>,
}

impl IndexedImage {
    pub(crate) fn new(
        width: u32,
        height: u32,
        palette: Palette,
        transparent_index: Option<u8>,
    ) -> Self {
        let bits = palette.bits() as usize;
        let row_stride = (width as usize * bits + 7) / 8;
        let data = vec![0u8; row_stride * height as usize];
        IndexedImage {
            width,
            height,
            palette,
            transparent_index,
            row_stride,
            data,
        }
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn palette(&self) -> &Palette {
        &self.palette
    }

    /// Transparent palette index, clamped into the palette, if the frame
    /// declared one.
    pub fn transparent_index(&self) -> Option<u8> {
        self.transparent_index
    }

    /// Bytes per packed row.
    pub fn row_stride(&self) -> usize {
        self.row_stride
    }

    /// Packed pixel data, `row_stride() * height()` bytes.
    pub fn data(&self) -> &[u8] {
        &self.data
    }

    /// Palette index of one pixel.
    pub fn index_at(&self, x: u32, y: u32) -> u8 {
        let bits = self.palette.bits() as usize;
        let bit_offset = x as usize * bits;
        let byte = self.data[y as usize * self.row_stride + bit_offset / 8];
        let shift = 8 - bits - (bit_offset % 8);
        (byte >> shift) & ((1u16 << bits) - 1) as u8
    }

    /// Resolved RGBA of one pixel; the transparent index maps to alpha 0.
    pub fn rgba_at(&self, x: u32, y: u32) -> [u8; 4] {
        let index = self.index_at(x, y);
        if self.transparent_index == Some(index) {
            return [0, 0, 0, 0];
        }
        let [r, g, b] = self.palette.color(index);
        [r, g, b, 0xFF]
    }

    /// Packs one row of palette indices starting at column 0.
    pub(crate) fn set_row(&mut self, y: usize, indices: &[u8]) {
        let bits = self.palette.bits() as usize;
        let row = &mut self.data[y * self.row_stride..(y + 1) * self.row_stride];
        if bits == 8 {
            row[..indices.len()].copy_from_slice(indices);
            return;
        }
        let mask = ((1u16 << bits) - 1) as u8;
        for (x, &index) in indices.iter().enumerate() {
            let bit_offset = x * bits;
            let shift = 8 - bits - (bit_offset % 8);
            let byte = &mut row[bit_offset / 8];
            *byte = (*byte & !(mask << shift)) | ((index & mask) << shift);
        }
    }
}
