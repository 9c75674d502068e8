//! Color-table normalization and the built-in default palette.

use std::sync::OnceLock;

static DEFAULT_PALETTE: OnceLock<Vec<u8>> = OnceLock::new();

/// 256-entry fallback palette used when a stream carries no color table at
/// all: a 6x6x6 color cube followed by a 40-step grayscale ramp. Built once
/// per process.
pub(crate) fn default_palette() -> &'static [u8] {
    DEFAULT_PALETTE.get_or_init(|| {
        let mut table = Vec::with_capacity(768);
        for r in 0..6u8 {
            for g in 0..6u8 {
                for b in 0..6u8 {
                    table.extend_from_slice(&[r * 51, g * 51, b * 51]);
                }
            }
        }
        for i in 0..40u16 {
            let v = (i * 255 / 39) as u8;
            table.extend_from_slice(&[v, v, v]);
        }
        table
    })
}

/// An indexed-color palette at one of the supported depths (1, 2, 4, or
/// 8 bits), holding `3 * (1 << bits)` RGB bytes. Entries beyond the source
/// color table are zero.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Palette {
    bits: u8,
    rgb: Vec<u8>,
}

impl Palette {
    /// Rounds a flat RGB color table up to the smallest supported palette
    /// depth that holds all of its entries.
    pub(crate) fn normalize(table: &[u8]) -> Palette {
        let count = table.len() / 3;
        let bits = if count <= 2 {
            1
        } else if count <= 4 {
            2
        } else if count <= 16 {
            4
        } else {
            8
        };
        let mut rgb = vec![0u8; 3 << bits];
        let n = table.len().min(rgb.len());
        rgb[..n].copy_from_slice(&table[..n]);
        Palette { bits, rgb }
    }

    /// Bits per pixel index: 1, 2, 4, or 8.
    pub fn bits(&self) -> u8 {
        self.bits
    }

    /// Number of palette entries, `1 << bits`.
    pub fn entries(&self) -> usize {
        1 << self.bits
    }

    /// Flat RGB triples, `3 * entries()` bytes.
    pub fn rgb(&self) -> &[u8] {
        &self.rgb
    }

    /// RGB triple for one palette index.
    pub fn color(&self, index: u8) -> [u8; 3] {
        let i = (index as usize).min(self.entries() - 1) * 3;
        [self.rgb[i], self.rgb[i + 1], self.rgb[i + 2]]
    }
}
