//! Sub-block framing and the 32-bit code window.
//!
//! Image data is stored as length-prefixed sub-blocks of up to 255 bytes,
//! terminated by a zero-length block. Codes of 3..=12 bits are pulled from a
//! 32-bit little-endian lookahead window that is refilled one byte at a time
//! as sub-blocks are consumed.

use std::io::Read;

use byteorder::ReadBytesExt;

use crate::error::{GifError, Result};
use crate::input::Input;

/// Cursor over the sub-block stream of one frame's image data.
#[derive(Debug)]
pub(crate) struct BlockReader {
    block: [u8; 255],
    block_len: usize,
    next_byte: usize,
    window: u32,
    bit_pos: u32,
    /// Set once the zero-length terminator has been consumed. After that the
    /// window drains without refilling and end-of-data is synthesized.
    last_block: bool,
}

impl BlockReader {
    /// Reads the first sub-block and primes the lookahead window from its
    /// first four bytes (zero-padded when the block is shorter).
    pub(crate) fn begin<R: Read>(source: &mut R) -> Result<Self> {
        let mut reader = BlockReader {
            block: [0; 255],
            block_len: 0,
            next_byte: 0,
            window: 0,
            bit_pos: 0,
            last_block: false,
        };
        reader.block_len = source.read_u8()? as usize;
        if reader.block_len == 0 {
            reader.last_block = true;
        } else {
            source
                .read_exact(&mut reader.block[..reader.block_len])
                .map_err(GifError::TruncatedBlock)?;
        }
        // A first block shorter than four bytes leaves zero padding in the
        // window; those padding bits are consumed as stream data.
        reader.window = u32::from_le_bytes([
            reader.block[0],
            reader.block[1],
            reader.block[2],
            reader.block[3],
        ]);
        reader.next_byte = 4;
        Ok(reader)
    }

    /// Extracts the next `code_size`-bit code, refilling the window from the
    /// sub-block stream as bytes are consumed. Once fewer than `code_size`
    /// bits remain after the terminator, `eof_code` is returned.
    pub(crate) fn next_code<R: Read>(
        &mut self,
        source: &mut R,
        code_size: u32,
        code_mask: u16,
        eof_code: u16,
    ) -> Result<u16> {
        if self.bit_pos + code_size > 32 {
            return Ok(eof_code);
        }
        let code = (self.window >> self.bit_pos) as u16 & code_mask;
        self.bit_pos += code_size;

        while self.bit_pos >= 8 && !self.last_block {
            self.window >>= 8;
            self.bit_pos -= 8;
            if self.next_byte >= self.block_len {
                self.block_len = source.read_u8()? as usize;
                if self.block_len == 0 {
                    self.last_block = true;
                    return Ok(code);
                }
                source
                    .read_exact(&mut self.block[..self.block_len])
                    .map_err(GifError::TruncatedBlock)?;
                self.next_byte = 0;
            }
            self.window |= (self.block[self.next_byte] as u32) << 24;
            self.next_byte += 1;
        }
        Ok(code)
    }

    /// Skips any sub-blocks left unread, leaving the source positioned just
    /// past the zero-length terminator.
    pub(crate) fn finish<R: Read + std::io::Seek>(&mut self, source: &mut R) -> Result<()> {
        while !self.last_block {
            let len = source.read_u8()? as u64;
            if len == 0 {
                self.last_block = true;
                break;
            }
            source.skip(len)?;
        }
        Ok(())
    }
}
