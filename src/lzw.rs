//! Adaptive LZW decompression.
//!
//! The code table holds up to 4096 entries in four parallel arrays. Each
//! resolved code expands to a run of palette indices by walking its prefix
//! chain in reverse; runs are handed to the caller one at a time so both
//! output sinks share the same state machine.

use std::io::Read;

use log::warn;

use crate::blocks::BlockReader;
use crate::error::{GifError, Result};

const TABLE_SIZE: usize = 4096;
const NULL_CODE: i32 = -1;

pub(crate) struct Lzw {
    prefix: Box<[i32; TABLE_SIZE]>,
    suffix: Box<[u8; TABLE_SIZE]>,
    initial: Box<[u8; TABLE_SIZE]>,
    length: Box<[u16; TABLE_SIZE]>,
    run: Box<[u8; TABLE_SIZE]>,
    run_len: usize,

    min_code_size: u8,
    clear_code: u16,
    eof_code: u16,
    table_index: usize,
    code_size: u32,
    code_mask: u16,
    prev_code: i32,
}

impl Lzw {
    pub(crate) fn new() -> Self {
        Lzw {
            prefix: Box::new([NULL_CODE; TABLE_SIZE]),
            suffix: Box::new([0; TABLE_SIZE]),
            initial: Box::new([0; TABLE_SIZE]),
            length: Box::new([1; TABLE_SIZE]),
            run: Box::new([0; TABLE_SIZE]),
            run_len: 0,
            min_code_size: 0,
            clear_code: 0,
            eof_code: 0,
            table_index: 0,
            code_size: 0,
            code_mask: 0,
            prev_code: NULL_CODE,
        }
    }

    /// Starts a new frame. `min_code_size` comes from the byte preceding the
    /// image data and must be in 1..=8.
    pub(crate) fn begin(&mut self, min_code_size: u8) -> Result<()> {
        if !(1..=8).contains(&min_code_size) {
            return Err(GifError::BadCodeSize(min_code_size));
        }
        self.min_code_size = min_code_size;
        self.clear_code = 1 << min_code_size;
        self.eof_code = self.clear_code + 1;
        self.prev_code = NULL_CODE;
        self.run_len = 0;
        self.reset_table();
        Ok(())
    }

    /// Reinitializes the table to the base alphabet. Entries above the
    /// alphabet are preset to one-byte chains so an out-of-sequence code can
    /// never walk uninitialized state.
    fn reset_table(&mut self) {
        let alphabet = 1usize << self.min_code_size;
        for i in 0..alphabet {
            self.prefix[i] = NULL_CODE;
            self.suffix[i] = i as u8;
            self.initial[i] = i as u8;
            self.length[i] = 1;
        }
        for i in alphabet..TABLE_SIZE {
            self.prefix[i] = NULL_CODE;
            self.suffix[i] = 0;
            self.initial[i] = 0;
            self.length[i] = 1;
        }
        self.table_index = alphabet + 2;
        self.code_size = self.min_code_size as u32 + 1;
        self.code_mask = (1 << self.code_size) - 1;
    }

    /// Pulls the next code and expands it. Returns the run length, or `None`
    /// once the end-of-information code (explicit or synthesized) is seen.
    /// The expanded indices are available through [`Lzw::run`].
    pub(crate) fn next_run<R: Read>(
        &mut self,
        blocks: &mut BlockReader,
        source: &mut R,
    ) -> Result<Option<usize>> {
        let mut code = blocks.next_code(source, self.code_size, self.code_mask, self.eof_code)?;

        if code == self.clear_code {
            self.reset_table();
            code = blocks.next_code(source, self.code_size, self.code_mask, self.eof_code)?;
            if code == self.eof_code {
                return Ok(None);
            }
            // The first code after a clear names a base-alphabet entry
            // directly; no table entry is created for it.
        } else if code == self.eof_code {
            return Ok(None);
        } else {
            let (resolve, new_suffix) = if (code as usize) < self.table_index {
                (code as usize, code as usize)
            } else {
                let prev = if self.prev_code != NULL_CODE {
                    self.prev_code as usize
                } else {
                    code as usize
                };
                if code as usize == self.table_index {
                    // Previous run plus its first byte: the entry created
                    // below is exactly this code.
                    (code as usize, prev)
                } else {
                    warn!("out-of-sequence LZW code {code}, substituting previous run");
                    (prev, prev)
                }
            };

            if self.prev_code != NULL_CODE && self.table_index < TABLE_SIZE {
                let ti = self.table_index;
                let prev = self.prev_code as usize;
                self.prefix[ti] = self.prev_code;
                self.suffix[ti] = self.initial[new_suffix];
                self.initial[ti] = self.initial[prev];
                self.length[ti] = self.length[prev] + 1;
                self.table_index += 1;
                if self.table_index == (1usize << self.code_size) && self.table_index < TABLE_SIZE {
                    self.code_size += 1;
                    self.code_mask = (1 << self.code_size) - 1;
                }
            }

            self.expand(resolve);
            self.prev_code = code as i32;
            return Ok(Some(self.run_len));
        }

        self.expand(code as usize);
        self.prev_code = code as i32;
        Ok(Some(self.run_len))
    }

    /// Walks the prefix chain of `code` in reverse so the run comes out in
    /// stream order.
    fn expand(&mut self, code: usize) {
        let mut c = code;
        let len = self.length[c] as usize;
        for i in (0..len).rev() {
            self.run[i] = self.suffix[c];
            let p = self.prefix[c];
            if p != NULL_CODE {
                c = p as usize;
            }
        }
        self.run_len = len;
    }

    /// Indices produced by the most recent [`Lzw::next_run`].
    pub(crate) fn run(&self) -> &[u8] {
        &self.run[..self.run_len]
    }
}
