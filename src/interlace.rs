//! Row scheduling for progressive and interlaced frames.

/// Row increment per interlace pass. The final entry marks the terminal pass.
const INTERLACE_INCREMENT: [u32; 4] = [8, 8, 4, 2];
/// Starting row per interlace pass.
const INTERLACE_OFFSET: [u32; 4] = [0, 4, 2, 1];

/// Yields destination rows in stream order. Non-interlaced frames walk rows
/// top to bottom; interlaced frames follow the four-pass schedule
/// (offsets 0/4/2/1, increments 8/8/4/2).
pub(crate) struct RowCursor {
    interlaced: bool,
    height: u32,
    y: u32,
    pass: usize,
}

impl RowCursor {
    pub(crate) fn new(interlaced: bool, height: u32) -> Self {
        RowCursor {
            interlaced,
            height,
            y: 0,
            pass: 0,
        }
    }

    /// Row the next scanline lands on.
    pub(crate) fn y(&self) -> u32 {
        self.y
    }

    /// Steps to the next row. Returns `false` once an interlaced frame has
    /// exhausted all four passes; single-pass mode never terminates here (the
    /// caller stops at end-of-data).
    pub(crate) fn advance(&mut self) -> bool {
        if !self.interlaced {
            self.y += 1;
            return true;
        }
        self.y += INTERLACE_INCREMENT[self.pass];
        if self.y >= self.height {
            self.pass += 1;
            if self.pass >= INTERLACE_OFFSET.len() {
                return false;
            }
            self.y = INTERLACE_OFFSET[self.pass];
        }
        true
    }
}
