//! Helpers over the seekable byte source the decoder reads from.

use std::io::{Read, Seek, SeekFrom};

use byteorder::{LittleEndian, ReadBytesExt};

/// Extension trait bundling the little-endian field reads and positioning
/// operations the GIF grammar needs. Blanket-implemented for every
/// `Read + Seek` source.
pub(crate) trait Input: Read + Seek {
    /// Reads a little-endian 16-bit field.
    fn read_u16_le(&mut self) -> std::io::Result<u16> {
        self.read_u16::<LittleEndian>()
    }

    /// Skips `n` bytes without buffering them.
    fn skip(&mut self, n: u64) -> std::io::Result<()> {
        self.seek(SeekFrom::Current(n as i64))?;
        Ok(())
    }

    /// Current absolute stream offset.
    fn position(&mut self) -> std::io::Result<u64> {
        self.stream_position()
    }

    /// Seeks to an absolute stream offset.
    fn seek_to(&mut self, offset: u64) -> std::io::Result<()> {
        self.seek(SeekFrom::Start(offset))?;
        Ok(())
    }
}

impl<T: Read + Seek + ?Sized> Input for T {}
