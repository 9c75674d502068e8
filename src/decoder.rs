//! The decode session: header parsing, frame location, metadata, and the two
//! output sinks.

use std::io::{ErrorKind, Read, Seek};

use byteorder::ReadBytesExt;
use log::{debug, warn};

use crate::blocks::BlockReader;
use crate::error::{GifError, Result};
use crate::input::Input;
use crate::interlace::RowCursor;
use crate::lzw::Lzw;
use crate::palette::{self, Palette};
use crate::raster::IndexedImage;
use crate::types::{
    ApplicationExtension, DisposalMethod, FrameMetadata, PlainText, Region, StreamMetadata,
    APPLICATION_LABEL, COMMENT_LABEL, EXTENSION_INTRODUCER, GRAPHIC_CONTROL_LABEL,
    IMAGE_SEPARATOR, PLAIN_TEXT_LABEL, TRAILER,
};

/// Arguments for the direct-buffer sink ([`GifDecoder::read_next_into`]).
///
/// `dst` receives `frame_width * frame_height * 4` RGBA bytes starting at
/// `dst_offset`. `prev`, when present, is the composited previous frame at
/// the same extent from its own offset; transparent pixels and pixels outside
/// the frame rectangle are copied from it. Without a previous frame those
/// pixels are opaque black and transparency resolution is disabled.
pub struct DirectParams<'a> {
    pub frame_width: usize,
    pub frame_height: usize,
    pub dst: &'a mut [u8],
    pub dst_offset: usize,
    pub prev: Option<(&'a [u8], usize)>,
}

/// A streaming GIF decode session over a seekable byte source.
///
/// The session owns all mutable state (header, frame offset table, metadata
/// cache, LZW tables) and is single-threaded; decode one frame at a time.
pub struct GifDecoder<R> {
    source: R,
    forward_only: bool,
    min_index: usize,
    got_header: bool,
    stream_meta: StreamMetadata,
    /// Byte offset of each known frame's metadata start. Entry 0 is the
    /// position right after the header; entries are appended as frames are
    /// skipped or decoded, so locating never re-scans known ground.
    frame_offsets: Vec<u64>,
    curr_index: Option<usize>,
    frame_meta: Option<FrameMetadata>,
    metadata_len: u64,
    num_frames: Option<usize>,
    sequential_index: usize,
    /// Most recent local color table, reused by later frames that carry no
    /// table of their own.
    fallback_color_table: Option<Vec<u8>>,
    lzw: Lzw,
    row_buf: Vec<u8>,
}

impl<R: Read + Seek> GifDecoder<R> {
    /// Creates a decode session with random frame access.
    pub fn new(source: R) -> Self {
        Self::with_mode(source, false)
    }

    /// Creates a forward-only session: requesting a frame index below the
    /// highest index already requested fails with
    /// [`GifError::SeekBackward`], and counting frames with search is
    /// unavailable.
    pub fn forward_only(source: R) -> Self {
        Self::with_mode(source, true)
    }

    fn with_mode(source: R, forward_only: bool) -> Self {
        GifDecoder {
            source,
            forward_only,
            min_index: 0,
            got_header: false,
            stream_meta: StreamMetadata::default(),
            frame_offsets: Vec::new(),
            curr_index: None,
            frame_meta: None,
            metadata_len: 0,
            num_frames: None,
            sequential_index: 0,
            fallback_color_table: None,
            lzw: Lzw::new(),
            row_buf: Vec::new(),
        }
    }

    /// Consumes the session and returns the source.
    pub fn into_inner(self) -> R {
        self.source
    }

    /// Parses the header on first call and returns the stream-level
    /// metadata. Idempotent.
    pub fn stream_metadata(&mut self) -> Result<&StreamMetadata> {
        self.read_header()?;
        Ok(&self.stream_meta)
    }

    /// Number of frames in the stream. With `allow_search` the stream is
    /// scanned to the trailer and the count cached; without it, `None` is
    /// returned unless a prior search already cached the count. Searching a
    /// forward-only stream is an error.
    pub fn num_frames(&mut self, allow_search: bool) -> Result<Option<usize>> {
        self.read_header()?;
        if let Some(count) = self.num_frames {
            return Ok(Some(count));
        }
        if !allow_search {
            return Ok(None);
        }
        if self.forward_only {
            return Err(GifError::ForwardOnlySearch);
        }
        let count = match self.locate(usize::MAX)? {
            Some(last) => last + 1,
            None => 0,
        };
        debug!("stream holds {count} frames");
        self.num_frames = Some(count);
        Ok(Some(count))
    }

    /// Metadata for one frame. The most recently parsed frame's metadata is
    /// cached; re-requesting that index returns the cached value without
    /// touching the stream.
    pub fn frame_metadata(&mut self, index: usize) -> Result<&FrameMetadata> {
        self.check_index(index)?;
        if self.curr_index != Some(index) || self.frame_meta.is_none() {
            if self.locate(index)? != Some(index) {
                return Err(GifError::NoSuchFrame { index });
            }
            self.parse_frame_metadata(index)?;
        }
        self.frame_meta
            .as_ref()
            .ok_or(GifError::NoSuchFrame { index })
    }

    /// Width of one frame's rectangle.
    pub fn frame_width(&mut self, index: usize) -> Result<u16> {
        Ok(self.frame_metadata(index)?.width)
    }

    /// Height of one frame's rectangle.
    pub fn frame_height(&mut self, index: usize) -> Result<u16> {
        Ok(self.frame_metadata(index)?.height)
    }

    /// Byte length of the most recently parsed frame metadata (extension
    /// blocks through the end of the image descriptor).
    pub fn metadata_len(&self) -> u64 {
        self.metadata_len
    }

    /// Decodes one frame into an indexed raster.
    pub fn read_frame(&mut self, index: usize) -> Result<IndexedImage> {
        self.read_frame_region(index, None)
    }

    /// Decodes the part of one frame that intersects `region` (frame
    /// coordinates) into an indexed raster of the region's size. `None`
    /// decodes the full frame.
    pub fn read_frame_region(
        &mut self,
        index: usize,
        region: Option<Region>,
    ) -> Result<IndexedImage> {
        self.check_index(index)?;
        if self.locate(index)? != Some(index) {
            return Err(GifError::NoSuchFrame { index });
        }
        self.parse_frame_metadata(index)?;
        let meta = match &self.frame_meta {
            Some(meta) => meta.clone(),
            None => return Err(GifError::NoSuchFrame { index }),
        };
        let image = self.decode_indexed(&meta, region)?;
        self.record_next_offset(index)?;
        Ok(image)
    }

    /// Decodes the next frame in sequence, compositing straight into the
    /// caller's RGBA buffer when the frame permits it (disposal keeps
    /// previous pixels in place and the frame is not interlaced). Returns
    /// `Ok(None)` after a direct write, or `Ok(Some(image))` when the frame
    /// needed the indexed sink instead; past the last frame the trailer
    /// surfaces as [`GifError::NoSuchFrame`].
    pub fn read_next_into(&mut self, params: DirectParams<'_>) -> Result<Option<IndexedImage>> {
        self.read_header()?;
        let index = self.sequential_index;
        self.sequential_index += 1;
        self.parse_frame_metadata(index)?;
        let meta = match &self.frame_meta {
            Some(meta) => meta.clone(),
            None => return Err(GifError::NoSuchFrame { index }),
        };
        let result = if meta.disposal.preserves_previous() && !meta.interlaced {
            self.decode_direct(&meta, params)?;
            None
        } else {
            debug!(
                "frame {index} (disposal {:?}, interlaced {}) takes the indexed sink",
                meta.disposal, meta.interlaced
            );
            Some(self.decode_indexed(&meta, None)?)
        };
        self.record_next_offset(index)?;
        Ok(result)
    }

    /// Rewinds the sequential cursor to frame 0, clearing per-frame state
    /// (metadata cache, sticky color table) while keeping the parsed header
    /// and the frame offset table.
    pub fn reset_sequential(&mut self) -> Result<()> {
        self.read_header()?;
        self.sequential_index = 0;
        self.curr_index = None;
        self.frame_meta = None;
        self.fallback_color_table = None;
        if let Some(&start) = self.frame_offsets.first() {
            self.source.seek_to(start)?;
        }
        Ok(())
    }

    fn check_index(&mut self, index: usize) -> Result<()> {
        if index < self.min_index {
            return Err(GifError::SeekBackward {
                index,
                min_index: self.min_index,
            });
        }
        if self.forward_only {
            self.min_index = index;
        }
        Ok(())
    }

    fn read_header(&mut self) -> Result<()> {
        if self.got_header {
            return Ok(());
        }
        let mut signature = [0u8; 6];
        self.source.read_exact(&mut signature)?;
        self.stream_meta.version = String::from_utf8_lossy(&signature[3..6]).into_owned();

        self.stream_meta.width = self.source.read_u16_le()?;
        self.stream_meta.height = self.source.read_u16_le()?;
        let packed = self.source.read_u8()?;
        let has_global_table = packed & 0x80 != 0;
        self.stream_meta.color_resolution = ((packed >> 4) & 0x07) + 1;
        self.stream_meta.sort_flag = packed & 0x08 != 0;
        let global_entries = 1usize << ((packed & 0x07) + 1);
        self.stream_meta.background_color_index = self.source.read_u8()?;
        self.stream_meta.pixel_aspect_ratio = self.source.read_u8()?;
        if has_global_table {
            let mut table = vec![0u8; 3 * global_entries];
            self.source.read_exact(&mut table)?;
            self.stream_meta.global_color_table = Some(table);
        }
        // Frame 0 starts right after the header.
        self.frame_offsets.push(self.source.position()?);
        self.got_header = true;
        debug!(
            "header: GIF{} {}x{}, global color table: {}",
            self.stream_meta.version, self.stream_meta.width, self.stream_meta.height,
            has_global_table
        );
        Ok(())
    }

    /// Seeks to frame `target`, skipping forward from the closest known
    /// offset. Returns the highest index actually reached: `Some(target)` on
    /// success, a smaller value (or `None` before frame 0) when the stream
    /// ends first.
    fn locate(&mut self, target: usize) -> Result<Option<usize>> {
        self.read_header()?;
        let mut index = target.min(self.frame_offsets.len() - 1);
        self.source.seek_to(self.frame_offsets[index])?;
        while index < target {
            if !self.skip_frame()? {
                return Ok(index.checked_sub(1));
            }
            if self.frame_offsets.len() == index + 1 {
                let pos = self.source.position()?;
                self.frame_offsets.push(pos);
            }
            index += 1;
        }
        Ok(Some(target))
    }

    /// Skips past the frame at the current position. `Ok(false)` when the
    /// trailer, a stray terminator, or end-of-stream is found instead.
    fn skip_frame(&mut self) -> Result<bool> {
        match self.skip_frame_inner() {
            Err(GifError::Io(e)) if e.kind() == ErrorKind::UnexpectedEof => Ok(false),
            other => other,
        }
    }

    fn skip_frame_inner(&mut self) -> Result<bool> {
        loop {
            let block_type = self.source.read_u8()?;
            match block_type {
                IMAGE_SEPARATOR => {
                    // left, top, width, height
                    self.source.skip(8)?;
                    let packed = self.source.read_u8()?;
                    if packed & 0x80 != 0 {
                        let entries = 1u64 << ((packed & 0x07) + 1);
                        self.source.skip(3 * entries)?;
                    }
                    // LZW minimum code size byte, then the data sub-blocks.
                    self.source.skip(1)?;
                    self.skip_sub_blocks()?;
                    return Ok(true);
                }
                EXTENSION_INTRODUCER => {
                    let _label = self.source.read_u8()?;
                    self.skip_sub_blocks()?;
                }
                TRAILER | 0x00 => return Ok(false),
                _ => self.skip_sub_blocks()?,
            }
        }
    }

    fn skip_sub_blocks(&mut self) -> Result<()> {
        loop {
            let len = self.source.read_u8()? as u64;
            if len == 0 {
                return Ok(());
            }
            self.source.skip(len)?;
        }
    }

    fn concat_sub_blocks(&mut self) -> Result<Vec<u8>> {
        let mut data = Vec::new();
        loop {
            let len = self.source.read_u8()? as usize;
            if len == 0 {
                return Ok(data);
            }
            let at = data.len();
            data.resize(at + len, 0);
            self.source.read_exact(&mut data[at..])?;
        }
    }

    /// Parses the extension blocks and image descriptor of the frame at the
    /// current position. The source is left at the first byte of the image
    /// data (the LZW minimum code size).
    fn parse_frame_metadata(&mut self, index: usize) -> Result<()> {
        self.frame_meta = None;
        self.curr_index = None;
        let start = self.source.position()?;
        let mut meta = FrameMetadata::default();
        loop {
            let block_type = self.source.read_u8()?;
            match block_type {
                IMAGE_SEPARATOR => {
                    meta.left = self.source.read_u16_le()?;
                    meta.top = self.source.read_u16_le()?;
                    meta.width = self.source.read_u16_le()?;
                    meta.height = self.source.read_u16_le()?;
                    let packed = self.source.read_u8()?;
                    meta.interlaced = packed & 0x40 != 0;
                    meta.sort_flag = packed & 0x20 != 0;
                    if packed & 0x80 != 0 {
                        let entries = 1usize << ((packed & 0x07) + 1);
                        let mut table = vec![0u8; 3 * entries];
                        self.source.read_exact(&mut table)?;
                        meta.local_color_table = Some(table);
                    }
                    self.metadata_len = self.source.position()? - start;
                    self.frame_meta = Some(meta);
                    self.curr_index = Some(index);
                    return Ok(());
                }
                EXTENSION_INTRODUCER => {
                    let label = self.source.read_u8()?;
                    match label {
                        GRAPHIC_CONTROL_LABEL => self.parse_graphic_control(&mut meta)?,
                        PLAIN_TEXT_LABEL => self.parse_plain_text(&mut meta)?,
                        COMMENT_LABEL => {
                            let comment = self.concat_sub_blocks()?;
                            meta.comments.push(comment);
                        }
                        APPLICATION_LABEL => self.parse_application(&mut meta)?,
                        _ => self.skip_sub_blocks()?,
                    }
                }
                TRAILER => return Err(GifError::NoSuchFrame { index }),
                other => return Err(GifError::UnexpectedBlock(other)),
            }
        }
    }

    fn parse_graphic_control(&mut self, meta: &mut FrameMetadata) -> Result<()> {
        let _block_size = self.source.read_u8()?; // 4
        let packed = self.source.read_u8()?;
        meta.disposal = DisposalMethod::from_packed(packed);
        meta.user_input = packed & 0x02 != 0;
        let transparent = packed & 0x01 != 0;
        meta.delay = self.source.read_u16_le()?;
        let transparent_index = self.source.read_u8()?;
        meta.transparent_index = transparent.then_some(transparent_index);
        let _terminator = self.source.read_u8()?;
        Ok(())
    }

    fn parse_plain_text(&mut self, meta: &mut FrameMetadata) -> Result<()> {
        let _block_size = self.source.read_u8()?; // 12
        let mut text = PlainText {
            grid_left: self.source.read_u16_le()?,
            grid_top: self.source.read_u16_le()?,
            grid_width: self.source.read_u16_le()?,
            grid_height: self.source.read_u16_le()?,
            cell_width: self.source.read_u8()?,
            cell_height: self.source.read_u8()?,
            foreground_color: self.source.read_u8()?,
            background_color: self.source.read_u8()?,
            text: Vec::new(),
        };
        text.text = self.concat_sub_blocks()?;
        meta.plain_text = Some(text);
        Ok(())
    }

    fn parse_application(&mut self, meta: &mut FrameMetadata) -> Result<()> {
        let block_size = self.source.read_u8()? as usize;
        let mut block = vec![0u8; block_size];
        self.source.read_exact(&mut block)?;
        let mut app = ApplicationExtension::default();
        let id_end = block_size.min(8);
        app.identifier[..id_end].copy_from_slice(&block[..id_end]);
        let auth_end = block_size.min(11);
        if auth_end > 8 {
            app.auth_code[..auth_end - 8].copy_from_slice(&block[8..auth_end]);
        }
        // Anything past the identifier and auth code belongs to the payload,
        // ahead of the follow-on sub-blocks.
        let mut data = block[auth_end..].to_vec();
        data.extend(self.concat_sub_blocks()?);
        app.data = data;
        meta.applications.push(app);
        Ok(())
    }

    /// Records where the frame after `index` starts, once its data has been
    /// fully consumed.
    fn record_next_offset(&mut self, index: usize) -> Result<()> {
        if self.frame_offsets.len() == index + 1 {
            let pos = self.source.position()?;
            self.frame_offsets.push(pos);
        }
        Ok(())
    }

    /// Indexed-raster sink: full interlace and region support.
    fn decode_indexed(
        &mut self,
        meta: &FrameMetadata,
        region: Option<Region>,
    ) -> Result<IndexedImage> {
        let width = meta.width as usize;
        let height = meta.height as usize;
        let src = match region {
            Some(r) => r.clip(width, height),
            None => Region::full(width, height),
        };

        let Self {
            source,
            lzw,
            row_buf,
            stream_meta,
            fallback_color_table,
            ..
        } = self;

        let table = resolve_color_table(
            meta,
            stream_meta.global_color_table.as_deref(),
            fallback_color_table,
        );
        let palette = Palette::normalize(table);
        let transparent = meta
            .transparent_index
            .map(|t| t.min((palette.entries() - 1) as u8));
        let mut image = IndexedImage::new(src.width as u32, src.height as u32, palette, transparent);

        let min_code_size = source.read_u8()?;
        lzw.begin(min_code_size)?;
        let mut blocks = BlockReader::begin(source)?;
        row_buf.clear();
        row_buf.resize(width, 0);

        // A zero-area frame rectangle has no pixels to place; its data
        // sub-blocks are still drained below.
        if width > 0 && height > 0 {
            let mut cursor = RowCursor::new(meta.interlaced, height as u32);
            let mut x = 0usize;
            let mut rows = 0usize;
            'frame: while let Some(len) = lzw.next_run(&mut blocks, source)? {
                for i in 0..len {
                    let index = lzw.run()[i];
                    if x >= src.x {
                        row_buf[x - src.x] = index;
                    }
                    x += 1;
                    if x == width {
                        x = 0;
                        rows += 1;
                        let y = cursor.y() as usize;
                        if src.contains_row(y) {
                            image.set_row(y - src.y, &row_buf[..src.width]);
                        }
                        if !cursor.advance() {
                            // All interlace passes done; remaining codes are
                            // ignored and the sub-blocks drained below.
                            break 'frame;
                        }
                    }
                }
            }
            debug!("decoded {rows} scanlines of {width}x{height} frame");
        }
        blocks.finish(source)?;
        Ok(image)
    }

    /// Direct-buffer sink: composites one full frame rectangle of RGBA
    /// straight into the caller's buffer, pulling non-decoded pixels from
    /// the previous frame.
    fn decode_direct(&mut self, meta: &FrameMetadata, params: DirectParams<'_>) -> Result<()> {
        let DirectParams {
            frame_width,
            frame_height,
            dst,
            dst_offset,
            prev,
        } = params;

        let extent = frame_width
            .checked_mul(frame_height)
            .and_then(|n| n.checked_mul(4))
            .ok_or_else(|| GifError::Format("frame extent overflows usize".to_string()))?;
        let dst_end = dst_offset
            .checked_add(extent)
            .filter(|&end| end <= dst.len())
            .ok_or(GifError::BufferTooSmall {
                needed: extent,
                offset: dst_offset,
                available: dst.len(),
            })?;
        let dst = &mut dst[dst_offset..dst_end];
        let prev = match prev {
            Some((buf, offset)) => {
                let end = offset
                    .checked_add(extent)
                    .filter(|&end| end <= buf.len())
                    .ok_or(GifError::BufferTooSmall {
                        needed: extent,
                        offset,
                        available: buf.len(),
                    })?;
                Some(&buf[offset..end])
            }
            None => None,
        };

        let Self {
            source,
            lzw,
            stream_meta,
            fallback_color_table,
            ..
        } = self;

        let table = resolve_color_table(
            meta,
            stream_meta.global_color_table.as_deref(),
            fallback_color_table,
        );
        // Byte offset of the transparent entry, clamped into the table; the
        // comparison below is against unclamped pixel offsets.
        let transparent_at = meta
            .transparent_index
            .map(|t| (t as usize * 3).min(table.len().saturating_sub(1)));
        let resolve_alpha = prev.is_some() && transparent_at.is_some();

        let min_code_size = source.read_u8()?;
        lzw.begin(min_code_size)?;
        let mut blocks = BlockReader::begin(source)?;

        if extent > 0 {
            let left = meta.left as usize;
            let top = meta.top as usize;
            let right = left + meta.width as usize;
            let bottom = top + meta.height as usize;

            let mut decoding = true;
            let mut run_pos = 0usize;
            let mut run_len = 0usize;
            let (mut x, mut y) = (0usize, 0usize);
            let mut at = 0usize;
            loop {
                let mut inside = decoding && y >= top && y < bottom && x >= left && x < right;
                if inside && run_pos >= run_len {
                    match lzw.next_run(&mut blocks, source)? {
                        Some(len) => {
                            run_len = len;
                            run_pos = 0;
                        }
                        None => {
                            decoding = false;
                            inside = false;
                        }
                    }
                }
                if inside {
                    let color = lzw.run()[run_pos] as usize * 3;
                    run_pos += 1;
                    if resolve_alpha && Some(color) == transparent_at {
                        if let Some(prev) = prev {
                            dst[at..at + 3].copy_from_slice(&prev[at..at + 3]);
                        }
                    } else if color + 3 <= table.len() {
                        dst[at..at + 3].copy_from_slice(&table[color..color + 3]);
                    } else {
                        dst[at..at + 3].fill(0);
                    }
                } else {
                    match prev {
                        Some(prev) => dst[at..at + 3].copy_from_slice(&prev[at..at + 3]),
                        None => dst[at..at + 3].fill(0),
                    }
                }
                dst[at + 3] = 0xFF;
                at += 4;
                x += 1;
                if x >= frame_width {
                    x = 0;
                    y += 1;
                    if y >= frame_height {
                        break;
                    }
                }
            }
        }
        blocks.finish(source)?;
        Ok(())
    }
}

/// Picks the color table for a frame: local first (remembered for later
/// frames), then global, then the last local table seen, then the built-in
/// default palette.
fn resolve_color_table<'a>(
    meta: &'a FrameMetadata,
    global: Option<&'a [u8]>,
    fallback: &'a mut Option<Vec<u8>>,
) -> &'a [u8] {
    if let Some(local) = meta.local_color_table.as_deref() {
        *fallback = Some(local.to_vec());
        local
    } else if let Some(global) = global {
        global
    } else if let Some(sticky) = fallback.as_deref() {
        sticky
    } else {
        warn!("frame carries no color table and the stream has none, using default palette");
        palette::default_palette()
    }
}
