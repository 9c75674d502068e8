//! Stream- and frame-level metadata types and GIF block labels.

/// Image descriptor separator byte.
pub const IMAGE_SEPARATOR: u8 = 0x2C;
/// Extension introducer byte.
pub const EXTENSION_INTRODUCER: u8 = 0x21;
/// Stream trailer byte.
pub const TRAILER: u8 = 0x3B;

/// Graphic control extension label.
pub const GRAPHIC_CONTROL_LABEL: u8 = 0xF9;
/// Plain text extension label.
pub const PLAIN_TEXT_LABEL: u8 = 0x01;
/// Comment extension label.
pub const COMMENT_LABEL: u8 = 0xFE;
/// Application extension label.
pub const APPLICATION_LABEL: u8 = 0xFF;

/// How a frame's pixels are disposed of before the next frame is drawn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DisposalMethod {
    /// No disposal specified.
    #[default]
    None,
    /// Keep the frame in place.
    Keep,
    /// Restore the area to the background color.
    RestoreBackground,
    /// Restore the area to the previous frame.
    RestorePrevious,
}

impl DisposalMethod {
    /// Extracts the disposal method from a graphic control packed-fields byte.
    pub fn from_packed(packed: u8) -> Self {
        match (packed >> 2) & 0x07 {
            1 => DisposalMethod::Keep,
            2 => DisposalMethod::RestoreBackground,
            3 => DisposalMethod::RestorePrevious,
            _ => DisposalMethod::None,
        }
    }

    /// Raw disposal value as stored in the graphic control extension.
    pub fn as_u8(&self) -> u8 {
        match self {
            DisposalMethod::None => 0,
            DisposalMethod::Keep => 1,
            DisposalMethod::RestoreBackground => 2,
            DisposalMethod::RestorePrevious => 3,
        }
    }

    /// True when the frame leaves previously drawn pixels in place, which is
    /// what the direct-buffer sink requires.
    pub fn preserves_previous(&self) -> bool {
        matches!(self, DisposalMethod::None | DisposalMethod::Keep)
    }
}

/// Header-level metadata: signature version, logical screen descriptor, and
/// the global color table if present.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct StreamMetadata {
    /// Version bytes 3..6 of the signature, e.g. "89a". Recorded verbatim,
    /// unknown versions are accepted.
    pub version: String,
    /// Logical screen width in pixels.
    pub width: u16,
    /// Logical screen height in pixels.
    pub height: u16,
    /// Color resolution in bits, 1..=8.
    pub color_resolution: u8,
    /// Global color table sort flag.
    pub sort_flag: bool,
    /// Background color index into the global color table.
    pub background_color_index: u8,
    /// Raw pixel aspect ratio byte.
    pub pixel_aspect_ratio: u8,
    /// Flat RGB triples of the global color table, if the header declares one.
    pub global_color_table: Option<Vec<u8>>,
}

/// Plain text extension contents.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct PlainText {
    pub grid_left: u16,
    pub grid_top: u16,
    pub grid_width: u16,
    pub grid_height: u16,
    pub cell_width: u8,
    pub cell_height: u8,
    pub foreground_color: u8,
    pub background_color: u8,
    /// Concatenated text sub-block bytes.
    pub text: Vec<u8>,
}

/// Application extension contents.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ApplicationExtension {
    /// 8-byte application identifier, zero-padded if the block was short.
    pub identifier: [u8; 8],
    /// 3-byte authentication code, zero-padded if the block was short.
    pub auth_code: [u8; 3],
    /// Remaining bytes of the first sub-block plus all following sub-blocks.
    pub data: Vec<u8>,
}

/// Per-frame metadata: image descriptor fields plus everything gathered from
/// the extension blocks preceding the descriptor. A fresh instance replaces
/// the previous one whenever a new frame's metadata is parsed.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct FrameMetadata {
    /// Frame rectangle offset from the logical screen's left edge.
    pub left: u16,
    /// Frame rectangle offset from the logical screen's top edge.
    pub top: u16,
    /// Frame rectangle width in pixels.
    pub width: u16,
    /// Frame rectangle height in pixels.
    pub height: u16,
    /// True when the frame's rows are stored in four-pass interlaced order.
    pub interlaced: bool,
    /// Local color table sort flag.
    pub sort_flag: bool,
    /// Flat RGB triples of the local color table, if the descriptor declares one.
    pub local_color_table: Option<Vec<u8>>,
    /// Disposal method from the graphic control extension.
    pub disposal: DisposalMethod,
    /// User input flag from the graphic control extension.
    pub user_input: bool,
    /// Transparent color index, present when the graphic control extension
    /// set the transparency flag.
    pub transparent_index: Option<u8>,
    /// Frame delay in hundredths of a second.
    pub delay: u16,
    /// Plain text extension, if one preceded the descriptor.
    pub plain_text: Option<PlainText>,
    /// Comment extension payloads, in stream order.
    pub comments: Vec<Vec<u8>>,
    /// Application extension payloads, in stream order.
    pub applications: Vec<ApplicationExtension>,
}

/// A source rectangle for partial decodes, in frame coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Region {
    pub x: usize,
    pub y: usize,
    pub width: usize,
    pub height: usize,
}

impl Region {
    /// The full frame rectangle.
    pub fn full(width: usize, height: usize) -> Self {
        Region {
            x: 0,
            y: 0,
            width,
            height,
        }
    }

    /// Intersects this region with a `width` x `height` frame.
    pub(crate) fn clip(self, width: usize, height: usize) -> Region {
        let x = self.x.min(width);
        let y = self.y.min(height);
        Region {
            x,
            y,
            width: self.width.min(width - x),
            height: self.height.min(height - y),
        }
    }

    pub(crate) fn contains_row(&self, row: usize) -> bool {
        row >= self.y && row < self.y + self.height
    }
}
