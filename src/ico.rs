//! # ICO Container Encoder
//!
//! Encodes a single RGBA bitmap into the legacy Windows icon container, byte for byte
//! the way tray APIs expect it.
//!
//! ## Layout
//!
//! | Offset | Size              | Content                                        |
//! |--------|-------------------|------------------------------------------------|
//! | 0      | 6                 | `ICONDIR`: reserved 0, type 1 (icon), count 1  |
//! | 6      | 16                | `ICONDIRENTRY` for the single image            |
//! | 22     | 40                | `BITMAPINFOHEADER`, height doubled             |
//! | 62     | `w * h * 4`       | BGRA pixels, bottom row first                  |
//! | ...    | `h * mask_stride` | AND mask, all zero                             |
//!
//! All multi-byte fields are little-endian. Width and height are stored in a single
//! byte in the directory entry, with `0` meaning 256, which is why 256 is a hard
//! ceiling.
//!
//! The AND mask carries no information (alpha does the work) but readers expect it,
//! and fully transparent pixels are written as four zero bytes regardless of their
//! colour channels. Both quirks are kept for byte-exact output.

use crate::IconFrame;
use thiserror::Error;

/// Largest width or height the container can describe.
pub const MAX_DIMENSION: u32 = 256;

/// `ICONDIR` (6) + one `ICONDIRENTRY` (16). Also the smallest plausible icon file.
pub const HEADER_LEN: usize = 22;

const BITMAP_INFO_LEN: u32 = 40;
const BITS_PER_PIXEL: u16 = 32;

/// Errors raised while building or encoding a pixel buffer.
#[derive(Error, Debug, PartialEq, Eq)]
pub enum IcoError {
    /// The container stores each dimension in one byte (0 = 256).
    #[error("image too large: {width}x{height} (max 256x256)")]
    DimensionTooLarge { width: u32, height: u32 },

    /// Zero-sized image or a pixel slice that does not match the dimensions.
    #[error("invalid pixel buffer: {0}")]
    InvalidBuffer(String),
}

/// Byte length of a `width` x `height` RGBA image, if it fits in memory at all.
fn rgba_len(width: u32, height: u32) -> Result<usize, IcoError> {
    (width as usize)
        .checked_mul(height as usize)
        .and_then(|pixels| pixels.checked_mul(4))
        .ok_or_else(|| IcoError::InvalidBuffer(format!("{width}x{height} is too large")))
}

/// A rectangular RGBA image, 8 bits per channel, top row first.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PixelBuffer {
    width: u32,
    height: u32,
    rgba: Vec<u8>,
}

impl PixelBuffer {
    /// Fully transparent buffer of the given size.
    pub fn new(width: u32, height: u32) -> Result<Self, IcoError> {
        let len = rgba_len(width, height)?;
        Self::from_rgba(width, height, vec![0; len])
    }

    /// Wrap raw RGBA bytes laid out row by row, top row first.
    pub fn from_rgba(width: u32, height: u32, rgba: Vec<u8>) -> Result<Self, IcoError> {
        if width == 0 || height == 0 {
            return Err(IcoError::InvalidBuffer(format!(
                "dimensions must be non-zero, got {width}x{height}"
            )));
        }
        let expected = rgba_len(width, height)?;
        if rgba.len() != expected {
            return Err(IcoError::InvalidBuffer(format!(
                "expected {expected} bytes for {width}x{height}, got {}",
                rgba.len()
            )));
        }
        Ok(Self {
            width,
            height,
            rgba,
        })
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn as_rgba(&self) -> &[u8] {
        &self.rgba
    }

    /// `[r, g, b, a]` at `(x, y)`, or `None` outside the image.
    pub fn pixel(&self, x: u32, y: u32) -> Option<[u8; 4]> {
        if x >= self.width || y >= self.height {
            return None;
        }
        let i = self.index(x, y);
        Some([
            self.rgba[i],
            self.rgba[i + 1],
            self.rgba[i + 2],
            self.rgba[i + 3],
        ])
    }

    /// Writes outside the image are ignored.
    pub fn set_pixel(&mut self, x: u32, y: u32, rgba: [u8; 4]) {
        if x >= self.width || y >= self.height {
            return;
        }
        let i = self.index(x, y);
        self.rgba[i..i + 4].copy_from_slice(&rgba);
    }

    fn index(&self, x: u32, y: u32) -> usize {
        ((y as usize) * (self.width as usize) + x as usize) * 4
    }
}

/// Bytes per AND-mask row: one bit per pixel, padded to 32-bit boundaries.
pub fn mask_stride(width: u32) -> usize {
    (width as usize).div_ceil(32) * 4
}

/// Total size of the encoded container for a `width` x `height` image.
pub fn encoded_len(width: u32, height: u32) -> usize {
    HEADER_LEN + image_len(width, height)
}

/// Size of the embedded image: bitmap header, pixels and mask.
fn image_len(width: u32, height: u32) -> usize {
    let (w, h) = (width as usize, height as usize);
    BITMAP_INFO_LEN as usize + w * h * 4 + h * mask_stride(width)
}

/// Directory entries store 1..=255 as-is and 256 as 0.
fn dimension_byte(value: u32) -> u8 {
    if value >= MAX_DIMENSION {
        0
    } else {
        value as u8
    }
}

/// Encode `buffer` as a single-image `.ico` container.
///
/// Output is deterministic: the same buffer always produces the same bytes.
///
/// # Example
/// ```
/// use cpu_flipbook_lib::ico::{encode, encoded_len, PixelBuffer};
///
/// let mut buffer = PixelBuffer::new(16, 16).unwrap();
/// buffer.set_pixel(0, 0, [255, 0, 0, 255]);
///
/// let icon = encode(&buffer).unwrap();
/// assert_eq!(icon.len(), encoded_len(16, 16));
/// assert_eq!(&icon.as_bytes()[..6], &[0, 0, 1, 0, 1, 0]);
/// ```
pub fn encode(buffer: &PixelBuffer) -> Result<IconFrame, IcoError> {
    let (width, height) = (buffer.width, buffer.height);
    if width > MAX_DIMENSION || height > MAX_DIMENSION {
        return Err(IcoError::DimensionTooLarge { width, height });
    }

    let pixel_bytes = width * height * 4;
    let mut out = Vec::with_capacity(encoded_len(width, height));

    // ICONDIR
    out.extend_from_slice(&0u16.to_le_bytes());
    out.extend_from_slice(&1u16.to_le_bytes());
    out.extend_from_slice(&1u16.to_le_bytes());

    // ICONDIRENTRY
    out.push(dimension_byte(width));
    out.push(dimension_byte(height));
    out.push(0); // palette size
    out.push(0); // reserved
    out.extend_from_slice(&1u16.to_le_bytes());
    out.extend_from_slice(&BITS_PER_PIXEL.to_le_bytes());
    out.extend_from_slice(&(image_len(width, height) as u32).to_le_bytes());
    out.extend_from_slice(&(HEADER_LEN as u32).to_le_bytes());

    // BITMAPINFOHEADER
    out.extend_from_slice(&BITMAP_INFO_LEN.to_le_bytes());
    out.extend_from_slice(&(width as i32).to_le_bytes());
    out.extend_from_slice(&((height * 2) as i32).to_le_bytes());
    out.extend_from_slice(&1u16.to_le_bytes());
    out.extend_from_slice(&BITS_PER_PIXEL.to_le_bytes());
    out.extend_from_slice(&0u32.to_le_bytes()); // BI_RGB
    out.extend_from_slice(&pixel_bytes.to_le_bytes());
    out.extend_from_slice(&0i32.to_le_bytes()); // x pixels per metre
    out.extend_from_slice(&0i32.to_le_bytes()); // y pixels per metre
    out.extend_from_slice(&0u32.to_le_bytes()); // colours used
    out.extend_from_slice(&0u32.to_le_bytes()); // important colours

    // XOR bitmap, bottom-up BGRA
    let row_len = width as usize * 4;
    for row in buffer.rgba.chunks_exact(row_len).rev() {
        for px in row.chunks_exact(4) {
            if px[3] == 0 {
                out.extend_from_slice(&[0, 0, 0, 0]);
            } else {
                out.extend_from_slice(&[px[2], px[1], px[0], px[3]]);
            }
        }
    }

    // AND mask
    out.resize(out.len() + height as usize * mask_stride(width), 0x00);

    debug_assert_eq!(out.len(), encoded_len(width, height));
    Ok(IconFrame::from_bytes(out))
}
