//! Planar 4:2:0 frame layout and the encoder output view

use crate::error::{EncoderError, Result};

/// Fixed-offset I420 layout for a given resolution
///
/// Luma plane of `width * height` bytes, then U and V planes of
/// `width * height / 4` bytes each, chroma strides `width / 2`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct I420Layout {
    width: u32,
    height: u32,
}

impl I420Layout {
    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    /// Bytes in the luma plane
    pub fn luma_size(&self) -> usize {
        self.width as usize * self.height as usize
    }

    /// Bytes in each chroma plane
    pub fn chroma_size(&self) -> usize {
        self.luma_size() / 4
    }

    /// Minimum input length for one frame
    pub fn frame_size(&self) -> usize {
        self.luma_size() * 3 / 2
    }

    pub fn luma_stride(&self) -> u32 {
        self.width
    }

    pub fn chroma_stride(&self) -> u32 {
        self.width / 2
    }

    /// Split a flat buffer into its three planes
    ///
    /// Extra trailing bytes are ignored; a short buffer is rejected.
    pub fn split<'a>(&self, data: &'a [u8]) -> Result<I420Planes<'a>> {
        let expected = self.frame_size();
        if data.len() < expected {
            return Err(EncoderError::InputTooSmall {
                actual: data.len(),
                expected,
            });
        }

        let luma = self.luma_size();
        let chroma = self.chroma_size();
        let (y, rest) = data.split_at(luma);
        let (u, rest) = rest.split_at(chroma);
        let v = &rest[..chroma];

        Ok(I420Planes {
            y,
            u,
            v,
            y_stride: self.luma_stride(),
            uv_stride: self.chroma_stride(),
            width: self.width,
            height: self.height,
        })
    }
}

/// Borrowed plane views into a caller-owned I420 buffer
#[derive(Debug, Clone, Copy)]
pub struct I420Planes<'a> {
    pub y: &'a [u8],
    pub u: &'a [u8],
    pub v: &'a [u8],
    pub y_stride: u32,
    pub uv_stride: u32,
    pub width: u32,
    pub height: u32,
}

/// Encoded output aliasing backend-owned memory
///
/// Borrowed from the encoder for exactly one encode call: the next mutating
/// call on the same encoder needs `&mut` access again, so the compiler rejects
/// any use of a stale view. Copy it with [`Bitstream::to_vec`] to keep it.
#[derive(Debug, Clone, Copy)]
pub struct Bitstream<'a> {
    data: &'a [u8],
    keyframe: bool,
}

impl<'a> Bitstream<'a> {
    pub fn new(data: &'a [u8], keyframe: bool) -> Self {
        Self { data, keyframe }
    }

    /// A frame the backend chose not to emit (rate control skip)
    pub fn empty() -> Self {
        Self {
            data: &[],
            keyframe: false,
        }
    }

    pub fn as_bytes(&self) -> &'a [u8] {
        self.data
    }

    pub fn as_ptr(&self) -> *const u8 {
        self.data.as_ptr()
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// IDR or I frame
    pub fn is_keyframe(&self) -> bool {
        self.keyframe
    }

    pub fn to_vec(&self) -> Vec<u8> {
        self.data.to_vec()
    }
}

impl AsRef<[u8]> for Bitstream<'_> {
    fn as_ref(&self) -> &[u8] {
        self.data
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_layout_sizes_720p() {
        let layout = I420Layout::new(1280, 720);
        assert_eq!(layout.luma_size(), 921_600);
        assert_eq!(layout.chroma_size(), 230_400);
        assert_eq!(layout.frame_size(), 1_382_400);
        assert_eq!(layout.chroma_stride(), 640);
    }

    #[test]
    fn test_split_plane_offsets() {
        let layout = I420Layout::new(16, 16);
        let mut data = vec![0u8; layout.frame_size()];
        data[256] = 0xAA; // first U byte
        data[256 + 64] = 0xBB; // first V byte

        let planes = layout.split(&data).unwrap();
        assert_eq!(planes.y.len(), 256);
        assert_eq!(planes.u.len(), 64);
        assert_eq!(planes.v.len(), 64);
        assert_eq!(planes.u[0], 0xAA);
        assert_eq!(planes.v[0], 0xBB);
        assert_eq!(planes.y_stride, 16);
        assert_eq!(planes.uv_stride, 8);
    }

    #[test]
    fn test_split_rejects_short_buffer() {
        let layout = I420Layout::new(16, 16);
        let data = vec![0u8; layout.frame_size() - 1];
        match layout.split(&data) {
            Err(EncoderError::InputTooSmall { actual, expected }) => {
                assert_eq!(actual, 383);
                assert_eq!(expected, 384);
            }
            other => panic!("expected InputTooSmall, got {:?}", other.map(|p| p.width)),
        }
    }

    #[test]
    fn test_split_ignores_trailing_bytes() {
        let layout = I420Layout::new(16, 16);
        let data = vec![1u8; layout.frame_size() + 100];
        let planes = layout.split(&data).unwrap();
        assert_eq!(planes.v.len(), 64);
    }
}
