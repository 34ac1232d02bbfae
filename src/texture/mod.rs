//! Texture assets: a fixed little-endian header describing dimensions and
//! mip/array layout, followed by the raw surface data for every mip level.

pub mod convert;
pub mod format;

pub use convert::{PixelBuffer, decode_texture_slice};
pub use format::{ConversionKind, FormatKind, TargetFormat, TextureFormat, conversion_for};

use std::{
    io::Cursor,
    sync::OnceLock,
};

use byteorder::{LittleEndian, ReadBytesExt};

use crate::DecodeError;

pub const ATTR_TEXTURE_1D: u32 = 0x0010_0000;
pub const ATTR_TEXTURE_2D: u32 = 0x0020_0000;
pub const ATTR_TEXTURE_3D: u32 = 0x0040_0000;
pub const ATTR_TEXTURE_CUBE: u32 = 0x0080_0000;

pub const TEXTURE_HEADER_SIZE: usize = 80;

/// Highest number of surfaces the header can address.
pub const MAX_MIP_LEVELS: u16 = 13;

/// The fixed texture file header, decoded verbatim.
#[derive(Debug, Clone, PartialEq)]
pub struct TextureHeader {
    pub attributes: u32,
    pub format: TextureFormat,
    pub width: u16,
    pub height: u16,
    pub depth: u16,
    pub mip_levels: u16,
    pub lod_offsets: [u32; 3],
    pub surface_offsets: [u32; 13],
}

impl TextureHeader {
    pub fn is_cube(&self) -> bool {
        self.attributes & ATTR_TEXTURE_CUBE != 0
    }

    pub fn is_volume(&self) -> bool {
        self.attributes & ATTR_TEXTURE_3D != 0
    }

    /// Dimensions at a mip level: halved per level, floor-clamped to 1.
    pub fn mip_dimensions(&self, mip: u16) -> (u32, u32) {
        let width = (self.width as u32 >> mip).max(1);
        let height = (self.height as u32 >> mip).max(1);
        (width, height)
    }

    /// Faces (cube) or z-slices (volume) addressable at a mip level.
    pub fn face_count(&self, mip: u16) -> u32 {
        if self.is_cube() {
            6
        } else {
            (self.depth as u32 >> mip).max(1)
        }
    }
}

/// Decodes the fixed texture header.
///
/// A cube-map attribute combined with `depth != 1` is structurally
/// contradictory and is rejected rather than silently truncated; unknown
/// format codes are rejected rather than defaulted.
pub fn decode_texture_header(bytes: &[u8]) -> Result<TextureHeader, DecodeError> {
    if bytes.len() < TEXTURE_HEADER_SIZE {
        return Err(DecodeError::TruncatedData);
    }

    let mut cur = Cursor::new(bytes);

    let attributes = cur.read_u32::<LittleEndian>()?;
    let raw_format = cur.read_u32::<LittleEndian>()?;
    let format =
        TextureFormat::try_from(raw_format).map_err(|_| DecodeError::UnsupportedFormat(raw_format))?;

    let width = cur.read_u16::<LittleEndian>()?;
    let height = cur.read_u16::<LittleEndian>()?;
    let depth = cur.read_u16::<LittleEndian>()?;
    let mip_levels = cur.read_u16::<LittleEndian>()?;

    let mut lod_offsets = [0u32; 3];
    for offset in lod_offsets.iter_mut() {
        *offset = cur.read_u32::<LittleEndian>()?;
    }

    let mut surface_offsets = [0u32; 13];
    for offset in surface_offsets.iter_mut() {
        *offset = cur.read_u32::<LittleEndian>()?;
    }

    let header = TextureHeader {
        attributes,
        format,
        width,
        height,
        depth,
        mip_levels,
        lod_offsets,
        surface_offsets,
    };

    if header.is_cube() && header.depth != 1 {
        return Err(DecodeError::InvalidHeader(format!(
            "cube map with depth {}",
            header.depth
        )));
    }

    if header.mip_levels == 0 || header.mip_levels > MAX_MIP_LEVELS {
        return Err(DecodeError::InvalidHeader(format!(
            "mip level count {}",
            header.mip_levels
        )));
    }

    Ok(header)
}

/// An owned texture file plus a single-slot cache for the conversion most
/// callers want first: mip 0, face 0, compatibility target.
///
/// The cache is compute-once-publish through [`OnceLock`]; a redundant
/// decode on a race is harmless since the conversion is deterministic.
pub struct TextureHandle {
    header: TextureHeader,
    data: Vec<u8>,
    preview: OnceLock<PixelBuffer>,
}

impl TextureHandle {
    pub fn new(data: Vec<u8>) -> Result<TextureHandle, DecodeError> {
        let header = decode_texture_header(&data)?;

        Ok(TextureHandle {
            header,
            data,
            preview: OnceLock::new(),
        })
    }

    pub fn header(&self) -> &TextureHeader {
        &self.header
    }

    pub fn slice(
        &self,
        mip: u16,
        face: u32,
        target: TargetFormat,
        compatibility: bool,
    ) -> Result<PixelBuffer, DecodeError> {
        decode_texture_slice(&self.header, &self.data, mip, face, target, compatibility)
    }

    /// The memoized default conversion of the top surface.
    pub fn preview(&self) -> Result<&PixelBuffer, DecodeError> {
        if let Some(buffer) = self.preview.get() {
            return Ok(buffer);
        }

        let (target, _) = conversion_for(self.header.format, true)?;
        let buffer = decode_texture_slice(&self.header, &self.data, 0, 0, target, true)?;

        Ok(self.preview.get_or_init(|| buffer))
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use byteorder::WriteBytesExt;

    use super::*;

    /// Writes a header the way the files lay it out. Surface offsets past
    /// the declared mip count stay zero.
    pub(crate) fn header_bytes(
        attributes: u32,
        format: TextureFormat,
        width: u16,
        height: u16,
        depth: u16,
        mip_levels: u16,
        surface_offsets: &[u32],
    ) -> Vec<u8> {
        let mut bytes = Vec::with_capacity(TEXTURE_HEADER_SIZE);

        bytes.write_u32::<LittleEndian>(attributes).unwrap();
        bytes.write_u32::<LittleEndian>(format.into()).unwrap();
        bytes.write_u16::<LittleEndian>(width).unwrap();
        bytes.write_u16::<LittleEndian>(height).unwrap();
        bytes.write_u16::<LittleEndian>(depth).unwrap();
        bytes.write_u16::<LittleEndian>(mip_levels).unwrap();

        for _ in 0..3 {
            bytes.write_u32::<LittleEndian>(0).unwrap();
        }

        for mip in 0..13 {
            let offset = surface_offsets.get(mip).copied().unwrap_or(0);
            bytes.write_u32::<LittleEndian>(offset).unwrap();
        }

        bytes
    }

    #[test]
    fn header_round_trip() {
        let bytes = header_bytes(
            ATTR_TEXTURE_2D,
            TextureFormat::B8G8R8A8,
            256,
            128,
            1,
            2,
            &[80, 80 + 256 * 128 * 4],
        );

        let header = decode_texture_header(&bytes).unwrap();

        assert_eq!(header.format, TextureFormat::B8G8R8A8);
        assert_eq!(header.width, 256);
        assert_eq!(header.height, 128);
        assert_eq!(header.mip_levels, 2);
        assert_eq!(header.surface_offsets[0], 80);
        assert_eq!(header.surface_offsets[2], 0);
    }

    #[test]
    fn cube_with_depth_is_invalid() {
        let bytes = header_bytes(
            ATTR_TEXTURE_CUBE,
            TextureFormat::B8G8R8A8,
            32,
            32,
            2,
            1,
            &[80],
        );

        assert!(matches!(
            decode_texture_header(&bytes),
            Err(DecodeError::InvalidHeader(_))
        ));
    }

    #[test]
    fn unknown_format_code_is_rejected() {
        let mut bytes = header_bytes(
            ATTR_TEXTURE_2D,
            TextureFormat::B8G8R8A8,
            32,
            32,
            1,
            1,
            &[80],
        );
        bytes[4..8].copy_from_slice(&0x9999u32.to_le_bytes());

        assert_eq!(
            decode_texture_header(&bytes),
            Err(DecodeError::UnsupportedFormat(0x9999))
        );
    }

    #[test]
    fn short_header_is_truncated() {
        assert_eq!(
            decode_texture_header(&[0u8; 20]),
            Err(DecodeError::TruncatedData)
        );
    }

    #[test]
    fn mip_dimensions_clamp_to_one() {
        let bytes = header_bytes(
            ATTR_TEXTURE_2D,
            TextureFormat::B8G8R8A8,
            16,
            4,
            1,
            5,
            &[80, 81, 82, 83, 84],
        );
        let header = decode_texture_header(&bytes).unwrap();

        assert_eq!(header.mip_dimensions(0), (16, 4));
        assert_eq!(header.mip_dimensions(2), (4, 1));
        assert_eq!(header.mip_dimensions(4), (1, 1));
    }
}
