use num_enum::{IntoPrimitive, TryFromPrimitive};

use crate::DecodeError;

/// Wire-format pixel format codes.
///
/// The code packs four nibble fields: `0xKCBE` where K is the format kind
/// (integer / float / block-compressed / depth-stencil / special / BC),
/// C the component count, B the log2 of bits per pixel, and E a tie-break
/// enumerator. The set is closed; codes outside it are rejected, never
/// defaulted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, TryFromPrimitive, IntoPrimitive)]
#[repr(u32)]
pub enum TextureFormat {
    L8 = 0x1130,
    A8 = 0x1131,
    B4G4R4A4 = 0x1440,
    B5G5R5A1 = 0x1441,
    B8G8R8A8 = 0x1450,
    B8G8R8X8 = 0x1451,

    R32Float = 0x2150,
    R16G16Float = 0x2250,
    R32G32Float = 0x2260,
    R16G16B16A16Float = 0x2460,
    R32G32B32A32Float = 0x2470,

    Bc1 = 0x3420,
    Bc2 = 0x3430,
    Bc3 = 0x3431,

    D16 = 0x4140,
    D24S8 = 0x4250,

    Null = 0x5100,
    Shadow16 = 0x5140,
    Shadow24 = 0x5150,

    Bc4 = 0x6120,
    Bc5 = 0x6230,
    Bc7 = 0x6432,
}

const KIND_SHIFT: u32 = 12;
const COMPONENT_SHIFT: u32 = 8;
const BPP_SHIFT: u32 = 4;
const NIBBLE_MASK: u32 = 0xf;

#[derive(Debug, Clone, Copy, PartialEq, Eq, TryFromPrimitive, IntoPrimitive)]
#[repr(u32)]
pub enum FormatKind {
    Integer = 1,
    Float = 2,
    Dxt = 3,
    DepthStencil = 4,
    Special = 5,
    Bc = 6,
}

impl TextureFormat {
    pub fn kind(self) -> FormatKind {
        let nibble = (u32::from(self) >> KIND_SHIFT) & NIBBLE_MASK;
        // Every enumerated code carries a valid kind nibble.
        FormatKind::try_from(nibble).unwrap_or(FormatKind::Special)
    }

    pub fn component_count(self) -> u32 {
        (u32::from(self) >> COMPONENT_SHIFT) & NIBBLE_MASK
    }

    pub fn bits_per_pixel(self) -> u32 {
        1 << ((u32::from(self) >> BPP_SHIFT) & NIBBLE_MASK)
    }

    pub fn enumerator(self) -> u32 {
        u32::from(self) & NIBBLE_MASK
    }

    /// Whether this format stores 4x4 texel blocks rather than linear
    /// pixels.
    pub fn is_block_compressed(self) -> bool {
        matches!(self.kind(), FormatKind::Dxt | FormatKind::Bc)
    }

    /// Bytes per 4x4 block for block-compressed formats: 16 texels at the
    /// format's bit rate.
    pub fn block_size(self) -> usize {
        (self.bits_per_pixel() as usize * 16) / 8
    }
}

/// How a source buffer reaches the target format. The set is closed;
/// formats with no entry in [`conversion_for`] fail decoding outright.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConversionKind {
    None,
    ExpandL8ToBgra8,
    ExpandB4G4R4A4ToBgra8,
    ExpandB5G5R5A1ToBgra8,
}

/// Pixel layouts a conversion can produce.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TargetFormat {
    Bgra8,
    Rgba8,
    B4G4R4A4,
    B5G5R5A1,
}

impl TargetFormat {
    pub fn bytes_per_pixel(self) -> usize {
        match self {
            TargetFormat::Bgra8 | TargetFormat::Rgba8 => 4,
            TargetFormat::B4G4R4A4 | TargetFormat::B5G5R5A1 => 2,
        }
    }
}

/// Maps a wire format to its output format and conversion.
///
/// `compatibility` selects the legacy-renderer behavior of widening 16-bit
/// formats to 32-bit BGRA; with it off they pass through narrow. Both are
/// valid outputs, chosen by caller intent. Formats outside the table fail
/// with [`DecodeError::UnsupportedFormat`].
pub fn conversion_for(
    format: TextureFormat,
    compatibility: bool,
) -> Result<(TargetFormat, ConversionKind), DecodeError> {
    match format {
        TextureFormat::L8 | TextureFormat::A8 => {
            Ok((TargetFormat::Bgra8, ConversionKind::ExpandL8ToBgra8))
        }
        TextureFormat::B4G4R4A4 => {
            if compatibility {
                Ok((TargetFormat::Bgra8, ConversionKind::ExpandB4G4R4A4ToBgra8))
            } else {
                Ok((TargetFormat::B4G4R4A4, ConversionKind::None))
            }
        }
        TextureFormat::B5G5R5A1 => {
            if compatibility {
                Ok((TargetFormat::Bgra8, ConversionKind::ExpandB5G5R5A1ToBgra8))
            } else {
                Ok((TargetFormat::B5G5R5A1, ConversionKind::None))
            }
        }
        TextureFormat::B8G8R8A8 | TextureFormat::B8G8R8X8 => {
            Ok((TargetFormat::Bgra8, ConversionKind::None))
        }
        // Block decompression supplies the conversion for the BC family.
        TextureFormat::Bc1 | TextureFormat::Bc2 | TextureFormat::Bc3 | TextureFormat::Bc4 => {
            Ok((TargetFormat::Rgba8, ConversionKind::None))
        }
        other => Err(DecodeError::UnsupportedFormat(other.into())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn nibble_fields() {
        assert_eq!(TextureFormat::Bc1.kind(), FormatKind::Dxt);
        assert_eq!(TextureFormat::Bc1.bits_per_pixel(), 4);
        assert_eq!(TextureFormat::Bc1.enumerator(), 0);

        assert_eq!(TextureFormat::Bc3.bits_per_pixel(), 8);
        assert_eq!(TextureFormat::Bc3.enumerator(), 1);

        assert_eq!(TextureFormat::B8G8R8A8.kind(), FormatKind::Integer);
        assert_eq!(TextureFormat::B8G8R8A8.component_count(), 4);
        assert_eq!(TextureFormat::B8G8R8A8.bits_per_pixel(), 32);

        assert_eq!(TextureFormat::L8.component_count(), 1);
        assert_eq!(TextureFormat::L8.bits_per_pixel(), 8);

        assert_eq!(TextureFormat::R32G32B32A32Float.kind(), FormatKind::Float);
        assert_eq!(TextureFormat::R32G32B32A32Float.bits_per_pixel(), 128);

        assert_eq!(TextureFormat::D24S8.kind(), FormatKind::DepthStencil);
        assert_eq!(TextureFormat::Bc4.kind(), FormatKind::Bc);
    }

    #[test]
    fn block_sizes() {
        assert_eq!(TextureFormat::Bc1.block_size(), 8);
        assert_eq!(TextureFormat::Bc2.block_size(), 16);
        assert_eq!(TextureFormat::Bc3.block_size(), 16);
        assert_eq!(TextureFormat::Bc4.block_size(), 8);
    }

    #[test]
    fn compatibility_selects_expansion() {
        assert_eq!(
            conversion_for(TextureFormat::B4G4R4A4, true).unwrap(),
            (TargetFormat::Bgra8, ConversionKind::ExpandB4G4R4A4ToBgra8)
        );

        let (target, conversion) = conversion_for(TextureFormat::B4G4R4A4, false).unwrap();
        assert_eq!(conversion, ConversionKind::None);
        assert_eq!(target, TargetFormat::B4G4R4A4);
        assert_eq!(target.bytes_per_pixel(), 2);
    }

    #[test]
    fn formats_outside_the_table_are_rejected() {
        for format in [
            TextureFormat::R32Float,
            TextureFormat::R16G16B16A16Float,
            TextureFormat::D24S8,
            TextureFormat::Shadow16,
            TextureFormat::Null,
            TextureFormat::Bc5,
            TextureFormat::Bc7,
        ] {
            assert_eq!(
                conversion_for(format, true),
                Err(DecodeError::UnsupportedFormat(format.into()))
            );
        }
    }
}
