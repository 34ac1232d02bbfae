use std::{
    fs::File,
    io::{self, BufWriter},
    path::Path,
};

use byteorder::{ByteOrder, LittleEndian};

use crate::DecodeError;

use super::{
    TextureHeader,
    format::{ConversionKind, TargetFormat, TextureFormat, conversion_for},
};

/// Decoded pixel bytes for one `(mip, face/z)` slice, tagged with the
/// format they were converted to and the effective dimensions at that mip.
#[derive(Debug, Clone, PartialEq)]
pub struct PixelBuffer {
    pub format: TargetFormat,
    pub width: u32,
    pub height: u32,
    pub data: Vec<u8>,
}

impl PixelBuffer {
    /// Writes the buffer as a PNG. Only the 32-bit layouts are dumpable;
    /// narrow pass-through buffers have no direct PNG representation.
    pub fn dump(&self, path: &Path) -> Result<(), io::Error> {
        let rgba: Vec<u8> = match self.format {
            TargetFormat::Rgba8 => self.data.clone(),
            TargetFormat::Bgra8 => {
                let mut bytes = self.data.clone();
                bytes.chunks_mut(4).for_each(|chunk| chunk.swap(0, 2));
                bytes
            }
            _ => {
                return Err(io::Error::other(
                    "dumping requires a 32-bit pixel buffer",
                ));
            }
        };

        let file = File::create(path)?;
        let w = &mut BufWriter::new(file);

        let mut encoder = png::Encoder::new(w, self.width, self.height);
        encoder.set_color(png::ColorType::Rgba);
        encoder.set_depth(png::BitDepth::Eight);

        let mut writer = encoder.write_header().map_err(io::Error::other)?;
        writer.write_image_data(&rgba).map_err(io::Error::other)?;
        writer.finish().map_err(io::Error::other)?;

        Ok(())
    }
}

/// Bytes one face/z slice occupies at the given dimensions, honoring 4x4
/// block arithmetic for compressed formats.
fn slice_size(format: TextureFormat, width: u32, height: u32) -> usize {
    if format.is_block_compressed() {
        let blocks_x = width.div_ceil(4) as usize;
        let blocks_y = height.div_ceil(4) as usize;
        blocks_x * blocks_y * format.block_size()
    } else {
        (width as usize * height as usize * format.bits_per_pixel() as usize) / 8
    }
}

/// Decodes one texture slice to the requested target format.
///
/// Selects the byte range for `mip` from the header's surface offsets (the
/// next populated offset bounds the surface) and the face/z slice within it
/// by stride, decompresses block formats, then applies the conversion the
/// format table selected. Pure function of its inputs; the caller may
/// memoize the result.
pub fn decode_texture_slice(
    header: &TextureHeader,
    bytes: &[u8],
    mip: u16,
    face: u32,
    target: TargetFormat,
    compatibility: bool,
) -> Result<PixelBuffer, DecodeError> {
    let (mapped_target, conversion) = conversion_for(header.format, compatibility)?;
    if target != mapped_target {
        return Err(DecodeError::UnsupportedFormat(header.format.into()));
    }

    if mip >= header.mip_levels {
        return Err(DecodeError::OutOfRange(format!(
            "mip {} of {}",
            mip, header.mip_levels
        )));
    }

    let faces = header.face_count(mip);
    if face >= faces {
        return Err(DecodeError::OutOfRange(format!(
            "face {} of {}",
            face, faces
        )));
    }

    let (width, height) = header.mip_dimensions(mip);
    let size = slice_size(header.format, width, height);

    let start = header.surface_offsets[mip as usize] as usize;
    let end = header.surface_offsets[mip as usize + 1..header.mip_levels as usize]
        .iter()
        .find(|offset| **offset != 0)
        .map(|offset| *offset as usize)
        .unwrap_or(bytes.len());

    let offset = start + face as usize * size;
    if offset + size > end.min(bytes.len()) {
        return Err(DecodeError::TruncatedData);
    }

    let source = &bytes[offset..offset + size];

    let data = if header.format.is_block_compressed() {
        decompress_blocks(header.format, source, width, height)?
    } else {
        convert(conversion, source, width, height)
    };

    Ok(PixelBuffer {
        format: target,
        width,
        height,
        data,
    })
}

/// Unpacks 4x4 texel blocks to linear RGBA8 pixels. The 4-channel formats
/// decompress directly; the 1-channel BC4 carries its value in a single
/// channel and is replicated out to gray.
fn decompress_blocks(
    format: TextureFormat,
    source: &[u8],
    width: u32,
    height: u32,
) -> Result<Vec<u8>, DecodeError> {
    let codec = match format {
        TextureFormat::Bc1 => texpresso::Format::Bc1,
        TextureFormat::Bc2 => texpresso::Format::Bc2,
        TextureFormat::Bc3 => texpresso::Format::Bc3,
        TextureFormat::Bc4 => texpresso::Format::Bc4,
        other => return Err(DecodeError::UnsupportedFormat(other.into())),
    };

    let mut pixels = vec![0u8; width as usize * height as usize * 4];
    codec.decompress(source, width as usize, height as usize, &mut pixels);

    if format == TextureFormat::Bc4 {
        pixels.chunks_mut(4).for_each(|pixel| {
            let value = pixel[0];
            pixel[1] = value;
            pixel[2] = value;
            pixel[3] = 0xff;
        });
    }

    Ok(pixels)
}

fn convert(conversion: ConversionKind, source: &[u8], width: u32, height: u32) -> Vec<u8> {
    match conversion {
        ConversionKind::None => source.to_vec(),
        ConversionKind::ExpandL8ToBgra8 => {
            let mut out = Vec::with_capacity(source.len() * 4);
            for luma in source {
                out.extend_from_slice(&[*luma, *luma, *luma, 0xff]);
            }
            out
        }
        ConversionKind::ExpandB4G4R4A4ToBgra8 => {
            let mut out = Vec::with_capacity(width as usize * height as usize * 4);
            for pair in source.chunks_exact(2) {
                let v = LittleEndian::read_u16(pair);
                out.push(((v & 0xf) * 0x11) as u8); // b
                out.push((((v >> 4) & 0xf) * 0x11) as u8); // g
                out.push((((v >> 8) & 0xf) * 0x11) as u8); // r
                out.push((((v >> 12) & 0xf) * 0x11) as u8); // a
            }
            out
        }
        ConversionKind::ExpandB5G5R5A1ToBgra8 => {
            let mut out = Vec::with_capacity(width as usize * height as usize * 4);
            for pair in source.chunks_exact(2) {
                let v = LittleEndian::read_u16(pair);
                out.push(scale5((v & 0x1f) as u8)); // b
                out.push(scale5(((v >> 5) & 0x1f) as u8)); // g
                out.push(scale5(((v >> 10) & 0x1f) as u8)); // r
                out.push(if v & 0x8000 != 0 { 0xff } else { 0x00 }); // a
            }
            out
        }
    }
}

fn scale5(value: u8) -> u8 {
    (value << 3) | (value >> 2)
}
