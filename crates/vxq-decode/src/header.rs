//! Header parsing for both VXQ layouts.

use glam::{Vec2, Vec3};

use crate::error::{DecodeError, DecodeResult};
use crate::reader::Reader;

/// Magic tag for the non-indexed layout.
pub const MAGIC_NON_INDEXED: [u8; 4] = *b"VXQ0";
/// Magic tag for the indexed layout.
pub const MAGIC_INDEXED: [u8; 4] = *b"VXQ1";

/// Which of the two on-disk layouts a buffer uses.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Variant {
    /// `VXQ0`: per-vertex UV channels, no shared index buffer.
    NonIndexed,
    /// `VXQ1`: single UV attribute plus a trailing triangle index array.
    Indexed,
}

/// Axis-aligned bounds used to de-quantize positions.
///
/// Decode-time only; not part of the decoder output.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Aabb {
    pub min: Vec3,
    pub max: Vec3,
}

/// Per-channel UV bounds used to de-quantize texture coordinates.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct UvBounds {
    pub min: Vec2,
    pub max: Vec2,
}

/// Parsed header common to both layouts.
#[derive(Debug, Clone, PartialEq)]
pub struct Header {
    pub variant: Variant,
    pub vertex_count: usize,
    /// Always zero for the non-indexed layout.
    pub index_count: usize,
    pub bounds: Aabb,
    pub uv_bounds: Vec<UvBounds>,
}

impl Header {
    /// Size in bytes of one per-vertex record for this header.
    ///
    /// Both layouts store position as 3x i16 and normal as 3x i8, with
    /// 2x u16 per UV channel in between. The non-indexed layout carries
    /// 6 additional reserved bytes after each position triple.
    #[must_use]
    pub fn vertex_stride(&self) -> usize {
        let reserved = match self.variant {
            Variant::NonIndexed => 6,
            Variant::Indexed => 0,
        };
        6 + reserved + self.uv_bounds.len() * 4 + 3
    }

    /// Total byte length the body (everything after the header) must have.
    #[must_use]
    pub fn expected_body_len(&self) -> usize {
        self.vertex_count * self.vertex_stride() + self.index_count * 4
    }
}

/// Identify the layout from the leading 4-byte tag.
///
/// Fails before reading anything past the tag.
pub fn read_magic(reader: &mut Reader) -> DecodeResult<Variant> {
    let bytes = reader.take(4, "magic")?;
    let tag = [bytes[0], bytes[1], bytes[2], bytes[3]];
    match tag {
        MAGIC_NON_INDEXED => Ok(Variant::NonIndexed),
        MAGIC_INDEXED => Ok(Variant::Indexed),
        found => Err(DecodeError::UnknownMagic { found }),
    }
}

/// Parse the header fields that follow the magic tag.
pub fn read_header(reader: &mut Reader, variant: Variant) -> DecodeResult<Header> {
    match variant {
        Variant::NonIndexed => read_non_indexed_header(reader),
        Variant::Indexed => read_indexed_header(reader),
    }
}

/// Non-indexed layout: vertex count, face count (unused), two reserved
/// count fields (unused), bounding box, UV channel count, per-channel
/// UV bounds.
fn read_non_indexed_header(reader: &mut Reader) -> DecodeResult<Header> {
    let vertex_count = read_count(reader, "vertex count")?;
    // Face count is present in the layout but the decoder has no use for
    // it; triangles are implied by vertex order.
    let _face_count = read_count(reader, "face count")?;
    reader.skip(8, "reserved counts")?;
    let bounds = read_aabb(reader)?;
    let channel_count = read_count(reader, "uv channel count")?;
    let uv_bounds = read_uv_bounds(reader, channel_count)?;

    Ok(Header {
        variant: Variant::NonIndexed,
        vertex_count,
        index_count: 0,
        bounds,
        uv_bounds,
    })
}

/// Indexed layout: vertex count, index count, UV channel count, bounding
/// box, per-channel UV bounds.
fn read_indexed_header(reader: &mut Reader) -> DecodeResult<Header> {
    let vertex_count = read_count(reader, "vertex count")?;
    let index_count = read_count(reader, "index count")?;
    let channel_count = read_count(reader, "uv channel count")?;
    let bounds = read_aabb(reader)?;
    let uv_bounds = read_uv_bounds(reader, channel_count)?;

    Ok(Header {
        variant: Variant::Indexed,
        vertex_count,
        index_count,
        bounds,
        uv_bounds,
    })
}

/// Read an i32 count field, rejecting negative values.
fn read_count(reader: &mut Reader, context: &'static str) -> DecodeResult<usize> {
    let value = reader.read_i32(context)?;
    usize::try_from(value).map_err(|_| DecodeError::Corrupted {
        context,
        detail: format!("negative count {value}"),
    })
}

fn read_aabb(reader: &mut Reader) -> DecodeResult<Aabb> {
    let min = read_vec3(reader, "bounding box min")?;
    let max = read_vec3(reader, "bounding box max")?;
    Ok(Aabb { min, max })
}

fn read_vec3(reader: &mut Reader, context: &'static str) -> DecodeResult<Vec3> {
    Ok(Vec3::new(
        reader.read_f32(context)?,
        reader.read_f32(context)?,
        reader.read_f32(context)?,
    ))
}

/// Per channel: min U, max U, min V, max V.
fn read_uv_bounds(reader: &mut Reader, channel_count: usize) -> DecodeResult<Vec<UvBounds>> {
    let mut bounds = Vec::with_capacity(channel_count);
    for _ in 0..channel_count {
        let min_u = reader.read_f32("uv bounds")?;
        let max_u = reader.read_f32("uv bounds")?;
        let min_v = reader.read_f32("uv bounds")?;
        let max_v = reader.read_f32("uv bounds")?;
        bounds.push(UvBounds {
            min: Vec2::new(min_u, min_v),
            max: Vec2::new(max_u, max_v),
        });
    }
    Ok(bounds)
}
