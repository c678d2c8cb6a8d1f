//! Per-vertex record decoding and de-quantization.

use crate::error::DecodeResult;
use crate::header::{Header, Variant};
use crate::reader::Reader;

/// De-quantized vertex attributes, one entry per UV channel.
#[derive(Debug, Clone, PartialEq)]
pub struct VertexAttributes {
    /// `vertex_count * 3` world-space components.
    pub positions: Vec<f32>,
    /// `vertex_count * 3` components in [-1, 1].
    pub normals: Vec<f32>,
    /// One buffer of `vertex_count * 2` components per channel.
    pub uv_channels: Vec<Vec<f32>>,
}

/// Read `header.vertex_count` interleaved vertex records.
///
/// Record layout per vertex: position as 3x i16, then (non-indexed layout
/// only) 6 reserved bytes, then 2x u16 per UV channel in channel order,
/// then normal as 3x i8. The reserved bytes have no documented meaning
/// upstream and are skipped without interpretation.
pub fn read_vertices(reader: &mut Reader, header: &Header) -> DecodeResult<VertexAttributes> {
    let count = header.vertex_count;
    let channels = header.uv_bounds.len();

    let mut positions = Vec::with_capacity(count * 3);
    let mut normals = Vec::with_capacity(count * 3);
    let mut uv_channels: Vec<Vec<f32>> =
        (0..channels).map(|_| Vec::with_capacity(count * 2)).collect();

    let min = header.bounds.min;
    let max = header.bounds.max;

    for _ in 0..count {
        for axis in 0..3 {
            let raw = reader.read_i16("vertex position")?;
            positions.push(dequantize_position(raw, min[axis], max[axis]));
        }

        if header.variant == Variant::NonIndexed {
            reader.skip(6, "reserved vertex bytes")?;
        }

        for (channel, bounds) in header.uv_bounds.iter().enumerate() {
            let u = reader.read_u16("vertex uv")?;
            let v = reader.read_u16("vertex uv")?;
            uv_channels[channel].push(dequantize_uv(u, bounds.min.x, bounds.max.x));
            uv_channels[channel].push(dequantize_uv(v, bounds.min.y, bounds.max.y));
        }

        for _ in 0..3 {
            let raw = reader.read_i8("vertex normal")?;
            normals.push(dequantize_normal(raw));
        }
    }

    Ok(VertexAttributes {
        positions,
        normals,
        uv_channels,
    })
}

/// Map a signed 16-bit position component back into the axis bounds.
///
/// The quantized value covers [-1, 1] over the bound's half-range around
/// its midpoint. -32768 falls outside [-1, 1] after division and is
/// clamped, mirroring the encoder's use of the symmetric 32767 range.
fn dequantize_position(raw: i16, min: f32, max: f32) -> f32 {
    let unit = (f32::from(raw) / 32767.0).clamp(-1.0, 1.0);
    unit * (max - min) / 2.0 + (min + max) / 2.0
}

/// Map an unsigned 16-bit UV component back into the channel bounds.
fn dequantize_uv(raw: u16, min: f32, max: f32) -> f32 {
    f32::from(raw) / 65535.0 * (max - min) + min
}

/// Map a signed 8-bit normal component back into [-1, 1].
///
/// Normals are stored pre-normalized; there is no bounding-box remap and
/// the decoder does not renormalize.
fn dequantize_normal(raw: i8) -> f32 {
    (f32::from(raw) / 127.0).clamp(-1.0, 1.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::header::{Aabb, UvBounds};
    use glam::{Vec2, Vec3};

    fn header(variant: Variant, vertex_count: usize, uv_bounds: Vec<UvBounds>) -> Header {
        Header {
            variant,
            vertex_count,
            index_count: 0,
            bounds: Aabb {
                min: Vec3::new(0.0, 0.0, 0.0),
                max: Vec3::new(2.0, 2.0, 2.0),
            },
            uv_bounds,
        }
    }

    fn unit_uv_bounds() -> UvBounds {
        UvBounds {
            min: Vec2::new(0.0, 0.0),
            max: Vec2::new(1.0, 1.0),
        }
    }

    #[test]
    fn test_dequantize_position_extremes() {
        // Full positive raw maps to the max bound, full negative to min,
        // zero to the midpoint.
        assert_eq!(dequantize_position(32767, 0.0, 2.0), 2.0);
        assert_eq!(dequantize_position(-32767, 0.0, 2.0), 0.0);
        assert_eq!(dequantize_position(0, 0.0, 2.0), 1.0);
    }

    #[test]
    fn test_dequantize_position_clamps_i16_min() {
        // -32768 / 32767 is slightly below -1 and must clamp to the min bound.
        assert_eq!(dequantize_position(i16::MIN, -3.0, 5.0), -3.0);
    }

    #[test]
    fn test_dequantize_uv() {
        assert_eq!(dequantize_uv(0, 0.25, 0.75), 0.25);
        assert_eq!(dequantize_uv(65535, 0.25, 0.75), 0.75);
    }

    #[test]
    fn test_dequantize_normal() {
        assert_eq!(dequantize_normal(127), 1.0);
        assert_eq!(dequantize_normal(-127), -1.0);
        assert_eq!(dequantize_normal(0), 0.0);
        // -128 / 127 is slightly below -1 and must clamp.
        assert_eq!(dequantize_normal(i8::MIN), -1.0);
    }

    #[test]
    fn test_indexed_record() {
        // One vertex: pos (32767, 0, -32767), uv (0, 65535), normal (127, -127, 0).
        let mut buf = Vec::new();
        for raw in [32767i16, 0, -32767] {
            buf.extend_from_slice(&raw.to_le_bytes());
        }
        for raw in [0u16, 65535] {
            buf.extend_from_slice(&raw.to_le_bytes());
        }
        buf.extend_from_slice(&[127u8, 0x81, 0]); // 0x81 = -127 as i8.

        let header = header(Variant::Indexed, 1, vec![unit_uv_bounds()]);
        let mut reader = Reader::new(&buf);
        let attributes = read_vertices(&mut reader, &header).unwrap();

        assert_eq!(attributes.positions, vec![2.0, 1.0, 0.0]);
        assert_eq!(attributes.uv_channels, vec![vec![0.0, 1.0]]);
        assert_eq!(attributes.normals, vec![1.0, -1.0, 0.0]);
        assert_eq!(reader.remaining(), 0);
    }

    #[test]
    fn test_non_indexed_record_skips_reserved_bytes() {
        // Same vertex as above with 6 reserved bytes wedged between the
        // position and UV data; their contents must not affect the output.
        let mut buf = Vec::new();
        for raw in [32767i16, 0, -32767] {
            buf.extend_from_slice(&raw.to_le_bytes());
        }
        buf.extend_from_slice(&[0xAA; 6]);
        for raw in [0u16, 65535] {
            buf.extend_from_slice(&raw.to_le_bytes());
        }
        buf.extend_from_slice(&[127u8, 0x81, 0]);

        let header = header(Variant::NonIndexed, 1, vec![unit_uv_bounds()]);
        let mut reader = Reader::new(&buf);
        let attributes = read_vertices(&mut reader, &header).unwrap();

        assert_eq!(attributes.positions, vec![2.0, 1.0, 0.0]);
        assert_eq!(attributes.uv_channels, vec![vec![0.0, 1.0]]);
        assert_eq!(attributes.normals, vec![1.0, -1.0, 0.0]);
    }

    #[test]
    fn test_truncated_record_is_corruption() {
        let buf = [0u8; 5]; // Not even a full position triple.
        let header = header(Variant::Indexed, 1, vec![]);
        let mut reader = Reader::new(&buf);
        assert!(read_vertices(&mut reader, &header).is_err());
    }
}
