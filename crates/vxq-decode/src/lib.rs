//! Decode quantized VXQ mesh buffers into vertex attribute arrays.
//!
//! This crate provides pure synchronous decoding for the two VXQ mesh
//! layouts produced by the baking tool: `VXQ0` (non-indexed, per-vertex
//! UV channels) and `VXQ1` (indexed, single UV attribute plus a shared
//! triangle index buffer). All functions can be called from any
//! threading context - the library user controls parallelism.
//!
//! # Design principles
//!
//! - **Synchronous**: no async, no threading primitives, no I/O
//! - **Bit-exact**: little-endian fields read exactly as laid out on disk
//! - **Strict**: count/length mismatches are errors, never silent
//!   truncation
//!
//! There is no encoding path; the write side lives in the external
//! baking tool.

mod error;
mod header;
mod indices;
mod reader;
mod vertices;

pub use error::{DecodeError, DecodeResult};
pub use header::{Aabb, Header, MAGIC_INDEXED, MAGIC_NON_INDEXED, UvBounds, Variant};
pub use vertices::VertexAttributes;

use reader::Reader;

/// Decoded geometry, tagged by layout.
///
/// All buffers are flat component arrays: positions and normals are
/// `vertex_count * 3` long, UV buffers `vertex_count * 2`. Indexed
/// geometry carries triangle corner indices in consecutive triples.
#[derive(Debug, Clone, PartialEq)]
pub enum GeometryPayload {
    /// Decoded from a `VXQ0` buffer.
    NonIndexed {
        positions: Vec<f32>,
        normals: Vec<f32>,
        uv_channels: Vec<Vec<f32>>,
    },
    /// Decoded from a `VXQ1` buffer.
    Indexed {
        positions: Vec<f32>,
        normals: Vec<f32>,
        uvs: Vec<f32>,
        indices: Vec<u32>,
    },
}

impl GeometryPayload {
    /// Number of vertices in the payload.
    #[must_use]
    pub fn vertex_count(&self) -> usize {
        self.positions().len() / 3
    }

    /// World-space position components.
    #[must_use]
    pub fn positions(&self) -> &[f32] {
        match self {
            Self::NonIndexed { positions, .. } | Self::Indexed { positions, .. } => positions,
        }
    }

    /// Normal components in [-1, 1]. Not renormalized by the decoder.
    #[must_use]
    pub fn normals(&self) -> &[f32] {
        match self {
            Self::NonIndexed { normals, .. } | Self::Indexed { normals, .. } => normals,
        }
    }

    /// Triangle indices, if the payload came from the indexed layout.
    #[must_use]
    pub fn indices(&self) -> Option<&[u32]> {
        match self {
            Self::NonIndexed { .. } => None,
            Self::Indexed { indices, .. } => Some(indices),
        }
    }
}

/// Decode a VXQ buffer into geometry.
///
/// The 4-byte magic tag selects the layout; the header's declared counts
/// must account for the remaining buffer length exactly.
///
/// # Errors
///
/// [`DecodeError::UnknownMagic`] if the tag matches neither layout
/// (checked before anything past the tag is read), or
/// [`DecodeError::Corrupted`] if the buffer is shorter than the tag,
/// a count is negative, the header is truncated, or the body length
/// disagrees with the declared counts.
pub fn decode(bytes: &[u8]) -> DecodeResult<GeometryPayload> {
    let mut reader = Reader::new(bytes);
    let variant = header::read_magic(&mut reader)?;
    let header = header::read_header(&mut reader, variant)?;

    let expected = header.expected_body_len();
    if reader.remaining() != expected {
        return Err(DecodeError::Corrupted {
            context: "body length",
            detail: format!(
                "header declares {} vertices and {} indices ({expected} bytes), but {} bytes follow",
                header.vertex_count,
                header.index_count,
                reader.remaining()
            ),
        });
    }

    let attributes = vertices::read_vertices(&mut reader, &header)?;

    match variant {
        Variant::NonIndexed => Ok(GeometryPayload::NonIndexed {
            positions: attributes.positions,
            normals: attributes.normals,
            uv_channels: attributes.uv_channels,
        }),
        Variant::Indexed => {
            let indices = indices::read_indices(&mut reader, header.index_count)?;
            // The indexed layout writes a single UV channel; surface it
            // as the flat `uvs` buffer.
            let uvs = attributes.uv_channels.into_iter().next().unwrap_or_default();
            Ok(GeometryPayload::Indexed {
                positions: attributes.positions,
                normals: attributes.normals,
                uvs,
                indices,
            })
        }
    }
}
