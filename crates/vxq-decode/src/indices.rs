//! Trailing index array decoding (indexed layout only).

use crate::error::DecodeResult;
use crate::reader::Reader;

/// Read `count` unsigned 32-bit triangle corner indices.
///
/// Triangles are consecutive triples; the decoder does not validate that
/// indices fall inside the vertex range, matching the wire contract's
/// trust in the baking tool.
pub fn read_indices(reader: &mut Reader, count: usize) -> DecodeResult<Vec<u32>> {
    let mut indices = Vec::with_capacity(count);
    for _ in 0..count {
        indices.push(reader.read_u32("index data")?);
    }
    Ok(indices)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::DecodeError;

    #[test]
    fn test_read_indices() {
        let mut buf = Vec::new();
        for value in [0u32, 1, 2, 2, 1, 3] {
            buf.extend_from_slice(&value.to_le_bytes());
        }

        let mut reader = Reader::new(&buf);
        let indices = read_indices(&mut reader, 6).unwrap();
        assert_eq!(indices, vec![0, 1, 2, 2, 1, 3]);
        assert_eq!(reader.remaining(), 0);
    }

    #[test]
    fn test_read_indices_empty() {
        let mut reader = Reader::new(&[]);
        assert_eq!(read_indices(&mut reader, 0).unwrap(), Vec::<u32>::new());
    }

    #[test]
    fn test_truncated_indices_are_corruption() {
        let buf = [0u8; 6]; // One and a half indices.
        let mut reader = Reader::new(&buf);
        assert!(matches!(
            read_indices(&mut reader, 2),
            Err(DecodeError::Corrupted {
                context: "index data",
                ..
            })
        ));
    }
}
