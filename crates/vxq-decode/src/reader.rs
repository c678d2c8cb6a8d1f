//! Little-endian cursor over a byte buffer.

use crate::error::{DecodeError, DecodeResult};

/// An offset-advancing reader for the fixed-width little-endian fields
/// of the VXQ layouts.
///
/// Running off the end of the buffer is reported as corruption: every
/// field position is implied by the counts declared in the header, so a
/// short read means the header lied.
pub struct Reader<'a> {
    data: &'a [u8],
    offset: usize,
}

impl<'a> Reader<'a> {
    /// Create a reader positioned at the start of `data`.
    #[must_use]
    pub fn new(data: &'a [u8]) -> Self {
        Self { data, offset: 0 }
    }

    /// Number of bytes left to read.
    #[must_use]
    pub fn remaining(&self) -> usize {
        self.data.len() - self.offset
    }

    /// Take the next `len` bytes, advancing the cursor.
    pub fn take(&mut self, len: usize, context: &'static str) -> DecodeResult<&'a [u8]> {
        if len > self.remaining() {
            return Err(DecodeError::Corrupted {
                context,
                detail: format!(
                    "need {len} bytes at offset {}, only {} remain",
                    self.offset,
                    self.remaining()
                ),
            });
        }
        let bytes = &self.data[self.offset..self.offset + len];
        self.offset += len;
        Ok(bytes)
    }

    /// Skip `len` bytes without interpreting them.
    pub fn skip(&mut self, len: usize, context: &'static str) -> DecodeResult<()> {
        self.take(len, context)?;
        Ok(())
    }

    pub fn read_i32(&mut self, context: &'static str) -> DecodeResult<i32> {
        let bytes = self.take(4, context)?;
        Ok(i32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]))
    }

    pub fn read_u32(&mut self, context: &'static str) -> DecodeResult<u32> {
        let bytes = self.take(4, context)?;
        Ok(u32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]))
    }

    pub fn read_f32(&mut self, context: &'static str) -> DecodeResult<f32> {
        let bytes = self.take(4, context)?;
        Ok(f32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]))
    }

    pub fn read_i16(&mut self, context: &'static str) -> DecodeResult<i16> {
        let bytes = self.take(2, context)?;
        Ok(i16::from_le_bytes([bytes[0], bytes[1]]))
    }

    pub fn read_u16(&mut self, context: &'static str) -> DecodeResult<u16> {
        let bytes = self.take(2, context)?;
        Ok(u16::from_le_bytes([bytes[0], bytes[1]]))
    }

    pub fn read_i8(&mut self, context: &'static str) -> DecodeResult<i8> {
        let bytes = self.take(1, context)?;
        Ok(i8::from_le_bytes([bytes[0]]))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reads_advance_offset() {
        let data = [0x01, 0x00, 0x00, 0x00, 0xFF, 0x7F];
        let mut reader = Reader::new(&data);

        assert_eq!(reader.read_i32("test").unwrap(), 1);
        assert_eq!(reader.remaining(), 2);
        assert_eq!(reader.read_i16("test").unwrap(), 0x7FFF);
        assert_eq!(reader.remaining(), 0);
    }

    #[test]
    fn test_little_endian_f32() {
        let data = 2.0f32.to_le_bytes();
        let mut reader = Reader::new(&data);
        assert_eq!(reader.read_f32("test").unwrap(), 2.0);
    }

    #[test]
    fn test_signed_byte() {
        let data = [0x81]; // -127 as two's complement.
        let mut reader = Reader::new(&data);
        assert_eq!(reader.read_i8("test").unwrap(), -127);
    }

    #[test]
    fn test_overrun_is_corruption() {
        let data = [0x01, 0x02];
        let mut reader = Reader::new(&data);
        let result = reader.read_i32("header");
        assert!(matches!(
            result,
            Err(DecodeError::Corrupted {
                context: "header",
                ..
            })
        ));
    }

    #[test]
    fn test_skip() {
        let data = [0u8; 10];
        let mut reader = Reader::new(&data);
        reader.skip(6, "test").unwrap();
        assert_eq!(reader.remaining(), 4);
        assert!(reader.skip(5, "test").is_err());
    }
}
