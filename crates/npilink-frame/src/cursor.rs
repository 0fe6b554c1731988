use crate::error::{FrameError, Result};

/// Bounds-checked reader over a frame payload.
///
/// Subsystem decoders pull fixed-width little-endian fields off the payload
/// in wire order. Every read is length-checked, so a checksum-valid but
/// malformed payload yields `Truncated` instead of an over-read.
#[derive(Debug)]
pub struct PayloadCursor<'a> {
    buf: &'a [u8],
    pos: usize,
}

impl<'a> PayloadCursor<'a> {
    pub fn new(buf: &'a [u8]) -> Self {
        Self { buf, pos: 0 }
    }

    /// Bytes not yet consumed.
    pub fn remaining(&self) -> usize {
        self.buf.len() - self.pos
    }

    pub fn is_empty(&self) -> bool {
        self.remaining() == 0
    }

    fn take(&mut self, n: usize) -> Result<&'a [u8]> {
        if self.remaining() < n {
            return Err(FrameError::Truncated {
                needed: n - self.remaining(),
                remaining: self.remaining(),
            });
        }
        let slice = &self.buf[self.pos..self.pos + n];
        self.pos += n;
        Ok(slice)
    }

    pub fn get_u8(&mut self) -> Result<u8> {
        Ok(self.take(1)?[0])
    }

    pub fn get_u16_le(&mut self) -> Result<u16> {
        let bytes = self.take(2)?;
        Ok(u16::from_le_bytes([bytes[0], bytes[1]]))
    }

    pub fn get_u32_le(&mut self) -> Result<u32> {
        let bytes = self.take(4)?;
        Ok(u32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]))
    }

    /// Read exactly `n` raw bytes.
    pub fn get_bytes(&mut self, n: usize) -> Result<&'a [u8]> {
        self.take(n)
    }

    /// Read a fixed-size byte array (addresses, keys).
    pub fn get_array<const N: usize>(&mut self) -> Result<[u8; N]> {
        let bytes = self.take(N)?;
        let mut out = [0u8; N];
        out.copy_from_slice(bytes);
        Ok(out)
    }

    /// Consume and return whatever is left.
    pub fn rest(&mut self) -> &'a [u8] {
        let slice = &self.buf[self.pos..];
        self.pos = self.buf.len();
        slice
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reads_fields_in_order() {
        let buf = [0x01, 0x34, 0x12, 0x78, 0x56, 0x34, 0x12, 0xAA];
        let mut cursor = PayloadCursor::new(&buf);

        assert_eq!(cursor.get_u8().unwrap(), 0x01);
        assert_eq!(cursor.get_u16_le().unwrap(), 0x1234);
        assert_eq!(cursor.get_u32_le().unwrap(), 0x12345678);
        assert_eq!(cursor.rest(), &[0xAA]);
        assert!(cursor.is_empty());
    }

    #[test]
    fn truncated_u16_reports_shortfall() {
        let mut cursor = PayloadCursor::new(&[0x01]);
        let err = cursor.get_u16_le().unwrap_err();
        assert!(matches!(
            err,
            FrameError::Truncated {
                needed: 1,
                remaining: 1
            }
        ));
    }

    #[test]
    fn truncated_read_does_not_consume() {
        let mut cursor = PayloadCursor::new(&[0x01, 0x02]);
        assert!(cursor.get_u32_le().is_err());
        // Failed read leaves the cursor where it was.
        assert_eq!(cursor.get_u16_le().unwrap(), 0x0201);
    }

    #[test]
    fn fixed_array_read() {
        let buf = [1, 2, 3, 4, 5, 6, 7, 8];
        let mut cursor = PayloadCursor::new(&buf);
        let addr: [u8; 8] = cursor.get_array().unwrap();
        assert_eq!(addr, buf);
    }

    #[test]
    fn get_bytes_past_end_fails() {
        let mut cursor = PayloadCursor::new(&[1, 2, 3]);
        assert!(cursor.get_bytes(4).is_err());
        assert_eq!(cursor.get_bytes(3).unwrap(), &[1, 2, 3]);
    }

    #[test]
    fn empty_payload() {
        let mut cursor = PayloadCursor::new(&[]);
        assert!(cursor.is_empty());
        assert!(cursor.get_u8().is_err());
        assert_eq!(cursor.rest(), &[] as &[u8]);
    }
}
