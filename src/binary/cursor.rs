use nom::{
    bytes::complete::{tag, take},
    number::complete::le_u8,
    IResult,
};

use super::error::{Result, ScanError};

type NomResult<'a, T> = IResult<&'a [u8], T, nom::error::Error<&'a [u8]>>;

/// Longest LEB128 encoding of a `u32`.
pub const MAX_VAR_U32_LEN: usize = 5;

/// Forward-only reader over a borrowed module buffer.
///
/// Every read is bounds checked against the buffer and advances the offset by exactly the
/// number of bytes it consumed. A failed read leaves the offset where it was.
#[derive(Debug, Clone)]
pub struct Cursor<'a> {
    bytes: &'a [u8],
    offset: usize,
}

impl<'a> Cursor<'a> {
    pub fn new(bytes: &'a [u8]) -> Self {
        Cursor { bytes, offset: 0 }
    }

    pub fn offset(&self) -> usize {
        self.offset
    }

    pub fn remaining(&self) -> usize {
        self.bytes.len() - self.offset
    }

    pub fn has_more_bytes(&self) -> bool {
        self.offset < self.bytes.len()
    }

    fn rest(&self) -> &'a [u8] {
        let bytes = self.bytes;
        &bytes[self.offset..]
    }

    fn run<T>(&mut self, needed: usize, parser: impl FnOnce(&'a [u8]) -> NomResult<'a, T>) -> Result<T> {
        let rest = self.rest();
        match parser(rest) {
            Ok((tail, value)) => {
                self.offset += rest.len() - tail.len();
                Ok(value)
            }
            Err(_) => Err(ScanError::OutOfBounds { offset: self.offset, needed, remaining: rest.len() }),
        }
    }

    pub fn read_byte(&mut self) -> Result<u8> {
        self.run(1, le_u8)
    }

    pub fn read_bytes(&mut self, count: usize) -> Result<&'a [u8]> {
        self.run(count, take(count))
    }

    pub fn skip_bytes(&mut self, count: usize) -> Result<()> {
        self.read_bytes(count).map(|_| ())
    }

    /// Reads an unsigned LEB128 integer of at most 32 significant bits.
    pub fn read_var_u32(&mut self) -> Result<u32> {
        let offset = self.offset;
        let Some(last) = self.rest().iter().position(|byte| byte & 0x80 == 0) else {
            return Err(ScanError::MalformedVarint { offset });
        };

        let encoded = &self.rest()[..=last];
        if encoded.len() > MAX_VAR_U32_LEN {
            return Err(ScanError::IntegerOverflow { offset });
        }

        let mut value: u64 = 0;
        let mut shift: u32 = 0;

        for byte in encoded {
            value |= u64::from(byte & 0x7F) << shift;
            shift += 7;
        }

        // the fifth group may only carry bits 28..=31
        let value = u32::try_from(value).map_err(|_| ScanError::IntegerOverflow { offset })?;
        self.skip_bytes(encoded.len())?;
        Ok(value)
    }

    /// Reads a length-prefixed UTF-8 name.
    pub fn read_name(&mut self) -> Result<String> {
        let start = self.offset;
        let name = self.read_name_at();
        if name.is_err() {
            self.offset = start;
        }
        name
    }

    fn read_name_at(&mut self) -> Result<String> {
        let len = self.read_var_u32()? as usize;
        let offset = self.offset;
        let bytes = self.read_bytes(len)?;

        std::str::from_utf8(bytes)
            .map(str::to_owned)
            .map_err(|source| ScanError::InvalidUtf8 { offset, source })
    }

    pub fn assert_bytes(&mut self, expected: &[u8]) -> Result<()> {
        let rest = self.rest();
        let matched: NomResult<'a, &'a [u8]> = tag(expected)(rest);

        match matched {
            Ok((tail, _)) => {
                self.offset += rest.len() - tail.len();
                Ok(())
            }
            Err(_) => Err(ScanError::UnexpectedBytes {
                offset: self.offset,
                expected: expected.to_vec(),
                actual: rest[..expected.len().min(rest.len())].to_vec(),
            }),
        }
    }
}

#[cfg(test)]
mod cursor_tests {
    use super::Cursor;
    use crate::binary::error::ScanError;
    use anyhow::Result;

    #[test]
    fn read_bytes_advance_offset() -> Result<()> {
        let mut cursor = Cursor::new(&[0x01, 0x02, 0x03]);
        assert!(cursor.has_more_bytes());
        assert_eq!(0x01, cursor.read_byte()?);
        assert_eq!(1, cursor.offset());
        cursor.skip_bytes(1)?;
        assert_eq!(0x03, cursor.read_byte()?);
        assert_eq!(3, cursor.offset());
        assert!(!cursor.has_more_bytes());
        Ok(())
    }

    #[test]
    fn read_byte_past_end() {
        let mut cursor = Cursor::new(&[]);
        assert_eq!(
            Err(ScanError::OutOfBounds { offset: 0, needed: 1, remaining: 0 }),
            cursor.read_byte()
        );
    }

    #[test]
    fn skip_past_end_keeps_offset() -> Result<()> {
        let mut cursor = Cursor::new(&[0, 0, 0]);
        cursor.read_byte()?;
        assert_eq!(
            Err(ScanError::OutOfBounds { offset: 1, needed: 3, remaining: 2 }),
            cursor.skip_bytes(3)
        );
        assert_eq!(1, cursor.offset());
        cursor.skip_bytes(2)?;
        assert_eq!(0, cursor.remaining());
        Ok(())
    }

    #[test]
    fn read_var_u32_values() -> Result<()> {
        assert_eq!(0, Cursor::new(&[0x00]).read_var_u32()?);
        assert_eq!(127, Cursor::new(&[0x7F]).read_var_u32()?);
        assert_eq!(128, Cursor::new(&[0x80, 0x01]).read_var_u32()?);
        assert_eq!(624485, Cursor::new(&[0xE5, 0x8E, 0x26]).read_var_u32()?);
        assert_eq!(u32::MAX, Cursor::new(&[0xFF, 0xFF, 0xFF, 0xFF, 0x0F]).read_var_u32()?);

        let mut cursor = Cursor::new(&[0xE5, 0x8E, 0x26, 0x2A]);
        cursor.read_var_u32()?;
        assert_eq!(3, cursor.offset());
        assert_eq!(42, cursor.read_var_u32()?);
        Ok(())
    }

    #[test]
    fn read_var_u32_padded() -> Result<()> {
        let mut cursor = Cursor::new(&[0x85, 0x80, 0x80, 0x80, 0x00]);
        assert_eq!(5, cursor.read_var_u32()?);
        assert_eq!(5, cursor.offset());
        Ok(())
    }

    #[test]
    fn read_var_u32_too_long() {
        let mut padded = vec![0x80; 100];
        padded.push(0x00);
        let mut cursor = Cursor::new(&padded);
        assert_eq!(Err(ScanError::IntegerOverflow { offset: 0 }), cursor.read_var_u32());
        assert_eq!(0, cursor.offset());

        assert_eq!(
            Err(ScanError::IntegerOverflow { offset: 0 }),
            Cursor::new(&[0x85, 0x80, 0x80, 0x80, 0x80, 0x00]).read_var_u32()
        );
    }

    #[test]
    fn read_var_u32_unterminated() {
        let mut cursor = Cursor::new(&[0x80, 0xFF, 0x81]);
        assert_eq!(Err(ScanError::MalformedVarint { offset: 0 }), cursor.read_var_u32());
        assert_eq!(0, cursor.offset());

        let long_run = [0xFF; 16];
        assert_eq!(Err(ScanError::MalformedVarint { offset: 0 }), Cursor::new(&long_run).read_var_u32());
        assert_eq!(Err(ScanError::MalformedVarint { offset: 0 }), Cursor::new(&[]).read_var_u32());
    }

    #[test]
    fn read_var_u32_overflow() {
        assert_eq!(
            Err(ScanError::IntegerOverflow { offset: 0 }),
            Cursor::new(&[0xFF, 0xFF, 0xFF, 0xFF, 0x1F]).read_var_u32()
        );
        assert_eq!(
            Err(ScanError::IntegerOverflow { offset: 0 }),
            Cursor::new(&[0x80, 0x80, 0x80, 0x80, 0x80, 0x01]).read_var_u32()
        );
    }

    #[test]
    fn read_names() -> Result<()> {
        let mut cursor = Cursor::new(&[0x03, b'e', b'n', b'v', 0x00, 0x02, 0xC3, 0xA9]);
        assert_eq!("env", cursor.read_name()?);
        assert_eq!("", cursor.read_name()?);
        assert_eq!("é", cursor.read_name()?);
        assert!(!cursor.has_more_bytes());
        Ok(())
    }

    #[test]
    fn read_name_truncated() {
        let mut cursor = Cursor::new(&[0x05, b'a', b'b']);
        assert_eq!(
            Err(ScanError::OutOfBounds { offset: 1, needed: 5, remaining: 2 }),
            cursor.read_name()
        );
        assert_eq!(0, cursor.offset());
        assert_eq!(5, cursor.read_var_u32().unwrap());
    }

    #[test]
    fn read_name_invalid_utf8() {
        let mut cursor = Cursor::new(&[0x02, 0xC3, 0x28]);
        assert!(matches!(cursor.read_name(), Err(ScanError::InvalidUtf8 { offset: 1, .. })));
        assert_eq!(0, cursor.offset());
    }

    #[test]
    fn assert_bytes_match_and_mismatch() -> Result<()> {
        let mut cursor = Cursor::new(b"\0asm\x02\0\0\0");
        cursor.assert_bytes(b"\0asm")?;
        assert_eq!(4, cursor.offset());

        assert_eq!(
            Err(ScanError::UnexpectedBytes {
                offset: 4,
                expected: vec![0x01, 0, 0, 0],
                actual: vec![0x02, 0, 0, 0],
            }),
            cursor.assert_bytes(&[0x01, 0, 0, 0])
        );
        assert_eq!(4, cursor.offset());
        Ok(())
    }

    #[test]
    fn assert_bytes_short_buffer() {
        let mut cursor = Cursor::new(&[0x00, 0x61]);
        assert_eq!(
            Err(ScanError::UnexpectedBytes { offset: 0, expected: b"\0asm".to_vec(), actual: vec![0x00, 0x61] }),
            cursor.assert_bytes(b"\0asm")
        );
    }
}
