//! A byte cursor over an input slice, the reading counterpart of
//! [`crate::writer::BinaryWriter`].

use crate::error::{Error, Result};

#[derive(Debug)]
pub struct BinaryReader<'a> {
    buf: &'a [u8],
}

impl<'a> BinaryReader<'a> {
    pub fn new(buf: &'a [u8]) -> Self {
        Self { buf }
    }

    #[inline]
    pub fn remaining(&self) -> usize {
        self.buf.len()
    }

    pub fn read_u8(&mut self, context: &'static str) -> Result<u8> {
        let (&byte, rest) = self
            .buf
            .split_first()
            .ok_or(Error::TruncatedInput { context })?;
        self.buf = rest;
        Ok(byte)
    }

    pub fn read_exact(&mut self, len: usize, context: &'static str) -> Result<&'a [u8]> {
        if self.buf.len() < len {
            return Err(Error::TruncatedInput { context });
        }
        let (chunk, rest) = self.buf.split_at(len);
        self.buf = rest;
        Ok(chunk)
    }

    pub fn read_array<const N: usize>(&mut self, context: &'static str) -> Result<[u8; N]> {
        let chunk = self.read_exact(N, context)?;
        let mut out = [0u8; N];
        out.copy_from_slice(chunk);
        Ok(out)
    }

    /// Reads a raw signed byte (the wire representation of `i8` and of a
    /// `ClassHeader`'s version field).
    pub fn read_i8(&mut self, context: &'static str) -> Result<i8> {
        Ok(self.read_u8(context)? as i8)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn read_exact_reports_truncation() {
        let mut r = BinaryReader::new(&[1, 2]);
        assert!(r.read_exact(3, "test").is_err());
    }

    #[test]
    fn read_i8_round_trips_negative_values() {
        let mut r = BinaryReader::new(&[0xFFu8]);
        assert_eq!(r.read_i8("test").unwrap(), -1);
    }
}
