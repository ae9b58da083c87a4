//! A growable, always-seekable byte sink.
//!
//! The optimistic codec needs to reserve a bitmap-sized prefix before it
//! knows which bits are set, write the member bodies, then go back and
//! patch the prefix. A `Vec<u8>` backing store makes every writer
//! trivially "seekable"; callers with a genuinely non-seekable sink (a
//! socket, say) buffer one record's worth of output through a
//! `BinaryWriter` and flush it in a single write, which is exactly what
//! [`crate::codec::write_binary`] does.

#[derive(Debug, Default)]
pub struct BinaryWriter {
    buf: Vec<u8>,
}

/// A reserved span inside a [`BinaryWriter`], to be filled in later via
/// [`BinaryWriter::patch`].
#[derive(Debug, Clone, Copy)]
pub struct Mark {
    offset: usize,
    len: usize,
}

impl BinaryWriter {
    pub fn new() -> Self {
        Self { buf: Vec::new() }
    }

    #[inline]
    pub fn write_u8(&mut self, value: u8) {
        self.buf.push(value);
    }

    #[inline]
    pub fn write(&mut self, bytes: &[u8]) {
        self.buf.extend_from_slice(bytes);
    }

    #[inline]
    pub fn size(&self) -> usize {
        self.buf.len()
    }

    /// Reserves `len` zeroed bytes and returns a [`Mark`] that can later be
    /// filled in with [`patch`](Self::patch). This is the forward-seek
    /// mechanism the member-presence bitmap relies on.
    pub fn reserve(&mut self, len: usize) -> Mark {
        let offset = self.buf.len();
        self.buf.resize(offset + len, 0);
        Mark { offset, len }
    }

    /// Overwrites the bytes reserved by `mark` with `bytes`.
    pub fn patch(&mut self, mark: Mark, bytes: &[u8]) {
        debug_assert_eq!(bytes.len(), mark.len);
        self.buf[mark.offset..mark.offset + mark.len].copy_from_slice(bytes);
    }

    pub fn into_vec(self) -> Vec<u8> {
        self.buf
    }

    pub fn as_slice(&self) -> &[u8] {
        &self.buf
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reserve_then_patch() {
        let mut w = BinaryWriter::new();
        let mark = w.reserve(1);
        w.write(b"hello");
        w.patch(mark, &[0xAB]);
        assert_eq!(w.as_slice(), &[0xAB, b'h', b'e', b'l', b'l', b'o']);
    }
}
