use std::io::{self, BufReader, Bytes, Read};

use log::warn;

/// Pull-style provider of log bytes.
///
/// `None` means the stream has ended; a source is never asked again after
/// returning it.
pub trait ByteSource {
    fn next_byte(&mut self) -> Option<u8>;
}

impl<S: ByteSource + ?Sized> ByteSource for &mut S {
    fn next_byte(&mut self) -> Option<u8> {
        (**self).next_byte()
    }
}

impl<S: ByteSource + ?Sized> ByteSource for Box<S> {
    fn next_byte(&mut self) -> Option<u8> {
        (**self).next_byte()
    }
}

/// Bytes held in memory
#[derive(Debug, Clone)]
pub struct SliceSource<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> SliceSource<'a> {
    pub fn new(data: &'a [u8]) -> Self {
        Self { data, pos: 0 }
    }
}

impl ByteSource for SliceSource<'_> {
    fn next_byte(&mut self) -> Option<u8> {
        let byte = self.data.get(self.pos).copied()?;
        self.pos += 1;
        Some(byte)
    }
}

/// Bytes pulled from any reader.
///
/// A read error ends the stream; the error is kept for [`ReadSource::take_error`].
pub struct ReadSource<R: Read> {
    bytes: Bytes<BufReader<R>>,
    error: Option<io::Error>,
    failed: bool,
}

impl<R: Read> ReadSource<R> {
    pub fn new(reader: R) -> Self {
        Self {
            bytes: BufReader::new(reader).bytes(),
            error: None,
            failed: false,
        }
    }

    /// The read error that ended the stream, if any
    pub fn take_error(&mut self) -> Option<io::Error> {
        self.error.take()
    }
}

impl<R: Read> ByteSource for ReadSource<R> {
    fn next_byte(&mut self) -> Option<u8> {
        if self.failed {
            return None;
        }
        match self.bytes.next()? {
            Ok(byte) => Some(byte),
            Err(err) => {
                warn!("Read error ends blackbox stream: {err}");
                self.error = Some(err);
                self.failed = true;
                None
            }
        }
    }
}

/// Bytes produced by an iterator
#[derive(Debug, Clone)]
pub struct IterSource<I> {
    iter: I,
}

impl<I: Iterator<Item = u8>> IterSource<I> {
    pub fn new(iter: I) -> Self {
        Self { iter }
    }
}

impl<I: Iterator<Item = u8>> ByteSource for IterSource<I> {
    fn next_byte(&mut self) -> Option<u8> {
        self.iter.next()
    }
}

const ALIGNED: u8 = 7;

/// Byte and bit reader over a [`ByteSource`].
///
/// Bytes pulled from the source are kept in a window so the parser can seek
/// back to any position at or after the last [`BitReader::discard_before`]
/// call. Positions are absolute offsets from the start of the source.
///
/// Bits are read most significant first. Byte reads assume the bit cursor is
/// aligned; call [`BitReader::align_to_byte`] after bit reads.
pub struct BitReader<S> {
    source: S,
    window: Vec<u8>,
    base: u64,
    cursor: usize,
    bit_pos: u8,
    eof: bool,
    source_done: bool,
}

impl<S: ByteSource> BitReader<S> {
    pub fn new(source: S) -> Self {
        Self {
            source,
            window: Vec::with_capacity(512),
            base: 0,
            cursor: 0,
            bit_pos: ALIGNED,
            eof: false,
            source_done: false,
        }
    }

    /// Make sure the byte under the cursor is in the window
    fn fill(&mut self) -> bool {
        if self.cursor < self.window.len() {
            return true;
        }
        if self.source_done {
            return false;
        }
        match self.source.next_byte() {
            Some(byte) => {
                self.window.push(byte);
                true
            }
            None => {
                self.source_done = true;
                false
            }
        }
    }

    /// Absolute offset of the next byte to be read
    pub fn position(&self) -> u64 {
        self.base + self.cursor as u64
    }

    /// Set once any read ran past the end of the stream
    pub fn is_eof(&self) -> bool {
        self.eof
    }

    pub fn clear_eof(&mut self) {
        self.eof = false;
    }

    pub fn is_aligned(&self) -> bool {
        self.bit_pos == ALIGNED
    }

    pub fn read_byte(&mut self) -> Option<u8> {
        if !self.fill() {
            self.eof = true;
            return None;
        }
        let byte = self.window[self.cursor];
        self.cursor += 1;
        Some(byte)
    }

    /// Look at the next byte without consuming it or touching the EOF flag
    pub fn peek_byte(&mut self) -> Option<u8> {
        if self.fill() {
            Some(self.window[self.cursor])
        } else {
            None
        }
    }

    /// Read up to `len` bytes; a short result sets the EOF flag
    pub fn read_raw(&mut self, len: usize) -> Vec<u8> {
        let mut bytes = Vec::with_capacity(len);
        for _ in 0..len {
            match self.read_byte() {
                Some(byte) => bytes.push(byte),
                None => break,
            }
        }
        bytes
    }

    /// Read `num_bits` (at most 32). The first bit read becomes the most
    /// significant bit of the result. On end of stream the cursor is left
    /// aligned and `None` is returned.
    pub fn read_bits(&mut self, num_bits: u32) -> Option<u32> {
        debug_assert!(num_bits <= 32);

        let mut result = 0u32;
        for _ in 0..num_bits {
            if !self.fill() {
                self.eof = true;
                self.bit_pos = ALIGNED;
                return None;
            }
            let bit = (self.window[self.cursor] >> self.bit_pos) & 0x01;
            result = (result << 1) | bit as u32;

            if self.bit_pos == 0 {
                self.cursor += 1;
                self.bit_pos = ALIGNED;
            } else {
                self.bit_pos -= 1;
            }
        }
        Some(result)
    }

    pub fn read_bit(&mut self) -> Option<u32> {
        self.read_bits(1)
    }

    /// Skip the rest of a partially read byte
    pub fn align_to_byte(&mut self) {
        if self.bit_pos != ALIGNED {
            self.bit_pos = ALIGNED;
            self.cursor += 1;
        }
    }

    /// Move to an absolute position inside the retained window.
    ///
    /// Positions before the window are clamped to its start and positions past
    /// the bytes pulled so far are clamped to its end. The EOF flag is cleared.
    pub fn seek(&mut self, position: u64) {
        let offset = position.saturating_sub(self.base) as usize;
        self.cursor = offset.min(self.window.len());
        self.bit_pos = ALIGNED;
        self.eof = false;
    }

    /// Forget bytes before `position`; they can no longer be sought back to
    pub fn discard_before(&mut self, position: u64) {
        let drop = (position.saturating_sub(self.base) as usize).min(self.cursor);
        if drop > 0 {
            self.window.drain(..drop);
            self.base += drop as u64;
            self.cursor -= drop;
        }
    }

    /// Treat the current position as the end of the stream
    pub fn end_stream(&mut self) {
        self.window.truncate(self.cursor);
        self.source_done = true;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn reader(data: &[u8]) -> BitReader<SliceSource<'_>> {
        BitReader::new(SliceSource::new(data))
    }

    #[test]
    fn test_read_and_peek_bytes() {
        let mut stream = reader(&[1, 2]);
        assert_eq!(stream.peek_byte(), Some(1));
        assert_eq!(stream.read_byte(), Some(1));
        assert_eq!(stream.position(), 1);
        assert_eq!(stream.read_byte(), Some(2));
        assert!(!stream.is_eof());

        // Peeking at the end does not flag EOF, reading does
        assert_eq!(stream.peek_byte(), None);
        assert!(!stream.is_eof());
        assert_eq!(stream.read_byte(), None);
        assert!(stream.is_eof());
    }

    #[test]
    fn test_read_bits_msb_first() {
        let mut stream = reader(&[0b1011_0001, 0b0100_0000]);
        assert_eq!(stream.read_bits(3), Some(0b101));
        assert!(!stream.is_aligned());
        assert_eq!(stream.read_bits(7), Some(0b1_0001_01));
        stream.align_to_byte();
        assert!(stream.is_aligned());
        assert_eq!(stream.position(), 2);
        assert_eq!(stream.read_bits(1), None);
        assert!(stream.is_eof());
        assert!(stream.is_aligned());
    }

    #[test]
    fn test_read_bits_full_word() {
        let mut stream = reader(&[0xDE, 0xAD, 0xBE, 0xEF]);
        assert_eq!(stream.read_bits(32), Some(0xDEAD_BEEF));
        assert_eq!(stream.read_bits(0), Some(0));
    }

    #[test]
    fn test_align_without_partial_byte_is_noop() {
        let mut stream = reader(&[7, 8]);
        stream.align_to_byte();
        assert_eq!(stream.read_byte(), Some(7));
    }

    #[test]
    fn test_read_raw_short() {
        let mut stream = reader(&[1, 2, 3]);
        assert_eq!(stream.read_raw(2), vec![1, 2]);
        assert!(!stream.is_eof());
        assert_eq!(stream.read_raw(5), vec![3]);
        assert!(stream.is_eof());
    }

    #[test]
    fn test_seek_within_window() {
        let data: Vec<u8> = (0..10).collect();
        let mut stream = BitReader::new(IterSource::new(data.into_iter()));

        stream.read_raw(4);
        stream.discard_before(2);
        stream.read_raw(6);
        assert!(!stream.is_eof());
        let _ = stream.read_byte();
        assert!(stream.is_eof());

        stream.seek(3);
        assert!(!stream.is_eof());
        assert_eq!(stream.position(), 3);
        assert_eq!(stream.read_byte(), Some(3));

        // Discarded bytes are out of reach
        stream.seek(0);
        assert_eq!(stream.position(), 2);
        assert_eq!(stream.read_byte(), Some(2));
    }

    #[test]
    fn test_end_stream_truncates() {
        let mut stream = reader(&[1, 2, 3]);
        assert_eq!(stream.read_byte(), Some(1));
        assert_eq!(stream.peek_byte(), Some(2));
        stream.end_stream();
        assert_eq!(stream.peek_byte(), None);
        assert_eq!(stream.read_byte(), None);
    }

    #[test]
    fn test_read_source_and_forwarding() {
        let mut source = ReadSource::new(std::io::Cursor::new(vec![9u8, 8]));
        {
            let mut stream = BitReader::new(&mut source);
            assert_eq!(stream.read_byte(), Some(9));
        }
        assert_eq!(source.next_byte(), Some(8));
        assert_eq!(source.next_byte(), None);
        assert!(source.take_error().is_none());
    }

    struct Unplugged;

    impl Read for Unplugged {
        fn read(&mut self, _buf: &mut [u8]) -> io::Result<usize> {
            Err(io::Error::new(io::ErrorKind::BrokenPipe, "card removed"))
        }
    }

    #[test]
    fn test_read_source_keeps_read_error() {
        let mut source = ReadSource::new(b"\x01".as_slice().chain(Unplugged));
        assert_eq!(source.next_byte(), Some(1));
        assert_eq!(source.next_byte(), None);
        // The stream stays ended
        assert_eq!(source.next_byte(), None);

        let err = source.take_error().expect("read error kept");
        assert_eq!(err.kind(), io::ErrorKind::BrokenPipe);
        assert!(source.take_error().is_none());
    }
}
