use core::fmt::{self, Write as _};

use heapless::Vec;

/// Receive buffer size for a single modem reply.
///
/// Large enough for the longest informational replies (`AT+COPS=?` scans
/// excepted); longer replies are truncated.
pub const RX_BUFFER_LEN: usize = 2048;

/// Fixed-capacity capture buffer with an explicit write cursor.
///
/// Overflow truncates silently: once `N` bytes are held, further pushes are
/// dropped and report `false`.
#[derive(Clone, Debug, Default)]
pub struct RxBuffer<const N: usize> {
    bytes: Vec<u8, N>,
}

impl<const N: usize> RxBuffer<N> {
    pub const fn new() -> Self {
        Self { bytes: Vec::new() }
    }

    pub const fn capacity(&self) -> usize {
        N
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    pub fn is_full(&self) -> bool {
        self.bytes.is_full()
    }

    /// Reset the cursor to zero; storage is reused.
    pub fn clear(&mut self) {
        self.bytes.clear();
    }

    /// Append one byte. Returns `false` (and stores nothing) when full.
    pub fn push(&mut self, byte: u8) -> bool {
        self.bytes.push(byte).is_ok()
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// Captured bytes as text. Invalid UTF-8 shows as U+FFFD; nothing is
    /// dropped.
    pub fn as_text(&self) -> ReplyText<'_> {
        ReplyText::new(&self.bytes)
    }
}

/// Raw modem bytes rendered as text.
///
/// Formatting walks the bytes with [`Utf8Chunks`](core::str::Utf8Chunks),
/// so a noise byte at power-up costs one replacement character instead of
/// the rest of the reply. Compares equal to a `&str` with the same bytes.
#[derive(Clone, Copy, PartialEq, Eq)]
pub struct ReplyText<'a> {
    bytes: &'a [u8],
}

impl<'a> ReplyText<'a> {
    pub const fn new(bytes: &'a [u8]) -> Self {
        Self { bytes }
    }

    pub const fn as_bytes(&self) -> &'a [u8] {
        self.bytes
    }

    /// Borrowed text when the bytes are entirely valid UTF-8.
    pub fn as_str(&self) -> Option<&'a str> {
        core::str::from_utf8(self.bytes).ok()
    }

    pub const fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    /// Non-empty `\n`-separated lines with one trailing `\r` removed.
    pub fn lines(self) -> impl Iterator<Item = ReplyText<'a>> {
        let bytes: &'a [u8] = self.bytes;
        bytes
            .split(|&b| b == b'\n')
            .map(|line| line.strip_suffix(b"\r").unwrap_or(line))
            .filter(|line| !line.is_empty())
            .map(ReplyText::new)
    }
}

impl fmt::Display for ReplyText<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for chunk in self.bytes.utf8_chunks() {
            f.write_str(chunk.valid())?;
            if !chunk.invalid().is_empty() {
                f.write_char(char::REPLACEMENT_CHARACTER)?;
            }
        }
        Ok(())
    }
}

impl fmt::Debug for ReplyText<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "\"{}\"", self)
    }
}

#[cfg(feature = "defmt")]
impl defmt::Format for ReplyText<'_> {
    fn format(&self, f: defmt::Formatter<'_>) {
        for chunk in self.bytes.utf8_chunks() {
            defmt::write!(f, "{=str}", chunk.valid());
            if !chunk.invalid().is_empty() {
                defmt::write!(f, "{=str}", "\u{FFFD}");
            }
        }
    }
}

impl PartialEq<str> for ReplyText<'_> {
    fn eq(&self, other: &str) -> bool {
        self.bytes == other.as_bytes()
    }
}

impl PartialEq<&str> for ReplyText<'_> {
    fn eq(&self, other: &&str) -> bool {
        self.bytes == other.as_bytes()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn overflow_keeps_exactly_capacity() {
        let mut buf: RxBuffer<8> = RxBuffer::new();
        for i in 0..8u8 {
            assert!(buf.push(b'a' + i));
        }
        for _ in 0..5 {
            assert!(!buf.push(b'z'));
        }
        assert_eq!(buf.len(), 8);
        assert!(buf.is_full());
        assert_eq!(buf.as_text(), "abcdefgh");
    }

    #[test]
    fn clear_then_text_is_empty() {
        let mut buf: RxBuffer<16> = RxBuffer::new();
        for &b in b"OK\r\n" {
            buf.push(b);
        }
        buf.clear();
        assert!(buf.is_empty());
        assert_eq!(buf.as_text(), "");

        for &b in b"RDY" {
            buf.push(b);
        }
        assert_eq!(buf.as_text(), "RDY");
    }

    #[test]
    fn invalid_bytes_are_replaced_not_dropped() {
        use std::string::ToString;

        let mut buf: RxBuffer<16> = RxBuffer::new();
        for &b in &[b'O', b'K', 0xFF, b'!'] {
            buf.push(b);
        }
        assert_eq!(buf.as_text().to_string(), "OK\u{FFFD}!");
        assert_eq!(buf.as_text().as_str(), None);
        assert_eq!(buf.as_bytes().len(), 4);
    }

    #[test]
    fn text_lines_split_on_raw_bytes() {
        use std::string::{String, ToString};
        use std::vec::Vec;

        let text = ReplyText::new(b"\xFF\r\n+CPIN: READY\r\n\r\nOK\r\n");
        let got: Vec<String> = text.lines().map(|l| l.to_string()).collect();
        assert_eq!(got, ["\u{FFFD}", "+CPIN: READY", "OK"]);
        assert_eq!(text.lines().nth(1).and_then(|l| l.as_str()), Some("+CPIN: READY"));
    }

    #[test]
    fn default_capacity_matches_constant() {
        let buf: RxBuffer<RX_BUFFER_LEN> = RxBuffer::new();
        assert_eq!(buf.capacity(), 2048);
    }
}
