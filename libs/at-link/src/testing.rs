//! Host-side fakes for exercising the link without hardware.
//!
//! Available under `cfg(test)` and the `testing` feature.

use std::cell::Cell;
use std::collections::VecDeque;
use std::rc::Rc;
use std::string::String;
use std::vec::Vec;

use embedded_io::{ErrorKind, ErrorType, Read, ReadReady, Write};

use crate::reader::Clock;

/// Virtual clock that advances by one millisecond on every read.
///
/// Clones share the same time, so a fake delay can push the clock forward
/// while the channel holds another handle.
#[derive(Clone, Debug, Default)]
pub struct TickClock {
    now: Rc<Cell<u32>>,
}

impl TickClock {
    pub fn new(start_ms: u32) -> Self {
        Self {
            now: Rc::new(Cell::new(start_ms)),
        }
    }

    pub fn advance(&self, ms: u32) {
        self.now.set(self.now.get().wrapping_add(ms));
    }

    /// Current time without ticking.
    pub fn peek(&self) -> u32 {
        self.now.get()
    }
}

impl Clock for TickClock {
    fn now_ms(&self) -> u32 {
        let now = self.now.get();
        self.now.set(now.wrapping_add(1));
        now
    }
}

/// Modem stand-in: every CRLF-terminated command written pops the next
/// scripted reply into the receive queue (`None` means stay silent).
#[derive(Debug, Default)]
pub struct ScriptedPort {
    rx: VecDeque<u8>,
    written: Vec<u8>,
    scanned: usize,
    replies: VecDeque<Option<Vec<u8>>>,
    fallback: Option<Vec<u8>>,
    read_failures: usize,
    fail_writes: bool,
}

impl ScriptedPort {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue bytes as if they had already arrived on the wire.
    pub fn feed(&mut self, bytes: &[u8]) {
        self.rx.extend(bytes.iter().copied());
    }

    /// Reply for the next unanswered command.
    pub fn reply(&mut self, bytes: &[u8]) {
        self.replies.push_back(Some(bytes.to_vec()));
    }

    /// No reply for the next unanswered command.
    pub fn silence(&mut self) {
        self.replies.push_back(None);
    }

    /// Reply used once the script runs out (silence if unset).
    pub fn set_fallback(&mut self, bytes: Option<&[u8]>) {
        self.fallback = bytes.map(<[u8]>::to_vec);
    }

    pub fn fail_next_reads(&mut self, n: usize) {
        self.read_failures = n;
    }

    pub fn fail_writes(&mut self, fail: bool) {
        self.fail_writes = fail;
    }

    pub fn pending(&self) -> usize {
        self.rx.len()
    }

    pub fn written(&self) -> &[u8] {
        &self.written
    }

    /// Command bodies written so far, terminators stripped.
    pub fn commands(&self) -> Vec<String> {
        let text = String::from_utf8_lossy(&self.written);
        text.split("\r\n")
            .filter(|c| !c.is_empty())
            .map(String::from)
            .collect()
    }

    fn answer_complete_lines(&mut self) {
        while let Some(pos) = self.written[self.scanned..]
            .windows(2)
            .position(|w| w == b"\r\n")
        {
            self.scanned += pos + 2;
            let next = match self.replies.pop_front() {
                Some(scripted) => scripted,
                None => self.fallback.clone(),
            };
            if let Some(bytes) = next {
                self.rx.extend(bytes);
            }
        }
    }
}

impl ErrorType for ScriptedPort {
    type Error = ErrorKind;
}

impl ReadReady for ScriptedPort {
    fn read_ready(&mut self) -> Result<bool, Self::Error> {
        Ok(!self.rx.is_empty())
    }
}

impl Read for ScriptedPort {
    fn read(&mut self, buf: &mut [u8]) -> Result<usize, Self::Error> {
        if self.read_failures > 0 {
            self.read_failures -= 1;
            return Err(ErrorKind::Other);
        }
        let mut n = 0;
        while n < buf.len() {
            match self.rx.pop_front() {
                Some(b) => {
                    buf[n] = b;
                    n += 1;
                }
                None => break,
            }
        }
        Ok(n)
    }
}

impl Write for ScriptedPort {
    fn write(&mut self, buf: &[u8]) -> Result<usize, Self::Error> {
        if self.fail_writes {
            return Err(ErrorKind::Other);
        }
        self.written.extend_from_slice(buf);
        self.answer_complete_lines();
        Ok(buf.len())
    }

    fn flush(&mut self) -> Result<(), Self::Error> {
        Ok(())
    }
}
