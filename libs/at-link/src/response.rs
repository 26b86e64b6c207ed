use core::fmt::Write as _;

use heapless::String;

use crate::buffer::ReplyText;

/// Text reported for a capture window in which nothing arrived.
///
/// Reserved: a device-reported `ERROR` has bytes behind it, use
/// [`Response::is_silent`] to tell the two apart.
pub const NO_RESPONSE: &str = "ERROR";

/// Acknowledgement token for a successful AT command.
pub const ACK: &str = "OK";

/// Number of leading bytes shown in a raw capture preview.
pub const PREVIEW_BYTES: usize = 50;
/// Worst case: every byte rendered as `[0xHH]`.
pub const PREVIEW_CAP: usize = PREVIEW_BYTES * 6;

/// One captured reply, borrowed from the channel buffer until the next send.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Response<'a> {
    bytes: &'a [u8],
}

impl<'a> Response<'a> {
    pub const fn new(bytes: &'a [u8]) -> Self {
        Self { bytes }
    }

    /// Nothing was captured in the read window.
    pub const fn is_silent(&self) -> bool {
        self.bytes.is_empty()
    }

    pub const fn raw(&self) -> &'a [u8] {
        self.bytes
    }

    /// Reply as text, or [`NO_RESPONSE`] when silent. Every captured byte
    /// is kept; invalid UTF-8 renders as U+FFFD.
    pub fn text(&self) -> ReplyText<'a> {
        if self.is_silent() {
            ReplyText::new(NO_RESPONSE.as_bytes())
        } else {
            ReplyText::new(self.bytes)
        }
    }

    /// Unanchored substring search over the captured bytes.
    pub fn contains(&self, needle: &str) -> bool {
        if self.is_silent() {
            return NO_RESPONSE.contains(needle);
        }
        contains_bytes(self.bytes, needle.as_bytes())
    }

    /// Non-empty lines of the reply with a trailing `\r` removed.
    pub fn lines(self) -> impl Iterator<Item = ReplyText<'a>> {
        self.text().lines()
    }

    /// Printable rendering of the first [`PREVIEW_BYTES`] bytes; anything
    /// outside `0x20..0x7F` is shown as `[0xHH]`.
    pub fn preview(&self) -> String<PREVIEW_CAP> {
        let mut out = String::new();
        for &b in self.bytes.iter().take(PREVIEW_BYTES) {
            if (0x20..0x7F).contains(&b) {
                let _ = out.push(b as char);
            } else {
                let _ = write!(out, "[0x{:02X}]", b);
            }
        }
        out
    }
}

fn contains_bytes(haystack: &[u8], needle: &[u8]) -> bool {
    if needle.is_empty() {
        return true;
    }
    haystack.windows(needle.len()).any(|w| w == needle)
}

/// Log a reply line by line, indented.
pub fn log_lines(resp: &Response<'_>) {
    for line in resp.lines() {
        info!("  {}", line);
    }
}

/// Derived readiness of the modem as seen in one reply.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Readiness {
    Ok,
    SimReady,
    SimPinRequired,
    SimPukRequired,
    SimNotDetected,
    NoMatch,
}

impl Readiness {
    /// Liveness probe: `Ok` if the reply carries the acknowledgement token.
    pub fn of_ack(resp: &Response<'_>) -> Self {
        if resp.contains(ACK) {
            Readiness::Ok
        } else {
            Readiness::NoMatch
        }
    }

    /// `AT+CPIN?` reply. Checked in order `READY`, `SIM PIN`, `SIM PUK`;
    /// silence and anything else fall through to `SimNotDetected`.
    pub fn of_sim_status(resp: &Response<'_>) -> Self {
        if resp.contains("READY") {
            Readiness::SimReady
        } else if resp.contains("SIM PIN") {
            Readiness::SimPinRequired
        } else if resp.contains("SIM PUK") {
            Readiness::SimPukRequired
        } else {
            Readiness::SimNotDetected
        }
    }

    pub const fn is_ready(self) -> bool {
        matches!(self, Readiness::Ok | Readiness::SimReady)
    }

    pub const fn label(self) -> &'static str {
        match self {
            Readiness::Ok => "OK",
            Readiness::SimReady => "READY",
            Readiness::SimPinRequired => "PIN REQUIRED",
            Readiness::SimPukRequired => "PUK REQUIRED",
            Readiness::SimNotDetected => "NOT DETECTED",
            Readiness::NoMatch => "NO MATCH",
        }
    }
}
