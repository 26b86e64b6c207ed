use embedded_io::{Read, ReadReady, Write};

use crate::buffer::{RX_BUFFER_LEN, RxBuffer};
use crate::reader::{Clock, timed_read};
use crate::response::Response;

/// Terminator appended to every command on the wire.
pub const LINE_END: &[u8] = b"\r\n";

/// Default reply window for simple queries.
pub const DEFAULT_TIMEOUT_MS: u32 = 1_000;

/// An AT command body (no terminator) and how long to listen for the reply.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Command<'a> {
    pub text: &'a str,
    pub timeout_ms: u32,
}

impl<'a> Command<'a> {
    pub const fn new(text: &'a str, timeout_ms: u32) -> Self {
        Self { text, timeout_ms }
    }

    /// Command with the [`DEFAULT_TIMEOUT_MS`] window.
    pub const fn at(text: &'a str) -> Self {
        Self::new(text, DEFAULT_TIMEOUT_MS)
    }
}

/// Request/reply framing over a polled UART.
///
/// One command at a time: [`send`](Self::send) borrows the channel mutably
/// and the returned [`Response`] borrows the capture buffer.
pub struct CommandChannel<P, C, const N: usize = RX_BUFFER_LEN> {
    port: P,
    clock: C,
    buf: RxBuffer<N>,
}

impl<P, C, const N: usize> CommandChannel<P, C, N>
where
    P: Read + ReadReady + Write,
    C: Clock,
{
    pub const fn new(port: P, clock: C) -> Self {
        Self {
            port,
            clock,
            buf: RxBuffer::new(),
        }
    }

    /// Write `cmd.text` + CRLF, then capture whatever arrives within
    /// `cmd.timeout_ms`.
    ///
    /// A failed write is logged; the read window still runs so the caller
    /// sees a silent response rather than an error.
    pub fn send(&mut self, cmd: Command<'_>) -> Response<'_> {
        info!("[TX] {}", cmd.text);
        let written = self
            .port
            .write_all(cmd.text.as_bytes())
            .and_then(|()| self.port.write_all(LINE_END))
            .and_then(|()| self.port.flush());
        if written.is_err() {
            warn!("uart tx error; command {} may be incomplete", cmd.text);
        }

        self.buf.clear();
        let n = timed_read(&mut self.port, &self.clock, &mut self.buf, cmd.timeout_ms);
        info!("[RX] Read {} bytes", n);

        let resp = Response::new(self.buf.as_bytes());
        #[cfg(any(feature = "defmt", feature = "log"))]
        if !resp.is_silent() {
            debug!("[RX] Raw: {}", resp.preview().as_str());
        }
        resp
    }

    /// [`send`](Self::send) and report whether `expected` occurs anywhere in
    /// the reply.
    pub fn send_and_check(&mut self, cmd: Command<'_>, expected: &str) -> bool {
        self.send(cmd).contains(expected)
    }

    pub fn clock(&self) -> &C {
        &self.clock
    }

    pub fn port(&self) -> &P {
        &self.port
    }

    pub fn port_mut(&mut self) -> &mut P {
        &mut self.port
    }

    pub fn into_parts(self) -> (P, C) {
        (self.port, self.clock)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::response::{ACK, NO_RESPONSE};
    use crate::testing::{ScriptedPort, TickClock};

    fn channel(port: ScriptedPort) -> CommandChannel<ScriptedPort, TickClock, 64> {
        CommandChannel::new(port, TickClock::new(0))
    }

    #[test]
    fn writes_command_with_crlf() {
        let mut ch = channel(ScriptedPort::new());
        ch.send(Command::new("AT+CGMI", 5));
        assert_eq!(ch.port().written(), b"AT+CGMI\r\n");
        assert_eq!(ch.port().commands(), ["AT+CGMI"]);
    }

    #[test]
    fn returns_reply_verbatim() {
        let mut port = ScriptedPort::new();
        port.reply(b"\r\nSIMCOM INCORPORATED\r\n\r\nOK\r\n");
        let mut ch = channel(port);

        let resp = ch.send(Command::at("AT+CGMI"));
        assert!(!resp.is_silent());
        assert_eq!(resp.text(), "\r\nSIMCOM INCORPORATED\r\n\r\nOK\r\n");
    }

    #[test]
    fn silence_returns_sentinel() {
        let mut port = ScriptedPort::new();
        port.silence();
        let mut ch = channel(port);

        let resp = ch.send(Command::new("AT", 20));
        assert!(resp.is_silent());
        assert_eq!(resp.text(), NO_RESPONSE);
    }

    #[test]
    fn check_matches_only_when_token_present() {
        let mut port = ScriptedPort::new();
        port.reply(b"AT\r\r\nOK\r\n");
        port.reply(b"\r\nERROR\r\n");
        port.silence();
        let mut ch = channel(port);

        assert!(ch.send_and_check(Command::new("AT", 20), ACK));
        assert!(!ch.send_and_check(Command::new("AT", 20), ACK));
        assert!(!ch.send_and_check(Command::new("AT", 20), ACK));
    }

    #[test]
    fn capture_never_leaks_previous_reply() {
        let mut port = ScriptedPort::new();
        port.reply(b"+CSQ: 17,99\r\nOK\r\n");
        port.reply(b"RDY");
        let mut ch = channel(port);

        assert!(ch.send(Command::new("AT+CSQ", 20)).contains("+CSQ"));
        let second = ch.send(Command::new("AT", 20));
        assert_eq!(second.text(), "RDY");
        assert!(!second.contains("+CSQ"));
    }

    #[test]
    fn oversized_reply_is_truncated_not_rejected() {
        let mut port = ScriptedPort::new();
        port.reply(&[b'#'; 100]);
        let mut ch = channel(port);

        // Window far longer than the reply so the full buffer ends the capture.
        let before = ch.clock().now_ms();
        let resp = ch.send(Command::new("AT+COPS=?", 1_000));
        assert_eq!(resp.raw().len(), 64);
        assert!(resp.raw().iter().all(|&b| b == b'#'));
        assert!(ch.clock().now_ms().wrapping_sub(before) < 1_000);
    }

    #[test]
    fn write_failure_still_runs_read_window() {
        let mut port = ScriptedPort::new();
        port.fail_writes(true);
        let mut ch = channel(port);

        let before = ch.clock().now_ms();
        let resp = ch.send(Command::new("AT", 30));
        assert!(resp.is_silent());
        assert!(ch.clock().now_ms().wrapping_sub(before) > 30);
    }
}
