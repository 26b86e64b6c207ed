use embedded_io::{Read, ReadReady};

use crate::buffer::RxBuffer;

/// Monotonic millisecond clock. Wrapping is fine; only differences are used.
pub trait Clock {
    fn now_ms(&self) -> u32;
}

impl<C: Clock + ?Sized> Clock for &C {
    fn now_ms(&self) -> u32 {
        (**self).now_ms()
    }
}

/// A point in time `timeout_ms` after `start_ms`, fixed when created.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Deadline {
    start_ms: u32,
    timeout_ms: u32,
}

impl Deadline {
    pub const fn new(start_ms: u32, timeout_ms: u32) -> Self {
        Self {
            start_ms,
            timeout_ms,
        }
    }

    pub fn after(clock: &impl Clock, timeout_ms: u32) -> Self {
        Self::new(clock.now_ms(), timeout_ms)
    }

    pub const fn elapsed(&self, now_ms: u32) -> u32 {
        now_ms.wrapping_sub(self.start_ms)
    }

    /// Expired once strictly more than `timeout_ms` has passed.
    pub const fn expired(&self, now_ms: u32) -> bool {
        self.elapsed(now_ms) > self.timeout_ms
    }
}

/// Poll `rx` one byte at a time into `buf` until the buffer is full or
/// `timeout_ms` has elapsed. Returns the number of bytes captured.
///
/// `buf` is not cleared here. Each read asks for exactly one byte, and only
/// after `read_ready` reported data, so the read never waits on the wire.
/// Transport errors count as "nothing available" for that iteration.
pub fn timed_read<R, C, const N: usize>(
    rx: &mut R,
    clock: &C,
    buf: &mut RxBuffer<N>,
    timeout_ms: u32,
) -> usize
where
    R: Read + ReadReady,
    C: Clock,
{
    let start_len = buf.len();
    let deadline = Deadline::after(clock, timeout_ms);

    while !buf.is_full() && !deadline.expired(clock.now_ms()) {
        if !matches!(rx.read_ready(), Ok(true)) {
            continue;
        }
        let mut byte = [0u8; 1];
        match rx.read(&mut byte) {
            Ok(1) => {
                buf.push(byte[0]);
            }
            Ok(_) => {}
            Err(_) => {
                debug!("uart rx error while polling");
            }
        }
    }

    buf.len() - start_len
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{ScriptedPort, TickClock};

    #[test]
    fn deadline_wraps_around_u32() {
        let d = Deadline::new(u32::MAX - 5, 10);
        assert!(!d.expired(u32::MAX));
        assert!(!d.expired(4));
        assert!(d.expired(5));
        assert_eq!(d.elapsed(3), 9);
    }

    #[test]
    fn stops_at_deadline_when_idle() {
        let clock = TickClock::new(0);
        let mut port = ScriptedPort::new();
        let mut buf: RxBuffer<64> = RxBuffer::new();

        let n = timed_read(&mut port, &clock, &mut buf, 100);
        assert_eq!(n, 0);
        let now = clock.now_ms();
        assert!(now > 100, "returned before deadline at {now}");
        // One tick per poll: must not linger far past the deadline.
        assert!(now <= 104, "overshot deadline at {now}");
    }

    #[test]
    fn stops_when_buffer_full_without_consuming_more() {
        let clock = TickClock::new(0);
        let mut port = ScriptedPort::new();
        port.feed(b"0123456789");
        let mut buf: RxBuffer<4> = RxBuffer::new();

        let n = timed_read(&mut port, &clock, &mut buf, 1_000);
        assert_eq!(n, 4);
        assert_eq!(buf.as_text(), "0123");
        assert_eq!(port.pending(), 6);
        assert!(clock.now_ms() < 1_000);
    }

    #[test]
    fn keeps_polling_through_transport_errors() {
        let clock = TickClock::new(0);
        let mut port = ScriptedPort::new();
        port.fail_next_reads(3);
        port.feed(b"OK");
        let mut buf: RxBuffer<16> = RxBuffer::new();

        let n = timed_read(&mut port, &clock, &mut buf, 50);
        assert_eq!(n, 2);
        assert_eq!(buf.as_text(), "OK");
    }
}
