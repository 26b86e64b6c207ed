//! Test doubles driven by the shared virtual clock.

use core::convert::Infallible;

use embedded_hal::delay::DelayNs;
use embedded_hal::digital::{ErrorType, OutputPin};
use pimodem_at_link::testing::TickClock;

/// Delay that moves the virtual clock instead of sleeping.
pub struct FakeDelay {
    clock: TickClock,
    sub_ms_ns: u32,
}

impl FakeDelay {
    pub fn new(clock: TickClock) -> Self {
        Self {
            clock,
            sub_ms_ns: 0,
        }
    }
}

impl DelayNs for FakeDelay {
    fn delay_ns(&mut self, ns: u32) {
        let total = self.sub_ms_ns as u64 + ns as u64;
        self.clock.advance((total / 1_000_000) as u32);
        self.sub_ms_ns = (total % 1_000_000) as u32;
    }

    fn delay_ms(&mut self, ms: u32) {
        self.clock.advance(ms);
    }
}

/// Output pin that records edges against the virtual clock.
pub struct FakePin {
    clock: TickClock,
    high: bool,
    rising_edges: u32,
    high_since: u32,
    last_high_ms: Option<u32>,
}

impl FakePin {
    pub fn new(clock: TickClock) -> Self {
        Self {
            clock,
            high: false,
            rising_edges: 0,
            high_since: 0,
            last_high_ms: None,
        }
    }

    pub fn is_high(&self) -> bool {
        self.high
    }

    pub fn rising_edges(&self) -> u32 {
        self.rising_edges
    }

    /// Duration of the most recent completed high pulse.
    pub fn last_high_ms(&self) -> Option<u32> {
        self.last_high_ms
    }
}

impl ErrorType for FakePin {
    type Error = Infallible;
}

impl OutputPin for FakePin {
    fn set_high(&mut self) -> Result<(), Self::Error> {
        if !self.high {
            self.high = true;
            self.rising_edges += 1;
            self.high_since = self.clock.peek();
        }
        Ok(())
    }

    fn set_low(&mut self) -> Result<(), Self::Error> {
        if self.high {
            self.high = false;
            self.last_high_ms = Some(self.clock.peek().wrapping_sub(self.high_since));
        }
        Ok(())
    }
}
