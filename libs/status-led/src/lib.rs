#![no_std]

/// Blink pattern timing (pure logic).
///
/// Kept in `libs/` so it can be covered by host-side unit tests.
pub mod pattern {
    /// `times` on/off blinks of `half_period_ms` each, then `pause_ms` dark.
    #[cfg_attr(feature = "defmt", derive(defmt::Format))]
    #[derive(Clone, Copy, Debug, PartialEq, Eq)]
    pub struct BlinkPattern {
        pub times: u8,
        pub half_period_ms: u32,
        pub pause_ms: u32,
    }

    impl BlinkPattern {
        pub const fn new(times: u8, half_period_ms: u32, pause_ms: u32) -> Self {
            Self {
                times,
                half_period_ms,
                pause_ms,
            }
        }

        /// Duration of the blinks alone.
        pub const fn burst_ms(&self) -> u64 {
            self.times as u64 * 2 * self.half_period_ms as u64
        }

        /// Burst plus trailing pause.
        pub const fn cycle_ms(&self) -> u64 {
            self.burst_ms() + self.pause_ms as u64
        }

        /// LED level `t_ms` into the pattern, repeating every `cycle_ms`.
        ///
        /// Each blink starts lit. Degenerate patterns stay dark.
        pub fn level_at(&self, t_ms: u32) -> bool {
            // u64 so long pauses or many blinks cannot overflow.
            let cycle = self.cycle_ms();
            if cycle == 0 || self.half_period_ms == 0 {
                return false;
            }
            let phase = (t_ms as u64) % cycle;
            if phase >= self.burst_ms() {
                return false;
            }
            (phase / self.half_period_ms as u64) % 2 == 0
        }
    }

    /// Power-on self test, before the modem is touched.
    pub const STARTUP: BlinkPattern = BlinkPattern::new(3, 150, 0);
    /// Modem answered `AT`.
    pub const BOOT_OK: BlinkPattern = BlinkPattern::new(2, 500, 0);
    /// Short burst right after the boot sequence gives up.
    pub const BOOT_ABORT: BlinkPattern = BlinkPattern::new(6, 100, 0);
    /// Repeating: modem never came up.
    pub const BOOT_FAILED: BlinkPattern = BlinkPattern::new(10, 100, 2_000);
    /// Repeating heartbeat: SIM ready.
    pub const SIM_READY: BlinkPattern = BlinkPattern::new(1, 100, 2_000);
    /// Repeating: SIM missing, locked or unreadable.
    pub const SIM_NOT_READY: BlinkPattern = BlinkPattern::new(5, 200, 2_000);
}

/// What the board is currently telling the user.
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Indication {
    Startup,
    BootOk,
    BootAbort,
    BootFailed,
    SimReady,
    SimNotReady,
}

impl Indication {
    pub const fn pattern(self) -> pattern::BlinkPattern {
        use pattern::*;
        match self {
            Indication::Startup => STARTUP,
            Indication::BootOk => BOOT_OK,
            Indication::BootAbort => BOOT_ABORT,
            Indication::BootFailed => BOOT_FAILED,
            Indication::SimReady => SIM_READY,
            Indication::SimNotReady => SIM_NOT_READY,
        }
    }
}

/// Blocking driver over `embedded-hal` pins.
pub mod driver {
    use embedded_hal::delay::DelayNs;
    use embedded_hal::digital::OutputPin;

    use crate::pattern::BlinkPattern;

    /// Play the blinks of `pattern` once, without the trailing pause.
    /// Pin errors are ignored; the LED is cosmetic.
    pub fn blink<L: OutputPin, D: DelayNs>(led: &mut L, delay: &mut D, pattern: BlinkPattern) {
        for _ in 0..pattern.times {
            let _ = led.set_high();
            delay.delay_ms(pattern.half_period_ms);
            let _ = led.set_low();
            delay.delay_ms(pattern.half_period_ms);
        }
    }

    /// Blinks followed by the pattern's pause.
    pub fn blink_cycle<L: OutputPin, D: DelayNs>(
        led: &mut L,
        delay: &mut D,
        pattern: BlinkPattern,
    ) {
        blink(led, delay, pattern);
        delay.delay_ms(pattern.pause_ms);
    }
}

#[cfg(test)]
extern crate std;

#[cfg(test)]
mod tests {
    use super::Indication;
    use super::driver::{blink, blink_cycle};
    use super::pattern::*;

    use core::convert::Infallible;
    use embedded_hal::delay::DelayNs;
    use embedded_hal::digital::{ErrorType, OutputPin};
    use std::vec::Vec;

    #[derive(Default)]
    struct Trace {
        now_ms: u32,
        // (time, level) for every pin write
        writes: Vec<(u32, bool)>,
    }

    struct TraceLed<'a>(&'a core::cell::RefCell<Trace>);
    struct TraceDelay<'a>(&'a core::cell::RefCell<Trace>);

    impl ErrorType for TraceLed<'_> {
        type Error = Infallible;
    }

    impl OutputPin for TraceLed<'_> {
        fn set_high(&mut self) -> Result<(), Infallible> {
            let mut t = self.0.borrow_mut();
            let now = t.now_ms;
            t.writes.push((now, true));
            Ok(())
        }
        fn set_low(&mut self) -> Result<(), Infallible> {
            let mut t = self.0.borrow_mut();
            let now = t.now_ms;
            t.writes.push((now, false));
            Ok(())
        }
    }

    impl DelayNs for TraceDelay<'_> {
        fn delay_ns(&mut self, ns: u32) {
            self.0.borrow_mut().now_ms += ns / 1_000_000;
        }
        fn delay_ms(&mut self, ms: u32) {
            self.0.borrow_mut().now_ms += ms;
        }
    }

    #[test]
    fn level_follows_blinks_then_pause() {
        let p = SIM_NOT_READY; // 5 x 200 ms, 2 s pause
        assert!(p.level_at(0));
        assert!(p.level_at(199));
        assert!(!p.level_at(200));
        assert!(p.level_at(400));
        assert!(!p.level_at(1_999));
        assert!(!p.level_at(2_000));
        assert!(!p.level_at(3_999));
        // Next cycle starts lit again.
        assert!(p.level_at(4_000));
    }

    #[test]
    fn cycle_lengths() {
        assert_eq!(STARTUP.cycle_ms(), 900);
        assert_eq!(BOOT_OK.cycle_ms(), 2_000);
        assert_eq!(BOOT_FAILED.cycle_ms(), 4_000);
        assert_eq!(SIM_READY.cycle_ms(), 2_200);
    }

    #[test]
    fn degenerate_patterns_stay_dark() {
        assert!(!BlinkPattern::new(0, 100, 0).level_at(0));
        assert!(!BlinkPattern::new(3, 0, 500).level_at(0));
        assert!(!BlinkPattern::new(0, 100, 2_000).level_at(10));
    }

    #[test]
    fn long_pattern_no_overflow() {
        let p = BlinkPattern::new(u8::MAX, u32::MAX / 2, u32::MAX);
        assert!(p.cycle_ms() > u32::MAX as u64);
        assert!(p.level_at(0));
        assert!(!p.level_at(u32::MAX / 2));
    }

    #[test]
    fn indications_are_distinct() {
        let all = [
            Indication::Startup,
            Indication::BootOk,
            Indication::BootAbort,
            Indication::BootFailed,
            Indication::SimReady,
            Indication::SimNotReady,
        ];
        for (i, a) in all.iter().enumerate() {
            for b in &all[i + 1..] {
                assert_ne!(a.pattern(), b.pattern(), "{:?} vs {:?}", a, b);
            }
        }
    }

    #[test]
    fn driver_matches_pattern_timing() {
        let trace = core::cell::RefCell::new(Trace::default());
        let mut led = TraceLed(&trace);
        let mut delay = TraceDelay(&trace);

        blink(&mut led, &mut delay, BOOT_OK);
        {
            let t = trace.borrow();
            assert_eq!(
                t.writes,
                [(0, true), (500, false), (1_000, true), (1_500, false)]
            );
            assert_eq!(t.now_ms, 2_000);
            for &(at, level) in &t.writes {
                assert_eq!(BOOT_OK.level_at(at), level);
            }
        }

        blink_cycle(&mut led, &mut delay, SIM_READY);
        assert_eq!(trace.borrow().now_ms, 2_000 + 2_200);
    }
}
