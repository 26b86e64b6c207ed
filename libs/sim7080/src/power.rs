use embedded_hal::delay::DelayNs;
use embedded_hal::digital::OutputPin;

/// Hold time for one PWRKEY press.
pub const POWER_PULSE_MS: u32 = 1_500;

/// Modem power key: a press is assert, hold, release.
pub struct PowerKey<K> {
    pin: K,
    presses: u32,
}

impl<K: OutputPin> PowerKey<K> {
    /// Takes the pin as-is; the caller configures it low before handing it over.
    pub const fn new(pin: K) -> Self {
        Self { pin, presses: 0 }
    }

    /// Assert for `hold_ms`, then release. The line is never left high.
    pub fn press(&mut self, delay: &mut impl DelayNs, hold_ms: u32) {
        if self.pin.set_high().is_err() {
            warn!("power key: failed to assert");
        }
        delay.delay_ms(hold_ms);
        if self.pin.set_low().is_err() {
            warn!("power key: failed to release");
        }
        self.presses += 1;
    }

    /// Presses issued since construction.
    pub const fn presses(&self) -> u32 {
        self.presses
    }

    pub fn release(self) -> K {
        self.pin
    }
}
