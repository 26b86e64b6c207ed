//! Host-side stand-ins for the Pico peripherals.

use anyhow::{Context, Result};
use embedded_hal::delay::DelayNs;
use embedded_hal::digital::{self, ErrorKind, OutputPin};
use pimodem_at_link::Clock;
use serialport::{DataBits, FlowControl, Parity, SerialPort, StopBits};
use std::io;
use std::thread;
use std::time::{Duration, Instant};

use crate::config::PowerLine;

/// Pause between `read_ready` polls that found nothing, so a read window
/// does not spin a core.
const IDLE_POLL: Duration = Duration::from_millis(1);

/// UART exposed through the `embedded-io` traits the command channel needs.
pub struct SerialLink {
    port: Box<dyn SerialPort>,
}

impl SerialLink {
    pub fn open(path: &str, baud: u32) -> Result<Self> {
        let port = serialport::new(path, baud)
            .data_bits(DataBits::Eight)
            .parity(Parity::None)
            .stop_bits(StopBits::One)
            .flow_control(FlowControl::None)
            .timeout(Duration::from_millis(100))
            .open()
            .with_context(|| format!("open {path} at {baud} baud"))?;
        Ok(Self { port })
    }

    /// Second handle on the same device for driving the power line.
    pub fn power_key(&self, line: PowerLine) -> Result<PowerKeyLine> {
        let port = match line {
            PowerLine::None => None,
            _ => Some(self.port.try_clone().context("clone serial handle")?),
        };
        let mut key = PowerKeyLine { port, line };
        // Adapters often assert DTR/RTS on open; start released.
        key.set_low()
            .map_err(|_| anyhow::anyhow!("release {:?} line", line))?;
        Ok(key)
    }
}

impl embedded_io::ErrorType for SerialLink {
    type Error = io::Error;
}

impl embedded_io::Read for SerialLink {
    fn read(&mut self, buf: &mut [u8]) -> Result<usize, Self::Error> {
        io::Read::read(&mut self.port, buf)
    }
}

impl embedded_io::ReadReady for SerialLink {
    fn read_ready(&mut self) -> Result<bool, Self::Error> {
        let ready = self.port.bytes_to_read()? > 0;
        if !ready {
            thread::sleep(IDLE_POLL);
        }
        Ok(ready)
    }
}

impl embedded_io::Write for SerialLink {
    fn write(&mut self, buf: &[u8]) -> Result<usize, Self::Error> {
        io::Write::write(&mut self.port, buf)
    }

    fn flush(&mut self) -> Result<(), Self::Error> {
        io::Write::flush(&mut self.port)
    }
}

/// DTR or RTS driven as the PWRKEY output. With [`PowerLine::None`] every
/// write is accepted and ignored.
pub struct PowerKeyLine {
    port: Option<Box<dyn SerialPort>>,
    line: PowerLine,
}

impl PowerKeyLine {
    fn drive(&mut self, level: bool) -> serialport::Result<()> {
        match (&mut self.port, self.line) {
            (Some(port), PowerLine::Dtr) => port.write_data_terminal_ready(level),
            (Some(port), PowerLine::Rts) => port.write_request_to_send(level),
            _ => Ok(()),
        }
    }
}

impl digital::ErrorType for PowerKeyLine {
    type Error = ErrorKind;
}

impl OutputPin for PowerKeyLine {
    fn set_high(&mut self) -> Result<(), Self::Error> {
        self.drive(true).map_err(|e| {
            log::warn!("power line: {e}");
            ErrorKind::Other
        })
    }

    fn set_low(&mut self) -> Result<(), Self::Error> {
        self.drive(false).map_err(|e| {
            log::warn!("power line: {e}");
            ErrorKind::Other
        })
    }
}

/// Milliseconds since the tool started.
pub struct HostClock {
    origin: Instant,
}

impl HostClock {
    pub fn new() -> Self {
        Self {
            origin: Instant::now(),
        }
    }
}

impl Clock for HostClock {
    fn now_ms(&self) -> u32 {
        self.origin.elapsed().as_millis() as u32
    }
}

pub struct StdDelay;

impl DelayNs for StdDelay {
    fn delay_ns(&mut self, ns: u32) {
        thread::sleep(Duration::from_nanos(u64::from(ns)));
    }

    fn delay_ms(&mut self, ms: u32) {
        thread::sleep(Duration::from_millis(u64::from(ms)));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn host_clock_is_monotonic() {
        let clock = HostClock::new();
        let a = clock.now_ms();
        StdDelay.delay_ms(5);
        let b = clock.now_ms();
        assert!(b >= a + 5);
    }

    #[test]
    fn detached_power_line_accepts_writes() {
        let mut key = PowerKeyLine {
            port: None,
            line: PowerLine::None,
        };
        assert!(key.set_high().is_ok());
        assert!(key.set_low().is_ok());
    }
}
