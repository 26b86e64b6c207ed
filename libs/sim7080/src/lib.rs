#![no_std]

//! SIM7080G bring-up over an [`pimodem_at_link::CommandChannel`].
//!
//! Pure logic over `embedded-hal`/`embedded-io` traits so the boot sequence
//! runs unchanged on the Pico and against host-side fakes.

#[cfg(test)]
extern crate std;

mod fmt;

pub mod boot;
pub mod info;
pub mod power;

#[cfg(test)]
mod mock;

use embedded_hal::delay::DelayNs;
use embedded_hal::digital::OutputPin;
use embedded_io::{Read, ReadReady, Write};
use pimodem_at_link::{
    Clock, Command, CommandChannel, RX_BUFFER_LEN, Readiness, Response, log_lines,
};

pub use boot::{BootConfig, BootOutcome, BootSequencer, BootState};
pub use info::{InfoQuery, MODEM_INFO, SIM_INFO, log_reply, run_queries};
pub use power::{POWER_PULSE_MS, PowerKey};

pub const ECHO_OFF: Command<'static> = Command::at("ATE0");
pub const VERBOSE_ERRORS: Command<'static> = Command::at("AT+CMEE=2");
pub const SIM_STATUS: Command<'static> = Command::at("AT+CPIN?");

/// Modem handle: the command channel plus the power key and a blocking delay.
pub struct Sim7080g<P, C, K, D, const N: usize = RX_BUFFER_LEN> {
    channel: CommandChannel<P, C, N>,
    power: PowerKey<K>,
    delay: D,
    boot: BootConfig,
}

impl<P, C, K, D, const N: usize> Sim7080g<P, C, K, D, N>
where
    P: Read + ReadReady + Write,
    C: Clock,
    K: OutputPin,
    D: DelayNs,
{
    pub fn new(port: P, clock: C, power_pin: K, delay: D) -> Self {
        Self {
            channel: CommandChannel::new(port, clock),
            power: PowerKey::new(power_pin),
            delay,
            boot: BootConfig::default(),
        }
    }

    pub fn with_boot_config(mut self, boot: BootConfig) -> Self {
        self.boot = boot;
        self
    }

    /// Power the modem on and wait for it to answer `AT`.
    ///
    /// When ready, echo is turned off and verbose CME errors enabled; those
    /// two replies are not checked. Failure signaling is left to the caller.
    pub fn start(&mut self) -> BootOutcome {
        info!("=== Starting Modem ===");
        let mut seq = BootSequencer::new(self.boot);
        let outcome = seq.run(&mut self.channel, &mut self.power, &mut self.delay);

        match outcome {
            BootOutcome::Ready {
                elapsed_ms,
                attempts,
            } => {
                info!(
                    "Modem ready after {} ms ({} attempts)",
                    elapsed_ms, attempts
                );
                self.channel.send(ECHO_OFF);
                self.channel.send(VERBOSE_ERRORS);
            }
            BootOutcome::Failed => {
                warn!(
                    "Modem boot failed after {} attempts",
                    self.boot.max_attempts
                );
            }
        }
        outcome
    }

    /// Query `AT+CPIN?` and classify the reply.
    pub fn check_sim(&mut self) -> Readiness {
        info!("=== Checking SIM ===");
        let resp = self.channel.send(SIM_STATUS);
        log_lines(&resp);
        let state = Readiness::of_sim_status(&resp);
        info!("SIM: {}", state.label());
        state
    }

    pub fn modem_info(&mut self, on_reply: impl FnMut(&InfoQuery, &Response<'_>)) {
        info!("=== Modem Info ===");
        run_queries(&mut self.channel, &MODEM_INFO, on_reply);
    }

    pub fn sim_info(&mut self, on_reply: impl FnMut(&InfoQuery, &Response<'_>)) {
        info!("=== SIM Info ===");
        run_queries(&mut self.channel, &SIM_INFO, on_reply);
    }

    /// Direct access for ad-hoc commands.
    pub fn channel(&mut self) -> &mut CommandChannel<P, C, N> {
        &mut self.channel
    }

    pub fn delay(&mut self) -> &mut D {
        &mut self.delay
    }

    pub fn power_presses(&self) -> u32 {
        self.power.presses()
    }

    pub fn release(self) -> (P, C, K, D) {
        let (port, clock) = self.channel.into_parts();
        (port, clock, self.power.release(), self.delay)
    }
}
