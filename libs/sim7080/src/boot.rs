//! Power-on and readiness probing.
//!
//! ```text
//! Idle --press--> PoweredSettling --settle--> Probing{1} --OK--> Ready
//!                                                 |  no OK
//!                                                 v
//!                                  Probing{n+1} ... Probing{max} --> Failed
//! ```
//!
//! The power key is pressed only on leaving `Idle`, so one run presses it
//! exactly once no matter how many probes follow.

use embedded_hal::delay::DelayNs;
use embedded_hal::digital::OutputPin;
use embedded_io::{Read, ReadReady, Write};
use pimodem_at_link::{Clock, Command, CommandChannel, Readiness, log_lines};

use crate::power::{POWER_PULSE_MS, PowerKey};

/// Liveness probe sent while waiting for the modem.
pub const PROBE: &str = "AT";

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct BootConfig {
    /// PWRKEY hold time.
    pub power_pulse_ms: u32,
    /// Wait after the press before the first probe. The SIM7080G can take
    /// well over 20 s to accept commands after a cold start.
    pub settle_ms: u32,
    pub max_attempts: u32,
    pub probe_timeout_ms: u32,
    /// Pause after each unanswered probe.
    pub retry_delay_ms: u32,
}

impl BootConfig {
    pub const fn new() -> Self {
        Self {
            power_pulse_ms: POWER_PULSE_MS,
            settle_ms: 35_000,
            max_attempts: 20,
            probe_timeout_ms: 1_000,
            retry_delay_ms: 4_000,
        }
    }
}

impl Default for BootConfig {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum BootState {
    Idle,
    PoweredSettling,
    /// `attempt` is 1-based and is the probe about to be sent.
    Probing { attempt: u32 },
    Ready { elapsed_ms: u32, attempts: u32 },
    Failed,
}

impl BootState {
    pub const fn outcome(self) -> Option<BootOutcome> {
        match self {
            BootState::Ready {
                elapsed_ms,
                attempts,
            } => Some(BootOutcome::Ready {
                elapsed_ms,
                attempts,
            }),
            BootState::Failed => Some(BootOutcome::Failed),
            _ => None,
        }
    }
}

/// Terminal result of one boot run.
///
/// `Failed` covers every cause (no power, no wiring, garbage on the line);
/// they are indistinguishable from here.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum BootOutcome {
    Ready { elapsed_ms: u32, attempts: u32 },
    Failed,
}

impl BootOutcome {
    pub const fn is_ready(self) -> bool {
        matches!(self, BootOutcome::Ready { .. })
    }
}

pub struct BootSequencer {
    config: BootConfig,
    state: BootState,
    started_ms: u32,
}

impl BootSequencer {
    pub const fn new(config: BootConfig) -> Self {
        Self {
            config,
            state: BootState::Idle,
            started_ms: 0,
        }
    }

    pub const fn state(&self) -> BootState {
        self.state
    }

    pub const fn config(&self) -> &BootConfig {
        &self.config
    }

    /// Perform the side effects of the current state and move to the next.
    /// Terminal states are sticky.
    pub fn step<P, C, K, D, const N: usize>(
        &mut self,
        channel: &mut CommandChannel<P, C, N>,
        power: &mut PowerKey<K>,
        delay: &mut D,
    ) -> BootState
    where
        P: Read + ReadReady + Write,
        C: Clock,
        K: OutputPin,
        D: DelayNs,
    {
        let cfg = self.config;
        self.state = match self.state {
            BootState::Idle => {
                self.started_ms = channel.clock().now_ms();
                info!("Toggling power...");
                power.press(delay, cfg.power_pulse_ms);
                BootState::PoweredSettling
            }
            BootState::PoweredSettling => {
                info!("Waiting {} ms for modem boot...", cfg.settle_ms);
                delay.delay_ms(cfg.settle_ms);
                BootState::Probing { attempt: 1 }
            }
            BootState::Probing { attempt } if attempt > cfg.max_attempts => BootState::Failed,
            BootState::Probing { attempt } => {
                info!("Sending AT (attempt {})...", attempt);
                let resp = channel.send(Command::new(PROBE, cfg.probe_timeout_ms));
                if Readiness::of_ack(&resp) == Readiness::Ok {
                    info!("Modem responded:");
                    log_lines(&resp);
                    let elapsed_ms = channel.clock().now_ms().wrapping_sub(self.started_ms);
                    BootState::Ready {
                        elapsed_ms,
                        attempts: attempt,
                    }
                } else {
                    info!("No response or error: {}", resp.text());
                    delay.delay_ms(cfg.retry_delay_ms);
                    if attempt >= cfg.max_attempts {
                        BootState::Failed
                    } else {
                        BootState::Probing {
                            attempt: attempt + 1,
                        }
                    }
                }
            }
            terminal @ (BootState::Ready { .. } | BootState::Failed) => terminal,
        };
        self.state
    }

    /// Step until `Ready` or `Failed`.
    pub fn run<P, C, K, D, const N: usize>(
        &mut self,
        channel: &mut CommandChannel<P, C, N>,
        power: &mut PowerKey<K>,
        delay: &mut D,
    ) -> BootOutcome
    where
        P: Read + ReadReady + Write,
        C: Clock,
        K: OutputPin,
        D: DelayNs,
    {
        loop {
            if let Some(outcome) = self.step(channel, power, delay).outcome() {
                return outcome;
            }
        }
    }
}
