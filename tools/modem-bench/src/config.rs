use anyhow::{Context, Result, bail};
use pimodem_sim7080::BootConfig;
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};

pub const CONFIG_REL_PATH: &str = "configs/modem-bench.toml";

/// Which modem-control line of the USB-UART adapter is wired to PWRKEY.
#[derive(Clone, Copy, Debug, Default, Deserialize, PartialEq, Eq, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum PowerLine {
    #[default]
    Dtr,
    Rts,
    /// Modem is powered some other way; skip the pulse.
    None,
}

#[derive(Clone, Debug, Deserialize)]
pub struct Config {
    /// Serial device; empty means it must be given with `--port`.
    #[serde(default)]
    pub port: String,
    #[serde(default = "Config::default_baud")]
    pub baud: u32,
    #[serde(default)]
    pub power_line: PowerLine,
    #[serde(default = "Config::default_power_pulse_ms")]
    pub power_pulse_ms: u32,
    #[serde(default = "Config::default_settle_ms")]
    pub settle_ms: u32,
    #[serde(default = "Config::default_max_attempts")]
    pub max_attempts: u32,
    #[serde(default = "Config::default_probe_timeout_ms")]
    pub probe_timeout_ms: u32,
    #[serde(default = "Config::default_retry_delay_ms")]
    pub retry_delay_ms: u32,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            port: String::new(),
            baud: Self::default_baud(),
            power_line: PowerLine::default(),
            power_pulse_ms: Self::default_power_pulse_ms(),
            settle_ms: Self::default_settle_ms(),
            max_attempts: Self::default_max_attempts(),
            probe_timeout_ms: Self::default_probe_timeout_ms(),
            retry_delay_ms: Self::default_retry_delay_ms(),
        }
    }
}

impl Config {
    fn default_baud() -> u32 {
        115_200
    }
    fn default_power_pulse_ms() -> u32 {
        BootConfig::new().power_pulse_ms
    }
    fn default_settle_ms() -> u32 {
        BootConfig::new().settle_ms
    }
    fn default_max_attempts() -> u32 {
        BootConfig::new().max_attempts
    }
    fn default_probe_timeout_ms() -> u32 {
        BootConfig::new().probe_timeout_ms
    }
    fn default_retry_delay_ms() -> u32 {
        BootConfig::new().retry_delay_ms
    }

    /// Load `path`, or `configs/modem-bench.toml` under the nearest ancestor
    /// directory that has one. Missing file means all defaults.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let path = match path {
            Some(p) => {
                if !p.exists() {
                    bail!("config file not found: {}", p.display());
                }
                Some(p.to_path_buf())
            }
            None => find_config()?,
        };
        match path {
            Some(p) => {
                let txt =
                    fs::read_to_string(&p).with_context(|| format!("read {}", p.display()))?;
                Self::parse(&txt).with_context(|| format!("parse {}", p.display()))
            }
            None => Ok(Config::default()),
        }
    }

    pub fn parse(txt: &str) -> Result<Self> {
        let mut cfg: Config = toml::from_str(txt)?;
        cfg.normalize();
        Ok(cfg)
    }

    // Zero means "unset" for every numeric knob.
    fn normalize(&mut self) {
        self.port = self.port.trim().to_string();
        if self.baud == 0 {
            self.baud = Self::default_baud();
        }
        if self.power_pulse_ms == 0 {
            self.power_pulse_ms = Self::default_power_pulse_ms();
        }
        if self.settle_ms == 0 {
            self.settle_ms = Self::default_settle_ms();
        }
        if self.max_attempts == 0 {
            self.max_attempts = Self::default_max_attempts();
        }
        if self.probe_timeout_ms == 0 {
            self.probe_timeout_ms = Self::default_probe_timeout_ms();
        }
        if self.retry_delay_ms == 0 {
            self.retry_delay_ms = Self::default_retry_delay_ms();
        }
    }

    pub fn boot_config(&self) -> BootConfig {
        BootConfig {
            power_pulse_ms: self.power_pulse_ms,
            settle_ms: self.settle_ms,
            max_attempts: self.max_attempts,
            probe_timeout_ms: self.probe_timeout_ms,
            retry_delay_ms: self.retry_delay_ms,
        }
    }
}

fn find_config() -> Result<Option<PathBuf>> {
    let mut dir = std::env::current_dir()?;
    loop {
        let candidate = dir.join(CONFIG_REL_PATH);
        if candidate.exists() {
            return Ok(Some(candidate));
        }
        if !dir.pop() {
            return Ok(None);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_file_yields_defaults() {
        let cfg = Config::parse("").unwrap();
        assert_eq!(cfg.port, "");
        assert_eq!(cfg.baud, 115_200);
        assert_eq!(cfg.power_line, PowerLine::Dtr);
        assert_eq!(cfg.boot_config(), BootConfig::default());
    }

    #[test]
    fn zero_and_blank_values_fall_back() {
        let cfg = Config::parse(
            r#"
            port = "  /dev/ttyUSB0 "
            baud = 0
            settle_ms = 0
            max_attempts = 0
            "#,
        )
        .unwrap();
        assert_eq!(cfg.port, "/dev/ttyUSB0");
        assert_eq!(cfg.baud, 115_200);
        assert_eq!(cfg.settle_ms, 35_000);
        assert_eq!(cfg.max_attempts, 20);
    }

    #[test]
    fn explicit_values_reach_boot_config() {
        let cfg = Config::parse(
            r#"
            power_line = "rts"
            settle_ms = 5000
            retry_delay_ms = 250
            "#,
        )
        .unwrap();
        assert_eq!(cfg.power_line, PowerLine::Rts);
        let boot = cfg.boot_config();
        assert_eq!(boot.settle_ms, 5_000);
        assert_eq!(boot.retry_delay_ms, 250);
        assert_eq!(boot.power_pulse_ms, 1_500);
    }

    #[test]
    fn unknown_power_line_is_rejected() {
        assert!(Config::parse(r#"power_line = "gpio""#).is_err());
    }

    #[test]
    fn missing_explicit_path_is_an_error() {
        let err = Config::load(Some(Path::new("/nonexistent/modem-bench.toml"))).unwrap_err();
        assert!(err.to_string().contains("config file not found"));
    }
}
