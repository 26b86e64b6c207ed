mod config;
mod link;

use anyhow::{Result, bail};
use clap::{Parser, Subcommand};
use config::{Config, PowerLine};
use link::{HostClock, PowerKeyLine, SerialLink, StdDelay};
use pimodem_at_link::{Command, DEFAULT_TIMEOUT_MS, Readiness};
use pimodem_sim7080::{BootOutcome, Sim7080g, boot::PROBE, log_reply};
use serialport::{SerialPortType, available_ports};
use std::path::PathBuf;
use std::process::ExitCode;

/// modem-bench: SIM7080G bring-up from a desktop USB-UART adapter.
#[derive(Parser, Debug)]
#[command(name = "modem-bench", version)]
struct Cli {
    /// Config file; defaults to the nearest configs/modem-bench.toml.
    #[arg(long, global = true)]
    config: Option<PathBuf>,
    /// Serial device, overrides the config.
    #[arg(long, short, global = true)]
    port: Option<String>,
    /// Baud rate, overrides the config.
    #[arg(long, global = true)]
    baud: Option<u32>,
    #[command(subcommand)]
    cmd: Cmd,
}

#[derive(Subcommand, Debug)]
enum Cmd {
    /// List serial ports.
    Ports,
    /// Power on, wait for AT, then query modem and SIM.
    /// Exit code: 0 SIM ready, 1 boot failed, 2 SIM not ready.
    Boot {
        /// Adapter line wired to PWRKEY, overrides the config.
        #[arg(long, value_enum)]
        power_line: Option<PowerLine>,
        /// Skip the power pulse and settle wait (modem already on).
        #[arg(long, default_value_t = false)]
        no_power: bool,
    },
    /// Send a single AT probe.
    Probe,
    /// Send one raw command and print the reply.
    Send {
        command: String,
        #[arg(long, default_value_t = DEFAULT_TIMEOUT_MS)]
        timeout_ms: u32,
    },
}

type BenchModem = Sim7080g<SerialLink, HostClock, PowerKeyLine, StdDelay>;

fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    match run(Cli::parse()) {
        Ok(code) => code,
        Err(e) => {
            log::error!("{e:#}");
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> Result<ExitCode> {
    let Cli {
        config,
        port,
        baud,
        cmd,
    } = cli;

    let cfg = || -> Result<Config> {
        let mut cfg = Config::load(config.as_deref())?;
        if let Some(port) = &port {
            cfg.port = port.trim().to_string();
        }
        if let Some(baud) = baud {
            if baud == 0 {
                bail!("--baud must be non-zero");
            }
            cfg.baud = baud;
        }
        if cfg.port.is_empty() {
            bail!("no serial port: pass --port or set `port` in the config");
        }
        Ok(cfg)
    };

    match cmd {
        Cmd::Ports => {
            list_ports()?;
            Ok(ExitCode::SUCCESS)
        }
        Cmd::Boot {
            power_line,
            no_power,
        } => {
            let mut cfg = cfg()?;
            if let Some(line) = power_line {
                cfg.power_line = line;
            }
            boot(&cfg, no_power)
        }
        Cmd::Probe => {
            let cfg = cfg()?;
            let mut modem = open(&cfg, PowerLine::None)?;
            let resp = modem
                .channel()
                .send(Command::new(PROBE, cfg.probe_timeout_ms));
            let state = Readiness::of_ack(&resp);
            println!("{}", state.label());
            Ok(if state.is_ready() {
                ExitCode::SUCCESS
            } else {
                ExitCode::from(1)
            })
        }
        Cmd::Send {
            command,
            timeout_ms,
        } => {
            let mut modem = open(&cfg()?, PowerLine::None)?;
            let resp = modem.channel().send(Command::new(&command, timeout_ms));
            for line in resp.lines() {
                println!("{line}");
            }
            Ok(ExitCode::SUCCESS)
        }
    }
}

fn open(cfg: &Config, line: PowerLine) -> Result<BenchModem> {
    let link = SerialLink::open(&cfg.port, cfg.baud)?;
    let key = link.power_key(line)?;
    log::info!("{} at {} baud, power line {:?}", cfg.port, cfg.baud, line);
    Ok(Sim7080g::new(link, HostClock::new(), key, StdDelay).with_boot_config(cfg.boot_config()))
}

fn boot(cfg: &Config, no_power: bool) -> Result<ExitCode> {
    let mut boot_cfg = cfg.boot_config();
    let line = if no_power {
        boot_cfg.power_pulse_ms = 0;
        boot_cfg.settle_ms = 0;
        PowerLine::None
    } else {
        cfg.power_line
    };
    let mut modem = open(cfg, line)?.with_boot_config(boot_cfg);

    if let BootOutcome::Failed = modem.start() {
        log::error!("modem did not answer; check power and wiring");
        return Ok(ExitCode::from(1));
    }
    modem.modem_info(log_reply);

    let sim = modem.check_sim();
    if !sim.is_ready() {
        log::warn!("SIM not ready ({}); skipping SIM queries", sim.label());
        return Ok(ExitCode::from(2));
    }
    modem.sim_info(log_reply);
    Ok(ExitCode::SUCCESS)
}

fn list_ports() -> Result<()> {
    let ports = available_ports()?;
    if ports.is_empty() {
        println!("no serial ports found");
    }
    for p in ports {
        match p.port_type {
            SerialPortType::UsbPort(info) => println!(
                "{}\tusb vid={:04x} pid={:04x} {}",
                p.port_name,
                info.vid,
                info.pid,
                info.product.unwrap_or_default()
            ),
            other => println!("{}\t{:?}", p.port_name, other),
        }
    }
    Ok(())
}
