//! Board wiring and link settings for the Pico + SIM7080G hat.
//!
//! | Signal     | Pico pin |
//! |------------|----------|
//! | UART0 TX   | GP0      |
//! | UART0 RX   | GP1      |
//! | PWRKEY     | GP14     |
//! | Status LED | GP25     |

use embassy_rp::uart::{Config as UartConfig, DataBits, Parity, StopBits};

/// SIM7080G factory default; auto-bauding also locks onto this.
pub const MODEM_BAUD: u32 = 115_200;

/// Serial buffers owned by the UART interrupt handler. The modem never
/// sends more than one reply window (2 KiB) between reads.
pub const UART_TX_BUF_LEN: usize = 256;
pub const UART_RX_BUF_LEN: usize = 2_048;

/// Time for a host to attach to RTT before the banner is printed.
pub const CONSOLE_ATTACH_MS: u64 = 2_000;

pub fn modem_uart_config() -> UartConfig {
    let mut cfg = UartConfig::default();
    cfg.baudrate = MODEM_BAUD;
    cfg.data_bits = DataBits::DataBits8;
    cfg.parity = Parity::ParityNone;
    cfg.stop_bits = StopBits::STOP1;
    cfg
}
