#![no_std]
#![no_main]

use defmt::*;
use defmt_rtt as _;
use panic_probe as _;

use embassy_executor::Spawner;
use embassy_rp::bind_interrupts;
use embassy_rp::gpio::{Level, Output};
use embassy_rp::peripherals::UART0;
use embassy_rp::uart::{BufferedInterruptHandler, BufferedUart};
use embassy_time::{Delay, Duration, Instant, Timer};
use embedded_hal::delay::DelayNs;
use embedded_hal::digital::OutputPin;
use embedded_io::{Read, ReadReady, Write};
use pimodem_at_link::Clock;
use pimodem_sim7080::{BootOutcome, Sim7080g, log_reply};
use pimodem_status_led::{Indication, driver};
use static_cell::StaticCell;

mod config;
use config::{CONSOLE_ATTACH_MS, UART_RX_BUF_LEN, UART_TX_BUF_LEN, modem_uart_config};

const FW_VERSION: &str = env!("PIMODEM_FW_VERSION");

bind_interrupts!(struct Irqs {
    UART0_IRQ => BufferedInterruptHandler<UART0>;
});

static UART_TX_BUF: StaticCell<[u8; UART_TX_BUF_LEN]> = StaticCell::new();
static UART_RX_BUF: StaticCell<[u8; UART_RX_BUF_LEN]> = StaticCell::new();

/// Milliseconds since boot from the embassy time driver. Wraps after ~49 days;
/// deadlines use wrapping arithmetic.
struct UptimeClock;

impl Clock for UptimeClock {
    fn now_ms(&self) -> u32 {
        Instant::now().as_millis() as u32
    }
}

#[embassy_executor::main]
async fn main(_spawner: Spawner) -> ! {
    let p = embassy_rp::init(Default::default());

    Timer::after(Duration::from_millis(CONSOLE_ATTACH_MS)).await;
    info!("==========================================");
    info!("  Pico SIM7080G bring-up");
    info!("==========================================");
    info!("fw: {}", FW_VERSION);

    let led = Output::new(p.PIN_25, Level::Low);
    let pwrkey = Output::new(p.PIN_14, Level::Low);

    let tx_buf = UART_TX_BUF.init([0; UART_TX_BUF_LEN]);
    let rx_buf = UART_RX_BUF.init([0; UART_RX_BUF_LEN]);
    let uart = BufferedUart::new(
        p.UART0,
        Irqs,
        p.PIN_0,
        p.PIN_1,
        tx_buf,
        rx_buf,
        modem_uart_config(),
    );
    info!("UART0 up at {} baud (GP0/GP1), PWRKEY on GP14", config::MODEM_BAUD);

    bring_up(uart, pwrkey, led)
}

/// Power the modem, report what it says about itself and the SIM, then
/// signal the result on the LED forever.
fn bring_up<U, K, L>(uart: U, pwrkey: K, mut led: L) -> !
where
    U: Read + ReadReady + Write,
    K: OutputPin,
    L: OutputPin,
{
    let mut modem: Sim7080g<U, UptimeClock, K, Delay> =
        Sim7080g::new(uart, UptimeClock, pwrkey, Delay);

    driver::blink(&mut led, modem.delay(), Indication::Startup.pattern());

    if let BootOutcome::Failed = modem.start() {
        error!("Modem did not answer; check power and wiring");
        driver::blink(&mut led, modem.delay(), Indication::BootAbort.pattern());
        signal_forever(&mut led, modem.delay(), Indication::BootFailed);
    }

    driver::blink(&mut led, modem.delay(), Indication::BootOk.pattern());
    modem.modem_info(log_reply);

    let sim = modem.check_sim();
    let indication = if sim.is_ready() {
        modem.sim_info(log_reply);
        info!("=== Done ===");
        Indication::SimReady
    } else {
        warn!("SIM not ready ({}); skipping SIM queries", sim.label());
        Indication::SimNotReady
    };

    signal_forever(&mut led, modem.delay(), indication)
}

fn signal_forever<L: OutputPin, D: DelayNs>(led: &mut L, delay: &mut D, indication: Indication) -> ! {
    let pattern = indication.pattern();
    loop {
        driver::blink_cycle(led, delay, pattern);
    }
}
