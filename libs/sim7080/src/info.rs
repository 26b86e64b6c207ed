use embedded_io::{Read, ReadReady, Write};
use pimodem_at_link::{Clock, Command, CommandChannel, Response, log_lines};

/// A labelled query whose reply is shown as-is.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct InfoQuery {
    pub label: &'static str,
    pub command: Command<'static>,
}

impl InfoQuery {
    pub const fn new(label: &'static str, command: Command<'static>) -> Self {
        Self { label, command }
    }
}

pub const MODEM_INFO: [InfoQuery; 4] = [
    InfoQuery::new("Manufacturer", Command::at("AT+CGMI")),
    InfoQuery::new("Model", Command::at("AT+CGMM")),
    InfoQuery::new("Firmware", Command::at("AT+CGMR")),
    InfoQuery::new("IMEI", Command::at("AT+CGSN")),
];

pub const SIM_INFO: [InfoQuery; 6] = [
    InfoQuery::new("ICCID", Command::at("AT+CCID")),
    InfoQuery::new("IMSI", Command::at("AT+CIMI")),
    InfoQuery::new("Phone Number", Command::at("AT+CNUM")),
    // Operator lookup is slower than the rest.
    InfoQuery::new("Operator", Command::new("AT+COPS?", 2_000)),
    InfoQuery::new("Signal", Command::at("AT+CSQ")),
    InfoQuery::new("Registration", Command::at("AT+CREG?")),
];

/// Issue each query in order and hand the reply to `on_reply`.
pub fn run_queries<P, C, const N: usize>(
    channel: &mut CommandChannel<P, C, N>,
    queries: &[InfoQuery],
    mut on_reply: impl FnMut(&InfoQuery, &Response<'_>),
) where
    P: Read + ReadReady + Write,
    C: Clock,
{
    for query in queries {
        let resp = channel.send(query.command);
        on_reply(query, &resp);
    }
}

/// Default reply sink: label, then the reply line by line.
pub fn log_reply(query: &InfoQuery, resp: &Response<'_>) {
    info!("{}:", query.label);
    log_lines(resp);
}
