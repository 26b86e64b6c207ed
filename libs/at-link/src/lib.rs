#![no_std]

//! AT command link over a polled UART.
//!
//! Kept in `libs/` so the capture/deadline/classification logic can be
//! covered by host-side unit tests; the firmware only supplies the UART
//! (`embedded-io`) and a millisecond [`Clock`].

#[cfg(any(test, feature = "testing"))]
extern crate std;

// Must come first so the logging macros are visible to the other modules.
mod fmt;

pub mod buffer;
pub mod channel;
pub mod reader;
pub mod response;

#[cfg(any(test, feature = "testing"))]
pub mod testing;

pub use buffer::{RX_BUFFER_LEN, ReplyText, RxBuffer};
pub use channel::{Command, CommandChannel, DEFAULT_TIMEOUT_MS, LINE_END};
pub use reader::{Clock, Deadline, timed_read};
pub use response::{ACK, NO_RESPONSE, Readiness, Response, log_lines};
