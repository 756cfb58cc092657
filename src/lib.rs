mod sys;
mod regs;
mod config;
mod params;
mod reader;
mod transport;
mod spi;
mod dac;
mod session;
mod board;

use std::io;
use std::time::Duration;

#[derive(Debug)]
pub enum Error {
    Timeout { expected: String, elapsed: Duration },
    IncompatibleDevice { banner: String },
    InvalidChannel { channel: usize, count: usize },
    InvalidCode { code: u32, max: u32 },
    InvalidArgument(String),
    OutOfRange { value: f64, min: f64, max: f64 },
    Transport { reply: [u8; 3] },
    MalformedReply { line: String },
    Unimplemented(&'static str),
    Serial(serialport::Error),
    Io(io::Error),
}

impl std::fmt::Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        match self {
            Self::Timeout { expected, elapsed } =>
                write!(f, "timeout waiting for {:?} response after {:.3} s",
                    expected, elapsed.as_secs_f64()),
            Self::IncompatibleDevice { banner } =>
                write!(f, "incompatible hardware, welcome message was: {:?}", banner),
            Self::InvalidChannel { channel, count } =>
                write!(f, "invalid channel {} (device has {} channels)", channel, count),
            Self::InvalidCode { code, max } =>
                write!(f, "invalid DAC code {} (maximum is {})", code, max),
            Self::InvalidArgument(message) =>
                write!(f, "invalid argument: {}", message),
            Self::OutOfRange { value, min, max } =>
                write!(f, "value {} out of range, allowed range: {} ... {}", value, min, max),
            Self::Transport { reply } =>
                write!(f, "SPI communication error, answer was {:02x?}", reply),
            Self::MalformedReply { line } =>
                write!(f, "malformed reply: {:?}", line),
            Self::Unimplemented(operation) =>
                write!(f, "{} is not implemented yet", operation),
            Self::Serial(serial_error) =>
                write!(f, "serial port error: {}", serial_error),
            Self::Io(io_error) =>
                write!(f, "I/O error: {}", io_error),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            &Self::Serial(ref serial_error) => Some(serial_error),
            &Self::Io(ref io_error) => Some(io_error),
            _ => None
        }
    }
}

impl From<io::Error> for Error {
    fn from(error: io::Error) -> Self {
        Error::Io(error)
    }
}

impl From<serialport::Error> for Error {
    fn from(error: serialport::Error) -> Self {
        Error::Serial(error)
    }
}

impl From<Error> for io::Error {
    fn from(error: Error) -> Self {
        match error {
            Error::Io(io_error) =>
                io_error,
            Error::Timeout { .. } =>
                Self::new(io::ErrorKind::TimedOut, error),
            Error::Serial(serial_error) =>
                serial_error.into(),
            _ =>
                Self::new(io::ErrorKind::Other, error),
        }
    }
}

pub type Result<T> =
    core::result::Result<T, Error>;

pub use sys::Port;

pub use config::{
    SessionConfig,
    ThresholdScale,
};

pub use params::{
    ReferenceSource,
    DeviceCapability,
    Validation,
};

pub use reader::ReplyReader;

pub use transport::LineTransport;

pub use spi::{
    SpiIo,
    SpiTransaction,
    SpiReply,
    SpiProxy,
};

pub use dac::Dac;

pub use session::{
    VENDOR,
    PRODUCT,
    MINIMUM_FIRMWARE,
    FirmwareVersion,
    SessionIdentity,
    DeviceSession,
    TestPulser,
};

pub use board::{
    INPUT_CHANNELS,
    LOGIC_CHANNELS,
    DacSelect,
    Board,
};

/// Session over a physical serial port.
pub type Session =
    session::DeviceSession<Box<dyn serialport::SerialPort>>;

/// Discriminator board over a physical serial port.
pub type ArduDisc =
    board::Board<Box<dyn serialport::SerialPort>>;
