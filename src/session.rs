use std::fmt;
use std::sync::OnceLock;
use std::time::Duration;

use regex::Regex;
use serialport::SerialPort;

use crate::{Error, LineTransport, Port, ReplyReader, Result, SessionConfig, SpiProxy};

pub const VENDOR: &str = "ELB";
pub const PRODUCT: &str = "ARDUDISC";
pub const MINIMUM_FIRMWARE: FirmwareVersion = FirmwareVersion { major: 0, minor: 0, patch: 1 };

const IDENTIFY_COMMAND: &str = "*IDN?";
const PULSER_ENABLE_COMMAND: &str = "SYST:PUL:ENA";
const PULSER_DISABLE_COMMAND: &str = "SYST:PUL:DIS";
const PULSER_REPLY: &str = "Pulser";

/// Firmware version; ordering compares major, then minor, then patch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct FirmwareVersion {
    pub major: u32,
    pub minor: u32,
    pub patch: u32,
}

impl FirmwareVersion {
    /// Parse a strict `major.minor.patch` string.
    pub fn parse(text: &str) -> Option<FirmwareVersion> {
        static PATTERN: OnceLock<Option<Regex>> = OnceLock::new();
        let pattern = PATTERN.get_or_init(|| {
            Regex::new(r"^([0-9]+)\.([0-9]+)\.([0-9]+)$").ok()
        }).as_ref()?;
        let captures = pattern.captures(text)?;
        Some(FirmwareVersion {
            major: captures[1].parse().ok()?,
            minor: captures[2].parse().ok()?,
            patch: captures[3].parse().ok()?,
        })
    }
}

impl fmt::Display for FirmwareVersion {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}.{}.{}", self.major, self.minor, self.patch)
    }
}

/// Identification line of the instrument: `VENDOR,PRODUCT,<serial>,MAJOR.MINOR.PATCH`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionIdentity {
    pub vendor: String,
    pub product: String,
    pub serial: String,
    pub firmware: FirmwareVersion,
}

impl SessionIdentity {
    /// Parse and check an identification line against the supported vendor, product and
    /// minimum firmware version.
    pub fn parse(banner: &str) -> Result<SessionIdentity> {
        let incompatible = || Error::IncompatibleDevice { banner: banner.to_owned() };
        let fields: Vec<&str> = banner.split(',').collect();
        let [vendor, product, serial, version, ..] = fields.as_slice() else {
            return Err(incompatible())
        };
        if *vendor != VENDOR || *product != PRODUCT {
            return Err(incompatible())
        }
        let firmware = FirmwareVersion::parse(version).ok_or_else(incompatible)?;
        if firmware < MINIMUM_FIRMWARE {
            return Err(incompatible())
        }
        Ok(SessionIdentity {
            vendor: vendor.to_string(),
            product: product.to_string(),
            serial: serial.to_string(),
            firmware,
        })
    }
}

/// An established connection to a compatible instrument.
///
/// A session only exists once the banner has been checked; there is no way to obtain one for an
/// incompatible device.
#[derive(Debug)]
pub struct DeviceSession<P: Port> {
    transport: LineTransport<P>,
    identity: SessionIdentity,
    reply_timeout: Duration,
}

impl DeviceSession<Box<dyn SerialPort>> {
    pub fn open(config: &SessionConfig) -> Result<DeviceSession<Box<dyn SerialPort>>> {
        let port = crate::sys::serial::open(config)?;
        DeviceSession::from_port(port, config)
    }
}

impl<P: Port> DeviceSession<P> {
    /// Establish a session over an already opened port, which must not have been read from.
    pub fn from_port(port: P, config: &SessionConfig) -> Result<DeviceSession<P>> {
        let reader = ReplyReader::new(config.poll_interval, config.open_timeout);
        let mut transport = LineTransport::new(port, reader);
        let banner = transport.read_line(config.open_timeout)?;
        let identity = SessionIdentity::parse(&banner)?;
        log::info!("{} {} found: {:?}", identity.vendor, identity.product, banner);
        Ok(DeviceSession {
            transport,
            identity,
            reply_timeout: config.reply_timeout,
        })
    }

    pub fn identity(&self) -> &SessionIdentity {
        &self.identity
    }

    pub fn reply_timeout(&self) -> Duration {
        self.reply_timeout
    }

    pub fn transport(&mut self) -> &mut LineTransport<P> {
        &mut self.transport
    }

    pub fn into_inner(self) -> P {
        self.transport.into_inner()
    }

    /// Ask the instrument to identify itself again, checking the answer like the banner.
    pub fn identify(&mut self) -> Result<SessionIdentity> {
        let line = self.transport.query(IDENTIFY_COMMAND, VENDOR, self.reply_timeout)?;
        SessionIdentity::parse(&line)
    }

    pub fn spi(&mut self) -> SpiProxy<'_, P> {
        SpiProxy::new(&mut self.transport, self.reply_timeout)
    }

    pub fn test_pulser(&mut self) -> TestPulser<'_, P> {
        TestPulser { transport: &mut self.transport, timeout: self.reply_timeout }
    }
}

/// The square wave test pulse generator built into the instrument.
#[derive(Debug)]
pub struct TestPulser<'a, P: Port> {
    transport: &'a mut LineTransport<P>,
    timeout: Duration,
}

impl<'a, P: Port> TestPulser<'a, P> {
    /// Switch the pulser on or off; returns the state reported back by the firmware.
    pub fn set(&mut self, on: bool) -> Result<bool> {
        let command = if on { PULSER_ENABLE_COMMAND } else { PULSER_DISABLE_COMMAND };
        let line = self.transport.query(command, PULSER_REPLY, self.timeout)?;
        match line.split(',').nth(1).map(str::trim) {
            Some("1") => Ok(true),
            Some("0") => Ok(false),
            _ => Err(Error::MalformedReply { line }),
        }
    }
}
