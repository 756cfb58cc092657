//! 24-bit SPI transactions proxied through the firmware.

use std::time::Duration;

use crate::{Error, LineTransport, Port, Result};

pub const PROXY_COMMAND: &str = "SYST:SPI:SEN";
pub const PROXY_REPLY: &str = "SPIRESP";

/// One command byte followed by a 16-bit data word, sent MSB first.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SpiTransaction {
    pub command_byte: u8,
    pub data_word: u16,
}

impl SpiTransaction {
    pub fn new(command_byte: u8, data_word: u16) -> SpiTransaction {
        SpiTransaction { command_byte, data_word }
    }

    pub fn to_bytes(self) -> [u8; 3] {
        [
            self.command_byte,
            (self.data_word >> 8) as u8,
            (self.data_word >> 0) as u8,
        ]
    }

    pub fn from_bytes(bytes: [u8; 3]) -> SpiTransaction {
        SpiTransaction {
            command_byte: bytes[0],
            data_word: u16::from_be_bytes([bytes[1], bytes[2]]),
        }
    }
}

/// The three bytes shifted out of the target while a transaction was shifted in.
///
/// Only the pattern as a whole is meaningful; the individual bytes are not decoded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SpiReply([u8; 3]);

impl SpiReply {
    /// Echo produced by a correctly wired DAC accepting a write.
    pub const SUCCESS: SpiReply = SpiReply([0x01, 0xff, 0xff]);

    pub fn new(bytes: [u8; 3]) -> SpiReply {
        SpiReply(bytes)
    }

    pub fn bytes(self) -> [u8; 3] {
        self.0
    }

    pub fn is_success(self) -> bool {
        self == Self::SUCCESS
    }

    /// Decode a `SPIRESP,<cs>,<command>,<payload>,<answer>` line.
    pub fn parse(line: &str) -> Result<SpiReply> {
        let malformed = || Error::MalformedReply { line: line.to_owned() };
        let fields: Vec<&str> = line.split(',').map(str::trim).collect();
        let [tag, echo @ .., answer] = fields.as_slice() else {
            return Err(malformed())
        };
        if *tag != PROXY_REPLY || echo.len() != 3 {
            return Err(malformed())
        }
        for field in echo {
            field.parse::<u32>().map_err(|_| malformed())?;
        }
        let answer = answer.parse::<u32>().map_err(|_| malformed())?;
        if answer > 0xff_ffff {
            return Err(malformed())
        }
        let [_, high, mid, low] = answer.to_be_bytes();
        Ok(SpiReply([high, mid, low]))
    }
}

/// Anything able to run a 24-bit SPI transaction against a chip select.
pub trait SpiIo {
    fn transfer_24(&mut self, chip_select: u8, transaction: SpiTransaction) -> Result<SpiReply>;
}

impl<S: SpiIo + ?Sized> SpiIo for &mut S {
    fn transfer_24(&mut self, chip_select: u8, transaction: SpiTransaction) -> Result<SpiReply> {
        (**self).transfer_24(chip_select, transaction)
    }
}

/// SPI bus of the firmware, reached through `SYST:SPI:SEN`.
#[derive(Debug)]
pub struct SpiProxy<'a, P: Port> {
    transport: &'a mut LineTransport<P>,
    timeout: Duration,
}

impl<'a, P: Port> SpiProxy<'a, P> {
    pub fn new(transport: &'a mut LineTransport<P>, timeout: Duration) -> SpiProxy<'a, P> {
        SpiProxy { transport, timeout }
    }

    pub fn execute(&mut self, chip_select: u8, command_byte: u8, data_word: u16)
            -> Result<[u8; 3]> {
        let reply = self.transfer_24(chip_select, SpiTransaction::new(command_byte, data_word))?;
        Ok(reply.bytes())
    }
}

impl<'a, P: Port> SpiIo for SpiProxy<'a, P> {
    fn transfer_24(&mut self, chip_select: u8, transaction: SpiTransaction) -> Result<SpiReply> {
        log::debug!("transfer_24({}, {:02x?})", chip_select, transaction.to_bytes());
        let command = format!("{} {}, {}, {}\n",
            PROXY_COMMAND, chip_select, transaction.command_byte, transaction.data_word);
        let line = self.transport.query(&command, PROXY_REPLY, self.timeout)?;
        let reply = SpiReply::parse(&line)?;
        log::debug!("transfer_24({}, ..) = {:02x?}", chip_select, reply.bytes());
        Ok(reply)
    }
}
