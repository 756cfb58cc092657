use crate::{DeviceCapability, Error, ReferenceSource, Result, Validation};
use crate::{SpiIo, SpiReply, SpiTransaction};
use crate::regs::mcp48;

/// A four channel MCP48FxBx4 DAC behind one chip select.
///
/// The DAC does not own the SPI bus; every operation borrows it, so several DACs can share the
/// single link to the firmware.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Dac {
    capability: DeviceCapability,
    chip_select: u8,
    validation: Validation,
}

impl Dac {
    pub fn new(capability: DeviceCapability, chip_select: u8, validation: Validation) -> Dac {
        if validation == Validation::Unchecked {
            log::warn!("SPI replies of DAC at chip select {} will not be checked", chip_select);
        }
        Dac { capability, chip_select, validation }
    }

    /// 10 bit variant.
    pub fn mcp48fvb14(chip_select: u8, validation: Validation) -> Dac {
        Dac::new(DeviceCapability::MCP48FVB14, chip_select, validation)
    }

    /// 12 bit variant.
    pub fn mcp48fvb24(chip_select: u8, validation: Validation) -> Dac {
        Dac::new(DeviceCapability::MCP48FVB24, chip_select, validation)
    }

    pub fn capability(&self) -> DeviceCapability {
        self.capability
    }

    pub fn chip_select(&self) -> u8 {
        self.chip_select
    }

    pub fn validation(&self) -> Validation {
        self.validation
    }

    pub fn set_channel<S: SpiIo + ?Sized>(&self, spi: &mut S, channel: usize, code: u32)
            -> Result<()> {
        let addr = self.channel_addr(channel)?;
        let max = self.capability.max_code();
        if code > max {
            return Err(Error::InvalidCode { code, max })
        }
        let data_word = u16::try_from(code).map_err(|_| Error::InvalidCode { code, max })?;
        log::debug!("set_channel(cs={}, {}, {})", self.chip_select, channel, code);
        self.write(spi, mcp48::command_byte(mcp48::CMD_WRITE, addr), data_word)
    }

    pub fn set_references<S: SpiIo + ?Sized>(&self, spi: &mut S, sources: &[ReferenceSource])
            -> Result<()> {
        let sources: &[ReferenceSource; 4] = sources.try_into().map_err(|_| {
            Error::InvalidArgument(format!(
                "expected 4 reference selections, {} given", sources.len()))
        })?;
        log::debug!("set_references(cs={}, {:?})", self.chip_select, sources);
        self.write(spi, mcp48::command_byte(mcp48::CMD_WRITE, mcp48::ADDR_VREF),
            ReferenceSource::pack_mcp48fxbx4(sources))
    }

    pub fn set_all_references<S: SpiIo + ?Sized>(&self, spi: &mut S, source: ReferenceSource)
            -> Result<()> {
        self.set_references(spi, &[source; 4])
    }

    pub fn get_channel<S: SpiIo + ?Sized>(&self, _spi: &mut S, _channel: usize) -> Result<u32> {
        Err(Error::Unimplemented("reading back a DAC channel"))
    }

    pub fn get_references<S: SpiIo + ?Sized>(&self, _spi: &mut S)
            -> Result<[ReferenceSource; 4]> {
        Err(Error::Unimplemented("reading back DAC references"))
    }

    pub fn set_power_down<S: SpiIo + ?Sized>(&self, _spi: &mut S) -> Result<()> {
        Err(Error::Unimplemented("DAC power-down control"))
    }

    fn channel_addr(&self, channel: usize) -> Result<u8> {
        let count = self.capability.channel_count();
        match mcp48::ADDR_CHANNEL.get(channel) {
            Some(&addr) if channel < count => Ok(addr),
            _ => Err(Error::InvalidChannel { channel, count }),
        }
    }

    fn write<S: SpiIo + ?Sized>(&self, spi: &mut S, command_byte: u8, data_word: u16)
            -> Result<()> {
        let reply = spi.transfer_24(self.chip_select, SpiTransaction::new(command_byte, data_word))?;
        self.check(reply)
    }

    fn check(&self, reply: SpiReply) -> Result<()> {
        match self.validation {
            Validation::Unchecked => Ok(()),
            Validation::Validated if reply.is_success() => Ok(()),
            Validation::Validated => Err(Error::Transport { reply: reply.bytes() }),
        }
    }
}
