//! Register-level parameters of the MCP48FxBx4 DACs.

use crate::{Error, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ReferenceSource {
    /// VDD used as reference.
    #[default]
    Supply,
    /// Internal band gap, 1.22 V.
    Internal1V22,
    ExternalUnbuffered,
    ExternalBuffered,
}

impl ReferenceSource {
    pub const ALL: [ReferenceSource; 4] = [
        Self::Supply,
        Self::Internal1V22,
        Self::ExternalUnbuffered,
        Self::ExternalBuffered,
    ];

    pub(crate) fn mcp48fxbx4_code(self) -> u16 {
        match self {
            Self::Supply             => 0b00,
            Self::Internal1V22       => 0b01,
            Self::ExternalUnbuffered => 0b10,
            Self::ExternalBuffered   => 0b11,
        }
    }

    /// Pack one reference selection per channel, channel 0 in the low bits.
    pub(crate) fn pack_mcp48fxbx4(sources: &[ReferenceSource; 4]) -> u16 {
        sources.iter()
            .enumerate()
            .map(|(channel, source)| source.mcp48fxbx4_code() << (2 * channel))
            .fold(0, |word, field| word | field)
    }
}

/// Channel count and resolution of one DAC part.
///
/// Fields are only reachable through the presets or `new`, which keeps every code that passes
/// `max_code` representable in the 16 bit data word.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DeviceCapability {
    channel_count: usize,
    resolution_bits: u32,
}

impl DeviceCapability {
    pub const MAX_CHANNELS: usize = 4;
    pub const MAX_RESOLUTION_BITS: u32 = 16;

    /// MCP48FVB14: 4 channels, 10 bits.
    pub const MCP48FVB14: DeviceCapability =
        DeviceCapability { channel_count: 4, resolution_bits: 10 };

    /// MCP48FVB24: 4 channels, 12 bits.
    pub const MCP48FVB24: DeviceCapability =
        DeviceCapability { channel_count: 4, resolution_bits: 12 };

    pub fn new(channel_count: usize, resolution_bits: u32) -> Result<DeviceCapability> {
        if !(1..=Self::MAX_CHANNELS).contains(&channel_count) {
            return Err(Error::InvalidArgument(format!(
                "channel count {} not in 1..={}", channel_count, Self::MAX_CHANNELS)))
        }
        if !(1..=Self::MAX_RESOLUTION_BITS).contains(&resolution_bits) {
            return Err(Error::InvalidArgument(format!(
                "resolution {} bits not in 1..={}", resolution_bits, Self::MAX_RESOLUTION_BITS)))
        }
        Ok(DeviceCapability { channel_count, resolution_bits })
    }

    pub fn channel_count(self) -> usize {
        self.channel_count
    }

    pub fn resolution_bits(self) -> u32 {
        self.resolution_bits
    }

    pub fn max_code(self) -> u32 {
        (1 << self.resolution_bits) - 1
    }
}

/// Whether the SPI echo of a write is checked.
///
/// `Unchecked` is meant for bench work without compatible firmware attached, for example when
/// watching the bus with a logic analyzer; replies are then accepted no matter what they contain.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Validation {
    #[default]
    Validated,
    Unchecked,
}
