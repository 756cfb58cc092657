//! MCP48FxBx4 (MCP48FVB14, MCP48FVB24) SPI register map.
//!
//! A command byte is `AD4..AD0 C1 C0 x`: the register address occupies bits 7..3 and the command
//! selector bits 2..1, so `CMD_* | ADDR_*` never mixes the two fields.

#![allow(dead_code)]

/// Volatile DAC output registers, one per channel.
pub const ADDR_CHANNEL: [u8; 4] = [0x00, 0x08, 0x10, 0x18];

/// Voltage reference (VREF) control register.
pub const ADDR_VREF: u8 = 0x40;

/// Power-down control register.
pub const ADDR_POWER_DOWN: u8 = 0x48;

/// Gain control and system status register.
pub const ADDR_GAIN_STATUS: u8 = 0x50;

pub const CMD_WRITE: u8 = 0x00;
pub const CMD_READ: u8 = 0x06;

const ADDR_MASK: u8 = 0b1111_1000;
const CMD_MASK: u8 = 0b0000_0110;

pub fn command_byte(command: u8, addr: u8) -> u8 {
    debug_assert_eq!(command & !CMD_MASK, 0);
    debug_assert_eq!(addr & !ADDR_MASK, 0);
    command | addr
}
