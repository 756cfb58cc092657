//! Connection settings and the physical-unit scale of the threshold DAC.

use std::time::Duration;

use crate::{DeviceCapability, Error, Result};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionConfig {
    pub port: String,
    pub baud_rate: u32,
    /// Serial read timeout; also bounds the wait for the banner.
    pub open_timeout: Duration,
    /// How long to wait for the reply to a command.
    pub reply_timeout: Duration,
    /// Pause between reads when the port has nothing to offer.
    pub poll_interval: Duration,
    /// Allow the microcontroller to reset when the port opens. When `false`, DTR and RTS are
    /// kept deasserted.
    pub reset: bool,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            port: String::new(),
            baud_rate: 115_200,
            open_timeout: Duration::from_secs(2),
            reply_timeout: Duration::from_secs(4),
            poll_interval: Duration::from_millis(1),
            reset: true,
        }
    }
}

impl SessionConfig {
    pub fn new(port: impl Into<String>) -> SessionConfig {
        SessionConfig { port: port.into(), ..Default::default() }
    }

    pub fn with_baud_rate(self, baud_rate: u32) -> SessionConfig {
        SessionConfig { baud_rate, ..self }
    }

    pub fn with_open_timeout(self, open_timeout: Duration) -> SessionConfig {
        SessionConfig { open_timeout, ..self }
    }

    pub fn with_reply_timeout(self, reply_timeout: Duration) -> SessionConfig {
        SessionConfig { reply_timeout, ..self }
    }

    pub fn with_poll_interval(self, poll_interval: Duration) -> SessionConfig {
        SessionConfig { poll_interval, ..self }
    }

    pub fn with_reset(self, reset: bool) -> SessionConfig {
        SessionConfig { reset, ..self }
    }
}

/// Maps a threshold voltage at the input to a DAC code.
///
/// The DAC spans `min_v..max_v`, and the input reaches the comparator through an attenuator, so
/// the usable input range is `(max_v - min_v) / attenuation`, centered on zero.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ThresholdScale {
    pub min_v: f64,
    pub max_v: f64,
    pub attenuation: f64,
}

impl Default for ThresholdScale {
    fn default() -> Self {
        Self {
            min_v: -2.5,
            max_v: 2.5,
            attenuation: 0.72,
        }
    }
}

impl ThresholdScale {
    pub fn range(&self) -> f64 {
        (self.max_v - self.min_v) / self.attenuation
    }

    pub fn to_code(&self, volts: f64, resolution_bits: u32) -> Result<u32> {
        let range = self.range();
        if !range.is_finite() || range <= 0.0 {
            return Err(Error::InvalidArgument(format!(
                "threshold scale {:?} has no usable range", self)))
        }
        if !(1..=DeviceCapability::MAX_RESOLUTION_BITS).contains(&resolution_bits) {
            return Err(Error::InvalidArgument(format!(
                "unsupported resolution of {} bits", resolution_bits)))
        }
        let (min, max) = (-range / 2.0, range / 2.0);
        if !(volts >= min && volts <= max) {
            return Err(Error::OutOfRange { value: volts, min, max })
        }
        let max_code = (1u32 << resolution_bits) - 1;
        let code = ((volts + range / 2.0) / range * max_code as f64).floor();
        // Saturate: rounding at either end of the range may land just outside the code range.
        Ok(code.clamp(0.0, max_code as f64) as u32)
    }
}
