use std::time::Duration;

use serialport::{DataBits, FlowControl, Parity, SerialPort, StopBits};

use crate::{Result, SessionConfig};

impl super::Port for dyn SerialPort {
    fn set_timeout(&mut self, timeout: Duration) -> Result<()> {
        Ok(SerialPort::set_timeout(self, timeout)?)
    }
}

pub fn open(config: &SessionConfig) -> Result<Box<dyn SerialPort>> {
    log::debug!("open({:?}, {} baud, reset={})", config.port, config.baud_rate, config.reset);
    let mut port = serialport::new(config.port.as_str(), config.baud_rate)
        .data_bits(DataBits::Eight)
        .parity(Parity::None)
        .stop_bits(StopBits::One)
        .flow_control(FlowControl::None)
        .timeout(config.open_timeout)
        .open()?;
    if !config.reset {
        // an edge on DTR or RTS reboots the microcontroller
        port.write_data_terminal_ready(false)?;
        port.write_request_to_send(false)?;
    }
    Ok(port)
}
