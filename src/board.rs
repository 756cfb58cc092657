//! The ELB ARDU DISC4 four channel discriminator.
//!
//! Thresholds, hysteresis, output delays and pulse widths of the discriminator are all set by
//! MCP48FxBx4 DACs hanging off the firmware's SPI bus.

use serialport::SerialPort;

use crate::{Dac, DeviceSession, Error, Port, ReferenceSource, Result, SessionConfig};
use crate::{ThresholdScale, Validation};

/// Chip select index of each DAC, in the order the firmware maps them to pins.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DacSelect {
    LogicTimingCurrent   = 0,
    PulseWidthCurrent    = 1,
    DelayCurrent         = 2,
    ChannelHysteresis    = 3,
    ChannelThreshold     = 4,
    LogicTimingThreshold = 5,
    PulseWidthThreshold  = 6,
    DelayThreshold       = 7,
}

impl DacSelect {
    /// Order in which references are initialized on connect.
    pub const ALL: [DacSelect; 8] = [
        Self::ChannelThreshold,
        Self::ChannelHysteresis,
        Self::DelayCurrent,
        Self::DelayThreshold,
        Self::PulseWidthCurrent,
        Self::PulseWidthThreshold,
        Self::LogicTimingCurrent,
        Self::LogicTimingThreshold,
    ];

    const BY_CHIP_SELECT: [DacSelect; 8] = [
        Self::LogicTimingCurrent,
        Self::PulseWidthCurrent,
        Self::DelayCurrent,
        Self::ChannelHysteresis,
        Self::ChannelThreshold,
        Self::LogicTimingThreshold,
        Self::PulseWidthThreshold,
        Self::DelayThreshold,
    ];

    pub fn chip_select(self) -> u8 {
        self as u8
    }

    fn dac(self, validation: Validation) -> Dac {
        match self {
            // the threshold is the only setting that needs the finer 12 bit steps
            Self::ChannelThreshold => Dac::mcp48fvb24(self.chip_select(), validation),
            _ => Dac::mcp48fvb14(self.chip_select(), validation),
        }
    }
}

/// Number of discriminator input channels.
pub const INPUT_CHANNELS: usize = 4;

/// Number of logic (coincidence) outputs with their own delay and pulse width.
pub const LOGIC_CHANNELS: usize = 2;

#[derive(Debug)]
pub struct Board<P: Port> {
    session: DeviceSession<P>,
    dacs: [Dac; 8],
    threshold_scale: ThresholdScale,
}

impl Board<Box<dyn SerialPort>> {
    pub fn connect(config: &SessionConfig, validation: Validation)
            -> Result<Board<Box<dyn SerialPort>>> {
        Board::new(DeviceSession::open(config)?, validation)
    }
}

impl<P: Port> Board<P> {
    /// Take over a session and switch every DAC to its buffered external reference.
    pub fn new(session: DeviceSession<P>, validation: Validation) -> Result<Board<P>> {
        let mut board = Board {
            session,
            dacs: DacSelect::BY_CHIP_SELECT.map(|select| select.dac(validation)),
            threshold_scale: ThresholdScale::default(),
        };
        for select in DacSelect::ALL {
            let dac = board.dac(select);
            dac.set_all_references(&mut board.session.spi(), ReferenceSource::ExternalBuffered)?;
        }
        Ok(board)
    }

    pub fn with_threshold_scale(self, threshold_scale: ThresholdScale) -> Board<P> {
        Board { threshold_scale, ..self }
    }

    pub fn threshold_scale(&self) -> ThresholdScale {
        self.threshold_scale
    }

    pub fn session(&mut self) -> &mut DeviceSession<P> {
        &mut self.session
    }

    pub fn into_session(self) -> DeviceSession<P> {
        self.session
    }

    pub fn dac(&self, select: DacSelect) -> Dac {
        self.dacs[select.chip_select() as usize]
    }

    fn set(&mut self, select: DacSelect, channel: usize, code: u32) -> Result<()> {
        let dac = self.dac(select);
        dac.set_channel(&mut self.session.spi(), channel, code)
    }

    pub fn set_pulser(&mut self, on: bool) -> Result<bool> {
        self.session.test_pulser().set(on)
    }

    pub fn set_threshold(&mut self, channel: usize, code: u32) -> Result<()> {
        self.set(DacSelect::ChannelThreshold, channel, code)
    }

    /// Set the threshold of `channel` to `volts` at the input.
    pub fn set_threshold_volts(&mut self, channel: usize, volts: f64) -> Result<()> {
        let resolution_bits = self.dac(DacSelect::ChannelThreshold).capability().resolution_bits();
        let code = self.threshold_scale.to_code(volts, resolution_bits)?;
        log::debug!("set_threshold_volts({}, {}) -> code {}", channel, volts, code);
        self.set_threshold(channel, code)
    }

    pub fn set_hysteresis(&mut self, channel: usize, code: u32) -> Result<()> {
        self.set(DacSelect::ChannelHysteresis, channel, code)
    }

    pub fn set_hysteresis_volts(&mut self, _channel: usize, _volts: f64) -> Result<()> {
        Err(Error::Unimplemented("setting hysteresis in volts"))
    }

    pub fn set_channel_delay_current(&mut self, channel: usize, code: u32) -> Result<()> {
        self.set(DacSelect::DelayCurrent, channel, code)
    }

    pub fn set_channel_delay_threshold(&mut self, channel: usize, code: u32) -> Result<()> {
        self.set(DacSelect::DelayThreshold, channel, code)
    }

    pub fn set_channel_pulse_width_current(&mut self, channel: usize, code: u32) -> Result<()> {
        self.set(DacSelect::PulseWidthCurrent, channel, code)
    }

    pub fn set_channel_pulse_width_threshold(&mut self, channel: usize, code: u32) -> Result<()> {
        self.set(DacSelect::PulseWidthThreshold, channel, code)
    }

    // Logic timing DACs: channel 0 is the delay of logic output 0, channel 1 its pulse width,
    // channels 2 and 3 the same for logic output 1.

    pub fn set_logic_delay_current(&mut self, channel: usize, code: u32) -> Result<()> {
        self.set(DacSelect::LogicTimingCurrent, logic_dac_channel(channel)?, code)
    }

    pub fn set_logic_delay_threshold(&mut self, channel: usize, code: u32) -> Result<()> {
        self.set(DacSelect::LogicTimingThreshold, logic_dac_channel(channel)?, code)
    }

    pub fn set_logic_pulse_width_current(&mut self, channel: usize, code: u32) -> Result<()> {
        self.set(DacSelect::LogicTimingCurrent, logic_dac_channel(channel)? + 1, code)
    }

    pub fn set_logic_pulse_width_threshold(&mut self, channel: usize, code: u32) -> Result<()> {
        self.set(DacSelect::LogicTimingThreshold, logic_dac_channel(channel)? + 1, code)
    }
}

fn logic_dac_channel(channel: usize) -> Result<usize> {
    if channel >= LOGIC_CHANNELS {
        return Err(Error::InvalidChannel { channel, count: LOGIC_CHANNELS })
    }
    Ok(channel * 2)
}

#[cfg(test)]
mod test {
    use std::sync::{Arc, Mutex};

    use super::*;
    use crate::session::test::{config, BANNER};
    use crate::PRODUCT;
    use crate::sys::mock::MockPort;

    const SUCCESS: &str = "SPIRESP,0,0,0,131071\r\n";

    fn board() -> (Board<MockPort>, MockPort) {
        let _ = env_logger::builder().is_test(true).try_init();
        let port = MockPort::new();
        port.push_chunk(BANNER.as_bytes());
        port.respond_with(|command| {
            if command.starts_with("SYST:SPI:SEN") {
                vec![SUCCESS.to_owned()]
            } else if command == "SYST:PUL:ENA" {
                vec!["Pulser,1\n".to_owned()]
            } else {
                vec![]
            }
        });
        let session = DeviceSession::from_port(port.clone(), &config()).unwrap();
        (Board::new(session, Validation::Validated).unwrap(), port)
    }

    fn last_command(port: &MockPort) -> String {
        port.commands().last().cloned().unwrap_or_default()
    }

    #[test]
    fn test_dac_variants() {
        let (board, _) = board();
        for select in DacSelect::ALL {
            let dac = board.dac(select);
            assert_eq!(dac.chip_select(), select as u8);
            let expected_bits = if select == DacSelect::ChannelThreshold { 12 } else { 10 };
            assert_eq!(dac.capability().resolution_bits(), expected_bits);
        }
    }

    #[test]
    fn test_references_initialized() {
        let (_, port) = board();
        assert_eq!(port.commands(), [
            "SYST:SPI:SEN 4, 64, 255",
            "SYST:SPI:SEN 3, 64, 255",
            "SYST:SPI:SEN 2, 64, 255",
            "SYST:SPI:SEN 7, 64, 255",
            "SYST:SPI:SEN 1, 64, 255",
            "SYST:SPI:SEN 6, 64, 255",
            "SYST:SPI:SEN 0, 64, 255",
            "SYST:SPI:SEN 5, 64, 255",
        ]);
    }

    #[test]
    fn test_initialization_failure() {
        let port = MockPort::new();
        port.push_chunk(BANNER.as_bytes());
        port.respond_with(|_| vec!["SPIRESP,4,64,255,0\r\n".to_owned()]);
        let session = DeviceSession::from_port(port.clone(), &config()).unwrap();
        assert!(matches!(Board::new(session, Validation::Validated),
            Err(Error::Transport { reply: [0, 0, 0] })));
        assert_eq!(port.commands().len(), 1);

        let port = MockPort::new();
        port.push_chunk(BANNER.as_bytes());
        port.respond_with(|_| vec!["SPIRESP,4,64,255,0\r\n".to_owned()]);
        let session = DeviceSession::from_port(port.clone(), &config()).unwrap();
        assert!(Board::new(session, Validation::Unchecked).is_ok());
        assert_eq!(port.commands().len(), 8);
    }

    #[test]
    fn test_threshold_volts() {
        let (mut board, port) = board();
        board.set_threshold_volts(2, 0.0).unwrap();
        assert_eq!(last_command(&port), "SYST:SPI:SEN 4, 16, 2047");
        let half = board.threshold_scale().range() / 2.0;
        board.set_threshold_volts(3, half).unwrap();
        assert_eq!(last_command(&port), "SYST:SPI:SEN 4, 24, 4095");
        let sent = port.commands().len();
        assert!(matches!(board.set_threshold_volts(0, half * 1.01), Err(Error::OutOfRange { .. })));
        assert!(matches!(board.set_hysteresis_volts(0, 0.1), Err(Error::Unimplemented(_))));
        assert_eq!(port.commands().len(), sent);
    }

    #[test]
    fn test_threshold_volts_degenerate_scale() {
        let (board, port) = board();
        let scale = ThresholdScale { attenuation: 0.0, ..ThresholdScale::default() };
        let mut board = board.with_threshold_scale(scale);
        let sent = port.commands().len();
        for volts in [0.0, 1.0, -1e9] {
            assert!(matches!(board.set_threshold_volts(0, volts), Err(Error::InvalidArgument(_))));
        }
        assert_eq!(port.commands().len(), sent);
    }

    #[test]
    fn test_into_session() {
        let (mut board, port) = board();
        board.set_threshold(0, 1).unwrap();
        let mut session = board.into_session();
        assert_eq!(session.identity().product, PRODUCT);
        assert_eq!(session.test_pulser().set(true).unwrap(), true);
        assert_eq!(port.commands().len(), 10);
    }

    #[test]
    fn test_channel_timing() {
        let (mut board, port) = board();
        board.set_hysteresis(0, 500).unwrap();
        assert_eq!(last_command(&port), "SYST:SPI:SEN 3, 0, 500");
        board.set_channel_delay_current(1, 512).unwrap();
        assert_eq!(last_command(&port), "SYST:SPI:SEN 2, 8, 512");
        board.set_channel_delay_threshold(2, 350).unwrap();
        assert_eq!(last_command(&port), "SYST:SPI:SEN 7, 16, 350");
        board.set_channel_pulse_width_current(3, 1).unwrap();
        assert_eq!(last_command(&port), "SYST:SPI:SEN 1, 24, 1");
        board.set_channel_pulse_width_threshold(0, 1023).unwrap();
        assert_eq!(last_command(&port), "SYST:SPI:SEN 6, 0, 1023");
        assert!(matches!(board.set_channel_pulse_width_threshold(0, 1024),
            Err(Error::InvalidCode { max: 1023, .. })));
    }

    #[test]
    fn test_logic_timing() {
        let (mut board, port) = board();
        board.set_logic_delay_current(0, 10).unwrap();
        assert_eq!(last_command(&port), "SYST:SPI:SEN 0, 0, 10");
        board.set_logic_pulse_width_current(0, 11).unwrap();
        assert_eq!(last_command(&port), "SYST:SPI:SEN 0, 8, 11");
        board.set_logic_delay_threshold(1, 12).unwrap();
        assert_eq!(last_command(&port), "SYST:SPI:SEN 5, 16, 12");
        board.set_logic_pulse_width_threshold(1, 13).unwrap();
        assert_eq!(last_command(&port), "SYST:SPI:SEN 5, 24, 13");
        let sent = port.commands().len();
        assert!(matches!(board.set_logic_delay_current(2, 0),
            Err(Error::InvalidChannel { channel: 2, count: 2 })));
        assert_eq!(port.commands().len(), sent);
    }

    #[test]
    fn test_pulser() {
        let (mut board, port) = board();
        assert!(board.set_pulser(true).unwrap());
        assert_eq!(last_command(&port), "SYST:PUL:ENA");
    }

    #[test]
    fn test_board_behind_lock() {
        let (board, port) = board();
        let board = Arc::new(Mutex::new(board));
        let threads: Vec<_> = (0..INPUT_CHANNELS).map(|channel| {
            let board = board.clone();
            std::thread::spawn(move || {
                board.lock().unwrap().set_hysteresis(channel, 100 + channel as u32).unwrap();
            })
        }).collect();
        for thread in threads {
            thread.join().unwrap();
        }
        let mut sent: Vec<String> = port.commands().into_iter().skip(8).collect();
        sent.sort();
        assert_eq!(sent, [
            "SYST:SPI:SEN 3, 0, 100",
            "SYST:SPI:SEN 3, 16, 102",
            "SYST:SPI:SEN 3, 24, 103",
            "SYST:SPI:SEN 3, 8, 101",
        ]);
    }
}
