//! Command-line control of the ELB ARDU DISC4 discriminator.
//!
//! ```bash
//! ardudisc --port /dev/ttyACM0 identify
//! ardudisc --port /dev/ttyACM0 threshold 0 0.05
//! RUST_LOG=debug ardudisc --port /dev/ttyACM0 spi 4 0x40 0xff
//! ```

use clap::{Parser, Subcommand, ValueEnum};

use ardudisc::{ArduDisc, Session, SessionConfig, Validation};

#[derive(Parser, Debug)]
#[command(name = "ardudisc")]
#[command(about = "Control the ELB ARDU DISC4 discriminator over its serial port")]
struct Args {
    /// Serial port the instrument is connected to
    #[arg(long, short)]
    port: String,

    #[arg(long, default_value_t = 115_200)]
    baud: u32,

    /// Keep DTR/RTS deasserted so that connecting does not reset the instrument
    #[arg(long)]
    no_reset: bool,

    /// Do not check SPI replies (bench testing without a compatible DAC attached)
    #[arg(long)]
    unchecked: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Print the identification of the instrument
    Identify,
    /// Switch the test pulser
    Pulser {
        #[arg(value_enum)]
        state: PulserState,
    },
    /// Run one raw 24-bit SPI transaction
    Spi {
        #[arg(value_parser = parse_u8)]
        chip_select: u8,
        #[arg(value_parser = parse_u8)]
        command: u8,
        #[arg(value_parser = parse_u16)]
        data: u16,
    },
    /// Set the threshold of an input channel, in volts
    Threshold {
        channel: usize,
        #[arg(allow_negative_numbers = true)]
        volts: f64,
    },
    /// Set the hysteresis DAC code of an input channel
    Hysteresis {
        channel: usize,
        code: u32,
    },
    /// Enable the test pulser and sweep delay and pulse width thresholds of all channels
    Sweep {
        #[arg(long, default_value_t = 350)]
        from: u32,
        #[arg(long, default_value_t = 900)]
        to: u32,
        /// Threshold of all channels during the sweep, in volts
        #[arg(long, default_value_t = 0.05, allow_negative_numbers = true)]
        threshold: f64,
    },
}

#[derive(ValueEnum, Clone, Copy, Debug)]
enum PulserState {
    On,
    Off,
}

fn parse_int(text: &str) -> Result<u32, String> {
    let result = match text.strip_prefix("0x").or_else(|| text.strip_prefix("0X")) {
        Some(hex) => u32::from_str_radix(hex, 16),
        None => text.parse::<u32>(),
    };
    result.map_err(|error| format!("{}: {}", text, error))
}

fn parse_u8(text: &str) -> Result<u8, String> {
    u8::try_from(parse_int(text)?).map_err(|_| format!("{} does not fit in 8 bits", text))
}

fn parse_u16(text: &str) -> Result<u16, String> {
    u16::try_from(parse_int(text)?).map_err(|_| format!("{} does not fit in 16 bits", text))
}

fn sweep(device: &mut ArduDisc, from: u32, to: u32, threshold: f64) -> ardudisc::Result<()> {
    device.set_pulser(true)?;
    for channel in 0..ardudisc::INPUT_CHANNELS {
        device.set_threshold_volts(channel, threshold)?;
        device.set_hysteresis(channel, 500)?;
        device.set_channel_delay_current(channel, 512)?;
        device.set_channel_delay_threshold(channel, 512)?;
        device.set_channel_pulse_width_current(channel, 512)?;
        device.set_channel_pulse_width_threshold(channel, 512)?;
    }
    for channel in 0..ardudisc::LOGIC_CHANNELS {
        device.set_logic_delay_current(channel, 512)?;
        device.set_logic_delay_threshold(channel, 512)?;
        device.set_logic_pulse_width_current(channel, 512)?;
        device.set_logic_pulse_width_threshold(channel, 512)?;
    }
    for code in from..to {
        for channel in 0..ardudisc::INPUT_CHANNELS {
            device.set_channel_delay_threshold(channel, code)?;
            device.set_channel_pulse_width_threshold(channel, code)?;
        }
    }
    println!("swept delay and pulse width thresholds from {} to {}", from, to);
    Ok(())
}

fn main() -> ardudisc::Result<()> {
    env_logger::init();
    let args = Args::parse();

    let config = SessionConfig::new(args.port)
        .with_baud_rate(args.baud)
        .with_reset(!args.no_reset);
    let validation = if args.unchecked { Validation::Unchecked } else { Validation::Validated };

    match args.command {
        Command::Identify => {
            let mut session = Session::open(&config)?;
            let identity = session.identify()?;
            println!("{} {} serial {} firmware {}",
                identity.vendor, identity.product, identity.serial, identity.firmware);
        }
        Command::Pulser { state } => {
            let mut session = Session::open(&config)?;
            let on = session.test_pulser().set(matches!(state, PulserState::On))?;
            println!("pulser {}", if on { "on" } else { "off" });
        }
        Command::Spi { chip_select, command, data } => {
            let mut session = Session::open(&config)?;
            let reply = session.spi().execute(chip_select, command, data)?;
            println!("{:02x?}", reply);
        }
        Command::Threshold { channel, volts } => {
            let mut device = ArduDisc::connect(&config, validation)?;
            device.set_threshold_volts(channel, volts)?;
        }
        Command::Hysteresis { channel, code } => {
            let mut device = ArduDisc::connect(&config, validation)?;
            device.set_hysteresis(channel, code)?;
        }
        Command::Sweep { from, to, threshold } => {
            let mut device = ArduDisc::connect(&config, validation)?;
            sweep(&mut device, from, to, threshold)?;
        }
    }
    Ok(())
}
