use std::net::IpAddr;
use std::time::Duration;

use clap::{Args, Subcommand, ValueEnum};
use segwire_frame::{HomingMode, JogUnit, OperatingMode, SegmentId};
use segwire_link::LinkConfig;

use crate::exit::{CliError, CliResult, USAGE};
use crate::output::OutputFormat;

pub mod decode;
pub mod listen;
pub mod mock_board;
pub mod send;
pub mod version;

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Encode a command and send it to a board.
    Send(SendArgs),
    /// Connect to a board and print feedback frames.
    Listen(ListenArgs),
    /// Decode a single hex-encoded frame.
    Decode(DecodeArgs),
    /// Run a simulated board that streams feedback and applies commands.
    MockBoard(MockBoardArgs),
    /// Show version information.
    Version(VersionArgs),
}

pub fn run(command: Command, format: OutputFormat) -> CliResult<i32> {
    match command {
        Command::Send(args) => send::run(args, format),
        Command::Listen(args) => listen::run(args, format),
        Command::Decode(args) => decode::run(args, format),
        Command::MockBoard(args) => mock_board::run(args, format),
        Command::Version(args) => version::run(args),
    }
}

/// Port selection shared by every networked command.
#[derive(Args, Debug, Clone)]
pub struct PortArgs {
    /// TCP port for commands and feedback.
    #[arg(long, env = "SEGWIRE_STREAM_PORT", default_value_t = segwire_transport::DEFAULT_STREAM_PORT)]
    pub stream_port: u16,
    /// UDP port for emergency stops.
    #[arg(long, env = "SEGWIRE_DATAGRAM_PORT", default_value_t = segwire_transport::DEFAULT_DATAGRAM_PORT)]
    pub datagram_port: u16,
}

impl PortArgs {
    pub fn link_config(&self) -> LinkConfig {
        LinkConfig::default().with_ports(self.stream_port, self.datagram_port)
    }
}

#[derive(Args, Debug)]
pub struct SendArgs {
    /// Board IP address.
    pub board: IpAddr,
    /// Target segment id, or `broadcast`.
    #[arg(long, short = 's', default_value = "0", value_parser = parse_segment)]
    pub segment: SegmentId,
    /// Print the encoded frame instead of sending it.
    #[arg(long)]
    pub dry_run: bool,
    /// Send over UDP (emergency stop only).
    #[arg(long)]
    pub datagram: bool,
    /// Connection timeout (e.g. 5s, 500ms).
    #[arg(long, default_value = "5s")]
    pub timeout: String,
    #[command(flatten)]
    pub ports: PortArgs,
    #[command(subcommand)]
    pub action: SendAction,
}

#[derive(Subcommand, Debug)]
pub enum SendAction {
    /// EMERGENCY_STOP.
    Estop {
        /// Stop reason code.
        #[arg(long, default_value_t = 1)]
        reason: u8,
    },
    /// SET_MODE.
    Mode {
        #[arg(value_enum)]
        mode: ModeArg,
    },
    /// START_HOMING.
    Home {
        #[arg(long, value_enum, default_value = "full")]
        mode: HomingArg,
    },
    /// JOG_MOTOR.
    Jog {
        /// Motor 1, 2 or 3.
        motor: u8,
        /// Signed distance.
        #[arg(allow_negative_numbers = true)]
        value: f32,
        #[arg(long, value_enum, default_value = "mm")]
        unit: UnitArg,
        /// Speed, 0-100 %.
        #[arg(long, default_value_t = 50)]
        speed: u8,
    },
    /// SET_ZERO_OFFSET.
    Zero,
    /// TRAJECTORY with eight coefficients per motor.
    Trajectory {
        #[arg(long, default_value_t = 0)]
        id: u32,
        /// Board time in ms at which the trajectory starts.
        #[arg(long, default_value_t = 0)]
        start: u32,
        #[arg(long)]
        duration_ms: u16,
        /// Comma-separated a0..a7 for motor 1.
        #[arg(long, value_delimiter = ',', allow_negative_numbers = true, required = true)]
        motor1: Vec<f32>,
        #[arg(long, value_delimiter = ',', allow_negative_numbers = true, required = true)]
        motor2: Vec<f32>,
        #[arg(long, value_delimiter = ',', allow_negative_numbers = true, required = true)]
        motor3: Vec<f32>,
    },
}

#[derive(Copy, Clone, Debug, ValueEnum)]
pub enum ModeArg {
    Idle,
    Homing,
    Operation,
}

impl From<ModeArg> for OperatingMode {
    fn from(mode: ModeArg) -> Self {
        match mode {
            ModeArg::Idle => OperatingMode::Idle,
            ModeArg::Homing => OperatingMode::Homing,
            ModeArg::Operation => OperatingMode::Operation,
        }
    }
}

#[derive(Copy, Clone, Debug, ValueEnum)]
pub enum HomingArg {
    Full,
    Quick,
}

impl From<HomingArg> for HomingMode {
    fn from(mode: HomingArg) -> Self {
        match mode {
            HomingArg::Full => HomingMode::Full,
            HomingArg::Quick => HomingMode::QuickVerify,
        }
    }
}

#[derive(Copy, Clone, Debug, ValueEnum)]
pub enum UnitArg {
    Mm,
    Ticks,
}

impl From<UnitArg> for JogUnit {
    fn from(unit: UnitArg) -> Self {
        match unit {
            UnitArg::Mm => JogUnit::Millimeters,
            UnitArg::Ticks => JogUnit::EncoderTicks,
        }
    }
}

#[derive(Args, Debug)]
pub struct ListenArgs {
    /// Board IP address.
    pub board: IpAddr,
    /// Exit after receiving N frames.
    #[arg(long)]
    pub count: Option<usize>,
    /// Connection timeout (e.g. 5s, 500ms).
    #[arg(long, default_value = "5s")]
    pub timeout: String,
    #[command(flatten)]
    pub ports: PortArgs,
}

#[derive(Copy, Clone, Debug, ValueEnum)]
pub enum DirectionArg {
    /// Master to board.
    Command,
    /// Board to master.
    Feedback,
}

#[derive(Args, Debug)]
pub struct DecodeArgs {
    /// Frame bytes as hex; spaces and `0x` prefixes are ignored.
    pub hex: String,
    #[arg(long, value_enum, default_value = "command")]
    pub direction: DirectionArg,
}

#[derive(Copy, Clone, Debug, ValueEnum)]
pub enum Animation {
    /// Slow rotation around all axes.
    Rotate,
    /// Pitch back and forth.
    Tilt,
    /// Irregular motion on all axes.
    Wobble,
    /// Fixed, slightly tilted pose.
    Still,
}

#[derive(Args, Debug)]
pub struct MockBoardArgs {
    /// Address to bind the stream and datagram ports on.
    pub bind: IpAddr,
    /// Segment id this board answers to.
    #[arg(long, short = 's', default_value_t = 0)]
    pub segment: u8,
    #[arg(long, value_enum, default_value = "rotate")]
    pub animation: Animation,
    /// MOTOR_STATE frames per second.
    #[arg(long, default_value_t = 100)]
    pub rate_hz: u32,
    /// Send DIAGNOSTICS after every N MOTOR_STATE frames.
    #[arg(long, default_value_t = 100)]
    pub diagnostics_every: u32,
    /// Exit after sending N MOTOR_STATE frames.
    #[arg(long)]
    pub count: Option<u64>,
    #[command(flatten)]
    pub ports: PortArgs,
}

#[derive(Args, Debug)]
pub struct VersionArgs {
    /// Show extended build provenance.
    #[arg(long)]
    pub extended: bool,
}

pub fn parse_segment(input: &str) -> Result<SegmentId, String> {
    let input = input.trim();
    if input.eq_ignore_ascii_case("broadcast") {
        return Ok(SegmentId::BROADCAST);
    }
    let id = match input.strip_prefix("0x").or_else(|| input.strip_prefix("0X")) {
        Some(hex) => u8::from_str_radix(hex, 16),
        None => input.parse::<u8>(),
    };
    id.map(SegmentId::new)
        .map_err(|_| format!("expected 0-255, 0x00-0xFF or `broadcast`, got `{input}`"))
}

pub fn parse_duration(input: &str) -> CliResult<Duration> {
    let input = input.trim();
    if input.is_empty() {
        return Err(CliError::new(USAGE, "duration must not be empty"));
    }

    let (number, unit) = if let Some(num) = input.strip_suffix("ms") {
        (num, "ms")
    } else if let Some(num) = input.strip_suffix('s') {
        (num, "s")
    } else {
        (input, "s")
    };

    let value: u64 = number
        .parse()
        .map_err(|_| CliError::new(USAGE, format!("invalid duration value: {input}")))?;

    if value == 0 {
        return Err(CliError::new(USAGE, "duration must be greater than zero"));
    }

    match unit {
        "ms" => Ok(Duration::from_millis(value)),
        _ => Ok(Duration::from_secs(value)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn segment_parsing() {
        assert_eq!(parse_segment("7").unwrap(), SegmentId::new(7));
        assert_eq!(parse_segment("0x1f").unwrap(), SegmentId::new(0x1F));
        assert!(parse_segment("BROADCAST").unwrap().is_broadcast());
        assert!(parse_segment("256").is_err());
    }

    #[test]
    fn parse_duration_seconds_and_millis() {
        assert_eq!(parse_duration("2s").unwrap(), Duration::from_secs(2));
        assert_eq!(parse_duration("150ms").unwrap(), Duration::from_millis(150));
        assert_eq!(parse_duration("3").unwrap(), Duration::from_secs(3));
    }

    #[test]
    fn parse_duration_rejects_invalid_values() {
        assert!(parse_duration("0s").is_err());
        assert!(parse_duration("bad").is_err());
    }
}
