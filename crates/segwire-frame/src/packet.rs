//! Typed command and feedback values.
//!
//! Every value is built fresh for one send or receive and never mutated
//! afterwards. Conversion to and from registry field values lives here;
//! byte handling lives in [`crate::codec`].

use std::fmt;

use crate::error::{FrameError, Result};
use crate::packet_type::{CommandType, Direction, FeedbackType, PacketKind, BROADCAST_SEGMENT};
use crate::schema::{FieldCursor, FieldValue, Schema, COEFFICIENT_COUNT};

/// Motors driven by one segment board.
pub const MOTOR_COUNT: usize = 3;

/// Address of a segment board, or the broadcast sentinel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SegmentId(u8);

impl SegmentId {
    /// Every connected board.
    pub const BROADCAST: SegmentId = SegmentId(BROADCAST_SEGMENT);

    pub const fn new(id: u8) -> Self {
        Self(id)
    }

    pub const fn get(self) -> u8 {
        self.0
    }

    pub const fn is_broadcast(self) -> bool {
        self.0 == BROADCAST_SEGMENT
    }

    /// Whether a frame addressed to `self` concerns the board `board`.
    pub const fn addresses(self, board: SegmentId) -> bool {
        self.is_broadcast() || self.0 == board.0
    }
}

impl From<u8> for SegmentId {
    fn from(id: u8) -> Self {
        Self(id)
    }
}

impl fmt::Display for SegmentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_broadcast() {
            f.write_str("broadcast")
        } else {
            write!(f, "{}", self.0)
        }
    }
}

macro_rules! wire_enum {
    (
        $(#[$meta:meta])*
        $name:ident, $field:literal {
            $($(#[$vmeta:meta])* $variant:ident = $value:literal => $label:literal),+ $(,)?
        }
    ) => {
        wire_enum! {
            $(#[$meta])*
            $name {
                $($(#[$vmeta])* $variant = $value => $label),+
            }
        }

        impl $name {
            fn decode(packet: PacketKind, value: u8) -> Result<Self> {
                Self::from_byte(value).ok_or(FrameError::MalformedPacket {
                    packet,
                    field: $field,
                    value,
                })
            }
        }
    };
    (
        $(#[$meta:meta])*
        $name:ident {
            $($(#[$vmeta:meta])* $variant:ident = $value:literal => $label:literal),+ $(,)?
        }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
        #[repr(u8)]
        pub enum $name {
            $($(#[$vmeta])* $variant = $value),+
        }

        impl $name {
            pub const fn to_byte(self) -> u8 {
                self as u8
            }

            pub fn from_byte(value: u8) -> Option<Self> {
                match value {
                    $($value => Some($name::$variant),)+
                    _ => None,
                }
            }

            pub fn name(self) -> &'static str {
                match self {
                    $($name::$variant => $label),+
                }
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.name())
            }
        }
    };
}

wire_enum! {
    /// Board operating mode carried by SET_MODE.
    OperatingMode, "mode" {
        Idle = 0x01 => "IDLE",
        Homing = 0x02 => "HOMING",
        Operation = 0x03 => "OPERATION",
    }
}

wire_enum! {
    /// Homing procedure requested by START_HOMING.
    HomingMode, "homing_mode" {
        /// Full homing sequence against the end stops.
        Full = 0x01 => "full",
        /// Quick verification of a previous homing.
        QuickVerify = 0x02 => "quick-verify",
    }
}

wire_enum! {
    /// Unit of a JOG_MOTOR distance.
    JogUnit, "mode" {
        Millimeters = 0x01 => "mm",
        EncoderTicks = 0x02 => "ticks",
    }
}

wire_enum! {
    /// Last-error codes reported in DIAGNOSTICS.
    ErrorCode {
        NoError = 0x00 => "NO_ERROR",
        EmergencyStopTriggered = 0x01 => "E_STOP_TRIGGERED",
        MotorOvercurrent = 0x02 => "MOTOR_OVERCURRENT",
        PositionLimit = 0x03 => "POSITION_LIMIT",
        CommunicationTimeout = 0x04 => "COMMUNICATION_TIMEOUT",
        CrcError = 0x05 => "CRC_ERROR",
        InvalidTrajectory = 0x06 => "INVALID_TRAJECTORY",
        EncoderFault = 0x07 => "ENCODER_FAULT",
        DriverFault = 0x08 => "DRIVER_FAULT",
        ImuFault = 0x09 => "IMU_FAULT",
        CapacitiveFault = 0x0A => "CAPACITIVE_FAULT",
        FlashError = 0x0B => "FLASH_ERROR",
        BufferOverrun = 0x0C => "BUFFER_OVERRUN",
        TemperatureHigh = 0x0D => "TEMPERATURE_HIGH",
    }
}

bitflags::bitflags! {
    /// Status bits reported in MOTOR_STATE.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct StatusFlags: u8 {
        const E_STOP_ACTIVE = 1 << 0;
        const HOMING_IN_PROGRESS = 1 << 1;
        const POSITION_LIMIT_HIT = 1 << 2;
        const FORCE_LIMIT_EXCEEDED = 1 << 3;
        const BUFFER_EMPTY = 1 << 4;
        const TRAJECTORY_EXECUTING = 1 << 5;
        const CALIBRATION_VALID = 1 << 6;
        const ERROR_PRESENT = 1 << 7;
    }
}

impl Default for StatusFlags {
    fn default() -> Self {
        Self::empty()
    }
}

/// Septic polynomial coefficients `a0..a7` for one motor.
///
/// Position is `a0 + a1·t + … + a7·t⁷` with `t` in seconds since the
/// trajectory start.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Coefficients(pub [f32; COEFFICIENT_COUNT]);

impl Coefficients {
    /// Build from a slice, which must hold exactly eight values.
    pub fn from_slice(values: &[f32]) -> Result<Self> {
        let coeffs: [f32; COEFFICIENT_COUNT] = values.try_into().map_err(|_| {
            FrameError::malformed_command(
                PacketKind::Command(CommandType::Trajectory),
                format!(
                    "expected {COEFFICIENT_COUNT} coefficients, got {}",
                    values.len()
                ),
            )
        })?;
        Ok(Self(coeffs))
    }

    /// A polynomial holding `position` for the whole window.
    pub fn constant(position: f32) -> Self {
        let mut coeffs = [0.0; COEFFICIENT_COUNT];
        coeffs[0] = position;
        Self(coeffs)
    }

    /// Evaluate the polynomial at `t` seconds (Horner's scheme).
    pub fn evaluate(&self, t: f32) -> f32 {
        self.0.iter().rev().fold(0.0, |acc, &a| acc * t + a)
    }

    pub fn is_finite(&self) -> bool {
        self.0.iter().all(|c| c.is_finite())
    }
}

/// TRAJECTORY payload: one polynomial per motor over a time window.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Trajectory {
    pub trajectory_id: u32,
    /// Board uptime in ms at which the window opens.
    pub start_timestamp: u32,
    pub duration_ms: u16,
    pub motors: [Coefficients; MOTOR_COUNT],
}

impl Trajectory {
    /// Build from coefficient slices, rejecting any set not of length eight.
    pub fn from_slices(
        trajectory_id: u32,
        start_timestamp: u32,
        duration_ms: u16,
        motor_1: &[f32],
        motor_2: &[f32],
        motor_3: &[f32],
    ) -> Result<Self> {
        Ok(Self {
            trajectory_id,
            start_timestamp,
            duration_ms,
            motors: [
                Coefficients::from_slice(motor_1)?,
                Coefficients::from_slice(motor_2)?,
                Coefficients::from_slice(motor_3)?,
            ],
        })
    }

    /// Whether `now_ms` falls inside the trajectory window.
    pub fn is_active(&self, now_ms: u32) -> bool {
        now_ms >= self.start_timestamp
            && now_ms - self.start_timestamp <= u32::from(self.duration_ms)
    }

    /// Commanded positions at board time `now_ms`, clamped to the window.
    pub fn positions_at(&self, now_ms: u32) -> [f32; MOTOR_COUNT] {
        let elapsed_ms = now_ms
            .saturating_sub(self.start_timestamp)
            .min(u32::from(self.duration_ms));
        let t = elapsed_ms as f32 / 1000.0;
        self.motors.map(|m| m.evaluate(t))
    }
}

/// JOG_MOTOR payload.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Jog {
    /// Motor 1, 2 or 3.
    pub motor_id: u8,
    pub unit: JogUnit,
    /// Signed distance in `unit`.
    pub value: f32,
    /// 0-100.
    pub speed_percent: u8,
}

/// Type-specific command payloads.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum CommandBody {
    Trajectory(Trajectory),
    EmergencyStop { reason: u8 },
    StartHoming(HomingMode),
    JogMotor(Jog),
    SetMode(OperatingMode),
    SetZeroOffset,
}

impl CommandBody {
    pub fn command_type(&self) -> CommandType {
        match self {
            CommandBody::Trajectory(_) => CommandType::Trajectory,
            CommandBody::EmergencyStop { .. } => CommandType::EmergencyStop,
            CommandBody::StartHoming(_) => CommandType::StartHoming,
            CommandBody::JogMotor(_) => CommandType::JogMotor,
            CommandBody::SetMode(_) => CommandType::SetMode,
            CommandBody::SetZeroOffset => CommandType::SetZeroOffset,
        }
    }

    pub(crate) fn to_fields(&self) -> Vec<FieldValue> {
        match self {
            CommandBody::Trajectory(t) => vec![
                FieldValue::U32(t.trajectory_id),
                FieldValue::U32(t.start_timestamp),
                FieldValue::U16(t.duration_ms),
                FieldValue::Coefficients(t.motors[0].0),
                FieldValue::Coefficients(t.motors[1].0),
                FieldValue::Coefficients(t.motors[2].0),
            ],
            CommandBody::EmergencyStop { reason } => vec![FieldValue::U8(*reason)],
            CommandBody::StartHoming(mode) => vec![FieldValue::U8(mode.to_byte())],
            CommandBody::JogMotor(jog) => vec![
                FieldValue::U8(jog.motor_id),
                FieldValue::U8(jog.unit.to_byte()),
                FieldValue::F32(jog.value),
                FieldValue::U8(jog.speed_percent),
            ],
            CommandBody::SetMode(mode) => vec![FieldValue::U8(mode.to_byte())],
            CommandBody::SetZeroOffset => Vec::new(),
        }
    }

    pub(crate) fn from_fields(schema: &'static Schema, values: &[FieldValue]) -> Result<Self> {
        let packet = schema.kind;
        let PacketKind::Command(ty) = packet else {
            return Err(FrameError::LayoutMismatch {
                packet,
                field: "<direction>",
            });
        };
        let mut fields = FieldCursor::new(schema, values);
        let body = match ty {
            CommandType::Trajectory => CommandBody::Trajectory(Trajectory {
                trajectory_id: fields.u32()?,
                start_timestamp: fields.u32()?,
                duration_ms: fields.u16()?,
                motors: [
                    Coefficients(fields.coefficients()?),
                    Coefficients(fields.coefficients()?),
                    Coefficients(fields.coefficients()?),
                ],
            }),
            CommandType::EmergencyStop => CommandBody::EmergencyStop {
                reason: fields.u8()?,
            },
            CommandType::StartHoming => {
                CommandBody::StartHoming(HomingMode::decode(packet, fields.u8()?)?)
            }
            CommandType::JogMotor => {
                let motor_id = fields.u8()?;
                if !(1..=MOTOR_COUNT as u8).contains(&motor_id) {
                    return Err(FrameError::MalformedPacket {
                        packet,
                        field: "motor_id",
                        value: motor_id,
                    });
                }
                let unit = JogUnit::decode(packet, fields.u8()?)?;
                let value = fields.f32()?;
                let speed_percent = fields.u8()?;
                if speed_percent > 100 {
                    return Err(FrameError::MalformedPacket {
                        packet,
                        field: "speed_percent",
                        value: speed_percent,
                    });
                }
                CommandBody::JogMotor(Jog {
                    motor_id,
                    unit,
                    value,
                    speed_percent,
                })
            }
            CommandType::SetMode => CommandBody::SetMode(OperatingMode::decode(packet, fields.u8()?)?),
            CommandType::SetZeroOffset => CommandBody::SetZeroOffset,
        };
        Ok(body)
    }
}

/// A command frame addressed to one board or broadcast.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Command {
    pub segment: SegmentId,
    pub body: CommandBody,
}

impl Command {
    pub fn new(segment: impl Into<SegmentId>, body: CommandBody) -> Self {
        Self {
            segment: segment.into(),
            body,
        }
    }

    pub fn emergency_stop(segment: impl Into<SegmentId>, reason: u8) -> Self {
        Self::new(segment, CommandBody::EmergencyStop { reason })
    }

    /// Stop every connected board.
    pub fn broadcast_stop(reason: u8) -> Self {
        Self::emergency_stop(SegmentId::BROADCAST, reason)
    }

    pub fn set_mode(segment: impl Into<SegmentId>, mode: OperatingMode) -> Self {
        Self::new(segment, CommandBody::SetMode(mode))
    }

    pub fn start_homing(segment: impl Into<SegmentId>, mode: HomingMode) -> Self {
        Self::new(segment, CommandBody::StartHoming(mode))
    }

    pub fn jog(segment: impl Into<SegmentId>, jog: Jog) -> Self {
        Self::new(segment, CommandBody::JogMotor(jog))
    }

    pub fn set_zero_offset(segment: impl Into<SegmentId>) -> Self {
        Self::new(segment, CommandBody::SetZeroOffset)
    }

    pub fn trajectory(segment: impl Into<SegmentId>, trajectory: Trajectory) -> Self {
        Self::new(segment, CommandBody::Trajectory(trajectory))
    }

    pub fn command_type(&self) -> CommandType {
        self.body.command_type()
    }

    pub fn kind(&self) -> PacketKind {
        PacketKind::Command(self.command_type())
    }

    /// Reject values the board cannot act on, before any byte is produced.
    pub fn validate(&self) -> Result<()> {
        let ty = self.command_type();
        let packet = self.kind();

        if self.segment.is_broadcast() && !ty.supports_broadcast() {
            return Err(FrameError::malformed_command(
                packet,
                "broadcast segment is not valid for this command",
            ));
        }

        match &self.body {
            CommandBody::Trajectory(t) => {
                if let Some(motor) = t.motors.iter().position(|m| !m.is_finite()) {
                    return Err(FrameError::malformed_command(
                        packet,
                        format!("motor {} has a non-finite coefficient", motor + 1),
                    ));
                }
            }
            CommandBody::JogMotor(jog) => {
                if !(1..=MOTOR_COUNT as u8).contains(&jog.motor_id) {
                    return Err(FrameError::malformed_command(
                        packet,
                        format!("motor id {} outside 1..={MOTOR_COUNT}", jog.motor_id),
                    ));
                }
                if jog.speed_percent > 100 {
                    return Err(FrameError::malformed_command(
                        packet,
                        format!("speed {}% exceeds 100%", jog.speed_percent),
                    ));
                }
                if !jog.value.is_finite() {
                    return Err(FrameError::malformed_command(
                        packet,
                        "jog distance is not finite",
                    ));
                }
            }
            CommandBody::EmergencyStop { .. }
            | CommandBody::StartHoming(_)
            | CommandBody::SetMode(_)
            | CommandBody::SetZeroOffset => {}
        }
        Ok(())
    }
}

/// Kinematic state of one motor.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct MotorSample {
    /// mm
    pub position: f32,
    /// mm/s
    pub velocity: f32,
    /// mm/s²
    pub acceleration: f32,
    /// mm/s³
    pub jerk: f32,
    /// A
    pub current: f32,
}

/// Segment orientation from the board IMU, in radians.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Orientation {
    pub roll: f32,
    pub pitch: f32,
    pub yaw: f32,
}

impl Orientation {
    /// `(roll, pitch, yaw)` in degrees.
    pub fn to_degrees(self) -> (f32, f32, f32) {
        (
            self.roll.to_degrees(),
            self.pitch.to_degrees(),
            self.yaw.to_degrees(),
        )
    }
}

/// MOTOR_STATE payload.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct MotorState {
    pub motors: [MotorSample; MOTOR_COUNT],
    pub orientation: Orientation,
    pub status: StatusFlags,
}

/// DIAGNOSTICS payload.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Diagnostics {
    /// Average motor driver temperature, °C.
    pub driver_temp_avg: f32,
    /// Controller board temperature, °C.
    pub controller_temp: f32,
    pub error_count: u16,
    /// Raw code; see [`Diagnostics::last_error`].
    pub last_error_code: u8,
    /// 0-100 %.
    pub cpu_usage: u8,
}

impl Diagnostics {
    /// The last error as a known code, if it is one.
    pub fn last_error(&self) -> Option<ErrorCode> {
        ErrorCode::from_byte(self.last_error_code)
    }
}

/// Type-specific feedback payloads.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum FeedbackBody {
    MotorState(MotorState),
    Diagnostics(Diagnostics),
}

impl FeedbackBody {
    pub fn feedback_type(&self) -> FeedbackType {
        match self {
            FeedbackBody::MotorState(_) => FeedbackType::MotorState,
            FeedbackBody::Diagnostics(_) => FeedbackType::Diagnostics,
        }
    }

    pub(crate) fn to_fields(&self) -> Vec<FieldValue> {
        match self {
            FeedbackBody::MotorState(state) => {
                let mut values = Vec::with_capacity(19);
                for m in &state.motors {
                    values.extend([
                        FieldValue::F32(m.position),
                        FieldValue::F32(m.velocity),
                        FieldValue::F32(m.acceleration),
                        FieldValue::F32(m.jerk),
                        FieldValue::F32(m.current),
                    ]);
                }
                values.extend([
                    FieldValue::F32(state.orientation.roll),
                    FieldValue::F32(state.orientation.pitch),
                    FieldValue::F32(state.orientation.yaw),
                    FieldValue::U8(state.status.bits()),
                ]);
                values
            }
            FeedbackBody::Diagnostics(d) => vec![
                FieldValue::F32(d.driver_temp_avg),
                FieldValue::F32(d.controller_temp),
                FieldValue::U16(d.error_count),
                FieldValue::U8(d.last_error_code),
                FieldValue::U8(d.cpu_usage),
            ],
        }
    }

    pub(crate) fn from_fields(schema: &'static Schema, values: &[FieldValue]) -> Result<Self> {
        let packet = schema.kind;
        let PacketKind::Feedback(ty) = packet else {
            return Err(FrameError::LayoutMismatch {
                packet,
                field: "<direction>",
            });
        };
        let mut fields = FieldCursor::new(schema, values);
        match ty {
            FeedbackType::MotorState => {
                let mut motors = [MotorSample::default(); MOTOR_COUNT];
                for m in &mut motors {
                    *m = MotorSample {
                        position: fields.f32()?,
                        velocity: fields.f32()?,
                        acceleration: fields.f32()?,
                        jerk: fields.f32()?,
                        current: fields.f32()?,
                    };
                }
                let orientation = Orientation {
                    roll: fields.f32()?,
                    pitch: fields.f32()?,
                    yaw: fields.f32()?,
                };
                let status = StatusFlags::from_bits_retain(fields.u8()?);
                Ok(FeedbackBody::MotorState(MotorState {
                    motors,
                    orientation,
                    status,
                }))
            }
            FeedbackType::Diagnostics => Ok(FeedbackBody::Diagnostics(Diagnostics {
                driver_temp_avg: fields.f32()?,
                controller_temp: fields.f32()?,
                error_count: fields.u16()?,
                last_error_code: fields.u8()?,
                cpu_usage: fields.u8()?,
            })),
            FeedbackType::CapacitiveGrid => Err(FrameError::UnknownPacketType {
                direction: Direction::BoardToMaster,
                type_id: ty.id(),
            }),
        }
    }
}

/// A feedback frame from one board.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Feedback {
    pub segment: SegmentId,
    /// Board uptime in ms.
    pub timestamp: u32,
    pub body: FeedbackBody,
}

impl Feedback {
    pub fn motor_state(segment: impl Into<SegmentId>, timestamp: u32, state: MotorState) -> Self {
        Self {
            segment: segment.into(),
            timestamp,
            body: FeedbackBody::MotorState(state),
        }
    }

    pub fn diagnostics(segment: impl Into<SegmentId>, timestamp: u32, diag: Diagnostics) -> Self {
        Self {
            segment: segment.into(),
            timestamp,
            body: FeedbackBody::Diagnostics(diag),
        }
    }

    pub fn feedback_type(&self) -> FeedbackType {
        self.body.feedback_type()
    }

    pub fn kind(&self) -> PacketKind {
        PacketKind::Feedback(self.feedback_type())
    }

    /// Orientation, when this is a MOTOR_STATE frame.
    pub fn orientation(&self) -> Option<Orientation> {
        match &self.body {
            FeedbackBody::MotorState(state) => Some(state.orientation),
            FeedbackBody::Diagnostics(_) => None,
        }
    }
}

/// Any decoded frame.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Packet {
    Command(Command),
    Feedback(Feedback),
}

impl Packet {
    pub fn kind(&self) -> PacketKind {
        match self {
            Packet::Command(c) => c.kind(),
            Packet::Feedback(f) => f.kind(),
        }
    }

    pub fn direction(&self) -> Direction {
        self.kind().direction()
    }

    pub fn segment(&self) -> SegmentId {
        match self {
            Packet::Command(c) => c.segment,
            Packet::Feedback(f) => f.segment,
        }
    }
}

impl From<Command> for Packet {
    fn from(command: Command) -> Self {
        Packet::Command(command)
    }
}

impl From<Feedback> for Packet {
    fn from(feedback: Feedback) -> Self {
        Packet::Feedback(feedback)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn segment_broadcast_sentinel() {
        assert!(SegmentId::BROADCAST.is_broadcast());
        assert_eq!(SegmentId::BROADCAST.get(), 0xFF);
        assert!(!SegmentId::new(3).is_broadcast());
        assert!(SegmentId::BROADCAST.addresses(SegmentId::new(3)));
        assert!(SegmentId::new(3).addresses(SegmentId::new(3)));
        assert!(!SegmentId::new(2).addresses(SegmentId::new(3)));
        assert_eq!(SegmentId::BROADCAST.to_string(), "broadcast");
    }

    #[test]
    fn coefficient_slices_must_hold_eight_values() {
        assert!(Coefficients::from_slice(&[0.0; 8]).is_ok());
        let err = Coefficients::from_slice(&[0.0; 7]).unwrap_err();
        assert!(matches!(err, FrameError::MalformedCommand { .. }));
        assert!(Trajectory::from_slices(1, 0, 100, &[0.0; 8], &[0.0; 9], &[0.0; 8]).is_err());
    }

    #[test]
    fn polynomial_evaluation() {
        let constant = Coefficients::constant(100.0);
        assert_eq!(constant.evaluate(3.5), 100.0);

        // 1 + 2t + 3t²
        let quadratic = Coefficients([1.0, 2.0, 3.0, 0.0, 0.0, 0.0, 0.0, 0.0]);
        assert_eq!(quadratic.evaluate(2.0), 17.0);

        let septic = Coefficients([0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 1.0]);
        assert_eq!(septic.evaluate(2.0), 128.0);
    }

    #[test]
    fn trajectory_positions_clamp_to_window() {
        let linear = Coefficients([0.0, 10.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0]);
        let traj = Trajectory {
            trajectory_id: 7,
            start_timestamp: 1_000,
            duration_ms: 2_000,
            motors: [linear, Coefficients::constant(5.0), Coefficients::default()],
        };

        assert_eq!(traj.positions_at(500), [0.0, 5.0, 0.0]);
        assert_eq!(traj.positions_at(2_000), [10.0, 5.0, 0.0]);
        assert_eq!(traj.positions_at(10_000), [20.0, 5.0, 0.0]);
        assert!(traj.is_active(3_000));
        assert!(!traj.is_active(3_001));
        assert!(!traj.is_active(999));
    }

    #[test]
    fn validate_rejects_out_of_range_jog() {
        let base = Jog {
            motor_id: 1,
            unit: JogUnit::Millimeters,
            value: 2.5,
            speed_percent: 50,
        };
        assert!(Command::jog(1, base).validate().is_ok());

        let bad_motor = Jog { motor_id: 4, ..base };
        assert!(Command::jog(1, bad_motor).validate().is_err());

        let bad_speed = Jog {
            speed_percent: 101,
            ..base
        };
        assert!(Command::jog(1, bad_speed).validate().is_err());

        let bad_value = Jog {
            value: f32::NAN,
            ..base
        };
        assert!(Command::jog(1, bad_value).validate().is_err());
    }

    #[test]
    fn validate_broadcast_rules() {
        assert!(Command::broadcast_stop(0x01).validate().is_ok());
        assert!(Command::set_mode(SegmentId::BROADCAST, OperatingMode::Idle)
            .validate()
            .is_ok());
        let err = Command::set_zero_offset(SegmentId::BROADCAST)
            .validate()
            .unwrap_err();
        assert!(matches!(err, FrameError::MalformedCommand { .. }));
    }

    #[test]
    fn validate_rejects_non_finite_coefficients() {
        let mut motors = [Coefficients::default(); MOTOR_COUNT];
        motors[2].0[4] = f32::INFINITY;
        let traj = Trajectory {
            trajectory_id: 1,
            start_timestamp: 0,
            duration_ms: 10,
            motors,
        };
        let err = Command::trajectory(2, traj).validate().unwrap_err();
        assert!(err.to_string().contains("motor 3"));
    }

    #[test]
    fn wire_enums_round_trip_bytes() {
        for mode in [
            OperatingMode::Idle,
            OperatingMode::Homing,
            OperatingMode::Operation,
        ] {
            assert_eq!(OperatingMode::from_byte(mode.to_byte()), Some(mode));
        }
        assert_eq!(OperatingMode::from_byte(0x00), None);
        assert_eq!(ErrorCode::from_byte(0x0D), Some(ErrorCode::TemperatureHigh));
        assert_eq!(ErrorCode::from_byte(0x0E), None);
    }

    #[test]
    fn status_flags_bits() {
        let flags = StatusFlags::E_STOP_ACTIVE | StatusFlags::ERROR_PRESENT;
        assert_eq!(flags.bits(), 0x81);
        assert_eq!(StatusFlags::TRAJECTORY_EXECUTING.bits(), 0x20);
    }

    #[test]
    fn orientation_in_degrees() {
        let o = Orientation {
            roll: std::f32::consts::PI,
            pitch: 0.0,
            yaw: -std::f32::consts::FRAC_PI_2,
        };
        let (roll, pitch, yaw) = o.to_degrees();
        assert!((roll - 180.0).abs() < 1e-4);
        assert_eq!(pitch, 0.0);
        assert!((yaw + 90.0).abs() < 1e-4);
    }
}
