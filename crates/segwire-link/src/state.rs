//! Board-side command handling.
//!
//! Mirrors how a segment board reacts to decoded commands and which status
//! bits it reports back in MOTOR_STATE.

use segwire_frame::{
    Command, CommandBody, Diagnostics, ErrorCode, FrameError, HomingMode, MotorState,
    OperatingMode, Orientation, SegmentId, StatusFlags, Trajectory,
};
use tracing::{debug, info, warn};

/// What a board did with a command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Disposition {
    /// The command addressed this board and was applied.
    Applied,
    /// The command addressed another segment.
    Ignored,
}

/// Mutable state of one segment board.
#[derive(Debug, Clone)]
pub struct BoardState {
    segment: SegmentId,
    mode: OperatingMode,
    e_stop_active: bool,
    last_stop_reason: Option<u8>,
    homing: Option<HomingMode>,
    trajectory: Option<Trajectory>,
    zero_offset_requests: u32,
    error_count: u16,
    last_error: ErrorCode,
}

impl BoardState {
    pub fn new(segment: impl Into<SegmentId>) -> Self {
        Self {
            segment: segment.into(),
            mode: OperatingMode::Idle,
            e_stop_active: false,
            last_stop_reason: None,
            homing: None,
            trajectory: None,
            zero_offset_requests: 0,
            error_count: 0,
            last_error: ErrorCode::NoError,
        }
    }

    /// Apply a decoded command if it addresses this board or is broadcast.
    pub fn apply(&mut self, command: &Command) -> Disposition {
        if !command.segment.addresses(self.segment) {
            debug!(
                packet = %command.kind(),
                target = %command.segment,
                board = %self.segment,
                "command for another segment"
            );
            return Disposition::Ignored;
        }

        match &command.body {
            CommandBody::EmergencyStop { reason } => {
                warn!(segment = %self.segment, reason, "emergency stop latched");
                self.e_stop_active = true;
                self.last_stop_reason = Some(*reason);
                self.mode = OperatingMode::Idle;
                self.trajectory = None;
            }
            CommandBody::SetMode(mode) => {
                info!(segment = %self.segment, %mode, "mode change");
                self.mode = *mode;
                if *mode == OperatingMode::Operation {
                    self.e_stop_active = false;
                }
            }
            CommandBody::StartHoming(homing) => {
                info!(segment = %self.segment, %homing, "homing started");
                self.mode = OperatingMode::Homing;
                self.homing = Some(*homing);
            }
            CommandBody::Trajectory(trajectory) => {
                debug!(
                    segment = %self.segment,
                    id = trajectory.trajectory_id,
                    duration_ms = trajectory.duration_ms,
                    "trajectory received"
                );
                self.trajectory = Some(*trajectory);
            }
            CommandBody::JogMotor(jog) => {
                debug!(
                    segment = %self.segment,
                    motor = jog.motor_id,
                    value = jog.value,
                    unit = %jog.unit,
                    "jog received"
                );
            }
            CommandBody::SetZeroOffset => {
                self.zero_offset_requests = self.zero_offset_requests.saturating_add(1);
            }
        }
        Disposition::Applied
    }

    /// Count a frame that failed validation.
    pub fn record_rejected(&mut self, err: &FrameError) {
        warn!(segment = %self.segment, error = %err, "rejected frame");
        self.error_count = self.error_count.saturating_add(1);
        self.last_error = ErrorCode::CrcError;
    }

    /// Status bits as the board reports them.
    pub fn status_flags(&self) -> StatusFlags {
        let mut flags = StatusFlags::empty();
        if self.e_stop_active {
            flags |= StatusFlags::E_STOP_ACTIVE;
        }
        match self.mode {
            OperatingMode::Homing => flags |= StatusFlags::HOMING_IN_PROGRESS,
            OperatingMode::Operation => flags |= StatusFlags::TRAJECTORY_EXECUTING,
            OperatingMode::Idle => {}
        }
        if self.last_error != ErrorCode::NoError {
            flags |= StatusFlags::ERROR_PRESENT;
        }
        flags
    }

    /// MOTOR_STATE payload for the given IMU orientation.
    ///
    /// Motor positions follow the active trajectory when there is one.
    pub fn motor_state(&self, now_ms: u32, orientation: Orientation) -> MotorState {
        let mut state = MotorState {
            orientation,
            status: self.status_flags(),
            ..MotorState::default()
        };
        if let Some(trajectory) = &self.trajectory {
            let positions = trajectory.positions_at(now_ms);
            for (motor, position) in state.motors.iter_mut().zip(positions) {
                motor.position = position;
            }
        }
        state
    }

    /// DIAGNOSTICS payload with the supplied sensor readings.
    pub fn diagnostics(
        &self,
        driver_temp_avg: f32,
        controller_temp: f32,
        cpu_usage: u8,
    ) -> Diagnostics {
        Diagnostics {
            driver_temp_avg,
            controller_temp,
            error_count: self.error_count,
            last_error_code: self.last_error.to_byte(),
            cpu_usage,
        }
    }

    pub fn segment(&self) -> SegmentId {
        self.segment
    }

    pub fn mode(&self) -> OperatingMode {
        self.mode
    }

    pub fn is_stopped(&self) -> bool {
        self.e_stop_active
    }

    pub fn last_stop_reason(&self) -> Option<u8> {
        self.last_stop_reason
    }

    pub fn homing(&self) -> Option<HomingMode> {
        self.homing
    }

    pub fn trajectory(&self) -> Option<&Trajectory> {
        self.trajectory.as_ref()
    }

    pub fn zero_offset_requests(&self) -> u32 {
        self.zero_offset_requests
    }

    pub fn error_count(&self) -> u16 {
        self.error_count
    }

    pub fn last_error(&self) -> ErrorCode {
        self.last_error
    }
}
