//! Directions, magic headers and packet type ids.
//!
//! Type ids overlap between directions (0x01 is TRAJECTORY one way and
//! MOTOR_STATE the other), so every lookup is keyed by direction and id
//! together through [`PacketKind`].

use std::fmt;

/// Magic header on master → board frames.
pub const MAGIC_MASTER_TO_BOARD: u16 = 0xAA55;

/// Magic header on board → master frames.
pub const MAGIC_BOARD_TO_MASTER: u16 = 0xBB55;

/// Offset of the packet type byte in every frame.
pub const TYPE_OFFSET: usize = 2;

/// Bytes needed before the expected frame length is known.
pub const PROBE_LEN: usize = TYPE_OFFSET + 1;

/// Segment id addressing every board at once.
pub const BROADCAST_SEGMENT: u8 = 0xFF;

/// Which way a frame travels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Direction {
    /// Commands from the master controller to a segment board.
    MasterToBoard,
    /// Feedback from a segment board to the master controller.
    BoardToMaster,
}

impl Direction {
    /// The magic header every frame in this direction starts with.
    pub const fn magic(self) -> u16 {
        match self {
            Direction::MasterToBoard => MAGIC_MASTER_TO_BOARD,
            Direction::BoardToMaster => MAGIC_BOARD_TO_MASTER,
        }
    }

    /// Header size: magic, type and segment id, plus a timestamp on feedback.
    pub const fn header_len(self) -> usize {
        match self {
            Direction::MasterToBoard => 4,
            Direction::BoardToMaster => 8,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Direction::MasterToBoard => "master-to-board",
            Direction::BoardToMaster => "board-to-master",
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Command packet types (master → board).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum CommandType {
    Trajectory = 0x01,
    EmergencyStop = 0x02,
    StartHoming = 0x03,
    JogMotor = 0x07,
    SetMode = 0x08,
    SetZeroOffset = 0x09,
}

impl CommandType {
    pub const ALL: [CommandType; 6] = [
        CommandType::Trajectory,
        CommandType::EmergencyStop,
        CommandType::StartHoming,
        CommandType::JogMotor,
        CommandType::SetMode,
        CommandType::SetZeroOffset,
    ];

    pub fn from_id(id: u8) -> Option<Self> {
        Self::ALL.into_iter().find(|ty| ty.id() == id)
    }

    pub const fn id(self) -> u8 {
        self as u8
    }

    pub fn name(self) -> &'static str {
        match self {
            CommandType::Trajectory => "TRAJECTORY",
            CommandType::EmergencyStop => "EMERGENCY_STOP",
            CommandType::StartHoming => "START_HOMING",
            CommandType::JogMotor => "JOG_MOTOR",
            CommandType::SetMode => "SET_MODE",
            CommandType::SetZeroOffset => "SET_ZERO_OFFSET",
        }
    }

    /// Whether the command may be addressed to the broadcast segment.
    pub const fn supports_broadcast(self) -> bool {
        matches!(
            self,
            CommandType::EmergencyStop | CommandType::SetMode | CommandType::StartHoming
        )
    }
}

impl fmt::Display for CommandType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Feedback packet types (board → master).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum FeedbackType {
    MotorState = 0x01,
    /// Declared by the protocol; no layout is registered yet.
    CapacitiveGrid = 0x02,
    Diagnostics = 0x03,
}

impl FeedbackType {
    pub const ALL: [FeedbackType; 3] = [
        FeedbackType::MotorState,
        FeedbackType::CapacitiveGrid,
        FeedbackType::Diagnostics,
    ];

    pub fn from_id(id: u8) -> Option<Self> {
        Self::ALL.into_iter().find(|ty| ty.id() == id)
    }

    pub const fn id(self) -> u8 {
        self as u8
    }

    pub fn name(self) -> &'static str {
        match self {
            FeedbackType::MotorState => "MOTOR_STATE",
            FeedbackType::CapacitiveGrid => "CAPACITIVE_GRID",
            FeedbackType::Diagnostics => "DIAGNOSTICS",
        }
    }
}

impl fmt::Display for FeedbackType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A packet type id resolved against its direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PacketKind {
    Command(CommandType),
    Feedback(FeedbackType),
}

impl PacketKind {
    /// Resolve a declared type id for a direction.
    ///
    /// Declared is not the same as registered: CAPACITIVE_GRID resolves
    /// here but has no schema.
    pub fn resolve(direction: Direction, id: u8) -> Option<Self> {
        match direction {
            Direction::MasterToBoard => CommandType::from_id(id).map(PacketKind::Command),
            Direction::BoardToMaster => FeedbackType::from_id(id).map(PacketKind::Feedback),
        }
    }

    pub const fn direction(self) -> Direction {
        match self {
            PacketKind::Command(_) => Direction::MasterToBoard,
            PacketKind::Feedback(_) => Direction::BoardToMaster,
        }
    }

    pub const fn id(self) -> u8 {
        match self {
            PacketKind::Command(ty) => ty.id(),
            PacketKind::Feedback(ty) => ty.id(),
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            PacketKind::Command(ty) => ty.name(),
            PacketKind::Feedback(ty) => ty.name(),
        }
    }
}

impl fmt::Display for PacketKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn type_ids_are_direction_scoped() {
        assert_eq!(
            PacketKind::resolve(Direction::MasterToBoard, 0x01),
            Some(PacketKind::Command(CommandType::Trajectory))
        );
        assert_eq!(
            PacketKind::resolve(Direction::BoardToMaster, 0x01),
            Some(PacketKind::Feedback(FeedbackType::MotorState))
        );
        assert_eq!(PacketKind::resolve(Direction::BoardToMaster, 0x07), None);
        assert_eq!(PacketKind::resolve(Direction::MasterToBoard, 0x04), None);
    }

    #[test]
    fn command_ids_match_wire_values() {
        let ids: Vec<u8> = CommandType::ALL.iter().map(|ty| ty.id()).collect();
        assert_eq!(ids, vec![0x01, 0x02, 0x03, 0x07, 0x08, 0x09]);
        for ty in CommandType::ALL {
            assert_eq!(CommandType::from_id(ty.id()), Some(ty));
        }
    }

    #[test]
    fn magic_and_header_per_direction() {
        assert_eq!(Direction::MasterToBoard.magic(), 0xAA55);
        assert_eq!(Direction::BoardToMaster.magic(), 0xBB55);
        assert_eq!(Direction::MasterToBoard.header_len(), 4);
        assert_eq!(Direction::BoardToMaster.header_len(), 8);
    }

    #[test]
    fn broadcast_support() {
        assert!(CommandType::EmergencyStop.supports_broadcast());
        assert!(!CommandType::Trajectory.supports_broadcast());
        assert!(!CommandType::JogMotor.supports_broadcast());
    }

    #[test]
    fn kind_display_uses_protocol_name() {
        let kind = PacketKind::Feedback(FeedbackType::Diagnostics);
        assert_eq!(kind.to_string(), "DIAGNOSTICS");
        assert_eq!(kind.direction(), Direction::BoardToMaster);
    }
}
