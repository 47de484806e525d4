//! Frame schema registry.
//!
//! A closed, read-only table of every registered frame layout, keyed by
//! direction and type id. The ordered field list of each entry drives both
//! packing and unpacking of the payload, so the table is the single source
//! of truth for the wire layout.
//!
//! ```text
//! ┌───────────┬──────┬─────────┬────────────────┬──────────────┬──────────┐
//! │ Magic     │ Type │ Segment │ Timestamp      │ Payload      │ CRC-16   │
//! │ (2B LE)   │ (1B) │ (1B)    │ (4B LE, B→M)   │ (fixed/type) │ (2B LE)  │
//! └───────────┴──────┴─────────┴────────────────┴──────────────┴──────────┘
//! ```

use bytes::BufMut;

use crate::checksum::CHECKSUM_LEN;
use crate::error::{FrameError, Result};
use crate::packet_type::{CommandType, Direction, FeedbackType, PacketKind};

/// Coefficients per septic polynomial.
pub const COEFFICIENT_COUNT: usize = 8;

/// Primitive type of one payload field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    U8,
    U16,
    U32,
    F32,
    /// Eight consecutive `f32` polynomial coefficients.
    Coefficients,
    /// Zero-filled bytes covered by the checksum.
    Reserved(usize),
}

impl FieldKind {
    /// Width on the wire in bytes.
    pub const fn width(self) -> usize {
        match self {
            FieldKind::U8 => 1,
            FieldKind::U16 => 2,
            FieldKind::U32 | FieldKind::F32 => 4,
            FieldKind::Coefficients => 4 * COEFFICIENT_COUNT,
            FieldKind::Reserved(n) => n,
        }
    }
}

/// One named payload field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Field {
    pub name: &'static str,
    pub kind: FieldKind,
}

const fn field(name: &'static str, kind: FieldKind) -> Field {
    Field { name, kind }
}

/// A typed payload field value, in registry order.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum FieldValue {
    U8(u8),
    U16(u16),
    U32(u32),
    F32(f32),
    Coefficients([f32; COEFFICIENT_COUNT]),
}

/// A registered frame layout.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Schema {
    pub kind: PacketKind,
    /// Total frame length, header and checksum included.
    pub frame_len: usize,
    /// Payload fields between the header and the checksum.
    pub fields: &'static [Field],
}

impl Schema {
    pub const fn direction(&self) -> Direction {
        self.kind.direction()
    }

    pub const fn header_len(&self) -> usize {
        self.kind.direction().header_len()
    }

    /// Payload bytes between header and checksum.
    pub const fn payload_len(&self) -> usize {
        self.frame_len - self.header_len() - CHECKSUM_LEN
    }

    /// Sum of the field widths; equals `payload_len` for every entry.
    pub fn fields_width(&self) -> usize {
        self.fields.iter().map(|f| f.kind.width()).sum()
    }
}

const TRAJECTORY_FIELDS: &[Field] = &[
    field("trajectory_id", FieldKind::U32),
    field("start_timestamp", FieldKind::U32),
    field("duration_ms", FieldKind::U16),
    field("motor_1_coeffs", FieldKind::Coefficients),
    field("motor_2_coeffs", FieldKind::Coefficients),
    field("motor_3_coeffs", FieldKind::Coefficients),
];

const EMERGENCY_STOP_FIELDS: &[Field] = &[field("stop_reason", FieldKind::U8)];

const START_HOMING_FIELDS: &[Field] = &[field("homing_mode", FieldKind::U8)];

const JOG_MOTOR_FIELDS: &[Field] = &[
    field("motor_id", FieldKind::U8),
    field("mode", FieldKind::U8),
    field("value", FieldKind::F32),
    field("speed_percent", FieldKind::U8),
];

const SET_MODE_FIELDS: &[Field] = &[field("mode", FieldKind::U8)];

const MOTOR_STATE_FIELDS: &[Field] = &[
    field("motor_1_position", FieldKind::F32),
    field("motor_1_velocity", FieldKind::F32),
    field("motor_1_acceleration", FieldKind::F32),
    field("motor_1_jerk", FieldKind::F32),
    field("motor_1_current", FieldKind::F32),
    field("motor_2_position", FieldKind::F32),
    field("motor_2_velocity", FieldKind::F32),
    field("motor_2_acceleration", FieldKind::F32),
    field("motor_2_jerk", FieldKind::F32),
    field("motor_2_current", FieldKind::F32),
    field("motor_3_position", FieldKind::F32),
    field("motor_3_velocity", FieldKind::F32),
    field("motor_3_acceleration", FieldKind::F32),
    field("motor_3_jerk", FieldKind::F32),
    field("motor_3_current", FieldKind::F32),
    field("roll", FieldKind::F32),
    field("pitch", FieldKind::F32),
    field("yaw", FieldKind::F32),
    field("status_flags", FieldKind::U8),
];

const DIAGNOSTICS_FIELDS: &[Field] = &[
    field("driver_temp_avg", FieldKind::F32),
    field("controller_temp", FieldKind::F32),
    field("error_count", FieldKind::U16),
    field("last_error_code", FieldKind::U8),
    field("cpu_usage", FieldKind::U8),
    field("reserved", FieldKind::Reserved(4)),
];

static SCHEMAS: [Schema; 8] = [
    Schema {
        kind: PacketKind::Command(CommandType::Trajectory),
        frame_len: 112,
        fields: TRAJECTORY_FIELDS,
    },
    Schema {
        kind: PacketKind::Command(CommandType::EmergencyStop),
        frame_len: 7,
        fields: EMERGENCY_STOP_FIELDS,
    },
    Schema {
        kind: PacketKind::Command(CommandType::StartHoming),
        frame_len: 7,
        fields: START_HOMING_FIELDS,
    },
    Schema {
        kind: PacketKind::Command(CommandType::JogMotor),
        frame_len: 13,
        fields: JOG_MOTOR_FIELDS,
    },
    Schema {
        kind: PacketKind::Command(CommandType::SetMode),
        frame_len: 7,
        fields: SET_MODE_FIELDS,
    },
    Schema {
        kind: PacketKind::Command(CommandType::SetZeroOffset),
        frame_len: 6,
        fields: &[],
    },
    Schema {
        kind: PacketKind::Feedback(FeedbackType::MotorState),
        frame_len: 83,
        fields: MOTOR_STATE_FIELDS,
    },
    Schema {
        kind: PacketKind::Feedback(FeedbackType::Diagnostics),
        frame_len: 26,
        fields: DIAGNOSTICS_FIELDS,
    },
];

/// Look up the layout for a type id in a direction.
pub fn lookup(direction: Direction, type_id: u8) -> Result<&'static Schema> {
    SCHEMAS
        .iter()
        .find(|schema| schema.kind.direction() == direction && schema.kind.id() == type_id)
        .ok_or(FrameError::UnknownPacketType { direction, type_id })
}

/// Look up the layout for an already resolved packet kind.
pub fn schema_for(kind: PacketKind) -> Result<&'static Schema> {
    lookup(kind.direction(), kind.id())
}

/// Every registered layout.
pub fn registered() -> impl Iterator<Item = &'static Schema> {
    SCHEMAS.iter()
}

/// Length of the longest registered frame.
pub fn max_frame_len() -> usize {
    SCHEMAS.iter().map(|s| s.frame_len).max().unwrap_or(0)
}

/// Pack field values into `dst` following the schema's field order.
///
/// Reserved fields are zero-filled and take no value.
pub(crate) fn pack(schema: &Schema, values: &[FieldValue], dst: &mut impl BufMut) -> Result<()> {
    let mut values = values.iter();
    for f in schema.fields {
        if let FieldKind::Reserved(n) = f.kind {
            dst.put_bytes(0, n);
            continue;
        }
        match (f.kind, values.next()) {
            (FieldKind::U8, Some(FieldValue::U8(v))) => dst.put_u8(*v),
            (FieldKind::U16, Some(FieldValue::U16(v))) => dst.put_u16_le(*v),
            (FieldKind::U32, Some(FieldValue::U32(v))) => dst.put_u32_le(*v),
            (FieldKind::F32, Some(FieldValue::F32(v))) => dst.put_f32_le(*v),
            (FieldKind::Coefficients, Some(FieldValue::Coefficients(coeffs))) => {
                for c in coeffs {
                    dst.put_f32_le(*c);
                }
            }
            _ => {
                return Err(FrameError::LayoutMismatch {
                    packet: schema.kind,
                    field: f.name,
                })
            }
        }
    }
    if values.next().is_some() {
        return Err(FrameError::LayoutMismatch {
            packet: schema.kind,
            field: "<trailing value>",
        });
    }
    Ok(())
}

/// Unpack a payload of exactly `schema.payload_len()` bytes.
pub(crate) fn unpack(schema: &Schema, payload: &[u8]) -> Result<Vec<FieldValue>> {
    if payload.len() != schema.payload_len() {
        return Err(FrameError::LengthMismatch {
            packet: schema.kind,
            expected: schema.frame_len,
            actual: schema.header_len() + payload.len() + CHECKSUM_LEN,
        });
    }

    let mut values = Vec::with_capacity(schema.fields.len());
    let mut offset = 0usize;
    for f in schema.fields {
        let width = f.kind.width();
        let raw = &payload[offset..offset + width];
        offset += width;
        let value = match f.kind {
            FieldKind::U8 => FieldValue::U8(raw[0]),
            FieldKind::U16 => FieldValue::U16(u16::from_le_bytes([raw[0], raw[1]])),
            FieldKind::U32 => FieldValue::U32(u32::from_le_bytes([raw[0], raw[1], raw[2], raw[3]])),
            FieldKind::F32 => FieldValue::F32(f32::from_le_bytes([raw[0], raw[1], raw[2], raw[3]])),
            FieldKind::Coefficients => {
                let mut coeffs = [0f32; COEFFICIENT_COUNT];
                for (c, chunk) in coeffs.iter_mut().zip(raw.chunks_exact(4)) {
                    *c = f32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]);
                }
                FieldValue::Coefficients(coeffs)
            }
            FieldKind::Reserved(_) => continue,
        };
        values.push(value);
    }
    Ok(values)
}

/// Sequential typed access to unpacked field values.
pub(crate) struct FieldCursor<'a> {
    schema: &'static Schema,
    values: std::slice::Iter<'a, FieldValue>,
    fields: std::iter::Filter<std::slice::Iter<'static, Field>, fn(&&Field) -> bool>,
}

fn is_value_field(f: &&Field) -> bool {
    !matches!(f.kind, FieldKind::Reserved(_))
}

impl<'a> FieldCursor<'a> {
    pub(crate) fn new(schema: &'static Schema, values: &'a [FieldValue]) -> Self {
        Self {
            schema,
            values: values.iter(),
            fields: schema
                .fields
                .iter()
                .filter(is_value_field as fn(&&Field) -> bool),
        }
    }

    fn next(&mut self) -> Result<(&'static str, FieldValue)> {
        let name = self.fields.next().map(|f| f.name).unwrap_or("<missing field>");
        match self.values.next() {
            Some(value) => Ok((name, *value)),
            None => Err(self.mismatch(name)),
        }
    }

    fn mismatch(&self, field: &'static str) -> FrameError {
        FrameError::LayoutMismatch {
            packet: self.schema.kind,
            field,
        }
    }

    /// Name of the field the next read will return.
    pub(crate) fn peek_name(&self) -> &'static str {
        self.fields
            .clone()
            .next()
            .map(|f| f.name)
            .unwrap_or("<missing field>")
    }

    pub(crate) fn u8(&mut self) -> Result<u8> {
        match self.next()? {
            (_, FieldValue::U8(v)) => Ok(v),
            (name, _) => Err(self.mismatch(name)),
        }
    }

    pub(crate) fn u16(&mut self) -> Result<u16> {
        match self.next()? {
            (_, FieldValue::U16(v)) => Ok(v),
            (name, _) => Err(self.mismatch(name)),
        }
    }

    pub(crate) fn u32(&mut self) -> Result<u32> {
        match self.next()? {
            (_, FieldValue::U32(v)) => Ok(v),
            (name, _) => Err(self.mismatch(name)),
        }
    }

    pub(crate) fn f32(&mut self) -> Result<f32> {
        match self.next()? {
            (_, FieldValue::F32(v)) => Ok(v),
            (name, _) => Err(self.mismatch(name)),
        }
    }

    pub(crate) fn coefficients(&mut self) -> Result<[f32; COEFFICIENT_COUNT]> {
        match self.next()? {
            (_, FieldValue::Coefficients(v)) => Ok(v),
            (name, _) => Err(self.mismatch(name)),
        }
    }
}

#[cfg(test)]
mod tests {
    use bytes::BytesMut;

    use super::*;

    #[test]
    fn declared_lengths_match_field_widths() {
        for schema in registered() {
            assert_eq!(
                schema.header_len() + schema.fields_width() + CHECKSUM_LEN,
                schema.frame_len,
                "{} layout does not add up",
                schema.kind
            );
        }
    }

    #[test]
    fn documented_frame_lengths() {
        let expect = [
            (Direction::MasterToBoard, 0x02, 7),
            (Direction::MasterToBoard, 0x08, 7),
            (Direction::MasterToBoard, 0x03, 7),
            (Direction::MasterToBoard, 0x07, 13),
            (Direction::MasterToBoard, 0x01, 112),
            (Direction::MasterToBoard, 0x09, 6),
            (Direction::BoardToMaster, 0x01, 83),
            (Direction::BoardToMaster, 0x03, 26),
        ];
        for (direction, id, len) in expect {
            assert_eq!(lookup(direction, id).unwrap().frame_len, len);
        }
    }

    #[test]
    fn trajectory_is_the_longest_frame() {
        assert_eq!(max_frame_len(), 112);
    }

    #[test]
    fn capacitive_grid_is_declared_but_unregistered() {
        let kind = PacketKind::resolve(Direction::BoardToMaster, 0x02).unwrap();
        assert_eq!(kind, PacketKind::Feedback(FeedbackType::CapacitiveGrid));
        assert!(matches!(
            schema_for(kind),
            Err(FrameError::UnknownPacketType {
                direction: Direction::BoardToMaster,
                type_id: 0x02
            })
        ));
    }

    #[test]
    fn unknown_ids_fail_lookup() {
        assert!(matches!(
            lookup(Direction::MasterToBoard, 0x04),
            Err(FrameError::UnknownPacketType { .. })
        ));
        assert!(matches!(
            lookup(Direction::BoardToMaster, 0x09),
            Err(FrameError::UnknownPacketType { .. })
        ));
    }

    #[test]
    fn pack_zero_fills_reserved_bytes() {
        let schema = lookup(Direction::BoardToMaster, 0x03).unwrap();
        let values = [
            FieldValue::F32(25.0),
            FieldValue::F32(30.0),
            FieldValue::U16(3),
            FieldValue::U8(0x05),
            FieldValue::U8(10),
        ];
        let mut buf = BytesMut::new();
        pack(schema, &values, &mut buf).unwrap();

        assert_eq!(buf.len(), schema.payload_len());
        assert_eq!(&buf[buf.len() - 4..], &[0, 0, 0, 0]);
        assert_eq!(unpack(schema, &buf).unwrap(), values.to_vec());
    }

    #[test]
    fn pack_rejects_wrong_value_kind() {
        let schema = lookup(Direction::MasterToBoard, 0x02).unwrap();
        let mut buf = BytesMut::new();
        let err = pack(schema, &[FieldValue::U16(1)], &mut buf).unwrap_err();
        assert!(matches!(
            err,
            FrameError::LayoutMismatch {
                field: "stop_reason",
                ..
            }
        ));
    }

    #[test]
    fn pack_rejects_extra_values() {
        let schema = lookup(Direction::MasterToBoard, 0x09).unwrap();
        let mut buf = BytesMut::new();
        let err = pack(schema, &[FieldValue::U8(1)], &mut buf).unwrap_err();
        assert!(matches!(err, FrameError::LayoutMismatch { .. }));
    }

    #[test]
    fn cursor_reads_in_field_order() {
        let schema = lookup(Direction::MasterToBoard, 0x07).unwrap();
        let values = [
            FieldValue::U8(2),
            FieldValue::U8(1),
            FieldValue::F32(-1.5),
            FieldValue::U8(40),
        ];
        let mut cursor = FieldCursor::new(schema, &values);
        assert_eq!(cursor.peek_name(), "motor_id");
        assert_eq!(cursor.u8().unwrap(), 2);
        assert_eq!(cursor.u8().unwrap(), 1);
        assert_eq!(cursor.peek_name(), "value");
        assert!(matches!(
            cursor.u8(),
            Err(FrameError::LayoutMismatch { field: "value", .. })
        ));
    }
}
