use std::io::{IsTerminal, Write};

use clap::ValueEnum;
use comfy_table::{presets::UTF8_FULL, ContentArrangement, Table};
use segwire_frame::{CommandBody, FeedbackBody, Packet, PacketKind, SegmentId};
use serde::Serialize;
use serde_json::{json, Map, Value};

#[derive(Clone, Debug, Copy, ValueEnum)]
pub enum OutputFormat {
    Json,
    Table,
    Pretty,
    Raw,
}

impl OutputFormat {
    pub fn default_for_stdout() -> Self {
        if std::io::stdout().is_terminal() {
            Self::Table
        } else {
            Self::Json
        }
    }
}

#[derive(Serialize)]
struct PacketOutput<'a> {
    packet: &'a str,
    direction: &'a str,
    segment: Value,
    #[serde(skip_serializing_if = "Option::is_none")]
    timestamp: Option<u32>,
    fields: Map<String, Value>,
}

#[derive(Serialize)]
struct EncodedOutput<'a> {
    packet: &'a str,
    segment: Value,
    length: usize,
    hex: String,
}

/// Print a decoded packet.
///
/// `wire` is the frame the packet came from; raw output writes it verbatim.
pub fn print_packet(packet: &Packet, wire: &[u8], format: OutputFormat) {
    let fields = packet_fields(packet);
    match format {
        OutputFormat::Json => {
            let out = PacketOutput {
                packet: packet.kind().name(),
                direction: packet.direction().name(),
                segment: segment_value(packet.segment()),
                timestamp: timestamp(packet),
                fields,
            };
            println!(
                "{}",
                serde_json::to_string(&out).unwrap_or_else(|_| "{}".to_string())
            );
        }
        OutputFormat::Table => {
            let mut table = Table::new();
            table
                .load_preset(UTF8_FULL)
                .set_content_arrangement(ContentArrangement::Dynamic)
                .set_header(vec!["PACKET", "SEGMENT", "TIMESTAMP", "FIELDS"])
                .add_row(vec![
                    packet.kind().name().to_string(),
                    packet.segment().to_string(),
                    timestamp(packet).map_or_else(|| "-".to_string(), |t| t.to_string()),
                    inline_fields(&fields),
                ]);
            println!("{table}");
        }
        OutputFormat::Pretty => {
            let ts = timestamp(packet)
                .map(|t| format!(" t={t}ms"))
                .unwrap_or_default();
            println!(
                "{} segment={}{} {}",
                packet.kind(),
                packet.segment(),
                ts,
                inline_fields(&fields)
            );
        }
        OutputFormat::Raw => print_raw(wire),
    }
}

/// Print an encoded frame without sending it.
pub fn print_encoded(kind: PacketKind, segment: SegmentId, frame: &[u8], format: OutputFormat) {
    match format {
        OutputFormat::Json => {
            let out = EncodedOutput {
                packet: kind.name(),
                segment: segment_value(segment),
                length: frame.len(),
                hex: hex::encode(frame),
            };
            println!(
                "{}",
                serde_json::to_string(&out).unwrap_or_else(|_| "{}".to_string())
            );
        }
        OutputFormat::Table => {
            let mut table = Table::new();
            table
                .load_preset(UTF8_FULL)
                .set_content_arrangement(ContentArrangement::Dynamic)
                .set_header(vec!["PACKET", "SEGMENT", "LENGTH", "FRAME"])
                .add_row(vec![
                    kind.name().to_string(),
                    segment.to_string(),
                    frame.len().to_string(),
                    hex::encode(frame),
                ]);
            println!("{table}");
        }
        OutputFormat::Pretty => {
            println!(
                "{kind} segment={segment} length={} frame={}",
                frame.len(),
                spaced_hex(frame)
            );
        }
        OutputFormat::Raw => print_raw(frame),
    }
}

pub fn print_raw(data: &[u8]) {
    let mut out = std::io::stdout();
    let _ = out.write_all(data);
    let _ = out.flush();
}

fn segment_value(segment: SegmentId) -> Value {
    if segment.is_broadcast() {
        Value::from("broadcast")
    } else {
        Value::from(segment.get())
    }
}

fn timestamp(packet: &Packet) -> Option<u32> {
    match packet {
        Packet::Feedback(feedback) => Some(feedback.timestamp),
        Packet::Command(_) => None,
    }
}

fn spaced_hex(frame: &[u8]) -> String {
    frame
        .iter()
        .map(|b| format!("{b:02X}"))
        .collect::<Vec<_>>()
        .join(" ")
}

fn inline_fields(fields: &Map<String, Value>) -> String {
    fields
        .iter()
        .map(|(k, v)| format!("{k}={v}"))
        .collect::<Vec<_>>()
        .join(" ")
}

/// Packet fields as a flat JSON object.
pub fn packet_fields(packet: &Packet) -> Map<String, Value> {
    let value = match packet {
        Packet::Command(command) => match &command.body {
            CommandBody::Trajectory(t) => json!({
                "trajectory_id": t.trajectory_id,
                "start_timestamp": t.start_timestamp,
                "duration_ms": t.duration_ms,
                "motor_1_coeffs": t.motors[0].0,
                "motor_2_coeffs": t.motors[1].0,
                "motor_3_coeffs": t.motors[2].0,
            }),
            CommandBody::EmergencyStop { reason } => json!({ "stop_reason": reason }),
            CommandBody::StartHoming(mode) => json!({ "homing_mode": mode.name() }),
            CommandBody::JogMotor(jog) => json!({
                "motor_id": jog.motor_id,
                "unit": jog.unit.name(),
                "value": jog.value,
                "speed_percent": jog.speed_percent,
            }),
            CommandBody::SetMode(mode) => json!({ "mode": mode.name() }),
            CommandBody::SetZeroOffset => json!({}),
        },
        Packet::Feedback(feedback) => match &feedback.body {
            FeedbackBody::MotorState(state) => {
                let (roll, pitch, yaw) = state.orientation.to_degrees();
                let flags: Vec<&str> = state.status.iter_names().map(|(name, _)| name).collect();
                json!({
                    "positions": state.motors.map(|m| m.position),
                    "velocities": state.motors.map(|m| m.velocity),
                    "currents": state.motors.map(|m| m.current),
                    "roll_deg": roll,
                    "pitch_deg": pitch,
                    "yaw_deg": yaw,
                    "status_flags": format!("{:#04x}", state.status.bits()),
                    "status": flags,
                })
            }
            FeedbackBody::Diagnostics(d) => json!({
                "driver_temp_avg": d.driver_temp_avg,
                "controller_temp": d.controller_temp,
                "error_count": d.error_count,
                "last_error": d.last_error().map_or_else(
                    || format!("{:#04x}", d.last_error_code),
                    |code| code.name().to_string(),
                ),
                "cpu_usage": d.cpu_usage,
            }),
        },
    };
    match value {
        Value::Object(map) => map,
        _ => Map::new(),
    }
}
