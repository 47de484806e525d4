use segwire_frame::{codec, Command, CommandType, Jog, Trajectory};
use segwire_link::{send_command_datagram, BoardLink};
use tracing::{debug, info};

use crate::cmd::{parse_duration, SendAction, SendArgs};
use crate::exit::{frame_error, link_error, CliError, CliResult, SUCCESS, USAGE};
use crate::output::{print_encoded, OutputFormat};

pub fn run(args: SendArgs, format: OutputFormat) -> CliResult<i32> {
    let command = build_command(&args)?;
    // Validation happens here even for a dry run.
    let frame = codec::encode_command(&command).map_err(|err| frame_error("encode failed", err))?;

    if args.dry_run {
        print_encoded(command.kind(), command.segment, &frame, format);
        return Ok(SUCCESS);
    }

    let mut config = args.ports.link_config();
    config.connect_timeout = parse_duration(&args.timeout)?;

    if args.datagram {
        if command.command_type() != CommandType::EmergencyStop {
            return Err(CliError::new(USAGE, "--datagram is only valid with `estop`"));
        }
        let target = config.datagram_addr(args.board);
        send_command_datagram(target, &command)
            .map_err(|err| link_error("datagram send failed", err))?;
    } else {
        let mut link = BoardLink::connect(args.board, config)
            .map_err(|err| link_error("connect failed", err))?;
        link.send(&command)
            .map_err(|err| link_error("send failed", err))?;
        if let Err(err) = link.shutdown() {
            debug!(board = %args.board, error = %err, "link shutdown after send failed");
        }
    }

    info!(packet = %command.kind(), segment = %command.segment, board = %args.board, "command sent");
    print_encoded(command.kind(), command.segment, &frame, format);
    Ok(SUCCESS)
}

fn build_command(args: &SendArgs) -> CliResult<Command> {
    let segment = args.segment;
    let command = match &args.action {
        SendAction::Estop { reason } => Command::emergency_stop(segment, *reason),
        SendAction::Mode { mode } => Command::set_mode(segment, (*mode).into()),
        SendAction::Home { mode } => Command::start_homing(segment, (*mode).into()),
        SendAction::Jog {
            motor,
            value,
            unit,
            speed,
        } => Command::jog(
            segment,
            Jog {
                motor_id: *motor,
                unit: (*unit).into(),
                value: *value,
                speed_percent: *speed,
            },
        ),
        SendAction::Zero => Command::set_zero_offset(segment),
        SendAction::Trajectory {
            id,
            start,
            duration_ms,
            motor1,
            motor2,
            motor3,
        } => {
            let trajectory =
                Trajectory::from_slices(*id, *start, *duration_ms, motor1, motor2, motor3)
                    .map_err(|err| frame_error("invalid trajectory", err))?;
            Command::trajectory(segment, trajectory)
        }
    };
    Ok(command)
}
