use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::thread;
use std::time::{Duration, Instant};

use segwire_frame::{Feedback, Orientation, Packet};
use segwire_link::{BoardListener, BoardState, CommandDatagram, LinkError, MasterLink};
use tracing::{info, warn};

use crate::cmd::listen::install_ctrlc_handler;
use crate::cmd::{Animation, MockBoardArgs};
use crate::exit::{link_error, CliError, CliResult, SUCCESS, USAGE};
use crate::output::{print_packet, OutputFormat};

const DATAGRAM_POLL: Duration = Duration::from_millis(200);
const MIN_POLL: Duration = Duration::from_millis(1);

const DRIVER_TEMP_C: f32 = 25.0;
const CONTROLLER_TEMP_C: f32 = 30.0;
const CPU_USAGE_PERCENT: u8 = 10;

type SharedState = Arc<Mutex<BoardState>>;

pub fn run(args: MockBoardArgs, format: OutputFormat) -> CliResult<i32> {
    if args.rate_hz == 0 || args.rate_hz > 1000 {
        return Err(CliError::new(USAGE, "--rate-hz must be within 1..=1000"));
    }
    let period = Duration::from_secs(1) / args.rate_hz;
    let config = args.ports.link_config();

    let listener = BoardListener::bind(args.bind, config.clone())
        .map_err(|err| link_error("stream bind failed", err))?;
    let datagram = CommandDatagram::bind(
        args.bind,
        &config.clone().with_read_timeout(Some(DATAGRAM_POLL)),
    )
    .map_err(|err| link_error("datagram bind failed", err))?;

    let running = Arc::new(AtomicBool::new(true));
    install_ctrlc_handler(running.clone())?;

    let state: SharedState = Arc::new(Mutex::new(BoardState::new(args.segment)));
    let datagram_worker = {
        let state = Arc::clone(&state);
        let running = Arc::clone(&running);
        thread::spawn(move || serve_datagrams(datagram, state, running, format))
    };

    info!(
        stream = %listener.local_addr(),
        segment = args.segment,
        animation = ?args.animation,
        rate_hz = args.rate_hz,
        "mock board ready"
    );

    let started = Instant::now();
    let mut sent = 0u64;
    let result = loop {
        if !running.load(Ordering::SeqCst) {
            break Ok(SUCCESS);
        }
        let master = match listener.accept() {
            Ok(master) => master,
            Err(err) => break Err(link_error("accept failed", err)),
        };
        let session = Session {
            master,
            state: &state,
            running: &running,
            animation: args.animation,
            period,
            diagnostics_every: args.diagnostics_every,
            started,
            format,
        };
        match session.run(&mut sent, args.count) {
            Ok(true) => break Ok(SUCCESS),
            Ok(false) => continue,
            Err(err) => break Err(link_error("session failed", err)),
        }
    };

    running.store(false, Ordering::SeqCst);
    let _ = datagram_worker.join();
    result
}

struct Session<'a> {
    master: MasterLink,
    state: &'a SharedState,
    running: &'a AtomicBool,
    animation: Animation,
    period: Duration,
    diagnostics_every: u32,
    started: Instant,
    format: OutputFormat,
}

impl Session<'_> {
    /// Stream feedback until the master leaves. Returns `true` once `limit`
    /// MOTOR_STATE frames have been sent in total.
    fn run(mut self, sent: &mut u64, limit: Option<u64>) -> Result<bool, LinkError> {
        let peer = self.master.peer_addr();
        let mut next_tick = Instant::now();

        while self.running.load(Ordering::SeqCst) {
            let now = Instant::now();
            if now >= next_tick {
                match self.send_tick(*sent) {
                    Ok(()) => {}
                    Err(LinkError::Disconnected(_)) | Err(LinkError::Frame(_)) => {
                        info!(%peer, "master disconnected");
                        return Ok(false);
                    }
                    Err(err) => return Err(err),
                }
                *sent += 1;
                if limit.is_some_and(|limit| *sent >= limit) {
                    return Ok(true);
                }
                next_tick += self.period;
                continue;
            }

            self.master
                .set_read_timeout(Some((next_tick - now).max(MIN_POLL)))?;
            match self.master.recv_frame() {
                Ok((command, frame)) => {
                    lock(self.state).apply(&command);
                    print_packet(&Packet::Command(command), &frame, self.format);
                }
                Err(err) if err.is_timeout() => {}
                Err(LinkError::Disconnected(_)) => {
                    info!(%peer, "master disconnected");
                    return Ok(false);
                }
                Err(LinkError::Frame(err)) => lock(self.state).record_rejected(&err),
                Err(err) => return Err(err),
            }
        }
        Ok(true)
    }

    fn send_tick(&mut self, index: u64) -> Result<(), LinkError> {
        let elapsed = self.started.elapsed();
        // Board uptime wraps like the firmware's 32-bit millisecond counter.
        let timestamp = elapsed.as_millis() as u32;
        let orientation = animate(self.animation, elapsed.as_secs_f32());

        let (state, diagnostics) = {
            let board = lock(self.state);
            let segment = board.segment();
            let state = Feedback::motor_state(
                segment,
                timestamp,
                board.motor_state(timestamp, orientation),
            );
            let diagnostics = (self.diagnostics_every > 0
                && index % u64::from(self.diagnostics_every) == 0)
                .then(|| {
                    Feedback::diagnostics(
                        segment,
                        timestamp,
                        board.diagnostics(DRIVER_TEMP_C, CONTROLLER_TEMP_C, CPU_USAGE_PERCENT),
                    )
                });
            (state, diagnostics)
        };

        self.master.send(&state)?;
        if let Some(diagnostics) = diagnostics {
            self.master.send(&diagnostics)?;
        }
        Ok(())
    }
}

fn serve_datagrams(
    datagram: CommandDatagram,
    state: SharedState,
    running: Arc<AtomicBool>,
    format: OutputFormat,
) {
    info!(addr = %datagram.local_addr(), "listening for emergency stops");
    while running.load(Ordering::SeqCst) {
        match datagram.recv() {
            Ok((command, from)) => {
                info!(%from, packet = %command.kind(), "datagram command");
                lock(&state).apply(&command);
                if let Ok(frame) = segwire_frame::encode_command(&command) {
                    print_packet(&Packet::Command(command), &frame, format);
                }
            }
            Err(err) if err.is_timeout() => {}
            Err(LinkError::Frame(err)) => lock(&state).record_rejected(&err),
            Err(err) => warn!(error = %err, "datagram receive failed"),
        }
    }
}

fn lock(state: &SharedState) -> MutexGuard<'_, BoardState> {
    match state.lock() {
        Ok(guard) => guard,
        Err(poisoned) => poisoned.into_inner(),
    }
}

/// IMU orientation for the chosen animation, in radians.
pub fn animate(animation: Animation, t: f32) -> Orientation {
    match animation {
        Animation::Rotate => Orientation {
            roll: (t * 0.5).sin() * 0.5,
            pitch: (t * 0.3).sin() * 0.3,
            yaw: t * 0.2,
        },
        Animation::Tilt => Orientation {
            roll: 0.0,
            pitch: t.sin() * 0.8,
            yaw: 0.0,
        },
        Animation::Wobble => Orientation {
            roll: (t * 2.1).sin() * 0.4 + (t * 1.3).cos() * 0.2,
            pitch: (t * 1.7).sin() * 0.3 + (t * 2.5).cos() * 0.3,
            yaw: (t * 0.9).sin() * 0.5,
        },
        Animation::Still => Orientation {
            roll: 0.1,
            pitch: -0.2,
            yaw: 0.0,
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn animations_start_level_except_still() {
        for animation in [Animation::Rotate, Animation::Tilt, Animation::Wobble] {
            let o = animate(animation, 0.0);
            assert!(o.pitch.abs() <= 0.3 + f32::EPSILON, "{animation:?}");
        }
        let still = animate(Animation::Still, 123.0);
        assert_eq!(still, animate(Animation::Still, 0.0));
    }

    #[test]
    fn animations_stay_bounded() {
        for step in 0..1000 {
            let t = step as f32 * 0.05;
            let tilt = animate(Animation::Tilt, t);
            assert!(tilt.pitch.abs() <= 0.8 + 1e-6);
            let wobble = animate(Animation::Wobble, t);
            assert!(wobble.roll.abs() <= 0.6 + 1e-6);
            assert!(wobble.pitch.abs() <= 0.6 + 1e-6);
        }
    }

    #[test]
    fn rotate_yaw_is_continuous() {
        let a = animate(Animation::Rotate, 10.0);
        let b = animate(Animation::Rotate, 20.0);
        assert!(b.yaw > a.yaw);
    }
}
