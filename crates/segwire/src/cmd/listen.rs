use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use segwire_frame::Packet;
use segwire_link::{BoardLink, LinkError};
use tracing::{info, warn};

use crate::cmd::{parse_duration, ListenArgs};
use crate::exit::{link_error, CliError, CliResult, SUCCESS};
use crate::output::{print_packet, OutputFormat};

/// Poll interval for the stop flag while waiting on the stream.
const POLL_INTERVAL: Duration = Duration::from_millis(200);

pub fn run(args: ListenArgs, format: OutputFormat) -> CliResult<i32> {
    let mut config = args
        .ports
        .link_config()
        .with_read_timeout(Some(POLL_INTERVAL));
    config.connect_timeout = parse_duration(&args.timeout)?;

    let mut link =
        BoardLink::connect(args.board, config).map_err(|err| link_error("connect failed", err))?;

    let running = Arc::new(AtomicBool::new(true));
    install_ctrlc_handler(running.clone())?;

    let mut printed = 0usize;

    while running.load(Ordering::SeqCst) {
        let (feedback, frame) = match link.recv_frame() {
            Ok(received) => received,
            Err(err) if err.is_timeout() => continue,
            Err(LinkError::Disconnected(reason)) => {
                info!(%reason, "board closed the link");
                break;
            }
            Err(LinkError::Frame(err)) => {
                warn!(error = %err, "dropped invalid frame");
                continue;
            }
            Err(err) => return Err(link_error("receive failed", err)),
        };

        print_packet(&Packet::Feedback(feedback), &frame, format);
        printed = printed.saturating_add(1);

        if let Some(count) = args.count {
            if printed >= count {
                return Ok(SUCCESS);
            }
        }
    }

    Ok(SUCCESS)
}

/// First ctrl-c asks the loop to stop; a second one exits immediately.
pub(crate) fn install_ctrlc_handler(running: Arc<AtomicBool>) -> CliResult<()> {
    ctrlc::set_handler(move || {
        if !running.swap(false, Ordering::SeqCst) {
            std::process::exit(crate::exit::FAILURE);
        }
    })
    .map_err(|err| {
        CliError::new(
            crate::exit::INTERNAL,
            format!("signal handler setup failed: {err}"),
        )
    })
}
