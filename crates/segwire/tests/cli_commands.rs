#![cfg(all(unix, feature = "cli"))]

use std::net::{IpAddr, SocketAddr, TcpListener, UdpSocket};
use std::process::{Command, Stdio};
use std::thread;
use std::time::{Duration, Instant};

use segwire_frame::{Command as BoardCommand, OperatingMode, SegmentId};
use segwire_link::{BoardLink, BoardListener, CommandDatagram, LinkConfig};

fn loopback() -> IpAddr {
    "127.0.0.1".parse().expect("loopback should parse")
}

fn free_tcp_port() -> u16 {
    TcpListener::bind("127.0.0.1:0")
        .and_then(|l| l.local_addr())
        .map(|a| a.port())
        .expect("ephemeral tcp port")
}

fn free_udp_port() -> u16 {
    UdpSocket::bind("127.0.0.1:0")
        .and_then(|s| s.local_addr())
        .map(|a| a.port())
        .expect("ephemeral udp port")
}

fn segwire() -> Command {
    let mut cmd = Command::new(env!("CARGO_BIN_EXE_segwire"));
    cmd.env_remove("SEGWIRE_STREAM_PORT")
        .env_remove("SEGWIRE_DATAGRAM_PORT")
        .arg("--log-level")
        .arg("error");
    cmd
}

fn wait_for_board(stream_port: u16, timeout: Duration) {
    let start = Instant::now();
    let config = LinkConfig::default().with_ports(stream_port, 0);
    loop {
        if BoardLink::connect(loopback(), config.clone()).is_ok() {
            return;
        }
        if start.elapsed() >= timeout {
            panic!("mock board did not come up");
        }
        thread::sleep(Duration::from_millis(25));
    }
}

#[test]
fn decode_golden_emergency_stop() {
    let output = segwire()
        .args(["--format", "json", "decode", "55 AA 02 FF 01 0A D8"])
        .output()
        .expect("decode should run");

    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("\"packet\":\"EMERGENCY_STOP\""));
    assert!(stdout.contains("\"segment\":\"broadcast\""));
    assert!(stdout.contains("\"stop_reason\":1"));
}

#[test]
fn decode_bad_checksum_returns_60() {
    let output = segwire()
        .args(["decode", "55aa02ff010ad9"])
        .output()
        .expect("decode should run");

    assert_eq!(output.status.code(), Some(60));
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("checksum mismatch"));
}

#[test]
fn dry_run_prints_encoded_frame() {
    let output = segwire()
        .args([
            "--format",
            "json",
            "send",
            "127.0.0.1",
            "--segment",
            "broadcast",
            "--dry-run",
            "estop",
            "--reason",
            "1",
        ])
        .output()
        .expect("send should run");

    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("\"hex\":\"55aa02ff010ad8\""));
    assert!(stdout.contains("\"length\":7"));
}

#[test]
fn broadcast_zero_offset_rejected_before_sending() {
    let output = segwire()
        .args(["send", "127.0.0.1", "--segment", "broadcast", "--dry-run", "zero"])
        .output()
        .expect("send should run");

    assert_eq!(output.status.code(), Some(60));
}

#[test]
fn datagram_flag_only_for_estop() {
    let output = segwire()
        .args(["send", "127.0.0.1", "--datagram", "mode", "idle"])
        .output()
        .expect("send should run");

    assert_eq!(output.status.code(), Some(64));
}

#[test]
fn send_over_stream_reaches_board() {
    let config = LinkConfig::default().with_read_timeout(Some(Duration::from_secs(5)));
    let listener = BoardListener::bind_addr(SocketAddr::new(loopback(), 0), config)
        .expect("board listener should bind");
    let port = listener.local_addr().port();

    let board = thread::spawn(move || {
        let mut master = listener.accept().expect("board should accept");
        master.recv().expect("board should receive command")
    });

    let output = segwire()
        .args(["--format", "json", "send", "127.0.0.1", "--segment", "4"])
        .arg("--stream-port")
        .arg(port.to_string())
        .args(["mode", "operation"])
        .output()
        .expect("send should run");

    assert!(output.status.success(), "{}", String::from_utf8_lossy(&output.stderr));
    let received = board.join().expect("board thread should complete");
    assert_eq!(received, BoardCommand::set_mode(4, OperatingMode::Operation));
}

#[test]
fn estop_over_datagram_reaches_board() {
    let config = LinkConfig::default().with_read_timeout(Some(Duration::from_secs(5)));
    let receiver = CommandDatagram::bind_addr(SocketAddr::new(loopback(), 0), &config)
        .expect("datagram receiver should bind");
    let port = receiver.local_addr().port();

    let output = segwire()
        .args(["send", "127.0.0.1", "--segment", "broadcast", "--datagram"])
        .arg("--datagram-port")
        .arg(port.to_string())
        .args(["estop", "--reason", "3"])
        .output()
        .expect("send should run");

    assert!(output.status.success());
    let (command, _) = receiver.recv().expect("datagram should arrive");
    assert_eq!(command, BoardCommand::broadcast_stop(3));
    assert_eq!(command.segment, SegmentId::BROADCAST);
}

#[test]
fn listen_prints_mock_board_feedback() {
    let stream_port = free_tcp_port();
    let datagram_port = free_udp_port();

    let mut board = segwire()
        .args(["--format", "json", "mock-board", "127.0.0.1", "--segment", "2"])
        .args(["--animation", "still", "--rate-hz", "200", "--diagnostics-every", "2"])
        .arg("--stream-port")
        .arg(stream_port.to_string())
        .arg("--datagram-port")
        .arg(datagram_port.to_string())
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .spawn()
        .expect("mock board should start");

    wait_for_board(stream_port, Duration::from_secs(3));

    let output = segwire()
        .args(["--format", "json", "listen", "127.0.0.1", "--count", "4"])
        .arg("--stream-port")
        .arg(stream_port.to_string())
        .output()
        .expect("listen should run");

    let _ = board.kill();
    let _ = board.wait();

    assert!(output.status.success(), "{}", String::from_utf8_lossy(&output.stderr));
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert_eq!(stdout.lines().count(), 4);
    assert!(stdout.contains("\"packet\":\"MOTOR_STATE\""));
    assert!(stdout.contains("\"packet\":\"DIAGNOSTICS\""));
    assert!(stdout.contains("\"segment\":2"));
}

#[test]
fn connect_refused_returns_transport_error() {
    let port = free_tcp_port();
    let output = segwire()
        .args(["send", "127.0.0.1", "--timeout", "1s"])
        .arg("--stream-port")
        .arg(port.to_string())
        .arg("zero")
        .output()
        .expect("send should run");

    assert_eq!(output.status.code(), Some(3));
}

#[test]
fn version_reports_name() {
    let output = segwire()
        .args(["version", "--extended"])
        .output()
        .expect("version should run");

    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("name: segwire"));
    assert!(stdout.contains("ports: stream=5000, datagram=6000"));
}
