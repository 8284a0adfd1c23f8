#![cfg(feature = "cli")]

use std::net::{SocketAddr, UdpSocket};
use std::process::{Command, Output};
use std::thread;
use std::time::Duration;

const FADER_REPLY: &[u8] = b"/ch/01/mix/fader\0\0\0\0,f\0\0\x3f\x00\x00\x00";

fn device() -> (UdpSocket, SocketAddr) {
    let socket = UdpSocket::bind("127.0.0.1:0").expect("device socket should bind");
    socket
        .set_read_timeout(Some(Duration::from_secs(5)))
        .expect("read timeout should be settable");
    let addr = socket.local_addr().expect("device should have an address");
    (socket, addr)
}

fn oscprims() -> Command {
    let mut command = Command::new(env!("CARGO_BIN_EXE_oscprims"));
    command
        .env_remove("OSCPRIMS_REMOTE")
        .env_remove("OSCPRIMS_BIND")
        .arg("--log-level")
        .arg("error")
        .arg("--format")
        .arg("json");
    command
}

fn run(command: &mut Command) -> Output {
    command.output().expect("oscprims should run")
}

#[test]
fn send_delivers_datagram_to_remote() {
    let (socket, addr) = device();

    let output = run(oscprims()
        .arg("send")
        .arg(addr.to_string())
        .arg("/xremote")
        .arg("--bind")
        .arg("127.0.0.1:0"));
    assert!(output.status.success(), "{output:?}");

    let mut buf = [0u8; 64];
    let (len, _) = socket.recv_from(&mut buf).expect("device should receive");
    assert_eq!(&buf[..len], b"/xremote\0\0\0\0,\0\0\0");
}

#[test]
fn send_wait_prints_reply_sent_to_source_port() {
    let (socket, addr) = device();
    let console = thread::spawn(move || {
        let mut buf = [0u8; 64];
        let (_, from) = socket.recv_from(&mut buf).expect("request should arrive");
        socket.send_to(FADER_REPLY, from).expect("reply should send");
    });

    let output = run(oscprims()
        .arg("send")
        .arg(addr.to_string())
        .arg("/ch/01/mix/fader")
        .arg("--bind")
        .arg("127.0.0.1:0")
        .arg("--wait"));
    console.join().expect("console thread");

    assert!(output.status.success(), "{output:?}");
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("[\"/ch/01/mix/fader\",0.5]"), "{stdout}");
    assert!(stdout.contains(&format!("\"from\":\"{addr}\"")), "{stdout}");
}

#[test]
fn send_wait_times_out_with_124() {
    let (_socket, addr) = device();

    let output = run(oscprims()
        .arg("send")
        .arg(addr.to_string())
        .arg("/xinfo")
        .arg("--bind")
        .arg("127.0.0.1:0")
        .arg("--wait")
        .arg("--wait-timeout")
        .arg("200ms"));

    assert_eq!(output.status.code(), Some(124), "{output:?}");
}

#[test]
fn send_to_unresolvable_remote_is_usage_error() {
    let output = run(oscprims().arg("send").arg("no-port-here").arg("/xremote"));
    assert_eq!(output.status.code(), Some(64), "{output:?}");
}

#[test]
fn listen_says_hello_and_prints_replies() {
    let (socket, addr) = device();
    let console = thread::spawn(move || {
        let mut buf = [0u8; 64];
        let (len, from) = socket.recv_from(&mut buf).expect("hello should arrive");
        assert_eq!(&buf[..len], b"/xremote\0\0\0\0,\0\0\0");
        socket.send_to(b"/a\0\0,i\0\0\0\0\0\x01", from).expect("first reply");
        socket.send_to(FADER_REPLY, from).expect("second reply");
    });

    let output = run(oscprims()
        .env("OSCPRIMS_REMOTE", addr.to_string())
        .arg("listen")
        .arg("--bind")
        .arg("127.0.0.1:0")
        .arg("--hello")
        .arg("/xremote")
        .arg("--count")
        .arg("2"));
    console.join().expect("console thread");

    assert!(output.status.success(), "{output:?}");
    let stdout = String::from_utf8_lossy(&output.stdout);
    let lines: Vec<&str> = stdout.lines().collect();
    assert_eq!(lines.len(), 2, "{stdout}");
    assert!(lines[0].contains("[\"/a\",1]"));
    assert!(lines[1].contains("[\"/ch/01/mix/fader\",0.5]"));
}

#[test]
fn listen_address_filter_skips_other_messages() {
    let (socket, addr) = device();
    let console = thread::spawn(move || {
        let mut buf = [0u8; 64];
        let (_, from) = socket.recv_from(&mut buf).expect("hello should arrive");
        socket.send_to(b"/a\0\0,i\0\0\0\0\0\x01", from).expect("unrelated reply");
        socket.send_to(FADER_REPLY, from).expect("fader reply");
    });

    let output = run(oscprims()
        .arg("listen")
        .arg(addr.to_string())
        .arg("--bind")
        .arg("127.0.0.1:0")
        .arg("--hello")
        .arg("/xremote")
        .arg("--address")
        .arg("/ch/01/mix/fader")
        .arg("--count")
        .arg("1"));
    console.join().expect("console thread");

    assert!(output.status.success(), "{output:?}");
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert_eq!(stdout.lines().count(), 1, "{stdout}");
    assert!(stdout.contains("[\"/ch/01/mix/fader\",0.5]"));
}
