#![cfg(all(unix, feature = "cli"))]

use std::path::{Path, PathBuf};
use std::process::{Child, Command, Output, Stdio};
use std::thread;
use std::time::{Duration, Instant};

use chanmux_engine::{Direction, Multiplexer};
use chanmux_transport::{Connection, TcpTransport, UnixDomainSocket};

fn unique_temp_dir(tag: &str) -> PathBuf {
    let dir = std::env::temp_dir().join(format!(
        "chanmux-cli-{tag}-{}-{}",
        std::process::id(),
        std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .expect("time should be after epoch")
            .as_nanos()
    ));
    std::fs::create_dir_all(&dir).expect("temp dir should be creatable");
    dir
}

fn chanmux() -> Command {
    let mut cmd = Command::new(env!("CARGO_BIN_EXE_chanmux"));
    cmd.arg("--log-level").arg("error");
    cmd
}

fn wait_for_connect(path: &Path, timeout: Duration) -> Connection {
    let start = Instant::now();
    loop {
        match UnixDomainSocket::connect(path) {
            Ok(conn) => return conn,
            Err(err) => {
                if start.elapsed() >= timeout {
                    panic!("connect timeout: {err}");
                }
                thread::sleep(Duration::from_millis(25));
            }
        }
    }
}

fn wait_for_socket(path: &Path, timeout: Duration) {
    let start = Instant::now();
    while !path.exists() {
        if start.elapsed() >= timeout {
            panic!("socket {} never appeared", path.display());
        }
        thread::sleep(Duration::from_millis(25));
    }
}

/// Wait for `child` to exit, killing it if it takes longer than `timeout`.
fn finish(mut child: Child, timeout: Duration) -> Output {
    let start = Instant::now();
    loop {
        if child.try_wait().expect("child status").is_some() {
            return child.wait_with_output().expect("child output");
        }
        if start.elapsed() >= timeout {
            let _ = child.kill();
            panic!("child did not exit within {timeout:?}");
        }
        thread::sleep(Duration::from_millis(25));
    }
}

#[test]
fn serve_echoes_on_each_channel() {
    let dir = unique_temp_dir("serve");
    let sock_path = dir.join("mux.sock");

    let child = chanmux()
        .arg("serve")
        .arg(format!("unix:{}", sock_path.display()))
        .args(["--channel", "cmd", "--channel", "data", "--once"])
        .stdout(Stdio::null())
        .stderr(Stdio::piped())
        .spawn()
        .expect("serve command should start");

    let conn = wait_for_connect(&sock_path, Duration::from_secs(3));
    let mux = Multiplexer::new();
    let cmd = mux
        .create_channel("cmd", Direction::Bidirectional)
        .expect("channel should be created");
    let data = mux
        .create_channel("data", Direction::Bidirectional)
        .expect("channel should be created");
    mux.start(conn).expect("client should start");

    cmd.write(b"PING").expect("write cmd");
    data.write(b"payload").expect("write data");

    let reply = cmd
        .read_chunk(64)
        .expect("read cmd")
        .expect("cmd reply expected");
    assert_eq!(reply.as_ref(), b"PING");
    let reply = data
        .read_chunk(64)
        .expect("read data")
        .expect("data reply expected");
    assert_eq!(reply.as_ref(), b"payload");

    mux.stop();
    let output = finish(child, Duration::from_secs(5));
    assert!(output.status.success(), "serve --once should exit cleanly");
    let _ = std::fs::remove_dir_all(&dir);
}

#[test]
fn listen_prints_received_chunks_as_json() {
    let dir = unique_temp_dir("listen");
    let sock_path = dir.join("mux.sock");

    let child = chanmux()
        .args(["--format", "json", "listen"])
        .arg(format!("unix:{}", sock_path.display()))
        .args(["--channel", "data", "--count", "1"])
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .expect("listen command should start");

    let conn = wait_for_connect(&sock_path, Duration::from_secs(3));
    let mux = Multiplexer::new();
    let data = mux
        .create_channel("data", Direction::SendOnly)
        .expect("channel should be created");
    let other = mux
        .create_channel("other", Direction::SendOnly)
        .expect("channel should be created");
    mux.start(conn).expect("client should start");

    other.write(b"not listened to").expect("write other");
    data.write(b"hello").expect("write data");
    data.flush().expect("flush data");

    let output = finish(child, Duration::from_secs(5));
    mux.stop();
    assert!(output.status.success());

    let stdout = String::from_utf8(output.stdout).expect("stdout should be utf-8");
    let line = stdout.lines().next().expect("one chunk should be printed");
    let value: serde_json::Value = serde_json::from_str(line).expect("line should be json");
    assert_eq!(value["channel"], "data");
    assert_eq!(value["payload"], "hello");
    assert_eq!(value["payload_size"], 5);
    let _ = std::fs::remove_dir_all(&dir);
}

#[test]
fn send_with_wait_prints_the_echoed_reply() {
    let dir = unique_temp_dir("send");
    let sock_path = dir.join("mux.sock");
    let endpoint = format!("unix:{}", sock_path.display());

    let server = chanmux()
        .arg("serve")
        .arg(&endpoint)
        .args(["--channel", "cmd", "--once"])
        .stdout(Stdio::null())
        .stderr(Stdio::piped())
        .spawn()
        .expect("serve command should start");
    wait_for_socket(&sock_path, Duration::from_secs(3));

    let output = chanmux()
        .args(["--format", "json", "send"])
        .arg(&endpoint)
        .args(["--channel", "cmd", "--data", "hi there", "--wait", "--wait-timeout", "3s"])
        .output()
        .expect("send command should run");
    assert!(
        output.status.success(),
        "send failed: {}",
        String::from_utf8_lossy(&output.stderr)
    );

    let stdout = String::from_utf8(output.stdout).expect("stdout should be utf-8");
    let value: serde_json::Value =
        serde_json::from_str(stdout.lines().next().expect("reply should be printed"))
            .expect("reply should be json");
    assert_eq!(value["channel"], "cmd");
    assert_eq!(value["payload"], "hi there");

    let server = finish(server, Duration::from_secs(5));
    assert!(server.status.success());
    let _ = std::fs::remove_dir_all(&dir);
}

#[test]
fn send_to_closed_port_exits_with_transport_error() {
    let addr = {
        let listener = TcpTransport::bind("127.0.0.1:0").expect("listener should bind");
        listener.local_addr()
    };

    let output = chanmux()
        .arg("send")
        .arg(addr.to_string())
        .args(["--channel", "cmd", "--data", "x"])
        .output()
        .expect("send command should run");
    assert_eq!(output.status.code(), Some(3));
    assert!(String::from_utf8_lossy(&output.stderr).contains("connect failed"));
}

#[test]
fn invalid_channel_name_is_a_usage_error() {
    let output = chanmux()
        .arg("send")
        .arg("127.0.0.1:1")
        .args(["--channel", "", "--data", "x"])
        .output()
        .expect("send command should run");
    assert_eq!(output.status.code(), Some(64));
}

#[test]
fn version_prints_name_and_version() {
    let output = chanmux()
        .arg("version")
        .output()
        .expect("version command should run");
    assert!(output.status.success());
    let stdout = String::from_utf8(output.stdout).expect("stdout should be utf-8");
    assert_eq!(
        stdout.trim(),
        format!("chanmux {}", env!("CARGO_PKG_VERSION"))
    );
}
