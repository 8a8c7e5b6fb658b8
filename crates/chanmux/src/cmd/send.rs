use std::fs;
use std::sync::mpsc::{self, RecvTimeoutError};
use std::thread;
use std::time::Duration;

use chanmux_engine::{ChannelHandle, Direction};

use crate::cmd::{parse_duration, SendArgs};
use crate::exit::{io_error, mux_error, CliError, CliResult, FAILURE, SUCCESS, TIMEOUT};
use crate::output::{print_chunk, OutputFormat};

pub fn run(args: SendArgs, format: OutputFormat) -> CliResult<i32> {
    let wait_timeout = parse_duration(&args.wait_timeout)?;
    let payload = resolve_payload(&args)?;

    let direction = if args.wait {
        Direction::Bidirectional
    } else {
        Direction::SendOnly
    };

    let mux = args.mux.build()?;
    let handle = mux
        .create_channel(args.channel.as_str(), direction)
        .map_err(|err| mux_error("channel setup failed", err))?;

    let conn = args.addr.connect()?;
    let peer = conn.peer_label();
    mux.start(conn)
        .map_err(|err| mux_error("start failed", err))?;

    handle
        .write(&payload)
        .and_then(|()| handle.flush())
        .map_err(|err| mux_error("send failed", err))?;
    tracing::debug!(channel = %args.channel, size = payload.len(), "payload sent");

    let result = if args.wait {
        wait_for_reply(handle, wait_timeout).map(|reply| {
            print_chunk(&args.channel, &reply, &peer, format);
        })
    } else {
        Ok(())
    };

    mux.stop();
    result.map(|()| SUCCESS)
}

fn resolve_payload(args: &SendArgs) -> CliResult<Vec<u8>> {
    if let Some(data) = &args.data {
        return Ok(data.as_bytes().to_vec());
    }
    if let Some(path) = &args.file {
        return fs::read(path)
            .map_err(|err| io_error(&format!("failed reading {}", path.display()), err));
    }
    Ok(Vec::new())
}

/// Wait for one chunk on `handle`, giving up after `timeout`.
fn wait_for_reply(handle: ChannelHandle, timeout: Duration) -> CliResult<Vec<u8>> {
    let (tx, rx) = mpsc::channel();
    thread::spawn(move || {
        let _ = tx.send(handle.read_chunk(64 * 1024));
    });

    match rx.recv_timeout(timeout) {
        Ok(Ok(Some(chunk))) => Ok(chunk.to_vec()),
        Ok(Ok(None)) => Err(CliError::new(
            FAILURE,
            "connection closed before a reply arrived",
        )),
        Ok(Err(err)) => Err(mux_error("receive failed", err)),
        Err(RecvTimeoutError::Timeout) => Err(CliError::new(
            TIMEOUT,
            format!("no reply within {timeout:?}"),
        )),
        Err(RecvTimeoutError::Disconnected) => {
            Err(CliError::new(FAILURE, "reply reader exited unexpectedly"))
        }
    }
}
