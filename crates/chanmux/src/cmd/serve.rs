use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use chanmux_engine::{ChannelHandle, Direction, MuxError};

use crate::cmd::{install_ctrlc_handler, wait_session, ServeArgs};
use crate::exit::{mux_error, CliResult, SUCCESS};
use crate::output::{print_stats, OutputFormat};

pub fn run(args: ServeArgs, format: OutputFormat) -> CliResult<i32> {
    let listener = args.addr.listen()?;
    tracing::info!(addr = %args.addr, channels = ?args.channels, "serving echo");

    let running = Arc::new(AtomicBool::new(true));
    install_ctrlc_handler(running.clone())?;

    while running.load(Ordering::SeqCst) {
        let conn = listener.accept()?;
        let peer = conn.peer_label();
        let mux = args.mux.build()?;

        let mut echoes = Vec::with_capacity(args.channels.len());
        for name in &args.channels {
            let handle = mux
                .create_channel(name.as_str(), Direction::Bidirectional)
                .map_err(|err| mux_error("channel setup failed", err))?;
            echoes.push((name.clone(), thread::spawn(move || echo(handle))));
        }

        mux.start(conn)
            .map_err(|err| mux_error("start failed", err))?;
        tracing::info!(%peer, "session started");

        wait_session(&mux, &running)?;
        join_echoes(echoes);
        print_stats(&mux.stats(), format);

        if args.once {
            break;
        }
    }

    Ok(SUCCESS)
}

/// Wait for every echo worker, returning how many panicked.
fn join_echoes(echoes: Vec<(String, JoinHandle<()>)>) -> usize {
    let mut panicked = 0;
    for (name, echo) in echoes {
        if echo.join().is_err() {
            tracing::warn!(channel = %name, "echo thread panicked");
            panicked += 1;
        }
    }
    panicked
}

fn echo(handle: ChannelHandle) {
    let max = 64 * 1024;
    loop {
        match handle.read_chunk(max) {
            Ok(Some(chunk)) => {
                tracing::debug!(channel = handle.name(), size = chunk.len(), "echoing chunk");
                match handle.write(&chunk) {
                    Ok(()) => {}
                    Err(MuxError::ClosedBuffer(_)) => break,
                    Err(err) => {
                        tracing::warn!(channel = handle.name(), error = %err, "echo failed");
                        break;
                    }
                }
            }
            Ok(None) => break,
            Err(err) => {
                tracing::warn!(channel = handle.name(), error = %err, "read failed");
                break;
            }
        }
    }
}
