use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, RecvTimeoutError};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use chanmux_engine::{Direction, Multiplexer};

use crate::cmd::{install_ctrlc_handler, wait_session, ListenArgs};
use crate::exit::{mux_error, CliResult, SUCCESS};
use crate::output::{print_chunk, print_stats, OutputFormat};

struct Received {
    channel: String,
    payload: Vec<u8>,
}

pub fn run(args: ListenArgs, format: OutputFormat) -> CliResult<i32> {
    let listener = args.addr.listen()?;
    tracing::info!(addr = %args.addr, channels = ?args.channels, "listening");

    let running = Arc::new(AtomicBool::new(true));
    install_ctrlc_handler(running.clone())?;

    let mut printed = 0usize;

    while running.load(Ordering::SeqCst) {
        let conn = listener.accept()?;
        let peer = conn.peer_label();
        let mux = args.mux.build()?;
        let rx = spawn_readers(&mux, &args.channels)?;
        mux.start(conn)
            .map_err(|err| mux_error("start failed", err))?;
        tracing::info!(%peer, "session started");

        loop {
            if !running.load(Ordering::SeqCst) {
                break;
            }
            match rx.recv_timeout(Duration::from_millis(100)) {
                Ok(chunk) => {
                    print_chunk(&chunk.channel, &chunk.payload, &peer, format);
                    printed = printed.saturating_add(1);
                    if args.count.is_some_and(|count| printed >= count) {
                        mux.stop();
                        finish(&mux, &running, args.stats, format)?;
                        return Ok(SUCCESS);
                    }
                }
                Err(RecvTimeoutError::Timeout) => {}
                // Every channel reached end-of-stream.
                Err(RecvTimeoutError::Disconnected) => break,
            }
        }

        finish(&mux, &running, args.stats, format)?;
    }

    Ok(SUCCESS)
}

fn spawn_readers(mux: &Multiplexer, channels: &[String]) -> CliResult<mpsc::Receiver<Received>> {
    let (tx, rx) = mpsc::channel();
    for name in channels {
        let handle = mux
            .create_channel(name.as_str(), Direction::ReceiveOnly)
            .map_err(|err| mux_error("channel setup failed", err))?;
        let tx = tx.clone();
        thread::spawn(move || {
            while let Ok(Some(chunk)) = handle.read_chunk(64 * 1024) {
                let received = Received {
                    channel: handle.name().to_string(),
                    payload: chunk.to_vec(),
                };
                if tx.send(received).is_err() {
                    break;
                }
            }
        });
    }
    Ok(rx)
}

fn finish(
    mux: &Multiplexer,
    running: &AtomicBool,
    show_stats: bool,
    format: OutputFormat,
) -> CliResult<()> {
    wait_session(mux, running)?;
    if show_stats {
        print_stats(&mux.stats(), format);
    }
    Ok(())
}
