//! Two multiplexers on loopback TCP: one echoes, the other talks on two channels.
//!
//! Run with: `cargo run -p chanmux --example echo-pair`

use std::thread;

use chanmux::{Direction, MuxError, Multiplexer, TcpTransport};

fn main() -> Result<(), MuxError> {
    let listener = TcpTransport::bind("127.0.0.1:0")?;
    let addr = listener.local_addr();

    let server = thread::spawn(move || -> Result<(), MuxError> {
        let mux = Multiplexer::new();
        let mut workers = Vec::new();
        for name in ["cmd", "data"] {
            let handle = mux.create_channel(name, Direction::Bidirectional)?;
            workers.push(thread::spawn(move || {
                while let Ok(Some(chunk)) = handle.read_chunk(4096) {
                    if handle.write(&chunk).is_err() {
                        break;
                    }
                }
            }));
        }
        mux.start(listener.accept()?)?;
        let _ = mux.join();
        for worker in workers {
            let _ = worker.join();
        }
        Ok(())
    });

    let client = Multiplexer::new();
    let cmd = client.create_channel("cmd", Direction::Bidirectional)?;
    let data = client.create_channel("data", Direction::Bidirectional)?;
    client.connect(addr)?;

    cmd.write(b"PING")?;
    data.write(&[0xAB; 10_000])?;

    if let Some(reply) = cmd.read_chunk(64)? {
        println!("cmd  <- {}", String::from_utf8_lossy(&reply));
    }
    let mut echoed = 0;
    while echoed < 10_000 {
        match data.read_chunk(4096)? {
            Some(chunk) => echoed += chunk.len(),
            None => break,
        }
    }
    println!("data <- {echoed} bytes");
    println!("stats: {:?}", client.stats());

    client.stop();
    let _ = server.join();
    Ok(())
}
