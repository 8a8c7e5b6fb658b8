use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use chanmux_engine::{MuxConfig, MuxError, Multiplexer, DEFAULT_BUFFER_CAPACITY};
#[cfg(unix)]
use chanmux_transport::UnixDomainSocket;
use chanmux_transport::{Connection, TcpTransport, DEFAULT_ADDR};
use clap::{Args, Subcommand};

use crate::exit::{mux_error, transport_error, CliError, CliResult, INTERNAL, USAGE};
use crate::output::OutputFormat;

pub mod listen;
pub mod send;
pub mod serve;
pub mod version;

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Accept a connection and echo every chunk back on its channel.
    Serve(ServeArgs),
    /// Connect and send one payload on a channel.
    Send(SendArgs),
    /// Accept a connection and print received chunks.
    Listen(ListenArgs),
    /// Show version information.
    Version(VersionArgs),
}

pub fn run(command: Command, format: OutputFormat) -> CliResult<i32> {
    match command {
        Command::Serve(args) => serve::run(args, format),
        Command::Send(args) => send::run(args, format),
        Command::Listen(args) => listen::run(args, format),
        Command::Version(args) => version::run(args),
    }
}

/// Multiplexer tuning shared by every networked command.
#[derive(Args, Debug, Clone)]
pub struct MuxArgs {
    /// Capacity of each channel buffer in bytes.
    #[arg(long, value_name = "BYTES", default_value_t = DEFAULT_BUFFER_CAPACITY)]
    pub buffer_capacity: usize,
    /// Most bytes sent per frame (default: buffer capacity).
    #[arg(long, value_name = "BYTES")]
    pub max_chunk: Option<usize>,
    /// Scan for the next preamble after a corrupt frame instead of disconnecting.
    #[arg(long)]
    pub resync: bool,
}

impl MuxArgs {
    pub fn build(&self) -> CliResult<Multiplexer> {
        let mut config = MuxConfig::default()
            .with_buffer_capacity(self.buffer_capacity)
            .with_resync(self.resync);
        if let Some(max_chunk) = self.max_chunk {
            config = config.with_max_chunk(max_chunk);
        }
        Multiplexer::with_config(config).map_err(|err| mux_error("invalid options", err))
    }
}

#[derive(Args, Debug)]
pub struct ServeArgs {
    /// Address to listen on (HOST:PORT or unix:PATH).
    #[arg(default_value = DEFAULT_ADDR)]
    pub addr: Endpoint,
    /// Channel to echo (repeatable).
    #[arg(long = "channel", short = 'c', value_name = "NAME", required = true)]
    pub channels: Vec<String>,
    /// Exit after the first session ends.
    #[arg(long)]
    pub once: bool,
    #[command(flatten)]
    pub mux: MuxArgs,
}

#[derive(Args, Debug)]
pub struct SendArgs {
    /// Address to connect to (HOST:PORT or unix:PATH).
    #[arg(default_value = DEFAULT_ADDR)]
    pub addr: Endpoint,
    /// Channel to send on.
    #[arg(long, short = 'c', value_name = "NAME")]
    pub channel: String,
    /// Raw string payload.
    #[arg(long, conflicts_with = "file")]
    pub data: Option<String>,
    /// Read payload from file.
    #[arg(long, conflicts_with = "data")]
    pub file: Option<PathBuf>,
    /// Wait for one reply chunk on the same channel and print it.
    #[arg(long)]
    pub wait: bool,
    /// Maximum time to wait for the reply when --wait is set (e.g. 5s, 500ms).
    #[arg(long, default_value = "5s")]
    pub wait_timeout: String,
    #[command(flatten)]
    pub mux: MuxArgs,
}

#[derive(Args, Debug)]
pub struct ListenArgs {
    /// Address to listen on (HOST:PORT or unix:PATH).
    #[arg(default_value = DEFAULT_ADDR)]
    pub addr: Endpoint,
    /// Channel to receive on (repeatable).
    #[arg(long = "channel", short = 'c', value_name = "NAME", required = true)]
    pub channels: Vec<String>,
    /// Exit after receiving N chunks.
    #[arg(long)]
    pub count: Option<usize>,
    /// Print traffic counters when the session ends.
    #[arg(long)]
    pub stats: bool,
    #[command(flatten)]
    pub mux: MuxArgs,
}

#[derive(Args, Debug)]
pub struct VersionArgs {
    /// Show extended build provenance.
    #[arg(long)]
    pub extended: bool,
}

/// Where to listen or connect.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Endpoint {
    Tcp(String),
    #[cfg(unix)]
    Unix(PathBuf),
}

impl FromStr for Endpoint {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if let Some(path) = s.strip_prefix("unix:") {
            if path.is_empty() {
                return Err("unix socket path must not be empty".to_string());
            }
            #[cfg(unix)]
            return Ok(Endpoint::Unix(PathBuf::from(path)));
            #[cfg(not(unix))]
            return Err("unix sockets are not supported on this platform".to_string());
        }
        if s.trim().is_empty() {
            return Err("address must not be empty".to_string());
        }
        Ok(Endpoint::Tcp(s.to_string()))
    }
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Endpoint::Tcp(addr) => write!(f, "tcp://{addr}"),
            #[cfg(unix)]
            Endpoint::Unix(path) => write!(f, "unix://{}", path.display()),
        }
    }
}

pub enum Listener {
    Tcp(TcpTransport),
    #[cfg(unix)]
    Unix(UnixDomainSocket),
}

impl Listener {
    pub fn accept(&self) -> CliResult<Connection> {
        let accepted = match self {
            Listener::Tcp(listener) => listener.accept(),
            #[cfg(unix)]
            Listener::Unix(listener) => listener.accept(),
        };
        accepted.map_err(|err| transport_error("accept failed", err))
    }
}

impl Endpoint {
    pub fn listen(&self) -> CliResult<Listener> {
        let bound = match self {
            Endpoint::Tcp(addr) => TcpTransport::bind(addr.as_str()).map(Listener::Tcp),
            #[cfg(unix)]
            Endpoint::Unix(path) => UnixDomainSocket::bind(path).map(Listener::Unix),
        };
        bound.map_err(|err| transport_error("bind failed", err))
    }

    pub fn connect(&self) -> CliResult<Connection> {
        let connected = match self {
            Endpoint::Tcp(addr) => TcpTransport::connect(addr.as_str()),
            #[cfg(unix)]
            Endpoint::Unix(path) => UnixDomainSocket::connect(path),
        };
        connected.map_err(|err| transport_error("connect failed", err))
    }
}

pub fn install_ctrlc_handler(running: Arc<AtomicBool>) -> CliResult<()> {
    ctrlc::set_handler(move || {
        running.store(false, Ordering::SeqCst);
    })
    .map_err(|err| CliError::new(INTERNAL, format!("signal handler setup failed: {err}")))
}

/// Block until the session ends on its own or Ctrl-C is pressed.
///
/// A peer hanging up is a normal end of session.
pub fn wait_session(mux: &Multiplexer, running: &AtomicBool) -> CliResult<()> {
    while mux.is_running() {
        if !running.load(Ordering::SeqCst) {
            mux.stop();
            break;
        }
        thread::sleep(Duration::from_millis(50));
    }

    match mux.join() {
        Ok(()) => Ok(()),
        Err(MuxError::ConnectionLost { reason }) => {
            tracing::info!(%reason, "session ended");
            Ok(())
        }
        Err(err) => Err(mux_error("session failed", err)),
    }
}

pub fn parse_duration(input: &str) -> CliResult<Duration> {
    let input = input.trim();
    if input.is_empty() {
        return Err(CliError::new(USAGE, "duration must not be empty"));
    }

    let (number, unit) = if let Some(num) = input.strip_suffix("ms") {
        (num, "ms")
    } else if let Some(num) = input.strip_suffix('s') {
        (num, "s")
    } else {
        (input, "s")
    };

    let value: u64 = number
        .parse()
        .map_err(|_| CliError::new(USAGE, format!("invalid duration value: {input}")))?;

    if value == 0 {
        return Err(CliError::new(USAGE, "duration must be greater than zero"));
    }

    Ok(match unit {
        "ms" => Duration::from_millis(value),
        _ => Duration::from_secs(value),
    })
}
