use std::fmt;
use std::net::ToSocketAddrs;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::thread::{self, JoinHandle};

use chanmux_frame::{ChannelName, FrameReader, FrameWriter};
use chanmux_transport::{Shutdown, Split, SplitStream, TcpTransport};
use tracing::{debug, info, warn};

use crate::config::MuxConfig;
use crate::error::{MuxError, Result};
use crate::handle::{ChannelHandle, Direction};
use crate::outbound::Outgoing;
use crate::queue::WorkQueue;
use crate::registry::Registry;
use crate::stats::{Counters, MuxStats};
use crate::{inbound, outbound};

const OUTBOUND_THREAD: &str = "chanmux-outbound";
const INBOUND_THREAD: &str = "chanmux-inbound";

enum Lifecycle {
    Idle,
    Running { closer: Box<dyn Shutdown> },
    Stopped,
}

/// State shared by the facade, the pumps and every channel handle.
pub(crate) struct Core {
    pub(crate) config: MuxConfig,
    pub(crate) registry: Registry,
    pub(crate) queue: WorkQueue<Outgoing>,
    pub(crate) counters: Counters,
    lifecycle: Mutex<Lifecycle>,
    failure: Mutex<Option<String>>,
}

impl Core {
    /// Called by a pump whose connection I/O failed.
    pub(crate) fn connection_failed(&self, operation: &'static str, reason: String) {
        self.shutdown(Some((operation, reason)));
    }

    /// Stop both pumps and close every channel. Only the first call acts,
    /// so a failure reported after `stop` is not recorded.
    fn shutdown(&self, failure: Option<(&'static str, String)>) {
        let previous = std::mem::replace(&mut *lock(&self.lifecycle), Lifecycle::Stopped);
        let closer = match previous {
            Lifecycle::Stopped => return,
            Lifecycle::Idle => None,
            Lifecycle::Running { closer } => Some(closer),
        };

        match failure {
            Some((operation, reason)) => {
                info!(operation, %reason, "connection lost, stopping multiplexer");
                *lock(&self.failure) = Some(reason);
            }
            None => info!("stopping multiplexer"),
        }

        self.queue.stop();
        self.registry.close_all();
        if let Some(closer) = closer {
            if let Err(err) = closer.shutdown() {
                debug!(error = %err, "connection shutdown failed");
            }
        }
    }
}

/// Runs named channels over one full-duplex connection.
///
/// Channels may be created before or after [`start`](Self::start). Once
/// started, one thread owns the write half of the connection and another
/// owns the read half; callers only ever touch channel buffers.
///
/// ```no_run
/// use chanmux_engine::{Direction, Multiplexer};
///
/// let mux = Multiplexer::new();
/// let cmd = mux.create_channel("cmd", Direction::Bidirectional)?;
/// mux.connect("127.0.0.1:9050")?;
///
/// cmd.write(b"PING")?;
/// let reply = cmd.read_chunk(1024)?;
/// mux.stop();
/// # Ok::<(), chanmux_engine::MuxError>(())
/// ```
pub struct Multiplexer {
    core: Arc<Core>,
    pumps: Mutex<Vec<JoinHandle<()>>>,
}

impl Multiplexer {
    /// Create a multiplexer with the default configuration.
    pub fn new() -> Self {
        Self::build(MuxConfig::default())
    }

    /// Create a multiplexer with an explicit configuration.
    pub fn with_config(config: MuxConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self::build(config))
    }

    fn build(config: MuxConfig) -> Self {
        let core = Core {
            registry: Registry::new(config.buffer_capacity),
            queue: WorkQueue::new(),
            counters: Counters::default(),
            lifecycle: Mutex::new(Lifecycle::Idle),
            failure: Mutex::new(None),
            config,
        };
        Self {
            core: Arc::new(core),
            pumps: Mutex::new(Vec::new()),
        }
    }

    pub fn config(&self) -> &MuxConfig {
        &self.core.config
    }

    /// Register a channel and return its caller-side handle.
    pub fn create_channel(
        &self,
        name: impl Into<String>,
        direction: Direction,
    ) -> Result<ChannelHandle> {
        let name = ChannelName::new(name)?;
        let slot = self.core.registry.insert(&name, direction)?;
        Ok(ChannelHandle::new(name, slot, Arc::clone(&self.core)))
    }

    /// Close a channel by name. Unknown names are ignored.
    pub fn close_channel(&self, name: &str) {
        self.core.registry.remove(name);
    }

    /// Spawn both pumps over `stream`.
    pub fn start<S: SplitStream>(&self, stream: S) -> Result<()> {
        let mut pumps = lock(&self.pumps);
        let mut lifecycle = lock(&self.core.lifecycle);
        match *lifecycle {
            Lifecycle::Idle => {}
            Lifecycle::Running { .. } => return Err(MuxError::AlreadyStarted),
            Lifecycle::Stopped => return Err(MuxError::Stopped),
        }

        let Split {
            reader,
            writer,
            closer,
        } = stream.split()?;
        *lifecycle = Lifecycle::Running { closer };
        drop(lifecycle);

        let frame_config = self.core.config.frame_config();
        let reader = FrameReader::with_config(reader, frame_config.clone());
        let writer = FrameWriter::with_config(writer, frame_config);

        let core = Arc::clone(&self.core);
        pumps.push(self.spawn_pump(OUTBOUND_THREAD, move || outbound::run(core, writer))?);
        let core = Arc::clone(&self.core);
        pumps.push(self.spawn_pump(INBOUND_THREAD, move || inbound::run(core, reader))?);

        info!(
            buffer_capacity = self.core.config.buffer_capacity,
            max_chunk = self.core.config.effective_max_chunk(),
            "multiplexer started"
        );
        Ok(())
    }

    /// Connect to a TCP endpoint and start on that connection.
    pub fn connect(&self, addr: impl ToSocketAddrs + fmt::Debug) -> Result<()> {
        let connection = TcpTransport::connect(addr)?;
        self.start(connection)
    }

    /// Stop both pumps, close the connection and close every channel.
    ///
    /// Idempotent. Data decoded but not yet delivered may be lost.
    pub fn stop(&self) {
        self.core.shutdown(None);
    }

    /// Wait for both pumps to exit.
    ///
    /// Returns `ConnectionLost` if the pumps ended because the connection
    /// failed or reached EOF, `Ok(())` after a plain [`stop`](Self::stop).
    /// Returns immediately if the multiplexer was never started.
    pub fn join(&self) -> Result<()> {
        let handles = std::mem::take(&mut *lock(&self.pumps));
        for handle in handles {
            let name = handle.thread().name().unwrap_or("pump").to_string();
            if handle.join().is_err() {
                warn!(thread = %name, "pump thread panicked");
            }
        }

        match lock(&self.core.failure).clone() {
            Some(reason) => Err(MuxError::ConnectionLost { reason }),
            None => Ok(()),
        }
    }

    pub fn is_running(&self) -> bool {
        matches!(*lock(&self.core.lifecycle), Lifecycle::Running { .. })
    }

    /// Sorted names of the live channels.
    pub fn channel_names(&self) -> Vec<String> {
        self.core.registry.names()
    }

    pub fn stats(&self) -> MuxStats {
        self.core.counters.snapshot()
    }

    fn spawn_pump(
        &self,
        name: &'static str,
        pump: impl FnOnce() + Send + 'static,
    ) -> Result<JoinHandle<()>> {
        thread::Builder::new()
            .name(name.to_string())
            .spawn(pump)
            .map_err(|source| {
                self.core.shutdown(None);
                MuxError::Spawn { name, source }
            })
    }
}

impl Default for Multiplexer {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for Multiplexer {
    fn drop(&mut self) {
        self.core.shutdown(None);
    }
}

impl fmt::Debug for Multiplexer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Multiplexer")
            .field("running", &self.is_running())
            .field("channels", &self.channel_names())
            .finish()
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}
