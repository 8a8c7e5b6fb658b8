use std::io;

use chanmux_frame::FrameError;

use crate::handle::Direction;

/// Errors that can occur in multiplexer operations.
#[derive(Debug, thiserror::Error)]
pub enum MuxError {
    /// The channel name is empty, too long, or not ASCII.
    #[error("invalid channel name {name:?}: {reason}")]
    InvalidChannelName { name: String, reason: &'static str },

    /// A live channel already uses this name.
    #[error("channel {0:?} already exists")]
    DuplicateChannel(String),

    /// An inbound frame named a channel that cannot receive it.
    #[error("no receiving channel named {0:?}")]
    UnknownChannel(String),

    /// The channel's buffer was closed while writing to it.
    #[error("channel {0:?} is closed")]
    ClosedBuffer(String),

    /// The shared connection failed or reached EOF.
    #[error("connection lost: {reason}")]
    ConnectionLost { reason: String },

    /// The operation is not available for the channel's direction.
    #[error("channel {channel:?} is {direction} and cannot {operation}")]
    WrongDirection {
        channel: String,
        direction: Direction,
        operation: &'static str,
    },

    /// `start` was called on a running multiplexer.
    #[error("multiplexer already started")]
    AlreadyStarted,

    /// The multiplexer has been stopped.
    #[error("multiplexer stopped")]
    Stopped,

    /// A pump thread could not be spawned.
    #[error("failed to spawn {name} thread: {source}")]
    Spawn {
        name: &'static str,
        #[source]
        source: io::Error,
    },

    /// The configuration is not usable.
    #[error("invalid configuration: {0}")]
    InvalidConfig(&'static str),

    /// Frame-level error.
    #[error("frame error: {0}")]
    Frame(FrameError),

    /// Transport-level error.
    #[error("transport error: {0}")]
    Transport(#[from] chanmux_transport::TransportError),
}

impl From<FrameError> for MuxError {
    fn from(err: FrameError) -> Self {
        match err {
            FrameError::InvalidChannelName { name, reason } => {
                MuxError::InvalidChannelName { name, reason }
            }
            other => MuxError::Frame(other),
        }
    }
}

impl From<MuxError> for io::Error {
    fn from(err: MuxError) -> Self {
        let kind = match &err {
            MuxError::ClosedBuffer(_) => io::ErrorKind::BrokenPipe,
            MuxError::ConnectionLost { .. } | MuxError::Stopped => io::ErrorKind::ConnectionAborted,
            MuxError::InvalidChannelName { .. }
            | MuxError::WrongDirection { .. }
            | MuxError::InvalidConfig(_) => io::ErrorKind::InvalidInput,
            MuxError::DuplicateChannel(_) => io::ErrorKind::AlreadyExists,
            MuxError::UnknownChannel(_) => io::ErrorKind::NotFound,
            _ => io::ErrorKind::Other,
        };
        io::Error::new(kind, err)
    }
}

pub type Result<T> = std::result::Result<T, MuxError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn invalid_name_frame_error_maps_to_dedicated_variant() {
        let err: MuxError = chanmux_frame::ChannelName::new("").unwrap_err().into();
        assert!(matches!(err, MuxError::InvalidChannelName { .. }));
    }

    #[test]
    fn desync_stays_a_frame_error() {
        let err: MuxError = FrameError::ProtocolDesync { found: [0; 4] }.into();
        assert!(matches!(err, MuxError::Frame(FrameError::ProtocolDesync { .. })));
    }

    #[test]
    fn io_kinds_follow_error_class() {
        let closed: io::Error = MuxError::ClosedBuffer("cmd".into()).into();
        assert_eq!(closed.kind(), io::ErrorKind::BrokenPipe);

        let lost: io::Error = MuxError::ConnectionLost {
            reason: "eof".into(),
        }
        .into();
        assert_eq!(lost.kind(), io::ErrorKind::ConnectionAborted);

        let misuse: io::Error = MuxError::WrongDirection {
            channel: "cmd".into(),
            direction: Direction::ReceiveOnly,
            operation: "write",
        }
        .into();
        assert_eq!(misuse.kind(), io::ErrorKind::InvalidInput);
        assert_eq!(
            misuse.to_string(),
            "channel \"cmd\" is receive-only and cannot write"
        );
    }

    #[test]
    fn unknown_channel_names_the_frame_target() {
        let err = MuxError::UnknownChannel("ghost".into());
        assert_eq!(err.to_string(), "no receiving channel named \"ghost\"");
        assert_eq!(io::Error::from(err).kind(), io::ErrorKind::NotFound);
    }
}
