//! Channel names.
//!
//! A frame carries its channel name inline, prefixed by a single length byte,
//! so a name is 1-255 bytes of ASCII.

use std::borrow::Borrow;
use std::fmt;

use crate::error::{FrameError, Result};

/// Longest channel name a frame can carry.
pub const MAX_NAME_LEN: usize = u8::MAX as usize;

/// A validated channel name.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ChannelName(String);

impl ChannelName {
    /// Validate and wrap a channel name.
    pub fn new(name: impl Into<String>) -> Result<Self> {
        let name = name.into();
        validate(name.as_bytes()).map_err(|reason| FrameError::InvalidChannelName {
            name: name.clone(),
            reason,
        })?;
        Ok(Self(name))
    }

    /// Decode a name received off the wire.
    pub fn from_wire(bytes: &[u8]) -> Result<Self> {
        match validate(bytes) {
            // ASCII was checked, so this cannot fail.
            Ok(()) => Ok(Self(String::from_utf8_lossy(bytes).into_owned())),
            Err(reason) => Err(FrameError::InvalidChannelName {
                name: String::from_utf8_lossy(bytes).into_owned(),
                reason,
            }),
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn as_bytes(&self) -> &[u8] {
        self.0.as_bytes()
    }

    /// Length in bytes, which is what the frame's length byte holds.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Always false; kept for API symmetry with `len`.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn into_string(self) -> String {
        self.0
    }
}

fn validate(bytes: &[u8]) -> std::result::Result<(), &'static str> {
    if bytes.is_empty() {
        return Err("name must not be empty");
    }
    if bytes.len() > MAX_NAME_LEN {
        return Err("name longer than 255 bytes");
    }
    if !bytes.is_ascii() {
        return Err("name must be ASCII");
    }
    Ok(())
}

impl fmt::Display for ChannelName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for ChannelName {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl Borrow<str> for ChannelName {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl TryFrom<&str> for ChannelName {
    type Error = FrameError;

    fn try_from(value: &str) -> Result<Self> {
        Self::new(value)
    }
}

impl TryFrom<String> for ChannelName {
    type Error = FrameError;

    fn try_from(value: String) -> Result<Self> {
        Self::new(value)
    }
}
