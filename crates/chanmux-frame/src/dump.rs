//! Hex dump rendering for trace logs.

use std::fmt;

const BYTES_PER_LINE: usize = 16;

/// Renders bytes as an offset/hex/ASCII table, 16 bytes per line.
///
/// ```text
/// 00000000  FF 01 FF 01 03 63 6D 64 00 00 00 04 50 49 4E 47  .....cmd....PING
/// ```
///
/// Formatting is lazy, so wrapping a payload costs nothing unless the log
/// line is actually emitted.
pub struct HexDump<'a>(pub &'a [u8]);

impl fmt::Display for HexDump<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (line, chunk) in self.0.chunks(BYTES_PER_LINE).enumerate() {
            if line > 0 {
                f.write_str("\n")?;
            }
            write!(f, "{:08X} ", line * BYTES_PER_LINE)?;
            for byte in chunk {
                write!(f, " {byte:02X}")?;
            }
            for _ in chunk.len()..BYTES_PER_LINE {
                f.write_str("   ")?;
            }
            f.write_str("  ")?;
            for &byte in chunk {
                let shown = if byte.is_ascii_graphic() || byte == b' ' {
                    byte as char
                } else {
                    '.'
                };
                write!(f, "{shown}")?;
            }
        }
        Ok(())
    }
}

impl fmt::Debug for HexDump<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(self, f)
    }
}
