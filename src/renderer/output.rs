//! Output batching.

use std::io::{self, Write};

// =============================================================================
// OutputBuffer
// =============================================================================

/// A buffer that accumulates a whole repaint for one write.
///
/// The terminal only ever sees complete frames: nothing reaches the writer
/// until [`OutputBuffer::flush_to`].
#[derive(Debug, Default)]
pub struct OutputBuffer {
    data: Vec<u8>,
}

impl OutputBuffer {
    pub fn new() -> Self {
        Self {
            data: Vec::with_capacity(4096),
        }
    }

    #[inline]
    pub fn write_str(&mut self, s: &str) {
        self.data.extend_from_slice(s.as_bytes());
    }

    /// Write everything in one call and flush the writer.
    pub fn flush_to<W: Write>(&mut self, writer: &mut W) -> io::Result<()> {
        if self.data.is_empty() {
            return Ok(());
        }
        let result = writer.write_all(&self.data).and_then(|_| writer.flush());
        self.data.clear();
        result
    }
}

impl Write for OutputBuffer {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.data.extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(()) // Buffering only - real flush via flush_to
    }
}
