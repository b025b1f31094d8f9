//! stdin reader for raw terminal input.
//!
//! Reads raw bytes on a dedicated thread and forwards them to the async
//! event loop, which owns the [`KeyDecoder`](super::KeyDecoder).

use std::io::{self, Read};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread::{self, JoinHandle};

use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};

/// Messages from the reader thread.
#[derive(Debug)]
pub enum StdinMessage {
    /// Raw bytes from stdin.
    Data(Vec<u8>),
    /// stdin closed or errored.
    Closed,
}

/// Dedicated stdin reader thread.
///
/// The thread blocks in `read`, so stopping only takes effect after the next
/// chunk arrives or stdin closes. Decoding state lives elsewhere, which is why
/// the reader can keep running while a child process owns the terminal.
pub struct StdinReader {
    handle: Option<JoinHandle<()>>,
    running: Arc<AtomicBool>,
}

impl StdinReader {
    /// Spawn the reader thread on the process stdin.
    pub fn spawn() -> io::Result<(Self, UnboundedReceiver<StdinMessage>)> {
        Self::spawn_with(io::stdin())
    }

    /// Spawn the reader thread on an arbitrary byte source.
    pub fn spawn_with<R>(source: R) -> io::Result<(Self, UnboundedReceiver<StdinMessage>)>
    where
        R: Read + Send + 'static,
    {
        let (tx, rx) = mpsc::unbounded_channel();
        let running = Arc::new(AtomicBool::new(true));
        let running_clone = running.clone();

        let handle = thread::Builder::new()
            .name("caroushell-stdin".to_string())
            .spawn(move || Self::read_loop(source, running_clone, tx))?;

        Ok((
            Self {
                handle: Some(handle),
                running,
            },
            rx,
        ))
    }

    fn read_loop<R: Read>(mut source: R, running: Arc<AtomicBool>, tx: UnboundedSender<StdinMessage>) {
        let mut buf = [0u8; 256];

        while running.load(Ordering::SeqCst) {
            match source.read(&mut buf) {
                Ok(0) => {
                    let _ = tx.send(StdinMessage::Closed);
                    break;
                }
                Ok(n) => {
                    if tx.send(StdinMessage::Data(buf[..n].to_vec())).is_err() {
                        break;
                    }
                }
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => {
                    tracing::warn!(error = %e, "stdin read failed");
                    let _ = tx.send(StdinMessage::Closed);
                    break;
                }
            }
        }
    }

    /// Ask the reader thread to stop after its current read.
    pub fn stop(&mut self) {
        self.running.store(false, Ordering::SeqCst);
        // The thread may be parked in read(); it exits with the process.
        self.handle.take();
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }
}

impl Drop for StdinReader {
    fn drop(&mut self) {
        self.stop();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_forwards_chunks_then_closed() {
        let source = io::Cursor::new(b"abc".to_vec());
        let (_reader, mut rx) = StdinReader::spawn_with(source).unwrap();

        let mut data = Vec::new();
        loop {
            match rx.recv().await {
                Some(StdinMessage::Data(bytes)) => data.extend(bytes),
                Some(StdinMessage::Closed) | None => break,
            }
        }
        assert_eq!(data, b"abc");
    }

    #[test]
    fn test_stop_clears_running_flag() {
        let (mut reader, _rx) = StdinReader::spawn_with(io::empty()).unwrap();
        reader.stop();
        assert!(!reader.is_running());
    }
}
