use std::io::Read;
use std::sync::mpsc::{Receiver, channel};
use std::thread;

/// Spawn a background thread that drains the PTY master.
///
/// Chunks are forwarded over the returned channel; the sender is dropped on
/// end-of-stream, so a hung-up channel is how callers observe that the child
/// has terminated. A read error counts as end-of-stream too: Linux reports
/// EIO on the master once the slave side is gone.
pub fn spawn_reader<R: Read + Send + 'static>(mut reader: R) -> Receiver<Vec<u8>> {
    let (tx, rx) = channel();

    thread::spawn(move || {
        let mut chunk = [0u8; 4096];
        loop {
            match reader.read(&mut chunk) {
                Ok(0) | Err(_) => break,
                Ok(n) => {
                    if tx.send(chunk[..n].to_vec()).is_err() {
                        break; // Receiver dropped
                    }
                }
            }
        }
    });

    rx
}
