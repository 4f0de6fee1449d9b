//! Pseudo-terminal-backed session around a single child process.
//!
//! [`PtySession`] is the byte-oriented channel the test engine drives: it
//! spawns the shell under test on the slave side of a pty, drains the master
//! side through a background reader thread, and exposes the one blocking
//! primitive the prompt protocol needs: [`PtySession::expect`], which resolves
//! to a three-way [`ExpectResult`] instead of raising on timeout or EOF.

use crate::pty_reader::spawn_reader;
use anyhow::{Context, Result};
use portable_pty::{Child, CommandBuilder, ExitStatus, MasterPty, PtySize};
use std::io::Write;
use std::sync::mpsc::{Receiver, TryRecvError};
use std::time::{Duration, Instant};
use tracing::debug;

/// How often `expect` re-checks the output channel.
const POLL_INTERVAL: Duration = Duration::from_millis(10);

/// How long `close` waits for the child to die after each signal.
const GRACE_WINDOW: Duration = Duration::from_millis(100);

/// Result of waiting for a pattern on the session channel.
///
/// The three variants are the three semantically distinct things that can
/// happen to a shell under test: it produced the pattern, it went silent, or
/// it went away. Callers classify by exhaustive matching; none of these is an
/// error.
#[derive(Debug, Clone)]
pub enum ExpectResult {
    /// The pattern appeared. Everything read before it is in
    /// [`PtySession::before`]; the match itself has been consumed.
    Matched,
    /// The timeout elapsed while the child was still alive. The unconsumed
    /// buffer is left intact.
    TimedOut,
    /// The channel reached end-of-stream: the child terminated. The exit
    /// status distinguishes a clean zero exit from a crash or fatal signal;
    /// all bytes received before end-of-stream are in [`PtySession::before`].
    Ended(ExitStatus),
}

/// Manages a shell process running inside a PTY.
pub struct PtySession {
    #[allow(dead_code)]
    master: Box<dyn MasterPty + Send>,
    child: Box<dyn Child + Send + Sync>,
    writer: Box<dyn Write + Send>,
    output_rx: Receiver<Vec<u8>>,
    /// Bytes received but not yet consumed by a match.
    buffer: Vec<u8>,
    /// Bytes consumed before the most recent match (or the whole residue on
    /// end-of-stream).
    before: Vec<u8>,
    timeout: Duration,
    exit_status: Option<ExitStatus>,
}

impl PtySession {
    /// Spawn `program` in a fresh PTY.
    ///
    /// With `echo` false the pty's ECHO flag is cleared before the child
    /// starts, so lines sent with [`send_line`](Self::send_line) are not fed
    /// back into the captured output. `timeout` bounds every subsequent
    /// [`expect`](Self::expect) call.
    pub fn spawn(program: &str, args: &[String], echo: bool, timeout: Duration) -> Result<Self> {
        let pty_system = portable_pty::native_pty_system();

        let pty_size = PtySize {
            rows: 24,
            cols: 80,
            pixel_width: 0,
            pixel_height: 0,
        };

        let pair = pty_system.openpty(pty_size).context("Failed to open PTY")?;

        if !echo {
            disable_echo(pair.master.as_ref()).context("Failed to disable PTY echo")?;
        }

        let mut cmd = CommandBuilder::new(program);
        for arg in args {
            cmd.arg(arg);
        }

        let child = pair
            .slave
            .spawn_command(cmd)
            .with_context(|| format!("Failed to spawn '{program}'"))?;

        let writer = pair
            .master
            .take_writer()
            .context("Failed to get PTY writer")?;

        let reader = pair
            .master
            .try_clone_reader()
            .context("Failed to get PTY reader")?;

        debug!(program, pid = ?child.process_id(), "spawned shell under pty");

        Ok(PtySession {
            master: pair.master,
            child,
            writer,
            output_rx: spawn_reader(reader),
            buffer: Vec::new(),
            before: Vec::new(),
            timeout,
            exit_status: None,
        })
    }

    /// Block until `pattern` appears in the output, the timeout elapses, or
    /// the channel ends.
    ///
    /// The search starts at the current read position: bytes already consumed
    /// by a previous match are never re-examined, and leftover unmatched bytes
    /// carry over to the next call.
    pub async fn expect(&mut self, pattern: &regex::bytes::Regex) -> ExpectResult {
        let deadline = tokio::time::Instant::now() + self.timeout;
        loop {
            let eof = self.drain_output();

            if let Some((start, end)) = pattern.find(&self.buffer).map(|m| (m.start(), m.end())) {
                self.before = self.buffer[..start].to_vec();
                self.buffer.drain(..end);
                return ExpectResult::Matched;
            }

            if eof {
                self.before = std::mem::take(&mut self.buffer);
                return ExpectResult::Ended(self.reap());
            }

            if tokio::time::Instant::now() >= deadline {
                return ExpectResult::TimedOut;
            }

            tokio::time::sleep(POLL_INTERVAL).await;
        }
    }

    /// Bytes consumed before the most recent match, or all bytes received
    /// before end-of-stream.
    pub fn before(&self) -> &[u8] {
        &self.before
    }

    /// Write `text` plus a line terminator to the child's stdin.
    ///
    /// Write errors are swallowed: they only occur once the channel is closed,
    /// and a vanished child is reported by the next [`expect`](Self::expect).
    pub fn send_line(&mut self, text: &str) {
        let _ = self
            .writer
            .write_all(text.as_bytes())
            .and_then(|()| self.writer.write_all(b"\n"))
            .and_then(|()| self.writer.flush());
    }

    /// Check whether the child process is still running, without blocking.
    pub fn is_alive(&mut self) -> bool {
        if self.exit_status.is_some() {
            return false;
        }
        match self.child.try_wait() {
            Ok(Some(status)) => {
                self.exit_status = Some(status);
                false
            }
            Ok(None) => true,
            Err(_) => false,
        }
    }

    /// Terminate the child if it is still alive and record its exit status.
    ///
    /// Escalates through SIGHUP and SIGINT, then SIGKILL when `force` is set,
    /// giving the process a short grace window after each signal. Safe to call
    /// repeatedly and on a process that is already dead.
    pub fn close(&mut self, force: bool) {
        if !self.is_alive() {
            return;
        }

        use nix::sys::signal::Signal;
        let escalation: &[Signal] = if force {
            &[Signal::SIGHUP, Signal::SIGINT, Signal::SIGKILL]
        } else {
            &[Signal::SIGHUP, Signal::SIGINT]
        };

        for &sig in escalation {
            if let Some(pid) = self.child.process_id() {
                debug!(pid, signal = ?sig, "terminating shell");
                let _ = nix::sys::signal::kill(nix::unistd::Pid::from_raw(pid as i32), sig);
            }
            if self.reaped_within(GRACE_WINDOW) {
                return;
            }
        }

        if force {
            // No pid or the signals did not land; fall back to the hard kill.
            let _ = self.child.kill();
            if let Ok(status) = self.child.wait() {
                self.exit_status = Some(status);
            }
        }
    }

    /// Poll for the child's exit for up to `window`, reaping it if it dies.
    fn reaped_within(&mut self, window: Duration) -> bool {
        let deadline = Instant::now() + window;
        loop {
            if let Ok(Some(status)) = self.child.try_wait() {
                self.exit_status = Some(status);
                return true;
            }
            if Instant::now() >= deadline {
                return false;
            }
            std::thread::sleep(POLL_INTERVAL);
        }
    }

    /// Wait for the already-ended child and cache its exit status.
    fn reap(&mut self) -> ExitStatus {
        if let Some(status) = &self.exit_status {
            return status.clone();
        }
        let status = self
            .child
            .wait()
            .unwrap_or_else(|_| ExitStatus::with_exit_code(1));
        self.exit_status = Some(status.clone());
        status
    }

    /// Move all pending chunks from the reader thread into the local buffer.
    /// Returns true once the channel has ended (reader saw EOF and hung up).
    fn drain_output(&mut self) -> bool {
        loop {
            match self.output_rx.try_recv() {
                Ok(chunk) => self.buffer.extend_from_slice(&chunk),
                Err(TryRecvError::Empty) => return false,
                Err(TryRecvError::Disconnected) => return true,
            }
        }
    }
}

impl Drop for PtySession {
    fn drop(&mut self) {
        self.close(true);
    }
}

/// Clear the ECHO flag on the pty master so input written to the child is not
/// reflected back on the output side.
fn disable_echo(master: &dyn MasterPty) -> Result<()> {
    use nix::sys::termios::{self, LocalFlags, SetArg};
    use std::os::fd::BorrowedFd;

    let fd = master
        .as_raw_fd()
        .context("PTY master has no file descriptor")?;
    // SAFETY: the raw fd is owned by `master`, which outlives this borrow.
    let fd = unsafe { BorrowedFd::borrow_raw(fd) };
    let mut attrs = termios::tcgetattr(fd)?;
    attrs.local_flags.remove(LocalFlags::ECHO);
    termios::tcsetattr(fd, SetArg::TCSANOW, &attrs)?;
    Ok(())
}
