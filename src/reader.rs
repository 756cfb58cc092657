//! Line framing for replies coming back from the firmware.

use std::io::{self, Read};
use std::thread::sleep;
use std::time::{Duration, Instant};

use crate::{Error, Port, Result};

const READ_CHUNK: usize = 512;
const MAX_LINE: usize = 4096;

/// Accumulates bytes from a port and hands out complete lines.
///
/// The byte buffer outlives individual calls: a line may arrive split across several reads, and
/// bytes following a matched line stay buffered for the next call.
#[derive(Debug)]
pub struct ReplyReader {
    buffer: Vec<u8>,
    poll_interval: Duration,
    max_read_timeout: Duration,
}

impl ReplyReader {
    pub fn new(poll_interval: Duration, max_read_timeout: Duration) -> ReplyReader {
        ReplyReader {
            buffer: Vec::new(),
            poll_interval,
            max_read_timeout,
        }
    }

    /// Number of bytes received but not yet consumed as part of a line.
    pub fn buffered(&self) -> usize {
        self.buffer.len()
    }

    /// Wait for the first line starting with `prefix`.
    ///
    /// Lines that do not start with `prefix` are unsolicited output (firmware diagnostics, late
    /// replies to earlier commands) and are logged and dropped. The timeout is measured from the
    /// start of the call, so a port that keeps producing unrelated lines cannot extend the wait.
    pub fn await_line<P: Port + ?Sized>(&mut self, port: &mut P, prefix: &str, timeout: Duration)
            -> Result<String> {
        let start = Instant::now();
        loop {
            while let Some(line) = self.take_line() {
                if line.starts_with(prefix) {
                    log::info!("answer {:?}, took {:?}", line, start.elapsed());
                    return Ok(line)
                }
                log::debug!("discarding unsolicited line {:?} while waiting for {:?}", line, prefix);
            }

            let elapsed = start.elapsed();
            if elapsed > timeout {
                return Err(Error::Timeout { expected: prefix.to_owned(), elapsed })
            }
            self.fill(port, timeout - elapsed)?;
        }
    }

    /// Read up to and including the first line terminator, or until `timeout` elapses.
    ///
    /// Unlike `await_line`, running out of time is not an error: whatever has been received so
    /// far (possibly nothing) is returned as the line.
    pub fn read_line<P: Port + ?Sized>(&mut self, port: &mut P, timeout: Duration)
            -> Result<String> {
        let start = Instant::now();
        loop {
            if let Some(line) = self.take_line() {
                return Ok(line)
            }
            let elapsed = start.elapsed();
            if elapsed > timeout {
                let partial = decode_line(&self.buffer);
                self.buffer.clear();
                log::debug!("read_line() timed out with {:?}", partial);
                return Ok(partial)
            }
            self.fill(port, timeout - elapsed)?;
        }
    }

    fn take_line(&mut self) -> Option<String> {
        let end = self.buffer.iter().position(|&byte| byte == b'\n')?;
        let raw: Vec<u8> = self.buffer.drain(..=end).collect();
        let line = decode_line(&raw[..end]);
        log::trace!("line {:?}", line);
        Some(line)
    }

    // Called only once every complete line has been taken, so the buffer holds no terminator.
    fn fill<P: Port + ?Sized>(&mut self, port: &mut P, remaining: Duration) -> Result<()> {
        if self.buffer.len() >= MAX_LINE {
            log::warn!("discarding {} bytes received without a line terminator", self.buffer.len());
            self.buffer.clear();
        }
        port.set_timeout(remaining.min(self.max_read_timeout))?;
        let mut chunk = [0u8; READ_CHUNK];
        match port.read(&mut chunk) {
            Ok(0) => {
                sleep(self.poll_interval);
            }
            Ok(count) => {
                log::trace!("read({:02x?})", &chunk[..count]);
                self.buffer.extend_from_slice(&chunk[..count]);
            }
            Err(error) if is_no_data(&error) => {
                sleep(self.poll_interval);
            }
            Err(error) => return Err(error.into()),
        }
        Ok(())
    }
}

fn is_no_data(error: &io::Error) -> bool {
    matches!(error.kind(),
        io::ErrorKind::TimedOut | io::ErrorKind::WouldBlock | io::ErrorKind::Interrupted)
}

// Non-ASCII bytes are line noise from the link (e.g. a reset in progress) and are dropped.
fn decode_line(raw: &[u8]) -> String {
    raw.iter()
        .filter(|byte| byte.is_ascii())
        .map(|&byte| byte as char)
        .collect::<String>()
        .trim()
        .to_owned()
}
