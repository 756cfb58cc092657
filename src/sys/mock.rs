//! In-memory port standing in for the firmware in unit tests.

use std::collections::VecDeque;
use std::io::{self, Read, Write};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use crate::Result;

type Responder = Box<dyn FnMut(&str) -> Vec<String> + Send>;

#[derive(Default)]
struct State {
    incoming: VecDeque<Vec<u8>>,
    chatter: Option<Vec<u8>>,
    written: Vec<u8>,
    pending: Vec<u8>,
    commands: Vec<String>,
    timeouts: Vec<Duration>,
    responder: Option<Responder>,
}

#[derive(Clone, Default)]
pub struct MockPort {
    state: Arc<Mutex<State>>,
}

impl MockPort {
    pub fn new() -> MockPort {
        MockPort::default()
    }

    /// Queue bytes to be returned by one `read` call.
    pub fn push_chunk(&self, chunk: &[u8]) {
        self.state.lock().unwrap().incoming.push_back(chunk.to_vec());
    }

    /// Bytes returned by every `read` once the queue is empty.
    pub fn set_chatter(&self, chunk: &[u8]) {
        self.state.lock().unwrap().chatter = Some(chunk.to_vec());
    }

    /// Called with every complete command line written; returned lines are queued as replies.
    pub fn respond_with<F>(&self, responder: F)
            where F: FnMut(&str) -> Vec<String> + Send + 'static {
        self.state.lock().unwrap().responder = Some(Box::new(responder));
    }

    pub fn written(&self) -> Vec<u8> {
        self.state.lock().unwrap().written.clone()
    }

    pub fn commands(&self) -> Vec<String> {
        self.state.lock().unwrap().commands.clone()
    }

    pub fn timeouts(&self) -> Vec<Duration> {
        self.state.lock().unwrap().timeouts.clone()
    }
}

impl Read for MockPort {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let mut state = self.state.lock().unwrap();
        let chunk = match state.incoming.pop_front() {
            Some(chunk) => chunk,
            None => match state.chatter.clone() {
                Some(chatter) => chatter,
                None => return Err(io::Error::new(io::ErrorKind::TimedOut, "no data")),
            }
        };
        let count = chunk.len().min(buf.len());
        buf[..count].copy_from_slice(&chunk[..count]);
        if count < chunk.len() {
            state.incoming.push_front(chunk[count..].to_vec());
        }
        Ok(count)
    }
}

impl Write for MockPort {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let mut state = self.state.lock().unwrap();
        state.written.extend_from_slice(buf);
        state.pending.extend_from_slice(buf);
        while let Some(end) = state.pending.iter().position(|&byte| byte == b'\n') {
            let line: Vec<u8> = state.pending.drain(..=end).collect();
            let command = String::from_utf8_lossy(&line).trim().to_owned();
            state.commands.push(command.clone());
            if let Some(mut responder) = state.responder.take() {
                for reply in responder(&command) {
                    state.incoming.push_back(reply.into_bytes());
                }
                state.responder = Some(responder);
            }
        }
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl super::Port for MockPort {
    fn set_timeout(&mut self, timeout: Duration) -> Result<()> {
        self.state.lock().unwrap().timeouts.push(timeout);
        Ok(())
    }
}
