use std::io::Write;
use std::time::Duration;

use crate::{Port, ReplyReader, Result};

/// Half-duplex request/response channel carrying ASCII command lines.
///
/// There is no queueing: one command is outstanding at a time, which `&mut self` enforces within
/// a thread. Sharing a transport between threads requires wrapping its owner in a lock.
#[derive(Debug)]
pub struct LineTransport<P: Port> {
    port: P,
    reader: ReplyReader,
}

impl<P: Port> LineTransport<P> {
    pub fn new(port: P, reader: ReplyReader) -> LineTransport<P> {
        LineTransport { port, reader }
    }

    pub fn port(&self) -> &P {
        &self.port
    }

    pub fn into_inner(self) -> P {
        self.port
    }

    pub fn send(&mut self, command: &str) -> Result<()> {
        let mut line = command.to_owned();
        if !line.ends_with('\n') {
            line.push('\n');
        }
        log::trace!("send({:?})", line);
        self.port.write_all(line.as_bytes())?;
        self.port.flush()?;
        Ok(())
    }

    pub fn await_line(&mut self, prefix: &str, timeout: Duration) -> Result<String> {
        self.reader.await_line(&mut self.port, prefix, timeout)
    }

    pub fn query(&mut self, command: &str, prefix: &str, timeout: Duration) -> Result<String> {
        self.send(command)?;
        self.await_line(prefix, timeout)
    }

    /// Read one unprompted line, such as the banner sent right after the port opens.
    pub fn read_line(&mut self, timeout: Duration) -> Result<String> {
        self.reader.read_line(&mut self.port, timeout)
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::sys::mock::MockPort;

    fn transport(port: &MockPort) -> LineTransport<MockPort> {
        LineTransport::new(port.clone(),
            ReplyReader::new(Duration::from_millis(1), Duration::from_millis(100)))
    }

    #[test]
    fn test_send_appends_terminator() {
        let port = MockPort::new();
        let mut transport = transport(&port);
        transport.send("SYST:PUL:ENA").unwrap();
        transport.send("SYST:PUL:DIS\n").unwrap();
        assert_eq!(port.written(), b"SYST:PUL:ENA\nSYST:PUL:DIS\n");
        assert_eq!(transport.port().commands(), ["SYST:PUL:ENA", "SYST:PUL:DIS"]);
        assert_eq!(transport.into_inner().written().len(), 26);
    }

    #[test]
    fn test_query() {
        let port = MockPort::new();
        port.respond_with(|command| {
            assert_eq!(command, "SYST:PUL:ENA");
            vec!["Pulser,1\r\n".to_owned()]
        });
        let mut transport = transport(&port);
        let reply = transport.query("SYST:PUL:ENA", "Pulser", Duration::from_secs(1)).unwrap();
        assert_eq!(reply, "Pulser,1");
    }

    #[test]
    fn test_late_reply_ignored_by_next_query() {
        let port = MockPort::new();
        // a late answer to an earlier, timed out SPI command is still in flight
        port.push_chunk(b"SPIRESP,1,0,0,130815\r\n");
        port.respond_with(|_| vec!["Pulser,0\r\n".to_owned()]);
        let mut transport = transport(&port);
        let reply = transport.query("SYST:PUL:DIS", "Pulser", Duration::from_secs(1)).unwrap();
        assert_eq!(reply, "Pulser,0");
    }
}
