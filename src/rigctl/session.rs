//! RigctlSession: one TCP connection per command.
//!
//! Every `execute` opens a fresh connection, writes the encoded command,
//! reads a single reply chunk if the command expects one, and tears the
//! connection down again whether or not the exchange succeeded.
//!
//! Pure translation lives in `encode` / `decode`. RigctlSession only handles I/O.

use std::io::{Read, Write};
use std::net::{Shutdown, TcpStream, ToSocketAddrs};
use std::time::Duration;

use crate::domain::{Endpoint, LinkError, LinkResult};

use super::{decode, encode, RigctlCommand, RigctlReply};

/// Reply buffer size; one byte is held back so a reply never exceeds 127 bytes
const REPLY_BUF_SIZE: usize = 128;

/// Floor for the connect/read timeout; `connect_timeout` rejects zero
const MIN_TIMEOUT: Duration = Duration::from_millis(1);

/// Talks to one daemon endpoint.
pub struct RigctlSession {
    endpoint: Endpoint,
    timeout: Duration,
    exchanges: u64,
}

impl RigctlSession {
    pub fn new(endpoint: Endpoint, timeout: Duration) -> Self {
        Self {
            endpoint,
            timeout: timeout.max(MIN_TIMEOUT),
            exchanges: 0,
        }
    }

    pub fn endpoint(&self) -> &Endpoint {
        &self.endpoint
    }

    /// Number of completed connect/write cycles, successful or not
    pub fn exchanges(&self) -> u64 {
        self.exchanges
    }

    /// Send a command and return the parsed reply.
    pub fn execute(&mut self, cmd: &RigctlCommand) -> LinkResult<RigctlReply> {
        let wire = encode(cmd);
        log::debug!(
            "rigctld TX {}: {:?} ({} bytes)",
            self.endpoint,
            String::from_utf8_lossy(&wire),
            wire.len()
        );

        let mut stream = self.connect()?;
        let raw = Self::transact(&mut stream, &wire, cmd.expects_reply());
        // Close unconditionally, even after a failed write or read
        let _ = stream.shutdown(Shutdown::Both);
        self.exchanges += 1;
        let raw = raw?;

        if cmd.expects_reply() {
            log::debug!("rigctld RX {}: {:?}", self.endpoint, raw);
        }

        decode(&raw, cmd)
    }

    fn connect(&self) -> LinkResult<TcpStream> {
        let addrs = (self.endpoint.host.as_str(), self.endpoint.port)
            .to_socket_addrs()
            .map_err(|e| {
                LinkError::Connect(format!("Failed to resolve {}: {e}", self.endpoint))
            })?;

        let mut last_err = None;
        for addr in addrs {
            match TcpStream::connect_timeout(&addr, self.timeout) {
                Ok(stream) => {
                    stream
                        .set_read_timeout(Some(self.timeout))
                        .and_then(|_| stream.set_write_timeout(Some(self.timeout)))
                        .map_err(|e| LinkError::Io(format!("Failed to set timeouts: {e}")))?;
                    return Ok(stream);
                }
                Err(e) => last_err = Some(e),
            }
        }

        Err(LinkError::Connect(match last_err {
            Some(e) => format!("Failed to connect to {}: {e}", self.endpoint),
            None => format!("{} resolved to no addresses", self.endpoint),
        }))
    }

    /// Write the command and, if needed, read one reply chunk.
    fn transact(stream: &mut TcpStream, wire: &[u8], expects_reply: bool) -> LinkResult<String> {
        let written = stream
            .write(wire)
            .map_err(|e| LinkError::Io(format!("Write failed: {e}")))?;
        if written != wire.len() {
            return Err(LinkError::WriteSize {
                written,
                expected: wire.len(),
            });
        }

        if !expects_reply {
            return Ok(String::new());
        }

        let mut buf = [0u8; REPLY_BUF_SIZE];
        let n = stream
            .read(&mut buf[..REPLY_BUF_SIZE - 1])
            .map_err(|e| LinkError::Io(format!("Read failed: {e}")))?;
        if n == 0 {
            return Err(LinkError::Protocol("Got 0 bytes from daemon".to_string()));
        }

        Ok(String::from_utf8_lossy(&buf[..n]).into_owned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::TcpListener;
    use std::thread;

    /// Accept one connection, record what was written, answer with `reply`.
    fn one_shot_daemon(reply: &'static [u8]) -> (Endpoint, thread::JoinHandle<Vec<u8>>) {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let port = listener.local_addr().unwrap().port();
        let handle = thread::spawn(move || {
            let (mut conn, _) = listener.accept().unwrap();
            let mut buf = [0u8; 64];
            let n = conn.read(&mut buf).unwrap();
            if !reply.is_empty() {
                conn.write_all(reply).unwrap();
            }
            buf[..n].to_vec()
        });
        (Endpoint::new("127.0.0.1", port), handle)
    }

    #[test]
    fn get_freq_round_trip() {
        let (endpoint, daemon) = one_shot_daemon(b"145890000\n");
        let mut session = RigctlSession::new(endpoint, Duration::from_secs(2));
        let reply = session.execute(&RigctlCommand::GetFreq).unwrap();
        assert_eq!(reply, RigctlReply::FrequencyHz(145_890_000.0));
        assert_eq!(daemon.join().unwrap(), b"f");
        assert_eq!(session.exchanges(), 1);
    }

    #[test]
    fn set_freq_does_not_wait_for_reply() {
        let (endpoint, daemon) = one_shot_daemon(b"");
        let mut session = RigctlSession::new(endpoint, Duration::from_secs(2));
        let reply = session.execute(&RigctlCommand::SetFreq(145_000_000.0)).unwrap();
        assert_eq!(reply, RigctlReply::Sent);
        assert_eq!(daemon.join().unwrap(), b"F  145000000");
    }

    #[test]
    fn connection_refused_is_connect_error() {
        // Bind and immediately drop to get a port nobody listens on
        let port = TcpListener::bind("127.0.0.1:0")
            .unwrap()
            .local_addr()
            .unwrap()
            .port();
        let mut session =
            RigctlSession::new(Endpoint::new("127.0.0.1", port), Duration::from_millis(500));
        let err = session.execute(&RigctlCommand::GetFreq).unwrap_err();
        assert!(matches!(err, LinkError::Connect(_)), "got {err:?}");
        assert_eq!(session.exchanges(), 0);
    }

    #[test]
    fn zero_byte_reply_is_protocol_error() {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let port = listener.local_addr().unwrap().port();
        let daemon = thread::spawn(move || {
            let (mut conn, _) = listener.accept().unwrap();
            let mut buf = [0u8; 8];
            let _ = conn.read(&mut buf);
            // Close without answering
        });
        let mut session =
            RigctlSession::new(Endpoint::new("127.0.0.1", port), Duration::from_secs(2));
        let err = session.execute(&RigctlCommand::GetPtt).unwrap_err();
        daemon.join().unwrap();
        assert!(matches!(err, LinkError::Protocol(_)), "got {err:?}");
    }
}
