//! Blocking request/response channel to one scan-engine node.
//!
//! One channel carries one outstanding request at a time: parallel splits
//! take one channel each or serialize explicitly. The transport frames both
//! directions with a `u64` little-endian byte-length prefix; the protocol
//! has no cancellation message, so a sent request is always waited out (or
//! timed out by the socket deadlines).

use std::io::{Read, Write};
use std::net::TcpStream;
#[cfg(unix)]
use std::os::unix::net::UnixStream;
use std::time::Duration;

use varve_common::{Result, ScanConfig, VarveError};

/// One blocking round trip: request bytes out, reply bytes back.
pub trait ReqChannel: Send {
    fn send(&mut self, request: &[u8]) -> Result<Vec<u8>>;
}

/// Hard ceiling on a framed reply; a length beyond this is corruption, not
/// data.
const MAX_REPLY_BYTES: u64 = 1 << 32;

#[derive(Debug)]
enum Stream {
    Tcp(TcpStream),
    #[cfg(unix)]
    Unix(UnixStream),
}

/// `ReqChannel` over a `tcp://host:port` or `ipc:///path` endpoint.
#[derive(Debug)]
pub struct EngineChannel {
    stream: Stream,
    address: String,
}

impl EngineChannel {
    /// Connects and applies the send/receive socket deadlines.
    ///
    /// # Errors
    /// [`VarveError::InvalidConfig`] for an unrecognized URL scheme;
    /// [`VarveError::Transport`] when the endpoint cannot be reached.
    pub fn connect(url: &str, send_timeout: Duration, recv_timeout: Duration) -> Result<Self> {
        let stream = if let Some(addr) = url.strip_prefix("tcp://") {
            let stream = TcpStream::connect(addr)
                .map_err(|e| VarveError::Transport(format!("connect {url}: {e}")))?;
            stream.set_write_timeout(Some(send_timeout))?;
            stream.set_read_timeout(Some(recv_timeout))?;
            stream.set_nodelay(true)?;
            Stream::Tcp(stream)
        } else if let Some(path) = url.strip_prefix("ipc://") {
            #[cfg(unix)]
            {
                let stream = UnixStream::connect(path)
                    .map_err(|e| VarveError::Transport(format!("connect {url}: {e}")))?;
                stream.set_write_timeout(Some(send_timeout))?;
                stream.set_read_timeout(Some(recv_timeout))?;
                Stream::Unix(stream)
            }
            #[cfg(not(unix))]
            {
                let _ = path;
                return Err(VarveError::InvalidConfig(format!(
                    "ipc endpoints are unix-only: {url}"
                )));
            }
        } else {
            return Err(VarveError::InvalidConfig(format!(
                "engine url must start with tcp:// or ipc://: {url}"
            )));
        };
        Ok(Self {
            stream,
            address: url.to_string(),
        })
    }

    pub fn from_config(config: &ScanConfig) -> Result<Self> {
        Self::connect(&config.engine_url, config.send_timeout, config.recv_timeout)
    }

    pub fn address(&self) -> &str {
        &self.address
    }

    fn io(&mut self) -> &mut dyn ReadWrite {
        match &mut self.stream {
            Stream::Tcp(s) => s,
            #[cfg(unix)]
            Stream::Unix(s) => s,
        }
    }
}

trait ReadWrite: Read + Write {}
impl<T: Read + Write> ReadWrite for T {}

impl ReqChannel for EngineChannel {
    fn send(&mut self, request: &[u8]) -> Result<Vec<u8>> {
        let io = self.io();
        io.write_all(&(request.len() as u64).to_le_bytes())?;
        io.write_all(request)?;
        io.flush()?;

        let mut len = [0u8; 8];
        io.read_exact(&mut len)?;
        let len = u64::from_le_bytes(len);
        if len > MAX_REPLY_BYTES {
            return Err(VarveError::Transport(format!(
                "reply frame of {len} bytes exceeds the {MAX_REPLY_BYTES} byte limit"
            )));
        }
        let mut reply = vec![0u8; len as usize];
        io.read_exact(&mut reply)?;
        Ok(reply)
    }
}

#[cfg(test)]
mod tests {
    use std::io::{Read, Write};
    use std::net::TcpListener;
    use std::time::Duration;

    use varve_common::VarveError;

    use super::{EngineChannel, ReqChannel};

    const TIMEOUT: Duration = Duration::from_secs(5);

    #[test]
    fn unknown_scheme_is_invalid_config() {
        let err = EngineChannel::connect("http://localhost:1", TIMEOUT, TIMEOUT).unwrap_err();
        assert!(matches!(err, VarveError::InvalidConfig(_)));
    }

    #[test]
    fn unreachable_endpoint_is_a_transport_error() {
        // Port 1 is reserved and closed in practice.
        let err = EngineChannel::connect("tcp://127.0.0.1:1", TIMEOUT, TIMEOUT).unwrap_err();
        assert!(matches!(err, VarveError::Transport(_)));
    }

    #[test]
    fn round_trip_frames_both_directions() {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        let server = std::thread::spawn(move || {
            let (mut conn, _) = listener.accept().unwrap();
            let mut len = [0u8; 8];
            conn.read_exact(&mut len).unwrap();
            let mut request = vec![0u8; u64::from_le_bytes(len) as usize];
            conn.read_exact(&mut request).unwrap();

            let reply: Vec<u8> = request.iter().rev().copied().collect();
            conn.write_all(&(reply.len() as u64).to_le_bytes()).unwrap();
            conn.write_all(&reply).unwrap();
            request
        });

        let mut channel =
            EngineChannel::connect(&format!("tcp://{addr}"), TIMEOUT, TIMEOUT).unwrap();
        let reply = channel.send(&[1, 2, 3, 4]).unwrap();
        assert_eq!(reply, vec![4, 3, 2, 1]);
        assert_eq!(server.join().unwrap(), vec![1, 2, 3, 4]);
    }

    #[test]
    fn truncated_reply_is_an_io_error() {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        let server = std::thread::spawn(move || {
            let (mut conn, _) = listener.accept().unwrap();
            let mut len = [0u8; 8];
            conn.read_exact(&mut len).unwrap();
            let mut request = vec![0u8; u64::from_le_bytes(len) as usize];
            conn.read_exact(&mut request).unwrap();
            // Promise 100 bytes, deliver 3, hang up.
            conn.write_all(&100u64.to_le_bytes()).unwrap();
            conn.write_all(&[1, 2, 3]).unwrap();
        });

        let mut channel =
            EngineChannel::connect(&format!("tcp://{addr}"), TIMEOUT, TIMEOUT).unwrap();
        let err = channel.send(&[0]).unwrap_err();
        assert!(matches!(err, VarveError::Io(_)));
        server.join().unwrap();
    }

    #[test]
    fn absurd_reply_length_is_rejected_before_allocation() {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        let server = std::thread::spawn(move || {
            let (mut conn, _) = listener.accept().unwrap();
            let mut len = [0u8; 8];
            conn.read_exact(&mut len).unwrap();
            let mut request = vec![0u8; u64::from_le_bytes(len) as usize];
            conn.read_exact(&mut request).unwrap();
            conn.write_all(&u64::MAX.to_le_bytes()).unwrap();
        });

        let mut channel =
            EngineChannel::connect(&format!("tcp://{addr}"), TIMEOUT, TIMEOUT).unwrap();
        let err = channel.send(&[0]).unwrap_err();
        assert!(matches!(err, VarveError::Transport(_)));
        server.join().unwrap();
    }
}
