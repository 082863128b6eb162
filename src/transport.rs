use std::io::{self, ErrorKind};
use std::net::{SocketAddr, ToSocketAddrs, UdpSocket};
use std::time::{Duration, Instant};

use crate::common::Target;
use crate::errors::*;
use crate::util::*;

/// Large enough for any reply a server sends to a query.
const MAX_DATAGRAM_SIZE: usize = 65_535;

/// Something that can perform one request/reply exchange.
///
/// [crate::query_with] drives the pipeline through this, so tests and
/// callers can swap the network for something else.
pub trait Transport {
    /// Sends the request for `opcode` and returns the whole reply, header included.
    fn exchange(&self, target: &Target, opcode: Opcode) -> Result<Vec<u8>>;
}

/// Opens a fresh [Session] for every exchange.
#[derive(Debug, Default, Clone, Copy)]
pub struct UdpTransport;

impl Transport for UdpTransport {
    fn exchange(&self, target: &Target, opcode: Opcode) -> Result<Vec<u8>> {
        Session::open(target)?.exchange(opcode)
    }
}

/// One ephemeral socket used for exactly one exchange.
///
/// The exchange consumes the session, so the socket is closed when it
/// returns no matter how it ended.
#[derive(Debug)]
pub struct Session<'a> {
    target: &'a Target,
    addr: SocketAddr,
    sock: UdpSocket,
}

impl<'a> Session<'a> {
    /// Resolves the target and binds a local socket.
    pub fn open(target: &'a Target) -> Result<Session<'a>> {
        let addr = (target.host.as_str(), target.port)
            .to_socket_addrs()
            .map_err(RequestError::SendFailed)?
            .find(|a| a.is_ipv4())
            .ok_or_else(|| {
                RequestError::SendFailed(io::Error::new(
                    ErrorKind::NotFound,
                    format!("unable to resolve '{}' to an ipv4 address", target.host),
                ))
            })?;

        let sock = UdpSocket::bind("0.0.0.0:0").map_err(RequestError::SendFailed)?;
        sock.set_read_timeout(Some(target.timeout))
            .map_err(RequestError::SendFailed)?;

        Ok(Session { target, addr, sock })
    }

    pub fn local_addr(&self) -> io::Result<SocketAddr> {
        self.sock.local_addr()
    }

    /// Sends the request for `opcode` and waits for one reply or the timeout.
    pub fn exchange(self, opcode: Opcode) -> Result<Vec<u8>> {
        let buf = create_packet(self.target, opcode);
        self.send(&buf)?;
        self.recv()
    }

    /// Sends a ping and returns the round trip time.
    pub fn ping(self) -> Result<Duration> {
        let (buf, challenge) = create_ping_packet(self.target);
        let start = Instant::now();
        self.send(&buf)?;
        let data = self.recv()?;
        let elapsed = start.elapsed();
        crate::parser::check_ping(&data, &challenge)?;
        Ok(elapsed)
    }

    fn send(&self, buf: &[u8]) -> Result<()> {
        let sent = self
            .sock
            .send_to(buf, self.addr)
            .map_err(RequestError::SendFailed)?;

        log::debug!("sent {} bytes to {}", sent, self.addr);
        if sent != buf.len() {
            log::warn!(
                "bytes sent ({}) not equal to buffer size ({})!",
                sent,
                buf.len()
            );
        }
        Ok(())
    }

    fn recv(&self) -> Result<Vec<u8>> {
        let mut data = vec![0; MAX_DATAGRAM_SIZE];
        let (len, from) = match self.sock.recv_from(&mut data) {
            Ok(res) => res,
            Err(e) if e.kind() == ErrorKind::WouldBlock || e.kind() == ErrorKind::TimedOut => {
                log::debug!("no reply from {} within {:?}", self.addr, self.target.timeout);
                return Err(RequestError::Timeout(self.target.timeout));
            }
            Err(e) => return Err(RequestError::Receive(e)),
        };

        log::debug!("received {} bytes from {}", len, from);
        if len < HEADER_SIZE {
            return Err(RequestError::TruncatedHeader { len });
        }
        data.truncate(len);
        Ok(data)
    }
}
