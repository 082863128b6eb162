use bytes::{BufMut, BytesMut};
use rand::Rng;

use crate::common::Target;

/// Protocol identifier every request starts with.
pub const MAGIC: &[u8; 4] = b"SAMP";
/// Size of the header echoed back at the start of each reply.
pub const HEADER_SIZE: usize = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Opcode {
    Info,
    Rules,
    Players,
    Ping,
}

impl Opcode {
    pub fn value(&self) -> u8 {
        match self {
            Opcode::Info => b'i',
            Opcode::Rules => b'r',
            Opcode::Players => b'd',
            Opcode::Ping => b'p',
        }
    }
}

impl std::cmp::PartialEq<u8> for Opcode {
    fn eq(&self, other: &u8) -> bool {
        *other == self.value()
    }
}

/// Turns a dotted quad into its four octets.
///
/// Parts that don't start with digits become 0 and values over 255 are
/// truncated, whatever the caller passed goes on the wire.
fn host_octets(host: &str) -> [u8; 4] {
    let mut octets = [0u8; 4];
    for (octet, part) in octets.iter_mut().zip(host.split('.')) {
        let digits = part
            .trim()
            .bytes()
            .take_while(|b| b.is_ascii_digit())
            .fold(0u32, |acc, b| acc.wrapping_mul(10).wrapping_add((b - b'0') as u32));
        *octet = digits as u8;
    }
    octets
}

/// Builds the 11 byte request for `opcode`.
pub fn create_packet(target: &Target, opcode: Opcode) -> BytesMut {
    let mut buf = BytesMut::with_capacity(HEADER_SIZE + 1);
    buf.put(&MAGIC[..]);
    buf.put(&host_octets(&target.host)[..]);
    buf.put_u16_le(target.port);
    buf.put_u8(opcode.value());
    buf
}

/// Builds a ping request, returns it with the random challenge the server has to echo.
pub fn create_ping_packet(target: &Target) -> (BytesMut, [u8; 4]) {
    let challenge = rand::thread_rng().gen::<[u8; 4]>();
    let mut buf = create_packet(target, Opcode::Ping);
    buf.put(&challenge[..]);
    (buf, challenge)
}
