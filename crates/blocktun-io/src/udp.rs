//! UDP トランスポートのアダプター

use std::io;
use std::net::{SocketAddr, UdpSocket};

use crate::stream::{short_write, StreamError, StreamErrorKind, TransportStream};

/// 接続済み UDP ソケットをトランスポートとして使う
///
/// 相手のポートが閉じていると ICMP port unreachable により
/// `ConnectionRefused` が返る。これは一時的なものとして扱う。
#[derive(Debug)]
pub struct UdpTransport {
    socket: UdpSocket,
}

impl UdpTransport {
    /// `local` にバインドし、`remote` に接続する
    pub fn connect(local: SocketAddr, remote: SocketAddr) -> io::Result<Self> {
        let socket = UdpSocket::bind(local)?;
        socket.connect(remote)?;
        Ok(UdpTransport { socket })
    }

    /// 接続済みのソケットから生成する
    pub fn from_socket(socket: UdpSocket) -> Self {
        UdpTransport { socket }
    }

    pub fn local_addr(&self) -> io::Result<SocketAddr> {
        self.socket.local_addr()
    }

    /// もう一方の方向用にソケットを複製する
    pub fn try_clone(&self) -> io::Result<Self> {
        Ok(UdpTransport {
            socket: self.socket.try_clone()?,
        })
    }
}

fn classify(err: io::Error) -> StreamError {
    match err.kind() {
        io::ErrorKind::ConnectionRefused => StreamError::new(StreamErrorKind::PeerUnreachable, err),
        _ => StreamError::other(err),
    }
}

impl TransportStream for UdpTransport {
    fn recv_packet(&mut self, buf: &mut [u8]) -> Result<usize, StreamError> {
        loop {
            match self.socket.recv(buf) {
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                result => return result.map_err(classify),
            }
        }
    }

    fn send_packet(&mut self, packet: &[u8]) -> Result<(), StreamError> {
        loop {
            match self.socket.send(packet) {
                Ok(n) if n == packet.len() => return Ok(()),
                Ok(n) => return Err(short_write(n, packet.len())),
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(classify(e)),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn loopback() -> SocketAddr {
        "127.0.0.1:0".parse().unwrap()
    }

    #[test]
    fn test_connection_refused_is_peer_unreachable() {
        let err = classify(io::Error::from(io::ErrorKind::ConnectionRefused));
        assert_eq!(err.kind(), StreamErrorKind::PeerUnreachable);

        let err = classify(io::Error::from(io::ErrorKind::AddrNotAvailable));
        assert_eq!(err.kind(), StreamErrorKind::Other);
    }

    #[test]
    fn test_loopback_exchange() {
        let a = UdpSocket::bind(loopback()).unwrap();
        let b = UdpSocket::bind(loopback()).unwrap();
        a.connect(b.local_addr().unwrap()).unwrap();
        b.connect(a.local_addr().unwrap()).unwrap();

        let mut ta = UdpTransport::from_socket(a);
        let mut tb = UdpTransport::from_socket(b).try_clone().unwrap();

        ta.send_packet(&[0x5Au8; 48]).unwrap();
        let mut buf = [0u8; 64];
        assert_eq!(tb.recv_packet(&mut buf).unwrap(), 48);
        assert_eq!(&buf[..48], &[0x5Au8; 48]);
    }
}
