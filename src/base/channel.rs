use crate::base::error::{Error, Result};
use crate::internals::{DEFAULT_CHANNEL_TIMEOUT, REPLY_BUFFER_SIZE};
use log::trace;
use std::io::{Read, Write};
use std::net::{Ipv4Addr, SocketAddr, TcpStream};
use std::time::Duration;

/// Timeout knobs for a [`Channel`].
///
/// All three default to 2 seconds. Configuration replies normally arrive
/// well within that; during streaming the receive timeout bounds how long
/// the receiver thread blocks between stop-flag polls.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChannelTimeouts {
    pub connect: Duration,
    pub send: Duration,
    pub recv: Duration,
}

impl Default for ChannelTimeouts {
    fn default() -> ChannelTimeouts {
        ChannelTimeouts {
            connect: DEFAULT_CHANNEL_TIMEOUT,
            send: DEFAULT_CHANNEL_TIMEOUT,
            recv: DEFAULT_CHANNEL_TIMEOUT,
        }
    }
}

/// Blocking TCP connection to a sensor's SOPAS port.
///
/// The channel does no buffering and knows nothing about telegrams; it
/// moves bytes with per-direction timeouts. Framing and classification
/// happen in the layers above.
#[derive(Debug)]
pub struct Channel {
    stream: TcpStream,
    peer: SocketAddr,
}

impl Channel {
    /// Connects with the default timeouts.
    pub fn connect(sensor_ip: &str, port: u16) -> Result<Channel> {
        Channel::connect_with_timeouts(sensor_ip, port, ChannelTimeouts::default())
    }

    /// Connects to `sensor_ip:port` with explicit timeouts.
    ///
    /// Connection failures are reported as `CustomError`.
    pub fn connect_with_timeouts(
        sensor_ip: &str,
        port: u16,
        timeouts: ChannelTimeouts,
    ) -> Result<Channel> {
        let addr: Ipv4Addr = sensor_ip
            .parse()
            .map_err(|_| Error::custom(format!("invalid sensor address: {:?}", sensor_ip)))?;
        let peer = SocketAddr::from((addr, port));
        let stream = TcpStream::connect_timeout(&peer, timeouts.connect)
            .map_err(|e| Error::custom(format!("unable to connect to {}: {}", peer, e)))?;
        stream
            .set_read_timeout(Some(timeouts.recv))
            .map_err(|e| Error::custom(format!("unable to set receive timeout: {}", e)))?;
        stream
            .set_write_timeout(Some(timeouts.send))
            .map_err(|e| Error::custom(format!("unable to set send timeout: {}", e)))?;
        Ok(Channel { stream, peer })
    }

    /// The sensor's address.
    pub fn peer(&self) -> SocketAddr {
        self.peer
    }

    /// Sends one complete frame.
    pub fn send(&mut self, data: &[u8]) -> Result<()> {
        trace!("send {} bytes to {}", data.len(), self.peer);
        self.stream.write_all(data).map_err(Error::SocketSend)?;
        self.stream.flush().map_err(Error::SocketSend)
    }

    /// Receives up to `buf.len()` bytes. A count of 0 means the peer
    /// closed the connection; timeouts surface as `SocketRecv`.
    pub fn recv(&mut self, buf: &mut [u8]) -> Result<usize> {
        let n = self.stream.read(buf).map_err(Error::SocketRecv)?;
        trace!("recv {} bytes from {}", n, self.peer);
        Ok(n)
    }

    /// The request/reply primitive: one send, one receive.
    ///
    /// Configuration replies are short and arrive in a single segment,
    /// so a single read suffices while exactly one command is in flight.
    pub fn invoke(&mut self, frame: &[u8]) -> Result<Vec<u8>> {
        self.send(frame)?;
        let mut buf = vec![0u8; REPLY_BUFFER_SIZE];
        let n = self.recv(&mut buf)?;
        buf.truncate(n);
        Ok(buf)
    }

    /// Duplicates the channel handle so the receiver thread can own a
    /// reader while the driver keeps the original.
    pub fn try_clone(&self) -> Result<Channel> {
        let stream = self
            .stream
            .try_clone()
            .map_err(|e| Error::custom(format!("unable to clone stream: {}", e)))?;
        Ok(Channel {
            stream,
            peer: self.peer,
        })
    }

    /// Re-arms the receive timeout.
    pub fn set_recv_timeout(&mut self, timeout: Duration) -> Result<()> {
        self.stream
            .set_read_timeout(Some(timeout))
            .map_err(|e| Error::custom(format!("unable to set receive timeout: {}", e)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::TcpListener;
    use std::thread;

    #[test]
    fn connect_send_recv_roundtrip() {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();

        let peer = thread::spawn(move || {
            let (mut stream, _) = listener.accept().unwrap();
            let mut buf = [0u8; 16];
            let n = stream.read(&mut buf).unwrap();
            stream.write_all(&buf[..n]).unwrap();
        });

        let mut channel = Channel::connect(&addr.ip().to_string(), addr.port()).unwrap();
        let reply = channel.invoke(b"\x02sMN Run\x03").unwrap();
        assert_eq!(reply, b"\x02sMN Run\x03");
        peer.join().unwrap();
    }

    #[test]
    fn recv_times_out() {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        let timeouts = ChannelTimeouts {
            recv: Duration::from_millis(50),
            ..ChannelTimeouts::default()
        };

        let mut channel =
            Channel::connect_with_timeouts(&addr.ip().to_string(), addr.port(), timeouts).unwrap();
        let (_held, _) = listener.accept().unwrap();

        let mut buf = [0u8; 16];
        match channel.recv(&mut buf) {
            Err(Error::SocketRecv(_)) => {}
            other => panic!("expected SocketRecv timeout, got {:?}", other),
        }
    }

    #[test]
    fn connect_failure_is_custom_error() {
        // a port nothing listens on, with a short deadline
        let timeouts = ChannelTimeouts {
            connect: Duration::from_millis(100),
            ..ChannelTimeouts::default()
        };
        match Channel::connect_with_timeouts("127.0.0.1", 1, timeouts) {
            Err(Error::CustomError { .. }) => {}
            other => panic!("expected CustomError, got {:?}", other),
        }
    }
}
