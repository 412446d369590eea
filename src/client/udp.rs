//! Control-plane requester

use std::net::{SocketAddr, ToSocketAddrs, UdpSocket};
use std::time::Duration;

use crate::config::ClientConfig;
use crate::error::{BoardError, Result};
use crate::protocol::{
    decode_control_reply, encode_control_request, ControlReply, Request, MAX_CONTROL_DATAGRAM,
};

/// UDP requester with whole-request retry
pub struct ControlChannel {
    socket: UdpSocket,
    server: SocketAddr,
    attempts: u32,
}

impl ControlChannel {
    /// Bind an ephemeral socket aimed at the configured server
    pub fn connect(config: &ClientConfig) -> Result<Self> {
        let server = resolve(&config.server_addr())?;
        let local = if server.is_ipv4() { "0.0.0.0:0" } else { "[::]:0" };
        let socket = UdpSocket::bind(local)?;
        socket.set_read_timeout(Some(Duration::from_millis(config.timeout_ms.max(1))))?;

        Ok(Self {
            socket,
            server,
            attempts: config.udp_retries.max(1),
        })
    }

    pub fn server_addr(&self) -> SocketAddr {
        self.server
    }

    /// Send `request` and wait for its reply
    ///
    /// Each attempt resends the whole datagram. Datagrams from other
    /// addresses are ignored. Fails with `Timeout` once every attempt has
    /// gone unanswered.
    pub fn request(&self, request: &Request) -> Result<ControlReply> {
        let datagram = encode_control_request(request);
        let mut buf = vec![0u8; MAX_CONTROL_DATAGRAM];

        for attempt in 1..=self.attempts {
            self.socket.send_to(&datagram, self.server)?;

            loop {
                match self.socket.recv_from(&mut buf) {
                    Ok((len, from)) if from == self.server => {
                        return decode_control_reply(&buf[..len], request.kind());
                    }
                    Ok((_, from)) => {
                        tracing::debug!("Ignoring datagram from {}", from);
                    }
                    Err(e) => {
                        let e = BoardError::from(e);
                        if !e.is_timeout() {
                            return Err(e);
                        }
                        tracing::debug!(
                            "{} attempt {}/{} timed out",
                            request.kind().request_code(),
                            attempt,
                            self.attempts
                        );
                        break;
                    }
                }
            }
        }

        Err(BoardError::Timeout)
    }
}

/// Resolve `host:port`, preferring IPv4
pub(crate) fn resolve(addr: &str) -> Result<SocketAddr> {
    let candidates: Vec<SocketAddr> = addr
        .to_socket_addrs()
        .map_err(|e| BoardError::Config(format!("cannot resolve {}: {}", addr, e)))?
        .collect();
    candidates
        .iter()
        .find(|a| a.is_ipv4())
        .or_else(|| candidates.first())
        .copied()
        .ok_or_else(|| BoardError::Config(format!("no address for {}", addr)))
}
