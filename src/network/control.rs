//! Control-plane loop
//!
//! A single iterative UDP loop: each datagram is decoded, executed and
//! answered before the next one is read.

use std::net::{SocketAddr, UdpSocket};
use std::sync::atomic::{AtomicBool, Ordering};

use bytes::Bytes;

use crate::engine::Engine;
use crate::error::{BoardError, Result};
use crate::protocol::{
    decode_control_request, encode_control_reply, malformed_reply, MAX_CONTROL_DATAGRAM,
};

/// Produce the reply datagram for one request datagram
pub fn handle_datagram(engine: &Engine, datagram: &[u8], peer: SocketAddr) -> Bytes {
    let reply = match decode_control_request(datagram) {
        Ok(request) => {
            if engine.config().verbose {
                tracing::info!("{} from {}", request.kind().verb(), peer);
            }
            tracing::debug!("Request from {}: {:?}", peer, request);
            engine.execute(request)
        }
        Err(e) => {
            tracing::debug!("Malformed datagram from {}: {}", peer, e);
            malformed_reply(datagram)
        }
    };
    encode_control_reply(&reply)
}

/// Serve datagrams until `shutdown` is set
///
/// The socket must have a read timeout so the flag gets polled.
pub fn serve_control(socket: &UdpSocket, engine: &Engine, shutdown: &AtomicBool) -> Result<()> {
    let mut buf = vec![0u8; MAX_CONTROL_DATAGRAM];

    while !shutdown.load(Ordering::Relaxed) {
        let (len, peer) = match socket.recv_from(&mut buf) {
            Ok(received) => received,
            Err(e) => {
                let e = BoardError::from(e);
                if e.is_timeout() {
                    continue;
                }
                // ICMP errors from earlier replies surface here on some systems
                tracing::warn!("Control plane receive failed: {}", e);
                continue;
            }
        };

        let reply = handle_datagram(engine, &buf[..len], peer);
        if let Err(e) = socket.send_to(&reply, peer) {
            tracing::warn!("Failed to reply to {}: {}", peer, e);
        }
    }

    tracing::debug!("Control plane stopped");
    Ok(())
}
