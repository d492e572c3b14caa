// UDP link to the robot
//
// One non-blocking socket, bound locally and aimed at a fixed remote. The
// foreground sends on it while the telemetry poller receives on it; both
// only need `&self`, so the transport is shared behind an `Arc`.

use std::io::ErrorKind;
use std::net::{SocketAddr, UdpSocket};

use tracing::{debug, info};

use crate::codec;
use crate::config::RECV_BUFFER_SIZE;
use crate::messages::TelemetryMessage;

/// Error types for the robot link
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    #[error("Failed to bind {addr}: {source}")]
    Bind {
        addr: SocketAddr,
        source: std::io::Error,
    },

    #[error("Failed to send to {addr}: {source}")]
    Send {
        addr: SocketAddr,
        source: std::io::Error,
    },

    #[error("Failed to receive: {source}")]
    Receive { source: std::io::Error },
}

pub type Result<T> = std::result::Result<T, TransportError>;

/// Datagram link between this host and the robot
#[derive(Debug)]
pub struct UdpTransport {
    socket: UdpSocket,
    remote: SocketAddr,
}

impl UdpTransport {
    /// Bind `local` in non-blocking mode, targeting `remote`
    pub fn bind(local: SocketAddr, remote: SocketAddr) -> Result<Self> {
        info!("Binding to {}", local);
        let socket = UdpSocket::bind(local).map_err(|source| TransportError::Bind {
            addr: local,
            source,
        })?;
        socket
            .set_nonblocking(true)
            .map_err(|source| TransportError::Bind {
                addr: local,
                source,
            })?;
        Ok(Self { socket, remote })
    }

    pub fn local_addr(&self) -> Option<SocketAddr> {
        self.socket.local_addr().ok()
    }

    pub fn remote_addr(&self) -> SocketAddr {
        self.remote
    }

    /// Fire-and-forget send to the robot
    pub fn send(&self, bytes: &[u8]) -> Result<()> {
        self.socket
            .send_to(bytes, self.remote)
            .map_err(|source| TransportError::Send {
                addr: self.remote,
                source,
            })?;
        debug!("Sent {} bytes to {}", bytes.len(), self.remote);
        Ok(())
    }

    /// Single non-blocking read. `Ok(None)` means nothing is waiting.
    pub fn try_receive(&self) -> Result<Option<TelemetryMessage>> {
        let mut buf = [0u8; RECV_BUFFER_SIZE];
        match self.socket.recv(&mut buf) {
            Ok(len) => {
                debug!("Received {} bytes", len);
                Ok(Some(codec::decode(&buf[..len])))
            }
            Err(e) if e.kind() == ErrorKind::WouldBlock => Ok(None),
            Err(source) => Err(TransportError::Receive { source }),
        }
    }
}
