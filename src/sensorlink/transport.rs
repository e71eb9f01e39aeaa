use log;
use std::{net::SocketAddr, sync::Arc};
use tokio::{net::UdpSocket, task::JoinHandle, time::Instant};

use crate::context::LinkContext;
use crate::error::TransportError;
use crate::mailbox::Inbound;
use crate::model::TelemetryRequest;
use crate::wire::{self, Frame};

// `send` only queues the frame, replies come back through the mailbox.
pub trait Transport: Send + Sync {
    fn send(&self, to: SocketAddr, frame: &[u8]) -> Result<(), TransportError>;

    fn request(&self, request: TelemetryRequest) -> Result<(), TransportError> {
        self.send(request.target.address, &wire::encode_request(request.kind))
    }
}

pub struct UdpTransport {
    socket: Arc<UdpSocket>,
    receiver: JoinHandle<()>,
}

impl UdpTransport {
    pub async fn bind(address: &str, ctx: Arc<LinkContext>) -> Result<Self, TransportError> {
        let socket = UdpSocket::bind(address)
            .await
            .map_err(|source| TransportError::Bind {
                address: address.to_string(),
                source,
            })?;
        // try_send_to only succeeds once the reactor has seen the socket writable
        socket
            .writable()
            .await
            .map_err(|source| TransportError::Bind {
                address: address.to_string(),
                source,
            })?;
        let socket = Arc::new(socket);
        let udp_receiver = socket.clone();
        log::info!("Start receiving thread on {}", address);
        let receiver = tokio::spawn(async move {
            let mut buf = [0; 1024];
            loop {
                let (len, addr) = match udp_receiver.recv_from(&mut buf).await {
                    Ok(res) => res,
                    Err(e) => {
                        log::warn!("Receive failed: {}", e);
                        continue;
                    }
                };
                log::debug!("Got a package from {}", addr);
                match wire::decode(&buf[..len]) {
                    Ok(Frame::Response(response)) => {
                        ctx.mailbox.post(Inbound {
                            from: addr,
                            response,
                            received_at: Instant::now(),
                        });
                    }
                    Ok(Frame::Request(kind)) => {
                        log::debug!("Ignoring request {:?} from {}", kind, addr);
                    }
                    Err(e) => {
                        log::debug!("Dropping package from {}: {}", addr, e);
                    }
                }
            }
        });
        Ok(Self { socket, receiver })
    }

    pub fn local_addr(&self) -> Option<SocketAddr> {
        self.socket.local_addr().ok()
    }
}

impl Transport for UdpTransport {
    fn send(&self, to: SocketAddr, frame: &[u8]) -> Result<(), TransportError> {
        self.socket
            .try_send_to(frame, to)
            .map(|_| ())
            .map_err(|source| TransportError::Send { peer: to, source })
    }
}

impl Drop for UdpTransport {
    fn drop(&mut self) {
        self.receiver.abort();
    }
}
