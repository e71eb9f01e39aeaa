use log;
use std::{
    net::SocketAddr,
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc,
    },
};
use tokio::net::UdpSocket;

use crate::constants::SENSOR_COUNT;
use crate::error::TransportError;
use crate::model::{Payload, RequestKind, TelemetryResponse};
use crate::wire::{self, ActionKind, Frame};

pub fn synthetic(id: u8, round: u64) -> [f32; SENSOR_COUNT] {
    let mut values = [0.0; SENSOR_COUNT];
    let drift = (round % 20) as f32 * 0.05;
    for (sensor, value) in values.iter_mut().enumerate() {
        *value = 18.0 + id as f32 + sensor as f32 * 0.25 + drift;
    }
    values
}

pub struct Servant {
    id: u8,
    socket: UdpSocket,
    logging: Arc<AtomicBool>,
    rounds: u64,
}

impl Servant {
    pub async fn bind(address: &str, id: u8) -> Result<Self, TransportError> {
        let socket = UdpSocket::bind(address)
            .await
            .map_err(|source| TransportError::Bind {
                address: address.to_string(),
                source,
            })?;
        log::info!("Servant {} listening on {}", id, address);
        Ok(Self {
            id,
            socket,
            logging: Arc::new(AtomicBool::new(false)),
            rounds: 0,
        })
    }

    pub fn local_addr(&self) -> Option<SocketAddr> {
        self.socket.local_addr().ok()
    }

    pub fn logging_flag(&self) -> Arc<AtomicBool> {
        self.logging.clone()
    }

    pub fn respond(&mut self, kind: RequestKind) -> Option<TelemetryResponse> {
        match kind {
            RequestKind::Probe => Some(TelemetryResponse {
                action: ActionKind::ProbeAck,
                payload: Payload::Ack,
            }),
            RequestKind::ReadSensors => {
                let values = synthetic(self.id, self.rounds);
                self.rounds += 1;
                Some(TelemetryResponse {
                    action: ActionKind::SensorData,
                    payload: Payload::Readings(values),
                })
            }
            RequestKind::SetLogging(armed) => {
                if self.logging.swap(armed, Ordering::AcqRel) != armed {
                    log::info!("Servant {} logging: {}", self.id, armed);
                }
                None
            }
        }
    }

    pub async fn work(&mut self) {
        let mut buf = [0; 1024];
        loop {
            let (len, addr) = match self.socket.recv_from(&mut buf).await {
                Ok(res) => res,
                Err(e) => {
                    log::warn!("Receive failed: {}", e);
                    continue;
                }
            };
            let kind = match wire::decode(&buf[..len]) {
                Ok(Frame::Request(kind)) => kind,
                Ok(Frame::Response(response)) => {
                    log::debug!("Ignoring response {:?} from {}", response.action, addr);
                    continue;
                }
                Err(e) => {
                    log::debug!("Dropping package from {}: {}", addr, e);
                    continue;
                }
            };
            if let Some(response) = self.respond(kind) {
                if let Err(e) = self
                    .socket
                    .send_to(&wire::encode_response(&response), addr)
                    .await
                {
                    log::warn!("Reply to {} failed: {}", addr, e);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::SystemClock;
    use crate::context::LinkContext;
    use crate::link_supervisor::LinkSupervisor;
    use crate::log_writer::{
        memory::{Card, FlakyStore},
        LogWriter,
    };
    use crate::logging_state::LoggingStateMachine;
    use crate::model::{Level, Peer, PeerOutcome};
    use crate::sink::recording::RecordingSink;
    use crate::telemetry_engine::TelemetryEngine;
    use crate::transport::UdpTransport;
    use tokio::time::{self, Duration, Instant};

    #[tokio::test]
    async fn test_respond() {
        let mut servant = Servant::bind("127.0.0.1:0", 3).await.unwrap();
        let ack = servant.respond(RequestKind::Probe).unwrap();
        assert_eq!(ack.action, ActionKind::ProbeAck);

        let first = servant.respond(RequestKind::ReadSensors).unwrap();
        assert_eq!(first.payload, Payload::Readings(synthetic(3, 0)));
        let second = servant.respond(RequestKind::ReadSensors).unwrap();
        assert_eq!(second.payload, Payload::Readings(synthetic(3, 1)));

        assert!(servant.respond(RequestKind::SetLogging(true)).is_none());
        assert!(servant.logging_flag().load(Ordering::Acquire));
        assert!(servant.respond(RequestKind::SetLogging(false)).is_none());
        assert!(!servant.logging_flag().load(Ordering::Acquire));
    }

    #[tokio::test]
    async fn test_udp_end_to_end() {
        let _ = env_logger::try_init();
        let mut servant = Servant::bind("127.0.0.1:0", 1).await.unwrap();
        let servant_addr = servant.local_addr().unwrap();
        let logging = servant.logging_flag();
        let worker = tokio::spawn(async move { servant.work().await });

        // the second peer has nobody listening
        let peers = vec![
            Peer {
                id: 1,
                address: servant_addr,
            },
            Peer {
                id: 2,
                address: SocketAddr::from(([127, 0, 0, 1], 9)),
            },
        ];
        let ctx = Arc::new(LinkContext::new(peers));
        let transport = Arc::new(UdpTransport::bind("127.0.0.1:0", ctx.clone()).await.unwrap());
        assert!(transport.local_addr().is_some());
        let sink = Arc::new(RecordingSink::default());
        let card = Card::default();
        let supervisor = LinkSupervisor::new(
            ctx.clone(),
            transport.clone(),
            Duration::from_millis(3_000),
            Duration::from_millis(300),
        );
        let mut engine = TelemetryEngine::new(
            ctx.clone(),
            transport.clone(),
            supervisor,
            LogWriter::new(FlakyStore::new(card.clone()), "data.csv"),
            sink.clone(),
            Arc::new(SystemClock),
            Duration::from_millis(1_000),
        );

        let outcomes = engine.poll_all(true).await;
        match &outcomes[0].1 {
            PeerOutcome::Delivered(reading) => {
                assert_eq!(reading.peer, 1);
                assert_eq!(reading.values, synthetic(1, 0));
            }
            other => panic!("servant should deliver, got {:?}", other),
        }
        assert_eq!(outcomes[1].1, PeerOutcome::Unavailable);
        assert_eq!(card.contents().lines().count(), 1 + 18);

        let mut machine = LoggingStateMachine::new(
            ctx.clone(),
            transport.clone(),
            Duration::from_millis(50),
            Instant::now(),
        );
        let start = Instant::now();
        machine.sample(Level::Pressed, start);
        assert!(machine
            .sample(Level::Pressed, start + Duration::from_millis(60))
            .is_some());
        let deadline = Instant::now() + Duration::from_secs(2);
        while !logging.load(Ordering::Acquire) && Instant::now() < deadline {
            time::sleep(Duration::from_millis(10)).await;
        }
        assert!(logging.load(Ordering::Acquire));
        worker.abort();
    }
}
