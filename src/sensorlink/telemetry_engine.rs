use log;
use std::sync::Arc;
use tokio::time::{Duration, Instant};

use crate::clock::{self, WallClock};
use crate::constants::{self, SENSOR_COUNT};
use crate::context::LinkContext;
use crate::error::LinkError;
use crate::link_supervisor::LinkSupervisor;
use crate::log_writer::{LogStore, LogWriter};
use crate::model::{
    LogRecord, Payload, Peer, PeerId, PeerOutcome, RequestKind, SensorReading, TelemetryRequest,
};
use crate::sink::PresentationSink;
use crate::transport::Transport;
use crate::wire::ActionKind;

pub struct TelemetryEngine<T: Transport, S: LogStore> {
    ctx: Arc<LinkContext>,
    transport: Arc<T>,
    supervisor: LinkSupervisor<T>,
    writer: LogWriter<S>,
    sink: Arc<dyn PresentationSink>,
    clock: Arc<dyn WallClock>,
    read_timeout: Duration,
}

impl<T: Transport, S: LogStore> TelemetryEngine<T, S> {
    pub fn new(
        ctx: Arc<LinkContext>,
        transport: Arc<T>,
        supervisor: LinkSupervisor<T>,
        writer: LogWriter<S>,
        sink: Arc<dyn PresentationSink>,
        clock: Arc<dyn WallClock>,
        read_timeout: Duration,
    ) -> Self {
        Self {
            ctx,
            transport,
            supervisor,
            writer,
            sink,
            clock,
            read_timeout,
        }
    }

    pub fn supervisor(&self) -> &LinkSupervisor<T> {
        &self.supervisor
    }

    pub fn writer_mut(&mut self) -> &mut LogWriter<S> {
        &mut self.writer
    }

    pub async fn poll_all(&mut self, persist: bool) -> Vec<(PeerId, PeerOutcome)> {
        let peers = self.ctx.peers().to_vec();
        let mut outcomes = Vec::with_capacity(peers.len());
        for peer in peers {
            let outcome = self.poll_peer(peer).await;
            if persist {
                self.persist(peer.id, &outcome);
            }
            self.sink.on_reading(peer.id, outcome.reading());
            outcomes.push((peer.id, outcome));
        }
        outcomes
    }

    async fn poll_peer(&self, peer: Peer) -> PeerOutcome {
        if !self.supervisor.is_reachable(peer.id).await {
            log::debug!("Peer {} unreachable, skipping read", peer.id);
            return PeerOutcome::Unavailable;
        }
        match self.read(peer).await {
            Ok(values) => PeerOutcome::Delivered(SensorReading {
                // tagged with the polled peer, never with anything from the payload
                peer: peer.id,
                values,
                taken_at: clock::timestamp(self.clock.as_ref()),
            }),
            Err(e) => {
                log::warn!("{}", e);
                PeerOutcome::Unavailable
            }
        }
    }

    async fn read(&self, peer: Peer) -> Result<[f32; SENSOR_COUNT], LinkError> {
        self.ctx.mailbox.drain();
        let started = Instant::now();
        self.transport
            .request(TelemetryRequest {
                kind: RequestKind::ReadSensors,
                target: peer,
            })
            .map_err(|source| LinkError::SendFailure {
                peer: peer.id,
                source,
            })?;
        let inbound = self
            .ctx
            .mailbox
            .wait_for(peer.address, ActionKind::SensorData, started + self.read_timeout)
            .await;
        match inbound.map(|inbound| inbound.response.payload) {
            Some(Payload::Readings(values)) => Ok(values),
            _ => Err(LinkError::Timeout(peer.id)),
        }
    }

    fn persist(&mut self, peer: PeerId, outcome: &PeerOutcome) {
        let timestamp = match outcome.reading() {
            Some(reading) => reading.taken_at,
            None => clock::timestamp(self.clock.as_ref()),
        };
        let records = LogRecord::for_outcome(timestamp, peer, outcome);
        if let Err(e) = self.writer.append(&records) {
            log::warn!("Dropping {} records of peer {}: {}", records.len(), peer, e);
            self.sink
                .on_fatal("SD Card unavailable", constants::FATAL_LOG_FILE);
        }
    }
}
