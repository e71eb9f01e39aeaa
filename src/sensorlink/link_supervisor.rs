use log;
use std::sync::Arc;
use tokio::time::{Duration, Instant};

use crate::context::LinkContext;
use crate::error::LinkError;
use crate::model::{Peer, PeerId, ProbeResult, RequestKind, TelemetryRequest, Verdict};
use crate::transport::Transport;
use crate::wire::ActionKind;

// A verdict younger than the cooldown is answered from the table.
pub struct LinkSupervisor<T: Transport> {
    ctx: Arc<LinkContext>,
    transport: Arc<T>,
    cooldown: Duration,
    probe_timeout: Duration,
}

impl<T: Transport> LinkSupervisor<T> {
    pub fn new(
        ctx: Arc<LinkContext>,
        transport: Arc<T>,
        cooldown: Duration,
        probe_timeout: Duration,
    ) -> Self {
        Self {
            ctx,
            transport,
            cooldown,
            probe_timeout,
        }
    }

    pub async fn is_reachable(&self, id: PeerId) -> bool {
        self.check(id).await.reachable
    }

    pub async fn check(&self, id: PeerId) -> ProbeResult {
        let now = Instant::now();
        let link = match self.ctx.link(id).await {
            Some(link) => link,
            None => {
                log::warn!("Reachability asked for unknown peer {}", id);
                return ProbeResult {
                    reachable: false,
                    measured_at: now,
                };
            }
        };
        if let (Some(started), Some(probed_at)) = (link.cooldown_started, link.probed_at) {
            if now.duration_since(started) < self.cooldown {
                return ProbeResult {
                    reachable: link.verdict.is_reachable(),
                    measured_at: probed_at,
                };
            }
        }

        let reachable = match self.probe(link.peer, now).await {
            Ok(()) => true,
            Err(e) => {
                log::debug!("Probe failed: {}", e);
                false
            }
        };
        let measured_at = Instant::now();
        let verdict = Verdict::from_reachable(reachable);
        if verdict != link.verdict || link.probed_at.is_none() {
            log::info!("Peer {} is {:?}", id, verdict);
        }
        self.ctx
            .update_link(id, |entry| {
                entry.verdict = verdict;
                entry.probed_at = Some(measured_at);
                entry.cooldown_started = Some(now);
            })
            .await;
        ProbeResult {
            reachable,
            measured_at,
        }
    }

    async fn probe(&self, peer: Peer, started: Instant) -> Result<(), LinkError> {
        self.ctx.mailbox.drain();
        self.transport
            .request(TelemetryRequest {
                kind: RequestKind::Probe,
                target: peer,
            })
            .map_err(|source| LinkError::SendFailure {
                peer: peer.id,
                source,
            })?;
        let deadline = started + self.probe_timeout;
        match self
            .ctx
            .mailbox
            .wait_for(peer.address, ActionKind::ProbeAck, deadline)
            .await
        {
            Some(_) => Ok(()),
            None => Err(LinkError::Timeout(peer.id)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constants::SENSOR_COUNT;
    use crate::transport::scripted::{ScriptedPeer, ScriptedTransport};
    use std::net::SocketAddr;
    use tokio::time;

    fn peers(count: u8) -> Vec<Peer> {
        (1..=count)
            .map(|id| Peer {
                id,
                address: SocketAddr::from(([127, 0, 0, 1], 47_000 + id as u16)),
            })
            .collect()
    }

    fn setup(count: u8) -> (Arc<LinkContext>, Arc<ScriptedTransport>, LinkSupervisor<ScriptedTransport>) {
        let ctx = Arc::new(LinkContext::new(peers(count)));
        let transport = Arc::new(ScriptedTransport::new(ctx.clone()));
        let supervisor = LinkSupervisor::new(
            ctx.clone(),
            transport.clone(),
            Duration::from_millis(3_000),
            Duration::from_millis(300),
        );
        (ctx, transport, supervisor)
    }

    #[tokio::test(start_paused = true)]
    async fn test_cooldown_serves_cached_verdict() {
        let _ = env_logger::try_init();
        let (ctx, transport, supervisor) = setup(1);
        let peer = ctx.peers()[0];
        transport.set_peer(peer.address, ScriptedPeer::online([20.0; SENSOR_COUNT]));

        let first = Instant::now();
        assert!(supervisor.is_reachable(peer.id).await);
        assert_eq!(transport.sent_count(peer.address, RequestKind::Probe), 1);

        time::sleep_until(first + Duration::from_millis(500)).await;
        assert!(supervisor.is_reachable(peer.id).await);
        assert_eq!(transport.sent_count(peer.address, RequestKind::Probe), 1);

        time::sleep_until(first + Duration::from_millis(3_500)).await;
        assert!(supervisor.is_reachable(peer.id).await);
        assert_eq!(transport.sent_count(peer.address, RequestKind::Probe), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_silent_peer_is_cached_unreachable() {
        let (ctx, transport, supervisor) = setup(1);
        let peer = ctx.peers()[0];
        transport.set_peer(peer.address, ScriptedPeer::silent());

        let started = Instant::now();
        let result = supervisor.check(peer.id).await;
        assert!(!result.reachable);
        assert!(result.measured_at - started >= Duration::from_millis(300));
        assert_eq!(
            ctx.link(peer.id).await.map(|link| link.verdict),
            Some(Verdict::Unreachable)
        );

        // within the cooldown no probe goes out and no time is spent waiting
        let again = Instant::now();
        assert!(!supervisor.is_reachable(peer.id).await);
        assert_eq!(Instant::now(), again);
        assert_eq!(transport.sent_count(peer.address, RequestKind::Probe), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_send_failure_counts_as_unreachable() {
        let (ctx, transport, supervisor) = setup(1);
        let peer = ctx.peers()[0];
        transport.set_peer(peer.address, ScriptedPeer::online([20.0; SENSOR_COUNT]));
        transport.fail_sends(true);

        assert!(!supervisor.is_reachable(peer.id).await);
        assert_eq!(ctx.reachable_count().await, 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_ack_from_other_peer_is_not_accepted() {
        let (ctx, transport, supervisor) = setup(2);
        let (down, up) = (ctx.peers()[0], ctx.peers()[1]);
        transport.set_peer(down.address, ScriptedPeer::silent());
        transport.set_peer(up.address, ScriptedPeer::online([20.0; SENSOR_COUNT]));

        assert!(supervisor.is_reachable(up.id).await);
        // a stray ack of `up` lands while `down` is being probed
        let late = ctx.clone();
        let up_address = up.address;
        tokio::spawn(async move {
            time::sleep(Duration::from_millis(100)).await;
            late.mailbox.post(crate::mailbox::Inbound {
                from: up_address,
                response: crate::model::TelemetryResponse {
                    action: ActionKind::ProbeAck,
                    payload: crate::model::Payload::Ack,
                },
                received_at: Instant::now(),
            });
        });
        assert!(!supervisor.is_reachable(down.id).await);
        assert!(!ctx.mailbox.has_message());
    }

    #[tokio::test]
    async fn test_unknown_peer() {
        let (_ctx, _transport, supervisor) = setup(1);
        assert!(!supervisor.is_reachable(9).await);
    }
}
