use std::sync::atomic::{AtomicBool, Ordering};

use tokio::sync::RwLock;

use crate::mailbox::Mailbox;
use crate::model::{LoggingState, Peer, PeerId, PeerLink};

pub struct LinkContext {
    pub mailbox: Mailbox,
    links: RwLock<Vec<PeerLink>>,
    peers: Vec<Peer>,
    armed: AtomicBool,
}

impl LinkContext {
    pub fn new(peers: Vec<Peer>) -> Self {
        let links = peers.iter().copied().map(PeerLink::new).collect();
        Self {
            mailbox: Mailbox::new(),
            links: RwLock::new(links),
            peers,
            armed: AtomicBool::new(false),
        }
    }

    pub fn peers(&self) -> &[Peer] {
        &self.peers
    }

    pub async fn link(&self, id: PeerId) -> Option<PeerLink> {
        self.links
            .read()
            .await
            .iter()
            .find(|link| link.peer.id == id)
            .cloned()
    }

    pub async fn update_link<F>(&self, id: PeerId, update: F)
    where
        F: FnOnce(&mut PeerLink),
    {
        let mut links = self.links.write().await;
        if let Some(link) = links.iter_mut().find(|link| link.peer.id == id) {
            update(link);
        }
    }

    pub async fn reachable_count(&self) -> usize {
        self.links
            .read()
            .await
            .iter()
            .filter(|link| link.verdict.is_reachable())
            .count()
    }

    pub fn logging_state(&self) -> LoggingState {
        if self.armed.load(Ordering::Acquire) {
            LoggingState::Armed
        } else {
            LoggingState::Idle
        }
    }

    pub(crate) fn set_logging_state(&self, state: LoggingState) {
        self.armed.store(state.is_armed(), Ordering::Release);
    }
}
