// Single-slot hand-off between the transport's receive task and whichever
// component on the control loop owns the outstanding request.

use log;
use std::{
    net::SocketAddr,
    sync::{Mutex, MutexGuard},
};
use tokio::{
    sync::Notify,
    time::{self, Instant},
};

use crate::model::TelemetryResponse;
use crate::wire::ActionKind;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Inbound {
    pub from: SocketAddr,
    pub response: TelemetryResponse,
    pub received_at: Instant,
}

impl Inbound {
    fn answers(&self, from: SocketAddr, action: ActionKind) -> bool {
        self.from == from && self.response.action == action
    }
}

#[derive(Default)]
struct Slot {
    inbound: Option<Inbound>,
    awaiting: Option<(SocketAddr, ActionKind)>,
}

impl Slot {
    fn is_awaited(&self, inbound: &Inbound) -> bool {
        self.awaiting
            .map_or(false, |(from, action)| inbound.answers(from, action))
    }
}

#[derive(Default)]
pub struct Mailbox {
    slot: Mutex<Slot>,
    notify: Notify,
}

impl Mailbox {
    pub fn new() -> Self {
        Self::default()
    }

    // the slot holds plain data, a panicked holder cannot leave it torn
    fn slot(&self) -> MutexGuard<'_, Slot> {
        self.slot.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    // An unread message is overwritten, unless it is the awaited reply and
    // the newcomer is not.
    pub fn post(&self, inbound: Inbound) {
        let mut slot = self.slot();
        match slot.inbound.take() {
            Some(unread) if slot.is_awaited(&unread) && !slot.is_awaited(&inbound) => {
                log::debug!(
                    "Dropping {:?} from {}, awaited reply still unread",
                    inbound.response.action,
                    inbound.from
                );
                slot.inbound = Some(unread);
                return;
            }
            Some(unread) => {
                log::debug!(
                    "Mailbox overwrote unread {:?} from {}",
                    unread.response.action,
                    unread.from
                );
            }
            None => {}
        }
        slot.inbound = Some(inbound);
        drop(slot);
        self.notify.notify_one();
    }

    pub fn take(&self) -> Option<Inbound> {
        self.slot().inbound.take()
    }

    pub fn has_message(&self) -> bool {
        self.slot().inbound.is_some()
    }

    pub fn drain(&self) -> usize {
        match self.take() {
            Some(stale) => {
                log::debug!(
                    "Discarding late {:?} from {}",
                    stale.response.action,
                    stale.from
                );
                1
            }
            None => 0,
        }
    }

    // Anything other than `action` from `from`, received by `deadline`, is
    // dropped.
    pub async fn wait_for(
        &self,
        from: SocketAddr,
        action: ActionKind,
        deadline: Instant,
    ) -> Option<Inbound> {
        self.slot().awaiting = Some((from, action));
        let inbound = self.wait_correlated(from, action, deadline).await;
        self.slot().awaiting = None;
        inbound
    }

    async fn wait_correlated(
        &self,
        from: SocketAddr,
        action: ActionKind,
        deadline: Instant,
    ) -> Option<Inbound> {
        loop {
            if let Some(inbound) = self.take() {
                if inbound.answers(from, action) && inbound.received_at <= deadline {
                    return Some(inbound);
                }
                log::debug!(
                    "Ignoring {:?} from {} while waiting for {:?} from {}",
                    inbound.response.action,
                    inbound.from,
                    action,
                    from
                );
                continue;
            }
            if Instant::now() >= deadline {
                return None;
            }
            // a permit left by an earlier post only causes one extra pass
            if time::timeout_at(deadline, self.notify.notified())
                .await
                .is_err()
            {
                // last look, a post may have raced the deadline
                return self.take().filter(|inbound| {
                    inbound.answers(from, action) && inbound.received_at <= deadline
                });
            }
        }
    }
}
