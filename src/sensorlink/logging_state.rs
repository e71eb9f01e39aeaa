use log;
use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};
use tokio::time::{Duration, Instant};

use crate::context::LinkContext;
use crate::model::{Level, LoggingState, RequestKind};
use crate::transport::Transport;
use crate::wire;

pub trait ToggleInput: Send {
    fn level(&self) -> Level;

    // called after a debounced press toggled the state
    fn press_taken(&self) {}
}

// A press stays latched until the loop has taken it, the loop may be busy
// in a probe or a poll for longer than the press lasts.
#[derive(Clone, Default)]
pub struct SharedToggle {
    held: Arc<AtomicBool>,
    latched: Arc<AtomicBool>,
}

impl SharedToggle {
    pub fn press(&self) {
        self.latched.store(true, Ordering::Release);
        self.held.store(true, Ordering::Release);
    }

    pub fn release(&self) {
        self.held.store(false, Ordering::Release);
    }
}

impl ToggleInput for SharedToggle {
    fn level(&self) -> Level {
        if self.held.load(Ordering::Acquire) || self.latched.load(Ordering::Acquire) {
            Level::Pressed
        } else {
            Level::Released
        }
    }

    fn press_taken(&self) {
        self.latched.store(false, Ordering::Release);
    }
}

// A level counts only once it has held for the whole debounce interval.
pub struct Debouncer {
    interval: Duration,
    stable: Level,
    candidate: Level,
    candidate_since: Instant,
}

impl Debouncer {
    pub fn new(interval: Duration, initial: Level, now: Instant) -> Self {
        Self {
            interval,
            stable: initial,
            candidate: initial,
            candidate_since: now,
        }
    }

    pub fn level(&self) -> Level {
        self.stable
    }

    pub fn sample(&mut self, level: Level, now: Instant) -> bool {
        if level != self.candidate {
            self.candidate = level;
            self.candidate_since = now;
        }
        if self.candidate != self.stable
            && now.duration_since(self.candidate_since) >= self.interval
        {
            self.stable = self.candidate;
            return self.stable == Level::Pressed;
        }
        false
    }
}

pub struct LoggingStateMachine<T: Transport> {
    ctx: Arc<LinkContext>,
    transport: Arc<T>,
    debouncer: Debouncer,
}

impl<T: Transport> LoggingStateMachine<T> {
    pub fn new(ctx: Arc<LinkContext>, transport: Arc<T>, debounce: Duration, now: Instant) -> Self {
        ctx.set_logging_state(LoggingState::Idle);
        Self {
            ctx,
            transport,
            debouncer: Debouncer::new(debounce, Level::Released, now),
        }
    }

    pub fn state(&self) -> LoggingState {
        self.ctx.logging_state()
    }

    pub fn sample(&mut self, level: Level, now: Instant) -> Option<LoggingState> {
        if !self.debouncer.sample(level, now) {
            return None;
        }
        let state = self.state().toggled();
        self.ctx.set_logging_state(state);
        log::info!("Button pressed - Log state: {}", state);
        self.broadcast();
        Some(state)
    }

    // best effort, returns how many frames were queued
    pub fn broadcast(&self) -> usize {
        let frame = wire::encode_request(RequestKind::SetLogging(self.state().is_armed()));
        let mut queued = 0;
        for peer in self.ctx.peers() {
            match self.transport.send(peer.address, &frame) {
                Ok(()) => queued += 1,
                Err(e) => log::debug!("Logging state broadcast: {}", e),
            }
        }
        queued
    }
}

// The next fire is one interval after the previous poll started; a poll
// that overran is followed by a full interval instead of an immediate retry.
#[derive(Debug, Clone)]
pub struct Cadence {
    interval: Duration,
    next: Option<Instant>,
}

impl Cadence {
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            next: None,
        }
    }

    pub fn fire_at(&mut self, at: Instant) {
        self.next = Some(at);
    }

    pub fn stop(&mut self) {
        self.next = None;
    }

    pub fn is_due(&self, now: Instant) -> bool {
        self.next.map_or(false, |next| now >= next)
    }

    pub fn complete(&mut self, fired_at: Instant, now: Instant) {
        let next = fired_at + self.interval;
        self.next = Some(if next > now { next } else { now + self.interval });
    }

    pub fn remaining(&self, now: Instant) -> Duration {
        self.next
            .map(|next| next.saturating_duration_since(now))
            .unwrap_or_default()
    }

    // whole seconds, rounded up so the display reaches 0 only when due
    pub fn countdown_secs(&self, now: Instant) -> u64 {
        let millis = self.remaining(now).as_millis() as u64;
        (millis + 999) / 1_000
    }
}
