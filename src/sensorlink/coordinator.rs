use log;
use std::{future::Future, sync::Arc};
use tokio::{
    select,
    time::{self, Duration, Instant, MissedTickBehavior},
};

use crate::clock::{SystemClock, WallClock};
use crate::config::Settings;
use crate::constants;
use crate::context::LinkContext;
use crate::error::{FatalError, LogError};
use crate::link_supervisor::LinkSupervisor;
use crate::log_writer::{DirStore, LogStore, LogWriter};
use crate::logging_state::{Cadence, LoggingStateMachine, ToggleInput};
use crate::model::LoggingState;
use crate::sink::PresentationSink;
use crate::telemetry_engine::TelemetryEngine;
use crate::transport::{Transport, UdpTransport};

pub async fn start<I: ToggleInput>(
    settings: Settings,
    input: I,
    sink: Arc<dyn PresentationSink>,
) -> Result<Coordinator<UdpTransport, DirStore, I>, FatalError> {
    let report = |err: FatalError| {
        sink.on_fatal(&err.message, err.code);
        err
    };
    let settings = settings.validate().map_err(|e| report(e.into()))?;
    let peers = settings.peer_table().map_err(|e| report(e.into()))?;
    let ctx = Arc::new(LinkContext::new(peers));
    let transport = UdpTransport::bind(&settings.listen, ctx.clone())
        .await
        .map_err(|e| report(e.into()))?;
    let writer = LogWriter::new(DirStore::new(&settings.store_dir), settings.log_file.clone());
    let mut coordinator = Coordinator::new(
        &settings,
        ctx,
        Arc::new(transport),
        writer,
        input,
        sink.clone(),
        Arc::new(SystemClock),
    );
    coordinator.boot();
    Ok(coordinator)
}

// Everything runs on one task, a poll blocks the toggle and the link
// refresh until it returns.
pub struct Coordinator<T: Transport, S: LogStore, I: ToggleInput> {
    ctx: Arc<LinkContext>,
    engine: TelemetryEngine<T, S>,
    machine: LoggingStateMachine<T>,
    input: I,
    sink: Arc<dyn PresentationSink>,
    log_cadence: Cadence,
    preview: Cadence,
    link_check: Cadence,
    tick: Duration,
    reachable: usize,
}

impl<T: Transport, S: LogStore, I: ToggleInput> Coordinator<T, S, I> {
    pub fn new(
        settings: &Settings,
        ctx: Arc<LinkContext>,
        transport: Arc<T>,
        writer: LogWriter<S>,
        input: I,
        sink: Arc<dyn PresentationSink>,
        clock: Arc<dyn WallClock>,
    ) -> Self {
        let now = Instant::now();
        let supervisor = LinkSupervisor::new(
            ctx.clone(),
            transport.clone(),
            settings.probe_cooldown(),
            settings.probe_timeout(),
        );
        let engine = TelemetryEngine::new(
            ctx.clone(),
            transport.clone(),
            supervisor,
            writer,
            sink.clone(),
            clock,
            settings.read_timeout(),
        );
        let machine = LoggingStateMachine::new(ctx.clone(), transport, settings.debounce(), now);
        let mut preview = Cadence::new(settings.preview_interval());
        preview.fire_at(now);
        let mut link_check = Cadence::new(settings.link_check_interval());
        link_check.fire_at(now);
        Self {
            ctx,
            engine,
            machine,
            input,
            sink,
            log_cadence: Cadence::new(settings.log_interval()),
            preview,
            link_check,
            tick: settings.tick(),
            reachable: 0,
        }
    }

    pub fn state(&self) -> LoggingState {
        self.machine.state()
    }

    pub fn reachable(&self) -> usize {
        self.reachable
    }

    pub fn boot(&mut self) {
        let file_name = self.engine.writer_mut().file_name().to_string();
        match self.engine.writer_mut().prepare() {
            Ok(_) => log::info!("Log file {} ready", file_name),
            Err(LogError::Unavailable(e)) => {
                log::warn!("Store unavailable at boot: {}", e);
                self.sink
                    .on_fatal("SD Card Mount Failed", constants::FATAL_STORE_MOUNT);
            }
            Err(LogError::Write(e)) => {
                log::warn!("Failed to write header of {}: {}", file_name, e);
                self.sink
                    .on_fatal("Failed to open file for writing", constants::FATAL_LOG_FILE);
            }
        }
        log::info!(
            "Coordinator up with {} peers, log state: {}",
            self.ctx.peers().len(),
            self.state()
        );
    }

    pub async fn step(&mut self) {
        let now = Instant::now();
        if let Some(state) = self.machine.sample(self.input.level(), now) {
            self.input.press_taken();
            match state {
                LoggingState::Armed => self.log_cadence.fire_at(now),
                LoggingState::Idle => self.log_cadence.stop(),
            }
        }

        if self.link_check.is_due(Instant::now()) {
            let fired_at = Instant::now();
            self.refresh_links().await;
            self.link_check.complete(fired_at, Instant::now());
        }

        match self.state() {
            LoggingState::Armed => {
                if self.log_cadence.is_due(Instant::now()) {
                    let fired_at = Instant::now();
                    self.engine.poll_all(true).await;
                    self.log_cadence.complete(fired_at, Instant::now());
                }
                self.sink
                    .on_countdown(self.log_cadence.countdown_secs(Instant::now()));
            }
            LoggingState::Idle => {
                if self.preview.is_due(Instant::now()) {
                    let fired_at = Instant::now();
                    self.engine.poll_all(false).await;
                    self.preview.complete(fired_at, Instant::now());
                }
            }
        }
    }

    async fn refresh_links(&mut self) {
        let mut reachable = 0;
        for peer in self.ctx.peers().to_vec() {
            let up = self.engine.supervisor().is_reachable(peer.id).await;
            self.sink.on_reachability(peer.id, up);
            if up {
                reachable += 1;
            }
        }
        if reachable != self.reachable {
            log::info!("{} of {} peers reachable", reachable, self.ctx.peers().len());
        }
        self.reachable = reachable;
        // keep-alive, a unit that rebooted picks the state up again
        self.machine.broadcast();
    }

    pub async fn run<F>(&mut self, shutdown: F)
    where
        F: Future<Output = ()>,
    {
        tokio::pin!(shutdown);
        let mut ticker = time::interval(self.tick);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        loop {
            select! {
                _ = &mut shutdown => {
                    log::info!("Shutting down, log state: {}", self.state());
                    break;
                }
                _ = ticker.tick() => {
                    self.step().await;
                }
            }
        }
    }
}
