use log;

use crate::model::{PeerId, SensorReading};

// Implementations run on the control loop and must return quickly.
pub trait PresentationSink: Send + Sync {
    fn on_reachability(&self, peer: PeerId, reachable: bool);
    fn on_reading(&self, peer: PeerId, reading: Option<&SensorReading>);
    fn on_countdown(&self, seconds: u64);
    fn on_fatal(&self, message: &str, code: u8);
}

pub struct LogSink;

impl PresentationSink for LogSink {
    fn on_reachability(&self, peer: PeerId, reachable: bool) {
        log::debug!("S{}: {}", peer, if reachable { "online" } else { "x" });
    }

    fn on_reading(&self, peer: PeerId, reading: Option<&SensorReading>) {
        match reading {
            Some(reading) => log::info!("S{}: {:.1} C", peer, reading.average()),
            None => log::info!("S{}:  -  ", peer),
        }
    }

    fn on_countdown(&self, seconds: u64) {
        log::trace!("Logging: {} s", seconds);
    }

    fn on_fatal(&self, message: &str, code: u8) {
        if code != 0 {
            log::error!("FATAL ERROR: Nr. {}: {}", code, message);
        } else {
            log::error!("FATAL ERROR: {}", message);
        }
    }
}

#[cfg(test)]
pub mod recording {
    use super::*;
    use std::sync::Mutex;

    #[derive(Debug, Clone, PartialEq)]
    pub enum Event {
        Reachability(PeerId, bool),
        Reading(PeerId, Option<SensorReading>),
        Countdown(u64),
        Fatal(String, u8),
    }

    #[derive(Default)]
    pub struct RecordingSink {
        events: Mutex<Vec<Event>>,
    }

    impl RecordingSink {
        pub fn events(&self) -> Vec<Event> {
            self.events.lock().unwrap().clone()
        }

        pub fn readings(&self) -> Vec<(PeerId, Option<SensorReading>)> {
            self.events()
                .into_iter()
                .filter_map(|event| match event {
                    Event::Reading(peer, reading) => Some((peer, reading)),
                    _ => None,
                })
                .collect()
        }

        pub fn countdowns(&self) -> Vec<u64> {
            self.events()
                .into_iter()
                .filter_map(|event| match event {
                    Event::Countdown(seconds) => Some(seconds),
                    _ => None,
                })
                .collect()
        }
    }

    impl PresentationSink for RecordingSink {
        fn on_reachability(&self, peer: PeerId, reachable: bool) {
            self.events
                .lock()
                .unwrap()
                .push(Event::Reachability(peer, reachable));
        }

        fn on_reading(&self, peer: PeerId, reading: Option<&SensorReading>) {
            self.events
                .lock()
                .unwrap()
                .push(Event::Reading(peer, reading.cloned()));
        }

        fn on_countdown(&self, seconds: u64) {
            self.events.lock().unwrap().push(Event::Countdown(seconds));
        }

        fn on_fatal(&self, message: &str, code: u8) {
            self.events
                .lock()
                .unwrap()
                .push(Event::Fatal(message.to_string(), code));
        }
    }
}
