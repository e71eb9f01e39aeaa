use chrono::{Datelike, Local, NaiveDateTime};
use log;

use crate::constants;
use crate::error::ClockInvalid;

pub trait WallClock: Send + Sync {
    fn now(&self) -> NaiveDateTime;
}

pub struct SystemClock;

impl WallClock for SystemClock {
    fn now(&self) -> NaiveDateTime {
        Local::now().naive_local()
    }
}

pub fn check(now: NaiveDateTime) -> Result<NaiveDateTime, ClockInvalid> {
    if (constants::MIN_PLAUSIBLE_YEAR..=constants::MAX_PLAUSIBLE_YEAR).contains(&now.year()) {
        Ok(now)
    } else {
        Err(ClockInvalid(now))
    }
}

// An implausible clock is reported, the reading is still used.
pub fn timestamp(clock: &dyn WallClock) -> NaiveDateTime {
    let now = clock.now();
    match check(now) {
        Ok(now) => now,
        Err(e) => {
            log::warn!("{}, timestamps are best effort", e);
            now
        }
    }
}
