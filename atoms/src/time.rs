use chrono::{DateTime, Utc};
use std::sync::Mutex;

/// Source of "now" for the engine.
///
/// The embedding app is expected to hand the engine a server-adjusted
/// clock so awarded timestamps do not depend on the device clock. Tests
/// drive a [`ManualClock`].
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

/// Wall-clock time.
#[derive(Debug, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Manually advanced clock for deterministic tests.
#[derive(Debug)]
pub struct ManualClock {
    now: Mutex<DateTime<Utc>>,
}

impl ManualClock {
    pub fn new(start: DateTime<Utc>) -> Self {
        Self {
            now: Mutex::new(start),
        }
    }

    pub fn set(&self, to: DateTime<Utc>) {
        *self.now.lock().unwrap() = to;
    }

    pub fn advance_secs(&self, secs: i64) {
        let mut now = self.now.lock().unwrap();
        *now += chrono::Duration::seconds(secs);
    }

    pub fn advance_days(&self, days: i64) {
        let mut now = self.now.lock().unwrap();
        *now += chrono::Duration::days(days);
    }
}

impl Clock for ManualClock {
    fn now(&self) -> DateTime<Utc> {
        *self.now.lock().unwrap()
    }
}

/// Whole seconds elapsed between `from` and `now`, saturating at zero so
/// a skewed client timestamp never yields a negative duration.
pub fn elapsed_secs(from: DateTime<Utc>, now: DateTime<Utc>) -> u32 {
    let secs = (now - from).num_seconds();
    if secs < 0 {
        0
    } else {
        secs as u32
    }
}

/// Render an elapsed duration for display: "45s", "12m 05s", "3h 02m".
pub fn format_elapsed(secs: u32) -> String {
    if secs < 60 {
        format!("{}s", secs)
    } else if secs < 3600 {
        format!("{}m {:02}s", secs / 60, secs % 60)
    } else {
        format!("{}h {:02}m", secs / 3600, (secs % 3600) / 60)
    }
}
