// Playback time model (seconds + nanoseconds, as delivered by the player)
use serde::{Deserialize, Serialize};
use std::fmt;

const NANOS_PER_SEC: i64 = 1_000_000_000;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Time {
    pub sec: u32,
    pub nsec: u32,
}

impl Time {
    pub fn new(sec: u32, nsec: u32) -> Self {
        Self { sec, nsec }
    }

    pub fn from_sec(seconds: f64) -> Self {
        let seconds = seconds.max(0.0);
        let whole = seconds.trunc();
        let nsec = ((seconds - whole) * NANOS_PER_SEC as f64).round() as i64;
        // Rounding can carry a full second into nsec
        let (sec, nsec) = if nsec >= NANOS_PER_SEC {
            (whole as i64 + 1, nsec - NANOS_PER_SEC)
        } else {
            (whole as i64, nsec)
        };
        Self::from_nanos(sec * NANOS_PER_SEC + nsec)
    }

    fn from_nanos(nanos: i64) -> Self {
        let nanos = nanos.clamp(0, u32::MAX as i64 * NANOS_PER_SEC + (NANOS_PER_SEC - 1));
        Self {
            sec: (nanos / NANOS_PER_SEC) as u32,
            nsec: (nanos % NANOS_PER_SEC) as u32,
        }
    }

    pub fn to_nanos(self) -> i64 {
        self.sec as i64 * NANOS_PER_SEC + self.nsec as i64
    }

    /// Signed seconds from `origin` to `self`. Negative when `self` precedes the origin.
    pub fn seconds_since(self, origin: Time) -> f64 {
        (self.to_nanos() - origin.to_nanos()) as f64 / NANOS_PER_SEC as f64
    }

    /// Sum of two times, saturating at the representable range.
    pub fn plus(self, offset: Time) -> Time {
        Self::from_nanos(self.to_nanos().saturating_add(offset.to_nanos()))
    }
}

impl fmt::Display for Time {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{:09}", self.sec, self.nsec)
    }
}
