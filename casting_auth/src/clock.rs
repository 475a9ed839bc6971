//! Time sources for checking token expiry
//!
//! The verifier never reads the system time directly. It asks a [`Clock`],
//! which lets tests pin "now" to a known instant with [`TestClock`].

use std::{
    fmt,
    ops::{Add, Sub},
    sync::atomic::{AtomicU64, Ordering},
    time::{Duration, SystemTime},
};

use serde::{de, Deserialize, Deserializer, Serialize};

/// A number of seconds since the Unix epoch
///
/// Deserializes from a JSON NumericDate, which may carry a fractional part.
/// Fractions are truncated to whole seconds.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Ord, PartialOrd, Hash, Serialize)]
#[serde(transparent)]
#[repr(transparent)]
pub struct UnixTime(pub u64);

impl<'de> Deserialize<'de> for UnixTime {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum NumericDate {
            Whole(u64),
            Fractional(f64),
        }

        match NumericDate::deserialize(deserializer)? {
            NumericDate::Whole(secs) => Ok(Self(secs)),
            NumericDate::Fractional(secs) if secs.is_finite() && secs >= 0.0 => {
                Ok(Self(secs.trunc() as u64))
            }
            NumericDate::Fractional(secs) => Err(de::Error::custom(format_args!(
                "{} is not a valid NumericDate",
                secs
            ))),
        }
    }
}

impl From<SystemTime> for UnixTime {
    #[inline]
    fn from(t: SystemTime) -> Self {
        let secs = t
            .duration_since(SystemTime::UNIX_EPOCH)
            .map_or(0, |d| d.as_secs());
        Self(secs)
    }
}

impl Add<Duration> for UnixTime {
    type Output = Self;

    #[inline]
    fn add(self, rhs: Duration) -> Self {
        Self(self.0.saturating_add(rhs.as_secs()))
    }
}

impl Sub<Duration> for UnixTime {
    type Output = Self;

    #[inline]
    fn sub(self, rhs: Duration) -> Self {
        Self(self.0.saturating_sub(rhs.as_secs()))
    }
}

impl fmt::Display for UnixTime {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        fmt::Display::fmt(&self.0, f)
    }
}

/// A source of the current time
pub trait Clock: fmt::Debug + Send + Sync {
    /// The current time
    fn now(&self) -> UnixTime;
}

/// The system clock
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct System;

impl Clock for System {
    #[inline]
    fn now(&self) -> UnixTime {
        UnixTime::from(SystemTime::now())
    }
}

/// A manually driven clock
///
/// The time can be moved while the clock is shared with a verifier.
#[derive(Debug, Default)]
pub struct TestClock(AtomicU64);

impl Clock for TestClock {
    #[inline]
    fn now(&self) -> UnixTime {
        UnixTime(self.0.load(Ordering::Acquire))
    }
}

impl TestClock {
    /// Constructs a clock stopped at the given time
    #[inline]
    pub const fn new(time: UnixTime) -> Self {
        Self(AtomicU64::new(time.0))
    }

    /// Moves the clock to the given time
    pub fn set(&self, time: UnixTime) {
        self.0.store(time.0, Ordering::Release);
    }

    /// Advances the clock by `secs` seconds
    pub fn inc(&self, secs: u64) {
        self.0.fetch_add(secs, Ordering::AcqRel);
    }
}
