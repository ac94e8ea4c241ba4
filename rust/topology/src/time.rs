// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Frame time with near-integer snapping.
//!
//! [`Time`] wraps a double-precision frame number. Comparisons use an
//! epsilon of `1e-10`, so a time that drifted off an integer frame by
//! floating round-off still compares equal to that frame, and
//! `floor`/`ceil` both snap to it.

use serde::{Deserialize, Serialize};

/// Tolerance under which two times are considered equal.
pub const TIME_EPS: f64 = 1e-10;

/// A scalar frame identifier, possibly fractional.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct Time(f64);

impl Time {
    pub fn new(t: f64) -> Self {
        Time(t)
    }

    /// An exact integer frame.
    pub fn frame(n: i64) -> Self {
        Time(n as f64)
    }

    pub fn value(&self) -> f64 {
        self.0
    }

    /// True if this time is within tolerance of an integer frame.
    pub fn is_integer(&self) -> bool {
        (self.0 - self.0.round()).abs() < TIME_EPS
    }

    /// Largest integer frame `<=` this time. A time within tolerance of an
    /// integer frame floors to that frame even if it is slightly below it.
    pub fn floor(&self) -> i64 {
        if self.is_integer() {
            self.0.round() as i64
        } else {
            self.0.floor() as i64
        }
    }

    /// Smallest integer frame `>=` this time, with the same snapping as
    /// [`floor`](Time::floor).
    pub fn ceil(&self) -> i64 {
        if self.is_integer() {
            self.0.round() as i64
        } else {
            self.0.ceil() as i64
        }
    }

    /// Nearest integer frame.
    pub fn round(&self) -> i64 {
        self.0.round() as i64
    }

    /// A time infinitesimally before this one (one tolerance step).
    pub fn just_before(&self) -> Time {
        Time(self.0 - TIME_EPS)
    }

    /// A time infinitesimally after this one (one tolerance step).
    pub fn just_after(&self) -> Time {
        Time(self.0 + TIME_EPS)
    }
}

impl PartialEq for Time {
    fn eq(&self, other: &Self) -> bool {
        (self.0 - other.0).abs() < TIME_EPS
    }
}

impl PartialOrd for Time {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        if self == other {
            Some(std::cmp::Ordering::Equal)
        } else {
            self.0.partial_cmp(&other.0)
        }
    }
}

impl std::ops::Add<f64> for Time {
    type Output = Time;

    fn add(self, rhs: f64) -> Time {
        Time(self.0 + rhs)
    }
}

impl std::ops::Sub<f64> for Time {
    type Output = Time;

    fn sub(self, rhs: f64) -> Time {
        Time(self.0 - rhs)
    }
}

impl std::ops::Sub for Time {
    type Output = f64;

    fn sub(self, rhs: Time) -> f64 {
        self.0 - rhs.0
    }
}

impl std::fmt::Display for Time {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "t={}", self.0)
    }
}
