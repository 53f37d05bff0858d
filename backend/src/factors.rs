//! Per-day review capacity.
//!
//! A day's capacity is expressed as a factor relative to a normal day: `1.0` is a normal amount
//! of reviews, `0.0` means that no reviews are wanted on that day. The factor of a day is the
//! product of its weekday entry in the weekly pattern and every vacation covering it.

use std::fmt;

use serde::{Serialize, Deserialize, Deserializer};
use serde::de::IgnoredAny;

use crate::Day;

/// The number of days in a week.
pub const WEEKDAYS: usize = 7;

/// The identifier of a vacation.
///
/// Vacations that were created together (e.g. for several groups at once) share their ID.
pub type VacationId = i64;

/// A temporary change of capacity over a range of days.
#[derive(Serialize, Deserialize, Clone, Copy, PartialEq, Debug)]
pub struct Vacation {
    /// The ID of the vacation.
    pub id: VacationId,
    /// The first day of the vacation.
    pub start: Day,
    /// The last day of the vacation (inclusive).
    pub end: Day,
    /// The capacity factor during the vacation, between 0 and 1.
    pub factor: f64,
}

/// The capacity of each weekday, starting on Monday.
#[derive(Serialize, Clone, PartialEq, Debug)]
#[serde(transparent)]
pub struct WeeklyPattern(Vec<f64>);

impl WeeklyPattern {
    /// Create a pattern from its entries.
    ///
    /// The entries are not checked; see `sanitized`.
    pub fn new(entries: Vec<f64>) -> WeeklyPattern {
        WeeklyPattern(entries)
    }

    /// The entries of the pattern.
    pub fn as_slice(&self) -> &[f64] {
        &self.0
    }

    /// Does the pattern have an entry for every weekday, each finite and non-negative?
    pub fn is_valid(&self) -> bool {
        self.0.len() == WEEKDAYS && self.0.iter().all(|x| x.is_finite() && *x >= 0.0)
    }

    /// Replace the pattern by the default one if it is malformed.
    pub fn sanitized(self) -> WeeklyPattern {
        if self.is_valid() { self } else { WeeklyPattern::default() }
    }

    /// Rotate the pattern left by `offset` entries.
    ///
    /// This is `pattern[offset..] ++ pattern[..offset]`, with `offset` taken modulo the length of
    /// the pattern.
    pub fn rotated(&self, offset: usize) -> WeeklyPattern {
        if self.0.is_empty() {
            return self.clone();
        }

        let offset = offset % self.0.len();
        let mut entries = Vec::with_capacity(self.0.len());
        entries.extend_from_slice(&self.0[offset..]);
        entries.extend_from_slice(&self.0[..offset]);

        WeeklyPattern(entries)
    }
}

impl Default for WeeklyPattern {
    fn default() -> WeeklyPattern {
        WeeklyPattern(vec![1.0; WEEKDAYS])
    }
}

impl fmt::Display for WeeklyPattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (n, entry) in self.0.iter().enumerate() {
            if n != 0 { write!(f, " ")?; }
            write!(f, "{:.2}", entry)?;
        }

        Ok(())
    }
}

/// Shapes a weekly pattern may come in from a configuration file.
#[derive(Deserialize)]
#[serde(untagged)]
enum RawPattern {
    List(Vec<f64>),
    Other(IgnoredAny),
}

// A pattern of the wrong shape must not make the whole configuration unreadable, so anything that
// is not a list of numbers is read as an empty (and thus invalid) pattern.
impl<'de> Deserialize<'de> for WeeklyPattern {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<WeeklyPattern, D::Error> {
        Ok(match RawPattern::deserialize(deserializer)? {
            RawPattern::List(entries) => WeeklyPattern(entries),
            RawPattern::Other(_) => WeeklyPattern(Vec::new()),
        })
    }
}

/// Build the capacity factors of the `horizon_days` days starting on `today`.
///
/// Entry `d` of the result belongs to the absolute day `today + d`. Its weekday entry is
/// `weekdays[(today + d) mod weekdays.len()]`, so `weekdays` must already be rotated such that
/// its first entry belongs to the weekday of absolute day 0. An empty `weekdays` counts as a
/// pattern of normal days.
pub fn build_day_factors(today: Day, horizon_days: usize, weekdays: &[f64], vacations: &[Vacation]) -> Vec<f64> {
    // Seed with the weekly pattern.
    let mut factors: Vec<f64> = (0..horizon_days)
        .map(|d| if weekdays.is_empty() {
            1.0
        } else {
            weekdays[(today + d as Day).rem_euclid(weekdays.len() as Day) as usize]
        })
        .collect();

    if horizon_days == 0 {
        return factors;
    }

    // Multiply in the vacations, in order. Only the part of each vacation that falls inside the
    // horizon is visited.
    let last = today + horizon_days as Day - 1;
    for vacation in vacations {
        for day in vacation.start.max(today)..=vacation.end.min(last) {
            factors[(day - today) as usize] *= vacation.factor;
        }
    }

    factors
}
