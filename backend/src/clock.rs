//! Conversion between points in time and collection days.

use chrono::{self, Datelike};
use serde::{Serialize, Deserialize};

use crate::{Day, Time};

/// The length of a day in milliseconds.
const DAY_MS: i64 = 24 * 60 * 60 * 1000;

/// The day clock of a collection.
///
/// Days are counted from the day the collection was created (day 0). A day does not necessarily
/// start at midnight: it starts at the day cutoff, which is stored as the start of the next day.
#[derive(Serialize, Deserialize, Clone, Copy, PartialEq, Debug)]
pub struct DayClock {
    /// The index of the current day.
    pub today: Day,
    /// The point in time at which the next day starts.
    pub day_cutoff: Time,
    /// The offset of the user's local time from UTC, in seconds.
    ///
    /// This is only used to map days to calendar dates and weekdays.
    #[serde(default)]
    pub utc_offset: i32,
}

impl DayClock {
    /// Create a clock in UTC.
    pub fn new(today: Day, day_cutoff: Time) -> DayClock {
        DayClock { today, day_cutoff, utc_offset: 0 }
    }

    /// The point in time at which the current day started.
    pub fn today_start(&self) -> Time {
        self.day_cutoff - chrono::Duration::days(1)
    }

    /// The point in time at which day 0 started.
    pub fn epoch_start(&self) -> Time {
        self.today_start() - chrono::Duration::days(self.today)
    }

    /// The day that `time` belongs to.
    ///
    /// Points in time before the epoch are mapped to negative days.
    pub fn day_of(&self, time: Time) -> Day {
        (time - self.epoch_start()).num_milliseconds().div_euclid(DAY_MS)
    }

    /// The local calendar date on which day `day` starts.
    pub fn date_of(&self, day: Day) -> chrono::NaiveDate {
        self.local(self.epoch_start() + chrono::Duration::days(day)).date()
    }

    /// The day starting on the local calendar date `date`.
    ///
    /// Dates before the epoch are clamped to day 0.
    pub fn day_of_date(&self, date: chrono::NaiveDate) -> Day {
        (date - self.date_of(0)).num_days().max(0)
    }

    /// The weekday of day 0, counted from Monday (0) to Sunday (6).
    ///
    /// Rotating a Monday-first weekly pattern by this amount makes its first entry belong to the
    /// weekday of day 0.
    pub fn epoch_weekday(&self) -> usize {
        self.date_of(0).weekday().num_days_from_monday() as usize
    }

    /// The time left of the current day at `now`.
    ///
    /// This is negative if the day is already over.
    pub fn until_tomorrow(&self, now: Time) -> chrono::Duration {
        self.day_cutoff - now
    }

    /// Move the clock forward to the day containing `now`.
    ///
    /// Returns the number of days the clock moved. The clock never moves backwards.
    pub fn advance(&mut self, now: Time) -> Day {
        let days = (self.day_of(now) - self.today).max(0);
        self.today += days;
        self.day_cutoff = self.day_cutoff + chrono::Duration::days(days);
        days
    }

    /// Convert to local time.
    fn local(&self, time: Time) -> chrono::NaiveDateTime {
        time.naive_utc() + chrono::Duration::seconds(self.utc_offset as i64)
    }
}
