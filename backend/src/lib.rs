//! Rebalance -- Review Load Balancing for Spaced Repetition
//!
//! Cards that are due within the next days are moved, within a fraction of their interval, such
//! that the daily amount of reviews stays even and follows the capacity the user set for each
//! weekday and vacation.

extern crate chrono;
extern crate serde_yaml as yaml;

mod balance;
mod clock;
mod collection;
mod factors;
mod history;
mod orchestrator;
mod settings;
mod store;
mod vacations;

pub use balance::{Assignment, Balancer, Item, ItemId, OverdueRule, Window, load_by_day};
pub use clock::DayClock;
pub use collection::{Card, Collection, Deck, DeckId, Queue, ReviewEntry};
pub use factors::{Vacation, VacationId, WeeklyPattern, WEEKDAYS, build_day_factors};
pub use history::{anchor_day, candidates};
pub use orchestrator::{Error, GroupOutcome, GroupReport, Orchestrator, Plan, Report};
pub use settings::{GlobalSettings, Group, GroupId};
pub use store::{Store, StoreError};
pub use vacations::{
    VacationEntry, VacationError, add_vacation, day_off, list_vacations, new_vacation_id,
    prune_vacations, remove_vacation,
};

/// A day, counted from the day the collection was created.
pub type Day = i64;

/// A point in time.
pub type Time = chrono::DateTime<chrono::Utc>;

/// Get current time.
pub fn now() -> Time {
    chrono::Utc::now()
}
