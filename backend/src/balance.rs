//! Balancing of review load.
//!
//! Given the cards due within a horizon, the balancer moves each card to a nearby day such that
//! the number of reviews per day becomes roughly even, relative to the capacity of each day.
//!
//! The procedure is greedy and runs in a single pass. Cards are sorted after their "movability"
//! (long intervals and late due days move first) and each card is in turn placed on the day with
//! the lowest rating in its search window. The rating of a day is its current load, divided by
//! its capacity and multiplied by a mild penalty for the distance to the card's original day.
//! Once placed, a card is never reconsidered.

use std::cmp;

use serde::{Serialize, Deserialize};
use tracing::trace;

use crate::factors::{self, Vacation};
use crate::Day;

/// The identifier of a card.
pub type ItemId = i64;

/// A card that is to be balanced.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub struct Item {
    /// The ID of the card.
    pub id: ItemId,
    /// The (absolute) day the card is due on before balancing.
    pub day: Day,
    /// The current interval of the card in days.
    pub interval: i64,
}

/// The day a card was placed on.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub struct Assignment {
    /// The ID of the card.
    pub id: ItemId,
    /// The (absolute) day the card is now due on.
    pub day: Day,
}

/// How the overdue days of a card shrink its move budget.
#[derive(Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Debug)]
#[serde(rename_all = "kebab-case")]
pub enum OverdueRule {
    /// Overdue days are `offset - today`.
    ///
    /// `offset` is already relative to today, so this is only ever positive for collections on
    /// one of their first days. Kept for compatibility with existing schedules.
    Legacy,
    /// Overdue days are the number of days the card is past its due day.
    DaysOverdue,
}

impl OverdueRule {
    /// The number of overdue days of a card due `offset` days from `today`.
    fn overdue(self, offset: Day, today: Day) -> i64 {
        match self {
            OverdueRule::Legacy => cmp::max(0, offset - today),
            OverdueRule::DaysOverdue => cmp::max(0, -offset),
        }
    }
}

impl Default for OverdueRule {
    fn default() -> OverdueRule {
        OverdueRule::Legacy
    }
}

/// An inclusive range of days, relative to today.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub struct Window {
    /// The first day.
    pub start: Day,
    /// The last day.
    pub end: Day,
}

impl Window {
    /// Does this window contain all of `other`?
    pub fn contains(&self, other: &Window) -> bool {
        self.start <= other.start && other.end <= self.end
    }

    /// The total capacity of the days in the window.
    ///
    /// The factors are summed in ascending order of days.
    fn capacity(&self, factors: &[f64]) -> f64 {
        if self.end < self.start || self.end < 0 {
            0.0
        } else {
            factors[self.start as usize..=self.end as usize].iter().sum()
        }
    }
}

/// A balancing run.
///
/// This holds the parameters of a run. The run itself is done by `balance`, which has no side
/// effects, so a `Balancer` can be reused and shared freely.
#[derive(Clone, Copy, Debug)]
pub struct Balancer<'a> {
    /// The current day.
    today: Day,
    /// The number of reviews that were already done today.
    reviews_done_today: u32,
    /// The number of days (starting today) that cards can be placed on.
    horizon_days: usize,
    /// The fraction of its interval that a card may be moved by.
    move_strength: f64,
    /// How overdue cards are handled.
    overdue_rule: OverdueRule,
    /// The weekly capacity pattern, rotated such that the first entry is the weekday of day 0.
    weekdays: &'a [f64],
    /// The vacations.
    vacations: &'a [Vacation],
}

impl<'a> Balancer<'a> {
    /// Create a balancer with no reviews done today, a move strength of `0.1`, and the legacy
    /// overdue rule.
    pub fn new(today: Day, horizon_days: usize, weekdays: &'a [f64], vacations: &'a [Vacation]) -> Balancer<'a> {
        Balancer {
            today,
            reviews_done_today: 0,
            horizon_days,
            move_strength: 0.1,
            overdue_rule: OverdueRule::Legacy,
            weekdays,
            vacations,
        }
    }

    /// Set the number of reviews that were already done today.
    pub fn reviews_done_today(mut self, reviews: u32) -> Balancer<'a> {
        self.reviews_done_today = reviews;
        self
    }

    /// Set the move strength.
    pub fn move_strength(mut self, move_strength: f64) -> Balancer<'a> {
        self.move_strength = move_strength;
        self
    }

    /// Set the overdue rule.
    pub fn overdue_rule(mut self, overdue_rule: OverdueRule) -> Balancer<'a> {
        self.overdue_rule = overdue_rule;
        self
    }

    /// The capacity factors of the days in the horizon.
    pub fn day_factors(&self) -> Vec<f64> {
        factors::build_day_factors(self.today, self.horizon_days, self.weekdays, self.vacations)
    }

    /// The number of days a card may be moved in either direction.
    pub fn move_budget(&self, offset: Day, interval: i64) -> i64 {
        let overdue = self.overdue_rule.overdue(offset, self.today);
        let adjusted_interval = cmp::max(0, interval - overdue);

        cmp::max(0, (adjusted_interval as f64 * self.move_strength).floor() as i64)
    }

    /// Find the search window of a card due on `offset` with move budget `budget`.
    ///
    /// The window starts as the days within `budget` of `offset` and grows by a day on each side
    /// until its capacity is at least `budget + 1` or it spans the whole horizon. Returns the
    /// window and its capacity.
    ///
    /// The horizon must be nonempty.
    pub fn search_window(&self, offset: Day, budget: i64, factors: &[f64]) -> (Window, f64) {
        let last = self.horizon_days as Day - 1;
        let mut window = Window {
            start: cmp::max(0, offset.saturating_sub(budget)),
            end: cmp::min(last, offset.saturating_add(budget)),
        };

        loop {
            let capacity = window.capacity(factors);
            if capacity >= budget as f64 + 1.0 || (window.start == 0 && window.end == last) {
                return (window, capacity);
            }

            window.start = cmp::max(0, window.start - 1);
            window.end = cmp::min(last, window.end + 1);
        }
    }

    /// Balance `items`.
    ///
    /// Every card due before the end of the horizon gets exactly one assignment, in the order
    /// they were placed. Cards due after the horizon are left out. A card whose search window has
    /// no capacity keeps its day.
    pub fn balance(&self, items: &[Item]) -> Vec<Assignment> {
        if self.horizon_days == 0 {
            return Vec::new();
        }

        let horizon = self.horizon_days as Day;

        // The number of cards on each day. Overdue cards do not occupy any day.
        let mut day_counts = vec![0i64; self.horizon_days];
        // The cards to place, with their movability.
        let mut ranked = Vec::with_capacity(items.len());
        for item in items {
            let offset = item.day - self.today;
            if offset >= horizon { continue; }

            if offset >= 0 {
                day_counts[offset as usize] += 1;
            }
            let movability = (item.interval as f64).powf(0.8) + offset as f64;
            ranked.push((movability, item));
        }
        day_counts[0] += self.reviews_done_today as i64;

        // Most movable first. The sort is stable, so equally movable cards keep their order.
        ranked.sort_by(|a, b| b.0.total_cmp(&a.0));

        let factors = self.day_factors();
        let mut assignments = Vec::with_capacity(ranked.len());

        for (_, item) in ranked {
            let offset = item.day - self.today;
            let budget = self.move_budget(offset, item.interval);
            let (window, capacity) = self.search_window(offset, budget, &factors);

            let target = if capacity < 1.0 {
                None
            } else {
                pick_day(offset, window, &day_counts, &factors)
            };

            match target {
                Some(day) => {
                    day_counts[day as usize] += 1;
                    if offset >= 0 {
                        day_counts[offset as usize] -= 1;
                    }
                    assignments.push(Assignment { id: item.id, day: day + self.today });
                },
                None => {
                    // The card stays where it was, so the day counts are unchanged.
                    trace!(card = item.id, day = item.day, "no capacity in search window");
                    assignments.push(Assignment { id: item.id, day: item.day });
                },
            }
        }

        assignments
    }
}

/// Pick the day with the lowest rating in `window` for a card due on `offset`.
///
/// Days without capacity are never picked. On equal ratings, the later day wins.
fn pick_day(offset: Day, window: Window, day_counts: &[i64], factors: &[f64]) -> Option<Day> {
    let span = cmp::max(1, cmp::max(offset - window.start, window.end - offset)) as f64;

    let mut best: Option<(Day, f64)> = None;
    for day in window.start..=window.end {
        let factor = factors[day as usize];
        if factor <= 0.0 { continue; }

        // Slightly prefer days close to the original day.
        let penalty = 2.0 - ((day - offset) as f64 / span).cos();
        let rating = day_counts[day as usize] as f64 * penalty / factor;

        if best.map_or(true, |(_, best_rating)| rating <= best_rating) {
            best = Some((day, rating));
        }
    }

    best.map(|(day, _)| day)
}

/// Count the cards due on each of the `days` days starting on `today`.
pub fn load_by_day<I: IntoIterator<Item = Day>>(due: I, today: Day, days: usize) -> Vec<usize> {
    let mut load = vec![0; days];
    for day in due {
        let offset = day - today;
        if 0 <= offset && offset < days as Day {
            load[offset as usize] += 1;
        }
    }

    load
}
