//! Balancing of whole collections, group by group.

use std::collections::HashMap;
use std::{error, fmt};

use tracing::{debug, info, warn};

use crate::balance::{Assignment, Balancer, ItemId};
use crate::clock::DayClock;
use crate::history;
use crate::settings::{GlobalSettings, Group, GroupId};
use crate::store::Store;
use crate::{Day, Time};

/// An error that prevents a run from starting.
#[derive(Debug)]
pub enum Error {
    /// The day cutoff is too close (or has passed) for a run to be safe.
    TooCloseToCutoff {
        /// The number of seconds left of the day; negative if the day is over.
        secs_left: i64,
    },
}

impl error::Error for Error {}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match *self {
            Error::TooCloseToCutoff { secs_left } if secs_left < 0 =>
                write!(f, "the day ended {} seconds ago; advance the clock first", -secs_left),
            Error::TooCloseToCutoff { secs_left } =>
                write!(f, "only {} seconds left of the day; try again after the day cutoff", secs_left),
        }
    }
}

/// The result of balancing a group.
#[derive(Clone, PartialEq, Debug)]
pub enum GroupOutcome {
    /// Balancing is disabled for the group; nothing was touched.
    Skipped,
    /// The group was balanced.
    Balanced {
        /// The number of cards that were considered.
        candidates: usize,
        /// The number of cards whose due day changed.
        moved: usize,
    },
    /// The results could not be written; nothing was changed.
    Failed(String),
}

/// The result of balancing a group, with the identity of the group.
#[derive(Clone, Debug)]
pub struct GroupReport {
    /// The ID of the group.
    pub id: GroupId,
    /// The name of the group.
    pub name: String,
    /// What happened to it.
    pub outcome: GroupOutcome,
}

/// The result of a run.
#[derive(Clone, Debug, Default)]
pub struct Report {
    /// The groups, in the order they were processed.
    pub groups: Vec<GroupReport>,
}

impl Report {
    /// The groups whose results could not be written.
    pub fn failures(&self) -> impl Iterator<Item = &GroupReport> {
        self.groups.iter().filter(|group| match group.outcome {
            GroupOutcome::Failed(_) => true,
            _ => false,
        })
    }

    /// The total number of cards that were moved.
    pub fn moved(&self) -> usize {
        self.groups.iter()
            .map(|group| match group.outcome {
                GroupOutcome::Balanced { moved, .. } => moved,
                _ => 0,
            })
            .sum()
    }
}

/// The planned new due days of a group, before they are written.
#[derive(Clone, Debug)]
pub struct Plan {
    /// The new due days.
    pub assignments: Vec<Assignment>,
    /// The number of cards that were considered.
    pub candidates: usize,
    /// The number of cards whose due day changes.
    pub moved: usize,
}

/// Runs the balancer over the groups of a store.
#[derive(Clone, Debug, Default)]
pub struct Orchestrator {
    /// The global settings.
    settings: GlobalSettings,
}

impl Orchestrator {
    /// Create an orchestrator.
    pub fn new(settings: GlobalSettings) -> Orchestrator {
        Orchestrator { settings }
    }

    /// Balance every enabled group of `store` and tell the host to refresh.
    ///
    /// A group whose results cannot be written is reported as failed, without affecting the
    /// other groups.
    pub fn run_all<S: Store>(&self, store: &mut S, now: Time) -> Result<Report, Error> {
        let clock = store.clock();

        // Refuse to run if "today" might change during the run.
        let left = clock.until_tomorrow(now);
        if left < chrono::Duration::seconds(self.settings.safety_margin_secs) {
            return Err(Error::TooCloseToCutoff { secs_left: left.num_seconds() });
        }

        let mut report = Report::default();
        for group in store.groups() {
            let group = group.sanitized();
            let outcome = self.run_group(store, &clock, &group);
            report.groups.push(GroupReport { id: group.id, name: group.name, outcome });
        }

        store.refresh();

        Ok(report)
    }

    /// Balance a single group and write the results.
    pub fn run_group<S: Store>(&self, store: &mut S, clock: &DayClock, group: &Group) -> GroupOutcome {
        if !group.enabled {
            debug!(group = group.id, "balancing disabled; skipping");
            return GroupOutcome::Skipped;
        }

        let plan = self.plan(&*store, clock, group);

        match store.commit(group.id, &plan.assignments) {
            Ok(()) => {
                info!(group = group.id, candidates = plan.candidates, moved = plan.moved, "group balanced");
                GroupOutcome::Balanced { candidates: plan.candidates, moved: plan.moved }
            },
            Err(err) => {
                warn!(group = group.id, error = %err, "failed to write balanced due days");
                GroupOutcome::Failed(err.to_string())
            },
        }
    }

    /// Compute the new due days of a group without writing them.
    pub fn plan<S: Store + ?Sized>(&self, store: &S, clock: &DayClock, group: &Group) -> Plan {
        let horizon_days = self.settings.horizon_days;

        let items = store.review_items(group.id, clock.today, clock.today + horizon_days as Day);
        // The stored due days, to tell which cards actually move.
        let stored: HashMap<ItemId, Day> = items.iter().map(|item| (item.id, item.day)).collect();
        let candidates = history::candidates(store, clock, &items);
        let reviews_done_today = store.reviews_since(group.id, clock.today_start());

        // Align the Monday-first pattern with day 0, which the balancer counts weekdays from.
        let week = group.week.rotated(clock.epoch_weekday());

        let assignments = Balancer::new(clock.today, horizon_days, week.as_slice(), &group.vacations)
            .reviews_done_today(reviews_done_today)
            .move_strength(group.move_strength)
            .overdue_rule(self.settings.overdue)
            .balance(&candidates);

        let moved = assignments.iter()
            .filter(|a| stored.get(&a.id) != Some(&a.day))
            .count();

        Plan { assignments, candidates: candidates.len(), moved }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::cell::Cell;

    use chrono::{Datelike, TimeZone};

    use crate::balance::Item;
    use crate::collection::{Card, Collection, Deck, Queue, ReviewEntry};
    use crate::factors::{Vacation, WeeklyPattern};
    use crate::store::StoreError;

    /// A collection on day 20, with day 0 on Monday 2024-01-01, and a day cutoff at 04:00 UTC.
    ///
    /// Group 1 and group 2 each have one deck with 30 cards piled up on day 25, all of them with
    /// an interval of 30 days and last reviewed on day -5.
    fn collection() -> Collection {
        let clock = DayClock::new(20, chrono::Utc.ymd(2024, 1, 22).and_hms(4, 0, 0));
        let mut collection = Collection::new(clock);
        collection.settings.horizon_days = 30;

        for &group in &[1, 2] {
            let mut g = Group::new(group, &format!("group {}", group));
            g.enabled = true;
            g.move_strength = 0.2;
            collection.groups.push(g);
            collection.decks.push(Deck { id: group * 100, name: String::new(), group: Some(group) });

            for n in 0..30 {
                let id = group * 1000 + n;
                collection.cards.push(Card { id, deck: group * 100, queue: Queue::Review, due: 25, interval: 30 });
                collection.revlog.push(ReviewEntry { card: id, time: clock.epoch_start() + chrono::Duration::hours(12) - chrono::Duration::days(5) });
            }
        }

        collection
    }

    /// Noon of today.
    fn noon(collection: &Collection) -> Time {
        collection.clock.today_start() + chrono::Duration::hours(8)
    }

    fn due_days(collection: &Collection, group: GroupId) -> Vec<Day> {
        collection.cards.iter().filter(|c| c.id / 1000 == group).map(|c| c.due).collect()
    }

    /// A store whose writes to one group always fail.
    struct Flaky {
        inner: Collection,
        broken: GroupId,
        refreshed: bool,
        reads: Cell<usize>,
    }

    impl Store for Flaky {
        fn clock(&self) -> DayClock { self.inner.clock() }
        fn groups(&self) -> Vec<Group> { self.inner.groups() }
        fn review_items(&self, group: GroupId, from: Day, to: Day) -> Vec<Item> {
            self.reads.set(self.reads.get() + 1);
            self.inner.review_items(group, from, to)
        }
        fn last_review(&self, item: ItemId) -> Option<Time> { self.inner.last_review(item) }
        fn reviews_since(&self, group: GroupId, since: Time) -> u32 { self.inner.reviews_since(group, since) }
        fn commit(&mut self, group: GroupId, assignments: &[Assignment]) -> Result<(), StoreError> {
            if group == self.broken {
                Err(StoreError::UnknownItem(assignments[0].id))
            } else {
                self.inner.commit(group, assignments)
            }
        }
        fn refresh(&mut self) { self.refreshed = true; }
    }

    #[test]
    fn spreads_pile() {
        let mut collection = collection();
        let now = noon(&collection);
        let report = Orchestrator::new(collection.settings.clone()).run_all(&mut collection, now).unwrap();

        assert_eq!(report.groups.len(), 2);
        // Two cards stay on day 25.
        assert_eq!(report.groups[0].outcome, GroupOutcome::Balanced { candidates: 30, moved: 28 });
        assert_eq!(report.moved(), 56);
        assert_eq!(report.failures().count(), 0);

        // The move budget is 6 days, which reaches back to today.
        let due = due_days(&collection, 1);
        assert!(due.iter().all(|&day| 20 <= day && day <= 31));
        let load = crate::balance::load_by_day(due, 20, 12);
        assert!(load.iter().all(|&n| 2 <= n && n <= 3), "uneven load {:?}", load);
    }

    #[test]
    fn disabled_group_untouched() {
        let mut collection = collection();
        collection.groups[1].enabled = false;
        let now = noon(&collection);
        let report = Orchestrator::new(collection.settings.clone()).run_all(&mut collection, now).unwrap();

        assert_eq!(report.groups[1].outcome, GroupOutcome::Skipped);
        assert!(due_days(&collection, 2).iter().all(|&day| day == 25));
        assert!(due_days(&collection, 1).iter().any(|&day| day != 25));
    }

    #[test]
    fn failure_is_isolated() {
        let mut store = Flaky { inner: collection(), broken: 1, refreshed: false, reads: Cell::new(0) };
        let now = noon(&store.inner);
        let settings = store.inner.settings.clone();
        let report = Orchestrator::new(settings).run_all(&mut store, now).unwrap();

        assert_eq!(report.failures().map(|g| g.id).collect::<Vec<_>>(), vec![1]);
        assert_eq!(report.groups[0].outcome, GroupOutcome::Failed("card 1000 does not exist".to_string()));
        assert!(due_days(&store.inner, 1).iter().all(|&day| day == 25));
        assert!(due_days(&store.inner, 2).iter().any(|&day| day != 25));
        assert!(store.refreshed);
    }

    #[test]
    fn near_cutoff() {
        let mut collection = collection();
        let almost = collection.clock.day_cutoff - chrono::Duration::seconds(3);
        let orchestrator = Orchestrator::new(collection.settings.clone());

        match orchestrator.run_all(&mut collection, almost) {
            Err(Error::TooCloseToCutoff { secs_left: 3 }) => (),
            other => panic!("unexpected result {:?}", other),
        }
        let late = collection.clock.day_cutoff + chrono::Duration::hours(1);
        assert!(orchestrator.run_all(&mut collection, late).is_err());
        assert!(due_days(&collection, 1).iter().all(|&day| day == 25));
    }

    #[test]
    fn weekly_pattern_follows_calendar() {
        let mut collection = collection();
        // No reviews on Sundays.
        collection.groups[0].week = WeeklyPattern::new(vec![1.0, 1.0, 1.0, 1.0, 1.0, 1.0, 0.0]);
        // Make day 0 a Wednesday.
        collection.clock = DayClock::new(20, chrono::Utc.ymd(2024, 1, 24).and_hms(4, 0, 0));
        for entry in &mut collection.revlog {
            entry.time = entry.time + chrono::Duration::days(2);
        }
        let now = noon(&collection);
        Orchestrator::new(collection.settings.clone()).run_all(&mut collection, now).unwrap();

        let clock = collection.clock;
        for day in due_days(&collection, 1) {
            assert_ne!(clock.date_of(day).weekday(), chrono::Weekday::Sun, "card on day {}", day);
        }
    }

    #[test]
    fn vacation_keeps_days_free() {
        let mut collection = collection();
        collection.groups[0].vacations.push(Vacation { id: 1, start: 22, end: 24, factor: 0.0 });
        let now = noon(&collection);
        Orchestrator::new(collection.settings.clone()).run_all(&mut collection, now).unwrap();

        assert!(due_days(&collection, 1).iter().all(|&day| day < 22 || day > 24));
        assert!(due_days(&collection, 2).iter().any(|&day| 22 <= day && day <= 24));
    }

    #[test]
    fn malformed_week_falls_back() {
        let mut collection = collection();
        collection.groups[0].week = WeeklyPattern::new(vec![0.0; 3]);
        let now = noon(&collection);
        Orchestrator::new(collection.settings.clone()).run_all(&mut collection, now).unwrap();

        let mut normal = self::collection();
        Orchestrator::new(normal.settings.clone()).run_all(&mut normal, now).unwrap();
        assert_eq!(due_days(&collection, 1), due_days(&normal, 1));
    }

    #[test]
    fn plan_does_not_write() {
        let collection = collection();
        let orchestrator = Orchestrator::new(collection.settings.clone());
        let group = collection.groups[0].clone();
        let plan = orchestrator.plan(&collection, &collection.clock, &group);

        assert_eq!(plan.assignments.len(), 30);
        assert_eq!(plan.candidates, 30);
        assert_eq!(plan.moved, 28);
        assert!(due_days(&collection, 1).iter().all(|&day| day == 25));
    }

    #[test]
    fn reads_cards_once_per_group() {
        let store = Flaky { inner: collection(), broken: 0, refreshed: false, reads: Cell::new(0) };
        let orchestrator = Orchestrator::new(store.inner.settings.clone());
        let group = store.inner.groups[0].clone();
        let plan = orchestrator.plan(&store, &store.inner.clock, &group);

        assert_eq!(plan.candidates, 30);
        assert_eq!(store.reads.get(), 1);
    }
}
