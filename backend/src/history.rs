//! Reconstruction of unbalanced due days.
//!
//! The due day stored for a card may already be the result of an earlier balancing run. Balancing
//! it again from there would let cards drift further with every run, so cards are instead
//! balanced from their anchor day: the day of their last review plus their interval. The review
//! log is never rewritten by balancing, so the anchor is stable.

use tracing::trace;

use crate::balance::Item;
use crate::clock::DayClock;
use crate::store::Store;
use crate::{Day, Time};

/// The anchor day of a card with interval `interval` that was last reviewed at `last_review`.
///
/// Cards that are not yet learnt (interval below one day) and cards that were never reviewed have
/// no anchor.
pub fn anchor_day(clock: &DayClock, interval: i64, last_review: Option<Time>) -> Option<Day> {
    if interval < 1 {
        return None;
    }

    last_review.map(|time| clock.day_of(time) + interval)
}

/// Move `item` to its anchor day, if it has one.
pub fn reconstruct<S: Store + ?Sized>(store: &S, clock: &DayClock, item: Item) -> Option<Item> {
    let anchor = anchor_day(clock, item.interval, store.last_review(item.id));
    if anchor.is_none() {
        trace!(card = item.id, "no anchor day; not balanced");
    }

    anchor.map(|day| Item { day, ..item })
}

/// Move `items`, as read from `store`, to their anchor days.
///
/// Cards without an anchor day are left out. The anchor day may lie outside of the range the
/// items were read from.
pub fn candidates<S: Store + ?Sized>(store: &S, clock: &DayClock, items: &[Item]) -> Vec<Item> {
    items
        .iter()
        .filter_map(|&item| reconstruct(store, clock, item))
        .collect()
}
