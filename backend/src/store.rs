//! The interface to the storage of a collection.

use std::{error, fmt};

use crate::balance::{Assignment, Item, ItemId};
use crate::clock::DayClock;
use crate::settings::{Group, GroupId};
use crate::{Day, Time};

/// A store of cards, review history, and group settings.
///
/// The balancing procedure only reads through this interface, except for `commit`, which writes
/// the results of a group.
pub trait Store {
    /// The day clock of the collection.
    fn clock(&self) -> DayClock;

    /// All option groups, as configured.
    fn groups(&self) -> Vec<Group>;

    /// The learnt cards of `group` whose stored due day lies in `from..to`.
    fn review_items(&self, group: GroupId, from: Day, to: Day) -> Vec<Item>;

    /// The time of the most recent review of card `item`.
    fn last_review(&self, item: ItemId) -> Option<Time>;

    /// The number of reviews at or after `since` of learnt cards in `group`.
    fn reviews_since(&self, group: GroupId, since: Time) -> u32;

    /// Set the due days of the cards of `group`.
    ///
    /// This must either apply all of `assignments` or none of them.
    fn commit(&mut self, group: GroupId, assignments: &[Assignment]) -> Result<(), StoreError>;

    /// Tell the host that due days have changed.
    fn refresh(&mut self) {}
}

/// An error while writing to a store.
#[derive(Debug)]
pub enum StoreError {
    /// The card does not exist.
    UnknownItem(ItemId),
    /// The card exists, but belongs to another group.
    ForeignItem {
        /// The card.
        item: ItemId,
        /// The group that was written to.
        group: GroupId,
    },
}

impl error::Error for StoreError {}

impl fmt::Display for StoreError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match *self {
            StoreError::UnknownItem(item) => write!(f, "card {} does not exist", item),
            StoreError::ForeignItem { item, group } => write!(f, "card {} is not in group {}", item, group),
        }
    }
}
