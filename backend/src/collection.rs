//! Collections stored as YAML.
//!
//! A collection holds everything the balancer needs to know about a user's cards: the day clock,
//! the option groups, the decks and the groups they belong to, the cards, and the review log. It
//! is the persistent state of `rebalance`; only the due days of cards and the vacations of groups
//! are ever changed.

use std::collections::{HashMap, HashSet};

use serde::{Serialize, Deserialize};

use crate::balance::{Assignment, Item, ItemId};
use crate::clock::DayClock;
use crate::settings::{GlobalSettings, Group, GroupId};
use crate::store::{Store, StoreError};
use crate::{Day, Time};

/// The identifier of a deck.
pub type DeckId = i64;

/// A deck.
#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct Deck {
    /// The ID of the deck.
    pub id: DeckId,
    /// The name of the deck.
    #[serde(default)]
    pub name: String,
    /// The option group of the deck, if any.
    #[serde(default)]
    pub group: Option<GroupId>,
}

/// The queue a card is in.
#[derive(Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Debug)]
#[serde(rename_all = "lowercase")]
pub enum Queue {
    /// Never reviewed.
    New,
    /// Being learnt or relearnt.
    Learning,
    /// Learnt; reviewed on its due day.
    Review,
    /// Not shown.
    Suspended,
}

/// A card.
#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct Card {
    /// The ID of the card.
    pub id: ItemId,
    /// The deck of the card.
    pub deck: DeckId,
    /// The queue of the card.
    pub queue: Queue,
    /// The day the card is due on.
    pub due: Day,
    /// The interval of the card in days.
    #[serde(default)]
    pub interval: i64,
}

/// An entry in the review log.
#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct ReviewEntry {
    /// The reviewed card.
    pub card: ItemId,
    /// The time of the review.
    pub time: Time,
}

/// A collection of cards.
#[derive(Serialize, Deserialize, Debug)]
pub struct Collection {
    /// The global settings.
    #[serde(default)]
    pub settings: GlobalSettings,
    /// The day clock.
    pub clock: DayClock,
    /// The option groups.
    #[serde(default)]
    pub groups: Vec<Group>,
    /// The decks.
    #[serde(default)]
    pub decks: Vec<Deck>,
    /// The cards.
    #[serde(default)]
    pub cards: Vec<Card>,
    /// The review log, in any order.
    #[serde(default)]
    pub revlog: Vec<ReviewEntry>,
}

impl Collection {
    /// Create an empty collection.
    pub fn new(clock: DayClock) -> Collection {
        Collection {
            settings: GlobalSettings::default(),
            clock,
            groups: Vec::new(),
            decks: Vec::new(),
            cards: Vec::new(),
            revlog: Vec::new(),
        }
    }

    /// Load from YAML-formatted text.
    pub fn parse(input: &str) -> Result<Collection, yaml::Error> {
        yaml::from_str(input)
    }

    /// Serialize to YAML-formatted text.
    ///
    /// This is the inverse to `parse`.
    pub fn serialize(&self) -> Result<String, yaml::Error> {
        yaml::to_string(self)
    }

    /// Get a group by ID.
    pub fn group(&self, id: GroupId) -> Option<&Group> {
        self.groups.iter().find(|group| group.id == id)
    }

    /// The decks of group `group`.
    fn decks_of(&self, group: GroupId) -> HashSet<DeckId> {
        self.decks.iter()
            .filter(|deck| deck.group == Some(group))
            .map(|deck| deck.id)
            .collect()
    }

    /// The cards of group `group`.
    fn cards_of<'a>(&'a self, group: GroupId) -> impl Iterator<Item = &'a Card> + 'a {
        let decks = self.decks_of(group);
        self.cards.iter().filter(move |card| decks.contains(&card.deck))
    }
}

impl Store for Collection {
    fn clock(&self) -> DayClock {
        self.clock
    }

    fn groups(&self) -> Vec<Group> {
        self.groups.clone()
    }

    fn review_items(&self, group: GroupId, from: Day, to: Day) -> Vec<Item> {
        self.cards_of(group)
            .filter(|card| card.queue == Queue::Review && from <= card.due && card.due < to)
            .map(|card| Item { id: card.id, day: card.due, interval: card.interval })
            .collect()
    }

    fn last_review(&self, item: ItemId) -> Option<Time> {
        self.revlog.iter()
            .filter(|entry| entry.card == item)
            .map(|entry| entry.time)
            .max()
    }

    fn reviews_since(&self, group: GroupId, since: Time) -> u32 {
        let learnt: HashSet<ItemId> = self.cards_of(group)
            .filter(|card| card.interval >= 1)
            .map(|card| card.id)
            .collect();

        self.revlog.iter()
            .filter(|entry| entry.time >= since && learnt.contains(&entry.card))
            .count() as u32
    }

    fn commit(&mut self, group: GroupId, assignments: &[Assignment]) -> Result<(), StoreError> {
        let decks = self.decks_of(group);
        let index: HashMap<ItemId, usize> = self.cards.iter()
            .enumerate()
            .map(|(n, card)| (card.id, n))
            .collect();

        // Check everything before writing anything.
        let mut writes = Vec::with_capacity(assignments.len());
        for assignment in assignments {
            let n = *index.get(&assignment.id).ok_or(StoreError::UnknownItem(assignment.id))?;
            if !decks.contains(&self.cards[n].deck) {
                return Err(StoreError::ForeignItem { item: assignment.id, group });
            }
            writes.push((n, assignment.day));
        }

        for (n, day) in writes {
            self.cards[n].due = day;
        }

        Ok(())
    }
}
