//! User customization and settings.

use serde::{Serialize, Deserialize};
use tracing::warn;

use crate::balance::OverdueRule;
use crate::factors::{Vacation, WeeklyPattern};

/// The identifier of an option group.
pub type GroupId = i64;

/// The move strength of groups that do not specify one.
const DEFAULT_MOVE_STRENGTH: f64 = 0.1;

/// Global settings.
#[derive(Serialize, Deserialize, Clone, PartialEq, Debug)]
#[serde(default)]
pub struct GlobalSettings {
    /// The number of days, starting today, within which cards are balanced.
    pub horizon_days: usize,
    /// The minimal number of seconds that must be left of the day for a run to start.
    ///
    /// A run that crosses the day cutoff would balance against the wrong day.
    pub safety_margin_secs: i64,
    /// How the overdue days of a card shrink its move budget.
    pub overdue: OverdueRule,
}

impl Default for GlobalSettings {
    fn default() -> GlobalSettings {
        GlobalSettings {
            horizon_days: 100,
            safety_margin_secs: 5,
            overdue: OverdueRule::Legacy,
        }
    }
}

/// An option group.
///
/// A group governs the balancing of all the cards in its decks.
#[derive(Serialize, Deserialize, Clone, PartialEq, Debug)]
pub struct Group {
    /// The ID of the group.
    pub id: GroupId,
    /// The name of the group.
    #[serde(default)]
    pub name: String,
    /// Whether cards in this group are balanced at all.
    #[serde(default)]
    pub enabled: bool,
    /// The fraction of its interval that a card may be moved by.
    ///
    /// For example, `0.1` allows a card with an interval of 30 days to be moved 3 days earlier or
    /// later.
    #[serde(default = "default_move_strength")]
    pub move_strength: f64,
    /// The capacity of each weekday, starting on Monday.
    #[serde(default)]
    pub week: WeeklyPattern,
    /// The vacations of the group.
    #[serde(default)]
    pub vacations: Vec<Vacation>,
}

fn default_move_strength() -> f64 {
    DEFAULT_MOVE_STRENGTH
}

impl Group {
    /// Create a disabled group with default settings.
    pub fn new(id: GroupId, name: &str) -> Group {
        Group {
            id,
            name: name.to_string(),
            enabled: false,
            move_strength: DEFAULT_MOVE_STRENGTH,
            week: WeeklyPattern::default(),
            vacations: Vec::new(),
        }
    }

    /// Replace malformed settings by their defaults.
    ///
    /// Vacation factors are clamped to the range 0-1.
    pub fn sanitized(mut self) -> Group {
        if !self.week.is_valid() {
            warn!(group = self.id, week = %self.week, "malformed weekly pattern; using default");
            self.week = WeeklyPattern::default();
        }
        if !self.move_strength.is_finite() || self.move_strength < 0.0 {
            warn!(group = self.id, move_strength = self.move_strength, "malformed move strength; using default");
            self.move_strength = DEFAULT_MOVE_STRENGTH;
        }
        for vacation in &mut self.vacations {
            // `f64::max` discards NaN, so a NaN factor becomes 0.
            vacation.factor = vacation.factor.max(0.0).min(1.0);
        }

        self
    }
}
