//! Management of vacations.
//!
//! A vacation is created once but stored in every group it applies to, under the same ID. The
//! functions here keep those copies consistent.

use std::collections::BTreeMap;
use std::{error, fmt};

use crate::factors::{Vacation, VacationId};
use crate::settings::{Group, GroupId};
use crate::{Day, Time};

/// An error while changing vacations.
#[derive(Debug, PartialEq)]
pub enum VacationError {
    /// The vacation ends before it starts.
    InvalidRange {
        /// The first day.
        start: Day,
        /// The last day.
        end: Day,
    },
    /// The factor is not between 0 and 1.
    InvalidFactor(f64),
    /// A selected group does not exist.
    UnknownGroup(GroupId),
    /// None of the selected groups has balancing enabled.
    NoEnabledGroup,
    /// No vacation has the ID.
    UnknownVacation(VacationId),
}

impl error::Error for VacationError {}

impl fmt::Display for VacationError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match *self {
            VacationError::InvalidRange { start, end } => write!(f, "vacation ends (day {}) before it starts (day {})", end, start),
            VacationError::InvalidFactor(factor) => write!(f, "review amount {} is not between 0 and 1", factor),
            VacationError::UnknownGroup(group) => write!(f, "group {} does not exist", group),
            VacationError::NoEnabledGroup => write!(f, "none of the groups has balancing enabled"),
            VacationError::UnknownVacation(id) => write!(f, "vacation {} does not exist", id),
        }
    }
}

/// A vacation with the groups it applies to.
#[derive(Clone, PartialEq, Debug)]
pub struct VacationEntry {
    /// The vacation.
    pub vacation: Vacation,
    /// The groups that have the vacation.
    pub groups: Vec<GroupId>,
}

/// Generate the ID of a vacation created at `now`.
///
/// IDs are millisecond timestamps. `seq` tells apart vacations created at the same time.
pub fn new_vacation_id(now: Time, seq: i64) -> VacationId {
    now.timestamp_millis() + seq
}

/// Add `vacation` to the groups in `targets`.
///
/// If `targets` is empty, all groups are selected. Groups with balancing disabled are skipped,
/// since vacations have no effect on them. Returns the number of groups that got the vacation.
pub fn add_vacation(groups: &mut [Group], vacation: Vacation, targets: &[GroupId]) -> Result<usize, VacationError> {
    // Validate the vacation.
    if vacation.end < vacation.start {
        return Err(VacationError::InvalidRange { start: vacation.start, end: vacation.end });
    }
    if !(0.0..=1.0).contains(&vacation.factor) {
        return Err(VacationError::InvalidFactor(vacation.factor));
    }
    // Validate the selection.
    if let Some(&missing) = targets.iter().find(|&&id| !groups.iter().any(|g| g.id == id)) {
        return Err(VacationError::UnknownGroup(missing));
    }

    let mut added = 0;
    for group in groups.iter_mut() {
        let selected = targets.is_empty() || targets.contains(&group.id);
        if selected && group.enabled {
            group.vacations.push(vacation);
            added += 1;
        }
    }

    if added == 0 {
        Err(VacationError::NoEnabledGroup)
    } else {
        Ok(added)
    }
}

/// Reduce the reviews of today to `factor` of the usual amount.
///
/// This is a vacation covering today only. Overdue cards are not affected, since they are due
/// before today.
pub fn day_off(groups: &mut [Group], today: Day, factor: f64, targets: &[GroupId], id: VacationId) -> Result<usize, VacationError> {
    add_vacation(groups, Vacation { id, start: today, end: today, factor }, targets)
}

/// List the vacations that are not over yet, ordered by ID.
///
/// Vacations that end before the start are left out.
pub fn list_vacations(groups: &[Group], today: Day) -> Vec<VacationEntry> {
    let mut entries: BTreeMap<VacationId, VacationEntry> = BTreeMap::new();
    for group in groups {
        for vacation in &group.vacations {
            if vacation.end < vacation.start || vacation.end < today {
                continue;
            }

            entries
                .entry(vacation.id)
                .or_insert_with(|| VacationEntry { vacation: *vacation, groups: Vec::new() })
                .groups
                .push(group.id);
        }
    }

    entries.into_iter().map(|(_, entry)| entry).collect()
}

/// Remove the vacation `id` from all groups.
///
/// Returns the number of groups it was removed from.
pub fn remove_vacation(groups: &mut [Group], id: VacationId) -> Result<usize, VacationError> {
    let mut removed = 0;
    for group in groups.iter_mut() {
        let before = group.vacations.len();
        group.vacations.retain(|vacation| vacation.id != id);
        removed += before - group.vacations.len();
    }

    if removed == 0 {
        Err(VacationError::UnknownVacation(id))
    } else {
        Ok(removed)
    }
}

/// Remove vacations that are over or that end before they start.
///
/// Returns the number of removed entries.
pub fn prune_vacations(groups: &mut [Group], today: Day) -> usize {
    let mut removed = 0;
    for group in groups.iter_mut() {
        let before = group.vacations.len();
        group.vacations.retain(|vacation| vacation.start <= vacation.end && today <= vacation.end);
        removed += before - group.vacations.len();
    }

    removed
}

#[cfg(test)]
mod tests {
    use super::*;

    use chrono::TimeZone;

    fn groups() -> Vec<Group> {
        let mut groups = vec![Group::new(1, "Japanese"), Group::new(2, "Spanish"), Group::new(3, "Off")];
        groups[0].enabled = true;
        groups[1].enabled = true;
        groups
    }

    fn vacation(id: VacationId, start: Day, end: Day, factor: f64) -> Vacation {
        Vacation { id, start, end, factor }
    }

    #[test]
    fn add_to_enabled_groups() {
        let mut groups = groups();
        assert_eq!(add_vacation(&mut groups, vacation(7, 10, 12, 0.5), &[]), Ok(2));
        assert_eq!(groups[0].vacations, vec![vacation(7, 10, 12, 0.5)]);
        assert_eq!(groups[1].vacations, vec![vacation(7, 10, 12, 0.5)]);
        assert!(groups[2].vacations.is_empty());

        assert_eq!(add_vacation(&mut groups, vacation(8, 10, 12, 0.0), &[2]), Ok(1));
        assert_eq!(groups[0].vacations.len(), 1);
        assert_eq!(groups[1].vacations.len(), 2);
    }

    #[test]
    fn add_invalid() {
        let mut groups = groups();
        assert_eq!(
            add_vacation(&mut groups, vacation(7, 12, 10, 0.5), &[]),
            Err(VacationError::InvalidRange { start: 12, end: 10 }),
        );
        assert_eq!(add_vacation(&mut groups, vacation(7, 10, 12, 1.5), &[]), Err(VacationError::InvalidFactor(1.5)));
        assert_eq!(add_vacation(&mut groups, vacation(7, 10, 12, 0.5), &[1, 9]), Err(VacationError::UnknownGroup(9)));
        assert_eq!(add_vacation(&mut groups, vacation(7, 10, 12, 0.5), &[3]), Err(VacationError::NoEnabledGroup));
        assert!(groups.iter().all(|g| g.vacations.is_empty()));
    }

    #[test]
    fn day_off_covers_today() {
        let mut groups = groups();
        assert_eq!(day_off(&mut groups, 42, 0.25, &[1], 99), Ok(1));
        assert_eq!(groups[0].vacations, vec![vacation(99, 42, 42, 0.25)]);
    }

    #[test]
    fn list() {
        let mut groups = groups();
        groups[0].vacations = vec![vacation(5, 10, 20, 0.0), vacation(3, 1, 4, 0.5), vacation(9, 30, 25, 0.5)];
        groups[1].vacations = vec![vacation(5, 10, 20, 0.0), vacation(4, 8, 8, 0.1)];

        assert_eq!(list_vacations(&groups, 8), vec![
            VacationEntry { vacation: vacation(4, 8, 8, 0.1), groups: vec![2] },
            VacationEntry { vacation: vacation(5, 10, 20, 0.0), groups: vec![1, 2] },
        ]);
        assert_eq!(list_vacations(&groups, 9).len(), 1);
    }

    #[test]
    fn remove() {
        let mut groups = groups();
        add_vacation(&mut groups, vacation(5, 10, 20, 0.0), &[]).unwrap();
        add_vacation(&mut groups, vacation(6, 10, 20, 0.0), &[1]).unwrap();

        assert_eq!(remove_vacation(&mut groups, 5), Ok(2));
        assert_eq!(groups[0].vacations, vec![vacation(6, 10, 20, 0.0)]);
        assert!(groups[1].vacations.is_empty());
        assert_eq!(remove_vacation(&mut groups, 5), Err(VacationError::UnknownVacation(5)));
    }

    #[test]
    fn prune() {
        let mut groups = groups();
        groups[0].vacations = vec![vacation(1, 1, 4, 0.5), vacation(2, 4, 9, 0.5), vacation(3, 9, 5, 0.5)];
        groups[2].vacations = vec![vacation(1, 1, 4, 0.5)];

        assert_eq!(prune_vacations(&mut groups, 5), 3);
        assert_eq!(groups[0].vacations, vec![vacation(2, 4, 9, 0.5)]);
        assert!(groups[2].vacations.is_empty());
    }

    #[test]
    fn ids() {
        let now = chrono::Utc.ymd(2024, 1, 1).and_hms(0, 0, 0);
        assert_eq!(new_vacation_id(now, 0), 1_704_067_200_000);
        assert_eq!(new_vacation_id(now, 2), 1_704_067_200_002);
    }
}
