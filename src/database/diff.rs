//! Set arithmetic behind the recipe write transaction.
//!
//! A recipe's associations are replaced wholesale on update; these helpers
//! compute the minimal set of statements that turns the stored state into
//! the incoming one without touching storage.

use std::collections::{BTreeMap, BTreeSet};

use super::schema::Id;

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct SetDiff<K: Ord> {
    pub delete: BTreeSet<K>,
    pub insert: BTreeSet<K>,
}

impl<K: Ord> SetDiff<K> {
    pub fn is_empty(&self) -> bool {
        self.delete.is_empty() && self.insert.is_empty()
    }
}

pub fn diff_sets<K: Ord + Clone>(existing: &BTreeSet<K>, incoming: &BTreeSet<K>) -> SetDiff<K> {
    SetDiff {
        delete: existing.difference(incoming).cloned().collect(),
        insert: incoming.difference(existing).cloned().collect(),
    }
}

/// Changes to a recipe's (ingredient id -> amount) associations.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct AmountDiff {
    pub delete: BTreeSet<Id>,
    pub insert: BTreeMap<Id, i32>,
    /// Ingredients kept by the update whose amount changed.
    pub update: BTreeMap<Id, i32>,
}

impl AmountDiff {
    pub fn is_empty(&self) -> bool {
        self.delete.is_empty() && self.insert.is_empty() && self.update.is_empty()
    }
}

pub fn diff_amounts(existing: &BTreeMap<Id, i32>, incoming: &BTreeMap<Id, i32>) -> AmountDiff {
    let existing_ids: BTreeSet<Id> = existing.keys().copied().collect();
    let incoming_ids: BTreeSet<Id> = incoming.keys().copied().collect();
    let ids = diff_sets(&existing_ids, &incoming_ids);

    let insert = ids.insert.iter().map(|id| (*id, incoming[id])).collect();
    let update = incoming
        .iter()
        .filter(|(id, amount)| existing.get(*id).is_some_and(|old| old != *amount))
        .map(|(id, amount)| (*id, *amount))
        .collect();

    AmountDiff {
        delete: ids.delete,
        insert,
        update,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn amounts(pairs: &[(Id, i32)]) -> BTreeMap<Id, i32> {
        pairs.iter().copied().collect()
    }

    fn apply_amounts(existing: &BTreeMap<Id, i32>, diff: &AmountDiff) -> BTreeMap<Id, i32> {
        let mut result = existing.clone();
        diff.delete.iter().for_each(|id| {
            result.remove(id);
        });
        result.extend(diff.insert.iter().map(|(id, amount)| (*id, *amount)));
        result.extend(diff.update.iter().map(|(id, amount)| (*id, *amount)));
        result
    }

    #[test]
    fn replaces_full_ingredient_set() {
        // {A:2, B:3} -> {B:5, C:1}
        let existing = amounts(&[(1, 2), (2, 3)]);
        let incoming = amounts(&[(2, 5), (3, 1)]);

        let diff = diff_amounts(&existing, &incoming);
        assert_eq!(diff.delete, BTreeSet::from([1]));
        assert_eq!(diff.insert, amounts(&[(3, 1)]));
        assert_eq!(diff.update, amounts(&[(2, 5)]));
        assert_eq!(apply_amounts(&existing, &diff), incoming);
    }

    #[test]
    fn unchanged_amounts_produce_no_statements() {
        let existing = amounts(&[(1, 2), (2, 3)]);
        assert!(diff_amounts(&existing, &existing).is_empty());
    }

    #[test]
    fn create_is_a_diff_against_nothing() {
        let incoming = amounts(&[(4, 10), (9, 1)]);
        let diff = diff_amounts(&BTreeMap::new(), &incoming);
        assert!(diff.delete.is_empty());
        assert!(diff.update.is_empty());
        assert_eq!(diff.insert, incoming);
    }

    #[test]
    fn tag_sets_are_fully_replaced() {
        let existing = BTreeSet::from([1, 2, 3]);
        let incoming = BTreeSet::from([3, 4]);
        let diff = diff_sets(&existing, &incoming);
        assert_eq!(diff.delete, BTreeSet::from([1, 2]));
        assert_eq!(diff.insert, BTreeSet::from([4]));
        assert!(!diff.is_empty());
        assert!(diff_sets(&incoming, &incoming).is_empty());
    }
}
