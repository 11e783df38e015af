//! Reconciliation of a cached collection after a successful mutation.
//!
//! Each helper touches at most one item and reports whether anything changed.

use serde::{Deserialize, Serialize};

use super::Resource;

/// Where a newly created item is placed in the cached collection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InsertPosition {
    Front,
    Back,
}

/// The cache-side effect of one successful mutation.
///
/// Applying a reconciliation is idempotent, so the same value can be replayed
/// on top of a newer fetch result.
#[derive(Debug, Clone, PartialEq)]
pub enum Reconciliation<T> {
    /// A created item.
    Insert(T, InsertPosition),
    /// An updated item, keyed by the id the update was sent for.
    Replace(String, T),
    /// An item re-read from the server.
    Upsert(T),
    /// A deleted item.
    Remove(String),
}

impl<T: Resource> Reconciliation<T> {
    /// Apply to a collection, returning whether anything changed.
    pub fn apply(self, items: &mut Vec<T>) -> bool {
        match self {
            Reconciliation::Insert(item, position) => insert(items, item, position),
            Reconciliation::Replace(id, item) => replace(items, &id, item),
            Reconciliation::Upsert(item) => upsert(items, item),
            Reconciliation::Remove(id) => remove(items, &id),
        }
    }
}

/// Insert a created item. An item already cached under the same id is
/// replaced in place instead, keeping ids unique.
pub fn insert<T: Resource>(items: &mut Vec<T>, item: T, position: InsertPosition) -> bool {
    if let Some(existing) = items.iter_mut().find(|i| i.id() == item.id()) {
        *existing = item;
        return true;
    }
    match position {
        InsertPosition::Front => items.insert(0, item),
        InsertPosition::Back => items.push(item),
    }
    true
}

/// Replace the item with `id`. Returns false when `id` is not cached.
pub fn replace<T: Resource>(items: &mut [T], id: &str, item: T) -> bool {
    match items.iter_mut().find(|i| i.id() == id) {
        Some(existing) => {
            *existing = item;
            true
        }
        None => false,
    }
}

/// Replace the item with the same id, or append it if it is not cached.
pub fn upsert<T: Resource>(items: &mut Vec<T>, item: T) -> bool {
    insert(items, item, InsertPosition::Back)
}

/// Remove the item with `id`. Returns false when `id` is not cached.
pub fn remove<T: Resource>(items: &mut Vec<T>, id: &str) -> bool {
    match items.iter().position(|i| i.id() == id) {
        Some(index) => {
            items.remove(index);
            true
        }
        None => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::testing::widget;

    fn ids<T: Resource>(items: &[T]) -> Vec<&str> {
        items.iter().map(|i| i.id()).collect()
    }

    #[test]
    fn test_insert_front_and_back() {
        let mut items = vec![widget("a", "A"), widget("b", "B")];
        insert(&mut items, widget("c", "C"), InsertPosition::Front);
        insert(&mut items, widget("d", "D"), InsertPosition::Back);
        assert_eq!(ids(&items), vec!["c", "a", "b", "d"]);
    }

    #[test]
    fn test_insert_existing_id_replaces_in_place() {
        let mut items = vec![widget("a", "A"), widget("b", "B")];
        insert(&mut items, widget("b", "B2"), InsertPosition::Front);
        assert_eq!(ids(&items), vec!["a", "b"]);
        assert_eq!(items[1].name, "B2");
    }

    #[test]
    fn test_replace_touches_only_matching_item() {
        let mut items = vec![widget("a", "A"), widget("b", "B")];
        assert!(replace(&mut items, "a", widget("a", "A2")));
        assert_eq!(items[0].name, "A2");
        assert_eq!(items[1], widget("b", "B"));

        assert!(!replace(&mut items, "zzz", widget("zzz", "Z")));
        assert_eq!(items.len(), 2);
    }

    #[test]
    fn test_remove() {
        let mut items = vec![widget("a", "A"), widget("b", "B"), widget("c", "C")];
        assert!(remove(&mut items, "b"));
        assert_eq!(ids(&items), vec!["a", "c"]);
        assert!(!remove(&mut items, "b"));
    }

    #[test]
    fn test_reconciliation_replay_is_idempotent() {
        let mut items = vec![widget("a", "A"), widget("b", "B")];
        let edits = vec![
            Reconciliation::Replace("a".to_string(), widget("a", "A2")),
            Reconciliation::Insert(widget("c", "C"), InsertPosition::Back),
            Reconciliation::Remove("b".to_string()),
        ];
        for edit in edits.iter().cloned() {
            edit.apply(&mut items);
        }
        let once = items.clone();
        for edit in edits {
            edit.apply(&mut items);
        }
        assert_eq!(items, once);
        assert_eq!(ids(&items), vec!["a", "c"]);
    }

    #[test]
    fn test_upsert_appends_unknown_item() {
        let mut items = vec![widget("a", "A")];
        upsert(&mut items, widget("b", "B"));
        upsert(&mut items, widget("a", "A2"));
        assert_eq!(ids(&items), vec!["a", "b"]);
        assert_eq!(items[0].name, "A2");
    }
}
