use std::collections::HashSet;
use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use tracing::debug;

use super::Resource;

/// In-memory snapshot of a collection and when it was last fetched.
///
/// `fetched_at` is only ever set by a successful fetch; mutations patch
/// `items` without touching it.
#[derive(Debug, Clone)]
pub struct CacheEntry<T> {
    items: Arc<Vec<T>>,
    fetched_at: Option<DateTime<Utc>>,
}

impl<T> Default for CacheEntry<T> {
    fn default() -> Self {
        Self {
            items: Arc::new(Vec::new()),
            fetched_at: None,
        }
    }
}

impl<T> CacheEntry<T> {
    pub fn items(&self) -> Arc<Vec<T>> {
        Arc::clone(&self.items)
    }

    pub fn fetched_at(&self) -> Option<DateTime<Utc>> {
        self.fetched_at
    }

    pub fn is_fresh(&self, ttl: Duration, now: DateTime<Utc>) -> bool {
        match self.fetched_at {
            Some(fetched_at) => now - fetched_at < ttl,
            None => false,
        }
    }

    pub fn age_minutes(&self) -> Option<i64> {
        self.fetched_at
            .map(|fetched_at| (Utc::now() - fetched_at).num_minutes())
    }

    pub fn age_display(&self) -> String {
        let Some(minutes) = self.age_minutes() else {
            return "never".to_string();
        };
        if minutes < 1 {
            // Also covers clock skew
            "just now".to_string()
        } else if minutes < 60 {
            format!("{}m ago", minutes)
        } else if minutes < 1440 {
            let hours = minutes / 60;
            if minutes % 60 >= 30 {
                format!("{}h ago", hours + 1)
            } else {
                format!("{}h ago", hours)
            }
        } else {
            let days = minutes / 1440;
            if (minutes % 1440) / 60 >= 12 {
                format!("{}d ago", days + 1)
            } else {
                format!("{}d ago", days)
            }
        }
    }

    /// Forget the fetch time but keep the items, so the next fetch goes to
    /// the network while readers still see the old snapshot.
    pub fn mark_stale(&mut self) {
        self.fetched_at = None;
    }

    pub fn clear(&mut self) {
        self.items = Arc::new(Vec::new());
        self.fetched_at = None;
    }
}

impl<T: Resource> CacheEntry<T> {
    /// Replace the whole snapshot with a fetch result.
    ///
    /// Items repeating an earlier identifier are dropped so the collection
    /// stays keyed by id.
    pub fn replace(&mut self, items: Vec<T>, now: DateTime<Utc>) -> Arc<Vec<T>> {
        let mut seen = HashSet::with_capacity(items.len());
        let total = items.len();
        let items: Vec<T> = items
            .into_iter()
            .filter(|item| seen.insert(item.id().to_string()))
            .collect();
        if items.len() != total {
            debug!(
                resource = T::NAME,
                dropped = total - items.len(),
                "Dropped items with duplicate ids from fetch result"
            );
        }
        self.items = Arc::new(items);
        self.fetched_at = Some(now);
        self.items()
    }

    /// Apply a mutation to the items in place. Snapshots already handed out
    /// keep their old contents.
    pub fn patch(&mut self, apply: impl FnOnce(&mut Vec<T>) -> bool) -> bool {
        apply(Arc::make_mut(&mut self.items))
    }

    pub fn get(&self, id: &str) -> Option<&T> {
        self.items.iter().find(|item| item.id() == id)
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::testing::{widget, Widget};

    #[test]
    fn test_empty_entry_is_never_fresh() {
        let entry: CacheEntry<Widget> = CacheEntry::default();
        assert!(!entry.is_fresh(Duration::minutes(5), Utc::now()));
        assert_eq!(entry.age_display(), "never");
        assert!(entry.items().is_empty());
    }

    #[test]
    fn test_entry_freshness_window() {
        let mut entry = CacheEntry::default();
        let fetched = Utc::now();
        entry.replace(vec![widget("a", "A")], fetched);

        assert!(entry.is_fresh(Duration::minutes(5), fetched + Duration::minutes(4)));
        assert!(!entry.is_fresh(Duration::minutes(5), fetched + Duration::minutes(5)));
        assert!(!entry.is_fresh(Duration::zero(), fetched));
    }

    #[test]
    fn test_age_display() {
        let mut entry = CacheEntry::default();
        entry.replace(vec![widget("a", "A")], Utc::now());
        assert_eq!(entry.age_display(), "just now");

        entry.fetched_at = Some(Utc::now() - Duration::minutes(90));
        assert_eq!(entry.age_display(), "2h ago");

        entry.fetched_at = Some(Utc::now() - Duration::minutes(7));
        assert_eq!(entry.age_display(), "7m ago");
    }

    #[test]
    fn test_replace_drops_duplicate_ids() {
        let mut entry = CacheEntry::default();
        let items = entry.replace(
            vec![widget("a", "first"), widget("b", "B"), widget("a", "second")],
            Utc::now(),
        );
        assert_eq!(items.len(), 2);
        assert_eq!(entry.get("a").map(|w| w.name.as_str()), Some("first"));
    }

    #[test]
    fn test_mark_stale_keeps_items() {
        let mut entry = CacheEntry::default();
        entry.replace(vec![widget("a", "A")], Utc::now());
        entry.mark_stale();
        assert!(entry.fetched_at().is_none());
        assert_eq!(entry.items().len(), 1);
    }

    #[test]
    fn test_patch_does_not_disturb_shared_snapshots() {
        let mut entry = CacheEntry::default();
        let before = entry.replace(vec![widget("a", "A")], Utc::now());
        entry.patch(|items| {
            items[0].name = "A2".to_string();
            true
        });
        assert_eq!(before[0].name, "A");
        assert_eq!(entry.items()[0].name, "A2");
    }
}
