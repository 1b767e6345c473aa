//! # Diff Engine
//!
//! Pure comparison of a submitted aggregate against its persisted snapshot.
//!
//! Every keyed child collection is compared by [`diff_keyed`]:
//!
//! 1. More persisted items than submitted ones is always a change.
//! 2. Each submitted item is looked up by natural key. A persisted match
//!    must be equal under the facet's predicate, otherwise the facet is
//!    changed. An item without a match is new.
//! 3. Persisted items never matched were dropped, which is a change.
//!
//! A facet that is not changed but has new items can be applied by
//! appending; a changed facet must be rewritten.

mod application;
mod package;

pub use application::{diff_application, profiles_equal, ApplicationChanges};
pub use package::{diff_package, PackageChanges};

use std::collections::{BTreeMap, HashMap};
use std::hash::Hash;

/// Verdict for one keyed collection
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FacetDiff<'a, T> {
    changed: bool,
    new_items: Vec<&'a T>,
}

impl<'a, T> FacetDiff<'a, T> {
    fn changed() -> Self {
        Self {
            changed: true,
            new_items: Vec::new(),
        }
    }

    /// True if an existing item was modified or dropped
    pub fn is_changed(&self) -> bool {
        self.changed
    }

    /// Submitted items without a persisted counterpart. Empty when the
    /// facet is changed.
    pub fn new_items(&self) -> &[&'a T] {
        &self.new_items
    }

    /// True if anything at all differs
    pub fn is_touched(&self) -> bool {
        self.changed || !self.new_items.is_empty()
    }
}

/// Compare two keyed collections.
///
/// `key` extracts the natural key; `same` decides whether a persisted item
/// and the submitted item with the same key are equal.
pub fn diff_keyed<'a, T, K>(
    existing: &[T],
    submitted: &'a [T],
    key: impl Fn(&T) -> K,
    same: impl Fn(&T, &T) -> bool,
) -> FacetDiff<'a, T>
where
    K: Eq + Hash,
{
    if existing.len() > submitted.len() {
        return FacetDiff::changed();
    }

    let mut lookup: HashMap<K, &T> = existing.iter().map(|item| (key(item), item)).collect();
    let mut new_items = Vec::new();

    for item in submitted {
        match lookup.remove(&key(item)) {
            Some(persisted) => {
                if !same(persisted, item) {
                    return FacetDiff::changed();
                }
            }
            None => new_items.push(item),
        }
    }

    if !lookup.is_empty() {
        return FacetDiff::changed();
    }

    FacetDiff {
        changed: false,
        new_items,
    }
}

/// Compare two collections whose items are fully described by their key.
pub fn diff_keyed_eq<'a, T, K>(
    existing: &[T],
    submitted: &'a [T],
    key: impl Fn(&T) -> K,
) -> FacetDiff<'a, T>
where
    K: Eq + Hash,
    T: PartialEq,
{
    diff_keyed(existing, submitted, key, |a, b| a == b)
}

/// True if two string maps differ in any entry
pub fn map_changed(existing: &BTreeMap<String, String>, submitted: &BTreeMap<String, String>) -> bool {
    let existing: Vec<(&String, &String)> = existing.iter().collect();
    let submitted: Vec<(&String, &String)> = submitted.iter().collect();
    diff_keyed_eq(&existing, &submitted, |(k, _)| *k).is_touched()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Clone, PartialEq)]
    struct Item {
        key: &'static str,
        value: u32,
    }

    fn item(key: &'static str, value: u32) -> Item {
        Item { key, value }
    }

    fn diff<'a>(existing: &[Item], submitted: &'a [Item]) -> FacetDiff<'a, Item> {
        diff_keyed_eq(existing, submitted, |i| i.key)
    }

    #[test]
    fn test_identical_is_untouched() {
        let items = vec![item("a", 1), item("b", 2)];
        let verdict = diff(&items, &items);
        assert!(!verdict.is_changed());
        assert!(!verdict.is_touched());
    }

    #[test]
    fn test_order_does_not_matter() {
        let existing = vec![item("a", 1), item("b", 2)];
        let submitted = vec![item("b", 2), item("a", 1)];
        assert!(!diff(&existing, &submitted).is_touched());
    }

    #[test]
    fn test_shorter_submission_is_always_changed() {
        let existing = vec![item("a", 1), item("b", 2), item("c", 3)];
        for n in 0..existing.len() {
            let submitted = existing[..n].to_vec();
            let verdict = diff(&existing, &submitted);
            assert!(verdict.is_changed(), "prefix of length {}", n);
            assert!(verdict.new_items().is_empty());
        }
    }

    #[test]
    fn test_new_items_reported() {
        let existing = vec![item("a", 1)];
        let submitted = vec![item("a", 1), item("b", 2), item("c", 3)];
        let verdict = diff(&existing, &submitted);
        assert!(!verdict.is_changed());
        let keys: Vec<&str> = verdict.new_items().iter().map(|i| i.key).collect();
        assert_eq!(keys, vec!["b", "c"]);
    }

    #[test]
    fn test_modified_item_is_changed() {
        let existing = vec![item("a", 1), item("b", 2)];
        let submitted = vec![item("a", 1), item("b", 3)];
        assert!(diff(&existing, &submitted).is_changed());
    }

    #[test]
    fn test_replaced_item_is_changed() {
        // Same length, but "b" was swapped for "c"
        let existing = vec![item("a", 1), item("b", 2)];
        let submitted = vec![item("a", 1), item("c", 2)];
        let verdict = diff(&existing, &submitted);
        assert!(verdict.is_changed());
        assert!(verdict.new_items().is_empty());
    }

    #[test]
    fn test_custom_predicate() {
        let existing = vec![item("a", 1)];
        let submitted = vec![item("a", 100)];
        let verdict = diff_keyed(&existing, &submitted, |i| i.key, |_, _| true);
        assert!(!verdict.is_touched());
    }

    #[test]
    fn test_map_changed() {
        let mut a = BTreeMap::new();
        a.insert("web".to_string(), "apps".to_string());
        let mut b = a.clone();
        assert!(!map_changed(&a, &b));

        b.insert("web".to_string(), "other".to_string());
        assert!(map_changed(&a, &b));

        let mut c = a.clone();
        c.insert("db".to_string(), "data".to_string());
        assert!(map_changed(&a, &c));
        assert!(map_changed(&c, &a));
    }
}
