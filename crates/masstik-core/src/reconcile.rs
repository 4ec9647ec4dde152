// ── Keyed list reconciliation ──
//
// Brings a displayed list of derived items in line with the authoritative
// list by key. Items whose key survives keep their `Arc`, so observers
// holding a reference stay valid; only new keys go through the factory.

use std::collections::HashSet;
use std::fmt::Debug;
use std::hash::Hash;
use std::sync::Arc;

use thiserror::Error;
use tracing::debug;

/// Something with a stable key.
pub trait Keyed {
    type Key: Clone + Eq + Hash + Debug;

    fn key(&self) -> Self::Key;
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ReconcileError {
    #[error("duplicate key in authoritative list: {key}")]
    DuplicateKey { key: String },
}

/// A single structural change applied to a [`KeyedList`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ListChange<K> {
    Inserted { index: usize, key: K },
    Removed { index: usize, key: K },
    Moved { from: usize, to: usize, key: K },
}

/// Ordered list of derived items, mutated only by [`reconcile`].
#[derive(Debug)]
pub struct KeyedList<K, D> {
    entries: Vec<(K, Arc<D>)>,
}

impl<K, D> Default for KeyedList<K, D> {
    fn default() -> Self {
        Self {
            entries: Vec::new(),
        }
    }
}

impl<K: Clone + Eq, D> KeyedList<K, D> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn keys(&self) -> Vec<K> {
        self.entries.iter().map(|(k, _)| k.clone()).collect()
    }

    pub fn get(&self, key: &K) -> Option<&Arc<D>> {
        self.entries
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, item)| item)
    }

    pub fn entries(&self) -> impl Iterator<Item = (&K, &Arc<D>)> {
        self.entries.iter().map(|(k, item)| (k, item))
    }

    pub fn items(&self) -> impl Iterator<Item = &Arc<D>> {
        self.entries.iter().map(|(_, item)| item)
    }
}

/// Make `displayed` match `authoritative` by key and order.
///
/// Keys missing from `displayed` are built with `factory` and inserted at
/// their authoritative position, keys no longer present are removed, and
/// surviving items are moved in place. Returns the applied changes; an
/// already-synchronised list yields none.
///
/// Duplicate keys in `authoritative` are rejected before anything changes.
pub fn reconcile<S, D, F>(
    authoritative: &[S],
    displayed: &mut KeyedList<S::Key, D>,
    mut factory: F,
) -> Result<Vec<ListChange<S::Key>>, ReconcileError>
where
    S: Keyed,
    F: FnMut(&S) -> D,
{
    let mut wanted = HashSet::with_capacity(authoritative.len());
    for item in authoritative {
        let key = item.key();
        if !wanted.insert(key.clone()) {
            return Err(ReconcileError::DuplicateKey {
                key: format!("{key:?}"),
            });
        }
    }

    let mut changes = Vec::new();
    let entries = &mut displayed.entries;

    // Removals run back to front so reported indexes stay valid when
    // replayed in order.
    for index in (0..entries.len()).rev() {
        if !wanted.contains(&entries[index].0) {
            let (key, _) = entries.remove(index);
            changes.push(ListChange::Removed { index, key });
        }
    }

    for (target, item) in authoritative.iter().enumerate() {
        let key = item.key();
        if entries.get(target).is_some_and(|(k, _)| *k == key) {
            continue;
        }

        let found = entries
            .iter()
            .skip(target + 1)
            .position(|(k, _)| *k == key)
            .map(|offset| target + 1 + offset);

        match found {
            Some(from) => {
                let entry = entries.remove(from);
                entries.insert(target, entry);
                changes.push(ListChange::Moved {
                    from,
                    to: target,
                    key,
                });
            }
            None => {
                entries.insert(target, (key.clone(), Arc::new(factory(item))));
                changes.push(ListChange::Inserted { index: target, key });
            }
        }
    }

    if !changes.is_empty() {
        debug!(changes = changes.len(), len = entries.len(), "reconciled list");
    }
    Ok(changes)
}
