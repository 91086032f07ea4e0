use crate::core::models::ids::{ContactId, ContactKey};
use slotmap::SlotMap;
use std::collections::HashMap;

use super::flags::TouchFlags;

/// Hands out history offsets while contact models are being constructed.
///
/// Offsets are consecutive; a model asking for three values keeps the first
/// returned offset and owns `offset..offset + 3` in every contact row.
#[derive(Debug, Clone, Default)]
pub struct HistorySetup {
    names: Vec<String>,
}

impl HistorySetup {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reserves one named slot and returns its offset.
    pub fn add_history_value(&mut self, name: &str) -> usize {
        self.names.push(name.to_string());
        self.names.len() - 1
    }

    pub fn width(&self) -> usize {
        self.names.len()
    }

    pub fn names(&self) -> &[String] {
        &self.names
    }

    pub fn offset_of(&self, name: &str) -> Option<usize> {
        self.names.iter().position(|n| n == name)
    }
}

#[derive(Debug, Clone)]
struct ContactEntry {
    key: ContactKey,
    touch: TouchFlags,
    base: usize,
    visited: bool,
}

/// Persistent per-contact scalar storage.
///
/// Rows of `width` values live in one contiguous arena and are addressed by
/// a stable [`ContactId`]. Rows released by pairs that left the neighbor list
/// are zeroed and reused.
#[derive(Debug, Clone)]
pub struct ContactHistoryStore {
    width: usize,
    values: Vec<f64>,
    entries: SlotMap<ContactId, ContactEntry>,
    index: HashMap<ContactKey, ContactId>,
    free_rows: Vec<usize>,
}

impl ContactHistoryStore {
    pub fn new(width: usize) -> Self {
        Self {
            width,
            values: Vec::new(),
            entries: SlotMap::with_key(),
            index: HashMap::new(),
            free_rows: Vec::new(),
        }
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn find(&self, key: ContactKey) -> Option<ContactId> {
        self.index.get(&key).copied()
    }

    /// Returns the id for `key`, creating a zeroed row if the pair is new.
    ///
    /// Either way the contact is marked as visited for the current sweep.
    pub fn find_or_insert(&mut self, key: ContactKey) -> ContactId {
        if let Some(&id) = self.index.get(&key) {
            if let Some(entry) = self.entries.get_mut(id) {
                entry.visited = true;
            }
            return id;
        }

        let base = match self.free_rows.pop() {
            Some(base) => {
                self.values[base..base + self.width].fill(0.0);
                base
            }
            None => {
                let base = self.values.len();
                self.values.resize(base + self.width, 0.0);
                base
            }
        };

        let id = self.entries.insert(ContactEntry {
            key,
            touch: TouchFlags::empty(),
            base,
            visited: true,
        });
        self.index.insert(key, id);
        id
    }

    pub fn key(&self, id: ContactId) -> Option<ContactKey> {
        self.entries.get(id).map(|e| e.key)
    }

    pub fn touch(&self, id: ContactId) -> Option<TouchFlags> {
        self.entries.get(id).map(|e| e.touch)
    }

    pub fn row(&self, id: ContactId) -> Option<&[f64]> {
        self.entries
            .get(id)
            .map(|e| &self.values[e.base..e.base + self.width])
    }

    /// The `len` values starting at a model's `offset` within the contact row.
    pub fn slice(&self, id: ContactId, offset: usize, len: usize) -> Option<&[f64]> {
        self.row(id).and_then(|row| row.get(offset..offset + len))
    }

    /// Touch markers and the full history row of one contact, both mutable.
    pub fn entry_mut(&mut self, id: ContactId) -> Option<(&mut TouchFlags, &mut [f64])> {
        let entry = self.entries.get_mut(id)?;
        let row = &mut self.values[entry.base..entry.base + self.width];
        Some((&mut entry.touch, row))
    }

    pub fn remove(&mut self, id: ContactId) -> bool {
        match self.entries.remove(id) {
            Some(entry) => {
                self.index.remove(&entry.key);
                self.free_rows.push(entry.base);
                true
            }
            None => false,
        }
    }

    /// Clears the visited markers ahead of a sweep over the neighbor list.
    pub fn begin_sweep(&mut self) {
        for (_, entry) in self.entries.iter_mut() {
            entry.visited = false;
        }
    }

    /// Drops every contact not seen since [`begin_sweep`](Self::begin_sweep); returns how many.
    pub fn prune_unvisited(&mut self) -> usize {
        let stale: Vec<ContactId> = self
            .entries
            .iter()
            .filter(|(_, e)| !e.visited)
            .map(|(id, _)| id)
            .collect();
        for &id in &stale {
            self.remove(id);
        }
        stale.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = (ContactKey, TouchFlags, &[f64])> {
        self.entries
            .values()
            .map(|e| (e.key, e.touch, &self.values[e.base..e.base + self.width]))
    }
}
