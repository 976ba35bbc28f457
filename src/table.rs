// src/table.rs

use crate::memory::{grow_capacity, Heap, ObjRef};
use crate::value::Value;

const TABLE_MAX_LOAD: f64 = 0.75;

#[derive(Debug, Clone, Copy)]
struct Entry {
    key: Option<ObjRef>,
    hash: u32,
    value: Value,
}

impl Entry {
    const EMPTY: Entry = Entry { key: None, hash: 0, value: Value::Nil };
    const TOMBSTONE: Entry = Entry { key: None, hash: 0, value: Value::Bool(true) };

    fn is_empty(&self) -> bool {
        self.key.is_none() && matches!(self.value, Value::Nil)
    }

    fn is_tombstone(&self) -> bool {
        self.key.is_none() && !matches!(self.value, Value::Nil)
    }
}

/// Open-addressing hash table keyed by heap strings, with linear probing.
///
/// Keys compare by handle identity. Deleted slots become tombstones so probe chains that
/// pass through them stay intact; tombstones are dropped on the next resize.
#[derive(Debug, Default, Clone)]
pub struct Table {
    entries: Vec<Entry>,
    // Live keys.
    count: usize,
    // Live keys plus tombstones; this is what the load factor is measured against.
    occupied: usize,
}

impl Table {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.count
    }

    pub fn is_empty(&self) -> bool {
        self.count == 0
    }

    pub fn capacity(&self) -> usize {
        self.entries.len()
    }

    /// Inserts or overwrites `key`. Returns `true` if the key was not present before.
    pub fn set(&mut self, heap: &Heap, key: ObjRef, value: Value) -> bool {
        let hash = heap.string(key).hash();
        self.insert_hashed(key, hash, value)
    }

    pub fn get(&self, heap: &Heap, key: ObjRef) -> Option<Value> {
        if self.count == 0 {
            return None;
        }
        let hash = heap.string(key).hash();
        let entry = &self.entries[find_slot(&self.entries, key, hash)];
        entry.key.map(|_| entry.value)
    }

    /// Removes `key`, leaving a tombstone in its slot. Returns `false` if it was absent.
    pub fn remove(&mut self, heap: &Heap, key: ObjRef) -> bool {
        if self.count == 0 {
            return false;
        }
        let hash = heap.string(key).hash();
        let slot = find_slot(&self.entries, key, hash);
        if self.entries[slot].key.is_none() {
            return false;
        }
        self.entries[slot] = Entry::TOMBSTONE;
        self.count -= 1;
        true
    }

    /// Copies every live entry of `src` into `self`.
    pub fn merge(&mut self, src: &Table) {
        for entry in &src.entries {
            if let Some(key) = entry.key {
                self.insert_hashed(key, entry.hash, entry.value);
            }
        }
    }

    /// Iterates the live entries in slot order.
    pub fn iter(&self) -> impl Iterator<Item = (ObjRef, Value)> + '_ {
        self.entries
            .iter()
            .filter_map(|entry| entry.key.map(|key| (key, entry.value)))
    }

    fn insert_hashed(&mut self, key: ObjRef, hash: u32, value: Value) -> bool {
        if (self.occupied + 1) as f64 > self.capacity() as f64 * TABLE_MAX_LOAD {
            self.adjust_capacity(grow_capacity(self.capacity()));
        }

        let slot = find_slot(&self.entries, key, hash);
        let entry = &mut self.entries[slot];
        let is_new_key = entry.key.is_none();
        if is_new_key {
            self.count += 1;
            // Reusing a tombstone doesn't change occupancy.
            if entry.is_empty() {
                self.occupied += 1;
            }
        }

        *entry = Entry { key: Some(key), hash, value };
        is_new_key
    }

    fn adjust_capacity(&mut self, capacity: usize) {
        let old = std::mem::replace(&mut self.entries, vec![Entry::EMPTY; capacity]);
        self.count = 0;
        for entry in old {
            if let Some(key) = entry.key {
                let slot = find_slot(&self.entries, key, entry.hash);
                self.entries[slot] = entry;
                self.count += 1;
            }
        }
        self.occupied = self.count;
        log::trace!("table: resized to {} slots, {} live", capacity, self.count);
    }
}

/// Finds the slot holding `key`, or the slot it should be inserted into.
///
/// The first tombstone on the probe path wins over the empty slot that ends it.
fn find_slot(entries: &[Entry], key: ObjRef, hash: u32) -> usize {
    let capacity = entries.len();
    let mut index = hash as usize % capacity;
    let mut tombstone = None;
    loop {
        let entry = &entries[index];
        match entry.key {
            Some(k) if k == key => return index,
            Some(_) => {}
            None if entry.is_tombstone() => {
                tombstone.get_or_insert(index);
            }
            None => return tombstone.unwrap_or(index),
        }
        index = (index + 1) % capacity;
    }
}
