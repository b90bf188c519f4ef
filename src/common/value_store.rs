//! Manage values stored at this node.

use std::collections::{BTreeMap, HashMap};
use std::str::FromStr;
use std::time::SystemTime;

use crate::common::{Id, Value};
use crate::Result;

/// Default maximum number of entries a [ValueStore] holds before refusing new ones.
pub const MAX_VALUES: usize = 10_000;

/// Portable form of a [ValueStore]: hex encoded keys to their stored values.
pub type ValueRecords = BTreeMap<String, Vec<Value>>;

#[derive(Debug, Clone)]
/// One value stored under a key.
pub struct ValueEntry {
    pub value: Value,
    pub stored_at: SystemTime,
}

#[derive(Debug, Clone)]
/// Key addressed store where every key may hold several entries.
///
/// Storing the same value twice under the same key keeps two entries.
pub struct ValueStore {
    id: Id,
    max_values: usize,
    by_key: HashMap<Id, Vec<ValueEntry>>,
    len: usize,
}

impl ValueStore {
    pub fn new(id: Id) -> Self {
        ValueStore {
            id,
            max_values: MAX_VALUES,
            by_key: HashMap::new(),
            len: 0,
        }
    }

    // === Options ===

    pub fn with_max_values(mut self, max_values: usize) -> Self {
        self.max_values = max_values;
        self
    }

    // === Getters ===

    /// Id of the owning node.
    pub fn id(&self) -> &Id {
        &self.id
    }

    pub fn max_values(&self) -> usize {
        self.max_values
    }

    /// Total number of entries across all keys.
    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Number of distinct keys.
    pub fn keys_count(&self) -> usize {
        self.by_key.len()
    }

    pub fn entries_for(&self, key: &Id) -> &[ValueEntry] {
        self.by_key.get(key).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn values_for(&self, key: &Id) -> Vec<Value> {
        self.entries_for(key)
            .iter()
            .map(|entry| entry.value.clone())
            .collect()
    }

    // === Public Methods ===

    /// Insert a new entry under `key`.
    ///
    /// Returns `false` without storing anything once the store is full.
    pub fn touch(&mut self, key: Id, value: Value) -> bool {
        if self.len >= self.max_values {
            return false;
        }

        self.by_key.entry(key).or_default().push(ValueEntry {
            value,
            stored_at: SystemTime::now(),
        });
        self.len += 1;

        true
    }

    pub fn set_id(&mut self, id: Id) {
        self.id = id;
    }

    // === Persistence ===

    pub fn to_records(&self) -> ValueRecords {
        self.by_key
            .iter()
            .map(|(key, entries)| {
                (
                    key.to_string(),
                    entries.iter().map(|entry| entry.value.clone()).collect(),
                )
            })
            .collect()
    }

    /// Replace the content of this store with the given records.
    ///
    /// Entries beyond `max_values` are dropped, in key order.
    ///
    /// Fails without touching the current content if any key is not a valid hex [Id].
    pub fn from_records(&mut self, records: &ValueRecords) -> Result<()> {
        let mut by_key: HashMap<Id, Vec<ValueEntry>> = HashMap::with_capacity(records.len());
        let mut len = 0;

        for (key, values) in records {
            let key = Id::from_str(key)?;

            if len >= self.max_values {
                continue;
            }

            let entries = by_key.entry(key).or_default();

            for value in values.iter().take(self.max_values - len) {
                entries.push(ValueEntry {
                    value: value.clone(),
                    stored_at: SystemTime::now(),
                });
                len += 1;
            }
        }

        self.by_key = by_key;
        self.len = len;

        Ok(())
    }
}
