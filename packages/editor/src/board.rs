//! # Board Drag Reorder
//!
//! List reordering for drag-and-drop, and a board view that groups records
//! into columns by one property. Only the data side lives here; gesture
//! handling belongs to the host.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Group key for records without a value for the grouping property
pub const NO_VALUE: &str = "No Value";

/// Move an item within one list
///
/// Both indices are clamped into the list; empty lists are left alone.
pub fn move_item_in_list<T>(list: &mut Vec<T>, previous: usize, current: usize) {
    if list.is_empty() {
        return;
    }
    let last = list.len() - 1;
    let from = previous.min(last);
    let to = current.min(last);
    if from == to {
        return;
    }
    let item = list.remove(from);
    list.insert(to, item);
}

/// Move an item from one list into another
///
/// `previous` is clamped into `source`, `current` into `target` (inclusive
/// of the end). Returns the index the item landed at.
pub fn transfer_item<T>(
    source: &mut Vec<T>,
    target: &mut Vec<T>,
    previous: usize,
    current: usize,
) -> Option<usize> {
    if source.is_empty() {
        return None;
    }
    let from = previous.min(source.len() - 1);
    let to = current.min(target.len());
    let item = source.remove(from);
    target.insert(to, item);
    Some(to)
}

/// A database row shown as a card
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BoardRecord {
    pub id: String,

    #[serde(default)]
    pub properties: IndexMap<String, Value>,
}

impl BoardRecord {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            properties: IndexMap::new(),
        }
    }

    pub fn with_property(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.properties.insert(name.into(), value.into());
        self
    }

    /// Group key for `property`; missing, null and empty values share one group
    pub fn group_key(&self, property: &str) -> String {
        match self.properties.get(property) {
            None | Some(Value::Null) => NO_VALUE.to_string(),
            Some(Value::String(s)) if s.is_empty() => NO_VALUE.to_string(),
            Some(Value::String(s)) => s.clone(),
            Some(other) => other.to_string(),
        }
    }
}

/// One board column
#[derive(Debug, Clone, PartialEq)]
pub struct BoardGroup {
    pub key: String,
    pub name: String,
    pub records: Vec<BoardRecord>,
}

/// Records grouped into columns by a property
#[derive(Debug, Clone, PartialEq)]
pub struct Board {
    group_by: String,
    groups: Vec<BoardGroup>,
}

impl Board {
    /// Group records by `property`, columns sorted by name
    pub fn group_by(property: &str, records: Vec<BoardRecord>) -> Self {
        let mut grouped: IndexMap<String, Vec<BoardRecord>> = IndexMap::new();
        for record in records {
            grouped
                .entry(record.group_key(property))
                .or_default()
                .push(record);
        }

        let mut groups: Vec<BoardGroup> = grouped
            .into_iter()
            .map(|(key, records)| BoardGroup {
                name: key.clone(),
                key,
                records,
            })
            .collect();
        groups.sort_by(|a, b| a.name.cmp(&b.name));

        Self {
            group_by: property.to_string(),
            groups,
        }
    }

    pub fn groups(&self) -> &[BoardGroup] {
        &self.groups
    }

    pub fn group(&self, key: &str) -> Option<&BoardGroup> {
        self.groups.iter().find(|g| g.key == key)
    }

    fn position(&self, key: &str) -> Option<usize> {
        self.groups.iter().position(|g| g.key == key)
    }

    /// Drop a card; returns the moved record patched with its new group key
    /// when it changed columns
    ///
    /// The caller persists the returned record.
    pub fn drop_record(
        &mut self,
        from_group: &str,
        previous: usize,
        to_group: &str,
        current: usize,
    ) -> Option<BoardRecord> {
        let from = self.position(from_group)?;
        let to = self.position(to_group)?;

        if from == to {
            move_item_in_list(&mut self.groups[from].records, previous, current);
            return None;
        }

        // Split the borrow so both columns can be mutated
        let (source, target) = if from < to {
            let (left, right) = self.groups.split_at_mut(to);
            (&mut left[from], &mut right[0])
        } else {
            let (left, right) = self.groups.split_at_mut(from);
            (&mut right[0], &mut left[to])
        };

        let landed = transfer_item(&mut source.records, &mut target.records, previous, current)?;
        let record = &mut target.records[landed];
        record
            .properties
            .insert(self.group_by.clone(), Value::String(target.key.clone()));

        tracing::debug!(record = %record.id, group = %target.key, "moved record to group");
        Some(record.clone())
    }
}
