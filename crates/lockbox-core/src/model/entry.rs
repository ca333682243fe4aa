use super::{EntryId, GroupId};
use std::collections::BTreeMap;

/// Properties every entry carries from creation and that change-sets may edit.
pub const CANONICAL_PROPERTIES: [&str; 3] = ["title", "username", "password"];

/// A credential record: named string properties plus free-form metadata.
#[derive(Debug, Clone, PartialEq)]
pub struct Entry {
    id: EntryId,
    group: GroupId,
    properties: BTreeMap<String, String>,
    meta: BTreeMap<String, String>,
    revision: u64,
}

impl Entry {
    pub(crate) fn new(id: EntryId, group: GroupId, title: &str) -> Self {
        let mut properties: BTreeMap<String, String> = CANONICAL_PROPERTIES
            .iter()
            .map(|name| (name.to_string(), String::new()))
            .collect();
        properties.insert("title".to_string(), title.to_string());

        Self {
            id,
            group,
            properties,
            meta: BTreeMap::new(),
            revision: 0,
        }
    }

    /// Rebuild an entry from stored fields, as loaded from an archive.
    pub(crate) fn restore(
        id: EntryId,
        group: GroupId,
        properties: BTreeMap<String, String>,
        meta: BTreeMap<String, String>,
    ) -> Self {
        let mut entry = Self {
            id,
            group,
            properties,
            meta,
            revision: 0,
        };
        for name in CANONICAL_PROPERTIES {
            entry.properties.entry(name.to_string()).or_default();
        }
        entry
    }

    /// Unique identifier of this entry.
    pub fn id(&self) -> EntryId {
        self.id
    }

    /// The group that owns this entry.
    pub fn group(&self) -> GroupId {
        self.group
    }

    /// Number of effective mutations since the entry was created or loaded.
    pub fn revision(&self) -> u64 {
        self.revision
    }

    /// The entry's title, or an empty string.
    pub fn title(&self) -> &str {
        self.property("title").unwrap_or_default()
    }

    /// Look up a property by name.
    pub fn property(&self, name: &str) -> Option<&str> {
        self.properties.get(name).map(String::as_str)
    }

    /// All properties, ordered by name.
    pub fn properties(&self) -> &BTreeMap<String, String> {
        &self.properties
    }

    /// Set a property. Any name is accepted. Returns whether the stored value changed.
    pub fn set_property(&mut self, name: &str, value: &str) -> bool {
        if self.property(name) == Some(value) {
            return false;
        }
        self.properties.insert(name.to_string(), value.to_string());
        self.revision += 1;
        true
    }

    /// Look up a metadata value by key.
    pub fn meta(&self, key: &str) -> Option<&str> {
        self.meta.get(key).map(String::as_str)
    }

    /// All metadata, ordered by key.
    pub fn meta_map(&self) -> &BTreeMap<String, String> {
        &self.meta
    }

    /// Set a metadata value. Returns whether the stored value changed.
    pub fn set_meta(&mut self, key: &str, value: &str) -> bool {
        if self.meta(key) == Some(value) {
            return false;
        }
        self.meta.insert(key.to_string(), value.to_string());
        self.revision += 1;
        true
    }

    /// Remove a metadata key. Missing keys are a no-op returning `false`.
    pub fn delete_meta(&mut self, key: &str) -> bool {
        let removed = self.meta.remove(key).is_some();
        if removed {
            self.revision += 1;
        }
        removed
    }
}
