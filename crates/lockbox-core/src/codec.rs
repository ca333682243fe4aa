//! Flat transport records and the change-set update protocol.
//!
//! Group records never carry entries: the tree is fetched with
//! [`convert_groups`] and each group's entries on demand with
//! [`convert_entries`], which keeps replies bounded for large archives.

use crate::error::{Error, Result};
use crate::model::{Entry, EntryId, Group, GroupId, CANONICAL_PROPERTIES};
use crate::workspace::Workspace;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::{BTreeMap, BTreeSet};

const META_PREFIX: &str = "meta.";

/// Transport form of an [`Entry`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EntryRecord {
    pub id: String,
    pub properties: BTreeMap<String, String>,
    pub meta: BTreeMap<String, String>,
    /// Owning group; only stamped by [`convert_entries`].
    #[serde(rename = "parentID", default, skip_serializing_if = "Option::is_none")]
    pub parent_id: Option<String>,
}

impl From<&Entry> for EntryRecord {
    fn from(entry: &Entry) -> Self {
        Self {
            id: entry.id().to_string(),
            properties: entry.properties().clone(),
            meta: entry.meta_map().clone(),
            parent_id: None,
        }
    }
}

/// Transport form of a [`Group`]. `groups` is filled by [`convert_groups`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GroupRecord {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub groups: Vec<GroupRecord>,
}

impl From<&Group> for GroupRecord {
    fn from(group: &Group) -> Self {
        Self {
            id: group.id().to_string(),
            title: group.title().to_string(),
            groups: Vec::new(),
        }
    }
}

/// Convert groups and, recursively, their child groups.
pub fn convert_groups<'a>(
    workspace: &Workspace,
    groups: impl IntoIterator<Item = &'a Group>,
) -> Vec<GroupRecord> {
    groups
        .into_iter()
        .map(|group| convert_group(workspace, group))
        .collect()
}

/// Convert one group together with its child-group tree.
pub fn convert_group(workspace: &Workspace, group: &Group) -> GroupRecord {
    let mut record = GroupRecord::from(group);
    record.groups = convert_groups(workspace, workspace.groups_of(group.id()));
    record
}

/// Convert the entries of `parent`, stamping `parentID` on each record.
pub fn convert_entries(workspace: &Workspace, parent: GroupId) -> Vec<EntryRecord> {
    workspace
        .entries_of(parent)
        .map(|entry| {
            let mut record = EntryRecord::from(entry);
            record.parent_id = Some(parent.to_string());
            record
        })
        .collect()
}

/// The attribute snapshot a front end held before the user's edit.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PreviousAttributes {
    pub meta: BTreeMap<String, String>,
}

/// A partial update for one entry.
///
/// `changed` holds the top-level attributes that differ from the front end's
/// snapshot; only the canonical properties are read from it. Metadata edits
/// arrive in `nested_changes` keyed `"meta.<key>"`. Removed metadata is
/// inferred: any key the entry currently has that is missing from
/// `previous_attributes.meta`, and not set by this change-set, gets deleted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChangeSet {
    pub id: String,
    #[serde(default)]
    pub changed: BTreeMap<String, Value>,
    #[serde(default, alias = "_nestedChanges")]
    pub nested_changes: BTreeMap<String, String>,
    #[serde(alias = "_previousAttributes")]
    pub previous_attributes: PreviousAttributes,
}

impl ChangeSet {
    /// Canonical property edits, rejecting non-string values.
    fn property_changes(&self) -> Result<Vec<(&'static str, &str)>> {
        let mut changes = Vec::new();
        for name in CANONICAL_PROPERTIES {
            match self.changed.get(name) {
                None => {}
                Some(Value::String(value)) => changes.push((name, value.as_str())),
                Some(other) => {
                    return Err(Error::InvalidChangeSet(format!(
                        "property {name:?} must be a string, got {other}"
                    )))
                }
            }
        }
        Ok(changes)
    }

    /// Metadata edits with the prefix stripped and both sides trimmed.
    /// Pairs with a blank key or value are dropped.
    fn meta_changes(&self) -> impl Iterator<Item = (&str, &str)> + '_ {
        self.nested_changes.iter().filter_map(|(key, value)| {
            let key = key.trim();
            let key = key.strip_prefix(META_PREFIX).unwrap_or(key).trim();
            let value = value.trim();
            if key.is_empty() || value.is_empty() {
                tracing::debug!("Skipping blank metadata change {:?}={:?}", key, value);
                None
            } else {
                Some((key, value))
            }
        })
    }
}

/// Apply a change-set to the entry it names and return the updated record.
///
/// Applying the same change-set twice leaves the entry untouched the second
/// time.
pub fn apply_change_set(workspace: &mut Workspace, change: &ChangeSet) -> Result<EntryRecord> {
    let entry = EntryId::parse(&change.id)
        .and_then(|id| workspace.entry_mut(id))
        .ok_or_else(|| Error::EntryNotFound(change.id.clone()))?;
    let property_changes = change.property_changes()?;

    let snapshot = EntryRecord::from(&*entry);
    let revision = entry.revision();

    for (name, value) in property_changes {
        if entry.property(name) != Some(value) {
            entry.set_property(name, value);
        }
    }

    let mut written = BTreeSet::new();
    for (key, value) in change.meta_changes() {
        if entry.meta(key) != Some(value) {
            entry.set_meta(key, value);
        }
        written.insert(key);
    }

    // Deletions are judged against the pre-edit snapshot, not the state above.
    // Keys this change-set writes are kept so a repeated application is a no-op.
    for key in snapshot.meta.keys() {
        if !change.previous_attributes.meta.contains_key(key) && !written.contains(key.as_str()) {
            entry.delete_meta(key);
        }
    }

    tracing::debug!(
        "Applied change-set to entry {} (revision {} -> {})",
        change.id,
        revision,
        entry.revision()
    );
    Ok(EntryRecord::from(&*entry))
}
