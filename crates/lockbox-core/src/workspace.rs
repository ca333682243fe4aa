//! The workspace arena: every group and entry of one open archive.

use crate::model::{Entry, EntryId, Group, GroupId};
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::path::{Path, PathBuf};
use uuid::Uuid;

/// Default database name for newly created workspaces.
pub const DEFAULT_NAME: &str = "Lockbox";

/// Master passphrase of an archive. Never printed by `Debug`.
#[derive(Clone, PartialEq, Eq)]
pub struct Passphrase(String);

impl Passphrase {
    /// Wrap a passphrase.
    pub fn new(passphrase: impl Into<String>) -> Self {
        Self(passphrase.into())
    }

    /// The passphrase in clear text, for handing to the storage layer.
    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for Passphrase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Passphrase(***)")
    }
}

/// Where a workspace was loaded from and how to unlock it again.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Origin {
    pub location: PathBuf,
    pub passphrase: Passphrase,
}

impl Origin {
    pub fn new(location: impl AsRef<Path>, passphrase: Passphrase) -> Self {
        Self {
            location: location.as_ref().to_path_buf(),
            passphrase,
        }
    }
}

/// Root aggregate of one credential archive.
///
/// Nodes live in flat maps keyed by id; structure is carried by the id lists
/// on each [`Group`] plus the ordered top-level list. Groups and entries share
/// one identifier space: no id is ever handed out twice within a workspace.
#[derive(Debug, Clone, Default)]
pub struct Workspace {
    name: String,
    origin: Option<Origin>,
    roots: Vec<GroupId>,
    groups: HashMap<GroupId, Group>,
    entries: HashMap<EntryId, Entry>,
}

impl Workspace {
    /// Create an empty workspace with no storage location.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    /// Display name of the workspace.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Rename the workspace.
    pub fn set_name(&mut self, name: impl Into<String>) {
        self.name = name.into();
    }

    /// Where the workspace is stored, if anywhere yet.
    pub fn origin(&self) -> Option<&Origin> {
        self.origin.as_ref()
    }

    /// Attach a storage location and passphrase.
    pub fn set_origin(&mut self, origin: Origin) {
        self.origin = Some(origin);
    }

    /// Number of groups at any depth.
    pub fn group_count(&self) -> usize {
        self.groups.len()
    }

    /// Number of entries at any depth.
    pub fn entry_count(&self) -> usize {
        self.entries.len()
    }

    fn is_used(&self, uuid: Uuid) -> bool {
        self.groups.contains_key(&GroupId::from(uuid)) || self.entries.contains_key(&EntryId::from(uuid))
    }

    fn allocate(&self) -> Uuid {
        loop {
            let uuid = Uuid::new_v4();
            if !self.is_used(uuid) {
                return uuid;
            }
        }
    }

    // ─── Groups ───────────────────────────────────────────────────────

    /// Create a group under `parent`, or at the top level when `parent` is `None`.
    ///
    /// Returns `None` if `parent` names a group that does not exist.
    pub fn create_group(&mut self, parent: Option<GroupId>, title: &str) -> Option<GroupId> {
        let Some(parent) = parent else {
            return Some(self.create_root_group(title));
        };
        let id = GroupId::from(self.allocate());
        self.attach_group(Some(parent), Group::new(id, Some(parent), title))?;
        tracing::debug!("Created group {} ({:?}) under {}", id, title, parent);
        Some(id)
    }

    /// Create a top-level group.
    pub fn create_root_group(&mut self, title: &str) -> GroupId {
        let id = GroupId::from(self.allocate());
        self.roots.push(id);
        self.groups.insert(id, Group::new(id, None, title));
        tracing::debug!("Created top-level group {} ({:?})", id, title);
        id
    }

    fn attach_group(&mut self, parent: Option<GroupId>, group: Group) -> Option<()> {
        let id = group.id();
        match parent {
            Some(parent_id) => self.groups.get_mut(&parent_id)?.groups.push(id),
            None => self.roots.push(id),
        }
        self.groups.insert(id, group);
        Some(())
    }

    /// Look up a group by id.
    pub fn group(&self, id: GroupId) -> Option<&Group> {
        self.groups.get(&id)
    }

    /// Top-level groups in order.
    pub fn root_groups(&self) -> impl Iterator<Item = &Group> + '_ {
        self.roots.iter().filter_map(|id| self.groups.get(id))
    }

    /// Child groups of `id` in order. Unknown ids yield nothing.
    pub fn groups_of(&self, id: GroupId) -> impl Iterator<Item = &Group> + '_ {
        self.groups
            .get(&id)
            .map(|g| g.groups.as_slice())
            .unwrap_or_default()
            .iter()
            .filter_map(|child| self.groups.get(child))
    }

    /// Child entries of `id` in order. Unknown ids yield nothing.
    pub fn entries_of(&self, id: GroupId) -> impl Iterator<Item = &Entry> + '_ {
        self.groups
            .get(&id)
            .map(|g| g.entries.as_slice())
            .unwrap_or_default()
            .iter()
            .filter_map(|entry| self.entries.get(entry))
    }

    /// Depth-first walk over the subtree rooted at `from` (inclusive),
    /// children before siblings, in child-list order.
    pub fn walk_from(&self, from: GroupId) -> Walk<'_> {
        let stack = if self.groups.contains_key(&from) {
            vec![from]
        } else {
            Vec::new()
        };
        Walk {
            workspace: self,
            stack,
        }
    }

    /// Depth-first walk over every group in the workspace.
    pub fn walk(&self) -> Walk<'_> {
        Walk {
            workspace: self,
            stack: self.roots.iter().rev().copied().collect(),
        }
    }

    /// Search the subtree rooted at `root` for group `id`.
    pub fn find_group_in(&self, root: GroupId, id: GroupId) -> Option<&Group> {
        self.walk_from(root).find(|g| g.id() == id)
    }

    /// Look up a group anywhere in the workspace.
    ///
    /// Ids are unique, so this agrees with a depth-first [`walk`](Self::walk).
    pub fn find_group(&self, id: GroupId) -> Option<&Group> {
        self.groups.get(&id)
    }

    /// Titles from the top level down to `id`, e.g. `["Finance", "Banks"]`.
    pub fn path_of(&self, id: GroupId) -> Vec<&str> {
        let mut path = Vec::new();
        let mut current = self.groups.get(&id);
        while let Some(group) = current {
            path.push(group.title());
            current = group.parent().and_then(|p| self.groups.get(&p));
        }
        path.reverse();
        path
    }

    /// Change a group's title. Returns `false` for an unknown group.
    pub fn rename_group(&mut self, id: GroupId, title: &str) -> bool {
        let Some(group) = self.groups.get_mut(&id) else {
            return false;
        };
        if group.set_title(title) {
            tracing::debug!("Renamed group {} to {:?}", id, title);
        }
        true
    }

    /// Delete a group and everything beneath it.
    ///
    /// Returns `false` if the group does not exist.
    pub fn delete_group(&mut self, id: GroupId) -> bool {
        let Some(parent) = self.groups.get(&id).map(Group::parent) else {
            return false;
        };

        let (group_ids, entry_ids) = self.collect_subtree(id);
        for entry_id in &entry_ids {
            self.entries.remove(entry_id);
        }
        for group_id in &group_ids {
            self.groups.remove(group_id);
        }

        match parent {
            Some(parent_id) => {
                if let Some(parent) = self.groups.get_mut(&parent_id) {
                    parent.groups.retain(|child| *child != id);
                }
            }
            None => self.roots.retain(|root| *root != id),
        }

        tracing::debug!(
            "Deleted group {} with {} descendant groups and {} entries",
            id,
            group_ids.len() - 1,
            entry_ids.len()
        );
        true
    }

    /// Every group id (including `root`) and entry id beneath `root`,
    /// entries of a group collected before descending into its child groups.
    fn collect_subtree(&self, root: GroupId) -> (Vec<GroupId>, Vec<EntryId>) {
        let mut group_ids = Vec::new();
        let mut entry_ids = Vec::new();
        for group in self.walk_from(root) {
            entry_ids.extend_from_slice(&group.entries);
            group_ids.push(group.id());
        }
        (group_ids, entry_ids)
    }

    // ─── Entries ──────────────────────────────────────────────────────

    /// Create an entry in `group`. Returns `None` if the group does not exist.
    pub fn create_entry(&mut self, group: GroupId, title: &str) -> Option<EntryId> {
        if !self.groups.contains_key(&group) {
            return None;
        }
        let id = EntryId::from(self.allocate());
        self.attach_entry(Entry::new(id, group, title))?;
        tracing::debug!("Created entry {} ({:?}) in group {}", id, title, group);
        Some(id)
    }

    fn attach_entry(&mut self, entry: Entry) -> Option<()> {
        self.groups.get_mut(&entry.group())?.entries.push(entry.id());
        self.entries.insert(entry.id(), entry);
        Some(())
    }

    /// Look up an entry by id.
    pub fn entry(&self, id: EntryId) -> Option<&Entry> {
        self.entries.get(&id)
    }

    /// Mutable access to an entry by id.
    pub fn entry_mut(&mut self, id: EntryId) -> Option<&mut Entry> {
        self.entries.get_mut(&id)
    }

    /// Look up an entry anywhere in the workspace.
    pub fn find_entry(&self, id: EntryId) -> Option<&Entry> {
        self.entries.get(&id)
    }

    /// Remove an entry from its group. Returns `false` if it does not exist.
    pub fn delete_entry(&mut self, id: EntryId) -> bool {
        let Some(entry) = self.entries.remove(&id) else {
            return false;
        };
        if let Some(group) = self.groups.get_mut(&entry.group()) {
            group.entries.retain(|child| *child != id);
        }
        tracing::debug!("Deleted entry {}", id);
        true
    }

    // ─── Restoring from storage ───────────────────────────────────────

    /// Insert a group with a stored id. A missing or already-used id is
    /// replaced by a fresh one. Returns `None` if `parent` does not exist.
    pub(crate) fn restore_group(
        &mut self,
        parent: Option<GroupId>,
        stored: Option<Uuid>,
        title: &str,
    ) -> Option<GroupId> {
        let uuid = self.claim(stored, title);
        let id = GroupId::from(uuid);
        self.attach_group(parent, Group::new(id, parent, title))?;
        Some(id)
    }

    /// Insert an entry with a stored id; see [`restore_group`](Self::restore_group).
    pub(crate) fn restore_entry(
        &mut self,
        group: GroupId,
        stored: Option<Uuid>,
        properties: BTreeMap<String, String>,
        meta: BTreeMap<String, String>,
    ) -> Option<EntryId> {
        if !self.groups.contains_key(&group) {
            return None;
        }
        let label = properties.get("title").cloned().unwrap_or_default();
        let id = EntryId::from(self.claim(stored, &label));
        self.attach_entry(Entry::restore(id, group, properties, meta))?;
        Some(id)
    }

    fn claim(&self, stored: Option<Uuid>, label: &str) -> Uuid {
        match stored {
            Some(uuid) if !uuid.is_nil() && !self.is_used(uuid) => uuid,
            Some(uuid) => {
                tracing::warn!("Duplicate or nil id {} on {:?}; assigning a new one", uuid, label);
                self.allocate()
            }
            None => self.allocate(),
        }
    }
}

/// Depth-first group iterator returned by [`Workspace::walk`].
pub struct Walk<'a> {
    workspace: &'a Workspace,
    stack: Vec<GroupId>,
}

impl<'a> Iterator for Walk<'a> {
    type Item = &'a Group;

    fn next(&mut self) -> Option<Self::Item> {
        while let Some(id) = self.stack.pop() {
            if let Some(group) = self.workspace.groups.get(&id) {
                self.stack.extend(group.groups.iter().rev());
                return Some(group);
            }
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    fn titles<'a>(groups: impl Iterator<Item = &'a Group>) -> Vec<&'a str> {
        groups.map(Group::title).collect()
    }

    #[test]
    fn create_group_at_root_and_nested() {
        let mut ws = Workspace::new(DEFAULT_NAME);
        let finance = ws.create_group(None, "Finance").unwrap();
        let banks = ws.create_group(Some(finance), "Banks").unwrap();
        ws.create_group(None, "Email").unwrap();

        assert_eq!(titles(ws.root_groups()), ["Finance", "Email"]);
        assert_eq!(titles(ws.groups_of(finance)), ["Banks"]);
        assert_eq!(ws.group(banks).unwrap().parent(), Some(finance));
        assert_eq!(ws.group(finance).unwrap().parent(), None);
    }

    #[test]
    fn create_under_unknown_parent_fails() {
        let mut ws = Workspace::default();
        let ghost = GroupId::from(Uuid::new_v4());
        assert!(ws.create_group(Some(ghost), "Orphan").is_none());
        assert!(ws.create_entry(ghost, "Orphan").is_none());
        assert_eq!(ws.group_count(), 0);
        assert_eq!(ws.entry_count(), 0);
    }

    #[test]
    fn ids_are_unique_across_groups_and_entries() {
        let mut ws = Workspace::default();
        let mut seen = HashSet::new();
        for i in 0..20 {
            let g = ws.create_group(None, &format!("g{i}")).unwrap();
            assert!(seen.insert(g.as_uuid()));
            for j in 0..5 {
                let e = ws.create_entry(g, &format!("e{j}")).unwrap();
                assert!(seen.insert(e.as_uuid()));
                let sub = ws.create_group(Some(g), "sub").unwrap();
                assert!(seen.insert(sub.as_uuid()));
            }
        }
    }

    #[test]
    fn walk_is_depth_first_children_before_siblings() {
        let mut ws = Workspace::default();
        let a = ws.create_group(None, "a").unwrap();
        let a1 = ws.create_group(Some(a), "a1").unwrap();
        ws.create_group(Some(a1), "a1x").unwrap();
        ws.create_group(Some(a), "a2").unwrap();
        ws.create_group(None, "b").unwrap();

        assert_eq!(titles(ws.walk()), ["a", "a1", "a1x", "a2", "b"]);
        assert_eq!(titles(ws.walk_from(a1)), ["a1", "a1x"]);
    }

    #[test]
    fn find_group_in_is_scoped_to_subtree() {
        let mut ws = Workspace::default();
        let a = ws.create_group(None, "a").unwrap();
        let b = ws.create_group(None, "b").unwrap();
        let deep = ws.create_group(Some(b), "deep").unwrap();

        assert!(ws.find_group_in(b, deep).is_some());
        assert!(ws.find_group_in(a, deep).is_none());
        assert!(ws.find_group(deep).is_some());
    }

    #[test]
    fn cascading_delete_frees_every_descendant() {
        let mut ws = Workspace::default();
        let keep = ws.create_group(None, "keep").unwrap();
        let kept_entry = ws.create_entry(keep, "kept").unwrap();

        let top = ws.create_group(None, "top").unwrap();
        let mut groups = vec![top];
        let mut entries = Vec::new();
        let child = ws.create_group(Some(top), "child").unwrap();
        let grandchild = ws.create_group(Some(child), "grandchild").unwrap();
        groups.extend([child, grandchild]);
        entries.push(ws.create_entry(top, "e1").unwrap());
        entries.push(ws.create_entry(child, "e2").unwrap());
        entries.push(ws.create_entry(grandchild, "e3").unwrap());

        assert!(ws.delete_group(top));

        for g in groups {
            assert!(ws.find_group(g).is_none());
        }
        for e in entries {
            assert!(ws.find_entry(e).is_none());
        }
        assert_eq!(titles(ws.root_groups()), ["keep"]);
        assert!(ws.find_entry(kept_entry).is_some());
        assert_eq!(ws.group_count(), 1);
        assert_eq!(ws.entry_count(), 1);
    }

    #[test]
    fn delete_empty_nested_group_unlinks_from_parent() {
        let mut ws = Workspace::default();
        let top = ws.create_group(None, "top").unwrap();
        let empty = ws.create_group(Some(top), "empty").unwrap();

        assert!(ws.delete_group(empty));
        assert!(ws.group(top).unwrap().group_ids().is_empty());
        assert!(!ws.delete_group(empty));
    }

    #[test]
    fn delete_entry_unlinks_from_owner() {
        let mut ws = Workspace::default();
        let g = ws.create_group(None, "g").unwrap();
        let a = ws.create_entry(g, "a").unwrap();
        let b = ws.create_entry(g, "b").unwrap();

        assert!(ws.delete_entry(a));
        assert!(!ws.delete_entry(a));
        assert_eq!(ws.group(g).unwrap().entry_ids(), [b]);
        assert_eq!(
            ws.entries_of(g).map(Entry::title).collect::<Vec<_>>(),
            ["b"]
        );
    }

    #[test]
    fn path_of_lists_titles_from_top() {
        let mut ws = Workspace::default();
        let a = ws.create_group(None, "Finance").unwrap();
        let b = ws.create_group(Some(a), "Banks").unwrap();
        assert_eq!(ws.path_of(b), ["Finance", "Banks"]);
    }

    #[test]
    fn restore_reassigns_duplicate_ids() {
        let mut ws = Workspace::default();
        let shared = Uuid::new_v4();
        let g = ws.restore_group(None, Some(shared), "first").unwrap();
        assert_eq!(g.as_uuid(), shared);

        let e = ws
            .restore_entry(g, Some(shared), BTreeMap::new(), BTreeMap::new())
            .unwrap();
        assert_ne!(e.as_uuid(), shared);
        assert_eq!(ws.entry(e).unwrap().property("password"), Some(""));
    }

    #[test]
    fn passphrase_debug_is_redacted() {
        let origin = Origin::new("/tmp/a.kdbx", Passphrase::new("hunter2"));
        assert!(!format!("{origin:?}").contains("hunter2"));
    }
}
