use super::{EntryId, GroupId};

/// A folder of child groups and entries. Children are held by id; the
/// owning [`Workspace`](crate::Workspace) stores the nodes themselves.
#[derive(Debug, Clone, PartialEq)]
pub struct Group {
    id: GroupId,
    title: String,
    parent: Option<GroupId>,
    pub(crate) groups: Vec<GroupId>,
    pub(crate) entries: Vec<EntryId>,
}

impl Group {
    pub(crate) fn new(id: GroupId, parent: Option<GroupId>, title: &str) -> Self {
        Self {
            id,
            title: title.to_string(),
            parent,
            groups: Vec::new(),
            entries: Vec::new(),
        }
    }

    /// Unique identifier of this group.
    pub fn id(&self) -> GroupId {
        self.id
    }

    /// Display title.
    pub fn title(&self) -> &str {
        &self.title
    }

    pub(crate) fn set_title(&mut self, title: &str) -> bool {
        if self.title == title {
            return false;
        }
        self.title = title.to_string();
        true
    }

    /// Parent group, or `None` for a top-level group.
    pub fn parent(&self) -> Option<GroupId> {
        self.parent
    }

    /// Child group ids in insertion order.
    pub fn group_ids(&self) -> &[GroupId] {
        &self.groups
    }

    /// Child entry ids in insertion order.
    pub fn entry_ids(&self) -> &[EntryId] {
        &self.entries
    }

    /// Whether the group has no child groups and no entries.
    pub fn is_empty(&self) -> bool {
        self.groups.is_empty() && self.entries.is_empty()
    }
}
