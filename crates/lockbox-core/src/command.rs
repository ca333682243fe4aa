//! Typed command surface used by front ends.
//!
//! Commands arrive as JSON objects tagged by `"command"`; malformed input is
//! rejected while decoding instead of being coerced. Read commands resolve
//! unknown ids to `null`/`false` rather than errors.

use crate::codec::{self, ChangeSet, EntryRecord, GroupRecord};
use crate::error::{Error, Result};
use crate::manager::Manager;
use crate::model::{EntryId, GroupId};
use crate::provider::PersistenceProvider;
use crate::search::{self, SearchHit};
use crate::workspace::{Passphrase, Workspace};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// One request from the front end.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "command", rename_all = "kebab-case")]
pub enum Command {
    ListGroups,
    FindGroup {
        id: String,
    },
    CreateGroup {
        #[serde(rename = "parentID", default)]
        parent_id: Option<String>,
        title: String,
    },
    RenameGroup {
        id: String,
        title: String,
    },
    DeleteGroup {
        id: String,
    },
    ListEntries {
        #[serde(rename = "groupID")]
        group_id: String,
    },
    CreateEntry {
        #[serde(rename = "parentID")]
        parent_id: String,
        title: String,
    },
    FindEntry {
        id: String,
    },
    UpdateEntry(ChangeSet),
    DeleteEntry {
        id: String,
    },
    SearchEntries {
        query: String,
        #[serde(default)]
        limit: Option<usize>,
    },
    OpenWorkspace {
        location: PathBuf,
        passphrase: String,
    },
    NewWorkspace {
        location: PathBuf,
        passphrase: String,
    },
    CloseWorkspace,
    SaveWorkspace,
}

impl Command {
    /// Decode a command from its JSON text.
    pub fn from_json(text: &str) -> Result<Self> {
        Ok(serde_json::from_str(text)?)
    }
}

/// Summary of the active workspace after opening or creating it.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WorkspaceInfo {
    pub name: String,
    pub location: Option<PathBuf>,
    pub groups: usize,
    pub entries: usize,
}

impl From<&Workspace> for WorkspaceInfo {
    fn from(workspace: &Workspace) -> Self {
        Self {
            name: workspace.name().to_string(),
            location: workspace.origin().map(|o| o.location.clone()),
            groups: workspace.group_count(),
            entries: workspace.entry_count(),
        }
    }
}

/// Result of a successful command.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Reply {
    Groups(Vec<GroupRecord>),
    Group(Option<GroupRecord>),
    Entries(Option<Vec<EntryRecord>>),
    Entry(Option<EntryRecord>),
    Hits(Vec<SearchHit>),
    Workspace(WorkspaceInfo),
    Done(bool),
}

fn parent_id(id: Option<&str>) -> Option<&str> {
    id.filter(|id| !id.trim().is_empty())
}

impl<P: PersistenceProvider> Manager<P> {
    /// Execute one command against this session.
    pub async fn dispatch(&mut self, command: Command) -> Result<Reply> {
        tracing::debug!("Dispatching {:?}", command_name(&command));

        let reply = match command {
            Command::ListGroups => {
                let workspace = self.workspace()?;
                Reply::Groups(codec::convert_groups(workspace, workspace.root_groups()))
            }
            Command::FindGroup { id } => {
                let workspace = self.workspace()?;
                let group = self.find_group(&id)?;
                Reply::Group(group.map(|g| codec::convert_group(workspace, g)))
            }
            Command::CreateGroup { parent_id: parent, title } => {
                let workspace = self.workspace_mut()?;
                let id = match parent_id(parent.as_deref()) {
                    Some(parent) => GroupId::parse(parent)
                        .and_then(|p| workspace.create_group(Some(p), &title))
                        .ok_or_else(|| Error::GroupNotFound(parent.to_string()))?,
                    None => workspace.create_root_group(&title),
                };
                Reply::Group(workspace.group(id).map(GroupRecord::from))
            }
            Command::RenameGroup { id, title } => {
                let workspace = self.workspace_mut()?;
                let renamed = GroupId::parse(&id).filter(|g| workspace.rename_group(*g, &title));
                let workspace: &Workspace = workspace;
                Reply::Group(
                    renamed
                        .and_then(|g| workspace.group(g))
                        .map(|group| codec::convert_group(workspace, group)),
                )
            }
            Command::DeleteGroup { id } => {
                let workspace = self.workspace_mut()?;
                Reply::Done(GroupId::parse(&id).is_some_and(|g| workspace.delete_group(g)))
            }
            Command::ListEntries { group_id } => {
                let workspace = self.workspace()?;
                let group = GroupId::parse(&group_id).and_then(|g| workspace.group(g));
                Reply::Entries(group.map(|g| codec::convert_entries(workspace, g.id())))
            }
            Command::CreateEntry { parent_id, title } => {
                let workspace = self.workspace_mut()?;
                let entry = GroupId::parse(&parent_id)
                    .and_then(|g| workspace.create_entry(g, &title))
                    .and_then(|e| workspace.entry(e));
                Reply::Entry(entry.map(EntryRecord::from))
            }
            Command::FindEntry { id } => Reply::Entry(self.find_entry(&id)?.map(EntryRecord::from)),
            Command::UpdateEntry(change) => {
                let workspace = self.workspace_mut()?;
                Reply::Entry(Some(codec::apply_change_set(workspace, &change)?))
            }
            Command::DeleteEntry { id } => {
                let workspace = self.workspace_mut()?;
                Reply::Done(EntryId::parse(&id).is_some_and(|e| workspace.delete_entry(e)))
            }
            Command::SearchEntries { query, limit } => {
                let limit = limit.unwrap_or(self.search_limit());
                Reply::Hits(search::search_entries(self.workspace()?, &query, limit))
            }
            Command::OpenWorkspace { location, passphrase } => {
                let workspace = self.open(location, Passphrase::new(passphrase)).await?;
                Reply::Workspace(WorkspaceInfo::from(workspace))
            }
            Command::NewWorkspace { location, passphrase } => {
                let workspace = self.create(location, Passphrase::new(passphrase)).await?;
                Reply::Workspace(WorkspaceInfo::from(workspace))
            }
            Command::CloseWorkspace => Reply::Done(self.close().is_some()),
            Command::SaveWorkspace => {
                self.save().await?;
                Reply::Done(true)
            }
        };
        Ok(reply)
    }
}

/// Wire name of a command, for logging without echoing passphrases.
pub fn command_name(command: &Command) -> &'static str {
    match command {
        Command::ListGroups => "list-groups",
        Command::FindGroup { .. } => "find-group",
        Command::CreateGroup { .. } => "create-group",
        Command::RenameGroup { .. } => "rename-group",
        Command::DeleteGroup { .. } => "delete-group",
        Command::ListEntries { .. } => "list-entries",
        Command::CreateEntry { .. } => "create-entry",
        Command::FindEntry { .. } => "find-entry",
        Command::UpdateEntry(_) => "update-entry",
        Command::DeleteEntry { .. } => "delete-entry",
        Command::SearchEntries { .. } => "search-entries",
        Command::OpenWorkspace { .. } => "open-workspace",
        Command::NewWorkspace { .. } => "new-workspace",
        Command::CloseWorkspace => "close-workspace",
        Command::SaveWorkspace => "save-workspace",
    }
}
