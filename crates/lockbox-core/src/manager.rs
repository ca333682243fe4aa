//! The session object that owns the active workspace.

use crate::error::{Error, Result};
use crate::model::{Entry, EntryId, Group, GroupId};
use crate::provider::{KdbxProvider, PersistenceProvider};
use crate::search::DEFAULT_LIMIT;
use crate::workspace::{Origin, Passphrase, Workspace, DEFAULT_NAME};
use std::path::Path;

/// Holds at most one active [`Workspace`] and the provider used to load and
/// save it. Every command from the front end goes through a `Manager`.
#[derive(Debug)]
pub struct Manager<P = KdbxProvider> {
    workspace: Option<Workspace>,
    provider: P,
    search_limit: usize,
}

impl Default for Manager<KdbxProvider> {
    fn default() -> Self {
        Self::new(KdbxProvider)
    }
}

impl<P: PersistenceProvider> Manager<P> {
    /// Create a session with no open workspace.
    pub fn new(provider: P) -> Self {
        Self {
            workspace: None,
            provider,
            search_limit: DEFAULT_LIMIT,
        }
    }

    /// Maximum number of hits returned by a search without an explicit limit.
    pub fn with_search_limit(mut self, limit: usize) -> Self {
        self.search_limit = limit;
        self
    }

    pub fn search_limit(&self) -> usize {
        self.search_limit
    }

    /// Make `workspace` the active one, returning the workspace it replaces.
    pub fn set_workspace(&mut self, workspace: Workspace) -> Option<Workspace> {
        self.workspace.replace(workspace)
    }

    /// Drop the active workspace.
    pub fn close(&mut self) -> Option<Workspace> {
        let closed = self.workspace.take();
        if closed.is_some() {
            tracing::info!("Closed workspace");
        }
        closed
    }

    pub fn is_open(&self) -> bool {
        self.workspace.is_some()
    }

    /// The open workspace, or `NoActiveWorkspace`.
    pub fn workspace(&self) -> Result<&Workspace> {
        self.workspace.as_ref().ok_or(Error::NoActiveWorkspace)
    }

    /// Mutable access to the open workspace, or `NoActiveWorkspace`.
    pub fn workspace_mut(&mut self) -> Result<&mut Workspace> {
        self.workspace.as_mut().ok_or(Error::NoActiveWorkspace)
    }

    /// Top-level groups of the active workspace.
    pub fn groups(&self) -> Result<Vec<&Group>> {
        Ok(self.workspace()?.root_groups().collect())
    }

    /// Find a group anywhere in the active workspace. Malformed ids are not found.
    pub fn find_group(&self, id: &str) -> Result<Option<&Group>> {
        let workspace = self.workspace()?;
        Ok(GroupId::parse(id).and_then(|id| workspace.find_group(id)))
    }

    /// Find an entry anywhere in the active workspace. Malformed ids are not found.
    pub fn find_entry(&self, id: &str) -> Result<Option<&Entry>> {
        let workspace = self.workspace()?;
        Ok(EntryId::parse(id).and_then(|id| workspace.find_entry(id)))
    }

    /// Create a top-level group.
    pub fn create_group(&mut self, title: &str) -> Result<GroupId> {
        Ok(self.workspace_mut()?.create_root_group(title))
    }

    /// Load the archive at `location` and make it active.
    ///
    /// On failure the currently active workspace stays in place.
    pub async fn open(&mut self, location: impl AsRef<Path>, passphrase: Passphrase) -> Result<&Workspace> {
        let location = location.as_ref();
        let mut workspace = self
            .provider
            .load(location, &passphrase)
            .await
            .map_err(|source| Error::Persistence {
                action: "open",
                location: location.to_path_buf(),
                source,
            })?;
        workspace.set_origin(Origin::new(location, passphrase));

        self.set_workspace(workspace);
        self.workspace()
    }

    /// Write a new, empty archive to `location` and make it active.
    pub async fn create(&mut self, location: impl AsRef<Path>, passphrase: Passphrase) -> Result<&Workspace> {
        let location = location.as_ref();
        let mut workspace = Workspace::new(DEFAULT_NAME);
        self.provider
            .save(location, &passphrase, &workspace)
            .await
            .map_err(|source| Error::Persistence {
                action: "create",
                location: location.to_path_buf(),
                source,
            })?;
        workspace.set_origin(Origin::new(location, passphrase));
        tracing::info!("Created workspace at {}", location.display());

        self.set_workspace(workspace);
        self.workspace()
    }

    /// Persist the active workspace to the location it came from.
    pub async fn save(&self) -> Result<()> {
        let workspace = self.workspace()?;
        let origin = workspace.origin().ok_or(Error::NoOrigin)?;
        self.provider
            .save(&origin.location, &origin.passphrase, workspace)
            .await
            .map_err(|source| Error::Persistence {
                action: "save",
                location: origin.location.clone(),
                source,
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn operations_without_workspace_fail() {
        let mut manager = Manager::new(KdbxProvider);
        assert!(matches!(manager.groups(), Err(Error::NoActiveWorkspace)));
        assert!(matches!(manager.find_group("x"), Err(Error::NoActiveWorkspace)));
        assert!(matches!(manager.find_entry("x"), Err(Error::NoActiveWorkspace)));
        assert!(matches!(manager.create_group("x"), Err(Error::NoActiveWorkspace)));
    }

    #[test]
    fn set_workspace_replaces_previous() {
        let mut manager = Manager::new(KdbxProvider);
        assert!(manager.set_workspace(Workspace::new("first")).is_none());
        let previous = manager.set_workspace(Workspace::new("second")).unwrap();
        assert_eq!(previous.name(), "first");
        assert_eq!(manager.workspace().unwrap().name(), "second");
    }

    #[test]
    fn lookups_distinguish_missing_from_malformed_ids() {
        let mut manager = Manager::new(KdbxProvider);
        manager.set_workspace(Workspace::default());
        let g = manager.create_group("Finance").unwrap();

        assert_eq!(manager.find_group(&g.to_string()).unwrap().unwrap().title(), "Finance");
        assert!(manager.find_group("garbage").unwrap().is_none());
        assert!(manager.find_entry(&g.to_string()).unwrap().is_none());
        assert_eq!(manager.groups().unwrap().len(), 1);
    }

    #[test]
    fn scenario_delete_makes_group_and_entry_unfindable() {
        let mut manager = Manager::new(KdbxProvider);
        manager.set_workspace(Workspace::default());
        let g1 = manager.create_group("Finance").unwrap();
        let e1 = manager.workspace_mut().unwrap().create_entry(g1, "Bank").unwrap();

        assert!(manager.workspace_mut().unwrap().delete_group(g1));
        assert!(manager.find_group(&g1.to_string()).unwrap().is_none());
        assert!(manager.find_entry(&e1.to_string()).unwrap().is_none());
    }
}
