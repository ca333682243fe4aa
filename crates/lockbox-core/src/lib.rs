//! Core model, transport codec and persistence for lockbox.
//!
//! A [`Workspace`] holds one credential archive as a tree of groups and
//! entries. Front ends talk to it through a [`Manager`], either by calling
//! its methods directly or by dispatching [`Command`]s.

pub mod codec;
pub mod command;
pub mod error;
pub mod manager;
pub mod model;
pub mod provider;
pub mod search;
pub mod workspace;

pub use codec::{apply_change_set, convert_entries, convert_groups, ChangeSet, EntryRecord, GroupRecord};
pub use command::{Command, Reply, WorkspaceInfo};
pub use error::{Error, Result};
pub use manager::Manager;
pub use model::{Entry, EntryId, Group, GroupId};
pub use provider::{KdbxProvider, PersistenceProvider};
pub use search::SearchHit;
pub use workspace::{Origin, Passphrase, Workspace};
