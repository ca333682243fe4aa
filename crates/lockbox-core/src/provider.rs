//! Loading and saving workspaces as encrypted KeePass (KDBX) archives.

use crate::model::{Entry, Group, GroupId};
use crate::workspace::{Passphrase, Workspace};
use anyhow::{Context, Result};
use keepass::config::DatabaseConfig;
use keepass::db::{Node, Value};
use keepass::{Database, DatabaseKey};
use std::collections::BTreeMap;
use std::future::Future;
use std::path::Path;
use tempfile::NamedTempFile;

/// Properties stored in the standard KeePass string fields.
const STANDARD_FIELDS: [(&str, &str); 5] = [
    ("title", "Title"),
    ("username", "UserName"),
    ("password", "Password"),
    ("url", "URL"),
    ("notes", "Notes"),
];

/// Field-name prefix for properties without a standard KeePass field.
const PROPERTY_FIELD_PREFIX: &str = "Property:";
/// Field-name prefix for metadata keys that would otherwise collide with a
/// standard field or one of the prefixes.
const META_FIELD_PREFIX: &str = "Meta:";

/// Durable storage for workspaces.
///
/// Implementations must either return a fully built workspace or an error;
/// a partially loaded tree is never observable.
pub trait PersistenceProvider {
    fn load(
        &self,
        location: &Path,
        passphrase: &Passphrase,
    ) -> impl Future<Output = Result<Workspace>> + Send;

    fn save(
        &self,
        location: &Path,
        passphrase: &Passphrase,
        workspace: &Workspace,
    ) -> impl Future<Output = Result<()>> + Send;
}

/// KDBX4 archives via the `keepass` crate.
#[derive(Debug, Clone, Copy, Default)]
pub struct KdbxProvider;

impl PersistenceProvider for KdbxProvider {
    async fn load(&self, location: &Path, passphrase: &Passphrase) -> Result<Workspace> {
        let bytes = tokio::fs::read(location)
            .await
            .with_context(|| format!("Failed to read database: {}", location.display()))?;
        let key = DatabaseKey::new().with_password(passphrase.expose());
        let path = location.to_path_buf();

        let workspace = tokio::task::spawn_blocking(move || -> Result<Workspace> {
            let db = Database::open(&mut bytes.as_slice(), key)
                .with_context(|| format!("Failed to open database: {}", path.display()))?;
            Ok(workspace_from_kdbx(&db))
        })
        .await
        .context("Database decoding task failed")??;

        tracing::info!(
            "Loaded {} groups and {} entries from {}",
            workspace.group_count(),
            workspace.entry_count(),
            location.display()
        );
        Ok(workspace)
    }

    async fn save(&self, location: &Path, passphrase: &Passphrase, workspace: &Workspace) -> Result<()> {
        let db = kdbx_from_workspace(workspace);
        let key = DatabaseKey::new().with_password(passphrase.expose());
        let path = location.to_path_buf();

        tokio::task::spawn_blocking(move || write_atomically(&db, key, &path))
            .await
            .context("Database encoding task failed")??;

        tracing::info!("Saved workspace to {}", location.display());
        Ok(())
    }
}

/// Encode into a temporary file next to `path`, then move it into place.
fn write_atomically(db: &Database, key: DatabaseKey, path: &Path) -> Result<()> {
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };

    let mut file = NamedTempFile::new_in(dir)
        .with_context(|| format!("Failed to create database file in: {}", dir.display()))?;

    db.save(file.as_file_mut(), key)
        .with_context(|| "Failed to save database")?;

    file.persist(path)
        .with_context(|| format!("Failed to replace database file: {}", path.display()))?;
    Ok(())
}

// ─── KDBX -> Workspace ────────────────────────────────────────────────

fn workspace_from_kdbx(db: &Database) -> Workspace {
    let name = db
        .meta
        .database_name
        .clone()
        .filter(|name| !name.is_empty())
        .unwrap_or_else(|| db.root.name.clone());
    let mut workspace = Workspace::new(name);

    let mut loose_entries = Vec::new();
    for node in &db.root.children {
        match node {
            Node::Group(g) => restore_group(&mut workspace, None, g),
            Node::Entry(e) => loose_entries.push(e),
        }
    }

    // The workspace has no root-level entries; give them a group of their own.
    if !loose_entries.is_empty() {
        tracing::warn!(
            "Moving {} entries stored on the root into group {:?}",
            loose_entries.len(),
            db.root.name
        );
        if let Some(holder) = workspace.restore_group(None, None, &db.root.name) {
            for entry in loose_entries {
                restore_entry(&mut workspace, holder, entry);
            }
        }
    }

    workspace
}

fn restore_group(workspace: &mut Workspace, parent: Option<GroupId>, kg: &keepass::db::Group) {
    let Some(id) = workspace.restore_group(parent, Some(kg.uuid), &kg.name) else {
        return;
    };

    for node in &kg.children {
        match node {
            Node::Group(g) => restore_group(workspace, Some(id), g),
            Node::Entry(e) => restore_entry(workspace, id, e),
        }
    }
}

fn restore_entry(workspace: &mut Workspace, group: GroupId, ke: &keepass::db::Entry) {
    let mut properties = BTreeMap::new();
    let mut meta = BTreeMap::new();

    for (key, val) in &ke.fields {
        let text = match val {
            Value::Unprotected(s) => s.clone(),
            Value::Protected(_) => ke.get(key).unwrap_or_default().to_string(),
            _ => {
                tracing::warn!("Skipping binary field {:?} on entry {}", key, ke.uuid);
                continue;
            }
        };

        if let Some(name) = property_for_field(key) {
            properties.insert(name.to_string(), text);
        } else if let Some(name) = key.strip_prefix(PROPERTY_FIELD_PREFIX) {
            properties.insert(name.to_string(), text);
        } else {
            let key = key.strip_prefix(META_FIELD_PREFIX).unwrap_or(key.as_str());
            meta.insert(key.to_string(), text);
        }
    }

    workspace.restore_entry(group, Some(ke.uuid), properties, meta);
}

fn property_for_field(field: &str) -> Option<&'static str> {
    STANDARD_FIELDS
        .iter()
        .find(|(_, f)| *f == field)
        .map(|(name, _)| *name)
}

// ─── Workspace -> KDBX ────────────────────────────────────────────────

fn kdbx_from_workspace(workspace: &Workspace) -> Database {
    let mut db = Database::new(DatabaseConfig::default());
    db.meta.database_name = Some(workspace.name().to_string());
    db.root.name = workspace.name().to_string();

    for group in workspace.root_groups() {
        db.root.children.push(Node::Group(kdbx_group(workspace, group)));
    }
    db
}

fn kdbx_group(workspace: &Workspace, group: &Group) -> keepass::db::Group {
    let mut kg = keepass::db::Group::new(group.title());
    kg.uuid = group.id().as_uuid();

    for child in workspace.groups_of(group.id()) {
        kg.children.push(Node::Group(kdbx_group(workspace, child)));
    }
    for entry in workspace.entries_of(group.id()) {
        kg.children.push(Node::Entry(kdbx_entry(entry)));
    }
    kg
}

fn kdbx_entry(entry: &Entry) -> keepass::db::Entry {
    let mut ke = keepass::db::Entry::new();
    ke.uuid = entry.id().as_uuid();

    for (name, value) in entry.properties() {
        let field = STANDARD_FIELDS
            .iter()
            .find(|(n, _)| *n == name.as_str())
            .map(|(_, field)| field.to_string())
            .unwrap_or_else(|| format!("{PROPERTY_FIELD_PREFIX}{name}"));

        let value = if name == "password" {
            Value::Protected(value.as_bytes().into())
        } else {
            Value::Unprotected(value.clone())
        };
        ke.fields.insert(field, value);
    }

    for (key, value) in entry.meta_map() {
        let reserved = property_for_field(key).is_some()
            || key.starts_with(PROPERTY_FIELD_PREFIX)
            || key.starts_with(META_FIELD_PREFIX);
        let field = if reserved {
            format!("{META_FIELD_PREFIX}{key}")
        } else {
            key.clone()
        };
        ke.fields.insert(field, Value::Unprotected(value.clone()));
    }

    ke
}
