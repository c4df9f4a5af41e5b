//! libgit2-backed object store.
//!
//! [`GitObjectStore`] reads raw objects straight from the object database
//! of an on-disk repository and hands them to the shared decoder in
//! [`crate::object`]. Refs are looked up on every call, so pushes made by
//! other processes are visible immediately.

use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};

use git2::{ErrorCode, ObjectType, Oid, Repository};
use tracing::debug;

use crate::error::{StoreError, StoreResult};
use crate::object::{ObjectId, ObjectKind, StoredObject};
use crate::traits::ObjectStore;

/// Read-only view of a git repository's object database and refs.
pub struct GitObjectStore {
    path: PathBuf,
    // `git2::Repository` is `Send` but not `Sync`.
    repo: Mutex<Repository>,
}

impl GitObjectStore {
    /// Open an existing repository (bare or with a work tree).
    pub fn open(path: impl AsRef<Path>) -> StoreResult<Self> {
        let path = path.as_ref();
        let repo = Repository::open(path)
            .map_err(|e| StoreError::RepositoryNotFound(format!("{}: {e}", path.display())))?;
        debug!(path = %path.display(), bare = repo.is_bare(), "opened git object store");
        Ok(Self {
            path: path.to_path_buf(),
            repo: Mutex::new(repo),
        })
    }

    /// Path the repository was opened from.
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn repo(&self) -> StoreResult<MutexGuard<'_, Repository>> {
        self.repo.lock().map_err(|_| StoreError::LockPoisoned)
    }
}

fn is_missing(err: &git2::Error) -> bool {
    matches!(err.code(), ErrorCode::NotFound | ErrorCode::InvalidSpec)
}

fn kind_of(id: &ObjectId, kind: ObjectType) -> StoreResult<ObjectKind> {
    match kind {
        ObjectType::Commit => Ok(ObjectKind::Commit),
        ObjectType::Tree => Ok(ObjectKind::Tree),
        ObjectType::Blob => Ok(ObjectKind::Blob),
        ObjectType::Tag => Ok(ObjectKind::Tag),
        other => Err(StoreError::CorruptObject {
            id: *id,
            reason: format!("unexpected object type {other:?}"),
        }),
    }
}

impl ObjectStore for GitObjectStore {
    fn read(&self, id: &ObjectId) -> StoreResult<Option<StoredObject>> {
        let repo = self.repo()?;
        let odb = repo.odb()?;
        let oid = Oid::from_bytes(id.as_bytes())?;
        let stored = match odb.read(oid) {
            Ok(object) => {
                let kind = kind_of(id, object.kind())?;
                StoredObject::new(kind, object.data().to_vec())
            }
            Err(e) if is_missing(&e) => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        Ok(Some(stored))
    }

    fn resolve_ref(&self, name: &str) -> StoreResult<Option<ObjectId>> {
        let repo = self.repo()?;
        let reference = match repo.find_reference(name) {
            Ok(reference) => reference,
            Err(e) if is_missing(&e) => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        let resolved = reference.resolve()?;
        resolved
            .target()
            .map(|oid| ObjectId::from_slice(oid.as_bytes()))
            .transpose()
    }

    fn list_refs(&self, prefix: &str) -> StoreResult<Vec<String>> {
        let repo = self.repo()?;
        let mut names = Vec::new();
        for reference in repo.references()? {
            let reference = reference?;
            if let Some(name) = reference.name() {
                if name.starts_with(prefix) {
                    names.push(name.to_string());
                }
            }
        }
        names.sort();
        Ok(names)
    }
}

impl std::fmt::Debug for GitObjectStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GitObjectStore")
            .field("path", &self.path)
            .finish()
    }
}
