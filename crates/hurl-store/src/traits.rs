use crate::error::{StoreError, StoreResult};
use crate::object::{Blob, Commit, Object, ObjectId, ObjectKind, StoredObject, Tree};

/// Read-only access to a content-addressed object graph.
///
/// All implementations must satisfy these invariants:
/// - Objects are immutable. The same id always yields the same content, so
///   concurrent reads are always safe.
/// - Refs are read fresh on every call; nothing is cached.
/// - A missing object or ref is `Ok(None)`, never an error.
pub trait ObjectStore: Send + Sync {
    /// Read an object in its stored form.
    ///
    /// Returns `Ok(None)` if the object does not exist.
    fn read(&self, id: &ObjectId) -> StoreResult<Option<StoredObject>>;

    /// Resolve a full ref name (e.g. `refs/heads/master`) to the id it
    /// points to, following symbolic refs.
    fn resolve_ref(&self, name: &str) -> StoreResult<Option<ObjectId>>;

    /// List full ref names starting with `prefix`, sorted.
    fn list_refs(&self, prefix: &str) -> StoreResult<Vec<String>>;

    /// Read and decode an object.
    fn read_object(&self, id: &ObjectId) -> StoreResult<Option<Object>> {
        match self.read(id)? {
            Some(stored) => Object::decode(*id, &stored).map(Some),
            None => Ok(None),
        }
    }

    /// Raw payload bytes of an object (blob contents, commit text, ...).
    fn read_raw(&self, id: &ObjectId) -> StoreResult<Option<Vec<u8>>> {
        Ok(self.read(id)?.map(|stored| stored.data))
    }

    /// Read an object that must be a tree.
    ///
    /// Fails with [`StoreError::UnexpectedKind`] if `id` names a blob or
    /// commit, and with [`StoreError::NotFound`] if it names nothing.
    fn read_tree(&self, id: &ObjectId) -> StoreResult<Tree> {
        let stored = self.read(id)?.ok_or(StoreError::NotFound(*id))?;
        expect_kind(id, &stored, ObjectKind::Tree)?;
        Tree::decode(*id, &stored.data)
    }

    /// Read an object that must be a commit.
    fn read_commit(&self, id: &ObjectId) -> StoreResult<Commit> {
        let stored = self.read(id)?.ok_or(StoreError::NotFound(*id))?;
        expect_kind(id, &stored, ObjectKind::Commit)?;
        Commit::decode(*id, &stored.data)
    }

    /// Read an object that must be a blob.
    fn read_blob(&self, id: &ObjectId) -> StoreResult<Blob> {
        let stored = self.read(id)?.ok_or(StoreError::NotFound(*id))?;
        expect_kind(id, &stored, ObjectKind::Blob)?;
        Ok(Blob::new(stored.data))
    }
}

fn expect_kind(id: &ObjectId, stored: &StoredObject, expected: ObjectKind) -> StoreResult<()> {
    if stored.kind == expected {
        Ok(())
    } else {
        Err(StoreError::UnexpectedKind {
            id: *id,
            expected,
            actual: stored.kind,
        })
    }
}
