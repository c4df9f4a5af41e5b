use std::collections::{BTreeMap, HashMap};
use std::sync::RwLock;

use crate::error::{StoreError, StoreResult};
use crate::object::{Blob, Commit, ObjectId, StoredObject, Tree};
use crate::traits::ObjectStore;

/// In-memory object database with a flat ref namespace.
///
/// Intended for tests and embedding. Objects are keyed by their real git
/// id, so fixtures built here look exactly like objects read from disk.
/// Unlike [`GitObjectStore`](crate::GitObjectStore) this store is
/// writable, which is how fixtures are built.
pub struct InMemoryObjectStore {
    objects: RwLock<HashMap<ObjectId, StoredObject>>,
    refs: RwLock<BTreeMap<String, ObjectId>>,
}

impl InMemoryObjectStore {
    /// Create a new empty in-memory store.
    pub fn new() -> Self {
        Self {
            objects: RwLock::new(HashMap::new()),
            refs: RwLock::new(BTreeMap::new()),
        }
    }

    /// Number of objects currently stored.
    pub fn len(&self) -> usize {
        self.objects.read().map(|map| map.len()).unwrap_or(0)
    }

    /// Returns `true` if the store holds no objects.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Write an object and return its id. Writing the same content twice is
    /// a no-op.
    pub fn write(&self, object: &StoredObject) -> StoreResult<ObjectId> {
        let id = object.compute_id();
        let mut map = self.objects.write().map_err(|_| StoreError::LockPoisoned)?;
        map.entry(id).or_insert_with(|| object.clone());
        Ok(id)
    }

    pub fn write_blob(&self, data: &[u8]) -> StoreResult<ObjectId> {
        self.write(&Blob::new(data.to_vec()).to_stored_object())
    }

    pub fn write_tree(&self, tree: &Tree) -> StoreResult<ObjectId> {
        self.write(&tree.to_stored_object())
    }

    pub fn write_commit(&self, commit: &Commit) -> StoreResult<ObjectId> {
        self.write(&commit.to_stored_object())
    }

    /// Create or move a ref.
    pub fn set_ref(&self, name: impl Into<String>, target: ObjectId) -> StoreResult<()> {
        let mut refs = self.refs.write().map_err(|_| StoreError::LockPoisoned)?;
        refs.insert(name.into(), target);
        Ok(())
    }

    /// Delete a ref. Returns `true` if it existed.
    pub fn delete_ref(&self, name: &str) -> StoreResult<bool> {
        let mut refs = self.refs.write().map_err(|_| StoreError::LockPoisoned)?;
        Ok(refs.remove(name).is_some())
    }
}

impl Default for InMemoryObjectStore {
    fn default() -> Self {
        Self::new()
    }
}

impl ObjectStore for InMemoryObjectStore {
    fn read(&self, id: &ObjectId) -> StoreResult<Option<StoredObject>> {
        let map = self.objects.read().map_err(|_| StoreError::LockPoisoned)?;
        Ok(map.get(id).cloned())
    }

    fn resolve_ref(&self, name: &str) -> StoreResult<Option<ObjectId>> {
        let refs = self.refs.read().map_err(|_| StoreError::LockPoisoned)?;
        Ok(refs.get(name).copied())
    }

    fn list_refs(&self, prefix: &str) -> StoreResult<Vec<String>> {
        let refs = self.refs.read().map_err(|_| StoreError::LockPoisoned)?;
        Ok(refs
            .keys()
            .filter(|name| name.starts_with(prefix))
            .cloned()
            .collect())
    }
}

impl std::fmt::Debug for InMemoryObjectStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InMemoryObjectStore")
            .field("object_count", &self.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::object::{EntryMode, Object, ObjectKind, Signature, TreeEntry};

    fn sample_commit(store: &InMemoryObjectStore) -> (ObjectId, ObjectId, ObjectId) {
        let blob = store.write_blob(b"name: foo\n").unwrap();
        let tree = store
            .write_tree(&Tree::new(vec![TreeEntry::new(
                EntryMode::Regular,
                "Cakefile",
                blob,
            )]))
            .unwrap();
        let sig = Signature::new("A", "a@x", 1, "+0000");
        let commit = store
            .write_commit(&Commit {
                tree,
                parents: vec![],
                author: Some(sig.clone()),
                committer: Some(sig),
                message: "init\n".into(),
            })
            .unwrap();
        (blob, tree, commit)
    }

    #[test]
    fn write_and_read_typed_objects() {
        let store = InMemoryObjectStore::new();
        let (blob, tree, commit) = sample_commit(&store);

        assert_eq!(store.read_blob(&blob).unwrap().data, b"name: foo\n");
        assert!(store.read_tree(&tree).unwrap().contains("Cakefile"));
        assert_eq!(store.read_commit(&commit).unwrap().tree, tree);
        assert!(matches!(
            store.read_object(&commit).unwrap(),
            Some(Object::Commit(_))
        ));
    }

    #[test]
    fn blob_as_tree_is_typed_error() {
        let store = InMemoryObjectStore::new();
        let (blob, _, _) = sample_commit(&store);
        let err = store.read_tree(&blob).unwrap_err();
        assert!(err.is_unexpected_kind());
        assert!(matches!(
            err,
            StoreError::UnexpectedKind {
                expected: ObjectKind::Tree,
                actual: ObjectKind::Blob,
                ..
            }
        ));
    }

    #[test]
    fn missing_object() {
        let store = InMemoryObjectStore::new();
        let id = ObjectId::hash_object(ObjectKind::Blob, b"missing");
        assert!(store.read(&id).unwrap().is_none());
        assert!(store.read_raw(&id).unwrap().is_none());
        assert!(matches!(store.read_tree(&id), Err(StoreError::NotFound(_))));
    }

    #[test]
    fn write_is_idempotent() {
        let store = InMemoryObjectStore::new();
        let a = store.write_blob(b"same").unwrap();
        let b = store.write_blob(b"same").unwrap();
        assert_eq!(a, b);
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn refs_resolve_and_list() {
        let store = InMemoryObjectStore::new();
        let (_, _, commit) = sample_commit(&store);
        store.set_ref("refs/heads/master", commit).unwrap();
        store.set_ref("refs/heads/alice/dev", commit).unwrap();
        store.set_ref("refs/tags/v1", commit).unwrap();

        assert_eq!(store.resolve_ref("refs/heads/master").unwrap(), Some(commit));
        assert_eq!(store.resolve_ref("refs/heads/nope").unwrap(), None);
        assert_eq!(
            store.list_refs("refs/heads/").unwrap(),
            vec!["refs/heads/alice/dev", "refs/heads/master"]
        );

        assert!(store.delete_ref("refs/heads/master").unwrap());
        assert!(!store.delete_ref("refs/heads/master").unwrap());
    }

    #[test]
    fn concurrent_reads_are_safe() {
        use std::sync::Arc;
        use std::thread;

        let store = Arc::new(InMemoryObjectStore::new());
        let id = store.write_blob(b"shared data").unwrap();

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let store = Arc::clone(&store);
                thread::spawn(move || {
                    let obj = store.read(&id).unwrap().unwrap();
                    assert_eq!(obj.compute_id(), id);
                })
            })
            .collect();

        for h in handles {
            h.join().expect("thread should not panic");
        }
    }

    #[test]
    fn debug_format() {
        let store = InMemoryObjectStore::new();
        store.write_blob(b"x").unwrap();
        let debug = format!("{store:?}");
        assert!(debug.contains("InMemoryObjectStore"));
        assert!(debug.contains("object_count"));
    }
}
