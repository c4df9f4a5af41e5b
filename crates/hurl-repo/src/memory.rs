//! In-memory repositories for tests and embedding.
//!
//! [`MemoryRepo`] plays the role of whoever pushes to the real repository:
//! it writes whole-branch snapshots as commits on top of the current head,
//! with a monotonically increasing clock so history order is deterministic.

use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Arc;

use hurl_store::{Commit, EntryMode, InMemoryObjectStore, ObjectId, ObjectStore, Signature, Tree, TreeEntry};

use crate::error::RepoResult;
use crate::repository::{PackageRepo, HEADS_PREFIX};

/// Contents of a branch's root tree.
#[derive(Clone, Debug, Default)]
pub struct Snapshot {
    entries: Vec<(String, Node)>,
}

#[derive(Clone, Debug)]
enum Node {
    File(Vec<u8>),
    Dir(Vec<(String, Vec<u8>)>),
}

impl Snapshot {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a top-level file.
    pub fn file(mut self, name: &str, data: impl AsRef<[u8]>) -> Self {
        self.remove(name);
        self.entries
            .push((name.to_string(), Node::File(data.as_ref().to_vec())));
        self
    }

    /// Add a top-level directory of files. A package is a directory with a
    /// `Cakefile`.
    pub fn dir(mut self, name: &str, files: &[(&str, &str)]) -> Self {
        self.remove(name);
        let files = files
            .iter()
            .map(|(file, data)| (file.to_string(), data.as_bytes().to_vec()))
            .collect();
        self.entries.push((name.to_string(), Node::Dir(files)));
        self
    }

    /// Drop a top-level entry.
    pub fn without(mut self, name: &str) -> Self {
        self.remove(name);
        self
    }

    fn remove(&mut self, name: &str) {
        self.entries.retain(|(entry, _)| entry != name);
    }
}

/// A writable in-memory repository.
pub struct MemoryRepo {
    store: Arc<InMemoryObjectStore>,
    clock: AtomicI64,
}

impl MemoryRepo {
    pub fn new() -> Self {
        Self {
            store: Arc::new(InMemoryObjectStore::new()),
            clock: AtomicI64::new(1_700_000_000),
        }
    }

    pub fn store(&self) -> &Arc<InMemoryObjectStore> {
        &self.store
    }

    /// A read-only view sharing this repository's store.
    pub fn repo(&self) -> PackageRepo {
        PackageRepo::new(self.store.clone())
    }

    /// Commit `snapshot` as the new state of `branch`, parented on the
    /// branch's current head (if any).
    pub fn commit(&self, branch: &str, snapshot: &Snapshot, message: &str) -> RepoResult<ObjectId> {
        let head = self.store.resolve_ref(&ref_name(branch))?;
        let parents: Vec<ObjectId> = head.into_iter().collect();
        self.commit_with_parents(branch, snapshot, &parents, message)
    }

    /// Commit `snapshot` on `branch` with explicit parents, e.g. a merge.
    pub fn commit_with_parents(
        &self,
        branch: &str,
        snapshot: &Snapshot,
        parents: &[ObjectId],
        message: &str,
    ) -> RepoResult<ObjectId> {
        let tree = self.write_snapshot(snapshot)?;
        let time = self.clock.fetch_add(60, Ordering::SeqCst);
        let signature = Signature::new("Hurl Test", "test@hurl.invalid", time, "+0000");
        let commit = self.store.write_commit(&Commit {
            tree,
            parents: parents.to_vec(),
            author: Some(signature.clone()),
            committer: Some(signature),
            message: format!("{message}\n"),
        })?;
        self.store.set_ref(ref_name(branch), commit)?;
        Ok(commit)
    }

    /// Remove a branch ref. Its objects stay in the store.
    pub fn delete_branch(&self, branch: &str) -> RepoResult<bool> {
        Ok(self.store.delete_ref(&ref_name(branch))?)
    }

    fn write_snapshot(&self, snapshot: &Snapshot) -> RepoResult<ObjectId> {
        let mut entries = Vec::with_capacity(snapshot.entries.len());
        for (name, node) in &snapshot.entries {
            let entry = match node {
                Node::File(data) => TreeEntry::new(EntryMode::Regular, name, self.store.write_blob(data)?),
                Node::Dir(files) => {
                    let mut children = Vec::with_capacity(files.len());
                    for (file, data) in files {
                        children.push(TreeEntry::new(EntryMode::Regular, file, self.store.write_blob(data)?));
                    }
                    TreeEntry::new(EntryMode::Directory, name, self.store.write_tree(&Tree::new(children))?)
                }
            };
            entries.push(entry);
        }
        Ok(self.store.write_tree(&Tree::new(entries))?)
    }
}

impl Default for MemoryRepo {
    fn default() -> Self {
        Self::new()
    }
}

fn ref_name(branch: &str) -> String {
    format!("{HEADS_PREFIX}{branch}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn commits_chain_on_branch_head() {
        let mem = MemoryRepo::new();
        let first = mem.commit("master", &Snapshot::new().file("a", "1"), "one").unwrap();
        let second = mem.commit("master", &Snapshot::new().file("a", "2"), "two").unwrap();

        let commit = mem.store().read_commit(&second).unwrap();
        assert_eq!(commit.parents, vec![first]);
        assert_eq!(mem.repo().branch_head("master").unwrap(), Some(second));
    }

    #[test]
    fn identical_snapshots_share_trees() {
        let mem = MemoryRepo::new();
        let snapshot = Snapshot::new().dir("foo", &[("Cakefile", "name: foo\n")]);
        let a = mem.commit("a", &snapshot, "a").unwrap();
        let b = mem.commit("b", &snapshot, "b").unwrap();
        let store = mem.store();
        assert_eq!(store.read_commit(&a).unwrap().tree, store.read_commit(&b).unwrap().tree);
    }

    #[test]
    fn later_entries_replace_earlier() {
        let snapshot = Snapshot::new().file("x", "1").dir("x", &[]).without("y");
        assert_eq!(snapshot.entries.len(), 1);
        assert!(matches!(snapshot.entries[0].1, Node::Dir(_)));
    }

    #[test]
    fn delete_branch_removes_ref() {
        let mem = MemoryRepo::new();
        mem.commit("gone", &Snapshot::new(), "x").unwrap();
        assert!(mem.delete_branch("gone").unwrap());
        assert_eq!(mem.repo().branch_head("gone").unwrap(), None);
    }
}
