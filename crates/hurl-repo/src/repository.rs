use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Arc;

use hurl_manifest::{Manifest, MANIFEST_FILE};
use hurl_store::{EntryMode, GitObjectStore, ObjectId, ObjectStore, StoreError, Tree, TreeEntry};
use tracing::debug;

use crate::error::{RepoError, RepoResult};
use crate::names::is_priority_branch;

/// Ref namespace holding branches.
pub const HEADS_PREFIX: &str = "refs/heads/";

/// Top-level file shown as a branch's description.
pub const README_FILE: &str = "README";

/// Read-only view of a package repository.
///
/// Cheap to clone; clones share the underlying store.
#[derive(Clone)]
pub struct PackageRepo {
    store: Arc<dyn ObjectStore>,
}

impl PackageRepo {
    pub fn new(store: Arc<dyn ObjectStore>) -> Self {
        Self { store }
    }

    /// Open an on-disk git repository.
    pub fn open(path: impl AsRef<Path>) -> RepoResult<Self> {
        Ok(Self::new(Arc::new(GitObjectStore::open(path)?)))
    }

    pub fn store(&self) -> &Arc<dyn ObjectStore> {
        &self.store
    }

    // ---- Branches ----

    /// All branch names, `master` and `staging*` first, otherwise in ref
    /// order.
    pub fn list_branches(&self) -> RepoResult<Vec<String>> {
        let mut branches: Vec<String> = self
            .store
            .list_refs(HEADS_PREFIX)?
            .into_iter()
            .filter_map(|name| name.strip_prefix(HEADS_PREFIX).map(str::to_string))
            .collect();
        branches.sort_by_key(|branch| !is_priority_branch(branch));
        Ok(branches)
    }

    pub fn count_branches(&self) -> RepoResult<usize> {
        Ok(self.store.list_refs(HEADS_PREFIX)?.len())
    }

    /// Commit the branch points to.
    pub fn branch_head(&self, branch: &str) -> RepoResult<Option<ObjectId>> {
        Ok(self.store.resolve_ref(&format!("{HEADS_PREFIX}{branch}"))?)
    }

    /// Root tree of the branch head.
    pub fn branch_tree(&self, branch: &str) -> RepoResult<Option<Tree>> {
        let Some(head) = self.branch_head(branch)? else {
            return Ok(None);
        };
        let commit = self.store.read_commit(&head)?;
        Ok(Some(self.store.read_tree(&commit.tree)?))
    }

    /// The branch's top-level `README`, if it is a file.
    pub fn branch_readme(&self, branch: &str) -> RepoResult<Option<Vec<u8>>> {
        match self.branch_tree(branch)? {
            Some(root) => self.file_in(&root, README_FILE),
            None => Ok(None),
        }
    }

    // ---- Packages ----

    /// Package names in a branch, in tree order. `None` if the branch does
    /// not exist; an existing branch without packages yields an empty list.
    pub fn packages_in_branch(&self, branch: &str) -> RepoResult<Option<Vec<String>>> {
        let Some(root) = self.branch_tree(branch)? else {
            return Ok(None);
        };
        let mut packages = Vec::new();
        for entry in &root.entries {
            if let Some(subtree) = self.subtree(entry)? {
                if subtree.contains(MANIFEST_FILE) {
                    packages.push(entry.name.clone());
                }
            }
        }
        Ok(Some(packages))
    }

    /// Every package in the repository, with the branches holding it in
    /// [`list_branches`](Self::list_branches) order.
    pub fn all_packages(&self) -> RepoResult<BTreeMap<String, Vec<String>>> {
        let mut packages: BTreeMap<String, Vec<String>> = BTreeMap::new();
        for branch in self.list_branches()? {
            // A branch deleted since listing has no packages.
            for package in self.packages_in_branch(&branch)?.unwrap_or_default() {
                packages.entry(package).or_default().push(branch.clone());
            }
        }
        Ok(packages)
    }

    pub fn branches_with_package(&self, package: &str) -> RepoResult<Vec<String>> {
        let mut branches = Vec::new();
        for branch in self.list_branches()? {
            if let Some(tree) = self.package_tree(&branch, package)? {
                if tree.contains(MANIFEST_FILE) {
                    branches.push(branch);
                }
            }
        }
        Ok(branches)
    }

    /// The package's subtree. `None` if the branch or entry is missing, or
    /// the entry is not a tree.
    pub fn package_tree(&self, branch: &str, package: &str) -> RepoResult<Option<Tree>> {
        let Some(root) = self.branch_tree(branch)? else {
            return Ok(None);
        };
        match root.get(package) {
            Some(entry) => self.subtree(entry),
            None => Ok(None),
        }
    }

    /// The parsed Cakefile. `None` when the package or its Cakefile is
    /// absent; a Cakefile that does not parse is an error.
    pub fn package_manifest(&self, branch: &str, package: &str) -> RepoResult<Option<Manifest>> {
        match self.package_tree(branch, package)? {
            Some(tree) => self.manifest_in(&tree, branch, package),
            None => Ok(None),
        }
    }

    pub fn package_file(
        &self,
        branch: &str,
        package: &str,
        filename: &str,
    ) -> RepoResult<Option<Vec<u8>>> {
        match self.package_tree(branch, package)? {
            Some(tree) => self.file_in(&tree, filename),
            None => Ok(None),
        }
    }

    /// Names of every entry in the package subtree, `Cakefile` included.
    pub fn package_files(&self, branch: &str, package: &str) -> RepoResult<Option<Vec<String>>> {
        Ok(self.package_tree(branch, package)?.map(|tree| tree.names()))
    }

    // ---- Helpers ----

    /// Read the tree an entry points to. Entries naming anything other than
    /// a tree are not packages, so a wrong-kind read is `None`.
    pub(crate) fn subtree(&self, entry: &TreeEntry) -> RepoResult<Option<Tree>> {
        if entry.mode == EntryMode::Gitlink {
            return Ok(None);
        }
        match self.store.read_tree(&entry.object_id) {
            Ok(tree) => Ok(Some(tree)),
            Err(e) if e.is_unexpected_kind() => {
                debug!(entry = %entry.name, "skipping non-tree entry");
                Ok(None)
            }
            Err(e) => Err(e.into()),
        }
    }

    pub(crate) fn manifest_in(
        &self,
        tree: &Tree,
        branch: &str,
        package: &str,
    ) -> RepoResult<Option<Manifest>> {
        let Some(data) = self.file_in(tree, MANIFEST_FILE)? else {
            return Ok(None);
        };
        Manifest::parse(&data)
            .map(Some)
            .map_err(|e| RepoError::manifest(branch, package, e))
    }

    fn file_in(&self, tree: &Tree, filename: &str) -> RepoResult<Option<Vec<u8>>> {
        let Some(entry) = tree.get(filename) else {
            return Ok(None);
        };
        match self.store.read_blob(&entry.object_id) {
            Ok(blob) => Ok(Some(blob.data)),
            Err(e) if e.is_unexpected_kind() => Ok(None),
            Err(StoreError::NotFound(_)) if entry.mode == EntryMode::Gitlink => Ok(None),
            Err(e) => Err(e.into()),
        }
    }
}

impl std::fmt::Debug for PackageRepo {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PackageRepo").finish_non_exhaustive()
    }
}
