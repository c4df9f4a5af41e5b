//! Repository model for the hurl package repository.
//!
//! Every branch (`refs/heads/<branch>`) is a package namespace. A top-level
//! subtree of the branch head's root tree is a package iff it contains a
//! `Cakefile`. Nothing is cached: every call reads refs fresh and walks the
//! object graph again, so concurrent readers never observe stale state
//! beyond what the store itself holds.
//!
//! # Key types
//!
//! - [`PackageRepo`] -- all read operations over an [`ObjectStore`](hurl_store::ObjectStore)
//! - [`LogEntry`] -- one commit of a branch or package history
//! - [`VersionRequest`] / [`VersionUpdate`] -- bulk version sync
//! - [`PackageView`] -- a package's manifest with normalized dependencies and sources
//! - [`resolve`] -- map a public identifier such as `alice/foo` to `(branch, package)`
//! - [`MemoryRepo`] -- in-memory repository builder for tests and embedding

pub mod error;
pub mod log;
pub mod memory;
pub mod names;
pub mod repository;
pub mod versions;
pub mod view;

pub use error::{RepoError, RepoResult};
pub use log::LogEntry;
pub use memory::{MemoryRepo, Snapshot};
pub use names::{branch_user, is_priority_branch, package_key, resolve, split_package_key, MASTER};
pub use repository::{PackageRepo, HEADS_PREFIX, README_FILE};
pub use versions::{VersionRequest, VersionUpdate};
pub use view::{content_type, PackageView};
