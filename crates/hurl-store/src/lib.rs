//! Content-addressed object access for the hurl package repository.
//!
//! This crate is the leaf of the hurl stack: it knows how to turn an
//! [`ObjectId`] into a typed git object and how to resolve a ref name to the
//! commit it points to. It never writes to an on-disk repository.
//!
//! # Object Types
//!
//! - [`Commit`] -- root tree, parents, author/committer, message
//! - [`Tree`] -- ordered directory listing of `(mode, name, id)` entries
//! - [`Blob`] -- raw file contents
//!
//! All three are variants of the closed [`Object`] enum. Callers match on
//! the variant, or use the typed readers on [`ObjectStore`] which fail with
//! [`StoreError::UnexpectedKind`] when an id names the wrong kind of object.
//!
//! # Storage Backends
//!
//! All backends implement the [`ObjectStore`] trait:
//!
//! - [`GitObjectStore`] -- libgit2 object database of an on-disk repository
//! - [`InMemoryObjectStore`] -- `HashMap`-based store for tests and embedding
//!
//! Both backends hand out objects in git's canonical encoding, so a single
//! decoder in [`object`] serves them both and the in-memory store produces
//! real git object ids.

pub mod error;
pub mod git;
pub mod memory;
pub mod object;
pub mod traits;

pub use error::{StoreError, StoreResult};
pub use git::GitObjectStore;
pub use memory::InMemoryObjectStore;
pub use object::{
    Blob, Commit, EntryMode, Object, ObjectId, ObjectKind, Signature, StoredObject, Tree,
    TreeEntry,
};
pub use traits::ObjectStore;
