//! Search index over every (branch, package) pair of a hurl repository.
//!
//! One document per package per branch, keyed `branch/package`. Documents
//! are upserted when a package changes and removed when it (or its branch)
//! is deleted. Searches AND their terms, rank `master` copies above all
//! others, and collapse results to one hit per package name.
//!
//! The index keeps one lazily opened read connection and one lazily opened
//! write connection. Reads are served from a snapshot that is refreshed once
//! it is older than [`IndexConfig::refresh_after`]; writes become visible
//! to readers after [`PackageIndex::flush`].

pub mod config;
pub mod document;
pub mod error;
pub mod freshness;
pub mod index;
pub mod schema;

pub use config::IndexConfig;
pub use document::{IndexDocument, SearchResult, SearchResults};
pub use error::{IndexError, IndexResult};
pub use freshness::ConnectionFreshness;
pub use index::PackageIndex;
pub use schema::IndexSchema;
