//! Cakefile manifests for the hurl package repository.
//!
//! A Cakefile is a YAML document at the root of a package subtree. Its
//! presence is what makes a subtree a package; its contents describe the
//! package (`name`, `version`, `release`, `dependencies`, `sources`, ...).
//!
//! Manifests are user-authored and loosely schematized, so [`Manifest`] is a
//! generic ordered key/value document with typed accessors that fail
//! explicitly on a type mismatch instead of a fixed struct.
//!
//! # Normalization
//!
//! - [`substitute_fields`] -- expand `${field}` placeholders from the manifest
//! - [`parse_dependency`] -- split `name >= version` into its parts
//! - [`parse_source`] -- normalize a source entry for display and fetching

pub mod dependency;
pub mod error;
pub mod manifest;
pub mod source;

pub use dependency::{parse_dependency, Dependency, Operator};
pub use error::{ManifestError, ManifestResult};
pub use manifest::{substitute_fields, Manifest, MANIFEST_FILE};
pub use source::{parse_source, Source, EXTERNAL_SCHEMES};
