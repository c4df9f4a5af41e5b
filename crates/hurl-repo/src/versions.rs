//! Bulk version sync: tell a client which of its installed packages have a
//! newer (or just different) version in the repository.

use hurl_manifest::Dependency;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{RepoError, RepoResult};
use crate::repository::PackageRepo;

/// A package version known to a client.
///
/// Deserializes from either `{"branch": .., "package": .., "version": ..}`
/// or a `[branch, package, version]` triple.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct VersionRequest {
    pub branch: String,
    pub package: String,
    pub version: String,
}

impl VersionRequest {
    pub fn new(branch: impl Into<String>, package: impl Into<String>, version: impl Into<String>) -> Self {
        Self {
            branch: branch.into(),
            package: package.into(),
            version: version.into(),
        }
    }
}

/// The live version of a package whose version differs from the request.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct VersionUpdate {
    pub branch: String,
    pub package: String,
    pub version: String,
    pub dependencies: Vec<Dependency>,
    pub conflicts: Vec<Dependency>,
}

impl PackageRepo {
    /// For each request, compare the live `version-release` string against
    /// the known one and report those that differ. Packages that are gone,
    /// or whose manifest is malformed, are skipped.
    pub fn latest_versions(&self, requests: &[VersionRequest]) -> RepoResult<Vec<VersionUpdate>> {
        let mut updates = Vec::new();
        for request in requests {
            match self.version_update(request) {
                Ok(Some(update)) => updates.push(update),
                Ok(None) => {}
                Err(e) if e.is_malformed() => {
                    debug!(branch = %request.branch, package = %request.package, error = %e, "skipping malformed manifest");
                }
                Err(e) => return Err(e),
            }
        }
        Ok(updates)
    }

    fn version_update(&self, request: &VersionRequest) -> RepoResult<Option<VersionUpdate>> {
        let (branch, package) = (request.branch.as_str(), request.package.as_str());
        let Some(manifest) = self.package_manifest(branch, package)? else {
            return Ok(None);
        };
        let malformed = |e| RepoError::manifest(branch, package, e);
        let version = manifest.version_string().map_err(malformed)?;
        if version == request.version {
            return Ok(None);
        }
        Ok(Some(VersionUpdate {
            branch: branch.to_string(),
            package: package.to_string(),
            version,
            dependencies: manifest.dependencies("dependencies").map_err(malformed)?,
            conflicts: manifest.dependencies("conflicts").map_err(malformed)?,
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::{MemoryRepo, Snapshot};

    fn cakefile(release: u32) -> String {
        format!(
            "name: foo\nversion: '1.0'\nrelease: {release}\n\
dependencies: [bar >= 2, baz]\nconflicts: [old-foo]\n"
        )
    }

    fn publish(mem: &MemoryRepo, release: u32) {
        let snapshot = Snapshot::new()
            .dir("foo", &[("Cakefile", cakefile(release).as_str())])
            .dir("noversion", &[("Cakefile", "name: noversion\n")])
            .dir("broken", &[("Cakefile", "{unclosed\n")]);
        mem.commit("master", &snapshot, "publish").unwrap();
    }

    #[test]
    fn unchanged_version_yields_nothing() {
        let mem = MemoryRepo::new();
        publish(&mem, 2);
        let updates = mem
            .repo()
            .latest_versions(&[VersionRequest::new("master", "foo", "1.0-2")])
            .unwrap();
        assert!(updates.is_empty());
    }

    #[test]
    fn bumped_release_yields_one_update() {
        let mem = MemoryRepo::new();
        publish(&mem, 2);
        publish(&mem, 3);
        let updates = mem
            .repo()
            .latest_versions(&[VersionRequest::new("master", "foo", "1.0-2")])
            .unwrap();
        assert_eq!(updates.len(), 1);
        let update = &updates[0];
        assert_eq!(update.version, "1.0-3");
        assert_eq!(update.dependencies[0].parts(), vec!["bar", ">=", "2"]);
        assert_eq!(update.dependencies[1].parts(), vec!["baz"]);
        assert_eq!(update.conflicts[0].parts(), vec!["old-foo"]);
    }

    #[test]
    fn missing_and_malformed_are_skipped() {
        let mem = MemoryRepo::new();
        publish(&mem, 1);
        let updates = mem
            .repo()
            .latest_versions(&[
                VersionRequest::new("master", "nope", "0"),
                VersionRequest::new("gone", "foo", "0"),
                VersionRequest::new("master", "noversion", "0"),
                VersionRequest::new("master", "broken", "0"),
                VersionRequest::new("master", "foo", "0"),
            ])
            .unwrap();
        assert_eq!(updates.len(), 1);
        assert_eq!(updates[0].package, "foo");
    }

    #[test]
    fn request_accepts_triples_and_objects() {
        let from_triple: VersionRequest =
            serde_json::from_str(r#"["master", "foo", "1.0-2"]"#).unwrap();
        let from_object: VersionRequest =
            serde_json::from_str(r#"{"branch": "master", "package": "foo", "version": "1.0-2"}"#)
                .unwrap();
        assert_eq!(from_triple, from_object);
    }

    #[test]
    fn update_serializes_dependency_parts() {
        let mem = MemoryRepo::new();
        publish(&mem, 5);
        let updates = mem
            .repo()
            .latest_versions(&[VersionRequest::new("master", "foo", "")])
            .unwrap();
        let json = serde_json::to_value(&updates[0]).unwrap();
        assert_eq!(json["dependencies"][0], serde_json::json!(["bar", ">=", "2"]));
        assert_eq!(json["version"], "1.0-5");
    }
}
