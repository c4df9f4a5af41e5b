use hurl_manifest::{Dependency, Manifest, Source, MANIFEST_FILE};
use serde::Serialize;

use crate::error::{RepoError, RepoResult};
use crate::repository::PackageRepo;

/// Everything shown on a package page.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct PackageView {
    pub branch: String,
    pub package: String,
    pub manifest: Manifest,
    pub files: Vec<String>,
    pub dependencies: Vec<Dependency>,
    pub build_dependencies: Vec<Dependency>,
    pub sources: Vec<Source>,
}

impl PackageRepo {
    /// The package's manifest with dependencies and sources normalized.
    /// `None` if the package does not exist.
    pub fn package_view(&self, branch: &str, package: &str) -> RepoResult<Option<PackageView>> {
        let Some(tree) = self.package_tree(branch, package)? else {
            return Ok(None);
        };
        let Some(manifest) = self.manifest_in(&tree, branch, package)? else {
            return Ok(None);
        };
        let malformed = |e| RepoError::manifest(branch, package, e);
        Ok(Some(PackageView {
            branch: branch.to_string(),
            package: package.to_string(),
            files: tree.names(),
            dependencies: manifest.dependencies("dependencies").map_err(malformed)?,
            build_dependencies: manifest.dependencies("build-dependencies").map_err(malformed)?,
            sources: manifest.sources().map_err(malformed)?,
            manifest,
        }))
    }
}

/// Content type for a raw package file: manifests and patches are text,
/// everything else is served as bytes.
pub fn content_type(filename: &str) -> &'static str {
    if filename == MANIFEST_FILE || filename.ends_with(".patch") || filename.ends_with(".install") {
        "text/plain; charset=utf-8"
    } else {
        "application/octet-stream"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::{MemoryRepo, Snapshot};

    const CAKEFILE: &str = "\
name: foo
version: '2.0'
release: 1
dependencies: [libbar >= 1.1]
build-dependencies: [make]
sources:
  - http://x.org/${name}-${version}.tar.gz
  - [fix.patch, -p1]
";

    #[test]
    fn view_normalizes_manifest() {
        let mem = MemoryRepo::new();
        mem.commit(
            "master",
            &Snapshot::new().dir("foo", &[("Cakefile", CAKEFILE), ("fix.patch", "")]),
            "add",
        )
        .unwrap();

        let view = mem.repo().package_view("master", "foo").unwrap().unwrap();
        assert_eq!(view.files, vec!["Cakefile", "fix.patch"]);
        assert_eq!(view.dependencies[0].parts(), vec!["libbar", ">=", "1.1"]);
        assert_eq!(view.build_dependencies[0].parts(), vec!["make"]);
        assert_eq!(view.sources[0].url, "http://x.org/foo-2.0.tar.gz");
        assert_eq!(view.sources[1].display, "fix.patch");
        assert!(!view.sources[1].external);
    }

    #[test]
    fn view_of_missing_package() {
        let mem = MemoryRepo::new();
        mem.commit("master", &Snapshot::new().dir("docs", &[("a", "b")]), "x")
            .unwrap();
        assert!(mem.repo().package_view("master", "docs").unwrap().is_none());
        assert!(mem.repo().package_view("master", "foo").unwrap().is_none());
    }

    #[test]
    fn unsupported_source_is_malformed() {
        let mem = MemoryRepo::new();
        mem.commit(
            "master",
            &Snapshot::new().dir("foo", &[("Cakefile", "name: foo\nsources: [42]\n")]),
            "x",
        )
        .unwrap();
        let err = mem.repo().package_view("master", "foo").unwrap_err();
        assert!(err.is_malformed());
    }

    #[test]
    fn content_types() {
        assert_eq!(content_type("Cakefile"), "text/plain; charset=utf-8");
        assert_eq!(content_type("fix-build.patch"), "text/plain; charset=utf-8");
        assert_eq!(content_type("foo.install"), "text/plain; charset=utf-8");
        assert_eq!(content_type("logo.png"), "application/octet-stream");
    }
}
