//! Branch and package naming conventions.
//!
//! Branch names may contain `/`. The first segment of a namespaced branch
//! is its owner: `alice/feature` belongs to user `alice`. Public package
//! identifiers follow these forms:
//!
//! | Identifier      | Branch          | Package |
//! |-----------------|-----------------|---------|
//! | `foo`           | `master`        | `foo`   |
//! | `master/foo`    | `master`        | `foo`   |
//! | `alice/foo`     | `alice/default` | `foo`   |
//! | `alice/dev/foo` | `alice/dev`     | `foo`   |

/// The main branch. Its packages win collapsed search results.
pub const MASTER: &str = "master";

/// Prefix of staging branches, listed next to `master`.
pub const STAGING_PREFIX: &str = "staging";

/// Branch a bare user namespace resolves to.
pub const DEFAULT_BRANCH_SUFFIX: &str = "default";

/// Map a public package identifier to `(branch, package)`.
///
/// # Examples
///
/// ```
/// use hurl_repo::resolve;
///
/// assert_eq!(resolve("foo"), ("master".to_string(), "foo".to_string()));
/// assert_eq!(resolve("alice/foo"), ("alice/default".to_string(), "foo".to_string()));
/// assert_eq!(resolve("a/b/foo"), ("a/b".to_string(), "foo".to_string()));
/// ```
pub fn resolve(ident: &str) -> (String, String) {
    let segments: Vec<&str> = ident.split('/').collect();
    match segments.as_slice() {
        [package] => (MASTER.to_string(), package.to_string()),
        [MASTER, package] => (MASTER.to_string(), package.to_string()),
        [user, package] => (format!("{user}/{DEFAULT_BRANCH_SUFFIX}"), package.to_string()),
        [branch @ .., package] => (branch.join("/"), package.to_string()),
        [] => (MASTER.to_string(), String::new()),
    }
}

/// `master` and `staging*` branches are listed first.
pub fn is_priority_branch(branch: &str) -> bool {
    branch == MASTER || branch.starts_with(STAGING_PREFIX)
}

/// Namespace owner of a branch: its first `/`-separated segment.
pub fn branch_user(branch: &str) -> &str {
    branch.split('/').next().unwrap_or(branch)
}

/// Split a `branch/package` key at its last `/`. Returns `None` when there
/// is no separator or either side is empty.
pub fn split_package_key(key: &str) -> Option<(&str, &str)> {
    match key.rsplit_once('/') {
        Some((branch, package)) if !branch.is_empty() && !package.is_empty() => {
            Some((branch, package))
        }
        _ => None,
    }
}

/// Inverse of [`split_package_key`].
pub fn package_key(branch: &str, package: &str) -> String {
    format!("{branch}/{package}")
}
