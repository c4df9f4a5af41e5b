//! Source entries: where a package's build inputs come from.
//!
//! A `sources` entry takes one of three shapes:
//!
//! ```yaml
//! sources:
//!   - http://example.com/${name}-${version}.tar.gz     # plain string
//!   - [fix-build.patch, -p1]                            # string plus flags
//!   - {git: https://example.com/foo.git, branch: dev}   # scheme mapping
//! ```

use serde::Serialize;
use serde_yaml::{Mapping, Value};

use crate::error::{ManifestError, ManifestResult};
use crate::manifest::{scalar_text, substitute_fields, untag, value_kind, Manifest};

/// Prefixes that mark a source as fetched from outside the repository.
pub const EXTERNAL_SCHEMES: &[&str] = &["http://", "https://", "ftp://"];

/// A normalized source entry.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Source {
    /// Text shown to users, with `${field}` placeholders expanded.
    pub display: String,
    /// Whether `display` starts with one of [`EXTERNAL_SCHEMES`].
    pub external: bool,
    /// Fetch location for external sources, empty otherwise.
    pub url: String,
}

impl Source {
    fn from_text(display: String) -> Self {
        let external = EXTERNAL_SCHEMES
            .iter()
            .any(|scheme| display.starts_with(scheme));
        let url = if external { display.clone() } else { String::new() };
        Self {
            display,
            external,
            url,
        }
    }
}

/// Normalize one source entry of `manifest`.
///
/// Plain strings and the leading string of a list are expanded against the
/// manifest's fields. A mapping renders as `scheme+location`, with any
/// further string options appended as a `#key=value&...` fragment; mapping
/// sources are never treated as external downloads. Every other shape is
/// [`ManifestError::UnsupportedSource`].
pub fn parse_source(manifest: &Manifest, entry: &Value) -> ManifestResult<Source> {
    match untag(entry) {
        Value::String(text) => Ok(Source::from_text(substitute_fields(manifest, text))),
        Value::Sequence(items) => match items.first().map(untag) {
            Some(Value::String(text)) => Ok(Source::from_text(substitute_fields(manifest, text))),
            _ => Err(ManifestError::UnsupportedSource {
                shape: "a list without a leading string",
            }),
        },
        Value::Mapping(map) => mapping_source(manifest, map),
        other => Err(ManifestError::UnsupportedSource {
            shape: value_kind(other),
        }),
    }
}

fn mapping_source(manifest: &Manifest, map: &Mapping) -> ManifestResult<Source> {
    let mut pairs = map
        .iter()
        .filter_map(|(key, value)| Some((key.as_str()?, scalar_text(value)?)));
    let (scheme, location) = pairs.next().ok_or(ManifestError::UnsupportedSource {
        shape: "a mapping without a string entry",
    })?;
    let mut display = format!("{scheme}+{}", substitute_fields(manifest, &location));
    let options: Vec<String> = pairs
        .map(|(key, value)| format!("{key}={}", substitute_fields(manifest, &value)))
        .collect();
    if !options.is_empty() {
        display.push('#');
        display.push_str(&options.join("&"));
    }
    Ok(Source {
        display,
        external: false,
        url: String::new(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn manifest() -> Manifest {
        Manifest::parse(b"name: foo\nversion: '2.1'\n").unwrap()
    }

    fn entry(yaml: &str) -> Value {
        serde_yaml::from_str(yaml).unwrap()
    }

    #[test]
    fn external_string() {
        let src = parse_source(&manifest(), &entry("http://x.org/${name}-${version}.tgz")).unwrap();
        assert_eq!(
            src,
            Source {
                display: "http://x.org/foo-2.1.tgz".into(),
                external: true,
                url: "http://x.org/foo-2.1.tgz".into(),
            }
        );
    }

    #[test]
    fn ftp_and_https_are_external() {
        assert!(parse_source(&manifest(), &entry("ftp://x.org/a")).unwrap().external);
        assert!(parse_source(&manifest(), &entry("https://x.org/a")).unwrap().external);
    }

    #[test]
    fn local_file_is_internal() {
        let src = parse_source(&manifest(), &entry("${name}.patch")).unwrap();
        assert_eq!(src.display, "foo.patch");
        assert!(!src.external);
        assert!(src.url.is_empty());
    }

    #[test]
    fn list_uses_first_element() {
        let src = parse_source(&manifest(), &entry("[fix.patch, -p1]")).unwrap();
        assert_eq!(src.display, "fix.patch");
        assert!(parse_source(&manifest(), &entry("[1, a]")).is_err());
        assert!(parse_source(&manifest(), &entry("[]")).is_err());
    }

    #[test]
    fn missing_field_renders_null() {
        let src = parse_source(&manifest(), &entry("http://x.org/${nope}")).unwrap();
        assert_eq!(src.display, "http://x.org/(null)");
    }

    #[test]
    fn mapping_source() {
        let src = parse_source(
            &manifest(),
            &entry("{git: 'https://x.org/${name}.git', branch: dev}"),
        )
        .unwrap();
        assert_eq!(src.display, "git+https://x.org/foo.git#branch=dev");
        assert!(!src.external);
        assert!(src.url.is_empty());
    }

    #[test]
    fn unsupported_shapes() {
        for yaml in ["42", "true", "~", "{}"] {
            let err = parse_source(&manifest(), &entry(yaml)).unwrap_err();
            assert!(matches!(err, ManifestError::UnsupportedSource { .. }), "{yaml}");
        }
    }
}
