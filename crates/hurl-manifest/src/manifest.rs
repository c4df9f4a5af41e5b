use std::sync::LazyLock;

use regex::{Captures, Regex};
use serde::Serialize;
use serde_yaml::{Mapping, Sequence, Value};

use crate::dependency::{parse_dependency, Dependency};
use crate::error::{ManifestError, ManifestResult};
use crate::source::{parse_source, Source};

/// File name that marks a subtree as a package.
pub const MANIFEST_FILE: &str = "Cakefile";

/// Rendering of a placeholder whose field is missing.
const NULL_PLACEHOLDER: &str = "(null)";

static PLACEHOLDER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\$\{([^}]*)\}").expect("placeholder pattern is valid"));

/// A parsed Cakefile: an ordered mapping of field name to YAML value.
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct Manifest {
    fields: Mapping,
}

impl Manifest {
    /// Parse a Cakefile blob. The root must be a mapping.
    pub fn parse(bytes: &[u8]) -> ManifestResult<Self> {
        match serde_yaml::from_slice::<Value>(bytes)? {
            Value::Mapping(fields) => Ok(Self { fields }),
            other => Err(ManifestError::NotAMapping {
                found: value_kind(&other),
            }),
        }
    }

    pub fn from_mapping(fields: Mapping) -> Self {
        Self { fields }
    }

    pub fn as_mapping(&self) -> &Mapping {
        &self.fields
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn contains(&self, field: &str) -> bool {
        self.fields.contains_key(field)
    }

    /// Field names with string keys, in document order.
    pub fn field_names(&self) -> Vec<&str> {
        self.fields.keys().filter_map(Value::as_str).collect()
    }

    /// Raw value of a field.
    pub fn get(&self, field: &str) -> Option<&Value> {
        self.fields.get(field).map(untag)
    }

    /// Scalar field rendered as a string. Numbers and booleans are
    /// stringified; `null` counts as absent.
    pub fn get_string(&self, field: &str) -> ManifestResult<Option<String>> {
        match self.get(field) {
            None | Some(Value::Null) => Ok(None),
            Some(value) => scalar_text(value)
                .map(Some)
                .ok_or_else(|| mismatch(field, "a scalar", value)),
        }
    }

    pub fn get_sequence(&self, field: &str) -> ManifestResult<Option<&Sequence>> {
        match self.get(field) {
            None | Some(Value::Null) => Ok(None),
            Some(Value::Sequence(seq)) => Ok(Some(seq)),
            Some(value) => Err(mismatch(field, "a sequence", value)),
        }
    }

    pub fn get_mapping(&self, field: &str) -> ManifestResult<Option<&Mapping>> {
        match self.get(field) {
            None | Some(Value::Null) => Ok(None),
            Some(Value::Mapping(map)) => Ok(Some(map)),
            Some(value) => Err(mismatch(field, "a mapping", value)),
        }
    }

    /// A list of scalars. A lone scalar is treated as a one-element list and
    /// an absent field as an empty one.
    pub fn get_strings(&self, field: &str) -> ManifestResult<Vec<String>> {
        match self.get(field) {
            None | Some(Value::Null) => Ok(Vec::new()),
            Some(Value::Sequence(seq)) => seq
                .iter()
                .map(|item| scalar_text(untag(item)).ok_or_else(|| mismatch(field, "a scalar", item)))
                .collect(),
            Some(value) => scalar_text(value)
                .map(|text| vec![text])
                .ok_or_else(|| mismatch(field, "a list of scalars", value)),
        }
    }

    /// Text rendering of a field for substitution and full-text indexing:
    /// scalars as-is and sequences joined with single spaces. Mappings and
    /// `null` have no text.
    pub fn field_text(&self, field: &str) -> Option<String> {
        match self.get(field)? {
            Value::Sequence(seq) => Some(
                seq.iter()
                    .filter_map(|item| scalar_text(untag(item)))
                    .collect::<Vec<_>>()
                    .join(" "),
            ),
            value => scalar_text(value),
        }
    }

    /// `"{version}-{release}"`. Both fields are required.
    pub fn version_string(&self) -> ManifestResult<String> {
        let version = self
            .get_string("version")?
            .ok_or_else(|| ManifestError::MissingField("version".into()))?;
        let release = self
            .get_string("release")?
            .ok_or_else(|| ManifestError::MissingField("release".into()))?;
        Ok(format!("{version}-{release}"))
    }

    /// Parse every entry of a dependency-style field (`dependencies`,
    /// `build-dependencies`, `conflicts`, ...).
    pub fn dependencies(&self, field: &str) -> ManifestResult<Vec<Dependency>> {
        Ok(self
            .get_strings(field)?
            .iter()
            .map(|dep| parse_dependency(dep))
            .collect())
    }

    /// Normalize every entry of the `sources` field.
    pub fn sources(&self) -> ManifestResult<Vec<Source>> {
        match self.get("sources") {
            None | Some(Value::Null) => Ok(Vec::new()),
            Some(Value::Sequence(seq)) => seq.iter().map(|entry| parse_source(self, entry)).collect(),
            Some(entry) => Ok(vec![parse_source(self, entry)?]),
        }
    }
}

/// Replace every `${field}` in `text` with that field's text from the
/// manifest, or `(null)` when the field is absent. Substituted text is not
/// scanned again.
pub fn substitute_fields(manifest: &Manifest, text: &str) -> String {
    PLACEHOLDER
        .replace_all(text, |caps: &Captures<'_>| {
            manifest
                .field_text(&caps[1])
                .unwrap_or_else(|| NULL_PLACEHOLDER.to_string())
        })
        .into_owned()
}

pub(crate) fn untag(value: &Value) -> &Value {
    match value {
        Value::Tagged(tagged) => untag(&tagged.value),
        other => other,
    }
}

pub(crate) fn scalar_text(value: &Value) -> Option<String> {
    match untag(value) {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

pub(crate) fn value_kind(value: &Value) -> &'static str {
    match untag(value) {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Sequence(_) => "a sequence",
        Value::Mapping(_) => "a mapping",
        Value::Tagged(_) => "a tagged value",
    }
}

fn mismatch(field: &str, expected: &'static str, found: &Value) -> ManifestError {
    ManifestError::TypeMismatch {
        field: field.to_string(),
        expected,
        found: value_kind(found),
    }
}
