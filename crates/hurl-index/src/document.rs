use std::collections::BTreeMap;

use hurl_manifest::Manifest;
use hurl_repo::{branch_user, package_key, MASTER};
use serde::Serialize;
use tantivy::schema::Value;
use tantivy::{Score, TantivyDocument};

use crate::schema::IndexSchema;

/// The indexed form of one package in one branch.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct IndexDocument {
    /// `branch/package`.
    pub key: String,
    pub package: String,
    pub branch: String,
    pub user: String,
    /// 1 on `master`, 0 elsewhere.
    pub priority: u64,
    /// Manifest field name to its text. Sequences are joined with spaces.
    pub fields: BTreeMap<String, String>,
}

impl IndexDocument {
    pub fn from_manifest(schema: &IndexSchema, branch: &str, package: &str, manifest: &Manifest) -> Self {
        let fields = schema
            .manifest_fields()
            .iter()
            .filter_map(|(source, _, _)| {
                manifest
                    .field_text(source)
                    .map(|text| (source.to_string(), text))
            })
            .collect();
        Self {
            key: package_key(branch, package),
            package: package.to_string(),
            branch: branch.to_string(),
            user: branch_user(branch).to_string(),
            priority: u64::from(branch == MASTER),
            fields,
        }
    }

    pub fn to_tantivy(&self, schema: &IndexSchema) -> TantivyDocument {
        let mut doc = TantivyDocument::default();
        doc.add_text(schema.key, &self.key);
        doc.add_text(schema.package, &self.package);
        doc.add_text(schema.branch, &self.branch);
        doc.add_text(schema.user, &self.user);
        doc.add_text(schema.package_text, self.package.to_lowercase());
        doc.add_text(schema.branch_text, self.branch.to_lowercase());
        doc.add_text(schema.user_text, self.user.to_lowercase());
        doc.add_u64(schema.priority, self.priority);
        for (source, field, _) in schema.manifest_fields() {
            if let Some(text) = self.fields.get(*source) {
                doc.add_text(*field, text);
            }
        }
        doc
    }
}

/// One collapsed search hit.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct SearchResult {
    pub key: String,
    pub package: String,
    pub branch: String,
    pub user: String,
    pub priority: u64,
    pub name: Option<String>,
    pub version: Option<String>,
    pub release: Option<String>,
    pub description: Option<String>,
    pub tags: Vec<String>,
    pub score: Score,
}

impl SearchResult {
    pub(crate) fn from_tantivy(schema: &IndexSchema, doc: &TantivyDocument, score: Score) -> Self {
        let text = |field| {
            doc.get_first(field)
                .and_then(|value| value.as_str())
                .map(str::to_string)
        };
        let manifest_text = |source: &str| schema.manifest_field(source).and_then(text);
        Self {
            key: text(schema.key).unwrap_or_default(),
            package: text(schema.package).unwrap_or_default(),
            branch: text(schema.branch).unwrap_or_default(),
            user: text(schema.user).unwrap_or_default(),
            priority: doc
                .get_first(schema.priority)
                .and_then(|value| value.as_u64())
                .unwrap_or(0),
            name: manifest_text("name"),
            version: manifest_text("version"),
            release: manifest_text("release"),
            description: manifest_text("description"),
            tags: manifest_text("tags")
                .map(|tags| tags.split_whitespace().map(str::to_string).collect())
                .unwrap_or_default(),
            score,
        }
    }
}

/// One page of collapsed results.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct SearchResults {
    pub results: Vec<SearchResult>,
    /// Number of collapsed matches, or an upper-bound estimate.
    pub count: usize,
    /// Whether `count` is exact.
    pub exact: bool,
    pub page: usize,
    pub page_size: usize,
}

impl SearchResults {
    pub fn empty(page: usize, page_size: usize) -> Self {
        Self {
            results: Vec::new(),
            count: 0,
            exact: true,
            page,
            page_size,
        }
    }

    pub fn has_next_page(&self) -> bool {
        (self.page + 1) * self.page_size < self.count
    }
}
