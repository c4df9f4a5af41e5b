use tantivy::schema::{Field, Schema, FAST, INDEXED, STORED, STRING, TEXT};

use crate::error::{IndexError, IndexResult};

/// How a manifest field is indexed.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FieldKind {
    /// Stored and full-text indexed; searched by default.
    Searchable,
    /// Stored and indexed as one exact term; only matched with `field:value`.
    Exact,
    /// Full-text indexed only; only matched with `field:term`.
    NonDefault,
}

/// Manifest fields copied into every document, keyed by manifest field
/// name, with the index field name they land in.
pub const MANIFEST_FIELDS: &[(&str, &str, FieldKind)] = &[
    ("name", "name", FieldKind::Searchable),
    ("description", "description", FieldKind::Searchable),
    ("tags", "tags", FieldKind::Searchable),
    ("version", "version", FieldKind::Exact),
    ("release", "release", FieldKind::Exact),
    ("dependencies", "dependencies", FieldKind::NonDefault),
    ("build-dependencies", "builddependencies", FieldKind::NonDefault),
];

/// Field handles of the package index.
///
/// `package`, `branch` and `user` are stored exactly as written and match
/// only whole values; their `*_text` twins hold lowercase free text. None of
/// them is searched by default.
#[derive(Clone, Debug)]
pub struct IndexSchema {
    schema: Schema,
    pub key: Field,
    pub package: Field,
    pub branch: Field,
    pub user: Field,
    pub package_text: Field,
    pub branch_text: Field,
    pub user_text: Field,
    pub priority: Field,
    manifest: Vec<(&'static str, Field, FieldKind)>,
}

impl IndexSchema {
    pub fn build() -> IndexResult<Self> {
        let mut builder = Schema::builder();
        builder.add_text_field("key", STRING | STORED);
        for field in ["package", "branch", "user"] {
            builder.add_text_field(field, STRING | STORED);
        }
        for field in ["package_text", "branch_text", "user_text"] {
            builder.add_text_field(field, TEXT);
        }
        builder.add_u64_field("priority", INDEXED | STORED | FAST);
        for (_, name, kind) in MANIFEST_FIELDS {
            match kind {
                FieldKind::Searchable => builder.add_text_field(name, TEXT | STORED),
                FieldKind::Exact => builder.add_text_field(name, STRING | STORED),
                FieldKind::NonDefault => builder.add_text_field(name, TEXT),
            };
        }
        Self::from_schema(builder.build())
    }

    /// Resolve field handles in an existing index's schema.
    pub fn from_schema(schema: Schema) -> IndexResult<Self> {
        let field = |name: &str| {
            schema
                .get_field(name)
                .map_err(|_| IndexError::SchemaMismatch(name.to_string()))
        };
        // Fixed fields first, in declaration order.
        let key = field("key")?;
        let package = field("package")?;
        let branch = field("branch")?;
        let user = field("user")?;
        let package_text = field("package_text")?;
        let branch_text = field("branch_text")?;
        let user_text = field("user_text")?;
        let priority = field("priority")?;
        let mut manifest = Vec::with_capacity(MANIFEST_FIELDS.len());
        for (source, name, kind) in MANIFEST_FIELDS {
            manifest.push((*source, field(*name)?, *kind));
        }
        Ok(Self {
            schema,
            key,
            package,
            branch,
            user,
            package_text,
            branch_text,
            user_text,
            priority,
            manifest,
        })
    }

    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    /// `(manifest field name, index field, kind)` for every manifest field.
    pub fn manifest_fields(&self) -> &[(&'static str, Field, FieldKind)] {
        &self.manifest
    }

    /// Index field holding a manifest field.
    pub fn manifest_field(&self, source: &str) -> Option<Field> {
        self.manifest
            .iter()
            .find(|(name, _, _)| *name == source)
            .map(|(_, field, _)| *field)
    }

    /// Fields searched when a query term names no field.
    pub fn default_fields(&self) -> Vec<Field> {
        self.manifest
            .iter()
            .filter(|(_, _, kind)| *kind == FieldKind::Searchable)
            .map(|(_, field, _)| *field)
            .collect()
    }
}
