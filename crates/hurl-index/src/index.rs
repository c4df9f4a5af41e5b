use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};
use std::time::Instant;

use hurl_repo::{package_key, PackageRepo};
use tantivy::collector::{Count, TopDocs};
use tantivy::query::QueryParser;
use tantivy::{
    DocId, Index, IndexReader, IndexWriter, ReloadPolicy, Score, Searcher, SegmentReader, TantivyDocument, Term,
};
use tracing::{debug, info, warn};

use crate::config::IndexConfig;
use crate::document::{IndexDocument, SearchResult, SearchResults};
use crate::error::{IndexError, IndexResult};
use crate::freshness::ConnectionFreshness;
use crate::schema::IndexSchema;

/// File tantivy writes at the root of every index directory.
const META_FILE: &str = "meta.json";

#[derive(Clone)]
struct Handle {
    index: Index,
    schema: IndexSchema,
}

struct ReadConnection {
    reader: IndexReader,
    freshness: ConnectionFreshness,
}

#[derive(Debug)]
enum Location {
    Dir(PathBuf),
    Ram,
}

/// The package search index.
///
/// All methods take `&self`; connections are guarded internally. Only one
/// process may hold the write connection at a time.
pub struct PackageIndex {
    location: Location,
    config: IndexConfig,
    handle: Mutex<Option<Handle>>,
    reader: Mutex<Option<ReadConnection>>,
    writer: Mutex<Option<IndexWriter>>,
}

impl PackageIndex {
    /// An index stored in `path`. Nothing is opened until first use; call
    /// [`create`](Self::create) before the first write.
    pub fn open(path: impl Into<PathBuf>, config: IndexConfig) -> Self {
        Self::with_location(Location::Dir(path.into()), None, config)
    }

    /// A fresh, empty index held in memory.
    pub fn in_memory(config: IndexConfig) -> IndexResult<Self> {
        let schema = IndexSchema::build()?;
        let index = Index::create_in_ram(schema.schema().clone());
        Ok(Self::with_location(
            Location::Ram,
            Some(Handle { index, schema }),
            config,
        ))
    }

    fn with_location(location: Location, handle: Option<Handle>, config: IndexConfig) -> Self {
        Self {
            location,
            config,
            handle: Mutex::new(handle),
            reader: Mutex::new(None),
            writer: Mutex::new(None),
        }
    }

    pub fn config(&self) -> &IndexConfig {
        &self.config
    }

    pub fn path(&self) -> Option<&Path> {
        match &self.location {
            Location::Dir(path) => Some(path),
            Location::Ram => None,
        }
    }

    /// Create the index if it does not exist yet. Returns `true` if it was
    /// created, `false` if one was already there.
    pub fn create(&self) -> IndexResult<bool> {
        let mut handle = lock(&self.handle)?;
        if handle.is_some() {
            return Ok(false);
        }
        let Location::Dir(path) = &self.location else {
            return Ok(false);
        };
        if path.join(META_FILE).exists() {
            return Ok(false);
        }
        std::fs::create_dir_all(path)?;
        let schema = IndexSchema::build()?;
        let index = Index::create_in_dir(path, schema.schema().clone())?;
        info!(path = %path.display(), "created search index");
        *handle = Some(Handle { index, schema });
        Ok(true)
    }

    fn handle(&self) -> IndexResult<Handle> {
        let mut handle = lock(&self.handle)?;
        if let Some(open) = handle.as_ref() {
            return Ok(open.clone());
        }
        let path = match &self.location {
            Location::Dir(path) => path,
            // In-memory indexes are opened on construction.
            Location::Ram => return Err(IndexError::NotCreated(PathBuf::from(":memory:"))),
        };
        if !path.join(META_FILE).exists() {
            return Err(IndexError::NotCreated(path.clone()));
        }
        let index = Index::open_in_dir(path)?;
        let schema = IndexSchema::from_schema(index.schema())?;
        debug!(path = %path.display(), "opened search index");
        let open = Handle { index, schema };
        *handle = Some(open.clone());
        Ok(open)
    }

    // ---- Write side ----

    fn with_writer<T>(&self, f: impl FnOnce(&mut IndexWriter, &IndexSchema) -> IndexResult<T>) -> IndexResult<T> {
        let handle = self.handle()?;
        let mut writer = lock(&self.writer)?;
        if writer.is_none() {
            let opened: IndexWriter = handle
                .index
                .writer_with_num_threads(1, self.config.writer_memory)?;
            debug!("opened index writer");
            *writer = Some(opened);
        }
        match writer.as_mut() {
            Some(writer) => f(writer, &handle.schema),
            None => Err(IndexError::LockPoisoned),
        }
    }

    /// Upsert a prepared document.
    pub fn upsert(&self, document: &IndexDocument) -> IndexResult<()> {
        self.with_writer(|writer, schema| {
            writer.delete_term(Term::from_field_text(schema.key, &document.key));
            writer.add_document(document.to_tantivy(schema))?;
            Ok(())
        })
    }

    /// (Re)index one package from the repository. Returns `false` without
    /// touching the index if the package has no manifest.
    pub fn index_package(&self, repo: &PackageRepo, branch: &str, package: &str) -> IndexResult<bool> {
        let Some(manifest) = repo.package_manifest(branch, package)? else {
            debug!(branch, package, "no manifest; not indexing");
            return Ok(false);
        };
        let schema = self.handle()?.schema;
        let document = IndexDocument::from_manifest(&schema, branch, package, &manifest);
        self.upsert(&document)?;
        debug!(key = %document.key, "indexed package");
        Ok(true)
    }

    /// (Re)index every package in a branch. Packages with a malformed
    /// manifest are skipped. Returns the number indexed.
    pub fn index_branch(&self, repo: &PackageRepo, branch: &str) -> IndexResult<usize> {
        let mut indexed = 0;
        for package in repo.packages_in_branch(branch)?.unwrap_or_default() {
            match self.index_package(repo, branch, &package) {
                Ok(true) => indexed += 1,
                Ok(false) => {}
                Err(IndexError::Repo(e)) if e.is_malformed() => {
                    warn!(branch, package = %package, error = %e, "skipping package");
                }
                Err(e) => return Err(e),
            }
        }
        info!(branch, indexed, "indexed branch");
        Ok(indexed)
    }

    /// (Re)index every branch.
    pub fn index_repo(&self, repo: &PackageRepo) -> IndexResult<usize> {
        let mut indexed = 0;
        for branch in repo.list_branches()? {
            indexed += self.index_branch(repo, &branch)?;
        }
        Ok(indexed)
    }

    /// Remove one package's document. Absent documents are ignored.
    pub fn delete_package(&self, branch: &str, package: &str) -> IndexResult<()> {
        let key = package_key(branch, package);
        self.with_writer(|writer, schema| {
            writer.delete_term(Term::from_field_text(schema.key, &key));
            Ok(())
        })?;
        debug!(key = %key, "deleted package");
        Ok(())
    }

    /// Remove every document of a branch, whether or not the branch still
    /// exists in the repository.
    pub fn delete_branch(&self, branch: &str) -> IndexResult<()> {
        self.with_writer(|writer, schema| {
            writer.delete_term(Term::from_field_text(schema.branch, branch));
            Ok(())
        })?;
        debug!(branch, "deleted branch");
        Ok(())
    }

    /// Commit pending writes. A no-op if nothing was ever written.
    pub fn flush(&self) -> IndexResult<()> {
        let mut writer = lock(&self.writer)?;
        if let Some(writer) = writer.as_mut() {
            writer.commit()?;
            debug!("flushed index");
        }
        Ok(())
    }

    // ---- Read side ----

    /// Reopen the read snapshot now. A no-op if it was never opened.
    pub fn reload(&self) -> IndexResult<()> {
        let mut reader = lock(&self.reader)?;
        if let Some(conn) = reader.as_mut() {
            conn.reader.reload()?;
            conn.freshness.mark_refreshed(Instant::now());
        }
        Ok(())
    }

    fn searcher(&self) -> IndexResult<Searcher> {
        let handle = self.handle()?;
        let mut reader = lock(&self.reader)?;
        let now = Instant::now();
        match reader.as_mut() {
            Some(conn) if conn.freshness.is_stale(now) => {
                debug!(age = ?conn.freshness.age(now), "refreshing stale index reader");
                conn.reader.reload()?;
                conn.freshness.mark_refreshed(now);
            }
            Some(_) => {}
            None => {
                let opened: IndexReader = handle
                    .index
                    .reader_builder()
                    .reload_policy(ReloadPolicy::Manual)
                    .try_into()?;
                *reader = Some(ReadConnection {
                    reader: opened,
                    freshness: ConnectionFreshness::starting_at(now, self.config.refresh_after),
                });
            }
        }
        match reader.as_ref() {
            Some(conn) => Ok(conn.reader.searcher()),
            None => Err(IndexError::LockPoisoned),
        }
    }

    /// Number of indexed documents.
    pub fn count(&self) -> IndexResult<u64> {
        Ok(self.searcher()?.num_docs())
    }

    /// First page of results.
    pub fn search(&self, query: &str) -> IndexResult<SearchResults> {
        self.search_page(query, 0)
    }

    /// Run a query. Terms are ANDed; unqualified terms search `name`,
    /// `description` and `tags`, and `field:term` reaches any other field.
    /// Text that is not valid query syntax is read leniently rather than
    /// rejected. Hits are ranked by priority, then relevance, and collapsed
    /// to one per package before paging.
    pub fn search_page(&self, query: &str, page: usize) -> IndexResult<SearchResults> {
        let page_size = self.config.page_size.max(1);
        if query.trim().is_empty() {
            return Ok(SearchResults::empty(page, page_size));
        }
        let handle = self.handle()?;
        let searcher = self.searcher()?;
        let mut parser = QueryParser::for_index(&handle.index, handle.schema.default_fields());
        parser.set_conjunction_by_default();
        let parsed = match parser.parse_query(query) {
            Ok(parsed) => parsed,
            Err(e) => {
                let (parsed, errors) = parser.parse_query_lenient(query);
                debug!(query, error = %e, dropped = errors.len(), "reading query leniently");
                parsed
            }
        };

        let window = self.config.candidate_window.max(page_size);
        let priority_field = handle
            .schema
            .schema()
            .get_field_name(handle.schema.priority)
            .to_string();
        // Rank by (priority, score) inside the collector so that every
        // master copy outranks all other copies within the window.
        let ranked = TopDocs::with_limit(window).tweak_score(move |segment: &SegmentReader| {
            let priority = segment.fast_fields().u64(&priority_field).ok();
            move |doc: DocId, score: Score| {
                let rank = priority.as_ref().and_then(|column| column.first(doc)).unwrap_or(0);
                (rank, score)
            }
        });
        let (top, total) = searcher.search(&parsed, &(ranked, Count))?;
        let mut hits = Vec::with_capacity(top.len());
        for ((_, score), address) in top {
            let doc: TantivyDocument = searcher.doc(address)?;
            hits.push(SearchResult::from_tantivy(&handle.schema, &doc, score));
        }
        hits.sort_by(|a, b| {
            b.priority
                .cmp(&a.priority)
                .then(b.score.total_cmp(&a.score))
                .then_with(|| a.key.cmp(&b.key))
        });
        let mut seen = HashSet::new();
        hits.retain(|hit| seen.insert(hit.package.clone()));

        let exact = total <= window;
        // Matches beyond the window may all be copies of packages already
        // seen, so this bounds the collapsed count from above.
        let count = if exact { hits.len() } else { hits.len() + (total - window) };
        debug!(query, count, exact, "search");
        Ok(SearchResults {
            results: hits
                .into_iter()
                .skip(page * page_size)
                .take(page_size)
                .collect(),
            count,
            exact,
            page,
            page_size,
        })
    }
}

impl std::fmt::Debug for PackageIndex {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PackageIndex")
            .field("location", &self.location)
            .field("config", &self.config)
            .finish()
    }
}

fn lock<T>(mutex: &Mutex<T>) -> IndexResult<MutexGuard<'_, T>> {
    mutex.lock().map_err(|_| IndexError::LockPoisoned)
}
