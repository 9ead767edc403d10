use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};

use parking_lot::RwLock;
use serde::Serialize;
use tantivy::directory::MmapDirectory;
use tantivy::indexer::NoMergePolicy;
use tantivy::{Index, IndexReader, IndexWriter, ReloadPolicy, TantivyError};
use tracing::{debug, info, warn};

use super::layout::SchemaLayout;
use super::policy::AnalyzerPolicy;
use crate::analysis::AnalyzerCatalog;
use crate::config::IndexerConfig;
use crate::error::{IndexerError, Result};
use crate::pool::Record;
use crate::schema::TypeRegistry;

const MIB: usize = 1024 * 1024;

/// Writer threads the engine accepts
pub const MAX_WRITER_THREADS: usize = 8;

/// Smallest memory budget the engine accepts per writer thread, with headroom
pub const MIN_MEMORY_PER_THREAD: usize = 16 * MIB;

const MAX_MEMORY_PER_THREAD: usize = 3 * 1024 * MIB;

/// Subdirectory an overwrite with a changed schema is built in
pub const STAGING_DIR: &str = ".staging";

const META_FILE: &str = "meta.json";
const MANAGED_FILE: &str = ".managed.json";

/// How an existing index at the target location is treated
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum OpenMode {
    /// Replace any existing index once the new one commits
    Overwrite,
    /// Add to an existing index, creating it when absent
    #[default]
    Append,
}

/// Thread and memory limits handed to the engine writer
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct WriterLimits {
    pub threads: usize,
    pub memory_budget: usize,
}

impl WriterLimits {
    /// One writer thread per consumer, with the configured RAM buffer spread
    /// across them and clamped to what the engine accepts per thread
    pub fn from_config(config: &IndexerConfig) -> Self {
        let threads = config.consumer_threads.clamp(1, MAX_WRITER_THREADS);
        let memory_budget = config
            .ram_buffer_size_mb
            .saturating_mul(MIB)
            .clamp(threads * MIN_MEMORY_PER_THREAD, threads * MAX_MEMORY_PER_THREAD);
        Self {
            threads,
            memory_budget,
        }
    }
}

/// Counters describing what a session has done so far
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
pub struct SessionStats {
    pub documents_added: u64,
    pub documents_failed: u64,
    pub commits: u64,
    pub merges: u64,
}

/// Accepts records on behalf of consumers
pub trait RecordWriter: Send + Sync + std::fmt::Debug {
    /// Queue one record. [`IndexerError::Document`] rejects only this
    /// record; any other error ends the run.
    fn add_record(&self, record: &Record) -> Result<()>;
}

/// An open writer on one index location
///
/// `add_record` may be called from any number of threads at once; commit,
/// merge and close take the writer exclusively.
pub struct IndexSession {
    index: RwLock<Index>,
    path: PathBuf,
    /// Set while an overwrite is built aside, until close promotes it
    staging: Option<PathBuf>,
    layout: SchemaLayout,
    writer: RwLock<Option<IndexWriter>>,
    limits: WriterLimits,
    verbose: bool,
    documents_added: AtomicU64,
    documents_failed: AtomicU64,
    commits: AtomicU64,
    merges: AtomicU64,
}

impl std::fmt::Debug for IndexSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IndexSession")
            .field("path", &self.path)
            .field("staging", &self.staging)
            .field("limits", &self.limits)
            .field("open", &self.is_open())
            .field("stats", &self.stats())
            .finish()
    }
}

/// Open a writer session for `config.index_dir`.
///
/// Creates the directory when absent, lays the schema out from the registry's
/// configured fields, and registers every analyzer in use with the engine.
///
/// An overwrite leaves the existing index readable until the new one is
/// committed. With an unchanged schema the old documents are dropped in the
/// same commit as the new ones arrive; otherwise the new index is built in
/// [`STAGING_DIR`] and moved into place by [`IndexSession::close`].
pub fn open_session(
    config: &IndexerConfig,
    registry: &TypeRegistry,
    catalog: &AnalyzerCatalog,
    mode: OpenMode,
) -> Result<IndexSession> {
    let path = config.index_dir.clone();
    fs::create_dir_all(&path).map_err(|source| IndexerError::IndexDirectory {
        path: path.clone(),
        source,
    })?;

    let policy = AnalyzerPolicy::from_registry(registry);
    let layout = SchemaLayout::build(registry, &policy)?;

    let schema = layout.schema().clone();
    let mut staging = None;
    let mut replace_all = false;
    let index = match mode {
        OpenMode::Append => {
            let directory = MmapDirectory::open(&path).map_err(TantivyError::from)?;
            Index::open_or_create(directory, schema)?
        }
        OpenMode::Overwrite if !path.join(META_FILE).exists() => {
            Index::create_in_dir(&path, schema)?
        }
        OpenMode::Overwrite => match Index::open_in_dir(&path) {
            Ok(existing) if existing.schema() == schema => {
                warn!("Overwriting existing index in {}", path.display());
                replace_all = true;
                existing
            }
            _ => {
                let dir = path.join(STAGING_DIR);
                if dir.exists() {
                    fs::remove_dir_all(&dir)?;
                }
                fs::create_dir(&dir)?;
                warn!(
                    "Schema of {} changed, building replacement in {}",
                    path.display(),
                    dir.display()
                );
                let index = Index::create_in_dir(&dir, schema)?;
                staging = Some(dir);
                index
            }
        },
    };
    policy.register(index.tokenizers(), catalog, config.engine_version)?;

    let limits = WriterLimits::from_config(config);
    let writer: IndexWriter = index.writer_with_num_threads(limits.threads, limits.memory_budget)?;
    if replace_all {
        // Takes effect with the first commit; an aborted run keeps the old documents.
        writer.delete_all_documents()?;
    }
    if config.force_merge {
        // The explicit merge after commit is the only consolidation.
        writer.set_merge_policy(Box::new(NoMergePolicy));
    }

    info!(
        "Opened index {} ({:?}, {} writer threads, {} MiB)",
        path.display(),
        mode,
        limits.threads,
        limits.memory_budget / MIB
    );
    if config.verbose {
        debug!(
            "Schema: {} configured fields, default analyzer {}, {} overrides",
            layout.len(),
            policy.default_analyzer(),
            policy.overrides().len()
        );
    }

    Ok(IndexSession {
        index: RwLock::new(index),
        path,
        staging,
        layout,
        writer: RwLock::new(Some(writer)),
        limits,
        verbose: config.verbose,
        documents_added: AtomicU64::new(0),
        documents_failed: AtomicU64::new(0),
        commits: AtomicU64::new(0),
        merges: AtomicU64::new(0),
    })
}

// Removes the files the engine wrote in `path` and nothing else.
fn remove_engine_files(path: &Path) -> Result<()> {
    let mut files: Vec<PathBuf> = match fs::read(path.join(MANAGED_FILE)) {
        Ok(bytes) => serde_json::from_slice(&bytes)?,
        Err(e) if e.kind() == ErrorKind::NotFound => Vec::new(),
        Err(e) => return Err(e.into()),
    };
    files.push(PathBuf::from(META_FILE));
    files.push(PathBuf::from(MANAGED_FILE));
    for file in files {
        match fs::remove_file(path.join(&file)) {
            Err(e) if e.kind() != ErrorKind::NotFound => return Err(e.into()),
            _ => {}
        }
    }
    Ok(())
}

impl RecordWriter for IndexSession {
    fn add_record(&self, record: &Record) -> Result<()> {
        IndexSession::add_record(self, record)
    }
}

impl IndexSession {
    /// Queue one record for indexing.
    ///
    /// An engine rejection comes back as the non-fatal
    /// [`IndexerError::Document`]; a closed session is fatal.
    pub fn add_record(&self, record: &Record) -> Result<()> {
        let doc = self.layout.to_document(record);
        let guard = self.writer.read();
        let writer = guard.as_ref().ok_or(IndexerError::SessionClosed)?;
        match writer.add_document(doc) {
            Ok(_) => {
                self.documents_added.fetch_add(1, Ordering::Relaxed);
                Ok(())
            }
            Err(e) => {
                self.documents_failed.fetch_add(1, Ordering::Relaxed);
                Err(IndexerError::Document(e.to_string()))
            }
        }
    }

    /// Flush buffered documents and make them durable
    pub fn commit(&self) -> Result<u64> {
        let mut guard = self.writer.write();
        let writer = guard.as_mut().ok_or(IndexerError::SessionClosed)?;
        let opstamp = writer.commit()?;
        self.commits.fetch_add(1, Ordering::Relaxed);
        debug!("Committed {} at opstamp {}", self.path.display(), opstamp);
        Ok(opstamp)
    }

    /// Consolidate every committed segment into one.
    ///
    /// The merged segment replaces its inputs once the next commit lands.
    pub fn force_merge(&self) -> Result<()> {
        let mut guard = self.writer.write();
        let writer = guard.as_mut().ok_or(IndexerError::SessionClosed)?;
        let segments = self.index.read().searchable_segment_ids()?;
        if segments.len() > 1 {
            writer.merge(&segments).wait()?;
        }
        self.merges.fetch_add(1, Ordering::Relaxed);
        info!(
            "Merged {} segments in {}",
            segments.len(),
            self.path.display()
        );
        Ok(())
    }

    /// Wait for background merges and release the writer.
    ///
    /// Uncommitted documents are discarded. A staged overwrite replaces the
    /// existing index here if anything was committed, and is discarded
    /// otherwise. Closing twice is a no-op.
    pub fn close(&self) -> Result<()> {
        let Some(writer) = self.writer.write().take() else {
            return Ok(());
        };
        writer.wait_merging_threads()?;
        if self.verbose {
            debug!("Writer for {} released", self.path.display());
        }

        if let Some(staging) = &self.staging {
            if self.commits.load(Ordering::Relaxed) > 0 {
                self.promote(staging)?;
            } else {
                fs::remove_dir_all(staging)?;
            }
        }
        Ok(())
    }

    fn promote(&self, staging: &Path) -> Result<()> {
        remove_engine_files(&self.path)?;
        for entry in fs::read_dir(staging)? {
            let entry = entry?;
            if entry.file_type()?.is_file() {
                fs::rename(entry.path(), self.path.join(entry.file_name()))?;
            }
        }
        fs::remove_dir_all(staging)?;

        let mut index = Index::open_in_dir(&self.path)?;
        let mut current = self.index.write();
        index.set_tokenizers(current.tokenizers().clone());
        *current = index;
        info!("Replaced index in {}", self.path.display());
        Ok(())
    }

    pub fn is_open(&self) -> bool {
        self.writer.read().is_some()
    }

    /// Documents visible in the last commit
    pub fn num_docs(&self) -> Result<u64> {
        let reader: IndexReader = self
            .index
            .read()
            .reader_builder()
            .reload_policy(ReloadPolicy::Manual)
            .try_into()?;
        Ok(reader.searcher().num_docs())
    }

    /// Committed segment count
    pub fn segment_count(&self) -> Result<usize> {
        Ok(self.index.read().searchable_segment_ids()?.len())
    }

    pub fn stats(&self) -> SessionStats {
        SessionStats {
            documents_added: self.documents_added.load(Ordering::Relaxed),
            documents_failed: self.documents_failed.load(Ordering::Relaxed),
            commits: self.commits.load(Ordering::Relaxed),
            merges: self.merges.load(Ordering::Relaxed),
        }
    }

    /// The index as of the last promotion
    pub fn index(&self) -> Index {
        self.index.read().clone()
    }

    pub fn layout(&self) -> &SchemaLayout {
        &self.layout
    }

    pub fn limits(&self) -> WriterLimits {
        self.limits
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for IndexSession {
    // An overwrite that never closed must not leave its build behind.
    fn drop(&mut self) {
        let Some(staging) = &self.staging else {
            return;
        };
        if let Some(writer) = self.writer.get_mut().take() {
            drop(writer);
            if let Err(e) = fs::remove_dir_all(staging) {
                warn!("Failed to discard {}: {}", staging.display(), e);
            }
        }
    }
}
