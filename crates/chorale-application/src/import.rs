// SPDX-License-Identifier: GPL-3.0-or-later
//! File import service.
//!
//! Glue between the file system and the library graph:
//! - reading file facts (last write, SHA-256 checksum)
//! - skipping files whose stored facts are unchanged
//! - parsing tags through the audio probe and the tag normalizer
//! - ingesting the result

use std::io::Read;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use chorale_domain::{FileFacts, Track, TrackId};
use chorale_metadata::{AudioProbe, TagNormalizer};
use chrono::{DateTime, Utc};
use sha2::{Digest, Sha256};
use thiserror::Error;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;

use crate::library::{LibraryError, LibraryGraph};

const READ_CHUNK: usize = 64 * 1024;

/// Errors that can occur during file import.
#[derive(Debug, Error)]
pub enum ImportError {
    /// Failed to read the file or its metadata
    #[error("failed to read {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    /// Failed to persist to the library
    #[error(transparent)]
    Library(#[from] LibraryError),

    /// The import task died before reporting
    #[error("import task failed: {0}")]
    Task(String),
}

/// Result type for import operations.
pub type ImportResult<T> = Result<T, ImportError>;

/// What happened to one file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ImportOutcome {
    /// Parsed and written to the library
    Imported(Track),

    /// Stored checksum and last write match; nothing was read or written
    Unchanged(TrackId),

    /// The decoder could not read the file; the library is untouched
    NoMetadata,
}

/// Service for importing audio files into the library.
#[derive(Clone)]
pub struct FileImportService {
    library: Arc<LibraryGraph>,
    normalizer: Arc<TagNormalizer>,
    probe: Arc<dyn AudioProbe>,
    max_concurrent_files: usize,
}

impl FileImportService {
    pub fn new(
        library: Arc<LibraryGraph>,
        normalizer: Arc<TagNormalizer>,
        probe: Arc<dyn AudioProbe>,
        max_concurrent_files: usize,
    ) -> Self {
        Self {
            library,
            normalizer,
            probe,
            max_concurrent_files: max_concurrent_files.max(1),
        }
    }

    /// Import a single audio file.
    ///
    /// This method:
    /// 1. Reads the last write time and computes the checksum
    /// 2. Returns early when the stored track has the same facts
    /// 3. Probes and normalizes the tags
    /// 4. Ingests the track into the library graph
    #[tracing::instrument(skip(self), fields(path = %path.display()))]
    pub async fn import_file(&self, path: &Path) -> ImportResult<ImportOutcome> {
        let facts = read_file_facts(path).await?;

        if let Some(existing) = self.library.track_by_path(path).await? {
            if existing.checksum == facts.checksum && existing.last_write == facts.last_write {
                tracing::debug!(target: "import", track_id = %existing.id, "unchanged, skipping");
                return Ok(ImportOutcome::Unchanged(existing.id));
            }
        }

        let metadata = match self.normalizer.parse(self.probe.as_ref(), path).await {
            Ok(metadata) => metadata,
            Err(error) => {
                tracing::warn!(target: "import", error = %error, "no metadata, file skipped");
                return Ok(ImportOutcome::NoMetadata);
            }
        };

        let track = self.library.ingest(path, &facts, &metadata).await?;
        tracing::info!(target: "import", track_id = %track.id, name = %track.name, "imported");
        Ok(ImportOutcome::Imported(track))
    }

    /// Import many files, at most `max_concurrent_files` at a time.
    ///
    /// Every path gets an entry in the result, in input order; one failing
    /// file never stops the others.
    #[tracing::instrument(skip(self, paths), fields(count = paths.len()))]
    pub async fn import_files(
        &self,
        paths: Vec<PathBuf>,
    ) -> Vec<(PathBuf, ImportResult<ImportOutcome>)> {
        let semaphore = Arc::new(Semaphore::new(self.max_concurrent_files));
        let mut tasks = JoinSet::new();

        for (index, path) in paths.iter().cloned().enumerate() {
            let service = self.clone();
            let semaphore = semaphore.clone();
            tasks.spawn(async move {
                let outcome = match semaphore.acquire_owned().await {
                    Ok(_permit) => service.import_file(&path).await,
                    Err(closed) => Err(ImportError::Task(closed.to_string())),
                };
                (index, outcome)
            });
        }

        let mut outcomes: Vec<Option<ImportResult<ImportOutcome>>> =
            paths.iter().map(|_| None).collect();
        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok((index, outcome)) => outcomes[index] = Some(outcome),
                Err(error) => tracing::error!(target: "import", error = %error, "import task panicked"),
            }
        }

        let results: Vec<_> = paths
            .into_iter()
            .zip(outcomes)
            .map(|(path, outcome)| {
                let outcome = outcome
                    .unwrap_or_else(|| Err(ImportError::Task("task did not report".to_string())));
                (path, outcome)
            })
            .collect();

        let imported = results
            .iter()
            .filter(|(_, r)| matches!(r, Ok(ImportOutcome::Imported(_))))
            .count();
        let failed = results.iter().filter(|(_, r)| r.is_err()).count();
        tracing::info!(
            target: "import",
            total = results.len(),
            imported,
            failed,
            "batch import completed"
        );
        results
    }
}

/// Last write time and SHA-256 of the whole file.
pub async fn read_file_facts(path: &Path) -> ImportResult<FileFacts> {
    let io_error = |source| ImportError::Io {
        path: path.display().to_string(),
        source,
    };

    let modified = tokio::fs::metadata(path)
        .await
        .and_then(|m| m.modified())
        .map_err(io_error)?;

    let owned = path.to_path_buf();
    let checksum = tokio::task::spawn_blocking(move || compute_checksum(&owned))
        .await
        .map_err(|e| ImportError::Task(e.to_string()))?
        .map_err(io_error)?;

    Ok(FileFacts {
        last_write: DateTime::<Utc>::from(modified),
        checksum,
    })
}

fn compute_checksum(path: &Path) -> std::io::Result<Vec<u8>> {
    let mut file = std::fs::File::open(path)?;
    let mut hasher = Sha256::new();
    let mut buffer = vec![0u8; READ_CHUNK];
    loop {
        let read = file.read(&mut buffer)?;
        if read == 0 {
            break;
        }
        hasher.update(&buffer[..read]);
    }
    Ok(hasher.finalize().to_vec())
}
