// SPDX-License-Identifier: GPL-3.0-or-later
use std::sync::Arc;

use anyhow::Result;
use chorale_config::AppConfig;
use chorale_metadata::{FfprobeProbe, TagNormalizer};
use tracing::info;

pub mod import;
pub mod library;
pub mod playlist;

pub use import::{FileImportService, ImportError, ImportOutcome, ImportResult};
pub use library::{
    LibraryError, LibraryGraph, LibraryResult, OrphanCounts, Orphans, Repositories, Sentinels,
};
pub use playlist::{
    PlaylistError, PlaylistExtender, PlaylistResult, SeedProfile, SharedAttributeScorer,
    SimilarityScorer,
};

/// Services wired from one configuration.
#[derive(Clone)]
pub struct AppState {
    pub config: AppConfig,
    pub library: Arc<LibraryGraph>,
    pub importer: FileImportService,
    pub extender: PlaylistExtender,
}

impl AppState {
    /// Open the database and build every service on top of it.
    pub async fn initialize(config: AppConfig) -> Result<Self> {
        let pool = chorale_infrastructure::init_database(&config).await?;
        let library = Arc::new(LibraryGraph::new(
            Repositories::sqlite(pool),
            config.tagging.genre_cluster_types.clone(),
        ));
        let importer = FileImportService::new(
            library.clone(),
            Arc::new(TagNormalizer::new(config.tagging.clone())),
            Arc::new(FfprobeProbe::new(&config.scan.ffprobe_path)),
            config.scan.max_concurrent_files,
        );
        let extender = PlaylistExtender::new(
            library.clone(),
            Arc::new(SharedAttributeScorer::from(&config.playlist)),
        );

        info!(target: "application", "application state initialized");
        Ok(Self {
            config,
            library,
            importer,
            extender,
        })
    }
}
