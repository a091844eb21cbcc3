// SPDX-License-Identifier: GPL-3.0-or-later
//! The persistent library graph.
//!
//! Genres, artists and releases are deduplicated by name and created on
//! first reference. Tracks are keyed by file path and always point at an
//! artist and a release: missing metadata resolves to the sentinel row of
//! that kind instead of a null reference.

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use chorale_domain::{
    truncate_name, Artist, ArtistId, FileFacts, Genre, GenreId, NamedEntity, Release, ReleaseId,
    Track, TrackId, TrackList, TrackListId,
};
use chorale_infrastructure::repositories::{
    ArtistRepository, GenreRepository, NamedEntityRepository, ReleaseRepository, TrackFilter,
    TrackListRepository, TrackRepository,
};
use chorale_infrastructure::sqlite_adapters::{
    SqliteArtistRepository, SqliteGenreRepository, SqliteReleaseRepository,
    SqliteTrackListRepository, SqliteTrackRepository,
};
use chorale_infrastructure::SqlitePool;
use chorale_metadata::TrackMetadata;
use thiserror::Error;
use tracing::{debug, info};
use uuid::Uuid;

/// Errors surfaced by the library graph.
#[derive(Debug, Error)]
pub enum LibraryError {
    /// A caller-supplied value does not refer to anything usable
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// The store failed underneath us
    #[error("storage failure: {0:#}")]
    Storage(#[from] anyhow::Error),
}

pub type LibraryResult<T> = Result<T, LibraryError>;

/// The repositories backing a [`LibraryGraph`].
#[derive(Clone)]
pub struct Repositories {
    pub genres: Arc<dyn GenreRepository>,
    pub artists: Arc<dyn ArtistRepository>,
    pub releases: Arc<dyn ReleaseRepository>,
    pub tracks: Arc<dyn TrackRepository>,
    pub tracklists: Arc<dyn TrackListRepository>,
}

impl Repositories {
    pub fn sqlite(pool: SqlitePool) -> Self {
        Self {
            genres: Arc::new(SqliteGenreRepository::new(pool.clone())),
            artists: Arc::new(SqliteArtistRepository::new(pool.clone())),
            releases: Arc::new(SqliteReleaseRepository::new(pool.clone())),
            tracks: Arc::new(SqliteTrackRepository::new(pool.clone())),
            tracklists: Arc::new(SqliteTrackListRepository::new(pool)),
        }
    }
}

/// Ids of the three sentinel rows.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Sentinels {
    pub genre: GenreId,
    pub artist: ArtistId,
    pub release: ReleaseId,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Orphans {
    pub genres: Vec<Genre>,
    pub artists: Vec<Artist>,
    pub releases: Vec<Release>,
}

impl Orphans {
    pub fn is_empty(&self) -> bool {
        self.genres.is_empty() && self.artists.is_empty() && self.releases.is_empty()
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct OrphanCounts {
    pub genres: u64,
    pub artists: u64,
    pub releases: u64,
}

/// Sole mutator of the library graph.
#[derive(Clone)]
pub struct LibraryGraph {
    repos: Repositories,
    genre_cluster_types: Vec<String>,
}

impl LibraryGraph {
    /// `genre_cluster_types` names the cluster types that count as genres;
    /// a track carrying none of their labels is linked to the sentinel genre.
    pub fn new(repos: Repositories, genre_cluster_types: Vec<String>) -> Self {
        Self {
            repos,
            genre_cluster_types,
        }
    }

    fn is_genre_cluster(&self, cluster_type: &str) -> bool {
        self.genre_cluster_types.iter().any(|t| t == cluster_type)
    }

    pub fn genres(&self) -> &dyn GenreRepository {
        self.repos.genres.as_ref()
    }

    pub fn artists(&self) -> &dyn ArtistRepository {
        self.repos.artists.as_ref()
    }

    pub fn releases(&self) -> &dyn ReleaseRepository {
        self.repos.releases.as_ref()
    }

    pub async fn sentinels(&self) -> LibraryResult<Sentinels> {
        Ok(Sentinels {
            genre: self.repos.genres.get_sentinel().await?.id,
            artist: self.repos.artists.get_sentinel().await?.id,
            release: self.repos.releases.get_sentinel().await?.id,
        })
    }

    // ------------------------------------------------------------------------
    // Ingestion
    // ------------------------------------------------------------------------

    /// Create or update the track stored at `path` from parsed metadata.
    ///
    /// Artist is the first credited artist, release is the album. Every
    /// cluster label becomes a row of its own cluster type; a track without
    /// labels of a genre cluster type also gets the sentinel genre. Artist and
    /// release fall back to their sentinels too.
    #[tracing::instrument(skip(self, facts, metadata), fields(path = %path.display()))]
    pub async fn ingest(
        &self,
        path: &Path,
        facts: &FileFacts,
        metadata: &TrackMetadata,
    ) -> LibraryResult<Track> {
        let artist = match metadata.artists.first() {
            Some(credit) => self.repos.artists.get_or_create(&credit.name).await?,
            None => self.repos.artists.get_sentinel().await?,
        };
        let release = match &metadata.album {
            Some(album) => self.repos.releases.get_or_create(&album.name).await?,
            None => self.repos.releases.get_sentinel().await?,
        };

        let mut genre_ids = Vec::new();
        let mut has_genre = false;
        for (cluster_type, labels) in &metadata.clusters {
            has_genre |= !labels.is_empty() && self.is_genre_cluster(cluster_type);
            for label in labels {
                let row = self
                    .repos
                    .genres
                    .get_or_create_in_cluster(cluster_type, label)
                    .await?;
                genre_ids.push(row.id);
            }
        }
        if !has_genre {
            genre_ids.push(self.repos.genres.get_sentinel().await?.id);
        }

        let track = Track {
            id: TrackId::new(),
            path: path.to_string_lossy().into_owned(),
            name: truncate_name(&display_name(path, metadata)),
            track_number: metadata.track_number,
            disc_number: metadata.disc_number,
            duration_ms: storable_millis(metadata.duration),
            date: metadata.date.clone(),
            original_date: metadata.original_date.clone(),
            genre_list: metadata.genre_list.clone().unwrap_or_default(),
            last_write: facts.last_write,
            checksum: facts.checksum.clone(),
            artist_id: artist.id,
            release_id: release.id,
            genre_ids,
        };

        let stored = self.repos.tracks.upsert(track).await?;
        debug!(
            target: "library",
            track_id = %stored.id,
            artist = %artist.name,
            release = %release.name,
            genres = stored.genre_ids.len(),
            "ingested track"
        );
        Ok(stored)
    }

    pub async fn track(&self, id: TrackId) -> LibraryResult<Option<Track>> {
        Ok(self.repos.tracks.get_by_id(id).await?)
    }

    pub async fn track_by_path(&self, path: &Path) -> LibraryResult<Option<Track>> {
        Ok(self.repos.tracks.get_by_path(&path.to_string_lossy()).await?)
    }

    /// Forget the track stored at `path`; its artist, release and genres stay.
    pub async fn remove_track(&self, path: &Path) -> LibraryResult<bool> {
        Ok(self.repos.tracks.remove_by_path(&path.to_string_lossy()).await?)
    }

    // ------------------------------------------------------------------------
    // Queries
    // ------------------------------------------------------------------------

    /// Cluster rows of the given types (every type when empty).
    pub async fn list_genres<S: AsRef<str>>(
        &self,
        cluster_types: &[S],
        offset: i64,
        limit: i64,
    ) -> LibraryResult<Vec<Genre>> {
        check_page(offset, limit)?;
        let cluster_types: Vec<String> =
            cluster_types.iter().map(|t| t.as_ref().to_string()).collect();
        Ok(self.repos.genres.get_all(&cluster_types, offset, limit).await?)
    }

    pub async fn list_artists(
        &self,
        genre_ids: &[GenreId],
        offset: i64,
        limit: i64,
    ) -> LibraryResult<Vec<Artist>> {
        check_page(offset, limit)?;
        ensure_exist::<Genre, _>(self.genres(), "genre", genre_ids.iter().map(|id| id.0)).await?;
        Ok(self.repos.artists.get_all(genre_ids, offset, limit).await?)
    }

    pub async fn list_releases(
        &self,
        artist_ids: &[ArtistId],
        genre_ids: &[GenreId],
        offset: i64,
        limit: i64,
    ) -> LibraryResult<Vec<Release>> {
        check_page(offset, limit)?;
        let artists = artist_ids.iter().map(|id| id.0);
        ensure_exist::<Artist, _>(self.artists(), "artist", artists).await?;
        let genres = genre_ids.iter().map(|id| id.0);
        ensure_exist::<Genre, _>(self.genres(), "genre", genres).await?;
        Ok(self
            .repos
            .releases
            .get_all(artist_ids, genre_ids, offset, limit)
            .await?)
    }

    pub async fn list_tracks(
        &self,
        filter: &TrackFilter,
        offset: i64,
        limit: i64,
    ) -> LibraryResult<Vec<Track>> {
        check_page(offset, limit)?;
        self.validate_filter(filter).await?;
        Ok(self.repos.tracks.get_all(filter, offset, limit).await?)
    }

    /// Tracks sharing any artist, release or genre of `filter`, minus `exclude`.
    pub async fn related_tracks(
        &self,
        filter: &TrackFilter,
        exclude: &[TrackId],
    ) -> LibraryResult<Vec<Track>> {
        Ok(self.repos.tracks.get_related(filter, exclude).await?)
    }

    /// Total duration of a release's tracks.
    pub async fn release_duration(&self, id: ReleaseId) -> LibraryResult<Duration> {
        self.repos
            .releases
            .duration(id)
            .await?
            .ok_or_else(|| LibraryError::InvalidArgument(format!("unknown release {id}")))
    }

    pub async fn orphans(&self) -> LibraryResult<Orphans> {
        Ok(Orphans {
            genres: self.repos.genres.get_all_orphans().await?,
            artists: self.repos.artists.get_all_orphans().await?,
            releases: self.repos.releases.get_all_orphans().await?,
        })
    }

    /// Remove every genre, artist and release no track refers to. Sentinel
    /// rows are kept.
    pub async fn delete_orphans(&self) -> LibraryResult<OrphanCounts> {
        let counts = OrphanCounts {
            genres: self.repos.genres.delete_orphans().await?,
            artists: self.repos.artists.delete_orphans().await?,
            releases: self.repos.releases.delete_orphans().await?,
        };
        info!(
            target: "library",
            genres = counts.genres,
            artists = counts.artists,
            releases = counts.releases,
            "deleted orphans"
        );
        Ok(counts)
    }

    // ------------------------------------------------------------------------
    // Track lists
    // ------------------------------------------------------------------------

    pub async fn create_tracklist(
        &self,
        name: &str,
        track_ids: &[TrackId],
    ) -> LibraryResult<TrackList> {
        self.ensure_tracks_exist(track_ids).await?;
        let list = self.repos.tracklists.create(name).await?;
        if !track_ids.is_empty() {
            self.repos.tracklists.append(list.id, track_ids).await?;
        }
        info!(target: "library", tracklist_id = %list.id, entries = track_ids.len(), "created tracklist");
        Ok(list)
    }

    pub async fn tracklist(&self, id: TrackListId) -> LibraryResult<Option<TrackList>> {
        Ok(self.repos.tracklists.get(id).await?)
    }

    pub async fn append_to_tracklist(
        &self,
        id: TrackListId,
        track_ids: &[TrackId],
    ) -> LibraryResult<()> {
        if self.repos.tracklists.get(id).await?.is_none() {
            return Err(LibraryError::InvalidArgument(format!("unknown tracklist {id}")));
        }
        self.ensure_tracks_exist(track_ids).await?;
        Ok(self.repos.tracklists.append(id, track_ids).await?)
    }

    /// Tracks of a list in list order, `None` for an unknown list.
    pub async fn tracklist_tracks(&self, id: TrackListId) -> LibraryResult<Option<Vec<Track>>> {
        let Some(ids) = self.repos.tracklists.track_ids(id).await? else {
            return Ok(None);
        };
        let mut tracks = Vec::with_capacity(ids.len());
        for track_id in ids {
            // An entry can point at a track removed since it was listed.
            if let Some(track) = self.repos.tracks.get_by_id(track_id).await? {
                tracks.push(track);
            }
        }
        Ok(Some(tracks))
    }

    async fn validate_filter(&self, filter: &TrackFilter) -> LibraryResult<()> {
        let artists = filter.artist_ids.iter().map(|id| id.0);
        ensure_exist::<Artist, _>(self.artists(), "artist", artists).await?;
        let releases = filter.release_ids.iter().map(|id| id.0);
        ensure_exist::<Release, _>(self.releases(), "release", releases).await?;
        let genres = filter.genre_ids.iter().map(|id| id.0);
        ensure_exist::<Genre, _>(self.genres(), "genre", genres).await
    }

    async fn ensure_tracks_exist(&self, track_ids: &[TrackId]) -> LibraryResult<()> {
        for id in track_ids {
            if self.repos.tracks.get_by_id(*id).await?.is_none() {
                return Err(LibraryError::InvalidArgument(format!("unknown track {id}")));
            }
        }
        Ok(())
    }
}

fn display_name(path: &Path, metadata: &TrackMetadata) -> String {
    match metadata.title.as_deref() {
        Some(title) if !title.trim().is_empty() => title.to_string(),
        _ => path
            .file_stem()
            .map(|stem| stem.to_string_lossy().into_owned())
            .unwrap_or_default(),
    }
}

/// Milliseconds, saturated at what an SQLite integer column holds.
fn storable_millis(duration: Duration) -> u64 {
    const MAX_STORED_MS: u64 = i64::MAX as u64;
    u64::try_from(duration.as_millis()).map_or(MAX_STORED_MS, |ms| ms.min(MAX_STORED_MS))
}

fn check_page(offset: i64, limit: i64) -> LibraryResult<()> {
    if offset < 0 || limit < 0 {
        return Err(LibraryError::InvalidArgument(format!(
            "offset and limit must not be negative (offset {offset}, limit {limit})"
        )));
    }
    Ok(())
}

async fn ensure_exist<T, R>(
    repo: &R,
    kind: &str,
    ids: impl Iterator<Item = Uuid>,
) -> LibraryResult<()>
where
    T: NamedEntity,
    R: NamedEntityRepository<T> + ?Sized,
{
    let ids: Vec<Uuid> = ids.collect();
    if ids.is_empty() {
        return Ok(());
    }
    let missing = repo.find_missing(&ids).await?;
    match missing.first() {
        Some(id) => Err(LibraryError::InvalidArgument(format!("unknown {kind} {id}"))),
        None => Ok(()),
    }
}
