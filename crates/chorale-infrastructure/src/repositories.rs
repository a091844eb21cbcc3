// SPDX-License-Identifier: GPL-3.0-or-later
use std::time::Duration;

use anyhow::Result;
use chorale_domain::{
    Artist, ArtistId, Genre, GenreId, NamedEntity, Release, ReleaseId, Track, TrackId, TrackList,
    TrackListId,
};
use uuid::Uuid;

// ============================================================================
// Repository Traits
// ============================================================================

/// Uniform contract shared by every entity whose identity is its name.
#[async_trait::async_trait]
pub trait NamedEntityRepository<T: NamedEntity>: Send + Sync {
    /// Exact match on the truncated name; never writes.
    async fn get_by_name(&self, name: &str) -> Result<Option<T>>;

    /// Existing row or a freshly created one. Concurrent calls with the same
    /// name resolve to the same row.
    async fn get_or_create(&self, name: &str) -> Result<T>;

    /// The "unknown" row of this kind, created on first use.
    async fn get_sentinel(&self) -> Result<T>;

    /// Rows no track refers to. The sentinel is never an orphan.
    async fn get_all_orphans(&self) -> Result<Vec<T>>;

    /// Delete every orphan row and return how many went away.
    async fn delete_orphans(&self) -> Result<u64>;

    /// The subset of `ids` that has no row.
    async fn find_missing(&self, ids: &[Uuid]) -> Result<Vec<Uuid>>;
}

/// Cluster rows of every type. The [`NamedEntityRepository`] side works on
/// the `GENRE` type; the `*_in_cluster` methods reach any other.
#[async_trait::async_trait]
pub trait GenreRepository: NamedEntityRepository<Genre> {
    async fn get_in_cluster(&self, cluster_type: &str, name: &str) -> Result<Option<Genre>>;

    /// Same contract as [`NamedEntityRepository::get_or_create`], keyed by
    /// the (cluster type, name) pair.
    async fn get_or_create_in_cluster(&self, cluster_type: &str, name: &str) -> Result<Genre>;

    /// Rows of any of `cluster_types`, or of every type when it is empty.
    async fn get_all(&self, cluster_types: &[String], offset: i64, limit: i64)
        -> Result<Vec<Genre>>;
}

#[async_trait::async_trait]
pub trait ArtistRepository: NamedEntityRepository<Artist> {
    /// Artists with at least one track in any of `genre_ids`.
    async fn get_all(&self, genre_ids: &[GenreId], offset: i64, limit: i64)
        -> Result<Vec<Artist>>;
}

#[async_trait::async_trait]
pub trait ReleaseRepository: NamedEntityRepository<Release> {
    /// Releases with at least one track by any of `artist_ids` that is also
    /// tagged with any of `genre_ids`.
    async fn get_all(
        &self,
        artist_ids: &[ArtistId],
        genre_ids: &[GenreId],
        offset: i64,
        limit: i64,
    ) -> Result<Vec<Release>>;

    /// Sum of the durations of the release's tracks, `None` for an unknown id.
    async fn duration(&self, id: ReleaseId) -> Result<Option<Duration>>;
}

/// Id sets used to select tracks. An empty set places no constraint.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TrackFilter {
    pub artist_ids: Vec<ArtistId>,
    pub release_ids: Vec<ReleaseId>,
    pub genre_ids: Vec<GenreId>,
}

impl TrackFilter {
    pub fn is_empty(&self) -> bool {
        self.artist_ids.is_empty() && self.release_ids.is_empty() && self.genre_ids.is_empty()
    }
}

#[async_trait::async_trait]
pub trait TrackRepository: Send + Sync {
    async fn get_by_id(&self, id: TrackId) -> Result<Option<Track>>;
    async fn get_by_path(&self, path: &str) -> Result<Option<Track>>;

    /// Insert or replace the track stored at `track.path`, genre links
    /// included, in one transaction. Returns the track with its stored id.
    async fn upsert(&self, track: Track) -> Result<Track>;

    /// Returns whether a row was removed.
    async fn remove_by_path(&self, path: &str) -> Result<bool>;

    /// Tracks matching every non-empty set of `filter`, ordered by name then id.
    async fn get_all(&self, filter: &TrackFilter, offset: i64, limit: i64) -> Result<Vec<Track>>;

    /// Tracks matching any id of any set of `filter`, minus `exclude`.
    async fn get_related(&self, filter: &TrackFilter, exclude: &[TrackId]) -> Result<Vec<Track>>;
}

#[async_trait::async_trait]
pub trait TrackListRepository: Send + Sync {
    async fn create(&self, name: &str) -> Result<TrackList>;
    async fn get(&self, id: TrackListId) -> Result<Option<TrackList>>;

    /// Append entries after the current last position.
    async fn append(&self, id: TrackListId, track_ids: &[TrackId]) -> Result<()>;

    /// Entries in list order, `None` for an unknown list.
    async fn track_ids(&self, id: TrackListId) -> Result<Option<Vec<TrackId>>>;
}
