// SPDX-License-Identifier: GPL-3.0-or-later
use std::collections::BTreeSet;
use std::marker::PhantomData;
use std::time::Duration;

use anyhow::{anyhow, Result};
use chorale_domain::{
    truncate_name, Artist, ArtistId, Genre, GenreId, NamedEntity, Release, ReleaseDate, ReleaseId,
    Track, TrackId, TrackList, TrackListId, GENRE_CLUSTER, NONE_NAME,
};
use chrono::{DateTime, NaiveDateTime, Utc};
use sqlx::sqlite::SqliteRow;
use sqlx::{QueryBuilder, Row, Sqlite, SqlitePool};
use tokio::sync::OnceCell;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::repositories::{
    ArtistRepository, GenreRepository, NamedEntityRepository, ReleaseRepository, TrackFilter,
    TrackListRepository, TrackRepository,
};

/// Attempts at resolving a name before giving up; a miss only happens when
/// the row is deleted between our insert and the re-fetch.
const MAX_CREATE_ATTEMPTS: usize = 3;

// ============================================================================
// Named entities
// ============================================================================

/// Table mapping of a named entity.
pub trait SqliteEntity: NamedEntity {
    const TABLE: &'static str;
    /// Condition over `TABLE` that holds when no track refers to the row.
    const UNREFERENCED: &'static str;
}

impl SqliteEntity for Artist {
    const TABLE: &'static str = "artists";
    const UNREFERENCED: &'static str =
        "NOT EXISTS (SELECT 1 FROM tracks t WHERE t.artist_id = artists.id)";
}

impl SqliteEntity for Release {
    const TABLE: &'static str = "releases";
    const UNREFERENCED: &'static str =
        "NOT EXISTS (SELECT 1 FROM tracks t WHERE t.release_id = releases.id)";
}

/// SQLx-backed repository for one named entity kind.
///
/// The sentinel row is resolved once and cached for the lifetime of the
/// repository.
pub struct SqliteNamedRepository<T> {
    pool: SqlitePool,
    sentinel: OnceCell<T>,
    _entity: PhantomData<T>,
}

pub type SqliteArtistRepository = SqliteNamedRepository<Artist>;
pub type SqliteReleaseRepository = SqliteNamedRepository<Release>;

impl<T: SqliteEntity> SqliteNamedRepository<T> {
    pub fn new(pool: SqlitePool) -> Self {
        Self {
            pool,
            sentinel: OnceCell::new(),
            _entity: PhantomData,
        }
    }
}

#[async_trait::async_trait]
impl<T: SqliteEntity> NamedEntityRepository<T> for SqliteNamedRepository<T> {
    async fn get_by_name(&self, name: &str) -> Result<Option<T>> {
        let name = truncate_name(name);
        debug!(target: "repository", table = T::TABLE, %name, "fetching by name");
        let q = format!("SELECT id, name FROM {} WHERE name = ? LIMIT 1", T::TABLE);
        let row = sqlx::query(&q)
            .bind(name)
            .fetch_optional(&self.pool)
            .await?;
        row.map(|r| row_to_named(&r)).transpose()
    }

    async fn get_or_create(&self, name: &str) -> Result<T> {
        let name = truncate_name(name);
        let insert = format!(
            "INSERT INTO {} (id, name) VALUES (?, ?) ON CONFLICT(name) DO NOTHING",
            T::TABLE
        );

        for attempt in 1..=MAX_CREATE_ATTEMPTS {
            let inserted = sqlx::query(&insert)
                .bind(Uuid::new_v4().to_string())
                .bind(name.as_str())
                .execute(&self.pool)
                .await?
                .rows_affected();
            if inserted > 0 {
                debug!(target: "repository", table = T::TABLE, %name, "created row");
            }

            if let Some(entity) = self.get_by_name(&name).await? {
                return Ok(entity);
            }
            warn!(target: "repository", table = T::TABLE, %name, attempt, "row vanished before re-fetch");
        }

        Err(anyhow!(
            "could not resolve {} row {:?} after {} attempts",
            T::TABLE,
            name,
            MAX_CREATE_ATTEMPTS
        ))
    }

    async fn get_sentinel(&self) -> Result<T> {
        self.sentinel
            .get_or_try_init(|| self.get_or_create(NONE_NAME))
            .await
            .cloned()
    }

    async fn get_all_orphans(&self) -> Result<Vec<T>> {
        debug!(target: "repository", table = T::TABLE, "listing orphans");
        let q = format!(
            "SELECT id, name FROM {table} WHERE name <> ? AND {cond} ORDER BY name, id",
            table = T::TABLE,
            cond = T::UNREFERENCED
        );
        let rows = sqlx::query(&q)
            .bind(NONE_NAME)
            .fetch_all(&self.pool)
            .await?;
        rows.iter().map(row_to_named).collect()
    }

    async fn delete_orphans(&self) -> Result<u64> {
        let q = format!(
            "DELETE FROM {table} WHERE name <> ? AND {cond}",
            table = T::TABLE,
            cond = T::UNREFERENCED
        );
        let deleted = sqlx::query(&q)
            .bind(NONE_NAME)
            .execute(&self.pool)
            .await?
            .rows_affected();
        debug!(target: "repository", table = T::TABLE, deleted, "deleted orphans");
        Ok(deleted)
    }

    async fn find_missing(&self, ids: &[Uuid]) -> Result<Vec<Uuid>> {
        find_missing_in(&self.pool, T::TABLE, ids).await
    }
}

// ============================================================================
// Genres and other clusters
// ============================================================================

/// Orphan condition over `genres`; the `GENRE/<None>` sentinel is excluded.
const GENRE_ORPHAN: &str = "NOT (cluster_type = ? AND name = ?) \
     AND NOT EXISTS (SELECT 1 FROM track_genres tg WHERE tg.genre_id = genres.id)";

/// SQLx-backed repository for cluster rows of every type.
pub struct SqliteGenreRepository {
    pool: SqlitePool,
    sentinel: OnceCell<Genre>,
}

impl SqliteGenreRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self {
            pool,
            sentinel: OnceCell::new(),
        }
    }
}

#[async_trait::async_trait]
impl NamedEntityRepository<Genre> for SqliteGenreRepository {
    async fn get_by_name(&self, name: &str) -> Result<Option<Genre>> {
        self.get_in_cluster(GENRE_CLUSTER, name).await
    }

    async fn get_or_create(&self, name: &str) -> Result<Genre> {
        self.get_or_create_in_cluster(GENRE_CLUSTER, name).await
    }

    async fn get_sentinel(&self) -> Result<Genre> {
        self.sentinel
            .get_or_try_init(|| self.get_or_create_in_cluster(GENRE_CLUSTER, NONE_NAME))
            .await
            .cloned()
    }

    async fn get_all_orphans(&self) -> Result<Vec<Genre>> {
        debug!(target: "repository", table = "genres", "listing orphans");
        let q = format!(
            "SELECT id, cluster_type, name FROM genres WHERE {GENRE_ORPHAN} \
             ORDER BY cluster_type, name, id"
        );
        let rows = sqlx::query(&q)
            .bind(GENRE_CLUSTER)
            .bind(NONE_NAME)
            .fetch_all(&self.pool)
            .await?;
        rows.iter().map(row_to_genre).collect()
    }

    async fn delete_orphans(&self) -> Result<u64> {
        let q = format!("DELETE FROM genres WHERE {GENRE_ORPHAN}");
        let deleted = sqlx::query(&q)
            .bind(GENRE_CLUSTER)
            .bind(NONE_NAME)
            .execute(&self.pool)
            .await?
            .rows_affected();
        debug!(target: "repository", table = "genres", deleted, "deleted orphans");
        Ok(deleted)
    }

    async fn find_missing(&self, ids: &[Uuid]) -> Result<Vec<Uuid>> {
        find_missing_in(&self.pool, "genres", ids).await
    }
}

#[async_trait::async_trait]
impl GenreRepository for SqliteGenreRepository {
    async fn get_in_cluster(&self, cluster_type: &str, name: &str) -> Result<Option<Genre>> {
        let name = truncate_name(name);
        debug!(target: "repository", cluster_type, %name, "fetching cluster row");
        let row = sqlx::query(
            "SELECT id, cluster_type, name FROM genres WHERE cluster_type = ? AND name = ? LIMIT 1",
        )
        .bind(cluster_type)
        .bind(name)
        .fetch_optional(&self.pool)
        .await?;
        row.map(|r| row_to_genre(&r)).transpose()
    }

    async fn get_or_create_in_cluster(&self, cluster_type: &str, name: &str) -> Result<Genre> {
        let name = truncate_name(name);
        for attempt in 1..=MAX_CREATE_ATTEMPTS {
            let inserted = sqlx::query(
                "INSERT INTO genres (id, cluster_type, name) VALUES (?, ?, ?) \
                 ON CONFLICT(cluster_type, name) DO NOTHING",
            )
            .bind(Uuid::new_v4().to_string())
            .bind(cluster_type)
            .bind(name.as_str())
            .execute(&self.pool)
            .await?
            .rows_affected();
            if inserted > 0 {
                debug!(target: "repository", cluster_type, %name, "created cluster row");
            }

            if let Some(genre) = self.get_in_cluster(cluster_type, &name).await? {
                return Ok(genre);
            }
            warn!(target: "repository", cluster_type, %name, attempt, "row vanished before re-fetch");
        }

        Err(anyhow!(
            "could not resolve {cluster_type} row {name:?} after {MAX_CREATE_ATTEMPTS} attempts"
        ))
    }

    async fn get_all(
        &self,
        cluster_types: &[String],
        offset: i64,
        limit: i64,
    ) -> Result<Vec<Genre>> {
        debug!(target: "repository", types = cluster_types.len(), offset, limit, "listing genres");
        let mut qb =
            QueryBuilder::<Sqlite>::new("SELECT g.id, g.cluster_type, g.name FROM genres g WHERE 1 = 1");
        if !cluster_types.is_empty() {
            qb.push(" AND ");
            push_in_list(&mut qb, "g.cluster_type", cluster_types.iter().cloned());
        }
        push_page(&mut qb, "g", offset, limit);

        let rows = qb.build().fetch_all(&self.pool).await?;
        rows.iter().map(row_to_genre).collect()
    }
}

#[async_trait::async_trait]
impl ArtistRepository for SqliteArtistRepository {
    async fn get_all(
        &self,
        genre_ids: &[GenreId],
        offset: i64,
        limit: i64,
    ) -> Result<Vec<Artist>> {
        debug!(target: "repository", genres = genre_ids.len(), offset, limit, "listing artists");
        let mut qb = QueryBuilder::<Sqlite>::new("SELECT a.id, a.name FROM artists a WHERE 1 = 1");
        if !genre_ids.is_empty() {
            qb.push(
                " AND EXISTS (SELECT 1 FROM tracks t JOIN track_genres tg ON tg.track_id = t.id \
                 WHERE t.artist_id = a.id AND ",
            );
            push_in_list(&mut qb, "tg.genre_id", genre_ids.iter().map(|id| id.to_string()));
            qb.push(")");
        }
        push_page(&mut qb, "a", offset, limit);

        let rows = qb.build().fetch_all(&self.pool).await?;
        rows.iter().map(row_to_named).collect()
    }
}

#[async_trait::async_trait]
impl ReleaseRepository for SqliteReleaseRepository {
    async fn get_all(
        &self,
        artist_ids: &[ArtistId],
        genre_ids: &[GenreId],
        offset: i64,
        limit: i64,
    ) -> Result<Vec<Release>> {
        debug!(
            target: "repository",
            artists = artist_ids.len(),
            genres = genre_ids.len(),
            offset,
            limit,
            "listing releases"
        );
        let mut qb = QueryBuilder::<Sqlite>::new("SELECT r.id, r.name FROM releases r WHERE 1 = 1");
        if !artist_ids.is_empty() || !genre_ids.is_empty() {
            // Both constraints must hold for the same track.
            qb.push(" AND EXISTS (SELECT 1 FROM tracks t WHERE t.release_id = r.id");
            if !artist_ids.is_empty() {
                qb.push(" AND ");
                push_in_list(&mut qb, "t.artist_id", artist_ids.iter().map(|id| id.to_string()));
            }
            if !genre_ids.is_empty() {
                qb.push(" AND ");
                push_genre_clause(&mut qb, genre_ids);
            }
            qb.push(")");
        }
        push_page(&mut qb, "r", offset, limit);

        let rows = qb.build().fetch_all(&self.pool).await?;
        rows.iter().map(row_to_named).collect()
    }

    async fn duration(&self, id: ReleaseId) -> Result<Option<Duration>> {
        debug!(target: "repository", release_id = %id, "summing release duration");
        let row = sqlx::query(
            r#"
            SELECT (SELECT COALESCE(SUM(t.duration_ms), 0) FROM tracks t WHERE t.release_id = r.id) AS total_ms
            FROM releases r WHERE r.id = ?
            "#,
        )
        .bind(id.to_string())
        .fetch_optional(&self.pool)
        .await?;

        match row {
            Some(r) => {
                let total_ms: i64 = r.try_get("total_ms")?;
                Ok(Some(Duration::from_millis(u64::try_from(total_ms)?)))
            }
            None => Ok(None),
        }
    }
}

// ============================================================================
// Tracks
// ============================================================================

const TRACK_COLUMNS: &str = r#"
    t.id, t.path, t.name, t.track_number, t.disc_number, t.duration_ms, t.date,
    t.original_date, t.genre_list, t.last_write, t.checksum, t.artist_id, t.release_id,
    (SELECT group_concat(tg.genre_id) FROM track_genres tg WHERE tg.track_id = t.id) AS genre_ids
"#;

/// SQLx-backed Track repository
pub struct SqliteTrackRepository {
    pool: SqlitePool,
}

impl SqliteTrackRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    async fn fetch_one_where(&self, column: &str, value: String) -> Result<Option<Track>> {
        let q = format!("SELECT {TRACK_COLUMNS} FROM tracks t WHERE t.{column} = ? LIMIT 1");
        let row = sqlx::query(&q)
            .bind(value)
            .fetch_optional(&self.pool)
            .await?;
        row.map(|r| row_to_track(&r)).transpose()
    }
}

#[async_trait::async_trait]
impl TrackRepository for SqliteTrackRepository {
    async fn get_by_id(&self, id: TrackId) -> Result<Option<Track>> {
        debug!(target: "repository", track_id = %id, "fetching track by id");
        self.fetch_one_where("id", id.to_string()).await
    }

    async fn get_by_path(&self, path: &str) -> Result<Option<Track>> {
        debug!(target: "repository", path, "fetching track by path");
        self.fetch_one_where("path", path.to_string()).await
    }

    async fn upsert(&self, track: Track) -> Result<Track> {
        debug!(target: "repository", path = %track.path, "upserting track");
        let q = r#"
            INSERT INTO tracks (
                id, path, name, track_number, disc_number, duration_ms, date,
                original_date, genre_list, last_write, checksum, artist_id, release_id
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            ON CONFLICT(path) DO UPDATE SET
                name = excluded.name,
                track_number = excluded.track_number,
                disc_number = excluded.disc_number,
                duration_ms = excluded.duration_ms,
                date = excluded.date,
                original_date = excluded.original_date,
                genre_list = excluded.genre_list,
                last_write = excluded.last_write,
                checksum = excluded.checksum,
                artist_id = excluded.artist_id,
                release_id = excluded.release_id
            RETURNING id
        "#;

        let genre_ids: Vec<GenreId> = track
            .genre_ids
            .iter()
            .copied()
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect();

        // The first statement is a write, so the transaction takes the write
        // lock up front.
        let mut tx = self.pool.begin().await?;
        let row = sqlx::query(q)
            .bind(track.id.to_string())
            .bind(track.path.clone())
            .bind(track.name.clone())
            .bind(track.track_number.map(i64::from))
            .bind(track.disc_number.map(i64::from))
            .bind(i64::try_from(track.duration_ms)?)
            .bind(track.date.as_ref().map(ReleaseDate::to_iso8601))
            .bind(track.original_date.as_ref().map(ReleaseDate::to_iso8601))
            .bind(track.genre_list.clone())
            .bind(track.last_write.to_rfc3339())
            .bind(track.checksum.clone())
            .bind(track.artist_id.to_string())
            .bind(track.release_id.to_string())
            .fetch_one(&mut *tx)
            .await?;
        let stored_id: String = row.try_get("id")?;
        let id = TrackId::from_uuid(Uuid::parse_str(&stored_id)?);

        sqlx::query("DELETE FROM track_genres WHERE track_id = ?")
            .bind(stored_id.clone())
            .execute(&mut *tx)
            .await?;
        for genre_id in &genre_ids {
            sqlx::query("INSERT INTO track_genres (track_id, genre_id) VALUES (?, ?)")
                .bind(stored_id.clone())
                .bind(genre_id.to_string())
                .execute(&mut *tx)
                .await?;
        }
        tx.commit().await?;

        Ok(Track {
            id,
            genre_ids,
            ..track
        })
    }

    async fn remove_by_path(&self, path: &str) -> Result<bool> {
        debug!(target: "repository", path, "removing track");
        let removed = sqlx::query("DELETE FROM tracks WHERE path = ?")
            .bind(path)
            .execute(&self.pool)
            .await?
            .rows_affected();
        Ok(removed > 0)
    }

    async fn get_all(&self, filter: &TrackFilter, offset: i64, limit: i64) -> Result<Vec<Track>> {
        debug!(target: "repository", ?filter, offset, limit, "listing tracks");
        let mut qb = QueryBuilder::<Sqlite>::new(format!(
            "SELECT {TRACK_COLUMNS} FROM tracks t WHERE 1 = 1"
        ));
        if !filter.artist_ids.is_empty() {
            qb.push(" AND ");
            push_in_list(&mut qb, "t.artist_id", filter.artist_ids.iter().map(|id| id.to_string()));
        }
        if !filter.release_ids.is_empty() {
            qb.push(" AND ");
            push_in_list(
                &mut qb,
                "t.release_id",
                filter.release_ids.iter().map(|id| id.to_string()),
            );
        }
        if !filter.genre_ids.is_empty() {
            qb.push(" AND ");
            push_genre_clause(&mut qb, &filter.genre_ids);
        }
        push_page(&mut qb, "t", offset, limit);

        let rows = qb.build().fetch_all(&self.pool).await?;
        rows.iter().map(row_to_track).collect()
    }

    async fn get_related(&self, filter: &TrackFilter, exclude: &[TrackId]) -> Result<Vec<Track>> {
        if filter.is_empty() {
            return Ok(Vec::new());
        }
        debug!(target: "repository", ?filter, excluded = exclude.len(), "fetching related tracks");

        let mut qb = QueryBuilder::<Sqlite>::new(format!(
            "SELECT {TRACK_COLUMNS} FROM tracks t WHERE ("
        ));
        let mut sep = "";
        if !filter.artist_ids.is_empty() {
            push_in_list(&mut qb, "t.artist_id", filter.artist_ids.iter().map(|id| id.to_string()));
            sep = " OR ";
        }
        if !filter.release_ids.is_empty() {
            qb.push(sep);
            push_in_list(
                &mut qb,
                "t.release_id",
                filter.release_ids.iter().map(|id| id.to_string()),
            );
            sep = " OR ";
        }
        if !filter.genre_ids.is_empty() {
            qb.push(sep);
            push_genre_clause(&mut qb, &filter.genre_ids);
        }
        qb.push(")");
        if !exclude.is_empty() {
            qb.push(" AND NOT ");
            push_in_list(&mut qb, "t.id", exclude.iter().map(|id| id.to_string()));
        }
        qb.push(" ORDER BY t.id");

        let rows = qb.build().fetch_all(&self.pool).await?;
        rows.iter().map(row_to_track).collect()
    }
}

// ============================================================================
// Track lists
// ============================================================================

/// SQLx-backed TrackList repository
pub struct SqliteTrackListRepository {
    pool: SqlitePool,
}

impl SqliteTrackListRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

#[async_trait::async_trait]
impl TrackListRepository for SqliteTrackListRepository {
    async fn create(&self, name: &str) -> Result<TrackList> {
        let list = TrackList::new(name);
        debug!(target: "repository", tracklist_id = %list.id, name, "creating tracklist");
        sqlx::query("INSERT INTO tracklists (id, name, created_at) VALUES (?, ?, ?)")
            .bind(list.id.to_string())
            .bind(list.name.clone())
            .bind(list.created_at.to_rfc3339())
            .execute(&self.pool)
            .await?;
        Ok(list)
    }

    async fn get(&self, id: TrackListId) -> Result<Option<TrackList>> {
        debug!(target: "repository", tracklist_id = %id, "fetching tracklist");
        let row = sqlx::query("SELECT id, name, created_at FROM tracklists WHERE id = ? LIMIT 1")
            .bind(id.to_string())
            .fetch_optional(&self.pool)
            .await?;
        row.map(|r| row_to_tracklist(&r)).transpose()
    }

    async fn append(&self, id: TrackListId, track_ids: &[TrackId]) -> Result<()> {
        debug!(target: "repository", tracklist_id = %id, count = track_ids.len(), "appending to tracklist");
        let mut tx = self.pool.begin().await?;
        let next: i64 = sqlx::query(
            "SELECT COALESCE(MAX(position) + 1, 0) AS next FROM tracklist_entries WHERE tracklist_id = ?",
        )
        .bind(id.to_string())
        .fetch_one(&mut *tx)
        .await?
        .try_get("next")?;

        for (position, track_id) in (next..).zip(track_ids) {
            sqlx::query(
                "INSERT INTO tracklist_entries (tracklist_id, position, track_id) VALUES (?, ?, ?)",
            )
            .bind(id.to_string())
            .bind(position)
            .bind(track_id.to_string())
            .execute(&mut *tx)
            .await?;
        }
        tx.commit().await?;
        Ok(())
    }

    async fn track_ids(&self, id: TrackListId) -> Result<Option<Vec<TrackId>>> {
        if self.get(id).await?.is_none() {
            return Ok(None);
        }
        let rows = sqlx::query(
            "SELECT track_id FROM tracklist_entries WHERE tracklist_id = ? ORDER BY position",
        )
        .bind(id.to_string())
        .fetch_all(&self.pool)
        .await?;

        let mut out = Vec::with_capacity(rows.len());
        for r in rows {
            let track_id: String = r.try_get("track_id")?;
            out.push(TrackId::from_uuid(Uuid::parse_str(&track_id)?));
        }
        Ok(Some(out))
    }
}

// ----------------------------------------------------------------------------
// Helpers
// ----------------------------------------------------------------------------

async fn find_missing_in(pool: &SqlitePool, table: &str, ids: &[Uuid]) -> Result<Vec<Uuid>> {
    let wanted: BTreeSet<Uuid> = ids.iter().copied().collect();
    if wanted.is_empty() {
        return Ok(Vec::new());
    }

    let mut qb = QueryBuilder::<Sqlite>::new(format!("SELECT id FROM {table} WHERE "));
    push_in_list(&mut qb, "id", wanted.iter().map(Uuid::to_string));
    let rows = qb.build().fetch_all(pool).await?;

    let mut found = BTreeSet::new();
    for row in rows {
        let id: String = row.try_get("id")?;
        found.insert(parse_id(&id)?);
    }
    Ok(wanted.difference(&found).copied().collect())
}

fn push_in_list(
    qb: &mut QueryBuilder<'_, Sqlite>,
    column: &str,
    values: impl IntoIterator<Item = String>,
) {
    qb.push(column).push(" IN (");
    let mut list = qb.separated(", ");
    for value in values {
        list.push_bind(value);
    }
    list.push_unseparated(")");
}

fn push_genre_clause(qb: &mut QueryBuilder<'_, Sqlite>, genre_ids: &[GenreId]) {
    qb.push("EXISTS (SELECT 1 FROM track_genres tg WHERE tg.track_id = t.id AND ");
    push_in_list(qb, "tg.genre_id", genre_ids.iter().map(|id| id.to_string()));
    qb.push(")");
}

fn push_page(qb: &mut QueryBuilder<'_, Sqlite>, alias: &str, offset: i64, limit: i64) {
    qb.push(format!(" ORDER BY {alias}.name, {alias}.id LIMIT "))
        .push_bind(limit)
        .push(" OFFSET ")
        .push_bind(offset);
}

fn parse_dt(s: String) -> Result<DateTime<Utc>> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(&s) {
        return Ok(dt.with_timezone(&Utc));
    }
    // SQLite CURRENT_TIMESTAMP format
    let ndt = NaiveDateTime::parse_from_str(&s, "%Y-%m-%d %H:%M:%S")?;
    Ok(DateTime::<Utc>::from_naive_utc_and_offset(ndt, Utc))
}

fn parse_id(s: &str) -> Result<Uuid> {
    Ok(Uuid::parse_str(s)?)
}

fn parse_date(column: &str, s: Option<String>) -> Result<Option<ReleaseDate>> {
    match s {
        Some(raw) => ReleaseDate::parse_str(&raw)
            .map(Some)
            .ok_or_else(|| anyhow!("invalid {column} stored: {raw:?}")),
        None => Ok(None),
    }
}

fn parse_position(n: Option<i64>) -> Result<Option<u32>> {
    n.map(u32::try_from).transpose().map_err(Into::into)
}

fn row_to_named<T: NamedEntity>(row: &SqliteRow) -> Result<T> {
    let id: String = row.try_get("id")?;
    let name: String = row.try_get("name")?;
    Ok(T::from_parts(parse_id(&id)?, name))
}

fn row_to_genre(row: &SqliteRow) -> Result<Genre> {
    let id: String = row.try_get("id")?;
    Ok(Genre {
        id: GenreId::from_uuid(parse_id(&id)?),
        cluster_type: row.try_get("cluster_type")?,
        name: row.try_get("name")?,
    })
}

fn row_to_track(row: &SqliteRow) -> Result<Track> {
    let id: String = row.try_get("id")?;
    let artist_id: String = row.try_get("artist_id")?;
    let release_id: String = row.try_get("release_id")?;
    let duration_ms: i64 = row.try_get("duration_ms")?;
    let genre_ids: Option<String> = row.try_get("genre_ids")?;

    let mut genres = Vec::new();
    for raw in genre_ids.iter().flat_map(|s| s.split(',')) {
        genres.push(GenreId::from_uuid(parse_id(raw)?));
    }
    genres.sort();

    Ok(Track {
        id: TrackId::from_uuid(parse_id(&id)?),
        path: row.try_get("path")?,
        name: row.try_get("name")?,
        track_number: parse_position(row.try_get("track_number")?)?,
        disc_number: parse_position(row.try_get("disc_number")?)?,
        duration_ms: u64::try_from(duration_ms)?,
        date: parse_date("date", row.try_get("date")?)?,
        original_date: parse_date("original_date", row.try_get("original_date")?)?,
        genre_list: row.try_get("genre_list")?,
        last_write: parse_dt(row.try_get("last_write")?)?,
        checksum: row.try_get("checksum")?,
        artist_id: ArtistId::from_uuid(parse_id(&artist_id)?),
        release_id: ReleaseId::from_uuid(parse_id(&release_id)?),
        genre_ids: genres,
    })
}

fn row_to_tracklist(row: &SqliteRow) -> Result<TrackList> {
    let id: String = row.try_get("id")?;
    Ok(TrackList {
        id: TrackListId::from_uuid(parse_id(&id)?),
        name: row.try_get("name")?,
        created_at: parse_dt(row.try_get("created_at")?)?,
    })
}

// ============================================================================
// Tests
// ============================================================================
