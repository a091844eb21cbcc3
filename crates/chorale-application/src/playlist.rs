// SPDX-License-Identifier: GPL-3.0-or-later
//! Track list extension.
//!
//! The tracks already in a list form a seed profile: how often each artist,
//! release and genre occurs. Library tracks sharing at least one of those
//! are scored against the profile and the best ones are proposed.

use std::cmp::Ordering;
use std::collections::HashMap;
use std::hash::Hash;
use std::sync::Arc;

use chorale_config::PlaylistConfig;
use chorale_domain::{ArtistId, GenreId, ReleaseId, Track, TrackId, TrackListId};
use chorale_infrastructure::repositories::TrackFilter;
use thiserror::Error;
use tracing::{debug, info};

use crate::library::{LibraryError, LibraryGraph, Sentinels};

#[derive(Debug, Error)]
pub enum PlaylistError {
    #[error(transparent)]
    Library(#[from] LibraryError),
}

pub type PlaylistResult<T> = Result<T, PlaylistError>;

/// Occurrence counts of the attributes of a list's tracks.
///
/// Sentinel rows carry no signal and are never counted.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SeedProfile {
    artists: HashMap<ArtistId, u32>,
    releases: HashMap<ReleaseId, u32>,
    genres: HashMap<GenreId, u32>,
}

impl SeedProfile {
    pub fn from_tracks<'a>(
        tracks: impl IntoIterator<Item = &'a Track>,
        sentinels: &Sentinels,
    ) -> Self {
        let mut profile = Self::default();
        for track in tracks {
            if track.artist_id != sentinels.artist {
                bump(&mut profile.artists, track.artist_id);
            }
            if track.release_id != sentinels.release {
                bump(&mut profile.releases, track.release_id);
            }
            for genre_id in &track.genre_ids {
                if *genre_id != sentinels.genre {
                    bump(&mut profile.genres, *genre_id);
                }
            }
        }
        profile
    }

    pub fn is_empty(&self) -> bool {
        self.artists.is_empty() && self.releases.is_empty() && self.genres.is_empty()
    }

    pub fn artist_count(&self, id: ArtistId) -> u32 {
        self.artists.get(&id).copied().unwrap_or(0)
    }

    pub fn release_count(&self, id: ReleaseId) -> u32 {
        self.releases.get(&id).copied().unwrap_or(0)
    }

    pub fn genre_count(&self, id: GenreId) -> u32 {
        self.genres.get(&id).copied().unwrap_or(0)
    }

    /// Every attribute of the profile, for the candidate query.
    fn filter(&self) -> TrackFilter {
        TrackFilter {
            artist_ids: sorted_keys(&self.artists),
            release_ids: sorted_keys(&self.releases),
            genre_ids: sorted_keys(&self.genres),
        }
    }
}

fn bump<K: Eq + Hash>(counts: &mut HashMap<K, u32>, key: K) {
    *counts.entry(key).or_insert(0) += 1;
}

fn sorted_keys<K: Copy + Ord>(counts: &HashMap<K, u32>) -> Vec<K> {
    let mut keys: Vec<K> = counts.keys().copied().collect();
    keys.sort();
    keys
}

/// Scores a candidate track against a seed profile. Only positive scores
/// are proposed.
pub trait SimilarityScorer: Send + Sync {
    fn score(&self, seed: &SeedProfile, candidate: &Track) -> f32;
}

/// Weighted count of the attributes a candidate shares with the seed.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SharedAttributeScorer {
    pub artist_weight: f32,
    pub release_weight: f32,
    pub genre_weight: f32,
}

impl From<&PlaylistConfig> for SharedAttributeScorer {
    fn from(config: &PlaylistConfig) -> Self {
        Self {
            artist_weight: config.artist_weight,
            release_weight: config.release_weight,
            genre_weight: config.genre_weight,
        }
    }
}

impl Default for SharedAttributeScorer {
    fn default() -> Self {
        Self::from(&PlaylistConfig::default())
    }
}

impl SimilarityScorer for SharedAttributeScorer {
    fn score(&self, seed: &SeedProfile, candidate: &Track) -> f32 {
        let genres: u32 = candidate
            .genre_ids
            .iter()
            .map(|id| seed.genre_count(*id))
            .sum();
        self.artist_weight * seed.artist_count(candidate.artist_id) as f32
            + self.release_weight * seed.release_count(candidate.release_id) as f32
            + self.genre_weight * genres as f32
    }
}

/// Proposes tracks to append to an existing track list.
#[derive(Clone)]
pub struct PlaylistExtender {
    library: Arc<LibraryGraph>,
    scorer: Arc<dyn SimilarityScorer>,
}

impl PlaylistExtender {
    pub fn new(library: Arc<LibraryGraph>, scorer: Arc<dyn SimilarityScorer>) -> Self {
        Self { library, scorer }
    }

    /// At most `max_count` tracks not already in the list, best first.
    ///
    /// Ties are broken by track id, so the same library state always yields
    /// the same answer. An unknown or empty list yields nothing.
    #[tracing::instrument(skip(self))]
    pub async fn extend(
        &self,
        tracklist_id: TrackListId,
        max_count: usize,
    ) -> PlaylistResult<Vec<Track>> {
        if max_count == 0 {
            return Ok(Vec::new());
        }
        let Some(seed_tracks) = self.library.tracklist_tracks(tracklist_id).await? else {
            debug!(target: "playlist", "unknown tracklist");
            return Ok(Vec::new());
        };

        let sentinels = self.library.sentinels().await?;
        let seed = SeedProfile::from_tracks(&seed_tracks, &sentinels);
        if seed.is_empty() {
            debug!(target: "playlist", seeds = seed_tracks.len(), "no usable seed attributes");
            return Ok(Vec::new());
        }

        let listed: Vec<TrackId> = seed_tracks.iter().map(|t| t.id).collect();
        let candidates = self.library.related_tracks(&seed.filter(), &listed).await?;
        let considered = candidates.len();

        let mut scored: Vec<(f32, Track)> = candidates
            .into_iter()
            .filter(|track| !listed.contains(&track.id))
            .map(|track| (self.scorer.score(&seed, &track), track))
            .filter(|(score, _)| *score > 0.0)
            .collect();
        scored.sort_by(|(score_a, a), (score_b, b)| rank(*score_a, a, *score_b, b));
        scored.dedup_by(|(_, a), (_, b)| a.id == b.id);
        scored.truncate(max_count);

        info!(
            target: "playlist",
            seeds = seed_tracks.len(),
            considered,
            proposed = scored.len(),
            "extended tracklist"
        );
        Ok(scored.into_iter().map(|(_, track)| track).collect())
    }
}

/// Higher score first, then lower track id.
fn rank(score_a: f32, a: &Track, score_b: f32, b: &Track) -> Ordering {
    score_b.total_cmp(&score_a).then_with(|| a.id.cmp(&b.id))
}
