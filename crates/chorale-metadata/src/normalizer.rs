// SPDX-License-Identifier: GPL-3.0-or-later

use std::collections::BTreeSet;
use std::path::Path;

use chorale_config::TaggingConfig;
use chorale_domain::{Mbid, ReleaseDate};
use tracing::{debug, trace, warn};

use crate::coercion::{read_mbid_list, read_position, split_tokens};
use crate::error::{ParseError, ParseResult};
use crate::model::{AlbumInfo, ArtistCredit, Clusters, TrackMetadata};
use crate::probe::{AudioProbe, DecodedAudio};
use crate::tag_map::TagMap;

const CLUSTER_DELIMITERS: &[char] = &['/', ',', ';'];
const ARTIST_DELIMITERS: &[char] = &['/', ';'];

/// Maps decoded tags to a [`TrackMetadata`] using configured alias tables.
///
/// Stateless apart from its rules, so one instance can be shared by any
/// number of concurrent parses.
#[derive(Debug, Clone)]
pub struct TagNormalizer {
    rules: TaggingConfig,
}

impl TagNormalizer {
    pub fn new(rules: TaggingConfig) -> Self {
        Self { rules }
    }

    pub fn rules(&self) -> &TaggingConfig {
        &self.rules
    }

    /// Decode `path` with `probe` and normalize the result.
    ///
    /// A decode failure aborts the whole parse; no partial descriptor is
    /// produced.
    pub async fn parse(&self, probe: &dyn AudioProbe, path: &Path) -> ParseResult<TrackMetadata> {
        let decoded = probe.probe(path).await.map_err(|source| {
            warn!(target: "metadata", path = %path.display(), error = %source, "decode failed");
            ParseError::Decode {
                path: path.display().to_string(),
                source,
            }
        })?;

        debug!(target: "metadata", path = %path.display(), tags = decoded.tags.len(), "decoded file");
        Ok(self.normalize(&decoded))
    }

    pub fn normalize(&self, decoded: &DecodedAudio) -> TrackMetadata {
        let tags = &decoded.tags;
        let rules = &self.rules;

        for (tag, value) in tags.iter() {
            trace!(target: "metadata", tag, value, "tag");
        }

        let (track_number, total_track) = tags
            .find_first(&rules.track)
            .map(read_position)
            .unwrap_or_default();
        let (disc_number, total_disc) = tags
            .find_first(&rules.disc)
            .map(read_position)
            .unwrap_or_default();

        TrackMetadata {
            title: tags.find_first(&rules.title).map(str::to_string),
            track_number,
            total_track,
            disc_number,
            total_disc,
            disc_subtitle: tags.find_first(&rules.disc_subtitle).map(str::to_string),
            date: tags.find_first_as::<ReleaseDate, _>(&rules.date),
            original_date: tags.find_first_as::<ReleaseDate, _>(&rules.original_date),
            acoustid: tags.find_first_as::<Mbid, _>(&rules.acoustid),
            track_mbid: tags.find_first_as::<Mbid, _>(&rules.release_track_mbid),
            recording_mbid: tags.find_first_as::<Mbid, _>(&rules.recording_mbid),
            clusters: self.clusters(tags),
            genre_list: self.genre_list(tags),
            artists: self.artists(tags),
            album: self.album(tags),
            album_artists: self.album_artists(tags),
            duration: decoded.duration,
            audio_streams: decoded.streams.clone(),
            has_cover: decoded.has_cover,
        }
    }

    fn clusters(&self, tags: &TagMap) -> Clusters {
        let mut clusters = Clusters::new();
        for (tag, value) in tags.iter() {
            if !self.rules.cluster_types.iter().any(|t| t == tag) {
                continue;
            }
            let labels = split_tokens(value, CLUSTER_DELIMITERS);
            if labels.is_empty() {
                continue;
            }
            clusters
                .entry(tag.to_string())
                .or_insert_with(BTreeSet::new)
                .extend(labels);
        }
        clusters
    }

    fn genre_list(&self, tags: &TagMap) -> Option<String> {
        let raw: Vec<&str> = tags
            .iter()
            .filter(|(tag, _)| self.rules.genre_cluster_types.iter().any(|t| t == tag))
            .map(|(_, value)| value)
            .collect();
        (!raw.is_empty()).then(|| raw.join("; "))
    }

    fn artists(&self, tags: &TagMap) -> Vec<ArtistCredit> {
        // The multi-valued tag is split; the single-valued one is one name
        // exactly as written, since names such as "AC/DC" are legitimate there.
        let names = if let Some(value) = tags.find_first(&self.rules.artists) {
            split_tokens(value, ARTIST_DELIMITERS)
        } else if let Some(value) = tags.find_first(&self.rules.artist) {
            if value.trim().is_empty() {
                Vec::new()
            } else {
                vec![value.to_string()]
            }
        } else {
            Vec::new()
        };

        let mbids = tags
            .find_first(&self.rules.artist_mbid)
            .and_then(read_mbid_list)
            .filter(|mbids| mbids.len() == names.len());

        match mbids {
            Some(mbids) => names
                .into_iter()
                .zip(mbids)
                .map(|(name, mbid)| ArtistCredit {
                    name,
                    mbid: Some(mbid),
                })
                .collect(),
            None => names
                .into_iter()
                .map(|name| ArtistCredit { name, mbid: None })
                .collect(),
        }
    }

    fn album(&self, tags: &TagMap) -> Option<AlbumInfo> {
        let name = tags.find_first(&self.rules.album).and_then(non_blank)?;
        Some(AlbumInfo {
            name,
            mbid: tags.find_first_as::<Mbid, _>(&self.rules.album_mbid),
        })
    }

    fn album_artists(&self, tags: &TagMap) -> Vec<ArtistCredit> {
        let Some(name) = tags.find_first(&self.rules.album_artist).and_then(non_blank) else {
            return Vec::new();
        };
        vec![ArtistCredit {
            name,
            mbid: tags.find_first_as::<Mbid, _>(&self.rules.album_artist_mbid),
        }]
    }
}

fn non_blank(value: &str) -> Option<String> {
    let trimmed = value.trim();
    (!trimmed.is_empty()).then(|| trimmed.to_string())
}
