// SPDX-License-Identifier: GPL-3.0-or-later

use std::collections::{BTreeMap, BTreeSet};
use std::time::Duration;

use chorale_domain::{Mbid, ReleaseDate};
use serde::{Deserialize, Serialize};

/// Cluster type name (e.g. `GENRE`) to the set of labels found for it.
pub type Clusters = BTreeMap<String, BTreeSet<String>>;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArtistCredit {
    pub name: String,
    pub mbid: Option<Mbid>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AlbumInfo {
    pub name: String,
    pub mbid: Option<Mbid>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AudioStream {
    /// Bits per second, 0 when the decoder did not report one.
    pub bitrate: u32,
}

/// Structured description of one audio file, ready for ingestion.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrackMetadata {
    pub title: Option<String>,
    pub track_number: Option<u32>,
    pub total_track: Option<u32>,
    pub disc_number: Option<u32>,
    pub total_disc: Option<u32>,
    pub disc_subtitle: Option<String>,
    pub date: Option<ReleaseDate>,
    pub original_date: Option<ReleaseDate>,
    pub acoustid: Option<Mbid>,
    /// MusicBrainz release-track id (one position on one release).
    pub track_mbid: Option<Mbid>,
    /// MusicBrainz recording id (the performance, shared across releases).
    pub recording_mbid: Option<Mbid>,
    pub clusters: Clusters,
    /// Genre tag text as found in the file.
    pub genre_list: Option<String>,
    pub artists: Vec<ArtistCredit>,
    pub album: Option<AlbumInfo>,
    pub album_artists: Vec<ArtistCredit>,
    pub duration: Duration,
    pub audio_streams: Vec<AudioStream>,
    pub has_cover: bool,
}
