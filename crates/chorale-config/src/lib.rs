// SPDX-License-Identifier: GPL-3.0-or-later
use std::path::Path;

use anyhow::Result;
use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};
use tracing::info;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    pub url: String,
    pub pool_max_size: u32,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: "sqlite://chorale.db".to_string(),
            pool_max_size: 16,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TelemetryConfig {
    pub log_level: String,
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
        }
    }
}

fn tags(keys: &[&str]) -> Vec<String> {
    keys.iter().map(|k| k.to_string()).collect()
}

/// Tag alias tables consumed by the tag normalizer.
///
/// Every list is a fallback chain: the first tag of the decoded file (in file
/// order) whose key appears in the list wins.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaggingConfig {
    pub title: Vec<String>,
    pub track: Vec<String>,
    pub disc: Vec<String>,
    pub date: Vec<String>,
    pub original_date: Vec<String>,
    pub acoustid: Vec<String>,
    pub release_track_mbid: Vec<String>,
    pub recording_mbid: Vec<String>,
    pub disc_subtitle: Vec<String>,
    /// Multi-valued artist tag, split on `/` and `;`.
    pub artists: Vec<String>,
    /// Single-valued artist tag, used only when no multi-valued tag exists.
    pub artist: Vec<String>,
    pub artist_mbid: Vec<String>,
    pub album: Vec<String>,
    pub album_mbid: Vec<String>,
    pub album_artist: Vec<String>,
    pub album_artist_mbid: Vec<String>,
    /// Tag keys collected as free-form clusters (genre, mood, ...).
    pub cluster_types: Vec<String>,
    /// Cluster types whose values become genre rows in the library.
    pub genre_cluster_types: Vec<String>,
}

impl Default for TaggingConfig {
    fn default() -> Self {
        Self {
            title: tags(&["TITLE"]),
            track: tags(&["TRACK"]),
            disc: tags(&["DISC"]),
            date: tags(&["DATE", "YEAR", "WM/YEAR"]),
            // ID3v2.4 original release time, ID3v2.3 original release year
            original_date: tags(&["TDOR", "TORY"]),
            acoustid: tags(&["ACOUSTID ID"]),
            release_track_mbid: tags(&["MUSICBRAINZ RELEASE TRACK ID", "MUSICBRAINZ_RELEASETRACKID"]),
            recording_mbid: tags(&["MUSICBRAINZ_TRACKID", "MUSICBRAINZ/TRACK ID"]),
            disc_subtitle: tags(&["TSST", "DISCSUBTITLE", "SETSUBTITLE"]),
            artists: tags(&["ARTISTS"]),
            artist: tags(&["ARTIST"]),
            artist_mbid: tags(&[
                "MUSICBRAINZ ARTIST ID",
                "MUSICBRAINZ_ARTISTID",
                "MUSICBRAINZ/ARTIST ID",
            ]),
            album: tags(&["ALBUM"]),
            album_mbid: tags(&[
                "MUSICBRAINZ ALBUM ID",
                "MUSICBRAINZ_ALBUMID",
                "MUSICBRAINZ/ALBUM ID",
            ]),
            album_artist: tags(&["ALBUM_ARTIST"]),
            album_artist_mbid: tags(&["MUSICBRAINZ ALBUM ARTIST ID", "MUSICBRAINZ/ALBUM ARTIST ID"]),
            cluster_types: tags(&["GENRE", "MOOD"]),
            genre_cluster_types: tags(&["GENRE"]),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScanConfig {
    pub max_concurrent_files: usize,
    pub ffprobe_path: String,
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            max_concurrent_files: 8,
            ffprobe_path: "ffprobe".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlaylistConfig {
    pub artist_weight: f32,
    pub release_weight: f32,
    pub genre_weight: f32,
    pub default_max_count: usize,
}

impl Default for PlaylistConfig {
    fn default() -> Self {
        Self {
            artist_weight: 3.0,
            release_weight: 2.0,
            genre_weight: 1.0,
            default_max_count: 10,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct AppConfig {
    pub database: DatabaseConfig,
    pub telemetry: TelemetryConfig,
    pub tagging: TaggingConfig,
    pub scan: ScanConfig,
    pub playlist: PlaylistConfig,
}

/// Load configuration from defaults, optional TOML file, and environment overrides (prefix: CHORALE_).
pub fn load(config_path: Option<&Path>) -> Result<AppConfig> {
    let mut figment = Figment::from(Serialized::defaults(AppConfig::default()));

    if let Some(path) = config_path {
        figment = figment.merge(Toml::file(path));
    }

    figment = figment.merge(Env::prefixed("CHORALE_").split("__"));

    let config: AppConfig = figment.extract()?;
    info!(target: "config", "configuration loaded");
    Ok(config)
}
