// SPDX-License-Identifier: GPL-3.0-or-later
use chrono::{DateTime, Datelike, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use std::time::Duration;
use uuid::Uuid;

macro_rules! entity_id {
    ($name:ident) => {
        #[derive(
            Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
        )]
        pub struct $name(pub Uuid);

        impl $name {
            pub fn new() -> Self {
                Self(Uuid::new_v4())
            }

            pub fn from_uuid(uuid: Uuid) -> Self {
                Self(uuid)
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::new()
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl FromStr for $name {
            type Err = uuid::Error;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                Uuid::parse_str(s).map(Self)
            }
        }
    };
}

entity_id!(GenreId);
entity_id!(ArtistId);
entity_id!(ReleaseId);
entity_id!(TrackId);
entity_id!(TrackListId);

/// MusicBrainz identifier.
///
/// Only the canonical hyphenated form (`8-4-4-4-12` hex digits) is accepted;
/// tag writers that emit braces, URNs or bare hex are treated as malformed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Mbid(Uuid);

impl Mbid {
    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InvalidMbid(pub String);

impl std::fmt::Display for InvalidMbid {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "invalid MusicBrainz identifier: {:?}", self.0)
    }
}

impl std::error::Error for InvalidMbid {}

impl FromStr for Mbid {
    type Err = InvalidMbid;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let hyphenated = s.len() == 36
            && s.char_indices().all(|(i, c)| match i {
                8 | 13 | 18 | 23 => c == '-',
                _ => c.is_ascii_hexdigit(),
            });
        if !hyphenated {
            return Err(InvalidMbid(s.to_string()));
        }
        Uuid::parse_str(s)
            .map(Self)
            .map_err(|_| InvalidMbid(s.to_string()))
    }
}

impl std::fmt::Display for Mbid {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0.hyphenated())
    }
}

/// A release date as precise as the tag that carried it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReleaseDate {
    pub year: i32,
    pub month: Option<u32>,
    pub day: Option<u32>,
}

/// Years outside this range are tagging noise rather than release dates.
const PLAUSIBLE_YEARS: std::ops::RangeInclusive<i32> = 1900..=2100;

impl ReleaseDate {
    pub fn new(year: i32, month: Option<u32>, day: Option<u32>) -> Self {
        Self { year, month, day }
    }

    /// Read `YYYY`, `YYYY-MM`, `YYYY-MM-DD` (also `/`-separated or without
    /// separators) or an RFC 3339 timestamp. Anything else, or a calendar
    /// date that does not exist, gives `None`.
    pub fn parse_str(raw: &str) -> Option<Self> {
        let raw = raw.trim();

        if raw.len() > 10 {
            let stamp = DateTime::parse_from_rfc3339(raw).ok()?;
            let date = stamp.date_naive();
            return Self::checked(date.year(), Some(date.month()), Some(date.day()));
        }

        let fields: Vec<&str> = if raw.contains(['-', '/']) {
            raw.split(['-', '/']).collect()
        } else if raw.is_ascii() {
            match raw.len() {
                4 => vec![raw],
                6 => vec![&raw[..4], &raw[4..]],
                8 => vec![&raw[..4], &raw[4..6], &raw[6..]],
                _ => return None,
            }
        } else {
            return None;
        };
        if fields.iter().any(|f| f.is_empty() || !f.bytes().all(|b| b.is_ascii_digit())) {
            return None;
        }

        let year = fields.first()?.parse().ok()?;
        match &fields[1..] {
            [] => Self::checked(year, None, None),
            [month] => Self::checked(year, Some(month.parse().ok()?), None),
            [month, day] => Self::checked(year, Some(month.parse().ok()?), Some(day.parse().ok()?)),
            _ => None,
        }
    }

    fn checked(year: i32, month: Option<u32>, day: Option<u32>) -> Option<Self> {
        if !PLAUSIBLE_YEARS.contains(&year) {
            return None;
        }
        let valid = match (month, day) {
            (None, None) => true,
            (Some(m), None) => (1..=12).contains(&m),
            (Some(m), Some(d)) => NaiveDate::from_ymd_opt(year, m, d).is_some(),
            (None, Some(_)) => false,
        };
        valid.then(|| Self::new(year, month, day))
    }

    /// Stored form; keeps the precision the date was read with.
    pub fn to_iso8601(&self) -> String {
        let mut out = format!("{:04}", self.year);
        if let Some(month) = self.month {
            out.push_str(&format!("-{month:02}"));
            if let Some(day) = self.day {
                out.push_str(&format!("-{day:02}"));
            }
        }
        out
    }
}

// ============================================================================
// Names
// ============================================================================

/// Longest name stored for any entity; longer names are truncated.
pub const MAX_NAME_LENGTH: usize = 128;

/// Reserved name of the sentinel row of every named entity kind.
pub const NONE_NAME: &str = "<None>";

/// Truncate to [`MAX_NAME_LENGTH`] characters (not bytes).
pub fn truncate_name(name: &str) -> String {
    match name.char_indices().nth(MAX_NAME_LENGTH) {
        Some((cut, _)) => name[..cut].to_string(),
        None => name.to_string(),
    }
}

// ============================================================================
// Entities
// ============================================================================

/// An entity whose identity is its (truncated) name.
pub trait NamedEntity: Clone + Send + Sync + 'static {
    fn from_parts(id: Uuid, name: String) -> Self;
    fn uuid(&self) -> Uuid;
    fn name(&self) -> &str;

    /// True for the distinguished "unknown" row of this kind.
    fn is_none(&self) -> bool {
        self.name() == NONE_NAME
    }
}

macro_rules! named_entity {
    ($entity:ident, $id:ident) => {
        #[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
        pub struct $entity {
            pub id: $id,
            pub name: String,
        }

        impl $entity {
            pub fn new(name: &str) -> Self {
                Self {
                    id: $id::new(),
                    name: truncate_name(name),
                }
            }
        }

        impl NamedEntity for $entity {
            fn from_parts(id: Uuid, name: String) -> Self {
                Self {
                    id: $id::from_uuid(id),
                    name,
                }
            }

            fn uuid(&self) -> Uuid {
                self.id.0
            }

            fn name(&self) -> &str {
                &self.name
            }
        }
    };
}

named_entity!(Artist, ArtistId);
named_entity!(Release, ReleaseId);

/// Cluster type of plain genre labels.
pub const GENRE_CLUSTER: &str = "GENRE";

/// One label of one cluster type, such as `GENRE/House` or `MOOD/Calm`.
///
/// Identity is the (cluster type, name) pair. Seen as a [`NamedEntity`], a
/// genre is a label of [`GENRE_CLUSTER`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Genre {
    pub id: GenreId,
    pub cluster_type: String,
    pub name: String,
}

impl Genre {
    pub fn new(name: &str) -> Self {
        Self::in_cluster(GENRE_CLUSTER, name)
    }

    pub fn in_cluster(cluster_type: &str, name: &str) -> Self {
        Self {
            id: GenreId::new(),
            cluster_type: cluster_type.to_string(),
            name: truncate_name(name),
        }
    }
}

impl NamedEntity for Genre {
    fn from_parts(id: Uuid, name: String) -> Self {
        Self {
            id: GenreId::from_uuid(id),
            cluster_type: GENRE_CLUSTER.to_string(),
            name,
        }
    }

    fn uuid(&self) -> Uuid {
        self.id.0
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn is_none(&self) -> bool {
        self.cluster_type == GENRE_CLUSTER && self.name == NONE_NAME
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Track {
    pub id: TrackId,
    pub path: String,
    pub name: String,
    pub track_number: Option<u32>,
    pub disc_number: Option<u32>,
    pub duration_ms: u64,
    pub date: Option<ReleaseDate>,
    pub original_date: Option<ReleaseDate>,
    /// Genre tag text exactly as found in the file.
    pub genre_list: String,
    pub last_write: DateTime<Utc>,
    pub checksum: Vec<u8>,
    pub artist_id: ArtistId,
    pub release_id: ReleaseId,
    /// Cluster rows of every type the track carries.
    pub genre_ids: Vec<GenreId>,
}

impl Track {
    pub fn duration(&self) -> Duration {
        Duration::from_millis(self.duration_ms)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrackList {
    pub id: TrackListId,
    pub name: String,
    pub created_at: DateTime<Utc>,
}

impl TrackList {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            id: TrackListId::new(),
            name: name.into(),
            created_at: Utc::now(),
        }
    }
}

/// Facts about the source file supplied by the scanning side.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileFacts {
    pub last_write: DateTime<Utc>,
    pub checksum: Vec<u8>,
}

// ============================================================================
// Tests
// ============================================================================
