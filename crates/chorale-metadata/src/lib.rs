// SPDX-License-Identifier: GPL-3.0-or-later

//! Tag normalization: turns the raw, format-specific tag soup reported by an
//! audio decoder into a structured [`TrackMetadata`] descriptor.
//!
//! - [`TagMap`]: ordered multi-map of decoded tags
//! - [`coercion`]: typed readers with "absent on failure" semantics
//! - [`TagNormalizer`]: alias tables and per-field rules
//! - [`probe`]: the decoder seam and its `ffprobe` adapter

pub mod coercion;
pub mod error;
pub mod model;
pub mod normalizer;
pub mod probe;
pub mod tag_map;

pub use error::{ParseError, ProbeError};
pub use model::{AlbumInfo, ArtistCredit, AudioStream, Clusters, TrackMetadata};
pub use normalizer::TagNormalizer;
pub use probe::{AudioProbe, DecodedAudio, FfprobeProbe};
pub use tag_map::TagMap;
