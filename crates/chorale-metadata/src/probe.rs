// SPDX-License-Identifier: GPL-3.0-or-later

//! Decoder seam.
//!
//! The core never reads audio containers itself. An [`AudioProbe`] reports the
//! ordered tag list and stream facts of a file, or fails for the whole file.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;
use tokio::process::Command;
use tracing::debug;

use crate::error::ProbeError;
use crate::model::AudioStream;
use crate::tag_map::TagMap;

/// What the decoding collaborator knows about one file.
#[derive(Debug, Clone, Default)]
pub struct DecodedAudio {
    pub tags: TagMap,
    pub duration: Duration,
    pub streams: Vec<AudioStream>,
    pub has_cover: bool,
}

#[async_trait]
pub trait AudioProbe: Send + Sync {
    async fn probe(&self, path: &Path) -> Result<DecodedAudio, ProbeError>;
}

/// Runs `ffprobe` and reads its JSON report.
///
/// Tag keys are upper-cased, so `title` from an ID3 file and `TITLE` from a
/// Vorbis comment land on the same alias.
#[derive(Debug, Clone)]
pub struct FfprobeProbe {
    program: PathBuf,
}

impl FfprobeProbe {
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
        }
    }
}

impl Default for FfprobeProbe {
    fn default() -> Self {
        Self::new("ffprobe")
    }
}

#[async_trait]
impl AudioProbe for FfprobeProbe {
    async fn probe(&self, path: &Path) -> Result<DecodedAudio, ProbeError> {
        debug!(target: "metadata", path = %path.display(), "running ffprobe");

        let output = Command::new(&self.program)
            .args([
                "-v",
                "error",
                "-print_format",
                "json",
                "-show_format",
                "-show_streams",
            ])
            .arg(path)
            .output()
            .await
            .map_err(|source| ProbeError::Launch {
                program: self.program.display().to_string(),
                source,
            })?;

        if !output.status.success() {
            return Err(ProbeError::Undecodable {
                path: path.display().to_string(),
                detail: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }

        parse_ffprobe_report(&output.stdout)
    }
}

#[derive(Debug, Deserialize)]
struct FfprobeReport {
    #[serde(default)]
    streams: Vec<FfprobeStream>,
    format: Option<FfprobeFormat>,
}

#[derive(Debug, Deserialize)]
struct FfprobeStream {
    codec_type: Option<String>,
    bit_rate: Option<String>,
    #[serde(default)]
    disposition: HashMap<String, i64>,
    #[serde(default)]
    tags: serde_json::Map<String, serde_json::Value>,
}

#[derive(Debug, Deserialize)]
struct FfprobeFormat {
    duration: Option<String>,
    #[serde(default)]
    tags: serde_json::Map<String, serde_json::Value>,
}

/// Convert an `ffprobe -print_format json -show_format -show_streams` report.
///
/// Container tags come first, then the tags of each audio stream (Ogg and
/// Opus keep their comments on the stream).
pub fn parse_ffprobe_report(json: &[u8]) -> Result<DecodedAudio, ProbeError> {
    let report: FfprobeReport = serde_json::from_slice(json)?;
    let Some(format) = report.format else {
        return Err(ProbeError::MissingFormat);
    };

    let mut decoded = DecodedAudio {
        duration: format
            .duration
            .as_deref()
            .and_then(|d| d.trim().parse::<f64>().ok())
            .and_then(|secs| Duration::try_from_secs_f64(secs).ok())
            .unwrap_or_default(),
        ..DecodedAudio::default()
    };
    push_tags(&mut decoded.tags, &format.tags);

    for stream in &report.streams {
        if stream.disposition.get("attached_pic").copied().unwrap_or(0) != 0 {
            decoded.has_cover = true;
            continue;
        }
        if stream.codec_type.as_deref() != Some("audio") {
            continue;
        }
        decoded.streams.push(AudioStream {
            bitrate: stream
                .bit_rate
                .as_deref()
                .and_then(|b| b.parse().ok())
                .unwrap_or(0),
        });
        push_tags(&mut decoded.tags, &stream.tags);
    }

    Ok(decoded)
}

fn push_tags(tags: &mut TagMap, raw: &serde_json::Map<String, serde_json::Value>) {
    for (key, value) in raw {
        if let Some(value) = value.as_str() {
            tags.push(key.to_ascii_uppercase(), value);
        }
    }
}
