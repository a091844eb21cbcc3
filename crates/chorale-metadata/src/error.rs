// SPDX-License-Identifier: GPL-3.0-or-later

use thiserror::Error;

/// Failure of the decoding collaborator for a whole file.
#[derive(Debug, Error)]
pub enum ProbeError {
    #[error("failed to launch {program}: {source}")]
    Launch {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("could not decode {path}: {detail}")]
    Undecodable { path: String, detail: String },

    #[error("probe report has no format section")]
    MissingFormat,

    #[error("invalid probe report: {0}")]
    InvalidReport(#[from] serde_json::Error),
}

/// Errors that abort tag parsing for a file.
///
/// Field-level problems never show up here: a malformed field is simply left
/// unset on the descriptor.
#[derive(Debug, Error)]
pub enum ParseError {
    #[error("no metadata available for {path}: {source}")]
    Decode {
        path: String,
        #[source]
        source: ProbeError,
    },
}

pub type ParseResult<T> = Result<T, ParseError>;
