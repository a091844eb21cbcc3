// SPDX-License-Identifier: GPL-3.0-or-later
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use chorale_application::{AppState, ImportOutcome};
use chorale_config::load as load_config;
use chorale_domain::{TrackId, TrackListId};
use clap::{Parser, Subcommand};
use tracing::{info, warn};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};
use walkdir::WalkDir;

/// Extensions handed to the probe when a directory is walked.
const AUDIO_EXTENSIONS: &[&str] = &[
    "aac", "aif", "aiff", "ape", "flac", "m4a", "mp3", "mpc", "ogg", "opus", "wav", "wma", "wv",
];

/// Chorale music library
#[derive(Parser, Debug)]
#[command(name = "chorale", author, version, about, long_about = None)]
struct Cli {
    /// Configuration file (TOML)
    #[arg(long, global = true, env = "CHORALE_CONFIG")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Import audio files and directories into the library
    Scan {
        /// Files or directories to import
        #[arg(required = true)]
        paths: Vec<PathBuf>,
    },
    /// Manage tracklists
    Tracklist {
        #[command(subcommand)]
        command: TracklistCommand,
    },
    /// Propose tracks that fit an existing tracklist
    Extend {
        tracklist_id: TrackListId,
        /// Maximum number of proposals (defaults to playlist.default_max_count)
        #[arg(long)]
        max: Option<usize>,
        /// Append the proposals to the tracklist
        #[arg(long)]
        append: bool,
    },
    /// List artists, releases and cluster labels no track references
    Orphans {
        /// Delete them instead of listing
        #[arg(long)]
        delete: bool,
    },
}

#[derive(Subcommand, Debug)]
enum TracklistCommand {
    /// Create a tracklist from already imported files
    Create {
        name: String,
        paths: Vec<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let config = load_config(cli.config.as_deref())?;
    init_tracing(&config.telemetry.log_level);

    let state = AppState::initialize(config).await?;

    match cli.command {
        Command::Scan { paths } => scan(&state, &paths).await,
        Command::Tracklist {
            command: TracklistCommand::Create { name, paths },
        } => create_tracklist(&state, &name, &paths).await,
        Command::Extend {
            tracklist_id,
            max,
            append,
        } => extend(&state, tracklist_id, max, append).await,
        Command::Orphans { delete } => orphans(&state, delete).await,
    }
}

fn init_tracing(default_level: &str) {
    let fmt_layer = fmt::layer().with_target(true).with_thread_names(true).with_level(true);
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(default_level))
        .unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt_layer)
        .init();
}

async fn scan(state: &AppState, roots: &[PathBuf]) -> Result<()> {
    let mut files = Vec::new();
    for root in roots {
        collect_audio_files(&absolute(root), &mut files)?;
    }
    info!(target: "cli", count = files.len(), "scanning files");

    let results = state.importer.import_files(files).await;
    let (mut imported, mut unchanged, mut skipped, mut failed) = (0, 0, 0, 0);
    for (path, result) in &results {
        match result {
            Ok(ImportOutcome::Imported(_)) => imported += 1,
            Ok(ImportOutcome::Unchanged(_)) => unchanged += 1,
            Ok(ImportOutcome::NoMetadata) => skipped += 1,
            Err(error) => {
                failed += 1;
                warn!(target: "cli", path = %path.display(), error = %error, "import failed");
            }
        }
    }

    println!("imported {imported}, unchanged {unchanged}, no metadata {skipped}, failed {failed}");
    Ok(())
}

async fn create_tracklist(state: &AppState, name: &str, paths: &[PathBuf]) -> Result<()> {
    let mut ids: Vec<TrackId> = Vec::with_capacity(paths.len());
    for path in paths {
        let path = absolute(path);
        match state.library.track_by_path(&path).await? {
            Some(track) => ids.push(track.id),
            None => bail!("{} is not in the library; scan it first", path.display()),
        }
    }

    let list = state.library.create_tracklist(name, &ids).await?;
    println!("{}\t{}\t{} tracks", list.id, list.name, ids.len());
    Ok(())
}

async fn extend(
    state: &AppState,
    tracklist_id: TrackListId,
    max: Option<usize>,
    append: bool,
) -> Result<()> {
    let max_count = max.unwrap_or(state.config.playlist.default_max_count);
    let proposed = state.extender.extend(tracklist_id, max_count).await?;

    for track in &proposed {
        println!("{}\t{}\t{}", track.id, track.name, track.path);
    }

    if append && !proposed.is_empty() {
        let ids: Vec<TrackId> = proposed.iter().map(|t| t.id).collect();
        state
            .library
            .append_to_tracklist(tracklist_id, &ids)
            .await
            .with_context(|| format!("append to tracklist {tracklist_id}"))?;
        info!(target: "cli", %tracklist_id, appended = ids.len(), "tracklist extended");
    }
    Ok(())
}

async fn orphans(state: &AppState, delete: bool) -> Result<()> {
    if delete {
        let counts = state.library.delete_orphans().await?;
        println!(
            "deleted {} artists, {} releases, {} genres",
            counts.artists, counts.releases, counts.genres
        );
        return Ok(());
    }

    let orphans = state.library.orphans().await?;
    for artist in &orphans.artists {
        println!("artist\t{}\t{}", artist.id, artist.name);
    }
    for release in &orphans.releases {
        println!("release\t{}\t{}", release.id, release.name);
    }
    for genre in &orphans.genres {
        println!("{}\t{}\t{}", genre.cluster_type.to_lowercase(), genre.id, genre.name);
    }
    Ok(())
}

/// Tracks are keyed by the path they were imported under, so both `scan`
/// and `tracklist create` resolve against the working directory first.
fn absolute(path: &Path) -> PathBuf {
    fs::canonicalize(path).unwrap_or_else(|_| path.to_path_buf())
}

/// Files are taken as given; directories are walked for known audio
/// extensions in name order. Symlinks below a root are not followed, so each
/// file is reached through one path only.
fn collect_audio_files(path: &Path, out: &mut Vec<PathBuf>) -> Result<()> {
    if !path.is_dir() {
        out.push(path.to_path_buf());
        return Ok(());
    }

    for entry in WalkDir::new(path).sort_by_file_name() {
        let entry = match entry {
            Ok(entry) => entry,
            Err(error) => {
                warn!(target: "cli", root = %path.display(), error = %error, "skipping unreadable entry");
                continue;
            }
        };
        if entry.file_type().is_file() && is_audio_file(entry.path()) {
            out.push(entry.into_path());
        }
    }
    Ok(())
}

fn is_audio_file(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| AUDIO_EXTENSIONS.contains(&ext.to_ascii_lowercase().as_str()))
        .unwrap_or(false)
}
