//! Playlist fan-out.
//!
//! The playlist listing is loaded once per run and split by owner. Every
//! playlist gets a row in the aggregate file of its side and a track file of
//! its own, even when it has no tracks. Nothing of a side is written before
//! all of its playlists have been fetched.

use std::{collections::HashSet, fmt, path::PathBuf};

use tokio::sync::OnceCell;

use crate::{
    error::BackupError,
    info,
    spotify::pager::{Cursor, Paginator},
    types::Playlist,
    utils::sanitize_file_stem,
    warning,
};

use super::{
    BackupContext, PAGE_LIMIT, SectionReport, SectionStatus, SkippedPlaylist,
    normalize::{self, EntityKind, PLAYLIST_SCHEMA, TRACK_SCHEMA},
    writer::CsvFile,
};

/// Page size of playlist track listings.
pub const PLAYLIST_TRACKS_LIMIT: u32 = 100;

/// Playlists of the current user, loaded on first use and shared by the user
/// and foreign sections.
pub type PlaylistListing = OnceCell<Vec<Playlist>>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Ownership {
    /// Created by the authenticated user.
    User,
    /// Followed, owned by someone else.
    Foreign,
}

impl fmt::Display for Ownership {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Ownership::User => write!(f, "user"),
            Ownership::Foreign => write!(f, "foreign"),
        }
    }
}

/// Hands out unique file stems for playlist names.
///
/// Names are compared case-insensitively after sanitizing. The first
/// playlist keeps the plain name, later ones get ` (2)`, ` (3)` and so on.
#[derive(Debug, Default)]
pub struct FileNamer {
    used: HashSet<String>,
}

impl FileNamer {
    pub fn assign(&mut self, name: &str) -> String {
        let stem = sanitize_file_stem(name);
        let mut candidate = stem.clone();
        let mut n = 1;
        while !self.used.insert(candidate.to_lowercase()) {
            n += 1;
            candidate = format!("{stem} ({n})");
        }
        candidate
    }
}

/// Loads every playlist in the user's library.
pub async fn list_playlists(ctx: &BackupContext) -> Result<Vec<Playlist>, BackupError> {
    info!("Loading playlists...");
    let pager = Paginator::new(
        ctx.api.collection("me/playlists", PAGE_LIMIT),
        ctx.pager.clone(),
    );
    let records = pager.collect_all().await?;

    Ok(records
        .into_iter()
        .map(|record| normalize::lenient::<Playlist>(EntityKind::UserPlaylist, record))
        .collect())
}

/// Writes the aggregate file and the track files of one side.
pub async fn export(
    ctx: &BackupContext,
    listing: &PlaylistListing,
    ownership: Ownership,
    report: &mut SectionReport,
) -> Result<(), BackupError> {
    let all = listing.get_or_try_init(|| list_playlists(ctx)).await?;
    let selected: Vec<&Playlist> = all
        .iter()
        .filter(|p| p.is_owned_by(&ctx.user_id) == (ownership == Ownership::User))
        .collect();
    info!("Found {} {} playlists", selected.len(), ownership);

    let (summary_path, dir) = match ownership {
        Ownership::User => (ctx.tree.user_playlists(), ctx.tree.user_playlist_dir()),
        Ownership::Foreign => (
            ctx.tree.foreign_playlists(),
            ctx.tree.foreign_playlist_dir(),
        ),
    };

    let mut summary = CsvFile::create(summary_path, &PLAYLIST_SCHEMA)?;
    for playlist in &selected {
        summary.push(normalize::playlist_row(playlist))?;
    }

    // track files are only committed once the whole side has been fetched
    let mut track_files = Vec::new();
    if ownership == Ownership::Foreign && !ctx.options.foreign_tracks {
        info!("Skipping tracks of foreign playlists");
    } else {
        let mut names = FileNamer::default();
        for playlist in selected {
            let path = dir.join(format!("{}.csv", names.assign(playlist.display_name())));
            info!(
                "Loading {} playlist: {} ({} songs)",
                ownership,
                playlist.display_name(),
                playlist.tracks.total.render()
            );

            match fetch_tracks(ctx, playlist, path).await {
                Ok(file) => track_files.push(file),
                Err(e) if e.stops_section() => return Err(e),
                Err(e) => {
                    warning!("Skipping playlist {}: {}", playlist.display_name(), e);
                    report.skipped.push(SkippedPlaylist {
                        id: playlist.id.clone().unwrap_or_default(),
                        name: playlist.display_name().to_string(),
                        reason: e.to_string(),
                    });
                }
            }
        }
    }

    report.status = SectionStatus::Writing;
    for file in track_files {
        report.rows += file.commit().await?;
        report.files += 1;
    }
    report.rows += summary.commit().await?;
    report.files += 1;
    Ok(())
}

/// Fetches all tracks of `playlist` into an uncommitted file at `path`.
async fn fetch_tracks(
    ctx: &BackupContext,
    playlist: &Playlist,
    path: PathBuf,
) -> Result<CsvFile, BackupError> {
    let href = match (&playlist.tracks.href, &playlist.id) {
        (Some(href), _) => href.clone(),
        (None, Some(id)) => format!("playlists/{id}/tracks"),
        (None, None) => {
            return Err(BackupError::Unavailable {
                cursor: Cursor::First,
            });
        }
    };

    let mut pager = Paginator::new(
        ctx.api.collection(&href, PLAYLIST_TRACKS_LIMIT),
        ctx.pager.clone(),
    );
    let mut file = CsvFile::create(path, &TRACK_SCHEMA)?;
    while let Some(record) = pager.next_record().await {
        file.push(normalize::normalize(EntityKind::Track, record?))?;
    }
    Ok(file)
}
