//! # Backup Module
//!
//! Runs the library export: every [`Section`] is fetched through the
//! paginator, normalized into rows and written to its place in the
//! [`BackupTree`].
//!
//! ## Sections
//!
//! ```text
//! Liked Tracks      -> Music/Playlists/Liked.csv
//! Albums            -> Music/Playlists/Albums.csv
//! Artists           -> Music/Playlists/Artists.csv
//! User Playlists    -> Music/Playlists/UserPlaylists.csv + User/<playlist>.csv
//! Foreign Playlists -> Music/Playlists/ForeignPlaylists.csv + Foreign/<playlist>.csv
//! Podcast Episodes  -> Podcasts/Episodes.csv
//! Shows             -> Podcasts/Shows.csv
//! ```
//!
//! Each section moves through `Pending -> Fetching -> Writing -> Done` or ends
//! in `Failed`. A failed section does not stop the others, except for an
//! authorization error: all sections share one token, so the run is
//! cancelled and the remaining sections stay `Pending`.

pub mod layout;
pub mod normalize;
pub mod playlists;
pub mod writer;

use std::fmt;

use futures::{StreamExt, stream};

use crate::{
    error::BackupError,
    info,
    spotify::{
        SpotifyApi,
        pager::{PagerContext, Paginator},
    },
    success,
    types::SectionTableRow,
    warning,
};

pub use layout::BackupTree;
use normalize::{EntityKind, normalize};
use playlists::{Ownership, PlaylistListing};
use writer::CsvFile;

/// Page size for saved items, followed artists and the playlist listing.
pub const PAGE_LIMIT: u32 = 50;

/// One top-level export unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Section {
    LikedTracks,
    Albums,
    Artists,
    UserPlaylists,
    ForeignPlaylists,
    Episodes,
    Shows,
}

impl Section {
    pub const ALL: [Section; 7] = [
        Section::LikedTracks,
        Section::Albums,
        Section::Artists,
        Section::UserPlaylists,
        Section::ForeignPlaylists,
        Section::Episodes,
        Section::Shows,
    ];

    pub fn kind(self) -> EntityKind {
        match self {
            Section::LikedTracks => EntityKind::Track,
            Section::Albums => EntityKind::Album,
            Section::Artists => EntityKind::Artist,
            Section::UserPlaylists => EntityKind::UserPlaylist,
            Section::ForeignPlaylists => EntityKind::ForeignPlaylist,
            Section::Episodes => EntityKind::Episode,
            Section::Shows => EntityKind::Show,
        }
    }

    /// Main output file of the section.
    pub fn output(self, tree: &BackupTree) -> std::path::PathBuf {
        match self {
            Section::LikedTracks => tree.liked(),
            Section::Albums => tree.albums(),
            Section::Artists => tree.artists(),
            Section::UserPlaylists => tree.user_playlists(),
            Section::ForeignPlaylists => tree.foreign_playlists(),
            Section::Episodes => tree.episodes(),
            Section::Shows => tree.shows(),
        }
    }

    /// Endpoint and paging envelope of plain collection sections.
    fn endpoint(self) -> Option<(&'static str, Option<&'static str>)> {
        match self {
            Section::LikedTracks => Some(("me/tracks", None)),
            Section::Albums => Some(("me/albums", None)),
            Section::Artists => Some(("me/following?type=artist", Some("artists"))),
            Section::Episodes => Some(("me/episodes", None)),
            Section::Shows => Some(("me/shows", None)),
            Section::UserPlaylists | Section::ForeignPlaylists => None,
        }
    }
}

impl fmt::Display for Section {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Section::LikedTracks => "Liked Tracks",
            Section::Albums => "Albums",
            Section::Artists => "Artists",
            Section::UserPlaylists => "User Playlists",
            Section::ForeignPlaylists => "Foreign Playlists",
            Section::Episodes => "Podcast Episodes",
            Section::Shows => "Shows",
        };
        write!(f, "{label}")
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SectionStatus {
    Pending,
    Fetching,
    Writing,
    Done,
    Failed,
}

impl fmt::Display for SectionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            SectionStatus::Pending => "pending",
            SectionStatus::Fetching => "fetching",
            SectionStatus::Writing => "writing",
            SectionStatus::Done => "done",
            SectionStatus::Failed => "failed",
        };
        write!(f, "{label}")
    }
}

/// A playlist whose track file could not be written.
#[derive(Debug, Clone)]
pub struct SkippedPlaylist {
    pub id: String,
    pub name: String,
    pub reason: String,
}

#[derive(Debug, Clone)]
pub struct SectionReport {
    pub section: Section,
    pub status: SectionStatus,
    /// Data rows written across all files of the section.
    pub rows: usize,
    pub files: usize,
    pub skipped: Vec<SkippedPlaylist>,
    pub error: Option<BackupError>,
}

impl SectionReport {
    pub fn new(section: Section) -> Self {
        SectionReport {
            section,
            status: SectionStatus::Pending,
            rows: 0,
            files: 0,
            skipped: Vec::new(),
            error: None,
        }
    }
}

/// Outcome of a whole run, one entry per section in section order.
#[derive(Debug, Clone, Default)]
pub struct RunReport {
    pub sections: Vec<SectionReport>,
    /// Error that ended the run early (authorization or cancellation).
    pub terminal: Option<BackupError>,
}

impl RunReport {
    pub fn section(&self, section: Section) -> Option<&SectionReport> {
        self.sections.iter().find(|r| r.section == section)
    }

    pub fn terminal_error(&self) -> Option<&BackupError> {
        self.terminal.as_ref()
    }

    pub fn failed(&self) -> impl Iterator<Item = &SectionReport> {
        self.sections
            .iter()
            .filter(|r| r.status == SectionStatus::Failed)
    }

    pub fn is_complete(&self) -> bool {
        self.terminal.is_none()
            && self
                .sections
                .iter()
                .all(|r| r.status == SectionStatus::Done && r.skipped.is_empty())
    }

    pub fn table_rows(&self) -> Vec<SectionTableRow> {
        self.sections
            .iter()
            .map(|r| {
                let details = match (&r.error, r.skipped.len()) {
                    (Some(e), _) => e.to_string(),
                    (None, 0) if r.status == SectionStatus::Pending => "not attempted".to_string(),
                    (None, 0) => String::new(),
                    (None, n) => format!(
                        "skipped {n}: {}",
                        r.skipped
                            .iter()
                            .map(|s| s.name.as_str())
                            .collect::<Vec<_>>()
                            .join(", ")
                    ),
                };
                SectionTableRow {
                    section: r.section.to_string(),
                    status: r.status.to_string(),
                    rows: r.rows,
                    files: r.files,
                    details,
                }
            })
            .collect()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BackupOptions {
    /// Sections processed at the same time.
    pub workers: usize,
    /// Write track files for playlists the user follows but does not own.
    pub foreign_tracks: bool,
}

impl Default for BackupOptions {
    fn default() -> Self {
        BackupOptions {
            workers: 1,
            foreign_tracks: true,
        }
    }
}

/// Everything one run needs, passed explicitly to every stage.
pub struct BackupContext {
    pub api: SpotifyApi,
    pub tree: BackupTree,
    pub pager: PagerContext,
    pub options: BackupOptions,
    /// Spotify ID of the authenticated user, used to tell owned playlists
    /// from followed ones.
    pub user_id: String,
}

/// Runs all sections and reports their outcome.
///
/// Sections run through a buffered stream on the calling task, so with one
/// worker they run strictly one after another in [`Section::ALL`] order.
pub async fn run(ctx: &BackupContext) -> RunReport {
    let listing = PlaylistListing::new();
    let workers = ctx.options.workers.max(1);

    let mut sections = stream::iter(Section::ALL)
        .map(|section| run_section(ctx, &listing, section))
        .buffered(workers);

    let mut report = RunReport::default();
    while let Some(section_report) = sections.next().await {
        if let Some(err) = &section_report.error {
            if err.is_fatal() && report.terminal.is_none() {
                warning!("Aborting backup: {}", err);
                ctx.pager.cancel.cancel();
                report.terminal = Some(err.clone());
            }
        }
        report.sections.push(section_report);
    }

    if report.terminal.is_none() && ctx.pager.cancel.is_cancelled() {
        report.terminal = Some(BackupError::Cancelled);
    }
    report
}

async fn run_section(
    ctx: &BackupContext,
    listing: &PlaylistListing,
    section: Section,
) -> SectionReport {
    let mut report = SectionReport::new(section);
    if ctx.pager.cancel.is_cancelled() {
        return report;
    }

    info!("Loading {}...", section);
    report.status = SectionStatus::Fetching;

    let result = match section {
        Section::UserPlaylists => {
            playlists::export(ctx, listing, Ownership::User, &mut report).await
        }
        Section::ForeignPlaylists => {
            playlists::export(ctx, listing, Ownership::Foreign, &mut report).await
        }
        _ => export_collection(ctx, section, &mut report).await,
    };

    match result {
        Ok(()) => {
            report.status = SectionStatus::Done;
            success!(
                "Saved {} ({} rows in {} files)",
                section,
                report.rows,
                report.files
            );
        }
        Err(e) => {
            report.status = SectionStatus::Failed;
            warning!("Failed to save {}: {}", section, e);
            report.error = Some(e);
        }
    }
    report
}

async fn export_collection(
    ctx: &BackupContext,
    section: Section,
    report: &mut SectionReport,
) -> Result<(), BackupError> {
    let Some((path, envelope)) = section.endpoint() else {
        return Ok(());
    };

    let mut source = ctx.api.collection(path, PAGE_LIMIT);
    if let Some(key) = envelope {
        source = source.nested_in(key);
    }

    let kind = section.kind();
    let mut pager = Paginator::new(source, ctx.pager.clone());
    let mut file = CsvFile::create(section.output(&ctx.tree), kind.schema())?;

    while let Some(record) = pager.next_record().await {
        file.push(normalize(kind, record?))?;
        if pager.page_drained() {
            info!(
                "Loaded {}/{} {} items",
                pager.fetched(),
                pager.total().unwrap_or(pager.fetched() as u64),
                section
            );
        }
    }
    if pager.fetched() == 0 {
        info!("Loaded 0/0 {} items", section);
    }

    report.status = SectionStatus::Writing;
    report.rows = file.commit().await?;
    report.files = 1;
    Ok(())
}
