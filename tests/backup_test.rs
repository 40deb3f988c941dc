mod common;

use std::{collections::BTreeMap, path::Path};

use serde_json::json;
use tempfile::tempdir;
use walkdir::WalkDir;

use spotback::{
    backup::{
        self, Section, SectionStatus,
        normalize::{PLAYLIST_SCHEMA, TRACK_SCHEMA},
    },
    error::BackupError,
};

use common::{
    MockServer, artist, backup_context, playlist, read_csv, saved_album, saved_episode,
    saved_show, saved_track,
};

/// A small library: two owned playlists with colliding names (one empty),
/// one followed playlist and one followed playlist that was deleted.
async fn library() -> MockServer {
    let server = MockServer::spawn().await;
    server.object("/me", json!({ "id": "me", "display_name": "Me" }));
    server.collection(
        "/me/tracks",
        vec![
            saved_track("t1", "Hello, \"World\"", &["A", "B"]),
            saved_track("t2", "Second", &["C"]),
            saved_track("t3", "Third", &["D"]),
        ],
    );
    server.collection(
        "/me/albums",
        vec![saved_album("al1", "One"), saved_album("al2", "Two")],
    );
    server.nested_collection(
        "/me/following",
        "artists",
        vec![artist("ar1", "Band"), artist("ar2", "Singer")],
    );
    server.collection(
        "/me/playlists",
        vec![
            playlist("p1", "Road Trip", "me", 2),
            playlist("p2", "road trip", "me", 0),
            playlist("p3", "Mix/Tape", "friend", 1),
            playlist("p4", "Gone", "friend", 5),
        ],
    );
    server.collection(
        "/playlists/p1/tracks",
        vec![saved_track("t4", "Four", &["E"]), saved_track("t5", "Five", &["F"])],
    );
    server.collection("/playlists/p2/tracks", vec![]);
    server.collection("/playlists/p3/tracks", vec![saved_track("t6", "Six", &["G"])]);
    server.status("/playlists/p4/tracks", 404);
    server.collection("/me/episodes", vec![saved_episode("e1", "Pilot")]);
    server.collection("/me/shows", vec![saved_show("s1", "Talk")]);
    server
}

/// Relative path and content of every file below `root`.
fn snapshot(root: &Path) -> BTreeMap<String, Vec<u8>> {
    WalkDir::new(root)
        .into_iter()
        .map(Result::unwrap)
        .filter(|e| e.file_type().is_file())
        .map(|e| {
            let relative = e.path().strip_prefix(root).unwrap();
            (
                relative.to_string_lossy().replace('\\', "/"),
                std::fs::read(e.path()).unwrap(),
            )
        })
        .collect()
}

#[tokio::test]
async fn test_full_backup_layout() {
    let server = library().await;
    let dir = tempdir().unwrap();
    let ctx = backup_context(&server, dir.path());

    let report = backup::run(&ctx).await;

    let files: Vec<String> = snapshot(dir.path()).into_keys().collect();
    assert_eq!(
        files,
        vec![
            "Music/Playlists/Albums.csv",
            "Music/Playlists/Artists.csv",
            "Music/Playlists/Foreign/Mix_Tape.csv",
            "Music/Playlists/ForeignPlaylists.csv",
            "Music/Playlists/Liked.csv",
            "Music/Playlists/User/Road Trip.csv",
            "Music/Playlists/User/road trip (2).csv",
            "Music/Playlists/UserPlaylists.csv",
            "Podcasts/Episodes.csv",
            "Podcasts/Shows.csv",
        ]
    );

    assert!(report.terminal_error().is_none());
    assert_eq!(report.sections.len(), Section::ALL.len());
    assert!(
        report
            .sections
            .iter()
            .all(|r| r.status == SectionStatus::Done)
    );
}

#[tokio::test]
async fn test_report_counts_rows_and_files() {
    let server = library().await;
    let dir = tempdir().unwrap();
    let report = backup::run(&backup_context(&server, dir.path())).await;

    let liked = report.section(Section::LikedTracks).unwrap();
    assert_eq!((liked.rows, liked.files), (3, 1));

    // 2 + 0 track rows plus 2 summary rows across 3 files
    let user = report.section(Section::UserPlaylists).unwrap();
    assert_eq!((user.rows, user.files), (4, 3));

    let artists = report.section(Section::Artists).unwrap();
    assert_eq!(artists.rows, 2);
}

#[tokio::test]
async fn test_deleted_playlist_is_skipped() {
    let server = library().await;
    let dir = tempdir().unwrap();
    let report = backup::run(&backup_context(&server, dir.path())).await;

    let foreign = report.section(Section::ForeignPlaylists).unwrap();
    assert_eq!(foreign.status, SectionStatus::Done);
    assert_eq!(foreign.skipped.len(), 1);
    assert_eq!(foreign.skipped[0].id, "p4");
    assert_eq!(foreign.skipped[0].name, "Gone");
    assert!(!report.is_complete());

    // the playlist stays listed in the summary
    let (header, rows) = read_csv(&dir.path().join("Music/Playlists/ForeignPlaylists.csv"));
    assert_eq!(header, PLAYLIST_SCHEMA);
    let ids: Vec<&str> = rows.iter().map(|r| r[0].as_str()).collect();
    assert_eq!(ids, vec!["p3", "p4"]);
    assert!(!dir.path().join("Music/Playlists/Foreign/Gone.csv").exists());
}

#[tokio::test]
async fn test_empty_playlist_gets_header_only_file() {
    let server = library().await;
    let dir = tempdir().unwrap();
    backup::run(&backup_context(&server, dir.path())).await;

    let (header, rows) = read_csv(&dir.path().join("Music/Playlists/User/road trip (2).csv"));
    assert_eq!(header, TRACK_SCHEMA);
    assert!(rows.is_empty());

    let (_, rows) = read_csv(&dir.path().join("Music/Playlists/User/Road Trip.csv"));
    let ids: Vec<&str> = rows.iter().map(|r| r[0].as_str()).collect();
    assert_eq!(ids, vec!["t4", "t5"]);
}

#[tokio::test]
async fn test_liked_tracks_round_trip_through_csv() {
    let server = library().await;
    let dir = tempdir().unwrap();
    backup::run(&backup_context(&server, dir.path())).await;

    let (header, rows) = read_csv(&dir.path().join("Music/Playlists/Liked.csv"));
    assert_eq!(header, TRACK_SCHEMA);
    assert_eq!(rows.len(), 3);
    assert!(rows.iter().all(|r| r.len() == TRACK_SCHEMA.len()));
    assert_eq!(rows[0][2], "Hello, \"World\"");
    assert_eq!(rows[0][4], "A;B");
}

#[tokio::test]
async fn test_rerun_is_byte_identical() {
    let server = library().await;
    let dir = tempdir().unwrap();
    let ctx = backup_context(&server, dir.path());

    backup::run(&ctx).await;
    let first = snapshot(dir.path());
    backup::run(&ctx).await;

    assert_eq!(snapshot(dir.path()), first);
}

#[tokio::test]
async fn test_parallel_sections_write_the_same_tree() {
    let server = library().await;
    let sequential = tempdir().unwrap();
    let parallel = tempdir().unwrap();

    backup::run(&backup_context(&server, sequential.path())).await;
    let mut ctx = backup_context(&server, parallel.path());
    ctx.options.workers = 4;
    let report = backup::run(&ctx).await;

    assert_eq!(snapshot(parallel.path()), snapshot(sequential.path()));
    let order: Vec<Section> = report.sections.iter().map(|r| r.section).collect();
    assert_eq!(order, Section::ALL);
}

#[tokio::test]
async fn test_auth_error_stops_remaining_sections() {
    let server = library().await;
    server.status("/me/following", 401);
    let dir = tempdir().unwrap();

    let report = backup::run(&backup_context(&server, dir.path())).await;

    let statuses: Vec<SectionStatus> = report.sections.iter().map(|r| r.status).collect();
    assert_eq!(
        statuses,
        vec![
            SectionStatus::Done,
            SectionStatus::Done,
            SectionStatus::Failed,
            SectionStatus::Pending,
            SectionStatus::Pending,
            SectionStatus::Pending,
            SectionStatus::Pending,
        ]
    );
    assert!(matches!(
        report.terminal_error(),
        Some(BackupError::Auth { status: 401 })
    ));
    assert_eq!(server.hit_count("/me/following"), 1);
    assert_eq!(server.hit_count("/me/playlists"), 0);
    assert_eq!(server.hit_count("/me/episodes"), 0);
    assert_eq!(server.hit_count("/me/shows"), 0);

    assert!(dir.path().join("Music/Playlists/Albums.csv").exists());
    assert!(!dir.path().join("Music/Playlists/Artists.csv").exists());
    assert!(!dir.path().join("Podcasts").exists());

    let details: Vec<String> = report.table_rows().into_iter().map(|r| r.details).collect();
    assert_eq!(details[6], "not attempted");
}

#[tokio::test]
async fn test_auth_error_mid_section_writes_no_playlist_files() {
    let server = library().await;
    server.status("/playlists/p2/tracks", 401);
    let dir = tempdir().unwrap();

    let report = backup::run(&backup_context(&server, dir.path())).await;

    let user = report.section(Section::UserPlaylists).unwrap();
    assert_eq!(user.status, SectionStatus::Failed);
    assert_eq!((user.rows, user.files), (0, 0));
    assert!(matches!(
        report.terminal_error(),
        Some(BackupError::Auth { status: 401 })
    ));
    // p1 was fetched before the failure but its file is never written
    assert_eq!(server.hit_count("/playlists/p1/tracks"), 1);
    assert!(!dir.path().join("Music/Playlists/User").exists());
    assert!(!dir.path().join("Music/Playlists/UserPlaylists.csv").exists());
    assert!(
        snapshot(dir.path())
            .keys()
            .all(|path| !path.ends_with(".partial"))
    );
}

#[tokio::test]
async fn test_long_multibyte_playlist_name_is_written() {
    let server = library().await;
    let name = "日本".repeat(50);
    server.collection("/me/playlists", vec![playlist("p5", &name, "me", 1)]);
    server.collection("/playlists/p5/tracks", vec![saved_track("t7", "Seven", &["H"])]);
    let dir = tempdir().unwrap();

    let report = backup::run(&backup_context(&server, dir.path())).await;

    let user = report.section(Section::UserPlaylists).unwrap();
    assert_eq!(user.status, SectionStatus::Done);
    assert!(user.skipped.is_empty());

    let path = dir
        .path()
        .join("Music/Playlists/User")
        .join(format!("{}.csv", "日本".repeat(33)));
    let (header, rows) = read_csv(&path);
    assert_eq!(header, TRACK_SCHEMA);
    assert_eq!(rows.len(), 1);

    // the summary keeps the full name
    let (_, rows) = read_csv(&dir.path().join("Music/Playlists/UserPlaylists.csv"));
    assert_eq!(rows[0][2], name);
}

#[tokio::test]
async fn test_failed_section_keeps_previous_file_and_others_continue() {
    let server = library().await;
    server.status("/me/albums", 500);
    let dir = tempdir().unwrap();
    let albums = dir.path().join("Music/Playlists/Albums.csv");
    std::fs::create_dir_all(albums.parent().unwrap()).unwrap();
    std::fs::write(&albums, "previous backup\n").unwrap();

    let report = backup::run(&backup_context(&server, dir.path())).await;

    let failed: Vec<Section> = report.failed().map(|r| r.section).collect();
    assert_eq!(failed, vec![Section::Albums]);
    assert!(matches!(
        report.section(Section::Albums).unwrap().error,
        Some(BackupError::FetchFailed { .. })
    ));
    assert!(report.terminal_error().is_none());
    assert_eq!(std::fs::read_to_string(&albums).unwrap(), "previous backup\n");
    assert!(dir.path().join("Podcasts/Shows.csv").exists());
    // one attempt plus three retries
    assert_eq!(server.hit_count("/me/albums"), 4);
}

#[tokio::test]
async fn test_rate_limited_run_completes() {
    let server = library().await;
    server.fail_once("/me/tracks", 429, Some("0"));
    server.fail_once("/playlists/p1/tracks", 429, None);
    let dir = tempdir().unwrap();

    let report = backup::run(&backup_context(&server, dir.path())).await;

    assert!(report.terminal_error().is_none());
    assert_eq!(report.failed().count(), 0);
    let (_, rows) = read_csv(&dir.path().join("Music/Playlists/Liked.csv"));
    assert_eq!(rows.len(), 3);
}

#[tokio::test]
async fn test_skip_foreign_tracks() {
    let server = library().await;
    let dir = tempdir().unwrap();
    let mut ctx = backup_context(&server, dir.path());
    ctx.options.foreign_tracks = false;

    let report = backup::run(&ctx).await;

    let (_, rows) = read_csv(&dir.path().join("Music/Playlists/ForeignPlaylists.csv"));
    assert_eq!(rows.len(), 2);
    assert!(!dir.path().join("Music/Playlists/Foreign").exists());
    assert_eq!(server.hit_count("/playlists/p3/tracks"), 0);
    assert!(report.is_complete());
}

#[tokio::test]
async fn test_playlist_listing_is_fetched_once() {
    let server = library().await;
    let dir = tempdir().unwrap();
    backup::run(&backup_context(&server, dir.path())).await;

    assert_eq!(server.hit_count("/me/playlists"), 1);
}

#[tokio::test]
async fn test_cancelled_run_writes_nothing() {
    let server = library().await;
    let dir = tempdir().unwrap();
    let ctx = backup_context(&server, dir.path());
    ctx.pager.cancel.cancel();

    let report = backup::run(&ctx).await;

    assert!(matches!(report.terminal_error(), Some(BackupError::Cancelled)));
    assert!(
        report
            .sections
            .iter()
            .all(|r| r.status == SectionStatus::Pending)
    );
    assert!(server.hits().is_empty());
    assert!(snapshot(dir.path()).is_empty());
}

#[tokio::test]
async fn test_current_user() {
    let server = library().await;
    let ctx = backup_context(&server, Path::new("unused"));

    let user = ctx.api.current_user(&ctx.pager).await.unwrap();
    assert_eq!(user.id, "me");
    assert_eq!(user.display_name.as_deref(), Some("Me"));
}
