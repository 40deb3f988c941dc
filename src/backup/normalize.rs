//! Mapping of raw API records to fixed CSV rows.
//!
//! Every kind has a schema (its header) and a row builder returning an array
//! of the same length, so the arity of a row can never drift from its header.
//! Values are copied without reformatting: durations stay in milliseconds and
//! dates keep the API's ISO representation.

use std::fmt;

use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::{
    types::{
        Album, Artist, ArtistRef, Playlist, SavedAlbum, SavedEpisode, SavedShow, SavedTrack,
        Scalar,
    },
    utils::join_names,
    warning,
};

pub const TRACK_SCHEMA: [&str; 14] = [
    "Track ID",
    "Album ID",
    "Track Name",
    "Album Name",
    "Artists",
    "Release Date",
    "Duration (ms)",
    "Explicit",
    "Album Type",
    "Popularity",
    "Added On",
    "Album Tracks",
    "Track URL",
    "Album URL",
];

pub const ALBUM_SCHEMA: [&str; 10] = [
    "ID",
    "Name",
    "Tracks",
    "Artists",
    "Release Date",
    "Label",
    "Type",
    "Popularity",
    "Added On",
    "URL",
];

pub const ARTIST_SCHEMA: [&str; 6] = ["ID", "Name", "Type", "Followers", "Popularity", "URL"];

pub const PLAYLIST_SCHEMA: [&str; 6] = ["ID", "Spotify URI", "Name", "Description", "Tracks", "URL"];

pub const EPISODE_SCHEMA: [&str; 13] = [
    "Episode ID",
    "Show ID",
    "Episode Name",
    "Show Name",
    "Publisher",
    "Description",
    "Release Date",
    "Duration (ms)",
    "Explicit",
    "Show Type",
    "Added On",
    "Episode URL",
    "Show URL",
];

pub const SHOW_SCHEMA: [&str; 9] = [
    "ID",
    "Name",
    "Publisher",
    "Description",
    "Episodes",
    "Type",
    "Explicit",
    "Added On",
    "URL",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EntityKind {
    Track,
    Album,
    Artist,
    UserPlaylist,
    ForeignPlaylist,
    Episode,
    Show,
}

impl EntityKind {
    pub const ALL: [EntityKind; 7] = [
        EntityKind::Track,
        EntityKind::Album,
        EntityKind::Artist,
        EntityKind::UserPlaylist,
        EntityKind::ForeignPlaylist,
        EntityKind::Episode,
        EntityKind::Show,
    ];

    pub fn schema(self) -> &'static [&'static str] {
        match self {
            EntityKind::Track => &TRACK_SCHEMA,
            EntityKind::Album => &ALBUM_SCHEMA,
            EntityKind::Artist => &ARTIST_SCHEMA,
            EntityKind::UserPlaylist | EntityKind::ForeignPlaylist => &PLAYLIST_SCHEMA,
            EntityKind::Episode => &EPISODE_SCHEMA,
            EntityKind::Show => &SHOW_SCHEMA,
        }
    }
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            EntityKind::Track => "track",
            EntityKind::Album => "album",
            EntityKind::Artist => "artist",
            EntityKind::UserPlaylist => "user playlist",
            EntityKind::ForeignPlaylist => "foreign playlist",
            EntityKind::Episode => "episode",
            EntityKind::Show => "show",
        };
        write!(f, "{name}")
    }
}

/// A raw API record, tagged with the kind it was fetched as.
#[derive(Debug, Clone)]
pub enum RawRecord {
    Track(SavedTrack),
    Album(SavedAlbum),
    Artist(Artist),
    UserPlaylist(Playlist),
    ForeignPlaylist(Playlist),
    Episode(SavedEpisode),
    Show(SavedShow),
}

impl RawRecord {
    /// Parses a JSON record as `kind`.
    ///
    /// Missing keys fall back to empty values. A record that does not have
    /// the expected shape at all (e.g. `null`) becomes the empty record.
    pub fn parse(kind: EntityKind, value: Value) -> Self {
        match kind {
            EntityKind::Track => RawRecord::Track(lenient(kind, value)),
            EntityKind::Album => RawRecord::Album(lenient(kind, value)),
            EntityKind::Artist => RawRecord::Artist(lenient(kind, value)),
            EntityKind::UserPlaylist => RawRecord::UserPlaylist(lenient(kind, value)),
            EntityKind::ForeignPlaylist => RawRecord::ForeignPlaylist(lenient(kind, value)),
            EntityKind::Episode => RawRecord::Episode(lenient(kind, value)),
            EntityKind::Show => RawRecord::Show(lenient(kind, value)),
        }
    }

    pub fn kind(&self) -> EntityKind {
        match self {
            RawRecord::Track(_) => EntityKind::Track,
            RawRecord::Album(_) => EntityKind::Album,
            RawRecord::Artist(_) => EntityKind::Artist,
            RawRecord::UserPlaylist(_) => EntityKind::UserPlaylist,
            RawRecord::ForeignPlaylist(_) => EntityKind::ForeignPlaylist,
            RawRecord::Episode(_) => EntityKind::Episode,
            RawRecord::Show(_) => EntityKind::Show,
        }
    }

    pub fn into_row(self) -> Vec<String> {
        match self {
            RawRecord::Track(saved) => track_row(&saved).into(),
            RawRecord::Album(saved) => album_row(&saved).into(),
            RawRecord::Artist(artist) => artist_row(&artist).into(),
            RawRecord::UserPlaylist(playlist) | RawRecord::ForeignPlaylist(playlist) => {
                playlist_row(&playlist).into()
            }
            RawRecord::Episode(saved) => episode_row(&saved).into(),
            RawRecord::Show(saved) => show_row(&saved).into(),
        }
    }
}

/// Maps one raw record of `kind` to its CSV row.
pub fn normalize(kind: EntityKind, raw: Value) -> Vec<String> {
    RawRecord::parse(kind, raw).into_row()
}

/// Deserializes `value`, falling back to the empty record of `T`.
pub fn lenient<T: DeserializeOwned + Default>(kind: EntityKind, value: Value) -> T {
    serde_json::from_value(value).unwrap_or_else(|e| {
        warning!("Unreadable {} record, writing empty row: {}", kind, e);
        T::default()
    })
}

fn text(value: &Option<String>) -> String {
    value.clone().unwrap_or_default()
}

fn scalar(value: &Scalar) -> String {
    value.render()
}

fn artists(refs: &[ArtistRef]) -> String {
    join_names(refs.iter().map(|a| a.name.as_deref().unwrap_or_default()))
}

pub fn track_row(saved: &SavedTrack) -> [String; TRACK_SCHEMA.len()] {
    let track = saved.track.clone().unwrap_or_default();
    let album: &Album = &track.album;

    [
        text(&track.id),
        text(&album.id),
        text(&track.name),
        text(&album.name),
        artists(&track.artists),
        text(&album.release_date),
        scalar(&track.duration_ms),
        scalar(&track.explicit),
        text(&album.album_type),
        scalar(&track.popularity),
        text(&saved.added_at),
        scalar(&album.total_tracks),
        text(&track.external_urls.spotify),
        text(&album.external_urls.spotify),
    ]
}

pub fn album_row(saved: &SavedAlbum) -> [String; ALBUM_SCHEMA.len()] {
    let album = saved.album.clone().unwrap_or_default();

    [
        text(&album.id),
        text(&album.name),
        scalar(&album.total_tracks),
        artists(&album.artists),
        text(&album.release_date),
        text(&album.label),
        text(&album.album_type),
        scalar(&album.popularity),
        text(&saved.added_at),
        text(&album.external_urls.spotify),
    ]
}

pub fn artist_row(artist: &Artist) -> [String; ARTIST_SCHEMA.len()] {
    [
        text(&artist.id),
        text(&artist.name),
        text(&artist.kind),
        scalar(&artist.followers.total),
        scalar(&artist.popularity),
        text(&artist.external_urls.spotify),
    ]
}

pub fn playlist_row(playlist: &Playlist) -> [String; PLAYLIST_SCHEMA.len()] {
    [
        text(&playlist.id),
        text(&playlist.uri),
        text(&playlist.name),
        text(&playlist.description),
        scalar(&playlist.tracks.total),
        text(&playlist.external_urls.spotify),
    ]
}

pub fn episode_row(saved: &SavedEpisode) -> [String; EPISODE_SCHEMA.len()] {
    let episode = saved.episode.clone().unwrap_or_default();
    let show = &episode.show;

    [
        text(&episode.id),
        text(&show.id),
        text(&episode.name),
        text(&show.name),
        text(&show.publisher),
        text(&episode.description),
        text(&episode.release_date),
        scalar(&episode.duration_ms),
        scalar(&episode.explicit),
        text(&show.media_type),
        text(&saved.added_at),
        text(&episode.external_urls.spotify),
        text(&show.external_urls.spotify),
    ]
}

pub fn show_row(saved: &SavedShow) -> [String; SHOW_SCHEMA.len()] {
    let show = saved.show.clone().unwrap_or_default();

    [
        text(&show.id),
        text(&show.name),
        text(&show.publisher),
        text(&show.description),
        scalar(&show.total_episodes),
        text(&show.media_type),
        scalar(&show.explicit),
        text(&saved.added_at),
        text(&show.external_urls.spotify),
    ]
}
