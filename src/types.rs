use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use tabled::Tabled;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Token {
    pub access_token: String,
    pub refresh_token: String,
    pub scope: String,
    pub expires_in: u64,
    pub obtained_at: u64,
}

#[derive(Debug, Clone)]
pub struct PkceToken {
    pub code_verifier: String,
    pub token: Option<Token>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CurrentUser {
    pub id: String,
    #[serde(default)]
    pub display_name: Option<String>,
}

/// A JSON leaf copied into a CSV field without reformatting.
///
/// Strings are used as-is, numbers keep their JSON representation, booleans
/// become `true`/`false` and null or missing values become an empty string.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Scalar(pub Value);

impl Scalar {
    pub fn render(&self) -> String {
        match &self.0 {
            Value::Null => String::new(),
            Value::String(s) => s.clone(),
            Value::Bool(b) => b.to_string(),
            Value::Number(n) => n.to_string(),
            other => other.to_string(),
        }
    }
}

/// Treats an explicit `null` like a missing field.
fn nullable<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de> + Default,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ExternalUrls {
    pub spotify: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ArtistRef {
    pub id: Option<String>,
    pub name: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Album {
    pub id: Option<String>,
    pub name: Option<String>,
    pub album_type: Option<String>,
    pub total_tracks: Scalar,
    #[serde(deserialize_with = "nullable")]
    pub artists: Vec<ArtistRef>,
    pub release_date: Option<String>,
    pub label: Option<String>,
    pub popularity: Scalar,
    #[serde(deserialize_with = "nullable")]
    pub external_urls: ExternalUrls,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Track {
    pub id: Option<String>,
    pub name: Option<String>,
    #[serde(deserialize_with = "nullable")]
    pub album: Album,
    #[serde(deserialize_with = "nullable")]
    pub artists: Vec<ArtistRef>,
    pub duration_ms: Scalar,
    pub explicit: Scalar,
    pub popularity: Scalar,
    #[serde(deserialize_with = "nullable")]
    pub external_urls: ExternalUrls,
}

/// Item of `me/tracks` and of a playlist's track listing.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SavedTrack {
    pub added_at: Option<String>,
    pub track: Option<Track>,
}

/// Item of `me/albums`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SavedAlbum {
    pub added_at: Option<String>,
    pub album: Option<Album>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Followers {
    pub total: Scalar,
}

/// Item of `me/following?type=artist`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Artist {
    pub id: Option<String>,
    pub name: Option<String>,
    #[serde(rename = "type")]
    pub kind: Option<String>,
    #[serde(deserialize_with = "nullable")]
    pub followers: Followers,
    pub popularity: Scalar,
    #[serde(deserialize_with = "nullable")]
    pub external_urls: ExternalUrls,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct PlaylistOwner {
    pub id: Option<String>,
    pub display_name: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct PlaylistTracksRef {
    pub href: Option<String>,
    pub total: Scalar,
}

/// Item of `me/playlists`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Playlist {
    pub id: Option<String>,
    pub uri: Option<String>,
    pub name: Option<String>,
    pub description: Option<String>,
    #[serde(deserialize_with = "nullable")]
    pub owner: PlaylistOwner,
    #[serde(deserialize_with = "nullable")]
    pub tracks: PlaylistTracksRef,
    #[serde(deserialize_with = "nullable")]
    pub external_urls: ExternalUrls,
}

impl Playlist {
    pub fn is_owned_by(&self, user_id: &str) -> bool {
        self.owner.id.as_deref() == Some(user_id)
    }

    /// Name used in logs and file names; `unnamed` when Spotify has none.
    pub fn display_name(&self) -> &str {
        match self.name.as_deref().map(str::trim) {
            Some(name) if !name.is_empty() => name,
            _ => "unnamed",
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Show {
    pub id: Option<String>,
    pub name: Option<String>,
    pub publisher: Option<String>,
    pub description: Option<String>,
    pub total_episodes: Scalar,
    pub media_type: Option<String>,
    pub explicit: Scalar,
    #[serde(deserialize_with = "nullable")]
    pub external_urls: ExternalUrls,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Episode {
    pub id: Option<String>,
    pub name: Option<String>,
    pub description: Option<String>,
    pub release_date: Option<String>,
    pub duration_ms: Scalar,
    pub explicit: Scalar,
    #[serde(deserialize_with = "nullable")]
    pub show: Show,
    #[serde(deserialize_with = "nullable")]
    pub external_urls: ExternalUrls,
}

/// Item of `me/episodes`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SavedEpisode {
    pub added_at: Option<String>,
    pub episode: Option<Episode>,
}

/// Item of `me/shows`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SavedShow {
    pub added_at: Option<String>,
    pub show: Option<Show>,
}

#[derive(Tabled)]
pub struct SectionTableRow {
    pub section: String,
    pub status: String,
    pub rows: usize,
    pub files: usize,
    pub details: String,
}
