use std::path::{Path, PathBuf};

/// Fixed file layout of a backup below its root directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BackupTree {
    root: PathBuf,
}

impl BackupTree {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        BackupTree { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn playlists_dir(&self) -> PathBuf {
        self.root.join("Music").join("Playlists")
    }

    fn podcasts_dir(&self) -> PathBuf {
        self.root.join("Podcasts")
    }

    pub fn liked(&self) -> PathBuf {
        self.playlists_dir().join("Liked.csv")
    }

    pub fn albums(&self) -> PathBuf {
        self.playlists_dir().join("Albums.csv")
    }

    pub fn artists(&self) -> PathBuf {
        self.playlists_dir().join("Artists.csv")
    }

    pub fn user_playlists(&self) -> PathBuf {
        self.playlists_dir().join("UserPlaylists.csv")
    }

    pub fn foreign_playlists(&self) -> PathBuf {
        self.playlists_dir().join("ForeignPlaylists.csv")
    }

    /// Directory holding one track file per playlist owned by the user.
    pub fn user_playlist_dir(&self) -> PathBuf {
        self.playlists_dir().join("User")
    }

    /// Directory holding one track file per followed playlist.
    pub fn foreign_playlist_dir(&self) -> PathBuf {
        self.playlists_dir().join("Foreign")
    }

    pub fn episodes(&self) -> PathBuf {
        self.podcasts_dir().join("Episodes.csv")
    }

    pub fn shows(&self) -> PathBuf {
        self.podcasts_dir().join("Shows.csv")
    }
}
