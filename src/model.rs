use std::fmt;

use serde::{Deserialize, Serialize};

/// What a playlist item is. Playlists can hold podcast episodes next to tracks.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ItemKind {
    #[default]
    Track,
    Episode,
}

impl ItemKind {
    fn uri_prefix(self) -> &'static str {
        match self {
            Self::Track => "spotify:track:",
            Self::Episode => "spotify:episode:",
        }
    }
}

/// Identifier of a single item in the Spotify catalog: the base62 id plus
/// whether it names a track or an episode.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TrackId {
    id: String,
    kind: ItemKind,
}

impl TrackId {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            kind: ItemKind::Track,
        }
    }

    pub fn episode(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            kind: ItemKind::Episode,
        }
    }

    /// Reads the snapshot form: a bare id is a track, otherwise a
    /// `spotify:track:` or `spotify:episode:` URI.
    pub fn parse(value: &str) -> Option<Self> {
        let (kind, id) = if let Some(id) = value.strip_prefix(ItemKind::Episode.uri_prefix()) {
            (ItemKind::Episode, id)
        } else if let Some(id) = value.strip_prefix(ItemKind::Track.uri_prefix()) {
            (ItemKind::Track, id)
        } else {
            (ItemKind::Track, value)
        };
        is_valid_id(id).then(|| Self {
            id: id.to_string(),
            kind,
        })
    }

    pub fn as_str(&self) -> &str {
        &self.id
    }

    /// The URI form the playlist endpoints expect.
    pub fn uri(&self) -> String {
        format!("{}{}", self.kind.uri_prefix(), self.id)
    }
}

/// Tracks print as their bare id, episodes as their URI.
impl fmt::Display for TrackId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.kind {
            ItemKind::Track => f.write_str(&self.id),
            ItemKind::Episode => f.write_str(&self.uri()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PlaylistId(String);

impl PlaylistId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for PlaylistId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Ordered item identifiers. The order is what gets shuffled and written back.
pub type TrackSet = Vec<TrackId>;

/// Where a track set came from and where it has to be written back to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PlaylistTarget {
    SavedLibrary,
    NamedPlaylist(PlaylistId),
}

impl fmt::Display for PlaylistTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::SavedLibrary => f.write_str("Saved Tracks"),
            Self::NamedPlaylist(id) => write!(f, "playlist {id}"),
        }
    }
}

/// Identifiers handed out by Spotify are base62.
pub fn is_valid_id(id: &str) -> bool {
    !id.is_empty() && id.chars().all(|c| c.is_ascii_alphanumeric())
}
