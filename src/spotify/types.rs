use serde::{Deserialize, Serialize};

use crate::model::{PlaylistId, TrackId};
use crate::ports::track_provider::{Page, PlaylistSummary, UserProfile};

/// Spotify OAuth token response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SpotifyTokenResponse {
    pub access_token: String,
    pub token_type: String,
    pub expires_in: u64,
    pub refresh_token: Option<String>,
    #[serde(default)]
    pub scope: String,
}

/// Spotify user profile
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SpotifyUser {
    pub id: String,
}

impl From<SpotifyUser> for UserProfile {
    fn from(user: SpotifyUser) -> Self {
        Self {
            id: user.id,
        }
    }
}

/// Spotify playlist from API
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SpotifyPlaylist {
    pub id: String,
    pub name: String,
    pub owner: SpotifyOwner,
    #[serde(default)]
    pub collaborative: bool,
    #[serde(default)]
    pub tracks: Option<SpotifyPlaylistTracks>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SpotifyOwner {
    pub id: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SpotifyPlaylistTracks {
    pub total: usize,
}

impl From<SpotifyPlaylist> for PlaylistSummary {
    fn from(playlist: SpotifyPlaylist) -> Self {
        Self {
            id: PlaylistId::new(playlist.id),
            name: playlist.name,
            owner_id: playlist.owner.id,
            collaborative: playlist.collaborative,
            total_tracks: playlist.tracks.map_or(0, |tracks| tracks.total),
        }
    }
}

/// Spotify paging object
#[derive(Debug, Clone, Deserialize)]
pub struct Paging<T> {
    #[serde(default = "Vec::new")]
    pub items: Vec<T>,
    pub total: usize,
    #[serde(default)]
    pub next: Option<String>,
}

/// Saved track or playlist item. `track` is null for items that were removed
/// from the catalog.
#[derive(Debug, Clone, Deserialize)]
pub struct SpotifyTrackItem {
    pub track: Option<SpotifyTrackRef>,
}

/// Track or episode object. With a `market`, Spotify may relink a track to a
/// playable copy; `linked_from` then holds the id that is actually saved.
#[derive(Debug, Clone, Deserialize)]
pub struct SpotifyTrackRef {
    pub id: Option<String>,
    #[serde(default)]
    pub is_local: bool,
    #[serde(rename = "type", default)]
    pub kind: Option<String>,
    #[serde(default)]
    pub linked_from: Option<SpotifyLinkedFrom>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SpotifyLinkedFrom {
    pub id: Option<String>,
}

impl SpotifyTrackRef {
    /// The catalog id, if this item can be written back.
    fn track_id(self) -> Option<TrackId> {
        if self.is_local {
            return None;
        }
        let id = self
            .linked_from
            .and_then(|linked| linked.id)
            .or(self.id)
            .filter(|id| !id.is_empty())?;
        match self.kind.as_deref() {
            None | Some("track") => Some(TrackId::new(id)),
            Some("episode") => Some(TrackId::episode(id)),
            Some(kind) => {
                log::debug!("Skipping item {id} of unknown type {kind}");
                None
            }
        }
    }
}

impl From<Paging<SpotifyTrackItem>> for Page {
    fn from(paging: Paging<SpotifyTrackItem>) -> Self {
        let received = paging.items.len();
        let tracks = paging
            .items
            .into_iter()
            .filter_map(|item| item.track.and_then(SpotifyTrackRef::track_id))
            .collect();
        Self {
            tracks,
            received,
            total: paging.total,
        }
    }
}
