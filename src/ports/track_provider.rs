use crate::error::{FetchError, RemoteError};
use crate::model::{PlaylistId, TrackId};

/// The logged-in user's profile.
#[derive(Debug, Clone)]
pub struct UserProfile {
    pub id: String,
}

/// Decoupled representation of a playlist from the API.
#[derive(Debug, Clone)]
pub struct PlaylistSummary {
    pub id: PlaylistId,
    pub name: String,
    pub owner_id: String,
    pub collaborative: bool,
    pub total_tracks: usize,
}

impl PlaylistSummary {
    /// Whether `user_id` may reorder this playlist.
    pub fn is_writable_by(&self, user_id: &str) -> bool {
        self.collaborative || self.owner_id == user_id
    }
}

/// One page of a paginated track listing.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Page {
    /// Tracks of this page that have a catalog id, in remote order.
    pub tracks: Vec<TrackId>,
    /// Number of raw items on this page, including ones without a catalog id.
    pub received: usize,
    /// Total number of items the remote currently advertises.
    pub total: usize,
}

impl Page {
    #[cfg(test)]
    pub fn new(tracks: Vec<TrackId>, total: usize) -> Self {
        Self {
            received: tracks.len(),
            tracks,
            total,
        }
    }
}

/// Port trait wrapping the remote track catalog capabilities used by the shuffle engine.
///
/// Implementations live in `spotify::client` (production) or test mocks.
#[cfg_attr(test, mockall::automock)]
#[async_trait::async_trait]
pub trait TrackProvider: Send + Sync {
    async fn current_user(&self) -> Result<UserProfile, FetchError>;

    async fn current_user_playlists(&self) -> Result<Vec<PlaylistSummary>, FetchError>;

    async fn fetch_library_page(&self, offset: usize, limit: usize) -> Result<Page, FetchError>;

    async fn fetch_playlist_page(
        &self,
        playlist_id: &PlaylistId,
        offset: usize,
        limit: usize,
    ) -> Result<Page, FetchError>;

    async fn remove_from_library(&self, tracks: &[TrackId]) -> Result<(), RemoteError>;

    async fn add_to_library(&self, tracks: &[TrackId]) -> Result<(), RemoteError>;

    /// Sets the playlist to exactly `tracks`, discarding all prior content.
    async fn replace_playlist_items(
        &self,
        playlist_id: &PlaylistId,
        tracks: &[TrackId],
    ) -> Result<(), RemoteError>;

    async fn append_playlist_items(
        &self,
        playlist_id: &PlaylistId,
        tracks: &[TrackId],
    ) -> Result<(), RemoteError>;
}
