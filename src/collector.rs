use std::future::Future;

use crate::cancel::CancelFlag;
use crate::error::FetchError;
use crate::model::{PlaylistId, TrackSet};
use crate::ports::track_provider::{Page, TrackProvider};

/// Largest page the saved-tracks endpoint hands out.
pub const LIBRARY_PAGE_SIZE: usize = 50;
/// Largest page the playlist items endpoint hands out.
pub const PLAYLIST_PAGE_SIZE: usize = 100;

/// Retrieves complete track sets from a paginated provider.
pub struct TrackCollector<'a, P: TrackProvider> {
    provider: &'a P,
    cancel: CancelFlag,
    library_page_size: usize,
    playlist_page_size: usize,
}

impl<'a, P: TrackProvider> TrackCollector<'a, P> {
    pub fn new(provider: &'a P, cancel: CancelFlag) -> Self {
        Self {
            provider,
            cancel,
            library_page_size: LIBRARY_PAGE_SIZE,
            playlist_page_size: PLAYLIST_PAGE_SIZE,
        }
    }

    #[cfg(test)]
    pub fn with_page_size(mut self, page_size: usize) -> Self {
        self.library_page_size = page_size.max(1);
        self.playlist_page_size = page_size.max(1);
        self
    }

    pub async fn collect_saved_library(&self) -> Result<TrackSet, FetchError> {
        let provider = self.provider;
        let limit = self.library_page_size;
        let tracks = self
            .collect_pages("Saved Tracks", |offset| {
                provider.fetch_library_page(offset, limit)
            })
            .await?;
        log::info!("Collected all {} saved tracks", tracks.len());
        Ok(tracks)
    }

    pub async fn collect_playlist(&self, playlist_id: &PlaylistId) -> Result<TrackSet, FetchError> {
        let provider = self.provider;
        let limit = self.playlist_page_size;
        let label = format!("playlist {playlist_id}");
        let tracks = self
            .collect_pages(&label, |offset| {
                provider.fetch_playlist_page(playlist_id, offset, limit)
            })
            .await?;
        log::info!("Collected all {} tracks of {}", tracks.len(), label);
        Ok(tracks)
    }

    /// Requests pages in increasing offset order until the offset reaches the
    /// total reported by the most recent page.
    ///
    /// The offset advances by the number of items actually received, so a
    /// total that shrinks mid-collection terminates early and one that grows
    /// keeps the loop going. An empty page before the total is reached is an
    /// error rather than a silent truncation.
    async fn collect_pages<F, Fut>(&self, label: &str, mut fetch: F) -> Result<TrackSet, FetchError>
    where
        F: FnMut(usize) -> Fut,
        Fut: Future<Output = Result<Page, FetchError>>,
    {
        let mut tracks = TrackSet::new();
        let mut offset = 0;
        let mut skipped = 0;

        loop {
            if self.cancel.is_cancelled() {
                return Err(FetchError::Cancelled);
            }

            let page = fetch(offset).await?;
            log::debug!(
                "Fetched {} items of {} at offset {} (total {})",
                page.received,
                label,
                offset,
                page.total
            );

            skipped += page.received.saturating_sub(page.tracks.len());
            tracks.extend(page.tracks);
            offset += page.received;

            if offset >= page.total {
                break;
            }
            if page.received == 0 {
                return Err(FetchError::Truncated {
                    collected: offset,
                    total: page.total,
                });
            }
            log::info!("saved {} songs", tracks.len());
        }

        if skipped > 0 {
            log::warn!(
                "Skipped {} items of {} without a catalog id (local files or unavailable tracks)",
                skipped,
                label
            );
        }

        Ok(tracks)
    }
}
