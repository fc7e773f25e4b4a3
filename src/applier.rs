use crate::cancel::CancelFlag;
use crate::error::WriteError;
use crate::model::{PlaylistId, PlaylistTarget, TrackId};
use crate::ports::track_provider::TrackProvider;

/// Most items a playlist replace/append call accepts.
pub const PLAYLIST_BATCH_SIZE: usize = 100;
/// Most ids a library save/remove call accepts.
pub const LIBRARY_BATCH_SIZE: usize = 50;

/// Counts of the remote calls a completed write-back issued.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WriteReport {
    pub tracks: usize,
    pub calls: usize,
}

/// Writes a track set back to its destination in API sized chunks.
///
/// Calls are issued strictly in chunk order and the first failure stops the
/// sequence. Re-running a whole write-back is idempotent: a playlist always
/// starts with the replace of the first chunk.
pub struct BatchApplier<'a, P: TrackProvider> {
    provider: &'a P,
    cancel: CancelFlag,
    playlist_batch_size: usize,
    library_batch_size: usize,
}

impl<'a, P: TrackProvider> BatchApplier<'a, P> {
    pub fn new(provider: &'a P, cancel: CancelFlag) -> Self {
        Self {
            provider,
            cancel,
            playlist_batch_size: PLAYLIST_BATCH_SIZE,
            library_batch_size: LIBRARY_BATCH_SIZE,
        }
    }

    #[cfg(test)]
    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.playlist_batch_size = batch_size.max(1);
        self.library_batch_size = batch_size.max(1);
        self
    }

    pub async fn apply(
        &self,
        target: &PlaylistTarget,
        tracks: &[TrackId],
    ) -> Result<WriteReport, WriteError> {
        match target {
            PlaylistTarget::SavedLibrary => self.replace_library(tracks).await,
            PlaylistTarget::NamedPlaylist(playlist_id) => {
                self.replace_playlist(playlist_id, tracks).await
            }
        }
    }

    /// Removes the tracks from the library, then saves them again.
    ///
    /// The library has no addressable order; afterwards it holds the same
    /// tracks as before.
    pub async fn replace_library(&self, tracks: &[TrackId]) -> Result<WriteReport, WriteError> {
        let mut calls = 0;

        for chunk in tracks.chunks(self.library_batch_size) {
            self.check_cancelled(calls)?;
            self.provider
                .remove_from_library(chunk)
                .await
                .map_err(|source| WriteError::RemoteWrite {
                    chunk: calls,
                    source,
                })?;
            calls += 1;
        }
        log::info!("Removed {} tracks from Saved Tracks", tracks.len());

        for chunk in tracks.chunks(self.library_batch_size) {
            self.check_cancelled(calls)?;
            self.provider
                .add_to_library(chunk)
                .await
                .map_err(|source| WriteError::RemoteWrite {
                    chunk: calls,
                    source,
                })?;
            calls += 1;
        }
        log::info!("Added {} tracks back to Saved Tracks", tracks.len());

        Ok(WriteReport {
            tracks: tracks.len(),
            calls,
        })
    }

    /// Replaces the playlist with the first chunk and appends every further
    /// chunk in order. The chunks partition `tracks` exactly.
    ///
    /// An empty track set still issues the replace, which clears the playlist.
    pub async fn replace_playlist(
        &self,
        playlist_id: &PlaylistId,
        tracks: &[TrackId],
    ) -> Result<WriteReport, WriteError> {
        let first_len = tracks.len().min(self.playlist_batch_size);
        let (first, rest) = tracks.split_at(first_len);

        self.check_cancelled(0)?;
        self.provider
            .replace_playlist_items(playlist_id, first)
            .await
            .map_err(|source| WriteError::RemoteWrite { chunk: 0, source })?;
        let mut calls = 1;
        log::info!(
            "Replaced playlist {} with {} of {} tracks",
            playlist_id,
            first.len(),
            tracks.len()
        );

        let mut written = first.len();
        for chunk in rest.chunks(self.playlist_batch_size) {
            self.check_cancelled(calls)?;
            self.provider
                .append_playlist_items(playlist_id, chunk)
                .await
                .map_err(|source| WriteError::RemoteWrite {
                    chunk: calls,
                    source,
                })?;
            calls += 1;
            written += chunk.len();
            log::info!(
                "Appended {} of {} tracks to playlist {}",
                written,
                tracks.len(),
                playlist_id
            );
        }

        Ok(WriteReport {
            tracks: written,
            calls,
        })
    }

    fn check_cancelled(&self, completed_chunks: usize) -> Result<(), WriteError> {
        if self.cancel.is_cancelled() {
            Err(WriteError::Cancelled { completed_chunks })
        } else {
            Ok(())
        }
    }
}
