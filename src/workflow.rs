use crate::applier::{BatchApplier, WriteReport};
use crate::cancel::CancelFlag;
use crate::collector::TrackCollector;
use crate::error::{FetchError, SnapshotError, WriteError};
use crate::model::PlaylistTarget;
use crate::ports::track_provider::TrackProvider;
use crate::shuffler::Shuffler;
use crate::snapshot::{Snapshot, SnapshotStore};

#[derive(Debug, thiserror::Error)]
pub enum WorkflowError {
    #[error(transparent)]
    Fetch(#[from] FetchError),
    #[error(transparent)]
    Snapshot(#[from] SnapshotError),
    /// The write-back stopped part way. `pending` is what the snapshot on disk
    /// holds, so the whole write-back can be retried from it.
    #[error("{source}")]
    Write {
        #[source]
        source: WriteError,
        pending: Snapshot,
    },
}

/// Runs the shuffle pipeline (collect, shuffle, snapshot, write back) and the
/// recovery pipeline (write back a snapshot) against one provider.
pub struct ShuffleSession<'a, P: TrackProvider> {
    provider: &'a P,
    store: &'a SnapshotStore,
    shuffler: Shuffler,
    cancel: CancelFlag,
    keep_snapshot: bool,
}

impl<'a, P: TrackProvider> ShuffleSession<'a, P> {
    pub fn new(
        provider: &'a P,
        store: &'a SnapshotStore,
        shuffler: Shuffler,
        cancel: CancelFlag,
    ) -> Self {
        Self {
            provider,
            store,
            shuffler,
            cancel,
            keep_snapshot: false,
        }
    }

    pub fn keep_snapshot(mut self, keep_snapshot: bool) -> Self {
        self.keep_snapshot = keep_snapshot;
        self
    }

    /// Shuffles `target` in place.
    ///
    /// Nothing remote is touched until the complete track set is collected
    /// and its shuffled order is saved as a snapshot.
    pub async fn shuffle(&self, target: PlaylistTarget) -> Result<WriteReport, WorkflowError> {
        let collector = TrackCollector::new(self.provider, self.cancel.clone());
        let tracks = match &target {
            PlaylistTarget::SavedLibrary => collector.collect_saved_library().await?,
            PlaylistTarget::NamedPlaylist(playlist_id) => {
                collector.collect_playlist(playlist_id).await?
            }
        };

        let tracks = self.shuffler.shuffle(tracks);
        log::debug!(
            "Shuffled {} tracks with {} passes",
            tracks.len(),
            self.shuffler.passes()
        );

        self.store.save(&target, &tracks)?;
        self.write_back(Snapshot { target, tracks }).await
    }

    /// Writes a previously saved snapshot back from its first chunk.
    pub async fn resume(&self, snapshot: Snapshot) -> Result<WriteReport, WorkflowError> {
        log::info!(
            "Reinstating {} tracks to {}",
            snapshot.tracks.len(),
            snapshot.target
        );
        self.write_back(snapshot).await
    }

    async fn write_back(&self, snapshot: Snapshot) -> Result<WriteReport, WorkflowError> {
        let applied = BatchApplier::new(self.provider, self.cancel.clone())
            .apply(&snapshot.target, &snapshot.tracks)
            .await;
        let report = match applied {
            Ok(report) => report,
            Err(source) => {
                return Err(WorkflowError::Write {
                    source,
                    pending: snapshot,
                });
            }
        };

        if !self.keep_snapshot {
            self.store.clear()?;
        }
        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex};

    use super::*;
    use crate::error::RemoteError;
    use crate::model::{PlaylistId, TrackId, TrackSet};
    use crate::ports::track_provider::{MockTrackProvider, Page};

    fn numbered(n: usize) -> TrackSet {
        (0..n).map(|i| TrackId::new(format!("t{i}"))).collect()
    }

    fn sorted(mut tracks: TrackSet) -> TrackSet {
        tracks.sort();
        tracks
    }

    fn playlist_provider(len: usize) -> MockTrackProvider {
        let mut provider = MockTrackProvider::new();
        provider
            .expect_fetch_playlist_page()
            .returning(move |_, offset, limit| {
                let end = (offset + limit).min(len);
                Ok(Page::new(
                    (offset.min(end)..end)
                        .map(|i| TrackId::new(format!("t{i}")))
                        .collect(),
                    len,
                ))
            });
        provider
    }

    #[tokio::test]
    async fn test_shuffle_playlist_end_to_end() {
        let dir = tempfile::tempdir().unwrap();
        let store = SnapshotStore::new(dir.path().join("playlist.txt"));
        let written = Arc::new(Mutex::new(TrackSet::new()));

        let mut provider = playlist_provider(250);
        let snapshot_store = store.clone();
        let recorded = written.clone();
        provider
            .expect_replace_playlist_items()
            .times(1)
            .returning(move |_, tracks| {
                // The snapshot is on disk before the first destructive call.
                let snapshot = snapshot_store.load_if_present().unwrap().unwrap();
                assert_eq!(snapshot.tracks.len(), 250);
                assert_eq!(&snapshot.tracks[..100], tracks);
                recorded.lock().unwrap().extend_from_slice(tracks);
                Ok(())
            });
        let recorded = written.clone();
        provider
            .expect_append_playlist_items()
            .times(2)
            .returning(move |_, tracks| {
                recorded.lock().unwrap().extend_from_slice(tracks);
                Ok(())
            });

        let session = ShuffleSession::new(
            &provider,
            &store,
            Shuffler::default().with_seed(Some(1)),
            CancelFlag::new(),
        );
        let report = session
            .shuffle(PlaylistTarget::NamedPlaylist(PlaylistId::new("p1")))
            .await
            .unwrap();

        assert_eq!(report.tracks, 250);
        assert_eq!(report.calls, 3);
        let written = written.lock().unwrap().clone();
        assert_ne!(written, numbered(250));
        assert_eq!(sorted(written), sorted(numbered(250)));
        assert!(!store.exists());
    }

    #[tokio::test]
    async fn test_shuffle_keeps_episodes() {
        let dir = tempfile::tempdir().unwrap();
        let store = SnapshotStore::new(dir.path().join("playlist.txt"));
        let items = vec![
            TrackId::new("a1"),
            TrackId::episode("ep1"),
            TrackId::new("c3"),
        ];
        let written = Arc::new(Mutex::new(Vec::new()));

        let mut provider = MockTrackProvider::new();
        let page = items.clone();
        provider
            .expect_fetch_playlist_page()
            .returning(move |_, _, _| Ok(Page::new(page.clone(), 3)));
        let snapshot_store = store.clone();
        let recorded = written.clone();
        provider
            .expect_replace_playlist_items()
            .times(1)
            .returning(move |_, tracks| {
                let snapshot = snapshot_store.load_if_present().unwrap().unwrap();
                assert_eq!(snapshot.tracks, tracks);
                recorded
                    .lock()
                    .unwrap()
                    .extend(tracks.iter().map(TrackId::uri));
                Ok(())
            });
        provider.expect_append_playlist_items().never();

        let session = ShuffleSession::new(&provider, &store, Shuffler::default(), CancelFlag::new());
        session
            .shuffle(PlaylistTarget::NamedPlaylist(PlaylistId::new("p1")))
            .await
            .unwrap();

        let mut written = written.lock().unwrap().clone();
        written.sort();
        assert_eq!(
            written,
            vec![
                "spotify:episode:ep1".to_string(),
                "spotify:track:a1".to_string(),
                "spotify:track:c3".to_string(),
            ]
        );
    }

    #[tokio::test]
    async fn test_collection_failure_touches_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let store = SnapshotStore::new(dir.path().join("playlist.txt"));

        let mut provider = MockTrackProvider::new();
        provider
            .expect_fetch_library_page()
            .returning(|_, _| Err(FetchError::Unauthorized("insufficient scope".into())));
        provider.expect_remove_from_library().never();
        provider.expect_add_to_library().never();

        let session = ShuffleSession::new(&provider, &store, Shuffler::default(), CancelFlag::new());
        let result = session.shuffle(PlaylistTarget::SavedLibrary).await;

        assert!(matches!(
            result,
            Err(WorkflowError::Fetch(FetchError::Unauthorized(_)))
        ));
        assert!(!store.exists());
    }

    #[tokio::test]
    async fn test_write_failure_keeps_snapshot() {
        let dir = tempfile::tempdir().unwrap();
        let store = SnapshotStore::new(dir.path().join("playlist.txt"));

        let mut provider = playlist_provider(150);
        provider
            .expect_replace_playlist_items()
            .returning(|_, _| Ok(()));
        provider
            .expect_append_playlist_items()
            .returning(|_, _| Err(RemoteError::new(Some(502), "bad gateway")));

        let session = ShuffleSession::new(&provider, &store, Shuffler::default(), CancelFlag::new());
        let result = session
            .shuffle(PlaylistTarget::NamedPlaylist(PlaylistId::new("p1")))
            .await;

        let Err(WorkflowError::Write { source, pending }) = result else {
            panic!("expected a write error");
        };
        assert!(matches!(source, WriteError::RemoteWrite { chunk: 1, .. }));
        assert_eq!(store.load_if_present().unwrap(), Some(pending));
    }

    #[tokio::test]
    async fn test_resume_writes_snapshot_order() {
        let dir = tempfile::tempdir().unwrap();
        let store = SnapshotStore::new(dir.path().join("playlist.txt"));
        let tracks = numbered(120);
        store.save(&PlaylistTarget::SavedLibrary, &tracks).unwrap();
        let snapshot = store.load_if_present().unwrap().unwrap();

        let removed = Arc::new(Mutex::new(TrackSet::new()));
        let added = Arc::new(Mutex::new(TrackSet::new()));
        let mut provider = MockTrackProvider::new();
        provider.expect_fetch_library_page().never();
        let recorded = removed.clone();
        provider.expect_remove_from_library().returning(move |tracks| {
            recorded.lock().unwrap().extend_from_slice(tracks);
            Ok(())
        });
        let recorded = added.clone();
        provider.expect_add_to_library().returning(move |tracks| {
            recorded.lock().unwrap().extend_from_slice(tracks);
            Ok(())
        });

        let session = ShuffleSession::new(&provider, &store, Shuffler::default(), CancelFlag::new())
            .keep_snapshot(true);
        session.resume(snapshot).await.unwrap();

        assert_eq!(*removed.lock().unwrap(), tracks);
        assert_eq!(*added.lock().unwrap(), tracks);
        assert!(store.exists());
    }

    #[tokio::test]
    async fn test_retry_after_failure_restarts_with_replace() {
        let dir = tempfile::tempdir().unwrap();
        let store = SnapshotStore::new(dir.path().join("playlist.txt"));
        let calls = Arc::new(Mutex::new(Vec::new()));
        let failures = Arc::new(Mutex::new(1));

        let mut provider = MockTrackProvider::new();
        let recorded = calls.clone();
        provider
            .expect_replace_playlist_items()
            .returning(move |_, tracks| {
                recorded.lock().unwrap().push(("replace", tracks.len()));
                Ok(())
            });
        let recorded = calls.clone();
        provider
            .expect_append_playlist_items()
            .returning(move |_, tracks| {
                let mut remaining = failures.lock().unwrap();
                if *remaining > 0 {
                    *remaining -= 1;
                    return Err(RemoteError::new(Some(500), "oops"));
                }
                recorded.lock().unwrap().push(("append", tracks.len()));
                Ok(())
            });

        let session = ShuffleSession::new(&provider, &store, Shuffler::default(), CancelFlag::new());
        let target = PlaylistTarget::NamedPlaylist(PlaylistId::new("p1"));
        let tracks = numbered(150);
        store.save(&target, &tracks).unwrap();
        let Err(WorkflowError::Write { pending, .. }) = session
            .resume(Snapshot {
                target: target.clone(),
                tracks,
            })
            .await
        else {
            panic!("first attempt should fail");
        };

        session.resume(pending).await.unwrap();

        assert_eq!(
            *calls.lock().unwrap(),
            vec![("replace", 100), ("replace", 100), ("append", 50)]
        );
        assert!(!store.exists());
    }
}
