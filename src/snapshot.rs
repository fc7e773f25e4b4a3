use std::fs;
use std::io::{self, BufRead, BufReader, Write};
use std::path::{Path, PathBuf};

use crate::error::SnapshotError;
use crate::model::{PlaylistId, PlaylistTarget, TrackId, TrackSet, is_valid_id};

/// First line of a snapshot taken from the saved-tracks library.
pub const SAVED_TRACKS_MARKER: &str = "Saved Tracks";

pub const DEFAULT_SNAPSHOT_FILE: &str = "playlist.txt";

/// A pending write-back: the destination and the exact order to write.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Snapshot {
    pub target: PlaylistTarget,
    pub tracks: TrackSet,
}

/// Plain text recovery file.
///
/// Line 1 is the target (`Saved Tracks` or a playlist id), every further line
/// one track id in write-back order.
#[derive(Debug, Clone)]
pub struct SnapshotStore {
    path: PathBuf,
}

impl SnapshotStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    #[cfg(test)]
    pub fn exists(&self) -> bool {
        self.path.is_file()
    }

    /// Replaces any prior snapshot. The content goes to a temporary file in
    /// the same directory first and is renamed over the target, so readers see
    /// either the old or the new snapshot in full.
    pub fn save(&self, target: &PlaylistTarget, tracks: &[TrackId]) -> Result<(), SnapshotError> {
        let dir = match self.path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        };
        fs::create_dir_all(dir)?;

        let mut file = tempfile::NamedTempFile::new_in(dir)?;
        {
            let mut writer = io::BufWriter::new(file.as_file_mut());
            match target {
                PlaylistTarget::SavedLibrary => writeln!(writer, "{SAVED_TRACKS_MARKER}")?,
                PlaylistTarget::NamedPlaylist(id) => writeln!(writer, "{id}")?,
            }
            for track in tracks {
                writeln!(writer, "{track}")?;
            }
            writer.flush()?;
        }
        file.as_file().sync_all()?;
        file.persist(&self.path)?;

        log::info!(
            "Saved {} tracks for {} to {}",
            tracks.len(),
            target,
            self.path.display()
        );
        Ok(())
    }

    /// Returns `None` when no snapshot exists. Unparseable content is an
    /// error, never treated as absent.
    pub fn load_if_present(&self) -> Result<Option<Snapshot>, SnapshotError> {
        let file = match fs::File::open(&self.path) {
            Ok(file) => file,
            Err(error) if error.kind() == io::ErrorKind::NotFound => return Ok(None),
            Err(error) => return Err(error.into()),
        };
        parse(BufReader::new(file)).map(Some)
    }

    /// Removes the snapshot after its write-back completed.
    pub fn clear(&self) -> Result<(), SnapshotError> {
        match fs::remove_file(&self.path) {
            Ok(()) => {
                log::debug!("Removed snapshot {}", self.path.display());
                Ok(())
            }
            Err(error) if error.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(error) => Err(error.into()),
        }
    }
}

fn parse(reader: impl BufRead) -> Result<Snapshot, SnapshotError> {
    let mut lines = reader.lines();

    let header = read_line(lines.next(), 1)?.ok_or_else(|| SnapshotError::Corrupt {
        line: 1,
        reason: "missing target line".to_string(),
    })?;
    let target = if header == SAVED_TRACKS_MARKER {
        PlaylistTarget::SavedLibrary
    } else if is_valid_id(&header) {
        PlaylistTarget::NamedPlaylist(PlaylistId::new(header))
    } else {
        return Err(SnapshotError::Corrupt {
            line: 1,
            reason: format!("invalid target {header:?}"),
        });
    };

    let mut tracks = TrackSet::new();
    let mut number = 2;
    while let Some(line) = read_line(lines.next(), number)? {
        let track = TrackId::parse(&line).ok_or_else(|| SnapshotError::Corrupt {
            line: number,
            reason: format!("invalid track id {line:?}"),
        })?;
        tracks.push(track);
        number += 1;
    }

    Ok(Snapshot { target, tracks })
}

/// Bytes that are not UTF-8 make the snapshot corrupt, not unreadable.
fn read_line(
    line: Option<io::Result<String>>,
    number: usize,
) -> Result<Option<String>, SnapshotError> {
    match line {
        None => Ok(None),
        Some(Ok(line)) => Ok(Some(line)),
        Some(Err(error)) if error.kind() == io::ErrorKind::InvalidData => {
            Err(SnapshotError::Corrupt {
                line: number,
                reason: error.to_string(),
            })
        }
        Some(Err(error)) => Err(error.into()),
    }
}
