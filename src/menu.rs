use std::io::{self, BufRead, Write};
use std::path::Path;

use crate::model::PlaylistTarget;
use crate::ports::track_provider::PlaylistSummary;

/// What the operator picked from the menu.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Selection {
    Shuffle(PlaylistTarget),
    Resume,
}

#[derive(Debug, Clone)]
struct MenuEntry {
    label: String,
    selection: Selection,
}

/// Numbered destinations: 0 is the saved-tracks library, then every playlist
/// the user may write to, then the resume option if a snapshot exists.
#[derive(Debug, Clone)]
pub struct Menu {
    entries: Vec<MenuEntry>,
}

impl Menu {
    pub fn new(playlists: &[PlaylistSummary], user_id: &str, snapshot: Option<&Path>) -> Self {
        let mut entries = vec![MenuEntry {
            label: "Saved Tracks".to_string(),
            selection: Selection::Shuffle(PlaylistTarget::SavedLibrary),
        }];
        entries.extend(
            playlists
                .iter()
                .filter(|playlist| playlist.is_writable_by(user_id))
                .map(|playlist| MenuEntry {
                    label: format!("{} ({} tracks)", playlist.name, playlist.total_tracks),
                    selection: Selection::Shuffle(PlaylistTarget::NamedPlaylist(
                        playlist.id.clone(),
                    )),
                }),
        );
        if let Some(path) = snapshot {
            entries.push(MenuEntry {
                label: format!("Resume {}", path.display()),
                selection: Selection::Resume,
            });
        }
        Self { entries }
    }

    #[cfg(test)]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[cfg(test)]
    pub fn label(&self, index: usize) -> Option<&str> {
        self.entries.get(index).map(|entry| entry.label.as_str())
    }

    pub fn render(&self, out: &mut impl Write) -> io::Result<()> {
        for (index, entry) in self.entries.iter().enumerate() {
            writeln!(out, "{} {}", index, entry.label)?;
        }
        Ok(())
    }

    pub fn select(&self, input: &str) -> Option<(usize, &Selection)> {
        let index: usize = input.trim().parse().ok()?;
        self.entries
            .get(index)
            .map(|entry| (index, &entry.selection))
    }

    /// Asks until a valid number is entered. Fails with `UnexpectedEof` when
    /// input ends first.
    pub fn prompt(&self, input: &mut impl BufRead, out: &mut impl Write) -> io::Result<Selection> {
        loop {
            writeln!(out, "\nEnter playlist number to shuffle: ")?;
            out.flush()?;

            let mut line = String::new();
            if input.read_line(&mut line)? == 0 {
                return Err(io::Error::new(
                    io::ErrorKind::UnexpectedEof,
                    "No playlist number entered",
                ));
            }
            match self.select(&line) {
                Some((index, selection)) => {
                    writeln!(
                        out,
                        "You have chosen playlist number {} with title: {}",
                        index, self.entries[index].label
                    )?;
                    return Ok(selection.clone());
                }
                None => writeln!(out, "Error invalid playlist number")?,
            }
        }
    }
}

/// Yes/no question defaulting to no.
pub fn confirm(question: &str, input: &mut impl BufRead, out: &mut impl Write) -> io::Result<bool> {
    write!(out, "{question} [y/N] ")?;
    out.flush()?;
    let mut line = String::new();
    input.read_line(&mut line)?;
    Ok(matches!(line.trim(), "y" | "Y" | "yes" | "Yes"))
}
