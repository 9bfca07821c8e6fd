use std::collections::HashSet;
use std::fs::{self, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::info;

#[derive(Debug, Error)]
#[error("sent log {}: {source}", .path.display())]
pub struct SentLogError {
    pub path: PathBuf,
    #[source]
    pub source: io::Error,
}

/// Ids that have already been posted, one per line on disk. The file only
/// ever grows; deleting it is the only way to start over.
#[derive(Debug)]
pub struct SentLog {
    path: PathBuf,
    ids: HashSet<String>,
    // File exists but its last line has no terminator.
    unterminated: bool,
}

impl SentLog {
    /// A missing file is an empty log.
    pub fn load(path: impl Into<PathBuf>) -> Result<Self, SentLogError> {
        let path = path.into();
        let contents = match fs::read_to_string(&path) {
            Ok(contents) => contents,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                info!(path = %path.display(), "no sent log yet, starting empty");
                String::new()
            }
            Err(source) => return Err(SentLogError { path, source }),
        };

        let ids = contents
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty())
            .map(String::from)
            .collect();
        let unterminated = !contents.is_empty() && !contents.ends_with('\n');

        Ok(Self {
            path,
            ids,
            unterminated,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn contains(&self, id: &str) -> bool {
        self.ids.contains(id.trim())
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    /// Appends `id` to the file, creating it if needed.
    pub fn record(&mut self, id: &str) -> Result<(), SentLogError> {
        let id = id.trim();
        let separator = if self.unterminated { "\n" } else { "" };
        let append = || -> io::Result<()> {
            let mut file = OpenOptions::new()
                .create(true)
                .append(true)
                .open(&self.path)?;
            writeln!(file, "{separator}{id}")?;
            file.sync_all()
        };
        append().map_err(|source| SentLogError {
            path: self.path.clone(),
            source,
        })?;

        self.unterminated = false;
        self.ids.insert(id.to_string());
        info!(%id, path = %self.path.display(), "recorded sent id");
        Ok(())
    }
}
