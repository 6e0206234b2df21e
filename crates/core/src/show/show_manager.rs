use std::fs;
use std::path::PathBuf;

use crate::error::LibraryError;

use super::show::Show;

/// Every show found under one shows directory, sorted by lowercase name.
pub struct ShowManager {
    shows_directory: PathBuf,
    shows: Vec<Show>,
}

impl ShowManager {
    pub fn new(shows_directory: impl Into<PathBuf>) -> Self {
        Self {
            shows_directory: shows_directory.into(),
            shows: Vec::new(),
        }
    }

    /// Create a manager and scan its directory right away.
    pub fn open(shows_directory: impl Into<PathBuf>) -> Result<Self, LibraryError> {
        let mut manager = Self::new(shows_directory);
        manager.rescan()?;
        Ok(manager)
    }

    pub fn shows(&self) -> &[Show] {
        &self.shows
    }

    /// Reload every show. Directories without readable metadata are skipped.
    pub fn rescan(&mut self) -> Result<usize, LibraryError> {
        if !self.shows_directory.is_dir() {
            return Err(LibraryError::MissingDirectory(self.shows_directory.clone()));
        }

        let entries = fs::read_dir(&self.shows_directory).map_err(|source| LibraryError::Io {
            path: self.shows_directory.clone(),
            source,
        })?;

        let mut shows = Vec::new();
        for entry in entries {
            let path = match entry {
                Ok(entry) => entry.path(),
                Err(e) => {
                    log::warn!("Skipping unreadable entry: {}", e);
                    continue;
                }
            };
            if !path.is_dir() {
                continue;
            }

            let name = path
                .file_name()
                .map(|name| name.to_string_lossy().into_owned())
                .unwrap_or_default();
            if !path.join(Show::metadata_file_for(&name)).is_file() {
                continue;
            }

            match Show::load(&path) {
                Ok(show) => shows.push(show),
                Err(e) => log::warn!("Skipping show '{}': {}", name, e),
            }
        }

        shows.sort_by_key(|show| show.name.to_lowercase());
        self.shows = shows;
        log::info!(
            "Found {} show{}",
            self.shows.len(),
            if self.shows.len() == 1 { "" } else { "s" }
        );
        Ok(self.shows.len())
    }

    /// One line per show; shows with their own title print as `"name" title`.
    pub fn listing(&self) -> String {
        if self.shows.is_empty() {
            return "There are no shows.".to_string();
        }

        self.shows
            .iter()
            .map(|show| {
                let mut line = if show.title() == show.name {
                    show.name.clone()
                } else {
                    format!("\"{}\" {}", show.name, show.title())
                };
                if !show.is_compiled() {
                    line.push_str(" (not compiled)");
                }
                line
            })
            .collect::<Vec<_>>()
            .join("\n")
    }

    /// Case-insensitive lookup by exact name, falling back to the first show
    /// whose name starts with `query`.
    pub fn find(&self, query: &str) -> Option<&Show> {
        self.position(query).map(|index| &self.shows[index])
    }

    pub fn find_mut(&mut self, query: &str) -> Option<&mut Show> {
        self.position(query).map(move |index| &mut self.shows[index])
    }

    pub fn get(&self, query: &str) -> Result<&Show, LibraryError> {
        self.find(query)
            .ok_or_else(|| LibraryError::NotFound(query.to_string()))
    }

    pub fn get_mut(&mut self, query: &str) -> Result<&mut Show, LibraryError> {
        self.find_mut(query)
            .ok_or_else(|| LibraryError::NotFound(query.to_string()))
    }

    fn position(&self, query: &str) -> Option<usize> {
        let query = query.trim().to_lowercase();
        if query.is_empty() {
            return None;
        }

        self.shows
            .binary_search_by(|show| show.name.to_lowercase().cmp(&query))
            .ok()
            .or_else(|| {
                self.shows
                    .iter()
                    .position(|show| show.name.to_lowercase().starts_with(&query))
            })
    }
}
