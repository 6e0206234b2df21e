use serde::{Deserialize, Serialize};
use serde_json::{from_reader, to_writer_pretty};
use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};

use crate::error::LibraryError;

fn default_volume() -> f32 {
    1.0
}

/// Contents of a show's `<name>.json`.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct ShowMetadata {
    /// Audio file, relative to the show directory.
    pub music: String,
    /// Compiled instruction file, relative to the show directory.
    pub lightmap: String,
    /// Script files compiled in this order.
    #[serde(default)]
    pub compile: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default = "default_volume")]
    pub volume: f32,
    #[serde(default)]
    pub compiled: bool,
}

impl ShowMetadata {
    pub fn new(music: impl Into<String>, lightmap: impl Into<String>, compile: Vec<String>) -> Self {
        Self {
            music: music.into(),
            lightmap: lightmap.into(),
            compile,
            title: None,
            volume: default_volume(),
            compiled: false,
        }
    }
}

/// A show on disk: `<shows dir>/<name>/` holding its metadata, scripts,
/// music and compiled instructions.
#[derive(Clone, Debug, PartialEq)]
pub struct Show {
    pub name: String,
    pub dir: PathBuf,
    pub metadata: ShowMetadata,
}

impl Show {
    pub fn new(dir: impl Into<PathBuf>, name: impl Into<String>, metadata: ShowMetadata) -> Self {
        Self {
            name: name.into(),
            dir: dir.into(),
            metadata,
        }
    }

    /// Load the show stored in `dir`, named after the directory.
    pub fn load(dir: &Path) -> Result<Self, LibraryError> {
        let name = dir
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_default();
        let path = dir.join(Self::metadata_file_for(&name));

        let file = File::open(&path).map_err(|source| LibraryError::Io {
            path: path.clone(),
            source,
        })?;
        let metadata: ShowMetadata = from_reader(BufReader::new(file))
            .map_err(|source| LibraryError::Metadata { path, source })?;

        Ok(Self::new(dir, name, metadata))
    }

    pub fn save(&self) -> Result<(), LibraryError> {
        let path = self.metadata_path();
        let file = File::create(&path).map_err(|source| LibraryError::Io {
            path: path.clone(),
            source,
        })?;
        to_writer_pretty(file, &self.metadata)
            .map_err(|source| LibraryError::Metadata { path, source })
    }

    pub fn metadata_file_for(name: &str) -> String {
        format!("{}.json", name)
    }

    pub fn metadata_file(&self) -> String {
        Self::metadata_file_for(&self.name)
    }

    pub fn metadata_path(&self) -> PathBuf {
        self.dir.join(self.metadata_file())
    }

    pub fn title(&self) -> &str {
        self.metadata.title.as_deref().unwrap_or(&self.name)
    }

    pub fn music_path(&self) -> PathBuf {
        self.dir.join(&self.metadata.music)
    }

    pub fn lightmap_path(&self) -> PathBuf {
        self.dir.join(&self.metadata.lightmap)
    }

    pub fn script_paths(&self) -> impl Iterator<Item = PathBuf> + '_ {
        self.metadata.compile.iter().map(|script| self.dir.join(script))
    }

    pub fn is_compiled(&self) -> bool {
        self.metadata.compiled
    }

    /// Whether writing the lightmap would clobber one of the show's own files.
    pub fn lightmap_conflicts(&self) -> bool {
        let lightmap = &self.metadata.lightmap;
        self.metadata.compile.contains(lightmap)
            || *lightmap == self.name
            || *lightmap == self.metadata_file()
    }

    /// Record that the lightmap is current and persist the flag.
    /// Persist the compiled flag. The in-memory flag is left unchanged if saving fails.
    pub fn mark_compiled(&mut self) -> Result<(), LibraryError> {
        let was_compiled = self.metadata.compiled;
        self.metadata.compiled = true;
        let result = self.save();
        if result.is_err() {
            self.metadata.compiled = was_compiled;
        }
        result
    }
}
