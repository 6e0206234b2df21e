use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// A script line that could not be understood.
#[derive(Debug, Error)]
#[error("{file}:{line}: {kind}")]
pub struct ParseError {
    pub file: String,
    pub line: usize,
    pub kind: ParseErrorKind,
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum ParseErrorKind {
    #[error("invalid {field} '{value}'")]
    InvalidNumber { field: &'static str, value: String },
    #[error("light mode {0} is not one of 0 (hold), 1 (off), 2 (random) or 3 (on)")]
    InvalidMode(u8),
    #[error("entry has {0} fields, expected [channel, start, duration] or [channel, mode, start, duration]")]
    Arity(usize),
    #[error("entry is missing its closing ']'")]
    UnclosedEntry,
    #[error("repeat must look like 'repeat: <count> b <length>'")]
    MalformedRepeat,
    #[error("section name is empty")]
    EmptySectionName,
    #[error("'{0}' used outside of a section")]
    OutsideSection(&'static str),
    #[error("unrecognized directive '{0}'")]
    UnknownDirective(String),
}

#[derive(Debug, Error)]
pub enum CompileError {
    #[error(transparent)]
    Parse(#[from] ParseError),
    #[error("file name conflict between scripts and output '{file}' in show '{show}'; aborted")]
    NameConflict { show: String, file: String },
    #[error("failed to access {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error(transparent)]
    Library(#[from] LibraryError),
}

#[derive(Debug, Error)]
pub enum CodecError {
    #[error("line {line}: unrecognized instruction '{text}'")]
    UnknownLine { line: usize, text: String },
    #[error("line {line}: invalid time '{text}'")]
    InvalidSeconds { line: usize, text: String },
    #[error("line {line}: light states without a preceding wait or alignment")]
    StatesWithoutTiming { line: usize },
    #[error("line {line}: section label outside an alignment")]
    LabelWithoutAlignment { line: usize },
    #[error("line {line}: timing line is not followed by light states")]
    MissingStates { line: usize },
    #[error("line {line}: expected {expected} light states, found {found}")]
    ChannelCount {
        line: usize,
        expected: usize,
        found: usize,
    },
    #[error("line {line}: invalid light state '{value}'")]
    InvalidState { line: usize, value: String },
}

#[derive(Debug, Error)]
pub enum LibraryError {
    #[error("failed to access {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("invalid show metadata in {}: {source}", path.display())]
    Metadata {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("show not found: '{0}'. Use 'list' to list available shows")]
    NotFound(String),
    #[error("shows directory {} does not exist", .0.display())]
    MissingDirectory(PathBuf),
}

#[derive(Debug, Error)]
pub enum OutputError {
    #[error("GPIO pin {pin}: {source}")]
    Gpio {
        pin: u32,
        #[source]
        source: io::Error,
    },
    #[error("expected {expected} light states, got {found}")]
    ChannelCount { expected: usize, found: usize },
    #[error("invalid light layout: {0}")]
    Layout(#[from] twinkle_fixtures::LayoutError),
    #[error(transparent)]
    Io(#[from] io::Error),
}

#[derive(Debug, Error)]
pub enum AudioError {
    #[error("no audio output device: {0}")]
    Device(String),
    #[error("failed to load {}: {reason}", path.display())]
    Load { path: PathBuf, reason: String },
    #[error("no audio file loaded")]
    NotLoaded,
}

#[derive(Debug, Error)]
pub enum PlaybackError {
    #[error("show '{0}' hasn't been compiled yet")]
    NotCompiled(String),
    #[error("instruction file {} is missing", .0.display())]
    MissingInstructions(PathBuf),
    #[error("failed to read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("corrupt instruction file: {0}")]
    Codec(#[from] CodecError),
    #[error("audio failure: {0}")]
    Audio(#[from] AudioError),
    #[error("music failed to load or ended at {at:.3}s of the light show")]
    AudioStopped { at: f64 },
    #[error("light output failed: {0}")]
    Output(#[from] OutputError),
    #[error(transparent)]
    Library(#[from] LibraryError),
}

/// Failure of a compile-and-play run.
#[derive(Debug, Error)]
pub enum ShowError {
    #[error("compile failed: {0}")]
    Compile(#[from] CompileError),
    #[error(transparent)]
    Playback(#[from] PlaybackError),
}
