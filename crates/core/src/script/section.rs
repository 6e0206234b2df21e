use crate::Mode;

/// Tempo of a section that never saw a `bpm:` directive.
pub const DEFAULT_BPM: f64 = 60.0;

/// 0-based index of a 1-based channel ordinal, if it is one of `channel_count` channels.
pub fn channel_index(ordinal: i64, channel_count: usize) -> Option<usize> {
    let index = usize::try_from(ordinal.checked_sub(1)?).ok()?;
    (index < channel_count).then_some(index)
}

/// One scripted cue. Offsets are in beats relative to the section anchor.
#[derive(Clone, Debug, PartialEq)]
pub struct Entry {
    /// 1-based channel ordinal as written in the script.
    pub channel: i64,
    pub mode: Mode,
    pub start: f64,
    pub duration: f64,
}

impl Entry {
    pub fn new(channel: i64, mode: Mode, start: f64, duration: f64) -> Self {
        Self {
            channel,
            mode,
            start,
            duration,
        }
    }
}

/// A named, reusable block of cues played at each of its anchor times.
#[derive(Clone, Debug, PartialEq)]
pub struct Section {
    pub name: String,
    pub bpm: f64,
    pub repeat: u32,
    /// Length of one repetition in beats.
    pub length: f64,
    pub entries: Vec<Entry>,
    /// Absolute anchor times in seconds.
    pub times: Vec<f64>,
}

impl Section {
    pub fn new(name: impl Into<String>, bpm: f64) -> Self {
        Self {
            name: name.into(),
            bpm,
            repeat: 1,
            length: 0.0,
            entries: Vec::new(),
            times: Vec::new(),
        }
    }

    pub fn beats_to_seconds(&self, beats: f64) -> f64 {
        beats * 60.0 / self.bpm
    }

    /// Entries with every repetition laid out, copy `i` shifted by `i * length` beats.
    ///
    /// Entries running past the repeat window are kept as they are.
    pub fn expanded_entries(&self) -> Vec<Entry> {
        let mut expanded = Vec::with_capacity(self.entries.len() * self.repeat as usize);
        for i in 0..self.repeat {
            let offset = self.length * f64::from(i);
            expanded.extend(self.entries.iter().map(|entry| Entry {
                start: entry.start + offset,
                ..entry.clone()
            }));
        }
        expanded
    }
}
