use crate::script::section::Section;
use crate::Mode;

#[derive(Clone, Debug, PartialEq)]
pub enum EventKind {
    /// A section starts playing.
    Marker { label: String },
    /// A cue takes effect for `duration` seconds.
    Begin {
        channel: i64,
        mode: Mode,
        duration: f64,
    },
    /// A cue's duration is over and the channel reverts to off. `ending` is the
    /// mode of the cue that ran out.
    End { channel: i64, ending: Mode },
}

/// A time-stamped fact produced from the sections before frames are coalesced.
#[derive(Clone, Debug, PartialEq)]
pub struct Event {
    /// Absolute show time in seconds.
    pub time: f64,
    pub kind: EventKind,
}

impl Event {
    pub fn marker(time: f64, label: impl Into<String>) -> Self {
        Self {
            time,
            kind: EventKind::Marker {
                label: label.into(),
            },
        }
    }

    /// Channel, mode and duration of a cue that can affect its channel.
    ///
    /// Hold cues are inert at both ends, so the end of a hold is not a revert.
    pub fn cue(&self) -> Option<(i64, Mode, f64)> {
        match self.kind {
            EventKind::Marker { .. } => None,
            EventKind::Begin {
                mode: Mode::Hold, ..
            }
            | EventKind::End {
                ending: Mode::Hold, ..
            } => None,
            EventKind::Begin {
                channel,
                mode,
                duration,
            } => Some((channel, mode, duration)),
            EventKind::End { channel, .. } => Some((channel, Mode::Off, 0.0)),
        }
    }
}

/// Every event of every section, stably sorted by time.
///
/// For each anchor time the marker comes first, then each expanded entry's
/// begin followed by its end. Ties keep that order.
pub fn collect_events<'a>(sections: impl IntoIterator<Item = &'a Section>) -> Vec<Event> {
    let mut events = Vec::new();

    for section in sections {
        let entries = section.expanded_entries();
        for &anchor in &section.times {
            events.push(Event::marker(anchor, section.name.clone()));
            for entry in &entries {
                let start = anchor + section.beats_to_seconds(entry.start);
                let duration = section.beats_to_seconds(entry.duration);
                events.push(Event {
                    time: start,
                    kind: EventKind::Begin {
                        channel: entry.channel,
                        mode: entry.mode,
                        duration,
                    },
                });
                events.push(Event {
                    time: start + duration,
                    kind: EventKind::End {
                        channel: entry.channel,
                        ending: entry.mode,
                    },
                });
            }
        }
    }

    events.sort_by(|a, b| a.time.total_cmp(&b.time));
    events
}
