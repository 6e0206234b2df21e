use std::mem;

use super::cutoff::CutoffTable;
use super::event::{collect_events, Event, EventKind};
use crate::instruction::instruction::Instruction;
use crate::script::section::{channel_index, Section};
use crate::Mode;

/// Events closer together than this many seconds share a frame.
pub const DEFAULT_TIME_MARGIN: f64 = 0.01;

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct CompileOptions {
    pub channel_count: usize,
    pub time_margin: f64,
}

impl CompileOptions {
    pub fn new(channel_count: usize) -> Self {
        Self {
            channel_count,
            time_margin: DEFAULT_TIME_MARGIN,
        }
    }
}

/// Turns parsed sections into the coalesced, priority-resolved instruction stream.
pub struct TimelineCompiler {
    options: CompileOptions,
}

impl TimelineCompiler {
    pub fn new(options: CompileOptions) -> Self {
        Self { options }
    }

    pub fn compile(&self, sections: &[Section]) -> Vec<Instruction> {
        self.coalesce(&collect_events(sections))
    }

    /// Walk time-sorted events, emitting one instruction per frame.
    pub fn coalesce(&self, events: &[Event]) -> Vec<Instruction> {
        let CompileOptions {
            channel_count,
            time_margin,
        } = self.options;

        let mut instructions = Vec::new();
        let mut states = vec![Mode::Hold; channel_count];
        let mut labels: Vec<String> = Vec::new();
        let mut cutoffs = CutoffTable::new(channel_count, time_margin);
        let mut prev = 0.0;
        let mut cur = 0.0;

        for event in events {
            if (event.time - cur).abs() > time_margin {
                let timing_labels = mem::take(&mut labels);
                instructions.push(if timing_labels.is_empty() {
                    Instruction::wait(cur - prev, states.clone())
                } else {
                    Instruction::align(cur, timing_labels, states.clone())
                });
                prev = cur;
                cur = event.time;
            }

            if let EventKind::Marker { label } = &event.kind {
                labels.push(label.clone());
                continue;
            }

            let Some((channel, mode, duration)) = event.cue() else {
                continue;
            };
            let Some(index) = channel_index(channel, channel_count) else {
                continue;
            };
            if let Some(resolved) = cutoffs.resolve(index, mode, cur, duration) {
                states[index] = resolved;
            }
        }

        instructions.push(Instruction::wait(cur - prev, states));
        instructions
    }
}
