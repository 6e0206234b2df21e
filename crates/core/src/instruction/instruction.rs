use crate::Mode;

/// How playback reaches the moment an instruction describes.
#[derive(Clone, Debug, PartialEq)]
pub enum Timing {
    /// Sleep this many seconds after the previous instruction.
    Wait(f64),
    /// Resynchronize to this absolute show time; sections start here.
    Align { at: f64, labels: Vec<String> },
}

/// One coalesced playback frame.
///
/// `states` holds exactly one mode per channel and stays in effect until the
/// next instruction.
#[derive(Clone, Debug, PartialEq)]
pub struct Instruction {
    pub timing: Timing,
    pub states: Vec<Mode>,
}

impl Instruction {
    pub fn wait(delta: f64, states: Vec<Mode>) -> Self {
        Self {
            timing: Timing::Wait(delta),
            states,
        }
    }

    pub fn align(at: f64, labels: Vec<String>, states: Vec<Mode>) -> Self {
        Self {
            timing: Timing::Align { at, labels },
            states,
        }
    }

    pub fn is_alignment(&self) -> bool {
        matches!(self.timing, Timing::Align { .. })
    }

    /// The wait delta or the alignment time.
    pub fn time(&self) -> f64 {
        match self.timing {
            Timing::Wait(delta) => delta,
            Timing::Align { at, .. } => at,
        }
    }

    pub fn labels(&self) -> &[String] {
        match &self.timing {
            Timing::Wait(_) => &[],
            Timing::Align { labels, .. } => labels,
        }
    }

    /// Section labels joined with newlines, if any.
    pub fn label_text(&self) -> Option<String> {
        let labels = self.labels();
        (!labels.is_empty()).then(|| labels.join("\n"))
    }

    /// A wait that contributes nothing to elapsed time.
    pub fn is_zero_wait(&self) -> bool {
        matches!(self.timing, Timing::Wait(delta) if delta == 0.0)
    }
}

/// Nominal show length: the time reached after the last instruction.
pub fn show_length(instructions: &[Instruction]) -> f64 {
    instructions
        .iter()
        .fold(0.0, |elapsed, instruction| match instruction.timing {
            Timing::Wait(delta) => elapsed + delta.max(0.0),
            Timing::Align { at, .. } => at,
        })
}
