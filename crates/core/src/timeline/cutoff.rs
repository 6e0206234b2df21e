use crate::Mode;

#[derive(Clone, Copy, Debug, Default, PartialEq)]
struct Cutoff {
    random: f64,
    on: f64,
}

/// How long earlier "on" and "random" cues keep priority on each channel.
///
/// On beats random, random beats off. A cue only loses to a higher-priority
/// cue whose cutoff still lies more than `margin` seconds ahead.
#[derive(Clone, Debug)]
pub struct CutoffTable {
    cutoffs: Vec<Cutoff>,
    margin: f64,
}

impl CutoffTable {
    pub fn new(channel_count: usize, margin: f64) -> Self {
        Self {
            cutoffs: vec![Cutoff::default(); channel_count],
            margin,
        }
    }

    /// Resolve a cue arriving at frame time `now` on `channel`.
    ///
    /// Returns the mode the channel takes, or `None` if the cue is overruled.
    /// Hold cues never change anything.
    pub fn resolve(&mut self, channel: usize, mode: Mode, now: f64, duration: f64) -> Option<Mode> {
        let margin = self.margin;
        let cutoff = self.cutoffs.get_mut(channel)?;
        let covers = |until: f64| until - now > margin;

        match mode {
            Mode::Hold => None,
            Mode::On => {
                cutoff.on = cutoff.on.max(now + duration);
                Some(Mode::On)
            }
            Mode::Random if !covers(cutoff.on) => {
                cutoff.random = cutoff.random.max(now + duration);
                Some(Mode::Random)
            }
            Mode::Off if !covers(cutoff.on) && !covers(cutoff.random) => Some(Mode::Off),
            Mode::Random | Mode::Off => None,
        }
    }
}
