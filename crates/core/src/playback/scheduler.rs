use std::path::Path;

use super::clock::{CancelToken, Clock};
use crate::audio::AudioClock;
use crate::error::{OutputError, PlaybackError};
use crate::instruction::instruction::{Instruction, Timing};
use crate::output::LightOutput;

pub const DEFAULT_LAG_TOLERANCE: f64 = 0.05;
pub const DEFAULT_CATCH_UP_MULTIPLIER: f64 = 0.66;
pub const DEFAULT_CORRECTION_COOLDOWN: f64 = 2.0;
pub const DEFAULT_AUDIO_WARMUP: f64 = 0.5;

/// How often the end of the music is polled once the lights are done.
const BUSY_POLL: f64 = 0.05;

#[derive(Clone, Debug, PartialEq)]
pub struct SchedulerConfig {
    /// How far the lights may trail the music before waits get shortened.
    pub lag_tolerance: f64,
    /// Share of a measured drift that is corrected at once.
    pub catch_up_multiplier: f64,
    /// Minimum seconds between two corrections.
    pub correction_cooldown: f64,
    /// Delay between the music position and what the audience hears.
    pub audio_latency: f64,
    pub audio_warmup: f64,
    pub volume: f32,
    pub skip_zero_waits: bool,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            lag_tolerance: DEFAULT_LAG_TOLERANCE,
            catch_up_multiplier: DEFAULT_CATCH_UP_MULTIPLIER,
            correction_cooldown: DEFAULT_CORRECTION_COOLDOWN,
            audio_latency: 0.0,
            audio_warmup: DEFAULT_AUDIO_WARMUP,
            volume: 1.0,
            skip_zero_waits: true,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PlaybackOutcome {
    Finished,
    Aborted,
}

/// Steps through compiled instructions against the music, nudging the light
/// clock whenever the two drift apart.
pub struct Scheduler<'a> {
    config: &'a SchedulerConfig,
    clock: &'a mut dyn Clock,
    audio: &'a mut dyn AudioClock,
    output: &'a mut dyn LightOutput,
    cancel: &'a CancelToken,
    elapsed: f64,
    lag_debt: f64,
    last_correction: Option<f64>,
}

/// Result of one step: keep going or the show was interrupted.
type Step = Result<bool, PlaybackError>;

impl<'a> Scheduler<'a> {
    pub fn new(
        config: &'a SchedulerConfig,
        clock: &'a mut dyn Clock,
        audio: &'a mut dyn AudioClock,
        output: &'a mut dyn LightOutput,
        cancel: &'a CancelToken,
    ) -> Self {
        Self {
            config,
            clock,
            audio,
            output,
            cancel,
            elapsed: 0.0,
            lag_debt: 0.0,
            last_correction: None,
        }
    }

    /// Play `music` and the light instructions together.
    ///
    /// The music is stopped and all lights are switched off however the show ends.
    pub fn run(
        &mut self,
        music: &Path,
        instructions: &[Instruction],
    ) -> Result<PlaybackOutcome, PlaybackError> {
        let result = self.perform(music, instructions);

        self.audio.stop();
        if let Err(e) = self.output.all_off() {
            log::warn!("Failed to switch lights off: {}", e);
        }

        match result {
            Ok(true) => Ok(PlaybackOutcome::Finished),
            Ok(false) => {
                log::warn!("Playback aborted at {:.3}s", self.elapsed);
                Ok(PlaybackOutcome::Aborted)
            }
            Err(e) => Err(e),
        }
    }

    fn perform(&mut self, music: &Path, instructions: &[Instruction]) -> Step {
        self.elapsed = 0.0;
        self.lag_debt = 0.0;
        self.last_correction = None;

        let channels = self.output.channel_count();
        if let Some(instruction) = instructions.iter().find(|i| i.states.len() != channels) {
            return Err(OutputError::ChannelCount {
                expected: channels,
                found: instruction.states.len(),
            }
            .into());
        }

        if !self.start_music(music)? {
            return Ok(false);
        }

        for instruction in instructions {
            for label in instruction.labels() {
                log::info!("{}", label);
            }

            // A zero wait still carries the states of cues that start at once.
            let keep_going = match &instruction.timing {
                _ if self.config.skip_zero_waits && instruction.is_zero_wait() => {
                    !self.cancel.is_cancelled()
                }
                Timing::Wait(delta) => self.wait(*delta),
                Timing::Align { at, .. } => self.align(*at)?,
            };
            if !keep_going {
                return Ok(false);
            }

            self.output.apply(&instruction.states)?;
        }

        self.output.all_off()?;
        while self.audio.is_busy() {
            if !self.pause(BUSY_POLL) {
                return Ok(false);
            }
        }
        log::info!("Show finished after {:.3}s", self.elapsed);
        Ok(true)
    }

    /// Play a muted moment so the device is warm, then start for real.
    fn start_music(&mut self, music: &Path) -> Step {
        log::info!("Loading music {}", music.display());
        self.audio.load(music)?;
        self.audio.set_volume(0.0);
        self.audio.play()?;
        if !self.pause(self.config.audio_warmup) {
            return Ok(false);
        }
        self.audio.stop();
        if !self.pause(self.config.audio_warmup) {
            return Ok(false);
        }

        self.audio.set_volume(self.config.volume);
        self.audio.play()?;
        self.output.all_off()?;
        Ok(self.pause(self.config.audio_latency))
    }

    fn wait(&mut self, delta: f64) -> bool {
        let wait = delta.max(0.0);
        let half = wait / 2.0;
        let sleep = if self.lag_debt > half {
            self.lag_debt -= half;
            half
        } else {
            let sleep = (wait - self.lag_debt).max(0.0);
            self.lag_debt = 0.0;
            sleep
        };
        self.elapsed += wait;
        self.pause(sleep)
    }

    fn align(&mut self, at: f64) -> Step {
        let pending = at - self.elapsed - self.lag_debt;
        self.lag_debt = 0.0;
        if pending > 0.0 {
            if !self.pause(pending) {
                return Ok(false);
            }
            self.elapsed += pending;
        }

        let position = match self.audio.position() {
            Some(position) if self.audio.is_busy() => position - self.config.audio_latency,
            _ => {
                log::error!("Music failed to load or ended, aborting");
                return Err(PlaybackError::AudioStopped { at: self.elapsed });
            }
        };

        let drift = self.elapsed - position;
        log::debug!(
            "Light time {:.3}s, music time {:.3}s",
            self.elapsed,
            position
        );

        let now = self.clock.now();
        let cooled = self
            .last_correction
            .is_none_or(|last| now - last > self.config.correction_cooldown);

        if drift > 0.0 && cooled {
            let catch_up = drift * self.config.catch_up_multiplier;
            log::warn!("Music is behind, holding the lights {:.3}s", catch_up);
            self.last_correction = Some(now);
            if !self.pause(catch_up) {
                return Ok(false);
            }
        } else if -drift > self.config.lag_tolerance && cooled {
            self.lag_debt = -drift * self.config.catch_up_multiplier;
            self.last_correction = Some(now);
            log::warn!(
                "Lights are behind, shaving {:.3}s off the next waits",
                self.lag_debt
            );
        }

        self.elapsed = at;
        Ok(true)
    }

    fn pause(&mut self, seconds: f64) -> bool {
        if seconds > 0.0 {
            self.clock.sleep(seconds, self.cancel)
        } else {
            !self.cancel.is_cancelled()
        }
    }
}
