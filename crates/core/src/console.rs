use std::fmt;
use std::fs;

use rand::seq::SliceRandom;
use rand::Rng;

use crate::audio::AudioClock;
use crate::config::Settings;
use crate::error::{CompileError, LibraryError, PlaybackError, ShowError};
use crate::instruction::codec;
use crate::output::LightOutput;
use crate::playback::{CancelToken, Clock, PlaybackOutcome, Scheduler, SystemClock};
use crate::show::show_compiler::{compile_show, CompileReport};
use crate::show::show_manager::ShowManager;

/// How long a second Ctrl+C after an aborted show stops the whole run.
const SKIP_WINDOW: f64 = 1.0;

/// Owns everything a show run needs: settings, the show library, the output
/// and audio devices and the cancellation token.
pub struct ShowConsole {
    settings: Settings,
    library: ShowManager,
    output: Box<dyn LightOutput>,
    audio: Box<dyn AudioClock>,
    clock: Box<dyn Clock>,
    cancel: CancelToken,
}

/// Result of playing every show in turn.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct PlayAllReport {
    pub played: Vec<String>,
    pub skipped: Vec<String>,
    /// Playback was stopped before the list ran out.
    pub stopped: bool,
}

impl fmt::Display for PlayAllReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.stopped {
            write!(f, "Playback aborted")?;
        } else {
            write!(f, "All shows have been played")?;
        }
        write!(f, " ({} played", self.played.len())?;
        if !self.skipped.is_empty() {
            write!(f, ", skipped: {}", self.skipped.join(", "))?;
        }
        write!(f, ")")
    }
}

impl ShowConsole {
    pub fn new(
        settings: Settings,
        library: ShowManager,
        output: Box<dyn LightOutput>,
        audio: Box<dyn AudioClock>,
    ) -> Self {
        Self {
            settings,
            library,
            output,
            audio,
            clock: Box::new(SystemClock::new()),
            cancel: CancelToken::new(),
        }
    }

    pub fn with_clock(mut self, clock: Box<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn library(&self) -> &ShowManager {
        &self.library
    }

    /// Handle for interrupting playback from another thread.
    pub fn cancel_token(&self) -> CancelToken {
        self.cancel.clone()
    }

    pub fn rescan(&mut self) -> Result<usize, LibraryError> {
        self.library.rescan()
    }

    pub fn compile(&mut self, query: &str) -> Result<CompileReport, CompileError> {
        let options = self.settings.compile_options();
        let show = self.library.get_mut(query)?;
        compile_show(show, options)
    }

    /// Play a compiled show from its lightmap.
    pub fn play(&mut self, query: &str) -> Result<PlaybackOutcome, PlaybackError> {
        self.cancel.reset();
        self.play_show(query)
    }

    fn play_show(&mut self, query: &str) -> Result<PlaybackOutcome, PlaybackError> {
        let show = self.library.get(query)?.clone();
        if !show.is_compiled() {
            return Err(PlaybackError::NotCompiled(show.name));
        }

        let lightmap = show.lightmap_path();
        if !lightmap.is_file() {
            return Err(PlaybackError::MissingInstructions(lightmap));
        }
        let text = fs::read_to_string(&lightmap).map_err(|source| PlaybackError::Io {
            path: lightmap.clone(),
            source,
        })?;
        let instructions = codec::decode(&text, self.settings.channel_count())?;

        let config = self.settings.scheduler_config(show.metadata.volume);
        log::info!("Playing {}", show.title());

        Scheduler::new(
            &config,
            self.clock.as_mut(),
            self.audio.as_mut(),
            self.output.as_mut(),
            &self.cancel,
        )
        .run(&show.music_path(), &instructions)
    }

    /// Compile a show and play it straight away, the configured test show by default.
    pub fn test(&mut self, query: Option<&str>) -> Result<PlaybackOutcome, ShowError> {
        let name = query.unwrap_or(&self.settings.test_show).to_string();
        self.cancel.reset();
        let report = self.compile(&name)?;
        log::info!("{}", report);

        if self.cancel.is_cancelled() {
            log::warn!("Interrupted while compiling, not playing {}", name);
            return Ok(PlaybackOutcome::Aborted);
        }
        Ok(self.play_show(&name)?)
    }

    /// Names of every show except the test show, alphabetical or shuffled by `rng`.
    pub fn playlist<R: Rng + ?Sized>(&self, rng: Option<&mut R>) -> Vec<String> {
        let test_show = self.settings.test_show.to_lowercase();
        let mut names: Vec<String> = self
            .library
            .shows()
            .iter()
            .filter(|show| show.name.to_lowercase() != test_show)
            .map(|show| show.name.clone())
            .collect();
        if let Some(rng) = rng {
            names.shuffle(rng);
        }
        names
    }

    /// Play every show in turn. A failed or aborted show is skipped; aborting
    /// again within a second stops the whole run.
    pub fn play_all(&mut self, shuffle: bool) -> PlayAllReport {
        let playlist = self.playlist(shuffle.then(rand::rng).as_mut());
        self.play_list(&playlist)
    }

    pub fn play_list(&mut self, playlist: &[String]) -> PlayAllReport {
        let mut report = PlayAllReport::default();
        self.cancel.reset();

        for name in playlist {
            match self.play_show(name) {
                Ok(PlaybackOutcome::Finished) => {
                    report.played.push(name.clone());
                    continue;
                }
                Ok(PlaybackOutcome::Aborted) => {}
                Err(e) => log::error!("{}: {}", name, e),
            }

            report.skipped.push(name.clone());
            log::warn!("Skipping... Press Ctrl+C again within 1 sec to abort all playback.");
            self.cancel.reset();
            if !self.clock.sleep(SKIP_WINDOW, &self.cancel) {
                report.stopped = true;
                break;
            }
        }

        report
    }
}
