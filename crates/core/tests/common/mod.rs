#![allow(dead_code)]

use std::cell::{Cell, RefCell};
use std::fs;
use std::path::Path;
use std::rc::Rc;

use twinkle_core::{
    AudioClock, AudioError, CancelToken, Clock, LightOutput, Mode, OutputError, Settings,
};
use twinkle_fixtures::LightLayout;

pub type Time = Rc<Cell<f64>>;

/// Virtual clock that jumps forward instead of sleeping. Each trigger time
/// fires the cancel token once, on the first sleep that reaches it.
pub struct FakeClock {
    pub time: Time,
    pub triggers: Rc<RefCell<Vec<f64>>>,
}

impl Clock for FakeClock {
    fn now(&self) -> f64 {
        self.time.get()
    }

    fn sleep(&mut self, seconds: f64, cancel: &CancelToken) -> bool {
        assert!(seconds > 0.0, "negative sleep {}", seconds);
        self.time.set(self.time.get() + seconds);

        let mut triggers = self.triggers.borrow_mut();
        if let Some(index) = triggers.iter().position(|&t| t <= self.time.get()) {
            triggers.remove(index);
            cancel.cancel();
        }
        !cancel.is_cancelled()
    }
}

/// Music that keeps perfect time with the virtual clock for `length` seconds.
pub struct FakeAudio {
    pub time: Time,
    pub length: f64,
    pub started: Option<f64>,
    pub loaded: Rc<RefCell<Vec<String>>>,
}

impl AudioClock for FakeAudio {
    fn load(&mut self, path: &Path) -> Result<(), AudioError> {
        self.loaded
            .borrow_mut()
            .push(path.file_name().unwrap().to_string_lossy().into_owned());
        Ok(())
    }

    fn play(&mut self) -> Result<(), AudioError> {
        self.started = Some(self.time.get());
        Ok(())
    }

    fn stop(&mut self) {
        self.started = None;
    }

    fn set_volume(&mut self, _volume: f32) {}

    fn position(&self) -> Option<f64> {
        self.started.map(|start| self.time.get() - start)
    }

    fn is_busy(&self) -> bool {
        self.position().is_some_and(|p| p < self.length)
    }
}

pub struct RecordingOutput {
    pub time: Time,
    pub channels: usize,
    pub frames: Rc<RefCell<Vec<(f64, Vec<Mode>)>>>,
}

impl LightOutput for RecordingOutput {
    fn channel_count(&self) -> usize {
        self.channels
    }

    fn apply(&mut self, states: &[Mode]) -> Result<(), OutputError> {
        if states.len() != self.channels {
            return Err(OutputError::ChannelCount {
                expected: self.channels,
                found: states.len(),
            });
        }
        self.frames
            .borrow_mut()
            .push((self.time.get(), states.to_vec()));
        Ok(())
    }

    fn all_off(&mut self) -> Result<(), OutputError> {
        self.frames
            .borrow_mut()
            .push((self.time.get(), vec![Mode::Off; self.channels]));
        Ok(())
    }
}

/// Write a show directory with one script and placeholder music.
pub fn write_show(root: &Path, name: &str, script: &str) {
    let dir = root.join(name);
    fs::create_dir_all(&dir).unwrap();
    fs::write(dir.join("lights.txt"), script).unwrap();
    fs::write(dir.join("music.mp3"), b"").unwrap();
    fs::write(
        dir.join(format!("{}.json", name)),
        format!(
            r#"{{"music": "music.mp3", "lightmap": "{}.lm", "compile": ["lights.txt"]}}"#,
            name
        ),
    )
    .unwrap();
}

pub fn two_channel_settings(root: &Path) -> Settings {
    Settings {
        shows_dir: root.to_string_lossy().into_owned(),
        layout: LightLayout::sequential(2),
        ..Settings::default()
    }
}

pub const INTRO: &str = "\
# Two lights, one steady and one flickering
section: Intro
[1,3,0,1]
[2,2,0,2]
time: 0
";
