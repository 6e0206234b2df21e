use std::fs::File;
use std::io::BufReader;
use std::path::Path;

use rodio::{Decoder, OutputStream, OutputStreamBuilder, Sink};

use super::AudioClock;
use crate::error::AudioError;

/// Plays one track at a time through the default output device.
pub struct AudioPlayer {
    stream: OutputStream,
    sink: Option<Sink>,
    current_file: Option<String>,
    volume: f32,
}

impl AudioPlayer {
    pub fn new() -> Result<Self, AudioError> {
        let mut stream = OutputStreamBuilder::open_default_stream()
            .map_err(|e| AudioError::Device(e.to_string()))?;
        stream.log_on_drop(false);

        Ok(AudioPlayer {
            stream,
            sink: None,
            current_file: None,
            volume: 1.0,
        })
    }
}

impl AudioClock for AudioPlayer {
    fn load(&mut self, path: &Path) -> Result<(), AudioError> {
        let load_error = |reason: String| AudioError::Load {
            path: path.to_path_buf(),
            reason,
        };

        let file = File::open(path).map_err(|e| load_error(e.to_string()))?;
        let source = Decoder::new(BufReader::new(file)).map_err(|e| load_error(e.to_string()))?;

        // Queue paused so play() decides when the track starts.
        let sink = Sink::connect_new(self.stream.mixer());
        sink.pause();
        sink.append(source);
        sink.set_volume(self.volume);

        if let Some(previous) = self.sink.replace(sink) {
            previous.stop();
        }
        self.current_file = Some(path.to_string_lossy().to_string());
        log::debug!("Loaded audio file {}", path.display());

        Ok(())
    }

    fn play(&mut self) -> Result<(), AudioError> {
        let Some(current) = self.current_file.clone() else {
            return Err(AudioError::NotLoaded);
        };

        // A stopped sink is empty, so replaying means reloading the track.
        if self.sink.as_ref().map_or(true, Sink::empty) {
            self.load(Path::new(&current))?;
        }
        if let Some(sink) = &self.sink {
            sink.play();
        }
        Ok(())
    }

    fn stop(&mut self) {
        if let Some(sink) = &self.sink {
            sink.stop();
        }
    }

    fn set_volume(&mut self, volume: f32) {
        self.volume = volume.clamp(0.0, 1.0);
        if let Some(sink) = &self.sink {
            sink.set_volume(self.volume);
        }
    }

    fn position(&self) -> Option<f64> {
        self.sink.as_ref().map(|sink| sink.get_pos().as_secs_f64())
    }

    fn is_busy(&self) -> bool {
        if let Some(sink) = &self.sink {
            !sink.is_paused() && !sink.empty()
        } else {
            false
        }
    }
}
