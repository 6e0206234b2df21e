use std::path::Path;

use crate::error::AudioError;

#[cfg(feature = "rodio")]
pub mod audio_player;

/// The music side of a show. It runs on its own clock; playback only reads it.
pub trait AudioClock {
    fn load(&mut self, path: &Path) -> Result<(), AudioError>;
    fn play(&mut self) -> Result<(), AudioError>;
    fn stop(&mut self);
    fn set_volume(&mut self, volume: f32);
    /// Position of the playing track in seconds, `None` when it can't be told.
    fn position(&self) -> Option<f64>;
    /// Whether the track is still playing.
    fn is_busy(&self) -> bool;
}
