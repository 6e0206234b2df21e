pub use audio::AudioClock;
#[cfg(feature = "rodio")]
pub use audio::audio_player::AudioPlayer;
pub use config::{normalize_volume, ConfigError, ConfigManager, ConfigSchema, Settings};
pub use console::{PlayAllReport, ShowConsole};
pub use error::{
    AudioError, CodecError, CompileError, LibraryError, OutputError, ParseError, ParseErrorKind,
    PlaybackError, ShowError,
};
pub use instruction::instruction::{Instruction, Timing};
pub use mode::Mode;
pub use output::{ConsoleRenderer, FrameResolver, GpioBoard, LightOutput};
pub use playback::{
    CancelToken, Clock, PlaybackOutcome, Scheduler, SchedulerConfig, SystemClock,
};
pub use script::parser::ScriptParser;
pub use script::section::{Entry, Section};
pub use show::show::{Show, ShowMetadata};
pub use show::show_compiler::{compile_show, CompileReport};
pub use show::show_manager::ShowManager;
pub use timeline::compiler::{CompileOptions, TimelineCompiler};

pub mod audio;
pub mod config;
mod console;
pub mod error;
pub mod instruction;
mod mode;
pub mod output;
pub mod playback;
pub mod script;
pub mod show;
pub mod timeline;
