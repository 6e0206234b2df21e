use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use twinkle_fixtures::LightLayout;

use crate::output::DEFAULT_RANDOM_PROBABILITY;
use crate::playback::scheduler::{
    SchedulerConfig, DEFAULT_AUDIO_WARMUP, DEFAULT_CATCH_UP_MULTIPLIER,
    DEFAULT_CORRECTION_COOLDOWN, DEFAULT_LAG_TOLERANCE,
};
use crate::timeline::compiler::{CompileOptions, DEFAULT_TIME_MARGIN};

/// Audio delay of a typical Bluetooth speaker, for `--audio-latency`.
pub const BLUETOOTH_LATENCY: f64 = 0.22;

/// Configuration manager for Twinkle settings
/// Keeps the persisted settings next to the schema describing them. Stored in
/// config.json in the working directory by default
pub struct ConfigManager {
    config_path: PathBuf,
    settings: Settings,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct Settings {
    // General settings
    /// Directory holding one subdirectory per show. A leading `~` is the home directory.
    pub shows_dir: String,
    pub test_show: String,

    // Timing settings
    pub time_margin: f64,
    pub lag_tolerance: f64,
    pub catch_up_multiplier: f64,
    pub correction_cooldown: f64,
    pub skip_zero_waits: bool,

    // Audio settings
    pub volume: f32,
    pub audio_latency: f64,
    pub audio_warmup: f64,

    // Output settings
    pub random_probability: f64,
    pub layout: LightLayout,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            shows_dir: ".".to_string(),
            test_show: "test".to_string(),

            time_margin: DEFAULT_TIME_MARGIN,
            lag_tolerance: DEFAULT_LAG_TOLERANCE,
            catch_up_multiplier: DEFAULT_CATCH_UP_MULTIPLIER,
            correction_cooldown: DEFAULT_CORRECTION_COOLDOWN,
            skip_zero_waits: true,

            volume: 1.0,
            audio_latency: 0.0,
            audio_warmup: DEFAULT_AUDIO_WARMUP,

            random_probability: DEFAULT_RANDOM_PROBABILITY,
            layout: LightLayout::default(),
        }
    }
}

impl Settings {
    pub fn shows_path(&self) -> PathBuf {
        expand_home(&self.shows_dir)
    }

    pub fn channel_count(&self) -> usize {
        self.layout.channel_count()
    }

    pub fn compile_options(&self) -> CompileOptions {
        CompileOptions {
            channel_count: self.channel_count(),
            time_margin: self.time_margin,
        }
    }

    /// Scheduler settings for a show whose own volume is `show_volume`.
    pub fn scheduler_config(&self, show_volume: f32) -> SchedulerConfig {
        SchedulerConfig {
            lag_tolerance: self.lag_tolerance,
            catch_up_multiplier: self.catch_up_multiplier,
            correction_cooldown: self.correction_cooldown,
            audio_latency: self.audio_latency,
            audio_warmup: self.audio_warmup,
            volume: (self.volume * show_volume).clamp(0.0, 1.0),
            skip_zero_waits: self.skip_zero_waits,
        }
    }
}

fn expand_home(path: &str) -> PathBuf {
    match path.strip_prefix('~') {
        Some(rest) if rest.is_empty() || rest.starts_with('/') => match dirs::home_dir() {
            Some(home) => home.join(rest.trim_start_matches('/')),
            None => PathBuf::from(path),
        },
        _ => PathBuf::from(path),
    }
}

/// Read a volume given either as a fraction or as a percentage.
///
/// Values above 1 are percentages (`80` is 0.8); anything past 100 is scaled
/// down by tens until it fits. Negative values mute.
pub fn normalize_volume(volume: f32) -> f32 {
    if !volume.is_finite() || volume < 0.0 {
        return 0.0;
    }
    let mut volume = volume;
    if volume > 1.0 {
        while volume > 100.0 {
            volume /= 10.0;
        }
        volume /= 100.0;
    }
    volume
}

/// Available configuration options with validation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConfigSchema {
    pub general: GeneralConfigSchema,
    pub timing: TimingConfigSchema,
    pub audio: AudioConfigSchema,
    pub output: OutputConfigSchema,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeneralConfigSchema {
    pub shows_dir: ConfigOption<String>,
    pub test_show: ConfigOption<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TimingConfigSchema {
    pub time_margin: ConfigOption<f64>,
    pub lag_tolerance: ConfigOption<f64>,
    pub catch_up_multiplier: ConfigOption<f64>,
    pub correction_cooldown: ConfigOption<f64>,
    pub skip_zero_waits: ConfigOption<bool>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AudioConfigSchema {
    pub volume: ConfigOption<f32>,
    pub audio_latency: ConfigOption<f64>,
    pub audio_warmup: ConfigOption<f64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutputConfigSchema {
    pub random_probability: ConfigOption<f64>,
}

/// Configuration option with validation and available choices
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConfigOption<T> {
    pub default: T,
    pub valid_range: Option<(T, T)>,
    pub valid_choices: Option<Vec<T>>,
    pub description: String,
    pub requires_restart: bool,
}

impl<T> ConfigOption<T> {
    fn new(default: T, description: &str) -> Self {
        Self {
            default,
            valid_range: None,
            valid_choices: None,
            description: description.to_string(),
            requires_restart: false,
        }
    }

    fn ranged(default: T, min: T, max: T, description: &str) -> Self {
        Self {
            valid_range: Some((min, max)),
            ..Self::new(default, description)
        }
    }

    fn restart(mut self) -> Self {
        self.requires_restart = true;
        self
    }
}

/// Persisted configuration file format
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConfigFile {
    pub version: String,
    pub settings: Settings,
    pub created_at: String,
    pub modified_at: String,
}

impl ConfigManager {
    /// Create a new configuration manager
    /// If no path is provided, defaults to 'config.json' in the current working directory
    pub fn new(config_path: Option<PathBuf>) -> Self {
        let config_path = config_path.unwrap_or_else(|| PathBuf::from("config.json"));

        Self {
            config_path,
            settings: Settings::default(),
        }
    }

    /// Load settings from configuration file
    /// Creates the file with default settings if it doesn't exist
    pub fn load(&mut self) -> Result<Settings, ConfigError> {
        if !self.config_path.exists() {
            self.save()?;
            return Ok(self.settings.clone());
        }

        let content = fs::read_to_string(&self.config_path)
            .map_err(|e| ConfigError::ReadError(e.to_string()))?;

        let config_file: ConfigFile =
            serde_json::from_str(&content).map_err(|e| ConfigError::ParseError(e.to_string()))?;

        // Validate version compatibility
        if config_file.version != env!("CARGO_PKG_VERSION") {
            log::warn!(
                "Config file version {} doesn't match application version {}. Using defaults for new settings.",
                config_file.version,
                env!("CARGO_PKG_VERSION")
            );
        }

        Self::validate_settings(&config_file.settings).map_err(ConfigError::ValidationError)?;

        self.settings = config_file.settings;
        Ok(self.settings.clone())
    }

    /// Save current settings to configuration file
    pub fn save(&self) -> Result<(), ConfigError> {
        // Ensure config directory exists (if config is in a subdirectory)
        if let Some(parent) = self.config_path.parent() {
            if parent != Path::new("") && parent != Path::new(".") {
                fs::create_dir_all(parent).map_err(|e| ConfigError::WriteError(e.to_string()))?;
            }
        }

        let now = chrono::Utc::now().to_rfc3339();
        let created_at = self.created_at().unwrap_or_else(|| now.clone());
        let config_file = ConfigFile {
            version: env!("CARGO_PKG_VERSION").to_string(),
            settings: self.settings.clone(),
            created_at,
            modified_at: now,
        };

        let content = serde_json::to_string_pretty(&config_file)
            .map_err(|e| ConfigError::SerializeError(e.to_string()))?;

        fs::write(&self.config_path, content)
            .map_err(|e| ConfigError::WriteError(e.to_string()))?;

        Ok(())
    }

    /// Creation time recorded in the existing file, if there is one.
    fn created_at(&self) -> Option<String> {
        let content = fs::read_to_string(&self.config_path).ok()?;
        let config_file: ConfigFile = serde_json::from_str(&content).ok()?;
        Some(config_file.created_at)
    }

    /// Update settings and save to file
    pub fn update_settings(&mut self, settings: Settings) -> Result<(), ConfigError> {
        Self::validate_settings(&settings).map_err(ConfigError::ValidationError)?;
        self.settings = settings;
        self.save()
    }

    /// Get current settings
    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    /// Get configuration file path
    pub fn config_path(&self) -> &Path {
        &self.config_path
    }

    /// Get configuration schema with available options
    pub fn schema() -> ConfigSchema {
        let defaults = Settings::default();
        ConfigSchema {
            general: GeneralConfigSchema {
                shows_dir: ConfigOption::new(
                    defaults.shows_dir,
                    "Directory with one subdirectory per show",
                )
                .restart(),
                test_show: ConfigOption::new(
                    defaults.test_show,
                    "Show used by 'test' without arguments and skipped by 'play-all'",
                ),
            },
            timing: TimingConfigSchema {
                time_margin: ConfigOption::ranged(
                    defaults.time_margin,
                    0.0,
                    1.0,
                    "Events closer than this many seconds share a frame",
                ),
                lag_tolerance: ConfigOption::ranged(
                    defaults.lag_tolerance,
                    0.0,
                    5.0,
                    "Seconds the lights may trail the music before catching up",
                ),
                catch_up_multiplier: ConfigOption::ranged(
                    defaults.catch_up_multiplier,
                    0.0,
                    1.0,
                    "Share of a measured drift corrected at once",
                ),
                correction_cooldown: ConfigOption::ranged(
                    defaults.correction_cooldown,
                    0.0,
                    60.0,
                    "Minimum seconds between drift corrections",
                ),
                skip_zero_waits: ConfigOption::new(
                    defaults.skip_zero_waits,
                    "Skip empty waits in compiled shows during playback",
                ),
            },
            audio: AudioConfigSchema {
                volume: ConfigOption::ranged(
                    defaults.volume,
                    0.0,
                    1.0,
                    "Master volume, multiplied by each show's volume",
                ),
                audio_latency: ConfigOption::ranged(
                    defaults.audio_latency,
                    0.0,
                    5.0,
                    "Output delay of the speaker in seconds (0.22 for most Bluetooth speakers)",
                ),
                audio_warmup: ConfigOption::ranged(
                    defaults.audio_warmup,
                    0.0,
                    5.0,
                    "Muted playback before a show so the audio device is ready",
                ),
            },
            output: OutputConfigSchema {
                random_probability: ConfigOption::ranged(
                    defaults.random_probability,
                    0.0,
                    1.0,
                    "Chance that a randomly flickering light is lit in each frame",
                )
                .restart(),
            },
        }
    }

    /// Validate settings against schema
    pub fn validate_settings(settings: &Settings) -> Result<(), Vec<String>> {
        let mut errors = Vec::new();
        let schema = Self::schema();

        fn check<T: PartialOrd + std::fmt::Display>(
            errors: &mut Vec<String>,
            name: &str,
            value: T,
            option: &ConfigOption<T>,
        ) {
            if let Some((min, max)) = &option.valid_range {
                // NaN fails both comparisons, so test for being inside the range.
                if !(value >= *min && value <= *max) {
                    errors.push(format!("{} must be between {} and {}", name, min, max));
                }
            }
        }

        // Validate timing settings
        check(&mut errors, "time_margin", settings.time_margin, &schema.timing.time_margin);
        check(
            &mut errors,
            "lag_tolerance",
            settings.lag_tolerance,
            &schema.timing.lag_tolerance,
        );
        check(
            &mut errors,
            "catch_up_multiplier",
            settings.catch_up_multiplier,
            &schema.timing.catch_up_multiplier,
        );
        check(
            &mut errors,
            "correction_cooldown",
            settings.correction_cooldown,
            &schema.timing.correction_cooldown,
        );

        // Validate audio settings
        check(&mut errors, "volume", settings.volume, &schema.audio.volume);
        check(
            &mut errors,
            "audio_latency",
            settings.audio_latency,
            &schema.audio.audio_latency,
        );
        check(
            &mut errors,
            "audio_warmup",
            settings.audio_warmup,
            &schema.audio.audio_warmup,
        );

        // Validate output settings
        check(
            &mut errors,
            "random_probability",
            settings.random_probability,
            &schema.output.random_probability,
        );
        if let Err(e) = settings.layout.validate() {
            errors.push(format!("layout: {}", e));
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }
}

/// Configuration error types
#[derive(Debug)]
pub enum ConfigError {
    ReadError(String),
    WriteError(String),
    ParseError(String),
    SerializeError(String),
    ValidationError(Vec<String>),
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::ReadError(msg) => write!(f, "Failed to read config file: {}", msg),
            ConfigError::WriteError(msg) => write!(f, "Failed to write config file: {}", msg),
            ConfigError::ParseError(msg) => write!(f, "Failed to parse config file: {}", msg),
            ConfigError::SerializeError(msg) => write!(f, "Failed to serialize config: {}", msg),
            ConfigError::ValidationError(errors) => {
                write!(f, "Config validation errors: {}", errors.join(", "))
            }
        }
    }
}

impl std::error::Error for ConfigError {}
