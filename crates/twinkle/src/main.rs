use std::path::PathBuf;

use anyhow::{anyhow, Context};
use clap::{Parser, Subcommand};
use twinkle_core::{
    compile_show, normalize_volume, AudioPlayer, ConfigManager, ConsoleRenderer, GpioBoard,
    LightOutput, PlaybackOutcome, Settings, ShowConsole, ShowManager,
};

/// Relay light shows scripted in beats and played in time with their music.
#[derive(Parser, Debug)]
#[command(name = "twinkle")]
#[command(author, version, about = "Plays scripted relay light shows in time with music")]
struct Cli {
    /// Configuration file, created with defaults if missing
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Directory holding one subdirectory per show
    #[arg(long, global = true)]
    shows_dir: Option<PathBuf>,

    /// Draw the lights in the terminal instead of switching GPIO relays
    #[arg(long, global = true)]
    test_output: bool,

    /// Master volume, as a fraction (0.8) or a percentage (80)
    #[arg(long, global = true)]
    volume: Option<f32>,

    /// Speaker output delay in seconds (around 0.22 for Bluetooth speakers)
    #[arg(long, global = true)]
    audio_latency: Option<f64>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// List the available shows
    #[command(alias = "ls")]
    List,

    /// Compile (or recompile) a show's scripts into its lightmap
    Compile { show: String },

    /// Play a compiled show
    Play { show: String },

    /// Compile a show and play it, the configured test show by default
    Test { show: Option<String> },

    /// Play every show except the test show
    PlayAll {
        /// Play in random order instead of alphabetically
        #[arg(long)]
        shuffle: bool,
    },
}

fn main() -> Result<(), anyhow::Error> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();
    let settings = load_settings(&cli)?;

    let mut library = ShowManager::open(settings.shows_path())
        .with_context(|| format!("Failed to open shows directory '{}'", settings.shows_dir))?;

    match cli.command {
        Commands::List => {
            println!("{}", library.listing());
            Ok(())
        }
        Commands::Compile { show } => {
            let options = settings.compile_options();
            let show = library.get_mut(&show)?;
            let report = compile_show(show, options)?;
            println!("{}", report);
            Ok(())
        }
        Commands::Play { show } => {
            let mut console = open_console(settings, library, cli.test_output)?;
            let outcome = console.play(&show)?;
            report_outcome(outcome);
            Ok(())
        }
        Commands::Test { show } => {
            let mut console = open_console(settings, library, cli.test_output)?;
            let outcome = console.test(show.as_deref())?;
            report_outcome(outcome);
            Ok(())
        }
        Commands::PlayAll { shuffle } => {
            let mut console = open_console(settings, library, cli.test_output)?;
            let report = console.play_all(shuffle);
            println!("{}", report);
            Ok(())
        }
    }
}

fn load_settings(cli: &Cli) -> Result<Settings, anyhow::Error> {
    let mut config = ConfigManager::new(cli.config.clone());
    let mut settings = config
        .load()
        .with_context(|| format!("Failed to load {}", config.config_path().display()))?;

    if let Some(shows_dir) = &cli.shows_dir {
        settings.shows_dir = shows_dir.to_string_lossy().into_owned();
    }
    if let Some(volume) = cli.volume {
        settings.volume = normalize_volume(volume);
    }
    if let Some(latency) = cli.audio_latency {
        settings.audio_latency = latency;
    }

    ConfigManager::validate_settings(&settings)
        .map_err(|errors| anyhow!("Invalid settings: {}", errors.join(", ")))?;
    for pin in settings.layout.unused_pins() {
        log::debug!("GPIO pin {} is not assigned to a light", pin);
    }

    Ok(settings)
}

fn open_console(
    settings: Settings,
    library: ShowManager,
    test_output: bool,
) -> Result<ShowConsole, anyhow::Error> {
    let output = open_output(&settings, test_output);
    let audio = AudioPlayer::new().context("Failed to open the audio output")?;

    let console = ShowConsole::new(settings, library, output, Box::new(audio));

    // Ctrl+C interrupts the current show instead of killing the process.
    let cancel = console.cancel_token();
    ctrlc::set_handler(move || cancel.cancel())?;

    Ok(console)
}

fn open_output(settings: &Settings, test_output: bool) -> Box<dyn LightOutput> {
    let channels = settings.channel_count();
    if !test_output {
        match GpioBoard::open(&settings.layout, settings.random_probability) {
            Ok(board) => {
                log::info!("Driving {} lights over GPIO", channels);
                return Box::new(board);
            }
            Err(e) => log::warn!("GPIO unavailable ({}), test output will be used", e),
        }
    }
    Box::new(ConsoleRenderer::stdout(
        channels,
        settings.random_probability,
    ))
}

fn report_outcome(outcome: PlaybackOutcome) {
    match outcome {
        PlaybackOutcome::Finished => println!("Show finished."),
        PlaybackOutcome::Aborted => println!("Playback aborted."),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_global_options_after_subcommand() {
        let cli = Cli::parse_from([
            "twinkle",
            "play-all",
            "--shuffle",
            "--test-output",
            "--volume",
            "80",
        ]);
        assert!(cli.test_output);
        assert_eq!(cli.volume, Some(80.0));
        assert!(matches!(cli.command, Commands::PlayAll { shuffle: true }));
    }

    #[test]
    fn test_optional_test_show() {
        let cli = Cli::parse_from(["twinkle", "test"]);
        assert!(matches!(cli.command, Commands::Test { show: None }));

        let cli = Cli::parse_from(["twinkle", "ls"]);
        assert!(matches!(cli.command, Commands::List));
    }
}
