//! Mindshift ambient audio command-line host

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use mindconfig::get_config;
use mindplayer::{
    install, ActivateOutcome, BackgroundPlayer, GestureBus, PlayerConfigExt, ProcessBackend,
    RetryOutcome,
};
use mindsound::{audio_sources, AudioConfigExt, SoundFetcher, SoundId};
use tracing::{info, warn};

mod logging;
mod stdin_gestures;

#[derive(Parser)]
#[command(name = "mindshift")]
#[command(about = "Mindshift ambient sounds and background music")]
struct Cli {
    /// Configuration directory (default: $MINDSHIFT_CONFIG, ./.mindshift or ~/.mindshift)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Log at DEBUG level
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the candidate URLs of a sound, in priority order
    Sources {
        /// Sound id (rain, ocean, forest, ..., background)
        sound: String,
    },

    /// List every known sound with its primary URL
    Sounds,

    /// Download the sounds of the external folder into the local directory
    Fetch {
        /// Download again files already present
        #[arg(short, long)]
        force: bool,

        /// Target directory (default: audio.local.directory)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Play the background music until Ctrl+C; press Enter to start it
    /// when autoplay is refused
    Play,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Must happen before the first get_config() and before any thread exists
    if let Some(dir) = &cli.config {
        std::env::set_var("MINDSHIFT_CONFIG", dir);
    }

    let config = get_config();
    let _log_level = logging::init_logging(&config, cli.verbose);

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .context("Cannot start the async runtime")?;
    runtime.block_on(run(cli.command))
}

async fn run(command: Commands) -> Result<()> {
    match command {
        Commands::Sources { sound } => print_sources(&sound),
        Commands::Sounds => {
            print_sounds();
            Ok(())
        }
        Commands::Fetch { force, output } => fetch(force, output).await,
        Commands::Play => play().await,
    }
}

fn print_sources(sound: &str) -> Result<()> {
    if sound.parse::<SoundId>().is_err() {
        bail!("Unknown sound '{}', see `mindshift sounds`", sound);
    }

    let candidates = audio_sources().resolve_candidates(sound);
    if candidates.is_empty() {
        warn!(sound, "No source configured");
    }
    for url in candidates {
        println!("{url}");
    }
    Ok(())
}

fn print_sounds() {
    let sources = audio_sources();
    for id in SoundId::ALL {
        let primary = sources.primary_url(id).unwrap_or_else(|| "-".to_string());
        println!("{:<12} {}", id.as_str(), primary);
    }
}

async fn fetch(force: bool, output: Option<PathBuf>) -> Result<()> {
    let directory = match output {
        Some(dir) => dir,
        None => PathBuf::from(get_config().get_sounds_directory()?),
    };

    let fetcher = SoundFetcher::new(audio_sources().clone(), directory)?.force(force);
    info!(directory = %fetcher.directory().display(), force, "Fetching sounds");
    let report = fetcher.fetch_all().await?;

    for id in &report.downloaded {
        println!("downloaded   {id}");
    }
    for id in &report.skipped {
        println!("present      {id}");
    }
    for id in &report.unconfigured {
        println!("no file id   {id}");
    }
    for (id, reason) in &report.failed {
        println!("failed       {id}: {reason}");
    }

    if !report.is_success() {
        bail!("{} sound(s) could not be downloaded", report.failed.len());
    }
    Ok(())
}

async fn play() -> Result<()> {
    let config = get_config();
    let command = config.get_player_command();
    let sounds_dir = config.get_sounds_directory()?;
    info!(program = %command.program, sounds = %sounds_dir, "Using external player");

    let gestures = Arc::new(GestureBus::new());
    let stdin = stdin_gestures::spawn_stdin_gestures(gestures.clone());

    let player = install(BackgroundPlayer::new(
        Arc::new(ProcessBackend::new(command)),
        gestures,
        audio_sources().clone(),
        config.get_reload_policy(),
    )
    .with_local_directory(sounds_dir));

    match player.activate().await? {
        ActivateOutcome::Started | ActivateOutcome::AlreadyPlaying => {
            println!("Playing background music, Ctrl+C to stop");
        }
        ActivateOutcome::Deferred(deferred) => {
            println!("Playback refused, press Enter to start the music");
            tokio::spawn(async move {
                match deferred.wait().await {
                    Ok(RetryOutcome::Started) => println!("Playing background music, Ctrl+C to stop"),
                    Ok(RetryOutcome::Failed(e)) => eprintln!("Could not start the music: {e}"),
                    Ok(_) => {}
                    Err(e) => warn!("Deferred start failed: {}", e),
                }
            });
        }
        ActivateOutcome::AwaitingGesture => println!("Press Enter to start the music"),
        ActivateOutcome::Unavailable => bail!("No source configured for the background music"),
    }

    tokio::signal::ctrl_c()
        .await
        .context("Cannot listen for Ctrl+C")?;

    info!("Stopping background music");
    if let Some(handle) = player.handle() {
        handle.pause();
    }
    stdin.abort();
    Ok(())
}
