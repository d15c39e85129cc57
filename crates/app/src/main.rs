mod presets;

use std::{path::PathBuf, thread, time::Duration};

use automaton_core::{
    analysis::sine_block, AppConfig, PitchTracker, PlaybackEngine, RhythmHandle, RigError,
    SimulatedRig, SystemTimeSource,
};
use clap::{Args, Parser, Subcommand};
use tracing_subscriber::EnvFilter;

const TONE_SAMPLE_RATE: u32 = 48_000;
const TONE_BLOCK: usize = 4096;

fn main() -> automaton_core::Result<()> {
    init_tracing();

    let cli = Cli::parse();
    let config = load_config(cli.config.as_ref())?;

    match cli.command {
        Commands::Play(selection) => run_play(&config, &selection),
        Commands::List => run_list(&config),
    }
}

fn load_config(path: Option<&PathBuf>) -> automaton_core::Result<AppConfig> {
    match path {
        Some(path) => {
            tracing::info!(?path, "loading configuration");
            AppConfig::from_json_file(path)
        }
        None => Ok(AppConfig::default()),
    }
}

fn run_play(config: &AppConfig, selection: &Selection) -> automaton_core::Result<()> {
    let catalog = presets::catalog(&config.catalog)?;
    let rhythm = select_rhythm(&catalog, selection)?;

    let clock = SystemTimeSource::new();
    let mut engine = PlaybackEngine::with_clock(config.engine.clone(), clock.clone());
    let rig = SimulatedRig::build(&config.rig, &clock, &mut engine)?;

    engine.play_rhythm(rhythm)?;
    let tick = Duration::from_millis(config.rig.tick_interval_ms);
    while engine.is_active() {
        engine.update()?;
        thread::sleep(tick);
    }

    let bell_strikes: usize = rig.bells.iter().map(|bell| bell.borrow().strikes()).sum();
    let pecker_strikes: usize = rig
        .peckers
        .iter()
        .map(|pecker| pecker.borrow().strikes())
        .sum();
    tracing::info!(bell_strikes, pecker_strikes, "playback complete");
    Ok(())
}

fn select_rhythm(
    catalog: &presets::Catalog,
    selection: &Selection,
) -> automaton_core::Result<RhythmHandle> {
    if let Some(index) = selection.index {
        tracing::info!(index, name = ?catalog.names.get(index), "playing rhythm by index");
        return catalog.bank.rhythm_by_index(index);
    }

    let pitch = match (selection.pitch, selection.tone) {
        (Some(pitch), _) => Some(pitch),
        (None, Some(tone)) => Some(listen_for_pitch(tone)?),
        (None, None) => None,
    };

    match pitch {
        Some(pitch) => {
            tracing::info!(pitch, "playing rhythm closest to pitch");
            catalog.bank.rhythm_from_pitch(pitch)
        }
        None => {
            tracing::info!("playing a random rhythm");
            catalog.bank.random_rhythm()
        }
    }
}

/// Runs a synthesized tone through the pitch tracker, standing in for a
/// microphone block.
fn listen_for_pitch(tone: f64) -> automaton_core::Result<f64> {
    let mut tracker = PitchTracker::with_sample_rate(TONE_SAMPLE_RATE);
    let block = sine_block(tone, TONE_SAMPLE_RATE, TONE_BLOCK);
    let estimate = tracker
        .estimate(&block)?
        .ok_or_else(|| RigError::msg(format!("no pitch detected in a {tone} Hz tone")))?;
    tracing::info!(tone, detected = estimate.frequency, "pitch detected");
    Ok(estimate.frequency)
}

fn run_list(config: &AppConfig) -> automaton_core::Result<()> {
    let catalog = presets::catalog(&config.catalog)?;
    for (index, (name, rhythm)) in catalog.names.iter().zip(catalog.bank.iter()).enumerate() {
        let rhythm = rhythm.borrow();
        println!(
            "[{index}] {name} ({} notes, median {:.1} Hz)",
            rhythm.len(),
            rhythm.median_frequency()
        );
        print!("{rhythm}");
    }
    catalog.bank.describe_all();
    Ok(())
}

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .try_init();
}

#[derive(Parser, Debug)]
#[command(author, version, about = "Drives the musical automaton rig", long_about = None)]
struct Cli {
    /// JSON configuration file. Defaults are used when omitted.
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Play one rhythm from the built-in catalog on the simulated rig.
    Play(Selection),
    /// Print every rhythm in the built-in catalog.
    List,
}

#[derive(Args, Debug)]
struct Selection {
    /// Catalog index of the rhythm to play.
    #[arg(short, long, conflicts_with_all = ["pitch", "tone"])]
    index: Option<usize>,
    /// Play the rhythm whose median frequency is closest to this pitch (Hz).
    #[arg(short, long, conflicts_with = "tone")]
    pitch: Option<f64>,
    /// Synthesize a tone at this frequency and pick the rhythm by the pitch
    /// detected in it.
    #[arg(short, long)]
    tone: Option<f64>,
}
