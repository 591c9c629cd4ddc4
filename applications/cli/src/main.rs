//! Cadence CLI - headless music player

use anyhow::Context;
use cadence_cli::{
    console::{execute, parse_line, parse_repeat_mode, Flow, HELP},
    display::{format_event, format_time},
    scan::collect_audio_files,
};
use cadence_loudness::resolve;
use cadence_playback::{GainConfig, GainMode, Notification, RepeatMode};
use cadence_service::{read_track, FileLookup, PlaybackService, ServiceConfig, TrackLibrary};
use clap::{Parser, Subcommand};
use std::io::BufRead;
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "cadence")]
#[command(about = "Headless player for the Cadence playback engine", long_about = None)]
struct Cli {
    /// Configuration file path
    #[arg(short, long, global = true, env = "CADENCE_CONFIG")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Play files and directories with an interactive console
    Play {
        /// Audio files or directories
        paths: Vec<PathBuf>,

        /// Start in shuffled order
        #[arg(long)]
        shuffle: bool,

        /// Repeat mode (off, all, one)
        #[arg(long, value_parser = parse_repeat_mode)]
        repeat: Option<RepeatMode>,

        /// Restore the saved session instead of starting a new queue
        #[arg(long)]
        resume: bool,
    },
    /// Show a track's tags and the gain each mode would apply
    Inspect {
        /// Audio file
        path: PathBuf,
    },
    /// Print the effective configuration
    Config,
}

fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "cadence=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();
    let config =
        ServiceConfig::load(cli.config.as_deref()).context("Failed to load configuration")?;

    match cli.command {
        Commands::Play {
            paths,
            shuffle,
            repeat,
            resume,
        } => play(config, &paths, shuffle, repeat, resume),
        Commands::Inspect { path } => inspect(&config, &path),
        Commands::Config => {
            println!("{}", toml::to_string_pretty(&config)?);
            Ok(())
        }
    }
}

fn play(
    mut config: ServiceConfig,
    paths: &[PathBuf],
    shuffle: bool,
    repeat: Option<RepeatMode>,
    resume: bool,
) -> anyhow::Result<()> {
    if let Some(mode) = repeat {
        config.playback.repeat = mode;
    }

    let files = collect_audio_files(paths);
    let (library, failed) = TrackLibrary::from_paths(files);
    for (path, e) in &failed {
        eprintln!("skipping {}: {}", path.display(), e);
    }

    if library.is_empty() && !resume {
        anyhow::bail!("No playable files given");
    }

    let service = PlaybackService::start_headless(config).context("Failed to start playback")?;
    let handle = service.handle();

    handle.add_listener(Arc::new(|n: &Notification| {
        if let Some(line) = format_event(n) {
            println!("{}", line);
        }
    }))?;

    if resume && library.is_empty() {
        if !service.restore_saved_session(FileLookup)? {
            println!("no saved session");
        }
    } else if shuffle {
        handle.shuffle(library.tracks())?;
    } else {
        handle.play(library.tracks(), 0)?;
    }

    tracing::info!(tracks = library.len(), "Console ready");
    println!("{}", HELP);

    let stdin = std::io::stdin();
    for line in stdin.lock().lines() {
        let line = line.context("Failed to read input")?;
        let command = match parse_line(&line) {
            Ok(Some(command)) => command,
            Ok(None) => continue,
            Err(e) => {
                eprintln!("{}", e);
                continue;
            }
        };

        match execute(&handle, command)? {
            Flow::Continue => {}
            Flow::Print(text) => println!("{}", text),
            Flow::Quit => break,
        }
    }

    let session = service.shutdown()?;
    tracing::info!(tracks = session.items.len(), "Playback stopped");
    Ok(())
}

fn inspect(config: &ServiceConfig, path: &std::path::Path) -> anyhow::Result<()> {
    let track = read_track(path)?;
    let tags = &track.replay_gain;
    let gain = config.playback.gain_config();

    println!("{} - {}", track.artist, track.title);
    if let Some(album) = &track.album {
        println!("album:       {}", album);
    }
    let duration_ms = u64::try_from(track.duration.as_millis()).unwrap_or(u64::MAX);
    println!("duration:    {}", format_time(duration_ms));
    println!("track gain:  {:?} dB, peak {:?}", tags.track_gain, tags.track_peak);
    println!("album gain:  {:?} dB, peak {:?}", tags.album_gain, tags.album_peak);

    for mode in [GainMode::Track, GainMode::Album, GainMode::Dynamic] {
        let config = GainConfig { mode, ..gain };
        let effective = resolve(tags, &config, true);
        println!(
            "{:<12} {:+.2} dB ({:?})",
            format!("{:?}:", mode).to_lowercase(),
            effective.gain_db,
            effective.source
        );
    }

    Ok(())
}
