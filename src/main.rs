use anyhow::{Context, Result};
use clap::{CommandFactory, Parser};
use clap_complete::Shell;
use std::path::PathBuf;
use tracing::info;

mod audio;
mod color;
mod config;
mod display;
mod input;
mod ipc;
mod renderer;
mod visualizer;

use config::Config;
use display::RunOptions;
use visualizer::VisualizerMode;

#[derive(Parser, Debug)]
#[command(name = "micviz")]
#[command(author, version, about = "Real-time microphone visualizer for the terminal")]
pub struct Args {
    /// Config file path
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Mode to start in, by number (1-5) or name
    #[arg(short, long, value_parser = parse_mode)]
    mode: Option<VisualizerMode>,

    /// PulseAudio source to record from (see --list-sources)
    #[arg(short, long)]
    device: Option<String>,

    /// Target frames per second
    #[arg(long)]
    fps: Option<u32>,

    /// Bass energy ratio over the recent average that counts as a beat
    #[arg(long)]
    beat_threshold: Option<f32>,

    /// Use a synthetic signal instead of the microphone
    #[arg(long)]
    demo: bool,

    /// Don't listen for remote commands
    #[arg(long)]
    no_ipc: bool,

    /// Write logs to this file instead of stderr
    #[arg(long)]
    log_file: Option<PathBuf>,

    /// List available audio sources and exit
    #[arg(long)]
    list_sources: bool,

    /// Write a default config file and exit
    #[arg(long)]
    init_config: bool,

    /// Print shell completions and exit
    #[arg(long, value_name = "SHELL")]
    completions: Option<Shell>,

    /// Send a command to a running instance, e.g. "mode 3" or "pause"
    #[arg(long, value_name = "COMMAND")]
    send: Option<String>,
}

fn parse_mode(value: &str) -> Result<VisualizerMode, String> {
    value.parse()
}

fn init_logging(log_file: Option<&PathBuf>) -> Result<()> {
    let filter = tracing_subscriber::EnvFilter::from_default_env()
        .add_directive("micviz=info".parse()?);

    match log_file {
        Some(path) => {
            let file = std::fs::File::create(path)
                .with_context(|| format!("Failed to create log file {}", path.display()))?;
            tracing_subscriber::fmt()
                .with_env_filter(filter)
                .with_ansi(false)
                .with_writer(std::sync::Mutex::new(file))
                .init();
        }
        None => {
            tracing_subscriber::fmt()
                .with_env_filter(filter)
                .with_writer(std::io::stderr)
                .init();
        }
    }
    Ok(())
}

fn print_legend() {
    println!("micviz - real-time audio visualizer");
    println!("\nControls:");
    println!("  1-5: Switch visualization modes");
    println!("  SPACE: Pause/Resume");
    println!("  ESC: Quit");
    println!("\nModes:");
    for mode in VisualizerMode::all() {
        println!("  {}: {}", mode.number(), mode.name());
    }
    println!("\nMake some noise!\n");
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    if let Some(shell) = args.completions {
        clap_complete::generate(shell, &mut Args::command(), "micviz", &mut std::io::stdout());
        return Ok(());
    }

    if let Some(ref line) = args.send {
        let response = ipc::send_command(&ipc::socket_path(), line).await?;
        println!("{}", response);
        return Ok(());
    }

    if args.init_config {
        let path = match &args.config {
            Some(path) => {
                Config::init_config_at(path)?;
                path.clone()
            }
            None => Config::init_default_config()?,
        };
        println!("Wrote config to {}", path.display());
        return Ok(());
    }

    if args.list_sources {
        for (name, state) in audio::list_sources()? {
            println!("{}\t{}", name, state);
        }
        return Ok(());
    }

    init_logging(args.log_file.as_ref())?;

    // Load or create config
    let mut config = match &args.config {
        Some(path) => Config::load(path)?,
        None => Config::load_from_default_path().unwrap_or_default(),
    };
    config.merge_args(&args);
    config.validate()?;

    info!(
        "Starting micviz in {} mode ({} Hz, {} samples/frame)",
        config.display.start_mode, config.audio.sample_rate, config.audio.chunk_size
    );

    print_legend();

    let options = RunOptions {
        demo: args.demo,
        config_path: args.config.clone(),
    };
    display::terminal::run(config, options).await
}
