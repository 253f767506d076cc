use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing::level_filters::LevelFilter;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use face_swap_pipeline::{
    config::Config,
    face::CommandEngine,
    media::MediaLoader,
    swap::{status_line, BatchRunner, BatchSummary, SingleImageSwapper},
    video::{FfmpegBackend, LogProgress, VideoSwapper},
    FaceSwapError,
};

#[derive(Parser)]
#[command(
    name = "face-swap",
    version,
    about = "Swap a source face into images, image directories and videos",
    long_about = "Face-swap detects faces with an external inference program and swaps a single source face into every face of the target media. Videos keep their original audio."
)]
struct Cli {
    /// Configuration file (optional)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Inference program, overrides `engine.command` from the config
    #[arg(short, long, global = true)]
    engine: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Swap the largest source face into every face of one image
    Image {
        /// Image providing the face
        #[arg(short, long)]
        source: PathBuf,

        /// Image whose faces are replaced
        #[arg(short, long)]
        target: PathBuf,

        /// Where to write the result
        #[arg(short, long)]
        output: PathBuf,
    },

    /// Swap the largest source face into every frame of a video
    Video {
        /// Image providing the face
        #[arg(short, long)]
        source: PathBuf,

        /// Video whose faces are replaced
        #[arg(short, long)]
        target: PathBuf,

        /// Output video path; a temporary file is created when omitted
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Swap one source face into every image of a directory
    Batch {
        /// Directory of target images
        #[arg(short, long)]
        input_dir: PathBuf,

        /// Directory whose first image provides the face
        #[arg(short, long)]
        source_dir: PathBuf,

        /// Directory receiving the swapped images
        #[arg(short, long)]
        output_dir: PathBuf,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    let log_level = if cli.verbose { LevelFilter::DEBUG } else { LevelFilter::INFO };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive(log_level.into()))
        .init();

    info!("Starting face-swap v{}", env!("CARGO_PKG_VERSION"));

    run(cli).map_err(|e| anyhow::anyhow!(e.user_message()))
}

fn run(cli: Cli) -> face_swap_pipeline::Result<()> {
    let mut config = match &cli.config {
        Some(config_path) => {
            info!("Loading configuration from {:?}", config_path);
            Config::from_file(config_path)?
        }
        None => {
            info!("Using default configuration");
            Config::default()
        }
    };
    if let Some(engine) = cli.engine {
        config.engine.command = Some(engine);
    }

    let engine = CommandEngine::from_config(&config.engine)?;

    match cli.command {
        Command::Image { source, target, output } => {
            let swapper = SingleImageSwapper::new(&engine);
            let result = swapper.swap_files(&source, &target, &output);
            info!("{}", status_line(&result));
            result?;
            info!("Output saved to: {:?}", output);
        }

        Command::Video { source, target, output } => {
            if !FfmpegBackend::new(&config.video).check_available() {
                warn!("ffmpeg/ffprobe not found, video processing will likely fail");
            }

            let source = MediaLoader::load(&source)?;
            let swapper = VideoSwapper::with_ffmpeg(&engine, &config);
            let summary = swapper.swap(source, &target, output.as_deref(), &mut LogProgress)?;

            info!("{}", summary.status());
            info!("Output saved to: {:?}", summary.output);
        }

        Command::Batch { input_dir, source_dir, output_dir } => {
            let runner = BatchRunner::new(&engine, config.batch.clone());
            let outcomes = runner.run(&input_dir, &source_dir, &output_dir)?;

            let summary = BatchSummary::from_outcomes(&outcomes);
            if summary.swapped == 0 {
                return Err(FaceSwapError::generic(format!(
                    "No images were swapped ({} skipped, {} failed)",
                    summary.skipped, summary.failed
                )));
            }
        }
    }

    Ok(())
}
