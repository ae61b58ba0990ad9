use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing::{info, warn, Level};
use tracing_subscriber::EnvFilter;

use loop_compositor::{
    config::{Config, RetouchConfig},
    frame::Frame,
    pipeline,
    retouch::{RetouchOutcome, RetouchRegistry},
};

#[derive(Parser)]
#[command(
    name = "loop-compositor",
    version,
    about = "Clean up, retime and assemble frame sequences into short loops",
    long_about = "Loop-Compositor removes artifacts from numbered frames, recolors lettering, and assembles held, slowed-down and retouched segments into a contiguous output sequence."
)]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run the segments of a configuration (clears the output directory first)
    Run {
        /// Configuration file
        #[arg(short, long)]
        config: PathBuf,
    },

    /// Apply one retouch to a single image
    Recolor {
        /// Input image
        #[arg(short, long)]
        input: PathBuf,

        /// Output image
        #[arg(short, long)]
        output: PathBuf,

        /// File with `[retouch.*]` tables (built-in presets otherwise)
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Retouch to apply
        #[arg(short, long, default_value = "title")]
        retouch: String,
    },

    /// Write the default configuration to a file
    InitConfig {
        /// Where to write the configuration
        #[arg(short, long, default_value = "loop-compositor.toml")]
        output: PathBuf,

        /// Write the frame cleanup preset instead of the loop preset
        #[arg(long)]
        cleanup: bool,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    let log_level = if cli.verbose { Level::DEBUG } else { Level::INFO };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive(log_level.into()))
        .init();

    info!("Starting Loop-Compositor v{}", env!("CARGO_PKG_VERSION"));

    match cli.command {
        Command::Run { config } => {
            info!("Loading configuration from {:?}", config);
            let config = Config::from_file(&config).map_err(|e| anyhow::anyhow!(e.user_message()))?;
            info!("Input: {:?}", config.io.input_dir);
            info!("Output: {:?} (will be cleared)", config.io.output_dir);

            pipeline::run(&config).map_err(|e| anyhow::anyhow!(e.user_message()))?;
        }

        Command::Recolor {
            input,
            output,
            config,
            retouch,
        } => {
            let registry = match config {
                Some(path) => {
                    info!("Loading configuration from {:?}", path);
                    let config = RetouchConfig::from_file(&path)?;
                    config.validate()?;
                    RetouchRegistry::from_specs(&config.retouch)?
                }
                None => {
                    info!("Using built-in retouch presets");
                    RetouchRegistry::with_builtins()?
                }
            };
            let retouch = registry
                .require(&retouch)
                .map_err(|e| anyhow::anyhow!("{} (available: {})", e.user_message(), registry.available().join(", ")))?;

            let frame = Frame::open(&input).with_context(|| format!("Failed to read {:?}", input))?;
            info!("Image: {}x{}", frame.width(), frame.height());

            let frame = match retouch.apply(&frame)? {
                RetouchOutcome::Applied { frame, pixels } => {
                    info!("{} applied ({} pixels detected)", retouch.name(), pixels);
                    frame
                }
                RetouchOutcome::Skipped { reason } => {
                    warn!("{} skipped: {}; writing the image unchanged", retouch.name(), reason);
                    frame
                }
            };

            frame.save(&output).with_context(|| format!("Failed to write {:?}", output))?;
            info!("Saved: {:?}", output);
        }

        Command::InitConfig { output, cleanup } => {
            let config = if cleanup { Config::cleanup() } else { Config::default() };
            config.save_to_file(&output)?;
            info!("Configuration written to {:?}", output);
        }
    }

    Ok(())
}
