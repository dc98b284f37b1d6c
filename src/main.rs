use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use targetkit::HostSpec;
use targetkit::cli::{build, describe_spec, doctor, up};
use targetkit::infra::config::load_settings;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(
    name = "targetkit",
    about = "Ephemeral container targets for infrastructure test suites"
)]
struct Cli {
    /// Global configuration file, merged under ./targetkit.toml
    #[arg(long, env = "TARGETKIT_CONFIG")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Check docker, ansible and the configured key and images
    Doctor,
    /// Build every image under the images root in parallel
    Build {
        /// Overrides `images_root` from the configuration
        #[arg(long)]
        images_root: Option<PathBuf>,
    },
    /// Start a target, print its connection details, remove it on Enter
    Up {
        /// e.g. ssh://debian_jessie/user=root
        host_spec: String,
        /// Where generated keys and configs go (default: a temporary directory)
        #[arg(long)]
        dir: Option<PathBuf>,
    },
    /// Parse a host spec and print its parts
    Parse { host_spec: String },
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(false)
        .init();

    let cli = Cli::parse();
    let settings = load_settings(cli.config.as_deref())?;

    match cli.command {
        Commands::Doctor => doctor::doctor(&settings),
        Commands::Build { images_root } => build::build(settings, images_root),
        Commands::Up { host_spec, dir } => up::up(settings, &host_spec, dir),
        Commands::Parse { host_spec } => {
            let spec: HostSpec = host_spec.parse()?;
            print!("{}", describe_spec(&spec));
            Ok(())
        }
    }
}
