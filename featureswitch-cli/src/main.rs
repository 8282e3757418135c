use anyhow::{bail, Result};
use clap::{Parser, Subcommand};
use featureswitch_cli::list::run_list;
use featureswitch_cli::serve::{run_serve, ServeOverrides};
use featureswitch_cli::server::config::StorageBackend;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "featureswitch")]
#[command(version)]
#[command(about = "Feature switch management API with bucket-targeted rollout", long_about = None)]
struct Args {
    /// Enable verbose debug logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run the HTTP API
    Serve {
        /// Path to config file
        #[arg(short = 'c', long = "config", default_value = "featureswitch.toml")]
        config: String,

        /// Port to listen on
        #[arg(short = 'p', long = "port")]
        port: Option<u16>,

        /// Hostname to bind to
        #[arg(long = "hostname")]
        hostname: Option<String>,

        /// Directory of the sled database
        #[arg(short = 'd', long = "data-dir")]
        data_dir: Option<String>,

        /// Storage backend: sled or memory
        #[arg(short = 's', long = "storage")]
        storage: Option<String>,
    },
    /// List features stored in a data directory
    List {
        /// Path to config file
        #[arg(short = 'c', long = "config", default_value = "featureswitch.toml")]
        config: String,

        /// Directory of the sled database
        #[arg(short = 'd', long = "data-dir")]
        data_dir: Option<String>,

        /// Show bucket ids
        #[arg(short = 'b', long = "buckets")]
        buckets: bool,
    },
}

fn init_logging(verbose: bool) {
    let default_level = if verbose { "debug" } else { "info" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .compact()
        .init();
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Args::parse();
    init_logging(cli.verbose);

    match cli.cmd {
        Command::Serve {
            config,
            port,
            hostname,
            data_dir,
            storage,
        } => {
            let storage = match storage.as_deref().map(StorageBackend::parse) {
                None => None,
                Some(Some(backend)) => Some(backend),
                Some(None) => bail!("unknown storage backend, expected 'sled' or 'memory'"),
            };
            run_serve(
                &config,
                ServeOverrides {
                    port,
                    hostname,
                    data_dir,
                    storage,
                },
            )
            .await
        }
        Command::List {
            config,
            data_dir,
            buckets,
        } => run_list(&config, data_dir, buckets).await,
    }
}
