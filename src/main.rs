use std::fs;
use std::sync::Arc;
use std::time::Duration;

use anyhow::bail;
use clap::{Parser, Subcommand};
use tracing::info;
use tracing_subscriber::EnvFilter;

use hatchery::config::{DEFAULT_BADGES, DEFAULT_CATEGORIES, ServerConfig};
use hatchery::content::ContentStore;
use hatchery::server::{AppState, create_router};
use hatchery::store::{SqliteStore, Store};

#[derive(Parser)]
#[command(name = "hatchery")]
#[command(about = "A catalogue server for badge applications", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Administrative commands
    Admin {
        #[command(subcommand)]
        command: AdminCommands,
    },

    /// Start the server
    Serve {
        /// Host to bind to
        #[arg(long, default_value = "127.0.0.1")]
        host: String,

        /// Port to bind to
        #[arg(long, short, default_value = "8081")]
        port: u16,

        /// Data directory for the database and content objects
        #[arg(long, default_value = "./data")]
        data_dir: String,

        /// Public base URL for external access (e.g., "https://hub.example.com").
        /// Used for file download URLs. If not set, relative URLs are served.
        #[arg(long)]
        base_url: Option<String>,

        /// Seconds between install-count aggregate rebuilds (0 disables)
        #[arg(long, default_value = "300")]
        refresh_interval_secs: u64,

        /// Badge slugs this hub serves, comma separated
        #[arg(long, value_delimiter = ',', default_values_t = DEFAULT_BADGES.iter().map(ToString::to_string))]
        badges: Vec<String>,

        /// Category vocabulary, comma separated
        #[arg(long, value_delimiter = ',', default_values_t = DEFAULT_CATEGORIES.iter().map(ToString::to_string))]
        categories: Vec<String>,
    },
}

#[derive(Subcommand)]
enum AdminCommands {
    /// Initialize the server (create the database and data directories)
    Init {
        /// Data directory for the database and content objects
        #[arg(long, default_value = "./data")]
        data_dir: String,
    },
}

fn run_init(data_dir: String) -> anyhow::Result<()> {
    let data_path: std::path::PathBuf = data_dir.into();
    fs::create_dir_all(&data_path)?;

    let db_path = data_path.join("hatchery.db");
    if db_path.exists() {
        bail!("Server already initialized at {}", db_path.display());
    }

    let store = SqliteStore::new(&db_path)?;
    store.initialize()?;

    println!("Initialized hatchery database at {}", db_path.display());
    println!("Start the server with: hatchery serve --data-dir {}", data_path.display());

    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("hatchery=info".parse()?))
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Admin { command } => match command {
            AdminCommands::Init { data_dir } => {
                run_init(data_dir)?;
            }
        },
        Commands::Serve {
            host,
            port,
            data_dir,
            base_url,
            refresh_interval_secs,
            badges,
            categories,
        } => {
            let config = ServerConfig {
                host,
                port,
                data_dir: data_dir.into(),
                base_url,
                refresh_interval_secs,
                badges,
                categories,
            };

            if !config.db_path().exists() {
                bail!(
                    "Server not initialized. Run 'hatchery admin init' first to create the database."
                );
            }

            let store = SqliteStore::new(config.db_path())?;
            store.initialize()?;

            let state = Arc::new(AppState {
                store: Arc::new(store),
                content: Arc::new(ContentStore::new(&config.data_dir)),
                base_url: config.base_url.clone(),
                badges: config.badges.clone(),
                categories: config.categories.clone(),
            });

            // The install-count aggregate is refreshed out of band; the engine
            // itself only ever reads it.
            if config.refresh_interval_secs > 0 {
                let refresh_store = state.store.clone();
                let mut interval =
                    tokio::time::interval(Duration::from_secs(config.refresh_interval_secs));
                tokio::spawn(async move {
                    loop {
                        interval.tick().await;
                        if let Err(e) = refresh_store.refresh_install_counts() {
                            tracing::error!("install count refresh failed: {e}");
                        }
                    }
                });
            }

            let app = create_router(state);
            let addr = config.socket_addr()?;

            info!("Starting server on {}", addr);

            let listener = tokio::net::TcpListener::bind(addr).await?;
            axum::serve(listener, app).await?;
        }
    }

    Ok(())
}
