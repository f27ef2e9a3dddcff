use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::env;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use teamtrack::commands;
use teamtrack::db::Database;
use teamtrack::server::{self, AppState};

const DEFAULT_PORT: u16 = 3000;

#[derive(Parser)]
#[command(name = "teamtrack")]
#[command(about = "Team, project and ticket tracker backend")]
#[command(version)]
struct Cli {
    /// Path to the SQLite database
    #[arg(long, global = true, env = "TEAMTRACK_DB", default_value = "teamtrack.db")]
    db: PathBuf,

    /// Emit logs as JSON lines
    #[arg(long, global = true, env = "TEAMTRACK_LOG_JSON")]
    log_json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create or migrate the database and exit
    Init,

    /// Serve the HTTP API
    Serve {
        /// Address to listen on (defaults to 0.0.0.0:$PORT, then 0.0.0.0:3000)
        #[arg(short, long, env = "TEAMTRACK_BIND")]
        bind: Option<SocketAddr>,
        /// bcrypt cost for new password hashes
        #[arg(long, env = "TEAMTRACK_HASH_COST", default_value_t = 10,
              value_parser = clap::value_parser!(u32).range(4..=31))]
        hash_cost: u32,
    },

    /// Export the project board as JSON
    Export {
        /// Output file (defaults to stdout)
        #[arg(short, long)]
        output: Option<String>,
    },
}

fn init_tracing(log_json: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    if log_json {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer().json().with_writer(std::io::stderr))
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
            .init();
    }
}

fn open_db(path: &Path) -> Result<Database> {
    let db = Database::open(path)
        .with_context(|| format!("Failed to open database at {}", path.display()))?;
    info!(path = %path.display(), "opened database");
    Ok(db)
}

fn default_bind() -> Result<SocketAddr> {
    let port = match env::var("PORT") {
        Ok(port) => port.parse::<u16>().context("PORT is not a valid port number")?,
        Err(_) => DEFAULT_PORT,
    };
    Ok(SocketAddr::from(([0, 0, 0, 0], port)))
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.log_json);

    match cli.command {
        Commands::Init => {
            open_db(&cli.db)?;
            println!("Initialized database at {}", cli.db.display());
            Ok(())
        }

        Commands::Serve { bind, hash_cost } => {
            let db = open_db(&cli.db)?;
            let addr = match bind {
                Some(addr) => addr,
                None => default_bind()?,
            };
            server::serve(AppState::new(db, hash_cost), addr).await
        }

        Commands::Export { output } => {
            let db = open_db(&cli.db)?;
            commands::export::run(&db, output.as_deref())
        }
    }
}
