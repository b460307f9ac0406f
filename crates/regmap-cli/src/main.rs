use anyhow::Result;
use clap::{Parser, Subcommand};

mod commands;

#[derive(Parser)]
#[command(name = "regmap")]
#[command(about = "Register mapper: projects an append-only log into a key-addressed record map", long_about = None)]
struct Cli {
    #[command(subcommand)]
    cmd: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Compute layered config hash + print canonical JSON
    ConfigHash {
        /// Paths in merge order (base -> env -> local...)
        #[arg(required = true)]
        paths: Vec<String>,
    },

    /// Mapper commands
    Map {
        #[command(subcommand)]
        cmd: MapCmd,
    },

    /// Inspect stored records
    Record {
        #[command(subcommand)]
        cmd: RecordCmd,
    },

    /// Source log utilities
    Log {
        #[command(subcommand)]
        cmd: LogCmd,
    },

    /// Database commands
    Db {
        #[command(subcommand)]
        cmd: DbCmd,
    },
}

#[derive(Subcommand)]
enum MapCmd {
    /// Scan the configured log once and fold every leaf into the map.
    Run {
        /// Layered config paths in merge order
        #[arg(long = "config", required = true)]
        config_paths: Vec<String>,

        /// Fail instead of warn when the config carries keys nothing reads
        #[arg(long, default_value_t = false)]
        fail_on_unused_keys: bool,
    },
}

#[derive(Subcommand)]
enum RecordCmd {
    /// Print the stored record for a key as JSON, or `absent`.
    Get {
        #[arg(long = "config", required = true)]
        config_paths: Vec<String>,

        #[arg(long)]
        key: String,
    },

    /// Print the map index (hex) a key is stored under.
    Index {
        #[arg(long)]
        key: String,
    },
}

#[derive(Subcommand)]
enum LogCmd {
    /// Append one `{"Entry":...,"Item":...}` leaf to the configured log.
    Append {
        #[arg(long = "config", required = true)]
        config_paths: Vec<String>,

        /// Leaf JSON string
        #[arg(long, conflicts_with = "payload_file")]
        payload: Option<String>,

        /// Path to a leaf JSON file
        #[arg(long = "payload-file", conflicts_with = "payload")]
        payload_file: Option<String>,
    },
}

#[derive(Subcommand)]
enum DbCmd {
    Status {
        #[arg(long = "config", required = true)]
        config_paths: Vec<String>,
    },

    /// Apply SQL migrations.
    Migrate {
        #[arg(long = "config", required = true)]
        config_paths: Vec<String>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let _ = dotenvy::from_filename(".env.local");
    init_tracing();

    let cli = Cli::parse();

    match cli.cmd {
        Commands::ConfigHash { paths } => {
            let loaded = regmap_config::load_layered_yaml(&paths)?;
            println!("config_hash={}", loaded.config_hash);
            println!("{}", loaded.canonical_json);
        }

        Commands::Map { cmd } => match cmd {
            MapCmd::Run {
                config_paths,
                fail_on_unused_keys,
            } => commands::map::run(&config_paths, fail_on_unused_keys).await?,
        },

        Commands::Record { cmd } => match cmd {
            RecordCmd::Get { config_paths, key } => {
                commands::record::get(&config_paths, &key).await?
            }
            RecordCmd::Index { key } => {
                println!("{}", regmap_store::StoreIndex::for_key(&key));
            }
        },

        Commands::Log { cmd } => match cmd {
            LogCmd::Append {
                config_paths,
                payload,
                payload_file,
            } => {
                let value = commands::load_payload(payload, payload_file)?;
                commands::log::append(&config_paths, &value).await?
            }
        },

        Commands::Db { cmd } => match cmd {
            DbCmd::Status { config_paths } => {
                let pool = commands::connect_db(&config_paths).await?;
                let s = regmap_db::status(&pool).await?;
                println!(
                    "db_ok={} has_map_table={} has_log_table={}",
                    s.ok, s.has_map_table, s.has_log_table
                );
            }
            DbCmd::Migrate { config_paths } => {
                let pool = commands::connect_db(&config_paths).await?;
                regmap_db::migrate(&pool).await?;
                println!("migrations_applied=true");
            }
        },
    }

    Ok(())
}

/// Logs go to stderr; stdout carries command output only.
fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()),
        )
        .with_writer(std::io::stderr)
        .init();
}
