use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use docderive::{
    DerivationConfig, DerivationEngine, DerivationRegistry, DurableRecordStore, RecordId,
    SnapshotFile,
};
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::sync::Arc;

const DEFAULT_PROCEDURE: &str = "derive_project";

#[derive(Parser)]
#[command(name = "docderive")]
#[command(about = "Derive business records from their source documents")]
struct Cli {
    /// Derivation config (JSON); defaults to the Quotation → Project preset
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Record snapshot file (JSON)
    #[arg(long, global = true, default_value = "docderive_data.json")]
    data: PathBuf,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Derive one source record and save the snapshot
    Derive {
        #[arg(long)]
        source: String,
    },
    /// Serve the HTTP API
    Serve {
        #[arg(long, default_value_t = 3005)]
        port: u16,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();
    let config = load_config(cli.config.as_deref())?;
    // Every insert and field write rewrites the snapshot before it returns.
    let store = Arc::new(
        DurableRecordStore::open(SnapshotFile::new(&cli.data))
            .with_context(|| format!("load records from {}", cli.data.display()))?,
    );
    let engine = DerivationEngine::new(store, config)?;

    match cli.command {
        Command::Derive { source } => {
            let derivation = engine.derive(&RecordId::new(source)).await?;
            println!("{}", serde_json::to_string_pretty(&derivation)?);
        }
        Command::Serve { port } => {
            let registry = Arc::new(DerivationRegistry::new());
            registry.register(DEFAULT_PROCEDURE, Arc::new(engine.clone()))?;
            let app = docderive::web::router(engine, registry);

            let addr = SocketAddr::from(([127, 0, 0, 1], port));
            println!("docderive listening on http://{addr}");

            let listener = tokio::net::TcpListener::bind(addr).await?;
            axum::serve(listener, app)
                .with_graceful_shutdown(async {
                    let _ = tokio::signal::ctrl_c().await;
                })
                .await?;
        }
    }

    Ok(())
}

fn load_config(path: Option<&Path>) -> Result<DerivationConfig> {
    match path {
        Some(path) => DerivationConfig::from_file(path)
            .with_context(|| format!("invalid derivation config {}", path.display())),
        None => Ok(DerivationConfig::quotation_to_project()),
    }
}
