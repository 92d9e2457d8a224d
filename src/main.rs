use catalog_indexer::{
    config::Config,
    models::CatalogRecord,
    pipeline::IndexPipeline,
    store::SolrClient,
};
use clap::Parser;
use std::io::BufRead;
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Synthesize denormalized search documents from catalog records and
/// commit them to the index.
#[derive(Parser, Debug)]
#[command(name = "catalog-indexer", version, about)]
struct Cli {
    /// Newline-delimited JSON records; reads stdin when omitted
    input: Option<PathBuf>,

    /// Override the index store base URL from configuration
    #[arg(long, env = "CATALOG_IDX__STORE__BASE_URL")]
    store_url: Option<String>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Load configuration
    let mut config = Config::load().unwrap_or_else(|e| {
        eprintln!("Failed to load configuration: {}", e);
        eprintln!("Using default configuration");
        Config {
            store: Default::default(),
            commit: Default::default(),
            observability: Default::default(),
        }
    });
    if let Some(url) = cli.store_url {
        config.store.base_url = url;
    }

    // Initialize tracing; RUST_LOG wins over the configured level
    let filter = tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        format!("catalog_indexer={}", config.observability.log_level).into()
    });
    if config.observability.json_logs {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer().json())
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer())
            .init();
    }

    tracing::info!("Starting Catalog Indexer v{}", env!("CARGO_PKG_VERSION"));
    tracing::info!(
        store = %config.store.base_url,
        batch_size = config.commit.batch_size,
        "Configuration loaded"
    );

    // Connect to the index store; refusing to start beats silently
    // buffering documents we can never commit.
    let client = SolrClient::new(&config.store)?;
    client.connect().await?;
    tracing::info!("✅ Index store connection established");

    let records = read_records(cli.input.as_deref())?;
    tracing::info!(count = records.len(), "✅ Input records loaded");

    let pipeline = IndexPipeline::new(Arc::new(client), config.commit.clone());
    let summary = pipeline.run(records).await?;

    if !summary.unclassified_keys.is_empty() {
        tracing::warn!(
            keys = ?summary.unclassified_keys,
            "Some records could not be classified"
        );
    }
    if !summary.commit.skipped_keys.is_empty() {
        tracing::warn!(
            keys = ?summary.commit.skipped_keys,
            "Some documents were rejected by the store"
        );
    }
    tracing::info!(
        processed = summary.processed,
        works = summary.works_indexed,
        authors = summary.authors_indexed,
        committed = summary.commit.succeeded,
        "✅ Indexing run finished"
    );
    Ok(())
}

/// Read NDJSON records from a file or stdin. Undecodable lines are
/// logged and skipped rather than aborting the run.
fn read_records(path: Option<&std::path::Path>) -> std::io::Result<Vec<CatalogRecord>> {
    let reader: Box<dyn BufRead> = match path {
        Some(p) => Box::new(std::io::BufReader::new(std::fs::File::open(p)?)),
        None => Box::new(std::io::BufReader::new(std::io::stdin())),
    };

    let mut records = Vec::new();
    for (lineno, line) in reader.lines().enumerate() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        match CatalogRecord::parse(&line) {
            Ok(record) => records.push(record),
            Err(e) => {
                tracing::warn!(line = lineno + 1, error = %e, "Skipping undecodable input line");
            }
        }
    }
    Ok(records)
}
