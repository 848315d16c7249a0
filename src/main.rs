use anyhow::{bail, Context};
use clap::Parser;
use kvcache_locality::kvcache::{
    IndexBackend, LocalityConfig, LocalityMap, ProcessedChunk, TokenDatabase,
};
use kvcache_locality::EngineMetadata;
use serde::Serialize;
use std::path::PathBuf;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// YAML or JSON config file; flags below override its values
    #[arg(long)]
    config: Option<PathBuf>,

    /// Tokens per chunk
    #[arg(long)]
    chunk_size: Option<usize>,

    #[arg(long)]
    model_name: Option<String>,

    /// Cache format tag (default vllm)
    #[arg(long)]
    format: Option<String>,

    #[arg(long)]
    world_size: Option<usize>,

    #[arg(long)]
    worker_id: Option<usize>,

    /// memory | redis
    #[arg(long)]
    backend: Option<IndexBackend>,

    #[arg(long)]
    redis_url: Option<String>,

    /// Per-lookup timeout (in milliseconds)
    #[arg(long)]
    timeout_ms: Option<u64>,

    #[arg(long)]
    max_retries: Option<u32>,

    /// Comma separated token ids
    #[arg(long, value_delimiter = ',')]
    tokens: Option<Vec<u32>>,

    /// JSON file holding an array of token ids
    #[arg(long)]
    tokens_file: Option<PathBuf>,

    /// Print chunk keys only, skip the index lookup
    #[arg(long, default_value_t = false)]
    keys_only: bool,
}

#[derive(Serialize)]
struct Report {
    chunks: Vec<ProcessedChunk>,
    #[serde(skip_serializing_if = "Option::is_none")]
    locality: Option<Vec<ChunkLocality>>,
}

#[derive(Serialize)]
struct ChunkLocality {
    key: String,
    hosts: Vec<String>,
}

fn build_config(args: &Args) -> anyhow::Result<LocalityConfig> {
    let mut config = match &args.config {
        Some(path) => LocalityConfig::from_file(path)
            .with_context(|| format!("failed to load config {}", path.display()))?,
        None => {
            let Some(model_name) = args.model_name.clone() else {
                bail!("either --config or --model-name is required");
            };
            LocalityConfig::new(EngineMetadata::new(model_name))
        }
    };

    if let Some(chunk_size) = args.chunk_size {
        config.chunk_size = chunk_size;
    }
    if let Some(model_name) = &args.model_name {
        config.metadata.model_name = model_name.clone();
    }
    if let Some(format) = &args.format {
        config.metadata.format = format.clone();
    }
    if let Some(world_size) = args.world_size {
        config.metadata.world_size = world_size;
    }
    if let Some(worker_id) = args.worker_id {
        config.metadata.worker_id = worker_id;
    }
    if let Some(backend) = args.backend {
        config.backend = backend;
    }
    if let Some(url) = &args.redis_url {
        config.redis_url = Some(url.clone());
    }
    if let Some(timeout) = args.timeout_ms {
        config.lookup_timeout_ms = Some(timeout);
    }
    if let Some(retries) = args.max_retries {
        config.max_retries = retries;
    }

    config.validate()?;
    Ok(config)
}

fn load_tokens(args: &Args) -> anyhow::Result<Vec<u32>> {
    match (&args.tokens, &args.tokens_file) {
        (Some(tokens), None) => Ok(tokens.clone()),
        (None, Some(path)) => {
            let content = std::fs::read_to_string(path)
                .with_context(|| format!("failed to read {}", path.display()))?;
            Ok(serde_json::from_str(&content)?)
        }
        (Some(_), Some(_)) => bail!("--tokens and --tokens-file are mutually exclusive"),
        (None, None) => bail!("no tokens given, use --tokens or --tokens-file"),
    }
}

fn locality_rows(chunks: &[ProcessedChunk], pods: &LocalityMap) -> Vec<ChunkLocality> {
    chunks
        .iter()
        .map(|chunk| ChunkLocality {
            key: chunk.key.to_store_key(),
            hosts: pods.get(&chunk.key).cloned().unwrap_or_default(),
        })
        .collect()
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();
    let config = build_config(&args)?;
    let tokens = load_tokens(&args)?;

    let db = config.build_token_database()?;
    let chunks = db.process_tokens(&tokens);
    info!("{} tokens -> {} chunks", tokens.len(), chunks.len());

    let locality = if args.keys_only {
        None
    } else {
        let index = config.build_index().await?;
        let keys: Vec<_> = chunks.iter().map(|chunk| chunk.key.clone()).collect();
        let pods = index.lookup(&keys).await?;
        let stats = index.stats();
        info!(
            "Lookup done: {} hits, {} misses, {} malformed",
            stats.hits, stats.misses, stats.malformed
        );
        Some(locality_rows(&chunks, &pods))
    };

    let report = Report { chunks, locality };
    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}
