//! crudify-cli: choose a resource and an operation, then answer prompts.
//!
//! Run from repo root: `cargo run -p crudify-cli -- --url http://localhost:3000`

use clap::Parser;
use crudify::SchemaCache;
use crudify_cli::{discover, ApiClient, LinePrompter, Session};
use rand::rngs::StdRng;
use rand::SeedableRng;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "crudify-cli")]
#[command(version, about, long_about = None)]
struct Args {
    /// Server root URL
    #[arg(long, env = "CRUDIFY_URL", default_value = "http://localhost:3000")]
    url: String,

    /// Schema cache read when the server cannot list its resources
    #[arg(long, env = "SCHEMA_CACHE_PATH", default_value = "schema-cache.json")]
    schema_cache: PathBuf,

    /// Seed for auto-generated records
    #[arg(long)]
    seed: Option<u64>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("crudify_cli=warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();
    let client = ApiClient::new(args.url);
    let (resources, source) = discover(&client, &SchemaCache::new(args.schema_cache)).await;
    println!("crudify client for {} ({} resources from {:?})", client.base_url(), resources.len(), source);

    let mut session = Session::new(client, resources, LinePrompter::new()?, std::io::stdout());
    if let Some(seed) = args.seed {
        session = session.with_rng(StdRng::seed_from_u64(seed));
    }
    session.run().await?;
    println!("bye");
    Ok(())
}
