//! Storefront Variants - variant preview
//!
//! Reads a product draft as JSON (from the file named by the first argument, or
//! stdin) and prints the product with its generated variants.

use anyhow::{Context, Result};
use std::io::Read;
use storefront_variants::store::memory::MemoryStore;
use storefront_variants::{load_config, ProductDraft, Storefront};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<()> {
    let config = load_config()?;
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| config.log_level.as_str().into()))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let input = match std::env::args().nth(1) {
        Some(path) => std::fs::read_to_string(&path).with_context(|| format!("reading {path}"))?,
        None => {
            let mut buf = String::new();
            std::io::stdin().read_to_string(&mut buf).context("reading stdin")?;
            buf
        }
    };
    let draft: ProductDraft = serde_json::from_str(&input).context("parsing product draft")?;

    tracing::info!(lifecycle = %config.lifecycle, max_variants = config.max_variants, "generating variants");
    let storefront = Storefront::new(MemoryStore::new(), config);
    let product = storefront.create_product(draft).await?;
    println!("{}", serde_json::to_string_pretty(&product.doc)?);
    Ok(())
}
