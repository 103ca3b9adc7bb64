//! This crate implements an iCalendar server serving waste collection dates as events.
//!
//! The path and query string are `/calendar?addressId=<your_address_id>`, optionally with `&format=text`.
//! Address identifiers can be looked up at `/address?query=<your_address>`.

use std::{net::SocketAddr, path::PathBuf, sync::Arc, time::Duration};

use anyhow::Result;
use clap::Parser;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};
use wcc_core::{
    artifact_store::ArtifactStore, date_normalizer::NO_PICKUPS_SENTINEL,
    garbage_client::HttpClient, pipeline::Pipeline,
};

mod error;
mod route;

#[derive(Debug, Parser)]
#[command()]
pub struct Arguments {
    /// the address to listen on
    #[arg(long, env = "WCC_BIND", default_value = "0.0.0.0:8008")]
    pub bind: SocketAddr,
    /// the directory generated calendars are cached in
    #[arg(long, env = "WCC_CACHE_DIR", default_value = "cache")]
    pub cache_dir: PathBuf,
    /// the base URL of the waste collection provider
    #[arg(long, env = "WCC_PROVIDER_URL")]
    pub provider_url: String,
    /// seconds to wait for the provider
    #[arg(long, env = "WCC_TIMEOUT_SECS", default_value_t = 30)]
    pub timeout_secs: u64,
    /// the provider's text for a material without scheduled pickups
    #[arg(long, env = "WCC_NO_PICKUPS_SENTINEL", default_value = NO_PICKUPS_SENTINEL)]
    pub no_pickups_sentinel: String,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new("wcc_server=debug,wcc_core=debug,tower_http=debug")
        }))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let args = Arguments::parse();
    let client = HttpClient::new(&args.provider_url, Duration::from_secs(args.timeout_secs))?;
    let store = ArtifactStore::new(&args.cache_dir);
    store.ensure_dir().await?;
    let pipeline =
        Pipeline::new(Arc::new(client), store).with_sentinel(args.no_pickups_sentinel);

    let app = route::app(Arc::new(pipeline));
    info!(addr = %args.bind, cache_dir = %args.cache_dir.display(), "Listening");
    axum::Server::bind(&args.bind)
        .serve(app.into_make_service())
        .await?;
    Ok(())
}
