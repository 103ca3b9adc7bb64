use std::{env::current_dir, path::PathBuf, sync::Arc, time::Duration};

use anyhow::{bail, Result};
use clap::{ArgGroup, Parser};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};
use wcc_core::{
    artifact_store::ArtifactStore,
    cache_key::QueryParams,
    date_normalizer::NO_PICKUPS_SENTINEL,
    garbage_client::HttpClient,
    pipeline::{Pipeline, ADDRESS_ID_PARAM, FORMAT_PARAM},
};

#[derive(Debug, Parser)]
#[command(group(ArgGroup::new("target").required(true).args(["address_id", "address"])))]
pub struct Arguments {
    /// the provider's identifier of the address
    #[arg(long)]
    pub address_id: Option<String>,
    /// the address to look up, the first match is used
    #[arg(long)]
    pub address: Option<String>,
    /// write the calendar as `ics` or `text`
    #[arg(long, default_value = "ics")]
    pub format: String,
    /// where to write the calendar, defaults to `calendar.ics` or `calendar.txt` in the current directory
    #[arg(long)]
    pub output: Option<PathBuf>,
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
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let args = Arguments::parse();
    let client = HttpClient::new(&args.provider_url, Duration::from_secs(args.timeout_secs))?;
    let store = ArtifactStore::new(&args.cache_dir);
    store.ensure_dir().await?;
    let pipeline =
        Pipeline::new(Arc::new(client), store).with_sentinel(args.no_pickups_sentinel.clone());

    let address_id = match (&args.address_id, &args.address) {
        (Some(address_id), _) => address_id.clone(),
        (None, Some(address)) => {
            let Some(found) = pipeline.search_address(address).await?.into_iter().next() else {
                bail!("no address found for {address:?}");
            };
            info!(address_id = %found.id, label = %found.label, "Resolved address");
            found.id
        }
        (None, None) => bail!("either --address-id or --address is required"),
    };

    let query_params = QueryParams::from([
        (ADDRESS_ID_PARAM.to_string(), address_id),
        (FORMAT_PARAM.to_string(), args.format.clone()),
    ]);
    let served = pipeline.calendar(&query_params).await?;
    let path = match args.output {
        Some(path) => path,
        None => {
            let mut path = current_dir()?;
            path.push(served.attachment_filename().unwrap_or("calendar.txt"));
            path
        }
    };
    tokio::fs::write(&path, served.body).await?;
    info!(path = %path.display(), last_modified = %served.last_modified, "Wrote calendar");
    Ok(())
}
