//! Serves calendars from the artifact store and regenerates them when they are stale.

use std::{str::FromStr, sync::Arc};

use chrono::{DateTime, Duration, Utc};
use tracing::{debug, info};

use crate::{
    artifact_store::ArtifactStore,
    cache_key::{canonicalize, key_of, CacheKey, QueryParams},
    calendar::{assemble, MaterialSchedule},
    date_normalizer::{normalize, Normalized, NO_PICKUPS_SENTINEL},
    error::{Error, Result},
    garbage_client::{Address, UpstreamClient},
};

pub static ADDRESS_ID_PARAM: &str = "addressId";
pub static FORMAT_PARAM: &str = "format";
static FILENAME: &str = "calendar.ics";

/// How a served artifact is rendered.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum OutputFormat {
    #[default]
    Ics,
    Text,
}

impl FromStr for OutputFormat {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "ics" => Ok(Self::Ics),
            "text" => Ok(Self::Text),
            other => Err(Error::client_input(format!(
                "unknown format {other:?}, expected \"ics\" or \"text\""
            ))),
        }
    }
}

/// The artifact of a request, ready to be sent.
#[derive(Debug, Clone)]
pub struct ServedArtifact {
    pub key: CacheKey,
    pub format: OutputFormat,
    pub body: Vec<u8>,
    /// When the artifact was generated.
    pub last_modified: DateTime<Utc>,
}

impl ServedArtifact {
    pub fn content_type(&self) -> &'static str {
        match self.format {
            OutputFormat::Ics => "text/calendar; charset=utf-8",
            OutputFormat::Text => "text/plain; charset=utf-8",
        }
    }

    /// Only the calendar is offered as a download.
    pub fn attachment_filename(&self) -> Option<&'static str> {
        match self.format {
            OutputFormat::Ics => Some(FILENAME),
            OutputFormat::Text => None,
        }
    }
}

/// What a calendar request asks for.
#[derive(Debug, Clone, PartialEq, Eq)]
struct CalendarRequest {
    address_id: String,
    format: OutputFormat,
}

impl CalendarRequest {
    fn from_params(params: &QueryParams) -> Result<Self> {
        let address_id = params
            .get(ADDRESS_ID_PARAM)
            .map(|address_id| address_id.trim())
            .filter(|address_id| !address_id.is_empty())
            .ok_or_else(|| Error::client_input(format!("missing parameter {ADDRESS_ID_PARAM}")))?;
        let format = params
            .get(FORMAT_PARAM)
            .map(|format| format.parse::<OutputFormat>())
            .transpose()?
            .unwrap_or_default();
        Ok(Self {
            address_id: address_id.to_string(),
            format,
        })
    }

    /// The query with the address id as it is used, so padding doesn't split the cache.
    fn keyed_params(&self, params: &QueryParams) -> QueryParams {
        let mut keyed = params.clone();
        keyed.insert(ADDRESS_ID_PARAM.to_string(), self.address_id.clone());
        keyed
    }
}

pub struct Pipeline {
    client: Arc<dyn UpstreamClient>,
    store: ArtifactStore,
    ttl: Duration,
    sentinel: String,
}

impl Pipeline {
    pub fn new(client: Arc<dyn UpstreamClient>, store: ArtifactStore) -> Self {
        Self {
            client,
            store,
            ttl: Duration::days(1),
            sentinel: String::from(NO_PICKUPS_SENTINEL),
        }
    }

    pub fn with_ttl(mut self, ttl: Duration) -> Self {
        self.ttl = ttl;
        self
    }

    /// Use another text for "no pickups scheduled".
    pub fn with_sentinel(mut self, sentinel: impl Into<String>) -> Self {
        self.sentinel = sentinel.into();
        self
    }

    pub fn store(&self) -> &ArtifactStore {
        &self.store
    }

    pub async fn search_address(&self, query: &str) -> Result<Vec<Address>> {
        let query = query.trim();
        if query.is_empty() {
            return Err(Error::client_input("missing parameter query"));
        }
        self.client.search_address(query).await
    }

    /// Serve the calendar of a request, regenerating it if the stored one is missing or stale.
    pub async fn calendar(&self, params: &QueryParams) -> Result<ServedArtifact> {
        let request = CalendarRequest::from_params(params)?;
        let key = key_of(&canonicalize(&request.keyed_params(params)));
        let body = if self.store.is_fresh(&key, Utc::now(), self.ttl).await? {
            debug!(key = %key, "Serving cached calendar");
            self.store.read(&key).await?
        } else {
            debug!(key = %key, address_id = %request.address_id, "Calendar missing or stale");
            self.regenerate(&key, &request.address_id).await?
        };
        let last_modified = self.store.created_at(&key).await?;
        Ok(ServedArtifact {
            key,
            format: request.format,
            body: render(body, request.format),
            last_modified,
        })
    }

    /// Fetch, build and store the calendar, returning what was stored.
    ///
    /// Nothing is written unless every step succeeded.
    async fn regenerate(&self, key: &CacheKey, address_id: &str) -> Result<Vec<u8>> {
        let schedules = self.fetch_schedules(address_id).await?;
        let bytes = assemble(&schedules);
        self.store.write(key, bytes.clone()).await?;
        info!(
            key = %key,
            address_id = %address_id,
            materials = schedules.len(),
            events = schedules.iter().map(|schedule| schedule.dates.len()).sum::<usize>(),
            "Regenerated calendar"
        );
        Ok(bytes)
    }

    /// Get the normalized pickup dates of every material collected at the address.
    pub async fn fetch_schedules(&self, address_id: &str) -> Result<Vec<MaterialSchedule>> {
        let materials = self.client.materials(address_id).await?;
        let mut schedules = Vec::with_capacity(materials.len());
        for material in materials {
            let raw_dates = self.client.pickup_dates(address_id, &material.id).await?;
            match normalize(&raw_dates, &self.sentinel)? {
                Normalized::Dates(dates) => {
                    schedules.push(MaterialSchedule::new(material.name, dates));
                }
                Normalized::NoSchedule => {
                    debug!(material = %material.name, "No pickups scheduled");
                }
            }
        }
        Ok(schedules)
    }
}

fn render(bytes: Vec<u8>, format: OutputFormat) -> Vec<u8> {
    match format {
        OutputFormat::Ics => bytes,
        OutputFormat::Text => String::from_utf8_lossy(&bytes).into_owned().into_bytes(),
    }
}
