//! File backed store for generated calendars.
//!
//! Every artifact lives in a single flat directory, named after its cache key.
//! There is no index: existence and age are read from the file system.

use std::{
    io::{self, Write},
    path::{Path, PathBuf},
};

use chrono::{DateTime, Duration, Utc};
use tracing::debug;

use crate::{
    cache_key::CacheKey,
    error::{Error, Result},
};

static EXTENSION: &str = "ics";

#[derive(Debug, Clone)]
pub struct ArtifactStore {
    dir: PathBuf,
}

impl ArtifactStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Create the cache directory if it does not exist yet.
    pub async fn ensure_dir(&self) -> Result<()> {
        tokio::fs::create_dir_all(&self.dir).await?;
        Ok(())
    }

    fn path(&self, key: &CacheKey) -> PathBuf {
        self.dir.join(format!("{key}.{EXTENSION}"))
    }

    pub async fn exists(&self, key: &CacheKey) -> Result<bool> {
        match tokio::fs::metadata(self.path(key)).await {
            Ok(metadata) => Ok(metadata.is_file()),
            Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(false),
            Err(err) => Err(err.into()),
        }
    }

    /// When the artifact was written.
    ///
    /// Artifacts are only ever replaced as a whole, so the modification time is the creation time.
    pub async fn created_at(&self, key: &CacheKey) -> Result<DateTime<Utc>> {
        let metadata = tokio::fs::metadata(self.path(key))
            .await
            .map_err(|err| not_found(err, key))?;
        Ok(DateTime::<Utc>::from(metadata.modified()?))
    }

    /// A missing artifact is never fresh.
    pub async fn is_fresh(&self, key: &CacheKey, now: DateTime<Utc>, ttl: Duration) -> Result<bool> {
        match self.created_at(key).await {
            Ok(created_at) => Ok(is_fresh_at(created_at, now, ttl)),
            Err(Error::NotFound { .. }) => Ok(false),
            Err(err) => Err(err),
        }
    }

    pub async fn read(&self, key: &CacheKey) -> Result<Vec<u8>> {
        tokio::fs::read(self.path(key))
            .await
            .map_err(|err| not_found(err, key))
    }

    /// Replace the artifact as a whole.
    ///
    /// The bytes go to a temporary file next to the target which is then renamed over it,
    /// so readers see either the previous artifact or the new one.
    pub async fn write(&self, key: &CacheKey, bytes: Vec<u8>) -> Result<()> {
        let dir = self.dir.clone();
        let path = self.path(key);
        tokio::task::spawn_blocking(move || -> Result<()> {
            let mut file = tempfile::Builder::new()
                .prefix(".")
                .suffix(".tmp")
                .tempfile_in(&dir)?;
            file.write_all(&bytes)?;
            file.as_file().sync_all()?;
            file.persist(&path).map_err(|err| err.error)?;
            Ok(())
        })
        .await
        .map_err(|err| Error::unknown(format!("artifact write task failed: {err}")))??;
        debug!(key = %key, "Stored artifact");
        Ok(())
    }
}

pub fn is_fresh_at(created_at: DateTime<Utc>, now: DateTime<Utc>, ttl: Duration) -> bool {
    now - created_at < ttl
}

fn not_found(err: io::Error, key: &CacheKey) -> Error {
    if err.kind() == io::ErrorKind::NotFound {
        Error::NotFound {
            key: key.to_string(),
        }
    } else {
        err.into()
    }
}
