//! Generated artifact persistence: route cache and OpenAPI document on disk.
//!
//! Files are written to a temporary sibling and renamed into place, so a reader never
//! sees a half-written artifact.

use crate::config::CacheConfig;
use crate::error::GeneratorError;
use crate::generator::{ApiSnapshot, RouteSet};
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Persisted route table with its generation time.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RouteCache {
    pub generated_at: DateTime<Utc>,
    pub routes: RouteSet,
}

impl RouteCache {
    pub fn is_stale(&self, now: DateTime<Utc>, max_age_secs: u64) -> bool {
        let secs = i64::try_from(max_age_secs).unwrap_or(i64::MAX).min(i64::MAX / 1_000);
        let max_age = Duration::seconds(secs);
        now.signed_duration_since(self.generated_at) > max_age
    }
}

#[derive(Clone, Debug)]
pub struct ArtifactStore {
    route_cache_path: PathBuf,
    openapi_path: PathBuf,
}

impl ArtifactStore {
    pub fn new(route_cache_path: impl Into<PathBuf>, openapi_path: impl Into<PathBuf>) -> Self {
        ArtifactStore {
            route_cache_path: route_cache_path.into(),
            openapi_path: openapi_path.into(),
        }
    }

    pub fn from_config(cache: &CacheConfig) -> Self {
        ArtifactStore::new(&cache.route_cache_path, &cache.openapi_path)
    }

    pub fn route_cache_path(&self) -> &Path {
        &self.route_cache_path
    }

    pub fn openapi_path(&self) -> &Path {
        &self.openapi_path
    }

    /// Write both artifacts from one snapshot.
    pub async fn publish(&self, snapshot: &ApiSnapshot) -> Result<(), GeneratorError> {
        let cache = RouteCache {
            generated_at: snapshot.generated_at,
            routes: snapshot.routes.clone(),
        };
        let cache_json = serde_json::to_string_pretty(&cache)?;
        write_atomic(&self.route_cache_path, cache_json.as_bytes()).await?;
        write_atomic(&self.openapi_path, snapshot.openapi_json.as_bytes()).await?;
        tracing::info!(
            routes = snapshot.routes.len(),
            route_cache = %self.route_cache_path.display(),
            openapi = %self.openapi_path.display(),
            "artifacts published"
        );
        Ok(())
    }

    /// Persisted route cache, or `None` when nothing has been published yet.
    pub async fn load_route_cache(&self) -> Result<Option<RouteCache>, GeneratorError> {
        match tokio::fs::read(&self.route_cache_path).await {
            Ok(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    pub async fn load_openapi(&self) -> Result<Option<String>, GeneratorError> {
        match tokio::fs::read_to_string(&self.openapi_path).await {
            Ok(s) => Ok(Some(s)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    /// Remove both artifacts. Missing files are not an error.
    pub async fn clear(&self) -> Result<(), GeneratorError> {
        for path in [&self.route_cache_path, &self.openapi_path] {
            match tokio::fs::remove_file(path).await {
                Ok(()) => {}
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
                Err(e) => return Err(e.into()),
            }
        }
        Ok(())
    }
}

async fn write_atomic(path: &Path, bytes: &[u8]) -> Result<(), GeneratorError> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        tokio::fs::create_dir_all(parent).await?;
    }
    let mut tmp = path.as_os_str().to_owned();
    tmp.push(".tmp");
    let tmp = PathBuf::from(tmp);
    tokio::fs::write(&tmp, bytes).await?;
    tokio::fs::rename(&tmp, path).await?;
    Ok(())
}
