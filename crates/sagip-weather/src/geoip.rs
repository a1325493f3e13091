//! IP-based position backend.
//!
//! Resolves an approximate position from the machine's public IP address
//! using ip-api.com - free, no API key required. Every fresh fix is
//! remembered on disk so later cycles can fall back to it offline.

use std::path::{Path, PathBuf};
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use reqwest::Client;
use serde::Deserialize;

use crate::error::PositionError;
use crate::location::PositionSource;
use crate::types::{CachedFix, Coordinate};

const REQUEST_TIMEOUT_SECS: u64 = 10;
const FIX_FILE: &str = "last_fix.json";

#[derive(Debug, Deserialize)]
struct LookupResponse {
    status: String,
    lat: Option<f64>,
    lon: Option<f64>,
}

/// [`PositionSource`] backed by an IP geolocation lookup.
pub struct GeoIpSource {
    client: Client,
    lookup_url: String,
    fix_path: PathBuf,
}

impl GeoIpSource {
    /// Create a backend that queries `lookup_url` and remembers every
    /// fresh fix under `data_dir`.
    pub fn new(data_dir: &Path, lookup_url: &str) -> Result<Self, PositionError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()?;
        Ok(Self {
            client,
            lookup_url: lookup_url.trim_end_matches('/').to_string(),
            fix_path: data_dir.join(FIX_FILE),
        })
    }

    async fn remember(&self, coordinate: Coordinate) {
        let fix = CachedFix {
            coordinate,
            saved_at: Utc::now(),
        };
        let body = match serde_json::to_string_pretty(&fix) {
            Ok(body) => body,
            Err(e) => {
                tracing::warn!("Failed to serialize position fix: {}", e);
                return;
            }
        };
        if let Some(parent) = self.fix_path.parent() {
            if let Err(e) = tokio::fs::create_dir_all(parent).await {
                tracing::warn!("Failed to create data directory: {}", e);
                return;
            }
        }
        if let Err(e) = tokio::fs::write(&self.fix_path, body).await {
            tracing::warn!("Failed to persist position fix: {}", e);
        }
    }
}

#[async_trait]
impl PositionSource for GeoIpSource {
    async fn current_position(&self) -> Result<Option<Coordinate>, PositionError> {
        let url = format!("{}/json", self.lookup_url);
        let response = self.client.get(&url).send().await?;

        if !response.status().is_success() {
            return Err(PositionError::new(format!(
                "Position lookup returned {}",
                response.status()
            )));
        }

        let lookup: LookupResponse = response
            .json()
            .await
            .map_err(|e| PositionError::new(format!("Invalid position lookup response: {}", e)))?;

        if lookup.status != "success" {
            tracing::debug!("Position lookup refused: {}", lookup.status);
            return Ok(None);
        }

        match (lookup.lat, lookup.lon) {
            (Some(latitude), Some(longitude)) => {
                let fix = Coordinate {
                    latitude,
                    longitude,
                };
                self.remember(fix).await;
                Ok(Some(fix))
            }
            _ => Ok(None),
        }
    }

    async fn last_known_position(&self) -> Result<Option<Coordinate>, PositionError> {
        let raw = match tokio::fs::read_to_string(&self.fix_path).await {
            Ok(raw) => raw,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => {
                tracing::debug!("Failed to read remembered fix: {}", e);
                return Ok(None);
            }
        };

        match serde_json::from_str::<CachedFix>(&raw) {
            Ok(fix) => {
                tracing::debug!("Loaded fix remembered at {}", fix.saved_at);
                Ok(Some(fix.coordinate))
            }
            Err(e) => {
                tracing::debug!("Ignoring corrupt remembered fix: {}", e);
                Ok(None)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tempfile::TempDir;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn source_for(server: &MockServer, dir: &TempDir) -> GeoIpSource {
        GeoIpSource::new(dir.path(), &server.uri()).unwrap()
    }

    #[tokio::test]
    async fn fresh_fix_is_remembered_for_later_cycles() {
        let server = MockServer::start().await;
        let dir = TempDir::new().unwrap();

        Mock::given(method("GET"))
            .and(path("/json"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "status": "success",
                "lat": 14.5995,
                "lon": 120.9842
            })))
            .mount(&server)
            .await;

        let source = source_for(&server, &dir);
        let fresh = source.current_position().await.unwrap().unwrap();
        assert_eq!(fresh.latitude, 14.5995);
        assert_eq!(fresh.longitude, 120.9842);

        let remembered = source.last_known_position().await.unwrap().unwrap();
        assert_eq!(remembered, fresh);
    }

    #[tokio::test]
    async fn refused_lookup_yields_no_fix() {
        let server = MockServer::start().await;
        let dir = TempDir::new().unwrap();

        Mock::given(method("GET"))
            .and(path("/json"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "status": "fail",
                "message": "private range"
            })))
            .mount(&server)
            .await;

        let source = source_for(&server, &dir);
        assert_eq!(source.current_position().await.unwrap(), None);
    }

    #[tokio::test]
    async fn successful_lookup_without_coordinates_yields_no_fix() {
        let server = MockServer::start().await;
        let dir = TempDir::new().unwrap();

        Mock::given(method("GET"))
            .and(path("/json"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "status": "success"
            })))
            .mount(&server)
            .await;

        let source = source_for(&server, &dir);
        assert_eq!(source.current_position().await.unwrap(), None);
    }

    #[tokio::test]
    async fn server_error_is_reported_as_failure() {
        let server = MockServer::start().await;
        let dir = TempDir::new().unwrap();

        Mock::given(method("GET"))
            .and(path("/json"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;

        let source = source_for(&server, &dir);
        assert!(source.current_position().await.is_err());
    }

    #[tokio::test]
    async fn missing_fix_file_means_no_remembered_position() {
        let server = MockServer::start().await;
        let dir = TempDir::new().unwrap();

        let source = source_for(&server, &dir);
        assert_eq!(source.last_known_position().await.unwrap(), None);
    }

    #[tokio::test]
    async fn corrupt_fix_file_is_ignored() {
        let server = MockServer::start().await;
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join(FIX_FILE), "not json at all").unwrap();

        let source = source_for(&server, &dir);
        assert_eq!(source.last_known_position().await.unwrap(), None);
    }
}
