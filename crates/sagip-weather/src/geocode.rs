//! Reverse geocoding: convert a coordinate to a locality name.
//! Uses Nominatim (OpenStreetMap) - free, no API key required.

use reqwest::Client;
use serde::Deserialize;

use crate::types::Coordinate;

#[derive(Debug, Deserialize)]
struct NominatimResponse {
    address: Option<NominatimAddress>,
}

#[derive(Debug, Deserialize)]
struct NominatimAddress {
    city: Option<String>,
    town: Option<String>,
    village: Option<String>,
    municipality: Option<String>,
}

/// Look up the locality containing `coordinate` (e.g. "Manila").
/// Returns `None` on any failure; the caller falls back to the weather
/// API's own place name, so nothing here is allowed to error out.
pub async fn reverse_geocode(
    client: &Client,
    base_url: &str,
    coordinate: Coordinate,
) -> Option<String> {
    let url = format!(
        "{}/reverse?lat={}&lon={}&format=json&addressdetails=1&layer=address&zoom=10",
        base_url, coordinate.latitude, coordinate.longitude
    );

    let response = match client.get(&url).send().await {
        Ok(r) => r,
        Err(e) => {
            tracing::debug!("Reverse geocode request failed: {}", e);
            return None;
        }
    };

    if !response.status().is_success() {
        tracing::debug!("Reverse geocode returned status {}", response.status());
        return None;
    }

    let body: NominatimResponse = match response.json().await {
        Ok(b) => b,
        Err(e) => {
            tracing::debug!("Reverse geocode parse error: {}", e);
            return None;
        }
    };

    let addr = body.address?;

    // Prefer city > town > village > municipality for the locality
    let locality = addr
        .city
        .or(addr.town)
        .or(addr.village)
        .or(addr.municipality)?;

    tracing::info!("Reverse geocoded to: {}", locality);
    Some(locality)
}
