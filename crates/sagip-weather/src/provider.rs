//! OpenWeatherMap current-conditions client.

use std::time::Duration;

use reqwest::Client;
use serde::Deserialize;
use tracing::instrument;

use crate::error::FetchError;
use crate::geocode::reverse_geocode;
use crate::types::{Coordinate, CurrentConditions, Observation};

const WEATHER_API_BASE: &str = "https://api.openweathermap.org/data/2.5";
const GEOCODE_API_BASE: &str = "https://nominatim.openstreetmap.org";
const REQUEST_TIMEOUT_SECS: u64 = 10;
const USER_AGENT: &str = "Sagip/0.1.0 (emergency information client)";

/// Connection settings for [`WeatherProvider`]. Endpoint URLs are plain
/// fields so tests and self-hosted deployments can point them elsewhere.
#[derive(Debug, Clone)]
pub struct ProviderConfig {
    pub api_key: String,
    pub weather_url: String,
    pub geocode_url: String,
    pub timeout: Duration,
}

impl ProviderConfig {
    /// Default endpoints with the given API key.
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            weather_url: WEATHER_API_BASE.to_string(),
            geocode_url: GEOCODE_API_BASE.to_string(),
            timeout: Duration::from_secs(REQUEST_TIMEOUT_SECS),
        }
    }
}

pub struct WeatherProvider {
    client: Client,
    config: ProviderConfig,
}

impl WeatherProvider {
    /// Build a provider. Fails when the API key is empty or the HTTP
    /// client cannot be constructed.
    pub fn new(config: ProviderConfig) -> Result<Self, FetchError> {
        if config.api_key.is_empty() {
            return Err(FetchError::NoApiKey);
        }

        let client = Client::builder()
            .timeout(config.timeout)
            .user_agent(USER_AGENT)
            .build()?;

        Ok(Self { client, config })
    }

    /// Fetch conditions for a coordinate and resolve the display locality.
    ///
    /// The reverse-geocode lookup runs concurrently with the weather call
    /// and is strictly best-effort: if it comes back empty the weather
    /// API's own place name is used instead.
    #[instrument(skip(self), level = "info")]
    pub async fn observe(&self, coordinate: Coordinate) -> Result<Observation, FetchError> {
        let (conditions, locality) = tokio::join!(
            self.current_conditions(coordinate),
            reverse_geocode(&self.client, &self.config.geocode_url, coordinate),
        );

        let conditions = conditions?;
        let locality = locality.unwrap_or_else(|| conditions.place_name.clone());

        Ok(Observation {
            conditions,
            locality,
        })
    }

    /// One call to the current-weather endpoint. No retries; any failure
    /// here fails the whole fetch.
    #[instrument(skip(self), level = "info")]
    pub async fn current_conditions(
        &self,
        coordinate: Coordinate,
    ) -> Result<CurrentConditions, FetchError> {
        let url = format!(
            "{}/weather?lat={}&lon={}&appid={}&units=metric",
            self.config.weather_url,
            coordinate.latitude,
            coordinate.longitude,
            self.config.api_key,
        );

        let response = self.client.get(&url).send().await?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status(status));
        }

        let body: WeatherResponse = response
            .json()
            .await
            .map_err(|e| FetchError::Decode(e.to_string()))?;

        Ok(body.into_conditions())
    }
}

#[derive(Debug, Deserialize)]
struct WeatherResponse {
    main: MainReading,
    weather: Vec<ConditionTag>,
    name: String,
    wind: WindReading,
    visibility: u32,
}

#[derive(Debug, Deserialize)]
struct MainReading {
    temp: f64,
    feels_like: f64,
    humidity: u8,
}

#[derive(Debug, Default, Deserialize)]
struct ConditionTag {
    main: Option<String>,
    icon: Option<String>,
}

#[derive(Debug, Deserialize)]
struct WindReading {
    speed: f64,
}

impl WeatherResponse {
    fn into_conditions(self) -> CurrentConditions {
        // The `weather` array and both of its fields are optional; each
        // falls back to a clear-sky tag independently
        let tag = self.weather.into_iter().next().unwrap_or_default();
        let condition = tag.main.unwrap_or_else(|| "Clear".to_string());
        let icon_code = tag.icon.unwrap_or_else(|| "01d".to_string());

        CurrentConditions {
            condition,
            icon_code,
            place_name: self.name,
            temp_c: self.main.temp,
            feels_like_c: self.main.feels_like,
            humidity_pct: self.main.humidity,
            wind_speed: self.wind.speed,
            visibility_m: self.visibility,
        }
    }
}
