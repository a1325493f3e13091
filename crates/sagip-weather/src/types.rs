use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Geographic position in decimal degrees
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinate {
    pub latitude: f64,
    pub longitude: f64,
}

/// Raw current-conditions sample, straight from the weather API
#[derive(Debug, Clone, PartialEq)]
pub struct CurrentConditions {
    pub condition: String,
    pub icon_code: String,
    pub place_name: String,
    pub temp_c: f64,
    pub feels_like_c: f64,
    pub humidity_pct: u8,
    pub wind_speed: f64,
    pub visibility_m: u32,
}

/// A conditions sample paired with the locality name chosen for display
#[derive(Debug, Clone, PartialEq)]
pub struct Observation {
    pub conditions: CurrentConditions,
    pub locality: String,
}

/// A position fix remembered across runs, backing the last-known strategy
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CachedFix {
    pub coordinate: Coordinate,
    pub saved_at: DateTime<Utc>,
}

/// Fully formatted weather card, ready for display without further processing
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeatherSnapshot {
    pub location: String,
    pub temperature: String,
    pub condition: String,
    pub icon_url: String,
    pub coordinate: Coordinate,
    pub advice: String,
    pub feels_like: String,
    pub humidity: String,
    pub wind_speed: String,
    pub visibility: String,
}

impl WeatherSnapshot {
    /// Build the display card from an observation. Every numeric field is
    /// formatted here so readers never see a half-formatted card: one
    /// decimal for temperatures and wind, whole percent for humidity,
    /// whole (truncated) kilometers for visibility.
    pub fn compose(
        coordinate: Coordinate,
        observation: &Observation,
        advice: String,
        country_tag: &str,
    ) -> Self {
        let sample = &observation.conditions;
        let location = if country_tag.is_empty() {
            observation.locality.clone()
        } else {
            format!("{}, {}", observation.locality, country_tag)
        };

        Self {
            location,
            temperature: format!("{:.1}°C", sample.temp_c),
            condition: sample.condition.clone(),
            icon_url: icon_url(&sample.icon_code),
            coordinate,
            advice,
            feels_like: format!("{:.1}°C", sample.feels_like_c),
            humidity: format!("{}%", sample.humidity_pct),
            wind_speed: format!("{:.1} km/h", sample.wind_speed),
            visibility: format!("{} km", sample.visibility_m / 1000),
        }
    }
}

/// Image URL for an OpenWeatherMap icon code
fn icon_url(icon_code: &str) -> String {
    format!("https://openweathermap.org/img/wn/{}@4x.png", icon_code)
}

/// Observable pipeline state. Exactly one variant is active at a time;
/// `Loading` is never terminal.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum WeatherState {
    Loading,
    Success(WeatherSnapshot),
    Error { message: String },
}
