//! Location-and-weather synchronization pipeline for Sagip
//!
//! Acquires a device position with graceful fallback, fetches current
//! conditions and a reverse-geocoded place name, generates a safety
//! advisory, and publishes everything as one observable weather state.

pub mod advice;
pub mod error;
pub mod geocode;
pub mod geoip;
pub mod location;
pub mod provider;
pub mod sync;
pub mod types;

pub use advice::{Advisor, PhrasePicker, SeededPicker};
pub use error::{FetchError, LocationError, PositionError};
pub use geocode::reverse_geocode;
pub use geoip::GeoIpSource;
pub use location::{LocationService, PositionSource};
pub use provider::{ProviderConfig, WeatherProvider};
pub use sync::WeatherSync;
pub use types::{
    CachedFix, Coordinate, CurrentConditions, Observation, WeatherSnapshot, WeatherState,
};
