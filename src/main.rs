use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use tokio_util::sync::CancellationToken;

use sagip_core::Config;
use sagip_weather::{
    Advisor, GeoIpSource, LocationService, ProviderConfig, WeatherProvider, WeatherState,
    WeatherSync,
};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize core
    sagip_core::init()?;

    let (config, _) = Config::load_validated().context("Failed to load configuration")?;

    let provider_config = ProviderConfig {
        api_key: config.weather.api_key.clone(),
        weather_url: config.weather.api_url.clone(),
        geocode_url: config.weather.geocode_url.clone(),
        timeout: Duration::from_secs(config.weather.request_timeout_secs),
    };
    let provider =
        WeatherProvider::new(provider_config).context("Failed to build weather provider")?;
    let source = GeoIpSource::new(&config.config_dir, &config.location.lookup_url)
        .context("Failed to build position backend")?;

    let sync = WeatherSync::new(
        LocationService::new(Arc::new(source)),
        provider,
        Advisor::new(),
        config.weather.country_tag.clone(),
    );

    tracing::info!("Sagip weather pipeline started");

    let cancel = CancellationToken::new();
    if !sync.has_synced() {
        sync.sync(&cancel).await;
    }

    println!("Sagip - Emergency Information Client");
    match sync.current() {
        WeatherState::Success(card) => {
            println!("\n{}", card.location);
            println!("  {} ({})", card.temperature, card.condition);
            println!("  Feels like {}", card.feels_like);
            println!("  Humidity {}", card.humidity);
            println!("  Wind {}", card.wind_speed);
            println!("  Visibility {}", card.visibility);
            println!("\n{}", card.advice);
        }
        WeatherState::Error { message } => println!("\n{}", message),
        WeatherState::Loading => println!("\nStill loading..."),
    }

    Ok(())
}
