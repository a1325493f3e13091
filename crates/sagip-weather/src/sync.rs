//! Weather synchronization state machine.
//!
//! Drives one pipeline cycle per trigger: publish `Loading`, acquire a
//! position, fetch an observation, compose the card, publish exactly one
//! terminal state. A cancelled cycle completes whatever stage is in
//! flight and discards the result without publishing, so the newest
//! finished cycle always owns the published value.

use std::sync::atomic::{AtomicBool, Ordering};

use tokio::sync::watch;
use tokio_util::sync::CancellationToken;
use tracing::instrument;

use crate::advice::Advisor;
use crate::error::LocationError;
use crate::location::LocationService;
use crate::provider::WeatherProvider;
use crate::types::{WeatherSnapshot, WeatherState};

const PERMISSION_DENIED_MESSAGE: &str = "Permission denied. Enable location in settings.";

/// Owner of the published [`WeatherState`].
///
/// Constructed once per process and shared by reference; all consumers
/// observe the same watch channel.
pub struct WeatherSync {
    state: watch::Sender<WeatherState>,
    location: LocationService,
    provider: WeatherProvider,
    advisor: Advisor,
    country_tag: String,
    synced_once: AtomicBool,
    in_flight: tokio::sync::Mutex<()>,
}

impl WeatherSync {
    pub fn new(
        location: LocationService,
        provider: WeatherProvider,
        advisor: Advisor,
        country_tag: impl Into<String>,
    ) -> Self {
        let (state, _) = watch::channel(WeatherState::Loading);
        Self {
            state,
            location,
            provider,
            advisor,
            country_tag: country_tag.into(),
            synced_once: AtomicBool::new(false),
            in_flight: tokio::sync::Mutex::new(()),
        }
    }

    /// Watch the published state. Late subscribers see the latest value.
    pub fn subscribe(&self) -> watch::Receiver<WeatherState> {
        self.state.subscribe()
    }

    /// Snapshot of the currently published state.
    pub fn current(&self) -> WeatherState {
        self.state.borrow().clone()
    }

    /// Whether any cycle has ever reached a terminal state.
    ///
    /// Gates the automatic first-display sync; never resets to false.
    pub fn has_synced(&self) -> bool {
        self.synced_once.load(Ordering::SeqCst)
    }

    /// Run one sync cycle, publishing progress on the state channel.
    ///
    /// Overlapping triggers are ignored while a cycle is in flight.
    /// Cancelling the token stops the cycle without a terminal publish;
    /// the state is left as the cycle's own `Loading` until another
    /// trigger finishes.
    #[instrument(skip(self, cancel), level = "info")]
    pub async fn sync(&self, cancel: &CancellationToken) {
        let _guard = match self.in_flight.try_lock() {
            Ok(guard) => guard,
            Err(_) => {
                tracing::debug!("Sync already in flight, ignoring trigger");
                return;
            }
        };

        self.state.send_replace(WeatherState::Loading);

        let coordinate = match self.location.acquire(cancel).await {
            Ok(coordinate) => coordinate,
            Err(LocationError::Cancelled) => {
                tracing::debug!("Sync cancelled while acquiring position");
                return;
            }
            Err(err) => {
                tracing::warn!("Position acquisition failed: {}", err);
                self.publish_terminal(WeatherState::Error {
                    message: err.user_message().to_string(),
                });
                return;
            }
        };

        if cancel.is_cancelled() {
            tracing::debug!("Sync cancelled before weather fetch");
            return;
        }

        let observation = match self.provider.observe(coordinate).await {
            Ok(observation) => observation,
            Err(err) => {
                tracing::warn!("Weather fetch failed: {}", err);
                if cancel.is_cancelled() {
                    return;
                }
                self.publish_terminal(WeatherState::Error {
                    message: err.user_message().to_string(),
                });
                return;
            }
        };

        if cancel.is_cancelled() {
            tracing::debug!("Sync cancelled, discarding fetched observation");
            return;
        }

        let advice = self.advisor.advise(&observation.conditions);
        let snapshot =
            WeatherSnapshot::compose(coordinate, &observation, advice, &self.country_tag);
        self.publish_terminal(WeatherState::Success(snapshot));
    }

    /// Entry point for the permission-request flow: the caller already
    /// knows location is refused, so no stage runs at all.
    pub fn report_permission_denied(&self) {
        tracing::warn!("Location permission denied");
        self.publish_terminal(WeatherState::Error {
            message: PERMISSION_DENIED_MESSAGE.to_string(),
        });
    }

    fn publish_terminal(&self, state: WeatherState) {
        self.synced_once.store(true, Ordering::SeqCst);
        self.state.send_replace(state);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use async_trait::async_trait;

    use crate::error::PositionError;
    use crate::location::PositionSource;
    use crate::provider::ProviderConfig;
    use crate::types::Coordinate;

    struct NoFix;

    #[async_trait]
    impl PositionSource for NoFix {
        async fn current_position(&self) -> Result<Option<Coordinate>, PositionError> {
            Ok(None)
        }

        async fn last_known_position(&self) -> Result<Option<Coordinate>, PositionError> {
            Ok(None)
        }
    }

    fn machine() -> WeatherSync {
        let provider = WeatherProvider::new(ProviderConfig::new("test-key")).unwrap();
        WeatherSync::new(
            LocationService::new(Arc::new(NoFix)),
            provider,
            Advisor::new(),
            "PH",
        )
    }

    #[tokio::test]
    async fn starts_loading_with_no_sync_recorded() {
        let sync = machine();

        assert_eq!(sync.current(), WeatherState::Loading);
        assert!(!sync.has_synced());
    }

    #[tokio::test]
    async fn permission_denied_publishes_the_fixed_message() {
        let sync = machine();

        sync.report_permission_denied();

        assert_eq!(
            sync.current(),
            WeatherState::Error {
                message: "Permission denied. Enable location in settings.".to_string()
            }
        );
        assert!(sync.has_synced());
    }

    #[tokio::test]
    async fn no_fix_anywhere_publishes_gps_lost() {
        let sync = machine();

        sync.sync(&CancellationToken::new()).await;

        assert_eq!(
            sync.current(),
            WeatherState::Error {
                message: "GPS signal lost. Ensure location is on.".to_string()
            }
        );
        assert!(sync.has_synced());
    }

    #[tokio::test]
    async fn cancelled_cycle_publishes_no_terminal_state() {
        let sync = machine();
        let token = CancellationToken::new();
        token.cancel();

        sync.sync(&token).await;

        assert_eq!(sync.current(), WeatherState::Loading);
        assert!(!sync.has_synced());
    }
}
