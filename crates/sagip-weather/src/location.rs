//! Position acquisition with graceful fallback.
//!
//! One fallible, cancellable operation over a platform position backend:
//! try a fresh fix first, fall back to the most recent remembered fix, and
//! treat every backend failure like an empty answer. No retries, no
//! backoff; a cycle that cannot produce a fix reports `Unavailable`.

use std::sync::Arc;

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use crate::error::{LocationError, PositionError};
use crate::types::Coordinate;

/// A platform position capability.
///
/// `Ok(None)` means the backend answered but had no usable fix, which the
/// fallback chain treats exactly like an error.
#[async_trait]
pub trait PositionSource: Send + Sync {
    /// Request a fresh position fix.
    async fn current_position(&self) -> Result<Option<Coordinate>, PositionError>;

    /// The most recent fix the backend remembers, if any.
    async fn last_known_position(&self) -> Result<Option<Coordinate>, PositionError>;
}

/// Ordered-fallback acquisition over a [`PositionSource`].
pub struct LocationService {
    source: Arc<dyn PositionSource>,
}

impl LocationService {
    pub fn new(source: Arc<dyn PositionSource>) -> Self {
        Self { source }
    }

    /// Acquire a position: fresh fix first, remembered fix second.
    ///
    /// Cancelling the token aborts in-flight backend work and reports
    /// [`LocationError::Cancelled`]; every other failure collapses into
    /// [`LocationError::Unavailable`] once both strategies are exhausted.
    pub async fn acquire(&self, cancel: &CancellationToken) -> Result<Coordinate, LocationError> {
        tokio::select! {
            biased;
            _ = cancel.cancelled() => Err(LocationError::Cancelled),
            fix = self.acquire_with_fallback() => fix,
        }
    }

    async fn acquire_with_fallback(&self) -> Result<Coordinate, LocationError> {
        match self.source.current_position().await {
            Ok(Some(fix)) => {
                tracing::info!("Got fresh position: {}, {}", fix.latitude, fix.longitude);
                return Ok(fix);
            }
            Ok(None) => tracing::debug!("Fresh position empty, trying last known"),
            Err(e) => tracing::debug!("Fresh position failed ({}), trying last known", e),
        }

        match self.source.last_known_position().await {
            Ok(Some(fix)) => {
                tracing::info!("Using last known position: {}, {}", fix.latitude, fix.longitude);
                Ok(fix)
            }
            Ok(None) => Err(LocationError::Unavailable),
            Err(e) => {
                tracing::debug!("Last known position failed: {}", e);
                Err(LocationError::Unavailable)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Clone, Copy)]
    enum Answer {
        Fix(f64, f64),
        Empty,
        Fail,
        Hang,
    }

    struct StubSource {
        fresh: Answer,
        last: Answer,
        fresh_calls: AtomicUsize,
        last_calls: AtomicUsize,
    }

    impl StubSource {
        fn new(fresh: Answer, last: Answer) -> Self {
            Self {
                fresh,
                last,
                fresh_calls: AtomicUsize::new(0),
                last_calls: AtomicUsize::new(0),
            }
        }

        async fn respond(answer: Answer) -> Result<Option<Coordinate>, PositionError> {
            match answer {
                Answer::Fix(latitude, longitude) => Ok(Some(Coordinate {
                    latitude,
                    longitude,
                })),
                Answer::Empty => Ok(None),
                Answer::Fail => Err(PositionError::new("backend down")),
                Answer::Hang => std::future::pending().await,
            }
        }
    }

    #[async_trait]
    impl PositionSource for StubSource {
        async fn current_position(&self) -> Result<Option<Coordinate>, PositionError> {
            self.fresh_calls.fetch_add(1, Ordering::SeqCst);
            Self::respond(self.fresh).await
        }

        async fn last_known_position(&self) -> Result<Option<Coordinate>, PositionError> {
            self.last_calls.fetch_add(1, Ordering::SeqCst);
            Self::respond(self.last).await
        }
    }

    fn service(fresh: Answer, last: Answer) -> (LocationService, Arc<StubSource>) {
        let source = Arc::new(StubSource::new(fresh, last));
        (LocationService::new(source.clone()), source)
    }

    #[tokio::test]
    async fn fresh_fix_returns_without_touching_last_known() {
        let (service, source) = service(Answer::Fix(14.5995, 120.9842), Answer::Fix(0.0, 0.0));

        let fix = service.acquire(&CancellationToken::new()).await.unwrap();

        assert_eq!(fix.latitude, 14.5995);
        assert_eq!(fix.longitude, 120.9842);
        assert_eq!(source.last_calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn fresh_failure_falls_back_to_last_known() {
        let (service, source) = service(Answer::Fail, Answer::Fix(14.5995, 120.9842));

        let fix = service.acquire(&CancellationToken::new()).await.unwrap();

        assert_eq!(fix.latitude, 14.5995);
        assert_eq!(source.fresh_calls.load(Ordering::SeqCst), 1);
        assert_eq!(source.last_calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn empty_fresh_fix_falls_back_to_last_known() {
        let (service, _) = service(Answer::Empty, Answer::Fix(7.0731, 125.6128));

        let fix = service.acquire(&CancellationToken::new()).await.unwrap();

        assert_eq!(fix.latitude, 7.0731);
    }

    #[tokio::test]
    async fn both_strategies_failing_is_unavailable() {
        let (service, _) = service(Answer::Fail, Answer::Fail);

        let result = service.acquire(&CancellationToken::new()).await;

        assert!(matches!(result, Err(LocationError::Unavailable)));
    }

    #[tokio::test]
    async fn empty_everywhere_is_unavailable() {
        let (service, _) = service(Answer::Empty, Answer::Empty);

        let result = service.acquire(&CancellationToken::new()).await;

        assert!(matches!(result, Err(LocationError::Unavailable)));
    }

    #[tokio::test]
    async fn pre_cancelled_token_never_calls_the_backend() {
        let (service, source) = service(Answer::Fix(1.0, 1.0), Answer::Fix(1.0, 1.0));
        let token = CancellationToken::new();
        token.cancel();

        let result = service.acquire(&token).await;

        assert!(matches!(result, Err(LocationError::Cancelled)));
        assert_eq!(source.fresh_calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn cancel_aborts_an_in_flight_request() {
        let (service, source) = service(Answer::Hang, Answer::Hang);
        let service = Arc::new(service);
        let token = CancellationToken::new();

        let task = {
            let service = service.clone();
            let token = token.clone();
            tokio::spawn(async move { service.acquire(&token).await })
        };

        tokio::task::yield_now().await;
        token.cancel();

        let result = task.await.unwrap();
        assert!(matches!(result, Err(LocationError::Cancelled)));
        assert_eq!(source.fresh_calls.load(Ordering::SeqCst), 1);
    }
}
