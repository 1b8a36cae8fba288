//! Fetch coordination: authenticate once, then fetch devices and events
//! concurrently and join both results.
//!
//! Either both branches succeed or the whole fetch fails. A valid device map
//! with no events (or the reverse) is never handed on, since that would
//! produce a degraded report that still looks successful.

use crate::domain::types::{DeviceMap, EventRecord};
use crate::infra::error::FetchError;
use crate::io::fleet_api::{Credentials, FleetApi};
use crate::services::time_window::TimeWindow;
use std::time::Instant;
use tracing::{debug, info};

/// Joined result of both fetch branches
#[derive(Debug)]
pub struct FetchedData {
    pub devices: DeviceMap,
    pub events: Vec<EventRecord>,
}

pub struct FetchCoordinator<'a, A: FleetApi> {
    api: &'a A,
}

impl<'a, A: FleetApi> FetchCoordinator<'a, A> {
    pub fn new(api: &'a A) -> Self {
        Self { api }
    }

    /// Authenticate, run both fetches concurrently, join.
    pub async fn run(
        &self,
        credentials: &Credentials,
        window: &TimeWindow,
    ) -> Result<FetchedData, FetchError> {
        let start = Instant::now();
        let session = self.api.authenticate(credentials).await.map_err(|e| {
            debug!(error = %e, "authentication_failed");
            FetchError::Authentication(e)
        })?;

        // Two independent reads sharing only the immutable session token
        let (devices, events) =
            tokio::join!(self.api.fetch_devices(&session), self.api.fetch_events(&session, window));

        let (devices, events) = match (devices, events) {
            (Ok(devices), Ok(events)) => (devices, events),
            (devices, events) => {
                let err = FetchError::Branches { devices: devices.err(), events: events.err() };
                debug!(
                    failed = ?err.failed_branches(),
                    error = %err,
                    "fetch_join_failed"
                );
                return Err(err);
            }
        };

        let device_list_len = devices.len();
        let devices = DeviceMap::from_devices(devices);
        info!(
            devices = %devices.len(),
            duplicate_ids = %(device_list_len - devices.len()),
            events = %events.len(),
            elapsed_ms = %start.elapsed().as_millis(),
            "fetch_completed"
        );

        Ok(FetchedData { devices, events })
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::domain::types::{Device, DeviceId, EventKind};
    use crate::infra::error::{ApiError, AuthenticationError};
    use crate::io::fleet_api::SessionToken;
    use async_trait::async_trait;
    use chrono::{DateTime, Utc};
    use chrono_tz::Australia::Melbourne;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    /// Scripted fleet API for coordinator and job tests
    #[derive(Default)]
    pub(crate) struct FakeApi {
        pub reject_login: bool,
        pub fail_devices: bool,
        pub fail_events: bool,
        pub devices: Vec<Device>,
        pub events: Vec<EventRecord>,
        pub branch_delay_ms: u64,
        pub fetch_calls: AtomicUsize,
    }

    impl FakeApi {
        pub(crate) fn trucks() -> Self {
            Self {
                devices: vec![
                    Device { id: DeviceId(1), unique_id: "u1".into(), name: "Truck A".into() },
                    Device { id: DeviceId(2), unique_id: "u2".into(), name: "Truck B".into() },
                ],
                events: vec![
                    EventRecord::new(EventKind::Enter, "2024-01-01T00:10:00Z", 1),
                    EventRecord::new(EventKind::Exit, "2024-01-01T05:00:00Z", 1),
                    EventRecord::new(EventKind::Enter, "2024-01-01T01:00:00Z", 2),
                ],
                ..Default::default()
            }
        }
    }

    fn server_error() -> ApiError {
        ApiError::Status { status: 500, body: "boom".to_string() }
    }

    #[async_trait]
    impl FleetApi for FakeApi {
        async fn authenticate(
            &self,
            _credentials: &Credentials,
        ) -> Result<SessionToken, AuthenticationError> {
            if self.reject_login {
                return Err(AuthenticationError::Status { status: 401, body: "bad login".into() });
            }
            Ok(SessionToken::new("JSESSIONID", "fake"))
        }

        async fn fetch_devices(&self, _session: &SessionToken) -> Result<Vec<Device>, ApiError> {
            self.fetch_calls.fetch_add(1, Ordering::SeqCst);
            tokio::time::sleep(Duration::from_millis(self.branch_delay_ms)).await;
            if self.fail_devices {
                return Err(server_error());
            }
            Ok(self.devices.clone())
        }

        async fn fetch_events(
            &self,
            _session: &SessionToken,
            _window: &TimeWindow,
        ) -> Result<Vec<EventRecord>, ApiError> {
            self.fetch_calls.fetch_add(1, Ordering::SeqCst);
            tokio::time::sleep(Duration::from_millis(self.branch_delay_ms)).await;
            if self.fail_events {
                return Err(server_error());
            }
            Ok(self.events.clone())
        }
    }

    pub(crate) fn credentials() -> Credentials {
        Credentials { email: "ops@example.com".into(), password: "pw".into() }
    }

    pub(crate) fn window() -> TimeWindow {
        let now: DateTime<Utc> = "2024-01-01T03:00:00Z".parse().unwrap();
        TimeWindow::for_day(now, Melbourne).unwrap()
    }

    #[tokio::test]
    async fn test_both_branches_succeed() {
        let api = FakeApi::trucks();
        let data = FetchCoordinator::new(&api).run(&credentials(), &window()).await.unwrap();

        assert_eq!(data.devices.len(), 2);
        assert_eq!(data.devices.name_of(DeviceId(2)), "Truck B");
        assert_eq!(data.events.len(), 3);
    }

    #[tokio::test]
    async fn test_login_failure_skips_fetches() {
        let api = FakeApi { reject_login: true, ..FakeApi::trucks() };
        let err = FetchCoordinator::new(&api).run(&credentials(), &window()).await.unwrap_err();

        assert!(matches!(err, FetchError::Authentication(AuthenticationError::Status { .. })));
        assert_eq!(api.fetch_calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_device_failure_fails_whole_fetch() {
        let api = FakeApi { fail_devices: true, ..FakeApi::trucks() };
        let err = FetchCoordinator::new(&api).run(&credentials(), &window()).await.unwrap_err();

        assert_eq!(err.failed_branches(), vec!["devices"]);
        // The event branch still ran to completion before the join
        assert_eq!(api.fetch_calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_event_failure_fails_whole_fetch() {
        let api = FakeApi { fail_events: true, ..FakeApi::trucks() };
        let err = FetchCoordinator::new(&api).run(&credentials(), &window()).await.unwrap_err();

        assert_eq!(err.failed_branches(), vec!["events"]);
    }

    #[tokio::test]
    async fn test_both_failures_are_reported() {
        let api = FakeApi { fail_devices: true, fail_events: true, ..FakeApi::trucks() };
        let err = FetchCoordinator::new(&api).run(&credentials(), &window()).await.unwrap_err();

        assert_eq!(err.failed_branches(), vec!["devices", "events"]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_branches_run_concurrently() {
        let api = FakeApi { branch_delay_ms: 1_000, ..FakeApi::trucks() };
        let start = tokio::time::Instant::now();

        FetchCoordinator::new(&api).run(&credentials(), &window()).await.unwrap();

        // Sequential execution would take two seconds of virtual time
        assert!(start.elapsed() < Duration::from_millis(1_500));
    }
}
