//! Fleet tracking HTTP API client
//!
//! Endpoints:
//! - `POST /api/session` - form login, session token returned as a cookie
//! - `GET /api/devices` - device list
//! - `GET /api/reports/events` - geofence events for a time window

use crate::domain::types::{Device, EventRecord};
use crate::infra::config::Config;
use crate::infra::error::{ApiError, AuthenticationError};
use crate::services::time_window::TimeWindow;
use async_trait::async_trait;
use reqwest::header::{ACCEPT, COOKIE, SET_COOKIE};
use reqwest::{RequestBuilder, Response};
use serde::de::DeserializeOwned;
use std::time::Duration;
use tracing::{debug, info};

/// Event report types requested from the server
pub const GEOFENCE_EVENT_TYPES: [&str; 2] = ["geofenceEnter", "geofenceExit"];

/// Login credentials for the session endpoint
#[derive(Clone)]
pub struct Credentials {
    pub email: String,
    pub password: String,
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials").field("email", &self.email).finish_non_exhaustive()
    }
}

/// Opaque session token, sent back as a cookie on every call
#[derive(Clone, PartialEq, Eq)]
pub struct SessionToken {
    cookie_name: String,
    value: String,
}

impl SessionToken {
    pub fn new(cookie_name: &str, value: &str) -> Self {
        Self { cookie_name: cookie_name.to_string(), value: value.to_string() }
    }

    /// `name=value`, the `Cookie` header value
    pub fn cookie_header(&self) -> String {
        format!("{}={}", self.cookie_name, self.value)
    }
}

impl std::fmt::Debug for SessionToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "SessionToken({}=<redacted>)", self.cookie_name)
    }
}

/// Upstream fleet API as seen by the fetch coordinator
#[async_trait]
pub trait FleetApi: Send + Sync {
    async fn authenticate(&self, credentials: &Credentials)
        -> Result<SessionToken, AuthenticationError>;

    async fn fetch_devices(&self, session: &SessionToken) -> Result<Vec<Device>, ApiError>;

    async fn fetch_events(
        &self,
        session: &SessionToken,
        window: &TimeWindow,
    ) -> Result<Vec<EventRecord>, ApiError>;
}

/// reqwest-backed implementation
pub struct FleetClient {
    http: reqwest::Client,
    base_url: String,
    session_cookie: String,
    group_ids: Vec<i64>,
}

impl FleetClient {
    /// Every request is bounded by `api.timeout_ms`
    pub fn new(config: &Config) -> Result<Self, reqwest::Error> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_millis(config.api_timeout_ms()))
            .build()?;

        Ok(Self {
            http,
            base_url: config.api_base_url().to_string(),
            session_cookie: config.api_session_cookie().to_string(),
            group_ids: config.api_group_ids().to_vec(),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// Query pairs for the event report; `type` and `groupId` repeat
    fn event_query(&self, window: &TimeWindow) -> Vec<(&'static str, String)> {
        let mut query = vec![("from", window.from_param()), ("to", window.to_param())];
        for kind in GEOFENCE_EVENT_TYPES {
            query.push(("type", kind.to_string()));
        }
        for group_id in &self.group_ids {
            query.push(("groupId", group_id.to_string()));
        }
        query
    }

    async fn get_json<T: DeserializeOwned>(&self, request: RequestBuilder) -> Result<T, ApiError> {
        let response = request.send().await.map_err(ApiError::Transport)?;
        let status = response.status();
        let body = response.bytes().await.map_err(ApiError::Transport)?;

        if !status.is_success() {
            return Err(ApiError::Status {
                status: status.as_u16(),
                body: String::from_utf8_lossy(&body).into_owned(),
            });
        }

        serde_json::from_slice(&body).map_err(ApiError::Decode)
    }
}

/// Find the named cookie among the response's `Set-Cookie` headers
pub fn find_session_cookie(response: &Response, cookie_name: &str) -> Option<SessionToken> {
    response
        .headers()
        .get_all(SET_COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .find_map(|header| parse_set_cookie(header, cookie_name))
}

/// Extract `name=value` from a single `Set-Cookie` header if the name matches
pub fn parse_set_cookie(header: &str, cookie_name: &str) -> Option<SessionToken> {
    let pair = header.split(';').next()?;
    let (name, value) = pair.split_once('=')?;
    let value = value.trim();
    if name.trim() == cookie_name && !value.is_empty() {
        Some(SessionToken::new(cookie_name, value))
    } else {
        None
    }
}

#[async_trait]
impl FleetApi for FleetClient {
    async fn authenticate(
        &self,
        credentials: &Credentials,
    ) -> Result<SessionToken, AuthenticationError> {
        let form = [("email", credentials.email.as_str()), ("password", credentials.password.as_str())];

        let response = self
            .http
            .post(self.url("/api/session"))
            .header(ACCEPT, "application/json")
            .form(&form)
            .send()
            .await
            .map_err(AuthenticationError::Transport)?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(AuthenticationError::Status { status: status.as_u16(), body });
        }

        let token = find_session_cookie(&response, &self.session_cookie).ok_or_else(|| {
            AuthenticationError::MissingToken { cookie: self.session_cookie.clone() }
        })?;

        info!(email = %credentials.email, "fleet_api_authenticated");
        Ok(token)
    }

    async fn fetch_devices(&self, session: &SessionToken) -> Result<Vec<Device>, ApiError> {
        let request = self
            .http
            .get(self.url("/api/devices"))
            .header(ACCEPT, "application/json")
            .header(COOKIE, session.cookie_header());

        let devices: Vec<Device> = self.get_json(request).await?;
        debug!(count = %devices.len(), "fleet_api_devices_fetched");
        Ok(devices)
    }

    async fn fetch_events(
        &self,
        session: &SessionToken,
        window: &TimeWindow,
    ) -> Result<Vec<EventRecord>, ApiError> {
        let request = self
            .http
            .get(self.url("/api/reports/events"))
            .query(&self.event_query(window))
            .header(ACCEPT, "application/json")
            .header(COOKIE, session.cookie_header());

        let events: Vec<EventRecord> = self.get_json(request).await?;
        debug!(
            count = %events.len(),
            from = %window.from_param(),
            to = %window.to_param(),
            "fleet_api_events_fetched"
        );
        Ok(events)
    }
}
