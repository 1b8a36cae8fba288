//! Mock fleet tracking API
//!
//! Serves the three endpoints the report job uses, for local dry runs:
//! - `POST /api/session` - any email/password, returns a session cookie
//! - `GET /api/devices` - devices from the fixture
//! - `GET /api/reports/events` - events from the fixture (query is logged, not applied)
//!
//! Usage:
//!   cargo run --bin mock-fleet-api -- --port 8082 --fixture fixtures/day.json
//!   cargo run --bin geofence-report -- --config config/report.toml --dry-run

use bytes::Bytes;
use clap::Parser;
use geofence_report::domain::{Device, DeviceId, EventKind, EventRecord};
use http_body_util::{BodyExt, Full};
use hyper::header::{CONTENT_TYPE, COOKIE, SET_COOKIE};
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper::{Method, Request, Response, StatusCode};
use hyper_util::rt::TokioIo;
use serde::{Deserialize, Serialize};
use std::convert::Infallible;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::{error, info, warn};

#[derive(Parser, Debug)]
#[command(name = "mock-fleet-api")]
#[command(about = "Mock fleet tracking API for local report runs")]
struct Args {
    /// TCP port to listen on
    #[arg(short, long, default_value = "8082")]
    port: u16,

    /// JSON file with `devices` and `events` arrays (built-in sample if omitted)
    #[arg(short, long)]
    fixture: Option<String>,

    /// Session cookie name
    #[arg(long, default_value = "JSESSIONID")]
    cookie: String,
}

#[derive(Debug, Serialize, Deserialize)]
struct Fixture {
    devices: Vec<Device>,
    events: Vec<EventRecord>,
}

impl Fixture {
    fn sample() -> Self {
        let device = |id: i64, unique_id: &str, name: &str| Device {
            id: DeviceId(id),
            unique_id: unique_id.to_string(),
            name: name.to_string(),
        };
        let today = chrono::Utc::now().format("%Y-%m-%d").to_string();
        let at = |hms: &str| format!("{today}T{hms}Z");

        Self {
            devices: vec![
                device(1, "860000000000001", "Truck A"),
                device(2, "860000000000002", "Truck B"),
                device(3, "860000000000003", "Van C"),
            ],
            events: vec![
                EventRecord::new(EventKind::Enter, at("00:10:00"), 1),
                EventRecord::new(EventKind::Enter, at("01:00:00"), 2),
                EventRecord::new(EventKind::Exit, at("05:00:00"), 1),
                EventRecord::new(EventKind::Exit, at("06:30:00"), 3),
                // Device 4 is not in the device list
                EventRecord::new(EventKind::Enter, at("07:45:00"), 4),
            ],
        }
    }
}

struct MockState {
    fixture: Fixture,
    cookie: String,
    session: String,
}

impl MockState {
    fn is_authenticated<B>(&self, req: &Request<B>) -> bool {
        let expected = format!("{}={}", self.cookie, self.session);
        req.headers()
            .get_all(COOKIE)
            .iter()
            .filter_map(|v| v.to_str().ok())
            .any(|v| v.split(';').any(|pair| pair.trim() == expected))
    }
}

fn json_response<T: Serialize>(value: &T) -> Response<Full<Bytes>> {
    match serde_json::to_vec(value) {
        Ok(body) => Response::builder()
            .status(StatusCode::OK)
            .header(CONTENT_TYPE, "application/json")
            .body(Full::new(Bytes::from(body)))
            .expect("static response should not fail"),
        Err(e) => text_response(StatusCode::INTERNAL_SERVER_ERROR, &e.to_string()),
    }
}

fn text_response(status: StatusCode, body: &str) -> Response<Full<Bytes>> {
    Response::builder()
        .status(status)
        .body(Full::new(Bytes::from(body.to_string())))
        .expect("static response should not fail")
}

async fn handle_request(
    req: Request<hyper::body::Incoming>,
    state: Arc<MockState>,
) -> Result<Response<Full<Bytes>>, Infallible> {
    let method = req.method().clone();
    let path = req.uri().path().to_string();
    let query = req.uri().query().unwrap_or("").to_string();

    let response = match (&method, path.as_str()) {
        (&Method::POST, "/api/session") => {
            let body = match req.into_body().collect().await {
                Ok(collected) => collected.to_bytes(),
                Err(e) => {
                    warn!(error = %e, "mock_session_body_error");
                    Bytes::new()
                }
            };
            let form = String::from_utf8_lossy(&body);
            let has_field = |name: &str| {
                form.split('&').any(|pair| {
                    pair.split_once('=').is_some_and(|(k, v)| k == name && !v.is_empty())
                })
            };

            if has_field("email") && has_field("password") {
                Response::builder()
                    .status(StatusCode::OK)
                    .header(CONTENT_TYPE, "application/json")
                    .header(SET_COOKIE, format!("{}={}; Path=/; HttpOnly", state.cookie, state.session))
                    .body(Full::new(Bytes::from(r#"{"id":1,"name":"mock"}"#)))
                    .expect("static response should not fail")
            } else {
                text_response(StatusCode::UNAUTHORIZED, "email and password required")
            }
        }
        (&Method::GET, "/api/devices") if state.is_authenticated(&req) => {
            json_response(&state.fixture.devices)
        }
        (&Method::GET, "/api/reports/events") if state.is_authenticated(&req) => {
            info!(query = %query, "mock_events_query");
            json_response(&state.fixture.events)
        }
        (&Method::GET, "/api/devices") | (&Method::GET, "/api/reports/events") => {
            text_response(StatusCode::UNAUTHORIZED, "session required")
        }
        _ => text_response(StatusCode::NOT_FOUND, "Not Found"),
    };

    info!(method = %method, path = %path, status = %response.status().as_u16(), "mock_request");
    Ok(response)
}

fn load_fixture(path: Option<&str>) -> Result<Fixture, Box<dyn std::error::Error>> {
    match path {
        Some(path) => {
            let content = std::fs::read_to_string(path)?;
            Ok(serde_json::from_str(&content)?)
        }
        None => Ok(Fixture::sample()),
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt().with_target(false).init();

    let args = Args::parse();
    let fixture = load_fixture(args.fixture.as_deref())?;
    info!(
        port = %args.port,
        devices = %fixture.devices.len(),
        events = %fixture.events.len(),
        "mock_fleet_api_started"
    );

    let state = Arc::new(MockState {
        fixture,
        cookie: args.cookie,
        session: format!("mock-{}", uuid::Uuid::now_v7()),
    });

    let addr = SocketAddr::from(([127, 0, 0, 1], args.port));
    let listener = TcpListener::bind(addr).await?;

    loop {
        let (stream, _peer) = listener.accept().await?;
        let io = TokioIo::new(stream);
        let state = state.clone();

        tokio::spawn(async move {
            let service = service_fn(move |req| handle_request(req, state.clone()));
            if let Err(e) = http1::Builder::new().serve_connection(io, service).await {
                error!(error = %e, "mock_http_error");
            }
        });
    }
}
