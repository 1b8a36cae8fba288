//! Local HTTP server standing in for the fleet API

#![allow(dead_code)]

use bytes::Bytes;
use geofence_report::infra::Config;
use http_body_util::{BodyExt, Full};
use hyper::header::{COOKIE, SET_COOKIE};
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper::{Request, Response, StatusCode};
use hyper_util::rt::TokioIo;
use std::convert::Infallible;
use std::net::SocketAddr;
use std::sync::{Arc, Mutex};
use tokio::net::TcpListener;

pub const SESSION: &str = "node0test";

pub const DEVICES_JSON: &str = r#"[
    {"id": 1, "uniqueId": "u1", "name": "Truck A"},
    {"id": 2, "uniqueId": "u2", "name": "Truck B"}
]"#;

pub const EVENTS_JSON: &str = r#"[
    {"type": "geofenceEnter", "eventTime": "2024-01-01T00:10:00Z", "deviceId": 1},
    {"type": "geofenceExit", "eventTime": "2024-01-01T05:00:00Z", "deviceId": 1},
    {"type": "geofenceEnter", "eventTime": "2024-01-01T01:00:00Z", "deviceId": 2}
]"#;

/// How the fake server answers each endpoint
#[derive(Clone)]
pub struct Scenario {
    pub login_status: u16,
    pub set_cookie: Option<String>,
    pub devices: (u16, String),
    pub events: (u16, String),
}

impl Default for Scenario {
    fn default() -> Self {
        Self {
            login_status: 200,
            set_cookie: Some(format!("JSESSIONID={SESSION}; Path=/; HttpOnly")),
            devices: (200, DEVICES_JSON.to_string()),
            events: (200, EVENTS_JSON.to_string()),
        }
    }
}

#[derive(Debug, Clone)]
pub struct RecordedRequest {
    pub method: String,
    pub path: String,
    pub query: String,
    pub cookie: Option<String>,
    pub body: String,
}

pub struct TestServer {
    pub addr: SocketAddr,
    pub requests: Arc<Mutex<Vec<RecordedRequest>>>,
}

impl TestServer {
    pub fn base_url(&self) -> String {
        format!("http://{}", self.addr)
    }

    pub fn config(&self) -> Config {
        Config::default()
            .with_api_base_url(&self.base_url())
            .with_credentials("ops@example.com", "s3cret pass")
            .with_group_ids(vec![45])
    }

    pub fn recorded(&self) -> Vec<RecordedRequest> {
        self.requests.lock().unwrap().clone()
    }

    pub fn recorded_path(&self, path: &str) -> Option<RecordedRequest> {
        self.recorded().into_iter().find(|r| r.path == path)
    }
}

fn respond(status: u16, body: &str) -> Response<Full<Bytes>> {
    Response::builder()
        .status(StatusCode::from_u16(status).unwrap())
        .header("Content-Type", "application/json")
        .body(Full::new(Bytes::from(body.to_string())))
        .unwrap()
}

async fn handle(
    req: Request<hyper::body::Incoming>,
    scenario: Arc<Scenario>,
    requests: Arc<Mutex<Vec<RecordedRequest>>>,
) -> Result<Response<Full<Bytes>>, Infallible> {
    let method = req.method().to_string();
    let path = req.uri().path().to_string();
    let query = req.uri().query().unwrap_or("").to_string();
    let cookie = req.headers().get(COOKIE).and_then(|v| v.to_str().ok()).map(str::to_string);
    let body = req.into_body().collect().await.unwrap().to_bytes();

    requests.lock().unwrap().push(RecordedRequest {
        method,
        path: path.clone(),
        query,
        cookie,
        body: String::from_utf8_lossy(&body).into_owned(),
    });

    let response = match path.as_str() {
        "/api/session" => {
            let mut response = respond(scenario.login_status, "{}");
            if let Some(cookie) = &scenario.set_cookie {
                response.headers_mut().insert(SET_COOKIE, cookie.parse().unwrap());
            }
            response
        }
        "/api/devices" => respond(scenario.devices.0, &scenario.devices.1),
        "/api/reports/events" => respond(scenario.events.0, &scenario.events.1),
        _ => respond(404, "not found"),
    };
    Ok(response)
}

/// Start a server on an ephemeral port; it lives until the runtime shuts down
pub async fn start_server(scenario: Scenario) -> TestServer {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let scenario = Arc::new(scenario);
    let requests = Arc::new(Mutex::new(Vec::new()));

    let server_requests = requests.clone();
    tokio::spawn(async move {
        loop {
            let Ok((stream, _)) = listener.accept().await else {
                return;
            };
            let scenario = scenario.clone();
            let requests = server_requests.clone();
            tokio::spawn(async move {
                let service =
                    service_fn(move |req| handle(req, scenario.clone(), requests.clone()));
                let _ = http1::Builder::new().serve_connection(TokioIo::new(stream), service).await;
            });
        }
    });

    TestServer { addr, requests }
}
