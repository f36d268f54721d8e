//! Stub Subsonic server shared by the integration tests

#![allow(dead_code)]

use async_trait::async_trait;
use bridge_traits::error::{BridgeError, Result as BridgeResult};
use bridge_traits::http::{HttpClient, HttpRequest, HttpResponse};
use bytes::Bytes;
use core_library::{InMemoryTrackRepository, Track, TrackRepository};
use core_runtime::events::EventBus;
use provider_subsonic::{Authenticator, SubsonicClient};
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

pub const OK: &str = r#"{"subsonic-response":{"status":"ok"}}"#;
pub const EMPTY_SEARCH: &str = r#"{"subsonic-response":{"status":"ok","searchResult3":{}}}"#;
pub const NOT_FOUND: &str =
    r#"{"subsonic-response":{"status":"failed","error":{"code":70,"message":"Not found"}}}"#;

pub enum Reply {
    Body(String),
    Status(u16),
    Failure,
}

/// Routes by endpoint and the `query` (or `id`) parameter
#[derive(Default)]
pub struct StubServer {
    routes: Mutex<HashMap<(String, String), Reply>>,
    requests: Mutex<Vec<HttpRequest>>,
    latency: Mutex<Option<Duration>>,
    in_flight: AtomicUsize,
    peak_in_flight: AtomicUsize,
}

impl StubServer {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn route(&self, endpoint: &str, key: &str, reply: Reply) {
        self.routes
            .lock()
            .unwrap()
            .insert((endpoint.to_string(), key.to_string()), reply);
    }

    /// Serve one exactly-titled song for a title search
    pub fn serve_song(&self, title: &str, remote_id: &str) {
        self.route(
            "search3",
            title,
            Reply::Body(format!(
                r#"{{"subsonic-response":{{"status":"ok","searchResult3":{{"song":[{{"id":"{}","title":"{}"}}]}}}}}}"#,
                remote_id, title
            )),
        );
    }

    pub fn set_latency(&self, latency: Duration) {
        *self.latency.lock().unwrap() = Some(latency);
    }

    pub fn request_count(&self) -> usize {
        self.requests.lock().unwrap().len()
    }

    pub fn peak_in_flight(&self) -> usize {
        self.peak_in_flight.load(Ordering::SeqCst)
    }

    /// Requests sent to an endpoint, in arrival order
    pub fn requests_to(&self, endpoint: &str) -> Vec<HttpRequest> {
        self.requests
            .lock()
            .unwrap()
            .iter()
            .filter(|request| endpoint_of(request) == endpoint)
            .cloned()
            .collect()
    }
}

pub fn endpoint_of(request: &HttpRequest) -> String {
    let path = request.url.split('?').next().unwrap_or_default();
    path.rsplit('/').next().unwrap_or_default().to_string()
}

#[async_trait]
impl HttpClient for StubServer {
    async fn execute(&self, request: HttpRequest) -> BridgeResult<HttpResponse> {
        let endpoint = endpoint_of(&request);
        let key = request
            .query_value("query")
            .or_else(|| request.query_value("id"))
            .unwrap_or_default();
        self.requests.lock().unwrap().push(request);

        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak_in_flight.fetch_max(now, Ordering::SeqCst);
        let latency = *self.latency.lock().unwrap();
        if let Some(latency) = latency {
            tokio::time::sleep(latency).await;
        }
        self.in_flight.fetch_sub(1, Ordering::SeqCst);

        let (status, body) = {
            let routes = self.routes.lock().unwrap();
            match routes.get(&(endpoint.clone(), key)) {
                Some(Reply::Body(body)) => (200, body.clone()),
                Some(Reply::Status(status)) => (*status, "error".to_string()),
                Some(Reply::Failure) => {
                    return Err(BridgeError::ConnectionFailed("connection reset".to_string()))
                }
                None if endpoint == "search3" => (200, EMPTY_SEARCH.to_string()),
                None => (200, OK.to_string()),
            }
        };

        Ok(HttpResponse {
            status,
            headers: HashMap::new(),
            body: Bytes::from(body),
        })
    }
}

pub struct Fixture {
    pub server: Arc<StubServer>,
    pub repository: Arc<InMemoryTrackRepository>,
    pub event_bus: Arc<EventBus>,
    pub client: SubsonicClient,
}

impl Fixture {
    pub async fn new(tracks: Vec<Track>) -> Self {
        let server = StubServer::new();
        let repository = Arc::new(InMemoryTrackRepository::new());
        for track in tracks {
            repository.insert(track).await.unwrap();
        }
        let client = SubsonicClient::with_base_url(
            server.clone(),
            "http://stub:4040",
            Duration::from_secs(5),
        );

        Self {
            server,
            repository,
            event_bus: Arc::new(EventBus::new(512)),
            client,
        }
    }

    pub fn authenticator(&self) -> Authenticator {
        Authenticator::new("token", "admin", "admin", "test")
    }

    pub fn repository(&self) -> Arc<dyn TrackRepository> {
        self.repository.clone()
    }

    pub async fn stored(&self, track_id: &str) -> Track {
        self.repository.find_by_id(track_id).await.unwrap().unwrap()
    }
}
