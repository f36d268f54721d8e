//! Subsonic REST transport
//!
//! Issues authenticated GET requests to `<base>/rest/<endpoint>` and turns
//! the `subsonic-response` envelope into typed results.
//!
//! Classification of a reply, in order:
//! 1. non-2xx status: [`TransportError::Http`]
//! 2. body is not JSON: [`TransportError::Decode`]
//! 3. no `subsonic-response` object: [`TransportError::Protocol`]
//! 4. `status: ok`: the envelope
//! 5. error code 70 ("data not found"): no result, logged at debug
//! 6. any other error code: [`TransportError::Remote`]
//!
//! Each call is a single attempt. Nothing here retries.

use bridge_traits::http::{HttpClient, HttpMethod, HttpRequest};
use core_runtime::config::SubsonicConfig;
use core_runtime::logging::redact_query;
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, instrument};

use crate::auth::Credential;
use crate::error::{TransportError, TransportResult};
use crate::types::{
    Envelope, RemoteAlbum, RemoteAlbumDetail, RemoteSong, ScanStatus, SearchResult3, ENVELOPE_KEY,
};

/// Error code for "the requested data was not found"
pub const ERROR_DATA_NOT_FOUND: i64 = 70;

/// Maximum results requested per `search3` call
pub const SEARCH_RESULT_LIMIT: u32 = 20;

/// Subsonic API client
///
/// Cheap to clone; clones share the underlying HTTP client.
#[derive(Clone)]
pub struct SubsonicClient {
    http_client: Arc<dyn HttpClient>,
    base_url: String,
    timeout: Duration,
}

impl SubsonicClient {
    /// Create a client for the server described by `config`
    pub fn new(http_client: Arc<dyn HttpClient>, config: &SubsonicConfig) -> Self {
        Self::with_base_url(http_client, config.base_url(), config.timeout())
    }

    /// Create a client for an explicit base URL (without `/rest`)
    pub fn with_base_url(
        http_client: Arc<dyn HttpClient>,
        base_url: impl Into<String>,
        timeout: Duration,
    ) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        Self {
            http_client,
            base_url,
            timeout,
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn endpoint_url(&self, endpoint: &str) -> String {
        format!("{}/rest/{}", self.base_url, endpoint)
    }

    /// Call an endpoint with the credential plus endpoint-specific parameters
    ///
    /// Returns `Ok(None)` when the server answers with error code 70.
    #[instrument(skip_all, fields(endpoint = %endpoint))]
    pub async fn call(
        &self,
        endpoint: &str,
        credential: &Credential,
        params: &[(&str, String)],
    ) -> TransportResult<Option<Envelope>> {
        let extra = params.iter().map(|(key, value)| (*key, value.as_str()));
        let request = HttpRequest::new(HttpMethod::Get, self.endpoint_url(endpoint))
            .header("Accept", "application/json")
            .query_pairs(credential.params())
            .query_pairs(extra.clone())
            .timeout(self.timeout);

        debug!(
            url = %self.endpoint_url(endpoint),
            params = %redact_query(credential.params().chain(extra)),
            "Calling Subsonic API"
        );

        let response = self.http_client.execute(request).await?;

        if !response.is_success() {
            return Err(TransportError::Http {
                status: response.status,
            });
        }

        let body: Value = serde_json::from_slice(&response.body)
            .map_err(|e| TransportError::Decode(format!("Response is not JSON: {}", e)))?;

        let object = match body {
            Value::Object(mut root) => match root.remove(ENVELOPE_KEY) {
                Some(Value::Object(object)) => object,
                _ => {
                    return Err(TransportError::Protocol(format!(
                        "Response has no '{}' object",
                        ENVELOPE_KEY
                    )))
                }
            },
            _ => {
                return Err(TransportError::Protocol(
                    "Response is not a JSON object".to_string(),
                ))
            }
        };

        let envelope = Envelope::from_object(object)?;
        if envelope.is_ok() {
            return Ok(Some(envelope));
        }

        match envelope.error() {
            Some(error) if error.code == ERROR_DATA_NOT_FOUND => {
                debug!(message = %error.message, "No result");
                Ok(None)
            }
            Some(error) => Err(TransportError::Remote {
                code: error.code,
                message: error.message,
            }),
            None => Err(TransportError::Protocol(format!(
                "Envelope status '{}' without error object",
                envelope.status
            ))),
        }
    }

    async fn search(
        &self,
        credential: &Credential,
        query: &str,
        song_count: u32,
        album_count: u32,
    ) -> TransportResult<SearchResult3> {
        let params = [
            ("query", query.to_string()),
            ("songCount", song_count.to_string()),
            ("albumCount", album_count.to_string()),
            ("artistCount", "0".to_string()),
        ];

        match self.call("search3", credential, &params).await? {
            Some(envelope) => Ok(envelope
                .payload::<SearchResult3>("searchResult3")?
                .unwrap_or_default()),
            None => Ok(SearchResult3::default()),
        }
    }

    /// `search3` for songs, up to [`SEARCH_RESULT_LIMIT`] results
    pub async fn search_songs(
        &self,
        credential: &Credential,
        query: &str,
    ) -> TransportResult<Vec<RemoteSong>> {
        Ok(self
            .search(credential, query, SEARCH_RESULT_LIMIT, 0)
            .await?
            .song)
    }

    /// `search3` for albums, up to [`SEARCH_RESULT_LIMIT`] results
    pub async fn search_albums(
        &self,
        credential: &Credential,
        query: &str,
    ) -> TransportResult<Vec<RemoteAlbum>> {
        Ok(self
            .search(credential, query, 0, SEARCH_RESULT_LIMIT)
            .await?
            .album)
    }

    /// `getAlbum`: the album and its track listing
    pub async fn get_album(
        &self,
        credential: &Credential,
        album_id: &str,
    ) -> TransportResult<Option<RemoteAlbumDetail>> {
        match self
            .call("getAlbum", credential, &[("id", album_id.to_string())])
            .await?
        {
            Some(envelope) => envelope.payload("album"),
            None => Ok(None),
        }
    }

    pub async fn get_scan_status(
        &self,
        credential: &Credential,
    ) -> TransportResult<Option<ScanStatus>> {
        match self.call("getScanStatus", credential, &[]).await? {
            Some(envelope) => envelope.payload("scanStatus"),
            None => Ok(None),
        }
    }

    pub async fn start_scan(&self, credential: &Credential) -> TransportResult<Option<ScanStatus>> {
        match self.call("startScan", credential, &[]).await? {
            Some(envelope) => envelope.payload("scanStatus"),
            None => Ok(None),
        }
    }

    /// `setRating` with a 0-5 rating (0 clears it)
    ///
    /// Returns `false` when the server does not know the song.
    pub async fn set_rating(
        &self,
        credential: &Credential,
        song_id: &str,
        rating: u8,
    ) -> TransportResult<bool> {
        let params = [("id", song_id.to_string()), ("rating", rating.to_string())];
        Ok(self.call("setRating", credential, &params).await?.is_some())
    }

    /// `scrobble` a completed play at `time_ms` (epoch milliseconds)
    ///
    /// Returns `false` when the server does not know the song.
    pub async fn scrobble(
        &self,
        credential: &Credential,
        song_id: &str,
        time_ms: i64,
    ) -> TransportResult<bool> {
        let params = [
            ("id", song_id.to_string()),
            ("time", time_ms.to_string()),
            ("submission", "true".to_string()),
        ];
        Ok(self.call("scrobble", credential, &params).await?.is_some())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::build_credential;
    use async_trait::async_trait;
    use bridge_traits::error::{BridgeError, Result};
    use bridge_traits::http::HttpResponse;
    use bytes::Bytes;
    use mockall::mock;
    use std::collections::HashMap;

    mock! {
        HttpClient {}

        #[async_trait]
        impl HttpClient for HttpClient {
            async fn execute(&self, request: HttpRequest) -> Result<HttpResponse>;
            async fn is_connected(&self) -> bool;
        }
    }

    fn response(status: u16, body: &str) -> HttpResponse {
        HttpResponse {
            status,
            headers: HashMap::new(),
            body: Bytes::from(body.to_string()),
        }
    }

    fn credential() -> Credential {
        build_credential("token", "admin", "sesame", "test").unwrap()
    }

    fn client(mock_http: MockHttpClient) -> SubsonicClient {
        SubsonicClient::with_base_url(
            Arc::new(mock_http),
            "http://music.local:4533/",
            Duration::from_secs(5),
        )
    }

    #[tokio::test]
    async fn test_request_shape() {
        let mut mock_http = MockHttpClient::new();
        mock_http
            .expect_execute()
            .times(1)
            .withf(|request| {
                request.method == HttpMethod::Get
                    && request.url.starts_with("http://music.local:4533/rest/search3?u=admin&t=")
                    && request.query_value("query").as_deref() == Some("Yesterday")
                    && request.query_value("songCount").as_deref() == Some("20")
                    && request.query_value("albumCount").as_deref() == Some("0")
                    && request.query_value("f").as_deref() == Some("json")
                    && request.timeout == Some(Duration::from_secs(5))
            })
            .returning(|_| {
                Ok(response(
                    200,
                    r#"{"subsonic-response":{"status":"ok","searchResult3":{"song":[{"id":"so-1","title":"Yesterday"}]}}}"#,
                ))
            });

        let songs = client(mock_http)
            .search_songs(&credential(), "Yesterday")
            .await
            .unwrap();
        assert_eq!(songs.len(), 1);
        assert_eq!(songs[0].id, "so-1");
    }

    #[tokio::test]
    async fn test_http_error() {
        let mut mock_http = MockHttpClient::new();
        mock_http
            .expect_execute()
            .returning(|_| Ok(response(503, "Service Unavailable")));

        let result = client(mock_http).get_scan_status(&credential()).await;
        assert_eq!(result, Err(TransportError::Http { status: 503 }));
    }

    #[tokio::test]
    async fn test_malformed_json_is_decode_error() {
        let mut mock_http = MockHttpClient::new();
        mock_http
            .expect_execute()
            .returning(|_| Ok(response(200, "<html>proxy login</html>")));

        let result = client(mock_http).search_songs(&credential(), "x").await;
        assert!(matches!(result, Err(TransportError::Decode(_))));
    }

    #[tokio::test]
    async fn test_missing_envelope_is_protocol_error() {
        let mut mock_http = MockHttpClient::new();
        mock_http
            .expect_execute()
            .returning(|_| Ok(response(200, r#"{"status":"ok"}"#)));

        let result = client(mock_http).start_scan(&credential()).await;
        assert!(matches!(result, Err(TransportError::Protocol(_))));
    }

    #[tokio::test]
    async fn test_code_70_is_no_result() {
        let mut mock_http = MockHttpClient::new();
        mock_http.expect_execute().times(2).returning(|_| {
            Ok(response(
                200,
                r#"{"subsonic-response":{"status":"failed","error":{"code":70,"message":"Song not found"}}}"#,
            ))
        });

        let client = client(mock_http);
        let songs = client.search_songs(&credential(), "nothing").await.unwrap();
        assert!(songs.is_empty());

        let acknowledged = client.set_rating(&credential(), "so-404", 3).await.unwrap();
        assert!(!acknowledged);
    }

    #[tokio::test]
    async fn test_remote_error() {
        let mut mock_http = MockHttpClient::new();
        mock_http.expect_execute().returning(|_| {
            Ok(response(
                200,
                r#"{"subsonic-response":{"status":"failed","error":{"code":40,"message":"Wrong username or password"}}}"#,
            ))
        });

        let result = client(mock_http).start_scan(&credential()).await;
        assert_eq!(
            result,
            Err(TransportError::Remote {
                code: 40,
                message: "Wrong username or password".to_string()
            })
        );
    }

    #[tokio::test]
    async fn test_network_error() {
        let mut mock_http = MockHttpClient::new();
        mock_http
            .expect_execute()
            .returning(|_| Err(BridgeError::Timeout("deadline elapsed".to_string())));

        let result = client(mock_http).get_scan_status(&credential()).await;
        assert!(matches!(result, Err(TransportError::Network(_))));
    }

    #[tokio::test]
    async fn test_scrobble_params() {
        let mut mock_http = MockHttpClient::new();
        mock_http
            .expect_execute()
            .times(1)
            .withf(|request| {
                request.url.contains("/rest/scrobble?")
                    && request.query_value("id").as_deref() == Some("so-7")
                    && request.query_value("time").as_deref() == Some("1709294400000")
                    && request.query_value("submission").as_deref() == Some("true")
            })
            .returning(|_| Ok(response(200, r#"{"subsonic-response":{"status":"ok"}}"#)));

        let acknowledged = client(mock_http)
            .scrobble(&credential(), "so-7", 1_709_294_400_000)
            .await
            .unwrap();
        assert!(acknowledged);
    }

    #[tokio::test]
    async fn test_get_album() {
        let mut mock_http = MockHttpClient::new();
        mock_http
            .expect_execute()
            .withf(|request| request.query_value("id").as_deref() == Some("al-3"))
            .returning(|_| {
                Ok(response(
                    200,
                    r#"{"subsonic-response":{"status":"ok","album":{"id":"al-3","name":"Help!","song":[{"id":"so-9","title":"Yesterday"}]}}}"#,
                ))
            });

        let album = client(mock_http)
            .get_album(&credential(), "al-3")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(album.name, "Help!");
        assert_eq!(album.song[0].id, "so-9");
    }
}
