//! Subsonic API response types

use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer};
use serde_json::{Map, Value};

use crate::error::{TransportError, TransportResult};

/// Top-level key wrapping every JSON response
pub const ENVELOPE_KEY: &str = "subsonic-response";

/// Decoded `subsonic-response` object
#[derive(Debug, Clone, PartialEq)]
pub struct Envelope {
    /// `ok` or `failed`
    pub status: String,
    /// Server protocol version, if reported
    pub version: Option<String>,
    body: Map<String, Value>,
}

impl Envelope {
    /// Wrap the contents of a `subsonic-response` object
    pub fn from_object(body: Map<String, Value>) -> TransportResult<Self> {
        let status = body
            .get("status")
            .and_then(Value::as_str)
            .ok_or_else(|| TransportError::Protocol("Envelope has no status".to_string()))?
            .to_string();
        let version = body
            .get("version")
            .and_then(Value::as_str)
            .map(str::to_string);

        Ok(Self {
            status,
            version,
            body,
        })
    }

    pub fn is_ok(&self) -> bool {
        self.status == "ok"
    }

    /// Error object of a failed envelope
    pub fn error(&self) -> Option<RemoteErrorBody> {
        self.body
            .get("error")
            .and_then(|value| serde_json::from_value(value.clone()).ok())
    }

    /// Deserialize the payload stored under `key`
    ///
    /// Returns `Ok(None)` when the key is absent (servers omit empty
    /// payloads) and [`TransportError::Decode`] when it has the wrong shape.
    pub fn payload<T: DeserializeOwned>(&self, key: &str) -> TransportResult<Option<T>> {
        match self.body.get(key) {
            None | Some(Value::Null) => Ok(None),
            Some(value) => serde_json::from_value(value.clone())
                .map(Some)
                .map_err(|e| TransportError::Decode(format!("Invalid '{}' payload: {}", key, e))),
        }
    }
}

/// `error` object of a failed envelope
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct RemoteErrorBody {
    #[serde(default)]
    pub code: i64,
    #[serde(default)]
    pub message: String,
}

/// Song entry from `search3` or `getAlbum`
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct RemoteSong {
    #[serde(deserialize_with = "string_or_number")]
    pub id: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub artist: String,
    #[serde(default)]
    pub album: String,
}

/// Album entry from `search3`
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct RemoteAlbum {
    #[serde(deserialize_with = "string_or_number")]
    pub id: String,
    /// Servers send `name`; some older ones send `title` instead
    #[serde(default, alias = "title")]
    pub name: String,
    #[serde(default)]
    pub artist: String,
}

/// `album` payload of `getAlbum`
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct RemoteAlbumDetail {
    #[serde(deserialize_with = "string_or_number")]
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub song: Vec<RemoteSong>,
}

/// `searchResult3` payload
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct SearchResult3 {
    #[serde(default)]
    pub song: Vec<RemoteSong>,
    #[serde(default)]
    pub album: Vec<RemoteAlbum>,
}

/// `scanStatus` payload of `getScanStatus` and `startScan`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub struct ScanStatus {
    pub scanning: bool,
    #[serde(default)]
    pub count: Option<u64>,
}

/// Identifiers are strings in the protocol, but some servers send numbers
fn string_or_number<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Id {
        Text(String),
        Number(i64),
    }

    Ok(match Id::deserialize(deserializer)? {
        Id::Text(text) => text,
        Id::Number(number) => number.to_string(),
    })
}
