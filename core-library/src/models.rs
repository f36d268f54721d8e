//! Domain models shared between the host library and the sync core.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use uuid::Uuid;

/// Local track record.
///
/// The host owns the record. The sync core reads `title`, `artist`,
/// `album`, the rating fields and `last_played_at`, and writes back only
/// `remote_id`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Track {
    /// Host identifier
    pub id: String,
    /// Track title
    pub title: String,
    /// Track artist, possibly listing several artists
    pub artist: String,
    /// Album name
    pub album: String,
    /// Identifier of the matching song on the remote server, once resolved
    pub remote_id: Option<String>,
    /// Numeric rating fields keyed by name (e.g. `plex_userrating`)
    #[serde(default)]
    pub ratings: BTreeMap<String, f64>,
    /// When the track was last played
    pub last_played_at: Option<DateTime<Utc>>,
    /// Last update time (unix seconds)
    pub updated_at: i64,
}

impl Track {
    /// Create a new track with a generated id
    pub fn new(
        title: impl Into<String>,
        artist: impl Into<String>,
        album: impl Into<String>,
    ) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            title: title.into(),
            artist: artist.into(),
            album: album.into(),
            remote_id: None,
            ratings: BTreeMap::new(),
            last_played_at: None,
            updated_at: Utc::now().timestamp(),
        }
    }

    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = id.into();
        self
    }

    pub fn with_remote_id(mut self, remote_id: impl Into<String>) -> Self {
        self.remote_id = Some(remote_id.into());
        self
    }

    pub fn with_rating(mut self, field: impl Into<String>, value: f64) -> Self {
        self.ratings.insert(field.into(), value);
        self
    }

    pub fn with_last_played_at(mut self, played_at: DateTime<Utc>) -> Self {
        self.last_played_at = Some(played_at);
        self
    }

    /// Value of a rating field, if the track carries it
    pub fn rating(&self, field: &str) -> Option<f64> {
        self.ratings.get(field).copied()
    }

    pub fn has_remote_id(&self) -> bool {
        self.remote_id
            .as_deref()
            .is_some_and(|id| !id.trim().is_empty())
    }

    /// Record a resolved remote identifier and bump `updated_at`
    pub fn set_remote_id(&mut self, remote_id: impl Into<String>) {
        self.remote_id = Some(remote_id.into());
        self.updated_at = Utc::now().timestamp();
    }

    /// Validate track data
    pub fn validate(&self) -> Result<(), String> {
        if self.id.trim().is_empty() {
            return Err("Track id cannot be empty".to_string());
        }

        if let Some((field, value)) = self.ratings.iter().find(|(_, v)| !v.is_finite()) {
            return Err(format!("Rating field {} is not a finite number: {}", field, value));
        }

        Ok(())
    }

    /// Normalize a string for searching (lowercase, trimmed)
    pub fn normalize(s: &str) -> String {
        s.trim().to_lowercase()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_track_builder() {
        let played = Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).unwrap();
        let track = Track::new("Yesterday", "The Beatles", "Help!")
            .with_id("t-1")
            .with_rating("plex_userrating", 8.0)
            .with_last_played_at(played);

        assert_eq!(track.id, "t-1");
        assert_eq!(track.rating("plex_userrating"), Some(8.0));
        assert_eq!(track.rating("spotify_track_popularity"), None);
        assert_eq!(track.last_played_at, Some(played));
        assert!(!track.has_remote_id());
    }

    #[test]
    fn test_blank_remote_id_is_not_resolved() {
        let track = Track::new("a", "b", "c").with_remote_id("  ");
        assert!(!track.has_remote_id());

        let mut track = Track::new("a", "b", "c");
        track.set_remote_id("so-1");
        assert!(track.has_remote_id());
    }

    #[test]
    fn test_validate() {
        assert!(Track::new("a", "b", "c").validate().is_ok());
        assert!(Track::new("a", "b", "c").with_id("").validate().is_err());
        assert!(Track::new("a", "b", "c")
            .with_rating("plex_userrating", f64::NAN)
            .validate()
            .is_err());
    }

    #[test]
    fn test_serde_defaults_ratings() {
        let track: Track = serde_json::from_str(
            r#"{"id":"1","title":"t","artist":"a","album":"b","remote_id":null,"last_played_at":null,"updated_at":0}"#,
        )
        .unwrap();
        assert!(track.ratings.is_empty());
    }
}
