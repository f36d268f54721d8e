//! Track repository trait and implementation

use crate::error::{LibraryError, Result};
use crate::models::Track;
use crate::query::TrackQuery;
use async_trait::async_trait;
use tokio::sync::RwLock;
use tracing::debug;

/// Track repository interface for data access operations
///
/// Implementations must tolerate concurrent `update` calls for different
/// tracks: batch operations store results from several workers at once.
#[async_trait]
pub trait TrackRepository: Send + Sync {
    /// Find a track by its ID
    ///
    /// # Returns
    /// - `Ok(Some(track))` if found
    /// - `Ok(None)` if not found
    async fn find_by_id(&self, id: &str) -> Result<Option<Track>>;

    /// Tracks matching a query, in library order
    async fn find_matching(&self, query: &TrackQuery) -> Result<Vec<Track>>;

    /// Persist a track's mutated fields
    ///
    /// # Errors
    /// Returns error if:
    /// - Track does not exist
    /// - Track validation fails
    async fn update(&self, track: &Track) -> Result<()>;
}

/// In-memory implementation of TrackRepository
#[derive(Debug, Default)]
pub struct InMemoryTrackRepository {
    tracks: RwLock<Vec<Track>>,
}

impl InMemoryTrackRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_tracks(tracks: Vec<Track>) -> Self {
        Self {
            tracks: RwLock::new(tracks),
        }
    }

    /// Insert a new track
    ///
    /// # Errors
    /// Returns error if a track with the same ID already exists or the
    /// track fails validation.
    pub async fn insert(&self, track: Track) -> Result<()> {
        track.validate().map_err(|msg| LibraryError::InvalidInput {
            field: "track".to_string(),
            message: msg,
        })?;

        let mut tracks = self.tracks.write().await;
        if tracks.iter().any(|existing| existing.id == track.id) {
            return Err(LibraryError::InvalidInput {
                field: "id".to_string(),
                message: format!("Track {} already exists", track.id),
            });
        }
        tracks.push(track);
        Ok(())
    }

    /// Snapshot of every track
    pub async fn all(&self) -> Vec<Track> {
        self.tracks.read().await.clone()
    }

    pub async fn count(&self) -> usize {
        self.tracks.read().await.len()
    }
}

#[async_trait]
impl TrackRepository for InMemoryTrackRepository {
    async fn find_by_id(&self, id: &str) -> Result<Option<Track>> {
        let tracks = self.tracks.read().await;
        Ok(tracks.iter().find(|track| track.id == id).cloned())
    }

    async fn find_matching(&self, query: &TrackQuery) -> Result<Vec<Track>> {
        let tracks = self.tracks.read().await;
        let matching: Vec<Track> = tracks
            .iter()
            .filter(|track| query.matches(track))
            .cloned()
            .collect();

        debug!(query = %query, count = matching.len(), "Selected tracks");
        Ok(matching)
    }

    async fn update(&self, track: &Track) -> Result<()> {
        track.validate().map_err(|msg| LibraryError::InvalidInput {
            field: "track".to_string(),
            message: msg,
        })?;

        let mut tracks = self.tracks.write().await;
        let slot = tracks
            .iter_mut()
            .find(|existing| existing.id == track.id)
            .ok_or_else(|| LibraryError::NotFound {
                entity_type: "Track".to_string(),
                id: track.id.clone(),
            })?;

        *slot = track.clone();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    fn create_test_track(id: &str, title: &str, artist: &str) -> Track {
        Track::new(title, artist, "Test Album").with_id(id)
    }

    #[tokio::test]
    async fn test_insert_and_find_track() {
        let repo = InMemoryTrackRepository::new();
        repo.insert(create_test_track("track-1", "Yesterday", "The Beatles"))
            .await
            .unwrap();

        let found = repo.find_by_id("track-1").await.unwrap().unwrap();
        assert_eq!(found.title, "Yesterday");
        assert!(repo.find_by_id("missing").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_duplicate_insert_rejected() {
        let repo = InMemoryTrackRepository::new();
        repo.insert(create_test_track("track-1", "a", "b")).await.unwrap();

        let result = repo.insert(create_test_track("track-1", "c", "d")).await;
        assert!(matches!(result, Err(LibraryError::InvalidInput { .. })));
        assert_eq!(repo.count().await, 1);
    }

    #[tokio::test]
    async fn test_find_matching_preserves_order() {
        let repo = InMemoryTrackRepository::with_tracks(vec![
            create_test_track("1", "Help!", "The Beatles"),
            create_test_track("2", "Wish You Were Here", "Pink Floyd"),
            create_test_track("3", "Yesterday", "The Beatles"),
        ]);

        let query = TrackQuery::parse("artist:beatles").unwrap();
        let ids: Vec<String> = repo
            .find_matching(&query)
            .await
            .unwrap()
            .into_iter()
            .map(|t| t.id)
            .collect();
        assert_eq!(ids, vec!["1", "3"]);
    }

    #[tokio::test]
    async fn test_update_track() {
        let repo = InMemoryTrackRepository::with_tracks(vec![create_test_track("1", "a", "b")]);

        let mut track = repo.find_by_id("1").await.unwrap().unwrap();
        track.set_remote_id("so-42");
        repo.update(&track).await.unwrap();

        let stored = repo.find_by_id("1").await.unwrap().unwrap();
        assert_eq!(stored.remote_id.as_deref(), Some("so-42"));
    }

    #[tokio::test]
    async fn test_update_missing_track() {
        let repo = InMemoryTrackRepository::new();
        let result = repo.update(&create_test_track("ghost", "a", "b")).await;
        assert!(matches!(result, Err(LibraryError::NotFound { .. })));
    }

    #[tokio::test]
    async fn test_concurrent_updates_for_different_tracks() {
        let tracks: Vec<Track> = (0..16)
            .map(|i| create_test_track(&i.to_string(), "t", "a"))
            .collect();
        let repo = Arc::new(InMemoryTrackRepository::with_tracks(tracks.clone()));

        let mut handles = Vec::new();
        for mut track in tracks {
            let repo = Arc::clone(&repo);
            handles.push(tokio::spawn(async move {
                track.set_remote_id(format!("so-{}", track.id));
                repo.update(&track).await
            }));
        }
        for handle in handles {
            handle.await.unwrap().unwrap();
        }

        for track in repo.all().await {
            assert_eq!(track.remote_id, Some(format!("so-{}", track.id)));
        }
    }
}
