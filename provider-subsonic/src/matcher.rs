//! Identity resolution
//!
//! Finds the remote song matching a local track. Remote full-text search is
//! imprecise and tokenizes inconsistently, so the resolver probes `search3`
//! with several query formulations, cheapest and most likely first:
//!
//! 1. title
//! 2. `"title"` (exact phrase)
//! 3. title + album
//! 4. first artist + title
//! 5. album
//!
//! Every returned song joins a candidate pool. The first song whose title
//! equals the track title (case-insensitive) wins immediately. Without an
//! exact hit, a lenient pass takes the first pooled song whose normalized
//! title contains the track title or is contained by it. As a last resort the
//! album is looked up and its track listing searched for the title.
//!
//! Transport failures abandon only the strategy that hit them.

use core_library::models::Track;
use std::fmt;
use tracing::{debug, info, instrument, warn};

use crate::auth::Credential;
use crate::client::SubsonicClient;
use crate::types::RemoteSong;

/// Separators after which an artist string names further artists.
///
/// A comma is not one: it occurs inside single names ("Tyler, The Creator").
const ARTIST_SEPARATORS: &[&str] = &[
    ";",
    " & ",
    " feat. ",
    " feat ",
    " ft. ",
    " ft ",
    " featuring ",
    " vs. ",
    " vs ",
    " with ",
];

/// Query formulation probed against `search3`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SearchStrategy {
    Title,
    QuotedTitle,
    TitleAlbum,
    ArtistTitle,
    Album,
}

impl SearchStrategy {
    /// Cascade order
    pub const CASCADE: [SearchStrategy; 5] = [
        SearchStrategy::Title,
        SearchStrategy::QuotedTitle,
        SearchStrategy::TitleAlbum,
        SearchStrategy::ArtistTitle,
        SearchStrategy::Album,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            SearchStrategy::Title => "title",
            SearchStrategy::QuotedTitle => "quoted_title",
            SearchStrategy::TitleAlbum => "title_album",
            SearchStrategy::ArtistTitle => "artist_title",
            SearchStrategy::Album => "album",
        }
    }

    /// Query string for a track, or `None` when a needed field is blank
    pub fn query(&self, track: &Track) -> Option<String> {
        let title = track.title.trim();
        let album = track.album.trim();
        let artist = normalize_artist(&track.artist);

        match self {
            SearchStrategy::Title if !title.is_empty() => Some(title.to_string()),
            SearchStrategy::QuotedTitle if !title.is_empty() => Some(format!("\"{}\"", title)),
            SearchStrategy::TitleAlbum if !title.is_empty() && !album.is_empty() => {
                Some(format!("{} {}", title, album))
            }
            SearchStrategy::ArtistTitle if !title.is_empty() && !artist.is_empty() => {
                Some(format!("{} {}", artist, title))
            }
            SearchStrategy::Album if !album.is_empty() => Some(album.to_string()),
            _ => None,
        }
    }
}

impl fmt::Display for SearchStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// How a resolution was found
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchMethod {
    /// Case-insensitive title equality in this strategy's results
    Exact(SearchStrategy),
    /// Title containment among pooled candidates from this strategy
    Lenient(SearchStrategy),
    /// Title containment in the album's track listing
    AlbumFallback,
}

/// A resolved remote song
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resolution {
    pub remote_id: String,
    pub song: RemoteSong,
    pub method: MatchMethod,
}

/// First artist of a multi-artist credit, trimmed
///
/// `"Queen & David Bowie"` becomes `"Queen"`; `"Daft Punk feat. Pharrell"`
/// becomes `"Daft Punk"`.
pub fn normalize_artist(artist: &str) -> String {
    // ASCII lowering keeps byte offsets aligned with the original string
    let lowered = artist.to_ascii_lowercase();
    let cut = ARTIST_SEPARATORS
        .iter()
        .filter_map(|separator| lowered.find(separator))
        .min()
        .unwrap_or(artist.len());

    artist[..cut].trim().to_string()
}

/// Lowercase, trimmed, inner whitespace collapsed
pub fn normalize_title(title: &str) -> String {
    title
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}

fn is_exact_match(track_title: &str, song: &RemoteSong) -> bool {
    track_title.trim().to_lowercase() == song.title.trim().to_lowercase()
}

fn is_lenient_match(normalized_track_title: &str, song: &RemoteSong) -> bool {
    let song_title = normalize_title(&song.title);
    if song_title.is_empty() {
        return false;
    }
    song_title.contains(normalized_track_title) || normalized_track_title.contains(&song_title)
}

/// Resolves local tracks to remote song identifiers
#[derive(Clone)]
pub struct Matcher {
    client: SubsonicClient,
}

impl Matcher {
    pub fn new(client: SubsonicClient) -> Self {
        Self { client }
    }

    pub fn client(&self) -> &SubsonicClient {
        &self.client
    }

    /// Remote id of the best match, or `None` when nothing matches
    pub async fn resolve_id(&self, track: &Track, credential: &Credential) -> Option<String> {
        self.resolve(track, credential)
            .await
            .map(|resolution| resolution.remote_id)
    }

    /// Run the full cascade for one track
    ///
    /// "No match" is a normal outcome, logged at info with the track's
    /// title, artist and album.
    #[instrument(skip_all, fields(track_id = %track.id))]
    pub async fn resolve(&self, track: &Track, credential: &Credential) -> Option<Resolution> {
        let normalized_title = normalize_title(&track.title);
        if normalized_title.is_empty() {
            info!(
                title = %track.title,
                artist = %track.artist,
                album = %track.album,
                "Track has no title; cannot resolve"
            );
            return None;
        }

        let mut candidates: Vec<(SearchStrategy, RemoteSong)> = Vec::new();

        for strategy in SearchStrategy::CASCADE {
            let Some(query) = strategy.query(track) else {
                debug!(strategy = %strategy, "Strategy not applicable");
                continue;
            };

            let songs = match self.client.search_songs(credential, &query).await {
                Ok(songs) => songs,
                Err(error) => {
                    warn!(strategy = %strategy, query = %query, error = %error, "Search failed");
                    continue;
                }
            };

            debug!(strategy = %strategy, query = %query, results = songs.len(), "Search returned");

            for song in songs {
                if is_exact_match(&track.title, &song) {
                    debug!(strategy = %strategy, remote_id = %song.id, "Exact match");
                    return Some(Resolution {
                        remote_id: song.id.clone(),
                        song,
                        method: MatchMethod::Exact(strategy),
                    });
                }
                candidates.push((strategy, song));
            }
        }

        if let Some((strategy, song)) = candidates
            .into_iter()
            .find(|(_, song)| is_lenient_match(&normalized_title, song))
        {
            debug!(strategy = %strategy, remote_id = %song.id, song_title = %song.title, "Lenient match");
            return Some(Resolution {
                remote_id: song.id.clone(),
                song,
                method: MatchMethod::Lenient(strategy),
            });
        }

        if let Some(song) = self.album_fallback(track, credential, &normalized_title).await {
            debug!(remote_id = %song.id, "Album fallback match");
            return Some(Resolution {
                remote_id: song.id.clone(),
                song,
                method: MatchMethod::AlbumFallback,
            });
        }

        info!(
            title = %track.title,
            artist = %track.artist,
            album = %track.album,
            "No remote match for track"
        );
        None
    }

    /// Look the album up by name and search its listing for the title
    async fn album_fallback(
        &self,
        track: &Track,
        credential: &Credential,
        normalized_title: &str,
    ) -> Option<RemoteSong> {
        let album_name = normalize_title(&track.album);
        if album_name.is_empty() {
            return None;
        }

        let albums = match self.client.search_albums(credential, track.album.trim()).await {
            Ok(albums) => albums,
            Err(error) => {
                warn!(album = %track.album, error = %error, "Album search failed");
                return None;
            }
        };

        let album = albums
            .into_iter()
            .find(|album| normalize_title(&album.name).contains(&album_name))?;

        let detail = match self.client.get_album(credential, &album.id).await {
            Ok(Some(detail)) => detail,
            Ok(None) => return None,
            Err(error) => {
                warn!(album_id = %album.id, error = %error, "Album lookup failed");
                return None;
            }
        };

        detail
            .song
            .into_iter()
            .find(|song| normalize_title(&song.title).contains(normalized_title))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn song(id: &str, title: &str) -> RemoteSong {
        RemoteSong {
            id: id.to_string(),
            title: title.to_string(),
            artist: String::new(),
            album: String::new(),
        }
    }

    #[test]
    fn test_normalize_artist() {
        assert_eq!(normalize_artist("The Beatles"), "The Beatles");
        assert_eq!(normalize_artist("Queen & David Bowie"), "Queen");
        assert_eq!(normalize_artist("Daft Punk feat. Pharrell Williams"), "Daft Punk");
        assert_eq!(normalize_artist("Calvin Harris FT. Rihanna"), "Calvin Harris");
        assert_eq!(normalize_artist("  Tyler, The Creator "), "Tyler, The Creator");
        assert_eq!(
            normalize_artist("Tyler, The Creator feat. Kali Uchis"),
            "Tyler, The Creator"
        );
        assert_eq!(normalize_artist("Björk; Thom Yorke"), "Björk");
        assert_eq!(normalize_artist("AC/DC"), "AC/DC");
        assert_eq!(normalize_artist(""), "");
    }

    #[test]
    fn test_strategy_queries() {
        let track = Track::new("Yesterday", "The Beatles & Friends", "Help!");
        let queries: Vec<Option<String>> = SearchStrategy::CASCADE
            .iter()
            .map(|strategy| strategy.query(&track))
            .collect();

        assert_eq!(
            queries,
            vec![
                Some("Yesterday".to_string()),
                Some("\"Yesterday\"".to_string()),
                Some("Yesterday Help!".to_string()),
                Some("The Beatles Yesterday".to_string()),
                Some("Help!".to_string()),
            ]
        );
    }

    #[test]
    fn test_strategies_skip_blank_fields() {
        let track = Track::new("Intro", "  ", "");
        assert!(SearchStrategy::Title.query(&track).is_some());
        assert!(SearchStrategy::TitleAlbum.query(&track).is_none());
        assert!(SearchStrategy::ArtistTitle.query(&track).is_none());
        assert!(SearchStrategy::Album.query(&track).is_none());
    }

    #[test]
    fn test_exact_match_is_case_insensitive() {
        assert!(is_exact_match("Yesterday", &song("1", "YESTERDAY")));
        assert!(!is_exact_match("Yesterday", &song("1", "Yesterday (Live)")));
    }

    #[test]
    fn test_lenient_match_either_direction() {
        let title = normalize_title("Yesterday");
        assert!(is_lenient_match(&title, &song("1", "Yesterday - Remastered  2009")));
        assert!(is_lenient_match(&normalize_title("Hey  Jude (Take 1)"), &song("2", "hey jude")));
        assert!(!is_lenient_match(&title, &song("3", "Let It Be")));
        assert!(!is_lenient_match(&title, &song("4", "   ")));
    }
}
