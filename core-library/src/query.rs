//! Track selection queries.
//!
//! A query is a whitespace-separated list of terms, all of which must match:
//!
//! - `field:value` matches when the named field contains `value`
//!   (`title`, `artist`, `album` or `id`)
//! - a bare word matches when any of title, artist or album contains it
//! - double quotes group words into one value: `album:"Abbey Road"`, and a
//!   colon inside quotes is literal: `"Mission: Impossible"` is a bare term
//!
//! Matching is case-insensitive substring containment. The empty query
//! selects every track.

use crate::error::{LibraryError, Result};
use crate::models::Track;
use std::fmt;
use std::str::FromStr;

/// Field a query term is restricted to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueryField {
    Title,
    Artist,
    Album,
    Id,
}

impl FromStr for QueryField {
    type Err = LibraryError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "title" => Ok(Self::Title),
            "artist" => Ok(Self::Artist),
            "album" => Ok(Self::Album),
            "id" => Ok(Self::Id),
            other => Err(LibraryError::InvalidInput {
                field: "query".to_string(),
                message: format!("Unknown query field '{}'", other),
            }),
        }
    }
}

/// One term of a query.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueryTerm {
    /// `None` means any of title, artist or album
    pub field: Option<QueryField>,
    /// Normalized value
    pub value: String,
}

impl QueryTerm {
    fn matches(&self, track: &Track) -> bool {
        let contains = |haystack: &str| Track::normalize(haystack).contains(&self.value);
        match self.field {
            Some(QueryField::Title) => contains(&track.title),
            Some(QueryField::Artist) => contains(&track.artist),
            Some(QueryField::Album) => contains(&track.album),
            Some(QueryField::Id) => contains(&track.id),
            None => contains(&track.title) || contains(&track.artist) || contains(&track.album),
        }
    }
}

/// Parsed track filter.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TrackQuery {
    terms: Vec<QueryTerm>,
}

impl TrackQuery {
    /// Query matching every track
    pub fn all() -> Self {
        Self::default()
    }

    /// Parse a query string.
    ///
    /// # Errors
    ///
    /// Returns [`LibraryError::InvalidInput`] for an unknown field name, an
    /// empty field value or an unterminated quote.
    pub fn parse(input: &str) -> Result<Self> {
        let terms = tokenize(input)?
            .iter()
            .map(parse_term)
            .collect::<Result<Vec<_>>>()?;

        Ok(Self { terms })
    }

    pub fn terms(&self) -> &[QueryTerm] {
        &self.terms
    }

    pub fn is_empty(&self) -> bool {
        self.terms.is_empty()
    }

    /// Whether every term matches the track
    pub fn matches(&self, track: &Track) -> bool {
        self.terms.iter().all(|term| term.matches(track))
    }
}

impl FromStr for TrackQuery {
    type Err = LibraryError;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

impl fmt::Display for TrackQuery {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let rendered: Vec<String> = self
            .terms
            .iter()
            .map(|term| {
                let value = if term.value.contains(' ') || term.value.contains(':') {
                    format!("\"{}\"", term.value)
                } else {
                    term.value.clone()
                };
                match term.field {
                    Some(QueryField::Title) => format!("title:{}", value),
                    Some(QueryField::Artist) => format!("artist:{}", value),
                    Some(QueryField::Album) => format!("album:{}", value),
                    Some(QueryField::Id) => format!("id:{}", value),
                    None => value,
                }
            })
            .collect();
        f.write_str(&rendered.join(" "))
    }
}

fn invalid(message: impl Into<String>) -> LibraryError {
    LibraryError::InvalidInput {
        field: "query".to_string(),
        message: message.into(),
    }
}

/// A query word with quotes removed.
#[derive(Debug)]
struct Token {
    text: String,
    /// Byte offset of the first colon seen outside quotes and before any quote
    field_end: Option<usize>,
}

/// Split on whitespace outside double quotes.
fn tokenize(input: &str) -> Result<Vec<Token>> {
    let mut tokens = Vec::new();
    let mut text = String::new();
    let mut field_end = None;
    let mut in_quotes = false;
    let mut quoted = false;

    for ch in input.chars() {
        match ch {
            '"' => {
                in_quotes = !in_quotes;
                quoted = true;
            }
            c if c.is_whitespace() && !in_quotes => {
                if !text.is_empty() {
                    tokens.push(Token {
                        text: std::mem::take(&mut text),
                        field_end: field_end.take(),
                    });
                }
                quoted = false;
            }
            ':' if !quoted && field_end.is_none() => {
                field_end = Some(text.len());
                text.push(':');
            }
            c => text.push(c),
        }
    }

    if in_quotes {
        return Err(invalid("Unterminated quote"));
    }
    if !text.is_empty() {
        tokens.push(Token { text, field_end });
    }

    Ok(tokens)
}

fn parse_term(token: &Token) -> Result<QueryTerm> {
    let Some(split) = token.field_end else {
        return Ok(QueryTerm {
            field: None,
            value: Track::normalize(&token.text),
        });
    };

    let (field, value) = (&token.text[..split], &token.text[split + 1..]);
    let field = field.parse::<QueryField>()?;
    let value = Track::normalize(value);
    if value.is_empty() {
        return Err(invalid(format!("Empty value for field in '{}'", token.text)));
    }
    Ok(QueryTerm {
        field: Some(field),
        value,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn beatles() -> Track {
        Track::new("Yesterday", "The Beatles", "Help!").with_id("t-1")
    }

    #[test]
    fn test_empty_query_matches_everything() {
        let query = TrackQuery::parse("   ").unwrap();
        assert!(query.is_empty());
        assert!(query.matches(&beatles()));
        assert!(TrackQuery::all().matches(&beatles()));
    }

    #[test]
    fn test_field_terms() {
        assert!(TrackQuery::parse("artist:beatles").unwrap().matches(&beatles()));
        assert!(TrackQuery::parse("ALBUM:help").unwrap().matches(&beatles()));
        assert!(!TrackQuery::parse("title:help").unwrap().matches(&beatles()));
        assert!(TrackQuery::parse("id:t-1").unwrap().matches(&beatles()));
    }

    #[test]
    fn test_bare_words_match_any_field_and_are_anded() {
        assert!(TrackQuery::parse("beatles yesterday").unwrap().matches(&beatles()));
        assert!(!TrackQuery::parse("beatles tomorrow").unwrap().matches(&beatles()));
    }

    #[test]
    fn test_quoted_values() {
        let query = TrackQuery::parse("artist:\"the beatles\" album:help!").unwrap();
        assert_eq!(query.terms().len(), 2);
        assert_eq!(query.terms()[0].value, "the beatles");
        assert!(query.matches(&beatles()));
        assert_eq!(query.to_string(), "artist:\"the beatles\" album:help!");
    }

    #[test]
    fn test_parse_errors() {
        assert!(matches!(
            TrackQuery::parse("genre:rock"),
            Err(LibraryError::InvalidInput { .. })
        ));
        assert!(TrackQuery::parse("title:").is_err());
        assert!(TrackQuery::parse("title:\"open").is_err());
    }

    #[test]
    fn test_colon_inside_quotes_is_part_of_the_value() {
        let theme = Track::new(
            "Mission: Impossible Theme",
            "Lalo Schifrin",
            "Mission: Impossible",
        )
        .with_id("t-2");

        let bare = TrackQuery::parse("\"Mission: Impossible\"").unwrap();
        assert_eq!(bare.terms()[0].field, None);
        assert_eq!(bare.terms()[0].value, "mission: impossible");
        assert!(bare.matches(&theme));
        assert!(!bare.matches(&beatles()));

        let scoped = TrackQuery::parse("album:\"Mission: Impossible\" title:theme").unwrap();
        assert_eq!(scoped.terms()[0].field, Some(QueryField::Album));
        assert_eq!(scoped.terms()[0].value, "mission: impossible");
        assert!(scoped.matches(&theme));
        assert_eq!(
            scoped.to_string(),
            "album:\"mission: impossible\" title:theme"
        );
    }
}
