//! Local rating fields to the remote 0-5 scale

use std::fmt;

/// Half-scale (0-10) rating field written by Plex imports
pub const HALF_SCALE_FIELD: &str = "plex_userrating";

/// Popularity percentage (0-100) written by Spotify imports
pub const POPULARITY_FIELD: &str = "spotify_track_popularity";

/// Lower bounds of popularity buckets 1 through 5
const POPULARITY_THRESHOLDS: [f64; 5] = [16.66, 33.33, 50.0, 66.66, 83.33];

/// Highest rating the remote accepts
pub const MAX_REMOTE_RATING: u8 = 5;

/// Scale of a local rating field
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RatingScale {
    /// 0-10, halved and rounded half-up
    HalfScale,
    /// 0-100, bucketed by fixed thresholds
    Popularity,
    /// Already 0-5, truncated
    Direct,
}

impl RatingScale {
    /// Scale implied by a field name
    pub fn for_field(field: &str) -> Self {
        let field = field.trim().to_lowercase();
        if field == HALF_SCALE_FIELD {
            RatingScale::HalfScale
        } else if field == POPULARITY_FIELD || field.ends_with("popularity") {
            RatingScale::Popularity
        } else {
            RatingScale::Direct
        }
    }

    /// Convert a value on this scale, `None` when it falls outside 0-5
    pub fn convert(&self, value: f64) -> Option<u8> {
        if !value.is_finite() {
            return None;
        }

        let converted = match self {
            RatingScale::HalfScale => (value / 2.0).round(),
            RatingScale::Popularity => {
                if value < 0.0 {
                    return None;
                }
                POPULARITY_THRESHOLDS
                    .iter()
                    .filter(|threshold| value >= **threshold)
                    .count() as f64
            }
            RatingScale::Direct => value.trunc(),
        };

        if (0.0..=f64::from(MAX_REMOTE_RATING)).contains(&converted) {
            Some(converted as u8)
        } else {
            None
        }
    }
}

impl fmt::Display for RatingScale {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RatingScale::HalfScale => f.write_str("half_scale"),
            RatingScale::Popularity => f.write_str("popularity"),
            RatingScale::Direct => f.write_str("direct"),
        }
    }
}

/// Translate `value` of `field` to the remote 0-5 scale
pub fn translate(value: f64, field: &str) -> Option<u8> {
    RatingScale::for_field(field).convert(value)
}
