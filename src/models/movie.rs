use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt::Display;

/// Lowest rating the catalog can report
pub const MIN_RATING: f64 = 0.0;
/// Highest rating the catalog can report
pub const MAX_RATING: f64 = 10.0;

/// Average user rating of a movie, always within [0, 10]
///
/// Deserialization rejects out-of-range and non-finite values instead of
/// clamping them, so a bad record fails the whole page it arrived in.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Serialize, Deserialize)]
#[serde(try_from = "f64", into = "f64")]
pub struct Rating(f64);

impl Rating {
    pub fn new(value: f64) -> Result<Self, RatingOutOfRange> {
        if value.is_finite() && (MIN_RATING..=MAX_RATING).contains(&value) {
            Ok(Self(value))
        } else {
            Err(RatingOutOfRange(value))
        }
    }

    pub fn value(self) -> f64 {
        self.0
    }
}

impl TryFrom<f64> for Rating {
    type Error = RatingOutOfRange;

    fn try_from(value: f64) -> Result<Self, Self::Error> {
        Rating::new(value)
    }
}

impl From<Rating> for f64 {
    fn from(rating: Rating) -> Self {
        rating.0
    }
}

impl Display for Rating {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:.1}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, thiserror::Error)]
#[error("vote_average must be between 0 and 10, got {0}")]
pub struct RatingOutOfRange(pub f64);

/// A movie record as returned by the catalog API
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Movie {
    pub id: i64,
    pub title: String,
    #[serde(default)]
    pub overview: String,
    #[serde(default)]
    pub poster_path: Option<String>,
    #[serde(default)]
    pub backdrop_path: Option<String>,
    /// `YYYY-MM-DD`, empty when the catalog has no date
    #[serde(default)]
    pub release_date: String,
    pub vote_average: Rating,
    #[serde(default)]
    pub vote_count: u64,
    #[serde(default)]
    pub genre_ids: BTreeSet<i64>,
    #[serde(default)]
    pub adult: bool,
    #[serde(default)]
    pub original_language: String,
    #[serde(default)]
    pub original_title: String,
    #[serde(default)]
    pub popularity: f64,
    #[serde(default)]
    pub video: bool,
}

/// One page of movies from a listing, discovery or search endpoint
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MoviePage {
    pub page: u32,
    pub results: Vec<Movie>,
    pub total_pages: u32,
    pub total_results: u32,
}

/// A catalog genre
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Genre {
    pub id: i64,
    pub name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct GenreList {
    pub genres: Vec<Genre>,
}
