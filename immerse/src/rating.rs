//! Star ratings and the `"sum/count"` aggregate stored on posts.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::errors::ValidationError;

pub const MIN_STARS: u8 = 1;
pub const MAX_STARS: u8 = 5;

/// A single viewer rating, always within `1..=5`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct StarRating(u8);

impl StarRating {
    pub fn new(value: u8) -> Result<Self, ValidationError> {
        if (MIN_STARS..=MAX_STARS).contains(&value) {
            Ok(Self(value))
        } else {
            Err(ValidationError::single(
                "rating",
                "validation.range",
                format!("rating must be between {MIN_STARS} and {MAX_STARS}"),
            ))
        }
    }

    pub fn get(self) -> u8 {
        self.0
    }

    /// Encoding of an individual rating record (`"4/1"`).
    pub fn encode(self) -> String {
        RatingFraction::single(self).to_string()
    }

    /// Parses an individual rating record; anything outside `1..=5` yields `None`.
    pub fn decode(raw: &str) -> Option<Self> {
        let (numerator, _) = split_fraction(raw)?;
        u8::try_from(numerator).ok().and_then(|value| Self::new(value).ok())
    }
}

impl TryFrom<u8> for StarRating {
    type Error = ValidationError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

/// Running aggregate of every rating on a post.
///
/// Encoded as `"sum/count"`; the empty aggregate is `"0/1"`. Keeping the pair instead of
/// a precomputed average lets a single rating be added or removed without a full rescan.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RatingFraction {
    sum: u32,
    count: u32,
}

impl RatingFraction {
    pub const EMPTY: Self = Self { sum: 0, count: 0 };

    pub fn single(rating: StarRating) -> Self {
        Self {
            sum: u32::from(rating.get()),
            count: 1,
        }
    }

    /// Builds the aggregate from the full set of individual ratings.
    pub fn from_ratings<I>(ratings: I) -> Self
    where
        I: IntoIterator<Item = StarRating>,
    {
        ratings.into_iter().fold(Self::EMPTY, |acc, rating| acc.adding(rating))
    }

    pub fn sum(&self) -> u32 {
        self.sum
    }

    pub fn count(&self) -> u32 {
        self.count
    }

    pub fn is_empty(&self) -> bool {
        self.count == 0
    }

    pub fn adding(self, rating: StarRating) -> Self {
        Self {
            sum: self.sum + u32::from(rating.get()),
            count: self.count + 1,
        }
    }

    pub fn removing(self, rating: StarRating) -> Self {
        if self.count <= 1 {
            return Self::EMPTY;
        }
        Self {
            sum: self.sum.saturating_sub(u32::from(rating.get())),
            count: self.count - 1,
        }
    }

    /// Remove-then-add: a viewer's previous rating is never double counted.
    pub fn replacing(self, previous: Option<StarRating>, next: StarRating) -> Self {
        match previous {
            Some(previous) => self.removing(previous).adding(next),
            None => self.adding(next),
        }
    }

    pub fn average(&self) -> Option<f64> {
        (self.count > 0).then(|| f64::from(self.sum) / f64::from(self.count))
    }

    /// Average for display; an unrated post shows 0.
    pub fn display_average(&self) -> f64 {
        self.average().unwrap_or(0.0)
    }

    pub fn formatted(&self) -> String {
        format!("{:.2}", self.display_average())
    }
}

fn split_fraction(raw: &str) -> Option<(u32, u32)> {
    let (numerator, denominator) = raw.trim().split_once('/')?;
    Some((numerator.trim().parse().ok()?, denominator.trim().parse().ok()?))
}

impl fmt::Display for RatingFraction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.count == 0 {
            f.write_str("0/1")
        } else {
            write!(f, "{}/{}", self.sum, self.count)
        }
    }
}

impl FromStr for RatingFraction {
    type Err = ValidationError;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        let (sum, count) = split_fraction(raw).ok_or_else(|| {
            ValidationError::single("averageRating", "rating.malformed", format!("`{raw}` is not a fraction"))
        })?;
        if sum == 0 || count == 0 {
            return Ok(Self::EMPTY);
        }
        Ok(Self { sum, count })
    }
}

impl Serialize for RatingFraction {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for RatingFraction {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = String::deserialize(deserializer)?;
        Ok(raw.parse().unwrap_or_default())
    }
}
