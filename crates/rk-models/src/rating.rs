//! Star rating value.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::ModelError;

/// A rating between 0 and 5 inclusive.
///
/// Deserialization rejects anything outside that range (including NaN), so a
/// `Rating` held in memory is always valid.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Serialize, Deserialize, JsonSchema)]
#[serde(try_from = "f64", into = "f64")]
pub struct Rating(f64);

impl Rating {
    pub const MIN: f64 = 0.0;
    pub const MAX: f64 = 5.0;

    pub fn new(value: f64) -> Result<Self, ModelError> {
        if value.is_finite() && (Self::MIN..=Self::MAX).contains(&value) {
            Ok(Self(value))
        } else {
            Err(ModelError::RatingOutOfRange {
                value,
                min: Self::MIN,
                max: Self::MAX,
            })
        }
    }

    pub fn value(&self) -> f64 {
        self.0
    }
}

impl TryFrom<f64> for Rating {
    type Error = ModelError;

    fn try_from(value: f64) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<Rating> for f64 {
    fn from(rating: Rating) -> Self {
        rating.0
    }
}

impl fmt::Display for Rating {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Mean of the given ratings, or 0 when there are none.
pub fn mean<I>(ratings: I) -> f64
where
    I: IntoIterator<Item = Rating>,
{
    let (sum, count) = ratings
        .into_iter()
        .fold((0.0, 0u32), |(sum, count), r| (sum + r.value(), count + 1));
    if count == 0 {
        0.0
    } else {
        sum / f64::from(count)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bounds_are_inclusive() {
        assert!(Rating::new(0.0).is_ok());
        assert!(Rating::new(5.0).is_ok());
        assert!(Rating::new(3.5).is_ok());
    }

    #[test]
    fn test_out_of_range_rejected() {
        assert!(Rating::new(-0.1).is_err());
        assert!(Rating::new(5.01).is_err());
        assert!(Rating::new(f64::NAN).is_err());
    }

    #[test]
    fn test_deserialize_validates() {
        assert!(serde_json::from_str::<Rating>("4").is_ok());
        assert!(serde_json::from_str::<Rating>("6").is_err());
    }

    #[test]
    fn test_mean_of_empty_is_zero() {
        assert_eq!(mean(Vec::new()), 0.0);
    }

    #[test]
    fn test_mean() {
        let ratings = [4.0, 5.0, 3.0].map(|v| Rating::new(v).unwrap());
        assert_eq!(mean(ratings), 4.0);
    }
}
