//! Ratings reported upstream and the problems derived from them.

use alloc::collections::BTreeMap;
use alloc::string::String;

/// Consensus rating of one validator key, as reported by the statistics API.
///
/// `temp_rating` is the short-term score and moves every round;
/// `rating` is the long-term score it converges to.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct RatingRecord {
    #[cfg_attr(feature = "serde", serde(rename = "tempRating"))]
    pub temp_rating: f32,
    pub rating: f32,
}

impl RatingRecord {
    pub const fn new(temp_rating: f32, rating: f32) -> Self {
        Self {
            temp_rating,
            rating,
        }
    }
}

/// Ratings snapshot keyed by hex-encoded BLS key.
pub type RatingsMap = BTreeMap<String, RatingRecord>;

/// A key whose ratings tripped one of the alert rules.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProblemRecord {
    pub identity_key: String,
    pub status_text: String,
}

impl ProblemRecord {
    pub fn new(identity_key: impl Into<String>, status_text: impl Into<String>) -> Self {
        Self {
            identity_key: identity_key.into(),
            status_text: status_text.into(),
        }
    }
}

#[cfg(all(test, feature = "serde"))]
mod tests {
    use super::*;

    #[test]
    fn decodes_api_field_names() {
        let json = r#"{"tempRating": 90.69571, "rating": 100, "numLeaderSuccess": 12}"#;
        let record: RatingRecord = serde_json::from_str(json).unwrap();
        assert_eq!(record, RatingRecord::new(90.69571, 100.0));
    }
}
