//! Rating rules applied to every monitored key.

use keywatch_types::{ProblemRecord, RatingsMap};

use crate::MonitorError;

/// Keys whose temp rating falls below this value are about to be jailed.
pub const JAIL_THRESHOLD: f32 = 10.0;

const MIN_ALARM_DELTA_RATING_DROP: f64 = 0.0;
const MAX_ALARM_DELTA_RATING_DROP: f64 = 100.0;

/// Evaluates a ratings snapshot.
pub trait RatingsCheck: Send + Sync {
    /// Return one problem per flagged key, in the order the keys are
    /// monitored. `extra_keys` are checked after the configured ones.
    fn check(
        &self,
        ratings: &RatingsMap,
        extra_keys: &[String],
    ) -> Result<Vec<ProblemRecord>, MonitorError>;
}

/// Flags keys that are close to jail or whose temp rating dropped too far
/// below their rating.
#[derive(Debug, Clone)]
pub struct RatingsChecker {
    name: String,
    hex_bls_keys: Vec<String>,
    alarm_delta_rating_drop: f32,
}

impl RatingsChecker {
    pub fn new(
        name: impl Into<String>,
        hex_bls_keys: Vec<String>,
        alarm_delta_rating_drop: f64,
    ) -> Result<Self, MonitorError> {
        let range = MIN_ALARM_DELTA_RATING_DROP..=MAX_ALARM_DELTA_RATING_DROP;
        if !range.contains(&alarm_delta_rating_drop) {
            return Err(MonitorError::InvalidAlarmDeltaRatingDrop(
                alarm_delta_rating_drop,
            ));
        }

        let name = name.into();
        tracing::debug!(checker = %name, num_keys = hex_bls_keys.len(), "created ratings checker");

        Ok(Self {
            name,
            hex_bls_keys,
            alarm_delta_rating_drop: alarm_delta_rating_drop as f32,
        })
    }

    fn evaluate(&self, temp_rating: f32, rating: f32) -> Option<String> {
        if temp_rating < JAIL_THRESHOLD {
            return Some(format!(
                "Imminent jail: temp rating: {temp_rating:.2}, rating: {rating:.2}"
            ));
        }
        if temp_rating >= rating {
            return None;
        }
        if temp_rating + self.alarm_delta_rating_drop > rating {
            return None;
        }
        Some(format!(
            "Rating drop detected: temp rating: {temp_rating:.2}, rating: {rating:.2}"
        ))
    }
}

impl RatingsCheck for RatingsChecker {
    fn check(
        &self,
        ratings: &RatingsMap,
        extra_keys: &[String],
    ) -> Result<Vec<ProblemRecord>, MonitorError> {
        tracing::debug!(
            checker = %self.name,
            num_keys = self.hex_bls_keys.len() + extra_keys.len(),
            "checking ratings"
        );

        let problems = self
            .hex_bls_keys
            .iter()
            .chain(extra_keys)
            .filter(|key| !key.is_empty())
            .filter_map(|key| {
                let record = ratings.get(key)?;
                let status = self.evaluate(record.temp_rating, record.rating)?;
                tracing::debug!(checker = %self.name, bls_key = %key, %status, "flagged key");
                Some(ProblemRecord::new(key.as_str(), status))
            })
            .collect();

        Ok(problems)
    }
}
