use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Transparent wrapper around [`chrono::DateTime<Utc>`] used on every wire
/// model so serialization stays uniform across the API surface.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize, ToSchema)]
#[serde(transparent)]
pub struct Timestamp(pub DateTime<Utc>);

impl Timestamp {
    /// Epoch seconds, the score unit used by the activity store.
    #[must_use]
    pub fn epoch_secs(&self) -> f64 {
        self.0.timestamp() as f64
    }
}

impl From<DateTime<Utc>> for Timestamp {
    fn from(value: DateTime<Utc>) -> Self {
        Self(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn serializes_transparently() {
        let dt = Utc.with_ymd_and_hms(2025, 6, 1, 9, 30, 0).unwrap();
        let ts = Timestamp(dt);
        let json = serde_json::to_string(&ts).unwrap();
        assert_eq!(json, serde_json::to_string(&dt).unwrap());

        let back: Timestamp = serde_json::from_str(&json).unwrap();
        assert_eq!(back, ts);
    }

    #[test]
    fn epoch_secs_matches_chrono() {
        let dt = Utc.with_ymd_and_hms(2025, 6, 1, 9, 30, 0).unwrap();
        assert_eq!(Timestamp(dt).epoch_secs(), dt.timestamp() as f64);
    }
}
