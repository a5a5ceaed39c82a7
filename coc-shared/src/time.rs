//! Epoch-millisecond timestamp helpers.
//!
//! Internally we hold `DateTime<Utc>` (so `chrono`'s arithmetic and
//! formatting are available everywhere) but the wire format is epoch
//! milliseconds, so every public struct serializes through this module's
//! (de)serialize functions instead of chrono's default RFC3339.

use chrono::{DateTime, TimeZone, Utc};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

pub fn now() -> DateTime<Utc> {
    Utc::now()
}

pub fn to_millis(ts: DateTime<Utc>) -> i64 {
    ts.timestamp_millis()
}

pub fn from_millis(ms: i64) -> DateTime<Utc> {
    Utc.timestamp_millis_opt(ms).single().unwrap_or_else(Utc::now)
}

pub mod millis {
    use super::*;

    pub fn serialize<S: Serializer>(ts: &DateTime<Utc>, s: S) -> Result<S::Ok, S::Error> {
        to_millis(*ts).serialize(s)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<DateTime<Utc>, D::Error> {
        let ms = i64::deserialize(d)?;
        Ok(from_millis(ms))
    }
}

pub mod millis_opt {
    use super::*;

    pub fn serialize<S: Serializer>(ts: &Option<DateTime<Utc>>, s: S) -> Result<S::Ok, S::Error> {
        ts.map(to_millis).serialize(s)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(
        d: D,
    ) -> Result<Option<DateTime<Utc>>, D::Error> {
        let ms: Option<i64> = Option::deserialize(d)?;
        Ok(ms.map(from_millis))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_through_millis() {
        let ts = now();
        let ms = to_millis(ts);
        let back = from_millis(ms);
        assert_eq!(to_millis(back), ms);
    }
}
