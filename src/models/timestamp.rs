//! Timestamp (de)serialization helpers
//!
//! The prompt service sends `expiresAt` as an RFC 3339 string, while the
//! credential file has always stored epoch milliseconds. Both forms are
//! accepted on input.

use chrono::{DateTime, TimeZone, Utc};
use serde::{de, Deserialize, Deserializer, Serializer};
use serde_json::Value;

/// Interpret a JSON value as a UTC timestamp
pub fn parse_value(value: &Value) -> Option<DateTime<Utc>> {
    match value {
        Value::Number(n) => n
            .as_i64()
            .or_else(|| n.as_f64().map(|f| f as i64))
            .and_then(from_millis),
        Value::String(s) => {
            let s = s.trim();
            DateTime::parse_from_rfc3339(s)
                .ok()
                .map(|dt| dt.with_timezone(&Utc))
                .or_else(|| s.parse::<i64>().ok().and_then(from_millis))
        }
        _ => None,
    }
}

fn from_millis(ms: i64) -> Option<DateTime<Utc>> {
    Utc.timestamp_millis_opt(ms).single()
}

/// Required timestamp, written as RFC 3339
pub mod flexible {
    use super::*;

    pub fn serialize<S: Serializer>(dt: &DateTime<Utc>, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_str(&dt.to_rfc3339())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<DateTime<Utc>, D::Error> {
        let value = Value::deserialize(d)?;
        parse_value(&value).ok_or_else(|| de::Error::custom("invalid timestamp"))
    }
}

/// Optional timestamp, written as RFC 3339
pub mod option {
    use super::*;

    pub fn serialize<S: Serializer>(dt: &Option<DateTime<Utc>>, s: S) -> Result<S::Ok, S::Error> {
        match dt {
            Some(dt) => s.serialize_some(&dt.to_rfc3339()),
            None => s.serialize_none(),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(
        d: D,
    ) -> Result<Option<DateTime<Utc>>, D::Error> {
        let value = Option::<Value>::deserialize(d)?;
        match value {
            None | Some(Value::Null) => Ok(None),
            Some(v) => parse_value(&v)
                .map(Some)
                .ok_or_else(|| de::Error::custom("invalid timestamp")),
        }
    }
}

/// Optional timestamp, written as epoch milliseconds
pub mod option_millis {
    use super::*;

    pub fn serialize<S: Serializer>(dt: &Option<DateTime<Utc>>, s: S) -> Result<S::Ok, S::Error> {
        match dt {
            Some(dt) => s.serialize_some(&dt.timestamp_millis()),
            None => s.serialize_none(),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(
        d: D,
    ) -> Result<Option<DateTime<Utc>>, D::Error> {
        option::deserialize(d)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse_rfc3339() {
        let dt = parse_value(&json!("2025-01-01T00:00:00.000Z")).unwrap();
        assert_eq!(dt.timestamp_millis(), 1_735_689_600_000);
    }

    #[test]
    fn test_parse_millis() {
        let dt = parse_value(&json!(1_735_689_600_000i64)).unwrap();
        assert_eq!(dt.to_rfc3339(), "2025-01-01T00:00:00+00:00");
    }

    #[test]
    fn test_parse_invalid() {
        assert!(parse_value(&json!("tomorrow")).is_none());
        assert!(parse_value(&json!(true)).is_none());
    }
}
