//! Serde helpers for durations written either as plain seconds or as
//! humantime strings such as `"30s"`, `"1h30m"` or `"24h"`.

use serde::{Deserialize, Deserializer, Serializer};
use std::time::Duration;

#[derive(Deserialize)]
#[serde(untagged)]
enum RawDuration {
    Seconds(u64),
    Text(String),
}

impl RawDuration {
    fn into_duration<E: serde::de::Error>(self) -> Result<Duration, E> {
        match self {
            RawDuration::Seconds(secs) => Ok(Duration::from_secs(secs)),
            RawDuration::Text(text) => humantime::parse_duration(text.trim())
                .map_err(|e| E::custom(format!("Invalid duration '{text}': {e}"))),
        }
    }
}

pub mod duration {
    use super::*;

    pub fn serialize<S: Serializer>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&humantime::format_duration(*duration).to_string())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        RawDuration::deserialize(deserializer)?.into_duration()
    }
}

pub mod option_duration {
    use super::*;

    pub fn serialize<S: Serializer>(
        duration: &Option<Duration>,
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        match duration {
            Some(d) => serializer.serialize_some(&humantime::format_duration(*d).to_string()),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<Option<Duration>, D::Error> {
        Option::<RawDuration>::deserialize(deserializer)?
            .map(RawDuration::into_duration)
            .transpose()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Serialize;

    #[derive(Serialize, Deserialize)]
    struct Holder {
        #[serde(with = "duration")]
        ttl: Duration,
        #[serde(default, with = "option_duration", skip_serializing_if = "Option::is_none")]
        timeout: Option<Duration>,
    }

    #[test]
    fn accepts_seconds_and_humantime() {
        let h: Holder = toml::from_str("ttl = \"20m\"\ntimeout = 45").unwrap();
        assert_eq!(h.ttl, Duration::from_secs(1200));
        assert_eq!(h.timeout, Some(Duration::from_secs(45)));

        let h: Holder = toml::from_str("ttl = 90").unwrap();
        assert_eq!(h.ttl, Duration::from_secs(90));
        assert_eq!(h.timeout, None);
    }

    #[test]
    fn rejects_garbage() {
        assert!(toml::from_str::<Holder>("ttl = \"soon\"").is_err());
    }

    #[test]
    fn serializes_as_humantime() {
        let h = Holder {
            ttl: Duration::from_secs(86_400),
            timeout: None,
        };
        let text = toml::to_string(&h).unwrap();
        assert!(text.contains("ttl = \"1day\""), "{text}");
    }
}
