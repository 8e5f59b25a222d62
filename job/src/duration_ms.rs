use std::time::Duration;

use serde::{ser::Error, Deserialize, Deserializer, Serializer};

/// Whole milliseconds only, so a saved job loads back unchanged.
pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    if duration.subsec_nanos() % 1_000_000 != 0 {
        return Err(S::Error::custom(format!(
            "print duration {:?} is not a whole number of milliseconds",
            duration
        )));
    }
    let millis = u64::try_from(duration.as_millis()).map_err(|_| {
        S::Error::custom(format!("print duration {:?} does not fit in u64 milliseconds", duration))
    })?;
    serializer.serialize_u64(millis)
}

pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
where
    D: Deserializer<'de>,
{
    u64::deserialize(deserializer).map(Duration::from_millis)
}
