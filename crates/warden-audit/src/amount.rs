// amount.rs — Serde adapter for token amounts.
//
// Amounts are u128 base units (18 decimals by default), which overflow JSON
// number precision in most consumers and are not supported inside
// internally tagged enums. They are written as decimal strings instead.
//
// Use with `#[serde(with = "warden_audit::amount")]`.

use serde::{de, Deserialize, Deserializer, Serializer};

pub fn serialize<S: Serializer>(value: &u128, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_str(&value.to_string())
}

pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<u128, D::Error> {
    let raw = String::deserialize(deserializer)?;
    raw.parse::<u128>().map_err(de::Error::custom)
}
