// ABOUTME: Custom serde deserializers for config values.
// ABOUTME: Validates the API version prefix and the payload limit while parsing.

use serde::Deserialize;

pub fn deserialize_api_version<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let s = String::deserialize(deserializer)?;
    let version = s.trim().trim_matches('/');
    if !version.starts_with('v') || version.len() < 2 {
        return Err(serde::de::Error::custom(format!(
            "api_version must look like v1.41, got {s:?}"
        )));
    }
    Ok(version.to_string())
}

pub fn deserialize_max_payload<'de, D>(deserializer: D) -> Result<u32, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let value = u32::deserialize(deserializer)?;
    if value == 0 {
        return Err(serde::de::Error::custom("max_payload must be greater than zero"));
    }
    Ok(value)
}
