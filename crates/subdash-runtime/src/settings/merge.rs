#![forbid(unsafe_code)]

//! Merging a persisted or imported blob with the default record.
//!
//! Older blobs may lack keys added since they were written, or carry `null`
//! where a map is expected. The merge is a shallow overlay of the blob onto
//! the defaults:
//!
//! - top-level `null` values are skipped, so the default survives
//! - `dashboardWidgets` merges field by field over the default layout
//! - `chartPreferences` entries merge over a default [`ChartPreference`]
//!
//! [`merge_with_defaults`] rejects the whole blob when any field has the
//! wrong type. [`merge_field_by_field`] keeps the default for that field
//! only and reports its key; loads use it so a field written by a newer or
//! older build does not reset the rest of the record.
//!
//! [`ChartPreference`]: super::types::ChartPreference

use serde_json::{Map, Value};

use super::SettingsError;
use super::types::UserSettings;

/// Keys whose object values merge one level deeper than the rest.
const DEEP_KEYS: [&str; 2] = ["dashboardWidgets", "chartPreferences"];

/// Overlay `blob` onto [`UserSettings::default`].
///
/// # Errors
///
/// [`SettingsError::InvalidShape`] when `blob` is not an object or a present
/// field has the wrong type.
pub fn merge_with_defaults(blob: Value) -> Result<UserSettings, SettingsError> {
    let overlay = overlay_of(blob)?;
    // Missing keys fall back to `#[serde(default)]`.
    serde_json::from_value(Value::Object(overlay))
        .map_err(|e| SettingsError::InvalidShape(e.to_string()))
}

/// Overlay `blob` onto [`UserSettings::default`] one top-level key at a time.
///
/// Returns the merged record and the keys whose values did not fit their
/// field; those fields keep their defaults.
///
/// # Errors
///
/// [`SettingsError::InvalidShape`] when `blob` is not an object.
pub fn merge_field_by_field(blob: Value) -> Result<(UserSettings, Vec<String>), SettingsError> {
    let overlay = overlay_of(blob)?;
    let mut accepted = Map::with_capacity(overlay.len());
    let mut rejected = Vec::new();
    for (key, value) in overlay {
        let single = Map::from_iter([(key.clone(), value)]);
        match serde_json::from_value::<UserSettings>(Value::Object(single.clone())) {
            Ok(_) => accepted.extend(single),
            Err(_) => rejected.push(key),
        }
    }
    let record = serde_json::from_value(Value::Object(accepted))
        .map_err(|e| SettingsError::InvalidShape(e.to_string()))?;
    Ok((record, rejected))
}

fn overlay_of(blob: Value) -> Result<Map<String, Value>, SettingsError> {
    let Value::Object(fields) = blob else {
        return Err(SettingsError::InvalidShape(format!(
            "expected a settings object, found {}",
            kind_of(&blob)
        )));
    };

    let mut overlay = Map::with_capacity(fields.len());
    for (key, value) in fields {
        match value {
            Value::Null => {}
            Value::Object(inner) if DEEP_KEYS.contains(&key.as_str()) => {
                overlay.insert(key, Value::Object(strip_nulls(inner)));
            }
            other => {
                overlay.insert(key, other);
            }
        }
    }
    Ok(overlay)
}

fn strip_nulls(fields: Map<String, Value>) -> Map<String, Value> {
    fields
        .into_iter()
        .filter_map(|(key, value)| match value {
            Value::Null => None,
            Value::Object(inner) => Some((key, Value::Object(strip_nulls(inner)))),
            other => Some((key, other)),
        })
        .collect()
}

fn kind_of(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
