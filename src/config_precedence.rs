use anyhow::{Context, Result, bail};
use serde_json::{Map, Value};

use crate::config_types::ConfigDocument;

/// Layers `overrides` on top of `doc`: override keys win, keys unknown to the
/// document land in its extras.
///
/// Used by front ends that accept per-run settings (e.g. from the command
/// line) without touching the settings file.
pub fn with_overrides(
    doc: &ConfigDocument,
    overrides: &Map<String, Value>,
) -> Result<ConfigDocument> {
    let mut merged = match serde_json::to_value(doc)? {
        Value::Object(map) => map,
        other => bail!("settings document serialized to a non-object: {other}"),
    };

    for (key, value) in overrides {
        merged.insert(key.clone(), value.clone());
    }

    serde_json::from_value(Value::Object(merged))
        .with_context(|| "Invalid override: settings document no longer deserializes")
}

/// Parses `key=value` override pairs. Values are read as JSON when possible
/// and kept as plain strings otherwise, so `chunk=1024` is a number and
/// `root=/data` a string.
pub fn parse_overrides<'a>(pairs: impl IntoIterator<Item = &'a str>) -> Result<Map<String, Value>> {
    let mut out = Map::new();

    for pair in pairs {
        let Some((key, raw)) = pair.split_once('=') else {
            bail!("Override must look like key=value (found {pair})");
        };
        let key = key.trim();
        if key.is_empty() {
            bail!("Override key must not be empty (found {pair})");
        }

        let value = serde_json::from_str(raw).unwrap_or_else(|_| Value::String(raw.to_string()));
        out.insert(key.to_string(), value);
    }

    Ok(out)
}
