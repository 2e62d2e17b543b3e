//! Reads `settings.json` and layers `STARTGATE_*` variables on top.
//!
//! A value set in the environment beats the file, and the file beats the
//! compiled default. The file only needs the keys it changes; everything else
//! keeps its default.

use std::fmt::Display;
use std::ops::RangeInclusive;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use serde_json::Value;
use tracing::{debug, warn};

use crate::errors::Result;
use crate::types::StartgateSettings;

/// `~/.startgate/settings.json`, or under `/tmp` when `HOME` is unset.
pub fn settings_path() -> PathBuf {
    std::env::var_os("HOME")
        .map_or_else(|| PathBuf::from("/tmp"), PathBuf::from)
        .join(".startgate")
        .join("settings.json")
}

/// [`load_settings_from_path`] on [`settings_path`].
pub fn load_settings() -> Result<StartgateSettings> {
    load_settings_from_path(&settings_path())
}

/// File, then environment, then [`StartgateSettings::validate`].
///
/// A missing file is not an error.
pub fn load_settings_from_path(path: &Path) -> Result<StartgateSettings> {
    let mut settings = load_file(path)?;
    apply_env_overrides(&mut settings);
    settings.validate()?;
    Ok(settings)
}

fn load_file(path: &Path) -> Result<StartgateSettings> {
    let defaults = serde_json::to_value(StartgateSettings::default())?;

    let merged = if path.exists() {
        debug!(?path, "reading settings file");
        let overrides: Value = serde_json::from_str(&std::fs::read_to_string(path)?)?;
        deep_merge(defaults, overrides)
    } else {
        debug!(?path, "no settings file");
        defaults
    };

    Ok(serde_json::from_value(merged)?)
}

/// Overlay `overrides` onto `base`.
///
/// Objects merge key by key; any other value in `overrides` replaces the base
/// value outright. `null` leaves the base value alone.
pub fn deep_merge(base: Value, overrides: Value) -> Value {
    match (base, overrides) {
        (Value::Object(mut base), Value::Object(overrides)) => {
            for (key, value) in overrides.into_iter().filter(|(_, v)| !v.is_null()) {
                let merged = match base.remove(&key) {
                    Some(existing) => deep_merge(existing, value),
                    None => value,
                };
                let _ = base.insert(key, merged);
            }
            Value::Object(base)
        }
        (_, overrides) => overrides,
    }
}

/// [`apply_overrides`] reading the process environment.
pub fn apply_env_overrides(settings: &mut StartgateSettings) {
    apply_overrides(settings, |name| std::env::var(name).ok());
}

/// Overlay `STARTGATE_*` values obtained from `lookup`.
///
/// Numbers must parse and fall inside their range. Anything else is logged
/// and skipped; the current value stays.
pub fn apply_overrides<F>(settings: &mut StartgateSettings, lookup: F)
where
    F: Fn(&str) -> Option<String>,
{
    let env = EnvReader { lookup };

    if let Some(v) = env.text("STARTGATE_LISTEN_HOST") {
        settings.listener.host = v;
    }
    if let Some(v) = env.number("STARTGATE_LISTEN_PORT", 1..=u16::MAX) {
        settings.listener.port = v;
    }
    if let Some(v) = env.number("STARTGATE_IDLE_TIMEOUT_SECS", 0..=86_400) {
        settings.listener.idle_timeout_secs = v;
    }
    if let Some(v) = env.number("STARTGATE_MESSAGE_CEILING", 1..=1000) {
        settings.listener.message_ceiling = v;
    }

    if let Some(v) = env.number("STARTGATE_DISPATCH_PORT", 1..=u16::MAX) {
        settings.dispatch.port = v;
    }
    if let Some(v) = env.number("STARTGATE_DISPATCH_CONCURRENCY", 1..=4096) {
        settings.dispatch.max_concurrency = Some(v);
    }
    if let Some(v) = env.number("STARTGATE_CONNECT_TIMEOUT_MS", 1..=600_000) {
        settings.dispatch.connect_timeout_ms = v;
    }

    // Level strings are checked when the subscriber is built.
    if let Some(v) = env.text("STARTGATE_LOG_LEVEL") {
        settings.logging.level = v;
    }
    if let Some(v) = env.text("STARTGATE_LOG_FORMAT") {
        match v.parse() {
            Ok(format) => settings.logging.format = format,
            Err(e) => warn!(key = "STARTGATE_LOG_FORMAT", value = %v, error = %e, "ignoring"),
        }
    }
}

/// Parse `raw` as a number inside `range`.
pub fn parse_in_range<T>(raw: &str, range: RangeInclusive<T>) -> Option<T>
where
    T: FromStr + PartialOrd,
{
    raw.trim().parse().ok().filter(|n| range.contains(n))
}

struct EnvReader<F> {
    lookup: F,
}

impl<F> EnvReader<F>
where
    F: Fn(&str) -> Option<String>,
{
    /// Non-empty value of `name`.
    fn text(&self, name: &str) -> Option<String> {
        (self.lookup)(name).filter(|v| !v.is_empty())
    }

    fn number<T>(&self, name: &str, range: RangeInclusive<T>) -> Option<T>
    where
        T: FromStr + PartialOrd + Display + Copy,
    {
        let raw = (self.lookup)(name)?;
        let parsed = parse_in_range(&raw, range.clone());
        if parsed.is_none() {
            warn!(
                key = name,
                value = %raw,
                min = %range.start(),
                max = %range.end(),
                "out-of-range or non-numeric value, ignoring"
            );
        }
        parsed
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use startgate_logging::LogFormat;

    use super::*;
    use crate::errors::SettingsError;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        move |name| map.get(name).cloned()
    }


    #[test]
    fn merge_nested_override() {
        let target = serde_json::json!({"listener": {"port": 50000, "host": "0.0.0.0"}});
        let source = serde_json::json!({"listener": {"port": 6000}});
        let merged = deep_merge(target, source);
        assert_eq!(merged["listener"]["port"], 6000);
        assert_eq!(merged["listener"]["host"], "0.0.0.0");
    }

    #[test]
    fn merge_skips_null() {
        let target = serde_json::json!({"a": 1});
        let source = serde_json::json!({"a": null});
        assert_eq!(deep_merge(target, source)["a"], 1);
    }

    #[test]
    fn merge_replaces_arrays() {
        let target = serde_json::json!({"a": [1, 2, 3]});
        let source = serde_json::json!({"a": [9]});
        assert_eq!(deep_merge(target, source)["a"], serde_json::json!([9]));
    }


    #[test]
    fn missing_file_yields_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let settings = load_file(&dir.path().join("nope.json")).unwrap();
        assert_eq!(settings.listener.port, 50_000);
    }

    #[test]
    fn file_values_merge_over_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");
        std::fs::write(
            &path,
            r#"{"listener": {"idleTimeoutSecs": 30}, "dispatch": {"maxConcurrency": 8}}"#,
        )
        .unwrap();

        let settings = load_file(&path).unwrap();
        assert_eq!(settings.listener.idle_timeout_secs, 30);
        assert_eq!(settings.listener.port, 50_000);
        assert_eq!(settings.dispatch.max_concurrency, Some(8));
    }

    #[test]
    fn invalid_json_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");
        std::fs::write(&path, "{not json").unwrap();
        assert!(matches!(load_file(&path), Err(SettingsError::Json(_))));
    }

    #[test]
    fn zero_ceiling_in_file_fails_validation() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");
        std::fs::write(&path, r#"{"listener": {"messageCeiling": 0}}"#).unwrap();
        assert!(matches!(
            load_settings_from_path(&path),
            Err(SettingsError::InvalidValue(_))
        ));
    }


    #[test]
    fn overrides_apply() {
        let mut settings = StartgateSettings::default();
        apply_overrides(
            &mut settings,
            lookup_from(&[
                ("STARTGATE_LISTEN_HOST", "127.0.0.1"),
                ("STARTGATE_LISTEN_PORT", "6001"),
                ("STARTGATE_IDLE_TIMEOUT_SECS", "0"),
                ("STARTGATE_MESSAGE_CEILING", "7"),
                ("STARTGATE_DISPATCH_PORT", "6002"),
                ("STARTGATE_DISPATCH_CONCURRENCY", "16"),
                ("STARTGATE_CONNECT_TIMEOUT_MS", "2500"),
                ("STARTGATE_LOG_LEVEL", "debug"),
                ("STARTGATE_LOG_FORMAT", "text"),
            ]),
        );
        assert_eq!(settings.listener.host, "127.0.0.1");
        assert_eq!(settings.listener.port, 6001);
        assert_eq!(settings.listener.idle_timeout_secs, 0);
        assert_eq!(settings.listener.message_ceiling, 7);
        assert_eq!(settings.dispatch.port, 6002);
        assert_eq!(settings.dispatch.max_concurrency, Some(16));
        assert_eq!(settings.dispatch.connect_timeout_ms, 2500);
        assert_eq!(settings.logging.level, "debug");
        assert_eq!(settings.logging.format, LogFormat::Text);
    }

    #[test]
    fn invalid_overrides_are_ignored() {
        let mut settings = StartgateSettings::default();
        apply_overrides(
            &mut settings,
            lookup_from(&[
                ("STARTGATE_LISTEN_PORT", "0"),
                ("STARTGATE_MESSAGE_CEILING", "0"),
                ("STARTGATE_DISPATCH_CONCURRENCY", "many"),
                ("STARTGATE_LOG_FORMAT", "xml"),
                ("STARTGATE_LISTEN_HOST", ""),
            ]),
        );
        assert_eq!(settings.listener.port, 50_000);
        assert_eq!(settings.listener.message_ceiling, 5);
        assert_eq!(settings.dispatch.max_concurrency, None);
        assert_eq!(settings.logging.format, LogFormat::Json);
        assert_eq!(settings.listener.host, "0.0.0.0");
    }

    #[test]
    fn range_parsing() {
        assert_eq!(parse_in_range::<u16>("50000", 1..=u16::MAX), Some(50_000));
        assert_eq!(parse_in_range::<u16>("70000", 1..=u16::MAX), None);
        assert_eq!(parse_in_range::<u64>(" 5 ", 1..=10), Some(5));
        assert_eq!(parse_in_range::<u64>("-1", 0..=10), None);
        assert_eq!(parse_in_range::<usize>("0", 1..=10), None);
        assert_eq!(parse_in_range::<u32>("1001", 1..=1000), None);
    }
}
