//! Per-field checks turning raw settings values into typed, in-range values.
//!
//! Every check is total: it returns a [`Checked`] holding either the accepted
//! value or the documented fallback, plus an optional [`Note`] describing what
//! happened. Nothing here logs; the caller decides where notes go.

use std::fmt::{self, Write};
use std::path::{Path, PathBuf};
use std::time::Duration;

use chrono::format::{Item, StrftimeItems};
use chrono::{DateTime, TimeZone};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::cleaner::NameCleaner;
use crate::config_types::DEFAULT_CHUNK;

pub const DEFAULT_FOLDER_NAME: &str = "Download";
pub const DEFAULT_DATE_FORMAT: &str = "%Y-%m-%d %H.%M.%S";
pub const DEFAULT_SPLIT: &str = "-";
pub const DEFAULT_MAX_PAGES: u64 = 99999;
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Level {
    Info,
    Warning,
}

/// Human-readable outcome of a check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Note {
    pub level: Level,
    pub message: String,
    pub persist: bool,
}

/// Value produced by a check, with its optional note.
#[derive(Debug, Clone, PartialEq)]
pub struct Checked<T> {
    pub value: T,
    pub note: Option<Note>,
}

impl<T> Checked<T> {
    fn silent(value: T) -> Self {
        Self { value, note: None }
    }

    /// Accepted value, logged without persisting.
    fn accepted(value: T, message: String) -> Self {
        Self {
            value,
            note: Some(Note {
                level: Level::Info,
                message,
                persist: false,
            }),
        }
    }

    fn info(value: T, message: String, persist: bool) -> Self {
        Self {
            value,
            note: Some(Note {
                level: Level::Info,
                message,
                persist,
            }),
        }
    }

    fn warning(value: T, message: String, persist: bool) -> Self {
        Self {
            value,
            note: Some(Note {
                level: Level::Warning,
                message,
                persist,
            }),
        }
    }

    pub fn is_warning(&self) -> bool {
        matches!(&self.note, Some(n) if n.level == Level::Warning)
    }
}

/// Tokens allowed in `name_format`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum NameKey {
    Id,
    Desc,
    CreateTime,
    Nickname,
    Uid,
    Mark,
}

impl NameKey {
    pub fn parse(token: &str) -> Option<Self> {
        match token {
            "id" => Some(Self::Id),
            "desc" => Some(Self::Desc),
            "create_time" => Some(Self::CreateTime),
            "nickname" => Some(Self::Nickname),
            "uid" => Some(Self::Uid),
            "mark" => Some(Self::Mark),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Id => "id",
            Self::Desc => "desc",
            Self::CreateTime => "create_time",
            Self::Nickname => "nickname",
            Self::Uid => "uid",
            Self::Mark => "mark",
        }
    }
}

pub const DEFAULT_NAME_FORMAT: [NameKey; 3] =
    [NameKey::CreateTime, NameKey::Nickname, NameKey::Desc];

/// Export format for extracted records.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageFormat {
    Xlsx,
    Csv,
    Sql,
}

impl StorageFormat {
    pub fn parse(raw: &str) -> Option<Self> {
        match raw {
            "xlsx" => Some(Self::Xlsx),
            "csv" => Some(Self::Csv),
            "sql" => Some(Self::Sql),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Xlsx => "xlsx",
            Self::Csv => "csv",
            Self::Sql => "sql",
        }
    }
}

impl fmt::Display for StorageFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Renders a raw value the way the user typed it: strings without quotes.
fn shown(raw: &Value) -> String {
    match raw {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

pub fn check_root(raw: &Value, main_path: &Path) -> Checked<PathBuf> {
    match raw {
        Value::String(s) if !s.is_empty() && Path::new(s).is_dir() => {
            Checked::accepted(PathBuf::from(s), format!("root set to {s}"))
        }
        Value::String(s) if s.is_empty() => Checked::silent(main_path.to_path_buf()),
        Value::Null => Checked::silent(main_path.to_path_buf()),
        other => Checked::warning(
            main_path.to_path_buf(),
            format!(
                "root {} is not a valid folder, using the program folder {} instead",
                shown(other),
                main_path.display()
            ),
            true,
        ),
    }
}

pub fn check_folder_name(raw: &Value, cleaner: &dyn NameCleaner) -> Checked<String> {
    if let Some(s) = raw.as_str() {
        let cleaned = cleaner.clean_name(s, false);
        if !cleaned.is_empty() {
            let message = format!("folder_name set to {cleaned}");
            return Checked::accepted(cleaned, message);
        }
    }

    Checked::warning(
        DEFAULT_FOLDER_NAME.to_string(),
        format!(
            "folder_name {} is not a valid folder name, using default {DEFAULT_FOLDER_NAME}",
            shown(raw)
        ),
        true,
    )
}

pub fn check_name_format(raw: &Value) -> Checked<Vec<NameKey>> {
    let parsed = raw.as_str().and_then(|s| {
        let keys: Option<Vec<NameKey>> = s.split_whitespace().map(NameKey::parse).collect();
        keys.filter(|k| !k.is_empty())
    });

    match parsed {
        Some(keys) => Checked::accepted(keys, format!("name_format set to {}", shown(raw))),
        None => Checked::warning(
            DEFAULT_NAME_FORMAT.to_vec(),
            format!(
                "name_format {} is invalid, using default: create_time nickname desc",
                shown(raw)
            ),
            true,
        ),
    }
}

/// Accepts a strftime pattern when it contains no unknown specifier and
/// renders `now` without error.
pub fn check_date_format<Tz>(raw: &Value, now: &DateTime<Tz>) -> Checked<String>
where
    Tz: TimeZone,
    Tz::Offset: fmt::Display,
{
    if let Some(pattern) = raw.as_str() {
        let items: Vec<Item<'_>> = StrftimeItems::new(pattern).collect();
        let valid = !items.iter().any(|i| matches!(i, Item::Error));

        let mut rendered = String::new();
        if valid && write!(rendered, "{}", now.format_with_items(items.into_iter())).is_ok() {
            return Checked::accepted(pattern.to_string(), format!("date_format set to {pattern}"));
        }
    }

    Checked::warning(
        DEFAULT_DATE_FORMAT.to_string(),
        format!(
            "date_format {} is invalid, using default: {DEFAULT_DATE_FORMAT}",
            shown(raw)
        ),
        true,
    )
}

pub fn check_split(raw: &Value, cleaner: &dyn NameCleaner) -> Checked<String> {
    match raw.as_str() {
        Some(s) if !s.chars().any(|c| cleaner.is_illegal(c)) => {
            Checked::accepted(s.to_string(), format!("split set to {s}"))
        }
        _ => Checked::warning(
            DEFAULT_SPLIT.to_string(),
            format!(
                "split {} contains illegal characters, using default: {DEFAULT_SPLIT}",
                shown(raw)
            ),
            true,
        ),
    }
}

/// Empty or null disables export and is reported as info.
pub fn check_storage_format(raw: &Value) -> Checked<Option<StorageFormat>> {
    match raw {
        Value::String(s) => match StorageFormat::parse(s) {
            Some(format) => {
                Checked::accepted(Some(format), format!("storage_format set to {format}"))
            }
            None if s.is_empty() => unset_storage_format(),
            None => invalid_storage_format(raw),
        },
        Value::Null => unset_storage_format(),
        other => invalid_storage_format(other),
    }
}

fn unset_storage_format() -> Checked<Option<StorageFormat>> {
    Checked::info(
        None,
        "storage_format not set, extracted data will not be saved to a file".to_string(),
        true,
    )
}

fn invalid_storage_format(raw: &Value) -> Checked<Option<StorageFormat>> {
    Checked::warning(
        None,
        format!(
            "storage_format {} is invalid, extracted data will not be saved to a file",
            shown(raw)
        ),
        true,
    )
}

/// Negative sizes clamp to 0, which means "no limit".
pub fn check_max_size(raw: &Value) -> Checked<u64> {
    if let Some(n) = raw.as_u64() {
        return Checked::accepted(n, format!("max_size set to {n}"));
    }
    if raw.as_i64().is_some() {
        return Checked::accepted(0, "max_size set to 0".to_string());
    }

    Checked::warning(0, format!("max_size {} is invalid, using default: 0", shown(raw)), false)
}

pub fn check_chunk(raw: &Value) -> Checked<u64> {
    match raw.as_u64() {
        Some(n) if n > 0 => Checked::accepted(n, format!("chunk set to {n}")),
        _ => Checked::warning(
            DEFAULT_CHUNK,
            format!("chunk {} is invalid, using default: {DEFAULT_CHUNK}", shown(raw)),
            false,
        ),
    }
}

pub fn check_max_retry(raw: &Value) -> Checked<u64> {
    match raw.as_u64() {
        Some(n) => Checked::accepted(n, format!("max_retry set to {n}")),
        None => Checked::warning(
            0,
            format!("max_retry {} is invalid, using default: 0", shown(raw)),
            false,
        ),
    }
}

/// `0` means "unset" and maps to the default without complaint.
pub fn check_max_pages(raw: &Value) -> Checked<u64> {
    match raw.as_u64() {
        Some(0) => Checked::silent(DEFAULT_MAX_PAGES),
        Some(n) => Checked::accepted(n, format!("max_pages set to {n}")),
        None => Checked::warning(
            DEFAULT_MAX_PAGES,
            format!(
                "max_pages {} is invalid, using default: {DEFAULT_MAX_PAGES}",
                shown(raw)
            ),
            false,
        ),
    }
}

/// Request timeout given in seconds. Values a [`Duration`] cannot hold, or
/// that round down to zero, fall back to the default.
pub fn check_timeout(raw: &Value) -> Checked<Duration> {
    let timeout = raw
        .as_f64()
        .filter(|t| *t > 0.0)
        .and_then(|t| Duration::try_from_secs_f64(t).ok())
        .filter(|d| !d.is_zero());

    match timeout {
        Some(d) => Checked::accepted(d, format!("timeout set to {}", shown(raw))),
        None => Checked::warning(
            DEFAULT_TIMEOUT,
            format!(
                "timeout {} is invalid, using default: {}",
                shown(raw),
                DEFAULT_TIMEOUT.as_secs()
            ),
            true,
        ),
    }
}

/// Download mode selector; only values 3 through 6 are meaningful.
///
/// Non-numeric input is reported. Empty, null and out-of-range numbers quietly
/// mean "no mode".
pub fn check_mode(raw: &Value) -> Checked<Option<u8>> {
    let number = match raw {
        Value::Null => return Checked::silent(None),
        Value::String(s) if s.is_empty() => return Checked::silent(None),
        Value::String(s) => s.trim().parse::<i64>().ok(),
        Value::Number(n) => n.as_i64(),
        _ => None,
    };

    match number {
        Some(n) if (3..7).contains(&n) => {
            let mode = n as u8;
            Checked::accepted(Some(mode), format!("mode set to {mode}"))
        }
        Some(_) => Checked::silent(None),
        None => Checked::warning(None, format!("mode {} is invalid", shown(raw)), true),
    }
}

/// Boolean switches; anything else falls back to the switch's default.
pub fn check_flag(name: &str, raw: &Value, default: bool) -> Checked<bool> {
    match raw.as_bool() {
        Some(b) => Checked::accepted(b, format!("{name} set to {b}")),
        None => Checked::warning(
            default,
            format!("{name} {} is not true or false, using default: {default}", shown(raw)),
            true,
        ),
    }
}
