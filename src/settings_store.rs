//! Persistence for `settings.json`.
//!
//! The store never hands a broken document to the caller: malformed JSON and
//! incomplete documents both degrade to the built-in defaults, with the user
//! told why on the console. Only [`SettingsStore::update`] reports failures.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use serde::Serialize;
use serde_json::ser::PrettyFormatter;
use serde_json::{Map, Value};
use thiserror::Error;
use tracing::{debug, warn};

use crate::config_types::ConfigDocument;
use crate::console::{Console, Style};

pub const SETTINGS_FILE: &str = "settings.json";

/// Error type for writing the settings file.
#[derive(Debug, Error)]
pub enum SettingsError {
    /// A file system I/O error occurred.
    #[error("I/O error accessing settings at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// The document could not be serialized to JSON.
    #[error("failed to serialize settings: {0}")]
    Serialize(#[from] serde_json::Error),
}

pub struct SettingsStore<'a> {
    file: PathBuf,
    console: &'a dyn Console,
}

impl<'a> SettingsStore<'a> {
    pub fn new(root: &Path, console: &'a dyn Console) -> Self {
        Self {
            file: root.join(SETTINGS_FILE),
            console,
        }
    }

    pub fn path(&self) -> &Path {
        &self.file
    }

    /// Reads the settings file, creating it with defaults on first run.
    pub fn read(&self) -> ConfigDocument {
        let content = match fs::read_to_string(&self.file) {
            Ok(content) => content,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return self.create(),
            Err(e) => {
                self.console.print(
                    &format!("failed to read settings file {}: {e}", self.file.display()),
                    Style::Error,
                );
                return ConfigDocument::default();
            }
        };

        let object = match serde_json::from_str::<Value>(&content) {
            Ok(Value::Object(object)) => object,
            Ok(other) => {
                warn!(found = %json_type(&other), "settings document is not a JSON object");
                return self.malformed();
            }
            Err(e) => {
                warn!(error = %e, "settings document is not valid JSON");
                return self.malformed();
            }
        };

        let missing = missing_keys(&object);
        if !missing.is_empty() {
            debug!(?missing, "settings document is incomplete");
            return self.check_completeness(&missing);
        }

        match serde_json::from_value::<ConfigDocument>(Value::Object(object)) {
            Ok(doc) => doc,
            Err(e) => {
                warn!(error = %e, "settings document does not match the settings layout");
                self.malformed()
            }
        }
    }

    fn malformed(&self) -> ConfigDocument {
        self.console.print(
            &format!("{SETTINGS_FILE} is not valid JSON, please check its format!"),
            Style::Error,
        );
        ConfigDocument::default()
    }

    /// Handles a document that parsed but lacks required keys.
    ///
    /// Declining regeneration leaves the file as-is and runs on defaults; the
    /// user is reminded of that divergence each time it happens.
    fn check_completeness(&self, missing: &[String]) -> ConfigDocument {
        let answer = self.console.input(&format!(
            "{SETTINGS_FILE} is missing required settings ({}), \
             regenerate the default file? (YES/NO): ",
            missing.join(", ")
        ));

        if answer.trim().eq_ignore_ascii_case("YES") {
            return self.create();
        }

        warn!(path = %self.file.display(), "running on defaults; settings file left incomplete");
        self.console.print(
            &format!(
                "{SETTINGS_FILE} was left unchanged; \
                 this run uses the default settings, which differ from the file!"
            ),
            Style::Warning,
        );
        ConfigDocument::default()
    }

    /// Writes the default document and tells the user to finish setup.
    pub fn create(&self) -> ConfigDocument {
        let defaults = ConfigDocument::default();

        match self.write(&defaults) {
            Ok(()) => self.console.print(
                &format!(
                    "Created default {SETTINGS_FILE}!\n\
                     Set a cookie as described in the quick start guide, \
                     then run the program again.\n\
                     Adjust {SETTINGS_FILE} to your needs.\n"
                ),
                Style::General,
            ),
            Err(e) => self.console.print(
                &format!("failed to create default settings: {e}"),
                Style::Error,
            ),
        }

        defaults
    }

    /// Overwrites the settings file with `settings`.
    ///
    /// Accepts the typed document as well as any other serializable map, e.g.
    /// a `serde_json::Map` assembled by a front end.
    pub fn update<T: Serialize + ?Sized>(&self, settings: &T) -> Result<(), SettingsError> {
        self.write(settings)?;
        self.console.print("Settings saved!", Style::Info);
        Ok(())
    }

    fn write<T: Serialize + ?Sized>(&self, settings: &T) -> Result<(), SettingsError> {
        let content = to_json_pretty(settings)?;

        if let Some(dir) = self.file.parent() {
            fs::create_dir_all(dir).map_err(|source| SettingsError::Io {
                path: dir.to_path_buf(),
                source,
            })?;
        }

        fs::write(&self.file, content).map_err(|source| SettingsError::Io {
            path: self.file.clone(),
            source,
        })
    }
}

/// Default keys absent from `object`, sorted by name.
fn missing_keys(object: &Map<String, Value>) -> Vec<String> {
    match serde_json::to_value(ConfigDocument::default()) {
        Ok(Value::Object(defaults)) => defaults
            .keys()
            .filter(|key| !object.contains_key(*key))
            .cloned()
            .collect(),
        _ => Vec::new(),
    }
}

fn json_type(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// Four-space indented JSON; serde_json never escapes non-ASCII text.
fn to_json_pretty<T: Serialize + ?Sized>(value: &T) -> Result<Vec<u8>, serde_json::Error> {
    let mut buf = Vec::new();
    let formatter = PrettyFormatter::with_indent(b"    ");
    let mut ser = serde_json::Serializer::with_formatter(&mut buf, formatter);
    value.serialize(&mut ser)?;
    Ok(buf)
}
