//! Settings persistence and validation for the downloader.
//!
//! [`SettingsStore`] keeps `settings.json` on disk and always yields a usable
//! [`ConfigDocument`]; [`ParameterValidator`] turns that document into the
//! checked [`Parameter`] set the rest of the program runs on.

pub mod cleaner;
pub mod config_precedence;
pub mod config_types;
pub mod config_value;
pub mod console;
pub mod cookie;
pub mod logger;
pub mod parameter;
pub mod proxy;
pub mod settings_store;

pub use cleaner::{Cleaner, NameCleaner};
pub use config_types::{ConfigDocument, UrlEntry};
pub use config_value::{NameKey, StorageFormat};
pub use console::{Console, StdConsole, Style};
pub use cookie::{Cookie, CookieRegister, Register, TokenMap, TokenProvider};
pub use logger::{Logger, TracingLogger};
pub use parameter::{Dependencies, Parameter, ParameterValidator};
pub use proxy::{HttpProbe, ProbeError, Proxies, ProxyProbe};
pub use settings_store::{SettingsError, SettingsStore};
