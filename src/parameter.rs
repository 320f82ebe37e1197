//! Validated runtime parameters.
//!
//! [`ParameterValidator`] runs every field check against a raw
//! [`ConfigDocument`], forwards each check's note to the [`Logger`], and hands
//! back a [`Parameter`] whose values need no further checking.

use std::collections::{BTreeMap, HashSet};
use std::path::{Path, PathBuf};
use std::time::Duration;

use chrono::Local;
use serde_json::{Value, json};

use crate::cleaner::NameCleaner;
use crate::config_types::{ConfigDocument, UrlEntry, url_entries};
use crate::config_value::{
    Checked, DEFAULT_TIMEOUT, Level, NameKey, StorageFormat, check_chunk, check_date_format,
    check_flag, check_folder_name, check_max_pages, check_max_retry, check_max_size, check_mode,
    check_name_format, check_root, check_split, check_storage_format, check_timeout,
};
use crate::cookie::{Cookie, CookieRegister, TokenMap, TokenProvider, add_cookie, check_cookie};
use crate::logger::Logger;
use crate::proxy::{Proxies, ProxyProbe, check_proxies};

/// Read-only collaborators the validator needs.
pub struct Dependencies<'a> {
    pub main_path: PathBuf,
    pub user_agent: String,
    pub logger: &'a dyn Logger,
    pub cleaner: &'a dyn NameCleaner,
    pub ms_token: &'a dyn TokenProvider,
    pub tt_wid: &'a dyn TokenProvider,
    pub register: &'a dyn CookieRegister,
    pub probe: &'a dyn ProxyProbe,
    pub blacklist: HashSet<String>,
}

/// Fully validated settings for one run.
#[derive(Debug, Clone, PartialEq)]
pub struct Parameter {
    main_path: PathBuf,
    headers: BTreeMap<String, String>,
    cookie: TokenMap,
    cookie_cache: Option<String>,
    root: PathBuf,
    folder_name: String,
    name_format: Vec<NameKey>,
    date_format: String,
    split: String,
    music: bool,
    folder_mode: bool,
    storage_format: Option<StorageFormat>,
    dynamic_cover: bool,
    original_cover: bool,
    proxies: Proxies,
    download: bool,
    max_size: u64,
    chunk: u64,
    max_retry: u64,
    max_pages: u64,
    blacklist: HashSet<String>,
    timeout: Duration,
    accounts_urls: Vec<UrlEntry>,
    mix_urls: Vec<UrlEntry>,
    mode: Option<u8>,
}

impl Parameter {
    pub fn main_path(&self) -> &Path {
        &self.main_path
    }
    pub fn headers(&self) -> &BTreeMap<String, String> {
        &self.headers
    }
    pub fn cookie(&self) -> &TokenMap {
        &self.cookie
    }
    /// Raw cookie string awaiting token expansion, when the settings file held
    /// one.
    pub fn cookie_cache(&self) -> Option<&str> {
        self.cookie_cache.as_deref()
    }
    pub fn root(&self) -> &Path {
        &self.root
    }
    pub fn folder_name(&self) -> &str {
        &self.folder_name
    }
    pub fn name_format(&self) -> &[NameKey] {
        &self.name_format
    }
    pub fn date_format(&self) -> &str {
        &self.date_format
    }
    pub fn split(&self) -> &str {
        &self.split
    }
    pub fn music(&self) -> bool {
        self.music
    }
    pub fn folder_mode(&self) -> bool {
        self.folder_mode
    }
    pub fn storage_format(&self) -> Option<StorageFormat> {
        self.storage_format
    }
    pub fn dynamic_cover(&self) -> bool {
        self.dynamic_cover
    }
    pub fn original_cover(&self) -> bool {
        self.original_cover
    }
    pub fn proxies(&self) -> &Proxies {
        &self.proxies
    }
    pub fn download(&self) -> bool {
        self.download
    }
    pub fn max_size(&self) -> u64 {
        self.max_size
    }
    pub fn chunk(&self) -> u64 {
        self.chunk
    }
    pub fn max_retry(&self) -> u64 {
        self.max_retry
    }
    pub fn max_pages(&self) -> u64 {
        self.max_pages
    }
    pub fn blacklist(&self) -> &HashSet<String> {
        &self.blacklist
    }
    pub fn timeout(&self) -> Duration {
        self.timeout
    }
    pub fn accounts_urls(&self) -> &[UrlEntry] {
        &self.accounts_urls
    }
    pub fn mix_urls(&self) -> &[UrlEntry] {
        &self.mix_urls
    }
    pub fn mode(&self) -> Option<u8> {
        self.mode
    }
}

pub struct ParameterValidator<'a> {
    deps: Dependencies<'a>,
}

impl<'a> ParameterValidator<'a> {
    /// Starts the logger; everything after this point may log.
    pub fn new(deps: Dependencies<'a>) -> Self {
        deps.logger.run();
        Self { deps }
    }

    pub fn build(&self, doc: &ConfigDocument) -> Parameter {
        self.build_with_timeout(doc, &json!(DEFAULT_TIMEOUT.as_secs()))
    }

    /// Builds the parameters with an explicit request timeout (seconds), which
    /// is not part of the settings file.
    pub fn build_with_timeout(&self, doc: &ConfigDocument, timeout: &Value) -> Parameter {
        let deps = &self.deps;
        let defaults = ConfigDocument::default();
        let flag = |name: &str, raw: &Value, default: &Value| {
            self.take(check_flag(name, raw, default.as_bool().unwrap_or(false)))
        };

        let cookie = self.take(check_cookie(&doc.cookie));

        Parameter {
            main_path: deps.main_path.clone(),
            headers: BTreeMap::from([("User-Agent".to_string(), deps.user_agent.clone())]),
            cookie: cookie.cookie,
            cookie_cache: cookie.cache,
            root: self.take(check_root(&doc.root, &deps.main_path)),
            folder_name: self.take(check_folder_name(&doc.folder_name, deps.cleaner)),
            name_format: self.take(check_name_format(&doc.name_format)),
            date_format: self.take(check_date_format(&doc.date_format, &Local::now())),
            split: self.take(check_split(&doc.split, deps.cleaner)),
            music: flag("music", &doc.music, &defaults.music),
            folder_mode: flag("folder_mode", &doc.folder_mode, &defaults.folder_mode),
            storage_format: self.take(check_storage_format(&doc.storage_format)),
            dynamic_cover: flag("dynamic_cover", &doc.dynamic_cover, &defaults.dynamic_cover),
            original_cover: flag("original_cover", &doc.original_cover, &defaults.original_cover),
            proxies: self.take(check_proxies(&doc.proxies, deps.probe)),
            download: flag("download", &doc.download, &defaults.download),
            max_size: self.take(check_max_size(&doc.max_size)),
            chunk: self.take(check_chunk(&doc.chunk)),
            max_retry: self.take(check_max_retry(&doc.max_retry)),
            max_pages: self.take(check_max_pages(&doc.max_pages)),
            blacklist: deps.blacklist.clone(),
            timeout: self.take(check_timeout(timeout)),
            accounts_urls: url_entries(&doc.accounts_urls),
            mix_urls: url_entries(&doc.mix_urls),
            mode: self.take(check_mode(&doc.mode)),
        }
    }

    /// Expands `cookie` with fresh tokens from both providers.
    pub fn add_cookie(&self, cookie: Cookie) -> Option<Cookie> {
        add_cookie(cookie, [self.deps.ms_token, self.deps.tt_wid], self.deps.register)
    }

    fn take<T>(&self, checked: Checked<T>) -> T {
        if let Some(note) = checked.note {
            match note.level {
                Level::Info => self.deps.logger.info(&note.message, note.persist),
                Level::Warning => self.deps.logger.warning(&note.message, note.persist),
            }
        }
        checked.value
    }
}

#[cfg(test)]
mod tests {
    use std::cell::{Cell, RefCell};

    use serde_json::json;
    use tempfile::TempDir;

    use super::*;
    use crate::cleaner::Cleaner;
    use crate::cookie::Register;
    use crate::proxy::ProbeError;

    #[derive(Default)]
    struct RecordingLogger {
        runs: Cell<usize>,
        infos: RefCell<Vec<String>>,
        warnings: RefCell<Vec<String>>,
    }

    impl Logger for RecordingLogger {
        fn run(&self) {
            self.runs.set(self.runs.get() + 1);
        }

        fn info(&self, message: &str, _persist: bool) {
            self.infos.borrow_mut().push(message.to_string());
        }

        fn warning(&self, message: &str, _persist: bool) {
            self.warnings.borrow_mut().push(message.to_string());
        }
    }

    struct Token(&'static str, &'static str);

    impl TokenProvider for Token {
        fn fetch(&self) -> anyhow::Result<Option<TokenMap>> {
            Ok(Some(TokenMap::from([(self.0.to_string(), self.1.to_string())])))
        }
    }

    static MS_TOKEN: Token = Token("msToken", "m1");
    static TT_WID: Token = Token("ttwid", "t1");

    struct RefusingProbe;

    impl ProxyProbe for RefusingProbe {
        fn probe(&self, _proxies: &Proxies) -> Result<(), ProbeError> {
            Err(ProbeError::Connection("connection refused".to_string()))
        }
    }

    struct Fixture {
        dir: TempDir,
        logger: RecordingLogger,
    }

    impl Fixture {
        fn new() -> Self {
            Self {
                dir: TempDir::new().expect("tempdir"),
                logger: RecordingLogger::default(),
            }
        }

        fn validator(&self) -> ParameterValidator<'_> {
            ParameterValidator::new(Dependencies {
                main_path: self.dir.path().to_path_buf(),
                user_agent: "test-agent/1.0".to_string(),
                logger: &self.logger,
                cleaner: &Cleaner,
                ms_token: &MS_TOKEN,
                tt_wid: &TT_WID,
                register: &Register,
                probe: &RefusingProbe,
                blacklist: HashSet::from(["7001".to_string()]),
            })
        }
    }

    #[test]
    fn test_default_document_builds_without_warnings() {
        // Arrange
        let fixture = Fixture::new();
        let validator = fixture.validator();

        // Act
        let params = validator.build(&ConfigDocument::default());

        // Assert
        assert_eq!(fixture.logger.runs.get(), 1);
        let warnings = fixture.logger.warnings.borrow();
        assert!(warnings.is_empty(), "{warnings:?}");
        assert_eq!(params.root(), fixture.dir.path());
        assert_eq!(params.folder_name(), "Download");
        assert_eq!(params.name_format(), &[NameKey::CreateTime, NameKey::Nickname, NameKey::Desc]);
        assert_eq!(params.chunk(), 524288);
        assert_eq!(params.max_retry(), 10);
        assert_eq!(params.max_pages(), 99999);
        assert_eq!(params.storage_format(), None);
        assert_eq!(params.mode(), None);
        assert_eq!(params.timeout(), Duration::from_secs(10));
        assert!(params.download());
        assert!(!params.proxies().is_enabled());
        assert_eq!(params.cookie_cache(), Some(""));
        assert_eq!(params.headers().get("User-Agent").map(String::as_str), Some("test-agent/1.0"));
        assert!(params.blacklist().contains("7001"));
        assert_eq!(params.accounts_urls().len(), 1);
        assert_eq!(params.mix_urls().len(), 1);
    }

    #[test]
    fn test_invalid_values_are_replaced_and_warned() {
        // Arrange
        let fixture = Fixture::new();
        let validator = fixture.validator();
        let mut doc = ConfigDocument::default();
        doc.chunk = json!(-1);
        doc.split = json!("a|b");
        doc.storage_format = json!("pdf");
        doc.proxies = json!("http://127.0.0.1:9");
        doc.music = json!("yes");

        // Act
        let params = validator.build(&doc);

        // Assert
        assert_eq!(params.chunk(), 524288);
        assert_eq!(params.split(), "-");
        assert_eq!(params.storage_format(), None);
        assert_eq!(params.proxies(), &Proxies::disabled());
        assert!(!params.music());
        assert_eq!(fixture.logger.warnings.borrow().len(), 5);
    }

    #[test]
    fn test_valid_values_pass_through_unchanged() {
        let fixture = Fixture::new();
        let validator = fixture.validator();
        let mut doc = ConfigDocument::default();
        doc.cookie = json!({ "sessionid": "abc" });
        doc.storage_format = json!("sql");
        doc.max_pages = json!(3);
        doc.mode = json!("4");
        doc.date_format = json!("%Y%m%d");

        let params = validator.build_with_timeout(&doc, &json!(2.5));

        assert_eq!(params.cookie().get("sessionid").map(String::as_str), Some("abc"));
        assert_eq!(params.cookie_cache(), None);
        assert_eq!(params.storage_format(), Some(StorageFormat::Sql));
        assert_eq!(params.max_pages(), 3);
        assert_eq!(params.mode(), Some(4));
        assert_eq!(params.date_format(), "%Y%m%d");
        assert_eq!(params.timeout(), Duration::from_millis(2500));
        assert!(fixture.logger.warnings.borrow().is_empty());
    }

    #[test]
    fn test_oversized_timeout_falls_back_to_default() {
        // Arrange
        let fixture = Fixture::new();
        let validator = fixture.validator();

        // Act
        let params = validator.build_with_timeout(&ConfigDocument::default(), &json!(1e20));

        // Assert
        assert_eq!(params.timeout(), Duration::from_secs(10));
        assert_eq!(fixture.logger.warnings.borrow().len(), 1);
    }

    #[test]
    fn test_large_retry_count_is_kept() {
        let fixture = Fixture::new();
        let validator = fixture.validator();
        let mut doc = ConfigDocument::default();
        doc.max_retry = json!(5_000_000_000_u64);

        let params = validator.build(&doc);

        assert_eq!(params.max_retry(), 5_000_000_000);
        assert!(fixture.logger.warnings.borrow().is_empty());
    }

    #[test]
    fn test_add_cookie_uses_injected_providers() {
        let fixture = Fixture::new();
        let validator = fixture.validator();

        let expanded = validator.add_cookie(Cookie::Raw("sessionid=abc; ".to_string()));

        assert_eq!(
            expanded,
            Some(Cookie::Raw("sessionid=abc; msToken=m1; ttwid=t1; ".to_string()))
        );
    }
}
