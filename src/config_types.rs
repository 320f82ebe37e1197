use serde::{Deserialize, Serialize};
use serde_json::{Map, Value, json};

/// Raw settings document as stored in `settings.json`.
///
/// Every field keeps the untrusted JSON value the user wrote; typing happens in
/// [`crate::parameter::ParameterValidator`]. All known keys are required when
/// deserializing, so a document missing one of them fails with a serde
/// "missing field" data error. Unknown keys survive a read/write cycle through
/// `extra`.
///
/// ```JSON
/// {
///     "accounts_urls": [{ "mark": "", "url": "https://..." }],
///     "root": "",
///     "chunk": 524288,
///     "mode": null
/// }
/// ```
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct ConfigDocument {
    pub accounts_urls: Value,
    pub mix_urls: Value,
    pub root: Value,
    pub folder_name: Value,
    pub name_format: Value,
    pub date_format: Value,
    pub split: Value,
    pub folder_mode: Value,
    pub music: Value,
    pub storage_format: Value,
    pub cookie: Value,
    pub dynamic_cover: Value,
    pub original_cover: Value,
    pub proxies: Value,
    pub download: Value,
    pub max_size: Value,
    pub chunk: Value,
    pub max_retry: Value,
    pub max_pages: Value,
    pub mode: Value,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

pub const DEFAULT_CHUNK: u64 = 512 * 1024;

impl Default for ConfigDocument {
    fn default() -> Self {
        Self {
            accounts_urls: json!([{
                "mark": "账号标识，可以设置为空字符串",
                "url": "账号主页链接",
                "tab": "账号主页类型",
                "earliest": "作品最早发布日期",
                "latest": "作品最晚发布日期"
            }]),
            mix_urls: json!([{
                "mark": "合集标识，可以设置为空字符串",
                "url": "合集链接或者作品链接"
            }]),
            root: json!(""),
            folder_name: json!("Download"),
            name_format: json!("create_time nickname desc"),
            date_format: json!("%Y-%m-%d %H.%M.%S"),
            split: json!("-"),
            folder_mode: json!(false),
            music: json!(false),
            storage_format: json!(""),
            cookie: json!(""),
            dynamic_cover: json!(false),
            original_cover: json!(false),
            proxies: json!(""),
            download: json!(true),
            max_size: json!(0),
            chunk: json!(DEFAULT_CHUNK),
            max_retry: json!(10),
            max_pages: json!(0),
            mode: Value::Null,
            extra: Map::new(),
        }
    }
}

/// One record of a URL group (`accounts_urls` / `mix_urls`).
///
/// Only the shape is checked here; whether `url` points anywhere useful is the
/// extractor's concern.
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct UrlEntry {
    #[serde(default)]
    pub mark: String,
    #[serde(default)]
    pub url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tab: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub earliest: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub latest: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Builds the entry list for a URL group. Non-array groups produce nothing and
/// elements that are not records are skipped.
pub fn url_entries(group: &Value) -> Vec<UrlEntry> {
    let Some(items) = group.as_array() else {
        return Vec::new();
    };

    items
        .iter()
        .filter(|item| item.is_object())
        .filter_map(|item| serde_json::from_value(item.clone()).ok())
        .collect()
}
