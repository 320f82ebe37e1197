//! Cookie handling: the declarative cookie from the settings file plus the
//! volatile anti-bot tokens fetched on every run.

use std::collections::BTreeMap;

use serde_json::Value;
use tracing::debug;

use crate::config_value::{Checked, Level, Note};

pub type TokenMap = BTreeMap<String, String>;

/// Cookie as written in the settings file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Cookie {
    /// `{"name": "value", ...}`
    Structured(TokenMap),
    /// `"name=value; name2=value2"`, expanded later.
    Raw(String),
    Empty,
}

impl Cookie {
    /// Classifies a raw settings value. Non-string object members are
    /// rendered as JSON text.
    pub fn from_value(raw: &Value) -> Option<Self> {
        match raw {
            Value::Object(map) => Some(Self::Structured(
                map.iter()
                    .map(|(k, v)| {
                        let v = match v {
                            Value::String(s) => s.clone(),
                            other => other.to_string(),
                        };
                        (k.clone(), v)
                    })
                    .collect(),
            )),
            Value::String(s) => Some(Self::Raw(s.clone())),
            _ => None,
        }
    }
}

/// Source of a short-lived token merged into the cookie.
pub trait TokenProvider {
    fn fetch(&self) -> anyhow::Result<Option<TokenMap>>;
}

/// Turns a token map into a fragment that can be appended to a cookie string.
pub trait CookieRegister {
    fn generate_cookie(&self, tokens: &TokenMap) -> String;
}

/// Renders tokens as `name=value; ` pairs.
#[derive(Debug, Default, Clone, Copy)]
pub struct Register;

impl CookieRegister for Register {
    fn generate_cookie(&self, tokens: &TokenMap) -> String {
        tokens.iter().map(|(k, v)| format!("{k}={v}; ")).collect()
    }
}

/// Result of validating the `cookie` field.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CookieCheck {
    /// Structured cookie ready for use.
    pub cookie: TokenMap,
    /// Raw cookie string kept for later expansion.
    pub cache: Option<String>,
}

pub fn check_cookie(raw: &Value) -> Checked<CookieCheck> {
    match Cookie::from_value(raw) {
        Some(Cookie::Structured(cookie)) => Checked {
            value: CookieCheck { cookie, cache: None },
            note: None,
        },
        Some(Cookie::Raw(s)) => Checked {
            value: CookieCheck {
                cookie: TokenMap::new(),
                cache: Some(s),
            },
            note: None,
        },
        Some(Cookie::Empty) | None => Checked {
            value: CookieCheck::default(),
            note: Some(Note {
                level: Level::Warning,
                message: "cookie has an invalid format".to_string(),
                persist: true,
            }),
        },
    }
}

/// Enriches `cookie` with the tokens both providers hand out right now.
///
/// Providers that fail or have nothing to offer are skipped. Returns `None`
/// for [`Cookie::Empty`].
pub fn add_cookie(
    cookie: Cookie,
    providers: [&dyn TokenProvider; 2],
    register: &dyn CookieRegister,
) -> Option<Cookie> {
    let tokens: Vec<TokenMap> = providers
        .iter()
        .filter_map(|p| match p.fetch() {
            Ok(tokens) => tokens,
            Err(e) => {
                debug!(error = %e, "token provider failed");
                None
            }
        })
        .collect();

    match cookie {
        Cookie::Structured(mut map) => {
            for t in tokens {
                map.extend(t);
            }
            Some(Cookie::Structured(map))
        }
        Cookie::Raw(mut s) => {
            for t in &tokens {
                s.push_str(&register.generate_cookie(t));
            }
            Some(Cookie::Raw(s))
        }
        Cookie::Empty => None,
    }
}
