use std::collections::HashSet;
use std::fmt;
use std::sync::LazyLock;

use regex::Regex;
use serde::Serialize;
use serde_json::Value;

use crate::error::ConfigError;

/// PostgreSQL truncates identifiers longer than this (NAMEDATALEN - 1).
pub const MAX_IDENTIFIER_BYTES: usize = 63;

static PLAIN_IDENTIFIER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new("^[A-Za-z0-9_]+$").expect("static regex"));

/// A validated database name, also used verbatim as the owning role's name.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct DbName(String);

impl DbName {
    /// Validate a single, already trimmed name.
    ///
    /// # Errors
    /// Returns `ConfigError::NameTooLong` when the server would truncate the name.
    pub fn new(name: &str) -> Result<Self, ConfigError> {
        if name.len() > MAX_IDENTIFIER_BYTES {
            return Err(ConfigError::NameTooLong {
                name: name.to_string(),
                len: name.len(),
            });
        }
        Ok(Self(name.to_string()))
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// True when the name needs no quoting to survive case folding.
    #[must_use]
    pub fn is_plain_identifier(&self) -> bool {
        PLAIN_IDENTIFIER.is_match(&self.0)
    }
}

impl fmt::Display for DbName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Ordered, duplicate-free, non-empty list of database names.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct DbList(Vec<DbName>);

impl DbList {
    /// Parse either a JSON array of strings or a comma-separated list.
    ///
    /// Tokens are trimmed and later duplicates collapse onto the first
    /// occurrence. Empty tokens, non-string JSON elements and an empty result
    /// are rejected, as are JSON objects and comma tokens that still carry
    /// quotes or brackets from a mangled JSON value.
    ///
    /// # Errors
    /// Returns `ConfigError` describing the first offending token.
    pub fn parse(raw: &str) -> Result<Self, ConfigError> {
        let raw = raw.trim();
        let tokens = if raw.starts_with('[') {
            json_tokens(raw)?
        } else if raw.starts_with('{') {
            return Err(ConfigError::InvalidDbList(
                "expected a JSON array or a comma-separated list, got a JSON object".into(),
            ));
        } else {
            let tokens: Vec<String> = raw.split(',').map(str::to_string).collect();
            if let Some((idx, token)) = tokens
                .iter()
                .enumerate()
                .find(|(_, t)| t.trim_start().starts_with(['"', '\'', '{', '[']))
            {
                return Err(ConfigError::InvalidDbList(format!(
                    "token {idx} ({:?}) looks like quoted or JSON input",
                    token.trim()
                )));
            }
            tokens
        };

        let mut seen = HashSet::new();
        let mut names = Vec::with_capacity(tokens.len());
        for (idx, token) in tokens.iter().enumerate() {
            let token = token.trim();
            if token.is_empty() {
                return Err(ConfigError::EmptyName(idx));
            }
            let name = DbName::new(token)?;
            if !seen.insert(name.clone()) {
                tracing::warn!("duplicate database name {name:?} ignored");
                continue;
            }
            if !name.is_plain_identifier() {
                tracing::warn!(
                    "{name:?} contains characters outside [A-Za-z0-9_] and will be quoted; ensure client tooling supports quoted identifiers"
                );
            }
            names.push(name);
        }

        if names.is_empty() {
            return Err(ConfigError::EmptyDbList);
        }
        Ok(Self(names))
    }

    pub fn iter(&self) -> impl Iterator<Item = &DbName> {
        self.0.iter()
    }

    /// Names as plain strings, in order.
    #[must_use]
    pub fn to_strings(&self) -> Vec<String> {
        self.0.iter().map(|n| n.as_str().to_string()).collect()
    }
}

fn json_tokens(raw: &str) -> Result<Vec<String>, ConfigError> {
    let values: Vec<Value> =
        serde_json::from_str(raw).map_err(|e| ConfigError::InvalidDbList(e.to_string()))?;
    values
        .into_iter()
        .enumerate()
        .map(|(idx, value)| match value {
            Value::String(s) => Ok(s),
            other => Err(ConfigError::InvalidDbList(format!(
                "element {idx} is not a string: {other}"
            ))),
        })
        .collect()
}
