//! Purpose: Model the content manifest and derive its cache identity.
//! Exports: `Manifest`, `canonical_json`, `content_hash`, `DEFAULT_LOCALE`.
//! Role: Pure extraction from a manifest response body; fetching lives in `remote`.
//! Invariants: The content hash ignores object key order in the source body.
//! Invariants: Cache keys are `version + "__" + hash`.
use std::collections::BTreeMap;

use serde_json::Value;
use sha2::{Digest, Sha256};

use crate::core::error::{Error, ErrorKind};

pub const DEFAULT_LOCALE: &str = "en";

#[derive(Clone, Debug)]
pub struct Manifest {
    version: String,
    locale: String,
    table_paths: BTreeMap<String, String>,
    body: Value,
    hash: String,
}

impl Manifest {
    /// Builds a manifest from the `Response` object of the manifest endpoint.
    pub fn from_response(body: Value, locale: &str) -> Result<Self, Error> {
        let version = body
            .get("version")
            .and_then(Value::as_str)
            .ok_or_else(|| {
                Error::new(ErrorKind::ResponseParse).with_message("manifest has no version")
            })?
            .to_string();

        let paths = body
            .get("jsonWorldComponentContentPaths")
            .and_then(|paths| paths.get(locale))
            .and_then(Value::as_object)
            .ok_or_else(|| {
                Error::new(ErrorKind::MissingLocaleData).with_message(format!(
                    "no {locale} paths in jsonWorldComponentContentPaths"
                ))
            })?;

        let mut table_paths = BTreeMap::new();
        for (table, path) in paths {
            let path = path.as_str().ok_or_else(|| {
                Error::new(ErrorKind::ResponseParse)
                    .with_message("table content path is not a string")
                    .with_table(table.clone())
            })?;
            table_paths.insert(table.clone(), path.to_string());
        }

        let hash = content_hash(&body);
        Ok(Self {
            version,
            locale: locale.to_string(),
            table_paths,
            body,
            hash,
        })
    }

    pub fn version(&self) -> &str {
        &self.version
    }

    pub fn locale(&self) -> &str {
        &self.locale
    }

    pub fn hash(&self) -> &str {
        &self.hash
    }

    pub fn body(&self) -> &Value {
        &self.body
    }

    pub fn cache_key(&self) -> String {
        format!("{}__{}", self.version, self.hash)
    }

    /// Table names in sorted order.
    pub fn table_names(&self) -> impl Iterator<Item = &str> {
        self.table_paths.keys().map(String::as_str)
    }

    pub fn table_path(&self, table: &str) -> Result<&str, Error> {
        self.table_paths
            .get(table)
            .map(String::as_str)
            .ok_or_else(|| {
                Error::new(ErrorKind::Usage)
                    .with_message("table is not listed in the manifest")
                    .with_table(table)
                    .with_hint("Re-run the plan step so shard tables match the cached manifest.")
            })
    }
}

/// Compact JSON with object keys sorted at every depth.
pub fn canonical_json(value: &Value) -> String {
    let mut out = String::new();
    write_canonical(value, &mut out);
    out
}

fn write_canonical(value: &Value, out: &mut String) {
    match value {
        Value::Array(items) => {
            out.push('[');
            for (idx, item) in items.iter().enumerate() {
                if idx > 0 {
                    out.push(',');
                }
                write_canonical(item, out);
            }
            out.push(']');
        }
        Value::Object(map) => {
            let mut entries: Vec<(&String, &Value)> = map.iter().collect();
            entries.sort_by(|a, b| a.0.cmp(b.0));
            out.push('{');
            for (idx, (key, item)) in entries.into_iter().enumerate() {
                if idx > 0 {
                    out.push(',');
                }
                out.push_str(&Value::String(key.clone()).to_string());
                out.push(':');
                write_canonical(item, out);
            }
            out.push('}');
        }
        scalar => out.push_str(&scalar.to_string()),
    }
}

/// Hex SHA-256 of the canonical serialization.
pub fn content_hash(value: &Value) -> String {
    let digest = Sha256::digest(canonical_json(value).as_bytes());
    let mut hex = String::with_capacity(digest.len() * 2);
    for byte in digest {
        hex.push_str(&format!("{byte:02x}"));
    }
    hex
}
