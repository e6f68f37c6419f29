//! Purpose: Blocking client for the manifest and table content endpoints.
//! Exports: `BungieClient`, `PLATFORM_SUCCESS`.
//! Role: Manifest Fetcher and Table Fetcher transport; no retries.
//! Invariants: Every request carries the API key and origin headers.
//! Invariants: A body-level `ErrorCode` other than success fails before status is checked.
use std::sync::Arc;

use serde_json::{Map, Value};
use tracing::info;
use url::Url;

use super::http::{self, HttpResponse};
use crate::config::BungieConfig;
use crate::core::error::{Error, ErrorKind};
use crate::core::manifest::Manifest;

/// `PlatformErrorCodes.Success`.
pub const PLATFORM_SUCCESS: i64 = 1;

const MANIFEST_PATH: &str = "/Platform/Destiny2/Manifest/";

#[derive(Clone)]
pub struct BungieClient {
    inner: Arc<BungieClientInner>,
}

struct BungieClientInner {
    base_url: Url,
    api_key: String,
    origin: String,
    locale: String,
    agent: ureq::Agent,
}

impl BungieClient {
    pub fn new(config: &BungieConfig) -> Result<Self, Error> {
        let base_url = http::parse_base_url(&config.base_url)?;
        let agent = ureq::AgentBuilder::new().build();
        Ok(Self {
            inner: Arc::new(BungieClientInner {
                base_url,
                api_key: config.api_key.clone(),
                origin: config.origin.clone(),
                locale: config.locale.clone(),
                agent,
            }),
        })
    }

    pub fn fetch_manifest(&self) -> Result<Manifest, Error> {
        let url = self.resolve(MANIFEST_PATH)?;
        let mut envelope = self.get_json(&url)?;
        let body = envelope
            .get_mut("Response")
            .map(Value::take)
            .ok_or_else(|| {
                Error::new(ErrorKind::ResponseParse)
                    .with_message("manifest envelope has no Response")
                    .with_url(url.as_str())
            })?;
        Manifest::from_response(body, &self.inner.locale)
    }

    /// Returns the table's `entryId -> entry` object.
    pub fn fetch_table(&self, manifest: &Manifest, table: &str) -> Result<Map<String, Value>, Error> {
        let path = manifest.table_path(table)?;
        let url = self.resolve(path).map_err(|err| err.with_table(table))?;
        match self.get_json(&url).map_err(|err| err.with_table(table))? {
            Value::Object(entries) => Ok(entries),
            _ => Err(Error::new(ErrorKind::ResponseParse)
                .with_message("table content is not a JSON object")
                .with_table(table)
                .with_url(url.as_str())),
        }
    }

    /// Absolute API paths stay under any path prefix of the base url.
    fn resolve(&self, path: &str) -> Result<Url, Error> {
        http::join_path(&self.inner.base_url, path)
    }

    fn get_json(&self, url: &Url) -> Result<Value, Error> {
        info!("GET {url}");
        let request = self
            .inner
            .agent
            .get(url.as_str())
            .set("X-API-Key", &self.inner.api_key)
            .set("Origin", &self.inner.origin);
        let response = http::send(request, None)?;
        check_response(&response)
    }
}

fn check_response(response: &HttpResponse) -> Result<Value, Error> {
    let value = http::parse_json(response)?;
    if let Some(code) = value.get("ErrorCode") {
        if code.as_i64() != Some(PLATFORM_SUCCESS) {
            let status = value
                .get("ErrorStatus")
                .and_then(Value::as_str)
                .unwrap_or("Unknown");
            let mut err = Error::new(ErrorKind::Upstream)
                .with_message(format!("{code} {status}"))
                .with_url(response.url.clone())
                .with_status(response.status);
            if let Some(message) = value.get("Message").and_then(Value::as_str) {
                err = err.with_hint(message);
            }
            return Err(err);
        }
    }
    if !response.is_success() {
        return Err(Error::new(ErrorKind::Upstream)
            .with_message("API did not return a 200-ish response")
            .with_url(response.url.clone())
            .with_status(response.status));
    }
    Ok(value)
}
