//! Purpose: Validate raw CLI/env settings into typed per-command configs.
//! Exports: `Settings`, `BungieConfig`, `KvConfig`, `PlanConfig`, `SyncConfig`, `ExportConfig`.
//! Role: Single place where required values are checked; runs before any network I/O.
//! Invariants: A missing required value fails with `ConfigurationMissing` naming its variable.
//! Invariants: Typed configs are immutable once built and passed by reference.
use std::path::PathBuf;

use crate::core::chunk::DEFAULT_MAX_BULK_ITEMS;
use crate::core::error::{Error, ErrorKind};
use crate::core::manifest::DEFAULT_LOCALE;

pub const DEFAULT_BUNGIE_BASE_URL: &str = "https://www.bungie.net";
pub const DEFAULT_KV_BASE_URL: &str = "https://api.cloudflare.com/client/v4";
pub const DEFAULT_CACHE_DIR: &str = "manifest-cache";
pub const DEFAULT_EXPORT_DIR: &str = "bulk-data";
pub const DEFAULT_CONCURRENCY: usize = 4;

pub const DEFAULT_SKIPPED_TABLES: &[&str] = &[
    "DestinyArtDyeReferenceDefinition",
    "DestinyArtDyeChannelDefinition",
    // DestinyInventoryItemDefinition carries the same data
    "DestinyInventoryItemLiteDefinition",
];

/// Raw values as collected from flags and environment variables.
#[derive(Clone, Debug, Default)]
pub struct Settings {
    pub api_key: Option<String>,
    pub origin: Option<String>,
    pub bungie_base_url: Option<String>,
    pub locale: Option<String>,
    pub shard_count: Option<String>,
    pub oversized_tables: Option<String>,
    pub skipped_tables: Option<String>,
    pub cache_dir: Option<PathBuf>,
    pub manifest_tables: Option<String>,
    pub kv_account_id: Option<String>,
    pub kv_namespace_id: Option<String>,
    pub kv_api_token: Option<String>,
    pub kv_base_url: Option<String>,
    pub max_bulk_items: Option<String>,
    pub concurrency: Option<String>,
    pub output_file: Option<PathBuf>,
    pub export_dir: Option<PathBuf>,
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct BungieConfig {
    pub api_key: String,
    pub origin: String,
    pub base_url: String,
    pub locale: String,
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct KvConfig {
    pub account_id: String,
    pub namespace_id: String,
    pub api_token: String,
    pub base_url: String,
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct PlanConfig {
    pub bungie: BungieConfig,
    pub shard_count: usize,
    pub oversized_tables: Vec<String>,
    pub skipped_tables: Vec<String>,
    pub cache_dir: PathBuf,
    pub output_file: Option<PathBuf>,
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct SyncConfig {
    pub bungie: BungieConfig,
    pub kv: KvConfig,
    pub tables: Vec<String>,
    pub cache_dir: PathBuf,
    pub max_bulk_items: usize,
    pub concurrency: usize,
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct ExportConfig {
    pub bungie: BungieConfig,
    pub skipped_tables: Vec<String>,
    pub output_dir: PathBuf,
    pub max_bulk_items: usize,
    pub concurrency: usize,
}

impl Settings {
    pub fn bungie_config(&self) -> Result<BungieConfig, Error> {
        Ok(BungieConfig {
            api_key: require("BUNGIE_API_KEY", &self.api_key)?,
            origin: require("SERVER_URL", &self.origin)?,
            base_url: self
                .bungie_base_url
                .clone()
                .unwrap_or_else(|| DEFAULT_BUNGIE_BASE_URL.to_string()),
            locale: self
                .locale
                .clone()
                .unwrap_or_else(|| DEFAULT_LOCALE.to_string()),
        })
    }

    pub fn kv_config(&self) -> Result<KvConfig, Error> {
        Ok(KvConfig {
            account_id: require("CLOUDFLARE_ACCOUNT_ID", &self.kv_account_id)?,
            namespace_id: require("CLOUDFLARE_NAMESPACE_ID", &self.kv_namespace_id)?,
            api_token: require("CLOUDFLARE_API_TOKEN", &self.kv_api_token)?,
            base_url: self
                .kv_base_url
                .clone()
                .unwrap_or_else(|| DEFAULT_KV_BASE_URL.to_string()),
        })
    }

    pub fn plan_config(&self) -> Result<PlanConfig, Error> {
        let shard_count = parse_count("SHARD_COUNT", &require("SHARD_COUNT", &self.shard_count)?)?;
        Ok(PlanConfig {
            bungie: self.bungie_config()?,
            shard_count,
            oversized_tables: self
                .oversized_tables
                .as_deref()
                .map(split_list)
                .unwrap_or_default(),
            skipped_tables: self.skipped_tables(),
            cache_dir: self
                .cache_dir
                .clone()
                .unwrap_or_else(|| PathBuf::from(DEFAULT_CACHE_DIR)),
            output_file: self.output_file.clone(),
        })
    }

    pub fn sync_config(&self) -> Result<SyncConfig, Error> {
        let raw_tables = require("MANIFEST_TABLES", &self.manifest_tables)?;
        let tables: Vec<String> = serde_json::from_str(&raw_tables).map_err(|err| {
            Error::new(ErrorKind::Usage)
                .with_message("MANIFEST_TABLES is not a JSON array of table names")
                .with_hint("Pass the `tables` value from the plan matrix unchanged.")
                .with_source(err)
        })?;
        let cache_dir = self.cache_dir.clone().ok_or_else(|| missing("CACHE_PATH"))?;
        Ok(SyncConfig {
            bungie: self.bungie_config()?,
            kv: self.kv_config()?,
            tables,
            cache_dir,
            max_bulk_items: self.max_bulk_items()?,
            concurrency: self.concurrency()?,
        })
    }

    pub fn export_config(&self) -> Result<ExportConfig, Error> {
        Ok(ExportConfig {
            bungie: self.bungie_config()?,
            skipped_tables: self.skipped_tables(),
            output_dir: self
                .export_dir
                .clone()
                .unwrap_or_else(|| PathBuf::from(DEFAULT_EXPORT_DIR)),
            max_bulk_items: self.max_bulk_items()?,
            concurrency: self.concurrency()?,
        })
    }

    fn skipped_tables(&self) -> Vec<String> {
        match self.skipped_tables.as_deref() {
            Some(raw) => split_list(raw),
            None => DEFAULT_SKIPPED_TABLES
                .iter()
                .map(|name| name.to_string())
                .collect(),
        }
    }

    fn max_bulk_items(&self) -> Result<usize, Error> {
        match self.max_bulk_items.as_deref() {
            Some(raw) => parse_count("MAX_BULK_ITEMS", raw),
            None => Ok(DEFAULT_MAX_BULK_ITEMS),
        }
    }

    fn concurrency(&self) -> Result<usize, Error> {
        match self.concurrency.as_deref() {
            Some(raw) => parse_count("SYNC_CONCURRENCY", raw),
            None => Ok(DEFAULT_CONCURRENCY),
        }
    }
}

fn missing(name: &str) -> Error {
    Error::new(ErrorKind::ConfigurationMissing)
        .with_message(format!("could not get {name} from environment"))
        .with_hint(format!("Set {name} or pass the matching flag."))
}

fn require(name: &str, value: &Option<String>) -> Result<String, Error> {
    match value.as_deref().map(str::trim) {
        Some(value) if !value.is_empty() => Ok(value.to_string()),
        _ => Err(missing(name)),
    }
}

fn parse_count(name: &str, raw: &str) -> Result<usize, Error> {
    let value: usize = raw.trim().parse().map_err(|err| {
        Error::new(ErrorKind::Usage)
            .with_message(format!("{name} must be a positive integer"))
            .with_source(err)
    })?;
    if value == 0 {
        return Err(Error::new(ErrorKind::InvalidArgument)
            .with_message(format!("{name} must be at least 1")));
    }
    Ok(value)
}

fn split_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|item| !item.is_empty())
        .map(str::to_string)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::{DEFAULT_KV_BASE_URL, DEFAULT_SKIPPED_TABLES, Settings};
    use crate::core::error::ErrorKind;
    use std::path::PathBuf;

    fn bungie_settings() -> Settings {
        Settings {
            api_key: Some("key".to_string()),
            origin: Some("https://example.test".to_string()),
            ..Settings::default()
        }
    }

    #[test]
    fn plan_requires_shard_count() {
        let err = bungie_settings().plan_config().expect_err("missing");
        assert_eq!(err.kind(), ErrorKind::ConfigurationMissing);
        assert!(err.message().unwrap_or_default().contains("SHARD_COUNT"));
    }

    #[test]
    fn plan_applies_defaults() {
        let settings = Settings {
            shard_count: Some("8".to_string()),
            oversized_tables: Some("DestinyInventoryItemDefinition, ,DestinySandboxPerkDefinition".to_string()),
            ..bungie_settings()
        };
        let config = settings.plan_config().expect("config");
        assert_eq!(config.shard_count, 8);
        assert_eq!(
            config.oversized_tables,
            vec!["DestinyInventoryItemDefinition", "DestinySandboxPerkDefinition"]
        );
        assert_eq!(config.skipped_tables.len(), DEFAULT_SKIPPED_TABLES.len());
        assert_eq!(config.cache_dir, PathBuf::from("manifest-cache"));
        assert_eq!(config.bungie.locale, "en");
    }

    #[test]
    fn zero_or_garbage_shard_count_is_rejected() {
        let zero = Settings {
            shard_count: Some("0".to_string()),
            ..bungie_settings()
        };
        assert_eq!(
            zero.plan_config().expect_err("zero").kind(),
            ErrorKind::InvalidArgument
        );
        let garbage = Settings {
            shard_count: Some("many".to_string()),
            ..bungie_settings()
        };
        assert_eq!(garbage.plan_config().expect_err("nan").kind(), ErrorKind::Usage);
    }

    #[test]
    fn blank_api_key_counts_as_missing() {
        let settings = Settings {
            api_key: Some("  ".to_string()),
            ..bungie_settings()
        };
        let err = settings.bungie_config().expect_err("blank");
        assert_eq!(err.kind(), ErrorKind::ConfigurationMissing);
        assert!(err.message().unwrap_or_default().contains("BUNGIE_API_KEY"));
    }

    #[test]
    fn sync_requires_kv_credentials_and_cache_path() {
        let base = Settings {
            manifest_tables: Some("[\"DestinyClassDefinition\"]".to_string()),
            ..bungie_settings()
        };
        let err = base.sync_config().expect_err("no cache path");
        assert!(err.message().unwrap_or_default().contains("CACHE_PATH"));

        let with_cache = Settings {
            cache_dir: Some(PathBuf::from("manifest-cache")),
            ..base
        };
        let err = with_cache.sync_config().expect_err("no kv");
        assert!(err.message().unwrap_or_default().contains("CLOUDFLARE_ACCOUNT_ID"));

        let full = Settings {
            kv_account_id: Some("acct".to_string()),
            kv_namespace_id: Some("ns".to_string()),
            kv_api_token: Some("token".to_string()),
            ..with_cache
        };
        let config = full.sync_config().expect("config");
        assert_eq!(config.tables, vec!["DestinyClassDefinition"]);
        assert_eq!(config.kv.base_url, DEFAULT_KV_BASE_URL);
        assert_eq!(config.max_bulk_items, 10_000);
    }

    #[test]
    fn sync_rejects_malformed_table_list() {
        let settings = Settings {
            manifest_tables: Some("DestinyClassDefinition".to_string()),
            ..bungie_settings()
        };
        assert_eq!(settings.sync_config().expect_err("bad").kind(), ErrorKind::Usage);
    }

    #[test]
    fn explicit_empty_skip_list_disables_defaults() {
        let settings = Settings {
            skipped_tables: Some(String::new()),
            ..bungie_settings()
        };
        let config = settings.export_config().expect("config");
        assert!(config.skipped_tables.is_empty());
        assert_eq!(config.output_dir, PathBuf::from("bulk-data"));
    }
}
