use serde_json::json;
use tracing::{info, warn};

use super::select_tables;
use crate::cache::ManifestCache;
use crate::config::PlanConfig;
use crate::core::error::Error;
use crate::core::shard::{ShardAssignment, shard_tables};
use crate::outputs::StepOutputs;
use crate::remote::BungieClient;

#[derive(Clone, Debug)]
pub struct PlanReport {
    pub cache_hit: bool,
    pub cache_key: String,
    pub manifest_version: String,
    pub shards: Vec<ShardAssignment>,
}

impl PlanReport {
    pub fn outputs(&self) -> StepOutputs {
        let mut outputs = StepOutputs::new();
        outputs
            .set("cache-hit", self.cache_hit)
            .set("cache-key", self.cache_key.clone())
            .set("manifest-version", self.manifest_version.clone())
            .set("matrix", json!({ "include": self.shards }));
        outputs
    }
}

/// Fetches the manifest, refreshes the cache on a miss, and shards its tables.
pub fn plan(config: &PlanConfig) -> Result<PlanReport, Error> {
    let client = BungieClient::new(&config.bungie)?;

    info!("Fetching manifest…");
    let manifest = client.fetch_manifest()?;
    info!("Current manifest version: {}", manifest.version());

    let cache = ManifestCache::new(&config.cache_dir);
    let cache_key = manifest.cache_key();
    let cache_hit = cache.lookup(&cache_key)?;

    let tables = select_tables(&manifest, &config.skipped_tables);
    let oversized: Vec<String> = config
        .oversized_tables
        .iter()
        .filter(|name| {
            let present = tables.contains(name);
            if !present {
                warn!("Oversized table {name} is not in the manifest; ignoring it");
            }
            present
        })
        .cloned()
        .collect();
    let shards = shard_tables(&tables, config.shard_count, &oversized)?;
    info!(
        "Planned {} shards for {} tables",
        shards.len(),
        tables.len()
    );

    if cache_hit {
        info!("Manifest cache hit for {cache_key}");
    } else {
        cache.save(&cache_key, manifest.body())?;
        info!("Saved manifest to {}", cache.manifest_path().display());
    }

    let report = PlanReport {
        cache_hit,
        cache_key,
        manifest_version: manifest.version().to_string(),
        shards,
    };
    if let Some(path) = &config.output_file {
        report.outputs().append_to(path)?;
    }
    Ok(report)
}
