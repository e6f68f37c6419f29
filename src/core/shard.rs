//! Purpose: Partition sorted table names into contiguous shards for CI fan-out.
//! Exports: `ShardAssignment`, `shard_tables`, `short_table_name`.
//! Role: Pure planning layer; the plan pipeline feeds it and emits the result as a matrix.
//! Invariants: Output depends only on inputs; identical inputs give identical assignments.
//! Invariants: Every table lands in exactly one shard; oversized tables are alone and last.
use serde::ser::{Serialize, SerializeStruct, Serializer};

use crate::core::error::{Error, ErrorKind};

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct ShardAssignment {
    pub name: String,
    pub tables: Vec<String>,
}

impl ShardAssignment {
    fn new(index: usize, tables: Vec<String>) -> Self {
        let first = tables.first().map(String::as_str).unwrap_or_default();
        let last = tables.last().map(String::as_str).unwrap_or_default();
        let name = format!(
            "Shard {index}: {}-{}",
            short_table_name(first),
            short_table_name(last)
        );
        Self { name, tables }
    }

    /// Table list as the JSON string handed to a matrix job.
    pub fn tables_json(&self) -> String {
        serde_json::Value::from(self.tables.clone()).to_string()
    }
}

// Matrix jobs receive `tables` as a JSON string, not an array.
impl Serialize for ShardAssignment {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut state = serializer.serialize_struct("ShardAssignment", 2)?;
        state.serialize_field("name", &self.name)?;
        state.serialize_field("tables", &self.tables_json())?;
        state.end()
    }
}

/// `DestinyInventoryItemDefinition` -> `InventoryItem`; other names pass through.
pub fn short_table_name(table: &str) -> &str {
    table
        .strip_prefix("Destiny")
        .and_then(|rest| rest.strip_suffix("Definition"))
        .filter(|inner| !inner.is_empty())
        .unwrap_or(table)
}

/// `tables` must already be sorted and deduplicated.
pub fn shard_tables(
    tables: &[String],
    shard_count: usize,
    oversized: &[String],
) -> Result<Vec<ShardAssignment>, Error> {
    if shard_count == 0 {
        return Err(Error::new(ErrorKind::InvalidArgument)
            .with_message("shard count must be at least 1"));
    }

    let mut dedicated: Vec<&String> = Vec::with_capacity(oversized.len());
    for name in oversized {
        if !dedicated.contains(&name) {
            dedicated.push(name);
        }
    }

    let pool: Vec<&String> = tables
        .iter()
        .filter(|name| !dedicated.contains(name))
        .collect();

    let general_shards = shard_count.saturating_sub(dedicated.len()).max(1);
    let mut shards: Vec<ShardAssignment> = Vec::new();

    if !pool.is_empty() {
        let chunk_size = pool.len().div_ceil(general_shards);
        let mut grouped: Vec<Vec<String>> = Vec::new();
        for (position, name) in pool.iter().enumerate() {
            // one-based
            let shard_index = (position + 1).div_ceil(chunk_size);
            if grouped.len() < shard_index {
                grouped.push(Vec::new());
            }
            grouped[shard_index - 1].push((*name).clone());
        }
        for group in grouped {
            let index = shards.len() + 1;
            shards.push(ShardAssignment::new(index, group));
        }
    }

    for name in dedicated {
        let index = shards.len() + 1;
        shards.push(ShardAssignment::new(index, vec![name.clone()]));
    }

    Ok(shards)
}
