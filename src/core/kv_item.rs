//! Purpose: Flatten table entries into key/value items for the bulk store.
//! Exports: `KvItem`, `kv_items_from_table`.
//! Invariants: Keys are `table/entryId`, unique per manifest version.
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::core::error::{Error, ErrorKind};

#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct KvItem {
    pub key: String,
    pub value: String,
}

impl KvItem {
    pub fn from_entry(table: &str, entry_id: &str, entry: &Value) -> Result<Self, Error> {
        let value = serde_json::to_string(entry).map_err(|err| {
            Error::new(ErrorKind::Internal)
                .with_message("failed to encode table entry")
                .with_table(table)
                .with_source(err)
        })?;
        Ok(Self {
            key: format!("{table}/{entry_id}"),
            value,
        })
    }
}

pub fn kv_items_from_table(table: &str, entries: &Map<String, Value>) -> Result<Vec<KvItem>, Error> {
    entries
        .iter()
        .map(|(entry_id, entry)| KvItem::from_entry(table, entry_id, entry))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::{KvItem, kv_items_from_table};
    use serde_json::json;

    #[test]
    fn key_is_table_slash_entry_id() {
        let entry = json!({"hash": 123, "displayProperties": {"name": "Titan"}});
        let item = KvItem::from_entry("Foo", "123", &entry).expect("item");
        assert_eq!(item.key, "Foo/123");
        let decoded: serde_json::Value = serde_json::from_str(&item.value).expect("value json");
        assert_eq!(decoded, entry);
    }

    #[test]
    fn table_entries_become_items() {
        let entries = json!({"1": {"a": 1}, "2": {"a": 2}});
        let items = kv_items_from_table("DestinyClassDefinition", entries.as_object().expect("obj"))
            .expect("items");
        let keys: Vec<&str> = items.iter().map(|item| item.key.as_str()).collect();
        assert_eq!(keys, vec!["DestinyClassDefinition/1", "DestinyClassDefinition/2"]);
    }

    #[test]
    fn serializes_as_key_value_pair() {
        let item = KvItem::from_entry("T", "9", &json!(null)).expect("item");
        assert_eq!(
            serde_json::to_value(&item).expect("json"),
            json!({"key": "T/9", "value": "null"})
        );
    }
}
