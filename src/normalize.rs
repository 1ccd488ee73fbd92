use std::collections::BTreeMap;

use serde_json::Value;

use crate::domain::{EntityName, EntityRecord, sprite_url};
use crate::error::DexError;

#[derive(Debug, Clone)]
pub struct NormalizedEntity {
    pub record: EntityRecord,
    pub species_url: Option<String>,
}

/// Builds a partial record from a raw entity document. Only a missing `id`
/// or `name` is fatal; every other sub-structure is best effort.
pub fn normalize_entity(raw: &Value, sprite_base: &str) -> Result<NormalizedEntity, DexError> {
    let id = raw
        .get("id")
        .and_then(|v| v.as_u64())
        .and_then(|v| u32::try_from(v).ok())
        .ok_or_else(|| DexError::MalformedPayload("entity document has no id".to_string()))?;
    let name: EntityName = raw
        .get("name")
        .and_then(|v| v.as_str())
        .ok_or_else(|| DexError::MalformedPayload(format!("entity {id} has no name")))?
        .parse()?;

    let mut record = EntityRecord::new(id, name, sprite_url(sprite_base, id));
    record.height = non_negative(raw.get("height"));
    record.weight = non_negative(raw.get("weight"));
    record.types = parse_name_list(raw.get("types"), "type");
    record.abilities = parse_name_list(raw.get("abilities"), "ability");
    record.moves = parse_name_list(raw.get("moves"), "move");
    record.stats = parse_stats(raw.get("stats"));

    let species_url = raw
        .get("species")
        .and_then(|v| v.get("url"))
        .and_then(|v| v.as_str())
        .map(|v| v.to_string());

    Ok(NormalizedEntity {
        record,
        species_url,
    })
}

pub fn parse_name_list(list: Option<&Value>, key: &str) -> Vec<String> {
    let Some(items) = list.and_then(|v| v.as_array()) else {
        return Vec::new();
    };
    items
        .iter()
        .filter_map(|item| {
            item.get(key)
                .and_then(|v| v.get("name"))
                .and_then(|v| v.as_str())
                .map(|name| name.to_lowercase())
        })
        .collect()
}

pub fn parse_stats(list: Option<&Value>) -> BTreeMap<String, u32> {
    let mut stats = BTreeMap::new();
    if let Some(items) = list.and_then(|v| v.as_array()) {
        for item in items {
            let name = item
                .get("stat")
                .and_then(|v| v.get("name"))
                .and_then(|v| v.as_str());
            let base = item
                .get("base_stat")
                .and_then(|v| v.as_u64())
                .and_then(|v| u32::try_from(v).ok());
            if let (Some(name), Some(base)) = (name, base) {
                stats.insert(name.to_string(), base);
            }
        }
    }
    stats
}

fn non_negative(value: Option<&Value>) -> u32 {
    value
        .and_then(|v| v.as_u64())
        .and_then(|v| u32::try_from(v).ok())
        .unwrap_or(0)
}
