use std::sync::LazyLock;

use regex::Regex;
use serde::Serialize;
use serde_json::Value;

use crate::client::CatalogClient;
use crate::domain::{DESCRIPTION_NOT_FOUND, EntityRecord, unknown_evolution};
use crate::evolution::walk_chain;

static LINE_BREAKS: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"[\n\r\x0C]+").unwrap());

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Variety {
    pub name: String,
    pub url: String,
    pub is_default: bool,
}

#[derive(Debug, Clone, Default)]
pub struct SpeciesInfo {
    pub resolved: bool,
    pub varieties: Vec<Variety>,
}

/// Fills generation, evolution and description from the species document.
/// Every failure degrades to the fallback values; nothing here returns an
/// error.
pub struct SpeciesResolver<'a, C: CatalogClient> {
    client: &'a C,
}

impl<'a, C: CatalogClient> SpeciesResolver<'a, C> {
    pub fn new(client: &'a C) -> Self {
        Self { client }
    }

    pub fn enrich(
        &self,
        record: &mut EntityRecord,
        species_url: Option<&str>,
        donor: Option<&EntityRecord>,
    ) -> SpeciesInfo {
        let Some(species) = species_url.and_then(|url| self.fetch_species(&record.name, url))
        else {
            apply_fallback(record, donor);
            return SpeciesInfo::default();
        };

        record.generation = parse_generation(&species);
        record.evolution = self.resolve_evolution(&record.name, &species);
        record.description = match parse_flavor_text(&species) {
            Some(text) => text,
            None => fallback_description(donor),
        };

        SpeciesInfo {
            resolved: true,
            varieties: parse_varieties(&species),
        }
    }

    pub fn generation_of(&self, species_url: &str) -> Option<String> {
        let species = self.client.fetch_document(species_url).ok()?;
        parse_generation(&species)
    }

    pub fn varieties_of(&self, species_url: &str) -> Vec<Variety> {
        self.client
            .fetch_document(species_url)
            .map(|species| parse_varieties(&species))
            .unwrap_or_default()
    }

    fn fetch_species(&self, name: &str, url: &str) -> Option<Value> {
        match self.client.fetch_document(url) {
            Ok(document) if document.is_object() => Some(document),
            Ok(_) => {
                tracing::debug!(entity = name, "species document is not an object");
                None
            }
            Err(err) => {
                tracing::debug!(entity = name, error = %err, "species fetch failed; using fallback");
                None
            }
        }
    }

    fn resolve_evolution(&self, name: &str, species: &Value) -> Vec<String> {
        let Some(url) = species
            .get("evolution_chain")
            .and_then(|v| v.get("url"))
            .and_then(|v| v.as_str())
        else {
            return unknown_evolution();
        };

        let chain = match self.client.fetch_document(url) {
            Ok(document) => document,
            Err(err) => {
                tracing::debug!(entity = name, error = %err, "evolution chain fetch failed");
                return unknown_evolution();
            }
        };

        let names = chain.get("chain").map(walk_chain).unwrap_or_default();
        if names.is_empty() {
            unknown_evolution()
        } else {
            names
        }
    }
}

pub fn apply_fallback(record: &mut EntityRecord, donor: Option<&EntityRecord>) {
    record.evolution = unknown_evolution();
    record.description = fallback_description(donor);
}

fn fallback_description(donor: Option<&EntityRecord>) -> String {
    donor
        .filter(|donor| donor.has_description())
        .map(|donor| donor.description.clone())
        .unwrap_or_else(|| DESCRIPTION_NOT_FOUND.to_string())
}

pub fn parse_generation(species: &Value) -> Option<String> {
    species
        .get("generation")
        .and_then(|v| v.get("name"))
        .and_then(|v| v.as_str())
        .map(|v| v.to_string())
}

pub fn parse_flavor_text(species: &Value) -> Option<String> {
    let entries = species.get("flavor_text_entries")?.as_array()?;
    entries
        .iter()
        .filter(|entry| {
            entry
                .get("language")
                .and_then(|v| v.get("name"))
                .and_then(|v| v.as_str())
                .map(|lang| lang.eq_ignore_ascii_case("en"))
                .unwrap_or(false)
        })
        .filter_map(|entry| entry.get("flavor_text").and_then(|v| v.as_str()))
        .find(|text| !text.is_empty())
        .map(clean_flavor_text)
}

/// Collapses each run of line or page breaks to one space and trims.
pub fn clean_flavor_text(text: &str) -> String {
    LINE_BREAKS.replace_all(text, " ").trim().to_string()
}

pub fn parse_varieties(species: &Value) -> Vec<Variety> {
    let Some(items) = species.get("varieties").and_then(|v| v.as_array()) else {
        return Vec::new();
    };
    items
        .iter()
        .filter_map(|item| {
            let pokemon = item.get("pokemon")?;
            Some(Variety {
                name: pokemon.get("name")?.as_str()?.to_lowercase(),
                url: pokemon.get("url")?.as_str()?.to_string(),
                is_default: item
                    .get("is_default")
                    .and_then(|v| v.as_bool())
                    .unwrap_or(false),
            })
        })
        .collect()
}
