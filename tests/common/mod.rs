#![allow(dead_code)]

use std::collections::{HashMap, HashSet};
use std::sync::Mutex;
use std::time::Duration;

use serde_json::{Value, json};

use pokedex_ingest::client::{CatalogClient, CatalogEntry, ENTITY_RESOURCE};
use pokedex_ingest::config::default_form_patterns;
use pokedex_ingest::domain::EntityRecord;
use pokedex_ingest::error::DexError;
use pokedex_ingest::importer::ImportOptions;
use pokedex_ingest::progress::{ProgressSink, ProgressUpdate};

pub const BASE: &str = "https://api.test/api/v2/";
pub const SPRITES: &str = "https://sprites.test/pokemon";

pub fn entity_url(name: &str) -> String {
    format!("{BASE}pokemon/{name}/")
}

pub fn species_url(name: &str) -> String {
    format!("{BASE}pokemon-species/{name}/")
}

pub fn chain_url(id: u32) -> String {
    format!("{BASE}evolution-chain/{id}/")
}

pub fn form_url(name: &str) -> String {
    format!("{BASE}pokemon-form/{name}/")
}

pub fn sprite(id: u32) -> String {
    format!("{SPRITES}/{id}.png")
}

pub fn entity_doc(id: u32, name: &str, types: &[&str], species: &str) -> Value {
    let types: Vec<Value> = types
        .iter()
        .enumerate()
        .map(|(slot, t)| json!({"slot": slot + 1, "type": {"name": t, "url": ""}}))
        .collect();
    json!({
        "id": id,
        "name": name,
        "height": 4,
        "weight": 60,
        "types": types,
        "abilities": [{"ability": {"name": "static"}, "is_hidden": false}],
        "moves": [{"move": {"name": "thunder-shock"}}],
        "stats": [
            {"base_stat": 35, "stat": {"name": "hp"}},
            {"base_stat": 90, "stat": {"name": "speed"}}
        ],
        "species": {"name": species, "url": species_url(species)}
    })
}

pub fn species_doc(
    generation: &str,
    chain: Option<u32>,
    flavor: Option<&str>,
    varieties: &[(&str, bool)],
) -> Value {
    let flavor_entries: Vec<Value> = flavor
        .map(|text| {
            vec![
                json!({"flavor_text": "Texte.", "language": {"name": "fr"}}),
                json!({"flavor_text": text, "language": {"name": "en"}}),
            ]
        })
        .unwrap_or_default();
    let varieties: Vec<Value> = varieties
        .iter()
        .map(|(name, is_default)| {
            json!({"is_default": is_default, "pokemon": {"name": name, "url": entity_url(name)}})
        })
        .collect();
    let mut doc = json!({
        "generation": {"name": generation},
        "flavor_text_entries": flavor_entries,
        "varieties": varieties
    });
    if let Some(id) = chain {
        doc["evolution_chain"] = json!({"url": chain_url(id)});
    }
    doc
}

pub fn chain_node(name: &str, children: Vec<Value>) -> Value {
    json!({"species": {"name": name}, "evolves_to": children})
}

#[derive(Default)]
pub struct FakeCatalog {
    listings: HashMap<String, Vec<CatalogEntry>>,
    documents: HashMap<String, Value>,
    binaries: HashMap<String, Vec<u8>>,
    failing: HashSet<String>,
    failing_once: Mutex<HashSet<String>>,
    calls: Mutex<Vec<String>>,
}

impl FakeCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn list(&mut self, resource: &str, name: &str, url: &str) {
        self.listings
            .entry(resource.to_string())
            .or_default()
            .push(CatalogEntry {
                name: name.to_string(),
                url: url.to_string(),
            });
    }

    pub fn document(&mut self, url: &str, value: Value) {
        self.documents.insert(url.to_string(), value);
    }

    pub fn binary(&mut self, url: &str, bytes: &[u8]) {
        self.binaries.insert(url.to_string(), bytes.to_vec());
    }

    /// Makes a url (or `list:<resource>`) fail with a transport error.
    pub fn fail(&mut self, url: &str) {
        self.failing.insert(url.to_string());
    }

    /// Makes the next request to a url fail; later requests succeed.
    pub fn fail_once(&mut self, url: &str) {
        self.failing_once.lock().unwrap().insert(url.to_string());
    }

    fn fails(&self, call: &str) -> bool {
        self.failing.contains(call) || self.failing_once.lock().unwrap().remove(call)
    }

    /// Registers a listed entity with its own species and a one-node chain.
    pub fn add_entity(&mut self, id: u32, name: &str, types: &[&str]) {
        self.list(ENTITY_RESOURCE, name, &entity_url(name));
        self.document(&entity_url(name), entity_doc(id, name, types, name));
        self.document(
            &species_url(name),
            species_doc(
                "generation-i",
                Some(id),
                Some(&format!("The {name}\nentry.")),
                &[(name, true)],
            ),
        );
        self.document(
            &chain_url(id),
            json!({"id": id, "chain": chain_node(name, vec![])}),
        );
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    pub fn calls_to(&self, url: &str) -> usize {
        self.calls().iter().filter(|call| call.as_str() == url).count()
    }

    fn log(&self, call: String) {
        self.calls.lock().unwrap().push(call);
    }
}

impl CatalogClient for FakeCatalog {
    fn list_resource(
        &self,
        resource: &str,
        limit: u32,
        offset: u32,
    ) -> Result<Vec<CatalogEntry>, DexError> {
        let call = format!("list:{resource}");
        self.log(call.clone());
        if self.fails(&call) {
            return Err(DexError::Transport("connection refused".to_string()));
        }
        Ok(self
            .listings
            .get(resource)
            .cloned()
            .unwrap_or_default()
            .into_iter()
            .skip(offset as usize)
            .take(limit as usize)
            .collect())
    }

    fn fetch_document(&self, url: &str) -> Result<Value, DexError> {
        self.log(url.to_string());
        if self.fails(url) {
            return Err(DexError::Transport("connection reset".to_string()));
        }
        self.documents
            .get(url)
            .cloned()
            .ok_or_else(|| DexError::Status {
                status: 404,
                message: "Not Found".to_string(),
            })
    }

    fn fetch_binary(&self, url: &str) -> Result<Vec<u8>, DexError> {
        self.log(url.to_string());
        if self.fails(url) {
            return Err(DexError::Transport("timed out".to_string()));
        }
        self.binaries
            .get(url)
            .cloned()
            .ok_or_else(|| DexError::Status {
                status: 404,
                message: "Not Found".to_string(),
            })
    }
}

#[derive(Default)]
pub struct RecordingSink {
    updates: Mutex<Vec<ProgressUpdate>>,
}

impl RecordingSink {
    pub fn updates(&self) -> Vec<ProgressUpdate> {
        self.updates.lock().unwrap().clone()
    }
}

impl ProgressSink for RecordingSink {
    fn report(&self, update: ProgressUpdate) {
        self.updates.lock().unwrap().push(update);
    }
}

pub fn import_options() -> ImportOptions {
    ImportOptions {
        base_url: BASE.to_string(),
        catalog_limit: 1025,
        catalog_offset: 0,
        request_interval: Duration::ZERO,
        sprite_base_url: SPRITES.to_string(),
        discover_variants: true,
        variant_id_start: 1026,
        form_limit: 2000,
        form_patterns: default_form_patterns(),
    }
}

/// A stored record with a few searchable attributes filled in.
pub fn stored_record(id: u32, name: &str, types: &[&str]) -> EntityRecord {
    let mut record = EntityRecord::new(id, name.parse().unwrap(), sprite(id));
    record.types = types.iter().map(|t| t.to_string()).collect();
    record
}
