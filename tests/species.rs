mod common;

use std::fs;
use std::path::Path;

use serde_json::{Value, json};

use pokedex_ingest::domain::{DESCRIPTION_NOT_FOUND, EntityRecord};
use pokedex_ingest::species::{SpeciesResolver, parse_flavor_text, parse_generation};

use common::*;

fn fixture(name: &str) -> Value {
    let path = Path::new(env!("CARGO_MANIFEST_DIR"))
        .join("tests")
        .join("fixtures")
        .join(name);
    serde_json::from_str(&fs::read_to_string(path).unwrap()).unwrap()
}

fn donor(description: &str) -> EntityRecord {
    let mut record = stored_record(278, "wingull", &["water", "flying"]);
    record.description = description.to_string();
    record
}

#[test]
fn flavor_text_from_fixture_skips_empty_and_other_languages() {
    let species = fixture("species_wingull.json");
    assert_eq!(
        parse_flavor_text(&species).as_deref(),
        Some("It rides upon ocean winds as if it were a glider.")
    );
    assert_eq!(parse_generation(&species).as_deref(), Some("generation-iii"));
}

#[test]
fn enrich_fills_all_derived_fields() {
    let mut catalog = FakeCatalog::new();
    catalog.document(&species_url("wingull"), fixture("species_wingull.json"));
    catalog.document(
        "https://pokeapi.co/api/v2/evolution-chain/140/",
        json!({"chain": chain_node("wingull", vec![chain_node("pelipper", vec![])])}),
    );
    let mut record = stored_record(278, "wingull", &["water"]);

    let info = SpeciesResolver::new(&catalog).enrich(
        &mut record,
        Some(&species_url("wingull")),
        None,
    );

    assert!(info.resolved);
    assert_eq!(info.varieties.len(), 1);
    assert!(info.varieties[0].is_default);
    assert_eq!(record.generation.as_deref(), Some("generation-iii"));
    assert_eq!(record.evolution, vec!["wingull", "pelipper"]);
    assert_eq!(
        record.description,
        "It rides upon ocean winds as if it were a glider."
    );
}

#[test]
fn unavailable_species_uses_donor_description() {
    let catalog = FakeCatalog::new();
    let mut record = stored_record(10300, "wingull-storm", &["water"]);

    let info = SpeciesResolver::new(&catalog).enrich(
        &mut record,
        Some(&species_url("wingull-storm")),
        Some(&donor("Drifts on ocean winds.")),
    );

    assert!(!info.resolved);
    assert!(info.varieties.is_empty());
    assert_eq!(record.evolution, vec!["unknown"]);
    assert_eq!(record.description, "Drifts on ocean winds.");
}

#[test]
fn sentinel_donor_description_is_not_inherited() {
    let catalog = FakeCatalog::new();
    let mut record = stored_record(10300, "wingull-storm", &["water"]);

    SpeciesResolver::new(&catalog).enrich(
        &mut record,
        None,
        Some(&donor(DESCRIPTION_NOT_FOUND)),
    );

    assert_eq!(record.description, DESCRIPTION_NOT_FOUND);
    assert_eq!(record.evolution, vec!["unknown"]);
}

#[test]
fn missing_english_text_falls_back_but_keeps_evolution() {
    let mut catalog = FakeCatalog::new();
    catalog.document(
        &species_url("wingull-storm"),
        species_doc("generation-iii", Some(140), None, &[]),
    );
    catalog.document(
        &chain_url(140),
        json!({"chain": chain_node("wingull", vec![chain_node("pelipper", vec![])])}),
    );
    let mut record = stored_record(10300, "wingull-storm", &["water"]);

    SpeciesResolver::new(&catalog).enrich(
        &mut record,
        Some(&species_url("wingull-storm")),
        Some(&donor("Drifts on ocean winds.")),
    );

    assert_eq!(record.evolution, vec!["wingull", "pelipper"]);
    assert_eq!(record.description, "Drifts on ocean winds.");
    assert_eq!(record.generation.as_deref(), Some("generation-iii"));
}

#[test]
fn empty_chain_is_unknown() {
    let mut catalog = FakeCatalog::new();
    catalog.document(
        &species_url("ditto"),
        species_doc("generation-i", Some(66), Some("Transforms."), &[]),
    );
    catalog.document(&chain_url(66), json!({"id": 66}));
    let mut record = stored_record(132, "ditto", &["normal"]);

    SpeciesResolver::new(&catalog).enrich(&mut record, Some(&species_url("ditto")), None);

    assert_eq!(record.evolution, vec!["unknown"]);
    assert_eq!(record.description, "Transforms.");
}
