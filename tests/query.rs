mod common;

use pokedex_ingest::query::{Pokedex, SearchQuery};
use pokedex_ingest::store::{RecordStore, Store};

use common::stored_record;

fn names(records: &[pokedex_ingest::domain::EntityRecord]) -> Vec<&str> {
    records.iter().map(|r| r.name.as_str()).collect()
}

fn seeded() -> Store {
    let store = Store::in_memory();
    let mut raichu = stored_record(26, "raichu", &["electric"]);
    raichu.abilities = vec!["static".to_string(), "lightning-rod".to_string()];
    raichu.moves = vec!["thunderbolt".to_string()];
    raichu.generation = Some("generation-i".to_string());
    store.save(raichu).unwrap();

    let mut magnemite = stored_record(81, "magnemite", &["electric", "steel"]);
    magnemite.abilities = vec!["sturdy".to_string()];
    magnemite.moves = vec!["thunder-shock".to_string()];
    magnemite.generation = Some("generation-i".to_string());
    store.save(magnemite).unwrap();

    let mut pikachu = stored_record(25, "pikachu", &["electric"]);
    pikachu.abilities = vec!["static".to_string()];
    pikachu.moves = vec!["thunder-shock".to_string(), "quick-attack".to_string()];
    pikachu.generation = Some("generation-i".to_string());
    store.save(pikachu).unwrap();

    let mut pichu = stored_record(172, "pichu", &["electric"]);
    pichu.abilities = vec!["static".to_string()];
    pichu.generation = Some("generation-ii".to_string());
    store.save(pichu).unwrap();

    let mut steelix = stored_record(208, "steelix", &["steel", "ground"]);
    steelix.generation = Some("generation-ii".to_string());
    store.save(steelix).unwrap();
    store
}

#[test]
fn get_all_is_ordered_by_id() {
    let store = seeded();
    let all = Pokedex::new(&store).get_all().unwrap();
    assert_eq!(
        names(&all),
        vec!["pikachu", "raichu", "magnemite", "pichu", "steelix"]
    );
}

#[test]
fn find_by_id_returns_absent_for_unknown_identity() {
    let store = seeded();
    let dex = Pokedex::new(&store);
    assert_eq!(dex.find_by_id(25).unwrap().unwrap().name, "pikachu");
    assert!(dex.find_by_id(9999).unwrap().is_none());
}

#[test]
fn name_substring_is_case_insensitive() {
    let store = seeded();
    let found = Pokedex::new(&store).find_by_name_substring("CHU").unwrap();
    assert_eq!(names(&found), vec!["pikachu", "raichu", "pichu"]);
}

#[test]
fn attribute_substring_finders() {
    let store = seeded();
    let dex = Pokedex::new(&store);

    let steel = dex.find_by_type_substring("ste").unwrap();
    assert_eq!(names(&steel), vec!["magnemite", "steelix"]);

    let rod = dex.find_by_ability_substring("ROD").unwrap();
    assert_eq!(names(&rod), vec!["raichu"]);

    let thunder = dex.find_by_move_substring("thunder").unwrap();
    assert_eq!(names(&thunder), vec!["pikachu", "raichu", "magnemite"]);
}

#[test]
fn advanced_search_requires_exact_type_membership() {
    let store = seeded();
    let dex = Pokedex::new(&store);

    let query = SearchQuery {
        types: vec!["Electric".to_string()],
        generation: Some("generation-i".to_string()),
        ..SearchQuery::default()
    };
    // "generation-i" is a substring of "generation-ii" too.
    assert_eq!(
        names(&dex.advanced_search(&query).unwrap()),
        vec!["pikachu", "raichu", "magnemite", "pichu"]
    );

    let partial_type = SearchQuery {
        types: vec!["elec".to_string()],
        ..SearchQuery::default()
    };
    assert!(dex.advanced_search(&partial_type).unwrap().is_empty());
}

#[test]
fn advanced_search_filters_are_conjunctive() {
    let store = seeded();
    let dex = Pokedex::new(&store);

    let query = SearchQuery {
        name: Some("chu".to_string()),
        types: vec!["electric".to_string()],
        ability: Some("static".to_string()),
        move_name: Some("thunder".to_string()),
        generation: None,
    };
    assert_eq!(
        names(&dex.advanced_search(&query).unwrap()),
        vec!["pikachu", "raichu"]
    );

    let two_types = SearchQuery {
        types: vec!["electric".to_string(), "steel".to_string()],
        ..SearchQuery::default()
    };
    assert_eq!(
        names(&dex.advanced_search(&two_types).unwrap()),
        vec!["magnemite"]
    );
}

#[test]
fn empty_query_returns_everything() {
    let store = seeded();
    let query = SearchQuery {
        name: Some("  ".to_string()),
        ..SearchQuery::default()
    };
    assert_eq!(Pokedex::new(&store).advanced_search(&query).unwrap().len(), 5);
}

#[test]
fn search_query_reads_move_key() {
    let query: SearchQuery =
        serde_json::from_str(r#"{"types": ["fire"], "move": "ember"}"#).unwrap();
    assert_eq!(query.move_name.as_deref(), Some("ember"));
    assert_eq!(query.types, vec!["fire"]);
    assert_eq!(query.name, None);
}
