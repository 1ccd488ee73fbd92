use serde::{Deserialize, Serialize};

use crate::domain::EntityRecord;
use crate::error::DexError;
use crate::store::RecordStore;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchQuery {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub types: Vec<String>,
    #[serde(default)]
    pub ability: Option<String>,
    #[serde(default, rename = "move")]
    pub move_name: Option<String>,
    #[serde(default)]
    pub generation: Option<String>,
}

pub struct Pokedex<'a, S: RecordStore> {
    store: &'a S,
}

impl<'a, S: RecordStore> Pokedex<'a, S> {
    pub fn new(store: &'a S) -> Self {
        Self { store }
    }

    pub fn get_all(&self) -> Result<Vec<EntityRecord>, DexError> {
        self.store.find_all_ordered_by_id()
    }

    pub fn find_by_id(&self, id: u32) -> Result<Option<EntityRecord>, DexError> {
        self.store.find_by_identity(id)
    }

    pub fn find_by_name_substring(&self, name: &str) -> Result<Vec<EntityRecord>, DexError> {
        let needle = name.to_lowercase();
        self.filter(|record| record.name.contains(&needle))
    }

    pub fn find_by_type_substring(&self, value: &str) -> Result<Vec<EntityRecord>, DexError> {
        let needle = value.to_lowercase();
        self.filter(|record| any_contains(&record.types, &needle))
    }

    pub fn find_by_ability_substring(&self, value: &str) -> Result<Vec<EntityRecord>, DexError> {
        let needle = value.to_lowercase();
        self.filter(|record| any_contains(&record.abilities, &needle))
    }

    pub fn find_by_move_substring(&self, value: &str) -> Result<Vec<EntityRecord>, DexError> {
        let needle = value.to_lowercase();
        self.filter(|record| any_contains(&record.moves, &needle))
    }

    /// Conjunctive filter: substring match on name, ability, move and
    /// generation; every requested type must be one of the record's types.
    pub fn advanced_search(&self, query: &SearchQuery) -> Result<Vec<EntityRecord>, DexError> {
        let name = non_empty(query.name.as_deref());
        let ability = non_empty(query.ability.as_deref());
        let move_name = non_empty(query.move_name.as_deref());
        let generation = non_empty(query.generation.as_deref());
        let types: Vec<String> = query
            .types
            .iter()
            .map(|value| value.trim().to_lowercase())
            .filter(|value| !value.is_empty())
            .collect();

        self.filter(|record| {
            if let Some(name) = &name {
                if !record.name.contains(name.as_str()) {
                    return false;
                }
            }
            if !types
                .iter()
                .all(|wanted| record.types.iter().any(|t| t.eq_ignore_ascii_case(wanted)))
            {
                return false;
            }
            if let Some(ability) = &ability {
                if !any_contains(&record.abilities, ability) {
                    return false;
                }
            }
            if let Some(move_name) = &move_name {
                if !any_contains(&record.moves, move_name) {
                    return false;
                }
            }
            if let Some(generation) = &generation {
                let matches = record
                    .generation
                    .as_deref()
                    .map(|value| value.to_lowercase().contains(generation.as_str()))
                    .unwrap_or(false);
                if !matches {
                    return false;
                }
            }
            true
        })
    }

    fn filter<F>(&self, predicate: F) -> Result<Vec<EntityRecord>, DexError>
    where
        F: Fn(&EntityRecord) -> bool,
    {
        Ok(self
            .store
            .find_all_ordered_by_id()?
            .into_iter()
            .filter(|record| predicate(record))
            .collect())
    }
}

fn any_contains(values: &[String], needle: &str) -> bool {
    values
        .iter()
        .any(|value| value.to_lowercase().contains(needle))
}

fn non_empty(value: Option<&str>) -> Option<String> {
    value
        .map(|value| value.trim().to_lowercase())
        .filter(|value| !value.is_empty())
}
