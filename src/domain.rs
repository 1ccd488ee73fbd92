use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::DexError;

pub const UNKNOWN: &str = "unknown";

pub const DESCRIPTION_NOT_FOUND: &str = "Description not found.";

pub const PRIMARY_ID_CEILING: u32 = 1025;

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct EntityName(String);

impl EntityName {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_string(self) -> String {
        self.0
    }
}

impl fmt::Display for EntityName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for EntityName {
    type Err = DexError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let normalized = value.trim().to_lowercase();
        if normalized.is_empty() || normalized.chars().any(char::is_whitespace) {
            return Err(DexError::InvalidName(value.to_string()));
        }
        Ok(Self(normalized))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntityRecord {
    pub id: u32,
    pub name: String,
    pub height: u32,
    pub weight: u32,
    #[serde(default)]
    pub types: Vec<String>,
    #[serde(default)]
    pub abilities: Vec<String>,
    #[serde(default)]
    pub moves: Vec<String>,
    #[serde(default)]
    pub stats: BTreeMap<String, u32>,
    pub sprite: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sprite_base64: Option<String>,
    #[serde(default)]
    pub generation: Option<String>,
    pub evolution: Vec<String>,
    pub description: String,
}

impl EntityRecord {
    pub fn new(id: u32, name: EntityName, sprite: String) -> Self {
        Self {
            id,
            name: name.into_string(),
            height: 0,
            weight: 0,
            types: Vec::new(),
            abilities: Vec::new(),
            moves: Vec::new(),
            stats: BTreeMap::new(),
            sprite,
            sprite_base64: None,
            generation: None,
            evolution: unknown_evolution(),
            description: DESCRIPTION_NOT_FOUND.to_string(),
        }
    }

    pub fn has_sprite_asset(&self) -> bool {
        self.sprite_base64
            .as_deref()
            .map(|value| !value.is_empty())
            .unwrap_or(false)
    }

    pub fn has_description(&self) -> bool {
        !self.description.is_empty() && self.description != DESCRIPTION_NOT_FOUND
    }
}

pub fn unknown_evolution() -> Vec<String> {
    vec![UNKNOWN.to_string()]
}

pub fn sprite_url(base: &str, id: u32) -> String {
    format!("{}/{id}.png", base.trim_end_matches('/'))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ItemStatus {
    Started,
    Ok,
    Exists,
    Error,
}

impl fmt::Display for ItemStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ItemStatus::Started => write!(f, "started"),
            ItemStatus::Ok => write!(f, "ok"),
            ItemStatus::Exists => write!(f, "exists"),
            ItemStatus::Error => write!(f, "error"),
        }
    }
}
