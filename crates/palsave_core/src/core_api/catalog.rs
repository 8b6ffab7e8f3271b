use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::path::Path;
use std::sync::Arc;

use once_cell::sync::Lazy;
use serde::Deserialize;
use tracing::debug;

use super::error::{CoreError, CoreErrorCode};
use super::types::Rarity;
use super::well_known_pals::{SPECIES_ALIASES, WELL_KNOWN_PASSIVES, WELL_KNOWN_SPECIES};

static BUILTIN: Lazy<Arc<Catalog>> = Lazy::new(|| Arc::new(Catalog::from_builtin_tables()));

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PassiveDefinition {
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub rarity: Rarity,
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct CatalogFile {
    #[serde(default)]
    species: BTreeMap<String, String>,
    #[serde(default)]
    passives: BTreeMap<String, PassiveDefinition>,
}

/// Display names for species and passive ids. Keys that read as integers (decimal or `0x`
/// hex) are indexed by code; everything else by name.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Catalog {
    species_by_name: BTreeMap<String, String>,
    species_by_code: BTreeMap<u32, String>,
    passives_by_name: BTreeMap<String, PassiveDefinition>,
    passives_by_code: BTreeMap<u32, PassiveDefinition>,
}

impl Catalog {
    /// Shared instance holding only the built-in tables.
    pub fn builtin() -> Arc<Catalog> {
        Arc::clone(&BUILTIN)
    }

    pub fn empty() -> Self {
        Self::default()
    }

    fn from_builtin_tables() -> Self {
        let mut catalog = Self::default();
        for (code, name) in WELL_KNOWN_SPECIES {
            catalog.species_by_code.insert(*code, (*name).to_string());
        }
        for (key, name) in SPECIES_ALIASES {
            catalog.insert_species(key, name);
        }
        for p in WELL_KNOWN_PASSIVES {
            let definition = PassiveDefinition {
                name: p.name.to_string(),
                description: p.description.to_string(),
                rarity: p.rarity,
            };
            // Old tooling also wrote the display name itself into the list.
            catalog
                .passives_by_name
                .insert(p.name.to_string(), definition.clone());
            catalog.passives_by_code.insert(p.code, definition);
        }
        catalog
    }

    /// Built-in tables with the entries of a JSON catalog file merged over them.
    pub fn load_from_path(path: &Path) -> Result<Self, CoreError> {
        let text = fs::read_to_string(path).map_err(|e| {
            CoreError::new(
                CoreErrorCode::Io,
                format!("failed to read {}: {e}", path.display()),
            )
        })?;
        let mut catalog = Self::from_builtin_tables();
        catalog.merge_json(&text).map_err(|e| {
            CoreError::new(
                CoreErrorCode::Catalog,
                format!("invalid catalog {}: {}", path.display(), e.message),
            )
        })?;
        debug!(
            path = %path.display(),
            species = catalog.species_len(),
            passives = catalog.passives_len(),
            "loaded catalog"
        );
        Ok(catalog)
    }

    pub fn merge_json(&mut self, text: &str) -> Result<(), CoreError> {
        let file: CatalogFile = serde_json::from_str(text)
            .map_err(|e| CoreError::new(CoreErrorCode::Catalog, e.to_string()))?;
        for (key, name) in file.species {
            self.insert_species(&key, &name);
        }
        for (key, definition) in file.passives {
            self.insert_passive(&key, definition);
        }
        Ok(())
    }

    pub fn insert_species(&mut self, key: &str, name: &str) {
        match parse_code(key) {
            Some(code) => self.species_by_code.insert(code, name.to_string()),
            None => self
                .species_by_name
                .insert(key.to_ascii_lowercase(), name.to_string()),
        };
    }

    pub fn insert_passive(&mut self, key: &str, definition: PassiveDefinition) {
        match parse_code(key) {
            Some(code) => self.passives_by_code.insert(code, definition),
            None => self.passives_by_name.insert(key.to_string(), definition),
        };
    }

    /// Resolves a `CharacterID`. Boss variants resolve to their base species.
    pub fn species(&self, character_id: &str) -> Option<&str> {
        let key = character_id
            .strip_prefix("BOSS_")
            .or_else(|| character_id.strip_prefix("Boss_"))
            .unwrap_or(character_id);
        self.species_by_name
            .get(&key.to_ascii_lowercase())
            .or_else(|| parse_code(key).and_then(|code| self.species_by_code.get(&code)))
            .map(String::as_str)
    }

    pub fn passive(&self, id: &str) -> Option<&PassiveDefinition> {
        self.passives_by_name
            .get(id)
            .or_else(|| parse_code(id).and_then(|code| self.passives_by_code.get(&code)))
    }

    /// Distinct species display names, in code order then name order, at most `limit`.
    pub fn species_names(&self, limit: usize) -> Vec<&str> {
        let mut seen = BTreeSet::new();
        self.species_by_code
            .values()
            .chain(self.species_by_name.values())
            .map(String::as_str)
            .filter(|name| seen.insert(*name))
            .take(limit)
            .collect()
    }

    pub fn species_len(&self) -> usize {
        self.species_by_code.len() + self.species_by_name.len()
    }

    pub fn passives_len(&self) -> usize {
        self.passives_by_code.len() + self.passives_by_name.len()
    }
}

pub(crate) fn parse_code(raw: &str) -> Option<u32> {
    let raw = raw.trim();
    match raw.strip_prefix("0x").or_else(|| raw.strip_prefix("0X")) {
        Some(hex) => u32::from_str_radix(hex, 16).ok(),
        None => raw.parse().ok(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn codes_parse_in_decimal_and_hex() {
        assert_eq!(parse_code("16"), Some(16));
        assert_eq!(parse_code("0x10"), Some(16));
        assert_eq!(parse_code("0X0a"), Some(10));
        assert_eq!(parse_code("SheepBall"), None);
        assert_eq!(parse_code("-1"), None);
    }

    #[test]
    fn builtin_resolves_codes_aliases_and_bosses() {
        let catalog = Catalog::builtin();
        assert_eq!(catalog.species("0x01"), Some("Lamball"));
        assert_eq!(catalog.species("5"), Some("Foxparks"));
        assert_eq!(catalog.species("SheepBall"), Some("Lamball"));
        assert_eq!(catalog.species("sheepball"), Some("Lamball"));
        assert_eq!(catalog.species("BOSS_SheepBall"), Some("Lamball"));
        assert_eq!(catalog.species("NotAPal"), None);

        assert_eq!(catalog.passive("0x08").unwrap().name, "Nimble");
        assert_eq!(catalog.passive("8").unwrap().name, "Nimble");
        assert_eq!(catalog.passive("Work Speedster").unwrap().rarity, Rarity::Common);
        assert!(catalog.passive("CraftSpeed_up1").is_none());
    }

    #[test]
    fn json_merges_over_builtins() {
        let mut catalog = Catalog::from_builtin_tables();
        catalog
            .merge_json(
                r#"{
                    "species": { "0x01": "Woolly", "NewThing": "Newt" },
                    "passives": { "CraftSpeed_up1": { "name": "Artisan+", "rarity": "epic" } }
                }"#,
            )
            .unwrap();
        assert_eq!(catalog.species("1"), Some("Woolly"));
        assert_eq!(catalog.species("newthing"), Some("Newt"));
        let p = catalog.passive("CraftSpeed_up1").unwrap();
        assert_eq!(p.rarity, Rarity::Epic);
        assert_eq!(p.description, "");
    }

    #[test]
    fn malformed_json_is_catalog_error() {
        let mut catalog = Catalog::empty();
        let err = catalog.merge_json(r#"{ "species": [1, 2] }"#).unwrap_err();
        assert_eq!(err.code, CoreErrorCode::Catalog);
    }

    #[test]
    fn species_names_are_distinct_and_bounded() {
        let catalog = Catalog::builtin();
        let names = catalog.species_names(64);
        assert_eq!(names.len(), 64);
        assert_eq!(names[0], "Lamball");
        assert_eq!(names.iter().filter(|n| **n == "Cryolinx").count(), 1);
    }
}
