//! Fallback taken when strict parsing fails on input that still looks like a save.
//!
//! Nothing produced here is authoritative. It only ever reaches callers wrapped in
//! [`DegradedParse`], which keeps the guilds behind `unverified_guilds()`.

use tracing::{debug, warn};

use crate::container::CONTAINER_MAGIC;
use crate::core_api::{
    Catalog, CoreError, DegradedParse, GuildRecord, PalRecord, PassiveRecord, PlayerRecord,
    Rarity, RecoverySource,
};
use crate::extract::{
    self, CHARACTER_SAVE_PARAMETER_MAP, GROUP_SAVE_DATA_MAP, GUILD_GROUP_TYPE,
    UNKNOWN_PASSIVE_DESCRIPTION, WORLD_SAVE_DATA,
};
use crate::header::DOCUMENT_MAGIC;
use crate::property::PropertyMap;

pub const RECOVERY_SCAN_LIMIT: usize = 1024 * 1024;
pub const MAX_SPECIES_MARKERS: usize = 64;

const SIGNATURE_MARKERS: &[(&str, &[u8])] = &[
    ("container magic", &CONTAINER_MAGIC),
    ("GVAS", &DOCUMENT_MAGIC),
    ("PlZ", b"PlZ"),
];

const KEYWORD_MARKERS: &[&str] = &[
    WORLD_SAVE_DATA,
    GROUP_SAVE_DATA_MAP,
    CHARACTER_SAVE_PARAMETER_MAP,
    GUILD_GROUP_TYPE,
    "PassiveSkillList",
];

pub const SAMPLE_GUILD_NAME: &str = "Sample Guild";
pub const SAMPLE_PLAYER_NAME: &str = "SamplePlayer";

/// Names of every marker found in the first [`RECOVERY_SCAN_LIMIT`] bytes.
pub fn scan_markers(bytes: &[u8], catalog: &Catalog) -> Vec<String> {
    let window = &bytes[..bytes.len().min(RECOVERY_SCAN_LIMIT)];
    let mut found = Vec::new();

    for (label, needle) in SIGNATURE_MARKERS {
        if contains(window, needle) {
            found.push((*label).to_string());
        }
    }
    for keyword in KEYWORD_MARKERS {
        if contains(window, keyword.as_bytes()) {
            found.push((*keyword).to_string());
        }
    }
    for name in catalog.species_names(MAX_SPECIES_MARKERS) {
        if contains(window, name.as_bytes()) {
            found.push(name.to_string());
        }
    }
    found
}

fn contains(haystack: &[u8], needle: &[u8]) -> bool {
    !needle.is_empty() && haystack.windows(needle.len()).any(|w| w == needle)
}

/// Builds a degraded result for `cause`, or hands `cause` back when the bytes carry no sign
/// of being a save at all.
pub fn recover(
    bytes: &[u8],
    cause: CoreError,
    partial: Option<&PropertyMap>,
    catalog: &Catalog,
) -> Result<DegradedParse, CoreError> {
    let markers = scan_markers(bytes, catalog);
    if markers.is_empty() {
        debug!(%cause, "no save markers; not recovering");
        return Err(cause);
    }

    let from_tree = partial
        .map(|tree| extract::extract_guilds(tree, catalog).0)
        .filter(|guilds| !guilds.is_empty());
    let (source, guilds) = match from_tree {
        Some(guilds) => (RecoverySource::PartialTree, guilds),
        None => (RecoverySource::SampleData, sample_guilds(catalog)),
    };

    warn!(
        %cause,
        markers = markers.len(),
        ?source,
        "strict parse failed; returning unverified data"
    );
    Ok(DegradedParse::new(cause, markers, source, guilds))
}

/// Fixed placeholder roster returned when nothing could be salvaged.
pub fn sample_guilds(catalog: &Catalog) -> Vec<GuildRecord> {
    let owner_id = "sample-player".to_string();
    let pal = |id: &str, species: &str, level: u32, passive: &str| PalRecord {
        id: id.to_string(),
        name: species.to_string(),
        species: Some(species.to_string()),
        level,
        passives: vec![sample_passive(passive, catalog)],
        owner_id: owner_id.clone(),
        owner_name: SAMPLE_PLAYER_NAME.to_string(),
    };
    let pals = vec![
        pal("sample-pal-1", "Lamball", 15, "Work Speedster"),
        pal("sample-pal-2", "Foxparks", 22, "Nimble"),
    ];

    vec![GuildRecord {
        guild_name: SAMPLE_GUILD_NAME.to_string(),
        members: vec![PlayerRecord {
            id: owner_id.clone(),
            name: SAMPLE_PLAYER_NAME.to_string(),
            last_online: None,
            pals,
        }],
    }]
}

fn sample_passive(name: &str, catalog: &Catalog) -> PassiveRecord {
    match catalog.passive(name) {
        Some(definition) => PassiveRecord {
            id: name.to_string(),
            name: definition.name.clone(),
            description: definition.description.clone(),
            rarity: definition.rarity,
        },
        None => PassiveRecord {
            id: name.to_string(),
            name: name.to_string(),
            description: UNKNOWN_PASSIVE_DESCRIPTION.to_string(),
            rarity: Rarity::Common,
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn finds_signature_keyword_and_species_markers() {
        let mut bytes = CONTAINER_MAGIC.to_vec();
        bytes.extend_from_slice(b"....worldSaveData....Foxparks..");
        let markers = scan_markers(&bytes, &Catalog::builtin());
        assert_eq!(markers, ["container magic", "worldSaveData", "Foxparks"]);
    }

    #[test]
    fn markers_beyond_scan_limit_are_ignored() {
        let mut bytes = vec![0u8; RECOVERY_SCAN_LIMIT];
        bytes.extend_from_slice(b"GVAS");
        assert!(scan_markers(&bytes, &Catalog::builtin()).is_empty());
    }

    #[test]
    fn no_markers_returns_the_cause() {
        let cause = CoreError::format("bad container magic");
        let err = recover(b"plain text", cause.clone(), None, &Catalog::builtin()).unwrap_err();
        assert_eq!(err, cause);
    }

    #[test]
    fn falls_back_to_sample_roster() {
        let cause = CoreError::format("bad document header");
        let degraded = recover(b"xxGVASxx", cause, None, &Catalog::builtin()).unwrap();
        assert_eq!(degraded.source, RecoverySource::SampleData);
        let guilds = degraded.unverified_guilds();
        assert_eq!(guilds[0].guild_name, SAMPLE_GUILD_NAME);
        let pals = &guilds[0].members[0].pals;
        assert_eq!((pals[0].name.as_str(), pals[0].level), ("Lamball", 15));
        assert_eq!(pals[0].passives[0].description, "Increases work speed");
        assert_eq!((pals[1].name.as_str(), pals[1].level), ("Foxparks", 22));
        assert_eq!(pals[1].passives[0].name, "Nimble");
    }
}
