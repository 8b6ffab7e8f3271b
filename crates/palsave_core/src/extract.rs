//! Walks a parsed property tree into guild, player and pal records.
//!
//! Every lookup is optional: a missing or differently-typed property yields less output,
//! never an error.

use std::collections::HashMap;

use tracing::{debug, warn};

use crate::core_api::{
    Catalog, ExtractionStats, GuildRecord, PalRecord, PassiveRecord, PlayerRecord, Rarity,
};
use crate::property::{Property, PropertyMap};

pub const WORLD_SAVE_DATA: &str = "worldSaveData";
pub const GROUP_SAVE_DATA_MAP: &str = "GroupSaveDataMap";
pub const CHARACTER_SAVE_PARAMETER_MAP: &str = "CharacterSaveParameterMap";
pub const GUILD_GROUP_TYPE: &str = "EPalGroupType::Guild";
pub const PLAYER_CHARACTER_TYPE: &str = "EPalCharacterType::Player";
pub const UNKNOWN_PASSIVE_DESCRIPTION: &str = "Unknown ability";

pub fn extract_guilds(
    root: &PropertyMap,
    catalog: &Catalog,
) -> (Vec<GuildRecord>, ExtractionStats) {
    let mut stats = ExtractionStats::default();
    let world = root.get(WORLD_SAVE_DATA).and_then(Property::fields);

    let mut guilds = read_guilds(world, &mut stats);
    let characters = world
        .and_then(|w| w.get(CHARACTER_SAVE_PARAMETER_MAP))
        .or_else(|| root.get(CHARACTER_SAVE_PARAMETER_MAP))
        .and_then(Property::as_map);

    if let Some(characters) = characters {
        attach_pals(&mut guilds, &characters.entries, catalog, &mut stats);
    } else {
        debug!("no character map; guilds carry no pals");
    }

    debug!(guilds = guilds.len(), ?stats, "extraction finished");
    (guilds, stats)
}

fn read_guilds(world: Option<&PropertyMap>, stats: &mut ExtractionStats) -> Vec<GuildRecord> {
    let Some(groups) = world
        .and_then(|w| w.get(GROUP_SAVE_DATA_MAP))
        .and_then(Property::as_map)
    else {
        debug!("no group map; no guilds");
        return Vec::new();
    };

    let mut guilds = Vec::new();
    for (group_key, group) in &groups.entries {
        stats.groups_seen += 1;
        let group_type = group.get("GroupType").and_then(Property::as_str);
        if group_type != Some(GUILD_GROUP_TYPE) {
            stats.non_guild_groups += 1;
            continue;
        }

        let raw = group
            .get("RawData")
            .and_then(Property::fields)
            .unwrap_or(group);
        let guild_name = raw
            .get("guild_name")
            .and_then(Property::as_str)
            .unwrap_or(group_key.as_str())
            .to_string();

        let mut members: Vec<PlayerRecord> = Vec::new();
        let players = raw.get("players").and_then(Property::as_array);
        for player in players.map(|a| a.elements.as_slice()).unwrap_or_default() {
            let Some(id) = player.get("player_uid").and_then(id_of) else {
                warn!(guild = %guild_name, "guild member without an id; skipping");
                continue;
            };
            if members.iter().any(|m| m.id == id) {
                continue;
            }
            let info = player.get("player_info").and_then(Property::fields);
            members.push(PlayerRecord {
                name: info
                    .and_then(|i| i.get("player_name"))
                    .and_then(Property::as_str)
                    .unwrap_or_default()
                    .to_string(),
                last_online: info
                    .and_then(|i| i.get("last_online_real_time"))
                    .and_then(Property::as_i64),
                id,
                pals: Vec::new(),
            });
        }

        guilds.push(GuildRecord {
            guild_name,
            members,
        });
    }
    guilds
}

fn attach_pals(
    guilds: &mut [GuildRecord],
    characters: &[(String, PropertyMap)],
    catalog: &Catalog,
    stats: &mut ExtractionStats,
) {
    // A player listed in several guilds gets their pals in each of them.
    let mut owners: HashMap<String, Vec<(usize, usize)>> = HashMap::new();
    for (g, guild) in guilds.iter().enumerate() {
        for (m, member) in guild.members.iter().enumerate() {
            owners.entry(member.id.clone()).or_default().push((g, m));
        }
    }

    for (instance_id, entry) in characters {
        stats.characters_seen += 1;
        let params = save_parameter(entry);
        if is_player(params) {
            stats.player_characters += 1;
            continue;
        }

        let owner = params
            .get("OwnerPlayerUId")
            .and_then(id_of)
            .filter(|id| !is_nil_id(id));
        let Some(owner) = owner else {
            stats.ownerless_pals += 1;
            continue;
        };
        let Some(slots) = owners.get(&owner) else {
            stats.unmatched_owner_pals += 1;
            debug!(instance_id = %instance_id, owner = %owner, "pal owner is not a guild member");
            continue;
        };

        let pal = build_pal(instance_id, params, catalog, stats);
        for &(g, m) in slots {
            let member = &mut guilds[g].members[m];
            member.pals.push(PalRecord {
                owner_id: member.id.clone(),
                owner_name: member.name.clone(),
                ..pal.clone()
            });
        }
    }
}

/// Builds the pal with the owner fields left empty; the caller fills them per guild.
fn build_pal(
    instance_id: &str,
    params: &PropertyMap,
    catalog: &Catalog,
    stats: &mut ExtractionStats,
) -> PalRecord {
    let character_id = params
        .get("CharacterID")
        .and_then(Property::as_str)
        .filter(|s| !s.is_empty());
    let species = character_id.and_then(|c| catalog.species(c));
    let nickname = params
        .get("NickName")
        .and_then(Property::as_str)
        .filter(|s| !s.is_empty());
    let name = nickname
        .or(species)
        .or(character_id)
        .unwrap_or(instance_id)
        .to_string();

    let level = params
        .get("Level")
        .and_then(Property::as_i64)
        .map_or(1, |l| l.clamp(1, i64::from(u32::MAX)) as u32);

    let passives = params
        .get("PassiveSkillList")
        .and_then(Property::as_array)
        .map(|list| {
            list.elements
                .iter()
                .filter_map(passive_id)
                .map(|id| resolve_passive(id, catalog, stats))
                .collect()
        })
        .unwrap_or_default();

    PalRecord {
        id: instance_id.to_string(),
        name,
        species: species.map(str::to_string),
        level,
        passives,
        owner_id: String::new(),
        owner_name: String::new(),
    }
}

fn resolve_passive(id: &str, catalog: &Catalog, stats: &mut ExtractionStats) -> PassiveRecord {
    match catalog.passive(id) {
        Some(definition) => PassiveRecord {
            id: id.to_string(),
            name: definition.name.clone(),
            description: definition.description.clone(),
            rarity: definition.rarity,
        },
        None => {
            stats.unresolved_passives += 1;
            debug!(id, "passive not in catalog");
            PassiveRecord {
                id: id.to_string(),
                name: id.to_string(),
                description: UNKNOWN_PASSIVE_DESCRIPTION.to_string(),
                rarity: Rarity::Common,
            }
        }
    }
}

/// `RawData.SaveParameter` when present, otherwise the entry itself.
fn save_parameter(entry: &PropertyMap) -> &PropertyMap {
    let raw = entry.get("RawData").and_then(Property::fields);
    raw.and_then(|r| r.get("SaveParameter"))
        .and_then(Property::fields)
        .or(raw)
        .unwrap_or(entry)
}

fn is_player(params: &PropertyMap) -> bool {
    params
        .get("IsPlayer")
        .and_then(Property::as_bool)
        .unwrap_or(false)
        || params.get("CharacterType").and_then(Property::as_str) == Some(PLAYER_CHARACTER_TYPE)
}

/// A passive list element holds a single scalar, whatever it is named.
fn passive_id(element: &PropertyMap) -> Option<&str> {
    element.iter().find_map(|(_, p)| p.as_str())
}

/// Identifier of a struct-wrapped guid or a plain string id, normalized for comparison.
fn id_of(property: &Property) -> Option<String> {
    match property.as_struct() {
        Some(s) => Some(s.guid.to_string()),
        None => property
            .as_str()
            .map(|s| s.trim().to_ascii_lowercase())
            .filter(|s| !s.is_empty()),
    }
}

fn is_nil_id(id: &str) -> bool {
    id.chars().all(|c| c == '0' || c == '-')
}
