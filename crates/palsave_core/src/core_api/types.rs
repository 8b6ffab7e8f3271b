use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Rarity {
    #[default]
    Common,
    Uncommon,
    Rare,
    Epic,
    Legendary,
}

impl Rarity {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Common => "common",
            Self::Uncommon => "uncommon",
            Self::Rare => "rare",
            Self::Epic => "epic",
            Self::Legendary => "legendary",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PassiveRecord {
    pub id: String,
    pub name: String,
    pub description: String,
    pub rarity: Rarity,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PalRecord {
    pub id: String,
    pub name: String,
    pub species: Option<String>,
    pub level: u32,
    pub passives: Vec<PassiveRecord>,
    pub owner_id: String,
    pub owner_name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PlayerRecord {
    pub id: String,
    pub name: String,
    /// Raw engine timestamp, when the save carries one.
    pub last_online: Option<i64>,
    pub pals: Vec<PalRecord>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct GuildRecord {
    pub guild_name: String,
    pub members: Vec<PlayerRecord>,
}

impl GuildRecord {
    pub fn pal_count(&self) -> usize {
        self.members.iter().map(|m| m.pals.len()).sum()
    }
}

/// Counters for everything the extractor looked at but did not turn into output.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExtractionStats {
    pub groups_seen: usize,
    pub non_guild_groups: usize,
    pub characters_seen: usize,
    pub player_characters: usize,
    pub ownerless_pals: usize,
    pub unmatched_owner_pals: usize,
    pub unresolved_passives: usize,
}
