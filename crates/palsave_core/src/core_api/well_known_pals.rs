//! Built-in species and passive tables.
//!
//! Codes are the small integer ids older tooling wrote into `CharacterID` and
//! `PassiveSkillList`. Current saves use internal asset names instead; a handful of the common
//! ones are aliased here, and a catalog file can supply the rest.

use super::types::Rarity;

pub(crate) struct WellKnownPassive {
    pub code: u32,
    pub name: &'static str,
    pub description: &'static str,
    pub rarity: Rarity,
}

#[rustfmt::skip]
pub(crate) const WELL_KNOWN_PASSIVES: &[WellKnownPassive] = &[
    WellKnownPassive { code: 0x01, name: "Work Speedster",        description: "Increases work speed",                   rarity: Rarity::Common },
    WellKnownPassive { code: 0x02, name: "Suntan Lover",          description: "Higher efficiency during daytime",       rarity: Rarity::Common },
    WellKnownPassive { code: 0x03, name: "Artisan",               description: "Improves product quality",               rarity: Rarity::Uncommon },
    WellKnownPassive { code: 0x04, name: "Positive Thinker",      description: "Increases sanity recovery",              rarity: Rarity::Common },
    WellKnownPassive { code: 0x05, name: "Motivational Leader",   description: "Boosts nearby allies' work speed",       rarity: Rarity::Rare },
    WellKnownPassive { code: 0x06, name: "Brave",                 description: "Less likely to become afraid",           rarity: Rarity::Uncommon },
    WellKnownPassive { code: 0x07, name: "Unstoppable",           description: "Won't stop working even at low health",  rarity: Rarity::Rare },
    WellKnownPassive { code: 0x08, name: "Nimble",                description: "Slightly faster movement",               rarity: Rarity::Common },
    WellKnownPassive { code: 0x09, name: "Logging Foreman",       description: "Enhanced logging efficiency",            rarity: Rarity::Uncommon },
    WellKnownPassive { code: 0x0A, name: "Mining Foreman",        description: "Enhanced mining efficiency",             rarity: Rarity::Uncommon },
    WellKnownPassive { code: 0x0B, name: "Planting Foreman",      description: "Enhanced planting efficiency",           rarity: Rarity::Uncommon },
    WellKnownPassive { code: 0x0C, name: "Defensive",             description: "Increased defense when guarding base",   rarity: Rarity::Rare },
    WellKnownPassive { code: 0x0D, name: "Power Conservationist", description: "Reduces electricity consumption",        rarity: Rarity::Rare },
    WellKnownPassive { code: 0x0E, name: "Serious",               description: "Focuses intently on assigned work",      rarity: Rarity::Common },
    WellKnownPassive { code: 0x0F, name: "Ruthless",              description: "Increased critical hit chance",          rarity: Rarity::Epic },
    WellKnownPassive { code: 0x10, name: "Legend",                description: "Significantly enhances all abilities",   rarity: Rarity::Legendary },
];

#[rustfmt::skip]
pub(crate) const WELL_KNOWN_SPECIES: &[(u32, &str)] = &[
    (0x01, "Lamball"),     (0x02, "Cattiva"),     (0x03, "Chikipi"),     (0x04, "Lifmunk"),
    (0x05, "Foxparks"),    (0x06, "Fuack"),       (0x07, "Sparkit"),     (0x08, "Tanzee"),
    (0x09, "Rooby"),       (0x0A, "Pengullet"),   (0x0B, "Penking"),     (0x0C, "Chillet"),
    (0x0D, "Univolt"),     (0x0E, "Foxcicle"),    (0x0F, "Pyrin"),       (0x10, "Reindrix"),
    (0x11, "Rayhound"),    (0x12, "Kitsun"),      (0x13, "Dazzi"),       (0x14, "Lunaris"),
    (0x15, "Dinossom"),    (0x16, "Grizzbolt"),   (0x17, "Lovander"),    (0x18, "Flambelle"),
    (0x19, "Vanwyrm"),     (0x1A, "Bushi"),       (0x1B, "Beakon"),      (0x1C, "Ragnahawk"),
    (0x1D, "Katress"),     (0x1E, "Wixen"),       (0x1F, "Verdash"),     (0x20, "Vaelet"),
    (0x21, "Sibelyx"),     (0x22, "Eikthyrdeer"), (0x23, "Mammorest"),   (0x24, "Melpaca"),
    (0x25, "Woolipop"),    (0x26, "Mozzarina"),   (0x27, "Bristla"),     (0x28, "Gobfin"),
    (0x29, "Hangyu"),      (0x2A, "Swee"),        (0x2B, "Sweepa"),      (0x2C, "Chunchee"),
    (0x2D, "Kingpaca"),    (0x2E, "Arsox"),       (0x2F, "Dumud"),       (0x30, "Cawgnito"),
    (0x31, "Leezpunk"),    (0x32, "Loupmoon"),    (0x33, "Galeclaw"),    (0x34, "Robinquill"),
    (0x35, "Gorirat"),     (0x36, "Beegarde"),    (0x37, "Elizabee"),    (0x38, "Grintale"),
    (0x39, "Swampent"),    (0x3A, "Firestirge"),  (0x3B, "Cryolinx"),    (0x3C, "Petallia"),
    (0x3D, "Azurobe"),     (0x3E, "Cryolinx"),    (0x3F, "Blazehowl"),   (0x40, "Relaxaurus"),
    (0x41, "Tombat"),      (0x42, "Troubark"),    (0x43, "Quivern"),     (0x44, "Helzephyr"),
    (0x45, "Astegon"),     (0x46, "Menasting"),   (0x47, "Anubis"),      (0x48, "Jormuntide"),
    (0x49, "Wumpo"),       (0x4A, "Frostallion"), (0x4B, "Necromus"),    (0x4C, "Faleris"),
    (0x4D, "Orserk"),      (0x4E, "Shadowbeak"),  (0x4F, "Paladius"),    (0x50, "Jetragon"),
];

// Internal asset names seen in `CharacterID`, matched case-insensitively.
#[rustfmt::skip]
pub(crate) const SPECIES_ALIASES: &[(&str, &str)] = &[
    ("SheepBall",      "Lamball"),
    ("PinkCat",        "Cattiva"),
    ("ChickenPal",     "Chikipi"),
    ("Carbunclo",      "Lifmunk"),
    ("Kitsunebi",      "Foxparks"),
    ("BluePlatypus",   "Fuack"),
    ("ElecCat",        "Sparkit"),
    ("Monkey",         "Tanzee"),
    ("Penguin",        "Pengullet"),
    ("CaptainPenguin", "Penking"),
    ("Anubis",         "Anubis"),
    ("JetDragon",      "Jetragon"),
];

#[cfg(test)]
mod tests {
    use std::collections::BTreeSet;

    use super::*;

    #[test]
    fn codes_are_unique() {
        let species: BTreeSet<u32> = WELL_KNOWN_SPECIES.iter().map(|(c, _)| *c).collect();
        assert_eq!(species.len(), WELL_KNOWN_SPECIES.len());
        let passives: BTreeSet<u32> = WELL_KNOWN_PASSIVES.iter().map(|p| p.code).collect();
        assert_eq!(passives.len(), WELL_KNOWN_PASSIVES.len());
        assert_eq!(WELL_KNOWN_PASSIVES.len(), 16);
    }

    #[test]
    fn tables_carry_expected_entries() {
        assert!(WELL_KNOWN_SPECIES.contains(&(0x05, "Foxparks")));
        let legend = WELL_KNOWN_PASSIVES.iter().find(|p| p.code == 0x10).unwrap();
        assert_eq!(legend.name, "Legend");
        assert_eq!(legend.rarity, Rarity::Legendary);
    }
}
