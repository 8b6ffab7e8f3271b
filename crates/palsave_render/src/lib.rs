use std::fmt::Write as _;

use palsave_core::core_api::{
    ExtractionStats, GuildRecord, PalRecord, ParseOutcome, PassiveRecord, PlayerRecord,
};
use palsave_core::header::DocumentHeader;
use palsave_core::property::{Property, PropertyMap, PropertyValue};
use serde_json::{Map as JsonMap, Value as JsonValue};

const DEGRADED_RULE: &str =
    "!!!!!!!!!!!!!!!!!!!!!!!!!!!!!!!!!!!!!!!!!!!!!!!!!!!!!!!!!!!!!!!!!!!!!!!!!!!!";
const NAME_COL_WIDTH: usize = 24;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RenderOptions<'a> {
    /// Only render the guild with this name (case-insensitive).
    pub guild: Option<&'a str>,
    pub verbose: bool,
}

pub fn render_json(outcome: &ParseOutcome) -> JsonValue {
    render_json_with_options(outcome, RenderOptions::default())
}

pub fn render_json_with_options(outcome: &ParseOutcome, options: RenderOptions<'_>) -> JsonValue {
    let (guilds, degraded) = outcome.guilds_with_flag();
    let mut out = JsonMap::new();

    out.insert("degraded".to_string(), JsonValue::Bool(degraded));
    out.insert(
        "source".to_string(),
        JsonValue::String(source_label(outcome).to_string()),
    );
    out.insert(
        "compression_layers".to_string(),
        match outcome.compression_layers() {
            Some(n) => JsonValue::from(n),
            None => JsonValue::Null,
        },
    );
    out.insert(
        "guilds".to_string(),
        JsonValue::Array(
            selected_guilds(guilds, options)
                .map(guild_to_json)
                .collect(),
        ),
    );

    match outcome {
        ParseOutcome::Strict(strict) => {
            if options.verbose {
                out.insert("header".to_string(), header_to_json(&strict.header));
                out.insert("stats".to_string(), stats_to_json(&strict.stats));
            }
        }
        ParseOutcome::Degraded(degraded) => {
            out.insert(
                "cause".to_string(),
                JsonValue::String(degraded.cause.to_string()),
            );
            out.insert(
                "markers".to_string(),
                JsonValue::Array(
                    degraded
                        .markers
                        .iter()
                        .cloned()
                        .map(JsonValue::String)
                        .collect(),
                ),
            );
        }
    }

    JsonValue::Object(out)
}

fn guild_to_json(guild: &GuildRecord) -> JsonValue {
    let mut m = JsonMap::new();
    m.insert(
        "guild_name".to_string(),
        JsonValue::String(guild.guild_name.clone()),
    );
    m.insert(
        "members".to_string(),
        JsonValue::Array(guild.members.iter().map(player_to_json).collect()),
    );
    JsonValue::Object(m)
}

fn player_to_json(player: &PlayerRecord) -> JsonValue {
    let mut m = JsonMap::new();
    m.insert("id".to_string(), JsonValue::String(player.id.clone()));
    m.insert("name".to_string(), JsonValue::String(player.name.clone()));
    m.insert(
        "last_online".to_string(),
        match player.last_online {
            Some(v) => JsonValue::from(v),
            None => JsonValue::Null,
        },
    );
    m.insert(
        "pals".to_string(),
        JsonValue::Array(player.pals.iter().map(pal_to_json).collect()),
    );
    JsonValue::Object(m)
}

fn pal_to_json(pal: &PalRecord) -> JsonValue {
    let mut m = JsonMap::new();
    m.insert("id".to_string(), JsonValue::String(pal.id.clone()));
    m.insert("name".to_string(), JsonValue::String(pal.name.clone()));
    m.insert(
        "species".to_string(),
        match &pal.species {
            Some(s) => JsonValue::String(s.clone()),
            None => JsonValue::Null,
        },
    );
    m.insert("level".to_string(), JsonValue::from(pal.level));
    m.insert(
        "passives".to_string(),
        JsonValue::Array(pal.passives.iter().map(passive_to_json).collect()),
    );
    m.insert("owner_id".to_string(), JsonValue::String(pal.owner_id.clone()));
    m.insert(
        "owner_name".to_string(),
        JsonValue::String(pal.owner_name.clone()),
    );
    JsonValue::Object(m)
}

fn passive_to_json(p: &PassiveRecord) -> JsonValue {
    let mut m = JsonMap::new();
    m.insert("id".to_string(), JsonValue::String(p.id.clone()));
    m.insert("name".to_string(), JsonValue::String(p.name.clone()));
    m.insert(
        "description".to_string(),
        JsonValue::String(p.description.clone()),
    );
    m.insert(
        "rarity".to_string(),
        JsonValue::String(p.rarity.as_str().to_string()),
    );
    JsonValue::Object(m)
}

fn header_to_json(header: &DocumentHeader) -> JsonValue {
    let mut m = JsonMap::new();
    m.insert("magic".to_string(), JsonValue::String(header.magic.clone()));
    m.insert("version".to_string(), JsonValue::from(header.version));
    m.insert(
        "package_flags".to_string(),
        JsonValue::from(header.package_flags),
    );
    m.insert(
        "engine_version".to_string(),
        JsonValue::String(engine_version(header)),
    );
    m.insert(
        "custom_version".to_string(),
        JsonValue::from(header.custom_version),
    );
    m.insert(
        "document_version".to_string(),
        JsonValue::from(header.document_version),
    );
    JsonValue::Object(m)
}

fn stats_to_json(stats: &ExtractionStats) -> JsonValue {
    let mut m = JsonMap::new();
    m.insert("groups_seen".to_string(), JsonValue::from(stats.groups_seen));
    m.insert(
        "non_guild_groups".to_string(),
        JsonValue::from(stats.non_guild_groups),
    );
    m.insert(
        "characters_seen".to_string(),
        JsonValue::from(stats.characters_seen),
    );
    m.insert(
        "player_characters".to_string(),
        JsonValue::from(stats.player_characters),
    );
    m.insert(
        "ownerless_pals".to_string(),
        JsonValue::from(stats.ownerless_pals),
    );
    m.insert(
        "unmatched_owner_pals".to_string(),
        JsonValue::from(stats.unmatched_owner_pals),
    );
    m.insert(
        "unresolved_passives".to_string(),
        JsonValue::from(stats.unresolved_passives),
    );
    JsonValue::Object(m)
}

pub fn render_text(outcome: &ParseOutcome) -> String {
    render_text_with_options(outcome, RenderOptions::default())
}

pub fn render_text_with_options(outcome: &ParseOutcome, options: RenderOptions<'_>) -> String {
    let (guilds, _) = outcome.guilds_with_flag();
    let mut out = String::new();

    match outcome {
        ParseOutcome::Degraded(degraded) => {
            writeln!(out, "{DEGRADED_RULE}").expect("writing to String cannot fail");
            writeln!(out, "  DEGRADED OUTPUT: the save could not be parsed.")
                .expect("writing to String cannot fail");
            writeln!(out, "  Cause: {}", degraded.cause).expect("writing to String cannot fail");
            writeln!(
                out,
                "  The guilds below are NOT verified save data (source: {}).",
                source_label(outcome)
            )
            .expect("writing to String cannot fail");
            writeln!(out, "{DEGRADED_RULE}").expect("writing to String cannot fail");
            writeln!(out).expect("writing to String cannot fail");
        }
        ParseOutcome::Strict(strict) => {
            writeln!(
                out,
                "Save {} v{} (engine {}), {} compression layer(s)",
                strict.header.magic,
                strict.header.version,
                engine_version(&strict.header),
                strict.compression_layers
            )
            .expect("writing to String cannot fail");
            writeln!(out).expect("writing to String cannot fail");
        }
    }

    let mut shown = 0;
    for guild in selected_guilds(guilds, options) {
        shown += 1;
        write_guild(&mut out, guild);
    }
    if shown == 0 {
        let written = match options.guild {
            Some(name) => writeln!(out, "No guild named {name:?}."),
            None => writeln!(out, "No guilds found."),
        };
        written.expect("writing to String cannot fail");
    }

    if options.verbose
        && let ParseOutcome::Strict(strict) = outcome
    {
        let s = &strict.stats;
        writeln!(
            out,
            "Groups seen: {} ({} not guilds).",
            s.groups_seen, s.non_guild_groups
        )
        .expect("writing to String cannot fail");
        writeln!(
            out,
            "Characters seen: {} ({} players, {} without owner, {} owned outside any guild).",
            s.characters_seen, s.player_characters, s.ownerless_pals, s.unmatched_owner_pals
        )
        .expect("writing to String cannot fail");
        writeln!(out, "Unresolved passives: {}.", s.unresolved_passives)
        .expect("writing to String cannot fail");
    }

    out
}

fn write_guild(out: &mut String, guild: &GuildRecord) {
    writeln!(
        out,
        "Guild: {} ({} member(s), {} pal(s))",
        guild.guild_name,
        guild.members.len(),
        guild.pal_count()
    )
    .expect("writing to String cannot fail");

    for member in &guild.members {
        let last_online = member
            .last_online
            .map(|t| format!("  last online {t}"))
            .unwrap_or_default();
        writeln!(out, "  Player: {} [{}]{}", member.name, member.id, last_online)
            .expect("writing to String cannot fail");

        for pal in &member.pals {
            let label = match &pal.species {
                Some(species) if *species != pal.name => format!("{} ({species})", pal.name),
                _ => pal.name.clone(),
            };
            writeln!(
                out,
                "    - {:<width$} Lv {:>3}",
                fit_column(&label, NAME_COL_WIDTH),
                pal.level,
                width = NAME_COL_WIDTH
            )
            .expect("writing to String cannot fail");
            for passive in &pal.passives {
                writeln!(
                    out,
                    "        {} [{}] {}",
                    passive.name,
                    passive.rarity.as_str(),
                    passive.description
                )
                .expect("writing to String cannot fail");
            }
        }
    }
    writeln!(out).expect("writing to String cannot fail");
}

pub fn render_header(header: &DocumentHeader, compression_layers: u32) -> String {
    let mut out = String::new();
    writeln!(out, "magic:            {}", header.magic).expect("writing to String cannot fail");
    writeln!(out, "version:          {}", header.version).expect("writing to String cannot fail");
    writeln!(out, "package_flags:    0x{:08X}", header.package_flags)
        .expect("writing to String cannot fail");
    writeln!(out, "engine_version:   {}", engine_version(header))
        .expect("writing to String cannot fail");
    writeln!(out, "custom_version:   {}", header.custom_version)
        .expect("writing to String cannot fail");
    writeln!(out, "document_version: {}", header.document_version)
        .expect("writing to String cannot fail");
    writeln!(out, "compression:      {compression_layers} layer(s)")
        .expect("writing to String cannot fail");
    out
}

/// Indented dump of a property tree, descending at most `max_depth` scopes.
pub fn render_tree(tree: &PropertyMap, max_depth: usize) -> String {
    let mut out = String::new();
    write_scope(&mut out, tree, 0, max_depth);
    out
}

fn write_scope(out: &mut String, scope: &PropertyMap, depth: usize, max_depth: usize) {
    for (name, property) in scope.iter() {
        write_property(out, name, property, depth, max_depth);
    }
}

fn write_property(
    out: &mut String,
    name: &str,
    property: &Property,
    depth: usize,
    max_depth: usize,
) {
    let indent = "  ".repeat(depth);
    let span = property
        .size
        .map(|s| format!(" [len {} @ {}..{}]", s.declared_len, s.length_offset, s.end))
        .unwrap_or_default();

    let summary = match &property.value {
        PropertyValue::Struct(s) => format!("<{}>{span}", s.struct_type),
        PropertyValue::Array(a) => {
            format!("<{}> ({} element(s)){span}", a.element_type, a.elements.len())
        }
        PropertyValue::Map(m) => format!(
            "<{}, {}> ({} entr(ies)){span}",
            m.key_type,
            m.value_type,
            m.entries.len()
        ),
        PropertyValue::Name(v)
        | PropertyValue::Str(v)
        | PropertyValue::Enum(v)
        | PropertyValue::Object(v) => format!(" = {v:?}{span}"),
        PropertyValue::Bool(v) => format!(" = {v}"),
        PropertyValue::Int32(v) => format!(" = {v}"),
        PropertyValue::Int64(v) => format!(" = {v}"),
        PropertyValue::Float32(v) => format!(" = {v}"),
        PropertyValue::Unknown { .. } => format!(" (skipped){span}"),
    };
    writeln!(out, "{indent}{name}: {}{summary}", property.value.type_name())
        .expect("writing to String cannot fail");

    let child_indent = "  ".repeat(depth + 1);
    let nested = depth + 1 < max_depth;
    match &property.value {
        PropertyValue::Struct(s) if nested => write_scope(out, &s.fields, depth + 1, max_depth),
        PropertyValue::Array(a) if nested => {
            for (i, element) in a.elements.iter().enumerate() {
                writeln!(out, "{child_indent}[{i}]").expect("writing to String cannot fail");
                write_scope(out, element, depth + 2, max_depth);
            }
        }
        PropertyValue::Map(m) if nested => {
            for (key, value) in &m.entries {
                writeln!(out, "{child_indent}[{key}]").expect("writing to String cannot fail");
                write_scope(out, value, depth + 2, max_depth);
            }
        }
        PropertyValue::Struct(_) | PropertyValue::Array(_) | PropertyValue::Map(_) => {
            writeln!(out, "{child_indent}...").expect("writing to String cannot fail");
        }
        _ => {}
    }
}

fn selected_guilds<'g>(
    guilds: &'g [GuildRecord],
    options: RenderOptions<'_>,
) -> impl Iterator<Item = &'g GuildRecord> {
    let wanted = options.guild.map(str::to_lowercase);
    guilds.iter().filter(move |g| match &wanted {
        Some(name) => g.guild_name.to_lowercase() == *name,
        None => true,
    })
}

fn source_label(outcome: &ParseOutcome) -> &'static str {
    match outcome {
        ParseOutcome::Strict(_) => "strict",
        ParseOutcome::Degraded(degraded) => degraded.source.as_str(),
    }
}

fn engine_version(header: &DocumentHeader) -> String {
    let v = header.engine_version;
    format!("{}.{}.{}", v.major, v.minor, v.patch)
}

fn fit_column(value: &str, width: usize) -> String {
    if value.chars().count() <= width {
        return value.to_string();
    }
    if width <= 3 {
        return value.chars().take(width).collect();
    }

    let mut out: String = value.chars().take(width - 3).collect();
    out.push_str("...");
    out
}
