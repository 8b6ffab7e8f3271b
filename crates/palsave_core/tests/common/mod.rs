#![allow(dead_code)]

use std::io::Write;

use flate2::Compression;
use flate2::write::{GzEncoder, ZlibEncoder};

pub const CONTAINER_MAGIC: [u8; 4] = [0x22, 0x06, 0x4B, 0x01];

pub fn fstring(out: &mut Vec<u8>, s: &str) {
    if s.is_empty() {
        out.extend_from_slice(&0i32.to_le_bytes());
        return;
    }
    if s.is_ascii() {
        out.extend_from_slice(&(s.len() as i32 + 1).to_le_bytes());
        out.extend_from_slice(s.as_bytes());
        out.push(0);
    } else {
        let wide: Vec<u16> = s.encode_utf16().chain(std::iter::once(0)).collect();
        out.extend_from_slice(&(-(wide.len() as i32)).to_le_bytes());
        for unit in wide {
            out.extend_from_slice(&unit.to_le_bytes());
        }
    }
}

/// Builder for one property scope. `finish` appends the `None` terminator.
#[derive(Debug, Clone, Default)]
pub struct Scope {
    bytes: Vec<u8>,
}

impl Scope {
    pub fn new() -> Self {
        Self::default()
    }

    fn head(mut self, name: &str, tag: &str) -> Self {
        fstring(&mut self.bytes, name);
        fstring(&mut self.bytes, tag);
        self
    }

    fn sized(self, name: &str, tag: &str, body: Vec<u8>) -> Self {
        self.sized_with_len(name, tag, body.len() as u32, body)
    }

    pub fn sized_with_len(self, name: &str, tag: &str, declared: u32, body: Vec<u8>) -> Self {
        let mut this = self.head(name, tag);
        this.bytes.extend_from_slice(&declared.to_le_bytes());
        this.bytes.extend_from_slice(&body);
        this
    }

    pub fn int(self, name: &str, value: i32) -> Self {
        let mut this = self.head(name, "IntProperty");
        this.bytes.extend_from_slice(&value.to_le_bytes());
        this
    }

    pub fn int64(self, name: &str, value: i64) -> Self {
        let mut this = self.head(name, "Int64Property");
        this.bytes.extend_from_slice(&value.to_le_bytes());
        this
    }

    pub fn float(self, name: &str, value: f32) -> Self {
        let mut this = self.head(name, "FloatProperty");
        this.bytes.extend_from_slice(&value.to_le_bytes());
        this
    }

    pub fn boolean(self, name: &str, value: bool) -> Self {
        let mut this = self.head(name, "BoolProperty");
        this.bytes.push(u8::from(value));
        this
    }

    pub fn name(self, name: &str, value: &str) -> Self {
        let mut this = self.head(name, "NameProperty");
        fstring(&mut this.bytes, value);
        this
    }

    pub fn enumeration(self, name: &str, value: &str) -> Self {
        let mut this = self.head(name, "EnumProperty");
        fstring(&mut this.bytes, value);
        this
    }

    pub fn object(self, name: &str, path: &str) -> Self {
        let mut this = self.head(name, "ObjectProperty");
        fstring(&mut this.bytes, path);
        this
    }

    pub fn string(self, name: &str, value: &str) -> Self {
        let mut body = Vec::new();
        fstring(&mut body, value);
        self.sized(name, "StrProperty", body)
    }

    pub fn structure(self, name: &str, struct_type: &str, id: [u8; 16], fields: Scope) -> Self {
        self.sized(name, "StructProperty", struct_body(struct_type, id, fields))
    }

    pub fn guid(self, name: &str, byte: u8) -> Self {
        self.structure(name, "Guid", [byte; 16], Scope::new())
    }

    pub fn array(self, name: &str, element_type: &str, elements: Vec<Scope>) -> Self {
        let mut body = Vec::new();
        fstring(&mut body, element_type);
        body.extend_from_slice(&(elements.len() as i32).to_le_bytes());
        for element in elements {
            body.extend_from_slice(&element.finish());
        }
        self.sized(name, "ArrayProperty", body)
    }

    pub fn map(self, name: &str, entries: Vec<(&str, Scope)>) -> Self {
        let mut body = Vec::new();
        fstring(&mut body, "StrProperty");
        fstring(&mut body, "StructProperty");
        body.extend_from_slice(&(entries.len() as i32).to_le_bytes());
        for (key, value) in entries {
            fstring(&mut body, key);
            body.extend_from_slice(&value.finish());
        }
        self.sized(name, "MapProperty", body)
    }

    pub fn raw(mut self, bytes: &[u8]) -> Self {
        self.bytes.extend_from_slice(bytes);
        self
    }

    pub fn finish(mut self) -> Vec<u8> {
        fstring(&mut self.bytes, "None");
        self.bytes
    }

    /// Bytes without a terminator.
    pub fn open(self) -> Vec<u8> {
        self.bytes
    }
}

pub fn struct_body(struct_type: &str, id: [u8; 16], fields: Scope) -> Vec<u8> {
    let mut body = Vec::new();
    fstring(&mut body, struct_type);
    body.extend_from_slice(&id);
    body.extend_from_slice(&fields.finish());
    body
}

pub fn header() -> Vec<u8> {
    let mut out = b"GVAS".to_vec();
    out.extend_from_slice(&3u32.to_le_bytes());
    out.extend_from_slice(&522u32.to_le_bytes());
    out.extend_from_slice(&5u16.to_le_bytes());
    out.extend_from_slice(&1u16.to_le_bytes());
    out.extend_from_slice(&1u16.to_le_bytes());
    out.extend_from_slice(&0u32.to_le_bytes());
    out.extend_from_slice(&1u32.to_le_bytes());
    out
}

pub fn document(top: Scope) -> Vec<u8> {
    let mut out = header();
    out.extend_from_slice(&top.finish());
    out
}

pub fn zlib(bytes: &[u8]) -> Vec<u8> {
    let mut encoder = ZlibEncoder::new(Vec::new(), Compression::default());
    encoder.write_all(bytes).expect("zlib encode should write");
    encoder.finish().expect("zlib encode should finish")
}

pub fn gzip(bytes: &[u8]) -> Vec<u8> {
    let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
    encoder.write_all(bytes).expect("gzip encode should write");
    encoder.finish().expect("gzip encode should finish")
}

pub fn container(payload: &[u8], declared: u32) -> Vec<u8> {
    let mut out = CONTAINER_MAGIC.to_vec();
    out.extend_from_slice(&declared.to_le_bytes());
    out.extend_from_slice(payload);
    out
}

/// Wraps a document in `layers` zlib layers and the container prologue.
pub fn save(document: &[u8], layers: u32) -> Vec<u8> {
    let mut payload = document.to_vec();
    for _ in 0..layers {
        payload = zlib(&payload);
    }
    container(&payload, document.len() as u32)
}

pub fn player(uid: u8, name: &str, last_online: i64) -> Scope {
    Scope::new().guid("player_uid", uid).structure(
        "player_info",
        "PlayerInfo",
        [0; 16],
        Scope::new()
            .int64("last_online_real_time", last_online)
            .string("player_name", name),
    )
}

pub fn guild(name: &str, players: Vec<Scope>) -> Scope {
    Scope::new()
        .enumeration("GroupType", "EPalGroupType::Guild")
        .structure(
            "RawData",
            "GroupRawData",
            [0; 16],
            Scope::new()
                .string("guild_name", name)
                .array("players", "StructProperty", players),
        )
}

pub fn character(params: Scope) -> Scope {
    Scope::new().structure(
        "RawData",
        "PalIndividualCharacterSaveParameter",
        [0; 16],
        Scope::new().structure(
            "SaveParameter",
            "PalIndividualCharacterSaveParameter",
            [0; 16],
            params,
        ),
    )
}

pub fn passives(ids: &[&str]) -> Vec<Scope> {
    ids.iter().map(|id| Scope::new().name("Value", id)).collect()
}

pub fn world(groups: Vec<(&str, Scope)>, characters: Vec<(&str, Scope)>) -> Scope {
    Scope::new().structure(
        "worldSaveData",
        "PalWorldSaveData",
        [0; 16],
        Scope::new()
            .map("CharacterSaveParameterMap", characters)
            .map("GroupSaveDataMap", groups),
    )
}

/// One guild "Alpha", one member "Ann" (uid 0xA1), one Lamball with one passive.
pub fn single_guild_document() -> Vec<u8> {
    document(world(
        vec![("group-1", guild("Alpha", vec![player(0xA1, "Ann", 638_400_000_000)]))],
        vec![(
            "pal-1",
            character(
                Scope::new()
                    .boolean("IsPlayer", false)
                    .guid("OwnerPlayerUId", 0xA1)
                    .name("CharacterID", "SheepBall")
                    .int("Level", 15)
                    .array("PassiveSkillList", "NameProperty", passives(&["0x01"])),
            ),
        )],
    ))
}
