//! Self-describing property stream reader.
//!
//! A scope is a run of `(name, type, [declared length], payload)` records closed by a property
//! named `None`. Structs, arrays and maps nest further scopes. Sized records declare the byte
//! length of everything after their length field; the reader checks that it lands exactly
//! there, since a mismatch means the rest of the stream cannot be trusted.

use std::fmt;

use tracing::warn;

use crate::core_api::CoreError;
use crate::reader::ByteReader;

pub const SCOPE_TERMINATOR: &str = "None";
/// Deepest struct/array/map nesting accepted before the stream is treated as malformed.
pub const MAX_DEPTH: usize = 128;
/// Bytes taken by the smallest possible scope: a lone `None` terminator.
const MIN_SCOPE_LEN: usize = 4 + SCOPE_TERMINATOR.len() + 1;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Guid(pub [u8; 16]);

impl Guid {
    pub const NIL: Guid = Guid([0; 16]);
}

impl fmt::Display for Guid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, byte) in self.0.iter().enumerate() {
            if matches!(i, 4 | 6 | 8 | 10) {
                f.write_str("-")?;
            }
            write!(f, "{byte:02x}")?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PropertyKind {
    Struct,
    Array,
    Map,
    Name,
    Str,
    Bool,
    Enum,
    Int32,
    Int64,
    Float32,
    Object,
}

impl PropertyKind {
    pub fn from_tag(tag: &str) -> Option<Self> {
        Some(match tag {
            "StructProperty" => Self::Struct,
            "ArrayProperty" => Self::Array,
            "MapProperty" => Self::Map,
            "NameProperty" => Self::Name,
            "StrProperty" => Self::Str,
            "BoolProperty" => Self::Bool,
            "EnumProperty" => Self::Enum,
            "IntProperty" => Self::Int32,
            "Int64Property" => Self::Int64,
            "FloatProperty" => Self::Float32,
            "ObjectProperty" => Self::Object,
            _ => return None,
        })
    }

    pub fn tag(self) -> &'static str {
        match self {
            Self::Struct => "StructProperty",
            Self::Array => "ArrayProperty",
            Self::Map => "MapProperty",
            Self::Name => "NameProperty",
            Self::Str => "StrProperty",
            Self::Bool => "BoolProperty",
            Self::Enum => "EnumProperty",
            Self::Int32 => "IntProperty",
            Self::Int64 => "Int64Property",
            Self::Float32 => "FloatProperty",
            Self::Object => "ObjectProperty",
        }
    }

    pub fn is_sized(self) -> bool {
        matches!(self, Self::Struct | Self::Array | Self::Map | Self::Str)
    }
}

/// Where a sized property's length field sat, what it declared, and where reading ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DeclaredSize {
    pub length_offset: usize,
    pub declared_len: u32,
    pub end: usize,
}

impl DeclaredSize {
    pub fn expected_end(&self) -> usize {
        self.length_offset + 4 + self.declared_len as usize
    }

    pub fn is_consistent(&self) -> bool {
        self.end == self.expected_end()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct StructValue {
    pub struct_type: String,
    pub guid: Guid,
    pub fields: PropertyMap,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ArrayValue {
    pub element_type: String,
    pub elements: Vec<PropertyMap>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct MapValue {
    pub key_type: String,
    pub value_type: String,
    pub entries: Vec<(String, PropertyMap)>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum PropertyValue {
    Struct(StructValue),
    Array(ArrayValue),
    Map(MapValue),
    Name(String),
    Str(String),
    Bool(bool),
    Enum(String),
    Int32(i32),
    Int64(i64),
    Float32(f32),
    Object(String),
    /// An unrecognized sized property whose payload was skipped.
    Unknown { type_name: String },
}

impl PropertyValue {
    pub fn type_name(&self) -> &str {
        match self {
            Self::Struct(_) => PropertyKind::Struct.tag(),
            Self::Array(_) => PropertyKind::Array.tag(),
            Self::Map(_) => PropertyKind::Map.tag(),
            Self::Name(_) => PropertyKind::Name.tag(),
            Self::Str(_) => PropertyKind::Str.tag(),
            Self::Bool(_) => PropertyKind::Bool.tag(),
            Self::Enum(_) => PropertyKind::Enum.tag(),
            Self::Int32(_) => PropertyKind::Int32.tag(),
            Self::Int64(_) => PropertyKind::Int64.tag(),
            Self::Float32(_) => PropertyKind::Float32.tag(),
            Self::Object(_) => PropertyKind::Object.tag(),
            Self::Unknown { type_name } => type_name,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Property {
    pub value: PropertyValue,
    pub size: Option<DeclaredSize>,
}

impl Property {
    pub fn as_struct(&self) -> Option<&StructValue> {
        match &self.value {
            PropertyValue::Struct(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_array(&self) -> Option<&ArrayValue> {
        match &self.value {
            PropertyValue::Array(a) => Some(a),
            _ => None,
        }
    }

    pub fn as_map(&self) -> Option<&MapValue> {
        match &self.value {
            PropertyValue::Map(m) => Some(m),
            _ => None,
        }
    }

    /// Text of any string-shaped property.
    pub fn as_str(&self) -> Option<&str> {
        match &self.value {
            PropertyValue::Name(s)
            | PropertyValue::Str(s)
            | PropertyValue::Enum(s)
            | PropertyValue::Object(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self.value {
            PropertyValue::Bool(b) => Some(b),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self.value {
            PropertyValue::Int32(v) => Some(v.into()),
            PropertyValue::Int64(v) => Some(v),
            _ => None,
        }
    }

    /// Child scope of a struct, if this is one.
    pub fn fields(&self) -> Option<&PropertyMap> {
        self.as_struct().map(|s| &s.fields)
    }
}

/// Named properties of one scope, in stream order. Names are unique; a repeated name
/// replaces the earlier value in its original position.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PropertyMap {
    entries: Vec<(String, Property)>,
}

impl PropertyMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, name: String, property: Property) {
        match self.entries.iter_mut().find(|(n, _)| *n == name) {
            Some(slot) => {
                warn!(name = %name, "duplicate property name in scope; keeping the later value");
                slot.1 = property;
            }
            None => self.entries.push((name, property)),
        }
    }

    pub fn get(&self, name: &str) -> Option<&Property> {
        self.entries
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, p)| p)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Property)> {
        self.entries.iter().map(|(n, p)| (n.as_str(), p))
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(n, _)| n.as_str())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Depth-first walk over every property in this scope and all nested scopes.
    pub fn visit<'m>(&'m self, f: &mut impl FnMut(&'m str, &'m Property)) {
        for (name, property) in self.iter() {
            f(name, property);
            match &property.value {
                PropertyValue::Struct(s) => s.fields.visit(f),
                PropertyValue::Array(a) => a.elements.iter().for_each(|e| e.visit(f)),
                PropertyValue::Map(m) => m.entries.iter().for_each(|(_, v)| v.visit(f)),
                PropertyValue::Name(_)
                | PropertyValue::Str(_)
                | PropertyValue::Bool(_)
                | PropertyValue::Enum(_)
                | PropertyValue::Int32(_)
                | PropertyValue::Int64(_)
                | PropertyValue::Float32(_)
                | PropertyValue::Object(_)
                | PropertyValue::Unknown { .. } => {}
            }
        }
    }
}

/// A failed read together with everything parsed before the failure. Incomplete nested
/// structs, arrays and maps are kept in their parent with the children they had.
#[derive(Debug, Clone, PartialEq)]
pub struct TreeError {
    pub error: CoreError,
    pub partial: PropertyMap,
}

impl From<TreeError> for CoreError {
    fn from(err: TreeError) -> Self {
        err.error
    }
}

/// Reads the top-level scope starting at `offset`. Returns the properties and the offset just
/// past the terminating `None` (or the end of the buffer).
pub fn read_properties(bytes: &[u8], offset: usize) -> Result<(PropertyMap, usize), TreeError> {
    let mut reader = TreeReader {
        r: ByteReader::at(bytes, offset),
        depth: 0,
    };
    let map = reader.read_scope(true)?;
    Ok((map, reader.r.position()))
}

struct PropertyFailure {
    error: CoreError,
    salvaged: Option<PropertyValue>,
}

impl From<CoreError> for PropertyFailure {
    fn from(error: CoreError) -> Self {
        Self {
            error,
            salvaged: None,
        }
    }
}

struct TreeReader<'a> {
    r: ByteReader<'a>,
    depth: usize,
}

impl TreeReader<'_> {
    fn read_scope(&mut self, top_level: bool) -> Result<PropertyMap, TreeError> {
        let mut map = PropertyMap::new();
        loop {
            if top_level && self.r.is_at_end() {
                return Ok(map);
            }
            let name = match self.r.read_fstring() {
                Ok(name) => name,
                Err(error) => return Err(TreeError { error, partial: map }),
            };
            if name == SCOPE_TERMINATOR {
                return Ok(map);
            }

            match self.read_property(&name) {
                Ok(property) => map.insert(name, property),
                Err(PropertyFailure { error, salvaged }) => {
                    if let Some(value) = salvaged {
                        map.insert(name, Property { value, size: None });
                    }
                    return Err(TreeError { error, partial: map });
                }
            }
        }
    }

    fn read_property(&mut self, name: &str) -> Result<Property, PropertyFailure> {
        let tag_offset = self.r.position();
        let tag = self.r.read_fstring()?;
        let kind = PropertyKind::from_tag(&tag);
        let sized = kind.map_or(tag.ends_with("Property"), PropertyKind::is_sized);
        if kind.is_none() && !sized {
            return Err(CoreError::truncated(
                tag_offset,
                format!("{name}: unrecognized type tag {tag:?} has no declared length"),
            )
            .into());
        }

        let declared = if sized {
            let length_offset = self.r.position();
            let declared_len = self.r.read_u32()?;
            Some((length_offset, declared_len))
        } else {
            None
        };

        let value = match kind {
            None => {
                // `declared` is always set here: unsized unknown tags returned above.
                let skip = declared.map_or(0, |(_, len)| len as usize);
                warn!(name, tag = %tag, skip, "skipping unrecognized property type");
                self.r.skip(skip)?;
                PropertyValue::Unknown { type_name: tag }
            }
            Some(PropertyKind::Struct) => self.nested(Self::read_struct)?,
            Some(PropertyKind::Array) => self.nested(Self::read_array)?,
            Some(PropertyKind::Map) => self.nested(Self::read_map)?,
            Some(PropertyKind::Name) => PropertyValue::Name(self.r.read_fstring()?),
            Some(PropertyKind::Str) => PropertyValue::Str(self.r.read_fstring()?),
            Some(PropertyKind::Enum) => PropertyValue::Enum(self.r.read_fstring()?),
            Some(PropertyKind::Object) => PropertyValue::Object(self.r.read_fstring()?),
            Some(PropertyKind::Bool) => PropertyValue::Bool(self.r.read_u8()? != 0),
            Some(PropertyKind::Int32) => PropertyValue::Int32(self.r.read_i32()?),
            Some(PropertyKind::Int64) => PropertyValue::Int64(self.r.read_i64()?),
            Some(PropertyKind::Float32) => PropertyValue::Float32(self.r.read_f32()?),
        };

        let size = declared.map(|(length_offset, declared_len)| DeclaredSize {
            length_offset,
            declared_len,
            end: self.r.position(),
        });
        if let Some(size) = size.filter(|s| !s.is_consistent()) {
            return Err(PropertyFailure {
                error: CoreError::truncated(
                    size.end,
                    format!(
                        "{name}: declared {} bytes but read {}",
                        size.declared_len,
                        size.end - size.length_offset - 4
                    ),
                ),
                salvaged: Some(value),
            });
        }

        Ok(Property { value, size })
    }

    fn nested(
        &mut self,
        read: fn(&mut Self) -> Result<PropertyValue, PropertyFailure>,
    ) -> Result<PropertyValue, PropertyFailure> {
        if self.depth >= MAX_DEPTH {
            return Err(CoreError::format(format!("nesting deeper than {MAX_DEPTH} levels"))
                .at(self.r.position())
                .into());
        }
        self.depth += 1;
        let result = read(self);
        self.depth -= 1;
        result
    }

    fn read_struct(&mut self) -> Result<PropertyValue, PropertyFailure> {
        let struct_type = self.r.read_fstring()?;
        let guid = Guid(self.r.read_array()?);
        match self.read_scope(false) {
            Ok(fields) => Ok(PropertyValue::Struct(StructValue {
                struct_type,
                guid,
                fields,
            })),
            Err(TreeError { error, partial }) => Err(PropertyFailure {
                error,
                salvaged: Some(PropertyValue::Struct(StructValue {
                    struct_type,
                    guid,
                    fields: partial,
                })),
            }),
        }
    }

    fn read_array(&mut self) -> Result<PropertyValue, PropertyFailure> {
        let element_type = self.r.read_fstring()?;
        let count = self.read_count()?;
        let mut elements = Vec::with_capacity(count.min(self.r.remaining() / MIN_SCOPE_LEN));
        for _ in 0..count {
            match self.read_scope(false) {
                Ok(element) => elements.push(element),
                Err(TreeError { error, partial }) => {
                    elements.push(partial);
                    return Err(PropertyFailure {
                        error,
                        salvaged: Some(PropertyValue::Array(ArrayValue {
                            element_type,
                            elements,
                        })),
                    });
                }
            }
        }
        Ok(PropertyValue::Array(ArrayValue {
            element_type,
            elements,
        }))
    }

    fn read_map(&mut self) -> Result<PropertyValue, PropertyFailure> {
        let key_type = self.r.read_fstring()?;
        let value_type = self.r.read_fstring()?;
        let count = self.read_count()?;
        let mut entries = Vec::with_capacity(count.min(self.r.remaining() / MIN_SCOPE_LEN));
        for _ in 0..count {
            let failure = match self.r.read_fstring() {
                Err(error) => error,
                Ok(key) => match self.read_scope(false) {
                    Ok(value) => {
                        entries.push((key, value));
                        continue;
                    }
                    Err(TreeError { error, partial }) => {
                        entries.push((key, partial));
                        error
                    }
                },
            };
            return Err(PropertyFailure {
                error: failure,
                salvaged: Some(PropertyValue::Map(MapValue {
                    key_type,
                    value_type,
                    entries,
                })),
            });
        }
        Ok(PropertyValue::Map(MapValue {
            key_type,
            value_type,
            entries,
        }))
    }

    fn read_count(&mut self) -> Result<usize, CoreError> {
        let offset = self.r.position();
        let count = self.r.read_i32()?;
        usize::try_from(count)
            .map_err(|_| CoreError::format(format!("negative element count {count}")).at(offset))
    }
}
