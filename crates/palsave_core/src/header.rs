use serde::{Deserialize, Serialize};

use crate::core_api::CoreError;
use crate::reader::ByteReader;

pub const DOCUMENT_MAGIC: [u8; 4] = *b"GVAS";
pub const HEADER_LEN: usize = 26;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct EngineVersion {
    pub major: u16,
    pub minor: u16,
    pub patch: u16,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentHeader {
    pub magic: String,
    pub version: u32,
    pub package_flags: u32,
    pub engine_version: EngineVersion,
    pub custom_version: u32,
    pub document_version: u32,
}

impl DocumentHeader {
    /// Parses the fixed header at the start of `document`, returning it with the offset at
    /// which the property stream begins (always `HEADER_LEN`).
    pub fn parse(document: &[u8]) -> Result<(Self, usize), CoreError> {
        if document.len() < HEADER_LEN || document[..4] != DOCUMENT_MAGIC {
            let shown = String::from_utf8_lossy(&document[..document.len().min(4)]).to_string();
            return Err(CoreError::format(format!(
                "bad document header: expected GVAS, found {shown:?}"
            )));
        }

        let mut r = ByteReader::new(&document[..HEADER_LEN]);
        let header = Self::read_fields(&mut r)
            .map_err(|e| CoreError::format(format!("bad document header: {}", e.message)))?;
        debug_assert_eq!(r.position(), HEADER_LEN);
        Ok((header, HEADER_LEN))
    }

    fn read_fields(r: &mut ByteReader<'_>) -> Result<Self, CoreError> {
        let magic = r.read_array::<4>()?;
        Ok(Self {
            magic: String::from_utf8_lossy(&magic).to_string(),
            version: r.read_u32()?,
            package_flags: r.read_u32()?,
            engine_version: EngineVersion {
                major: r.read_u16()?,
                minor: r.read_u16()?,
                patch: r.read_u16()?,
            },
            custom_version: r.read_u32()?,
            document_version: r.read_u32()?,
        })
    }
}
