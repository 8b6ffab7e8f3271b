//! Outer save container: an 8-byte prologue followed by one or more stacked compression
//! layers around the inner `GVAS` document.

use std::borrow::Cow;
use std::io::Read;

use flate2::read::{GzDecoder, ZlibDecoder};
use tracing::{debug, warn};

use crate::core_api::CoreError;
use crate::header::DOCUMENT_MAGIC;
use crate::reader::ByteReader;

/// `0x014B0622` little-endian.
pub const CONTAINER_MAGIC: [u8; 4] = [0x22, 0x06, 0x4B, 0x01];
pub const PROLOGUE_LEN: usize = 8;
pub const MAX_COMPRESSION_LAYERS: u32 = 8;
/// Upper bound on how far the fallback scan looks for an embedded document header.
pub const HEADER_SCAN_LIMIT: usize = 16 * 1024 * 1024;
/// Largest output a single compression layer may inflate to.
pub const MAX_LAYER_LEN: usize = 512 * 1024 * 1024;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Codec {
    Zlib,
    Gzip,
}

impl Codec {
    pub fn detect(bytes: &[u8]) -> Option<Self> {
        match bytes {
            [0x1F, 0x8B, ..] => Some(Self::Gzip),
            [cmf, flg, ..] if cmf & 0x0F == 8 && cmf >> 4 <= 7 => {
                if (u16::from(*cmf) << 8 | u16::from(*flg)) % 31 == 0 {
                    Some(Self::Zlib)
                } else {
                    None
                }
            }
            _ => None,
        }
    }

    /// Inflates one layer, stopping after `limit + 1` bytes so callers can tell an oversized
    /// layer from one that fits exactly.
    pub fn decode(self, packed: &[u8], limit: usize) -> Result<Vec<u8>, String> {
        let cap = limit.saturating_add(1) as u64;
        let mut out = Vec::with_capacity(packed.len().saturating_mul(4).min(limit));
        let result = match self {
            Self::Zlib => ZlibDecoder::new(packed).take(cap).read_to_end(&mut out),
            Self::Gzip => GzDecoder::new(packed).take(cap).read_to_end(&mut out),
        };
        result
            .map(|_| out)
            .map_err(|e| format!("{self:?} decode failed: {e}"))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Unwrapped<'a> {
    pub document: Cow<'a, [u8]>,
    pub compression_layers: u32,
    pub declared_size: u32,
    /// Set when the document was located by scanning rather than at the start of a layer.
    pub scanned_offset: Option<usize>,
}

/// Validates the container prologue and peels compression layers until the inner document
/// magic appears.
pub fn unwrap(bytes: &[u8]) -> Result<Unwrapped<'_>, CoreError> {
    unwrap_bounded(bytes, MAX_LAYER_LEN)
}

fn unwrap_bounded(bytes: &[u8], max_layer_len: usize) -> Result<Unwrapped<'_>, CoreError> {
    let mut r = ByteReader::new(bytes);
    let magic: [u8; 4] = r
        .read_array()
        .map_err(|_| CoreError::format("bad container magic: file shorter than prologue"))?;
    if magic != CONTAINER_MAGIC {
        return Err(CoreError::format(format!(
            "bad container magic: {magic:02X?}"
        )));
    }
    let declared_size = r
        .read_u32()
        .map_err(|_| CoreError::format("bad container magic: file shorter than prologue"))?;

    let mut current: Cow<'_, [u8]> = Cow::Borrowed(&bytes[PROLOGUE_LEN..]);
    let mut layers = 0u32;

    loop {
        if current.starts_with(&DOCUMENT_MAGIC) {
            log_size_mismatch(declared_size, current.len());
            return Ok(Unwrapped {
                document: current,
                compression_layers: layers,
                declared_size,
                scanned_offset: None,
            });
        }

        let Some(codec) = Codec::detect(&current) else {
            break;
        };
        if layers >= MAX_COMPRESSION_LAYERS {
            return Err(CoreError::format(format!(
                "too many compression layers (more than {MAX_COMPRESSION_LAYERS})"
            )));
        }
        match codec.decode(&current, max_layer_len) {
            Ok(inner) if inner.len() > max_layer_len => {
                return Err(CoreError::format(format!(
                    "decompressed layer exceeds {max_layer_len} bytes"
                )));
            }
            Ok(inner) => {
                layers += 1;
                debug!(
                    layer = layers,
                    codec = ?codec,
                    len = inner.len(),
                    "peeled compression layer"
                );
                current = Cow::Owned(inner);
            }
            Err(message) => {
                warn!(layer = layers + 1, %message, "compression signature did not decode");
                break;
            }
        }
    }

    match find_document_magic(&current) {
        Some(offset) => {
            debug!(offset, layers, "found document header by scanning");
            let document = match current {
                Cow::Borrowed(slice) => Cow::Borrowed(&slice[offset..]),
                Cow::Owned(mut owned) => {
                    owned.drain(..offset);
                    Cow::Owned(owned)
                }
            };
            log_size_mismatch(declared_size, document.len());
            Ok(Unwrapped {
                document,
                compression_layers: layers,
                declared_size,
                scanned_offset: Some(offset),
            })
        }
        None => Err(CoreError::format(format!(
            "no document header found after {layers} compression layer(s)"
        ))),
    }
}

fn find_document_magic(bytes: &[u8]) -> Option<usize> {
    let window = &bytes[..bytes.len().min(HEADER_SCAN_LIMIT)];
    window
        .windows(DOCUMENT_MAGIC.len())
        .position(|w| w == DOCUMENT_MAGIC)
}

fn log_size_mismatch(declared: u32, actual: usize) {
    if declared as usize != actual {
        debug!(declared, actual, "container size field does not match document length");
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use flate2::Compression;
    use flate2::write::{GzEncoder, ZlibEncoder};

    use super::*;

    fn zlib(bytes: &[u8]) -> Vec<u8> {
        let mut encoder = ZlibEncoder::new(Vec::new(), Compression::default());
        encoder.write_all(bytes).expect("zlib encode should write");
        encoder.finish().expect("zlib encode should finish")
    }

    fn container(payload: &[u8]) -> Vec<u8> {
        let mut out = CONTAINER_MAGIC.to_vec();
        out.extend_from_slice(&(payload.len() as u32).to_le_bytes());
        out.extend_from_slice(payload);
        out
    }

    #[test]
    fn detects_zlib_and_gzip_headers() {
        assert_eq!(Codec::detect(&zlib(b"x")), Some(Codec::Zlib));
        let mut gz = GzEncoder::new(Vec::new(), Compression::fast());
        gz.write_all(b"x").unwrap();
        assert_eq!(Codec::detect(&gz.finish().unwrap()), Some(Codec::Gzip));
        assert_eq!(Codec::detect(b"GVAS"), None);
        assert_eq!(Codec::detect(&[0x78]), None);
    }

    #[test]
    fn rejects_bad_magic() {
        let err = unwrap(b"NOPE\0\0\0\0GVAS").unwrap_err();
        assert!(err.is_format());
        assert!(err.message.contains("bad container magic"));
    }

    #[test]
    fn peels_two_layers() {
        let doc = b"GVAS-payload".to_vec();
        let bytes = container(&zlib(&zlib(&doc)));
        let out = unwrap(&bytes).unwrap();
        assert_eq!(out.compression_layers, 2);
        assert_eq!(out.document.as_ref(), doc.as_slice());
        assert_eq!(out.scanned_offset, None);
    }

    #[test]
    fn scans_for_embedded_header() {
        let mut payload = b"junk-junk".to_vec();
        payload.extend_from_slice(b"GVAS-rest");
        let bytes = container(&zlib(&payload));
        let out = unwrap(&bytes).unwrap();
        assert_eq!(out.compression_layers, 1);
        assert_eq!(out.scanned_offset, Some(9));
        assert_eq!(out.document.as_ref(), b"GVAS-rest");
    }

    #[test]
    fn bounds_layer_count() {
        let mut payload = b"GVAS".to_vec();
        for _ in 0..=MAX_COMPRESSION_LAYERS {
            payload = zlib(&payload);
        }
        let err = unwrap(&container(&payload)).unwrap_err();
        assert!(err.message.contains("too many compression layers"));
    }

    #[test]
    fn oversized_layer_is_rejected_before_inflating_further() {
        let bomb = container(&zlib(&zlib(&vec![0u8; 1024 * 1024])));
        let err = unwrap_bounded(&bomb, 64 * 1024).unwrap_err();
        assert!(err.is_format());
        assert!(err.message.contains("decompressed layer exceeds 65536 bytes"));

        let doc = b"GVAS-fits".to_vec();
        let bytes = container(&zlib(&doc));
        let out = unwrap_bounded(&bytes, doc.len()).unwrap();
        assert_eq!(out.document.as_ref(), doc.as_slice());
    }

    #[test]
    fn gzip_and_zlib_layers_mix() {
        let mut gz = GzEncoder::new(Vec::new(), Compression::default());
        gz.write_all(&zlib(b"GVAS-mixed")).unwrap();
        let bytes = container(&gz.finish().unwrap());
        let out = unwrap(&bytes).unwrap();
        assert_eq!(out.compression_layers, 2);
        assert_eq!(out.document.as_ref(), b"GVAS-mixed");
    }

    #[test]
    fn corrupted_stream_without_header_fails() {
        let mut packed = zlib(b"no header in here at all");
        let mid = packed.len() / 2;
        packed[mid..].iter_mut().for_each(|b| *b = 0xFF);
        let err = unwrap(&container(&packed)).unwrap_err();
        assert!(err.is_format());
    }
}
