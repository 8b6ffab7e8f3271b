use crate::core_api::CoreError;

/// Little-endian cursor over an in-memory save buffer.
///
/// Every read either advances the cursor by the bytes it consumed or fails with a
/// `Truncated` error naming the offset it started at; the cursor never moves on failure.
#[derive(Debug, Clone)]
pub struct ByteReader<'a> {
    bytes: &'a [u8],
    pos: usize,
}

impl<'a> ByteReader<'a> {
    pub fn new(bytes: &'a [u8]) -> Self {
        Self { bytes, pos: 0 }
    }

    pub fn at(bytes: &'a [u8], pos: usize) -> Self {
        Self {
            bytes,
            pos: pos.min(bytes.len()),
        }
    }

    pub fn position(&self) -> usize {
        self.pos
    }

    pub fn remaining(&self) -> usize {
        self.bytes.len() - self.pos
    }

    pub fn is_at_end(&self) -> bool {
        self.pos >= self.bytes.len()
    }

    pub fn read_bytes(&mut self, n: usize) -> Result<&'a [u8], CoreError> {
        if n > self.remaining() {
            return Err(CoreError::truncated(
                self.pos,
                format!("need {n} bytes, {} remain", self.remaining()),
            ));
        }
        let out = &self.bytes[self.pos..self.pos + n];
        self.pos += n;
        Ok(out)
    }

    pub fn read_array<const N: usize>(&mut self) -> Result<[u8; N], CoreError> {
        let mut out = [0u8; N];
        out.copy_from_slice(self.read_bytes(N)?);
        Ok(out)
    }

    pub fn read_u8(&mut self) -> Result<u8, CoreError> {
        Ok(self.read_array::<1>()?[0])
    }

    pub fn read_u16(&mut self) -> Result<u16, CoreError> {
        Ok(u16::from_le_bytes(self.read_array()?))
    }

    pub fn read_u32(&mut self) -> Result<u32, CoreError> {
        Ok(u32::from_le_bytes(self.read_array()?))
    }

    pub fn read_i32(&mut self) -> Result<i32, CoreError> {
        Ok(i32::from_le_bytes(self.read_array()?))
    }

    /// Low half first, then high half.
    pub fn read_i64(&mut self) -> Result<i64, CoreError> {
        let start = self.pos;
        let low = self.read_u32()?;
        let high = self.read_i32().inspect_err(|_| self.pos = start)?;
        Ok(((high as i64) << 32) | low as i64)
    }

    pub fn read_f32(&mut self) -> Result<f32, CoreError> {
        Ok(f32::from_le_bytes(self.read_array()?))
    }

    pub fn skip(&mut self, n: usize) -> Result<(), CoreError> {
        self.read_bytes(n).map(|_| ())
    }

    /// Reads an engine string: i32 length, positive for single-byte text, negative for
    /// UTF-16LE code units, zero for an empty string with no payload. The count includes the
    /// terminating NUL, which is stripped along with any other trailing NULs.
    pub fn read_fstring(&mut self) -> Result<String, CoreError> {
        let start = self.pos;
        let len = self.read_i32()?;
        let decoded = match len {
            0 => Ok(String::new()),
            n if n > 0 => self
                .read_bytes(n as usize)
                .map(|raw| raw.iter().map(|&b| b as char).collect::<String>()),
            n => {
                let units = n.unsigned_abs() as usize;
                match units.checked_mul(2) {
                    Some(byte_len) => self.read_bytes(byte_len).map(|raw| {
                        let wide: Vec<u16> = raw
                            .chunks_exact(2)
                            .map(|pair| u16::from_le_bytes([pair[0], pair[1]]))
                            .collect();
                        String::from_utf16_lossy(&wide)
                    }),
                    None => Err(CoreError::truncated(start, "string length overflows")),
                }
            }
        };

        match decoded {
            Ok(text) => Ok(text.trim_end_matches('\0').to_string()),
            Err(err) => {
                self.pos = start;
                Err(CoreError::truncated(
                    start,
                    format!("string of declared length {len}: {}", err.message),
                ))
            }
        }
    }
}
