use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CoreErrorCode {
    Io,
    /// Magic/header mismatch or an unusable compression layout.
    Format,
    /// The buffer ran out mid-node, or a declared length did not match what was read.
    Truncated,
    Catalog,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{code:?}: {message}{}", offset_suffix(.offset))]
pub struct CoreError {
    pub code: CoreErrorCode,
    pub message: String,
    pub offset: Option<usize>,
}

fn offset_suffix(offset: &Option<usize>) -> String {
    offset.map(|o| format!(" at byte {o}")).unwrap_or_default()
}

impl CoreError {
    pub fn new(code: CoreErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            offset: None,
        }
    }

    pub fn format(message: impl Into<String>) -> Self {
        Self::new(CoreErrorCode::Format, message)
    }

    pub fn truncated(offset: usize, message: impl Into<String>) -> Self {
        Self::new(CoreErrorCode::Truncated, message).at(offset)
    }

    pub fn at(mut self, offset: usize) -> Self {
        self.offset = Some(offset);
        self
    }

    pub fn is_format(&self) -> bool {
        self.code == CoreErrorCode::Format
    }

    pub fn is_truncated(&self) -> bool {
        self.code == CoreErrorCode::Truncated
    }
}
