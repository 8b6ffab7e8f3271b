use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::container;
use crate::extract;
use crate::header::DocumentHeader;
use crate::property::{self, PropertyMap};
use crate::recovery;

use super::catalog::Catalog;
use super::error::CoreError;
use super::types::{ExtractionStats, GuildRecord};

#[derive(Debug, Clone)]
pub struct Engine {
    catalog: Arc<Catalog>,
}

impl Default for Engine {
    fn default() -> Self {
        Self::new()
    }
}

/// A fully decoded document, before domain extraction.
#[derive(Debug, Clone, PartialEq)]
pub struct Document {
    pub header: DocumentHeader,
    pub properties: PropertyMap,
    pub compression_layers: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StrictParse {
    pub guilds: Vec<GuildRecord>,
    pub header: DocumentHeader,
    pub compression_layers: u32,
    pub stats: ExtractionStats,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecoverySource {
    /// Guilds extracted from the part of the tree read before the failure.
    PartialTree,
    /// The fixed placeholder roster.
    SampleData,
}

impl RecoverySource {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::PartialTree => "partial_tree",
            Self::SampleData => "sample_data",
        }
    }
}

/// Output of the recovery path. The guilds are not read from the save in any verified way.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DegradedParse {
    pub cause: CoreError,
    pub markers: Vec<String>,
    pub source: RecoverySource,
    guilds: Vec<GuildRecord>,
}

impl DegradedParse {
    pub(crate) fn new(
        cause: CoreError,
        markers: Vec<String>,
        source: RecoverySource,
        guilds: Vec<GuildRecord>,
    ) -> Self {
        Self {
            cause,
            markers,
            source,
            guilds,
        }
    }

    pub fn unverified_guilds(&self) -> &[GuildRecord] {
        &self.guilds
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParseOutcome {
    Strict(StrictParse),
    Degraded(DegradedParse),
}

impl ParseOutcome {
    pub fn is_degraded(&self) -> bool {
        matches!(self, Self::Degraded(_))
    }

    pub fn guilds_with_flag(&self) -> (&[GuildRecord], bool) {
        match self {
            Self::Strict(strict) => (&strict.guilds, false),
            Self::Degraded(degraded) => (degraded.unverified_guilds(), true),
        }
    }

    pub fn compression_layers(&self) -> Option<u32> {
        match self {
            Self::Strict(strict) => Some(strict.compression_layers),
            Self::Degraded(_) => None,
        }
    }

    pub fn as_strict(&self) -> Option<&StrictParse> {
        match self {
            Self::Strict(strict) => Some(strict),
            Self::Degraded(_) => None,
        }
    }
}

struct StrictFailure {
    error: CoreError,
    partial: Option<PropertyMap>,
}

impl From<CoreError> for StrictFailure {
    fn from(error: CoreError) -> Self {
        Self {
            error,
            partial: None,
        }
    }
}

impl Engine {
    pub fn new() -> Self {
        Self {
            catalog: Catalog::builtin(),
        }
    }

    pub fn with_catalog(catalog: Arc<Catalog>) -> Self {
        Self { catalog }
    }

    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    /// Parses a save, falling back to a flagged degraded result when strict parsing fails on
    /// input that still looks like a save. Input with no save markers at all is an error.
    pub fn parse<B: AsRef<[u8]>>(&self, bytes: B) -> Result<ParseOutcome, CoreError> {
        let bytes = bytes.as_ref();
        match self.strict(bytes) {
            Ok(strict) => Ok(ParseOutcome::Strict(strict)),
            Err(StrictFailure { error, partial }) => {
                warn!(%error, partial = partial.is_some(), "strict parse failed");
                recovery::recover(bytes, error, partial.as_ref(), &self.catalog)
                    .map(ParseOutcome::Degraded)
            }
        }
    }

    /// Strict path only; any failure is returned as is.
    pub fn parse_strict<B: AsRef<[u8]>>(&self, bytes: B) -> Result<StrictParse, CoreError> {
        self.strict(bytes.as_ref()).map_err(|f| f.error)
    }

    /// Unwraps and decodes the document without extracting guilds.
    pub fn read_document<B: AsRef<[u8]>>(&self, bytes: B) -> Result<Document, CoreError> {
        read_document(bytes.as_ref()).map_err(|f| f.error)
    }

    fn strict(&self, bytes: &[u8]) -> Result<StrictParse, StrictFailure> {
        let document = read_document(bytes)?;
        let (guilds, stats) = extract::extract_guilds(&document.properties, &self.catalog);
        Ok(StrictParse {
            guilds,
            header: document.header,
            compression_layers: document.compression_layers,
            stats,
        })
    }
}

fn read_document(bytes: &[u8]) -> Result<Document, StrictFailure> {
    let unwrapped = container::unwrap(bytes)?;
    let (header, start) = DocumentHeader::parse(&unwrapped.document)?;
    debug!(
        layers = unwrapped.compression_layers,
        version = header.version,
        len = unwrapped.document.len(),
        "document header read"
    );

    match property::read_properties(&unwrapped.document, start) {
        Ok((properties, end)) => {
            if end < unwrapped.document.len() {
                debug!(
                    trailing = unwrapped.document.len() - end,
                    "bytes left after the top-level scope"
                );
            }
            Ok(Document {
                header,
                properties,
                compression_layers: unwrapped.compression_layers,
            })
        }
        Err(err) => Err(StrictFailure {
            error: err.error,
            partial: Some(err.partial),
        }),
    }
}
