mod catalog;
mod engine;
mod error;
mod types;
mod well_known_pals;

pub use catalog::{Catalog, PassiveDefinition};
pub use engine::{DegradedParse, Document, Engine, ParseOutcome, RecoverySource, StrictParse};
pub use error::{CoreError, CoreErrorCode};
pub use types::{ExtractionStats, GuildRecord, PalRecord, PassiveRecord, PlayerRecord, Rarity};
