pub mod container;
pub mod core_api;
pub mod extract;
pub mod header;
pub mod property;
pub mod reader;
pub mod recovery;
