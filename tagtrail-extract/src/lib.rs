//! # tagtrail-extract
//!
//! Cache parsing for the tracked entity.
//!
//! Call [`pipeline::run`] to locate the location cache, convert it (structured
//! mode first, text dump as fallback), rebuild the entity list, resolve the
//! tracked name, and offer its location to the history store.

pub mod error;
pub mod loader;
pub mod locator;
pub mod matcher;
pub mod pipeline;
pub mod structured;
pub mod text_dump;

pub use error::ExtractError;
pub use loader::{
    default_strategies, load_cache, CacheFormat, Converter, LoadedCache, LoaderStrategy,
    PlutilConverter,
};
pub use locator::locate_cache;
pub use matcher::find_entity;
pub use pipeline::{write_dump, CacheSnapshot, ExtractOutcome, ExtractReport};
pub use structured::extract_entities;
pub use text_dump::parse_text_dump;
