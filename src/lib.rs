//! Bibliographic metadata search: load collections from local or remote JSON
//! sources, then resolve AND/OR fuzzy queries into per-collection results.

pub mod collection;
pub mod config;
pub mod loader;
pub mod note;
pub mod query;
pub mod ris;
pub mod session;
pub mod trigger;

mod text;

pub use collection::{Collection, Item};
pub use loader::{HttpSourceReader, LoadError, LoadReport, SourceLocator, SourceReader, load, load_all};
pub use query::{QueryResult, search};

pub const USER_AGENT: &str = concat!("synapse/", env!("CARGO_PKG_VERSION"));
