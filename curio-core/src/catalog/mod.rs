//! The relational persistence layer: repository ports plus a concrete
//! sqlite implementation.

pub mod ports;
pub mod sqlite;

pub use sqlite::{CatalogSession, SqliteCatalog};
