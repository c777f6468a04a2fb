//! Schema reading: catalog drivers per dialect normalized into one table model.

pub mod driver;
mod mysql;
mod postgres;
pub mod reader;
pub mod type_map;
pub mod types;

pub use driver::*;
pub use mysql::MySqlCatalog;
pub use postgres::PostgresCatalog;
pub use reader::*;
pub use type_map::*;
pub use types::*;
