//! CrudService: generic CRUD using the safe SQL builder.

mod crud;
mod db_error;
mod validation;
pub use crud::{CrudService, Page};
pub use db_error::translate_db_error;
pub use validation::RequestValidator;
