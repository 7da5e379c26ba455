//! Client for a remote OData book collection: validation, date handling and
//! the create/read/update/delete workflow behind the `booklist` binary.

pub mod config;
pub mod default_colors;
pub mod error;
pub mod odata;
pub mod query;
pub mod traits;
pub mod types;
pub mod validation;
pub mod workflow;
