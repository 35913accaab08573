//! File formats and filesystem helpers shared by the request handlers.

pub mod error;
pub mod files;
pub mod match_table;
pub mod mmcif;
pub mod text;

pub use error::Error;
