//! Reader and writer for the subset of mmCIF used by component definition files.

pub mod reader;
pub mod writer;

pub use reader::{read, read_first_block, read_path};
pub use writer::{write, write_path};
