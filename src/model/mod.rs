//! Core data structures for chemical component definitions.
//!
//! - [`cif`] – mmCIF data blocks and categories, the in-memory form of a
//!   component definition file.
//! - [`id`] – Component id rules: reserved codes and the id-to-site hash.
//!
//! The model keeps values as the raw strings found in the file. `?` and `.`
//! are preserved on round trips and only treated as "no value" by the
//! lookup helpers ([`DataBlock::single_value`], [`Category::row_maps`]).

pub mod cif;
pub mod id;

pub use cif::{Category, DataBlock, is_null};
pub use id::{InvalidIdError, chem_comp_id_to_int, is_reserved, site_for_id};
