mod banner;
mod error;

pub use banner::{banner_for_help, print_banner};
pub use error::print_error;
