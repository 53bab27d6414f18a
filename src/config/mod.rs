//! Project configuration
//!
//! This module handles discovery and parsing of `buidl.yml` files, the
//! built-in defaults they are laid over, and validation of the result.

pub mod parse;
pub mod schema;
pub mod types;

pub use parse::*;
pub use schema::*;
pub use types::*;
