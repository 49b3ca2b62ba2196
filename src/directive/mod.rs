// src/directive/mod.rs

//! Directive file parsing and validation
//!
//! Split in two layers: `parser` turns raw text into ordered stanzas
//! without caring what the fields mean; `schema` turns stanzas into typed
//! header/operation values with strict field whitelists.

pub mod parser;
pub mod schema;

pub use parser::{parse_file, parse_str, Stanza};
pub use schema::{Directive, Header, Operation, OwnerSpec, DEFAULT_CHANGES, VERSION_SUFFIX};
