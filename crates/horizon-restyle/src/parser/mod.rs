//! Declaration block parsing.

mod block;

pub use block::{
    ParsedBlock, ParsedDeclaration, parse_block, parse_declaration, reserialize_with_update,
    serialize_single,
};
