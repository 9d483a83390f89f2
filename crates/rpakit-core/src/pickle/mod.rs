//! Read-only-by-design pickle codec (§4.2, §4.3), scoped to the value
//! lattice an RPA index needs. See `reader.rs` for the decode side (a
//! table-dispatched opcode interpreter covering protocols 0-5) and
//! `writer.rs` for the native protocol-2/4 encoder.

mod opcodes;
mod reader;
mod value;
pub mod writer;

pub use reader::decode;
pub use value::Value;
pub use writer::encode;
