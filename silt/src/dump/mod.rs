//! Initial-state bootstrap from an external logical dump.

mod driver;
mod parser;

pub use driver::Dumper;
pub use parser::{DumpHandler, ParserState, parse_stream, parse_values};
