//! The application command parser (§4.2) and command registry (§4.3): the
//! grammar-and-dispatch layer that sits between the reusable byte-stream
//! parser (`cpsh-parser`) and the data model (`cpsh-core`). Grounded on
//! `mkapp_parser.c` and `mkapp_commands.c`.

pub mod commands;
pub mod dispatcher;
pub mod engine_state;
pub mod escape;
pub mod parser_state;

#[cfg(test)]
mod test_support;

pub use dispatcher::{DispatchOutcome, Dispatcher};
pub use engine_state::EngineState;
pub use parser_state::ParserState;
