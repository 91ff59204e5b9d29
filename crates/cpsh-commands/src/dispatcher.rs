//! The command registry (§4.3, §9 "Dynamic dispatch by name"): a
//! `HashMap<&'static str, Box<dyn Command>>` built once at startup, replacing
//! the original's `GModule` symbol-table lookup of `mk_command_<name>` with
//! an explicit data structure.

use std::collections::HashMap;

use crate::commands::{self, Command};
use crate::engine_state::EngineState;

/// Outcome of a single dispatch, already carrying everything the caller needs
/// to format the `"<name>: <message>"` diagnostic line (§4.2) without
/// re-deriving the command name.
pub enum DispatchOutcome {
    Ok,
    CommandError { command: String, message: String },
    NotFound { command: String },
}

pub struct Dispatcher {
    commands: HashMap<&'static str, Box<dyn Command>>,
}

impl Default for Dispatcher {
    fn default() -> Self {
        Self::new()
    }
}

impl Dispatcher {
    pub fn new() -> Self {
        let mut commands: HashMap<&'static str, Box<dyn Command>> = HashMap::new();
        commands.insert("define", Box::new(commands::Define));
        commands.insert("undefine", Box::new(commands::Undefine));
        commands.insert("bind", Box::new(commands::Bind));
        commands.insert("unbind", Box::new(commands::Unbind));
        commands.insert("run", Box::new(commands::Run));
        commands.insert("kill", Box::new(commands::Kill));
        commands.insert("wait", Box::new(commands::Wait));
        commands.insert("listen", Box::new(commands::Listen));
        commands.insert("ignore", Box::new(commands::Ignore));
        commands.insert("obey", Box::new(commands::Obey));
        commands.insert("disobey", Box::new(commands::Disobey));
        commands.insert("eof", Box::new(commands::Eof));
        commands.insert("write", Box::new(commands::Write));
        commands.insert("exit", Box::new(commands::Exit));
        Dispatcher { commands }
    }

    /// Dispatch one already-expanded token vector. `tokens[0]` is the command
    /// name; an empty vector never reaches here (`ParserState::ready` only
    /// ever holds non-empty command token vectors).
    pub async fn dispatch(
        &self,
        tokens: Vec<String>,
        state: &mut dyn EngineState,
    ) -> DispatchOutcome {
        let name = tokens[0].clone();
        match self.commands.get(name.as_str()) {
            Some(handler) => match handler.execute(&tokens, state).await {
                Ok(()) => DispatchOutcome::Ok,
                Err(e) => DispatchOutcome::CommandError { command: name, message: e.to_string() },
            },
            None => DispatchOutcome::NotFound { command: name },
        }
    }
}

#[cfg(test)]
#[path = "dispatcher_tests.rs"]
mod tests;
