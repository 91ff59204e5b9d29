//! The command set (§4.3). Each handler only validates arity, looks names up
//! in the module graph, and calls through [`EngineState`] for anything that
//! touches a real process. Grounded token-for-token on `mkapp_commands.c`:
//! the arity checks, lookup order, and literal error/usage strings are
//! carried over unchanged.

use cpsh_core::CommandError;

use crate::engine_state::EngineState;

#[async_trait::async_trait(?Send)]
pub trait Command {
    async fn execute(
        &self,
        tokens: &[String],
        state: &mut dyn EngineState,
    ) -> Result<(), CommandError>;
}

/// Kill (if running) and remove `id` from the context, including every
/// incoming/outgoing edge. If the child is still running, the removal itself
/// is deferred to the exit handler via `zombie_flag` (§4.4 step 6); the name
/// binding is dropped immediately either way so a fresh `define` can reuse it
/// right away (Scenario 3, "Replace on redefine").
async fn kill_and_retire(state: &mut dyn EngineState, id: u64) {
    let running = state.context().get(id).is_some_and(|m| m.is_running());
    if running {
        if let Some(m) = state.context_mut().get_mut(id) {
            m.zombie_flag = true;
        }
        state.kill(id).await;
    } else {
        state.context_mut().unbind_all_edges(id);
        state.context_mut().modules.remove(&id);
    }
}

pub struct Define;
#[async_trait::async_trait(?Send)]
impl Command for Define {
    async fn execute(
        &self,
        tokens: &[String],
        state: &mut dyn EngineState,
    ) -> Result<(), CommandError> {
        if tokens.len() < 3 {
            return Err(CommandError::Usage("define module command [arg...]"));
        }
        let name = &tokens[1];
        let argv = tokens[2..].to_vec();
        let outcome = state.context_mut().define(name, argv);
        if let Some(previous) = outcome.previous {
            tracing::debug!(module = %name, "module already exists => killing and removing");
            kill_and_retire(state, previous).await;
        }
        Ok(())
    }
}

pub struct Undefine;
#[async_trait::async_trait(?Send)]
impl Command for Undefine {
    async fn execute(
        &self,
        tokens: &[String],
        state: &mut dyn EngineState,
    ) -> Result<(), CommandError> {
        if tokens.len() != 2 {
            return Err(CommandError::Usage("undefine module"));
        }
        let name = &tokens[1];
        let id = state.context().id_of(name).ok_or(CommandError::ModuleNotFound)?;
        state.context_mut().forget_name(name);
        kill_and_retire(state, id).await;
        Ok(())
    }
}

fn lookup(state: &dyn EngineState, name: &str) -> Result<u64, CommandError> {
    state.context().id_of(name).ok_or(CommandError::ModuleNotFound)
}

pub struct Bind;
#[async_trait::async_trait(?Send)]
impl Command for Bind {
    async fn execute(
        &self,
        tokens: &[String],
        state: &mut dyn EngineState,
    ) -> Result<(), CommandError> {
        if tokens.len() != 3 {
            return Err(CommandError::Usage("bind out_module in_module"));
        }
        let out = lookup(state, &tokens[1])?;
        let listener_in = lookup(state, &tokens[2])?;
        if state.context_mut().add_edge(out, listener_in) {
            Ok(())
        } else {
            Err(CommandError::BindingExists)
        }
    }
}

pub struct Unbind;
#[async_trait::async_trait(?Send)]
impl Command for Unbind {
    async fn execute(
        &self,
        tokens: &[String],
        state: &mut dyn EngineState,
    ) -> Result<(), CommandError> {
        if tokens.len() != 3 {
            return Err(CommandError::Usage("unbind out_module in_module"));
        }
        let out = lookup(state, &tokens[1])?;
        let listener_in = lookup(state, &tokens[2])?;
        if state.context_mut().remove_edge(out, listener_in) {
            Ok(())
        } else {
            Err(CommandError::BindingNotExists)
        }
    }
}

pub struct Run;
#[async_trait::async_trait(?Send)]
impl Command for Run {
    async fn execute(
        &self,
        tokens: &[String],
        state: &mut dyn EngineState,
    ) -> Result<(), CommandError> {
        if tokens.len() != 2 {
            return Err(CommandError::Usage("run module"));
        }
        let id = lookup(state, &tokens[1])?;
        if state.context().get(id).is_some_and(|m| m.is_running()) {
            return Err(CommandError::ModuleAlreadyRunning);
        }
        if let Err(e) = state.spawn(id).await {
            tracing::warn!(module = %tokens[1], error = %e, "failed to spawn module");
        }
        Ok(())
    }
}

pub struct Kill;
#[async_trait::async_trait(?Send)]
impl Command for Kill {
    async fn execute(
        &self,
        tokens: &[String],
        state: &mut dyn EngineState,
    ) -> Result<(), CommandError> {
        if tokens.len() != 2 {
            return Err(CommandError::Usage("kill module"));
        }
        let id = lookup(state, &tokens[1])?;
        if !state.context().get(id).is_some_and(|m| m.is_running()) {
            return Err(CommandError::ModuleNotRunning);
        }
        state.kill(id).await;
        Ok(())
    }
}

pub struct Wait;
#[async_trait::async_trait(?Send)]
impl Command for Wait {
    async fn execute(
        &self,
        tokens: &[String],
        state: &mut dyn EngineState,
    ) -> Result<(), CommandError> {
        if tokens.len() != 2 {
            return Err(CommandError::Usage("wait module"));
        }
        let id = lookup(state, &tokens[1])?;
        if !state.context().get(id).is_some_and(|m| m.is_running()) {
            return Err(CommandError::ModuleNotRunning);
        }
        state.wait_exit(id).await;
        Ok(())
    }
}

pub struct Listen;
#[async_trait::async_trait(?Send)]
impl Command for Listen {
    async fn execute(
        &self,
        tokens: &[String],
        state: &mut dyn EngineState,
    ) -> Result<(), CommandError> {
        if tokens.len() != 2 {
            return Err(CommandError::Usage("listen module"));
        }
        let id = lookup(state, &tokens[1])?;
        state.context_mut().get_mut(id).expect("looked up above").listen_flag = true;
        Ok(())
    }
}

pub struct Ignore;
#[async_trait::async_trait(?Send)]
impl Command for Ignore {
    async fn execute(
        &self,
        tokens: &[String],
        state: &mut dyn EngineState,
    ) -> Result<(), CommandError> {
        if tokens.len() != 2 {
            return Err(CommandError::Usage("ignore module"));
        }
        let id = lookup(state, &tokens[1])?;
        state.context_mut().get_mut(id).expect("looked up above").listen_flag = false;
        Ok(())
    }
}

pub struct Obey;
#[async_trait::async_trait(?Send)]
impl Command for Obey {
    async fn execute(
        &self,
        tokens: &[String],
        state: &mut dyn EngineState,
    ) -> Result<(), CommandError> {
        if tokens.len() != 2 {
            return Err(CommandError::Usage("obey module"));
        }
        let id = lookup(state, &tokens[1])?;
        state.context_mut().get_mut(id).expect("looked up above").obey_flag = true;
        Ok(())
    }
}

pub struct Disobey;
#[async_trait::async_trait(?Send)]
impl Command for Disobey {
    async fn execute(
        &self,
        tokens: &[String],
        state: &mut dyn EngineState,
    ) -> Result<(), CommandError> {
        if tokens.len() != 2 {
            return Err(CommandError::Usage("disobey module"));
        }
        let id = lookup(state, &tokens[1])?;
        state.context_mut().get_mut(id).expect("looked up above").obey_flag = false;
        Ok(())
    }
}

pub struct Eof;
#[async_trait::async_trait(?Send)]
impl Command for Eof {
    async fn execute(
        &self,
        tokens: &[String],
        state: &mut dyn EngineState,
    ) -> Result<(), CommandError> {
        if tokens.len() != 2 {
            return Err(CommandError::Usage("eof module"));
        }
        let id = lookup(state, &tokens[1])?;
        if !state.context().get(id).is_some_and(|m| m.is_running()) {
            return Err(CommandError::ModuleNotRunning);
        }
        state.close_stdin(id).await;
        Ok(())
    }
}

pub struct Write;
#[async_trait::async_trait(?Send)]
impl Command for Write {
    async fn execute(
        &self,
        tokens: &[String],
        state: &mut dyn EngineState,
    ) -> Result<(), CommandError> {
        if tokens.len() < 3 {
            return Err(CommandError::Usage("write module string"));
        }
        let id = lookup(state, &tokens[1])?;
        if !state.context().get(id).is_some_and(|m| m.is_running()) {
            return Err(CommandError::ModuleNotRunning);
        }
        // Literal behavior preserved on purpose (§9 "Resolved"): every token
        // gets a trailing space, including the last one, before the final
        // newline — not a clean single-space join.
        let mut payload = Vec::new();
        for tok in &tokens[2..] {
            payload.extend_from_slice(tok.as_bytes());
            payload.push(b' ');
        }
        payload.push(b'\n');
        state.write_stdin(id, &payload).await;
        Ok(())
    }
}

pub struct Exit;
#[async_trait::async_trait(?Send)]
impl Command for Exit {
    async fn execute(
        &self,
        tokens: &[String],
        state: &mut dyn EngineState,
    ) -> Result<(), CommandError> {
        match tokens.len() {
            1 => state.exit_process(0),
            2 => {
                let status: i32 = tokens[1].parse().unwrap_or(0);
                state.exit_process(status)
            }
            _ => Err(CommandError::Usage("exit [status]")),
        }
    }
}

#[cfg(test)]
#[path = "commands_tests.rs"]
mod tests;
