//! A fake [`EngineState`] used only by this crate's own unit tests: it
//! records which supervisor operations were invoked instead of touching real
//! processes, so command-handler arity/lookup/bookkeeping logic can be
//! exercised without spawning anything (real process spawning is exercised
//! in `compshell`'s integration tests, which drive the real `Engine`).

#![cfg(test)]

use cpsh_core::Context;

use crate::engine_state::EngineState;

#[derive(Default)]
pub struct FakeState {
    pub ctx: Context,
    pub spawned: Vec<u64>,
    pub killed: Vec<u64>,
    pub closed: Vec<u64>,
    pub writes: Vec<(u64, Vec<u8>)>,
    pub waited: Vec<u64>,
    pub exit_status: Option<i32>,
    pub spawn_should_fail: bool,
}

#[async_trait::async_trait(?Send)]
impl EngineState for FakeState {
    fn context(&self) -> &Context {
        &self.ctx
    }

    fn context_mut(&mut self) -> &mut Context {
        &mut self.ctx
    }

    async fn spawn(&mut self, id: u64) -> anyhow::Result<()> {
        if self.spawn_should_fail {
            anyhow::bail!("fake spawn failure");
        }
        self.spawned.push(id);
        self.ctx.get_mut(id).unwrap().set_running(1000 + id as u32, None);
        self.ctx.running_count += 1;
        Ok(())
    }

    async fn kill(&mut self, id: u64) {
        self.killed.push(id);
        if let Some(m) = self.ctx.get_mut(id) {
            if m.is_running() {
                m.clear_running();
                self.ctx.running_count = self.ctx.running_count.saturating_sub(1);
            }
        }
    }

    async fn close_stdin(&mut self, id: u64) {
        self.closed.push(id);
    }

    async fn write_stdin(&mut self, id: u64, data: &[u8]) {
        self.writes.push((id, data.to_vec()));
    }

    async fn wait_exit(&mut self, id: u64) {
        self.waited.push(id);
        if let Some(m) = self.ctx.get_mut(id) {
            if m.is_running() {
                m.clear_running();
                self.ctx.running_count = self.ctx.running_count.saturating_sub(1);
            }
        }
    }

    fn exit_process(&mut self, status: i32) -> ! {
        self.exit_status = Some(status);
        panic!("__fake_exit__:{status}");
    }
}
