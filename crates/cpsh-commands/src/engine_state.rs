//! The seam between the command registry (§4.3, pure grammar/arity/lookup
//! logic) and the supervisor mechanics that actually spawn, signal, and wait
//! on children (§4.4, owned by `compshell`'s `Engine`). Commands never touch
//! `tokio::process` or the event channel directly; they only call methods on
//! this trait, so `cpsh-commands` stays decoupled from the concrete runtime
//! plumbing (see DESIGN.md).

use cpsh_core::Context;

/// Everything a command handler needs beyond the module graph itself.
/// Implemented by `compshell::Engine`.
#[async_trait::async_trait(?Send)]
pub trait EngineState {
    fn context(&self) -> &Context;
    fn context_mut(&mut self) -> &mut Context;

    /// Spawn `id`'s child and install its `RunningHandle` on the module.
    /// Errors are host-internal (spawn failure); the `run` command handler
    /// reports them as a warning and leaves the module defined-but-not-running
    /// (§4.4 "Spawn failure"), it does not surface a `CommandError`.
    async fn spawn(&mut self, id: u64) -> anyhow::Result<()>;

    /// SIGTERM the child (if running) and shut down its stdin. A no-op if the
    /// module is not currently running.
    async fn kill(&mut self, id: u64);

    /// Shut down the child's stdin endpoint only (`eof` command).
    async fn close_stdin(&mut self, id: u64);

    /// Write `data` verbatim to the child's stdin. Logs and drops silently if
    /// the module is not running or its stdin was already closed via `eof`
    /// (§4.4 "Writing to a module") rather than returning an error.
    async fn write_stdin(&mut self, id: u64, data: &[u8]);

    /// Block (from the command stream's point of view) until `id`'s child has
    /// exited, draining and applying every event observed in the meantime —
    /// including recursively dispatching commands fed by any `obey`-flagged
    /// module's stdout (§4.4 "Wait", §5 Open Question 1). A no-op if `id` is
    /// not currently running by the time this is called.
    async fn wait_exit(&mut self, id: u64);

    /// Terminate the whole process immediately (`exit` command). Never
    /// returns.
    fn exit_process(&mut self, status: i32) -> !;
}
