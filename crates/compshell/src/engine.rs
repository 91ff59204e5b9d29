//! The top-level `Engine`: owns the module graph (`cpsh-core::Context`), the
//! command parser/registry (`cpsh-commands`), and the event channel fed by
//! every running child's I/O tasks (`cpsh-process`). Runs the single-threaded
//! cooperative event loop described in §4.5/§5 as one `tokio::select!` on a
//! current-thread runtime.
//!
//! This is also where the `obey` interpreter hook lives (§6, §9 Open
//! Question 4): rather than storing a callback on `Context` that would need
//! to re-borrow the very parser/dispatcher that owns it, the `Engine` simply
//! calls back into its own parser-feed-then-dispatch routine directly while
//! handling a `Stdout` event for an `obey`-flagged module.

use std::path::PathBuf;

use cpsh_commands::{escape, parser_state, DispatchOutcome, Dispatcher, EngineState, ParserState};
use cpsh_core::{Context, ModuleEvent};
use cpsh_parser::Parser;
use tokio::io::AsyncReadExt;
use tokio::sync::mpsc;

/// Where the command grammar is read from (§10.1). Exactly one is active per
/// run, mirroring `mkapp.c`'s precedence: `--command` > files > stdin.
pub enum CommandSource {
    Command(String),
    Files(Vec<PathBuf>),
    Stdin,
}

pub struct Engine {
    ctx: Context,
    dispatcher: Dispatcher,
    parser: Parser<ParserState>,
    parser_state: ParserState,
    events_tx: mpsc::UnboundedSender<ModuleEvent>,
    events_rx: mpsc::UnboundedReceiver<ModuleEvent>,
}

impl Default for Engine {
    fn default() -> Self {
        Self::new()
    }
}

impl Engine {
    pub fn new() -> Self {
        let (events_tx, events_rx) = mpsc::unbounded_channel();
        Engine {
            ctx: Context::new(),
            dispatcher: Dispatcher::new(),
            parser: parser_state::build_parser(),
            parser_state: ParserState::default(),
            events_tx,
            events_rx,
        }
    }

    pub fn running_count(&self) -> usize {
        self.ctx.running_count
    }

    pub async fn run(&mut self, source: CommandSource) {
        match source {
            CommandSource::Command(s) => {
                self.feed_bytes_and_dispatch(s.as_bytes()).await;
                self.feed_eof().await;
                self.drain_until_terminal().await;
            }
            CommandSource::Files(paths) => {
                for path in &paths {
                    match tokio::fs::read(path).await {
                        Ok(data) => self.feed_bytes_and_dispatch(&data).await,
                        Err(e) => tracing::error!(
                            file = %path.display(), error = %e, "could not read module file"
                        ),
                    }
                }
                self.feed_eof().await;
                self.drain_until_terminal().await;
            }
            CommandSource::Stdin => self.run_stdin().await,
        }
    }

    async fn run_stdin(&mut self) {
        let mut stdin = tokio::io::stdin();
        let mut buf = vec![0u8; 4096];
        let mut stdin_done = false;
        while !self.ctx.is_terminal() {
            if stdin_done {
                match self.events_rx.recv().await {
                    Some(ev) => self.apply_event(ev).await,
                    None => break,
                }
                continue;
            }
            tokio::select! {
                result = stdin.read(&mut buf) => {
                    match result {
                        Ok(0) => { self.feed_eof().await; stdin_done = true; }
                        Ok(n) => self.feed_bytes_and_dispatch(&buf[..n]).await,
                        Err(e) => {
                            tracing::error!(error = %e, "stdin read error");
                            self.feed_eof().await;
                            stdin_done = true;
                        }
                    }
                }
                maybe_ev = self.events_rx.recv() => {
                    if let Some(ev) = maybe_ev {
                        self.apply_event(ev).await;
                    }
                }
            }
        }
    }

    async fn drain_until_terminal(&mut self) {
        while !self.ctx.is_terminal() {
            match self.events_rx.recv().await {
                Some(ev) => self.apply_event(ev).await,
                None => break,
            }
        }
    }

    async fn feed_eof(&mut self) {
        self.parser.feed_eof(&mut self.parser_state);
        self.ctx.eof_received = true;
        tracing::debug!("end of command input");
    }

    /// Feed raw bytes through the parser and dispatch every command that
    /// became ready, in order. Used both for the top-level command source
    /// and for `obey`'s replay of a module's stdout (§6).
    async fn feed_bytes_and_dispatch(&mut self, data: &[u8]) {
        for &b in data {
            self.parser.feed(b, &mut self.parser_state);
        }
        let ready = std::mem::take(&mut self.parser_state.ready);
        for raw_tokens in ready {
            let tokens: Vec<String> = raw_tokens
                .iter()
                .map(|t| String::from_utf8_lossy(&escape::expand(t)).into_owned())
                .collect();
            self.dispatch_and_report(tokens).await;
        }
    }

    async fn dispatch_and_report(&mut self, tokens: Vec<String>) {
        // `Dispatcher` holds no mutable state of its own; swap it out so we
        // can pass `&mut self` as the `&mut dyn EngineState` argument without
        // a conflicting borrow of `self.dispatcher` (§9 Open Question 5).
        let dispatcher = std::mem::take(&mut self.dispatcher);
        let outcome = dispatcher.dispatch(tokens, self).await;
        self.dispatcher = dispatcher;

        match outcome {
            DispatchOutcome::Ok => {}
            DispatchOutcome::CommandError { command, message } => {
                eprintln!("{command}: {message}");
            }
            DispatchOutcome::NotFound { command } => {
                eprintln!("{command}: command not found.");
            }
        }
    }

    async fn apply_event(&mut self, ev: ModuleEvent) {
        match ev {
            ModuleEvent::Stdout { id, chunk, .. } => self.handle_stdout(id, chunk).await,
            ModuleEvent::StdoutEof { module, .. } => {
                tracing::debug!(module = %module, "stdout EOF");
            }
            ModuleEvent::StderrLine { module, line, .. } => {
                eprintln!("{module}: {line}");
            }
            ModuleEvent::StderrEof { module, .. } => {
                tracing::debug!(module = %module, "stderr EOF");
            }
            ModuleEvent::Exited { id, module, status } => {
                self.handle_exit(id, &module, status).await;
            }
        }
    }

    /// §4.4 "Forward stdout": listeners in insertion order, then the host
    /// echo, then the `obey` replay.
    async fn handle_stdout(&mut self, id: u64, chunk: Vec<u8>) {
        let Some((listeners, listen_flag, obey_flag)) =
            self.ctx.get(id).map(|m| (m.listeners.clone(), m.listen_flag, m.obey_flag))
        else {
            return;
        };

        for listener_id in listeners {
            self.write_stdin(listener_id, &chunk).await;
        }

        if listen_flag {
            use std::io::Write;
            let mut out = std::io::stdout().lock();
            let _ = out.write_all(&chunk);
            let _ = out.flush();
        }

        if obey_flag {
            self.feed_bytes_and_dispatch(&chunk).await;
        }
    }

    /// §4.4 exit handler, steps 2-7 (step 1, draining readable data, is
    /// handled implicitly: the stdout/stderr forwarder tasks own their pipe
    /// fds independently of the reaper and keep draining to their own true
    /// EOF regardless of the order `Exited` arrives relative to them — see
    /// DESIGN.md).
    async fn handle_exit(&mut self, id: u64, name: &str, status: Option<i32>) {
        tracing::debug!(module = %name, ?status, "module exited");

        let was_running = self.ctx.get(id).is_some_and(|m| m.is_running());
        if let Some(m) = self.ctx.get_mut(id) {
            m.clear_running();
        }
        if was_running {
            self.ctx.running_count = self.ctx.running_count.saturating_sub(1);
        }

        let zombie = self.ctx.get(id).map(|m| m.zombie_flag).unwrap_or(false);
        if zombie {
            self.ctx.unbind_all_edges(id);
            self.ctx.modules.remove(&id);
        }
    }
}

#[async_trait::async_trait(?Send)]
impl EngineState for Engine {
    fn context(&self) -> &Context {
        &self.ctx
    }

    fn context_mut(&mut self) -> &mut Context {
        &mut self.ctx
    }

    async fn spawn(&mut self, id: u64) -> anyhow::Result<()> {
        let (name, argv) = {
            let m = self
                .ctx
                .get(id)
                .ok_or_else(|| anyhow::anyhow!("module {id} vanished before spawn"))?;
            (m.name.clone(), m.argv.clone())
        };
        let spawned = cpsh_process::spawn(id, &name, &argv, self.events_tx.clone()).await?;
        if let Some(m) = self.ctx.get_mut(id) {
            m.set_running(spawned.pid, spawned.stdin);
        }
        self.ctx.running_count += 1;
        tracing::debug!(module = %name, pid = spawned.pid, "spawned");
        Ok(())
    }

    async fn kill(&mut self, id: u64) {
        let info = self.ctx.get_mut(id).and_then(|m| {
            let pid = m.pid()?;
            Some((m.name.clone(), pid, m.take_stdin()))
        });
        if let Some((name, pid, stdin)) = info {
            tracing::debug!(module = %name, pid, "killing");
            cpsh_process::send_sigterm(&name, pid);
            cpsh_process::close_stdin(stdin).await;
        }
    }

    async fn close_stdin(&mut self, id: u64) {
        let stdin = self.ctx.get_mut(id).and_then(|m| m.take_stdin());
        cpsh_process::close_stdin(stdin).await;
    }

    async fn write_stdin(&mut self, id: u64, data: &[u8]) {
        let Some(name) = self.ctx.get(id).map(|m| m.name.clone()) else {
            return;
        };
        if !self.ctx.get(id).is_some_and(|m| m.is_running()) {
            tracing::warn!(module = %name, "write dropped: module not running");
            return;
        }
        if !self.ctx.get(id).is_some_and(|m| m.stdin_is_open()) {
            tracing::warn!(module = %name, "write dropped: stdin closed via eof");
            return;
        }
        if let Some(m) = self.ctx.get_mut(id) {
            if let Some(stdin) = m.stdin_mut() {
                if let Err(e) = cpsh_process::write_all(stdin, data).await {
                    tracing::warn!(module = %name, error = %e, "write to child stdin failed");
                }
            }
        }
    }

    async fn wait_exit(&mut self, id: u64) {
        loop {
            if !self.ctx.get(id).is_some_and(|m| m.is_running()) {
                return;
            }
            let Some(ev) = self.events_rx.recv().await else {
                return;
            };
            let is_target_exit = matches!(&ev, ModuleEvent::Exited { id: eid, .. } if *eid == id);
            self.apply_event(ev).await;
            if is_target_exit {
                return;
            }
        }
    }

    fn exit_process(&mut self, status: i32) -> ! {
        tracing::debug!(status, "exit command issued");
        std::process::exit(status);
    }
}

#[cfg(test)]
#[path = "engine_tests.rs"]
mod tests;
