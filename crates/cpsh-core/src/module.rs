use tokio::process::ChildStdin;

/// Everything only present while the child is alive. Kept separate from
/// [`Module`] so `Option<RunningHandle>` alone answers "is this running".
pub struct RunningHandle {
    pub pid: u32,
    /// `None` once `eof` has shut the stdin endpoint down (§4.4 "End-of-input
    /// to a child"), even though the child itself is still running.
    pub stdin: Option<ChildStdin>,
}

/// A single supervised child process (§3 Data Model).
///
/// Identified by a numeric `id`, not by `name` alone: `define` on an
/// already-running name must start a brand-new module under that name while
/// the old one finishes dying in the background (§4.3 `define`, Scenario 3
/// "Replace on redefine"). Two `Module`s can therefore briefly share a `name`
/// but never an `id` — events from the supervisor are always tagged with the
/// `id`, so a stale exit notification can never be misapplied to the module
/// that has since taken over the name (see DESIGN.md).
pub struct Module {
    pub id: u64,
    pub name: String,
    pub argv: Vec<String>,
    /// Other modules (by id) whose stdin receives a copy of this module's
    /// stdout, in the order they were bound.
    pub listeners: Vec<u64>,
    /// Number of modules currently listing this module as a listener.
    pub writers_count: usize,
    pub listen_flag: bool,
    pub obey_flag: bool,
    /// Set when `undefine`, or a redefine of a still-running module, targets
    /// this module; the actual free is deferred to the exit handler.
    pub zombie_flag: bool,
    running: Option<RunningHandle>,
}

impl Module {
    pub fn new(id: u64, name: impl Into<String>, argv: Vec<String>) -> Self {
        assert!(!argv.is_empty(), "argv must be non-empty");
        Module {
            id,
            name: name.into(),
            argv,
            listeners: Vec::new(),
            writers_count: 0,
            listen_flag: false,
            obey_flag: false,
            zombie_flag: false,
            running: None,
        }
    }

    pub fn is_running(&self) -> bool {
        self.running.is_some()
    }

    pub fn pid(&self) -> Option<u32> {
        self.running.as_ref().map(|r| r.pid)
    }

    pub fn set_running(&mut self, pid: u32, stdin: Option<ChildStdin>) {
        self.running = Some(RunningHandle { pid, stdin });
    }

    /// Take the stdin handle, closing that side of the pipe once the returned
    /// value is dropped. Used by `eof` and `kill`.
    pub fn take_stdin(&mut self) -> Option<ChildStdin> {
        self.running.as_mut().and_then(|r| r.stdin.take())
    }

    pub fn stdin_mut(&mut self) -> Option<&mut ChildStdin> {
        self.running.as_mut().and_then(|r| r.stdin.as_mut())
    }

    pub fn stdin_is_open(&self) -> bool {
        self.running.as_ref().is_some_and(|r| r.stdin.is_some())
    }

    pub fn clear_running(&mut self) -> Option<RunningHandle> {
        self.running.take()
    }

    /// Add an edge `self → listener`. Returns `false` if the edge already
    /// exists (duplicate edges are not permitted, §3).
    pub fn add_listener(&mut self, listener: u64) -> bool {
        if self.listeners.contains(&listener) {
            return false;
        }
        self.listeners.push(listener);
        true
    }

    /// Remove an edge. Returns `false` if it did not exist.
    pub fn remove_listener(&mut self, listener: u64) -> bool {
        let before = self.listeners.len();
        self.listeners.retain(|&l| l != listener);
        self.listeners.len() != before
    }
}
