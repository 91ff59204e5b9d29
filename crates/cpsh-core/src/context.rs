use std::collections::HashMap;

use crate::module::Module;

/// The result of a `define`: the freshly allocated module and, when the name
/// was already bound, the id of whatever module it displaced.
pub struct DefineOutcome {
    pub new_id: u64,
    pub previous: Option<u64>,
}

/// Owns the id→module mapping, the name→id index, the running-child count,
/// and the end-of-input flag (§4.5).
///
/// Modules are keyed by a numeric id rather than by name. `define` on a name
/// that already has a *running* module must not disturb that module's own
/// exit bookkeeping — the old module is left in `modules` (as a zombie) while
/// `names` is repointed at the new one, so a late `Exited` event for the old
/// id can never be misapplied to the module that now owns the name (see
/// DESIGN.md, "redefine vs. in-flight exit events").
#[derive(Default)]
pub struct Context {
    pub modules: HashMap<u64, Module>,
    names: HashMap<String, u64>,
    next_id: u64,
    pub running_count: usize,
    pub eof_received: bool,
}

impl Context {
    pub fn new() -> Self {
        Self::default()
    }

    /// `running_count == 0 AND eof_received == true` (§3, §4.5).
    pub fn is_terminal(&self) -> bool {
        self.eof_received && self.running_count == 0
    }

    pub fn id_of(&self, name: &str) -> Option<u64> {
        self.names.get(name).copied()
    }

    pub fn contains_name(&self, name: &str) -> bool {
        self.names.contains_key(name)
    }

    pub fn get(&self, id: u64) -> Option<&Module> {
        self.modules.get(&id)
    }

    pub fn get_mut(&mut self, id: u64) -> Option<&mut Module> {
        self.modules.get_mut(&id)
    }

    pub fn get_by_name(&self, name: &str) -> Option<&Module> {
        self.id_of(name).and_then(|id| self.modules.get(&id))
    }

    pub fn get_by_name_mut(&mut self, name: &str) -> Option<&mut Module> {
        let id = self.id_of(name)?;
        self.modules.get_mut(&id)
    }

    /// Create a new module under `name`, repointing the name index at it.
    /// Does not itself kill or remove a previous occupant — that decision
    /// (kill-and-zombie if running, immediate removal otherwise) belongs to
    /// the `define` command handler, which has access to the supervisor.
    pub fn define(&mut self, name: &str, argv: Vec<String>) -> DefineOutcome {
        let id = self.next_id;
        self.next_id += 1;
        let previous = self.names.insert(name.to_string(), id);
        self.modules.insert(id, Module::new(id, name, argv));
        DefineOutcome { new_id: id, previous }
    }

    /// Drop the name→id binding, returning the id it pointed at, if any.
    /// Used by `undefine` and by a redefine that displaces an occupant.
    pub fn forget_name(&mut self, name: &str) -> Option<u64> {
        self.names.remove(name)
    }

    /// Add the edge `out → in`, incrementing `in`'s `writers_count`. Returns
    /// `false` if the edge already exists or either id is missing.
    pub fn add_edge(&mut self, out: u64, listener_in: u64) -> bool {
        let added = self
            .modules
            .get_mut(&out)
            .map(|m| m.add_listener(listener_in))
            .unwrap_or(false);
        if added {
            if let Some(target) = self.modules.get_mut(&listener_in) {
                target.writers_count += 1;
            }
        }
        added
    }

    /// Remove the edge `out → in`, decrementing `in`'s `writers_count`.
    /// Returns `false` if the edge did not exist.
    pub fn remove_edge(&mut self, out: u64, listener_in: u64) -> bool {
        let removed = self
            .modules
            .get_mut(&out)
            .map(|m| m.remove_listener(listener_in))
            .unwrap_or(false);
        if removed {
            if let Some(target) = self.modules.get_mut(&listener_in) {
                target.writers_count = target.writers_count.saturating_sub(1);
            }
        }
        removed
    }

    /// Full graph teardown for a module being deleted: release its own
    /// outgoing edges (decrementing each listener's `writers_count`) and
    /// remove it from every other module's listener list (the Resolved
    /// bidirectional-cleanup design note).
    pub fn unbind_all_edges(&mut self, id: u64) {
        if let Some(listeners) = self.modules.get(&id).map(|m| m.listeners.clone()) {
            for listener in listeners {
                if let Some(target) = self.modules.get_mut(&listener) {
                    target.writers_count = target.writers_count.saturating_sub(1);
                }
            }
        }
        for (&other_id, module) in self.modules.iter_mut() {
            if other_id == id {
                continue;
            }
            module.remove_listener(id);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_terminal_requires_both_conditions() {
        let mut ctx = Context::new();
        assert!(!ctx.is_terminal());
        ctx.eof_received = true;
        assert!(ctx.is_terminal());
        ctx.running_count = 1;
        assert!(!ctx.is_terminal());
    }

    #[test]
    fn test_define_allocates_fresh_ids() {
        let mut ctx = Context::new();
        let a = ctx.define("a", vec!["/bin/true".into()]);
        let b = ctx.define("b", vec!["/bin/true".into()]);
        assert_ne!(a.new_id, b.new_id);
        assert!(a.previous.is_none());
        assert_eq!(ctx.id_of("a"), Some(a.new_id));
    }

    #[test]
    fn test_redefine_reports_previous_occupant_without_removing_it() {
        let mut ctx = Context::new();
        let first = ctx.define("x", vec!["/bin/sleep".into(), "100".into()]);
        ctx.get_mut(first.new_id).unwrap().set_running(42, None);

        let second = ctx.define("x", vec!["/bin/echo".into(), "replaced".into()]);

        assert_eq!(second.previous, Some(first.new_id));
        assert_eq!(ctx.id_of("x"), Some(second.new_id));
        // the old module is still reachable by id so its eventual exit event
        // can still find and tear it down.
        assert!(ctx.get(first.new_id).unwrap().is_running());
    }

    #[test]
    fn test_add_edge_tracks_writers_count() {
        let mut ctx = Context::new();
        let a = ctx.define("a", vec!["/bin/true".into()]).new_id;
        let b = ctx.define("b", vec!["/bin/true".into()]).new_id;
        assert!(ctx.add_edge(a, b));
        assert_eq!(ctx.get(a).unwrap().listeners, vec![b]);
        assert_eq!(ctx.get(b).unwrap().writers_count, 1);
    }

    #[test]
    fn test_add_edge_twice_is_rejected() {
        let mut ctx = Context::new();
        let a = ctx.define("a", vec!["/bin/true".into()]).new_id;
        let b = ctx.define("b", vec!["/bin/true".into()]).new_id;
        assert!(ctx.add_edge(a, b));
        assert!(!ctx.add_edge(a, b));
        assert_eq!(ctx.get(b).unwrap().writers_count, 1);
    }

    #[test]
    fn test_remove_edge_restores_pre_bind_state() {
        let mut ctx = Context::new();
        let a = ctx.define("a", vec!["/bin/true".into()]).new_id;
        let b = ctx.define("b", vec!["/bin/true".into()]).new_id;
        ctx.add_edge(a, b);
        assert!(ctx.remove_edge(a, b));
        assert!(ctx.get(a).unwrap().listeners.is_empty());
        assert_eq!(ctx.get(b).unwrap().writers_count, 0);
    }

    #[test]
    fn test_unbind_all_edges_removes_incoming_and_outgoing() {
        let mut ctx = Context::new();
        let a = ctx.define("a", vec!["/bin/true".into()]).new_id;
        let b = ctx.define("b", vec!["/bin/true".into()]).new_id;
        let c = ctx.define("c", vec!["/bin/true".into()]).new_id;
        ctx.add_edge(a, c); // a -> c
        ctx.add_edge(b, c); // b -> c
        ctx.add_edge(c, a); // c -> a

        ctx.unbind_all_edges(c);

        assert!(ctx.get(a).unwrap().listeners.is_empty(), "c's outgoing edge to a is gone");
        assert_eq!(ctx.get(a).unwrap().writers_count, 0);
        assert!(ctx.get(b).unwrap().listeners.is_empty(), "b's edge to c is gone");
    }
}
