use std::panic::AssertUnwindSafe;

use futures::FutureExt;

use super::*;
use crate::test_support::FakeState;

fn toks(words: &[&str]) -> Vec<String> {
    words.iter().map(|s| s.to_string()).collect()
}

fn define(state: &mut FakeState, name: &str, argv: &[&str]) -> u64 {
    state.ctx.define(name, argv.iter().map(|s| s.to_string()).collect()).new_id
}

#[tokio::test]
async fn test_define_usage_error_below_arity() {
    let mut state = FakeState::default();
    let err = Define.execute(&toks(&["define", "a"]), &mut state).await.unwrap_err();
    assert_eq!(err.to_string(), "usage: define module command [arg...]");
}

#[tokio::test]
async fn test_define_creates_module() {
    let mut state = FakeState::default();
    Define.execute(&toks(&["define", "a", "/bin/echo", "hi"]), &mut state).await.unwrap();
    let m = state.ctx.get_by_name("a").unwrap();
    assert_eq!(m.argv, vec!["/bin/echo".to_string(), "hi".to_string()]);
}

#[tokio::test]
async fn test_define_on_existing_running_name_kills_and_zombifies() {
    let mut state = FakeState::default();
    let old = define(&mut state, "x", &["/bin/sleep", "100"]);
    state.ctx.get_mut(old).unwrap().set_running(42, None);
    state.ctx.running_count += 1;

    Define.execute(&toks(&["define", "x", "/bin/echo", "replaced"]), &mut state).await.unwrap();

    assert_eq!(state.killed, vec![old]);
    assert_ne!(state.ctx.id_of("x"), Some(old));
}

#[tokio::test]
async fn test_define_on_existing_idle_name_removes_immediately() {
    let mut state = FakeState::default();
    let old = define(&mut state, "x", &["/bin/true"]);

    Define.execute(&toks(&["define", "x", "/bin/echo", "replaced"]), &mut state).await.unwrap();

    assert!(state.killed.is_empty());
    assert!(state.ctx.get(old).is_none());
}

#[tokio::test]
async fn test_undefine_unknown_module_errors() {
    let mut state = FakeState::default();
    let err = Undefine.execute(&toks(&["undefine", "ghost"]), &mut state).await.unwrap_err();
    assert_eq!(err.to_string(), "module not found");
}

#[tokio::test]
async fn test_undefine_removes_name_and_edges() {
    let mut state = FakeState::default();
    let a = define(&mut state, "a", &["/bin/true"]);
    let b = define(&mut state, "b", &["/bin/true"]);
    state.ctx.add_edge(a, b);

    Undefine.execute(&toks(&["undefine", "a"]), &mut state).await.unwrap();

    assert!(!state.ctx.contains_name("a"));
    assert_eq!(state.ctx.get(b).unwrap().writers_count, 0);
}

#[tokio::test]
async fn test_bind_unknown_module_not_found() {
    let mut state = FakeState::default();
    define(&mut state, "a", &["/bin/true"]);
    let err = Bind.execute(&toks(&["bind", "a", "ghost"]), &mut state).await.unwrap_err();
    assert_eq!(err.to_string(), "module not found");
}

#[tokio::test]
async fn test_bind_twice_reports_binding_exists() {
    let mut state = FakeState::default();
    define(&mut state, "a", &["/bin/true"]);
    define(&mut state, "b", &["/bin/true"]);
    Bind.execute(&toks(&["bind", "a", "b"]), &mut state).await.unwrap();
    let err = Bind.execute(&toks(&["bind", "a", "b"]), &mut state).await.unwrap_err();
    assert_eq!(err.to_string(), "binding already exists");
}

#[tokio::test]
async fn test_unbind_without_existing_binding_errors() {
    let mut state = FakeState::default();
    define(&mut state, "a", &["/bin/true"]);
    define(&mut state, "b", &["/bin/true"]);
    let err = Unbind.execute(&toks(&["unbind", "a", "b"]), &mut state).await.unwrap_err();
    assert_eq!(err.to_string(), "no such binding");
}

#[tokio::test]
async fn test_bind_then_unbind_restores_state() {
    let mut state = FakeState::default();
    let a = define(&mut state, "a", &["/bin/true"]);
    let b = define(&mut state, "b", &["/bin/true"]);
    Bind.execute(&toks(&["bind", "a", "b"]), &mut state).await.unwrap();
    Unbind.execute(&toks(&["unbind", "a", "b"]), &mut state).await.unwrap();
    assert!(state.ctx.get(a).unwrap().listeners.is_empty());
    assert_eq!(state.ctx.get(b).unwrap().writers_count, 0);
}

#[tokio::test]
async fn test_run_already_running_errors() {
    let mut state = FakeState::default();
    let id = define(&mut state, "a", &["/bin/true"]);
    state.ctx.get_mut(id).unwrap().set_running(1, None);
    let err = Run.execute(&toks(&["run", "a"]), &mut state).await.unwrap_err();
    assert_eq!(err.to_string(), "module already running");
}

#[tokio::test]
async fn test_run_spawns_idle_module() {
    let mut state = FakeState::default();
    define(&mut state, "a", &["/bin/true"]);
    Run.execute(&toks(&["run", "a"]), &mut state).await.unwrap();
    assert_eq!(state.spawned.len(), 1);
}

#[tokio::test]
async fn test_run_swallows_spawn_failure_as_warning() {
    let mut state = FakeState::default();
    state.spawn_should_fail = true;
    define(&mut state, "a", &["/bin/does-not-exist"]);
    let result = Run.execute(&toks(&["run", "a"]), &mut state).await;
    assert!(result.is_ok(), "spawn failure is a warning, not a CommandError");
    assert!(!state.ctx.get_by_name("a").unwrap().is_running());
}

#[tokio::test]
async fn test_kill_not_running_errors() {
    let mut state = FakeState::default();
    define(&mut state, "a", &["/bin/true"]);
    let err = Kill.execute(&toks(&["kill", "a"]), &mut state).await.unwrap_err();
    assert_eq!(err.to_string(), "module not running");
}

#[tokio::test]
async fn test_kill_running_module() {
    let mut state = FakeState::default();
    let id = define(&mut state, "a", &["/bin/sleep", "100"]);
    state.ctx.get_mut(id).unwrap().set_running(1, None);
    Kill.execute(&toks(&["kill", "a"]), &mut state).await.unwrap();
    assert_eq!(state.killed, vec![id]);
}

#[tokio::test]
async fn test_wait_not_running_errors() {
    let mut state = FakeState::default();
    define(&mut state, "a", &["/bin/true"]);
    let err = Wait.execute(&toks(&["wait", "a"]), &mut state).await.unwrap_err();
    assert_eq!(err.to_string(), "module not running");
}

#[tokio::test]
async fn test_wait_running_module_drains() {
    let mut state = FakeState::default();
    let id = define(&mut state, "a", &["/bin/true"]);
    state.ctx.get_mut(id).unwrap().set_running(1, None);
    Wait.execute(&toks(&["wait", "a"]), &mut state).await.unwrap();
    assert_eq!(state.waited, vec![id]);
}

#[tokio::test]
async fn test_listen_ignore_toggle_idempotently() {
    let mut state = FakeState::default();
    let id = define(&mut state, "a", &["/bin/true"]);
    Listen.execute(&toks(&["listen", "a"]), &mut state).await.unwrap();
    assert!(state.ctx.get(id).unwrap().listen_flag);
    Ignore.execute(&toks(&["ignore", "a"]), &mut state).await.unwrap();
    assert!(!state.ctx.get(id).unwrap().listen_flag);
    Listen.execute(&toks(&["listen", "a"]), &mut state).await.unwrap();
    Ignore.execute(&toks(&["ignore", "a"]), &mut state).await.unwrap();
    assert!(!state.ctx.get(id).unwrap().listen_flag);
}

#[tokio::test]
async fn test_obey_disobey_toggle() {
    let mut state = FakeState::default();
    let id = define(&mut state, "a", &["/bin/true"]);
    Obey.execute(&toks(&["obey", "a"]), &mut state).await.unwrap();
    assert!(state.ctx.get(id).unwrap().obey_flag);
    Disobey.execute(&toks(&["disobey", "a"]), &mut state).await.unwrap();
    assert!(!state.ctx.get(id).unwrap().obey_flag);
}

#[tokio::test]
async fn test_eof_not_running_errors() {
    let mut state = FakeState::default();
    define(&mut state, "a", &["/bin/true"]);
    let err = Eof.execute(&toks(&["eof", "a"]), &mut state).await.unwrap_err();
    assert_eq!(err.to_string(), "module not running");
}

#[tokio::test]
async fn test_eof_running_module_closes_stdin() {
    let mut state = FakeState::default();
    let id = define(&mut state, "a", &["/bin/cat"]);
    state.ctx.get_mut(id).unwrap().set_running(1, None);
    Eof.execute(&toks(&["eof", "a"]), &mut state).await.unwrap();
    assert_eq!(state.closed, vec![id]);
}

#[tokio::test]
async fn test_write_joins_tokens_with_trailing_space_and_newline() {
    let mut state = FakeState::default();
    let id = define(&mut state, "a", &["/bin/cat"]);
    state.ctx.get_mut(id).unwrap().set_running(1, None);
    Write.execute(&toks(&["write", "a", "hello", "world"]), &mut state).await.unwrap();
    assert_eq!(state.writes, vec![(id, b"hello world \n".to_vec())]);
}

#[tokio::test]
async fn test_write_not_running_errors() {
    let mut state = FakeState::default();
    define(&mut state, "a", &["/bin/cat"]);
    let err = Write.execute(&toks(&["write", "a", "hi"]), &mut state).await.unwrap_err();
    assert_eq!(err.to_string(), "module not running");
}

#[tokio::test]
async fn test_exit_defaults_to_zero() {
    let mut state = FakeState::default();
    let result =
        AssertUnwindSafe(Exit.execute(&toks(&["exit"]), &mut state)).catch_unwind().await;
    assert!(result.is_err(), "exit_process never returns");
    assert_eq!(state.exit_status, Some(0));
}

#[tokio::test]
async fn test_exit_with_status_parses_signed_integer() {
    let mut state = FakeState::default();
    let _ = AssertUnwindSafe(Exit.execute(&toks(&["exit", "3"]), &mut state))
        .catch_unwind()
        .await;
    assert_eq!(state.exit_status, Some(3));
}

#[tokio::test]
async fn test_exit_too_many_args_is_usage_error() {
    let mut state = FakeState::default();
    let err = Exit.execute(&toks(&["exit", "1", "2"]), &mut state).await.unwrap_err();
    assert_eq!(err.to_string(), "usage: exit [status]");
}
