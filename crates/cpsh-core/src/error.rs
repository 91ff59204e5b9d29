/// The referential/usage diagnostics a command handler can return. `Display`
/// produces the exact wording the command grammar documents, since these
/// strings are written verbatim to the host's stderr, prefixed by the command
/// name (see `cpsh-commands`).
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CommandError {
    #[error("module not found")]
    ModuleNotFound,

    #[error("module already running")]
    ModuleAlreadyRunning,

    #[error("module not running")]
    ModuleNotRunning,

    #[error("binding already exists")]
    BindingExists,

    #[error("no such binding")]
    BindingNotExists,

    #[error("usage: {0}")]
    Usage(&'static str),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_module_not_found() {
        assert_eq!(CommandError::ModuleNotFound.to_string(), "module not found");
    }

    #[test]
    fn test_display_module_already_running() {
        assert_eq!(
            CommandError::ModuleAlreadyRunning.to_string(),
            "module already running"
        );
    }

    #[test]
    fn test_display_module_not_running() {
        assert_eq!(
            CommandError::ModuleNotRunning.to_string(),
            "module not running"
        );
    }

    #[test]
    fn test_display_binding_exists() {
        assert_eq!(
            CommandError::BindingExists.to_string(),
            "binding already exists"
        );
    }

    #[test]
    fn test_display_binding_not_exists() {
        assert_eq!(CommandError::BindingNotExists.to_string(), "no such binding");
    }

    #[test]
    fn test_display_usage() {
        let err = CommandError::Usage("bind out in");
        assert_eq!(err.to_string(), "usage: bind out in");
    }

    #[test]
    fn test_error_is_send_and_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<CommandError>();
    }
}
