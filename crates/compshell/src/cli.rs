use std::path::PathBuf;

use clap::Parser;

/// Process-composition shell: spawns child "modules", wires their standard
/// streams together, and drives the composition from a small command
/// language read on its own input (§10.1). Mirrors `mkapp.c`'s
/// `GOptionEntry` table: `--command` takes priority over positional files,
/// which take priority over reading the host's stdin.
#[derive(Parser)]
#[command(name = "compshell", version, about)]
pub struct Cli {
    /// Module-definition script(s) to run in order, in place of stdin.
    pub files: Vec<PathBuf>,

    /// Process commands from a string instead of reading files or stdin.
    #[arg(short = 'c', long = "command")]
    pub command: Option<String>,

    /// Raise the default log level to debug.
    #[arg(short, long)]
    pub verbose: bool,
}
