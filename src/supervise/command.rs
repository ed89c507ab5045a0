// src/supervise/command.rs

use std::path::PathBuf;
use std::process::Stdio;

use tokio::process::Command;

use crate::config::StageConfig;

/// What to launch for a stage.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandSpec {
    pub program: String,
    pub args: Vec<String>,
    /// Hand `program` plus `args` to the platform shell as one command line.
    pub shell: bool,
    pub cwd: Option<PathBuf>,
}

impl CommandSpec {
    pub fn new(program: impl Into<String>, args: Vec<String>) -> Self {
        Self {
            program: program.into(),
            args,
            shell: false,
            cwd: None,
        }
    }

    pub fn shell(command_line: impl Into<String>) -> Self {
        Self {
            program: command_line.into(),
            args: Vec::new(),
            shell: true,
            cwd: None,
        }
    }

    pub fn from_stage(stage: &StageConfig) -> Self {
        Self {
            program: stage.cmd.clone(),
            args: stage.args.clone(),
            shell: stage.shell,
            cwd: stage.cwd.clone(),
        }
    }

    /// Build from a `[cmd, args...]` vector as given on the command line.
    pub fn from_argv(argv: &[String], shell: bool) -> Option<Self> {
        let (program, args) = argv.split_first()?;
        let spec = if shell {
            Self::shell(argv.join(" "))
        } else {
            Self::new(program.clone(), args.to_vec())
        };
        Some(spec)
    }

    pub fn display(&self) -> String {
        if self.args.is_empty() {
            self.program.clone()
        } else {
            format!("{} {}", self.program, self.args.join(" "))
        }
    }

    /// Tokio command with piped output, no stdin and kill-on-drop, so a
    /// dropped supervisor never leaves the child behind.
    pub fn to_command(&self) -> Command {
        let mut cmd = if self.shell {
            shell_command(&self.display())
        } else {
            let mut c = Command::new(&self.program);
            c.args(&self.args);
            c
        };

        if let Some(ref cwd) = self.cwd {
            cmd.current_dir(cwd);
        }

        cmd.stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        cmd
    }
}

// Build a shell command appropriate for the platform.
fn shell_command(line: &str) -> Command {
    if cfg!(windows) {
        let mut c = Command::new("cmd");
        c.arg("/C").arg(line);
        c
    } else {
        let mut c = Command::new("sh");
        c.arg("-c").arg(line);
        c
    }
}
