//! In-memory stand-in for the orchestration tool

use super::{CommandOutput, CommandRunner, CommandSpec};
use crate::error::Result;
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Mutex;
use std::time::{Duration, Instant};

const VERBS: &[&str] = &["up", "down", "stop", "ps"];

/// Container state the fake keeps per compose file
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FakeContainers {
    Running,
    Stopped,
}

/// One recorded compose invocation
#[derive(Debug, Clone)]
pub struct Invocation {
    pub verb: String,
    pub path: PathBuf,
    pub args: Vec<String>,
    pub started: Instant,
    pub finished: Instant,
}

#[derive(Default)]
struct FakeState {
    containers: HashMap<PathBuf, FakeContainers>,
    failures: HashMap<String, (i32, String)>,
    invocations: Vec<Invocation>,
    other: Vec<CommandSpec>,
}

/// Fake [`CommandRunner`] that models `docker compose` per compose file.
///
/// `up` marks the file's containers running, `stop` marks them stopped,
/// `down` forgets them and `ps` prints a service name while running. Any
/// other program (git) fails with exit code 128.
#[derive(Default)]
pub struct FakeRunner {
    state: Mutex<FakeState>,
    delay: Duration,
}

impl FakeRunner {
    pub fn new() -> Self {
        Self::default()
    }

    /// Hold every compose invocation open for `delay`
    pub fn with_delay(delay: Duration) -> Self {
        Self {
            delay,
            ..Self::default()
        }
    }

    /// Make `verb` exit with `code` until cleared
    pub fn fail(&self, verb: &str, code: i32, stderr: &str) {
        self.lock()
            .failures
            .insert(verb.to_string(), (code, stderr.to_string()));
    }

    pub fn clear_failures(&self) {
        self.lock().failures.clear();
    }

    pub fn containers(&self, path: &std::path::Path) -> Option<FakeContainers> {
        self.lock().containers.get(path).copied()
    }

    pub fn invocations(&self) -> Vec<Invocation> {
        self.lock().invocations.clone()
    }

    pub fn verbs(&self) -> Vec<String> {
        self.lock().invocations.iter().map(|i| i.verb.clone()).collect()
    }

    /// Commands for programs other than the orchestration tool
    pub fn other_commands(&self) -> Vec<CommandSpec> {
        self.lock().other.clone()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, FakeState> {
        self.state.lock().unwrap()
    }

    fn apply(&self, verb: &str, path: &PathBuf) -> CommandOutput {
        let mut state = self.lock();
        if let Some((code, stderr)) = state.failures.get(verb) {
            return CommandOutput {
                exit_code: Some(*code),
                stdout: String::new(),
                stderr: stderr.clone(),
            };
        }

        let mut stdout = String::new();
        match verb {
            "up" => {
                state.containers.insert(path.clone(), FakeContainers::Running);
            }
            "stop" => {
                if let Some(c) = state.containers.get_mut(path) {
                    *c = FakeContainers::Stopped;
                }
            }
            "down" => {
                state.containers.remove(path);
            }
            "ps" => {
                if state.containers.get(path) == Some(&FakeContainers::Running) {
                    stdout.push_str("app\n");
                }
            }
            _ => {}
        }

        CommandOutput {
            exit_code: Some(0),
            stdout,
            stderr: String::new(),
        }
    }
}

fn parse_compose_args(args: &[String]) -> Option<(String, PathBuf)> {
    let file_at = args.iter().position(|a| a == "-f")?;
    let path = PathBuf::from(args.get(file_at + 1)?);
    let verb = args[file_at + 2..]
        .iter()
        .find(|a| VERBS.contains(&a.as_str()))?
        .clone();
    Some((verb, path))
}

impl CommandRunner for FakeRunner {
    async fn run(&self, command: &CommandSpec) -> Result<CommandOutput> {
        let Some((verb, path)) = parse_compose_args(&command.args) else {
            self.lock().other.push(command.clone());
            return Ok(CommandOutput {
                exit_code: Some(128),
                stdout: String::new(),
                stderr: format!("fatal: {} is not available in tests", command.program),
            });
        };

        let started = Instant::now();
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        let output = self.apply(&verb, &path);
        let finished = Instant::now();

        self.lock().invocations.push(Invocation {
            verb,
            path,
            args: command.args.clone(),
            started,
            finished,
        });
        Ok(output)
    }
}
