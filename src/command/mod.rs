//! External command execution
//!
//! Everything that shells out (the orchestration tool, git) goes through the
//! [`CommandRunner`] trait so that tests can substitute a fake.

mod runner;
#[cfg(test)]
pub mod testing;

pub use runner::{CommandOutput, CommandRunner, CommandSpec, ProcessRunner};
