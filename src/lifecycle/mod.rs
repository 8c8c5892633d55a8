//! Instance lifecycle operations
//!
//! Every operation that touches an installed instance takes the instance's
//! lock first and holds it until the orchestration tool has finished. Errors
//! leave the lock released and the directory in place, so the same operation
//! can simply be retried.

mod install;
mod run;
mod state;
mod stop;
mod uninstall;

#[cfg(test)]
pub(crate) mod test_support;

pub use install::{install, InstallSpec, DEFAULT_TAG};
pub use run::start;
pub use state::{state, InstanceState};
pub use stop::stop;
pub use uninstall::uninstall;
