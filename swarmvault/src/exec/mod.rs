//! External command execution.
//!
//! Every call to the container runtime, the shell or the sync tool is
//! described by a [`CommandSpec`] and executed through a [`CommandRunner`].

pub mod command;
pub mod runner;

#[cfg(test)]
pub(crate) mod fake;

pub use command::CommandSpec;
pub use runner::{CommandRunner, SystemRunner};
