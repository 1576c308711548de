//! Systems, phases and deferred world commands.

pub mod command;
pub mod schedule;
pub mod system;
