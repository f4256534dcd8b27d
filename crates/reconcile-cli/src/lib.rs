mod args;
mod commands;
mod deployment;

pub use args::{Cli, Commands, LogLevel, SyncCommand};
pub use commands::run;
