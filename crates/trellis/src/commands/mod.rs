//! Command implementations that do not need an open workspace.

pub mod init;
