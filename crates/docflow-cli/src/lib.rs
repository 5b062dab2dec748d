//! Docflow CLI library: command implementations shared by the `docflow`
//! binary and its integration tests.

pub mod commands;
