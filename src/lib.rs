//! kes - command entry point for a key management client and server.
//!
//! The binary parses `kes <command> [args...]`, routes the command through
//! `cmd::dispatch` and reports the outcome. Commands share the building
//! blocks exposed here:
//!   flags   permissive flag parsing (flags anywhere between positionals)
//!   config  key server address and client connection settings
//!   tls     client certificate loading
//!   term    terminal detection
//!   error   CliError and exit statuses

pub mod utils;

pub mod cmd;
pub mod config;
pub mod error;
pub mod flags;
pub mod term;
pub mod tls;

pub use error::CliError;
